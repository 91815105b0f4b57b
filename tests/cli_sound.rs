mod support;

use predicates::str::contains;
use support::TestBoard;

#[test]
fn set_merges_toggles_and_persists() {
    let board = TestBoard::new();
    let updated = board.json(&["sound", "set", "--volume", "0.3", "--task-move", "off"]);
    assert_eq!(updated["data"]["volume"], 0.3);
    assert_eq!(updated["data"]["enabled"], false);
    assert_eq!(updated["data"]["sounds"]["taskMove"], false);
    assert_eq!(updated["data"]["sounds"]["taskComplete"], true);

    let shown = board.json(&["sound", "show"]);
    assert_eq!(shown["data"], updated["data"]);
}

#[test]
fn set_without_flags_fails() {
    let board = TestBoard::new();
    board
        .cmd()
        .args(["sound", "set"])
        .assert()
        .code(2)
        .stderr(contains("nothing to change"));
}

#[test]
fn volume_out_of_range_is_rejected() {
    let board = TestBoard::new();
    board
        .cmd()
        .args(["sound", "set", "--volume", "1.5"])
        .assert()
        .code(2)
        .stderr(contains("volume must be between 0 and 1"));
}

#[test]
fn switch_values_accept_on_and_off() {
    let board = TestBoard::new();
    let enabled = board.json(&["sound", "set", "--enabled", "yes"]);
    assert_eq!(enabled["data"]["enabled"], true);

    board
        .cmd()
        .args(["sound", "set", "--enabled", "maybe"])
        .assert()
        .failure();
}

#[test]
fn sound_test_respects_quiet() {
    let board = TestBoard::new();
    let report = board.json(&["--quiet", "sound", "test", "task-complete"]);
    assert_eq!(report["data"]["sound"], "taskComplete");
    assert_eq!(report["data"]["played"], false);
}
