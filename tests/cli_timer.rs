mod support;

use predicates::str::contains;
use support::TestBoard;

#[test]
fn start_pause_resume_stop_cycle() {
    let board = TestBoard::new();
    let id = board.add("Pattern matching", &["--status", "learning"]);

    let started = board.json(&["timer", "start", &id]);
    assert_eq!(started["command"], "timer start");
    assert_eq!(started["data"]["timer"]["task_id"], id.as_str());
    assert_eq!(started["data"]["timer"]["running"], true);
    assert_eq!(started["data"]["title"], "Pattern matching");

    let paused = board.json(&["timer", "pause"]);
    assert_eq!(paused["data"]["timer"]["running"], false);

    board
        .cmd()
        .args(["timer", "pause"])
        .assert()
        .code(2)
        .stderr(contains("already paused"));

    let resumed = board.json(&["timer", "resume"]);
    assert_eq!(resumed["data"]["timer"]["running"], true);

    let status = board.json(&["timer", "status"]);
    assert_eq!(status["data"]["timer"]["task_id"], id.as_str());

    let stopped = board.json(&["timer", "stop"]);
    assert_eq!(stopped["data"]["stopped"]["task_id"], id.as_str());
    assert_eq!(stopped["data"]["stopped"]["minutes"], 0);
    assert!(stopped["data"]["timer"].is_null());

    let idle = board.json(&["timer", "status"]);
    assert!(idle["data"]["timer"].is_null());
}

#[test]
fn stop_without_timer_is_a_user_error() {
    let board = TestBoard::new();
    board
        .cmd()
        .args(["timer", "stop"])
        .assert()
        .code(2)
        .stderr(contains("no timer is active"));
}

#[test]
fn starting_twice_on_the_same_task_fails() {
    let board = TestBoard::new();
    let id = board.add("Collections", &[]);
    board.json(&["timer", "start", &id]);
    board
        .cmd()
        .args(["timer", "start", &id])
        .assert()
        .code(2)
        .stderr(contains("already running"));
}

#[test]
fn starting_another_task_stops_the_first() {
    let board = TestBoard::new();
    let first = board.add("Strings", &[]);
    let second = board.add("Slices", &[]);

    board.json(&["timer", "start", &first]);
    let switched = board.json(&["timer", "start", &second]);
    assert_eq!(switched["data"]["stopped"]["task_id"], first.as_str());
    assert_eq!(switched["data"]["timer"]["task_id"], second.as_str());
}

#[test]
fn timer_on_unknown_task_fails() {
    let board = TestBoard::new();
    board
        .cmd()
        .args(["timer", "start", "nope"])
        .assert()
        .code(2)
        .stderr(contains("Task not found"));
}

#[test]
fn events_stream_to_stdout_as_json_lines() {
    let board = TestBoard::new();
    let id = board.add("Channels", &[]);
    let output = board
        .cmd()
        .args(["--events", "-", "--json", "timer", "start", &id])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).expect("utf8");
    let first = text.lines().next().expect("event line");
    let event: serde_json::Value = serde_json::from_str(first).expect("event json");
    assert_eq!(event["schema_version"], "learnboard.event.v1");
}
