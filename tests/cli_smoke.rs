use assert_cmd::Command;
use predicates::str::contains;

#[test]
fn lb_help_works() {
    Command::cargo_bin("lb")
        .expect("binary")
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("learning board"));
}

#[test]
fn subcommand_help_works() {
    let subcommands = [
        "add", "edit", "rm", "move", "done", "archive", "list", "board", "show", "time", "stats",
        "export", "import", "timer", "sound", "tui",
    ];

    for cmd in subcommands {
        Command::cargo_bin("lb")
            .expect("binary")
            .arg(cmd)
            .arg("--help")
            .assert()
            .success();
    }
}

#[test]
fn nested_help_works() {
    let nested = [
        ("timer", "start"),
        ("timer", "stop"),
        ("sound", "set"),
        ("sound", "test"),
    ];
    for (group, cmd) in nested {
        Command::cargo_bin("lb")
            .expect("binary")
            .args([group, cmd, "--help"])
            .assert()
            .success();
    }
}

#[test]
fn rejects_unknown_status() {
    let dir = tempfile::tempdir().expect("tempdir");
    Command::cargo_bin("lb")
        .expect("binary")
        .env("LEARNBOARD_DATA_DIR", dir.path())
        .args(["add", "Lifetimes", "--status", "doing"])
        .assert()
        .failure();
}
