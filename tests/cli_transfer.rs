mod support;

use std::fs;

use predicates::str::contains;
use support::TestBoard;

#[test]
fn json_export_round_trips_through_import() {
    let board = TestBoard::new();
    let id = board.add("Ownership", &["-t", "rust", "--notes", "re-read chapter 4"]);
    board.json(&["time", &id, "25"]);
    board.add("Lifetimes", &["--status", "learning"]);

    let export_path = board.path().join("backup.json");
    let exported = board.json(&["export", "-o", export_path.to_str().expect("utf8 path")]);
    assert_eq!(exported["data"]["tasks"], 2);
    assert_eq!(exported["data"]["format"], "json");

    let document: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&export_path).expect("export file"))
            .expect("export json");
    assert_eq!(document["version"], "1.0");
    assert!(document["exportDate"].is_string());
    assert_eq!(document["tasks"].as_array().map(Vec::len), Some(2));

    board.json(&["rm", &id]);
    let imported = board.json(&["import", export_path.to_str().expect("utf8 path")]);
    assert_eq!(imported["data"]["imported"], 2);
    assert_eq!(imported["data"]["replaced"], 1);

    let restored = board.json(&["show", &id]);
    assert_eq!(restored["data"]["task"]["timeSpent"], 25);
    assert_eq!(restored["data"]["task"]["notes"], "re-read chapter 4");
}

#[test]
fn default_export_name_is_dated() {
    let board = TestBoard::new();
    board.add("Closures", &[]);

    let exported = board.json(&["export", "--format", "csv"]);
    let path = exported["data"]["path"].as_str().expect("path");
    assert!(path.starts_with("learning-tasks-"));
    assert!(path.ends_with(".csv"));

    let csv = fs::read_to_string(board.path().join(path)).expect("csv file");
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("ID,Title,Description,Status,Priority,Due Date,Created At,Completed At,Time Spent (min),Tags,Notes")
    );
    assert!(lines.next().is_some_and(|row| row.contains("\"Closures\"")));
}

#[test]
fn export_to_stdout_prints_the_document() {
    let board = TestBoard::new();
    board.add("Iterators", &[]);
    board
        .cmd()
        .args(["--json", "export", "-o", "-"])
        .assert()
        .success()
        .stdout(contains("\"version\": \"1.0\""))
        .stdout(contains("Iterators"));
}

#[test]
fn invalid_import_lists_every_problem_and_keeps_tasks() {
    let board = TestBoard::new();
    board.add("Keep me", &[]);
    let before = fs::read_to_string(board.tasks_file()).expect("tasks");

    let path = board.write_file(
        "broken.json",
        r#"{
            "version": "1.0",
            "tasks": [
                {"title": "No id", "status": "new", "priority": "high", "createdAt": "2025-01-01T00:00:00Z"},
                {"id": "b", "title": "Bad status", "status": "doing", "priority": "low", "createdAt": "2025-01-01T00:00:00Z"}
            ]
        }"#,
    );

    board
        .cmd()
        .arg("import")
        .arg(&path)
        .assert()
        .code(2)
        .stderr(contains("Task 1: Missing ID"))
        .stderr(contains("Task 2:"));

    let after = fs::read_to_string(board.tasks_file()).expect("tasks");
    assert_eq!(before, after);
}

#[test]
fn import_requires_version_and_tasks() {
    let board = TestBoard::new();
    let path = board.write_file("old.json", r#"{"tasks": []}"#);
    board
        .cmd()
        .arg("import")
        .arg(&path)
        .assert()
        .code(2)
        .stderr(contains("missing version field"));

    let path = board.write_file("noarray.json", r#"{"version": "1.0"}"#);
    board
        .cmd()
        .arg("import")
        .arg(&path)
        .assert()
        .code(2)
        .stderr(contains("missing tasks array"));
}

#[test]
fn missing_import_file_is_a_user_error() {
    let board = TestBoard::new();
    board
        .cmd()
        .args(["import", "nowhere.json"])
        .assert()
        .code(2)
        .stderr(contains("import file not found"));
}
