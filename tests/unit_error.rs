use std::path::PathBuf;

use learnboard::error::{exit_codes, Error, JsonError};

#[test]
fn exit_codes_map_correctly() {
    let user = Error::InvalidArgument("bad".to_string());
    assert_eq!(user.exit_code(), exit_codes::USER_ERROR);

    let missing = Error::TaskNotFound("01abc".to_string());
    assert_eq!(missing.exit_code(), exit_codes::USER_ERROR);

    let rejected = Error::ImportValidation(vec!["Task 1: Missing ID".to_string()]);
    assert_eq!(rejected.exit_code(), exit_codes::USER_ERROR);

    let lock = Error::LockFailed(PathBuf::from("board.lock"));
    assert_eq!(lock.exit_code(), exit_codes::OPERATION_FAILED);

    let op = Error::OperationFailed("boom".to_string());
    assert_eq!(op.exit_code(), exit_codes::OPERATION_FAILED);
}

#[test]
fn json_error_includes_code() {
    let err = Error::TaskNotFound("01abc".to_string());
    let json = JsonError::from(&err);
    assert_eq!(json.code, exit_codes::USER_ERROR);
    assert!(json.error.contains("Task not found"));
    assert!(json.details.is_none());
}

#[test]
fn import_rejection_carries_problems() {
    let err = Error::ImportValidation(vec![
        "Task 1: Missing ID".to_string(),
        "Task 3: Invalid status".to_string(),
    ]);
    assert_eq!(err.to_string(), "Import rejected: 2 problem(s) found");

    let details = err.details().expect("details");
    assert_eq!(details["problems"][1], "Task 3: Invalid status");
}
