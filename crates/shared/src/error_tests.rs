use super::*;
use rstest::rstest;

#[rstest]
#[case(AppError::NotFound(String::new()), 404, "NOT_FOUND")]
#[case(AppError::Validation(String::new()), 400, "VALIDATION_ERROR")]
#[case(AppError::BusinessRule(String::new()), 422, "BUSINESS_RULE_VIOLATION")]
#[case(AppError::Conflict(String::new()), 409, "CONFLICT")]
#[case(AppError::Configuration(String::new()), 500, "CONFIGURATION_ERROR")]
#[case(AppError::Database(String::new()), 500, "DATABASE_ERROR")]
#[case(AppError::Internal(String::new()), 500, "INTERNAL_ERROR")]
fn test_status_and_code(#[case] err: AppError, #[case] status: u16, #[case] code: &str) {
    assert_eq!(err.status_code(), status);
    assert_eq!(err.error_code(), code);
}

#[test]
fn test_only_conflict_is_retryable() {
    assert!(AppError::Conflict("busy".into()).is_retryable());
    assert!(!AppError::NotFound("x".into()).is_retryable());
    assert!(!AppError::Internal("x".into()).is_retryable());
}

#[test]
fn test_error_display() {
    assert_eq!(AppError::NotFound("msg".into()).to_string(), "Not found: msg");
    assert_eq!(
        AppError::Validation("msg".into()).to_string(),
        "Validation error: msg"
    );
    assert_eq!(
        AppError::BusinessRule("msg".into()).to_string(),
        "Business rule violation: msg"
    );
    assert_eq!(AppError::Conflict("msg".into()).to_string(), "Conflict: msg");
    assert_eq!(
        AppError::Internal("msg".into()).to_string(),
        "Internal error: msg"
    );
}
