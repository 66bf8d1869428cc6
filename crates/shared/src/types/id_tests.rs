use super::*;
use std::str::FromStr;
use uuid::Uuid;

#[test]
fn test_typed_id_creation() {
    let id = TenantId::new();
    assert!(!id.to_string().is_empty());
}

#[test]
fn test_typed_id_from_uuid() {
    let uuid = Uuid::new_v4();
    let id = DocumentId::from_uuid(uuid);
    assert_eq!(id.into_inner(), uuid);
    assert_eq!(DocumentId::from(uuid), id);
}

#[test]
fn test_typed_id_display() {
    let uuid = Uuid::new_v4();
    let id = PaymentId::from_uuid(uuid);
    assert_eq!(format!("{id}"), uuid.to_string());
}

#[test]
fn test_typed_id_from_str() {
    let uuid = Uuid::new_v4();
    let id = BankAccountId::from_str(&uuid.to_string()).unwrap();
    assert_eq!(id.into_inner(), uuid);
}

#[test]
fn test_typed_id_from_str_error() {
    assert!(TenantId::from_str("invalid").is_err());
    assert!(TenantId::from_str("").is_err());
}

#[test]
fn test_distinct_ids() {
    assert_ne!(DocumentId::new(), DocumentId::new());
}
