use uuid::Uuid;

use super::*;

#[test]
fn error_codes_are_stable() {
    let id = Uuid::nil();
    assert_eq!(SyncError::LockDenied(id).error_code(), "E_LOCK_DENIED");
    assert_eq!(SyncError::NotFound(id).error_code(), "E_SHAPE_NOT_FOUND");
    assert_eq!(SyncError::Offline.error_code(), "E_OFFLINE");
    assert_eq!(SyncError::WriteFailed("x".into()).error_code(), "E_WRITE_FAILED");
    assert_eq!(SyncError::ChannelClosed.error_code(), "E_CHANNEL_CLOSED");
}

#[test]
fn only_transport_failures_are_retryable() {
    assert!(SyncError::Offline.retryable());
    assert!(SyncError::WriteFailed("timeout".into()).retryable());
    assert!(!SyncError::LockDenied(Uuid::nil()).retryable());
    assert!(!SyncError::NotFound(Uuid::nil()).retryable());
}

#[test]
fn display_includes_shape_id() {
    let id = Uuid::from_u128(7);
    assert!(SyncError::NotFound(id).to_string().contains(&id.to_string()));
}
