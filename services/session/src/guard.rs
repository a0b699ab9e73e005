//! Route guard helpers
//!
//! Guards for authenticated-only views read persisted storage directly
//! at decision time instead of trusting the synchronizer's in-memory
//! flag. Reconciliation is asynchronous relative to navigation, so a
//! stale flag must neither block access when storage already holds a
//! valid session nor grant it after the session was just ended.

use common::storage::StorageContext;

use crate::models::UserRecord;
use crate::synchronizer::{TOKEN_KEY, USER_KEY};

/// Whether persisted storage currently holds a valid session
pub fn has_active_session(context: &StorageContext) -> bool {
    active_user(context).is_some()
}

/// The persisted user record, but only when a token is also present
///
/// A user record without a token (or the reverse) counts as no session,
/// matching the synchronizer's own validity rule.
pub fn active_user(context: &StorageContext) -> Option<UserRecord> {
    context.get(TOKEN_KEY).filter(|t| !t.is_empty())?;
    context
        .get(USER_KEY)
        .and_then(|raw| UserRecord::from_persisted(&raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::storage::SharedStorage;

    #[test]
    fn test_empty_storage_has_no_session() {
        let storage = SharedStorage::in_memory();
        assert!(!has_active_session(&storage.context()));
    }

    #[test]
    fn test_single_key_is_no_session() {
        let storage = SharedStorage::in_memory();
        let context = storage.context();

        context.set(TOKEN_KEY, "tok1");
        assert!(!has_active_session(&context));

        context.remove(TOKEN_KEY);
        context.set(USER_KEY, r#"{"id":"u1"}"#);
        assert!(!has_active_session(&context));
    }

    #[test]
    fn test_both_keys_grant_access() {
        let storage = SharedStorage::in_memory();
        let context = storage.context();

        context.set(TOKEN_KEY, "tok1");
        context.set(USER_KEY, r#"{"id":"u1"}"#);

        assert!(has_active_session(&context));
        assert_eq!(active_user(&context).map(|u| u.id), Some("u1".to_string()));
    }

    #[test]
    fn test_malformed_user_denies_access() {
        let storage = SharedStorage::in_memory();
        let context = storage.context();

        context.set(TOKEN_KEY, "tok1");
        context.set(USER_KEY, "undefined");

        assert!(!has_active_session(&context));
        assert_eq!(active_user(&context), None);
    }
}
