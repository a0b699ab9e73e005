//! User record model and validated deserialization

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// User profile as returned by the backend and mirrored into persisted
/// storage
///
/// Only `id` is required; every display field is optional so that a
/// partial backend payload still yields a usable record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub coin_balance: Option<i64>,
    #[serde(default)]
    pub referral_code: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    /// Parse a persisted user value
    ///
    /// Maps every malformed shape to `None` ("no session") instead of an
    /// error: invalid JSON, the literal strings `"undefined"` and
    /// `"null"` that loose writers leave behind, and records whose `id`
    /// is missing or empty.
    pub fn from_persisted(raw: &str) -> Option<UserRecord> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "undefined" || trimmed == "null" {
            return None;
        }

        let user: UserRecord = match serde_json::from_str(trimmed) {
            Ok(user) => user,
            Err(e) => {
                debug!("Persisted user record is not valid JSON: {}", e);
                return None;
            }
        };

        if user.id.trim().is_empty() {
            debug!("Persisted user record has an empty id");
            return None;
        }

        Some(user)
    }

    /// Serialize this record for persisted storage
    pub fn to_persisted(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> UserRecord {
        UserRecord {
            id: "u1".to_string(),
            name: Some("Aidai".to_string()),
            phone: Some("+996700123456".to_string()),
            email: None,
            avatar_url: None,
            coin_balance: Some(150),
            referral_code: Some("YESS42".to_string()),
            created_at: None,
        }
    }

    #[test]
    fn test_roundtrip_through_persisted_form() {
        let user = sample_user();
        let parsed = UserRecord::from_persisted(&user.to_persisted()).unwrap();
        assert_eq!(parsed, user);
    }

    #[test]
    fn test_minimal_record_only_needs_id() {
        let parsed = UserRecord::from_persisted(r#"{"id":"u2"}"#).unwrap();
        assert_eq!(parsed.id, "u2");
        assert_eq!(parsed.name, None);
        assert_eq!(parsed.coin_balance, None);
    }

    #[test]
    fn test_malformed_values_map_to_none() {
        assert_eq!(UserRecord::from_persisted(""), None);
        assert_eq!(UserRecord::from_persisted("undefined"), None);
        assert_eq!(UserRecord::from_persisted("null"), None);
        assert_eq!(UserRecord::from_persisted("{not json"), None);
        assert_eq!(UserRecord::from_persisted(r#"{"name":"no id"}"#), None);
        assert_eq!(UserRecord::from_persisted(r#"{"id":""}"#), None);
        assert_eq!(UserRecord::from_persisted(r#"{"id":42}"#), None);
    }
}
