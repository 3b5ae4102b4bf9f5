//! Account-definition metadata.
//!
//! Each probe declares the credential fields it needs through a list of
//! [`AccountDefinitionEntry`] values. The mediation layer renders them and
//! hands the filled-in values back as an opaque string map at discovery,
//! validation, and action time.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opaque credential/account values keyed by field name.
pub type AccountValues = BTreeMap<String, String>;

/// Well-known field name for the target identifier (file path, address).
pub const TARGET_IDENTIFIER: &str = "targetIdentifier";
/// Well-known field name for the target name or address.
pub const NAME_OR_ADDRESS: &str = "nameOrAddress";
/// Well-known field name for the login user.
pub const USERNAME: &str = "username";
/// Well-known field name for the login password.
pub const PASSWORD: &str = "password";
/// Well-known field name for the optional target version.
pub const VERSION: &str = "version";

/// Whether a field must be supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Mandatory,
    Optional,
}

/// Metadata for one credential field a probe requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDefinitionEntry {
    /// Field name used as the key in [`AccountValues`].
    pub name: String,
    /// Human-readable label.
    pub display_name: String,
    /// Short description shown alongside the field.
    pub description: String,
    /// Mandatory or optional.
    pub kind: FieldKind,
    /// Verification regex applied to the supplied value.
    pub verification: String,
}

impl AccountDefinitionEntry {
    pub fn mandatory(name: &str, display_name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            description: description.to_string(),
            kind: FieldKind::Mandatory,
            verification: ".*".to_string(),
        }
    }

    pub fn optional(name: &str, display_name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            description: description.to_string(),
            kind: FieldKind::Optional,
            verification: ".*".to_string(),
        }
    }
}

/// Look up a mandatory field, reporting a structured error when absent.
pub fn require_field<'a>(
    values: &'a AccountValues,
    field: &str,
) -> crate::error::Result<&'a str> {
    values
        .get(field)
        .map(String::as_str)
        .ok_or_else(|| crate::error::Error::MissingCredential {
            field: field.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_field_present() {
        let mut values = AccountValues::new();
        values.insert(TARGET_IDENTIFIER.to_string(), "topology.toml".to_string());
        assert_eq!(
            require_field(&values, TARGET_IDENTIFIER).unwrap(),
            "topology.toml"
        );
    }

    #[test]
    fn require_field_missing_names_the_field() {
        let values = AccountValues::new();
        let err = require_field(&values, USERNAME).unwrap_err();
        assert!(err.to_string().contains("username"));
    }

    #[test]
    fn entry_serde_round_trip() {
        let entry = AccountDefinitionEntry::mandatory(USERNAME, "User", "login user");
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("mandatory"));
        let back: AccountDefinitionEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
