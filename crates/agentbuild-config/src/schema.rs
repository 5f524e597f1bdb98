//! Typed configuration keys.
//!
//! Some keys carry semantic values. They are parsed for the active context
//! before any pipeline step runs, so a malformed value fails the invocation
//! up front instead of halfway through an assembly.

use agentbuild_core::semantic::{
    DomainEmailAddress, DomainPolicy, EmailAddress, RegularExpression,
};
use agentbuild_core::{ConfigResolver, ContextStack, Result};
use tracing::debug;

use crate::keys;

/// Semantic type of a configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    RegularExpression,
    EmailAddress,
    /// Email address that must belong to `Logging.domain`.
    DomainEmailAddress,
}

/// A configuration key with a semantic type.
#[derive(Debug, Clone, Copy)]
pub struct TypedKey {
    pub key: &'static str,
    pub value_type: ValueType,
}

pub const TYPED_KEYS: &[TypedKey] = &[
    TypedKey {
        key: keys::BUILDER_EXCLUDE_PATTERN,
        value_type: ValueType::RegularExpression,
    },
    TypedKey {
        key: keys::LOGGING_NOTIFICATION_EMAIL,
        value_type: ValueType::DomainEmailAddress,
    },
    TypedKey {
        key: keys::MONITORING_ALERT_EMAIL,
        value_type: ValueType::EmailAddress,
    },
];

/// Parse every typed key that is set for `context`.
///
/// Returns the keys that were checked. The first invalid value is returned
/// as an error.
pub fn validate_config(
    config: &dyn ConfigResolver,
    context: &ContextStack,
) -> Result<Vec<&'static str>> {
    let policy = DomainPolicy::from_config(config, context)?;
    let mut checked = Vec::new();

    for typed in TYPED_KEYS {
        let Some(raw) = config.get_string(typed.key, context)? else {
            continue;
        };
        match typed.value_type {
            ValueType::RegularExpression => {
                RegularExpression::parse(raw)?;
            }
            ValueType::EmailAddress => {
                EmailAddress::parse(raw)?;
            }
            ValueType::DomainEmailAddress => {
                DomainEmailAddress::parse(raw, &policy)?;
            }
        }
        debug!(key = typed.key, "Validated typed configuration value");
        checked.push(typed.key);
    }

    Ok(checked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_config;
    use agentbuild_core::Error;

    #[test]
    fn test_valid_config() {
        let config = parse_config(
            r#"
            Logging.domain "corp.com"
            Logging.notification_email "ops@corp.com"
            Monitoring.alert_email "pager@elsewhere.net"
            ClientBuilder.exclude_pattern "\\.pyc$"
            "#,
        )
        .unwrap()
        .freeze();

        let checked = validate_config(&config, &ContextStack::new()).unwrap();
        assert_eq!(checked.len(), 3);
    }

    #[test]
    fn test_unset_keys_skipped() {
        let config = parse_config("Client.name \"agent\"").unwrap().freeze();
        assert!(validate_config(&config, &ContextStack::new())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_domain_policy_follows_context() {
        let config = parse_config(
            r#"
            Logging.notification_email "ops@corp.com"
            context "Site:Partner" {
                Logging.domain "partner.org"
            }
            "#,
        )
        .unwrap()
        .freeze();

        assert!(validate_config(&config, &ContextStack::new()).is_ok());

        let partner = ContextStack::new().with("Site:Partner");
        let err = validate_config(&config, &partner).unwrap_err();
        assert!(matches!(err, Error::DomainMismatch { .. }));
    }

    #[test]
    fn test_bad_pattern() {
        let config = parse_config("ClientBuilder.exclude_pattern \"[\"")
            .unwrap()
            .freeze();
        let err = validate_config(&config, &ContextStack::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat { .. }));
    }

    #[test]
    fn test_bad_email() {
        let config = parse_config("Monitoring.alert_email \"nobody\"")
            .unwrap()
            .freeze();
        let err = validate_config(&config, &ContextStack::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat { .. }));
    }
}
