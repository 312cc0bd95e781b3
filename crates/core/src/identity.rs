//! Caller identity: the key that scopes stored context.
//!
//! An identity is supplied by the caller as an integer or a string.
//! Both spellings of the same value name the same identity, so `42` and
//! `"42"` address one entry. Identities are not authenticated: anyone who
//! knows or guesses one can read or overwrite its context.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A caller/session key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(String);

impl Identity {
    /// Build an identity from free text. Blank input yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Build an identity from a JSON value.
    ///
    /// Integers and non-blank strings are accepted; `null`, blank strings,
    /// booleans, arrays and objects are not identities.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => Some(Self(n.to_string())),
            serde_json::Value::String(s) => Self::parse(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The numeric value, when the identity is an integer.
    pub fn as_i64(&self) -> Option<i64> {
        self.0.parse().ok()
    }
}

impl From<i64> for Identity {
    fn from(n: i64) -> Self {
        Self(n.to_string())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Identity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| "identity must not be blank".to_string())
    }
}

// Integer identities go back out as JSON numbers.
impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_i64() {
            Some(n) => serializer.serialize_i64(n),
            None => serializer.serialize_str(&self.0),
        }
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Self::from_value(&value)
            .ok_or_else(|| serde::de::Error::custom("identity must be an integer or a non-blank string"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integer_and_string_spellings_are_equal() {
        assert_eq!(Identity::from(42_i64), Identity::parse("42").unwrap());
        assert_eq!(Identity::from_value(&json!(42)), Identity::from_value(&json!("42")));
    }

    #[test]
    fn blank_and_non_scalar_values_are_not_identities() {
        assert!(Identity::parse("   ").is_none());
        assert!(Identity::from_value(&json!("")).is_none());
        assert!(Identity::from_value(&json!(null)).is_none());
        assert!(Identity::from_value(&json!({"id": 1})).is_none());
        assert!(Identity::from_value(&json!(true)).is_none());
    }

    #[test]
    fn integer_identity_serializes_as_number() {
        assert_eq!(serde_json::to_value(Identity::from(2723_i64)).unwrap(), json!(2723));
        assert_eq!(
            serde_json::to_value(Identity::parse("enfermeria-3").unwrap()).unwrap(),
            json!("enfermeria-3")
        );
    }

    #[test]
    fn deserializes_from_either_form() {
        let a: Identity = serde_json::from_value(json!(7)).unwrap();
        let b: Identity = serde_json::from_value(json!("7")).unwrap();
        assert_eq!(a, b);
        assert!(serde_json::from_value::<Identity>(json!("")).is_err());
    }
}
