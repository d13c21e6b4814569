//! Registered claims (RFC 7519 §4.1): `iss`, `sub`, `aud`, `exp`, `nbf`,
//! `iat`, `jti`, plus whatever private claims the caller put in the
//! payload.

use serde_json::{Map, Value};

/// `aud` may be a single string or an array of strings (RFC 7519 §4.1.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    pub fn contains(&self, value: &str) -> bool {
        match self {
            Audience::One(s) => s == value,
            Audience::Many(v) => v.iter().any(|s| s == value),
        }
    }
}

/// A decoded JWT payload: the registered claims section 6 recognizes,
/// pulled out of the raw JSON object, plus the object itself for access to
/// private claims.
#[derive(Debug, Clone)]
pub struct Claims {
    pub raw: Map<String, Value>,
}

impl Claims {
    pub fn from_object(raw: Map<String, Value>) -> Claims {
        Claims { raw }
    }

    pub fn issuer(&self) -> Option<&str> {
        self.raw.get("iss").and_then(Value::as_str)
    }

    pub fn subject(&self) -> Option<&str> {
        self.raw.get("sub").and_then(Value::as_str)
    }

    pub fn audience(&self) -> Option<Audience> {
        match self.raw.get("aud")? {
            Value::String(s) => Some(Audience::One(s.clone())),
            Value::Array(items) => Some(Audience::Many(
                items.iter().filter_map(Value::as_str).map(String::from).collect(),
            )),
            _ => None,
        }
    }

    pub fn expires_at(&self) -> Option<i64> {
        self.raw.get("exp").and_then(Value::as_i64)
    }

    pub fn not_before(&self) -> Option<i64> {
        self.raw.get("nbf").and_then(Value::as_i64)
    }

    pub fn issued_at(&self) -> Option<i64> {
        self.raw.get("iat").and_then(Value::as_i64)
    }

    pub fn jwt_id(&self) -> Option<&str> {
        self.raw.get("jti").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_registered_claims() {
        let Value::Object(raw) = json!({
            "iss": "issuer-a",
            "aud": ["svc-1", "svc-2"],
            "exp": 1_700_000_000,
            "nbf": 1_699_999_000,
            "jti": "abc123",
        }) else {
            unreachable!()
        };
        let claims = Claims::from_object(raw);
        assert_eq!(claims.issuer(), Some("issuer-a"));
        assert_eq!(claims.expires_at(), Some(1_700_000_000));
        assert_eq!(claims.jwt_id(), Some("abc123"));
        assert!(claims.audience().unwrap().contains("svc-2"));
        assert!(!claims.audience().unwrap().contains("svc-3"));
    }

    #[test]
    fn single_string_audience_is_supported() {
        let Value::Object(raw) = json!({"aud": "svc-1"}) else {
            unreachable!()
        };
        let claims = Claims::from_object(raw);
        assert!(claims.audience().unwrap().contains("svc-1"));
    }
}
