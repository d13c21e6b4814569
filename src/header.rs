//! The JOSE header shared by JWS and JWE compact serialization: typed
//! access to the fields section 6 recognizes, plus whatever private fields
//! the caller added.
//!
//! [`Header::to_json`] hand-assembles the JSON text instead of routing
//! through a `serde_json::Map` so it can guarantee the field order section
//! 4.8 requires (`alg`, then `enc`, `zip`, `kid`, then everything else in
//! the order the caller inserted it) — `serde_json::Map` without the
//! `preserve_order` feature is a `BTreeMap` and would silently
//! alphabetize the tail instead.

use crate::error::{JoseError, JoseResult};
use serde_json::Value;

#[derive(Debug, Clone, Default)]
pub struct Header {
    pub alg: Option<String>,
    pub enc: Option<String>,
    pub zip: Option<String>,
    pub kid: Option<String>,
    pub typ: Option<String>,
    pub cty: Option<String>,
    pub crit: Vec<String>,
    pub epk: Option<Value>,
    pub apu: Option<String>,
    pub apv: Option<String>,
    pub iv: Option<String>,
    pub tag: Option<String>,
    /// RFC 7797 unencoded payload: `Some(false)` means the JWS payload
    /// segment carries the literal payload bytes instead of its
    /// Base64url encoding. Only meaningful alongside `"b64"` in `crit`.
    pub b64: Option<bool>,
    /// Private fields (registered claims live in the payload, not here),
    /// in caller insertion order.
    pub extra: Vec<(String, Value)>,
}

const KNOWN_FIELDS: &[&str] = &[
    "alg", "enc", "zip", "kid", "typ", "cty", "crit", "epk", "apu", "apv", "iv", "tag", "b64",
];

impl Header {
    pub fn new(alg: impl Into<String>) -> Header {
        Header {
            alg: Some(alg.into()),
            ..Header::default()
        }
    }

    pub fn with_enc(mut self, enc: impl Into<String>) -> Header {
        self.enc = Some(enc.into());
        self
    }

    pub fn with_kid(mut self, kid: impl Into<String>) -> Header {
        self.kid = Some(kid.into());
        self
    }

    pub fn with_cty(mut self, cty: impl Into<String>) -> Header {
        self.cty = Some(cty.into());
        self
    }

    pub fn insert(mut self, key: impl Into<String>, value: Value) -> Header {
        self.extra.push((key.into(), value));
        self
    }

    /// RFC 7797: mark the payload as unencoded. Adds `"b64"` to `crit` so
    /// a reader that doesn't understand it refuses the token instead of
    /// silently re-encoding.
    pub fn with_unencoded_payload(mut self) -> Header {
        self.b64 = Some(false);
        if !self.crit.iter().any(|c| c == "b64") {
            self.crit.push("b64".to_string());
        }
        self
    }

    pub fn to_json(&self) -> JoseResult<String> {
        let mut out = String::from("{");
        let mut first = true;
        let mut push = |key: &str, value: &Value| -> JoseResult<()> {
            if !first {
                out.push(',');
            }
            first = false;
            out.push('"');
            out.push_str(key);
            out.push_str("\":");
            out.push_str(&serde_json::to_string(value).map_err(|e| JoseError::Other(e.into()))?);
            Ok(())
        };

        if let Some(alg) = &self.alg {
            push("alg", &Value::String(alg.clone()))?;
        }
        if let Some(enc) = &self.enc {
            push("enc", &Value::String(enc.clone()))?;
        }
        if let Some(zip) = &self.zip {
            push("zip", &Value::String(zip.clone()))?;
        }
        if let Some(kid) = &self.kid {
            push("kid", &Value::String(kid.clone()))?;
        }
        if let Some(typ) = &self.typ {
            push("typ", &Value::String(typ.clone()))?;
        }
        if let Some(cty) = &self.cty {
            push("cty", &Value::String(cty.clone()))?;
        }
        if !self.crit.is_empty() {
            push("crit", &Value::Array(self.crit.iter().cloned().map(Value::String).collect()))?;
        }
        if let Some(epk) = &self.epk {
            push("epk", epk)?;
        }
        if let Some(apu) = &self.apu {
            push("apu", &Value::String(apu.clone()))?;
        }
        if let Some(apv) = &self.apv {
            push("apv", &Value::String(apv.clone()))?;
        }
        if let Some(iv) = &self.iv {
            push("iv", &Value::String(iv.clone()))?;
        }
        if let Some(tag) = &self.tag {
            push("tag", &Value::String(tag.clone()))?;
        }
        if let Some(b64) = self.b64 {
            push("b64", &Value::Bool(b64))?;
        }
        for (key, value) in &self.extra {
            push(key, value)?;
        }
        out.push('}');
        Ok(out)
    }

    pub fn from_json(json: &str) -> JoseResult<Header> {
        let value: Value = serde_json::from_str(json).map_err(|_| JoseError::HeaderInvalid("not a JSON object".into()))?;
        let Value::Object(map) = value else {
            return Err(JoseError::HeaderInvalid("header must be a JSON object".into()));
        };

        let mut header = Header::default();
        for (key, value) in map {
            match key.as_str() {
                "alg" => header.alg = value.as_str().map(String::from),
                "enc" => header.enc = value.as_str().map(String::from),
                "zip" => header.zip = value.as_str().map(String::from),
                "kid" => header.kid = value.as_str().map(String::from),
                "typ" => header.typ = value.as_str().map(String::from),
                "cty" => header.cty = value.as_str().map(String::from),
                "crit" => {
                    header.crit = match value {
                        Value::Array(items) => items.into_iter().filter_map(|v| v.as_str().map(String::from)).collect(),
                        _ => return Err(JoseError::HeaderInvalid("crit must be an array".into())),
                    }
                }
                "epk" => header.epk = Some(value),
                "apu" => header.apu = value.as_str().map(String::from),
                "apv" => header.apv = value.as_str().map(String::from),
                "iv" => header.iv = value.as_str().map(String::from),
                "tag" => header.tag = value.as_str().map(String::from),
                "b64" => header.b64 = value.as_bool(),
                other => header.extra.push((other.to_string(), value)),
            }
        }
        Ok(header)
    }

    /// RFC 7515 §4.1.11 / RFC 7516 §4.1.13: every name in `crit` MUST be
    /// a header field this reader actually understands and applies.
    pub fn check_critical_headers_understood(&self) -> JoseResult<()> {
        for name in &self.crit {
            if !KNOWN_FIELDS.contains(&name.as_str()) {
                return Err(JoseError::UnknownCriticalHeader(name.clone()));
            }
        }
        if self.b64.is_some() && !self.crit.iter().any(|c| c == "b64") {
            return Err(JoseError::HeaderInvalid("b64 present without listing it in crit".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_order_matches_writer_contract() {
        let header = Header::new("A128KW")
            .with_enc("A128GCM")
            .with_kid("key-1")
            .insert("custom", Value::String("value".into()));
        let json = header.to_json().unwrap();
        assert_eq!(json, r#"{"alg":"A128KW","enc":"A128GCM","kid":"key-1","custom":"value"}"#);
    }

    #[test]
    fn round_trips_through_json() {
        let header = Header::new("RS256").with_kid("k1").insert("x-custom", Value::Bool(true));
        let json = header.to_json().unwrap();
        let parsed = Header::from_json(&json).unwrap();
        assert_eq!(parsed.alg.as_deref(), Some("RS256"));
        assert_eq!(parsed.kid.as_deref(), Some("k1"));
        assert_eq!(parsed.extra, vec![("x-custom".to_string(), Value::Bool(true))]);
    }

    #[test]
    fn unknown_critical_header_is_rejected() {
        let mut header = Header::new("HS256");
        header.crit = vec!["made-up-field".to_string()];
        assert!(matches!(
            header.check_critical_headers_understood(),
            Err(JoseError::UnknownCriticalHeader(_))
        ));
    }

    #[test]
    fn unencoded_payload_requires_b64_in_crit() {
        let header = Header::new("HS256").with_unencoded_payload();
        assert!(header.check_critical_headers_understood().is_ok());
        assert_eq!(header.crit, vec!["b64".to_string()]);

        let mut bare = Header::new("HS256");
        bare.b64 = Some(false);
        assert!(matches!(
            bare.check_critical_headers_understood(),
            Err(JoseError::HeaderInvalid(_))
        ));
    }
}
