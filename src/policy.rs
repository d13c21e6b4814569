//! Validation policy (section 6's configuration table): the knobs
//! [`crate::reader::Reader`] checks a decoded token against.

use crate::alg::SignatureAlgorithm;
use crate::claims::Claims;
use crate::error::{JoseError, JoseResult};
use crate::jwk::Jwks;
use std::time::{SystemTime, UNIX_EPOCH};

/// Where the reader gets "now" from. Defaults to system UTC; tests and
/// deterministic replay supply a fixed clock instead.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }
}

pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.0
    }
}

/// The options section 6 enumerates for validating a compact-serialized
/// token.
pub struct ValidationPolicy {
    pub require_signature: bool,
    pub allowed_signature_algorithms: Option<Vec<SignatureAlgorithm>>,
    pub keys: Jwks,
    pub issuers: Vec<String>,
    pub audiences: Vec<String>,
    pub clock_skew_seconds: i64,
    pub clock: Box<dyn Clock>,
    pub max_token_bytes: usize,
    pub max_nesting_depth: u32,
}

impl Default for ValidationPolicy {
    fn default() -> ValidationPolicy {
        ValidationPolicy {
            require_signature: true,
            allowed_signature_algorithms: None,
            keys: Jwks::default(),
            issuers: Vec::new(),
            audiences: Vec::new(),
            clock_skew_seconds: 0,
            clock: Box::new(SystemClock),
            max_token_bytes: 64 * 1024,
            max_nesting_depth: 4,
        }
    }
}

impl ValidationPolicy {
    pub fn new() -> ValidationPolicy {
        ValidationPolicy::default()
    }

    pub fn with_keys(mut self, keys: Jwks) -> ValidationPolicy {
        self.keys = keys;
        self
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> ValidationPolicy {
        self.clock = clock;
        self
    }

    pub fn with_clock_skew(mut self, seconds: i64) -> ValidationPolicy {
        self.clock_skew_seconds = seconds;
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> ValidationPolicy {
        self.issuers.push(issuer.into());
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> ValidationPolicy {
        self.audiences.push(audience.into());
        self
    }

    pub fn allow_algorithm(mut self, alg: SignatureAlgorithm) -> ValidationPolicy {
        self.allowed_signature_algorithms.get_or_insert_with(Vec::new).push(alg);
        self
    }

    pub fn allows_algorithm(&self, alg: SignatureAlgorithm) -> bool {
        match &self.allowed_signature_algorithms {
            Some(allowed) => allowed.contains(&alg),
            None => true,
        }
    }

    /// Step 5 of the reader's JWS path: `exp`/`nbf`/`iss`/`aud`.
    pub fn validate_claims(&self, claims: &Claims) -> JoseResult<()> {
        let now = self.clock.now();

        if let Some(exp) = claims.expires_at() {
            if now - self.clock_skew_seconds >= exp {
                return Err(JoseError::Expired);
            }
        }
        if let Some(nbf) = claims.not_before() {
            if now + self.clock_skew_seconds < nbf {
                return Err(JoseError::NotYetValid);
            }
        }
        if !self.issuers.is_empty() {
            match claims.issuer() {
                Some(iss) if self.issuers.iter().any(|allowed| allowed == iss) => {}
                Some(iss) => return Err(JoseError::IssuerNotAllowed(iss.to_string())),
                None => return Err(JoseError::IssuerNotAllowed(String::new())),
            }
        }
        if !self.audiences.is_empty() {
            match claims.audience() {
                Some(aud) if self.audiences.iter().any(|allowed| aud.contains(allowed)) => {}
                _ => return Err(JoseError::AudienceNotAllowed),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn claims_with(value: Value) -> Claims {
        match value {
            Value::Object(map) => Claims::from_object(map),
            _ => unreachable!(),
        }
    }

    #[test]
    fn rejects_expired_token() {
        let policy = ValidationPolicy::new().with_clock(Box::new(FixedClock(2_000)));
        let claims = claims_with(json!({"exp": 1_000}));
        assert!(matches!(policy.validate_claims(&claims), Err(JoseError::Expired)));
    }

    #[test]
    fn clock_skew_tolerates_small_overrun() {
        let policy = ValidationPolicy::new().with_clock(Box::new(FixedClock(1_005))).with_clock_skew(10);
        let claims = claims_with(json!({"exp": 1_000}));
        assert!(policy.validate_claims(&claims).is_ok());
    }

    #[test]
    fn rejects_not_yet_valid_token() {
        let policy = ValidationPolicy::new().with_clock(Box::new(FixedClock(500)));
        let claims = claims_with(json!({"nbf": 1_000}));
        assert!(matches!(policy.validate_claims(&claims), Err(JoseError::NotYetValid)));
    }

    #[test]
    fn enforces_issuer_allowlist() {
        let policy = ValidationPolicy::new().with_issuer("trusted-issuer");
        let ok = claims_with(json!({"iss": "trusted-issuer"}));
        let bad = claims_with(json!({"iss": "someone-else"}));
        assert!(policy.validate_claims(&ok).is_ok());
        assert!(matches!(policy.validate_claims(&bad), Err(JoseError::IssuerNotAllowed(_))));
    }

    #[test]
    fn enforces_audience_intersection() {
        let policy = ValidationPolicy::new().with_audience("svc-a");
        let ok = claims_with(json!({"aud": ["svc-a", "svc-b"]}));
        let bad = claims_with(json!({"aud": ["svc-c"]}));
        assert!(policy.validate_claims(&ok).is_ok());
        assert!(matches!(policy.validate_claims(&bad), Err(JoseError::AudienceNotAllowed)));
    }
}
