//! The crate's single error type.
//!
//! Internal helpers are free to build up results with `anyhow::bail!` and
//! friends; the public surface always converts down to [`JoseError`] at the
//! boundary via [`wrap`].

use thiserror::Error;

/// Every way a [`crate::reader::Reader`] or [`crate::writer::Writer`] call
/// can fail, plus the primitive-layer errors that bubble up unchanged.
#[derive(Debug, Error)]
pub enum JoseError {
    #[error("token is not a well-formed compact JWS or JWE")]
    MalformedToken,

    #[error("token exceeds the configured maximum of {max} bytes")]
    TokenTooLarge { max: usize },

    #[error("invalid base64url: {0}")]
    Base64Invalid(String),

    #[error("invalid header: {0}")]
    HeaderInvalid(String),

    #[error("unknown algorithm identifier: {0}")]
    UnknownAlgorithm(String),

    #[error("algorithm not allowed by policy: {0}")]
    AlgorithmNotAllowed(String),

    #[error("unknown critical header: {0}")]
    UnknownCriticalHeader(String),

    #[error("no key found for kid={kid:?} kty={kty:?}")]
    KeyNotFound {
        kid: Option<String>,
        kty: Option<String>,
    },

    #[error("signature verification failed")]
    InvalidSignature,

    #[error("authentication tag verification failed")]
    InvalidTag,

    #[error("key wrap integrity check failed")]
    InvalidKeyWrap,

    #[error("key too small: need at least {min_bits} bits, got {actual_bits}")]
    KeyTooSmall { min_bits: usize, actual_bits: usize },

    #[error("key size mismatch: expected {expected} bytes, got {actual}")]
    KeySizeMismatch { expected: usize, actual: usize },

    #[error("unsupported elliptic curve: {0}")]
    UnsupportedCurve(String),

    #[error("destination buffer too small: need {needed} bytes, have {available}")]
    DestinationTooSmall { needed: usize, available: usize },

    #[error("token expired")]
    Expired,

    #[error("token not yet valid")]
    NotYetValid,

    #[error("issuer not allowed: {0}")]
    IssuerNotAllowed(String),

    #[error("audience not allowed")]
    AudienceNotAllowed,

    #[error("nested token depth limit exceeded")]
    NestedTokenLimitExceeded,

    #[error("operation object has been disposed")]
    Disposed,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convert an `anyhow` chain into a [`JoseError`], pulling out a concrete
/// variant if one was stashed in the chain via `anyhow::Error::from`, and
/// otherwise falling back to [`JoseError::MalformedToken`] for parsing-style
/// closures or [`JoseError::Other`] for everything else.
pub(crate) fn wrap(err: anyhow::Error) -> JoseError {
    match err.downcast::<JoseError>() {
        Ok(e) => e,
        Err(e) => JoseError::Other(e),
    }
}

pub type JoseResult<T> = Result<T, JoseError>;
