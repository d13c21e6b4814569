//! JOSE (JWT/JWS/JWE/JWK/JWA) encoding and decoding.
//!
//! [`reader::Reader`] and [`writer::Writer`] are the entry points: compact
//! serialization in and out, built on top of the algorithm registry
//! ([`alg`]), keys ([`jwk`]), and the signing/encryption primitives
//! underneath ([`jws`], [`jwe`], [`aes`], [`hmac`], [`sha2`]).

pub mod aes;
pub mod alg;
pub mod base64url;
pub mod cache;
pub mod claims;
pub mod error;
pub mod header;
pub mod hmac;
pub mod jwe;
pub mod jwk;
pub mod jws;
pub mod jwt;
pub mod keyconv;
pub mod policy;
pub mod reader;
pub mod sha2;
pub mod writer;

pub use claims::{Audience, Claims};
pub use error::{JoseError, JoseResult};
pub use header::Header;
pub use jwk::{Jwk, Jwks};
pub use jwt::Jwt;
pub use policy::{Clock, FixedClock, SystemClock, ValidationPolicy};
pub use reader::{Reader, DEFAULT_READER};
pub use writer::{JweRequest, JwsRequest, Writer, DEFAULT_WRITER};
