//! The decoded result [`crate::reader::Reader::read`] hands back.

use crate::claims::Claims;
use crate::header::Header;

/// A fully validated token: the header it was sealed with, its payload
/// bytes, and — when the payload parsed as a JSON object — the registered
/// claims pulled out of it. `claims` is `None` for a JWS/JWE carrying an
/// opaque (non-JSON, non-nested) payload; RFC 7515/7516 never require the
/// payload to be JSON, only JWT does.
#[derive(Debug, Clone)]
pub struct Jwt {
    pub header: Header,
    pub payload: Vec<u8>,
    pub claims: Option<Claims>,
}

impl Jwt {
    pub fn payload_str(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.payload)
    }
}
