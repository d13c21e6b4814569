//! Compact-serialization reader (C9): tokenize, decode, verify/decrypt,
//! validate claims, and — for a JWE wrapping a JWS — recurse one layer.

use crate::alg::sig::KeyFamily;
use crate::alg::{EncryptionAlgorithm, KeyManagementAlgorithm, SignatureAlgorithm};
use crate::base64url;
use crate::claims::Claims;
use crate::error::{JoseError, JoseResult};
use crate::header::Header;
use crate::jwe::{self, EncryptorFactory, KeyManagementParams, KeyWrapperFactory};
use crate::jwk::Jwk;
use crate::jws::VerifierFactory;
use crate::jwt::Jwt;
use crate::policy::ValidationPolicy;
use once_cell::sync::Lazy;
use std::sync::Arc;

/// A process-wide [`Reader`] for callers that don't need per-tenant
/// verifier caches of their own.
pub static DEFAULT_READER: Lazy<Reader> = Lazy::new(Reader::new);

pub struct Reader {
    verifiers: VerifierFactory,
    key_wrappers: KeyWrapperFactory,
    encryptors: EncryptorFactory,
}

impl Default for Reader {
    fn default() -> Reader {
        Reader {
            verifiers: VerifierFactory::new(),
            key_wrappers: KeyWrapperFactory::new(),
            encryptors: EncryptorFactory::new(),
        }
    }
}

impl Reader {
    pub fn new() -> Reader {
        Reader::default()
    }

    pub fn read(&self, token: &[u8], policy: &ValidationPolicy) -> JoseResult<Jwt> {
        self.read_with_depth(token, policy, 0)
    }

    fn read_with_depth(&self, token: &[u8], policy: &ValidationPolicy, depth: u32) -> JoseResult<Jwt> {
        if depth > policy.max_nesting_depth {
            return Err(JoseError::NestedTokenLimitExceeded);
        }
        if token.len() > policy.max_token_bytes {
            return Err(JoseError::TokenTooLarge { max: policy.max_token_bytes });
        }
        let text = std::str::from_utf8(token).map_err(|_| JoseError::MalformedToken)?;
        let segments: Vec<&str> = text.split('.').collect();
        match segments.len() {
            3 => self.read_jws(&segments, policy),
            5 => self.read_jwe(&segments, policy, depth),
            _ => Err(JoseError::MalformedToken),
        }
    }

    fn read_jws(&self, segments: &[&str], policy: &ValidationPolicy) -> JoseResult<Jwt> {
        let &[h_raw, p_raw, s_raw] = segments else { unreachable!() };
        let header_bytes = base64url::decode(h_raw)?;
        let header_json = std::str::from_utf8(&header_bytes).map_err(|_| JoseError::HeaderInvalid("header is not UTF-8".into()))?;
        let header = Header::from_json(header_json)?;
        header.check_critical_headers_understood()?;

        let alg_name = header.alg.as_deref().ok_or_else(|| JoseError::HeaderInvalid("missing alg".into()))?;
        let alg = SignatureAlgorithm::try_parse(alg_name).ok_or_else(|| JoseError::UnknownAlgorithm(alg_name.to_string()))?;

        if alg.is_none() && policy.require_signature {
            return Err(JoseError::AlgorithmNotAllowed(alg_name.to_string()));
        }
        if !policy.allows_algorithm(alg) {
            return Err(JoseError::AlgorithmNotAllowed(alg_name.to_string()));
        }

        let signature = base64url::decode(s_raw)?;
        let signing_input = format!("{h_raw}.{p_raw}");

        if !alg.is_none() {
            let key = resolve_key(policy, header.kid.as_deref(), kty_for_key_family(alg.key_family()), Some(alg.name))?;
            let verifier = self.verifiers.get(&key, alg)?;
            if !verifier.verify(signing_input.as_bytes(), &signature)? {
                log::warn!("JWS signature verification failed for alg={alg} kid={:?}", header.kid);
                return Err(JoseError::InvalidSignature);
            }
        }

        // RFC 7797: when the payload is marked unencoded, the payload
        // segment carries the literal bytes rather than their Base64url
        // encoding.
        let payload = if header.b64 == Some(false) {
            p_raw.as_bytes().to_vec()
        } else {
            base64url::decode(p_raw)?
        };
        let claims = parse_claims_if_json(&payload);
        if let Some(claims) = &claims {
            policy.validate_claims(claims)?;
        }
        Ok(Jwt { header, payload, claims })
    }

    fn read_jwe(&self, segments: &[&str], policy: &ValidationPolicy, depth: u32) -> JoseResult<Jwt> {
        let &[h_raw, ek_raw, iv_raw, ct_raw, tag_raw] = segments else { unreachable!() };
        let header_bytes = base64url::decode(h_raw)?;
        let header_json = std::str::from_utf8(&header_bytes).map_err(|_| JoseError::HeaderInvalid("header is not UTF-8".into()))?;
        let header = Header::from_json(header_json)?;
        header.check_critical_headers_understood()?;

        let alg_name = header.alg.as_deref().ok_or_else(|| JoseError::HeaderInvalid("missing alg".into()))?;
        let enc_name = header.enc.as_deref().ok_or_else(|| JoseError::HeaderInvalid("missing enc".into()))?;
        let alg = KeyManagementAlgorithm::try_parse(alg_name).ok_or_else(|| JoseError::UnknownAlgorithm(alg_name.to_string()))?;
        let enc = EncryptionAlgorithm::try_parse(enc_name).ok_or_else(|| JoseError::UnknownAlgorithm(enc_name.to_string()))?;

        let key_family_hint = if alg.is_rsa() {
            "RSA"
        } else if alg.is_ecdh() {
            "EC"
        } else {
            "oct"
        };
        let key = resolve_key(policy, header.kid.as_deref(), key_family_hint, Some(alg.name))?;

        let ek = base64url::decode(ek_raw)?;
        let iv = base64url::decode(iv_raw)?;
        let ciphertext = base64url::decode(ct_raw)?;
        let tag = base64url::decode(tag_raw)?;

        let km_params = header_to_key_management_params(&header)?;
        let cek = jwe::unwrap_cek(&self.key_wrappers, &self.encryptors, alg, enc, &key, &ek, &km_params)?;

        let aad = h_raw.as_bytes();
        let plaintext = jwe::decrypt_content(enc, &cek, &iv, &ciphertext, &tag, aad).map_err(|e| {
            log::warn!("JWE content decryption failed for alg={alg} enc={enc}: {e}");
            e
        })?;

        let plaintext = match header.zip.as_deref() {
            Some("DEF") => jwe::decompress(&plaintext, policy.max_token_bytes)?,
            Some(other) => return Err(JoseError::HeaderInvalid(format!("unsupported zip: {other}"))),
            None => plaintext,
        };

        if header.cty.as_deref() == Some("JWT") {
            return self.read_with_depth(&plaintext, policy, depth + 1);
        }

        let claims = parse_claims_if_json(&plaintext);
        Ok(Jwt {
            header,
            payload: plaintext,
            claims,
        })
    }
}

fn kty_for_key_family(family: KeyFamily) -> &'static str {
    match family {
        KeyFamily::Symmetric => "oct",
        KeyFamily::Rsa => "RSA",
        KeyFamily::Ec => "EC",
        KeyFamily::None => "",
    }
}

fn resolve_key(policy: &ValidationPolicy, kid: Option<&str>, kty_hint: &str, alg_hint: Option<&str>) -> JoseResult<Arc<Jwk>> {
    policy
        .keys
        .find(kid, kty_hint, alg_hint)
        .cloned()
        .map(Arc::new)
        .ok_or_else(|| JoseError::KeyNotFound {
            kid: kid.map(String::from),
            kty: Some(kty_hint.to_string()),
        })
}

fn parse_claims_if_json(payload: &[u8]) -> Option<Claims> {
    let value: serde_json::Value = serde_json::from_slice(payload).ok()?;
    match value {
        serde_json::Value::Object(map) => Some(Claims::from_object(map)),
        _ => None,
    }
}

fn header_to_key_management_params(header: &Header) -> JoseResult<KeyManagementParams> {
    let mut params = KeyManagementParams::default();
    if let Some(epk) = &header.epk {
        let epk_json = serde_json::to_string(epk).map_err(|e| JoseError::Other(e.into()))?;
        params.epk = Some(Jwk::from_json(&epk_json)?);
    }
    if let Some(apu) = &header.apu {
        params.apu = Some(base64url::decode(apu)?);
    }
    if let Some(apv) = &header.apv {
        params.apv = Some(base64url::decode(apv)?);
    }
    if let Some(iv) = &header.iv {
        let bytes = base64url::decode(iv)?;
        params.iv = Some(bytes.try_into().map_err(|_| JoseError::HeaderInvalid("iv must be 12 bytes".into()))?);
    }
    if let Some(tag) = &header.tag {
        let bytes = base64url::decode(tag)?;
        params.tag = Some(bytes.try_into().map_err(|_| JoseError::HeaderInvalid("tag must be 16 bytes".into()))?);
    }
    Ok(params)
}
