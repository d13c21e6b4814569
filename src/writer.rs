//! Compact-serialization writer (C10): build a header with the canonical
//! field order, sign or encrypt, and assemble the dot-joined string with a
//! single capacity-computed allocation per segment join.

use crate::alg::{Delivery, EncryptionAlgorithm, KeyManagementAlgorithm, SignatureAlgorithm};
use crate::base64url;
use crate::error::JoseResult;
use crate::header::Header;
use crate::jwe::{self, EncryptorFactory, KeyManagementParams, KeyWrapperFactory};
use crate::jwk::Jwk;
use crate::jws::SignerFactory;
use once_cell::sync::Lazy;
use std::sync::Arc;
use zeroize::Zeroizing;

/// A process-wide [`Writer`] for callers that don't need per-tenant
/// signer caches of their own.
pub static DEFAULT_WRITER: Lazy<Writer> = Lazy::new(Writer::new);

pub struct JwsRequest {
    pub header: Header,
    pub payload: Vec<u8>,
    pub key: Arc<Jwk>,
    pub alg: SignatureAlgorithm,
}

pub struct JweRequest {
    pub header: Header,
    pub payload: Vec<u8>,
    pub key: Arc<Jwk>,
    pub key_management_alg: KeyManagementAlgorithm,
    pub encryption_alg: EncryptionAlgorithm,
    pub compress: bool,
    pub apu: Option<Vec<u8>>,
    pub apv: Option<Vec<u8>>,
}

pub struct Writer {
    signers: SignerFactory,
    key_wrappers: KeyWrapperFactory,
    encryptors: EncryptorFactory,
}

impl Default for Writer {
    fn default() -> Writer {
        Writer {
            signers: SignerFactory::new(),
            key_wrappers: KeyWrapperFactory::new(),
            encryptors: EncryptorFactory::new(),
        }
    }
}

impl Writer {
    pub fn new() -> Writer {
        Writer::default()
    }

    pub fn write_jws(&self, request: JwsRequest) -> JoseResult<String> {
        let mut header = request.header;
        header.alg = Some(request.alg.name.to_string());
        header.check_critical_headers_understood()?;
        let header_json = header.to_json()?;
        let header_b64 = base64url::encode(header_json.as_bytes());

        let payload_segment = if header.b64 == Some(false) {
            String::from_utf8(request.payload.clone())
                .map_err(|_| crate::error::JoseError::HeaderInvalid("unencoded payload must be valid UTF-8".into()))?
        } else {
            base64url::encode(&request.payload)
        };

        let mut signing_input = String::with_capacity(header_b64.len() + 1 + payload_segment.len());
        signing_input.push_str(&header_b64);
        signing_input.push('.');
        signing_input.push_str(&payload_segment);

        let signer = self.signers.get(&request.key, request.alg)?;
        let signature = signer.sign(signing_input.as_bytes())?;
        let signature_b64 = base64url::encode(&signature);

        let mut out = String::with_capacity(signing_input.len() + 1 + signature_b64.len());
        out.push_str(&signing_input);
        out.push('.');
        out.push_str(&signature_b64);
        Ok(out)
    }

    pub fn write_jwe(&self, request: JweRequest) -> JoseResult<String> {
        let mut header = request.header;
        header.alg = Some(request.key_management_alg.name.to_string());
        header.enc = Some(request.encryption_alg.name.to_string());
        if request.compress {
            header.zip = Some("DEF".to_string());
        }

        let mut params = KeyManagementParams {
            apu: request.apu.clone(),
            apv: request.apv.clone(),
            ..KeyManagementParams::default()
        };

        let (cek, ek) = match request.key_management_alg.delivery() {
            Delivery::Direct => {
                let cek = jwe::direct_cek(&self.encryptors, request.key_management_alg, request.encryption_alg, &request.key, &mut params)?;
                (cek, Vec::new())
            }
            Delivery::Wrapped => {
                let cek = Zeroizing::new(random_bytes(request.encryption_alg.cek_size()));
                let ek = jwe::wrap_cek(
                    &self.key_wrappers,
                    &self.encryptors,
                    request.key_management_alg,
                    request.encryption_alg,
                    &request.key,
                    &cek,
                    &mut params,
                )?;
                (cek, ek)
            }
        };

        apply_key_management_params(&mut header, &params);

        let iv = random_bytes(request.encryption_alg.iv_size());
        let header_json = header.to_json()?;
        let header_b64 = base64url::encode(header_json.as_bytes());

        let plaintext = if request.compress {
            jwe::compress(&request.payload)?
        } else {
            request.payload
        };

        let (ciphertext, tag) = jwe::encrypt_content(request.encryption_alg, &cek, &iv, &plaintext, header_b64.as_bytes())?;

        let ek_b64 = base64url::encode(&ek);
        let iv_b64 = base64url::encode(&iv);
        let ct_b64 = base64url::encode(&ciphertext);
        let tag_b64 = base64url::encode(&tag);

        let total_len = header_b64.len() + ek_b64.len() + iv_b64.len() + ct_b64.len() + tag_b64.len() + 4;
        let mut out = String::with_capacity(total_len);
        out.push_str(&header_b64);
        out.push('.');
        out.push_str(&ek_b64);
        out.push('.');
        out.push_str(&iv_b64);
        out.push('.');
        out.push_str(&ct_b64);
        out.push('.');
        out.push_str(&tag_b64);
        Ok(out)
    }
}

fn apply_key_management_params(header: &mut Header, params: &KeyManagementParams) {
    if let Some(epk) = &params.epk {
        if let Ok(json) = epk.to_json() {
            header.epk = serde_json::from_str(&json).ok();
        }
    }
    if let Some(apu) = &params.apu {
        header.apu = Some(base64url::encode(apu));
    }
    if let Some(apv) = &params.apv {
        header.apv = Some(base64url::encode(apv));
    }
    if let Some(iv) = &params.iv {
        header.iv = Some(base64url::encode(iv));
    }
    if let Some(tag) = &params.tag {
        header.tag = Some(base64url::encode(tag));
    }
}

fn random_bytes(n: usize) -> Vec<u8> {
    use rand::RngCore;
    let mut buf = vec![0u8; n];
    rand::thread_rng().fill_bytes(&mut buf);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alg::{enc, keymgmt, sig};
    use crate::jwk::Jwk;
    use crate::policy::ValidationPolicy;
    use crate::reader::Reader;

    #[test]
    fn hmac_jws_round_trips_through_reader() {
        let key = Arc::new(Jwk::new_symmetric(vec![0x5Au8; 32]).with_kid("hmac-1"));
        let writer = Writer::new();
        let token = writer
            .write_jws(JwsRequest {
                header: Header::default(),
                payload: br#"{"sub":"alice"}"#.to_vec(),
                key: key.clone(),
                alg: sig::HS256,
            })
            .unwrap();

        let policy = ValidationPolicy::new().with_keys(crate::jwk::Jwks::new(vec![(*key).clone()]));
        let jwt = Reader::new().read(token.as_bytes(), &policy).unwrap();
        assert_eq!(jwt.claims.unwrap().subject(), Some("alice"));
    }

    #[test]
    fn dir_jwe_round_trips_through_reader() {
        let key = Arc::new(Jwk::new_symmetric(vec![0x7Cu8; 32]).with_kid("enc-1"));
        let writer = Writer::new();
        let token = writer
            .write_jwe(JweRequest {
                header: Header::default(),
                payload: b"top secret".to_vec(),
                key: key.clone(),
                key_management_alg: keymgmt::DIR,
                encryption_alg: enc::A256GCM,
                compress: false,
                apu: None,
                apv: None,
            })
            .unwrap();

        let policy = ValidationPolicy::new().with_keys(crate::jwk::Jwks::new(vec![(*key).clone()]));
        let jwt = Reader::new().read(token.as_bytes(), &policy).unwrap();
        assert_eq!(jwt.payload, b"top secret");
    }

    #[test]
    fn compressed_dir_jwe_round_trips() {
        let key = Arc::new(Jwk::new_symmetric(vec![0x11u8; 16]).with_kid("enc-2"));
        let writer = Writer::new();
        let payload = b"the quick brown fox jumps over the lazy dog".repeat(8);
        let token = writer
            .write_jwe(JweRequest {
                header: Header::default(),
                payload: payload.clone(),
                key: key.clone(),
                key_management_alg: keymgmt::DIR,
                encryption_alg: enc::A128GCM,
                compress: true,
                apu: None,
                apv: None,
            })
            .unwrap();

        let policy = ValidationPolicy::new().with_keys(crate::jwk::Jwks::new(vec![(*key).clone()]));
        let jwt = Reader::new().read(token.as_bytes(), &policy).unwrap();
        assert_eq!(jwt.payload, payload);
    }

    #[test]
    fn unencoded_payload_round_trips_literally() {
        let key = Arc::new(Jwk::new_symmetric(vec![0x5Au8; 32]).with_kid("hmac-2"));
        let writer = Writer::new();
        let token = writer
            .write_jws(JwsRequest {
                header: Header::new("HS256").with_unencoded_payload(),
                payload: b"not json, just text".to_vec(),
                key: key.clone(),
                alg: sig::HS256,
            })
            .unwrap();

        // The payload segment is the literal text, not its Base64url encoding.
        let segments: Vec<&str> = token.split('.').collect();
        assert_eq!(segments[1], "not json, just text");

        let policy = ValidationPolicy::new().with_keys(crate::jwk::Jwks::new(vec![(*key).clone()]));
        let jwt = Reader::new().read(token.as_bytes(), &policy).unwrap();
        assert_eq!(jwt.payload, b"not json, just text");
    }
}
