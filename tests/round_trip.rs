//! Integration coverage for the reader/writer state machines across every
//! signature algorithm and every (key-management, content-encryption) pair,
//! plus the nested-token and concrete-scenario properties.

use joseforge::alg::{enc, keymgmt, sig};
use joseforge::header::Header;
use joseforge::jwk::{EcCurve, Jwk, Jwks};
use joseforge::policy::ValidationPolicy;
use joseforge::reader::Reader;
use joseforge::writer::{JweRequest, JwsRequest, Writer};
use joseforge::JoseError;
use openssl::bn::BigNum;
use openssl::ec::{EcGroup, EcKey};
use openssl::nid::Nid;
use openssl::rsa::Rsa;
use std::sync::Arc;

fn rsa_jwk(kid: &str) -> Arc<Jwk> {
    let rsa = Rsa::generate(2048).unwrap();
    let n = rsa.n().to_vec();
    let e = rsa.e().to_vec();
    let private = joseforge::jwk::RsaPrivateParams {
        d: rsa.d().to_vec().into(),
        p: rsa.p().map(|v| v.to_vec().into()),
        q: rsa.q().map(|v| v.to_vec().into()),
        dp: rsa.dmp1().map(|v| v.to_vec().into()),
        dq: rsa.dmq1().map(|v| v.to_vec().into()),
        qi: rsa.iqmp().map(|v| v.to_vec().into()),
    };
    let jwk = Jwk::new_rsa_private(n, e, private).unwrap().with_kid(kid);
    Arc::new(jwk)
}

fn ec_jwk(kid: &str) -> Arc<Jwk> {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    let key = EcKey::generate(&group).unwrap();
    let mut ctx = openssl::bn::BigNumContext::new().unwrap();
    let mut x = BigNum::new().unwrap();
    let mut y = BigNum::new().unwrap();
    key.public_key().affine_coordinates_gfp(&group, &mut x, &mut y, &mut ctx).unwrap();
    let d = key.private_key().to_vec();
    let jwk = Jwk::new_ec_private(EcCurve::P256, x.to_vec(), y.to_vec(), d).unwrap().with_kid(kid);
    Arc::new(jwk)
}

fn hmac_jwk(kid: &str, len: usize) -> Arc<Jwk> {
    Arc::new(Jwk::new_symmetric(vec![0x42u8; len]).with_kid(kid))
}

/// Concrete scenario 2: HS256 round-trip.
#[test]
fn hs256_known_vector_round_trips() {
    let key = Arc::new(Jwk::new_symmetric(b"GdaXeVyiJwKmz5LFhcbcng".to_vec()).with_kid("hs"));
    let writer = Writer::new();
    let token = writer
        .write_jws(JwsRequest {
            header: Header::new("HS256").with_kid("hs"),
            payload: br#"{"sub":"1"}"#.to_vec(),
            key: key.clone(),
            alg: sig::HS256,
        })
        .unwrap();

    let policy = ValidationPolicy::new().with_keys(Jwks::new(vec![(*key).clone()]));
    let jwt = Reader::new().read(token.as_bytes(), &policy).unwrap();
    assert_eq!(jwt.claims.unwrap().subject(), Some("1"));
}

/// Concrete scenario 3: RS256, tamper one bit of the signature.
#[test]
fn rs256_tampered_signature_is_rejected() {
    let key = rsa_jwk("rsa-1");
    let writer = Writer::new();
    let token = writer
        .write_jws(JwsRequest {
            header: Header::new("RS256").with_kid("rsa-1"),
            payload: br#"{"sub":"alice"}"#.to_vec(),
            key: key.clone(),
            alg: sig::RS256,
        })
        .unwrap();

    let mut segments: Vec<String> = token.split('.').map(String::from).collect();
    let mut sig_bytes = segments[2].clone().into_bytes();
    sig_bytes[0] ^= 0x01;
    segments[2] = String::from_utf8(sig_bytes).unwrap();
    let tampered = segments.join(".");

    let policy = ValidationPolicy::new().with_keys(Jwks::new(vec![(*key).clone()]));
    let result = Reader::new().read(tampered.as_bytes(), &policy);
    assert!(matches!(result, Err(JoseError::InvalidSignature) | Err(JoseError::Base64Invalid(_))));
}

/// Every signature algorithm round-trips through the writer then reader.
#[test]
fn every_signature_algorithm_round_trips() {
    let rsa = rsa_jwk("rsa-sig");
    let ec256 = ec_jwk("ec-sig");
    let hmac = hmac_jwk("hmac-sig", 64);

    let cases: &[(sig::SignatureAlgorithm, &Arc<Jwk>)] = &[
        (sig::HS256, &hmac),
        (sig::HS384, &hmac),
        (sig::HS512, &hmac),
        (sig::RS256, &rsa),
        (sig::RS384, &rsa),
        (sig::RS512, &rsa),
        (sig::PS256, &rsa),
        (sig::PS384, &rsa),
        (sig::PS512, &rsa),
        (sig::ES256, &ec256),
    ];

    for (alg, key) in cases {
        let writer = Writer::new();
        let token = writer
            .write_jws(JwsRequest {
                header: Header::new(alg.name).with_kid(key.kid.clone().unwrap_or_default()),
                payload: br#"{"sub":"round-trip"}"#.to_vec(),
                key: (*key).clone(),
                alg: *alg,
            })
            .unwrap();

        let policy = ValidationPolicy::new().with_keys(Jwks::new(vec![(***key).clone()]));
        let jwt = Reader::new().read(token.as_bytes(), &policy).unwrap_or_else(|e| panic!("{} failed: {e}", alg.name));
        assert_eq!(jwt.claims.unwrap().subject(), Some("round-trip"));
    }
}

/// Concrete scenario 4: JWE A128CBC-HS256 + dir.
#[test]
fn a128cbc_hs256_dir_known_plaintext_round_trips() {
    let key = hmac_jwk("dir-1", 32);
    let writer = Writer::new();
    let token = writer
        .write_jwe(JweRequest {
            header: Header::new("dir").with_kid("dir-1"),
            payload: b"Live long and prosper.".to_vec(),
            key: key.clone(),
            key_management_alg: keymgmt::DIR,
            encryption_alg: enc::A128CBC_HS256,
            compress: false,
            apu: None,
            apv: None,
        })
        .unwrap();

    let policy = ValidationPolicy::new().with_keys(Jwks::new(vec![(*key).clone()]));
    let jwt = Reader::new().read(token.as_bytes(), &policy).unwrap();
    assert_eq!(jwt.payload, b"Live long and prosper.");

    let mut segments: Vec<String> = token.split('.').map(String::from).collect();
    let mut tag_bytes = segments[4].clone().into_bytes();
    tag_bytes[0] ^= 0x01;
    segments[4] = String::from_utf8(tag_bytes).unwrap();
    let tampered = segments.join(".");
    let result = Reader::new().read(tampered.as_bytes(), &policy);
    assert!(result.is_err());
}

/// Every (key-management, content-encryption) pairing the registry
/// supports round-trips, using a key of the right shape for each family.
#[test]
fn every_key_management_and_encryption_pairing_round_trips() {
    let symmetric128 = hmac_jwk("oct-128", 16);
    let symmetric192 = hmac_jwk("oct-192", 24);
    let symmetric256 = hmac_jwk("oct-256", 32);
    let rsa = rsa_jwk("rsa-kw");
    let ec256 = ec_jwk("ec-kw");

    let kw_cases: &[(keymgmt::KeyManagementAlgorithm, &Arc<Jwk>)] = &[
        (keymgmt::DIR, &symmetric256),
        (keymgmt::A128KW, &symmetric128),
        (keymgmt::A192KW, &symmetric192),
        (keymgmt::A256KW, &symmetric256),
        (keymgmt::A128GCMKW, &symmetric128),
        (keymgmt::A256GCMKW, &symmetric256),
        (keymgmt::RSA_OAEP, &rsa),
        (keymgmt::RSA_OAEP_256, &rsa),
        (keymgmt::ECDH_ES, &ec256),
        (keymgmt::ECDH_ES_A128KW, &ec256),
    ];

    for (kw_alg, key) in kw_cases {
        for enc_alg in [enc::A128CBC_HS256, enc::A256GCM] {
            let writer = Writer::new();
            let token = writer
                .write_jwe(JweRequest {
                    header: Header::default().with_kid(key.kid.clone().unwrap_or_default()),
                    payload: b"payload for a pairing test".to_vec(),
                    key: (*key).clone(),
                    key_management_alg: *kw_alg,
                    encryption_alg: enc_alg,
                    compress: false,
                    apu: None,
                    apv: None,
                })
                .unwrap_or_else(|e| panic!("{}+{} write failed: {e}", kw_alg.name, enc_alg.name));

            let policy = ValidationPolicy::new().with_keys(Jwks::new(vec![(***key).clone()]));
            let jwt = Reader::new()
                .read(token.as_bytes(), &policy)
                .unwrap_or_else(|e| panic!("{}+{} read failed: {e}", kw_alg.name, enc_alg.name));
            assert_eq!(jwt.payload, b"payload for a pairing test");
        }
    }
}

/// Concrete scenario 5: ECDH-ES+A128KW between two independently
/// generated P-256 keys.
#[test]
fn ecdh_es_a128kw_round_trips_between_two_p256_keys() {
    let receiver = ec_jwk("receiver");
    let writer = Writer::new();
    let token = writer
        .write_jwe(JweRequest {
            header: Header::default().with_kid("receiver"),
            payload: b"only the receiver can read this".to_vec(),
            key: receiver.clone(),
            key_management_alg: keymgmt::ECDH_ES_A128KW,
            encryption_alg: enc::A128CBC_HS256,
            compress: false,
            apu: None,
            apv: None,
        })
        .unwrap();

    let policy = ValidationPolicy::new().with_keys(Jwks::new(vec![(*receiver).clone()]));
    let jwt = Reader::new().read(token.as_bytes(), &policy).unwrap();
    assert_eq!(jwt.payload, b"only the receiver can read this");
}

/// A JWE whose plaintext is itself a JWS (`cty=JWT`) is unwrapped one
/// layer by the reader.
#[test]
fn nested_jws_inside_jwe_recurses_one_layer() {
    let sig_key = hmac_jwk("inner-sig", 32);
    let inner = Writer::new()
        .write_jws(JwsRequest {
            header: Header::new("HS256").with_kid("inner-sig"),
            payload: br#"{"sub":"nested"}"#.to_vec(),
            key: sig_key.clone(),
            alg: sig::HS256,
        })
        .unwrap();

    let enc_key = hmac_jwk("outer-enc", 32);
    let outer = Writer::new()
        .write_jwe(JweRequest {
            header: Header::new("dir").with_kid("outer-enc").with_cty("JWT"),
            payload: inner.into_bytes(),
            key: enc_key.clone(),
            key_management_alg: keymgmt::DIR,
            encryption_alg: enc::A256GCM,
            compress: false,
            apu: None,
            apv: None,
        })
        .unwrap();

    let policy = ValidationPolicy::new().with_keys(Jwks::new(vec![(*sig_key).clone(), (*enc_key).clone()]));
    let jwt = Reader::new().read(outer.as_bytes(), &policy).unwrap();
    assert_eq!(jwt.claims.unwrap().subject(), Some("nested"));
}

/// Concrete scenario 6 duplicated here at the reader/writer boundary
/// (unit coverage already lives in `policy.rs`): expired token rejected,
/// tolerant clock skew accepted.
#[test]
fn expired_token_is_rejected_by_default_and_accepted_under_skew() {
    let key = hmac_jwk("exp-key", 32);
    let now = 1_700_000_000i64;
    let token = Writer::new()
        .write_jws(JwsRequest {
            header: Header::new("HS256").with_kid("exp-key"),
            payload: format!(r#"{{"exp":{}}}"#, now - 10).into_bytes(),
            key: key.clone(),
            alg: sig::HS256,
        })
        .unwrap();

    let strict = ValidationPolicy::new()
        .with_keys(Jwks::new(vec![(*key).clone()]))
        .with_clock(Box::new(joseforge::policy::FixedClock(now)));
    assert!(matches!(Reader::new().read(token.as_bytes(), &strict), Err(JoseError::Expired)));

    let tolerant = ValidationPolicy::new()
        .with_keys(Jwks::new(vec![(*key).clone()]))
        .with_clock(Box::new(joseforge::policy::FixedClock(now)))
        .with_clock_skew(15);
    assert!(Reader::new().read(token.as_bytes(), &tolerant).is_ok());
}
