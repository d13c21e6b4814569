//! Conversions from this crate's [`crate::jwk::Jwk`] model to OpenSSL's RSA/EC
//! key types. Bignum and curve-point arithmetic is delegated entirely to
//! OpenSSL; this module only moves bytes between the two representations.

use crate::error::{JoseError, JoseResult};
use crate::jwk::{EcCurve, Jwk, KeyMaterial};
use openssl::bn::BigNum;
use openssl::ec::{EcGroup, EcKey, EcPoint};
use openssl::nid::Nid;
use openssl::pkey::{Private, Public};
use openssl::rsa::Rsa;

fn bn(bytes: &[u8]) -> JoseResult<BigNum> {
    BigNum::from_slice(bytes).map_err(|e| JoseError::Other(e.into()))
}

pub fn rsa_public_from_jwk(jwk: &Jwk) -> JoseResult<Rsa<Public>> {
    match &jwk.material {
        KeyMaterial::Rsa { n, e, .. } => {
            Rsa::from_public_components(bn(n)?, bn(e)?).map_err(|err| JoseError::Other(err.into()))
        }
        _ => Err(JoseError::HeaderInvalid("expected an RSA key".into())),
    }
}

pub fn rsa_private_from_jwk(jwk: &Jwk) -> JoseResult<Rsa<Private>> {
    match &jwk.material {
        KeyMaterial::Rsa { n, e, private: Some(p) } => {
            let (dmp1, dmq1, iqmp) = match (&p.dp, &p.dq, &p.qi) {
                (Some(dp), Some(dq), Some(qi)) => (bn(dp)?, bn(dq)?, bn(qi)?),
                _ => {
                    return Err(JoseError::HeaderInvalid(
                        "RSA private key missing CRT parameters (dp/dq/qi)".into(),
                    ))
                }
            };
            let prime_p = p.p.as_ref().ok_or_else(|| JoseError::HeaderInvalid("RSA private key missing p".into()))?;
            let prime_q = p.q.as_ref().ok_or_else(|| JoseError::HeaderInvalid("RSA private key missing q".into()))?;
            Rsa::from_private_components(bn(n)?, bn(e)?, bn(&p.d)?, bn(prime_p)?, bn(prime_q)?, dmp1, dmq1, iqmp)
                .map_err(|err| JoseError::Other(err.into()))
        }
        _ => Err(JoseError::HeaderInvalid("expected an RSA private key".into())),
    }
}

fn nid_for_curve(curve: EcCurve) -> Nid {
    match curve {
        EcCurve::P256 => Nid::X9_62_PRIME256V1,
        EcCurve::P384 => Nid::SECP384R1,
        EcCurve::P521 => Nid::SECP521R1,
    }
}

fn ec_group(curve: EcCurve) -> JoseResult<EcGroup> {
    EcGroup::from_curve_name(nid_for_curve(curve)).map_err(|e| JoseError::Other(e.into()))
}

pub fn ec_public_from_jwk(jwk: &Jwk) -> JoseResult<EcKey<Public>> {
    match &jwk.material {
        KeyMaterial::Ec { curve, x, y, .. } => {
            let group = ec_group(*curve)?;
            let point = EcPoint::from_components(&group, &bn(x)?, &bn(y)?).map_err(|e| JoseError::Other(e.into()))?;
            EcKey::from_public_key(&group, &point).map_err(|e| JoseError::Other(e.into()))
        }
        _ => Err(JoseError::HeaderInvalid("expected an EC key".into())),
    }
}

pub fn ec_private_from_jwk(jwk: &Jwk) -> JoseResult<EcKey<Private>> {
    match &jwk.material {
        KeyMaterial::Ec { curve, x, y, d: Some(d) } => {
            let group = ec_group(*curve)?;
            let point = EcPoint::from_components(&group, &bn(x)?, &bn(y)?).map_err(|e| JoseError::Other(e.into()))?;
            EcKey::from_private_components(&group, bn(d)?.as_ref(), &point).map_err(|e| JoseError::Other(e.into()))
        }
        _ => Err(JoseError::HeaderInvalid("expected an EC private key".into())),
    }
}

trait EcPointFromComponents {
    fn from_components(group: &EcGroup, x: &BigNum, y: &BigNum) -> Result<EcPoint, openssl::error::ErrorStack>;
}

impl EcPointFromComponents for EcPoint {
    fn from_components(group: &EcGroup, x: &BigNum, y: &BigNum) -> Result<EcPoint, openssl::error::ErrorStack> {
        let mut point = EcPoint::new(group)?;
        let mut ctx = openssl::bn::BigNumContext::new()?;
        point.set_affine_coordinates_gfp(group, x, y, &mut ctx)?;
        Ok(point)
    }
}

/// Pad a fixed-width big-endian field (an ECDSA `r` or `s`, or an EC
/// coordinate) out to `len` bytes, for values OpenSSL returned one byte
/// short because their leading byte happened to be zero.
pub fn left_pad(bytes: &[u8], len: usize) -> Vec<u8> {
    if bytes.len() >= len {
        return bytes[bytes.len() - len..].to_vec();
    }
    let mut out = vec![0u8; len - bytes.len()];
    out.extend_from_slice(bytes);
    out
}
