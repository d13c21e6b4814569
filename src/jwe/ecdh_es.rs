//! ECDH-ES key agreement (RFC 7518 §4.6): ephemeral-static Diffie-Hellman
//! over the recipient's EC key, with the shared secret run through
//! [`super::concat_kdf`].

use crate::error::{JoseError, JoseResult};
use crate::jwk::{EcCurve, Jwk};
use crate::keyconv;
use openssl::derive::Deriver;
use openssl::ec::EcKey;
use openssl::pkey::{PKey, Private, Public};

/// The ephemeral key this crate generated for one encryption, and the
/// shared secret derived against the recipient's static public key.
pub struct EphemeralAgreement {
    pub epk_public: Jwk,
    pub shared_secret: Vec<u8>,
}

/// Writer side: generate a fresh ephemeral key on `recipient`'s curve and
/// derive the shared secret against it.
pub fn agree_ephemeral(recipient: &Jwk) -> JoseResult<EphemeralAgreement> {
    let curve = match &recipient.material {
        crate::jwk::KeyMaterial::Ec { curve, .. } => *curve,
        _ => return Err(JoseError::HeaderInvalid("ECDH-ES requires an EC key".into())),
    };
    let recipient_public = keyconv::ec_public_from_jwk(recipient)?;
    agree_ephemeral_with(curve, &recipient_public)
}

/// As [`agree_ephemeral`], but takes an already-converted recipient public
/// key. [`crate::jwe::keymgmt::Encryptor`] holds this conversion so a
/// cached engine doesn't re-derive an `EcKey` from JWK coordinates on every
/// call.
pub fn agree_ephemeral_with(curve: EcCurve, recipient_public: &EcKey<Public>) -> JoseResult<EphemeralAgreement> {
    let group = recipient_public.group();
    let ephemeral = EcKey::generate(group).map_err(|e| JoseError::Other(e.into()))?;

    let shared_secret = derive_shared_secret(&ephemeral, recipient_public)?;

    let mut ctx = openssl::bn::BigNumContext::new().map_err(|e| JoseError::Other(e.into()))?;
    let mut x = openssl::bn::BigNum::new().map_err(|e| JoseError::Other(e.into()))?;
    let mut y = openssl::bn::BigNum::new().map_err(|e| JoseError::Other(e.into()))?;
    ephemeral
        .public_key()
        .affine_coordinates_gfp(group, &mut x, &mut y, &mut ctx)
        .map_err(|e| JoseError::Other(e.into()))?;
    let coord_len = curve.coordinate_len();
    let epk_public = Jwk::new_ec_public(
        curve,
        keyconv::left_pad(&x.to_vec(), coord_len),
        keyconv::left_pad(&y.to_vec(), coord_len),
    )?;

    Ok(EphemeralAgreement { epk_public, shared_secret })
}

/// Reader side: derive the shared secret between our static private key
/// and the `epk` the sender placed in the header.
pub fn agree_static(recipient_private: &Jwk, epk: &Jwk) -> JoseResult<Vec<u8>> {
    let static_key = keyconv::ec_private_from_jwk(recipient_private)?;
    agree_static_with(&static_key, epk)
}

/// As [`agree_static`], but takes an already-converted static private key.
pub fn agree_static_with(static_key: &EcKey<Private>, epk: &Jwk) -> JoseResult<Vec<u8>> {
    let ephemeral_public = keyconv::ec_public_from_jwk(epk)?;
    derive_shared_secret(static_key, &ephemeral_public)
}

fn derive_shared_secret<T, U>(private: &EcKey<T>, public: &EcKey<U>) -> JoseResult<Vec<u8>>
where
    T: openssl::pkey::HasPrivate,
    U: openssl::pkey::HasPublic,
{
    let private_pkey = PKey::from_ec_key(private.clone()).map_err(|e| JoseError::Other(e.into()))?;
    let public_pkey = PKey::from_ec_key(public.clone()).map_err(|e| JoseError::Other(e.into()))?;
    let mut deriver = Deriver::new(&private_pkey).map_err(|e| JoseError::Other(e.into()))?;
    deriver.set_peer(&public_pkey).map_err(|e| JoseError::Other(e.into()))?;
    deriver.derive_to_vec().map_err(|e| JoseError::Other(e.into()))
}

/// The coordinate width OpenSSL uses for a curve, exposed for callers
/// building `apu`/`apv` or validating `epk` shape.
pub fn coordinate_len(curve: EcCurve) -> usize {
    curve.coordinate_len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ephemeral_and_static_sides_agree() {
        let group = openssl::ec::EcGroup::from_curve_name(openssl::nid::Nid::X9_62_PRIME256V1).unwrap();
        let generated = EcKey::generate(&group).unwrap();
        let mut ctx = openssl::bn::BigNumContext::new().unwrap();
        let mut x = openssl::bn::BigNum::new().unwrap();
        let mut y = openssl::bn::BigNum::new().unwrap();
        generated
            .public_key()
            .affine_coordinates_gfp(&group, &mut x, &mut y, &mut ctx)
            .unwrap();
        let d = generated.private_key().to_vec();
        let recipient_jwk = Jwk::new_ec_private(
            EcCurve::P256,
            keyconv::left_pad(&x.to_vec(), 32),
            keyconv::left_pad(&y.to_vec(), 32),
            keyconv::left_pad(&d, 32),
        )
        .unwrap();

        let agreement = agree_ephemeral(&recipient_jwk).unwrap();
        let recovered = agree_static(&recipient_jwk, &agreement.epk_public).unwrap();
        assert_eq!(agreement.shared_secret, recovered);
    }
}
