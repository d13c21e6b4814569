//! RSAES-OAEP key wrapping for `RSA-OAEP`/`RSA-OAEP-256/384/512`, and
//! legacy `RSA1_5` (RSAES-PKCS1-v1_5).

use crate::error::{JoseError, JoseResult};
use openssl::md::{Md, MdRef};
use openssl::pkey::{PKey, Private, Public};
use openssl::pkey_ctx::PkeyCtx;
use openssl::rsa::Padding;

fn oaep_digest(alg: &crate::alg::KeyManagementAlgorithm) -> &'static MdRef {
    match alg.name {
        "RSA-OAEP" => Md::sha1(),
        "RSA-OAEP-256" => Md::sha256(),
        "RSA-OAEP-384" => Md::sha384(),
        "RSA-OAEP-512" => Md::sha512(),
        other => unreachable!("not an OAEP algorithm: {other}"),
    }
}

pub fn wrap(alg: crate::alg::KeyManagementAlgorithm, public_key: &PKey<Public>, cek: &[u8]) -> JoseResult<Vec<u8>> {
    if alg.name == "RSA1_5" {
        let rsa = public_key.rsa().map_err(|e| JoseError::Other(e.into()))?;
        let mut out = vec![0u8; rsa.size() as usize];
        let n = rsa
            .public_encrypt(cek, &mut out, Padding::PKCS1)
            .map_err(|e| JoseError::Other(e.into()))?;
        out.truncate(n);
        return Ok(out);
    }
    let digest = oaep_digest(&alg);
    let mut ctx = PkeyCtx::new(public_key).map_err(|e| JoseError::Other(e.into()))?;
    ctx.encrypt_init().map_err(|e| JoseError::Other(e.into()))?;
    ctx.set_rsa_padding(Padding::PKCS1_OAEP).map_err(|e| JoseError::Other(e.into()))?;
    ctx.set_rsa_oaep_md(digest).map_err(|e| JoseError::Other(e.into()))?;
    ctx.set_rsa_mgf1_md(digest).map_err(|e| JoseError::Other(e.into()))?;
    let mut out = Vec::new();
    ctx.encrypt_to_vec(cek, &mut out).map_err(|e| JoseError::Other(e.into()))?;
    Ok(out)
}

pub fn unwrap(alg: crate::alg::KeyManagementAlgorithm, private_key: &PKey<Private>, wrapped: &[u8]) -> JoseResult<Vec<u8>> {
    if alg.name == "RSA1_5" {
        let rsa = private_key.rsa().map_err(|e| JoseError::Other(e.into()))?;
        let mut out = vec![0u8; rsa.size() as usize];
        let n = rsa
            .private_decrypt(wrapped, &mut out, Padding::PKCS1)
            .map_err(|_| JoseError::InvalidKeyWrap)?;
        out.truncate(n);
        return Ok(out);
    }
    let digest = oaep_digest(&alg);
    let mut ctx = PkeyCtx::new(private_key).map_err(|e| JoseError::Other(e.into()))?;
    ctx.decrypt_init().map_err(|e| JoseError::Other(e.into()))?;
    ctx.set_rsa_padding(Padding::PKCS1_OAEP).map_err(|e| JoseError::Other(e.into()))?;
    ctx.set_rsa_oaep_md(digest).map_err(|e| JoseError::Other(e.into()))?;
    ctx.set_rsa_mgf1_md(digest).map_err(|e| JoseError::Other(e.into()))?;
    let mut out = Vec::new();
    ctx.decrypt_to_vec(wrapped, &mut out).map_err(|_| JoseError::InvalidKeyWrap)?;
    Ok(out)
}
