//! JSON Web Encryption: key management (C8) and content encryption,
//! composed by [`crate::reader`]/[`crate::writer`] into full compact
//! serialization.

mod concat_kdf;
mod content;
mod ecdh_es;
mod keymgmt;
mod rsa_oaep;
mod zip;

pub use content::{decrypt as decrypt_content, encrypt as encrypt_content};
pub use keymgmt::{direct_cek, unwrap_cek, wrap_cek, EncryptorFactory, KeyManagementParams, KeyWrapperFactory};
pub use zip::{compress, decompress};
