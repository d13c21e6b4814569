//! Algorithm registry (C6): three closed enums of static singletons,
//! `SignatureAlgorithm`, `KeyManagementAlgorithm`, `EncryptionAlgorithm`.
//! Equality is by `id`, not by name or pointer, per section 9's note that
//! reference-identity comparisons in the distilled source are an
//! implementation detail that must not leak into this crate's contract.

pub mod enc;
pub mod keymgmt;
mod pack;
pub mod sig;

pub use enc::{EncryptionAlgorithm, Family as EncryptionFamily};
pub use keymgmt::{Delivery, KeyManagementAlgorithm};
pub use sig::{KeyFamily, SignatureAlgorithm, SignaturePadding};
