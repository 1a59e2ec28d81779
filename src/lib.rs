//! Circuit ciphers over GF(2¹²⁷−1): load, evaluate, add and decode.
//!
//! A [`Cipher`] is a small arithmetic circuit. Its base layers take values
//! from a keyed PRF, its product layers multiply earlier layers, and its
//! selected edges sum weighted layer values into one field element. With the
//! secret key that element decodes to a residue mod `B`. Concatenating two
//! ciphers adds their plaintexts without any key material.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]

pub mod algebra;
pub mod bitvec;
pub mod cipher;
pub mod circuit;
pub mod codec;
pub mod decoder;
pub mod error;
pub mod field;
pub mod keys;
pub mod prf;
pub mod scheme;

#[cfg(test)]
mod fixtures;

pub use algebra::{combine, combine_all, CipherAlgebra};
pub use bitvec::BitVector;
pub use cipher::{Cipher, Edge, Layer, Nonce};
pub use circuit::{evaluate, evaluate_batch};
pub use codec::{load_ciphers, load_public_key, load_secret_key, save_ciphers, save_public_key, save_secret_key};
pub use decoder::{decode, ResidueDecoder, SyndromeDecoder};
pub use error::{Artifact, CipherError, Result};
pub use field::FieldElement;
pub use keys::{PublicKey, SchemeParams, SecretKey, Ubk};
pub use prf::{BaseDerivation, ChaChaPrf};
pub use scheme::Scheme;
