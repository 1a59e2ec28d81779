//! Keyed derivation of base-layer values.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::cipher::Nonce;
use crate::field::{FieldElement, MODULUS};

/// Maps the secret PRF key and a base layer's public seed to a field value.
///
/// Implementations must be deterministic: the same `(prf_k, ztag, nonce)`
/// always yields the same element.
pub trait BaseDerivation: Sync {
    /// Value of the base layer seeded by `(ztag, nonce)`.
    fn derive_base(&self, prf_k: &[u64; 4], ztag: u64, nonce: Nonce) -> FieldElement;
}

/// Two-level ChaCha20 cascade.
///
/// The PRF key, on stream `nonce.hi`, yields a 256-bit subkey; the subkey, on
/// stream `ztag` at block `nonce.lo`, yields 128 bits that are masked to 127
/// and reduced mod P.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChaChaPrf;

const WORDS_PER_BLOCK: u128 = 16;

fn key_bytes(words: &[u64; 4]) -> [u8; 32] {
    let mut out = [0u8; 32];
    for (chunk, w) in out.chunks_exact_mut(8).zip(words) {
        chunk.copy_from_slice(&w.to_le_bytes());
    }
    out
}

impl BaseDerivation for ChaChaPrf {
    fn derive_base(&self, prf_k: &[u64; 4], ztag: u64, nonce: Nonce) -> FieldElement {
        let mut outer = ChaCha20Rng::from_seed(key_bytes(prf_k));
        outer.set_stream(nonce.hi);
        let mut subkey = [0u8; 32];
        outer.fill_bytes(&mut subkey);

        let mut inner = ChaCha20Rng::from_seed(subkey);
        inner.set_stream(ztag);
        inner.set_word_pos(u128::from(nonce.lo) * WORDS_PER_BLOCK);
        let lo = u128::from(inner.next_u64());
        let hi = u128::from(inner.next_u64());
        FieldElement::from_u128(((hi << 64) | lo) & MODULUS)
    }
}
