//! Homomorphic addition by structural concatenation.

use tracing::debug;

use crate::cipher::{Cipher, Edge, Layer};
use crate::keys::PublicKey;

/// Adds ciphers under one public key. Needs no secret material.
pub struct CipherAlgebra<'k> {
    pk: &'k PublicKey,
}

/// `a + b`; see [`CipherAlgebra::add`].
#[must_use]
pub fn combine(pk: &PublicKey, a: &Cipher, b: &Cipher) -> Cipher {
    CipherAlgebra::new(pk).add(a, b)
}

/// Sum of all `cts`; see [`CipherAlgebra::sum`].
#[must_use]
pub fn combine_all(pk: &PublicKey, cts: &[Cipher]) -> Cipher {
    CipherAlgebra::new(pk).sum(cts)
}

impl<'k> CipherAlgebra<'k> {
    #[must_use]
    pub fn new(pk: &'k PublicKey) -> Self {
        Self { pk }
    }

    /// Layers of `a` then `b`, edges of `a` then `b`. Every layer index inside
    /// `b` (edge targets and product operands) moves up by `|a.layers|`, so
    /// the result evaluates to `eval(a) + eval(b)`.
    ///
    /// # Panics
    /// If `a` has more layers than `u32` can count.
    #[must_use]
    pub fn add(&self, a: &Cipher, b: &Cipher) -> Cipher {
        let offset = u32::try_from(a.layers().len())
            .expect("Arithmetic overflow occurred in add while counting layers");
        // an index already out of range stays out of range; evaluation reports it
        let shift = |id: u32| id.saturating_add(offset);

        let mut layers = Vec::with_capacity(a.layers().len() + b.layers().len());
        layers.extend_from_slice(a.layers());
        layers.extend(b.layers().iter().map(|l| match *l {
            Layer::Product { pa, pb } => Layer::Product {
                pa: shift(pa),
                pb: shift(pb),
            },
            ref other => other.clone(),
        }));

        let mut edges = Vec::with_capacity(a.edges().len() + b.edges().len());
        edges.extend_from_slice(a.edges());
        edges.extend(b.edges().iter().map(|e| Edge {
            layer_id: shift(e.layer_id),
            ..e.clone()
        }));

        debug!(
            canon_tag = self.pk.canon_tag,
            layers = layers.len(),
            edges = edges.len(),
            "combined ciphers"
        );
        Cipher::from_parts_unchecked(layers, edges)
    }

    /// Left fold of [`Self::add`]; the empty sum is the empty cipher.
    #[must_use]
    pub fn sum(&self, cts: &[Cipher]) -> Cipher {
        match cts {
            [] => Cipher::empty(),
            [first, rest @ ..] => rest.iter().fold(first.clone(), |acc, c| self.add(&acc, c)),
        }
    }
}
