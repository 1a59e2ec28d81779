//! Secret-key evaluation of a cipher's circuit.

use rayon::prelude::*;
use tracing::debug;

use crate::cipher::{check_edge, check_operands, Cipher, Layer};
use crate::error::Result;
use crate::field::FieldElement;
use crate::keys::{PublicKey, SecretKey};
use crate::prf::{BaseDerivation, ChaChaPrf};

/// Evaluates `cipher` with the default [`ChaChaPrf`] derivation.
///
/// # Errors
/// [`crate::CipherError::CorruptCipher`] if a product layer reads a layer not
/// yet defined or an edge addresses a missing layer.
pub fn evaluate(cipher: &Cipher, sk: &SecretKey, pk: &PublicKey) -> Result<FieldElement> {
    evaluate_with(&ChaChaPrf, cipher, sk, pk)
}

/// Evaluates `cipher` in one forward pass over its layers, then sums the
/// selected edges' `weight * value[layer_id]`.
///
/// # Errors
/// See [`evaluate`].
pub fn evaluate_with<D: BaseDerivation + ?Sized>(
    derivation: &D,
    cipher: &Cipher,
    sk: &SecretKey,
    pk: &PublicKey,
) -> Result<FieldElement> {
    let layers = cipher.layers();
    let mut values: Vec<FieldElement> = Vec::with_capacity(layers.len());

    for (k, layer) in layers.iter().enumerate() {
        check_operands(k, layer)?;
        let v = match *layer {
            Layer::Base { ztag, nonce } => derivation.derive_base(sk.prf_key(), ztag, nonce),
            Layer::Product { pa, pb } => values[pa as usize] * values[pb as usize],
            Layer::Reserved { .. } => FieldElement::ZERO,
        };
        values.push(v);
    }

    let mut acc = FieldElement::ZERO;
    let mut selected = 0usize;
    for (i, e) in cipher.edges().iter().enumerate() {
        check_edge(i, e, values.len())?;
        if e.is_selected() {
            acc += e.weight * values[e.layer_id as usize];
            selected += 1;
        }
    }

    debug!(
        canon_tag = pk.canon_tag,
        layers = layers.len(),
        edges = cipher.edges().len(),
        selected,
        "evaluated cipher"
    );
    Ok(acc)
}

/// Evaluates every cipher in parallel; results keep the input order.
#[must_use]
pub fn evaluate_batch(ciphers: &[Cipher], sk: &SecretKey, pk: &PublicKey) -> Vec<Result<FieldElement>> {
    evaluate_batch_with(&ChaChaPrf, ciphers, sk, pk)
}

#[must_use]
pub fn evaluate_batch_with<D: BaseDerivation>(
    derivation: &D,
    ciphers: &[Cipher],
    sk: &SecretKey,
    pk: &PublicKey,
) -> Vec<Result<FieldElement>> {
    ciphers
        .par_iter()
        .map(|c| evaluate_with(derivation, c, sk, pk))
        .collect()
}
