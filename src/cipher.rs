//! Ciphertext container: a layered arithmetic circuit plus weighted edges.

use serde::{Deserialize, Serialize};

use crate::bitvec::BitVector;
use crate::error::{CipherError, Result};
use crate::field::FieldElement;

/// Public 128-bit seed half of a base layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Nonce {
    pub lo: u64,
    pub hi: u64,
}

/// One node of the circuit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Layer {
    /// Leaf whose value is derived from the secret PRF key and `(ztag, nonce)`.
    Base { ztag: u64, nonce: Nonce },
    /// Field product of two earlier layers.
    Product { pa: u32, pb: u32 },
    /// Unknown rule tag; evaluates to zero. Tag and payload are carried
    /// verbatim.
    Reserved { tag: u8, payload: [u8; 24] },
}

impl Layer {
    /// Wire tag of a base layer.
    pub const TAG_BASE: u8 = 0;
    /// Wire tag of a product layer.
    pub const TAG_PRODUCT: u8 = 1;

    #[must_use]
    pub fn tag(&self) -> u8 {
        match self {
            Layer::Base { .. } => Self::TAG_BASE,
            Layer::Product { .. } => Self::TAG_PRODUCT,
            Layer::Reserved { tag, .. } => *tag,
        }
    }
}

/// Weighted, selector-gated tap from one layer into the cipher value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub layer_id: u32,
    /// Ordinal tag, not used for addressing.
    pub idx: u16,
    /// Opaque tag byte.
    pub ch: u8,
    pub weight: FieldElement,
    pub selector: BitVector,
}

impl Edge {
    /// Whether this edge takes part in evaluation: bit 0 of the selector.
    /// The remaining selector bits are carried but not interpreted.
    #[must_use]
    pub fn is_selected(&self) -> bool {
        self.selector.get_or_zero(0)
    }
}

/// Ordered layers plus ordered edges. Immutable once built.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cipher {
    layers: Vec<Layer>,
    edges: Vec<Edge>,
}

impl Cipher {
    /// Builds a cipher after checking that product operands point backwards
    /// and that every edge addresses an existing layer.
    ///
    /// # Errors
    /// [`CipherError::CorruptCipher`] naming the first offending layer or edge.
    pub fn new(layers: Vec<Layer>, edges: Vec<Edge>) -> Result<Self> {
        let c = Self { layers, edges };
        c.validate()?;
        Ok(c)
    }

    /// No structural checks; used by the codec, which keeps whatever is
    /// framed correctly on disk. The evaluator re-checks as it goes.
    #[must_use]
    pub fn from_parts_unchecked(layers: Vec<Layer>, edges: Vec<Edge>) -> Self {
        Self { layers, edges }
    }

    /// Zero layers, zero edges; evaluates to the additive identity.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    #[must_use]
    pub fn into_parts(self) -> (Vec<Layer>, Vec<Edge>) {
        (self.layers, self.edges)
    }

    /// Checks acyclicity, reserved tags and edge ranges.
    ///
    /// # Errors
    /// [`CipherError::CorruptCipher`].
    pub fn validate(&self) -> Result<()> {
        for (k, layer) in self.layers.iter().enumerate() {
            check_operands(k, layer)?;
        }
        for (i, e) in self.edges.iter().enumerate() {
            check_edge(i, e, self.layers.len())?;
        }
        Ok(())
    }
}

/// A product layer at index `k` may only read layers `< k`, and a reserved
/// layer may not claim a tag the wire format gives to base or product.
pub(crate) fn check_operands(k: usize, layer: &Layer) -> Result<()> {
    match *layer {
        Layer::Product { pa, pb } if pa as usize >= k || pb as usize >= k => Err(CipherError::CorruptCipher(format!(
            "layer {k} multiplies layers {pa} and {pb}, which are not defined before it"
        ))),
        Layer::Reserved { tag, .. } if tag == Layer::TAG_BASE || tag == Layer::TAG_PRODUCT => Err(
            CipherError::CorruptCipher(format!("layer {k} is reserved but carries tag {tag}")),
        ),
        _ => Ok(()),
    }
}

pub(crate) fn check_edge(i: usize, e: &Edge, nlayers: usize) -> Result<()> {
    if e.layer_id as usize >= nlayers {
        return Err(CipherError::CorruptCipher(format!(
            "edge {i} references layer {} of {nlayers}",
            e.layer_id
        )));
    }
    Ok(())
}
