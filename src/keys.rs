//! Scheme parameters, public key and secret key.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::bitvec::BitVector;
use crate::error::{CipherError, Result};
use crate::field::{FieldElement, MODULUS};

/// Parameter set the keys were generated under.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemeParams {
    /// Bit size of the message space the encoder targets.
    pub m_bits: u32,
    /// Plaintext modulus; residues live in `[0, b)`.
    pub b: u32,
    /// Rows of the parity matrix `H`.
    pub lpn_t: u32,
    /// Width of each parity row.
    pub lpn_n: u32,
    /// Numerator of the noise rate τ.
    pub lpn_tau_num: u32,
    /// Denominator of the noise rate τ.
    pub lpn_tau_den: u32,
    /// Width of the decoder's noise window, in bits; 0 means the row width.
    pub noise_entropy_bits: u32,
    /// Noise growth per circuit level, in bits.
    pub depth_slope_bits: u32,
    /// Raw bits of an f64, kept as-is so the pattern round-trips.
    pub tuple2_fraction_bits: u64,
    /// Upper bound on edges per cipher at encoding time.
    pub edge_budget: u32,
}

impl SchemeParams {
    #[must_use]
    pub fn tuple2_fraction(&self) -> f64 {
        f64::from_bits(self.tuple2_fraction_bits)
    }

    /// LPN noise rate τ; zero when the denominator is zero.
    #[must_use]
    pub fn noise_rate(&self) -> f64 {
        if self.lpn_tau_den == 0 {
            0.0
        } else {
            f64::from(self.lpn_tau_num) / f64::from(self.lpn_tau_den)
        }
    }

    /// Δ = ⌊P / B⌋, the spacing between encoded residues.
    #[must_use]
    pub fn plaintext_scale(&self) -> FieldElement {
        FieldElement::from_u128(MODULUS / u128::from(self.b.max(1)))
    }
}

/// Canonicalising bijection on bit positions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ubk {
    pub perm: Vec<u32>,
    pub inv: Vec<u32>,
}

impl Ubk {
    /// Identity over `n` positions.
    #[must_use]
    pub fn identity(n: usize) -> Self {
        let perm: Vec<u32> = (0..n as u32).collect();
        Self { inv: perm.clone(), perm }
    }

    /// Both tables empty, meaning identity.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.perm.is_empty() && self.inv.is_empty()
    }

    fn validate(&self, n: usize) -> Result<()> {
        if self.is_identity() {
            return Ok(());
        }
        if self.perm.len() != n || self.inv.len() != n {
            return Err(CipherError::InvalidKey(format!(
                "ubk tables have lengths {} and {}, parity rows have width {n}",
                self.perm.len(),
                self.inv.len()
            )));
        }
        for (i, &p) in self.perm.iter().enumerate() {
            let back = self.inv.get(p as usize).copied();
            if back != Some(i as u32) {
                return Err(CipherError::InvalidKey(format!(
                    "ubk inverse does not undo perm at position {i}"
                )));
            }
        }
        Ok(())
    }
}

/// Everything needed to combine ciphers, plus the public half of decoding.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    /// Parameter set the key was generated under.
    pub params: SchemeParams,
    /// Identifies the canonical form the key was issued for.
    pub canon_tag: u64,
    /// Digest of `h`, carried verbatim.
    pub h_digest: [u8; 32],
    /// Parity matrix, one row per syndrome bit.
    pub h: Vec<BitVector>,
    /// Maps residual bit positions onto the columns of `h`.
    pub ubk: Ubk,
    /// Generator whose powers make up `powg_b`.
    pub omega_b: FieldElement,
    /// `powg_b[k] = omega_b^k`.
    pub powg_b: Vec<FieldElement>,
}

impl PublicKey {
    /// Width shared by all parity rows, or 0 when `h` is empty.
    #[must_use]
    pub fn row_width(&self) -> usize {
        self.h.first().map_or(0, BitVector::len)
    }

    /// Checks the structural invariants a decoder relies on.
    ///
    /// # Errors
    /// [`CipherError::InvalidKey`] describing the first violation.
    pub fn validate(&self) -> Result<()> {
        let prm = &self.params;
        if prm.b < 2 {
            return Err(CipherError::InvalidKey(format!("plaintext modulus {} < 2", prm.b)));
        }
        if prm.lpn_tau_den == 0 {
            return Err(CipherError::InvalidKey("noise rate denominator is zero".into()));
        }

        let n = self.row_width();
        if n == 0 || n > 127 {
            return Err(CipherError::InvalidKey(format!("parity row width {n} outside 1..=127")));
        }
        if let Some(r) = self.h.iter().position(|row| row.len() != n) {
            return Err(CipherError::InvalidKey(format!(
                "parity row {r} has width {}, expected {n}",
                self.h[r].len()
            )));
        }
        if prm.noise_entropy_bits as usize > n {
            return Err(CipherError::InvalidKey(format!(
                "noise entropy {} exceeds parity row width {n}",
                prm.noise_entropy_bits
            )));
        }

        self.ubk.validate(n)?;

        if let Some(first) = self.powg_b.first() {
            if first.canonical() != FieldElement::ONE {
                return Err(CipherError::InvalidKey("powg_B[0] is not one".into()));
            }
        }
        if let Some(k) = self
            .powg_b
            .iter()
            .tuple_windows()
            .position(|(a, b)| b.canonical() != *a * self.omega_b)
        {
            return Err(CipherError::InvalidKey(format!(
                "powg_B[{}] is not powg_B[{k}] * omega_B",
                k + 1
            )));
        }
        Ok(())
    }
}

/// PRF key for base layers and the support of tolerated noise.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretKey {
    /// 256-bit key of the base-layer PRF, little-endian words.
    pub prf_k: [u64; 4],
    /// Support of the tolerated noise, as packed words.
    pub lpn_s_bits: Vec<u64>,
}

impl SecretKey {
    #[must_use]
    pub fn prf_key(&self) -> &[u64; 4] {
        &self.prf_k
    }

    /// The noise bits as a vector of `width` bits, truncated or zero-extended.
    #[must_use]
    pub fn noise_bits(&self, width: usize) -> BitVector {
        BitVector::from_words(width, self.lpn_s_bits.clone()).without_tail()
    }
}
