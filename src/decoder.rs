//! Noise-tolerant reduction of an evaluated value to a plaintext residue.

use std::ops::RangeInclusive;

use itertools::Itertools;
use tracing::{debug, warn};

use crate::bitvec::BitVector;
use crate::error::{CipherError, Result};
use crate::field::{FieldElement, MODULUS};
use crate::keys::{PublicKey, SecretKey, Ubk};

/// Maps an evaluated field value to a residue in `[0, B)`.
pub trait ResidueDecoder: Sync {
    /// # Errors
    /// [`CipherError::DecodeFailure`] when no residue is within tolerance,
    /// [`CipherError::InvalidKey`] when the key cannot drive this decoder.
    fn decode(&self, pk: &PublicKey, sk: &SecretKey, value: FieldElement) -> Result<u32>;
}

/// Bounded-distance decoder over the parity matrix `H`.
///
/// Residue `r` is a candidate when `value − r·Δ` is within the noise window
/// (`2^noise_entropy_bits`, centred). The residual's bit pattern, moved to
/// canonical positions by `ubk`, is checked against `H`: the observed
/// syndrome `H·y` and the syndrome predicted from the secret noise support
/// `H·(y ∧ s)` agree exactly when the residual lies on the support. The
/// candidate with the fewest disagreeing syndrome bits wins if that count is
/// at most `⌊|H| · τ⌋`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SyndromeDecoder;

/// Decodes with [`SyndromeDecoder`].
///
/// # Errors
/// See [`ResidueDecoder::decode`].
pub fn decode(pk: &PublicKey, sk: &SecretKey, value: FieldElement) -> Result<u32> {
    SyndromeDecoder.decode(pk, sk, value)
}

impl SyndromeDecoder {
    /// Largest accepted syndrome distance for `pk`.
    #[must_use]
    pub fn tolerance(pk: &PublicKey) -> u32 {
        let prm = &pk.params;
        if prm.lpn_tau_den == 0 {
            return 0;
        }
        let t = pk.h.len() as u64;
        (t * u64::from(prm.lpn_tau_num) / u64::from(prm.lpn_tau_den)) as u32
    }

    /// Width `n` of the parity rows and noise window bits `w`.
    fn geometry(pk: &PublicKey) -> Result<(usize, u32)> {
        if pk.params.b < 2 {
            return Err(CipherError::InvalidKey(format!(
                "plaintext modulus {} < 2",
                pk.params.b
            )));
        }
        let n = pk.row_width();
        if n == 0 || n > 127 {
            return Err(CipherError::InvalidKey(format!("parity row width {n} outside 1..=127")));
        }
        let w = match pk.params.noise_entropy_bits {
            0 => n as u32,
            bits => bits.min(n as u32),
        };
        Ok((n, w))
    }
}

impl ResidueDecoder for SyndromeDecoder {
    fn decode(&self, pk: &PublicKey, sk: &SecretKey, value: FieldElement) -> Result<u32> {
        let (n, w) = Self::geometry(pk)?;
        let radius = 1u128 << w;
        let delta = pk.params.plaintext_scale();
        let tolerance = Self::tolerance(pk);
        let support = sk.noise_bits(n);

        let candidates = candidate_residues(value.to_canonical_u128(), delta.to_canonical_u128(), pk.params.b, radius);
        let mut best: Option<(u32, u128, u32)> = None;
        let mut visited = 0usize;
        for r in candidates {
            visited += 1;
            let e = centred_magnitude(value - delta * FieldElement::from_u64(u64::from(r)));
            if e >= radius {
                continue;
            }
            let y = canonicalise(&BitVector::from_low_bits(n, e), &pk.ubk)?;
            let dist = syndrome_distance(&pk.h, &y, &y.and(&support));

            let key = (dist, e, r);
            if best.map_or(true, |b| key < b) {
                best = Some(key);
            }
        }

        match best {
            Some((dist, _, r)) if dist <= tolerance => {
                debug!(candidates = visited, distance = dist, tolerance, "decoded residue");
                Ok(r)
            }
            _ => {
                let best = best.map(|(d, _, _)| d);
                warn!(candidates = visited, ?best, tolerance, "no residue within tolerance");
                Err(CipherError::DecodeFailure { best, tolerance })
            }
        }
    }
}

/// Residues `r < b` whose `r·Δ` lies within `radius` of `value`, of
/// `value − P` or of `value + P`, ascending and without repeats. `value` is
/// canonical. Produced lazily since the full window can span every residue.
fn candidate_residues(value: u128, delta: u128, b: u32, radius: u128) -> impl Iterator<Item = u32> {
    let last = u128::from(b - 1);
    let span = |lo: u128, hi: u128| -> RangeInclusive<u32> {
        let r_lo = lo.div_ceil(delta);
        let r_hi = (hi / delta).min(last);
        if r_lo <= r_hi {
            // r_hi ≤ last < 2^32
            r_lo as u32..=r_hi as u32
        } else {
            RangeInclusive::new(1, 0)
        }
    };

    let reach = radius - 1;
    let near = span(value.saturating_sub(reach), value.saturating_add(reach));
    // value − P is negative, only its upper reach can meet r·Δ ≥ 0
    let below = match (value + reach).checked_sub(MODULUS) {
        Some(hi) => span(0, hi),
        None => RangeInclusive::new(1, 0),
    };
    let above = value + MODULUS;
    let above = span(above.saturating_sub(reach), above.saturating_add(reach));

    [near, below, above].into_iter().kmerge().dedup()
}

/// Distance of `d` from zero in the centred range `(-P/2, P/2]`.
fn centred_magnitude(d: FieldElement) -> u128 {
    let x = d.to_canonical_u128();
    if x <= MODULUS / 2 {
        x
    } else {
        MODULUS - x
    }
}

/// Moves bit `j` to position `perm[j]`.
fn canonicalise(x: &BitVector, ubk: &Ubk) -> Result<BitVector> {
    if ubk.is_identity() {
        return Ok(x.clone());
    }
    let mut y = BitVector::make(x.len());
    for (j, &p) in ubk.perm.iter().enumerate().take(x.len()) {
        if x.get(j)? {
            y.set(p as usize, true)?;
        }
    }
    Ok(y)
}

/// Number of rows of `h` on which the syndromes of `observed` and
/// `predicted` disagree.
fn syndrome_distance(h: &[BitVector], observed: &BitVector, predicted: &BitVector) -> u32 {
    h.iter()
        .filter(|row| row.parity_dot(observed) != row.parity_dot(predicted))
        .count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn encoded(pk: &PublicKey, m: u32, noise: i64) -> FieldElement {
        fixtures::encoded_value(pk, m, noise)
    }

    #[test]
    fn test_exact_values_decode() {
        let (pk, sk) = fixtures::key_pair(10);
        for m in 0..pk.params.b {
            assert_eq!(decode(&pk, &sk, encoded(&pk, m, 0)).unwrap(), m);
        }
    }

    #[test]
    fn test_small_noise_tolerated() {
        let (pk, sk) = fixtures::key_pair(11);
        for (m, noise) in [(0, 1), (0, -1), (5, 1000), (15, -4000), (7, 65_535)] {
            assert_eq!(decode(&pk, &sk, encoded(&pk, m, noise)).unwrap(), m, "m={m} noise={noise}");
        }
    }

    #[test]
    fn test_noise_outside_window_fails() {
        let (pk, sk) = fixtures::key_pair(12);
        let noise = 1i64 << pk.params.noise_entropy_bits;
        let err = decode(&pk, &sk, encoded(&pk, 3, noise)).unwrap_err();
        assert!(matches!(err, CipherError::DecodeFailure { best: None, .. }));
    }

    #[test]
    fn test_random_value_fails() {
        let (pk, sk) = fixtures::key_pair(13);
        let v = FieldElement::from_u128(0x1234_5678_9abc_def0_1122_3344_5566_7788);
        assert!(matches!(decode(&pk, &sk, v), Err(CipherError::DecodeFailure { .. })));
    }

    #[test]
    fn test_noise_off_support_fails() {
        let (mut pk, mut sk) = fixtures::key_pair(14);
        let n = pk.row_width();
        // every row sees every position, so a single stray bit flips all parities
        pk.h = vec![BitVector::from_words(n, vec![u64::MAX; 2]); pk.h.len()];
        pk.ubk = Ubk::default();
        sk.lpn_s_bits = vec![0xfff];

        assert_eq!(decode(&pk, &sk, encoded(&pk, 4, 0x800)).unwrap(), 4);
        let err = decode(&pk, &sk, encoded(&pk, 4, 0x1000)).unwrap_err();
        match err {
            CipherError::DecodeFailure { best, tolerance } => {
                assert_eq!(best, Some(pk.h.len() as u32));
                assert_eq!(tolerance, SyndromeDecoder::tolerance(&pk));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_wraparound_near_zero() {
        let (pk, sk) = fixtures::key_pair(15);
        // 0·Δ − 5 wraps to P − 5
        assert_eq!(decode(&pk, &sk, encoded(&pk, 0, -5)).unwrap(), 0);
    }

    #[test]
    fn test_candidates() {
        let b = 16;
        let delta = MODULUS / 16;
        let list = |value, radius| candidate_residues(value, delta, b, radius).collect::<Vec<_>>();
        assert_eq!(list(3 * delta + 7, 1 << 8), vec![3]);
        assert_eq!(list(3 * delta - 7, 1 << 8), vec![3]);
        assert_eq!(list(MODULUS - 3, 1 << 8), vec![0]);
        assert!(list(3 * delta + (1 << 20), 1 << 8).is_empty());
        // a window wider than Δ reaches every residue once, in order
        assert_eq!(list(5, 1 << 127), (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn test_candidates_are_lazy_for_huge_moduli() {
        let b = 1u32 << 31;
        let delta = MODULUS / u128::from(b);
        // every residue is reachable; only the head is ever pulled
        let head: Vec<u32> = candidate_residues(delta * 7, delta, b, 1 << 127).take(4).collect();
        assert_eq!(head, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_canonicalise_moves_bits() {
        let ubk = Ubk {
            perm: vec![2, 0, 1],
            inv: vec![1, 2, 0],
        };
        let x = BitVector::from_low_bits(3, 0b001);
        assert_eq!(canonicalise(&x, &ubk).unwrap(), BitVector::from_low_bits(3, 0b100));
    }

    #[test]
    fn test_bad_geometry_is_invalid_key() {
        let (mut pk, sk) = fixtures::key_pair(16);
        pk.h.clear();
        assert!(matches!(decode(&pk, &sk, FieldElement::ZERO), Err(CipherError::InvalidKey(_))));
    }
}
