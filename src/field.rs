//! Prime-field element over P = 2¹²⁷ − 1 with u64 (lo, hi) limbs.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Field modulus, the Mersenne prime 2¹²⁷ − 1.
pub const MODULUS: u128 = (1u128 << 127) - 1;

/// One element of the value domain, stored as two little-endian limbs.
///
/// Limbs are kept exactly as given (a value read from disk may be
/// non-canonical); every arithmetic result is canonical. Equality is
/// limb-wise, use [`FieldElement::canonical`] to compare by value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldElement {
    /// Low 64 bits.
    pub lo: u64,
    /// High 64 bits.
    pub hi: u64,
}

impl FieldElement {
    /// Additive identity.
    pub const ZERO: Self = Self { lo: 0, hi: 0 };
    /// Multiplicative identity, `powg_B[0]` of a well-formed key.
    pub const ONE: Self = Self { lo: 1, hi: 0 };

    /// Raw limbs, no reduction.
    #[must_use]
    pub const fn from_limbs(lo: u64, hi: u64) -> Self {
        Self { lo, hi }
    }

    #[must_use]
    pub const fn from_u64(x: u64) -> Self {
        Self { lo: x, hi: 0 }
    }

    /// Reduces `x` mod P.
    #[must_use]
    pub fn from_u128(x: u128) -> Self {
        Self::pack(reduce(x))
    }

    /// The limbs as one 128-bit integer, without reduction.
    #[must_use]
    pub fn raw(&self) -> u128 {
        (u128::from(self.hi) << 64) | u128::from(self.lo)
    }

    /// Representative in `[0, P)`.
    #[must_use]
    pub fn to_canonical_u128(&self) -> u128 {
        reduce(self.raw())
    }

    #[must_use]
    pub fn canonical(&self) -> Self {
        Self::pack(self.to_canonical_u128())
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.to_canonical_u128() == 0
    }

    /// `self^e` by square-and-multiply.
    #[must_use]
    pub fn pow(self, mut e: u128) -> Self {
        let mut base = self.canonical();
        let mut acc = Self::ONE;
        while e > 0 {
            if e & 1 == 1 {
                acc = acc * base;
            }
            base = base * base;
            e >>= 1;
        }
        acc
    }

    /// Multiplicative inverse via Fermat, `None` for zero.
    #[must_use]
    pub fn inv(self) -> Option<Self> {
        if self.is_zero() {
            None
        } else {
            Some(self.pow(MODULUS - 2))
        }
    }

    /// Uniform element (up to a 2⁻¹²⁷ bias on zero).
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::from_u128(rng.gen::<u128>() & MODULUS)
    }

    fn pack(x: u128) -> Self {
        Self {
            lo: x as u64,
            hi: (x >> 64) as u64,
        }
    }
}

/// Folds any u128 into `[0, P)` using 2¹²⁷ ≡ 1.
#[inline]
fn reduce(x: u128) -> u128 {
    let r = (x & MODULUS) + (x >> 127);
    if r >= MODULUS {
        r - MODULUS
    } else {
        r
    }
}

/// 127×127-bit product as (high, low) 128-bit halves.
#[inline]
fn widening_mul(a: u128, b: u128) -> (u128, u128) {
    let (a0, a1) = (a & u128::from(u64::MAX), a >> 64);
    let (b0, b1) = (b & u128::from(u64::MAX), b >> 64);

    let low = a0 * b0;
    // both cross terms are < 2¹²⁷ since a1, b1 < 2⁶³
    let mid = a0 * b1 + a1 * b0;
    let high = a1 * b1;

    let (lo, carry) = low.overflowing_add(mid << 64);
    let hi = high + (mid >> 64) + u128::from(carry);
    (hi, lo)
}

impl Add for FieldElement {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        // a + b < 2P < 2¹²⁸
        Self::pack(reduce(self.to_canonical_u128() + rhs.to_canonical_u128()))
    }
}

impl AddAssign for FieldElement {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for FieldElement {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        let (a, b) = (self.to_canonical_u128(), rhs.to_canonical_u128());
        Self::pack(if a >= b { a - b } else { a + (MODULUS - b) })
    }
}

impl Neg for FieldElement {
    type Output = Self;

    fn neg(self) -> Self {
        Self::ZERO - self
    }
}

impl Mul for FieldElement {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        let (hi, lo) = widening_mul(self.to_canonical_u128(), rhs.to_canonical_u128());
        // hi·2¹²⁸ + lo ≡ 2·hi + lo, and hi < 2¹²⁶
        Self::pack(reduce(reduce(lo) + reduce(hi << 1)))
    }
}

impl Sum for FieldElement {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, x| acc + x)
    }
}

impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#034x}", self.raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_reduce_non_canonical() {
        // 2¹²⁸ − 1 = 2P + 1
        let f = FieldElement::from_limbs(u64::MAX, u64::MAX);
        assert_ne!(f, FieldElement::ONE);
        assert_eq!(f.canonical(), FieldElement::ONE);

        let p = FieldElement::from_limbs(u64::MAX, u64::MAX >> 1);
        assert!(p.is_zero());
        assert_eq!(p.raw(), MODULUS);
    }

    #[test]
    fn test_add_sub_neg() {
        let a = FieldElement::from_u128(MODULUS - 1);
        let b = FieldElement::from_u64(5);
        assert_eq!(a + b, FieldElement::from_u64(4));
        assert_eq!(b - a, FieldElement::from_u64(6));
        assert_eq!(-b + b, FieldElement::ZERO);
        assert_eq!(-FieldElement::ZERO, FieldElement::ZERO);
        assert_eq!(a + FieldElement::ZERO, a);
    }

    #[test]
    fn test_mul_known_values() {
        let minus_one = FieldElement::from_u128(MODULUS - 1);
        assert_eq!(minus_one * minus_one, FieldElement::ONE);

        let half = FieldElement::from_u128(1u128 << 126);
        assert_eq!(half * FieldElement::from_u64(2), FieldElement::ONE);

        let a = FieldElement::from_u64(u64::MAX);
        let expected = FieldElement::from_u128(u128::from(u64::MAX) * u128::from(u64::MAX));
        assert_eq!(a * a, expected);
    }

    #[test]
    fn test_ring_laws() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let a = FieldElement::random(&mut rng);
            let b = FieldElement::random(&mut rng);
            let c = FieldElement::random(&mut rng);
            assert_eq!(a * b, b * a);
            assert_eq!((a * b) * c, a * (b * c));
            assert_eq!((a + b) + c, a + (b + c));
            assert_eq!(a * (b + c), a * b + a * c);
            assert_eq!(a * FieldElement::ONE, a);
            assert!(a.to_canonical_u128() < MODULUS);
        }
    }

    #[test]
    fn test_inverse_and_pow() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..20 {
            let a = FieldElement::random(&mut rng);
            if a.is_zero() {
                continue;
            }
            let inv = a.inv().unwrap();
            assert_eq!(a * inv, FieldElement::ONE);
        }
        assert_eq!(FieldElement::ZERO.inv(), None);
        assert_eq!(FieldElement::from_u64(3).pow(4), FieldElement::from_u64(81));
        assert_eq!(FieldElement::from_u64(9).pow(0), FieldElement::ONE);
        // Fermat: a^(P-1) = 1
        assert_eq!(FieldElement::from_u64(12345).pow(MODULUS - 1), FieldElement::ONE);
    }

    #[test]
    fn test_sum() {
        let xs = [1u64, 2, 3, 4].map(FieldElement::from_u64);
        assert_eq!(xs.into_iter().sum::<FieldElement>(), FieldElement::from_u64(10));
    }
}
