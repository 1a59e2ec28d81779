//! Seeded keys and honest encodings shared by the unit tests.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::bitvec::BitVector;
use crate::cipher::{Cipher, Edge, Layer, Nonce};
use crate::field::FieldElement;
use crate::keys::{PublicKey, SchemeParams, SecretKey, Ubk};
use crate::prf::{BaseDerivation, ChaChaPrf};

pub const ROW_WIDTH: usize = 64;
pub const ROWS: usize = 32;
pub const NOISE_BITS: u32 = 24;
const NOISE_STD: f64 = 64.0;
const NOISE_CLAMP: f64 = 1024.0;

pub fn params() -> SchemeParams {
    SchemeParams {
        m_bits: 127,
        b: 16,
        lpn_t: ROWS as u32,
        lpn_n: ROW_WIDTH as u32,
        lpn_tau_num: 1,
        lpn_tau_den: 16,
        noise_entropy_bits: NOISE_BITS,
        depth_slope_bits: 4,
        tuple2_fraction_bits: 0.5f64.to_bits(),
        edge_budget: 64,
    }
}

/// Random `H`, a shuffled `ubk`, and a noise support covering every position
/// the noise window can reach after permutation, plus a few extra bits.
pub fn key_pair(seed: u64) -> (PublicKey, SecretKey) {
    let mut rng = StdRng::seed_from_u64(seed);

    let h: Vec<BitVector> = (0..ROWS)
        .map(|_| BitVector::from_words(ROW_WIDTH, vec![rng.gen()]))
        .collect();

    let mut perm: Vec<u32> = (0..ROW_WIDTH as u32).collect();
    perm.shuffle(&mut rng);
    let mut inv = vec![0u32; ROW_WIDTH];
    for (i, &p) in perm.iter().enumerate() {
        inv[p as usize] = i as u32;
    }

    let mut support = BitVector::make(ROW_WIDTH);
    for &p in &perm[..NOISE_BITS as usize] {
        support.set(p as usize, true).unwrap();
    }
    for _ in 0..8 {
        support.set(rng.gen_range(0..ROW_WIDTH), true).unwrap();
    }

    let prm = params();
    let omega = FieldElement::random(&mut rng);
    let powg_b = std::iter::successors(Some(FieldElement::ONE), |&g| Some(g * omega))
        .take(prm.b as usize)
        .collect();

    let pk = PublicKey {
        params: prm,
        canon_tag: rng.gen(),
        h_digest: rng.gen(),
        h,
        ubk: Ubk { perm, inv },
        omega_b: omega,
        powg_b,
    };
    let sk = SecretKey {
        prf_k: rng.gen(),
        lpn_s_bits: support.words().to_vec(),
    };
    (pk, sk)
}

/// `m·Δ + noise` in the field.
pub fn encoded_value(pk: &PublicKey, m: u32, noise: i64) -> FieldElement {
    let e = FieldElement::from_u64(noise.unsigned_abs());
    let e = if noise < 0 { -e } else { e };
    pk.params.plaintext_scale() * FieldElement::from_u64(u64::from(m)) + e
}

/// Two base layers, their product, two selected edges whose weighted sum is
/// `m·Δ + e` for small Gaussian `e`, and one unselected decoy edge.
pub fn encode(pk: &PublicKey, sk: &SecretKey, m: u32, seed: u64) -> Cipher {
    let mut rng = StdRng::seed_from_u64(seed ^ pk.canon_tag);
    let normal = Normal::new(0.0, NOISE_STD).unwrap();
    let noise = normal.sample(&mut rng).round().clamp(-NOISE_CLAMP, NOISE_CLAMP) as i64;
    let target = encoded_value(pk, m, noise);

    let mut base = || Layer::Base {
        ztag: rng.gen(),
        nonce: Nonce {
            lo: rng.gen(),
            hi: rng.gen(),
        },
    };
    let layers = vec![base(), base(), Layer::Product { pa: 0, pb: 1 }];

    let value = |l: &Layer| match *l {
        Layer::Base { ztag, nonce } => ChaChaPrf.derive_base(sk.prf_key(), ztag, nonce),
        _ => unreachable!(),
    };
    let v0 = value(&layers[0]);
    let v2 = v0 * value(&layers[1]);

    let w0 = FieldElement::random(&mut rng);
    let w2 = (target - w0 * v0) * v2.inv().expect("product of PRF outputs is nonzero");
    let decoy = FieldElement::random(&mut rng);

    let mut edge = |layer_id: u32, weight: FieldElement, on: bool| {
        let bits = (rng.gen::<u64>() & !1) | u64::from(on);
        Edge {
            layer_id,
            idx: layer_id as u16,
            ch: rng.gen_range(0..4),
            weight,
            selector: BitVector::from_words(8, vec![bits]),
        }
    };
    let edges = vec![edge(0, w0, true), edge(1, decoy, false), edge(2, w2, true)];
    Cipher::new(layers, edges).unwrap()
}
