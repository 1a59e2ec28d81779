use circuit_cipher::codec::{read_ciphers, write_ciphers};
use circuit_cipher::{combine, evaluate, evaluate_batch, BitVector, Cipher, Edge, FieldElement, Layer, Nonce, PublicKey, SecretKey};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// `width` base layers, then a chain of products over them, one selected edge
/// per layer.
fn circuit(width: usize, rng: &mut StdRng) -> Cipher {
    let mut layers: Vec<Layer> = (0..width)
        .map(|_| Layer::Base {
            ztag: rng.gen(),
            nonce: Nonce {
                lo: rng.gen(),
                hi: rng.gen(),
            },
        })
        .collect();
    for k in width..2 * width {
        layers.push(Layer::Product {
            pa: (k - 1) as u32,
            pb: rng.gen_range(0..width as u32),
        });
    }
    let edges = (0..layers.len())
        .map(|i| Edge {
            layer_id: i as u32,
            idx: i as u16,
            ch: 0,
            weight: FieldElement::random(rng),
            selector: BitVector::from_words(16, vec![rng.gen::<u64>() | 1]),
        })
        .collect();
    Cipher::from_parts_unchecked(layers, edges)
}

fn keys(rng: &mut StdRng) -> (PublicKey, SecretKey) {
    let sk = SecretKey {
        prf_k: rng.gen(),
        lpn_s_bits: vec![rng.gen()],
    };
    (PublicKey::default(), sk)
}

fn bench_evaluate(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0);
    let (pk, sk) = keys(&mut rng);

    let mut group = c.benchmark_group("evaluate");
    for log_width in 4..10 {
        let width = 1usize << log_width;
        let ct = circuit(width, &mut rng);
        group.bench_with_input(BenchmarkId::new("layers", 2 * width), &ct, |b, ct| {
            b.iter(|| evaluate(black_box(ct), &sk, &pk));
        });
    }

    let batch: Vec<Cipher> = (0..64).map(|_| circuit(64, &mut rng)).collect();
    group.bench_function("batch_64x128", |b| b.iter(|| evaluate_batch(black_box(&batch), &sk, &pk)));
    group.finish();
}

fn bench_combine(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(1);
    let (pk, _) = keys(&mut rng);
    let a = circuit(256, &mut rng);
    let b2 = circuit(256, &mut rng);
    c.bench_function("combine_512+512", |b| b.iter(|| combine(&pk, black_box(&a), black_box(&b2))));
}

fn bench_codec(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(2);
    let cts: Vec<Cipher> = (0..16).map(|_| circuit(128, &mut rng)).collect();
    let mut bytes = Vec::new();
    write_ciphers(&mut bytes, &cts).unwrap();

    let mut group = c.benchmark_group("codec");
    group.bench_function("write", |b| {
        b.iter(|| {
            let mut out = Vec::with_capacity(bytes.len());
            write_ciphers(&mut out, black_box(&cts)).unwrap();
            out
        });
    });
    group.bench_function("read", |b| b.iter(|| read_ciphers(&mut black_box(bytes.as_slice())).unwrap()));
    group.finish();
}

criterion_group!(benches, bench_evaluate, bench_combine, bench_codec);
criterion_main!(benches);
