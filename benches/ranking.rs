//! Benchmarks for the per-request vectorize + rank path.
//!
//! The vocabulary is refit on every call by design, so this measures the
//! whole cost a recommendation request pays.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use lumina::model::Document;
use lumina::rec::rank::rank;
use lumina::rec::vectorize::{TermVector, Vectorizer};

const WORDS: &[&str] = &[
    "galaxy", "empire", "voyage", "ocean", "desert", "castle", "murder", "garden", "recipe",
    "engine", "history", "monk", "dragon", "violin", "archive", "winter", "harvest", "signal",
];

fn synthetic_docs(count: usize) -> Vec<Document> {
    (0..count as u64)
        .map(|id| {
            let text: Vec<&str> = (0..40)
                .map(|k| WORDS[((id as usize * 7 + k * 13) % WORDS.len())])
                .collect();
            Document {
                id,
                text: text.join(" "),
            }
        })
        .collect()
}

fn bench_fit_transform(c: &mut Criterion) {
    for size in [16, 128, 1024] {
        let docs = synthetic_docs(size);
        c.bench_function(&format!("fit_transform/{size}"), |b| {
            b.iter(|| Vectorizer.fit_transform(black_box(&docs)))
        });
    }
}

fn bench_rank(c: &mut Criterion) {
    let docs = synthetic_docs(1024);
    let vectors = Vectorizer.fit_transform(&docs);
    let candidates: Vec<(u64, TermVector)> = docs[1..]
        .iter()
        .map(|d| d.id)
        .zip(vectors[1..].iter().cloned())
        .collect();

    c.bench_function("rank/1024", |b| {
        b.iter(|| rank(black_box(&vectors[0]), black_box(&candidates)))
    });
}

criterion_group!(benches, bench_fit_transform, bench_rank);
criterion_main!(benches);
