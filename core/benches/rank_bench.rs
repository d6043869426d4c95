use criterion::{criterion_group, criterion_main, Criterion};
use keyrank_core::{rank, TermWeightModel};
use std::collections::HashMap;

fn bench_rank(c: &mut Criterion) {
    let words: Vec<String> = (0..5000).map(|i| format!("term{i}")).collect();
    let vocab: HashMap<String, u32> = words.iter().enumerate().map(|(i, w)| (w.clone(), i as u32)).collect();
    let idf: Vec<f64> = (0..words.len()).map(|i| 1.0 + (i % 7) as f64 * 0.5).collect();
    let model = TermWeightModel::with_defaults(vocab, idf).unwrap();
    let text = words.iter().step_by(3).cloned().collect::<Vec<_>>().join(" ");
    let text = format!("{text} ").repeat(4);
    c.bench_function("rank_top10", |b| b.iter(|| rank(&text, 10, &model)));
}

criterion_group!(benches, bench_rank);
criterion_main!(benches);
