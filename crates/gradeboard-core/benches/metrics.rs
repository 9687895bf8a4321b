use indexmap::IndexMap;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use gradeboard_core::attribution::{apply_grade, GradeChange};
use gradeboard_core::corpus::{Batch, Corpus};
use gradeboard_core::model::{Grade, Ledger};
use gradeboard_core::statistics::{compute_metrics, compute_progress};

fn make_corpus(batches: u32, questions: usize, models: usize) -> Corpus {
    let names: Vec<String> = (0..models).map(|m| format!("model-{m}")).collect();
    Corpus::new(
        (1..=batches)
            .map(|batch_id| Batch {
                batch_id,
                questions: (0..questions).map(|q| format!("question {q}")).collect(),
                model_answers: names
                    .iter()
                    .map(|n| (n.clone(), vec!["answer".to_string(); questions]))
                    .collect::<IndexMap<_, _>>(),
            })
            .collect(),
    )
}

fn make_ledger(corpus: &Corpus) -> Ledger {
    let mut ledger = Ledger::default();
    for (i, (batch, question)) in corpus.questions().enumerate() {
        for (j, model) in corpus.models().iter().enumerate() {
            let grade = Grade::ALL[(i + j) % Grade::ALL.len()];
            let change = GradeChange::set(batch.batch_id, question, model, grade);
            let (next, _) = apply_grade(&ledger, corpus, &change, Some("bench")).unwrap();
            ledger = next;
        }
    }
    ledger
}

fn bench_metrics(c: &mut Criterion) {
    let mut group = c.benchmark_group("metrics");

    let small = make_corpus(3, 20, 4);
    let small_ledger = make_ledger(&small);
    group.bench_function("3x20x4", |b| {
        b.iter(|| compute_metrics(black_box(&small_ledger), black_box(&small)))
    });

    let large = make_corpus(10, 50, 8);
    let large_ledger = make_ledger(&large);
    group.bench_function("10x50x8", |b| {
        b.iter(|| compute_metrics(black_box(&large_ledger), black_box(&large)))
    });

    group.bench_function("progress 10x50x8", |b| {
        b.iter(|| compute_progress(black_box(&large_ledger), black_box(&large)))
    });

    group.finish();
}

fn bench_apply_grade(c: &mut Criterion) {
    let corpus = make_corpus(10, 50, 8);
    let ledger = make_ledger(&corpus);
    let change = GradeChange::set(5, 25, "model-3", Grade::Wrong);

    c.bench_function("apply_grade reassign", |b| {
        b.iter(|| apply_grade(black_box(&ledger), &corpus, &change, Some("other")))
    });
}

criterion_group!(benches, bench_metrics, bench_apply_grade);
criterion_main!(benches);
