use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use sqldedup_core::{remove_duplicates, report_email_duplicates, DedupContext, DedupMode, KeyDeduplicator};
use sqldedup_formats::{RecordExtractor, RecordSchema, SqlDump};

fn make_dump(rows: usize, distinct: usize) -> SqlDump {
    let mut text = String::from("INSERT INTO `users` VALUES\n");
    for i in 0..rows {
        let k = i % distinct;
        text.push_str(&format!(
            "(NULL, 'User {}', 'user{}@gmail.com', 'user{}', NULL, '$2y$10$hash', 1, NULL, '2024-01-01 00:00:00', '2024-01-01 00:00:00'),\n",
            i, k, k
        ));
    }
    SqlDump::from_text(text)
}

fn bench_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("remove_duplicates");
    group.throughput(Throughput::Elements(10_000));

    let unique = make_dump(10_000, 10_000);
    let half = make_dump(10_000, 5_000);

    for (label, schema) in [("lenient", RecordSchema::Lenient), ("strict", RecordSchema::Strict)] {
        let extractor = RecordExtractor::new(schema);

        group.bench_function(format!("10k_unique_{}", label), |b| {
            b.iter(|| {
                let mut ctx = DedupContext::new();
                black_box(remove_duplicates(
                    &unique,
                    &extractor,
                    KeyDeduplicator::new(DedupMode::Either),
                    &mut ctx,
                ))
            });
        });

        group.bench_function(format!("10k_50pct_dup_{}", label), |b| {
            b.iter(|| {
                let mut ctx = DedupContext::new();
                black_box(remove_duplicates(
                    &half,
                    &extractor,
                    KeyDeduplicator::new(DedupMode::Either),
                    &mut ctx,
                ))
            });
        });
    }

    group.finish();
}

fn bench_report(c: &mut Criterion) {
    let mut group = c.benchmark_group("report_email_duplicates");
    group.throughput(Throughput::Elements(10_000));

    let dump = make_dump(10_000, 5_000);
    let extractor = RecordExtractor::default();

    group.bench_function("10k_50pct_dup", |b| {
        b.iter(|| black_box(report_email_duplicates(&dump, &extractor, false).render()));
    });

    group.bench_function("10k_50pct_dup_normalized", |b| {
        b.iter(|| black_box(report_email_duplicates(&dump, &extractor, true).render()));
    });

    group.finish();
}

criterion_group!(benches, bench_remove, bench_report);
criterion_main!(benches);
