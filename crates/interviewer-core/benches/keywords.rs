use criterion::{black_box, criterion_group, criterion_main, Criterion};

use interviewer_core::keywords::{lemmatize, KeywordGapExtractor};

const REFERENCE: &str = "A B-tree index keeps keys sorted in balanced pages, so lookups, \
range scans and ordered iteration take logarithmic time. Writes pay for this: every insert \
may split pages and updates must maintain each index. Covering indexes avoid heap lookups \
entirely when all queried columns are stored in the index.";

const ANSWER: &str = "Indexes make reads faster because the database doesn't scan the \
whole table, but they slow down inserts.";

fn bench_extract_keywords(c: &mut Criterion) {
    let extractor = KeywordGapExtractor::default();
    let mut group = c.benchmark_group("extract_keywords");

    group.bench_function("short", |b| {
        b.iter(|| extractor.extract_keywords(black_box(ANSWER)))
    });

    group.bench_function("reference", |b| {
        b.iter(|| extractor.extract_keywords(black_box(REFERENCE)))
    });

    let large = REFERENCE.repeat(50);
    group.bench_function("50x_reference", |b| {
        b.iter(|| extractor.extract_keywords(black_box(&large)))
    });

    group.finish();
}

fn bench_detect_gaps(c: &mut Criterion) {
    let extractor = KeywordGapExtractor::default();
    c.bench_function("detect_keyword_gaps", |b| {
        b.iter(|| extractor.detect_keyword_gaps(black_box(REFERENCE), black_box(ANSWER)))
    });
}

fn bench_lemmatize(c: &mut Criterion) {
    let words = ["queries", "caching", "indexes", "balanced", "logarithmic", "quickly"];
    c.bench_function("lemmatize", |b| {
        b.iter(|| {
            for word in words {
                black_box(lemmatize(black_box(word)));
            }
        })
    });
}

fn bench_session_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_parsing");

    for n in [2usize, 5, 50] {
        let toml = generate_session_toml(n);
        group.bench_function(format!("{n}_answer_lists"), |b| {
            b.iter(|| {
                interviewer_core::parser::parse_session_script_str(
                    black_box(&toml),
                    black_box("bench.toml".as_ref()),
                )
            })
        });
    }

    group.finish();
}

fn generate_session_toml(n: usize) -> String {
    let mut s = String::from(
        r#"[session]
candidate_id = "bench"
skills = ["rust", "sql", "kafka"]
"#,
    );
    for i in 0..n {
        s.push_str(&format!(
            r#"
[[answers]]
attempts = ["Main answer {i}", "First follow-up {i}", "Second follow-up {i}"]
"#
        ));
    }
    s
}

criterion_group!(
    benches,
    bench_extract_keywords,
    bench_detect_gaps,
    bench_lemmatize,
    bench_session_parsing
);
criterion_main!(benches);
