//! Parser benchmarks
//!
//! Run with: cargo bench --bench parser

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use es3run::{Input, Interpreter};

const EXPRESSIONS: &str = r#"
a + b * c - d / e;
(f + g) * (h - i);
j = k ? l : m;
n = o && p || q;
r.s.t[u].v(w, x).y;
new Thing(a, b).method()(c);
"#;

const STATEMENTS: &str = r#"
var total = 0;
for (var i = 0; i < 100; i++) {
    if (i % 3 === 0) continue;
    total += i;
}
outer: while (total > 0) {
    switch (total % 4) {
        case 0: total -= 4; break;
        case 1: total--; break;
        default: break outer;
    }
}
try {
    risky(total);
} catch (e) {
    recover(e);
} finally {
    done();
}
"#;

const FUNCTIONS: &str = r#"
function fib(n) {
    return n < 2 ? n : fib(n - 1) + fib(n - 2);
}
var memo = (function () {
    var cache = {};
    return function (key, compute) {
        if (key in cache) return cache[key];
        return cache[key] = compute(key);
    };
})();
function each(obj, fn) {
    for (var k in obj) {
        if (obj.hasOwnProperty(k)) fn(k, obj[k]);
    }
}
"#;

const DEEP_NESTING: &str = r#"
var deep = { a: { b: { c: { d: { e: [1, [2, [3, [4]]]] } } } } };
if (a) { if (b) { if (c) { if (d) { while (e) { f(); } } } } }
var x = ((((1 + 2) * 3) - 4) / 5) % 6;
"#;

fn parse_all(source: &str) {
    let mut interp = Interpreter::new();
    let program = interp
        .parse_program(Input::from_string(source))
        .expect("benchmark sources parse cleanly");
    black_box(&program);
}

fn generate_large_source(size: usize) -> String {
    let patterns = [EXPRESSIONS, STATEMENTS, FUNCTIONS, DEEP_NESTING];
    let mut source = String::with_capacity(size);
    let mut i = 0;
    while source.len() < size {
        source.push_str(patterns[i % patterns.len()]);
        source.push_str("\n\n");
        i += 1;
    }
    source
}

fn bench_parser_individual(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser/individual");

    let cases = [
        ("expressions", EXPRESSIONS),
        ("statements", STATEMENTS),
        ("functions", FUNCTIONS),
        ("deep_nesting", DEEP_NESTING),
    ];

    for (name, source) in cases {
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::new("bytes", name), source, |b, s| {
            b.iter(|| parse_all(black_box(s)));
        });
    }

    group.finish();
}

fn bench_parser_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser/throughput");

    for size in [1_000, 10_000, 100_000] {
        let source = generate_large_source(size);
        let actual = source.len();
        group.throughput(Throughput::Bytes(actual as u64));
        group.bench_with_input(
            BenchmarkId::new("large_source", format!("{}KB", actual / 1024)),
            &source,
            |b, s| {
                b.iter(|| parse_all(black_box(s)));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_parser_individual, bench_parser_throughput);
criterion_main!(benches);
