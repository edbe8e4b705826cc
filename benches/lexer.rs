//! Lexer benchmarks
//!
//! Run with: cargo bench --bench lexer

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use es3run::compat::Compat;
use es3run::input::Input;
use es3run::lexer::{Lexer, TokenKind};
use es3run::string_dict::StringDict;

/// Simple expression
const SIMPLE_EXPR: &str = "1 + 2 * 3 - 4 / 5";

/// Variable declarations
const VARIABLES: &str = r#"
var x = 1;
var y = 2, z = 3;
var a = x + y + z;
var b = a * 2;
"#;

/// String literals with escapes
const STRINGS: &str = r#"
var hello = "Hello, World!";
var escaped = "Line1\nLine2\tTabbed";
var coded = "A\x42\101";
"#;

/// Operator stress test
const OPERATORS: &str = r#"
a + b - c * d / e % f;
x === y !== z == w != v;
a && b || c;
a & b | c ^ d;
e << 2 >> 3 >>> 4;
a += 1; b -= 2; c *= 3; d /= 4; e %= 5;
f <<= 1; g >>= 2; h >>>= 3; i &= 4; j |= 5; k ^= 6;
a < b; c <= d; e > f; g >= h;
++x; --y; x++; y--;
"#;

/// Control flow
const CONTROL_FLOW: &str = r#"
if (condition) {
    doSomething();
} else if (otherCondition) {
    doSomethingElse();
} else {
    doDefault();
}

for (var i = 0; i < 10; i++) {
    process(i);
}

for (var key in object) {
    if (object.hasOwnProperty(key)) {
        record(key, object[key]);
    }
}

while (running) {
    tick();
}

do {
    attempt();
} while (shouldRetry)

switch (value) {
    case 1:
        handleOne();
        break;
    case 2:
    case 3:
        handleTwoOrThree();
        break;
    default:
        handleDefault();
}

try {
    riskyOperation();
} catch (error) {
    handleError(error);
} finally {
    cleanup();
}

throw new Error("Something went wrong");
"#;

/// Object and array literals
const OBJECTS: &str = r#"
var config = {
    name: "app",
    version: "1.0.0",
    settings: {
        debug: true,
        logLevel: "info",
        features: ["auth", "api", "cache"]
    },
    endpoints: [
        { path: "/api/users", method: "GET" },
        { path: "/api/users", method: "POST" }
    ]
};
"#;

/// Functions and closures
const FUNCTIONS: &str = r#"
function simple(a, b) { return a + b; }
function outer(n) {
    function inner(m) { return n + m; }
    return inner;
}
var anon = function (x) { return x * 2; };
var named = function double_(x) { return x ? double_(x - 1) * 2 : 1; };
"#;

/// Comment stress test
const COMMENTS: &str = r#"
// Single line comment
var a = 1; // inline comment

/* Multi-line
   comment
   spanning
   multiple lines */
var b = 2;

/**
 * Doc style comment
 */
function add(x, y) {
    return x + y;
}
"#;

fn lex_all(source: &str) {
    let mut dict = StringDict::new();
    let mut lexer = Lexer::new(
        Input::from_string(source),
        &mut dict,
        Compat::strict(),
    );
    loop {
        let token = lexer.next_token().expect("benchmark sources lex cleanly");
        if token.kind == TokenKind::End {
            break;
        }
        black_box(&token);
    }
}

fn generate_large_source(size: usize) -> String {
    let patterns = [VARIABLES, STRINGS, OPERATORS, CONTROL_FLOW, OBJECTS, FUNCTIONS];
    let mut source = String::with_capacity(size);
    let mut i = 0;
    while source.len() < size {
        source.push_str(patterns[i % patterns.len()]);
        source.push_str("\n\n");
        i += 1;
    }
    source
}

fn bench_lexer_individual(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer/individual");

    let cases = [
        ("simple_expr", SIMPLE_EXPR),
        ("variables", VARIABLES),
        ("strings", STRINGS),
        ("operators", OPERATORS),
        ("control_flow", CONTROL_FLOW),
        ("objects", OBJECTS),
        ("functions", FUNCTIONS),
        ("comments", COMMENTS),
    ];

    for (name, source) in cases {
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::new("bytes", name), source, |b, s| {
            b.iter(|| lex_all(black_box(s)));
        });
    }

    group.finish();
}

fn bench_lexer_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer/throughput");

    for size in [1_000, 10_000, 100_000] {
        let source = generate_large_source(size);
        let actual = source.len();
        group.throughput(Throughput::Bytes(actual as u64));
        group.bench_with_input(
            BenchmarkId::new("large_source", format!("{}KB", actual / 1024)),
            &source,
            |b, s| {
                b.iter(|| lex_all(black_box(s)));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_lexer_individual, bench_lexer_throughput);
criterion_main!(benches);
