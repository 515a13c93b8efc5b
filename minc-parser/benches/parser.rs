use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use minc_parser::{parse, Parser};
use minc_source::Source;

fn expr(source: &str) {
    let source = Source::new(source);
    let _ast = Parser::new(&source).parse_expr().unwrap();
}

fn long_expr(c: &mut Criterion) {
    let mut group = c.benchmark_group("long-expr");

    let mut source = "1".to_string();
    for _i in 0..1000 {
        source.push_str(" + 1");
    }
    group.throughput(Throughput::Bytes(source.len() as u64));
    group.bench_function("long-expr", |b| b.iter(|| expr(&source)));
}

fn stress_precedence(c: &mut Criterion) {
    let mut group = c.benchmark_group("stress-precedence");

    let mut source = "1".to_string();
    for _i in 0..140 {
        source.push_str(" == 2 < 3 + 5 * 5 || 4 && -6 % 7");
    }
    group.throughput(Throughput::Bytes(source.len() as u64));
    group.bench_function("stress-precedence", |b| b.iter(|| expr(&source)));
}

fn many_functions(c: &mut Criterion) {
    let mut group = c.benchmark_group("many-functions");

    let mut source = String::new();
    for i in 0..200 {
        source.push_str(&format!(
            "int f{i}(int a, int b) {{ int c = a * b; for (int i = 0; i < c; i = i + 1) {{ if (i % 2) continue; c = c - 1; }} return c; }}\n",
            i = i
        ));
    }
    group.throughput(Throughput::Bytes(source.len() as u64));
    group.bench_function("many-functions", |b| {
        b.iter(|| parse(&Source::new(&source)).unwrap())
    });
}

criterion_group!(benches, long_expr, stress_precedence, many_functions);
criterion_main!(benches);
