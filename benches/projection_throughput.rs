use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rspql_spin::{Dialect, codec, parse_query, project};

/// Query with `windows` logical windows spread over two streams
fn generate_query(windows: usize) -> String {
    let mut text = String::from("PREFIX ex: <http://example.org/>\nREGISTER RStream ex:output AS\nSELECT ?sensor ?value\n");
    for i in 0..windows {
        text.push_str(&format!(
            "FROM NAMED WINDOW ex:w{i} ON STREAM ex:stream{} [RANGE PT{}S STEP PT{}S]\n",
            i % 2,
            10 * (i + 1),
            i + 1
        ));
    }
    text.push_str("WHERE {\n");
    for i in 0..windows {
        text.push_str(&format!("  WINDOW ex:w{i} {{ ?sensor ex:property{i} ?value }}\n"));
    }
    text.push_str("}\n");
    text
}

/// Benchmark: parsing native text
fn benchmark_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for windows in [1, 4, 16].iter() {
        let text = generate_query(*windows);
        group.bench_with_input(BenchmarkId::from_parameter(windows), &text, |b, text| {
            b.iter(|| parse_query(black_box(text)).unwrap())
        });
    }
    group.finish();
}

/// Benchmark: canonical graph encode and decode
fn benchmark_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    for windows in [1, 4, 16].iter() {
        let query = parse_query(&generate_query(*windows)).unwrap();
        group.bench_with_input(BenchmarkId::new("encode", windows), &query, |b, query| {
            b.iter(|| codec::encode_query(black_box(query)))
        });
        let graph = codec::encode_query(&query);
        group.bench_with_input(BenchmarkId::new("decode", windows), &graph, |b, graph| {
            b.iter(|| codec::decode_query(black_box(graph)).unwrap())
        });
    }
    group.finish();
}

/// Benchmark: projection onto every dialect, with reconciliation where needed
fn benchmark_projection(c: &mut Criterion) {
    let mut group = c.benchmark_group("projection");
    let query = parse_query(&generate_query(8)).unwrap();
    for dialect in Dialect::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(dialect), &query, |b, query| {
            b.iter(|| project(black_box(query), dialect, false))
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_parse, benchmark_codec, benchmark_projection);
criterion_main!(benches);
