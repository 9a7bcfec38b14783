//! Pipeline performance benchmarks.
//!
//! Measures parsing, validation, auto-fix and the full compile across diagram sizes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use erdsmith::inference::EntityModelBuilder;
use erdsmith::{AutoFixEngine, CompileOptions, ErdCompiler, Parser, ValidationEngine};

/// Generate a synthetic diagram with the given number of entities.
///
/// Every fourth entity lacks a primary key and every fifth relationship is
/// many-to-many, so the fix engine has work to do.
fn generate_diagram(entities: usize) -> String {
    let mut text = String::from("erDiagram\n");

    for i in 0..entities {
        text.push_str(&format!("  ENTITY_{} {{\n", i));
        if i % 4 != 0 {
            text.push_str("    guid id PK\n");
        }
        text.push_str("    string name\n");
        text.push_str("    string email\n");
        text.push_str("    decimal(10,2) amount\n");
        text.push_str("    datetime created_at\n");
        text.push_str("  }\n");
    }

    for i in 1..entities {
        let marker = if i % 5 == 0 { "}o--o{" } else { "||--o{" };
        text.push_str(&format!("  ENTITY_{} {} ENTITY_{} : rel_{}\n", i - 1, marker, i, i));
    }

    text
}

/// Benchmark parsing diagrams of various sizes.
fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    for entities in [10, 100, 500].iter() {
        let text = generate_diagram(*entities);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::new("entities", entities), &text, |b, text| {
            let parser = Parser::new();
            b.iter(|| black_box(parser.parse(text)))
        });
    }

    group.finish();
}

/// Benchmark the rule catalog on a built model.
fn bench_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate");

    for entities in [10, 100, 500].iter() {
        let doc = Parser::new().parse(&generate_diagram(*entities));
        let model = EntityModelBuilder::new().build(&doc);
        let engine = ValidationEngine::new();

        group.bench_with_input(BenchmarkId::new("entities", entities), &model, |b, model| {
            b.iter(|| black_box(engine.validate(model)))
        });
    }

    group.finish();
}

/// Benchmark the fix loop, which re-validates after every fix.
fn bench_fix(c: &mut Criterion) {
    let mut group = c.benchmark_group("fix");
    group.sample_size(20);

    for entities in [10, 50, 100].iter() {
        let doc = Parser::new().parse(&generate_diagram(*entities));
        let model = EntityModelBuilder::new().build(&doc);
        let engine = AutoFixEngine::new();

        group.bench_with_input(BenchmarkId::new("entities", entities), &model, |b, model| {
            b.iter(|| black_box(engine.fix(model)))
        });
    }

    group.finish();
}

/// Benchmark the whole compile.
fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");
    group.sample_size(20);

    let compiler = ErdCompiler::new();
    let options = CompileOptions::default();
    for entities in [10, 50].iter() {
        let text = generate_diagram(*entities);
        group.bench_with_input(BenchmarkId::new("entities", entities), &text, |b, text| {
            b.iter(|| black_box(compiler.compile(text, &options).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse, bench_validate, bench_fix, bench_compile);
criterion_main!(benches);
