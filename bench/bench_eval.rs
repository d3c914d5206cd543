use criterion::{black_box, criterion_group, criterion_main, Criterion};

const SOURCE: &str = r#"
Base: {
    name: "base"
    port: 8080
    nested: {
        x: 1
        y: 2.5
    }
}

Service: Base {
    name: "service-${Base.name}"
    endpoint: ..Base.nested.x
    greeting: "hello ${Service.name} on port ${Base.port}"
}
"#;

/// `Struct::get` resolves `Link`s and `${...}` interpolation fresh on every
/// call (nothing is memoized), so this is the repeatable hot path rather
/// than `expand`, which bakes its result in place after one pass.
fn eval_benchmark(c: &mut Criterion) {
    let root = coil::parse(SOURCE).unwrap();
    c.bench_function("eval_get", |b| {
        b.iter(|| {
            let v = root.get(black_box("Service.greeting")).unwrap();
            black_box(v);
        });
    });
}

criterion_group!(benches, eval_benchmark);
criterion_main!(benches);
