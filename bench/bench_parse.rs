use criterion::{black_box, criterion_group, criterion_main, Criterion};

const SOURCE: &str = r#"
Base: {
    name: "base"
    port: 8080
    tags: ["a" "b" "c"]
    nested: {
        x: 1
        y: 2.5
        z: None
    }
}

Service: Base {
    ~tags
    name: "service-${Base.name}"
    endpoint: ..Base.nested.x
    replicas: [1 2 3 4 5]
}

Other: Service {}
"#;

fn parse_benchmark(c: &mut Criterion) {
    c.bench_function("parse", |b| {
        b.iter(|| {
            let root = coil::parse(black_box(SOURCE)).unwrap();
            black_box(root);
        });
    });
}

criterion_group!(benches, parse_benchmark);
criterion_main!(benches);
