use criterion::{criterion_group, criterion_main, Criterion};
use metrics_emf_declarations::{Builder, DeclarationConfig, MetricEvent};
use std::hint::black_box;

fn criterion_benchmark(c: &mut Criterion) {
    let processor = Builder::new()
        .cloudwatch_namespace("ContainerInsights/Prometheus")
        .with_declaration(
            DeclarationConfig::new("^kubernetes-pods;.*$")
                .source_labels(["job", "pod"])
                .metric_selectors(["go_goroutines", "go_threads", "process_resident_memory_bytes"])
                .with_dimensions(["Service", "ClusterName"])
                .with_dimensions(["ClusterName"]),
        )
        .with_declaration(
            DeclarationConfig::new("^node-exporter$")
                .source_labels(["job"])
                .metric_selectors(["node_load1"])
                .with_dimensions(["ClusterName", "instance"]),
        )
        .with_metric_unit("process_resident_memory_bytes", metrics::Unit::Bytes)
        .build()
        .unwrap();

    let event = MetricEvent::new()
        .with_tag("job", "kubernetes-pods")
        .with_tag("pod", "api-7d9f")
        .with_tag("Service", "api")
        .with_tag("ClusterName", "prod")
        .with_field("go_goroutines", 42)
        .with_field("process_resident_memory_bytes", 73_400_320)
        .with_field("scrape_duration_seconds", 0.012);

    c.bench_function("process", |b| b.iter(|| processor.process(black_box(&event)).len()));

    c.bench_function("write_record", |b| {
        b.iter(|| processor.write_record(black_box(&event), std::io::sink()))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
