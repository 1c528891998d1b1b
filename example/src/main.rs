//! Reads metric events as JSON lines on stdin and writes embedded metrics records to stdout
//!
//! ```plaintext
//! echo '{"tags":{"job":"kubernetes-pods","Service":"api","ClusterName":"prod"},"fields":{"go_goroutines":12}}' \
//!     | RUST_LOG=trace cargo run
//! ```
use metrics_emf_declarations::{Builder, DeclarationConfig, MetricEvent};
use std::io::BufRead;
use tracing::warn;

const DECLARATIONS: &str = r#"[
    {
        "sourceLabels": ["job"],
        "labelMatcher": "^kubernetes-pods$",
        "metricSelectors": ["go_goroutines", "go_threads", "process_resident_memory_bytes"],
        "dimensions": [["Service", "ClusterName"], ["ClusterName"]]
    },
    {
        "sourceLabels": ["job", "instance"],
        "labelMatcher": "^node-exporter;.+$",
        "metricSelectors": ["node_load1", "node_load5"],
        "dimensions": [["instance", "ClusterName"]]
    }
]"#;

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::filter::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .compact()
        .init();

    let declarations: Vec<DeclarationConfig> = serde_json::from_str(DECLARATIONS)?;

    let processor = Builder::new()
        .cloudwatch_namespace("ContainerInsights/Prometheus")
        .with_declarations(declarations)
        .with_metric_unit("process_resident_memory_bytes", metrics::Unit::Bytes)
        .build()?;

    let stdout = std::io::stdout();
    for line in std::io::stdin().lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<MetricEvent>(&line) {
            Ok(event) => {
                processor.write_record(&event, stdout.lock())?;
            }
            Err(err) => warn!("Skipping malformed event: {err}"),
        }
    }

    Ok(())
}
