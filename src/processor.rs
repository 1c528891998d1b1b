//! # Processor
//!
//! Owner of the compiled declaration list returned from metrics_emf_declarations::Builder

use super::declaration::MetricDeclaration;
use super::emf;
use metrics::SharedString;
use serde::Deserialize;
use serde_json::value::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::trace;

/// Configuration via Builder
pub struct Config {
    pub cloudwatch_namespace: SharedString,
    pub metric_units: HashMap<String, metrics::Unit>,
    pub timestamp: Option<u64>,
}

/// A single metric event: tags to match against and fields to emit
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct MetricEvent {
    #[serde(default)]
    pub tags: HashMap<String, String>,
    #[serde(default)]
    pub fields: HashMap<String, Value>,
}

impl MetricEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(name.into(), value.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}

/// Evaluates metric events against every compiled declaration
///
/// Use [Builder](super::Builder) to construct. Cloning is cheap, clones share the compiled
/// declarations, which are never modified after construction.
///
/// # Example
/// ```
/// use metrics_emf_declarations::{Builder, DeclarationConfig, MetricEvent};
///
/// let processor = Builder::new()
///     .cloudwatch_namespace("ContainerInsights/Prometheus")
///     .with_declaration(
///         DeclarationConfig::new("^kubernetes-pods$")
///             .source_labels(["job"])
///             .metric_selectors(["go_goroutines"])
///             .with_dimensions(["Service"]),
///     )
///     .build()
///     .unwrap();
///
/// let event = MetricEvent::new()
///     .with_tag("job", "kubernetes-pods")
///     .with_tag("Service", "api")
///     .with_field("go_goroutines", 12);
///
/// processor.write_record(&event, std::io::stdout()).unwrap();
/// ```
#[derive(Clone)]
pub struct Processor {
    declarations: Arc<[MetricDeclaration]>,
    config: Arc<Config>,
}

impl Processor {
    pub fn new(config: Config, declarations: Arc<[MetricDeclaration]>) -> Self {
        Self {
            declarations,
            config: Arc::new(config),
        }
    }

    pub fn declarations(&self) -> &[MetricDeclaration] {
        &self.declarations
    }

    pub fn cloudwatch_namespace(&self) -> &str {
        &self.config.cloudwatch_namespace
    }

    /// Compute the timestamp unless it was set via [Builder::with_timestamp](super::Builder::with_timestamp)
    fn timestamp(&self) -> u64 {
        match self.config.timestamp {
            Some(t) => t,
            None => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or_default(),
        }
    }

    /// Evaluate an event against every declaration, in configuration order
    ///
    /// Each matching declaration contributes its own result, results are never merged. Results
    /// with no selected metrics are kept, see [Processor::write_record] for where they are dropped.
    pub fn process(&self, event: &MetricEvent) -> Vec<emf::EmfMetricResult<'_>> {
        let namespace: &str = &self.config.cloudwatch_namespace;

        self.declarations
            .iter()
            .enumerate()
            .filter_map(|(index, declaration)| {
                let result = declaration.process(&event.tags, &event.fields, namespace);
                if result.is_none() {
                    trace!("Metric declaration #{index} does not match {:?}", event.tags);
                }
                result
            })
            .map(|mut result| {
                for metric in &mut result.metrics {
                    metric.unit = self.config.metric_units.get(metric.name).copied();
                }
                result
            })
            .collect()
    }

    /// Write the event as a single embedded metrics log line to an implementation of
    /// [std::io::Write]
    ///
    /// Returns false, writing nothing, when no declaration selected any metric
    pub fn write_record(&self, event: &MetricEvent, mut writer: impl std::io::Write) -> std::io::Result<bool> {
        let cloudwatch_metrics: Vec<_> = self
            .process(event)
            .into_iter()
            .filter(|result| !result.metrics.is_empty())
            .collect();

        // Skip if we have no metrics to emit
        if cloudwatch_metrics.is_empty() {
            trace!("No metrics selected for {:?}, skipping record", event.tags);
            return Ok(false);
        }

        let mut emf = emf::EmbeddedMetrics {
            aws: emf::EmbeddedMetricsAws {
                timestamp: self.timestamp(),
                cloudwatch_metrics,
            },
            dimensions: BTreeMap::new(),
            values: BTreeMap::new(),
        };

        // Fields take precedence over tags sharing the same name
        for (name, value) in &event.tags {
            if !event.fields.contains_key(name) {
                emf.dimensions.insert(name.as_str(), value.as_str());
            }
        }
        for (name, value) in &event.fields {
            emf.values.insert(name.as_str(), value);
        }

        serde_json::to_writer(&mut writer, &emf)?;
        writeln!(writer)?;

        Ok(true)
    }
}
