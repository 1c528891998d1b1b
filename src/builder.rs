use super::{processor, ConfigError, DeclarationConfig, MetricDeclaration};
use metrics::SharedString;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error};

/// Builder for the metric declaration [Processor](super::Processor)
///
/// # Example
/// ```
/// use metrics_emf_declarations::{Builder, DeclarationConfig};
///
/// let processor = Builder::new()
///     .cloudwatch_namespace("ContainerInsights/Prometheus")
///     .with_declaration(
///         DeclarationConfig::new("^kubernetes-pods$")
///             .source_labels(["job"])
///             .metric_selectors(["go_goroutines"])
///             .with_dimensions(["ClusterName", "Namespace"]),
///     )
///     .build()
///     .unwrap();
/// ```
pub struct Builder {
    cloudwatch_namespace: Option<SharedString>,
    declarations: Vec<DeclarationConfig>,
    metric_units: HashMap<String, metrics::Unit>,
    timestamp: Option<u64>,
}

impl Builder {
    pub fn new() -> Self {
        Builder {
            cloudwatch_namespace: Default::default(),
            declarations: Default::default(),
            metric_units: Default::default(),
            timestamp: None,
        }
    }

    /// Sets the CloudWatch namespace for all metrics
    /// * Must be set or build() will return Err(ConfigError::MissingNamespace)
    pub fn cloudwatch_namespace(self, namespace: impl Into<SharedString>) -> Self {
        Self {
            cloudwatch_namespace: Some(namespace.into()),
            ..self
        }
    }

    /// Adds a metric declaration
    /// * Declarations are evaluated in the order they are added
    pub fn with_declaration(mut self, declaration: DeclarationConfig) -> Self {
        self.declarations.push(declaration);
        self
    }

    /// Adds every declaration from an already loaded configuration
    pub fn with_declarations(mut self, declarations: impl IntoIterator<Item = DeclarationConfig>) -> Self {
        self.declarations.extend(declarations);
        self
    }

    /// Attaches a unit to every emitted metric with the given name
    /// * Calling this multiple times with the same name overwrites the previous unit
    pub fn with_metric_unit(mut self, name: impl Into<String>, unit: metrics::Unit) -> Self {
        self.metric_units.insert(name.into(), unit);
        self
    }

    /// Pins the Timestamp written to each record, mostly useful for tests
    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Compiles every declaration and consumes the builder into a [Processor](super::Processor)
    /// * The first declaration that fails to compile aborts the build
    pub fn build(self) -> Result<processor::Processor, ConfigError> {
        let cloudwatch_namespace = self.cloudwatch_namespace.ok_or(ConfigError::MissingNamespace)?;

        let declarations = self
            .declarations
            .iter()
            .enumerate()
            .map(|(index, config)| {
                MetricDeclaration::compile(config).map_err(|err| {
                    error!("Unable to compile metric declaration #{index}: {err}");
                    ConfigError::Declaration {
                        index,
                        source: Box::new(err),
                    }
                })
            })
            .collect::<Result<Arc<[MetricDeclaration]>, _>>()?;

        debug!(
            "Compiled {} metric declarations for namespace {cloudwatch_namespace}",
            declarations.len()
        );

        Ok(processor::Processor::new(
            processor::Config {
                cloudwatch_namespace,
                metric_units: self.metric_units,
                timestamp: self.timestamp,
            },
            declarations,
        ))
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}
