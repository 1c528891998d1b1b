pub use {
    builder::Builder,
    declaration::{DeclarationConfig, MetricDeclaration, DEFAULT_LABEL_SEPARATOR},
    emf::{EmfMetricResult, MetricAttr},
    processor::{MetricEvent, Processor},
};

pub mod declaration;
pub mod emf;

mod builder;
mod processor;

/// Errors raised while compiling metric declarations
///
/// These surface at startup; evaluating an event never fails.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid label matcher {pattern:?}: {source}")]
    InvalidLabelMatcher {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("cloudwatch_namespace missing")]
    MissingNamespace,
    #[error("metric declaration #{index}: {source}")]
    Declaration {
        index: usize,
        #[source]
        source: Box<ConfigError>,
    },
}
