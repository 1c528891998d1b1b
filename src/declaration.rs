//! # Declaration
//!
//! Compiled metric declarations: a rule that decides whether a metric event applies, which
//! dimension sets it is aggregated under and which of its fields are emitted as metrics
//!
//! A [MetricDeclaration] is built once from a [DeclarationConfig] and is read-only afterwards,
//! so it can be shared between any number of threads calling [MetricDeclaration::process].

use super::emf::{EmfMetricResult, MetricAttr, MAX_DIMENSIONS};
use super::ConfigError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::BuildHasher;
use tracing::warn;

/// Separator placed between concatenated source label values
pub const DEFAULT_LABEL_SEPARATOR: &str = ";";

/// Raw declaration as it appears in agent configuration
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclarationConfig {
    /// Tag names whose values are joined to build the match string, order matters
    #[serde(default)]
    pub source_labels: Vec<String>,
    /// Regular expression the joined label values must fully match
    pub label_matcher: String,
    /// Field names eligible to be emitted as metrics
    #[serde(default)]
    pub metric_selectors: Vec<String>,
    /// Dimension sets, in any member order
    #[serde(default)]
    pub dimensions: Vec<Vec<String>>,
}

impl DeclarationConfig {
    pub fn new(label_matcher: impl Into<String>) -> Self {
        Self {
            label_matcher: label_matcher.into(),
            ..Default::default()
        }
    }

    pub fn source_labels<I, S>(self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            source_labels: labels.into_iter().map(Into::into).collect(),
            ..self
        }
    }

    pub fn metric_selectors<I, S>(self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            metric_selectors: selectors.into_iter().map(Into::into).collect(),
            ..self
        }
    }

    /// Appends a dimension set
    pub fn with_dimensions<I, S>(mut self, dimensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dimensions.push(dimensions.into_iter().map(Into::into).collect());
        self
    }

    /// Compile into a [MetricDeclaration]
    pub fn compile(&self) -> Result<MetricDeclaration, ConfigError> {
        MetricDeclaration::compile(self)
    }
}

/// A compiled, immutable metric declaration
#[derive(Clone, Debug)]
pub struct MetricDeclaration {
    source_labels: Vec<String>,
    label_matcher: Regex,
    label_pattern: String,
    label_separator: &'static str,
    metric_selectors: Vec<String>,
    dimension_sets: Vec<Vec<String>>,
}

impl MetricDeclaration {
    /// Compiles the label matcher and normalizes the dimension sets
    ///
    /// The matcher must match the whole concatenated label string; anchors in the pattern are
    /// allowed but not required.
    pub fn compile(config: &DeclarationConfig) -> Result<Self, ConfigError> {
        let label_matcher = compile_label_matcher(&config.label_matcher)?;

        let dimension_sets = normalize_dimensions(&config.dimensions);
        for set in dimension_sets.iter().filter(|set| set.len() > MAX_DIMENSIONS) {
            warn!(
                "Dimension set {set:?} has more than {MAX_DIMENSIONS} dimensions and will be rejected by CloudWatch"
            );
        }

        Ok(Self {
            source_labels: config.source_labels.clone(),
            label_matcher,
            label_pattern: config.label_matcher.clone(),
            label_separator: DEFAULT_LABEL_SEPARATOR,
            metric_selectors: config.metric_selectors.clone(),
            dimension_sets,
        })
    }

    pub fn source_labels(&self) -> &[String] {
        &self.source_labels
    }

    /// The label matcher as configured
    pub fn label_matcher(&self) -> &str {
        &self.label_pattern
    }

    pub fn label_separator(&self) -> &str {
        self.label_separator
    }

    pub fn metric_selectors(&self) -> &[String] {
        &self.metric_selectors
    }

    /// Normalized dimension sets: members sorted, no duplicate sets
    pub fn dimension_sets(&self) -> &[Vec<String>] {
        &self.dimension_sets
    }

    /// Join the values of the source labels, missing tags contribute an empty string
    pub fn concatenated_labels<S: BuildHasher>(&self, tags: &HashMap<String, String, S>) -> String {
        concatenate_labels(&self.source_labels, tags, self.label_separator)
    }

    /// Does the declaration apply to an event with these tags?
    pub fn matches<S: BuildHasher>(&self, tags: &HashMap<String, String, S>) -> bool {
        self.label_matcher.is_match(&self.concatenated_labels(tags))
    }

    /// Field names to emit, in selector order
    pub fn select_metrics<V, S: BuildHasher>(&self, fields: &HashMap<String, V, S>) -> Vec<MetricAttr<'_>> {
        select_metrics(&self.metric_selectors, fields)
    }

    /// Evaluate one metric event
    ///
    /// Returns `None` when the concatenated labels do not match. A match always produces a result,
    /// even if none of the selected metrics are present in `fields`.
    pub fn process<'a, V, S1, S2>(
        &'a self,
        tags: &HashMap<String, String, S1>,
        fields: &HashMap<String, V, S2>,
        namespace: &'a str,
    ) -> Option<EmfMetricResult<'a>>
    where
        S1: BuildHasher,
        S2: BuildHasher,
    {
        if !self.matches(tags) {
            return None;
        }

        Some(EmfMetricResult {
            namespace,
            dimension_sets: &self.dimension_sets,
            metrics: self.select_metrics(fields),
        })
    }
}

impl TryFrom<&DeclarationConfig> for MetricDeclaration {
    type Error = ConfigError;

    fn try_from(config: &DeclarationConfig) -> Result<Self, Self::Error> {
        Self::compile(config)
    }
}

// The pattern is checked on its own first so a stray `)` cannot escape the anchoring group
fn compile_label_matcher(pattern: &str) -> Result<Regex, ConfigError> {
    let invalid = |source| ConfigError::InvalidLabelMatcher {
        pattern: pattern.to_string(),
        source,
    };

    Regex::new(pattern).map_err(invalid)?;
    Regex::new(&format!("^(?:{pattern})$")).map_err(invalid)
}

/// Sort the members of every dimension set and drop sets equal to an earlier one
pub fn normalize_dimensions(dimensions: &[Vec<String>]) -> Vec<Vec<String>> {
    let mut normalized: Vec<Vec<String>> = Vec::with_capacity(dimensions.len());

    for set in dimensions {
        let mut set = set.clone();
        set.sort_unstable();

        if !normalized.contains(&set) {
            normalized.push(set);
        }
    }

    normalized
}

/// Join tag values in `source_labels` order with `separator` between them
pub fn concatenate_labels<S: BuildHasher>(
    source_labels: &[String],
    tags: &HashMap<String, String, S>,
    separator: &str,
) -> String {
    let mut concatenated = String::new();

    for (i, label) in source_labels.iter().enumerate() {
        if i > 0 {
            concatenated.push_str(separator);
        }
        if let Some(value) = tags.get(label) {
            concatenated.push_str(value);
        }
    }

    concatenated
}

/// Selectors present as field names, in selector order
pub fn select_metrics<'a, V, S: BuildHasher>(
    metric_selectors: &'a [String],
    fields: &HashMap<String, V, S>,
) -> Vec<MetricAttr<'a>> {
    metric_selectors
        .iter()
        .filter(|selector| fields.contains_key(selector.as_str()))
        .map(|selector| MetricAttr::new(selector))
        .collect()
}
