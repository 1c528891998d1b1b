//! # EMF
//!
//! Result types for matched metric declarations, shaped so they serialize directly into the
//! `CloudWatchMetrics` directive of an Embedded Metric Format log record
//!
//! <https://docs.aws.amazon.com/AmazonCloudWatch/latest/monitoring/CloudWatch_Embedded_Metric_Format_Specification.html>

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// The Embedded Metric Format supports a maximum of 30 dimensions per dimension set
pub const MAX_DIMENSIONS: usize = 30;

/// A single log record: the `_aws` metadata followed by the event's tags and fields
#[derive(Serialize)]
pub struct EmbeddedMetrics<'a, V> {
    #[serde(rename = "_aws")]
    pub aws: EmbeddedMetricsAws<'a>,
    #[serde(flatten)]
    pub dimensions: BTreeMap<&'a str, &'a str>,
    #[serde(flatten)]
    pub values: BTreeMap<&'a str, &'a V>,
}

#[derive(Serialize)]
pub struct EmbeddedMetricsAws<'a> {
    #[serde(rename = "Timestamp")]
    pub timestamp: u64,
    // One directive per matching declaration
    #[serde(rename = "CloudWatchMetrics")]
    pub cloudwatch_metrics: Vec<EmfMetricResult<'a>>,
}

/// Outcome of a declaration matching a metric event
///
/// Dimension sets and metric names are borrowed from the compiled declaration, the namespace
/// from the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmfMetricResult<'a> {
    #[serde(rename = "Namespace")]
    pub namespace: &'a str,
    #[serde(rename = "Dimensions")]
    pub dimension_sets: &'a [Vec<String>],
    #[serde(rename = "Metrics")]
    pub metrics: Vec<MetricAttr<'a>>,
}

/// Metric descriptor inside a `CloudWatchMetrics` directive
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MetricAttr<'a> {
    #[serde(rename = "Name")]
    pub name: &'a str,
    #[serde(rename = "Unit")]
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(serialize_with = "serialize_unit")]
    pub unit: Option<metrics::Unit>,
}

impl<'a> MetricAttr<'a> {
    pub fn new(name: &'a str) -> Self {
        Self { name, unit: None }
    }
}

fn serialize_unit<S: Serializer>(unit: &Option<metrics::Unit>, serializer: S) -> Result<S::Ok, S::Error> {
    match unit {
        Some(unit) => serializer.serialize_str(unit_to_str(unit)),
        None => serializer.serialize_none(),
    }
}

/// Convert a metrics::Unit into the cloudwatch string
///
/// <https://docs.aws.amazon.com/AmazonCloudWatch/latest/APIReference/API_MetricDatum.html>
pub fn unit_to_str(unit: &metrics::Unit) -> &'static str {
    match unit {
        metrics::Unit::Count => "Count",
        metrics::Unit::Percent => "Percent",
        metrics::Unit::Seconds => "Seconds",
        metrics::Unit::Milliseconds => "Milliseconds",
        metrics::Unit::Microseconds => "Microseconds",
        metrics::Unit::Nanoseconds => "Nanoseconds",
        metrics::Unit::Tebibytes => "Terabytes",
        metrics::Unit::Gibibytes => "Gigabytes",
        metrics::Unit::Mebibytes => "Megabytes",
        metrics::Unit::Kibibytes => "Kilobytes",
        metrics::Unit::Bytes => "Bytes",
        metrics::Unit::TerabitsPerSecond => "Terabits/Second",
        metrics::Unit::GigabitsPerSecond => "Gigabits/Second",
        metrics::Unit::MegabitsPerSecond => "Megabits/Second",
        metrics::Unit::KilobitsPerSecond => "Kilobits/Second",
        metrics::Unit::BitsPerSecond => "Bits/Second",
        metrics::Unit::CountPerSecond => "Count/Second",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn metric_result_directive() {
        let dimension_sets = vec![vec!["tagA".to_string(), "tagB".to_string()], vec!["tagA".to_string()]];
        let result = EmfMetricResult {
            namespace: "ContainerInsights/Prometheus",
            dimension_sets: &dimension_sets,
            metrics: vec![
                MetricAttr::new("metric_a"),
                MetricAttr {
                    name: "metric_b",
                    unit: Some(metrics::Unit::Bytes),
                },
            ],
        };

        assert_eq!(
            serde_json::to_string(&result).unwrap(),
            r#"{"Namespace":"ContainerInsights/Prometheus","Dimensions":[["tagA","tagB"],["tagA"]],"Metrics":[{"Name":"metric_a"},{"Name":"metric_b","Unit":"Bytes"}]}"#
        );
    }

    #[test]
    fn binary_units_use_cloudwatch_names() {
        assert_eq!(unit_to_str(&metrics::Unit::Tebibytes), "Terabytes");
        assert_eq!(unit_to_str(&metrics::Unit::Gibibytes), "Gigabytes");
        assert_eq!(unit_to_str(&metrics::Unit::Mebibytes), "Megabytes");
        assert_eq!(unit_to_str(&metrics::Unit::Kibibytes), "Kilobytes");

        let attr = MetricAttr {
            name: "container_memory_usage",
            unit: Some(metrics::Unit::Gibibytes),
        };
        assert_eq!(
            serde_json::to_string(&attr).unwrap(),
            r#"{"Name":"container_memory_usage","Unit":"Gigabytes"}"#
        );
    }

    #[test]
    fn embedded_metrics() {
        let dimension_sets = vec![vec!["Address".to_string(), "Port".to_string()]];
        let frame_time = json!(10.0);
        let cpu_usage = json!(5.5);

        let mut record: EmbeddedMetrics<'_, Value> = EmbeddedMetrics {
            aws: EmbeddedMetricsAws {
                timestamp: 1687394207903,
                cloudwatch_metrics: vec![EmfMetricResult {
                    namespace: "GameServerMetrics",
                    dimension_sets: &dimension_sets,
                    metrics: vec![
                        MetricAttr {
                            name: "FrameTime",
                            unit: Some(metrics::Unit::Milliseconds),
                        },
                        MetricAttr {
                            name: "CpuUsage",
                            unit: Some(metrics::Unit::Percent),
                        },
                    ],
                }],
            },
            dimensions: BTreeMap::new(),
            values: BTreeMap::new(),
        };

        record.dimensions.insert("Address", "10.172.207.225");
        record.dimensions.insert("Port", "7779");
        record.values.insert("FrameTime", &frame_time);
        record.values.insert("CpuUsage", &cpu_usage);

        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"_aws":{"Timestamp":1687394207903,"CloudWatchMetrics":[{"Namespace":"GameServerMetrics","Dimensions":[["Address","Port"]],"Metrics":[{"Name":"FrameTime","Unit":"Milliseconds"},{"Name":"CpuUsage","Unit":"Percent"}]}]},"Address":"10.172.207.225","Port":"7779","CpuUsage":5.5,"FrameTime":10.0}"#
        );
    }
}
