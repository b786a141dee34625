//! Metric Families
//!
//! Samples, family descriptors and the text exposition of a single family.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

use chrono::{DateTime, Utc};

use crate::error::GenerateError;

// =============================================================================
// Metric Type
// =============================================================================

/// Kind of a metric family as written in the `# TYPE` line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Gauge,
    Counter,
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricType::Gauge => write!(f, "gauge"),
            MetricType::Counter => write!(f, "counter"),
        }
    }
}

// =============================================================================
// Sample
// =============================================================================

/// One series value: parallel label key/value lists plus the value
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub label_keys: Vec<String>,
    pub label_values: Vec<String>,
    pub value: f64,
}

impl Sample {
    /// Sample without any generator-supplied labels
    pub fn new(value: f64) -> Self {
        Self {
            label_keys: Vec::new(),
            label_values: Vec::new(),
            value,
        }
    }

    /// Sample with labels
    pub fn with_labels(label_keys: Vec<String>, label_values: Vec<String>, value: f64) -> Self {
        Self {
            label_keys,
            label_values,
            value,
        }
    }

    /// Append a single label pair
    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.label_keys.push(key.into());
        self.label_values.push(value.into());
        self
    }

    /// Prepend the identity labels of the owning object.
    ///
    /// Fails when the resulting key and value lists differ in length.
    pub fn prefixed(mut self, keys: &[&str], values: &[String]) -> Result<Self, GenerateError> {
        let mut label_keys: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        label_keys.append(&mut self.label_keys);

        let mut label_values = values.to_vec();
        label_values.append(&mut self.label_values);

        if label_keys.len() != label_values.len() {
            return Err(GenerateError::LabelCardinality {
                keys: label_keys.len(),
                values: label_values.len(),
            });
        }

        self.label_keys = label_keys;
        self.label_values = label_values;
        Ok(self)
    }

    /// Write `name{k="v",...} value\n`
    pub fn write_line(&self, name: &str, out: &mut String) {
        out.push_str(name);
        if !self.label_keys.is_empty() {
            let mut separator = '{';
            for (key, value) in self.label_keys.iter().zip(&self.label_values) {
                out.push(separator);
                out.push_str(key);
                out.push_str("=\"");
                escape_label_value(value, out);
                out.push('"');
                separator = ',';
            }
            out.push('}');
        }
        out.push(' ');
        out.push_str(&format_value(self.value));
        out.push('\n');
    }
}

/// Outcome of one family transform for one object
pub type GenerateResult = Result<Vec<Sample>, GenerateError>;

// =============================================================================
// Family Generator
// =============================================================================

/// Immutable descriptor of one metric family for objects of type `K`
pub struct FamilyGenerator<K> {
    pub name: &'static str,
    pub help: &'static str,
    pub metric_type: MetricType,
    pub generate: fn(&K) -> GenerateResult,
}

impl<K> FamilyGenerator<K> {
    /// Gauge family descriptor
    pub const fn gauge(
        name: &'static str,
        help: &'static str,
        generate: fn(&K) -> GenerateResult,
    ) -> Self {
        Self {
            name,
            help,
            metric_type: MetricType::Gauge,
            generate,
        }
    }

    /// `# HELP` and `# TYPE` lines, each newline terminated
    pub fn header(&self) -> String {
        format!(
            "# HELP {name} {help}\n# TYPE {name} {kind}\n",
            name = self.name,
            help = self.help,
            kind = self.metric_type
        )
    }
}

impl<K> Clone for FamilyGenerator<K> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            help: self.help,
            metric_type: self.metric_type,
            generate: self.generate,
        }
    }
}

impl<K> fmt::Debug for FamilyGenerator<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FamilyGenerator")
            .field("name", &self.name)
            .field("metric_type", &self.metric_type)
            .finish()
    }
}

// =============================================================================
// Rendered Family
// =============================================================================

/// Samples produced by one family for one object, identity labels included
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFamily {
    pub name: &'static str,
    pub samples: Vec<Sample>,
}

impl RenderedFamily {
    /// Append every sample line of this family
    pub fn write_to(&self, out: &mut String) {
        for sample in &self.samples {
            sample.write_line(self.name, out);
        }
    }
}

// =============================================================================
// Value Helpers
// =============================================================================

/// 1.0 for true, 0.0 for false
pub fn bool_float(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Unix seconds of a timestamp
pub fn timestamp_seconds(t: &DateTime<Utc>) -> f64 {
    t.timestamp() as f64
}

/// Convert object labels into `label_<key>` pairs, sorted by key
pub fn kube_labels_to_prometheus_labels(
    labels: Option<&BTreeMap<String, String>>,
) -> (Vec<String>, Vec<String>) {
    let Some(labels) = labels else {
        return (Vec::new(), Vec::new());
    };

    labels
        .iter()
        .map(|(k, v)| (format!("label_{}", sanitize_label_name(k)), v.clone()))
        .unzip()
}

/// Replace every character outside `[a-zA-Z0-9_]` with `_`
pub fn sanitize_label_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

fn escape_label_value(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '"' => out.push_str("\\\""),
            c => out.push(c),
        }
    }
}

/// Shortest round-trippable decimal form of a sample value.
///
/// Scientific notation is used when the decimal exponent is below -4 or at
/// least 6, with a signed two-digit minimum exponent (`1.5e+09`).
pub fn format_value(v: f64) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }
    if v == 0.0 {
        return if v.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    // `{:e}` yields the shortest round-trip digits, e.g. "-1.5e9"
    let sci = format!("{:e}", v);
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let (negative, mantissa) = match mantissa.strip_prefix('-') {
        Some(m) => (true, m),
        None => (false, mantissa),
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();

    let mut out = String::with_capacity(digits.len() + 8);
    if negative {
        out.push('-');
    }

    if !(-4..6).contains(&exp) {
        out.push_str(&digits[..1]);
        if digits.len() > 1 {
            out.push('.');
            out.push_str(&digits[1..]);
        }
        let sign = if exp < 0 { '-' } else { '+' };
        let _ = write!(out, "e{}{:02}", sign, exp.abs());
        return out;
    }

    let point = exp + 1;
    if point <= 0 {
        out.push_str("0.");
        out.extend(std::iter::repeat('0').take((-point) as usize));
        out.push_str(&digits);
    } else if point as usize >= digits.len() {
        out.push_str(&digits);
        out.extend(std::iter::repeat('0').take(point as usize - digits.len()));
    } else {
        let (int, frac) = digits.split_at(point as usize);
        out.push_str(int);
        out.push('.');
        out.push_str(frac);
    }
    out
}
