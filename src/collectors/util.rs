//! Shared family transforms and value parsing

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::Resource;

use crate::error::GenerateError;
use crate::metrics::{kube_labels_to_prometheus_labels, timestamp_seconds, GenerateResult, Sample};

// =============================================================================
// Identity
// =============================================================================

/// `[namespace, name]` identity values
pub fn namespace_and_name<K: Resource>(obj: &K) -> Vec<String> {
    let meta = obj.meta();
    vec![
        meta.namespace.clone().unwrap_or_default(),
        meta.name.clone().unwrap_or_default(),
    ]
}

/// `[name]` identity value for cluster-scoped objects
pub fn name_only<K: Resource>(obj: &K) -> Vec<String> {
    vec![obj.meta().name.clone().unwrap_or_default()]
}

// =============================================================================
// Metadata Families
// =============================================================================

/// Creation timestamp in Unix seconds; no sample when unset
pub fn created<K: Resource>(obj: &K) -> GenerateResult {
    Ok(obj
        .meta()
        .creation_timestamp
        .as_ref()
        .map(|t| Sample::new(timestamp_seconds(&t.0)))
        .into_iter()
        .collect())
}

/// Sequence number of the desired state; no sample when unset
pub fn metadata_generation<K: Resource>(obj: &K) -> GenerateResult {
    Ok(obj
        .meta()
        .generation
        .map(|g| Sample::new(g as f64))
        .into_iter()
        .collect())
}

/// Object labels as `label_*` pairs, value 1
pub fn labels<K: Resource>(obj: &K) -> GenerateResult {
    let (keys, values) = kube_labels_to_prometheus_labels(obj.meta().labels.as_ref());
    Ok(vec![Sample::with_labels(keys, values, 1.0)])
}

// =============================================================================
// Quantities
// =============================================================================

const DECIMAL_SUFFIXES: [(&str, i32); 9] = [
    ("n", -9),
    ("u", -6),
    ("m", -3),
    ("k", 3),
    ("M", 6),
    ("G", 9),
    ("T", 12),
    ("P", 15),
    ("E", 18),
];

const BINARY_SUFFIXES: [(&str, u32); 6] = [
    ("Ki", 10),
    ("Mi", 20),
    ("Gi", 30),
    ("Ti", 40),
    ("Pi", 50),
    ("Ei", 60),
];

/// Most significant digits accepted in a quantity mantissa
const MAX_MANTISSA_DIGITS: usize = 30;

/// Parse a Kubernetes quantity into thousandths, rounding up.
///
/// Accepts a signed decimal number followed by a binary SI suffix
/// (`Ki`..`Ei`), a decimal SI suffix (`n`..`E`) or a decimal exponent
/// (`e3`, `E-2`). Arithmetic is exact; only the final division rounds.
/// A scale that leaves the `i32` exponent range is an overflow.
pub fn parse_quantity_milli(raw: &str) -> Result<i64, GenerateError> {
    let invalid = || GenerateError::InvalidQuantity(raw.to_string());
    let overflow = || GenerateError::Overflow(raw.to_string());

    let s = raw.trim();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let number_end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(rest.len());
    let (number, suffix) = rest.split_at(number_end);
    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));

    if (whole.is_empty() && fraction.is_empty()) || fraction.contains('.') {
        return Err(invalid());
    }

    let digits = format!("{}{}", whole, fraction);
    let digits = digits.trim_start_matches('0');
    if digits.len() > MAX_MANTISSA_DIGITS {
        return Err(overflow());
    }
    let mantissa: i128 = if digits.is_empty() {
        0
    } else {
        digits.parse().map_err(|_| invalid())?
    };

    let mut exp10 = i32::try_from(fraction.len())
        .ok()
        .and_then(i32::checked_neg)
        .ok_or_else(overflow)?;
    let mut exp2 = 0u32;

    if let Some((_, e)) = DECIMAL_SUFFIXES.iter().find(|(sfx, _)| *sfx == suffix) {
        exp10 = exp10.checked_add(*e).ok_or_else(overflow)?;
    } else if let Some((_, e)) = BINARY_SUFFIXES.iter().find(|(sfx, _)| *sfx == suffix) {
        exp2 = *e;
    } else if !suffix.is_empty() {
        let exponent = suffix
            .strip_prefix('e')
            .or_else(|| suffix.strip_prefix('E'))
            .ok_or_else(invalid)?;
        let exponent: i32 = exponent.parse().map_err(|_| invalid())?;
        exp10 = exp10.checked_add(exponent).ok_or_else(overflow)?;
    }

    // thousandths
    exp10 = exp10.checked_add(3).ok_or_else(overflow)?;

    if mantissa == 0 {
        return Ok(0);
    }

    let scaled = mantissa.checked_mul(1i128 << exp2).ok_or_else(overflow)?;
    let magnitude = if exp10 >= 0 {
        10i128
            .checked_pow(exp10 as u32)
            .and_then(|p| scaled.checked_mul(p))
            .ok_or_else(overflow)?
    } else {
        match 10i128.checked_pow(exp10.unsigned_abs()) {
            // ceil for positive values is floor of the magnitude for negative ones
            Some(d) if negative => scaled / d,
            Some(d) => scaled / d + i128::from(scaled % d != 0),
            None if negative => 0,
            None => 1,
        }
    };

    let milli = if negative { -magnitude } else { magnitude };
    i64::try_from(milli).map_err(|_| overflow())
}

/// Value of a quantity in base units, at milli precision
pub fn quantity_value(q: &Quantity) -> Result<f64, GenerateError> {
    Ok(parse_quantity_milli(&q.0)? as f64 / 1000.0)
}

// =============================================================================
// Int-or-percent
// =============================================================================

/// Resolve an int-or-percent against `total`.
///
/// Percentages must carry a trailing `%`; `round_up` selects ceil over floor.
pub fn int_or_percent(
    value: &IntOrString,
    total: i32,
    round_up: bool,
) -> Result<i64, GenerateError> {
    match value {
        IntOrString::Int(i) => Ok(i64::from(*i)),
        IntOrString::String(s) => {
            let percent: i64 = s
                .strip_suffix('%')
                .and_then(|p| p.trim().parse().ok())
                .ok_or_else(|| GenerateError::InvalidIntOrPercent(s.clone()))?;

            let scaled = percent as f64 * f64::from(total) / 100.0;
            Ok(if round_up { scaled.ceil() } else { scaled.floor() } as i64)
        }
    }
}
