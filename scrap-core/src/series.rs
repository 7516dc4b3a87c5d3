use crate::error::{ScrapError, ScrapResult};
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// RFC 3339 at whole seconds on the wire.
    #[serde(serialize_with = "rfc3339_seconds")]
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

fn rfc3339_seconds<S: Serializer>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::Secs, true))
}

impl PricePoint {
    pub fn from_millis(epoch_millis: i64, price: f64) -> ScrapResult<Self> {
        let timestamp = Utc
            .timestamp_millis_opt(epoch_millis)
            .single()
            .ok_or_else(|| ScrapError::decode("price timestamp", format!("{epoch_millis} out of range")))?;
        Ok(Self { timestamp, price })
    }
}

/// Keeps the first point and then every point at least `spacing` after the last kept one.
///
/// The gap is measured against the last *kept* point, not the raw predecessor. Input is
/// expected in ascending time order and is not sorted here.
pub fn downsample(points: &[(i64, f64)], spacing: Duration) -> Vec<(i64, f64)> {
    if spacing.is_zero() {
        return points.to_vec();
    }

    let spacing_ms = i64::try_from(spacing.as_millis()).unwrap_or(i64::MAX);
    let mut kept: Vec<(i64, f64)> = Vec::new();

    for &(ts, price) in points {
        match kept.last() {
            Some(&(last_ts, _)) if ts.saturating_sub(last_ts) < spacing_ms => continue,
            _ => kept.push((ts, price)),
        }
    }

    kept
}

/// Downsamples a raw `[epochMillis, price]` chart into timestamped points.
pub fn downsample_chart(raw: &[(f64, f64)], spacing: Duration) -> ScrapResult<Vec<PricePoint>> {
    let points: Vec<(i64, f64)> = raw.iter().map(|&(ts, price)| (ts as i64, price)).collect();

    downsample(&points, spacing)
        .into_iter()
        .map(|(ts, price)| PricePoint::from_millis(ts, price))
        .collect()
}

/// Parses durations written like `300ms`, `30s`, `5m`, `1h30m` or `1.5h`.
pub fn parse_duration(input: &str) -> ScrapResult<Duration> {
    let invalid = || ScrapError::validation("Invalid time-skip format. Use formats like 30s, 5m, 1h.");

    let s = input.trim();
    if s.is_empty() {
        return Err(invalid());
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total_nanos: f64 = 0.0;
    let mut rest = s;

    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        if number_len == 0 {
            return Err(invalid());
        }
        let value: f64 = rest[..number_len].parse().map_err(|_| invalid())?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let nanos_per_unit = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60.0 * 1e9,
            "h" => 3600.0 * 1e9,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_len..];

        total_nanos += value * nanos_per_unit;
    }

    if !total_nanos.is_finite() || total_nanos > u64::MAX as f64 {
        return Err(invalid());
    }

    Ok(Duration::from_nanos(total_nanos as u64))
}

/// Parses a requested chart spacing and enforces the configured minimum.
pub fn parse_time_skip(input: &str, minimum: Duration) -> ScrapResult<Duration> {
    let skip = parse_duration(input)?;
    if skip < minimum {
        return Err(ScrapError::validation(format!(
            "Time interval must be at least {} seconds",
            minimum.as_secs()
        )));
    }
    Ok(skip)
}
