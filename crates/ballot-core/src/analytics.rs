//! Pure aggregation helpers shared by the result, turnout, and feedback
//! reports. Nothing here touches storage.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::{election::CandidateResult, observer::Severity};

// ─── Percentages ─────────────────────────────────────────────────────────────

/// `part / total × 100` with integer floor. Returns 0 when `total` is 0.
pub fn floor_percentage(part: i64, total: i64) -> i64 {
  if total <= 0 { 0 } else { part * 100 / total }
}

pub fn round2(value: f64) -> f64 { (value * 100.0).round() / 100.0 }

/// `part / total × 100` rounded to two decimal places. Returns 0 when `total`
/// is 0.
pub fn percentage_2dp(part: i64, total: i64) -> f64 {
  if total <= 0 {
    0.0
  } else {
    round2(part as f64 / total as f64 * 100.0)
  }
}

/// Relative change from `previous` to `current`, in percent to two places.
/// `None` when there is nothing to compare against.
pub fn percentage_change(previous: i64, current: i64) -> Option<f64> {
  (previous > 0)
    .then(|| round2((current - previous) as f64 / previous as f64 * 100.0))
}

// ─── Forecasting ─────────────────────────────────────────────────────────────

/// Integer-floored mean. 0 for an empty slice.
pub fn moving_average(values: &[i64]) -> i64 {
  if values.is_empty() {
    return 0;
  }
  values.iter().sum::<i64>() / values.len() as i64
}

/// Population standard deviation. 0 for an empty slice.
pub fn population_std_dev(values: &[i64]) -> f64 {
  if values.is_empty() {
    return 0.0;
  }
  let n = values.len() as f64;
  let mean = values.iter().sum::<i64>() as f64 / n;
  let variance =
    values.iter().map(|v| (*v as f64 - mean).powi(2)).sum::<f64>() / n;
  variance.sqrt()
}

/// How much a turnout forecast can be trusted, judged by the spread of the
/// history it was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
  High,
  Moderate,
  Low,
}

impl Confidence {
  pub fn from_std_dev(std_dev: f64) -> Self {
    if std_dev < 5.0 {
      Self::High
    } else if std_dev < 15.0 {
      Self::Moderate
    } else {
      Self::Low
    }
  }
}

// ─── Observer reports ────────────────────────────────────────────────────────

/// Observer trust grows by 10 per filed report, capped at 100.
pub fn trust_score(reports: i64) -> i64 { (reports * 10).min(100) }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrityStatus {
  Stable,
  Moderate,
  Critical,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
  #[serde(rename = "LOW")]
  pub low:    i64,
  #[serde(rename = "MEDIUM")]
  pub medium: i64,
  #[serde(rename = "HIGH")]
  pub high:   i64,
}

impl SeverityCounts {
  pub fn tally<'a>(severities: impl IntoIterator<Item = &'a Severity>) -> Self {
    let mut counts = Self::default();
    for severity in severities {
      match severity {
        Severity::Low => counts.low += 1,
        Severity::Medium => counts.medium += 1,
        Severity::High => counts.high += 1,
      }
    }
    counts
  }

  pub fn total(&self) -> i64 { self.low + self.medium + self.high }

  /// Mean severity weight, to two places. 0 with no reports.
  pub fn risk_score(&self) -> f64 {
    let total = self.total();
    if total == 0 {
      return 0.0;
    }
    let weighted = Severity::High.weight() * self.high
      + Severity::Medium.weight() * self.medium
      + Severity::Low.weight() * self.low;
    round2(weighted as f64 / total as f64)
  }

  pub fn status(&self) -> IntegrityStatus {
    let risk = self.risk_score();
    if risk >= 2.5 {
      IntegrityStatus::Critical
    } else if risk >= 1.5 {
      IntegrityStatus::Moderate
    } else {
      IntegrityStatus::Stable
    }
  }
}

// ─── Time buckets ────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TimeBucket {
  #[default]
  Hourly,
  Daily,
}

impl TimeBucket {
  /// Truncate `at` to the start of its hour or day.
  pub fn truncate(self, at: DateTime<Utc>) -> DateTime<Utc> {
    let hour = match self {
      Self::Hourly => at.hour(),
      Self::Daily => 0,
    };
    at.date_naive()
      .and_hms_opt(hour, 0, 0)
      .map(|naive| naive.and_utc())
      .unwrap_or(at)
  }
}

// ─── CSV ─────────────────────────────────────────────────────────────────────

fn csv_field(field: &str) -> String {
  if field.contains([',', '"', '\r', '\n']) {
    format!("\"{}\"", field.replace('"', "\"\""))
  } else {
    field.to_owned()
  }
}

/// Render a CSV document with CRLF line endings. Fields containing a comma,
/// quote, or line break are quoted.
pub fn to_csv<R, F>(header: &[&str], rows: R) -> String
where
  R: IntoIterator<Item = F>,
  F: IntoIterator<Item = String>,
{
  let mut out = String::new();
  let header: Vec<_> = header.iter().map(|h| csv_field(h)).collect();
  out.push_str(&header.join(","));
  out.push_str("\r\n");
  for row in rows {
    let fields: Vec<_> = row.into_iter().map(|f| csv_field(&f)).collect();
    out.push_str(&fields.join(","));
    out.push_str("\r\n");
  }
  out
}

pub fn results_csv(results: &[CandidateResult]) -> String {
  to_csv(
    &["Candidate", "Votes", "Percentage"],
    results.iter().map(|r| {
      [r.candidate.clone(), r.votes.to_string(), r.percentage.to_string()]
    }),
  )
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn floor_percentage_guards_zero_total() {
    assert_eq!(floor_percentage(3, 5), 60);
    assert_eq!(floor_percentage(1, 3), 33);
    assert_eq!(floor_percentage(0, 0), 0);
  }

  #[test]
  fn percentage_2dp_rounds() {
    assert_eq!(percentage_2dp(1, 3), 33.33);
    assert_eq!(percentage_2dp(2, 3), 66.67);
    assert_eq!(percentage_2dp(5, 0), 0.0);
  }

  #[test]
  fn percentage_change_needs_a_nonzero_baseline() {
    assert_eq!(percentage_change(0, 10), None);
    assert_eq!(percentage_change(4, 5), Some(25.0));
    assert_eq!(percentage_change(4, 2), Some(-50.0));
  }

  #[test]
  fn forecast_helpers() {
    assert_eq!(moving_average(&[10, 11, 13]), 11);
    assert_eq!(moving_average(&[]), 0);
    assert_eq!(population_std_dev(&[2, 4, 4, 4, 5, 5, 7, 9]), 2.0);
    assert_eq!(Confidence::from_std_dev(4.99), Confidence::High);
    assert_eq!(Confidence::from_std_dev(5.0), Confidence::Moderate);
    assert_eq!(Confidence::from_std_dev(15.0), Confidence::Low);
  }

  #[test]
  fn trust_score_caps_at_100() {
    assert_eq!(trust_score(3), 30);
    assert_eq!(trust_score(12), 100);
  }

  #[test]
  fn integrity_thresholds() {
    let none = SeverityCounts::default();
    assert_eq!(none.risk_score(), 0.0);
    assert_eq!(none.status(), IntegrityStatus::Stable);

    let critical = SeverityCounts::tally(&[Severity::High, Severity::High]);
    assert_eq!(critical.risk_score(), 3.0);
    assert_eq!(critical.status(), IntegrityStatus::Critical);

    let moderate = SeverityCounts { low: 1, medium: 1, high: 0 };
    assert_eq!(moderate.risk_score(), 1.5);
    assert_eq!(moderate.status(), IntegrityStatus::Moderate);

    let stable = SeverityCounts { low: 3, medium: 1, high: 0 };
    assert_eq!(stable.risk_score(), 1.25);
    assert_eq!(stable.status(), IntegrityStatus::Stable);
  }

  #[test]
  fn time_buckets_truncate() {
    let at = Utc.with_ymd_and_hms(2025, 5, 10, 9, 45, 12).unwrap();
    assert_eq!(
      TimeBucket::Hourly.truncate(at),
      Utc.with_ymd_and_hms(2025, 5, 10, 9, 0, 0).unwrap()
    );
    assert_eq!(
      TimeBucket::Daily.truncate(at),
      Utc.with_ymd_and_hms(2025, 5, 10, 0, 0, 0).unwrap()
    );
  }

  #[test]
  fn results_csv_has_header_and_crlf_rows() {
    let rows = vec![
      CandidateResult { candidate: "A".into(), votes: 1, percentage: 50 },
      CandidateResult { candidate: "B".into(), votes: 1, percentage: 50 },
    ];
    assert_eq!(
      results_csv(&rows),
      "Candidate,Votes,Percentage\r\nA,1,50\r\nB,1,50\r\n"
    );
  }

  #[test]
  fn csv_quotes_awkward_fields() {
    let doc = to_csv(&["x"], [["a, \"b\"".to_owned()]]);
    assert_eq!(doc, "x\r\n\"a, \"\"b\"\"\"\r\n");
  }
}
