//! Observer feedback and the integrity reports derived from it.

use std::collections::{BTreeMap, HashMap};

use ballot_core::{
  Result,
  analytics::{IntegrityStatus, SeverityCounts, to_csv, trust_score},
  id::{ElectionId, ObserverId},
  observer::{NewFeedback, ObserverFeedback, Severity},
  store::{FeedbackFilter, VotingStore, store_err},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
  Handle,
  elections::load_election,
  export::{Export, ExportFormat},
  non_blank,
  observers::load_observer,
};

// ─── Requests ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitFeedback {
  pub observer_id: ObserverId,
  pub election_id: ElectionId,
  pub description: String,
  pub severity:    Severity,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ListFeedback {
  pub election_id: Option<ElectionId>,
  pub observer_id: Option<ObserverId>,
  pub severity:    Option<Severity>,
}

#[derive(Debug, Clone, Copy)]
pub struct IntegrityScore {
  pub election_id: ElectionId,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SeverityDistribution {
  pub election_id: Option<ElectionId>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TopObservers {
  /// Defaults to 10.
  pub limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FeedbackTimePatterns {
  pub election_id: Option<ElectionId>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ObserverReliability {
  pub election_id: Option<ElectionId>,
}

#[derive(Debug, Clone)]
pub struct ExportFeedback {
  pub election_id: Option<ElectionId>,
  pub format:      String,
}

// ─── Results ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntegrityReport {
  pub election_id:   ElectionId,
  pub total_reports: i64,
  pub risk_score:    f64,
  pub status:        IntegrityStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObserverReports {
  pub observer_id:  ObserverId,
  pub name:         String,
  pub report_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
  pub date:  NaiveDate,
  pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObserverTrust {
  pub observer_id:  ObserverId,
  pub name:         String,
  pub report_count: i64,
  pub trust_score:  i64,
}

commands! {
  SubmitFeedback => ObserverFeedback;
}

queries! {
  ListFeedback => Vec<ObserverFeedback>;
  IntegrityScore => IntegrityReport;
  SeverityDistribution => SeverityCounts;
  TopObservers => Vec<ObserverReports>;
  FeedbackTimePatterns => Vec<DailyCount>;
  ObserverReliability => Vec<ObserverTrust>;
  ExportFeedback => Export<Vec<ObserverFeedback>>;
}

// ─── Handlers ────────────────────────────────────────────────────────────────

async fn feedback_for<S: VotingStore>(
  store: &S,
  election_id: Option<ElectionId>,
) -> Result<Vec<ObserverFeedback>> {
  store
    .list_feedback(FeedbackFilter { election_id, ..Default::default() })
    .await
    .map_err(store_err)
}

fn reports_per_observer(feedback: &[ObserverFeedback]) -> HashMap<ObserverId, i64> {
  let mut counts = HashMap::new();
  for f in feedback {
    *counts.entry(f.observer_id).or_default() += 1;
  }
  counts
}

impl<S: VotingStore> Handle<S> for SubmitFeedback {
  async fn handle(self, store: &S) -> Result<ObserverFeedback> {
    let description = non_blank(self.description, "Description")?;
    load_observer(store, self.observer_id).await?;
    load_election(store, self.election_id).await?;

    let feedback = store
      .submit_feedback(NewFeedback {
        observer_id: self.observer_id,
        election_id: self.election_id,
        description,
        severity: self.severity,
      })
      .await
      .map_err(store_err)?;

    if feedback.severity == Severity::High {
      tracing::warn!(
        feedback_id = %feedback.feedback_id,
        observer_id = %feedback.observer_id,
        election_id = %feedback.election_id,
        "high severity observer report"
      );
    } else {
      tracing::info!(feedback_id = %feedback.feedback_id, "observer report filed");
    }
    Ok(feedback)
  }
}

impl<S: VotingStore> Handle<S> for ListFeedback {
  async fn handle(self, store: &S) -> Result<Vec<ObserverFeedback>> {
    store
      .list_feedback(FeedbackFilter {
        election_id: self.election_id,
        observer_id: self.observer_id,
        severity:    self.severity,
      })
      .await
      .map_err(store_err)
  }
}

impl<S: VotingStore> Handle<S> for IntegrityScore {
  async fn handle(self, store: &S) -> Result<IntegrityReport> {
    load_election(store, self.election_id).await?;
    let feedback = feedback_for(store, Some(self.election_id)).await?;
    let counts = SeverityCounts::tally(feedback.iter().map(|f| &f.severity));
    Ok(IntegrityReport {
      election_id:   self.election_id,
      total_reports: counts.total(),
      risk_score:    counts.risk_score(),
      status:        counts.status(),
    })
  }
}

impl<S: VotingStore> Handle<S> for SeverityDistribution {
  async fn handle(self, store: &S) -> Result<SeverityCounts> {
    let feedback = feedback_for(store, self.election_id).await?;
    Ok(SeverityCounts::tally(feedback.iter().map(|f| &f.severity)))
  }
}

impl<S: VotingStore> Handle<S> for TopObservers {
  async fn handle(self, store: &S) -> Result<Vec<ObserverReports>> {
    let counts = reports_per_observer(&feedback_for(store, None).await?);
    let observers = store.list_observers(None).await.map_err(store_err)?;

    let mut ranked: Vec<_> = observers
      .into_iter()
      .filter_map(|o| {
        let report_count = *counts.get(&o.observer_id)?;
        Some(ObserverReports { observer_id: o.observer_id, name: o.name, report_count })
      })
      .collect();
    ranked.sort_by(|a, b| {
      b.report_count
        .cmp(&a.report_count)
        .then(a.observer_id.cmp(&b.observer_id))
    });
    ranked.truncate(self.limit.unwrap_or(10));
    Ok(ranked)
  }
}

impl<S: VotingStore> Handle<S> for FeedbackTimePatterns {
  async fn handle(self, store: &S) -> Result<Vec<DailyCount>> {
    let mut days: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    for f in feedback_for(store, self.election_id).await? {
      *days.entry(f.submitted_at.date_naive()).or_default() += 1;
    }
    Ok(days.into_iter().map(|(date, count)| DailyCount { date, count }).collect())
  }
}

impl<S: VotingStore> Handle<S> for ObserverReliability {
  async fn handle(self, store: &S) -> Result<Vec<ObserverTrust>> {
    let counts = reports_per_observer(&feedback_for(store, self.election_id).await?);
    let observers = store
      .list_observers(self.election_id)
      .await
      .map_err(store_err)?;

    Ok(
      observers
        .into_iter()
        .map(|o| {
          let report_count = counts.get(&o.observer_id).copied().unwrap_or(0);
          ObserverTrust {
            observer_id: o.observer_id,
            name: o.name,
            report_count,
            trust_score: trust_score(report_count),
          }
        })
        .collect(),
    )
  }
}

impl<S: VotingStore> Handle<S> for ExportFeedback {
  async fn handle(self, store: &S) -> Result<Export<Vec<ObserverFeedback>>> {
    let format = ExportFormat::parse(&self.format)?;
    let feedback = feedback_for(store, self.election_id).await?;
    Ok(match format {
      ExportFormat::Json => Export::Json(feedback),
      ExportFormat::Csv => Export::Csv(to_csv(
        &[
          "Feedback ID",
          "Observer ID",
          "Election ID",
          "Severity",
          "Description",
          "Submitted At",
        ],
        feedback.iter().map(|f| {
          [
            f.feedback_id.to_string(),
            f.observer_id.to_string(),
            f.election_id.to_string(),
            f.severity.to_string(),
            f.description.clone(),
            f.submitted_at.to_rfc3339(),
          ]
        }),
      )),
    })
  }
}
