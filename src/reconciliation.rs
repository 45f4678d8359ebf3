// ⚖️ Reconciliation Engine - merge persisted history with a fresh observation
//
// Rules:
//   Unavailable        → records carried forward untouched, outcome = Stale
//   Observed(live)     → per identifier in previous ∪ live:
//       live + known   → Accredited, name refreshed, first_seen kept
//       live + unknown → new Accredited record, first_seen = now
//       known, not live → Unlisted, everything else kept
//
// A failed scrape must never read as "everyone lost their accreditation",
// and nothing is ever deleted.

use crate::extractor::{ExtractionResult, Listing};
use crate::organization::{AccreditationStatus, OrganizationRecord, RegistryState, UpdateOutcome};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::warn;

// ============================================================================
// CHANGE CLASSIFICATION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// First time on the live list
    NewlyAccredited,
    /// Accredited before and still listed
    StillAccredited,
    /// Was unlisted, back on the live list
    Reaccredited,
    /// Accredited before, gone from the live list
    NewlyUnlisted,
    /// Unlisted before and still absent
    StillUnlisted,
}

impl ChangeKind {
    /// Whether the status differs from the previous run
    pub fn is_transition(&self) -> bool {
        matches!(
            self,
            ChangeKind::NewlyAccredited | ChangeKind::Reaccredited | ChangeKind::NewlyUnlisted
        )
    }

    fn classify(previous: Option<AccreditationStatus>, listed: bool) -> Self {
        match (previous, listed) {
            (None, _) => ChangeKind::NewlyAccredited,
            (Some(AccreditationStatus::Accredited), true) => ChangeKind::StillAccredited,
            (Some(AccreditationStatus::Unlisted), true) => ChangeKind::Reaccredited,
            (Some(AccreditationStatus::Accredited), false) => ChangeKind::NewlyUnlisted,
            (Some(AccreditationStatus::Unlisted), false) => ChangeKind::StillUnlisted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub identifier: String,
    pub kind: ChangeKind,
    /// Previous name, when a refresh changed it
    pub renamed_from: Option<String>,
}

impl StatusChange {
    pub fn renamed(&self) -> bool {
        self.renamed_from.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationSummary {
    pub newly_accredited: usize,
    pub still_accredited: usize,
    pub reaccredited: usize,
    pub newly_unlisted: usize,
    pub still_unlisted: usize,
    pub renamed: usize,
}

impl ReconciliationSummary {
    fn tally(changes: &[StatusChange]) -> Self {
        let mut summary = ReconciliationSummary::default();
        for change in changes {
            match change.kind {
                ChangeKind::NewlyAccredited => summary.newly_accredited += 1,
                ChangeKind::StillAccredited => summary.still_accredited += 1,
                ChangeKind::Reaccredited => summary.reaccredited += 1,
                ChangeKind::NewlyUnlisted => summary.newly_unlisted += 1,
                ChangeKind::StillUnlisted => summary.still_unlisted += 1,
            }
            if change.renamed() {
                summary.renamed += 1;
            }
        }
        summary
    }

    pub fn transitions(&self) -> usize {
        self.newly_accredited + self.reaccredited + self.newly_unlisted
    }
}

// ============================================================================
// RECONCILIATION
// ============================================================================

/// Output of one pass: the next state plus what happened to each identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub state: RegistryState,
    /// One entry per identifier in previous ∪ live, in identifier order.
    /// Empty on a stale pass.
    pub changes: Vec<StatusChange>,
    pub summary: ReconciliationSummary,
    /// Why the observation was rejected, on a stale pass
    pub stale_reason: Option<String>,
}

impl Reconciliation {
    pub fn outcome(&self) -> UpdateOutcome {
        match self.stale_reason {
            Some(_) => UpdateOutcome::Stale,
            None => UpdateOutcome::Success,
        }
    }

    pub fn is_stale(&self) -> bool {
        self.stale_reason.is_some()
    }

    pub fn summary_line(&self) -> String {
        match &self.stale_reason {
            Some(reason) => format!(
                "Stale: {} records carried forward unchanged ({})",
                self.state.len(),
                reason
            ),
            None => format!(
                "Success: {} new, {} still accredited, {} re-accredited, {} unlisted, {} still unlisted, {} renamed",
                self.summary.newly_accredited,
                self.summary.still_accredited,
                self.summary.reaccredited,
                self.summary.newly_unlisted,
                self.summary.still_unlisted,
                self.summary.renamed
            ),
        }
    }
}

// ============================================================================
// RECONCILER
// ============================================================================

/// The decision core. Pure: no I/O, no clock, no failure modes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reconciler;

impl Reconciler {
    pub fn new() -> Self {
        Reconciler
    }

    /// Compute the next registry state.
    ///
    /// Example:
    /// ```
    /// use accreditation_ledger::{ExtractionResult, Listing, Reconciler, RegistryState};
    /// use chrono::Utc;
    ///
    /// let live = Listing::from_pairs([("https://a.example", "A")]).unwrap();
    /// let next = Reconciler::new().reconcile(
    ///     &RegistryState::empty(),
    ///     &ExtractionResult::Observed(live),
    ///     Utc::now(),
    /// );
    /// assert_eq!(next.state.len(), 1);
    /// ```
    pub fn reconcile(
        &self,
        previous: &RegistryState,
        observation: &ExtractionResult,
        now: DateTime<Utc>,
    ) -> Reconciliation {
        match observation {
            ExtractionResult::Unavailable(reason) => self.carry_forward(previous, reason, now),
            ExtractionResult::Observed(live) => self.merge(previous, live, now),
        }
    }

    /// Failed observation: history is copied verbatim
    fn carry_forward(&self, previous: &RegistryState, reason: &str, now: DateTime<Utc>) -> Reconciliation {
        Reconciliation {
            state: RegistryState {
                last_update_time: Some(now),
                last_update_outcome: Some(UpdateOutcome::Stale),
                records: previous.records.clone(),
            },
            changes: Vec::new(),
            summary: ReconciliationSummary::default(),
            stale_reason: Some(reason.to_string()),
        }
    }

    fn merge(&self, previous: &RegistryState, live: &Listing, now: DateTime<Utc>) -> Reconciliation {
        let mut records = BTreeMap::new();
        let mut changes = Vec::with_capacity(previous.len().max(live.len()));

        // Everything we already know about: refresh or unlist
        for (identifier, record) in &previous.records {
            if now < record.first_seen {
                warn!(
                    "Clock behind first sighting of {} ({} < {})",
                    identifier, now, record.first_seen
                );
            }

            let kind = ChangeKind::classify(Some(record.status), live.contains(identifier));

            let (next, renamed_from) = match live.get(identifier) {
                Some(name) => {
                    let renamed_from = (record.name != name).then(|| record.name.clone());
                    (record.observed_again(name, now), renamed_from)
                }
                None => (record.unlisted(), None),
            };

            records.insert(identifier.clone(), next);
            changes.push(StatusChange {
                identifier: identifier.clone(),
                kind,
                renamed_from,
            });
        }

        // Newcomers
        for (identifier, name) in live.iter() {
            if previous.records.contains_key(identifier) {
                continue;
            }
            records.insert(
                identifier.to_string(),
                OrganizationRecord::first_observed(identifier, name, now),
            );
            changes.push(StatusChange {
                identifier: identifier.to_string(),
                kind: ChangeKind::NewlyAccredited,
                renamed_from: None,
            });
        }

        changes.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        let summary = ReconciliationSummary::tally(&changes);

        Reconciliation {
            state: RegistryState {
                last_update_time: Some(now),
                last_update_outcome: Some(UpdateOutcome::Success),
                records,
            },
            changes,
            summary,
            stale_reason: None,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
