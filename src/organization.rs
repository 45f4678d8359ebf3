// 🏢 Organization Entity - identity is the URL, the name is just a value
//
// Display names are neither unique nor stable upstream, so the canonical URL is
// the key. A record is never removed: leaving the live list is a status change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// STATUS ENUMS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccreditationStatus {
    Accredited,
    Unlisted,
}

impl AccreditationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccreditationStatus::Accredited => "accredited",
            AccreditationStatus::Unlisted => "unlisted",
        }
    }

    /// Text shown on the status page
    pub fn label(&self) -> &'static str {
        match self {
            AccreditationStatus::Accredited => "Accredited",
            AccreditationStatus::Unlisted => "Accreditation Lost",
        }
    }

    pub fn is_accredited(&self) -> bool {
        matches!(self, AccreditationStatus::Accredited)
    }
}

/// Whether the last run could trust its observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateOutcome {
    Success,
    Stale,
}

impl UpdateOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateOutcome::Success => "success",
            UpdateOutcome::Stale => "stale",
        }
    }
}

// ============================================================================
// ORGANIZATION RECORD
// ============================================================================

/// One tracked organization.
///
/// Records are values: the reconciler builds a fresh one per pass instead of
/// editing the previous state in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationRecord {
    /// Canonical URL (never changes once created)
    pub identifier: String,

    /// Display name as last observed
    pub name: String,

    pub status: AccreditationStatus,

    /// Creation time, set once
    pub first_seen: DateTime<Utc>,

    /// Last run in which the organization was on the live list
    pub last_seen_accredited: Option<DateTime<Utc>>,
}

impl OrganizationRecord {
    /// A record for an organization seen for the first time at `now`
    pub fn first_observed(identifier: &str, name: &str, now: DateTime<Utc>) -> Self {
        OrganizationRecord {
            identifier: identifier.to_string(),
            name: name.to_string(),
            status: AccreditationStatus::Accredited,
            first_seen: now,
            last_seen_accredited: Some(now),
        }
    }

    /// Next value for an organization present on the live list.
    ///
    /// `last_seen_accredited` never falls before `first_seen`, even if the
    /// clock went backwards between runs.
    pub fn observed_again(&self, name: &str, now: DateTime<Utc>) -> Self {
        OrganizationRecord {
            identifier: self.identifier.clone(),
            name: name.to_string(),
            status: AccreditationStatus::Accredited,
            first_seen: self.first_seen,
            last_seen_accredited: Some(now.max(self.first_seen)),
        }
    }

    /// Next value for an organization missing from the live list
    pub fn unlisted(&self) -> Self {
        OrganizationRecord {
            status: AccreditationStatus::Unlisted,
            ..self.clone()
        }
    }

    pub fn is_accredited(&self) -> bool {
        self.status.is_accredited()
    }
}

/// Reasons a record cannot enter the registry
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("record identifier must not be empty")]
    EmptyIdentifier,

    #[error("record keyed {key:?} carries identifier {identifier:?}")]
    KeyMismatch { key: String, identifier: String },
}

// ============================================================================
// REGISTRY STATE
// ============================================================================

/// The persisted aggregate.
///
/// `BTreeMap` keeps the on-disk order stable so an unchanged registry
/// serializes to the same bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryState {
    /// `None` until the first run completes
    pub last_update_time: Option<DateTime<Utc>>,
    pub last_update_outcome: Option<UpdateOutcome>,
    pub records: BTreeMap<String, OrganizationRecord>,
}

impl RegistryState {
    /// Clean slate: no records, never updated
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, identifier: &str) -> Option<&OrganizationRecord> {
        self.records.get(identifier)
    }

    /// Insert or replace a record, keyed by its own identifier
    pub fn put(&mut self, record: OrganizationRecord) -> Result<Option<OrganizationRecord>, RecordError> {
        if record.identifier.trim().is_empty() {
            return Err(RecordError::EmptyIdentifier);
        }
        Ok(self.records.insert(record.identifier.clone(), record))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn accredited_count(&self) -> usize {
        self.records.values().filter(|r| r.is_accredited()).count()
    }

    pub fn unlisted_count(&self) -> usize {
        self.len() - self.accredited_count()
    }

    /// Check the structural invariants that the type system does not enforce
    pub fn validate(&self) -> Result<(), RecordError> {
        for (key, record) in &self.records {
            if key.trim().is_empty() {
                return Err(RecordError::EmptyIdentifier);
            }
            if key != &record.identifier {
                return Err(RecordError::KeyMismatch {
                    key: key.clone(),
                    identifier: record.identifier.clone(),
                });
            }
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_first_observed_is_accredited() {
        let record = OrganizationRecord::first_observed("https://a.example", "A", t(1));

        assert_eq!(record.status, AccreditationStatus::Accredited);
        assert_eq!(record.first_seen, t(1));
        assert_eq!(record.last_seen_accredited, Some(t(1)));
    }

    #[test]
    fn test_observed_again_keeps_first_seen() {
        let original = OrganizationRecord::first_observed("https://a.example", "A", t(1));
        let next = original.unlisted().observed_again("A Renamed", t(5));

        assert_eq!(next.name, "A Renamed");
        assert_eq!(next.first_seen, t(1));
        assert_eq!(next.last_seen_accredited, Some(t(5)));
        assert!(next.is_accredited());
    }

    #[test]
    fn test_observed_again_never_precedes_first_seen() {
        let original = OrganizationRecord::first_observed("https://a.example", "A", t(10));
        let next = original.observed_again("A", t(8));

        assert_eq!(next.first_seen, t(10));
        assert_eq!(next.last_seen_accredited, Some(t(10)));
    }

    #[test]
    fn test_unlisted_keeps_everything_else() {
        let original = OrganizationRecord::first_observed("https://a.example", "A", t(1));
        let gone = original.unlisted();

        assert_eq!(gone.status, AccreditationStatus::Unlisted);
        assert_eq!(gone.name, original.name);
        assert_eq!(gone.first_seen, original.first_seen);
        assert_eq!(gone.last_seen_accredited, original.last_seen_accredited);
    }

    #[test]
    fn test_put_rejects_blank_identifier() {
        let mut state = RegistryState::empty();
        let record = OrganizationRecord::first_observed("  ", "Nameless", t(1));

        assert_eq!(state.put(record), Err(RecordError::EmptyIdentifier));
        assert!(state.is_empty());
    }

    #[test]
    fn test_counts_and_validate() {
        let mut state = RegistryState::empty();
        let a = OrganizationRecord::first_observed("https://a.example", "A", t(1));
        let b = OrganizationRecord::first_observed("https://b.example", "B", t(1)).unlisted();
        state.put(a).unwrap();
        state.put(b).unwrap();

        assert_eq!(state.accredited_count(), 1);
        assert_eq!(state.unlisted_count(), 1);
        assert!(state.validate().is_ok());

        let mut broken = state.clone();
        let stray = OrganizationRecord::first_observed("https://c.example", "C", t(1));
        broken.records.insert("https://other.example".to_string(), stray);
        assert!(matches!(broken.validate(), Err(RecordError::KeyMismatch { .. })));
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(AccreditationStatus::Accredited.label(), "Accredited");
        assert_eq!(AccreditationStatus::Unlisted.label(), "Accreditation Lost");
        assert_eq!(UpdateOutcome::Stale.as_str(), "stale");
    }
}
