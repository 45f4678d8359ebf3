// 💾 Registry Store - durable JSON state with atomic writes
//
// The on-disk shape stays readable by (and from) the first generation of the
// tracker: `last_update_utc`, `update_status`, `companies{url: record}`.
// Loading fails closed: anything we cannot read or trust becomes an empty
// registry, and the file is moved aside instead of being overwritten later.

use crate::error::StoreError;
use crate::organization::{AccreditationStatus, OrganizationRecord, RegistryState, UpdateOutcome};
use crate::temporal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

// ============================================================================
// WIRE FORMAT
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    #[serde(rename = "last_update_utc")]
    #[serde(default, with = "temporal::lenient_option")]
    #[serde(skip_serializing_if = "Option::is_none")]
    last_update_time: Option<DateTime<Utc>>,

    #[serde(rename = "update_status")]
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    last_update_outcome: Option<UpdateOutcome>,

    #[serde(default)]
    companies: BTreeMap<String, RecordFile>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RecordFile {
    #[serde(default)]
    name: Option<String>,

    /// Mirrors the key; the key wins on read
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    website: Option<String>,

    status: AccreditationStatus,

    #[serde(rename = "first_seen_utc", with = "temporal::lenient")]
    first_seen: DateTime<Utc>,

    #[serde(rename = "last_seen_accredited_utc")]
    #[serde(default, with = "temporal::lenient_option")]
    #[serde(skip_serializing_if = "Option::is_none")]
    last_seen_accredited: Option<DateTime<Utc>>,
}

impl StateFile {
    fn from_state(state: &RegistryState) -> Self {
        let companies = state
            .records
            .iter()
            .map(|(key, record)| {
                let file = RecordFile {
                    name: Some(record.name.clone()),
                    website: Some(record.identifier.clone()),
                    status: record.status,
                    first_seen: record.first_seen,
                    last_seen_accredited: record.last_seen_accredited,
                };
                (key.clone(), file)
            })
            .collect();

        StateFile {
            last_update_time: state.last_update_time,
            last_update_outcome: state.last_update_outcome,
            companies,
        }
    }

    /// Structural validation: the key must be a usable identifier
    fn into_state(self) -> Result<RegistryState, String> {
        let mut state = RegistryState {
            last_update_time: self.last_update_time,
            last_update_outcome: self.last_update_outcome,
            records: BTreeMap::new(),
        };

        for (key, file) in self.companies {
            if key.trim().is_empty() {
                return Err("record with empty identifier".to_string());
            }

            if let Some(website) = file.website.as_deref() {
                if website != key {
                    debug!("Record {} carries website {}; keeping the key", key, website);
                }
            }

            let record = OrganizationRecord {
                identifier: key,
                name: file.name.unwrap_or_default(),
                status: file.status,
                first_seen: file.first_seen,
                last_seen_accredited: file.last_seen_accredited,
            };
            state.put(record).map_err(|e| e.to_string())?;
        }

        Ok(state)
    }
}

// ============================================================================
// REGISTRY STORE
// ============================================================================

pub struct RegistryStore {
    path: PathBuf,
}

impl RegistryStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        RegistryStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Classifying load: `Ok(None)` = no file yet, `Err(Corrupt)` = untrusted
    pub fn try_load(&self) -> Result<Option<RegistryState>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) if err.kind() == io::ErrorKind::InvalidData => {
                return Err(self.corrupt(format!("not valid UTF-8: {err}")));
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let file: StateFile =
            serde_json::from_str(&content).map_err(|e| self.corrupt(e.to_string()))?;
        let state = file.into_state().map_err(|reason| self.corrupt(reason))?;

        Ok(Some(state))
    }

    /// Load for a run that will save afterwards.
    ///
    /// Missing, malformed or unreadable files all yield an empty state, and any
    /// file that was there is moved aside first. `Err(Quarantine)` means it is
    /// still in place, so the caller must not save over it.
    pub fn open(&self) -> Result<RegistryState, StoreError> {
        match self.try_load() {
            Ok(Some(state)) => {
                info!(
                    "Loaded {} records from {}",
                    state.len(),
                    self.path.display()
                );
                Ok(state)
            }
            Ok(None) => {
                info!("No state at {}; starting empty", self.path.display());
                Ok(RegistryState::empty())
            }
            Err(err) => {
                if err.is_corrupt() {
                    warn!("{}; starting from an empty registry", err);
                } else {
                    warn!("State unreadable ({}); starting from an empty registry", err);
                }
                self.quarantine()?;
                Ok(RegistryState::empty())
            }
        }
    }

    /// Fail-closed load: always returns a usable state
    pub fn load(&self) -> RegistryState {
        self.open().unwrap_or_else(|err| {
            warn!("{}", err);
            RegistryState::empty()
        })
    }

    /// Atomic save: write a sibling temp file, flush it, rename over the target
    pub fn save(&self, state: &RegistryState) -> Result<(), StoreError> {
        state.validate()?;
        let json = serde_json::to_string_pretty(&StateFile::from_state(state))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| self.io_error(parent, source))?;
            }
        }

        let temp = self.temp_path();
        write_synced(&temp, json.as_bytes()).map_err(|source| self.io_error(&temp, source))?;
        fs::rename(&temp, &self.path).map_err(|source| self.io_error(&self.path, source))?;

        info!("Saved {} records to {}", state.len(), self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        sibling_with_suffix(&self.path, ".tmp")
    }

    /// Move an untrusted file aside so the next save cannot destroy it
    fn quarantine(&self) -> Result<PathBuf, StoreError> {
        let suffix = format!(".corrupt-{}", Utc::now().format("%Y%m%dT%H%M%S"));
        let target = sibling_with_suffix(&self.path, &suffix);

        fs::rename(&self.path, &target).map_err(|source| StoreError::Quarantine {
            path: self.path.clone(),
            source,
        })?;

        warn!("Moved untrusted state file to {}", target.display());
        Ok(target)
    }

    fn corrupt(&self, reason: String) -> StoreError {
        StoreError::Corrupt {
            path: self.path.clone(),
            reason,
        }
    }

    fn io_error(&self, path: &Path, source: io::Error) -> StoreError {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

// ============================================================================
// TESTS
// ============================================================================
