//! Static creature metadata and its loading chain.
//!
//! Classification attributes (aggro modality, danger tier, patrol and boss
//! flags) come from a community-maintained JSON table keyed by name id. The
//! table is loaded through an ordered chain of sources; the first source
//! that yields a non-empty table wins, and a fully failed load leaves the
//! table empty rather than failing the overlay. An empty table degrades
//! classification to template-id matching only, which is why
//! [`MobInfoStore::reload_if_empty`] retries the chain at every run start.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::{info, warn};

use crate::entity::{AggroKind, DangerTier, NameId};

// =============================================================================
// MobInfo
// =============================================================================

/// One creature's static metadata record.
#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct MobInfo {
    /// Name id this record applies to.
    pub id: NameId,
    /// Aggro modality.
    #[serde(default)]
    pub aggro: AggroKind,
    /// Danger tier.
    #[serde(default)]
    pub danger: DangerTier,
    /// Whether the creature patrols.
    #[serde(default)]
    pub patrol: bool,
    /// Whether the creature is a boss or a boss add.
    #[serde(default)]
    pub boss_or_add: bool,
    /// Whether the creature is a rare spawn.
    #[serde(default)]
    pub special: bool,
}

/// Why a metadata source failed to produce a table.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// The source could not be read.
    #[error("failed to read metadata from {source_name}: {inner}")]
    Read {
        /// Human-readable source description.
        source_name: String,
        /// Underlying I/O error.
        #[source]
        inner: std::io::Error,
    },
    /// The source's content was not valid metadata JSON.
    #[error("failed to parse metadata from {source_name}: {inner}")]
    Parse {
        /// Human-readable source description.
        source_name: String,
        /// Underlying parse error.
        #[source]
        inner: serde_json::Error,
    },
}

// =============================================================================
// Sources
// =============================================================================

/// One place the metadata table can be loaded from.
pub trait MetadataSource: Send + Sync {
    /// Loads the full table.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError`] when the source cannot be read or parsed.
    fn fetch(&self) -> Result<Vec<MobInfo>, MetadataError>;

    /// Human-readable description for logging.
    fn describe(&self) -> String;
}

/// Loads the table from a JSON file on disk (the bundled fallback copy, or
/// a previously cached download).
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// Creates a source reading from the given path.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl MetadataSource for FileSource {
    fn fetch(&self) -> Result<Vec<MobInfo>, MetadataError> {
        let text = std::fs::read_to_string(&self.path).map_err(|inner| MetadataError::Read {
            source_name: self.describe(),
            inner,
        })?;
        serde_json::from_str(&text).map_err(|inner| MetadataError::Parse {
            source_name: self.describe(),
            inner,
        })
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

// =============================================================================
// MobInfoStore
// =============================================================================

/// Shared, reloadable metadata table.
pub struct MobInfoStore {
    sources: Vec<Box<dyn MetadataSource>>,
    table: RwLock<HashMap<NameId, MobInfo>>,
}

impl MobInfoStore {
    /// Creates a store with an ordered source chain. Earlier sources are
    /// preferred (typically: network mirror first, bundled file last).
    #[must_use]
    pub fn new(sources: Vec<Box<dyn MetadataSource>>) -> Self {
        Self {
            sources,
            table: RwLock::new(HashMap::new()),
        }
    }

    /// Runs the source chain and replaces the table with the first
    /// non-empty result. A chain that fails outright leaves the previous
    /// table in place.
    pub fn load(&self) {
        for source in &self.sources {
            match source.fetch() {
                Ok(records) if records.is_empty() => {
                    warn!(source = %source.describe(), "metadata_source_empty");
                }
                Ok(records) => {
                    let count = records.len();
                    let mut table = match self.table.write() {
                        Ok(guard) => guard,
                        Err(poisoned) => poisoned.into_inner(),
                    };
                    *table = records.into_iter().map(|m| (m.id, m)).collect();
                    info!(source = %source.describe(), count, "metadata_loaded");
                    return;
                }
                Err(error) => {
                    warn!(source = %source.describe(), %error, "metadata_source_failed");
                }
            }
        }
        warn!("metadata_chain_exhausted");
    }

    /// Retries the chain only when the table is still empty. Called at run
    /// start so a transient failure at startup heals itself.
    pub fn reload_if_empty(&self) {
        if self.is_empty() {
            self.load();
        }
    }

    /// Looks up a creature's record by name id.
    #[must_use]
    pub fn lookup(&self, id: NameId) -> Option<MobInfo> {
        let table = match self.table.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        table.get(&id).cloned()
    }

    /// Returns `true` when no table has been loaded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let table = match self.table.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        table.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
