//! JSONL persistence for in-memory storage.
//!
//! Each line of the file is one serialized [`BlockingRelation`]. The format
//! carries only what is needed to rebuild the graph; it is not a stable
//! interchange format.

use super::graph::would_close_cycle;
use super::inner::InMemoryStoreInner;
use super::wrap;
use crate::domain::{BlockingRelation, CarId, RelationId};
use crate::error::{Result, StorageError};
use crate::storage::RelationStore;
use std::collections::HashSet;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};

/// Warnings that can occur during JSONL file loading.
///
/// These are non-fatal: the offending line is skipped and loading continues.
/// They indicate a file that was edited by hand or written by a buggy
/// version, and should be reported to an operator.
///
/// **Example:**
/// ```no_run
/// # use parkchain::storage::in_memory::{load_from_jsonl, LoadWarning};
/// # use std::path::Path;
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> anyhow::Result<()> {
/// let (store, warnings) = load_from_jsonl(Path::new(".parkchain/relations.jsonl")).await?;
///
/// for warning in warnings {
///     match warning {
///         LoadWarning::MalformedJson { line_number, error } => {
///             eprintln!("Skipped malformed JSON at line {}: {}", line_number, error);
///         }
///         other => eprintln!("Skipped relation: {:?}", other),
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// Line that couldn't be parsed as a relation
    ///
    /// **Effect**: Line is skipped entirely.
    MalformedJson {
        /// 1-based line number in the file
        line_number: usize,
        /// Parser message
        error: String,
    },

    /// Relation with the same car on both ends
    ///
    /// **Effect**: Relation is skipped.
    SelfBlocking {
        /// 1-based line number in the file
        line_number: usize,
        /// The car blocking itself
        car: CarId,
    },

    /// Second relation for an ordered pair already loaded
    ///
    /// **Effect**: The later line is skipped; the first one wins.
    DuplicateRelation {
        /// 1-based line number in the file
        line_number: usize,
        /// Blocking side of the pair
        blocking: CarId,
        /// Blocked side of the pair
        blocked: CarId,
    },

    /// Relation id outside the range the store can allocate after
    ///
    /// **Effect**: Relation is skipped.
    InvalidId {
        /// 1-based line number in the file
        line_number: usize,
        /// The rejected id
        id: RelationId,
    },

    /// Relation id already used by an earlier line
    ///
    /// **Effect**: The later line is skipped.
    DuplicateId {
        /// 1-based line number in the file
        line_number: usize,
        /// The reused id
        id: RelationId,
    },

    /// Relation that would close a loop with earlier lines
    ///
    /// **Effect**: The edge is skipped to break the cycle.
    CircularRelation {
        /// 1-based line number in the file
        line_number: usize,
        /// Blocking side of the pair
        blocking: CarId,
        /// Blocked side of the pair
        blocked: CarId,
    },
}

/// Load a store from a JSONL file.
///
/// Lines are applied in file order. A relation is skipped, with a
/// [`LoadWarning`], when it is malformed, a self-loop, carries an unusable
/// id, duplicates an earlier pair or id, or would close a cycle with the
/// relations loaded before it. Blank lines are ignored.
///
/// # Errors
///
/// Returns `StorageError::Io` if the file cannot be opened or read.
///
/// # Returns
///
/// Returns a tuple of `(store, warnings)`.
pub async fn load_from_jsonl(path: &Path) -> Result<(Box<dyn RelationStore>, Vec<LoadWarning>)> {
    let (inner, warnings) = load_inner(path).await?;
    Ok((Box::new(wrap(inner)), warnings))
}

pub(crate) async fn load_inner(path: &Path) -> Result<(InMemoryStoreInner, Vec<LoadWarning>)> {
    let file = File::open(path).await.map_err(StorageError::Io)?;
    let mut lines = BufReader::new(file).lines();

    let mut inner = InMemoryStoreInner::new();
    let mut warnings = Vec::new();
    let mut seen_ids = HashSet::new();
    let mut line_number = 0;

    while let Some(line) = lines.next_line().await.map_err(StorageError::Io)? {
        line_number += 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let relation: BlockingRelation = match serde_json::from_str(trimmed) {
            Ok(relation) => relation,
            Err(e) => {
                warnings.push(LoadWarning::MalformedJson {
                    line_number,
                    error: e.to_string(),
                });
                continue;
            }
        };

        if let Some(warning) = check_line(&inner, &seen_ids, &relation, line_number) {
            warnings.push(warning);
            continue;
        }

        seen_ids.insert(relation.id);
        inner.insert(relation)?;
    }

    tracing::debug!(
        path = %path.display(),
        relations = inner.relations.len(),
        warnings = warnings.len(),
        "Loaded relations from JSONL"
    );

    Ok((inner, warnings))
}

fn check_line(
    inner: &InMemoryStoreInner,
    seen_ids: &HashSet<RelationId>,
    relation: &BlockingRelation,
    line_number: usize,
) -> Option<LoadWarning> {
    let blocking = relation.blocking_car_id;
    let blocked = relation.blocked_car_id;

    if blocking == blocked {
        return Some(LoadWarning::SelfBlocking {
            line_number,
            car: blocking,
        });
    }
    if relation.id.0 == u64::MAX {
        return Some(LoadWarning::InvalidId {
            line_number,
            id: relation.id,
        });
    }
    if seen_ids.contains(&relation.id) {
        return Some(LoadWarning::DuplicateId {
            line_number,
            id: relation.id,
        });
    }
    if inner.find(blocking, blocked).is_some() {
        return Some(LoadWarning::DuplicateRelation {
            line_number,
            blocking,
            blocked,
        });
    }
    if would_close_cycle(&inner.graph, &inner.node_map, blocking, blocked) {
        return Some(LoadWarning::CircularRelation {
            line_number,
            blocking,
            blocked,
        });
    }
    None
}

/// Save a store to a JSONL file with atomic writes.
///
/// Relations are written in id order, one per line. The write goes to a
/// temporary file first and is then renamed over `path`, so an interrupted
/// save leaves the previous file intact.
pub async fn save_to_jsonl(store: &dyn RelationStore, path: &Path) -> Result<()> {
    let temp_path = path.with_extension("tmp");

    let file = File::create(&temp_path).await.map_err(StorageError::Io)?;
    let mut writer = BufWriter::new(file);

    // all_edges() is id-ordered, so output is deterministic across saves
    for relation in store.all_edges().await? {
        let json = serde_json::to_string(&relation).map_err(StorageError::Serialization)?;
        writer.write_all(json.as_bytes()).await.map_err(StorageError::Io)?;
        writer.write_all(b"\n").await.map_err(StorageError::Io)?;
    }

    writer.flush().await.map_err(StorageError::Io)?;

    tokio::fs::rename(&temp_path, path)
        .await
        .map_err(StorageError::Io)?;

    Ok(())
}
