//! Optimistic concurrency check, run before every full update of a
//! versioned entity, inside the update's transaction. Partial updates do
//! not participate; that path carries no prior-read version to compare.

use thiserror::Error;

use crate::database::entity::EntityDef;
use crate::database::record::Record;

#[derive(Debug, Error)]
#[error("Stale version: the persisted entity is at version {current_version}")]
pub struct VersionConflict {
    /// The version currently persisted, returned to the caller so a client
    /// can re-fetch and retry.
    pub current_version: i64,
}

/// Compare the version submitted with the write against the version read
/// from the database in the same transaction. A mismatch aborts the write.
///
/// No-ops for entity types without a version column.
pub fn check_version(
    def: &EntityDef,
    record: &Record,
    persisted_version: i64,
) -> Result<(), VersionConflict> {
    if !def.versioned {
        return Ok(());
    }

    match record.version() {
        Some(submitted) if submitted == persisted_version => Ok(()),
        Some(_) => Err(VersionConflict {
            current_version: persisted_version,
        }),
        // A full update of a versioned entity always round-trips the
        // version; treat its absence as stale rather than skipping the check
        None => Err(VersionConflict {
            current_version: persisted_version,
        }),
    }
}
