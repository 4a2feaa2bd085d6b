//! Shared audit fields embedded by value in every persisted entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity and bookkeeping columns common to all entities.
///
/// Embedded by value rather than inherited; each entity owns its audit block
/// and repositories read/write the columns alongside the entity's own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Audit {
    /// Primary key
    pub id: Uuid,
    /// Row creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
    /// Username that created the row, when known
    pub created_by: Option<String>,
    /// Username of the last modifier, when known
    pub updated_by: Option<String>,
    /// Soft-delete marker; deleted rows are filtered out of queries
    pub deleted: bool,
    /// Optimistic-lock counter, bumped on every update
    pub version: i32,
}

impl Audit {
    /// Fresh audit block for a newly created entity.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            created_at: now,
            updated_at: now,
            created_by: None,
            updated_by: None,
            deleted: false,
            version: 0,
        }
    }

    /// Mark the entity as modified now.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
        self.version += 1;
    }
}

impl Default for Audit {
    fn default() -> Self {
        Self::new()
    }
}
