//! In-memory church directory for tests and local development.
//!
//! # Panics
//!
//! Methods panic if internal locks are poisoned. Acceptable for test
//! code; production deployments use the Postgres adapter.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::billing::Church;
use crate::domain::foundation::{ChurchId, DomainError};
use crate::ports::ChurchDirectory;

/// In-memory church lookup, seeded through [`add_church`](Self::add_church).
pub struct InMemoryChurchDirectory {
    churches: RwLock<HashMap<ChurchId, Church>>,
}

impl InMemoryChurchDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self {
            churches: RwLock::new(HashMap::new()),
        }
    }

    /// Seeds a church.
    pub fn add_church(&self, church: Church) {
        self.churches
            .write()
            .expect("InMemoryChurchDirectory: lock poisoned")
            .insert(church.id, church);
    }
}

impl Default for InMemoryChurchDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChurchDirectory for InMemoryChurchDirectory {
    async fn find_by_id(&self, id: ChurchId) -> Result<Option<Church>, DomainError> {
        Ok(self
            .churches
            .read()
            .expect("InMemoryChurchDirectory: lock poisoned")
            .get(&id)
            .cloned())
    }
}
