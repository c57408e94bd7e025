//! # In-Memory Collaborators
//!
//! Thread-safe implementations of the storage and directory traits. All
//! locks are `parking_lot` and never held across an `.await`; a panicking
//! writer does not poison them.
//!
//! [`InMemoryRequestStore::commit`] performs the version check, the timeline
//! append, and the record replacement under a single write lock, which is
//! what makes a transition atomic against concurrent callers.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use dispatch_core::{Branch, BranchId, PartnerId, RequestId};
use dispatch_state::{ServiceRequest, Timeline, TimelineEvent};

use crate::ports::{BranchDirectory, ConfigStore, RepositoryError, RequestRepository};

// ── Requests ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct StoredRequest {
    request: ServiceRequest,
    timeline: Timeline,
}

#[derive(Debug, Default)]
struct RequestTable {
    rows: BTreeMap<RequestId, StoredRequest>,
    numbers: HashMap<String, RequestId>,
}

/// Request store backed by a `BTreeMap` behind one `RwLock`.
#[derive(Debug, Clone)]
pub struct InMemoryRequestStore {
    table: Arc<RwLock<RequestTable>>,
    next_id: Arc<AtomicI64>,
}

impl Default for InMemoryRequestStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRequestStore {
    /// An empty store. Ids start at 1.
    pub fn new() -> Self {
        Self {
            table: Arc::new(RwLock::new(RequestTable::default())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }

    /// Load a previously persisted request and its timeline.
    ///
    /// Used at startup hydration. Replaces any existing record with the same
    /// id and keeps the id allocator ahead of every restored id.
    pub fn restore(&self, request: ServiceRequest, timeline: Timeline) {
        let id = request.id;
        self.next_id.fetch_max(id.get() + 1, Ordering::SeqCst);
        let mut table = self.table.write();
        table.numbers.insert(request.request_number.clone(), id);
        table.rows.insert(id, StoredRequest { request, timeline });
    }

    /// Number of stored requests.
    pub fn len(&self) -> usize {
        self.table.read().rows.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RequestRepository for InMemoryRequestStore {
    fn next_id(&self) -> RequestId {
        RequestId::new(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn insert(
        &self,
        request: ServiceRequest,
        initial: TimelineEvent,
    ) -> Result<(), RepositoryError> {
        let mut table = self.table.write();
        if table.rows.contains_key(&request.id) {
            return Err(RepositoryError::DuplicateId);
        }
        if table.numbers.contains_key(&request.request_number) {
            return Err(RepositoryError::DuplicateRequestNumber(
                request.request_number.clone(),
            ));
        }
        let timeline = Timeline::from_events(request.id, [initial])?;
        table
            .numbers
            .insert(request.request_number.clone(), request.id);
        table
            .rows
            .insert(request.id, StoredRequest { request, timeline });
        Ok(())
    }

    fn get(&self, id: RequestId) -> Option<ServiceRequest> {
        self.table.read().rows.get(&id).map(|s| s.request.clone())
    }

    fn contains_number(&self, request_number: &str) -> bool {
        self.table.read().numbers.contains_key(request_number)
    }

    fn list(&self) -> Vec<ServiceRequest> {
        self.table
            .read()
            .rows
            .values()
            .map(|s| s.request.clone())
            .collect()
    }

    fn commit(
        &self,
        request: &ServiceRequest,
        expected_version: u64,
        event: Option<TimelineEvent>,
    ) -> Result<(), RepositoryError> {
        let mut table = self.table.write();
        let stored = table
            .rows
            .get_mut(&request.id)
            .ok_or(RepositoryError::NotFound)?;

        if stored.request.version != expected_version {
            return Err(RepositoryError::Conflict {
                expected: expected_version,
                actual: stored.request.version,
            });
        }
        // Append first: it is the only step that can still fail, and it
        // leaves the timeline untouched when it does.
        if let Some(event) = event {
            stored.timeline.append(event)?;
        }
        stored.request = request.clone();
        Ok(())
    }

    fn timeline(&self, id: RequestId) -> Option<Timeline> {
        self.table.read().rows.get(&id).map(|s| s.timeline.clone())
    }
}

// ── Branches ─────────────────────────────────────────────────────────

/// Branch directory held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBranchDirectory {
    branches: Arc<RwLock<BTreeMap<BranchId, Branch>>>,
}

impl InMemoryBranchDirectory {
    /// An empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// A directory seeded with `branches`.
    pub fn with_branches(branches: impl IntoIterator<Item = Branch>) -> Self {
        let dir = Self::new();
        for b in branches {
            dir.upsert(b);
        }
        dir
    }

    /// Insert or replace a branch.
    pub fn upsert(&self, branch: Branch) {
        self.branches.write().insert(branch.id, branch);
    }
}

impl BranchDirectory for InMemoryBranchDirectory {
    fn get_branch(&self, id: BranchId) -> Option<Branch> {
        self.branches.read().get(&id).cloned()
    }

    fn list_branches(&self, partner_id: Option<PartnerId>) -> Vec<Branch> {
        self.branches
            .read()
            .values()
            .filter(|b| partner_id.map_or(true, |p| b.belongs_to(p)))
            .cloned()
            .collect()
    }
}

// ── Configuration ────────────────────────────────────────────────────

/// Configuration values held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConfigStore {
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryConfigStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values.write().insert(key.into(), value.into());
    }
}

impl ConfigStore for InMemoryConfigStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }
}
