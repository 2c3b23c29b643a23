//! The tool registry.
//!
//! The registry is the single source of truth for which tools exist. Readers
//! take an `Arc` snapshot under a short lock and never wait on writers; writers
//! are serialized, build the next snapshot, persist it, and only then publish
//! it. A failed persist leaves the published state untouched. Persist and
//! publish run on their own task, so a cancelled writer cannot split them.
//! A persistent registry re-reads its file before each write, so handles
//! sharing one file build on each other's changes.
//!
//! ```text
//! lookup / list ──► snapshot (Arc) ◄── swap ── register / register_bump / remove
//!                                                 │
//!                                                 └─► RegistryStore::save (atomic)
//! ```

use crate::tools::definition::ToolDescriptor;
use crate::tools::error::ToolError;
use crate::tools::store::{render_markdown, RegistryStore};
use chrono::{DateTime, Utc};
use semver::Version;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Minimum similarity for a name to be suggested.
const SUGGESTION_THRESHOLD: f64 = 0.8;

/// Maximum number of suggestions returned.
const MAX_SUGGESTIONS: usize = 3;

/// A descriptor with its registry bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    /// The registered descriptor
    pub descriptor: ToolDescriptor,
    /// When the name was first registered
    pub registered_at: DateTime<Utc>,
    /// When the descriptor last changed
    pub updated_at: DateTime<Utc>,
}

impl RegistryEntry {
    fn new(descriptor: ToolDescriptor) -> Self {
        let now = Utc::now();
        Self {
            descriptor,
            registered_at: now,
            updated_at: now,
        }
    }
}

/// Outcome of a successful registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// The name was new and the descriptor was added
    Inserted,
    /// An identical descriptor was already registered; nothing changed
    Unchanged,
    /// The descriptor replaced an older version
    Bumped {
        /// The version that was replaced
        previous: Version,
    },
}

/// Immutable registry state, in registration order.
#[derive(Debug, Default)]
struct Snapshot {
    entries: Vec<RegistryEntry>,
    index: HashMap<String, usize>,
}

impl Snapshot {
    fn from_entries(entries: Vec<RegistryEntry>) -> Self {
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.descriptor.name.clone(), i))
            .collect();
        Self { entries, index }
    }

    fn get(&self, name: &str) -> Option<&RegistryEntry> {
        self.index.get(name).map(|&i| &self.entries[i])
    }
}

/// A point-in-time listing of registered tools.
///
/// Iterating never observes later changes, and the listing can be iterated
/// any number of times.
#[derive(Debug, Clone)]
pub struct ToolListing {
    snapshot: Arc<Snapshot>,
}

impl ToolListing {
    /// Iterates descriptors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ToolDescriptor> + '_ {
        self.snapshot.entries.iter().map(|e| &e.descriptor)
    }

    /// Iterates entries (with timestamps) in registration order.
    pub fn entries(&self) -> impl Iterator<Item = &RegistryEntry> + '_ {
        self.snapshot.entries.iter()
    }

    /// Number of tools in the listing.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot.entries.len()
    }

    /// Returns true if no tools are listed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshot.entries.is_empty()
    }

    /// Tool names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.iter().map(|d| d.name.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a ToolListing {
    type Item = &'a ToolDescriptor;
    type IntoIter = Box<dyn Iterator<Item = &'a ToolDescriptor> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

/// Durable catalog of tool descriptors.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    published: Arc<Published>,
    writer: Arc<Mutex<()>>,
    store: Option<RegistryStore>,
}

/// The snapshot readers see. Shared with in-flight commits.
#[derive(Debug, Default)]
struct Published {
    snapshot: RwLock<Arc<Snapshot>>,
}

impl Published {
    fn current(&self) -> Arc<Snapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn publish(&self, next: Snapshot) {
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
    }
}

impl ToolRegistry {
    /// Creates a registry that is not persisted.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens a registry backed by `store`, loading its persisted descriptors.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the registry file exists but cannot be loaded.
    pub async fn open(store: RegistryStore) -> Result<Self, ToolError> {
        let entries = store.load().await?;
        tracing::info!(
            path = %store.path().display(),
            tools_count = entries.len(),
            "Tool registry opened"
        );
        let published = Published::default();
        published.publish(Snapshot::from_entries(entries));
        Ok(Self {
            published: Arc::new(published),
            writer: Arc::new(Mutex::new(())),
            store: Some(store),
        })
    }

    /// The backing store, if persistent.
    #[must_use]
    pub fn store(&self) -> Option<&RegistryStore> {
        self.store.as_ref()
    }

    fn current(&self) -> Arc<Snapshot> {
        self.published.current()
    }

    /// Takes the writer lock and returns the state to decide against.
    ///
    /// A persistent registry re-reads its file here, so changes committed by
    /// another handle or process on the same file are seen before this write.
    async fn begin_write(&self) -> Result<(OwnedMutexGuard<()>, Arc<Snapshot>), ToolError> {
        let guard = Arc::clone(&self.writer).lock_owned().await;
        if let Some(ref store) = self.store {
            let entries = store.load().await?;
            if self.current().entries != entries {
                tracing::debug!(
                    path = %store.path().display(),
                    tools_count = entries.len(),
                    "Registry file changed on disk; reloading"
                );
                self.published.publish(Snapshot::from_entries(entries));
            }
        }
        Ok((guard, self.current()))
    }

    /// Persists `entries` and publishes them as one unit.
    ///
    /// The work runs on its own task holding the writer lock, so dropping the
    /// caller cannot leave the file written but the snapshot unpublished.
    async fn commit(
        &self,
        guard: OwnedMutexGuard<()>,
        entries: Vec<RegistryEntry>,
    ) -> Result<(), ToolError> {
        let store = self.store.clone();
        let published = Arc::clone(&self.published);
        tokio::spawn(async move {
            let _guard = guard;
            if let Some(store) = store {
                store.save(&entries).await?;
            }
            published.publish(Snapshot::from_entries(entries));
            Ok::<(), ToolError>(())
        })
        .await
        .map_err(|e| ToolError::storage(format!("registry commit task failed: {e}")))?
    }

    /// Registers a descriptor under a new name.
    ///
    /// Registering a descriptor identical to the current one is a no-op.
    ///
    /// # Errors
    ///
    /// - `InvalidDescriptor` if the name or entry location is malformed
    /// - `DuplicateName` if a different descriptor holds the name
    /// - `Storage` if persisting fails (nothing is published)
    pub async fn register(&self, descriptor: ToolDescriptor) -> Result<Registration, ToolError> {
        descriptor.validate()?;
        let (guard, current) = self.begin_write().await?;

        if let Some(existing) = current.get(&descriptor.name) {
            let existing = &existing.descriptor;
            if *existing == descriptor {
                tracing::debug!(tool_name = %descriptor.name, "Identical descriptor already registered");
                return Ok(Registration::Unchanged);
            }

            let reason = if existing.same_implementation(&descriptor) {
                format!(
                    "version {} differs from the registered descriptor (version {}); use an explicit version bump",
                    descriptor.version, existing.version
                )
            } else {
                format!(
                    "version {} is registered at '{}'",
                    existing.version, existing.entry_location
                )
            };
            let error = ToolError::duplicate_name(&descriptor.name, reason);
            tracing::warn!(tool_name = %descriptor.name, error = %error, "Tool registration rejected");
            return Err(error);
        }

        let mut entries = current.entries.clone();
        entries.push(RegistryEntry::new(descriptor.clone()));
        self.commit(guard, entries).await?;

        tracing::info!(
            tool_name = %descriptor.name,
            version = %descriptor.version,
            entry_location = %descriptor.entry_location,
            "Tool registered"
        );
        Ok(Registration::Inserted)
    }

    /// Replaces the descriptor registered at version `previous` with a newer one.
    ///
    /// This is a compare-and-swap: if another writer changed the tool first,
    /// the bump fails rather than overwriting their version.
    ///
    /// # Errors
    ///
    /// - `InvalidDescriptor` if the descriptor is malformed or its version is not
    ///   greater than `previous`
    /// - `NotFound` if no tool holds the name
    /// - `DuplicateName` if the registered version is no longer `previous`
    /// - `Storage` if persisting fails
    pub async fn register_bump(
        &self,
        descriptor: ToolDescriptor,
        previous: &Version,
    ) -> Result<Registration, ToolError> {
        descriptor.validate()?;
        if descriptor.version <= *previous {
            return Err(ToolError::invalid_descriptor(
                "version",
                format!(
                    "{} must be greater than the replaced version {previous}",
                    descriptor.version
                ),
            ));
        }

        let (guard, current) = self.begin_write().await?;

        let Some(&position) = current.index.get(&descriptor.name) else {
            return Err(ToolError::not_found(&descriptor.name));
        };
        let existing = &current.entries[position];
        if existing.descriptor.version != *previous {
            let error = ToolError::duplicate_name(
                &descriptor.name,
                format!(
                    "expected to replace version {previous} but version {} is registered",
                    existing.descriptor.version
                ),
            );
            tracing::warn!(tool_name = %descriptor.name, error = %error, "Version bump rejected");
            return Err(error);
        }

        let mut entries = current.entries.clone();
        entries[position] = RegistryEntry {
            descriptor: descriptor.clone(),
            registered_at: existing.registered_at,
            updated_at: Utc::now(),
        };
        self.commit(guard, entries).await?;

        tracing::info!(
            tool_name = %descriptor.name,
            previous = %previous,
            version = %descriptor.version,
            "Tool version bumped"
        );
        Ok(Registration::Bumped {
            previous: previous.clone(),
        })
    }

    /// Removes a tool, returning its last descriptor.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the name is not registered, or `Storage` if
    /// persisting fails.
    pub async fn remove(&self, name: &str) -> Result<ToolDescriptor, ToolError> {
        let (guard, current) = self.begin_write().await?;

        let Some(&position) = current.index.get(name) else {
            return Err(ToolError::not_found(name));
        };

        let mut entries = current.entries.clone();
        let removed = entries.remove(position);
        self.commit(guard, entries).await?;

        tracing::info!(
            tool_name = %name,
            version = %removed.descriptor.version,
            "Tool removed"
        );
        Ok(removed.descriptor)
    }

    /// Returns the current descriptor for `name`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the name is not registered.
    pub fn lookup(&self, name: &str) -> Result<ToolDescriptor, ToolError> {
        self.current()
            .get(name)
            .map(|e| e.descriptor.clone())
            .ok_or_else(|| ToolError::not_found(name))
    }

    /// Returns the entry (with timestamps) for `name`, if registered.
    #[must_use]
    pub fn entry(&self, name: &str) -> Option<RegistryEntry> {
        self.current().get(name).cloned()
    }

    /// Returns true if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.current().index.contains_key(name)
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.current().entries.len()
    }

    /// Returns true if no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current().entries.is_empty()
    }

    /// Lists all tools in registration order.
    #[must_use]
    pub fn list(&self) -> ToolListing {
        ToolListing {
            snapshot: self.current(),
        }
    }

    /// Registered names similar to `name`, most similar first.
    #[must_use]
    pub fn suggest(&self, name: &str) -> Vec<String> {
        let snapshot = self.current();
        let mut scored: Vec<(f64, &str)> = snapshot
            .entries
            .iter()
            .map(|e| e.descriptor.name.as_str())
            .filter(|candidate| *candidate != name)
            .map(|candidate| (strsim::jaro_winkler(name, candidate), candidate))
            .filter(|(score, candidate)| {
                *score >= SUGGESTION_THRESHOLD
                    || (!name.is_empty() && (candidate.contains(name) || name.contains(*candidate)))
            })
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));
        scored
            .into_iter()
            .take(MAX_SUGGESTIONS)
            .map(|(_, candidate)| candidate.to_string())
            .collect()
    }

    /// Renders the human-readable Markdown view of the registry.
    #[must_use]
    pub fn render_markdown(&self) -> String {
        render_markdown(&self.current().entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::schema::{FieldType, InputSchema};
    use tempfile::TempDir;

    fn descriptor(name: &str, version: Version) -> ToolDescriptor {
        ToolDescriptor::new(name, version, format!("builtin:{name}"))
            .with_description("test tool")
            .with_schema(InputSchema::new().required("text", FieldType::String, "Text"))
    }

    fn v1(name: &str) -> ToolDescriptor {
        descriptor(name, Version::new(1, 0, 0))
    }

    #[tokio::test]
    async fn register_then_lookup() {
        let registry = ToolRegistry::in_memory();
        assert_eq!(registry.register(v1("url-encoder")).await.unwrap(), Registration::Inserted);
        assert_eq!(registry.lookup("url-encoder").unwrap(), v1("url-encoder"));
    }

    #[tokio::test]
    async fn lookup_missing_is_not_found() {
        let registry = ToolRegistry::in_memory();
        assert!(registry.lookup("nope").unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn register_identical_descriptor_is_noop() {
        let registry = ToolRegistry::in_memory();
        registry.register(v1("url-encoder")).await.unwrap();
        let before = registry.entry("url-encoder").unwrap();

        assert_eq!(registry.register(v1("url-encoder")).await.unwrap(), Registration::Unchanged);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.entry("url-encoder").unwrap(), before);
    }

    #[tokio::test]
    async fn register_different_location_is_duplicate() {
        let registry = ToolRegistry::in_memory();
        registry.register(v1("url-encoder")).await.unwrap();

        let mut other = v1("url-encoder");
        other.entry_location = "builtin:other-encoder".to_string();
        let error = registry.register(other).await.unwrap_err();

        assert!(error.is_duplicate_name());
        assert_eq!(registry.lookup("url-encoder").unwrap(), v1("url-encoder"));
    }

    #[tokio::test]
    async fn register_newer_version_without_bump_is_duplicate() {
        let registry = ToolRegistry::in_memory();
        registry.register(v1("url-encoder")).await.unwrap();
        let error = registry
            .register(descriptor("url-encoder", Version::new(1, 1, 0)))
            .await
            .unwrap_err();
        assert!(error.is_duplicate_name());
        assert!(error.to_string().contains("version bump"));
    }

    #[tokio::test]
    async fn register_rejects_invalid_descriptor() {
        let registry = ToolRegistry::in_memory();
        let error = registry
            .register(ToolDescriptor::new("Bad", Version::new(1, 0, 0), "builtin:bad"))
            .await
            .unwrap_err();
        assert_eq!(error.code(), "InvalidDescriptor");
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn bump_replaces_in_place() {
        let registry = ToolRegistry::in_memory();
        registry.register(v1("a-tool")).await.unwrap();
        registry.register(v1("b-tool")).await.unwrap();
        let registered_at = registry.entry("a-tool").unwrap().registered_at;

        let mut next = descriptor("a-tool", Version::new(1, 1, 0));
        next.entry_location = "native:a-tool@1.1.0".to_string();
        let outcome = registry
            .register_bump(next.clone(), &Version::new(1, 0, 0))
            .await
            .unwrap();

        assert_eq!(outcome, Registration::Bumped { previous: Version::new(1, 0, 0) });
        assert_eq!(registry.lookup("a-tool").unwrap(), next);
        assert_eq!(registry.list().names(), vec!["a-tool", "b-tool"]);
        assert_eq!(registry.entry("a-tool").unwrap().registered_at, registered_at);
    }

    #[tokio::test]
    async fn bump_requires_greater_version() {
        let registry = ToolRegistry::in_memory();
        registry.register(v1("a-tool")).await.unwrap();
        let error = registry
            .register_bump(v1("a-tool"), &Version::new(1, 0, 0))
            .await
            .unwrap_err();
        assert_eq!(error.code(), "InvalidDescriptor");
    }

    #[tokio::test]
    async fn bump_from_stale_version_is_rejected() {
        let registry = ToolRegistry::in_memory();
        registry.register(v1("a-tool")).await.unwrap();
        registry
            .register_bump(descriptor("a-tool", Version::new(1, 1, 0)), &Version::new(1, 0, 0))
            .await
            .unwrap();

        let error = registry
            .register_bump(descriptor("a-tool", Version::new(1, 2, 0)), &Version::new(1, 0, 0))
            .await
            .unwrap_err();
        assert!(error.is_duplicate_name());
        assert_eq!(registry.lookup("a-tool").unwrap().version, Version::new(1, 1, 0));
    }

    #[tokio::test]
    async fn bump_of_unknown_tool_is_not_found() {
        let registry = ToolRegistry::in_memory();
        let error = registry
            .register_bump(descriptor("ghost", Version::new(2, 0, 0)), &Version::new(1, 0, 0))
            .await
            .unwrap_err();
        assert!(error.is_not_found());
    }

    #[tokio::test]
    async fn list_is_ordered_and_restartable() {
        let registry = ToolRegistry::in_memory();
        for name in ["zeta", "alpha", "mid"] {
            registry.register(v1(name)).await.unwrap();
        }

        let listing = registry.list();
        let first: Vec<_> = listing.iter().map(|d| d.name.clone()).collect();
        let second: Vec<_> = (&listing).into_iter().map(|d| d.name.clone()).collect();
        assert_eq!(first, vec!["zeta", "alpha", "mid"]);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn listing_is_a_stable_snapshot() {
        let registry = ToolRegistry::in_memory();
        registry.register(v1("alpha")).await.unwrap();
        let listing = registry.list();
        registry.register(v1("beta")).await.unwrap();

        assert_eq!(listing.len(), 1);
        assert_eq!(registry.list().len(), 2);
    }

    #[tokio::test]
    async fn remove_deletes_and_reports() {
        let registry = ToolRegistry::in_memory();
        registry.register(v1("alpha")).await.unwrap();
        registry.register(v1("beta")).await.unwrap();

        let removed = registry.remove("alpha").await.unwrap();
        assert_eq!(removed.name, "alpha");
        assert!(!registry.contains("alpha"));
        assert!(registry.contains("beta"));
        assert!(registry.remove("alpha").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn concurrent_registration_keeps_one_descriptor() {
        let registry = Arc::new(ToolRegistry::in_memory());
        let mut first = v1("word-count");
        first.entry_location = "builtin:word-count-a".to_string();
        let mut second = v1("word-count");
        second.entry_location = "builtin:word-count-b".to_string();

        let r1 = registry.clone();
        let r2 = registry.clone();
        let (a, b) = tokio::join!(
            tokio::spawn(async move { r1.register(first).await }),
            tokio::spawn(async move { r2.register(second).await })
        );
        let outcomes = [a.unwrap(), b.unwrap()];

        assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1);
        assert!(outcomes
            .iter()
            .filter_map(|o| o.as_ref().err())
            .all(ToolError::is_duplicate_name));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn persisted_registry_reopens() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("registry.toml");

        {
            let registry = ToolRegistry::open(RegistryStore::new(&path)).await.unwrap();
            registry.register(v1("alpha")).await.unwrap();
            registry.register(v1("beta")).await.unwrap();
            registry.remove("alpha").await.unwrap();
        }

        let reopened = ToolRegistry::open(RegistryStore::new(&path)).await.unwrap();
        assert_eq!(reopened.list().names(), vec!["beta"]);
        assert_eq!(reopened.lookup("beta").unwrap(), v1("beta"));
    }

    #[tokio::test]
    async fn failed_persist_publishes_nothing() {
        let dir = TempDir::new().unwrap();
        let parent = dir.path().join("sub");
        let registry = ToolRegistry::open(RegistryStore::new(parent.join("registry.toml")))
            .await
            .unwrap();
        std::fs::write(&parent, "a file where the directory should be").unwrap();

        let error = registry.register(v1("alpha")).await.unwrap_err();
        assert_eq!(error.code(), "Storage");
        assert!(!registry.contains("alpha"));
    }

    #[tokio::test]
    async fn cancelled_register_keeps_file_and_snapshot_in_step() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("registry.toml");
        let registry = ToolRegistry::open(RegistryStore::new(&path)).await.unwrap();

        for attempt in 0..16u64 {
            let ghost = format!("ghost-{attempt}");
            let _ = tokio::time::timeout(
                std::time::Duration::from_micros(attempt * 100),
                registry.register(v1(&ghost)),
            )
            .await;

            // Waits behind any commit the cancelled call left running.
            registry
                .register(v1(&format!("after-{attempt}")))
                .await
                .unwrap();

            let reopened = ToolRegistry::open(RegistryStore::new(&path)).await.unwrap();
            assert_eq!(reopened.list().names(), registry.list().names());
            assert_eq!(reopened.contains(&ghost), registry.contains(&ghost));
        }
    }

    #[tokio::test]
    async fn two_handles_on_one_file_keep_both_writes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("registry.toml");
        let first = ToolRegistry::open(RegistryStore::new(&path)).await.unwrap();
        let second = ToolRegistry::open(RegistryStore::new(&path)).await.unwrap();

        first.register(v1("alpha")).await.unwrap();
        second.register(v1("beta")).await.unwrap();

        let reopened = ToolRegistry::open(RegistryStore::new(&path)).await.unwrap();
        assert_eq!(reopened.list().names(), vec!["alpha", "beta"]);
        assert_eq!(second.list().names(), vec!["alpha", "beta"]);

        let other = ToolDescriptor::new("alpha", Version::new(1, 0, 0), "builtin:elsewhere");
        let error = second.register(other).await.unwrap_err();
        assert!(error.is_duplicate_name());
        assert_eq!(
            second.register(v1("alpha")).await.unwrap(),
            Registration::Unchanged
        );

        first.remove("beta").await.unwrap();
        let reopened = ToolRegistry::open(RegistryStore::new(&path)).await.unwrap();
        assert_eq!(reopened.list().names(), vec!["alpha"]);
    }

    #[tokio::test]
    async fn suggest_finds_close_names() {
        let registry = ToolRegistry::in_memory();
        for name in ["url-encoder", "url-decoder", "timestamp-converter"] {
            registry.register(v1(name)).await.unwrap();
        }
        let suggestions = registry.suggest("url-encodr");
        assert_eq!(suggestions.first().map(String::as_str), Some("url-encoder"));
        assert!(!suggestions.contains(&"timestamp-converter".to_string()));
        assert!(registry.suggest("zzzz").is_empty());
    }

    #[tokio::test]
    async fn markdown_reflects_current_state() {
        let registry = ToolRegistry::in_memory();
        registry.register(v1("url-encoder")).await.unwrap();
        assert!(registry.render_markdown().contains("| url-encoder | 1.0.0 |"));
    }
}
