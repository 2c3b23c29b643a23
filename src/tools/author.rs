//! The Author workflow.
//!
//! Turns a [`ToolDraft`] into a registered tool, or rejects it:
//!
//! ```text
//! Drafting ──► SelfTesting ──► Registering ──► Available
//!    │              │               │
//!    └──────────────┴───────────────┴──────► Rejected
//! ```
//!
//! A candidate is never visible to the loader before its self-test passes:
//! the registry is only written in `Registering`. Each name has at most one
//! run in flight; a concurrent run for the same name is rejected at once.
//! Dropping a run part-way releases the name and removes its draft files.
//! Once a run reaches `Registering` it completes even if its caller is dropped.

use crate::tools::definition::{SharedTool, ToolDescriptor};
use crate::tools::error::ToolError;
use crate::tools::loader::run_module;
use crate::tools::modules::{EntryLocation, ModuleTable};
use crate::tools::registry::{Registration, ToolRegistry};
use crate::tools::schema::InputSchema;
use crate::types::AuthoringId;
use semver::Version;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Default time limit for each self-test case.
pub const DEFAULT_SELF_TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Authoring workflow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthoringState {
    /// Candidate being produced
    Drafting,
    /// Candidate running its self-test cases
    SelfTesting,
    /// Committing the descriptor to the registry
    Registering,
    /// Resolvable by the loader
    Available,
    /// Discarded; never reaches the registry
    Rejected,
}

impl AuthoringState {
    /// Returns true for `Available` and `Rejected`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Available | Self::Rejected)
    }
}

impl fmt::Display for AuthoringState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Drafting => "Drafting",
            Self::SelfTesting => "SelfTesting",
            Self::Registering => "Registering",
            Self::Available => "Available",
            Self::Rejected => "Rejected",
        };
        f.write_str(name)
    }
}

/// One representative input for a candidate's self-test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfTestCase {
    /// Input object passed to the candidate
    pub input: Value,
    /// Required `result`; when absent any success passes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect: Option<Value>,
}

impl SelfTestCase {
    /// A case that passes on any success.
    #[must_use]
    pub fn new(input: Value) -> Self {
        Self {
            input,
            expect: None,
        }
    }

    /// A case that requires an exact result.
    #[must_use]
    pub fn expecting(input: Value, expect: Value) -> Self {
        Self {
            input,
            expect: Some(expect),
        }
    }
}

/// Implementation of a candidate tool.
#[derive(Debug, Clone)]
pub enum ToolSource {
    /// An in-process module, mounted at `native:<name>@<version>`
    Native(SharedTool),
    /// A script written to `<tools_dir>/<name>/<version>/tool.<extension>`
    Script {
        /// Interpreter program, e.g. `python3`
        interpreter: String,
        /// Script file extension, e.g. `py`
        extension: String,
        /// Script source
        body: String,
    },
}

/// A candidate tool awaiting verification.
#[derive(Debug, Clone)]
pub struct ToolDraft {
    /// Intended registry name
    pub name: String,
    /// Version to register
    pub version: Version,
    /// Summary for tool selection
    pub description: String,
    /// Accepted input
    pub input_schema: InputSchema,
    /// The implementation
    pub source: ToolSource,
    /// Self-test cases; at least one is required
    pub tests: Vec<SelfTestCase>,
    /// Version being replaced, for an explicit version bump
    pub replaces: Option<Version>,
}

impl ToolDraft {
    /// A draft backed by an in-process module.
    #[must_use]
    pub fn native(name: impl Into<String>, version: Version, module: SharedTool) -> Self {
        Self::with_source(name, version, ToolSource::Native(module))
    }

    /// A draft backed by a script.
    #[must_use]
    pub fn script(
        name: impl Into<String>,
        version: Version,
        interpreter: impl Into<String>,
        extension: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self::with_source(
            name,
            version,
            ToolSource::Script {
                interpreter: interpreter.into(),
                extension: extension.into(),
                body: body.into(),
            },
        )
    }

    fn with_source(name: impl Into<String>, version: Version, source: ToolSource) -> Self {
        Self {
            name: name.into(),
            version,
            description: String::new(),
            input_schema: InputSchema::default(),
            source,
            tests: Vec::new(),
            replaces: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the input schema.
    #[must_use]
    pub fn with_schema(mut self, schema: InputSchema) -> Self {
        self.input_schema = schema;
        self
    }

    /// Adds a self-test case.
    #[must_use]
    pub fn with_test(mut self, case: SelfTestCase) -> Self {
        self.tests.push(case);
        self
    }

    /// Requests an explicit bump from `previous`.
    #[must_use]
    pub fn replacing(mut self, previous: Version) -> Self {
        self.replaces = Some(previous);
        self
    }
}

/// Outcome of one authoring run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthoringReport {
    /// Run identifier
    pub id: AuthoringId,
    /// The candidate's intended name
    pub name: String,
    /// Final state: `Available` or `Rejected`
    pub state: AuthoringState,
    /// The registered descriptor when `Available`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<ToolDescriptor>,
    /// Why the run was rejected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Every state entered, in order
    pub transitions: Vec<AuthoringState>,
}

impl AuthoringReport {
    /// Returns true if the tool is now resolvable.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.state == AuthoringState::Available
    }

    /// Returns true if the run was rejected.
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        self.state == AuthoringState::Rejected
    }
}

/// Names with an authoring run in flight.
type InFlight = Arc<Mutex<HashSet<String>>>;

/// Exclusive claim on a name for one authoring run. Released on drop.
struct Reservation {
    name: String,
    in_flight: InFlight,
}

impl Reservation {
    fn acquire(in_flight: &InFlight, name: &str) -> Option<Self> {
        let mut names = in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        names.insert(name.to_string()).then(|| Self {
            name: name.to_string(),
            in_flight: in_flight.clone(),
        })
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.name);
    }
}

/// Draft side effects that are undone unless the run commits.
#[derive(Default)]
struct Rollback {
    draft_dir: Option<PathBuf>,
    mount: Option<(Arc<ModuleTable>, EntryLocation)>,
    candidate: Option<(Arc<ToolRegistry>, ToolDescriptor)>,
    committed: bool,
}

impl Rollback {
    /// True once the registry holds the candidate, whoever observed the commit.
    fn is_registered(&self) -> bool {
        self.candidate
            .as_ref()
            .is_some_and(|(registry, descriptor)| {
                registry.lookup(&descriptor.name).ok().as_ref() == Some(descriptor)
            })
    }
}

impl Drop for Rollback {
    fn drop(&mut self) {
        if self.committed || self.is_registered() {
            return;
        }
        if let Some((modules, location)) = self.mount.take() {
            modules.unmount(&location);
        }
        if let Some(dir) = self.draft_dir.take() {
            if let Err(e) = std::fs::remove_dir_all(&dir) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %dir.display(), error = %e, "Failed to remove draft");
                }
            }
        }
    }
}

/// Tracks the states a run passes through.
struct Run {
    id: AuthoringId,
    name: String,
    transitions: Vec<AuthoringState>,
}

impl Run {
    fn start(name: &str) -> Self {
        let run = Self {
            id: AuthoringId::new(),
            name: name.to_string(),
            transitions: vec![AuthoringState::Drafting],
        };
        tracing::debug!(authoring_id = %run.id, tool_name = %name, "Authoring started");
        run
    }

    fn enter(&mut self, state: AuthoringState) {
        tracing::debug!(authoring_id = %self.id, tool_name = %self.name, state = %state, "Authoring state");
        self.transitions.push(state);
    }

    fn reject(mut self, error: &ToolError) -> AuthoringReport {
        self.transitions.push(AuthoringState::Rejected);
        tracing::warn!(
            authoring_id = %self.id,
            tool_name = %self.name,
            error = %error,
            "Authoring rejected"
        );
        AuthoringReport {
            id: self.id,
            name: self.name,
            state: AuthoringState::Rejected,
            descriptor: None,
            reason: Some(error.result_message()),
            transitions: self.transitions,
        }
    }

    fn available(mut self, descriptor: ToolDescriptor) -> AuthoringReport {
        self.transitions.push(AuthoringState::Available);
        tracing::info!(
            authoring_id = %self.id,
            tool_name = %self.name,
            version = %descriptor.version,
            "Tool authored and available"
        );
        AuthoringReport {
            id: self.id,
            name: self.name,
            state: AuthoringState::Available,
            descriptor: Some(descriptor),
            reason: None,
            transitions: self.transitions,
        }
    }
}

/// A self-tested candidate ready to be committed.
struct Candidate {
    registry: Arc<ToolRegistry>,
    modules: Arc<ModuleTable>,
    descriptor: ToolDescriptor,
    module: SharedTool,
    native: bool,
    replaces: Option<Version>,
}

impl Candidate {
    /// Mounts the module and commits the descriptor, holding the name until done.
    async fn register(
        self,
        _reservation: Reservation,
        mut rollback: Rollback,
    ) -> Result<(), ToolError> {
        let name = &self.descriptor.name;
        if self.native {
            let location = EntryLocation::native(name, self.descriptor.version.clone());
            self.modules.mount(&location, self.module);
            rollback.mount = Some((Arc::clone(&self.modules), location));
        }
        rollback.candidate = Some((Arc::clone(&self.registry), self.descriptor.clone()));

        let registered = match self.replaces {
            Some(ref previous) => {
                self.registry
                    .register_bump(self.descriptor.clone(), previous)
                    .await?
            }
            None => self.registry.register(self.descriptor.clone()).await?,
        };
        rollback.committed = true;

        if let Registration::Bumped { previous } = registered {
            self.modules
                .unmount(&EntryLocation::native(name, previous));
        }
        Ok(())
    }
}

/// Runs the Author workflow against a registry and module table.
#[derive(Debug, Clone)]
pub struct ToolAuthor {
    registry: Arc<ToolRegistry>,
    modules: Arc<ModuleTable>,
    tools_dir: PathBuf,
    self_test_timeout: Option<Duration>,
    in_flight: InFlight,
}

impl ToolAuthor {
    /// Creates an author writing script drafts under `tools_dir`.
    #[must_use]
    pub fn new(
        registry: Arc<ToolRegistry>,
        modules: Arc<ModuleTable>,
        tools_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            registry,
            modules,
            tools_dir: tools_dir.into(),
            self_test_timeout: Some(DEFAULT_SELF_TEST_TIMEOUT),
            in_flight: InFlight::default(),
        }
    }

    /// Sets the per-case self-test limit; `None` disables it.
    #[must_use]
    pub fn with_self_test_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.self_test_timeout = timeout;
        self
    }

    /// Directory script drafts are written under.
    #[must_use]
    pub fn tools_dir(&self) -> &Path {
        &self.tools_dir
    }

    /// Returns true if an authoring run for `name` is in flight.
    #[must_use]
    pub fn is_authoring(&self, name: &str) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(name)
    }

    /// Runs a draft through the workflow.
    ///
    /// Never returns an error: failures are reported as a `Rejected` report
    /// whose `reason` carries the error code and detail.
    pub async fn author(&self, draft: ToolDraft) -> AuthoringReport {
        let mut run = Run::start(&draft.name);

        let Some(reservation) = Reservation::acquire(&self.in_flight, &draft.name) else {
            return run.reject(&ToolError::duplicate_name(
                &draft.name,
                "authoring already in progress",
            ));
        };

        let mut rollback = Rollback::default();

        let (descriptor, module) = match self.draft(&draft, &mut rollback).await {
            Ok(drafted) => drafted,
            Err(e) => return run.reject(&e),
        };

        run.enter(AuthoringState::SelfTesting);
        if let Err(e) = self.self_test(&descriptor, &module, &draft.tests).await {
            return run.reject(&e);
        }

        run.enter(AuthoringState::Registering);
        let candidate = Candidate {
            registry: Arc::clone(&self.registry),
            modules: Arc::clone(&self.modules),
            descriptor: descriptor.clone(),
            module,
            native: matches!(draft.source, ToolSource::Native(_)),
            replaces: draft.replaces.clone(),
        };

        // Registering runs on its own task so a dropped caller cannot stop it
        // between the registry commit and marking the rollback committed.
        match tokio::spawn(candidate.register(reservation, rollback)).await {
            Ok(Ok(())) => run.available(descriptor),
            Ok(Err(e)) => run.reject(&e),
            Err(e) => run.reject(&ToolError::storage(format!(
                "registration task failed: {e}"
            ))),
        }
    }

    /// Validates the draft, materializes it, and builds its descriptor.
    async fn draft(
        &self,
        draft: &ToolDraft,
        rollback: &mut Rollback,
    ) -> Result<(ToolDescriptor, SharedTool), ToolError> {
        if !ToolDescriptor::is_valid_name(&draft.name) {
            return Err(ToolError::invalid_descriptor(
                "name",
                format!("'{}' must be lowercase kebab-case", draft.name),
            ));
        }
        if draft.tests.is_empty() {
            return Err(ToolError::self_test_failure(
                &draft.name,
                "at least one self-test case is required",
            ));
        }
        self.check_slot(draft)?;

        let location = match draft.source {
            ToolSource::Native(_) => EntryLocation::native(&draft.name, draft.version.clone()),
            ToolSource::Script {
                ref interpreter,
                ref extension,
                ref body,
            } => {
                let path = self.write_script(draft, extension, body, rollback).await?;
                EntryLocation::script(interpreter.clone(), path)
            }
        };

        let descriptor = ToolDescriptor::new(&draft.name, draft.version.clone(), location.to_string())
            .with_description(draft.description.clone())
            .with_schema(draft.input_schema.clone());
        descriptor.validate()?;

        let module = match draft.source {
            ToolSource::Native(ref module) => module.clone(),
            ToolSource::Script { .. } => self.modules.resolve(&draft.name, &location)?,
        };

        Ok((descriptor, module))
    }

    /// Rejects drafts that cannot possibly register, before touching disk.
    fn check_slot(&self, draft: &ToolDraft) -> Result<(), ToolError> {
        let existing = self.registry.lookup(&draft.name).ok();
        match (existing, &draft.replaces) {
            (None, None) => Ok(()),
            (Some(existing), None) => Err(ToolError::duplicate_name(
                &draft.name,
                format!(
                    "version {} is registered at '{}'; set 'replaces' to bump it",
                    existing.version, existing.entry_location
                ),
            )),
            (None, Some(_)) => Err(ToolError::invalid_descriptor(
                "replaces",
                format!("no tool named '{}' is registered", draft.name),
            )),
            (Some(existing), Some(previous)) => {
                if existing.version != *previous {
                    Err(ToolError::duplicate_name(
                        &draft.name,
                        format!(
                            "expected to replace version {previous} but version {} is registered",
                            existing.version
                        ),
                    ))
                } else if draft.version <= *previous {
                    Err(ToolError::invalid_descriptor(
                        "version",
                        format!("{} must be greater than {previous}", draft.version),
                    ))
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Writes the script body to its versioned draft directory.
    async fn write_script(
        &self,
        draft: &ToolDraft,
        extension: &str,
        body: &str,
        rollback: &mut Rollback,
    ) -> Result<PathBuf, ToolError> {
        if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ToolError::invalid_descriptor(
                "extension",
                format!("'{extension}' must be non-empty and alphanumeric"),
            ));
        }

        let dir = self
            .tools_dir
            .join(&draft.name)
            .join(draft.version.to_string());
        let storage = |e: std::io::Error| {
            ToolError::storage(format!("failed to write draft {}: {e}", dir.display()))
        };

        // A leftover directory can only come from an interrupted run.
        if tokio::fs::try_exists(&dir).await.map_err(storage)? {
            tokio::fs::remove_dir_all(&dir).await.map_err(storage)?;
        }
        tokio::fs::create_dir_all(&dir).await.map_err(storage)?;
        rollback.draft_dir = Some(dir.clone());

        let path = dir.join(format!("tool.{extension}"));
        tokio::fs::write(&path, body).await.map_err(storage)?;

        tracing::debug!(tool_name = %draft.name, path = %path.display(), "Draft script written");
        Ok(path)
    }

    /// Runs every case; the first failure rejects the candidate.
    async fn self_test(
        &self,
        descriptor: &ToolDescriptor,
        module: &SharedTool,
        cases: &[SelfTestCase],
    ) -> Result<(), ToolError> {
        for (index, case) in cases.iter().enumerate() {
            let outcome = run_module(
                descriptor,
                module.clone(),
                case.input.clone(),
                self.self_test_timeout,
            )
            .await;

            if !outcome.success {
                return Err(ToolError::self_test_failure(
                    &descriptor.name,
                    format!(
                        "case {index} failed: {}",
                        outcome.error.unwrap_or_default()
                    ),
                ));
            }

            if let Some(ref expected) = case.expect {
                let actual = outcome.result.unwrap_or(Value::Null);
                if actual != *expected {
                    return Err(ToolError::self_test_failure(
                        &descriptor.name,
                        format!("case {index}: expected {expected}, got {actual}"),
                    ));
                }
            }
        }

        tracing::debug!(
            tool_name = %descriptor.name,
            cases = cases.len(),
            "Self-test passed"
        );
        Ok(())
    }

    /// Removes a tool from the registry and releases its module.
    ///
    /// Script drafts under `tools_dir` are deleted; scripts elsewhere are left alone.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the tool is not registered, `DuplicateName` if
    /// an authoring run for it is in flight, or `Storage` if persisting fails.
    pub async fn retire(&self, name: &str) -> Result<ToolDescriptor, ToolError> {
        let Some(_reservation) = Reservation::acquire(&self.in_flight, name) else {
            return Err(ToolError::duplicate_name(name, "authoring already in progress"));
        };

        let removed = self.registry.remove(name).await?;

        match removed.location() {
            Ok(location @ EntryLocation::Native { .. }) => {
                self.modules.unmount(&location);
            }
            Ok(EntryLocation::Script { path, .. }) => {
                if let Some(dir) = path.parent().filter(|dir| dir.starts_with(&self.tools_dir)) {
                    if let Err(e) = tokio::fs::remove_dir_all(dir).await {
                        tracing::warn!(path = %dir.display(), error = %e, "Failed to remove retired script");
                    }
                }
            }
            _ => {}
        }

        tracing::info!(tool_name = %name, version = %removed.version, "Tool retired");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::definition::{Tool, ToolFuture};
    use crate::tools::loader::ToolLoader;
    use crate::tools::schema::FieldType;
    use crate::tools::store::RegistryStore;
    use serde_json::json;
    use tempfile::TempDir;

    #[derive(Debug)]
    struct WordCount;

    impl Tool for WordCount {
        fn entry(&self, input: Value) -> ToolFuture {
            Box::pin(async move {
                let text = input["text"].as_str().unwrap_or_default();
                Ok(json!(text.split_whitespace().count()))
            })
        }
    }

    #[derive(Debug)]
    struct Broken;

    impl Tool for Broken {
        fn entry(&self, _input: Value) -> ToolFuture {
            Box::pin(async move { Err(ToolError::fault("broken", "not implemented")) })
        }
    }

    #[derive(Debug)]
    struct Stalling;

    impl Tool for Stalling {
        fn entry(&self, _input: Value) -> ToolFuture {
            Box::pin(async move {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(json!(null))
            })
        }
    }

    struct Fixture {
        _dir: TempDir,
        tools_dir: PathBuf,
        registry: Arc<ToolRegistry>,
        modules: Arc<ModuleTable>,
        author: ToolAuthor,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let tools_dir = dir.path().join("dynamic");
            let registry = Arc::new(ToolRegistry::in_memory());
            let modules = Arc::new(ModuleTable::new());
            let author = ToolAuthor::new(registry.clone(), modules.clone(), &tools_dir);
            Self {
                _dir: dir,
                tools_dir,
                registry,
                modules,
                author,
            }
        }

        fn loader(&self) -> ToolLoader {
            ToolLoader::new(self.registry.clone(), self.modules.clone())
        }
    }

    fn word_count_draft(version: Version) -> ToolDraft {
        ToolDraft::native("word-count", version, Arc::new(WordCount))
            .with_description("Count words")
            .with_schema(InputSchema::new().required("text", FieldType::String, "Text"))
            .with_test(SelfTestCase::expecting(json!({"text": "a b c"}), json!(3)))
    }

    #[tokio::test]
    async fn native_draft_becomes_available() {
        let fixture = Fixture::new();
        let report = fixture.author.author(word_count_draft(Version::new(1, 0, 0))).await;

        assert!(report.is_available(), "{report:?}");
        assert!(report.id.to_string().starts_with("author_"));
        assert_eq!(
            report.transitions,
            vec![
                AuthoringState::Drafting,
                AuthoringState::SelfTesting,
                AuthoringState::Registering,
                AuthoringState::Available,
            ]
        );
        let descriptor = report.descriptor.unwrap();
        assert_eq!(descriptor.entry_location, "native:word-count@1.0.0");

        let result = fixture
            .loader()
            .invoke("word-count", json!({"text": "one two"}))
            .await;
        assert_eq!(result.result, Some(json!(2)));
        assert_eq!(result.version.as_deref(), Some("1.0.0"));
        assert!(!fixture.author.is_authoring("word-count"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn dropped_run_never_leaves_an_entry_without_its_script() {
        let dir = TempDir::new().unwrap();
        let tools_dir = dir.path().join("dynamic");
        let path = dir.path().join("registry.toml");
        let registry = Arc::new(ToolRegistry::open(RegistryStore::new(&path)).await.unwrap());
        let author = ToolAuthor::new(registry.clone(), Arc::new(ModuleTable::new()), &tools_dir);
        let body = "cat >/dev/null\nprintf '{\"success\":true,\"result\":1}'\n";

        for attempt in 0..12u64 {
            let name = format!("one-{attempt}");
            let draft = ToolDraft::script(&name, Version::new(1, 0, 0), "sh", "sh", body)
                .with_test(SelfTestCase::expecting(json!({}), json!(1)));
            let _ = tokio::time::timeout(
                Duration::from_millis(attempt * 2),
                author.author(draft),
            )
            .await;
            while author.is_authoring(&name) {
                tokio::task::yield_now().await;
            }

            let script = tools_dir.join(&name).join("1.0.0").join("tool.sh");
            if registry.contains(&name) {
                assert!(script.exists(), "{name} registered without its script");
            }
            let reopened = ToolRegistry::open(RegistryStore::new(&path)).await.unwrap();
            assert_eq!(reopened.contains(&name), registry.contains(&name), "{name}");
        }
    }

    #[tokio::test]
    async fn failing_self_test_is_rejected_and_never_resolvable() {
        let fixture = Fixture::new();
        let draft = ToolDraft::native("broken", Version::new(1, 0, 0), Arc::new(Broken))
            .with_test(SelfTestCase::new(json!({})));

        let report = fixture.author.author(draft).await;

        assert!(report.is_rejected());
        assert_eq!(
            report.transitions,
            vec![
                AuthoringState::Drafting,
                AuthoringState::SelfTesting,
                AuthoringState::Rejected,
            ]
        );
        let reason = report.reason.unwrap();
        assert!(reason.starts_with("SelfTestFailure: case 0 failed"), "{reason}");
        assert!(fixture.loader().invoke("broken", json!({})).await.is_not_found());
        assert!(fixture.modules.is_empty());
    }

    #[tokio::test]
    async fn unexpected_result_is_rejected() {
        let fixture = Fixture::new();
        let draft = ToolDraft::native("word-count", Version::new(1, 0, 0), Arc::new(WordCount))
            .with_test(SelfTestCase::expecting(json!({"text": "a b"}), json!(5)));

        let report = fixture.author.author(draft).await;
        assert!(report.reason.unwrap().contains("expected 5, got 2"));
        assert!(!fixture.registry.contains("word-count"));
    }

    #[tokio::test]
    async fn draft_without_tests_is_rejected() {
        let fixture = Fixture::new();
        let draft = ToolDraft::native("word-count", Version::new(1, 0, 0), Arc::new(WordCount));
        let report = fixture.author.author(draft).await;
        assert!(report.reason.unwrap().contains("at least one self-test"));
    }

    #[tokio::test]
    async fn invalid_name_is_rejected() {
        let fixture = Fixture::new();
        let mut draft = word_count_draft(Version::new(1, 0, 0));
        draft.name = "Word Count".to_string();
        let report = fixture.author.author(draft).await;
        assert!(report.reason.unwrap().starts_with("InvalidDescriptor"));
    }

    #[tokio::test]
    async fn existing_name_without_bump_is_duplicate() {
        let fixture = Fixture::new();
        assert!(fixture.author.author(word_count_draft(Version::new(1, 0, 0))).await.is_available());

        let report = fixture.author.author(word_count_draft(Version::new(1, 1, 0))).await;
        assert!(report.reason.unwrap().starts_with("DuplicateName"));
        assert_eq!(
            fixture.registry.lookup("word-count").unwrap().version,
            Version::new(1, 0, 0)
        );
    }

    #[tokio::test]
    async fn explicit_bump_replaces_version() {
        let fixture = Fixture::new();
        fixture.author.author(word_count_draft(Version::new(1, 0, 0))).await;

        let report = fixture
            .author
            .author(word_count_draft(Version::new(1, 1, 0)).replacing(Version::new(1, 0, 0)))
            .await;

        assert!(report.is_available(), "{report:?}");
        let result = fixture.loader().invoke("word-count", json!({"text": "x"})).await;
        assert_eq!(result.version.as_deref(), Some("1.1.0"));
        assert!(!fixture
            .modules
            .is_mounted(&EntryLocation::native("word-count", Version::new(1, 0, 0))));
    }

    #[tokio::test]
    async fn stale_bump_is_rejected() {
        let fixture = Fixture::new();
        fixture.author.author(word_count_draft(Version::new(1, 0, 0))).await;
        let report = fixture
            .author
            .author(word_count_draft(Version::new(2, 0, 0)).replacing(Version::new(0, 9, 0)))
            .await;
        assert!(report.reason.unwrap().starts_with("DuplicateName"));
    }

    #[tokio::test]
    async fn concurrent_attempt_for_same_name_is_rejected() {
        let fixture = Fixture::new();
        let _held = Reservation::acquire(&fixture.author.in_flight, "word-count").unwrap();
        assert!(fixture.author.is_authoring("word-count"));

        let report = fixture.author.author(word_count_draft(Version::new(1, 0, 0))).await;
        assert_eq!(
            report.reason.as_deref(),
            Some("DuplicateName: authoring already in progress")
        );
        assert_eq!(report.transitions, vec![AuthoringState::Drafting, AuthoringState::Rejected]);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_self_test_times_out() {
        let fixture = Fixture::new();
        let author = fixture
            .author
            .clone()
            .with_self_test_timeout(Some(Duration::from_millis(100)));
        let draft = ToolDraft::native("stalling", Version::new(1, 0, 0), Arc::new(Stalling))
            .with_test(SelfTestCase::new(json!({})));

        let report = author.author(draft).await;
        assert_eq!(
            report.reason.as_deref(),
            Some("SelfTestFailure: case 0 failed: Timeout")
        );
    }

    #[tokio::test]
    async fn abandoned_run_releases_name() {
        let fixture = Fixture::new();
        let draft = ToolDraft::native("stalling", Version::new(1, 0, 0), Arc::new(Stalling))
            .with_test(SelfTestCase::new(json!({})));
        let author = fixture.author.clone().with_self_test_timeout(None);

        let abandoned = tokio::time::timeout(Duration::from_millis(20), author.author(draft)).await;
        assert!(abandoned.is_err());
        assert!(!fixture.author.is_authoring("stalling"));
        assert!(!fixture.registry.contains("stalling"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn script_draft_is_written_and_invocable() {
        let fixture = Fixture::new();
        let draft = ToolDraft::script(
            "hello-script",
            Version::new(0, 1, 0),
            "sh",
            "sh",
            "cat >/dev/null\necho '{\"success\":true,\"result\":\"hi\"}'\n",
        )
        .with_test(SelfTestCase::expecting(json!({}), json!("hi")));

        let report = fixture.author.author(draft).await;
        assert!(report.is_available(), "{report:?}");

        let path = fixture.tools_dir.join("hello-script/0.1.0/tool.sh");
        assert!(path.exists());
        assert_eq!(
            report.descriptor.unwrap().entry_location,
            format!("script:sh:{}", path.display())
        );
        let result = fixture.loader().invoke("hello-script", json!({})).await;
        assert_eq!(result.result, Some(json!("hi")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn rejected_script_draft_is_removed() {
        let fixture = Fixture::new();
        let draft = ToolDraft::script("bad-script", Version::new(0, 1, 0), "sh", "sh", "exit 1\n")
            .with_test(SelfTestCase::new(json!({})));

        let report = fixture.author.author(draft).await;
        assert!(report.is_rejected());
        assert!(!fixture.tools_dir.join("bad-script/0.1.0").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn retire_removes_script_and_entry() {
        let fixture = Fixture::new();
        let draft = ToolDraft::script(
            "hello-script",
            Version::new(0, 1, 0),
            "sh",
            "sh",
            "echo '{\"success\":true,\"result\":1}'\n",
        )
        .with_test(SelfTestCase::new(json!({})));
        fixture.author.author(draft).await;

        let retired = fixture.author.retire("hello-script").await.unwrap();
        assert_eq!(retired.name, "hello-script");
        assert!(!fixture.tools_dir.join("hello-script/0.1.0").exists());
        assert!(fixture.loader().invoke("hello-script", json!({})).await.is_not_found());
    }

    #[tokio::test]
    async fn retire_native_unmounts() {
        let fixture = Fixture::new();
        fixture.author.author(word_count_draft(Version::new(1, 0, 0))).await;
        fixture.author.retire("word-count").await.unwrap();
        assert!(fixture.modules.is_empty());
        assert!(fixture.author.retire("word-count").await.unwrap_err().is_not_found());
    }
}
