//! Session manager - coordinates session lifecycle
//!
//! Owns one `Session` per scope key and drives the host through the
//! open / drop / toggle sequences. Each scope has its own async mutex;
//! `open` holds it for its whole sequence so overlapping calls on one scope
//! serialize, while other scopes carry on. The scope map itself is only
//! locked long enough to look up or insert a slot.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::config::{Scope, SessionConfig, SetupOptions};
use crate::error::{Error, Result};
use crate::host::{BufferHook, Host, Notification, ProcessCommand, SpawnedProcess};
use crate::repo::{RepoInfo, RootResolver};
use crate::session::{BufferId, ProcessId, ScopeKey, Session, SessionSnapshot};

/// Pause between tearing down a session and opening its replacement, so the
/// host finishes deleting the old buffer and window first
pub const SETTLE_DELAY: Duration = Duration::from_millis(25);

type Slot = Arc<Mutex<Session>>;

struct Inner<H> {
    host: H,
    resolver: RootResolver,
    config: RwLock<SessionConfig>,
    sessions: RwLock<HashMap<ScopeKey, Slot>>,
    /// Signalled every time a session is torn down
    closed: Notify,
}

/// Session manager coordinates all session operations
///
/// Cloning is cheap; clones share the same sessions and configuration.
pub struct SessionManager<H: Host> {
    inner: Arc<Inner<H>>,
}

impl<H: Host> Clone for SessionManager<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<H: Host> SessionManager<H> {
    /// Create a manager with the default configuration
    pub fn new(host: H) -> Self {
        Self::with_config(host, SessionConfig::default())
    }

    /// Create a manager with an explicit starting configuration
    pub fn with_config(host: H, config: SessionConfig) -> Self {
        Self::with_resolver(host, config, RootResolver::new())
    }

    pub fn with_resolver(host: H, config: SessionConfig, resolver: RootResolver) -> Self {
        Self {
            inner: Arc::new(Inner {
                host,
                resolver,
                config: RwLock::new(config),
                sessions: RwLock::new(HashMap::new()),
                closed: Notify::new(),
            }),
        }
    }

    pub fn host(&self) -> &H {
        &self.inner.host
    }

    /// Current configuration
    pub async fn config(&self) -> SessionConfig {
        self.inner.config.read().await.clone()
    }

    /// Validate `options` and merge them over the current configuration
    #[instrument(skip(self))]
    pub async fn configure(&self, options: &SetupOptions) -> Result<()> {
        let result = self.inner.config.write().await.merge(options);

        match &result {
            Ok(()) => info!("Applied setup options"),
            Err(e) => {
                warn!("Rejected setup options: {}", e);
                self.inner
                    .host
                    .notify(Notification::error(e.to_string()))
                    .await;
            }
        }

        result
    }

    /// Scope key for the caller's current context
    pub async fn active_scope_key(&self) -> Result<ScopeKey> {
        let scope = self.inner.config.read().await.scope;
        match scope {
            Scope::Global => Ok(ScopeKey::global()),
            Scope::PerTab => {
                let tab = self.inner.host.current_tab().await?;
                Ok(ScopeKey::tab(&tab))
            }
        }
    }

    /// Open (or focus) the session for the repository enclosing `path`
    ///
    /// Without `path`, `use_last` reopens the session's last repository; when
    /// there is none, or `use_last` is false, the caller's working directory
    /// is used.
    #[instrument(skip(self))]
    pub async fn open(&self, path: Option<&Path>, use_last: bool) -> Result<()> {
        let scope = self.active_scope_key().await?;
        let config = self.config().await;
        let host = &self.inner.host;

        let slot = self.slot(&scope).await;
        let mut guard = slot.lock().await;
        let session = &mut *guard;

        let last_path = session.last_path.clone();
        let target = match (path, use_last, last_path) {
            (Some(path), _, _) => path.to_path_buf(),
            (None, true, Some(last)) => last,
            _ => host.current_dir().await?,
        };

        let Some(root) = self.inner.resolver.resolve(&target) else {
            info!("{:?} is not inside a repository", target);
            host.notify(Notification::error(format!(
                "Not a repository: {}",
                target.display()
            )))
            .await;
            return Err(Error::RepositoryNotFound(target));
        };

        if session.last_path.as_deref() != Some(root.as_path()) && session.is_allocated() {
            info!(
                "Switching {} from {:?} to {:?}",
                scope, session.last_path, root
            );
            self.teardown(&scope, session).await;
            tokio::time::sleep(SETTLE_DELAY).await;
        }

        let buffer = self.ensure_buffer(session).await?;

        match host.window_for_buffer(buffer).await? {
            Some(window) => host.focus_window(window).await?,
            None => {
                let window = host.open_window(buffer, config.window_fraction).await?;
                debug!("Opened {} for {}", window, buffer);
            }
        }

        if session.process.is_none() {
            let spawned = match self.start_process(buffer, &root, &config).await {
                Ok(spawned) => spawned,
                Err(e) => {
                    host.notify(Notification::error(format!(
                        "Failed to start {}: {}",
                        config.program, e
                    )))
                    .await;
                    return Err(e);
                }
            };
            let pid = spawned.id;
            session.set_process(pid, root.clone());
            info!("Started {} in {} for {:?} ({})", config.program, buffer, root, pid);

            self.watch_exit(scope, spawned);
            self.schedule_cursor_reposition(buffer);
        } else {
            debug!("{} already running in {}", config.program, buffer);
        }

        Ok(())
    }

    /// Hide the active session's window if visible, otherwise `open`
    ///
    /// Hiding leaves the buffer and process running.
    #[instrument(skip(self))]
    pub async fn toggle(&self, path: Option<&Path>, use_last: bool) -> Result<()> {
        let scope = self.active_scope_key().await?;
        let buffer = match self.existing_slot(&scope).await {
            Some(slot) => slot.lock().await.buffer,
            None => None,
        };

        if let Some(buffer) = buffer {
            if let Some(window) = self.inner.host.window_for_buffer(buffer).await? {
                info!("Hiding {} of {}", window, scope);
                return self.inner.host.close_window(window).await;
            }
        }

        self.open(path, use_last).await
    }

    /// Tear down the session of the caller's current scope
    pub async fn close(&self) -> Result<()> {
        let scope = self.active_scope_key().await?;
        self.drop_session(&scope).await;
        Ok(())
    }

    /// Tear down the session for `scope`
    ///
    /// Safe on an empty or unknown scope. `last_path` survives.
    #[instrument(skip(self))]
    pub async fn drop_session(&self, scope: &ScopeKey) {
        if let Some(slot) = self.existing_slot(scope).await {
            let mut session = slot.lock().await;
            self.teardown(scope, &mut session).await;
        }
    }

    /// State of `scope`, `None` if it never opened anything
    pub async fn snapshot(&self, scope: &ScopeKey) -> Option<SessionSnapshot> {
        let slot = self.existing_slot(scope).await?;
        let session = slot.lock().await;
        (!session.is_untouched()).then(|| session.snapshot(scope))
    }

    /// Snapshots of every scope that opened something, ordered by key
    pub async fn snapshots(&self) -> Vec<SessionSnapshot> {
        let slots: Vec<(ScopeKey, Slot)> = {
            let sessions = self.inner.sessions.read().await;
            sessions
                .iter()
                .map(|(k, s)| (k.clone(), Arc::clone(s)))
                .collect()
        };

        let mut all = Vec::with_capacity(slots.len());
        for (scope, slot) in slots {
            let session = slot.lock().await;
            if !session.is_untouched() {
                all.push(session.snapshot(&scope));
            }
        }
        all.sort_by(|a, b| a.scope.cmp(&b.scope));
        all
    }

    /// Whether `scope` holds a buffer or process
    pub async fn is_active(&self, scope: &ScopeKey) -> bool {
        match self.existing_slot(scope).await {
            Some(slot) => slot.lock().await.is_allocated(),
            None => false,
        }
    }

    /// Resolve once `scope` holds no buffer or process
    pub async fn wait_closed(&self, scope: &ScopeKey) {
        loop {
            let notified = self.inner.closed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if !self.is_active(scope).await {
                return;
            }
            notified.await;
        }
    }

    async fn existing_slot(&self, scope: &ScopeKey) -> Option<Slot> {
        self.inner.sessions.read().await.get(scope).cloned()
    }

    async fn slot(&self, scope: &ScopeKey) -> Slot {
        if let Some(slot) = self.existing_slot(scope).await {
            return slot;
        }
        let mut sessions = self.inner.sessions.write().await;
        Arc::clone(sessions.entry(scope.clone()).or_default())
    }

    async fn ensure_buffer(&self, session: &mut Session) -> Result<BufferId> {
        let host = &self.inner.host;

        if let Some(buffer) = session.buffer {
            if host.buffer_loaded(buffer).await? {
                return Ok(buffer);
            }
            warn!("{} disappeared, allocating a new one", buffer);
        }

        let buffer = host.create_buffer().await?;
        session.set_buffer(buffer);
        host.register_hooks(buffer, &BufferHook::ALL).await?;
        debug!("Created {}", buffer);
        Ok(buffer)
    }

    async fn start_process(
        &self,
        buffer: BufferId,
        root: &Path,
        config: &SessionConfig,
    ) -> Result<SpawnedProcess> {
        let mut command = ProcessCommand::new(&config.program, config.command_args(root), root);

        match RepoInfo::inspect(root) {
            Ok(info) => command = command.with_title(info.title()),
            Err(e) => debug!("Could not inspect {:?}: {}", root, e),
        }

        self.inner.host.spawn_process(buffer, &command).await
    }

    /// Drop the session once its process exits, unless it was replaced
    fn watch_exit(&self, scope: ScopeKey, spawned: SpawnedProcess) {
        let manager = self.clone();
        let pid = spawned.id;

        tokio::spawn(async move {
            let status = spawned.exited.await.unwrap_or(None);
            info!("{} in {} exited with {:?}", pid, scope, status);
            manager.drop_if_current(&scope, pid).await;
        });
    }

    async fn drop_if_current(&self, scope: &ScopeKey, pid: ProcessId) {
        let Some(slot) = self.existing_slot(scope).await else {
            return;
        };
        let mut session = slot.lock().await;
        if session.process == Some(pid) {
            self.teardown(scope, &mut session).await;
        } else {
            debug!("{} no longer tracked by {}, nothing to drop", pid, scope);
        }
    }

    fn schedule_cursor_reposition(&self, buffer: BufferId) {
        let manager = self.clone();

        tokio::spawn(async move {
            let host = &manager.inner.host;
            if let Err(e) = host.wait_visible(buffer).await {
                debug!("{} never became visible: {}", buffer, e);
                return;
            }
            if let Err(e) = host.reposition_cursor(buffer).await {
                debug!("Failed to reposition cursor in {}: {}", buffer, e);
            }
        });
    }

    async fn teardown(&self, scope: &ScopeKey, session: &mut Session) {
        let host = &self.inner.host;

        if let Some(buffer) = session.buffer {
            match host.window_for_buffer(buffer).await {
                Ok(Some(window)) => {
                    if let Err(e) = host.close_window(window).await {
                        warn!("Failed to close {}: {}", window, e);
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("Failed to look up window for {}: {}", buffer, e),
            }

            match host.buffer_loaded(buffer).await {
                Ok(true) => {
                    if let Err(e) = host.delete_buffer(buffer).await {
                        warn!("Failed to delete {}: {}", buffer, e);
                    }
                }
                Ok(false) => {}
                Err(e) => warn!("Failed to query {}: {}", buffer, e),
            }
        }

        if session.is_allocated() {
            info!("Dropped session {}", scope);
        }
        session.reset();
        self.inner.closed.notify_waiters();
    }
}
