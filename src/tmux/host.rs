//! tmux-backed host
//!
//! Buffers are panes parked in a private detached session. Showing a buffer
//! joins its pane into the caller's tmux window as a vertical split; hiding
//! it breaks the pane back into the private session. Since a shown buffer
//! is its own split, a window is identified by the same pane number.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use super::TmuxExecutor;
use crate::error::{Error, HostError, Result, TmuxError};
use crate::host::{
    BufferHook, Host, Notification, NotifyLevel, ProcessCommand, SpawnedProcess,
};
use crate::session::{BufferId, ProcessId, WindowId};

/// Interval between pane-death checks
pub const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// How long `wait_visible` waits for the pane to show up
pub const VISIBLE_TIMEOUT: Duration = Duration::from_millis(500);

const VISIBLE_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Host implementation driving a tmux server
pub struct TmuxHost {
    tmux: TmuxExecutor,
    /// Private detached session holding hidden buffers
    stash: String,
    /// Pane the user invoked us from
    origin: String,
}

impl TmuxHost {
    /// Host anchored at `$TMUX_PANE`
    pub fn from_env(tmux: TmuxExecutor) -> Result<Self> {
        let origin = std::env::var("TMUX_PANE").map_err(|_| TmuxError::NotInsideTmux)?;
        Ok(Self::with_origin(tmux, origin))
    }

    /// Host anchored at an explicit pane target
    pub fn with_origin(tmux: TmuxExecutor, origin: impl Into<String>) -> Self {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Self {
            tmux,
            stash: format!("lazypane-{}", &suffix[..8]),
            origin: origin.into(),
        }
    }

    pub fn stash_name(&self) -> &str {
        &self.stash
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Kill the private session and every buffer parked in it
    pub async fn shutdown(&self) -> Result<()> {
        if self.tmux.session_exists(self.stash.as_str()).await? {
            self.tmux.kill_session(self.stash.as_str()).await?;
            info!("Removed stash session {}", self.stash);
        }
        Ok(())
    }

    async fn ensure_stash(&self) -> Result<()> {
        if !self.tmux.session_exists(self.stash.as_str()).await? {
            self.tmux
                .execute(&["new-session", "-d", "-s", self.stash.as_str(), "-x", "200", "-y", "50"])
                .await?;
            debug!("Created stash session {}", self.stash);
        }
        Ok(())
    }

    /// `(session_name, window_active)` of a pane, `None` if it is gone
    async fn pane_location(&self, buffer: BufferId) -> Result<Option<(String, bool)>> {
        let out = self
            .tmux
            .try_display(pane_target(buffer).as_str(), "#{session_name} #{window_active}")
            .await?;

        Ok(out.map(|line| {
            let (session, active) = line.rsplit_once(' ').unwrap_or((line.as_str(), "0"));
            (session.to_string(), active == "1")
        }))
    }

    async fn pane_pid(&self, target: &str) -> Result<ProcessId> {
        let raw = self.tmux.display(target, "#{pane_pid}").await?;
        parse_pane_pid(&raw)
    }
}

/// tmux target for a buffer (`%N`)
pub fn pane_target(buffer: BufferId) -> String {
    format!("%{}", buffer.0)
}

/// Parse a tmux pane id such as `%12`
pub fn parse_pane_id(raw: &str) -> Result<BufferId> {
    raw.trim()
        .strip_prefix('%')
        .and_then(|n| n.parse().ok())
        .map(BufferId)
        .ok_or_else(|| TmuxError::ParseError(format!("bad pane id '{}'", raw.trim())).into())
}

/// Parse the `#{pane_pid}` of a freshly spawned pane
pub fn parse_pane_pid(raw: &str) -> Result<ProcessId> {
    raw.trim()
        .parse()
        .map(ProcessId)
        .map_err(|_| TmuxError::ParseError(format!("bad pane pid '{}'", raw.trim())).into())
}

/// Parse `#{pane_dead} #{pane_dead_status}` into the exit code, if dead
pub fn parse_dead_status(raw: &str) -> Option<Option<i32>> {
    let mut parts = raw.split_whitespace();
    match parts.next() {
        Some("1") => Some(parts.next().and_then(|s| s.parse().ok())),
        _ => None,
    }
}

/// Split height in percent for `join-pane -l`
pub fn split_percent(fraction: f64) -> u32 {
    ((fraction * 100.0).round() as u32).clamp(1, 99)
}

#[async_trait]
impl Host for TmuxHost {
    async fn create_buffer(&self) -> Result<BufferId> {
        self.ensure_stash().await?;

        let target = format!("{}:", self.stash);
        let out = self
            .tmux
            .execute(&["new-window", "-d", "-t", target.as_str(), "-P", "-F", "#{pane_id}"])
            .await?;
        let buffer = parse_pane_id(&out)?;

        self.tmux
            .execute(&[
                "set-option",
                "-p",
                "-t",
                pane_target(buffer).as_str(),
                "remain-on-exit",
                "on",
            ])
            .await?;

        Ok(buffer)
    }

    async fn buffer_loaded(&self, buffer: BufferId) -> Result<bool> {
        Ok(self
            .tmux
            .try_display(pane_target(buffer).as_str(), "#{pane_id}")
            .await?
            .is_some())
    }

    async fn delete_buffer(&self, buffer: BufferId) -> Result<()> {
        self.tmux
            .execute(&["kill-pane", "-t", pane_target(buffer).as_str()])
            .await?;
        Ok(())
    }

    async fn register_hooks(&self, buffer: BufferId, hooks: &[BufferHook]) -> Result<()> {
        // Panes never leave terminal mode; the hooks are recorded so they can
        // be inspected with `show-options -p`.
        let target = pane_target(buffer);
        for hook in hooks {
            let option = format!("@lazypane-{}", hook.name());
            self.tmux
                .execute(&["set-option", "-p", "-t", target.as_str(), option.as_str(), "1"])
                .await?;
        }
        Ok(())
    }

    async fn window_for_buffer(&self, buffer: BufferId) -> Result<Option<WindowId>> {
        Ok(match self.pane_location(buffer).await? {
            Some((session, _)) if session != self.stash => Some(WindowId(buffer.0)),
            _ => None,
        })
    }

    async fn open_window(&self, buffer: BufferId, fraction: f64) -> Result<WindowId> {
        let source = pane_target(buffer);
        let size = format!("{}%", split_percent(fraction));

        self.tmux
            .execute(&[
                "join-pane",
                "-v",
                "-l",
                size.as_str(),
                "-s",
                source.as_str(),
                "-t",
                self.origin.as_str(),
            ])
            .await?;

        if fraction >= 1.0 {
            self.tmux
                .execute(&["resize-pane", "-Z", "-t", source.as_str()])
                .await?;
        }

        Ok(WindowId(buffer.0))
    }

    async fn focus_window(&self, window: WindowId) -> Result<()> {
        let target = format!("%{}", window.0);
        self.tmux.execute(&["select-window", "-t", target.as_str()]).await?;
        self.tmux.execute(&["select-pane", "-t", target.as_str()]).await?;
        Ok(())
    }

    async fn close_window(&self, window: WindowId) -> Result<()> {
        let source = format!("%{}", window.0);
        let target = format!("{}:", self.stash);
        self.ensure_stash().await?;
        self.tmux
            .execute(&["break-pane", "-d", "-s", source.as_str(), "-t", target.as_str()])
            .await?;
        Ok(())
    }

    async fn spawn_process(
        &self,
        buffer: BufferId,
        command: &ProcessCommand,
    ) -> Result<SpawnedProcess> {
        let target = pane_target(buffer);
        let cwd = command.cwd.display().to_string();

        let mut args: Vec<&str> = vec!["respawn-pane", "-k", "-t", target.as_str()];
        args.extend(["-c", cwd.as_str()]);
        args.push(command.program.as_str());
        args.extend(command.args.iter().map(String::as_str));

        self.tmux.execute(&args).await.map_err(|e| {
            Error::Host(HostError::SpawnFailed {
                program: command.program.clone(),
                reason: e.to_string(),
            })
        })?;

        if let Some(title) = &command.title {
            if let Err(e) = self
                .tmux
                .execute(&["select-pane", "-t", target.as_str(), "-T", title.as_str()])
                .await
            {
                warn!("Failed to set title of {}: {}", target, e);
            }
        }

        // Without a pid there is nothing to watch, so don't leave the tool
        // running unattended
        let pid = match self.pane_pid(&target).await {
            Ok(pid) => pid,
            Err(e) => {
                if let Err(kill) = self.tmux.execute(&["kill-pane", "-t", target.as_str()]).await {
                    warn!("Failed to kill {} after spawn error: {}", target, kill);
                }
                return Err(e);
            }
        };

        let (tx, rx) = oneshot::channel();
        let tmux = self.tmux.clone();
        tokio::spawn(async move {
            let status = loop {
                tokio::time::sleep(EXIT_POLL_INTERVAL).await;
                if tx.is_closed() {
                    return;
                }
                match tmux
                    .try_display(target.as_str(), "#{pane_dead} #{pane_dead_status}")
                    .await
                {
                    Ok(Some(line)) => {
                        if let Some(status) = parse_dead_status(&line) {
                            break status;
                        }
                    }
                    // Pane is gone
                    Ok(None) => break None,
                    Err(e) => debug!("Exit poll for {} failed: {}", target, e),
                }
            };
            let _ = tx.send(status);
        });

        Ok(SpawnedProcess {
            id: pid,
            exited: rx,
        })
    }

    async fn wait_visible(&self, buffer: BufferId) -> Result<()> {
        let deadline = tokio::time::Instant::now() + VISIBLE_TIMEOUT;

        loop {
            match self.pane_location(buffer).await? {
                Some((session, true)) if session != self.stash => return Ok(()),
                None => return Err(HostError::BufferNotFound(buffer.0).into()),
                _ => {}
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(TmuxError::Timeout(VISIBLE_TIMEOUT).into());
            }
            tokio::time::sleep(VISIBLE_POLL_INTERVAL).await;
        }
    }

    async fn reposition_cursor(&self, buffer: BufferId) -> Result<()> {
        self.tmux
            .execute(&["select-pane", "-t", pane_target(buffer).as_str()])
            .await?;
        Ok(())
    }

    async fn current_tab(&self) -> Result<String> {
        self.tmux.display(self.origin.as_str(), "#{window_id}").await
    }

    async fn current_dir(&self) -> Result<PathBuf> {
        match self.tmux.display(self.origin.as_str(), "#{pane_current_path}").await {
            Ok(path) if !path.is_empty() => Ok(PathBuf::from(path)),
            _ => Ok(std::env::current_dir()?),
        }
    }

    async fn notify(&self, notification: Notification) {
        match notification.level {
            NotifyLevel::Info => info!("{}", notification),
            NotifyLevel::Warn => warn!("{}", notification),
            NotifyLevel::Error => error!("{}", notification),
        }

        let message = format!("lazypane: {}", notification.message);
        if let Err(e) = self
            .tmux
            .execute(&["display-message", "-t", self.origin.as_str(), message.as_str()])
            .await
        {
            debug!("Could not display notification: {}", e);
        }
    }
}
