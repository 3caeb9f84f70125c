//! Tests against a live tmux server
//!
//! Every test is skipped when tmux is missing or too old. Each one runs in
//! its own detached session, and the fixture kills that session and the
//! host's stash session on drop, so a failed assertion leaves nothing
//! behind on the server.

use std::path::PathBuf;
use std::time::Duration;

use tempfile::TempDir;
use tokio_test::assert_ok;

use lazypane::host::{Host, ProcessCommand};
use lazypane::tmux::{pane_target, TmuxExecutor, TmuxHost};
use lazypane::{ScopeKey, SessionManager, SetupOptions};

/// Helper to check if a usable tmux is available
async fn tmux_available() -> bool {
    TmuxExecutor::new().check_installed().await.is_ok()
}

/// Directory carrying a `.git` marker
fn create_test_root() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("proj");
    std::fs::create_dir_all(root.join(".git")).unwrap();
    (temp_dir, root)
}

/// Detached tmux session hosting the test's origin pane
struct TmuxFixture {
    origin: String,
    sessions: Vec<String>,
}

impl TmuxFixture {
    async fn start() -> Self {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let name = format!("lazypane-test-{}", &suffix[..8]);
        let out = tokio::process::Command::new("tmux")
            .args(["new-session", "-d", "-s", &name, "-x", "200", "-y", "50"])
            .args(["-P", "-F", "#{pane_id}"])
            .output()
            .await
            .unwrap();
        let origin = String::from_utf8_lossy(&out.stdout).trim().to_string();
        Self {
            origin,
            sessions: vec![name],
        }
    }

    /// Host anchored at the origin pane whose stash is cleaned up with us
    fn host(&mut self) -> TmuxHost {
        let host = TmuxHost::with_origin(TmuxExecutor::new(), self.origin.clone());
        self.sessions.push(host.stash_name().to_string());
        host
    }
}

impl Drop for TmuxFixture {
    fn drop(&mut self) {
        for name in &self.sessions {
            let _ = std::process::Command::new("tmux")
                .args(["kill-session", "-t", name])
                .output();
        }
    }
}

async fn kill_pane(target: &str) {
    tokio::process::Command::new("tmux")
        .args(["kill-pane", "-t", target])
        .output()
        .await
        .unwrap();
}

fn sleeper() -> SetupOptions {
    SetupOptions {
        program: Some("sh".to_string()),
        args: Some(vec!["-c".to_string(), "sleep 30".to_string()]),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_try_display_missing_pane_is_none() {
    if !tmux_available().await {
        eprintln!("Skipping test: tmux not available");
        return;
    }

    let fixture = TmuxFixture::start().await;
    let tmux = TmuxExecutor::new();

    assert_eq!(tmux.try_display("%999999", "#{pane_id}").await.unwrap(), None);
    assert_eq!(
        tmux.try_display(&fixture.origin, "#{pane_id}").await.unwrap(),
        Some(fixture.origin.clone())
    );
}

#[tokio::test]
async fn test_tmux_host_buffer_lifecycle() {
    if !tmux_available().await {
        eprintln!("Skipping test: tmux not available");
        return;
    }

    let mut fixture = TmuxFixture::start().await;
    let host = fixture.host();
    let (_temp_dir, root) = create_test_root();

    let buffer = host.create_buffer().await.unwrap();
    assert!(host.buffer_loaded(buffer).await.unwrap());
    assert_eq!(host.window_for_buffer(buffer).await.unwrap(), None);

    let window = host.open_window(buffer, 0.5).await.unwrap();
    assert_eq!(host.window_for_buffer(buffer).await.unwrap(), Some(window));

    let command = ProcessCommand::new(
        "sh",
        vec!["-c".to_string(), "sleep 0.2".to_string()],
        &root,
    );
    let spawned = host.spawn_process(buffer, &command).await.unwrap();
    let exited = tokio::time::timeout(Duration::from_secs(5), spawned.exited).await;
    assert!(exited.is_ok(), "process should exit on its own");

    host.close_window(window).await.unwrap();
    assert_eq!(host.window_for_buffer(buffer).await.unwrap(), None);

    host.delete_buffer(buffer).await.unwrap();
    assert!(!host.buffer_loaded(buffer).await.unwrap());
    assert_eq!(host.window_for_buffer(buffer).await.unwrap(), None);
    assert!(host.wait_visible(buffer).await.is_err());

    host.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_tmux_host_reports_killed_pane_as_exit() {
    if !tmux_available().await {
        eprintln!("Skipping test: tmux not available");
        return;
    }

    let mut fixture = TmuxFixture::start().await;
    let host = fixture.host();
    let (_temp_dir, root) = create_test_root();

    let buffer = host.create_buffer().await.unwrap();
    let command = ProcessCommand::new(
        "sh",
        vec!["-c".to_string(), "sleep 30".to_string()],
        &root,
    );
    let spawned = host.spawn_process(buffer, &command).await.unwrap();

    kill_pane(&pane_target(buffer)).await;

    let exited = tokio::time::timeout(Duration::from_secs(3), spawned.exited).await;
    assert_eq!(exited.expect("exit should be reported").unwrap(), None);
    assert!(!host.buffer_loaded(buffer).await.unwrap());
}

#[tokio::test]
async fn test_force_deleted_pane_drops_session() {
    if !tmux_available().await {
        eprintln!("Skipping test: tmux not available");
        return;
    }

    let mut fixture = TmuxFixture::start().await;
    let manager = SessionManager::new(fixture.host());
    let (_temp_dir, root) = create_test_root();
    let scope = ScopeKey::global();

    assert_ok!(manager.configure(&sleeper()).await);
    assert_ok!(manager.open(Some(&root), true).await);
    let buffer = manager.snapshot(&scope).await.unwrap().buffer.unwrap();

    kill_pane(&pane_target(buffer)).await;

    assert_ok!(tokio::time::timeout(Duration::from_secs(3), manager.wait_closed(&scope)).await);
    assert!(!manager.is_active(&scope).await);

    // The scope is usable again
    assert_ok!(manager.open(None, true).await);
    let reopened = manager.snapshot(&scope).await.unwrap();
    assert_ne!(reopened.buffer, Some(buffer));
    assert!(reopened.process.is_some());

    manager.drop_session(&scope).await;
    assert_ok!(manager.host().shutdown().await);
}

#[tokio::test]
async fn test_process_exit_drops_session() {
    if !tmux_available().await {
        eprintln!("Skipping test: tmux not available");
        return;
    }

    let mut fixture = TmuxFixture::start().await;
    let manager = SessionManager::new(fixture.host());
    let (_temp_dir, root) = create_test_root();
    let scope = ScopeKey::global();

    let quick = SetupOptions {
        program: Some("sh".to_string()),
        args: Some(vec!["-c".to_string(), "sleep 0.2".to_string()]),
        ..Default::default()
    };
    assert_ok!(manager.configure(&quick).await);
    assert_ok!(manager.open(Some(&root), true).await);
    let buffer = manager.snapshot(&scope).await.unwrap().buffer.unwrap();

    assert_ok!(tokio::time::timeout(Duration::from_secs(3), manager.wait_closed(&scope)).await);
    assert!(!manager.host().buffer_loaded(buffer).await.unwrap());

    assert_ok!(manager.host().shutdown().await);
}

#[tokio::test]
async fn test_tmux_host_current_tab_and_dir() {
    if !tmux_available().await {
        eprintln!("Skipping test: tmux not available");
        return;
    }

    let mut fixture = TmuxFixture::start().await;
    let host = fixture.host();

    let tab = host.current_tab().await.unwrap();
    assert!(tab.starts_with('@'), "window ids look like @N, got {}", tab);
    assert!(host.current_dir().await.unwrap().is_absolute());
}
