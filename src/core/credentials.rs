use anyhow::{Context, Result};
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

const DEBOUNCE: Duration = Duration::from_millis(200);

/// Watches the token file so a token rotated by another `order-sheet`
/// process is picked up before this one presents the spent refresh token.
pub struct TokenFileWatcher {
    _watcher: RecommendedWatcher,
}

impl TokenFileWatcher {
    pub fn start(token_path: &Path) -> Result<(Self, mpsc::UnboundedReceiver<PathBuf>)> {
        let parent = token_path
            .parent()
            .map(Path::to_path_buf)
            .context("Token path has no parent directory")?;
        let file_name = token_path
            .file_name()
            .map(|f| f.to_os_string())
            .context("Token path has no file name")?;

        std::fs::create_dir_all(&parent).with_context(|| {
            format!("Failed to create token directory: {}", parent.display())
        })?;

        let (async_tx, async_rx) = mpsc::unbounded_channel::<PathBuf>();
        let (notify_tx, mut notify_rx) = mpsc::unbounded_channel::<()>();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| {
                let Ok(event) = res else {
                    return;
                };
                if !(event.kind.is_modify() || event.kind.is_create()) {
                    return;
                }
                if event
                    .paths
                    .iter()
                    .any(|p| p.file_name() == Some(file_name.as_os_str()))
                {
                    let _ = notify_tx.send(());
                }
            },
            Config::default(),
        )?;

        watcher
            .watch(&parent, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch directory: {}", parent.display()))?;
        tracing::info!(?parent, "Watching token directory");

        let token_path = token_path.to_path_buf();
        tokio::spawn(async move {
            while notify_rx.recv().await.is_some() {
                // a temp-file write plus rename arrives as several events
                tokio::time::sleep(DEBOUNCE).await;
                while notify_rx.try_recv().is_ok() {}

                tracing::debug!(path = ?token_path, "Token file changed on disk");
                if async_tx.send(token_path.clone()).is_err() {
                    break;
                }
            }
        });

        Ok((Self { _watcher: watcher }, async_rx))
    }
}
