//! Hot reload (spec.md §1.1 ambient stack, §6.6): watches the game root for filesystem changes
//! and signals the runtime shell to re-run the whole preprocessor pipeline. Generalized from the
//! teacher's single-shader `ShaderHotReload` to watch an entire directory tree, since a program
//! here is a whole asset-bearing game root rather than one `.wgsl` file.

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};

/// Watches `root` recursively and coalesces bursts of filesystem events (editors often emit
/// several writes per save) into a single reload signal no more often than every 150ms.
pub struct HotReloadWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
    last_signal: Option<Instant>,
    debounce: Duration,
}

impl HotReloadWatcher {
    pub fn new(root: &Path) -> notify::Result<Self> {
        let (tx, rx) = std::sync::mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        watcher.watch(root, RecursiveMode::Recursive)?;
        Ok(Self { _watcher: watcher, rx, last_signal: None, debounce: Duration::from_millis(150) })
    }

    /// Returns `true` at most once per debounce window when a change has been observed since the
    /// last call. Never blocks.
    pub fn poll_reload(&mut self) -> bool {
        let mut saw_event = false;
        loop {
            match self.rx.try_recv() {
                Ok(Ok(_event)) => saw_event = true,
                Ok(Err(e)) => log::warn!("hot reload watch error: {e}"),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => break,
            }
        }
        if !saw_event {
            return false;
        }
        let now = Instant::now();
        let ready = self.last_signal.map(|t| now.duration_since(t) >= self.debounce).unwrap_or(true);
        if ready {
            self.last_signal = Some(now);
        }
        ready
    }
}

/// A reloadable game root for cases where watching isn't possible (headless/dump mode): simply
/// records the path so a later manual reload can re-run the pipeline against it.
pub struct ReloadTarget {
    pub root: PathBuf,
    pub entry: String,
}
