use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use huebot_contracts::HueError;
use huebot_engine::Renderer;

const STOP_POLL: Duration = Duration::from_millis(200);

/// Runs one render cycle. Failures are logged and the cycle is skipped; the next tick tries
/// again from scratch.
pub fn render_once(renderer: &Renderer) -> bool {
    match renderer.render_to_sink() {
        Ok(receipt) => {
            tracing::debug!(render_id = %receipt.render_id, "render cycle finished");
            true
        }
        Err(HueError::NotConfigured) => {
            tracing::info!("no active image yet, skipping render");
            false
        }
        Err(err) => {
            tracing::warn!(error = %err, "render failed, skipping cycle");
            false
        }
    }
}

/// Renders immediately, then every `every` until `stop` is raised.
pub fn run_periodic(renderer: &Renderer, every: Duration, stop: &AtomicBool) {
    while !stop.load(Ordering::SeqCst) {
        let started = Instant::now();
        render_once(renderer);
        while started.elapsed() < every {
            if stop.load(Ordering::SeqCst) {
                return;
            }
            thread::sleep(STOP_POLL.min(every.saturating_sub(started.elapsed())));
        }
    }
}

pub fn spawn_periodic(
    renderer: Renderer,
    every: Duration,
    stop: Arc<AtomicBool>,
) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("huebot-render".to_string())
        .spawn(move || run_periodic(&renderer, every, &stop))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use huebot_contracts::store::{ColorStore, MemoryStore};
    use huebot_engine::{DirBlobStore, Renderer};

    use super::{render_once, spawn_periodic};

    #[test]
    fn render_once_survives_missing_state() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = Arc::new(MemoryStore::new());
        let blobs = Arc::new(DirBlobStore::new(temp.path(), temp.path().join("out")));
        let renderer = Renderer::new(store.clone(), blobs);

        assert!(!render_once(&renderer));
        store.activate("missing.png")?;
        assert!(!render_once(&renderer));
        Ok(())
    }

    #[test]
    fn periodic_thread_stops_when_asked() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = Arc::new(MemoryStore::new());
        let blobs = Arc::new(DirBlobStore::new(temp.path(), temp.path().join("out")));
        let stop = Arc::new(AtomicBool::new(false));

        let handle = spawn_periodic(
            Renderer::new(store, blobs),
            Duration::from_secs(3600),
            stop.clone(),
        )?;
        stop.store(true, Ordering::SeqCst);
        handle
            .join()
            .map_err(|_| anyhow::anyhow!("render thread panicked"))?;
        Ok(())
    }
}
