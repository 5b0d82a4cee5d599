//! Debounced selection watcher
//!
//! Scene-change notifications arrive in bursts (every pointer move). The
//! watcher rescans on the trailing edge only: once no notification has
//! arrived for the configured quiet period, it scans the live selection
//! and publishes the result.

use crate::engine::MacroEngine;
use crate::scan::SelectionScan;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Background task publishing the latest selection scan
#[derive(Debug)]
pub struct SelectionWatcher {
    changes: mpsc::UnboundedSender<()>,
    latest: watch::Receiver<Arc<SelectionScan>>,
    task: JoinHandle<()>,
}

impl SelectionWatcher {
    /// Start watching with the engine's configured debounce
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(engine: Arc<MacroEngine>) -> Self {
        let delay = engine.config().debounce();
        let (changes, receiver) = mpsc::unbounded_channel();
        let (publisher, latest) = watch::channel(Arc::new(SelectionScan::default()));
        let task = tokio::spawn(debounce_loop(engine, receiver, publisher, delay));
        Self {
            changes,
            latest,
            task,
        }
    }

    /// Report a scene or selection change
    pub fn notify_change(&self) {
        // the loop only stops when the watcher is dropped
        let _ = self.changes.send(());
    }

    /// Receiver that wakes on every published scan
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<SelectionScan>> {
        self.latest.clone()
    }

    /// Most recently published scan
    #[must_use]
    pub fn latest(&self) -> Arc<SelectionScan> {
        Arc::clone(&self.latest.borrow())
    }
}

impl Drop for SelectionWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn debounce_loop(
    engine: Arc<MacroEngine>,
    mut changes: mpsc::UnboundedReceiver<()>,
    publisher: watch::Sender<Arc<SelectionScan>>,
    delay: Duration,
) {
    while changes.recv().await.is_some() {
        let mut closed = false;
        loop {
            match tokio::time::timeout(delay, changes.recv()).await {
                Ok(Some(())) => continue,
                Ok(None) => {
                    closed = true;
                    break;
                }
                Err(_) => break,
            }
        }

        let scan = engine.scan_selection();
        tracing::debug!(names = scan.invocations.len(), "publishing selection scan");
        publisher.send_replace(Arc::new(scan));
        if closed {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::scene::InMemoryScene;
    use galaxy_scene::{Binding, BoundElement, Element, ElementKind};

    fn anchored_scene() -> Arc<InMemoryScene> {
        let mut anchor = Element::new("anchor", ElementKind::Arrow);
        anchor.end_binding = Some(Binding::to("start"));
        anchor.bound_elements = Some(vec![BoundElement {
            id: "label".into(),
            kind: ElementKind::Text,
        }]);
        Arc::new(InMemoryScene::new(vec![
            Element::text("start", ""),
            anchor,
            Element::text("label", "Home"),
        ]))
    }

    #[tokio::test(start_paused = true)]
    async fn burst_produces_one_trailing_scan() {
        let scene = anchored_scene();
        let engine = Arc::new(MacroEngine::new(EngineConfig::default(), scene));
        let watcher = SelectionWatcher::spawn(engine);
        let mut updates = watcher.subscribe();

        for _ in 0..5 {
            watcher.notify_change();
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        // still inside the quiet period of the last change
        assert!(!updates.has_changed().unwrap());

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(updates.has_changed().unwrap());
        let scan = updates.borrow_and_update().clone();
        assert_eq!(scan.get("jump").len(), 1);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!updates.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn separate_bursts_scan_separately() {
        let scene = anchored_scene();
        let engine = Arc::new(MacroEngine::new(EngineConfig::default().with_debounce_ms(50), scene.clone()));
        let watcher = SelectionWatcher::spawn(engine);
        let mut updates = watcher.subscribe();

        watcher.notify_change();
        updates.changed().await.unwrap();
        assert_eq!(updates.borrow_and_update().get("jump").len(), 1);

        scene.select(["start"]);
        watcher.notify_change();
        updates.changed().await.unwrap();
        assert!(watcher.latest().is_empty());
    }
}
