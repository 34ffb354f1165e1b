//! Mutation reconciliation — debounced re-scanning of added subtrees
//!
//! Single-flight coalescing, not a queue: the first notification moves the
//! state machine from Idle to Pending, every further notification inside the
//! window folds its root into the pending set and resets the timer, and only
//! the terminal timer fires one reconciliation pass.

use crate::dom::{MutationEvent, NodeId, SharedDocument};
use crate::engine::HighlightEngine;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;

pub struct MutationReconciler {
    window: Duration,
}

impl MutationReconciler {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    /// Drive the Idle → Pending → Idle loop until the event source closes,
    /// invoking `pass` once per coalesced burst.
    pub async fn run_with<F, Fut>(self, mut events: UnboundedReceiver<MutationEvent>, mut pass: F)
    where
        F: FnMut(Vec<NodeId>) -> Fut,
        Fut: Future<Output = ()>,
    {
        while let Some(MutationEvent::SubtreeAdded(first)) = events.recv().await {
            let mut roots = vec![first];
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(self.window) => break,
                    event = events.recv() => match event {
                        Some(MutationEvent::SubtreeAdded(id)) => roots.push(id),
                        None => break,
                    },
                }
            }
            debug!(roots = roots.len(), "reconciliation pass");
            pass(roots).await;
        }
    }

    /// Reconcile by re-entering the engine's scan for each added root.
    pub async fn run(
        self,
        engine: Arc<HighlightEngine>,
        doc: SharedDocument,
        events: UnboundedReceiver<MutationEvent>,
    ) {
        self.run_with(events, move |roots| {
            let engine = Arc::clone(&engine);
            let doc = doc.clone();
            async move {
                for root in roots {
                    engine.scan(&doc, root).await;
                }
            }
        })
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    fn reconciler() -> MutationReconciler {
        MutationReconciler::new(Duration::from_millis(300))
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_notifications_coalesces_into_one_pass() {
        let (tx, rx) = mpsc::unbounded_channel();
        let passes = Arc::new(AtomicUsize::new(0));
        let roots_seen = Arc::new(AtomicUsize::new(0));

        let passes_clone = passes.clone();
        let roots_clone = roots_seen.clone();
        let task = tokio::spawn(reconciler().run_with(rx, move |roots| {
            let passes = passes_clone.clone();
            let roots_seen = roots_clone.clone();
            async move {
                passes.fetch_add(1, Ordering::SeqCst);
                roots_seen.fetch_add(roots.len(), Ordering::SeqCst);
            }
        }));

        for _ in 0..5 {
            tx.send(MutationEvent::SubtreeAdded(NodeId::new())).unwrap();
        }
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(passes.load(Ordering::SeqCst), 1);
        assert_eq!(roots_seen.load(Ordering::SeqCst), 5);

        drop(tx);
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn separate_bursts_fire_separate_passes() {
        let (tx, rx) = mpsc::unbounded_channel();
        let passes = Arc::new(AtomicUsize::new(0));

        let passes_clone = passes.clone();
        let task = tokio::spawn(reconciler().run_with(rx, move |_| {
            let passes = passes_clone.clone();
            async move {
                passes.fetch_add(1, Ordering::SeqCst);
            }
        }));

        tx.send(MutationEvent::SubtreeAdded(NodeId::new())).unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(passes.load(Ordering::SeqCst), 1);

        tx.send(MutationEvent::SubtreeAdded(NodeId::new())).unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(passes.load(Ordering::SeqCst), 2);

        drop(tx);
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn notifications_inside_window_reset_the_timer() {
        let (tx, rx) = mpsc::unbounded_channel();
        let passes = Arc::new(AtomicUsize::new(0));

        let passes_clone = passes.clone();
        let _task = tokio::spawn(reconciler().run_with(rx, move |_| {
            let passes = passes_clone.clone();
            async move {
                passes.fetch_add(1, Ordering::SeqCst);
            }
        }));

        // Keep poking every 200ms; the 300ms window never elapses.
        for _ in 0..4 {
            tx.send(MutationEvent::SubtreeAdded(NodeId::new())).unwrap();
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        assert_eq!(passes.load(Ordering::SeqCst), 0);

        // Going quiet lets the terminal timer fire once.
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(passes.load(Ordering::SeqCst), 1);
    }
}
