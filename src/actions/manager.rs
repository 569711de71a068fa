//! ActionManager: history log plus multi-subscriber fan-out.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

use crate::model::Action;

/// Handle identifying one registered observer queue.
pub type ObserverId = Uuid;

/// Records every emitted Action and relays it to registered observers.
///
/// The history log and the observer set are guarded by independent
/// locks; `record` holds each only briefly and never blocks on any
/// subscriber's queue capacity. A full observer queue skips that single
/// delivery (drop-one policy: the manager does not own its observers'
/// lifecycles, so it never tears one down; the broadcast layer applies
/// its own disconnect policy on top).
#[derive(Debug)]
pub struct ActionManager {
    history: RwLock<VecDeque<Action>>,
    /// Ring bound for the history log; 0 keeps everything
    history_limit: usize,
    observers: RwLock<HashMap<ObserverId, mpsc::Sender<Action>>>,
    dropped: AtomicU64,
}

impl ActionManager {
    /// `history_limit` of 0 keeps the full history.
    pub fn new(history_limit: usize) -> Self {
        Self {
            history: RwLock::new(VecDeque::new()),
            history_limit,
            observers: RwLock::new(HashMap::new()),
            dropped: AtomicU64::new(0),
        }
    }

    /// Append to the history log, then try-send to every observer.
    ///
    /// Arrival order is preserved in the log; a saturated observer loses
    /// this one delivery and nothing else.
    pub fn record(&self, action: Action) {
        {
            let mut history = self
                .history
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            history.push_back(action.clone());
            if self.history_limit > 0 && history.len() > self.history_limit {
                history.pop_front();
            }
        }

        let observers = self
            .observers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for sender in observers.values() {
            match sender.try_send(action.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) | Err(TrySendError::Closed(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    /// Register an observer queue; returns the handle for unregistering.
    pub fn register_observer(&self, sender: mpsc::Sender<Action>) -> ObserverId {
        let id = Uuid::new_v4();
        self.observers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id, sender);
        id
    }

    /// Remove an observer; its queue closes when the sender drops.
    pub fn unregister_observer(&self, id: ObserverId) {
        self.observers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&id);
    }

    /// Most recent `limit` entries in arrival order; `limit` of 0 (or
    /// beyond the history length) returns everything retained.
    pub fn recent(&self, limit: usize) -> Vec<Action> {
        let history = self
            .history
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let take = if limit == 0 || limit > history.len() {
            history.len()
        } else {
            limit
        };
        history.iter().skip(history.len() - take).cloned().collect()
    }

    pub fn history_len(&self) -> usize {
        self.history
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn observer_count(&self) -> usize {
        self.observers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Deliveries skipped because an observer queue was full or closed.
    pub fn dropped_deliveries(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(n: i64) -> Action {
        let mut action = Action::new("alert");
        action.count = Some(n);
        action
    }

    #[test]
    fn test_history_preserves_arrival_order() {
        let manager = ActionManager::new(0);
        for n in 0..5 {
            manager.record(action(n));
        }

        let recent = manager.recent(0);
        let counts: Vec<_> = recent.iter().map(|a| a.count.unwrap()).collect();
        assert_eq!(counts, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_recent_limit() {
        let manager = ActionManager::new(0);
        for n in 0..5 {
            manager.record(action(n));
        }

        let last_two = manager.recent(2);
        let counts: Vec<_> = last_two.iter().map(|a| a.count.unwrap()).collect();
        assert_eq!(counts, vec![3, 4]);

        // Over-large limit returns everything
        assert_eq!(manager.recent(100).len(), 5);
    }

    #[test]
    fn test_ring_bound_trims_oldest() {
        let manager = ActionManager::new(3);
        for n in 0..5 {
            manager.record(action(n));
        }

        let recent = manager.recent(0);
        let counts: Vec<_> = recent.iter().map(|a| a.count.unwrap()).collect();
        assert_eq!(counts, vec![2, 3, 4]);
    }

    #[tokio::test]
    async fn test_fanout_delivers_in_order() {
        let manager = ActionManager::new(0);
        let (tx, mut rx) = mpsc::channel(16);
        manager.register_observer(tx);

        for n in 0..3 {
            manager.record(action(n));
        }

        for n in 0..3 {
            assert_eq!(rx.recv().await.unwrap().count, Some(n));
        }
    }

    #[tokio::test]
    async fn test_saturated_observer_never_blocks_record() {
        let manager = ActionManager::new(0);
        let (stuck_tx, stuck_rx) = mpsc::channel(2);
        let (healthy_tx, mut healthy_rx) = mpsc::channel(64);
        manager.register_observer(stuck_tx);
        manager.register_observer(healthy_tx);

        // Far more than the stuck queue can hold; record must not block
        for n in 0..10 {
            manager.record(action(n));
        }

        assert_eq!(manager.history_len(), 10);
        assert_eq!(manager.dropped_deliveries(), 8);

        // The healthy observer saw everything, in order
        for n in 0..10 {
            assert_eq!(healthy_rx.recv().await.unwrap().count, Some(n));
        }
        drop(stuck_rx);
    }

    #[tokio::test]
    async fn test_unregister_stops_delivery() {
        let manager = ActionManager::new(0);
        let (tx, mut rx) = mpsc::channel(16);
        let id = manager.register_observer(tx);

        manager.record(action(1));
        manager.unregister_observer(id);
        manager.record(action(2));

        assert_eq!(rx.recv().await.unwrap().count, Some(1));
        // Sender dropped on unregister, so the stream ends
        assert!(rx.recv().await.is_none());
        assert_eq!(manager.observer_count(), 0);
    }
}
