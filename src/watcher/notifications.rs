//! Broadcasting reload outcomes to several consumers.
//!
//! The reloader accepts a single sink. `ReloadBroadcaster` is that sink when
//! more than one party (agents, a search cache, a CLI printer) needs to hear
//! about reloads.

use tokio::sync::broadcast;

use super::sink::{ReloadOutcome, ReloadSink};

/// Fans reload outcomes out to every subscriber.
#[derive(Debug, Clone)]
pub struct ReloadBroadcaster {
    sender: broadcast::Sender<ReloadOutcome>,
}

impl ReloadBroadcaster {
    /// Create a new broadcaster with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Send an outcome to all subscribers
    pub fn send(&self, outcome: ReloadOutcome) {
        let event = outcome.event;
        match self.sender.send(outcome) {
            Ok(count) => {
                crate::debug_event!("broadcast", "sent", "{event} to {count} subscribers");
            }
            Err(_) => {
                // No receivers, this is fine
                crate::debug_event!("broadcast", "dropped", "no subscribers for {event}");
            }
        }
    }

    /// Subscribe to receive outcomes
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadOutcome> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl ReloadSink for ReloadBroadcaster {
    fn notify(&self, outcome: &ReloadOutcome) -> anyhow::Result<()> {
        self.send(outcome.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watcher::sink::OutcomeKind;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_broadcast_to_all_subscribers() {
        let broadcaster = ReloadBroadcaster::new(8);
        let mut first = broadcaster.subscribe();
        let mut second = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 2);

        let outcome =
            ReloadOutcome::applied(OutcomeKind::Delete, "a".to_string(), PathBuf::from("/p/a.yaml"));
        broadcaster.notify(&outcome).unwrap();

        assert_eq!(first.recv().await.unwrap(), outcome);
        assert_eq!(second.recv().await.unwrap(), outcome);
    }

    #[test]
    fn test_send_without_subscribers_is_not_an_error() {
        let broadcaster = ReloadBroadcaster::new(8);
        let outcome =
            ReloadOutcome::applied(OutcomeKind::Create, "a".to_string(), PathBuf::from("/p/a.yaml"));
        assert!(broadcaster.notify(&outcome).is_ok());
    }
}
