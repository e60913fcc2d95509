//! Broadcast event bus between the session engine and views.

use super::{NoticeLevel, UiEvent};
use tokio::sync::broadcast;

/// Default channel capacity. `MessageUpdated` carries the full text, so a
/// lagging view only skips intermediate frames.
const DEFAULT_CAPACITY: usize = 256;

/// Sender half of the event bus.
#[derive(Clone)]
pub struct EventSender {
    tx: broadcast::Sender<UiEvent>,
}

impl EventSender {
    /// Send an event. Fails when nobody is subscribed.
    pub fn send(&self, event: UiEvent) -> Result<(), BusError> {
        self.tx.send(event).map_err(|_| BusError::Closed)?;
        Ok(())
    }

    /// Send an event, ignoring the absence of subscribers.
    pub fn publish(&self, event: UiEvent) {
        let _ = self.send(event);
    }

    /// Publish a free-form status line.
    pub fn notice(&self, level: NoticeLevel, text: impl Into<String>) {
        self.publish(UiEvent::notice(level, text));
    }
}

/// Receiver half of the event bus.
pub struct EventReceiver {
    rx: broadcast::Receiver<UiEvent>,
}

impl EventReceiver {
    /// Receive the next event.
    pub async fn recv(&mut self) -> Result<UiEvent, BusError> {
        self.rx.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => BusError::Closed,
            broadcast::error::RecvError::Lagged(n) => BusError::Lagged(n),
        })
    }

    /// Try to receive an event without waiting.
    pub fn try_recv(&mut self) -> Result<Option<UiEvent>, BusError> {
        match self.rx.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(broadcast::error::TryRecvError::Empty) => Ok(None),
            Err(broadcast::error::TryRecvError::Closed) => Err(BusError::Closed),
            Err(broadcast::error::TryRecvError::Lagged(n)) => Err(BusError::Lagged(n)),
        }
    }

    /// Drain every event that is already queued.
    pub fn drain(&mut self) -> Vec<UiEvent> {
        let mut events = Vec::new();
        loop {
            match self.try_recv() {
                Ok(Some(event)) => events.push(event),
                Ok(None) | Err(BusError::Closed) => break,
                Err(BusError::Lagged(_)) => continue,
            }
        }
        events
    }
}

/// Event bus for engine-view communication.
pub struct EventBus {
    tx: broadcast::Sender<UiEvent>,
}

impl EventBus {
    /// Create a new event bus.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Get a sender.
    pub fn sender(&self) -> EventSender {
        EventSender {
            tx: self.tx.clone(),
        }
    }

    /// Subscribe to events.
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Bus errors.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("Channel closed")]
    Closed,
    #[error("Lagged behind by {0} events")]
    Lagged(u64),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MessageRole, StreamOutcome};

    fn update(generation: u64, text: &str) -> UiEvent {
        UiEvent::MessageUpdated {
            generation,
            index: 1,
            text: text.into(),
        }
    }

    // =========================================================================
    // Delivery Tests
    // =========================================================================

    #[test]
    fn test_send_without_subscribers_is_closed() {
        let bus = EventBus::new();
        let result = bus.sender().send(UiEvent::SessionReset { generation: 1 });
        assert!(matches!(result, Err(BusError::Closed)));
        // publish swallows the same condition
        bus.sender().publish(UiEvent::SessionReset { generation: 2 });
    }

    #[tokio::test]
    async fn test_stream_events_arrive_in_order() {
        let bus = EventBus::new();
        let mut views = bus.subscribe();
        let engine = bus.sender();

        engine.publish(UiEvent::MessageStarted {
            generation: 1,
            index: 1,
            role: MessageRole::Assistant,
        });
        for text in ["Hel", "Hello, ", "Hello, world"] {
            engine.publish(update(1, text));
        }
        engine.publish(UiEvent::StreamFinished {
            generation: 1,
            index: 1,
            outcome: StreamOutcome::Completed,
        });

        assert!(matches!(
            views.recv().await.unwrap(),
            UiEvent::MessageStarted { .. }
        ));
        assert_eq!(views.recv().await.unwrap(), update(1, "Hel"));
        assert_eq!(views.recv().await.unwrap(), update(1, "Hello, "));
        assert_eq!(views.recv().await.unwrap(), update(1, "Hello, world"));
        assert!(matches!(
            views.recv().await.unwrap(),
            UiEvent::StreamFinished {
                outcome: StreamOutcome::Completed,
                ..
            }
        ));
        assert_eq!(views.try_recv().unwrap(), None);
    }

    #[test]
    fn test_every_view_sees_every_event() {
        let bus = EventBus::new();
        let mut terminal = bus.subscribe();
        let mut export = bus.subscribe();
        let first = bus.sender();
        let second = first.clone();

        first.notice(NoticeLevel::Info, "Loaded paper.pdf");
        second.publish(UiEvent::AxiomsReady {
            generation: 1,
            count: 6,
        });

        for view in [&mut terminal, &mut export] {
            assert_eq!(view.drain().len(), 2);
        }
    }

    // =========================================================================
    // Lag Tests
    // =========================================================================

    #[test]
    fn test_lagging_view_keeps_latest_frames() {
        let bus = EventBus::with_capacity(2);
        let mut view = bus.subscribe();
        let engine = bus.sender();

        for text in ["a", "ab", "abc", "abcd"] {
            engine.publish(update(1, text));
        }

        assert!(matches!(view.try_recv(), Err(BusError::Lagged(2))));
        assert_eq!(view.drain(), vec![update(1, "abc"), update(1, "abcd")]);
    }

    #[test]
    fn test_drain_skips_lag_transparently() {
        let bus = EventBus::with_capacity(1);
        let mut view = bus.subscribe();
        let engine = bus.sender();

        engine.publish(update(3, "old"));
        engine.publish(update(3, "new"));

        assert_eq!(view.drain(), vec![update(3, "new")]);
    }

    #[tokio::test]
    async fn test_recv_reports_closed_after_bus_dropped() {
        let bus = EventBus::new();
        let mut view = bus.subscribe();
        let engine = bus.sender();
        engine.notice(NoticeLevel::Warning, "last");
        drop(engine);
        drop(bus);

        assert_eq!(
            view.recv().await.unwrap(),
            UiEvent::notice(NoticeLevel::Warning, "last")
        );
        assert!(matches!(view.recv().await, Err(BusError::Closed)));
    }
}
