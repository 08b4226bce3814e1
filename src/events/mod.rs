use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted by the storefront services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Cart events
    CartUpdated(Uuid),
    CartCleared(Uuid),

    // Checkout events
    CheckoutOpened {
        checkout_id: Uuid,
        user_id: Uuid,
    },
    CheckoutPaid {
        checkout_id: Uuid,
        transaction_id: Option<String>,
    },
    CheckoutFinalized {
        checkout_id: Uuid,
        order_id: Uuid,
    },

    // Order events
    OrderCreated(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event, surfacing channel failure to the caller.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event; a full or closed channel is logged, never an error on
    /// the request path.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(err) = self.send(event).await {
            warn!("Dropping event: {}", err);
        }
    }
}

/// Drains the event channel, logging each event. Runs until every sender is
/// dropped.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        info!(?event, "domain event");
    }
    info!("event channel closed, stopping event processor");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let cart_id = Uuid::new_v4();

        sender.send(Event::CartUpdated(cart_id)).await.unwrap();

        match rx.recv().await {
            Some(Event::CartUpdated(id)) => assert_eq!(id, cart_id),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_or_log_swallows_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        // Must not panic or error
        sender.send_or_log(Event::OrderCreated(Uuid::new_v4())).await;
    }
}
