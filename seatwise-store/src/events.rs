use seatwise_shared::SeatsBookedEvent;
use tokio::sync::broadcast;
use tracing::debug;

const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out of booking events. Slow subscribers lag and drop
/// the oldest events; publishers never block.
#[derive(Clone)]
pub struct BookingEvents {
    sender: broadcast::Sender<SeatsBookedEvent>,
}

impl BookingEvents {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Returns how many subscribers received the event.
    pub fn publish(&self, event: SeatsBookedEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!("No subscribers for booking event");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SeatsBookedEvent> {
        self.sender.subscribe()
    }
}

impl Default for BookingEvents {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
