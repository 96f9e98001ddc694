use crate::app::BootstrapperState;
use crate::error::EventBusError;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Signals raised by the bootstrapper while it runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BootstrapperEvent {
    /// The lifecycle state changed; carries the new state
    StateChanged { state: BootstrapperState },
    /// A transition is still running and asks the host for more time
    AdditionalTimeRequested { duration: Duration },
}

impl BootstrapperEvent {
    pub fn description(&self) -> String {
        match self {
            BootstrapperEvent::StateChanged { state } => format!("State changed to {}", state),
            BootstrapperEvent::AdditionalTimeRequested { duration } => {
                format!("Additional time requested: {:?}", duration)
            }
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            BootstrapperEvent::StateChanged { .. } => "state_changed",
            BootstrapperEvent::AdditionalTimeRequested { .. } => "additional_time_requested",
        }
    }
}

/// Broadcast channel for [`BootstrapperEvent`]s
#[derive(Debug)]
pub struct EventBus {
    sender: broadcast::Sender<BootstrapperEvent>,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<BootstrapperEvent> {
        self.sender.subscribe()
    }

    /// Publish an event, returning the number of subscribers that will see it
    pub fn publish(&self, event: BootstrapperEvent) -> usize {
        debug!("Publishing event: {}", event.description());
        // Nobody listening is not an error for a signal
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Named receiver that tolerates falling behind
pub struct EventReceiver {
    receiver: broadcast::Receiver<BootstrapperEvent>,
    name: String,
}

impl EventReceiver {
    pub fn new<S: Into<String>>(receiver: broadcast::Receiver<BootstrapperEvent>, name: S) -> Self {
        Self {
            receiver,
            name: name.into(),
        }
    }

    /// Receive the next event, skipping over anything dropped while lagging
    pub async fn recv(&mut self) -> Result<BootstrapperEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Ok(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<Option<BootstrapperEvent>, EventBusError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Ok(Some(event)),
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                }
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }

    /// Everything currently buffered, oldest first
    pub fn drain(&mut self) -> Vec<BootstrapperEvent> {
        let mut events = Vec::new();
        while let Ok(Some(event)) = self.try_recv() {
            events.push(event);
        }
        events
    }
}
