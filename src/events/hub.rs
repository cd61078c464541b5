use serde::Serialize;
use tokio::sync::broadcast;

/// Events published by request handlers to SSE subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum Event {
    /// A new device snapshot replaced the stored one.
    DevicesIngested { device_count: u32, mean_utilization: f64, stddev_utilization: f64 },

    /// A swap plan has been generated and stored.
    PlanReady { plan_id: i64, total_swaps: u32, total_bytes: u64, projected_stddev: f64 },

    /// A generic error event.
    DaemonError { message: String },
}

impl Event {
    /// Returns the SSE event type name for this event variant.
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::DevicesIngested { .. } => "devices_ingested",
            Self::PlanReady { .. } => "plan_ready",
            Self::DaemonError { .. } => "daemon_error",
        }
    }
}

/// The central event broadcast hub.
///
/// Handlers send events here via `publish()`. The SSE endpoint subscribes via
/// `subscribe()` and forwards events to the browser.
#[derive(Debug, Clone)]
pub struct EventHub {
    sender: broadcast::Sender<Event>,
}

impl EventHub {
    /// Create a new EventHub with the given channel capacity.
    ///
    /// Subscribers that fall more than `capacity` events behind receive a
    /// `Lagged` error and miss intermediate events.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Errors only when nobody is subscribed, which callers ignore.
    pub fn publish(&self, event: Event) -> Result<usize, broadcast::error::SendError<Event>> {
        self.sender.send(event)
    }

    /// Subscribe to the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}
