//! Outgoing broker messages
//!
//! Queue between the orchestrator, which decides what to publish, and the MQTT task,
//! which owns the broker session.

use defmt::Format;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::with_timeout;
use sonar_logger::telemetry::Payload;

use crate::system::config::PUBLICATION_QUEUE_TIMEOUT;

static PUBLICATION_CHANNEL: Channel<CriticalSectionRawMutex, Publication, 8> = Channel::new();

/// Topic a publication goes to, relative to the root topic
#[derive(Debug, Clone, Copy, PartialEq, Format)]
pub enum Destination {
    /// The root topic itself: samples, readings and presence
    Data,
    /// `<root>/status`
    Status,
    /// `<root>/csv`
    Csv,
}

#[derive(Debug, Clone)]
pub struct Publication {
    pub destination: Destination,
    pub payload: Payload,
}

/// Queues a message, waiting a bounded time while the queue is full
///
/// Returns `false` if the message was dropped.
pub async fn send(destination: Destination, payload: Payload) -> bool {
    let queued = PUBLICATION_CHANNEL.sender().send(Publication {
        destination,
        payload,
    });
    with_timeout(PUBLICATION_QUEUE_TIMEOUT, queued).await.is_ok()
}

/// Next message to publish
pub async fn wait() -> Publication {
    PUBLICATION_CHANNEL.receiver().receive().await
}
