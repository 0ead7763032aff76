//! System Events
//!
//! Defines events and channels for inter-task communication.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use sonar_logger::command::Command;
use sonar_logger::ranging::Distance;

/// Multi-producer, single-consumer event channel with capacity of 10
pub static EVENT_CHANNEL: Channel<CriticalSectionRawMutex, Events, 10> = Channel::new();

/// Sends an event to the system channel
pub async fn send(event: Events) {
    EVENT_CHANNEL.sender().send(event).await;
}

/// Receives the next event from the system channel
pub async fn wait() -> Events {
    EVENT_CHANNEL.receiver().receive().await
}

/// System-wide events
#[derive(Debug, Clone)]
pub enum Events {
    /// Filtered reading from the ultrasonic sensor
    DistanceMeasured(Distance),
    /// No echo ended within the ranging timeout
    EchoTimedOut,
    /// Command received on the command topic
    CommandReceived(Command),
    /// WiFi link came up (`true`) or went down
    WifiConnected(bool),
    /// Broker session established (`true`) or lost
    BrokerConnected(bool),
}
