//! Broker session
//!
//! Keeps an MQTT session to the broker and moves messages both ways.
//!
//! # Session
//! - Waits for an IP configuration, resolves the broker and opens a TCP connection
//! - Connects with MQTT v5, registering an offline presence message as last will
//! - Subscribes to the command topic and announces itself online
//!
//! # Running
//! - Everything is published and subscribed with QoS 0, so the client never waits for
//!   an acknowledgement while a command could be arriving
//! - Commands already in the socket buffer are read between publications
//! - The online presence is repeated when nothing else went out for a while, which
//!   keeps the session alive without a ping round trip
//!
//! Any failure ends the session; a new one is set up after a short delay.

use crate::system::config::{
    COMMAND_SUFFIX, CSV_SUFFIX, MQTT_COMMAND_POLL_INTERVAL, MQTT_HEARTBEAT_INTERVAL, MQTT_HOST,
    MQTT_KEEP_ALIVE_S, MQTT_PORT, MQTT_PUBLISH_TIMEOUT, MQTT_RECONNECT_DELAY,
    MQTT_SOCKET_TIMEOUT, ROOT_TOPIC, STATUS_SUFFIX,
};
use crate::system::event::{self, Events};
use crate::system::publication::{self, Destination};
use defmt::{debug, info, warn, Debug2Format};
use embassy_futures::select::{select, Either};
use embassy_net::dns::{self, DnsQueryType};
use embassy_net::tcp::{ConnectError, TcpSocket};
use embassy_net::Stack;
use embassy_time::{with_timeout, Instant, Timer};
use rust_mqtt::{
    client::client::MqttClient,
    client::client_config::{ClientConfig, MqttVersion::MQTTv5},
    packet::v5::{publish_packet::QualityOfService::QoS0, reason_codes::ReasonCode},
    utils::rng_generator::CountingRng,
};
use sonar_logger::command::Command;
use sonar_logger::keepalive::Heartbeat;
use sonar_logger::telemetry::{self, ClientId, TelemetryError};

/// Concurrent MQTT properties kept by the client
const MAX_PROPERTIES: usize = 5;

/// Size of the MQTT packet buffers; large enough for a full payload plus topic
const PACKET_BUFFER_SIZE: usize = 512;

/// Reasons a broker session ends
#[derive(Debug)]
enum SessionError {
    Dns(dns::Error),
    NoAddress,
    Connect(ConnectError),
    Broker(ReasonCode),
    PublishTimeout,
    Telemetry(TelemetryError),
}

impl From<TelemetryError> for SessionError {
    fn from(e: TelemetryError) -> Self {
        SessionError::Telemetry(e)
    }
}

impl From<ReasonCode> for SessionError {
    fn from(code: ReasonCode) -> Self {
        SessionError::Broker(code)
    }
}

/// MQTT client task
#[embassy_executor::task]
pub async fn mqtt_client(stack: Stack<'static>, client_id: ClientId) {
    loop {
        stack.wait_config_up().await;
        if let Err(e) = run_session(stack, &client_id).await {
            warn!("Broker session ended: {}", Debug2Format(&e));
        }
        event::send(Events::BrokerConnected(false)).await;
        Timer::after(MQTT_RECONNECT_DELAY).await;
    }
}

async fn run_session(stack: Stack<'static>, client_id: &str) -> Result<(), SessionError> {
    let command_topic = telemetry::topic(ROOT_TOPIC, COMMAND_SUFFIX)?;
    let status_topic = telemetry::topic(ROOT_TOPIC, STATUS_SUFFIX)?;
    let csv_topic = telemetry::topic(ROOT_TOPIC, CSV_SUFFIX)?;
    let online = telemetry::presence(client_id, true)?;
    let offline = telemetry::presence(client_id, false)?;

    let mut rx_buffer = [0; 4096];
    let mut tx_buffer = [0; 4096];
    let mut socket = TcpSocket::new(stack, &mut rx_buffer, &mut tx_buffer);
    socket.set_timeout(Some(MQTT_SOCKET_TIMEOUT));

    let address = stack
        .dns_query(MQTT_HOST, DnsQueryType::A)
        .await
        .map_err(SessionError::Dns)?
        .first()
        .copied()
        .ok_or(SessionError::NoAddress)?;
    info!("Connecting to broker {}:{}", MQTT_HOST, MQTT_PORT);
    socket
        .connect((address, MQTT_PORT))
        .await
        .map_err(SessionError::Connect)?;

    let mut config = ClientConfig::<MAX_PROPERTIES, CountingRng>::new(MQTTv5, CountingRng(20000));
    config.add_max_subscribe_qos(QoS0);
    config.add_client_id(client_id);
    config.max_packet_size = PACKET_BUFFER_SIZE as u32;
    config.keep_alive = MQTT_KEEP_ALIVE_S;
    config.add_will(ROOT_TOPIC, offline.as_bytes(), false);

    let mut write_buffer = [0; PACKET_BUFFER_SIZE];
    let mut read_buffer = [0; PACKET_BUFFER_SIZE];
    let mut client = MqttClient::<_, MAX_PROPERTIES, _>::new(
        socket,
        &mut write_buffer,
        PACKET_BUFFER_SIZE,
        &mut read_buffer,
        PACKET_BUFFER_SIZE,
        config,
    );

    client.connect_to_broker().await?;
    client.subscribe_to_topic(&command_topic).await?;
    send_message(&mut client, ROOT_TOPIC, online.as_bytes()).await?;
    info!("Broker session up as {}, commands on {}", client_id, command_topic.as_str());
    event::send(Events::BrokerConnected(true)).await;

    let mut heartbeat = Heartbeat::new(
        MQTT_HEARTBEAT_INTERVAL.as_millis(),
        Instant::now().as_millis(),
    );
    loop {
        while let Some((_, payload)) = client.receive_message_if_ready().await? {
            match Command::parse(payload) {
                Ok(command) => event::send(Events::CommandReceived(command)).await,
                Err(e) => warn!("Ignoring command: {}", e),
            }
        }

        if heartbeat.is_due(Instant::now().as_millis()) {
            debug!("Quiet for a while, repeating presence");
            send_message(&mut client, ROOT_TOPIC, online.as_bytes()).await?;
            heartbeat.sent(Instant::now().as_millis());
        }

        let next = select(
            publication::wait(),
            Timer::after(MQTT_COMMAND_POLL_INTERVAL),
        )
        .await;
        if let Either::First(publication) = next {
            let topic = match publication.destination {
                Destination::Data => ROOT_TOPIC,
                Destination::Status => status_topic.as_str(),
                Destination::Csv => csv_topic.as_str(),
            };
            send_message(&mut client, topic, publication.payload.as_bytes()).await?;
            heartbeat.sent(Instant::now().as_millis());
        }
    }
}

/// Publishes with QoS 0, bounded by the publish timeout
async fn send_message(
    client: &mut MqttClient<'_, TcpSocket<'_>, MAX_PROPERTIES, CountingRng>,
    topic: &str,
    payload: &[u8],
) -> Result<(), SessionError> {
    let sent = client.send_message(topic, payload, QoS0, false);
    match with_timeout(MQTT_PUBLISH_TIMEOUT, sent).await {
        Ok(result) => result.map_err(SessionError::Broker),
        Err(_) => Err(SessionError::PublishTimeout),
    }
}
