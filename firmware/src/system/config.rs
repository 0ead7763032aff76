//! Firmware configuration
//!
//! Compile-time settings. Network credentials and the broker host come from the
//! build environment (`WIFI_SSID`, `WIFI_PASSWORD`, `MQTT_HOST`), see `build.rs`.

use embassy_time::Duration;

/// Network to join
pub const WIFI_SSID: &str = env!("WIFI_SSID");

/// Empty joins an open network
pub const WIFI_PASSWORD: &str = env!("WIFI_PASSWORD");

/// Pause between failed join attempts
pub const WIFI_RETRY_DELAY: Duration = Duration::from_secs(1);

/// How often the link is checked once joined
pub const WIFI_CHECK_INTERVAL: Duration = Duration::from_secs(10);

/// Broker host name, resolved through DNS
pub const MQTT_HOST: &str = env!("MQTT_HOST");

pub const MQTT_PORT: u16 = 1883;

/// Readings, samples and presence are published here
pub const ROOT_TOPIC: &str = "sensor/distance";

/// `<root>/cmd`, subscribed for remote commands
pub const COMMAND_SUFFIX: &str = "cmd";

/// `<root>/status`, recorder snapshots
pub const STATUS_SUFFIX: &str = "status";

/// `<root>/csv`, exported log lines
pub const CSV_SUFFIX: &str = "csv";

/// Client ids are `<prefix>-<random hex>`
pub const CLIENT_ID_PREFIX: &str = "pico2w";

/// Keep-alive announced to the broker (s)
pub const MQTT_KEEP_ALIVE_S: u16 = 60;

/// Presence is repeated when nothing else went out for this long
pub const MQTT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// How often the socket is checked for incoming commands
pub const MQTT_COMMAND_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Wait before the broker session is set up again after a failure
pub const MQTT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Socket timeout for the broker connection
pub const MQTT_SOCKET_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound for a single publish including its acknowledgement
pub const MQTT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest wait for room in the outgoing queue before a publication is dropped
pub const PUBLICATION_QUEUE_TIMEOUT: Duration = Duration::from_secs(2);

/// Ambient temperature used for the speed of sound (°C)
pub const AMBIENT_TEMPERATURE_C: f32 = 21.5;

/// Size of median filter window
pub const MEDIAN_WINDOW_SIZE: usize = 3;

/// Time between measurements while not recording
pub const IDLE_MEASUREMENT_INTERVAL: Duration = Duration::from_millis(500);

/// Samples kept for export; the oldest is dropped once full
pub const SAMPLE_CAPACITY: usize = 512;
