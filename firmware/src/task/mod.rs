pub mod distance_measure;
pub mod mqtt_client;
pub mod network;
pub mod orchestrate;
pub mod wifi_connect;
