//! Data logger firmware entry point
//!
//! Initializes the board, brings up the network and spawns the measurement,
//! connection and orchestration tasks.

#![no_std]
#![no_main]

use crate::task::{
    distance_measure::distance_measure, mqtt_client::mqtt_client, network,
    orchestrate::orchestrate, wifi_connect::wifi_connect,
};
use defmt::info;
use embassy_executor::Spawner;
use embassy_rp::block::ImageDef;
use embassy_rp::clocks::RoscRng;
use embassy_rp::config::Config;
use nanorand::{Rng, WyRand};
use sonar_logger::telemetry;
use system::config::CLIENT_ID_PREFIX;
use system::resources::{AssignedResources, DistanceSensorResources, WifiResources};
use {defmt_rtt as _, panic_probe as _};

/// Firmware image type for bootloader
#[link_section = ".start_block"]
#[used]
pub static IMAGE_DEF: ImageDef = ImageDef::secure_exe();

/// System core modules
mod system;
/// Task implementations
mod task;

/// Firmware entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Config::default());

    // Split the resources into separate groups for each task
    let r = split_resources!(p);

    // Ring oscillator noise seeds the generator for the network stack and client id
    let mut rosc = RoscRng;
    let mut rng = WyRand::new_seed(rosc.next_u64());
    let client_id = telemetry::client_id(CLIENT_ID_PREFIX, rng.generate::<u16>()).unwrap();
    info!("Starting as {}", client_id.as_str());

    let (stack, control) = network::init(spawner, r.wifi, rng.generate::<u64>()).await;

    // Orchestrator first so no event is waiting on an absent consumer
    spawner.spawn(orchestrate(client_id.clone())).unwrap();
    spawner.spawn(distance_measure(r.distance_sensor)).unwrap();
    spawner.spawn(wifi_connect(control, stack)).unwrap();
    spawner.spawn(mqtt_client(stack, client_id)).unwrap();
}
