//! WiFi connection handling
//!
//! Joins the configured network and keeps the link up.
//!
//! # Behavior
//! - Join attempts repeat until one succeeds
//! - The link is checked periodically; when it is down the network is left and
//!   joined again
//! - Link changes are reported to the orchestrator
//! - The on-board LED is wired to the wireless chip, so LED requests are applied here

use crate::system::config::{WIFI_CHECK_INTERVAL, WIFI_PASSWORD, WIFI_RETRY_DELAY, WIFI_SSID};
use crate::system::event::{self, Events};
use crate::system::indicator;
use cyw43::{Control, JoinOptions};
use defmt::{info, warn, Debug2Format};
use embassy_futures::select::{select, Either};
use embassy_net::Stack;
use embassy_time::Timer;

/// GPIO of the wireless chip driving the on-board LED
const LED_GPIO: u8 = 0;

/// WiFi supervision task
#[embassy_executor::task]
pub async fn wifi_connect(mut control: Control<'static>, stack: Stack<'static>) {
    loop {
        join(&mut control).await;
        event::send(Events::WifiConnected(true)).await;

        loop {
            match select(Timer::after(WIFI_CHECK_INTERVAL), indicator::wait()).await {
                Either::First(_) => {
                    if !stack.is_link_up() {
                        warn!("WiFi link lost, reconnecting");
                        event::send(Events::WifiConnected(false)).await;
                        control.leave().await;
                        break;
                    }
                }
                Either::Second(on) => {
                    control.gpio_set(LED_GPIO, on).await;
                }
            }
        }
    }
}

async fn join(control: &mut Control<'static>) {
    info!("Joining WiFi network {}", WIFI_SSID);
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        let options = if WIFI_PASSWORD.is_empty() {
            JoinOptions::new_open()
        } else {
            JoinOptions::new(WIFI_PASSWORD.as_bytes())
        };
        match control.join(WIFI_SSID, options).await {
            Ok(()) => {
                info!("Joined {} after {} attempt(s)", WIFI_SSID, attempt);
                return;
            }
            Err(e) => {
                warn!("WiFi join attempt {} failed: {}", attempt, Debug2Format(&e));
                Timer::after(WIFI_RETRY_DELAY).await;
            }
        }
    }
}
