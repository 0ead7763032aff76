//! Network bring-up
//!
//! Powers up the CYW43 wireless chip of the Pico 2 W, loads its firmware and starts the
//! IP stack with DHCP. The chip and stack runners get a task each.

use crate::system::resources::{Irqs, WifiResources};
use cyw43::{Control, NetDriver, PowerManagementMode};
use cyw43_firmware::{CYW43_43439A0 as FIRMWARE, CYW43_43439A0_CLM as CLM};
use cyw43_pio::{PioSpi, RM2_CLOCK_DIVIDER};
use defmt::info;
use embassy_executor::Spawner;
use embassy_net::{Config, Stack, StackResources};
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::{DMA_CH0, PIO0};
use embassy_rp::pio::Pio;
use static_cell::StaticCell;

/// Sockets: broker TCP connection, DNS and DHCP plus headroom
const SOCKET_COUNT: usize = 5;

#[embassy_executor::task]
async fn cyw43_task(
    runner: cyw43::Runner<'static, Output<'static>, PioSpi<'static, PIO0, 0, DMA_CH0>>,
) -> ! {
    runner.run().await
}

#[embassy_executor::task]
async fn net_task(mut runner: embassy_net::Runner<'static, NetDriver<'static>>) -> ! {
    runner.run().await
}

/// Starts the wireless chip and the network stack
///
/// `seed` randomizes the stack's ports and sequence numbers.
pub async fn init(spawner: Spawner, r: WifiResources, seed: u64) -> (Stack<'static>, Control<'static>) {
    let pwr = Output::new(r.pwr_pin, Level::Low);
    let cs = Output::new(r.cs_pin, Level::High);
    let mut pio = Pio::new(r.pio, Irqs);
    // the RP2350 runs the chip's SPI with the RM2 divider
    let spi = PioSpi::new(
        &mut pio.common,
        pio.sm0,
        RM2_CLOCK_DIVIDER,
        pio.irq0,
        cs,
        r.dio_pin,
        r.clk_pin,
        r.dma,
    );

    static STATE: StaticCell<cyw43::State> = StaticCell::new();
    let state = STATE.init(cyw43::State::new());
    let (net_device, mut control, runner) = cyw43::new(state, pwr, spi, FIRMWARE).await;
    spawner.spawn(cyw43_task(runner)).unwrap();

    control.init(CLM).await;
    control
        .set_power_management(PowerManagementMode::PowerSave)
        .await;
    info!("Wireless chip ready");

    static RESOURCES: StaticCell<StackResources<SOCKET_COUNT>> = StaticCell::new();
    let (stack, runner) = embassy_net::new(
        net_device,
        Config::dhcpv4(Default::default()),
        RESOURCES.init(StackResources::new()),
        seed,
    );
    spawner.spawn(net_task(runner)).unwrap();

    (stack, control)
}
