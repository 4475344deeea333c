//! Threshold interrupt example
//!
//! This example demonstrates how to:
//! - Convert a lux window into threshold register values
//! - Configure the threshold timer and enable the interrupt
//! - Poll the interrupt status register and report crossings

use std::time::Duration;

use max44009::codec::{lux_to_threshold, threshold_to_lux};
use max44009::{Configuration, Max44009, ThresholdKind, DEFAULT_ADDRESS};

const LOW_LUX: f64 = 50.0;
const HIGH_LUX: f64 = 500.0;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut sensor = Max44009::open("/dev/i2c-1", DEFAULT_ADDRESS)?;
    sensor.configure(Configuration {
        continuous: true,
        ..Configuration::default()
    })?;

    let upper =
        lux_to_threshold(HIGH_LUX, ThresholdKind::Upper).ok_or("upper threshold out of range")?;
    let lower =
        lux_to_threshold(LOW_LUX, ThresholdKind::Lower).ok_or("lower threshold out of range")?;
    sensor.set_upper_threshold(upper)?;
    sensor.set_lower_threshold(lower)?;
    // Window must be left for 500ms before INT asserts
    sensor.set_threshold_timer(5)?;
    sensor.set_interrupt_enabled(true)?;

    println!(
        "Interrupt window: {:.2} .. {:.2} lux",
        threshold_to_lux(lower, ThresholdKind::Lower),
        threshold_to_lux(upper, ThresholdKind::Upper)
    );
    println!("Press Ctrl+C to exit\n");

    loop {
        std::thread::sleep(Duration::from_millis(200));

        // Reading the status clears it
        if sensor.interrupt_status()? {
            let lux = sensor.read_lux()?;
            let side = if lux > HIGH_LUX { "above" } else { "below" };
            println!("Light level {side} window: {lux:.2} lux");
        }
    }
}
