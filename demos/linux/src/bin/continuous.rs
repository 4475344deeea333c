//! Continuous reading example
//!
//! This example demonstrates how to:
//! - Share the sensor between a polling thread and the main thread
//! - Consume lux values from the polling channel
//! - Restart polling with a read interval and an error callback
//! - Halt polling and close the handle

use std::time::Duration;

use linux_embedded_hal::I2CError;
use max44009::{Configuration, Max44009Handle, PollOptions, DEFAULT_ADDRESS};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();

    let handle = Max44009Handle::open("/dev/i2c-1", DEFAULT_ADDRESS)?;
    handle.configure(Configuration {
        continuous: true,
        ..Configuration::default()
    })?;

    println!("Reading as fast as the consumer keeps up...");
    let readings = handle.start();
    for (i, lux) in readings.iter().take(20).enumerate() {
        println!("#{i:02}: {lux:10.2} lux");
    }

    // Starting again replaces the first loop; `readings` is now disconnected
    println!("Reading every 500ms...");
    let options = PollOptions::<I2CError>::default()
        .with_interval(Duration::from_millis(500))
        .on_error(|e| eprintln!("Polling stopped: {e}"));
    let readings = handle.start_with(options);
    for lux in readings.iter().take(10) {
        println!("{lux:10.2} lux");
    }

    handle.halt();
    println!("Polling halted, one-off read: {:.2} lux", handle.read_lux()?);

    handle.close()?;
    Ok(())
}
