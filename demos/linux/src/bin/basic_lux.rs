//! Basic lux reading example
//!
//! This example demonstrates how to:
//! - Open the I2C bus and bind the MAX44009 driver to it
//! - Configure continuous, manual mode with a 100ms integration time
//! - Read the ambient light level every 100ms for one minute

use std::time::{Duration, Instant};

use max44009::{Configuration, IntegrationTime, Max44009, DEFAULT_ADDRESS};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Sensor at 0x4A on /dev/i2c-1
    let mut sensor = Max44009::open("/dev/i2c-1", DEFAULT_ADDRESS)?;

    let config = Configuration {
        continuous: true,
        manual: true,
        current_division: false,
        ..Configuration::default()
    }
    .with_integration_time(IntegrationTime::Ms100);
    let echo = sensor.configure(config)?;
    log::info!("Configured sensor (0x{:02X}), echo 0x{:02X}", config.to_byte(), echo);

    let started = Instant::now();
    while started.elapsed() < Duration::from_secs(60) {
        std::thread::sleep(Duration::from_millis(100));

        match sensor.read_lux() {
            Ok(lux) => println!("{lux:.2} lux"),
            Err(e) => {
                log::error!("Error reading sensor: {e}");
                break;
            }
        }
    }

    // Releases /dev/i2c-1
    drop(sensor.destroy());
    Ok(())
}
