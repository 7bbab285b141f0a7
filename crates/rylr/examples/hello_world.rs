//! Broadcast a greeting once a second.
//!
//! Demonstrates the minimal driver lifecycle: open the port, push the
//! configured radio parameters with `init()`, then transmit.
//!
//! # Requirements
//!
//! - An RYLR896/RYLR998 module on a serial port
//! - The port path adjusted for your system (e.g., `/dev/ttyUSB0` on
//!   Linux, `COM3` on Windows)
//!
//! # Usage
//!
//! ```sh
//! cargo run -p rylr --example hello_world
//! ```

use std::time::Duration;

use rylr::RylrBuilder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    // Adjust this to match your system's serial port.
    let serial_port = "/dev/ttyUSB0";

    let driver = RylrBuilder::new().serial_port(serial_port).build().await?;
    driver.init().await?;

    println!("Broadcasting on {}. Ctrl-C to stop.", serial_port);
    loop {
        driver.send("Hello world!").await?;
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}
