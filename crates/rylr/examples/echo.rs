//! Echo every received packet back to the air.
//!
//! Demonstrates mailbox (poll) receive delivery: `recv()` suspends until
//! the next packet arrives, the payload is printed, then retransmitted to
//! the broadcast address. Pair with a second module running the
//! `hello_world` example.
//!
//! # Requirements
//!
//! - An RYLR896/RYLR998 module on a serial port
//! - The port path adjusted for your system
//!
//! # Usage
//!
//! ```sh
//! cargo run -p rylr --example echo
//! ```

use rylr::RylrBuilder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    // Adjust this to match your system's serial port.
    let serial_port = "/dev/ttyUSB0";

    let driver = RylrBuilder::new().serial_port(serial_port).build().await?;
    driver.init().await?;

    println!("Echoing on {}. Ctrl-C to stop.", serial_port);
    loop {
        let data = driver.recv().await?;
        println!("{}", data);
        driver.send(&data).await?;
    }
}
