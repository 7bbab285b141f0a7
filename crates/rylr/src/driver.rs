//! The driver handle: command façade and typed module operations.
//!
//! [`Rylr`] ties the protocol engine to a [`Transport`]. The reader task is
//! the sole reader of the byte stream; any number of tasks may concurrently
//! call command methods, which only ever write and then suspend on their
//! own waiter in the [`Correlator`](crate::correlator::Correlator). The
//! module itself is logically single-command-in-flight and answers in
//! issue order, which is what makes FIFO correlation sound.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::debug;

use rylr_core::config::ModuleConfig;
use rylr_core::error::{Error, Result};
use rylr_core::packet::Packet;
use rylr_core::transport::Transport;

use crate::commands;
use crate::correlator::Correlator;
use crate::params;
use crate::protocol;
use crate::reader::ReaderHandle;
use crate::receive::Delivery;

/// Address that every module in the network receives on.
pub const BROADCAST_ADDRESS: u16 = 0;

/// A connected RYLR module.
///
/// Constructed via [`RylrBuilder`](crate::builder::RylrBuilder). All module
/// communication goes through the [`Transport`] provided at build time.
pub struct Rylr {
    transport: Arc<Mutex<Box<dyn Transport>>>,
    correlator: Arc<Correlator>,
    delivery: Arc<Delivery>,
    config: Mutex<ModuleConfig>,
    command_timeout: Option<Duration>,
    reader: ReaderHandle,
}

impl std::fmt::Debug for Rylr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rylr").finish_non_exhaustive()
    }
}

impl Rylr {
    /// Create a driver from its constituent parts and spawn the reader
    /// task. Called by [`RylrBuilder`](crate::builder::RylrBuilder);
    /// callers should use the builder API instead.
    pub(crate) fn new(
        transport: Box<dyn Transport>,
        config: ModuleConfig,
        command_timeout: Option<Duration>,
        delivery: Delivery,
    ) -> Self {
        let transport = Arc::new(Mutex::new(transport));
        let correlator = Arc::new(Correlator::new());
        let delivery = Arc::new(delivery);
        let reader = crate::reader::spawn_reader_task(
            Arc::clone(&transport),
            Arc::clone(&correlator),
            Arc::clone(&delivery),
        );
        Rylr {
            transport,
            correlator,
            delivery,
            config: Mutex::new(config),
            command_timeout,
            reader,
        }
    }

    /// Send one command and wait for the module's correlated reply line.
    ///
    /// This is the primitive every typed operation is built on. The waiter
    /// is registered before the bytes are written, so a fast reply cannot
    /// arrive ahead of its waiter; if the write fails or the wait times
    /// out, the waiter is unregistered so a later line cannot resolve a
    /// stale slot.
    pub async fn command(&self, cmd: &str) -> Result<String> {
        let bytes = protocol::encode_command(cmd);
        let (id, rx) = self.correlator.register();

        {
            let mut transport = self.transport.lock().await;
            if let Err(e) = transport.send(&bytes).await {
                drop(transport);
                self.correlator.unregister(id);
                return Err(e);
            }
        }

        match self.command_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, rx).await {
                Ok(Ok(text)) => Ok(text),
                Ok(Err(_)) => Err(Error::ConnectionLost),
                Err(_) => {
                    debug!(cmd, "command timed out, unregistering waiter");
                    self.correlator.unregister(id);
                    Err(Error::Timeout)
                }
            },
            None => rx.await.map_err(|_| Error::ConnectionLost),
        }
    }

    /// Push the configured frequency and radio parameters to the module.
    ///
    /// Call once after construction, before exchanging packets.
    pub async fn init(&self) -> Result<()> {
        let (freq_hz, (sf, bw, cr, pl)) = {
            let config = self.config.lock().await;
            (config.frequency_hz, params::parameter_args(&config)?)
        };
        self.command(&commands::cmd_set_band(freq_hz)).await?;
        self.command(&commands::cmd_set_parameter(sf, bw, cr, pl))
            .await?;
        Ok(())
    }

    // -----------------------------------------------------------------
    // Packet transmit / receive
    // -----------------------------------------------------------------

    /// Transmit a payload to the broadcast address.
    pub async fn send(&self, payload: &str) -> Result<()> {
        self.send_to(BROADCAST_ADDRESS, payload).await
    }

    /// Transmit a payload to a specific module address.
    ///
    /// Waits only for the module's command acknowledgment, not for
    /// over-the-air delivery confirmation -- the protocol has none.
    pub async fn send_to(&self, address: u16, payload: &str) -> Result<()> {
        self.command(&commands::cmd_send(address, payload)).await?;
        Ok(())
    }

    /// Wait for the next received packet (mailbox delivery mode only).
    ///
    /// At most one packet is buffered: a packet arriving before the
    /// previous one was retrieved overwrites it.
    pub async fn recv_packet(&self) -> Result<Packet> {
        match &*self.delivery {
            Delivery::Mailbox(mailbox) => Ok(mailbox.recv().await),
            Delivery::Callback(_) => Err(Error::Unsupported(
                "packet polling is unavailable in callback delivery mode".into(),
            )),
        }
    }

    /// Wait for the next received packet and return just its payload.
    pub async fn recv(&self) -> Result<String> {
        Ok(self.recv_packet().await?.payload)
    }

    // -----------------------------------------------------------------
    // Frequency
    // -----------------------------------------------------------------

    /// Query the carrier frequency. Returns megahertz.
    pub async fn get_frequency(&self) -> Result<f64> {
        let reply = self.command(commands::QUERY_BAND).await?;
        let hz = commands::parse_band_reply(&reply)?;
        self.config.lock().await.frequency_hz = hz;
        Ok(hz as f64 / 1_000_000.0)
    }

    /// Set the carrier frequency in megahertz.
    pub async fn set_frequency(&self, mhz: f64) -> Result<()> {
        let hz = (mhz * 1_000_000.0).round() as u64;
        self.command(&commands::cmd_set_band(hz)).await?;
        self.config.lock().await.frequency_hz = hz;
        Ok(())
    }

    // -----------------------------------------------------------------
    // Radio parameters (single atomic wire command for all four)
    // -----------------------------------------------------------------

    /// The requested channel bandwidth in hertz (cached).
    pub async fn get_bandwidth(&self) -> u32 {
        self.config.lock().await.bandwidth_hz
    }

    /// Set the channel bandwidth in hertz.
    ///
    /// The module can only represent the nine bandwidths in
    /// [`params::BANDWIDTHS`]; the request is mapped to the smallest
    /// representable bandwidth that covers it.
    pub async fn set_bandwidth(&self, bandwidth_hz: u32) -> Result<()> {
        self.config.lock().await.bandwidth_hz = bandwidth_hz;
        self.set_parameters().await
    }

    /// The spreading factor (cached).
    pub async fn get_spreading_factor(&self) -> u8 {
        self.config.lock().await.spreading_factor
    }

    /// Set the spreading factor.
    pub async fn set_spreading_factor(&self, sf: u8) -> Result<()> {
        self.config.lock().await.spreading_factor = sf;
        self.set_parameters().await
    }

    /// The coding rate (cached), in 4/x notation.
    pub async fn get_coding_rate(&self) -> u8 {
        self.config.lock().await.coding_rate
    }

    /// Set the coding rate (5..=8, i.e. 4/5 through 4/8).
    pub async fn set_coding_rate(&self, cr: u8) -> Result<()> {
        // Validate before touching the cache so a rejected value cannot
        // poison later parameter commands.
        params::coding_rate_wire(cr)?;
        self.config.lock().await.coding_rate = cr;
        self.set_parameters().await
    }

    /// The preamble length in symbols (cached).
    pub async fn get_preamble_length(&self) -> u8 {
        self.config.lock().await.preamble_length
    }

    /// Set the preamble length in symbols.
    pub async fn set_preamble_length(&self, preamble: u8) -> Result<()> {
        self.config.lock().await.preamble_length = preamble;
        self.set_parameters().await
    }

    /// Recompute the four wire integers from the cached configuration and
    /// send the atomic parameter command.
    async fn set_parameters(&self) -> Result<()> {
        let (sf, bw, cr, pl) = {
            let config = self.config.lock().await;
            params::parameter_args(&config)?
        };
        self.command(&commands::cmd_set_parameter(sf, bw, cr, pl))
            .await?;
        Ok(())
    }

    // -----------------------------------------------------------------
    // Addressing
    // -----------------------------------------------------------------

    /// Query the module's own address.
    pub async fn get_address(&self) -> Result<u16> {
        let reply = self.command(commands::QUERY_ADDRESS).await?;
        let address = commands::parse_address_reply(&reply)?;
        self.config.lock().await.device_address = address;
        Ok(address)
    }

    /// Set the module's own address.
    pub async fn set_address(&self, address: u16) -> Result<()> {
        self.command(&commands::cmd_set_address(address)).await?;
        self.config.lock().await.device_address = address;
        Ok(())
    }

    /// Query the network id.
    pub async fn get_network_id(&self) -> Result<u8> {
        let reply = self.command(commands::QUERY_NETWORK_ID).await?;
        let network_id = commands::parse_network_id_reply(&reply)?;
        self.config.lock().await.network_id = network_id;
        Ok(network_id)
    }

    /// Set the network id.
    pub async fn set_network_id(&self, network_id: u8) -> Result<()> {
        self.command(&commands::cmd_set_network_id(network_id))
            .await?;
        self.config.lock().await.network_id = network_id;
        Ok(())
    }

    // -----------------------------------------------------------------
    // AES key
    // -----------------------------------------------------------------

    /// Query the AES key.
    pub async fn get_aes_key(&self) -> Result<String> {
        let reply = self.command(commands::QUERY_AES_KEY).await?;
        let key = commands::parse_aes_key_reply(&reply)?;
        self.config.lock().await.aes_key = Some(key.clone());
        Ok(key)
    }

    /// Set the AES key (32 hex characters).
    pub async fn set_aes_key(&self, key: &str) -> Result<()> {
        commands::validate_aes_key(key)?;
        self.command(&commands::cmd_set_aes_key(key)).await?;
        self.config.lock().await.aes_key = Some(key.to_string());
        Ok(())
    }

    // -----------------------------------------------------------------
    // Baud rate
    // -----------------------------------------------------------------

    /// Query the UART baud rate.
    pub async fn get_baud_rate(&self) -> Result<u32> {
        let reply = self.command(commands::QUERY_BAUD_RATE).await?;
        let baud = commands::parse_baud_rate_reply(&reply)?;
        self.config.lock().await.baud_rate = baud;
        Ok(baud)
    }

    /// Set the UART baud rate.
    ///
    /// The module switches immediately after acknowledging; the serial port
    /// on the host side must be reopened at the new rate.
    pub async fn set_baud_rate(&self, baud: u32) -> Result<()> {
        self.command(&commands::cmd_set_baud_rate(baud)).await?;
        self.config.lock().await.baud_rate = baud;
        Ok(())
    }

    // -----------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------

    /// A snapshot of the in-memory configuration copy.
    pub async fn config(&self) -> ModuleConfig {
        self.config.lock().await.clone()
    }

    /// Shut down the reader task and close the transport.
    pub async fn close(self) -> Result<()> {
        let Rylr {
            transport, reader, ..
        } = self;
        reader.shutdown().await;
        let mut transport = transport.lock().await;
        transport.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::RylrBuilder;
    use rylr_test_harness::MockTransport;

    const ACK: &[u8] = b"+OK\r\n";

    async fn build(mock: MockTransport) -> Rylr {
        RylrBuilder::new()
            .command_timeout(Duration::from_millis(500))
            .build_with_transport(Box::new(mock))
            .await
            .unwrap()
    }

    // =======================================================================
    // Command primitive
    // =======================================================================

    #[tokio::test]
    async fn command_returns_correlated_reply() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT+ADDRESS?\r\n", b"+ADDRESS=5\r\n");

        let driver = build(mock).await;
        assert_eq!(driver.command("AT+ADDRESS?").await.unwrap(), "+ADDRESS=5");
        driver.close().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_commands_resolve_in_send_order() {
        let mut mock = MockTransport::new();
        // Neither command answers immediately; replies are injected once
        // both waiters are queued.
        mock.expect(b"AT+BAND?\r\n", b"");
        mock.expect(b"AT+IPR?\r\n", b"");
        let injector = mock.injector();

        let driver = Arc::new(build(mock).await);

        let first = {
            let driver = Arc::clone(&driver);
            tokio::spawn(async move { driver.command("AT+BAND?").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let second = {
            let driver = Arc::clone(&driver);
            tokio::spawn(async move { driver.command("AT+IPR?").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        injector.inject(b"+BAND=915000000\r\n+IPR=115200\r\n");

        assert_eq!(first.await.unwrap().unwrap(), "+BAND=915000000");
        assert_eq!(second.await.unwrap().unwrap(), "+IPR=115200");
    }

    #[tokio::test]
    async fn command_times_out_when_module_is_silent() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT+ADDRESS?\r\n", b"");

        let driver = RylrBuilder::new()
            .command_timeout(Duration::from_millis(50))
            .build_with_transport(Box::new(mock))
            .await
            .unwrap();

        let result = driver.command("AT+ADDRESS?").await;
        assert!(matches!(result.unwrap_err(), Error::Timeout));
    }

    #[tokio::test]
    async fn late_reply_after_timeout_cannot_resolve_a_stale_slot() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT+ADDRESS?\r\n", b"");
        mock.expect(b"AT+IPR?\r\n", b"");
        let injector = mock.injector();

        let driver = Arc::new(
            RylrBuilder::new()
                .command_timeout(Duration::from_millis(50))
                .build_with_transport(Box::new(mock))
                .await
                .unwrap(),
        );

        // First command times out; its waiter is unregistered.
        assert!(matches!(
            driver.command("AT+ADDRESS?").await.unwrap_err(),
            Error::Timeout
        ));

        // The late reply lands with no waiter pending and is discarded.
        injector.inject(b"+ADDRESS=5\r\n");
        tokio::time::sleep(Duration::from_millis(50)).await;

        // The next command gets its own reply, not the stale one.
        let second = {
            let driver = Arc::clone(&driver);
            tokio::spawn(async move { driver.command("AT+IPR?").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        injector.inject(b"+IPR=115200\r\n");

        assert_eq!(second.await.unwrap().unwrap(), "+IPR=115200");
    }

    #[tokio::test]
    async fn write_failure_surfaces_and_leaves_no_waiter() {
        // No expectations loaded: the first send fails at the transport.
        let mock = MockTransport::new();
        let driver = build(mock).await;

        let result = driver.command("AT+ADDRESS?").await;
        assert!(matches!(result.unwrap_err(), Error::Protocol(_)));
    }

    // =======================================================================
    // Unsolicited packet handling
    // =======================================================================

    #[tokio::test]
    async fn packet_interleaved_mid_exchange_does_not_steal_the_reply() {
        let mut mock = MockTransport::new();
        mock.expect(
            b"AT+ADDRESS?\r\n",
            b"+RCV=5,2,hi,-20,8\r\n+ADDRESS=5\r\n",
        );

        let driver = build(mock).await;

        assert_eq!(driver.command("AT+ADDRESS?").await.unwrap(), "+ADDRESS=5");
        let packet = driver.recv_packet().await.unwrap();
        assert_eq!(packet.payload, "hi");
        assert_eq!(packet.source_address, 5);
        assert_eq!(packet.rssi, -20);
        assert_eq!(packet.snr, 8);
    }

    #[tokio::test]
    async fn recv_returns_payload_text() {
        let mock = MockTransport::new();
        let injector = mock.injector();
        let driver = build(mock).await;

        injector.inject(b"+RCV=3,12,Hello world!,-99,40\r\n");
        assert_eq!(driver.recv().await.unwrap(), "Hello world!");
    }

    #[tokio::test]
    async fn payload_with_embedded_separator_survives_delivery() {
        let mock = MockTransport::new();
        let injector = mock.injector();
        let driver = build(mock).await;

        injector.inject(b"+RCV=9,7,a,b,c,d,-77,13\r\n");
        let packet = driver.recv_packet().await.unwrap();
        assert_eq!(packet.payload, "a,b,c,d");
        assert_eq!(packet.source_address, 9);
    }

    #[tokio::test]
    async fn mailbox_keeps_only_the_most_recent_packet() {
        let mock = MockTransport::new();
        let injector = mock.injector();
        let driver = build(mock).await;

        // One chunk, two announcements, no poll in between.
        injector.inject(b"+RCV=1,5,first,-40,10\r\n+RCV=1,6,second,-41,9\r\n");
        assert_eq!(driver.recv().await.unwrap(), "second");
    }

    #[tokio::test]
    async fn callback_mode_invokes_handler_and_rejects_polling() {
        let mock = MockTransport::new();
        let injector = mock.injector();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let driver = RylrBuilder::new()
            .on_packet(move |packet: Packet| {
                let _ = tx.send(packet);
            })
            .build_with_transport(Box::new(mock))
            .await
            .unwrap();

        injector.inject(b"+RCV=4,4,ping,-55,7\r\n");
        let packet = rx.recv().await.unwrap();
        assert_eq!(packet.payload, "ping");
        assert_eq!(packet.source_address, 4);

        assert!(matches!(
            driver.recv_packet().await.unwrap_err(),
            Error::Unsupported(_)
        ));
    }

    // =======================================================================
    // Typed operations
    // =======================================================================

    #[tokio::test]
    async fn init_pushes_frequency_then_parameters() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT+BAND=915000000\r\n", ACK);
        mock.expect(b"AT+PARAMETER=10,8,4,4\r\n", ACK);

        let driver = build(mock).await;
        driver.init().await.unwrap();
        driver.close().await.unwrap();
    }

    #[tokio::test]
    async fn frequency_round_trip() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT+BAND=868100000\r\n", ACK);
        mock.expect(b"AT+BAND?\r\n", b"+BAND=868100000\r\n");

        let driver = build(mock).await;
        driver.set_frequency(868.1).await.unwrap();
        assert_eq!(driver.get_frequency().await.unwrap(), 868.1);
        assert_eq!(driver.config().await.frequency_hz, 868_100_000);
    }

    #[tokio::test]
    async fn send_builds_length_prefixed_command() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT+SEND=0,4,ping\r\n", ACK);
        mock.expect(b"AT+SEND=7,3,a,b\r\n", ACK);

        let driver = build(mock).await;
        driver.send("ping").await.unwrap();
        driver.send_to(7, "a,b").await.unwrap();
    }

    #[tokio::test]
    async fn setting_the_same_spreading_factor_twice_is_idempotent_on_the_wire() {
        let mut mock = MockTransport::new();
        // Identical wire bytes both times; a mismatch would make the strict
        // mock fail the exchange.
        mock.expect(b"AT+PARAMETER=10,8,4,4\r\n", ACK);
        mock.expect(b"AT+PARAMETER=10,8,4,4\r\n", ACK);

        let driver = build(mock).await;
        driver.set_spreading_factor(10).await.unwrap();
        driver.set_spreading_factor(10).await.unwrap();
    }

    #[tokio::test]
    async fn bandwidth_request_maps_to_bucket_index() {
        let mut mock = MockTransport::new();
        // 100 kHz is not representable; bucket 7 (125 kHz) covers it.
        mock.expect(b"AT+PARAMETER=10,7,4,4\r\n", ACK);

        let driver = build(mock).await;
        driver.set_bandwidth(100_000).await.unwrap();
        assert_eq!(driver.get_bandwidth().await, 100_000);
    }

    #[tokio::test]
    async fn coding_rate_change_resends_all_four_parameters() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT+PARAMETER=10,8,1,4\r\n", ACK);

        let driver = build(mock).await;
        driver.set_coding_rate(5).await.unwrap();
        assert_eq!(driver.get_coding_rate().await, 5);
    }

    #[tokio::test]
    async fn invalid_coding_rate_is_rejected_before_any_io() {
        let mock = MockTransport::new();
        let driver = build(mock).await;

        let result = driver.set_coding_rate(3).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidParameter(_)));
        // Cache untouched: a later parameter change still encodes cleanly.
        assert_eq!(driver.get_coding_rate().await, 8);
    }

    #[tokio::test]
    async fn address_round_trip() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT+ADDRESS=120\r\n", ACK);
        mock.expect(b"AT+ADDRESS?\r\n", b"+ADDRESS=120\r\n");

        let driver = build(mock).await;
        driver.set_address(120).await.unwrap();
        assert_eq!(driver.get_address().await.unwrap(), 120);
    }

    #[tokio::test]
    async fn network_id_round_trip() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT+NETWORKID=6\r\n", ACK);
        mock.expect(b"AT+NETWORKID?\r\n", b"+NETWORKID=6\r\n");

        let driver = build(mock).await;
        driver.set_network_id(6).await.unwrap();
        assert_eq!(driver.get_network_id().await.unwrap(), 6);
    }

    #[tokio::test]
    async fn aes_key_round_trip() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT+CPIN=00112233445566778899AABBCCDDEEFF\r\n", ACK);
        mock.expect(
            b"AT+CPIN?\r\n",
            b"+CPIN=00112233445566778899AABBCCDDEEFF\r\n",
        );

        let driver = build(mock).await;
        driver
            .set_aes_key("00112233445566778899AABBCCDDEEFF")
            .await
            .unwrap();
        assert_eq!(
            driver.get_aes_key().await.unwrap(),
            "00112233445566778899AABBCCDDEEFF"
        );
    }

    #[tokio::test]
    async fn malformed_aes_key_is_rejected_before_any_io() {
        let mock = MockTransport::new();
        let driver = build(mock).await;

        let result = driver.set_aes_key("not-a-key").await;
        assert!(matches!(result.unwrap_err(), Error::InvalidParameter(_)));
    }

    #[tokio::test]
    async fn baud_rate_round_trip() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT+IPR=9600\r\n", ACK);
        mock.expect(b"AT+IPR?\r\n", b"+IPR=9600\r\n");

        let driver = build(mock).await;
        driver.set_baud_rate(9600).await.unwrap();
        assert_eq!(driver.get_baud_rate().await.unwrap(), 9600);
    }

    #[tokio::test]
    async fn getter_rejects_mismatched_reply_prefix() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT+BAND?\r\n", b"+ADDRESS=5\r\n");

        let driver = build(mock).await;
        assert!(matches!(
            driver.get_frequency().await.unwrap_err(),
            Error::Protocol(_)
        ));
    }
}
