//! The protocol engine: sole reader of the module's byte stream.
//!
//! One tokio task owns the receive side of the transport for the lifetime
//! of the driver. Each complete line is classified exactly once: `+RCV=`
//! lines go to the packet decoder and on to receive delivery, everything
//! else resolves the oldest pending command waiter. The loop never blocks
//! on anything except the byte-stream read itself -- in particular it never
//! waits on a waiter it just resolved.
//!
//! Nothing the module sends is fatal to the loop. Read timeouts mean "no
//! data yet" and are retried; undecodable lines are logged and dropped.
//! Only losing the transport itself ends the task.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};

use rylr_core::error::Error;
use rylr_core::transport::Transport;

use crate::correlator::Correlator;
use crate::protocol::{self, Classified, LineResult};
use crate::receive::Delivery;

/// Maximum line-assembly buffer size before reset. Module lines are tens of
/// bytes; a buffer this large means the stream has desynchronized.
const MAX_BUF: usize = 8192;

/// How long a single transport read waits before releasing the transport
/// lock so command writers can get in.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Idle yield after an empty read, so the loop does not spin against a
/// transport that reports would-block immediately.
const IDLE_YIELD: Duration = Duration::from_millis(10);

/// Handle to the reader task. Stored inside the driver struct.
pub(crate) struct ReaderHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ReaderHandle {
    /// Cancel the reader task and wait for it to exit.
    pub(crate) async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for ReaderHandle {
    fn drop(&mut self) {
        // Dropping the driver without close(): stop the loop; the task
        // itself is detached and exits on the cancellation.
        self.cancel.cancel();
    }
}

/// Spawn the reader task.
///
/// The task shares the transport with command writers through the mutex:
/// it holds the lock only for the duration of one bounded read, so a
/// command write is delayed by at most [`READ_TIMEOUT`].
pub(crate) fn spawn_reader_task(
    transport: Arc<Mutex<Box<dyn Transport>>>,
    correlator: Arc<Correlator>,
    delivery: Arc<Delivery>,
) -> ReaderHandle {
    let cancel = CancellationToken::new();
    let task = tokio::spawn(reader_loop(
        transport,
        correlator,
        delivery,
        cancel.clone(),
    ));
    ReaderHandle {
        cancel,
        task: Some(task),
    }
}

/// The main reader loop. Runs as a spawned tokio task until cancelled or
/// the transport is lost.
async fn reader_loop(
    transport: Arc<Mutex<Box<dyn Transport>>>,
    correlator: Arc<Correlator>,
    delivery: Arc<Delivery>,
    cancel: CancellationToken,
) {
    let mut line_buf: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 256];

    loop {
        let read = tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                debug!("reader task cancelled");
                return;
            }

            read = async {
                let mut transport = transport.lock().await;
                transport.receive(&mut chunk, READ_TIMEOUT).await
            } => read,
        };

        match read {
            Ok(0) => {
                // Empty read: nothing to do this iteration.
                tokio::time::sleep(IDLE_YIELD).await;
            }
            Ok(n) => {
                line_buf.extend_from_slice(&chunk[..n]);
                if line_buf.len() > MAX_BUF {
                    warn!(len = line_buf.len(), "line buffer overflow, resetting");
                    line_buf.clear();
                    continue;
                }
                process_lines(&mut line_buf, &correlator, &delivery);
            }
            Err(Error::Timeout) => {
                // No data yet. Not an error.
                tokio::time::sleep(IDLE_YIELD).await;
            }
            Err(Error::ConnectionLost) | Err(Error::NotConnected) => {
                error!("transport lost, reader task exiting");
                return;
            }
            Err(e) => {
                warn!(error = %e, "transient read error, retrying");
                tokio::time::sleep(IDLE_YIELD).await;
            }
        }
    }
}

/// Drain all complete lines from the buffer, routing each one.
///
/// Incomplete data is left in the buffer for the next read cycle. An
/// unsolicited line never touches the correlator, so a packet announcement
/// interleaved mid-exchange cannot steal a command's reply.
fn process_lines(buf: &mut Vec<u8>, correlator: &Correlator, delivery: &Delivery) {
    loop {
        match protocol::decode_line(buf) {
            LineResult::Line { text, consumed } => {
                buf.drain(..consumed);
                match protocol::classify(&text) {
                    Classified::Receive(body) => match protocol::decode_packet(body) {
                        Ok(packet) => {
                            trace!(
                                source = packet.source_address,
                                rssi = packet.rssi,
                                snr = packet.snr,
                                len = packet.payload.len(),
                                "packet received"
                            );
                            delivery.deliver(packet);
                        }
                        Err(e) => {
                            debug!(error = %e, line = text, "undecodable +RCV line, dropping");
                        }
                    },
                    Classified::Response(line) => {
                        correlator.resolve(line);
                    }
                }
            }
            LineResult::Invalid(consumed) => {
                buf.drain(..consumed);
                debug!("non-UTF-8 line, discarding");
            }
            LineResult::Incomplete => break,
        }
    }
}
