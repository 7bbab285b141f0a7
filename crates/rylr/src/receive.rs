//! Receive delivery: how decoded packets reach the application.
//!
//! Exactly one delivery strategy is selected at construction time:
//!
//! - **Mailbox** (default): single-slot storage polled via
//!   [`Rylr::recv_packet`](crate::driver::Rylr::recv_packet). A new packet
//!   overwrites an undelivered one -- at most one packet is ever buffered.
//!   This lossiness is inherited module behavior, not an accident; callers
//!   that must not drop packets should use callback delivery and queue in
//!   the handler.
//! - **Callback**: a [`PacketHandler`] invoked inline by the reader task for
//!   every decoded packet.

use std::sync::Mutex;

use tokio::sync::Notify;
use tracing::debug;

use rylr_core::packet::Packet;

/// Callback trait for packet delivery.
///
/// The reader task calls [`PacketHandler::on_packet`] for every decoded
/// `+RCV=` line. The handler runs on the reader task, so it should hand the
/// packet off quickly (e.g. into a channel) rather than doing slow work
/// inline.
pub trait PacketHandler: Send + Sync + 'static {
    fn on_packet(&self, packet: Packet);
}

impl<F> PacketHandler for F
where
    F: Fn(Packet) + Send + Sync + 'static,
{
    fn on_packet(&self, packet: Packet) {
        self(packet)
    }
}

/// Single-slot mailbox holding the most recent undelivered packet.
pub(crate) struct Mailbox {
    slot: Mutex<Option<Packet>>,
    notify: Notify,
}

impl Mailbox {
    pub(crate) fn new() -> Self {
        Mailbox {
            slot: Mutex::new(None),
            notify: Notify::new(),
        }
    }

    /// Store a packet, overwriting any undelivered one.
    pub(crate) fn deliver(&self, packet: Packet) {
        {
            let mut slot = self.slot.lock().unwrap();
            if slot.is_some() {
                debug!("overwriting undelivered packet in mailbox");
            }
            *slot = Some(packet);
        }
        self.notify.notify_one();
    }

    /// Take the buffered packet, waiting until one arrives.
    pub(crate) async fn recv(&self) -> Packet {
        loop {
            // Arm the notification before checking the slot so a delivery
            // between the check and the await is not missed.
            let notified = self.notify.notified();
            if let Some(packet) = self.slot.lock().unwrap().take() {
                return packet;
            }
            notified.await;
        }
    }

    /// Take the buffered packet if one is present, without waiting.
    #[cfg(test)]
    pub(crate) fn try_recv(&self) -> Option<Packet> {
        self.slot.lock().unwrap().take()
    }
}

/// The delivery strategy selected at construction.
pub(crate) enum Delivery {
    Mailbox(Mailbox),
    Callback(Box<dyn PacketHandler>),
}

impl Delivery {
    /// Route one decoded packet to the active strategy.
    pub(crate) fn deliver(&self, packet: Packet) {
        match self {
            Delivery::Mailbox(mailbox) => mailbox.deliver(packet),
            Delivery::Callback(handler) => handler.on_packet(packet),
        }
    }
}
