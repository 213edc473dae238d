//! # navlink: telemetry protocol stack for GNSS/IMU data loggers
//!
//! ## Purpose
//!
//! Frames, encodes, decodes and routes the binary messages exchanged with a
//! GPS/IMU data logger over a byte-oriented wireless transport. The crate is
//! the protocol engine only: the surrounding application owns the radio
//! (scanning, pairing, characteristic discovery), session persistence and
//! all presentation, and talks to this core exclusively through
//! [`DeviceClient`] and the transport seam.
//!
//! ## Architecture
//!
//! ```text
//! DeviceClient → Message Catalog (encode) → Transport (send)
//!                                               ↓ [device]
//! DeviceClient ← Router (correlate) ← Packet Codec ← Transport (notify)
//!      or persistent Subscriber ↲
//! ```
//!
//! - [`packet`]: UBX-style framing with sync bytes, a length-prefixed
//!   payload and a rolling-sum checksum
//! - [`message`]: typed catalog keyed by `(class, id)`, covering telemetry
//!   records, recording/GNSS configuration, status, acknowledgments
//! - [`transport`]: the consumed port, sending frames and receiving the
//!   inbound notification stream
//! - [`router`]: demultiplexes inbound packets to one-shot, deadline-bound
//!   waiters or persistent subscriptions
//! - [`client`]: one typed method per device operation
//! - [`error`]: failure taxonomy with recoverability and retry strategy
//!
//! ## Wire format
//!
//! ```text
//! [0xB5][0x62][class][id][length u16 LE][payload][ckA][ckB]
//! ```
//!
//! All catalog messages use class `0xFF`. Multi-byte integers are
//! little-endian. Payload values are raw wire units; unit conversion is the
//! caller's concern.
//!
//! ## Example
//!
//! ```no_run
//! use navlink::{DeviceClient, Transport};
//! use std::sync::Arc;
//!
//! async fn run(transport: Arc<dyn Transport>) -> navlink::Result<()> {
//!     let client = DeviceClient::new(transport);
//!
//!     let _live = client.on_live_data(|record| {
//!         println!("speed: {} mm/s, sats: {}", record.speed, record.num_sv);
//!     });
//!
//!     let mut config = client.read_recording_config().await?;
//!     config.enabled = true;
//!     client.set_recording_config(&config).await?;
//!     client.start_recording().await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod message;
pub mod packet;
pub mod router;
pub mod transport;

pub use client::DeviceClient;
pub use error::{Error, Result, RetryStrategy, MAX_TIMEOUT_ATTEMPTS};
pub use message::config::{
    DataRate, GnssConfig, PlatformModel, RecordingConfig, RecordingFlags,
    GNSS_CONFIG_LEN, MAX_HORIZONTAL_ACCURACY_M, RECORDING_CONFIG_LEN,
};
pub use message::status::{
    Acknowledgement, DownloadStart, RecordingState, RecordingStatus, RECORDING_STATUS_LEN,
};
pub use message::telemetry::{BatteryReading, TelemetryRecord, TELEMETRY_RECORD_LEN};
pub use message::{decode_payload, InboundMessage, MessageId, MessageKey, DEVICE_CLASS};
pub use packet::{checksum, decode, encode, Packet, FRAME_OVERHEAD, MAX_PAYLOAD_LEN, SYNC1, SYNC2};
pub use router::{
    PendingReply, Router, RouterStats, SubscriptionHandle, DEFAULT_REQUEST_TIMEOUT,
};
pub use transport::Transport;
