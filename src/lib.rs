//! # flutecast - File Delivery over Unidirectional Transport
//!
//! Sender core for FLUTE, layering file delivery on top of ALC/LCT datagram
//! transport, typically over unreliable multicast UDP. Objects (files or
//! in-memory buffers) are described in a File Delivery Table (FDT),
//! partitioned into source blocks, optionally protected with Reed-Solomon
//! parity symbols, and emitted as a stream of ALC/LCT packets that a receiver
//! can reassemble without any back-channel.
//!
//! # RFC
//!
//!| RFC      | Title      | Link       |
//!| ------------- | ------------- | ------------- |
//!| RFC 6726 | FLUTE - File Delivery over Unidirectional Transport | <https://www.rfc-editor.org/rfc/rfc6726.html> |
//!| RFC 5775 | Asynchronous Layered Coding (ALC) Protocol Instantiation | <https://www.rfc-editor.org/rfc/rfc5775.html> |
//!| RFC 5651 | Layered Coding Transport (LCT) Building Block | <https://www.rfc-editor.org/rfc/rfc5651.html> |
//!| RFC 5052 | Forward Error Correction (FEC) Building Block | <https://www.rfc-editor.org/rfc/rfc5052> |
//!| RFC 5510 | Reed-Solomon Forward Error Correction (FEC) Schemes | <https://www.rfc-editor.org/rfc/rfc5510.html> |
//!
//! # Example
//!
//!```rust
//! use flutecast::core::UdpEndpoint;
//! use flutecast::sender::{Cenc, ObjectDesc, Sender};
//! use std::time::SystemTime;
//!
//! let endpoint = UdpEndpoint::new(None, "224.0.0.1".to_owned(), 3400);
//! let mut sender = Sender::new(endpoint, 1, &Default::default(), &Default::default());
//!
//! let obj = ObjectDesc::create_from_buffer(
//!     b"hello world".to_vec(),
//!     "text/plain",
//!     &url::Url::parse("file:///hello.txt").unwrap(),
//!     1,
//!     None,
//!     None,
//!     None,
//!     None,
//!     Cenc::Null,
//!     true,
//!     None,
//!     true,
//! )
//! .unwrap();
//! sender.add_object(0, obj).unwrap();
//!
//! // Always publish after modifying the FDT
//! sender.publish(SystemTime::now()).unwrap();
//!
//! while let Some(pkt) = sender.read(SystemTime::now()) {
//!     // hand pkt to the UDP socket
//!     let _ = pkt;
//! }
//!```

#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![cfg_attr(test, deny(warnings))]

mod common;
mod fec;
mod tools;

/// FLUTE sender, converts objects (files) to ALC/LCT packets
pub mod sender;

///
/// Wire-level building blocks shared with receiver implementations
///
pub mod core {
    pub use crate::common::alc;
    pub use crate::common::fdtinstance;
    pub use crate::common::lct;
    pub use crate::common::oti;
    pub use crate::common::oti::Oti;
    pub use crate::common::partition;
    pub use crate::common::pkt;
    pub use crate::common::udpendpoint::UdpEndpoint;
    pub use crate::common::Profile;
    pub use crate::fec::nocode::NoCodeDecoder;
    pub use crate::fec::rscodec::{RsGalois8Codec, RsGalois8Decoder};
    pub use crate::fec::{DataFecShard, FecDecoder, FecEncoder, FecShard, ShardType};
    pub use crate::tools::uint128::Uint128;
    pub use crate::tools::{ntp_to_system_time, system_time_to_ntp};
}

pub use crate::tools::error;

#[cfg(test)]
mod tests {
    pub fn init() {
        std::env::set_var("RUST_LOG", "debug");
        env_logger::builder().is_test(true).try_init().ok();
    }
}
