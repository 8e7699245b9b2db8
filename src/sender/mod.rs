//!
//! FLUTE Sender, converts objects (files) to ALC/LCT packets
//!

mod block;
mod blockencoder;
mod compress;
mod fdt;
mod filedesc;
mod objectdesc;
mod observer;
#[allow(clippy::module_inception)]
mod sender;
mod sendersession;
mod toiallocator;

pub use crate::common::lct::Cenc;
pub use crate::common::Profile;
pub use objectdesc::CacheControl;
pub use objectdesc::CarouselRepeatMode;
pub use objectdesc::ObjectDataSource;
pub use objectdesc::ObjectDataStream;
pub use objectdesc::ObjectDesc;
pub use objectdesc::TargetAcquisition;
pub use observer::Event;
pub use observer::FileInfo;
pub use observer::Subscriber;
pub use sender::Config;
pub use sender::FdtPublishMode;
pub use sender::PriorityQueue;
pub use sender::Sender;
pub use sender::ToiMaxLength;
pub use toiallocator::Toi;
