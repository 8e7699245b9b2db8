use super::lct;
use crate::tools::uint128::Uint128;

/// Encoding symbol with its transfer metadata, ready to be packed into an
/// ALC/LCT datagram.
#[derive(Debug)]
pub struct Pkt {
    /// Encoding symbol bytes
    pub payload: Vec<u8>,
    /// Transfer length of the object, after CENC
    pub transfer_length: u64,
    /// Encoding Symbol ID inside the block
    pub esi: u32,
    /// Source Block Number inside the object
    pub sbn: u32,
    /// Object this symbol belongs to
    pub toi: Uint128,
    /// FDT Instance ID, only for FDT transfers
    pub fdt_id: Option<u32>,
    /// Content encoding applied to the object
    pub cenc: lct::Cenc,
    /// Signal the content encoding inside the packet
    pub inband_cenc: bool,
    /// Last packet of the object transmission
    pub close_object: bool,
    /// Number of source symbols of the block this symbol belongs to
    pub source_block_length: u32,
    /// Insert the Sender Current Time extension
    pub sender_current_time: bool,
}
