use super::{
    alc::{AlcPkt, PayloadId},
    lct, oti, pkt,
};
use crate::tools::error::Result;

mod alcnocode;
mod alcnull;
mod alcrs28;
mod alcrs28underspecified;
mod alcrs2m;

/// Per-FEC-scheme packing of the FTI extension and the FEC Payload ID.
pub trait AlcCodec {
    fn add_fti(&self, data: &mut Vec<u8>, oti: &oti::Oti, transfer_length: u64);
    fn get_fti(&self, data: &[u8], lct_header: &lct::LctHeader) -> Result<Option<(oti::Oti, u64)>>;
    fn add_fec_payload_id(&self, data: &mut Vec<u8>, oti: &oti::Oti, pkt: &pkt::Pkt);
    fn get_fec_payload_id(&self, pkt: &AlcPkt, oti: &oti::Oti) -> Result<PayloadId>;
    fn fec_payload_id_block_length(&self) -> usize;
}

const NOCODE: alcnocode::AlcNoCode = alcnocode::AlcNoCode {};
const RS28: alcrs28::AlcRs28 = alcrs28::AlcRs28 {};
const RS28_UNDER_SPECIFIED: alcrs28underspecified::AlcRs28UnderSpecified =
    alcrs28underspecified::AlcRs28UnderSpecified {};
const RS2M: alcrs2m::AlcRs2m = alcrs2m::AlcRs2m {};
const NULL: alcnull::AlcNull = alcnull::AlcNull {};

impl dyn AlcCodec {
    /// Codec for a known FEC scheme.
    pub fn instance(fec: oti::FecEncodingId) -> &'static dyn AlcCodec {
        match fec {
            oti::FecEncodingId::NoCode => &NOCODE,
            oti::FecEncodingId::ReedSolomonGf2m => &RS2M,
            oti::FecEncodingId::ReedSolomonGf28 => &RS28,
            oti::FecEncodingId::ReedSolomonGf28UnderSpecified => &RS28_UNDER_SPECIFIED,
        }
    }

    /// Codec for an LCT codepoint, falling back to a codec that rejects
    /// every parse when the codepoint maps to no known scheme.
    pub fn instance_for_codepoint(cp: u8) -> &'static dyn AlcCodec {
        match oti::FecEncodingId::try_from(cp) {
            Ok(fec) => Self::instance(fec),
            Err(_) => &NULL,
        }
    }
}
