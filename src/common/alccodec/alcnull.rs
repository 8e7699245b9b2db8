use super::AlcCodec;
use crate::common::{alc, lct, oti, pkt};
use crate::tools::error::{FluteError, Result};

/// Fallback codec for codepoints without a known FEC scheme.
///
/// Packing produces no bytes, parsing reports the codepoint as unsupported,
/// so an unknown scheme stays observable instead of tearing the session down.
pub struct AlcNull {}

impl AlcCodec for AlcNull {
    fn add_fti(&self, _data: &mut Vec<u8>, _oti: &oti::Oti, _transfer_length: u64) {}

    fn get_fti(
        &self,
        _data: &[u8],
        lct_header: &lct::LctHeader,
    ) -> Result<Option<(oti::Oti, u64)>> {
        Err(FluteError::UnsupportedFec(lct_header.cp))
    }

    fn add_fec_payload_id(&self, _data: &mut Vec<u8>, _oti: &oti::Oti, _pkt: &pkt::Pkt) {}

    fn get_fec_payload_id(&self, pkt: &alc::AlcPkt, _oti: &oti::Oti) -> Result<alc::PayloadId> {
        Err(FluteError::UnsupportedFec(pkt.lct.cp))
    }

    fn fec_payload_id_block_length(&self) -> usize {
        0
    }
}
