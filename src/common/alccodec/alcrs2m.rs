use super::AlcCodec;
use crate::common::{alc, lct, oti, pkt};
use crate::tools::error::{FluteError, Result};

pub struct AlcRs2m {}

fn field_size(oti: &oti::Oti) -> u8 {
    oti.scheme_specific.as_ref().map(|s| s.m).unwrap_or(8)
}

impl AlcCodec for AlcRs2m {
    fn add_fti(&self, data: &mut Vec<u8>, oti: &oti::Oti, transfer_length: u64) {
        /*  0                   1                   2                   3
         0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
        +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
        |   HET = 64    |    HEL = 4    |                               |
        +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+                               +
        |                      Transfer Length (L)                      |
        +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
        |       m       |       G       |   Encoding Symbol Length (E)  |
        +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
        |  Max Source Block Length (B)  |  Max Nb Enc. Symbols (max_n)  |
        +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+*/

        let scheme = oti.scheme_specific.unwrap_or_default();
        let ext_header_l: u64 =
            (lct::Ext::Fti as u64) << 56 | 4u64 << 48 | transfer_length & 0xFFFF_FFFF_FFFF;

        let b = oti.maximum_source_block_length as u16;
        let max_n = (oti.max_number_of_parity_symbols + oti.maximum_source_block_length) as u16;

        data.extend(ext_header_l.to_be_bytes());
        data.push(scheme.m);
        data.push(scheme.g);
        data.extend(oti.encoding_symbol_length.to_be_bytes());
        data.extend(b.to_be_bytes());
        data.extend(max_n.to_be_bytes());
        lct::inc_hdr_len(data, 4);
    }

    fn get_fti(&self, data: &[u8], lct_header: &lct::LctHeader) -> Result<Option<(oti::Oti, u64)>> {
        let fti = match lct::get_ext(data, lct_header, lct::Ext::Fti as u8)? {
            Some(fti) => fti,
            None => return Ok(None),
        };

        if fti.len() != 16 {
            return Err(FluteError::malformed("Wrong FTI extension size"));
        }

        debug_assert!(fti[0] == lct::Ext::Fti as u8);
        if fti[1] != 4 {
            return Err(FluteError::MalformedDatagram(format!(
                "Wrong extension header size {} != 4 for FTI",
                fti[1]
            )));
        }

        let transfer_length =
            u64::from_be_bytes(fti[0..8].as_ref().try_into().unwrap()) & 0xFFFF_FFFF_FFFF;
        let m = fti[8];
        let g = fti[9];
        let encoding_symbol_length = u16::from_be_bytes(fti[10..12].as_ref().try_into().unwrap());
        let b = u16::from_be_bytes(fti[12..14].as_ref().try_into().unwrap());
        let max_n = u16::from_be_bytes(fti[14..16].as_ref().try_into().unwrap());

        let oti = oti::Oti {
            fec_encoding_id: oti::FecEncodingId::ReedSolomonGf2m,
            fec_instance_id: 0,
            maximum_source_block_length: b as u32,
            encoding_symbol_length,
            max_number_of_parity_symbols: (max_n as u32).saturating_sub(b as u32),
            scheme_specific: Some(oti::ReedSolomonGf2mSchemeSpecific {
                m: match m {
                    0 => 8,
                    m => m,
                },
                g: match g {
                    0 => 1,
                    g => g,
                },
            }),
            inband_fti: true,
        };

        Ok(Some((oti, transfer_length)))
    }

    fn add_fec_payload_id(&self, data: &mut Vec<u8>, oti: &oti::Oti, pkt: &pkt::Pkt) {
        /*
        +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
        |     Source Block Number (32-m)                | Enc. Symb. ID |
        +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         */
        let m = field_size(oti);
        let esi_mask = (1u32 << m) - 1;
        let header: u32 = (pkt.sbn << m) | (pkt.esi & esi_mask);
        data.extend(header.to_be_bytes());
    }

    fn get_fec_payload_id(&self, pkt: &alc::AlcPkt, oti: &oti::Oti) -> Result<alc::PayloadId> {
        let data = &pkt.data[pkt.data_alc_header_offset..pkt.data_payload_offset];
        let arr: [u8; 4] = data
            .try_into()
            .map_err(|_| FluteError::malformed("Wrong size of FEC Payload ID"))?;
        let payload_id_header = u32::from_be_bytes(arr);

        let m = field_size(oti);
        let esi_mask = (1u32 << m) - 1;
        let sbn = payload_id_header >> m;
        let esi = payload_id_header & esi_mask;

        Ok(alc::PayloadId {
            sbn,
            esi,
            source_block_length: None,
        })
    }

    fn fec_payload_id_block_length(&self) -> usize {
        4
    }
}
