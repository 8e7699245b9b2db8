//! ALC packet layer, combining the LCT header, the header extensions and the
//! FEC Payload ID of each datagram.

use super::{alccodec::AlcCodec, lct, oti, pkt::Pkt, Profile};
use crate::tools;
use crate::tools::error::{FluteError, Result};
use crate::tools::uint128::Uint128;
use std::time::SystemTime;

/// Parsed ALC/LCT packet
#[derive(Debug)]
pub struct AlcPkt<'a> {
    /// LCT header
    pub lct: lct::LctHeader,
    /// OTI extracted from the inband FTI, when present
    pub oti: Option<oti::Oti>,
    /// Transfer length extracted from the inband FTI, when present
    pub transfer_length: Option<u64>,
    /// Content encoding signalled by EXT_CENC
    pub cenc: Option<lct::Cenc>,
    /// Raw datagram
    pub data: &'a [u8],
    /// Byte offset of the FEC Payload ID
    pub data_alc_header_offset: usize,
    /// Byte offset of the application payload
    pub data_payload_offset: usize,
    /// EXT_FDT content, only on FDT-Instance packets
    pub fdt_info: Option<ExtFdt>,
}

/// FEC Payload ID of an encoding symbol
#[derive(Debug, PartialEq, Eq)]
pub struct PayloadId {
    /// Source Block Number
    pub sbn: u32,
    /// Encoding Symbol ID
    pub esi: u32,
    /// Source Block Length, only for schemes carrying it inband
    pub source_block_length: Option<u32>,
}

/// EXT_FDT header extension content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtFdt {
    /// FDT extension version, 2 for RFC 6726, 1 for RFC 3926
    pub version: u32,
    /// FDT Instance ID
    pub fdt_instance_id: u32,
}

/// Build the close-session datagram.
///
/// An empty NoCode packet with the LCT A flag set, a zero-filled 4-byte FTI
/// stub and a zero 4-byte FEC Payload ID. Receivers treat it as
/// "session ended".
pub fn new_alc_pkt_close_session(cci: &Uint128, tsi: u64) -> Vec<u8> {
    let mut data = Vec::new();

    lct::push_lct_header(
        &mut data,
        0,
        cci,
        tsi,
        &lct::TOI_FDT,
        oti::FecEncodingId::NoCode as u8,
        false,
        true,
    );
    data.extend(0u32.to_be_bytes()); // FTI stub
    data.extend(0u32.to_be_bytes()); // FEC Payload ID
    data
}

/// Pack an encoding symbol into an ALC/LCT datagram.
///
/// Header extensions are emitted in the order FDT, CENC, SCT, FTI.
pub fn new_alc_pkt(
    oti: &oti::Oti,
    cci: &Uint128,
    tsi: u64,
    pkt: &Pkt,
    profile: Profile,
    now: SystemTime,
) -> Vec<u8> {
    let mut data = Vec::new();
    log::debug!("Send ALC sbn={} esi={} toi={}", pkt.sbn, pkt.esi, pkt.toi);
    lct::push_lct_header(
        &mut data,
        0,
        cci,
        tsi,
        &pkt.toi,
        oti.fec_encoding_id as u8,
        pkt.close_object,
        false,
    );

    if pkt.toi == lct::TOI_FDT {
        debug_assert!(pkt.fdt_id.is_some());

        let version = match profile {
            Profile::RFC6726 => 2,
            Profile::RFC3926 => 1,
        };

        push_fdt(&mut data, version, pkt.fdt_id.unwrap_or_default());
    }

    // FDT packets must signal a non-null Cenc inband
    if (pkt.toi == lct::TOI_FDT && pkt.cenc != lct::Cenc::Null) || pkt.inband_cenc {
        push_cenc(&mut data, pkt.cenc as u8);
    }

    if pkt.sender_current_time {
        push_sct(&mut data, now);
    }

    let codec = <dyn AlcCodec>::instance(oti.fec_encoding_id);
    if pkt.toi == lct::TOI_FDT || oti.inband_fti {
        codec.add_fti(&mut data, oti, pkt.transfer_length);
    }
    codec.add_fec_payload_id(&mut data, oti, pkt);
    data.extend(pkt.payload.iter());
    data
}

/// Parse a datagram into an [`AlcPkt`].
pub fn parse_alc_pkt(data: &[u8]) -> Result<AlcPkt<'_>> {
    let lct_header = lct::parse_lct_header(data)?;

    let codec = <dyn AlcCodec>::instance_for_codepoint(lct_header.cp);
    let fec_payload_id_block_length = codec.fec_payload_id_block_length();
    if fec_payload_id_block_length + lct_header.len > data.len() {
        return Err(FluteError::MalformedDatagram(format!(
            "ALC packet of {} bytes is too short for an LCT header of {} bytes",
            data.len(),
            lct_header.len
        )));
    }

    let fti = codec.get_fti(data, &lct_header)?;
    let data_alc_header_offset = lct_header.len;
    let data_payload_offset = fec_payload_id_block_length + lct_header.len;

    let cenc = lct::get_ext(data, &lct_header, lct::Ext::Cenc as u8)?;
    let cenc = match cenc {
        Some(ext) => parse_cenc(ext).ok(),
        None => None,
    };

    let mut fdt_info: Option<ExtFdt> = None;
    if lct_header.toi == lct::TOI_FDT {
        let fdt = lct::get_ext(data, &lct_header, lct::Ext::Fdt as u8)?;
        fdt_info = match fdt {
            Some(ext) => parse_ext_fdt(ext)?,
            None => None,
        };
    }

    Ok(AlcPkt {
        lct: lct_header,
        oti: fti.as_ref().map(|fti| fti.0.clone()),
        transfer_length: fti.map(|fti| fti.1),
        cenc,
        data,
        data_alc_header_offset,
        data_payload_offset,
        fdt_info,
    })
}

/// Extract the Sender Current Time from the EXT_TIME extension.
pub fn get_sender_current_time(pkt: &AlcPkt) -> Result<Option<SystemTime>> {
    let ext = match lct::get_ext(pkt.data, &pkt.lct, lct::Ext::Time as u8)? {
        Some(res) => res,
        _ => return Ok(None),
    };

    parse_sct(ext)
}

/// Extract the FEC Payload ID of a packet.
pub fn parse_payload_id(pkt: &AlcPkt, oti: &oti::Oti) -> Result<PayloadId> {
    let codec = <dyn AlcCodec>::instance(oti.fec_encoding_id);
    codec.get_fec_payload_id(pkt, oti)
}

fn parse_ext_fdt(ext: &[u8]) -> Result<Option<ExtFdt>> {
    if ext.len() != 4 {
        return Err(FluteError::malformed("Wrong size of FDT Extension"));
    }

    /*
    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    |   HET = 192   |   V   |          FDT Instance ID              |
    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
     */

    let fdt_bytes = u32::from_be_bytes(ext.try_into().unwrap());
    let version = (fdt_bytes >> 20) & 0xF;
    let fdt_instance_id = fdt_bytes & 0xFFFFF;

    Ok(Some(ExtFdt {
        version,
        fdt_instance_id,
    }))
}

fn push_fdt(data: &mut Vec<u8>, version: u8, fdt_id: u32) {
    /*
    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    |   HET = 192   |   V   |          FDT Instance ID              |
    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
     */
    let ext = (lct::Ext::Fdt as u32) << 24 | (version as u32) << 20 | (fdt_id & 0xFFFFF);
    data.extend(ext.to_be_bytes());
    lct::inc_hdr_len(data, 1);
}

fn push_cenc(data: &mut Vec<u8>, cenc: u8) {
    /*
    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    |   HET = 193   |     Cenc      |          Reserved             |
    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
     */
    let ext = (lct::Ext::Cenc as u32) << 24 | (cenc as u32) << 16;
    data.extend(ext.to_be_bytes());
    lct::inc_hdr_len(data, 1);
}

fn parse_cenc(ext: &[u8]) -> Result<lct::Cenc> {
    if ext.len() != 4 {
        return Err(FluteError::malformed("Wrong CENC extension size"));
    }
    ext[1]
        .try_into()
        .map_err(|_| FluteError::malformed("Cenc not supported"))
}

fn push_sct(data: &mut Vec<u8>, time: SystemTime) {
    /*
    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    |     HET = 2   |    HEL >= 1   |         Use (bit field)       |
    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    |                       first time value                        |
    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    ...            (other time values (optional)                  ...
    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+

     Use (bit field):
      6   7   8   9   0   1   2   3   4   5   6   7   8   9   0   1
    +---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+
    |SCT|SCT|ERT|SLC|   reserved    |          PI-specific          |
    |Hi |Low|   |   |    by LCT     |              use              |
    +---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+
    */

    // HEL=3, SCT-hi and SCT-lo set
    let header: u32 = (lct::Ext::Time as u32) << 24 | (3u32 << 16) | (1u32 << 15) | (1u32 << 14);

    let ntp = match tools::system_time_to_ntp(time) {
        Ok(res) => res,
        Err(_) => return,
    };
    data.extend(header.to_be_bytes());
    data.extend(ntp.to_be_bytes());
    lct::inc_hdr_len(data, 3);
}

fn parse_sct(ext: &[u8]) -> Result<Option<SystemTime>> {
    if ext.len() < 4 {
        return Err(FluteError::malformed("EXT_TIME is too short"));
    }
    let use_bits_hi = ext[2];
    let sct_hi = (use_bits_hi >> 7) & 1;
    let sct_low = (use_bits_hi >> 6) & 1;
    let ert = (use_bits_hi >> 5) & 1;
    let slc = (use_bits_hi >> 4) & 1;

    let expected_len = (sct_hi + sct_low + ert + slc + 1) as usize * 4;
    if ext.len() != expected_len {
        return Err(FluteError::MalformedDatagram(format!(
            "Wrong EXT_TIME length, expect {} received {}",
            expected_len,
            ext.len()
        )));
    }

    if sct_hi == 0 {
        return Ok(None);
    }

    let ntp_seconds = u32::from_be_bytes(ext[4..8].as_ref().try_into().unwrap());
    let ntp_fraction: u32 = match sct_low {
        1 => u32::from_be_bytes(ext[8..12].as_ref().try_into().unwrap()),
        _ => 0,
    };

    let ntp: u64 = ((ntp_seconds as u64) << 32) | (ntp_fraction as u64);
    tools::ntp_to_system_time(ntp).map(Some)
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use crate::common::lct;
    use crate::common::oti;
    use crate::common::pkt;
    use crate::common::Profile;
    use crate::tools::uint128::Uint128;

    fn new_pkt(toi: Uint128, payload: Vec<u8>) -> pkt::Pkt {
        let transfer_length = payload.len() as u64;
        pkt::Pkt {
            payload,
            esi: 1,
            sbn: 2,
            toi,
            fdt_id: None,
            cenc: lct::Cenc::Null,
            inband_cenc: true,
            transfer_length,
            close_object: false,
            source_block_length: 1,
            sender_current_time: false,
        }
    }

    #[test]
    pub fn test_alc_create() {
        crate::tests::init();

        let oti: oti::Oti = Default::default();
        let cci = Uint128::from(0x804754755879);
        let tsi: u64 = 0x055789451234;
        let pkt = new_pkt(Uint128::from(3), b"hello".to_vec());

        let alc_pkt = super::new_alc_pkt(&oti, &cci, tsi, &pkt, Profile::RFC6726, SystemTime::now());
        let decoded = super::parse_alc_pkt(&alc_pkt).unwrap();
        assert_eq!(decoded.lct.toi, pkt.toi);
        assert_eq!(decoded.lct.cci, cci);
        assert_eq!(decoded.lct.tsi, tsi);
        assert_eq!(&alc_pkt[decoded.data_payload_offset..], b"hello");
    }

    #[test]
    pub fn test_alc_payload_id_per_scheme() {
        crate::tests::init();
        let otis = [
            oti::Oti::default(),
            oti::Oti::new_reed_solomon_gf28(1400, 60, 4).unwrap(),
            oti::Oti::new_reed_solomon_gf28_under_specified(1400, 60, 4).unwrap(),
            oti::Oti::new_reed_solomon_gf2m(1400, 60, 4).unwrap(),
        ];

        for oti in otis {
            let pkt = new_pkt(Uint128::from(5), vec![0xAB; 16]);
            let alc_pkt =
                super::new_alc_pkt(&oti, &Uint128::ZERO, 1, &pkt, Profile::RFC6726, SystemTime::now());
            let decoded = super::parse_alc_pkt(&alc_pkt).unwrap();

            let payload_id = super::parse_payload_id(&decoded, &oti).unwrap();
            assert_eq!(payload_id.sbn, 2, "sbn for {:?}", oti.fec_encoding_id);
            assert_eq!(payload_id.esi, 1, "esi for {:?}", oti.fec_encoding_id);

            let parsed_oti = decoded.oti.as_ref().expect("inband FTI");
            assert_eq!(parsed_oti.fec_encoding_id, oti.fec_encoding_id);
            assert_eq!(
                parsed_oti.encoding_symbol_length,
                oti.encoding_symbol_length
            );
            assert_eq!(
                parsed_oti.maximum_source_block_length,
                oti.maximum_source_block_length
            );
            assert_eq!(decoded.transfer_length, Some(16));
        }
    }

    #[test]
    pub fn test_alc_sender_current_time() {
        crate::tests::init();
        let oti: oti::Oti = Default::default();
        let mut pkt = new_pkt(Uint128::from(1), b"x".to_vec());
        pkt.sender_current_time = true;

        let now = SystemTime::now();
        let alc_pkt = super::new_alc_pkt(&oti, &Uint128::ZERO, 1, &pkt, Profile::RFC6726, now);
        let decoded = super::parse_alc_pkt(&alc_pkt).unwrap();
        let sct = super::get_sender_current_time(&decoded).unwrap().unwrap();
        let diff = match sct.duration_since(now) {
            Ok(d) => d,
            Err(e) => e.duration(),
        };
        assert!(diff < std::time::Duration::from_micros(1));
    }

    #[test]
    pub fn test_alc_close_session() {
        crate::tests::init();
        let data = super::new_alc_pkt_close_session(&Uint128::ZERO, 42);
        let lct = lct::parse_lct_header(&data).unwrap();
        assert!(lct.close_session);
        assert_eq!(lct.tsi, 42);
        assert_eq!(lct.toi, lct::TOI_FDT);
        assert_eq!(lct.cp, oti::FecEncodingId::NoCode as u8);
    }

    #[test]
    pub fn test_alc_unknown_codepoint() {
        crate::tests::init();
        let oti: oti::Oti = Default::default();
        let pkt = new_pkt(Uint128::from(1), b"x".to_vec());
        let mut alc_pkt =
            super::new_alc_pkt(&oti, &Uint128::ZERO, 1, &pkt, Profile::RFC6726, SystemTime::now());
        alc_pkt[3] = 42; // rewrite the codepoint
        let res = super::parse_alc_pkt(&alc_pkt);
        assert!(matches!(
            res,
            Err(crate::error::FluteError::UnsupportedFec(42))
        ));
    }
}
