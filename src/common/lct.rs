//! LCT common header codec, see <https://www.rfc-editor.org/rfc/rfc5651>

use crate::tools::error::{FluteError, Result};
use crate::tools::uint128::Uint128;

/// Content Encoding applied to object bytes before transmission
#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Cenc {
    /// Do not encode content before transmission
    Null = 0,
    /// Encode content with ZLIB
    Zlib = 1,
    /// Encode content with Deflate
    Deflate = 2,
    /// Encode content with Gzip
    Gzip = 3,
}

#[repr(u8)]
#[derive(Clone, Copy)]
pub(crate) enum Ext {
    Time = 2,
    Fti = 64,
    Fdt = 192,
    Cenc = 193,
}

/// TOI reserved for FDT-Instance transfers
pub const TOI_FDT: Uint128 = Uint128::ZERO;

/// Parsed LCT common header
#[derive(Clone, Debug)]
pub struct LctHeader {
    /// Total header length in bytes, including extensions
    pub len: usize,
    /// Congestion Control Information
    pub cci: Uint128,
    /// Transport Session Identifier
    pub tsi: u64,
    /// Transport Object Identifier
    pub toi: Uint128,
    /// Codepoint, identifies the FEC encoding of the payload
    pub cp: u8,
    /// Close Object flag (B)
    pub close_object: bool,
    /// Close Session flag (A)
    pub close_session: bool,
    /// Byte offset of the first header extension
    pub header_ext_offset: usize,
}

impl TryFrom<u8> for Cenc {
    type Error = ();

    fn try_from(v: u8) -> std::result::Result<Self, Self::Error> {
        match v {
            x if x == Cenc::Null as u8 => Ok(Cenc::Null),
            x if x == Cenc::Zlib as u8 => Ok(Cenc::Zlib),
            x if x == Cenc::Deflate as u8 => Ok(Cenc::Deflate),
            x if x == Cenc::Gzip as u8 => Ok(Cenc::Gzip),
            _ => Err(()),
        }
    }
}

impl TryFrom<&str> for Cenc {
    type Error = ();

    fn try_from(v: &str) -> std::result::Result<Self, Self::Error> {
        match v {
            "null" => Ok(Cenc::Null),
            "zlib" => Ok(Cenc::Zlib),
            "deflate" => Ok(Cenc::Deflate),
            "gzip" => Ok(Cenc::Gzip),
            _ => Err(()),
        }
    }
}

impl Cenc {
    /// Convert Cenc to its string representation
    pub fn to_str(&self) -> &str {
        match self {
            Cenc::Null => "null",
            Cenc::Zlib => "zlib",
            Cenc::Deflate => "deflate",
            Cenc::Gzip => "gzip",
        }
    }
}

/// Number of bytes needed to store the 16-bit groups of a 128-bit value
fn nb_bytes_128(n: &Uint128, min: u32) -> u32 {
    let hi = n.high();
    let lo = n.low();

    if (hi & 0xFFFF_0000_0000_0000) != 0 {
        return 16;
    }

    if (hi & 0xFFFF_0000_0000) != 0 {
        return 14;
    }

    if (hi & 0xFFFF_0000) != 0 {
        return 12;
    }

    if (hi & 0xFFFF) != 0 {
        return 10;
    }

    if (lo & 0xFFFF_0000_0000_0000) != 0 {
        return 8;
    }

    if (lo & 0xFFFF_0000_0000) != 0 {
        return 6;
    }

    if (lo & 0xFFFF_0000) != 0 {
        return 4;
    }

    if (lo & 0xFFFF) != 0 {
        return 2;
    }

    min
}

fn nb_bytes_64(n: u64, min: u32) -> u32 {
    if (n & 0xFFFF_0000_0000_0000) != 0 {
        return 8;
    }

    if (n & 0xFFFF_0000_0000) != 0 {
        return 6;
    }

    if (n & 0xFFFF_0000) != 0 {
        return 4;
    }

    if (n & 0xFFFF) != 0 {
        return 2;
    }

    min
}

/*
 *  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
 *  |   V   | C |PSI|S| O |H|Res|A|B|   HDR_LEN     | Codepoint (CP)|
 *  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
 *  | Congestion Control Information (CCI, length = 32*(C+1) bits)  |
 *  |                          ...                                  |
 *  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
 *  |  Transport Session Identifier (TSI, length = 32*S+16*H bits)  |
 *  |                          ...                                  |
 *  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
 *  |   Transport Object Identifier (TOI, length = 32*O+16*H bits)  |
 *  |                          ...                                  |
 *  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
 *  |                Header Extensions (if applicable)              |
 *  |                          ...                                  |
 *  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
 */
/// Insert an LCT common header into `data`.
///
/// The writer selects the smallest encoding representing `cci`, `tsi` and
/// `toi` as a whole number of 32-bit words, with half-word granularity where
/// the shared H flag permits. TSI and TOI minimum width is 2 bytes, CCI can
/// be absent.
pub fn push_lct_header(
    data: &mut Vec<u8>,
    psi: u8,
    cci: &Uint128,
    tsi: u64,
    toi: &Uint128,
    codepoint: u8,
    close_object: bool,
    close_session: bool,
) {
    let cci_size = nb_bytes_128(cci, 0);
    let tsi_size = nb_bytes_64(tsi, 2);
    let toi_size = nb_bytes_128(toi, 2);

    let h_tsi = (tsi_size & 2) >> 1; // Is TSI half-word ?
    let h_toi = (toi_size & 2) >> 1; // Is TOI half-word ?

    let h = h_tsi | h_toi; // Half-word flag
    let b = close_object as u32;
    let a = close_session as u32;
    let o = (toi_size >> 2) & 0x3;
    let s = (tsi_size >> 2) & 1;
    let c = match cci_size {
        size if size <= 4 => 0,
        size if size <= 8 => 1,
        size if size <= 12 => 2,
        _ => 3,
    };
    let hdr_len = 2 + o + s + h + c;
    let v: u32 = 1;
    let lct_header: u32 = (codepoint as u32)
        | (hdr_len << 8)
        | b << 16
        | a << 17
        | h << 20
        | o << 21
        | s << 23
        | (psi as u32) << 24
        | c << 26
        | v << 28;

    data.extend(lct_header.to_be_bytes());

    // Insert CCI
    let cci_net = cci.to_be_bytes();
    let cci_net_start = cci_net.len() - (((c + 1) << 2) as usize);
    data.extend(&cci_net[cci_net_start..]);

    // Insert TSI
    let tsi_net = tsi.to_be_bytes();
    let tsi_net_start = tsi_net.len() - ((s << 2) + (h << 1)) as usize;
    data.extend(&tsi_net[tsi_net_start..]);

    // Insert TOI
    let toi_net = toi.to_be_bytes();
    let toi_net_start = toi_net.len() - ((o << 2) + (h << 1)) as usize;
    data.extend(&toi_net[toi_net_start..]);
}

/// Increase the header-length field of the LCT header being built.
///
/// `val` is the number of 32-bit words just appended.
pub fn inc_hdr_len(data: &mut [u8], val: u8) {
    data[2] += val;
}

/// Parse the LCT common header of a datagram.
pub fn parse_lct_header(data: &[u8]) -> Result<LctHeader> {
    if data.len() < 4 {
        return Err(FluteError::malformed("Fail to read LCT header size"));
    }

    let len = (data[2] as usize) << 2;
    if len > data.len() {
        return Err(FluteError::MalformedDatagram(format!(
            "LCT header size is {} whereas pkt size is {}",
            len,
            data.len()
        )));
    }

    let cp = data[3];
    let flags1 = data[0];
    let flags2 = data[1];

    let s = (flags2 >> 7) & 0x1;
    let o = (flags2 >> 5) & 0x3;
    let h = (flags2 >> 4) & 0x1;
    let c = (flags1 >> 2) & 0x3;
    let a = (flags2 >> 1) & 0x1;
    let b = flags2 & 0x1;
    let version = flags1 >> 4;
    if version != 1 && version != 2 {
        return Err(FluteError::MalformedDatagram(format!(
            "FLUTE version {} is not supported",
            version
        )));
    }

    let cci_len = ((c as usize) + 1) << 2;
    let tsi_len = ((s as usize) << 2) + ((h as usize) << 1);
    let toi_len = ((o as usize) << 2) + ((h as usize) << 1);

    let cci_from = 4usize;
    let cci_to = cci_from + cci_len;
    let tsi_to = cci_to + tsi_len;
    let toi_to = tsi_to + toi_len;
    let header_ext_offset = toi_to;

    if toi_to > data.len() || cci_len > 16 || tsi_len > 8 || toi_len > 16 {
        return Err(FluteError::MalformedDatagram(format!(
            "TOI ends at offset {} whereas pkt size is {}",
            toi_to,
            data.len()
        )));
    }

    if header_ext_offset > len {
        return Err(FluteError::malformed("EXT offset outside LCT header"));
    }

    let mut cci: [u8; 16] = [0; 16];
    let mut tsi: [u8; 8] = [0; 8];
    let mut toi: [u8; 16] = [0; 16];

    cci[16 - cci_len..].copy_from_slice(&data[cci_from..cci_to]);
    tsi[8 - tsi_len..].copy_from_slice(&data[cci_to..tsi_to]);
    toi[16 - toi_len..].copy_from_slice(&data[tsi_to..toi_to]);

    Ok(LctHeader {
        len,
        cci: Uint128::from_be_bytes(cci),
        tsi: u64::from_be_bytes(tsi),
        toi: Uint128::from_be_bytes(toi),
        cp,
        close_object: b != 0,
        close_session: a != 0,
        header_ext_offset,
    })
}

/// Find a header extension inside an LCT packet.
///
/// Returns the bytes of the extension when found, `None` when absent, an
/// error when the extension chain is malformed.
pub fn get_ext<'a>(data: &'a [u8], lct: &LctHeader, ext: u8) -> Result<Option<&'a [u8]>> {
    let mut chain = &data[lct.header_ext_offset..lct.len];
    while chain.len() >= 4 {
        let het = chain[0];
        let hel = match het {
            het if het >= 128 => 4usize,
            _ => (chain[1] as usize) << 2,
        };

        if hel == 0 || hel > chain.len() {
            return Err(FluteError::MalformedDatagram(format!(
                "LCT EXT size is {}/{} het={} offset={}",
                hel,
                chain.len(),
                het,
                lct.header_ext_offset
            )));
        }

        if het == ext {
            return Ok(Some(&chain[..hel]));
        }
        chain = &chain[hel..];
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use crate::tools::uint128::Uint128;

    fn roundtrip(cci: Uint128, tsi: u64, toi: Uint128) -> (super::LctHeader, usize) {
        let mut data = Vec::new();
        super::push_lct_header(&mut data, 0, &cci, tsi, &toi, 1, false, false);
        let lct = super::parse_lct_header(&data).unwrap();
        assert_eq!(lct.cci, cci);
        assert_eq!(lct.tsi, tsi);
        assert_eq!(lct.toi, toi);
        assert_eq!(lct.len, data.len());
        assert_eq!(lct.header_ext_offset, data.len());
        (lct, data.len())
    }

    #[test]
    pub fn test_lct_roundtrip_minimal() {
        crate::tests::init();
        // CCI absent, TSI and TOI half-words
        let (_, len) = roundtrip(Uint128::ZERO, 1, Uint128::from(2));
        assert_eq!(len, 4 + 4 + 2 + 2);
    }

    #[test]
    pub fn test_lct_roundtrip_wide() {
        crate::tests::init();
        roundtrip(Uint128::from(0x804754755879), 0x055789451234, Uint128::from(3));
        roundtrip(
            Uint128::new(0xFFFF, 0),
            u64::MAX,
            Uint128::new(0xFFFF_FFFF_FFFF, u64::MAX),
        );
    }

    #[test]
    pub fn test_lct_flags() {
        crate::tests::init();
        let mut data = Vec::new();
        super::push_lct_header(
            &mut data,
            0,
            &Uint128::ZERO,
            0,
            &super::TOI_FDT,
            0,
            true,
            true,
        );
        let lct = super::parse_lct_header(&data).unwrap();
        assert!(lct.close_object);
        assert!(lct.close_session);
        assert_eq!(lct.toi, super::TOI_FDT);
    }

    #[test]
    pub fn test_lct_reject_malformed() {
        crate::tests::init();
        assert!(super::parse_lct_header(&[0, 0]).is_err());

        // version 0
        let mut data = Vec::new();
        super::push_lct_header(&mut data, 0, &Uint128::ZERO, 1, &Uint128::from(1), 0, false, false);
        data[0] &= 0x0F;
        assert!(super::parse_lct_header(&data).is_err());

        // header length beyond datagram
        let mut data = Vec::new();
        super::push_lct_header(&mut data, 0, &Uint128::ZERO, 1, &Uint128::from(1), 0, false, false);
        data[2] = 0xFF;
        assert!(super::parse_lct_header(&data).is_err());
    }
}
