//! FEC Object Transmission Information

use crate::tools::error::{FluteError, Result};
use base64::Engine;

///
/// FEC scheme selector carried in the LCT codepoint.
///
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FecEncodingId {
    /// No FEC, source symbols are transmitted as-is
    NoCode = 0,
    /// Reed-Solomon over GF(2^m), fully specified
    ReedSolomonGf2m = 1,
    /// Reed-Solomon over GF(2^8), compact
    ReedSolomonGf28 = 2,
    /// Reed-Solomon over GF(2^8), under-specified small block systematic
    ReedSolomonGf28UnderSpecified = 3,
}

impl TryFrom<u8> for FecEncodingId {
    type Error = ();

    fn try_from(v: u8) -> std::result::Result<Self, Self::Error> {
        match v {
            x if x == FecEncodingId::NoCode as u8 => Ok(FecEncodingId::NoCode),
            x if x == FecEncodingId::ReedSolomonGf2m as u8 => Ok(FecEncodingId::ReedSolomonGf2m),
            x if x == FecEncodingId::ReedSolomonGf28 as u8 => Ok(FecEncodingId::ReedSolomonGf28),
            x if x == FecEncodingId::ReedSolomonGf28UnderSpecified as u8 => {
                Ok(FecEncodingId::ReedSolomonGf28UnderSpecified)
            }
            _ => Err(()),
        }
    }
}

///
/// Reed-Solomon GF(2^m) scheme-specific parameters
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReedSolomonGf2mSchemeSpecific {
    /// Length of the finite field elements, in bits
    pub m: u8,
    /// Number of encoding symbols per group used for the object.
    /// The default value is 1, meaning that each packet contains exactly one symbol
    pub g: u8,
}

impl Default for ReedSolomonGf2mSchemeSpecific {
    fn default() -> Self {
        ReedSolomonGf2mSchemeSpecific { m: 8, g: 1 }
    }
}

impl ReedSolomonGf2mSchemeSpecific {
    /// Encode to the FDT `FEC-OTI-Scheme-Specific-Info` attribute,
    /// base64 of the 2-byte `[m, g]` wire form.
    pub fn scheme_specific(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode([self.m, self.g])
    }

    /// Decode from a `FEC-OTI-Scheme-Specific-Info` attribute.
    ///
    /// Accepts base64 of the 2-byte `[m, g]` form, and leniently the textual
    /// `"m=<n>,g=<n>"` form emitted by some legacy FDT writers.
    pub fn decode(fec_oti_scheme_specific_info: &str) -> Result<ReedSolomonGf2mSchemeSpecific> {
        if let Ok(info) =
            base64::engine::general_purpose::STANDARD.decode(fec_oti_scheme_specific_info)
        {
            if info.len() != 2 {
                return Err(FluteError::malformed("Wrong size of Scheme-Specific-Info"));
            }
            return Ok(ReedSolomonGf2mSchemeSpecific {
                m: info[0],
                g: info[1],
            });
        }

        Self::decode_textual(fec_oti_scheme_specific_info)
            .ok_or_else(|| FluteError::malformed("Fail to decode Scheme-Specific-Info"))
    }

    fn decode_textual(info: &str) -> Option<ReedSolomonGf2mSchemeSpecific> {
        let mut m: Option<u8> = None;
        let mut g: Option<u8> = None;
        for part in info.split(',') {
            let (key, value) = part.split_once('=')?;
            match key.trim().to_ascii_lowercase().as_str() {
                "m" => m = value.trim().parse().ok(),
                "g" => g = value.trim().parse().ok(),
                _ => return None,
            }
        }
        Some(ReedSolomonGf2mSchemeSpecific { m: m?, g: g? })
    }
}

///
/// FEC Object Transmission Information.
/// Parameters needed to build the blocks and FEC symbols of an object transmission.
///
#[derive(Clone, Debug, PartialEq)]
pub struct Oti {
    /// FEC scheme used for the object transmission
    pub fec_encoding_id: FecEncodingId,
    /// FEC Instance ID, only meaningful for under-specified schemes
    pub fec_instance_id: u16,
    /// Maximum number of source symbols per block (B)
    pub maximum_source_block_length: u32,
    /// Size in bytes of an encoding symbol (E)
    pub encoding_symbol_length: u16,
    /// Maximum number of parity symbols per block
    pub max_number_of_parity_symbols: u32,
    /// GF(2^m) scheme parameters, only for `FecEncodingId::ReedSolomonGf2m`
    pub scheme_specific: Option<ReedSolomonGf2mSchemeSpecific>,
    /// If `true`, FTI is added to every ALC/LCT packet,
    /// else FTI is only available inside the FDT
    pub inband_fti: bool,
}

impl Default for Oti {
    fn default() -> Self {
        Oti::new_no_code(1424, 64)
    }
}

impl Oti {
    /// Create an `Oti` using the `NoCode` FEC scheme.
    ///
    /// Objects are sliced into encoding symbols of `encoding_symbol_length`
    /// bytes, `maximum_source_block_length` symbols per block, without any
    /// parity protection.
    pub fn new_no_code(encoding_symbol_length: u16, maximum_source_block_length: u16) -> Oti {
        Oti {
            fec_encoding_id: FecEncodingId::NoCode,
            fec_instance_id: 0,
            maximum_source_block_length: maximum_source_block_length as u32,
            encoding_symbol_length,
            max_number_of_parity_symbols: 0,
            scheme_specific: None,
            inband_fti: true,
        }
    }

    /// Create an `Oti` using the compact Reed-Solomon GF(2^8) FEC scheme.
    ///
    /// Each block carries `maximum_source_block_length` source symbols
    /// followed by `max_number_of_parity_symbols` parity symbols.
    ///
    /// # Errors
    /// The encoded block length (source + parity symbols) must fit the
    /// 8-bit `max_n` field, so it cannot exceed 255.
    pub fn new_reed_solomon_gf28(
        encoding_symbol_length: u16,
        maximum_source_block_length: u8,
        max_number_of_parity_symbols: u8,
    ) -> Result<Oti> {
        let encoding_block_length: u32 =
            maximum_source_block_length as u32 + max_number_of_parity_symbols as u32;
        if encoding_block_length > u8::MAX as u32 {
            return Err(FluteError::invalid(
                "Encoding Block Length (Source Block Length + Number of parity symbols) must be <= 255",
            ));
        }

        Ok(Oti {
            fec_encoding_id: FecEncodingId::ReedSolomonGf28,
            fec_instance_id: 0,
            maximum_source_block_length: maximum_source_block_length as u32,
            encoding_symbol_length,
            max_number_of_parity_symbols: max_number_of_parity_symbols as u32,
            scheme_specific: None,
            inband_fti: true,
        })
    }

    /// Create an `Oti` using the under-specified Reed-Solomon GF(2^8) FEC
    /// scheme (Small Block Systematic).
    ///
    /// # Errors
    /// The encoded block length (source + parity symbols) must fit the
    /// 16-bit `max_n` field, so it cannot exceed 65535.
    pub fn new_reed_solomon_gf28_under_specified(
        encoding_symbol_length: u16,
        maximum_source_block_length: u16,
        max_number_of_parity_symbols: u16,
    ) -> Result<Oti> {
        let encoding_block_length: usize =
            maximum_source_block_length as usize + max_number_of_parity_symbols as usize;
        if encoding_block_length > u16::MAX as usize {
            return Err(FluteError::invalid(
                "Encoding Block Length (Source Block Length + Number of parity symbols) must be <= 65535",
            ));
        }

        Ok(Oti {
            fec_encoding_id: FecEncodingId::ReedSolomonGf28UnderSpecified,
            fec_instance_id: 0,
            maximum_source_block_length: maximum_source_block_length as u32,
            encoding_symbol_length,
            max_number_of_parity_symbols: max_number_of_parity_symbols as u32,
            scheme_specific: None,
            inband_fti: true,
        })
    }

    /// Create an `Oti` using the fully-specified Reed-Solomon GF(2^m) FEC
    /// scheme with the default parameters m=8, G=1.
    ///
    /// # Errors
    /// The encoded block length must fit in the 2^m - 1 symbols of the field,
    /// so with m=8 it cannot exceed 255.
    pub fn new_reed_solomon_gf2m(
        encoding_symbol_length: u16,
        maximum_source_block_length: u8,
        max_number_of_parity_symbols: u8,
    ) -> Result<Oti> {
        let scheme = ReedSolomonGf2mSchemeSpecific::default();
        let encoding_block_length: u32 =
            maximum_source_block_length as u32 + max_number_of_parity_symbols as u32;
        if encoding_block_length > (1u32 << scheme.m) - 1 {
            return Err(FluteError::invalid(
                "Encoding Block Length (Source Block Length + Number of parity symbols) must be < 2^m",
            ));
        }

        Ok(Oti {
            fec_encoding_id: FecEncodingId::ReedSolomonGf2m,
            fec_instance_id: 0,
            maximum_source_block_length: maximum_source_block_length as u32,
            encoding_symbol_length,
            max_number_of_parity_symbols: max_number_of_parity_symbols as u32,
            scheme_specific: Some(scheme),
            inband_fti: true,
        })
    }

    /// Maximum transfer length in bytes that this `Oti` can handle.
    ///
    /// Objects with an encoded size (after CENC) greater than this value
    /// cannot be transferred. Derives from the SBN field width of the FEC
    /// Payload ID and the block size B*E, capped at the 48 bits of the
    /// Transfer Length field of the FTI.
    pub fn max_transfer_length(&self) -> u64 {
        let transfer_length: u64 = 0xFFFF_FFFF_FFFF; // 48 bits max

        let max_blocks = self.max_source_block_count();
        let block_size =
            self.encoding_symbol_length as u64 * self.maximum_source_block_length as u64;
        let size = block_size.saturating_mul(max_blocks);
        if size > transfer_length {
            return transfer_length;
        }
        size
    }

    /// Number of source blocks that the SBN field of the FEC Payload ID can
    /// address for this scheme.
    pub fn max_source_block_count(&self) -> u64 {
        match self.fec_encoding_id {
            FecEncodingId::NoCode => 1 << 16,
            FecEncodingId::ReedSolomonGf2m => {
                let m = self.scheme_specific.map(|s| s.m).unwrap_or(8);
                1 << (32 - m as u64)
            }
            FecEncodingId::ReedSolomonGf28 => 1 << 24,
            FecEncodingId::ReedSolomonGf28UnderSpecified => 1 << 32,
        }
    }

    /// Convert the `Oti` to the FDT `FEC-OTI-*` attribute set.
    pub fn get_attributes(&self) -> OtiAttributes {
        OtiAttributes {
            fec_oti_fec_encoding_id: Some(self.fec_encoding_id as u8),
            fec_oti_fec_instance_id: Some(self.fec_instance_id as u64),
            fec_oti_maximum_source_block_length: Some(self.maximum_source_block_length as u64),
            fec_oti_encoding_symbol_length: Some(self.encoding_symbol_length as u64),
            fec_oti_max_number_of_encoding_symbols: Some(
                self.maximum_source_block_length as u64 + self.max_number_of_parity_symbols as u64,
            ),
            fec_oti_scheme_specific_info: self.scheme_specific_info(),
        }
    }

    fn scheme_specific_info(&self) -> Option<String> {
        match self.fec_encoding_id {
            FecEncodingId::ReedSolomonGf2m => {
                self.scheme_specific.as_ref().map(|s| s.scheme_specific())
            }
            _ => None,
        }
    }
}

/// FDT `FEC-OTI-*` attributes
#[derive(Debug, PartialEq)]
pub struct OtiAttributes {
    /// See [rfc6726 Section 5](https://www.rfc-editor.org/rfc/rfc6726.html#section-5)
    pub fec_oti_fec_encoding_id: Option<u8>,
    /// See [rfc6726 Section 5](https://www.rfc-editor.org/rfc/rfc6726.html#section-5)
    pub fec_oti_fec_instance_id: Option<u64>,
    /// See [rfc6726 Section 5](https://www.rfc-editor.org/rfc/rfc6726.html#section-5)
    pub fec_oti_maximum_source_block_length: Option<u64>,
    /// See [rfc6726 Section 5](https://www.rfc-editor.org/rfc/rfc6726.html#section-5)
    pub fec_oti_encoding_symbol_length: Option<u64>,
    /// See [rfc6726 Section 5](https://www.rfc-editor.org/rfc/rfc6726.html#section-5)
    pub fec_oti_max_number_of_encoding_symbols: Option<u64>,
    /// See [rfc6726 Section 5](https://www.rfc-editor.org/rfc/rfc6726.html#section-5)
    pub fec_oti_scheme_specific_info: Option<String>, // Base64
}

#[cfg(test)]
mod tests {
    use super::{FecEncodingId, Oti, ReedSolomonGf2mSchemeSpecific};

    #[test]
    pub fn test_oti_max_transfer_length() {
        crate::tests::init();
        let no_code = Oti::new_no_code(1400, 255);
        assert_eq!(no_code.max_transfer_length(), 1400 * 255 * (1 << 16));

        let rs28 = Oti::new_reed_solomon_gf28(1400, 250, 5).unwrap();
        assert_eq!(rs28.max_transfer_length(), 1400 * 250 * (1 << 24));

        // B * E * 2^32 overflows the 48-bit Transfer Length field
        let rs28_us = Oti::new_reed_solomon_gf28_under_specified(1400, 60000, 100).unwrap();
        assert_eq!(rs28_us.max_transfer_length(), 0xFFFF_FFFF_FFFF);
    }

    #[test]
    pub fn test_oti_rejects_oversized_blocks() {
        crate::tests::init();
        assert!(Oti::new_reed_solomon_gf28(1400, 250, 10).is_err());
        assert!(Oti::new_reed_solomon_gf28_under_specified(1400, 65000, 1000).is_err());
        assert!(Oti::new_reed_solomon_gf2m(1400, 250, 10).is_err());
        assert!(Oti::new_reed_solomon_gf28(1400, 250, 5).is_ok());
    }

    #[test]
    pub fn test_fec_encoding_id_values() {
        assert_eq!(FecEncodingId::try_from(0).unwrap(), FecEncodingId::NoCode);
        assert_eq!(
            FecEncodingId::try_from(1).unwrap(),
            FecEncodingId::ReedSolomonGf2m
        );
        assert_eq!(
            FecEncodingId::try_from(2).unwrap(),
            FecEncodingId::ReedSolomonGf28
        );
        assert_eq!(
            FecEncodingId::try_from(3).unwrap(),
            FecEncodingId::ReedSolomonGf28UnderSpecified
        );
        assert!(FecEncodingId::try_from(42).is_err());
    }

    #[test]
    pub fn test_scheme_specific_decode() {
        crate::tests::init();
        let scheme = ReedSolomonGf2mSchemeSpecific { m: 8, g: 1 };
        let encoded = scheme.scheme_specific();
        assert_eq!(
            ReedSolomonGf2mSchemeSpecific::decode(&encoded).unwrap(),
            scheme
        );

        // lenient textual form
        assert_eq!(
            ReedSolomonGf2mSchemeSpecific::decode("m=8,g=1").unwrap(),
            scheme
        );
        assert_eq!(
            ReedSolomonGf2mSchemeSpecific::decode("M=4, G=2").unwrap(),
            ReedSolomonGf2mSchemeSpecific { m: 4, g: 2 }
        );

        assert!(ReedSolomonGf2mSchemeSpecific::decode("bogus").is_err());
    }
}
