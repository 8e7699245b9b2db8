//! Serde model of the FDT-Instance XML document.

use crate::tools::error::{FluteError, Result};
use quick_xml::de::from_reader;
use serde::{Deserialize, Serialize};

use super::oti::{self, ReedSolomonGf2mSchemeSpecific};

/// FDT-Instance XML document.
///
/// An FDT Instance is valid until its expiration time. The expiration time is
/// expressed within the FDT Instance payload as a UTF-8 decimal representation
/// of a 32-bit unsigned integer, holding the 32 most significant bits of a
/// 64-bit NTP time value. Receivers must tolerate unknown attributes.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct FdtInstance {
    /// Expiration time of this FDT Instance, NTP seconds
    #[serde(rename = "@Expires")]
    pub expires: String,
    /// When `true`, no new object will be added to this FDT
    #[serde(rename = "@Complete", skip_serializing_if = "Option::is_none")]
    pub complete: Option<bool>,
    /// Default FEC Encoding ID of the session
    #[serde(
        rename = "@FEC-OTI-FEC-Encoding-ID",
        skip_serializing_if = "Option::is_none"
    )]
    pub fec_oti_fec_encoding_id: Option<u8>,
    /// Default FEC Instance ID of the session
    #[serde(
        rename = "@FEC-OTI-FEC-Instance-ID",
        skip_serializing_if = "Option::is_none"
    )]
    pub fec_oti_fec_instance_id: Option<u64>,
    /// Default maximum source block length of the session
    #[serde(
        rename = "@FEC-OTI-Maximum-Source-Block-Length",
        skip_serializing_if = "Option::is_none"
    )]
    pub fec_oti_maximum_source_block_length: Option<u64>,
    /// Default encoding symbol length of the session
    #[serde(
        rename = "@FEC-OTI-Encoding-Symbol-Length",
        skip_serializing_if = "Option::is_none"
    )]
    pub fec_oti_encoding_symbol_length: Option<u64>,
    /// Default maximum number of encoding symbols per block of the session
    #[serde(
        rename = "@FEC-OTI-Max-Number-of-Encoding-Symbols",
        skip_serializing_if = "Option::is_none"
    )]
    pub fec_oti_max_number_of_encoding_symbols: Option<u64>,
    /// Default scheme-specific information of the session, base64
    #[serde(
        rename = "@FEC-OTI-Scheme-Specific-Info",
        skip_serializing_if = "Option::is_none"
    )]
    pub fec_oti_scheme_specific_info: Option<String>,
    /// Groups the FDT-Instance belongs to
    #[serde(rename = "Group", skip_serializing_if = "Option::is_none")]
    pub group: Option<Vec<String>>,
    /// Files described by this FDT Instance
    #[serde(rename = "File", skip_serializing_if = "Option::is_none")]
    pub file: Option<Vec<File>>,
}

/// `File` element of an FDT-Instance.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct File {
    /// Resource location of the file
    #[serde(rename = "@Content-Location")]
    pub content_location: String,
    /// TOI the file is transferred with, decimal representation
    #[serde(rename = "@TOI")]
    pub toi: String,
    /// Size of the file before content encoding
    #[serde(rename = "@Content-Length", skip_serializing_if = "Option::is_none")]
    pub content_length: Option<u64>,
    /// Size of the file on the wire, after content encoding
    #[serde(rename = "@Transfer-Length", skip_serializing_if = "Option::is_none")]
    pub transfer_length: Option<u64>,
    /// Media type of the file
    #[serde(rename = "@Content-Type", skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Content encoding applied to the file
    #[serde(rename = "@Content-Encoding", skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,
    /// MD5 of the file, base64
    #[serde(rename = "@Content-MD5", skip_serializing_if = "Option::is_none")]
    pub content_md5: Option<String>,
    /// Per-file FEC Encoding ID override
    #[serde(
        rename = "@FEC-OTI-FEC-Encoding-ID",
        skip_serializing_if = "Option::is_none"
    )]
    pub fec_oti_fec_encoding_id: Option<u8>,
    /// Per-file FEC Instance ID override
    #[serde(
        rename = "@FEC-OTI-FEC-Instance-ID",
        skip_serializing_if = "Option::is_none"
    )]
    pub fec_oti_fec_instance_id: Option<u64>,
    /// Per-file maximum source block length override
    #[serde(
        rename = "@FEC-OTI-Maximum-Source-Block-Length",
        skip_serializing_if = "Option::is_none"
    )]
    pub fec_oti_maximum_source_block_length: Option<u64>,
    /// Per-file encoding symbol length override
    #[serde(
        rename = "@FEC-OTI-Encoding-Symbol-Length",
        skip_serializing_if = "Option::is_none"
    )]
    pub fec_oti_encoding_symbol_length: Option<u64>,
    /// Per-file maximum number of encoding symbols override
    #[serde(
        rename = "@FEC-OTI-Max-Number-of-Encoding-Symbols",
        skip_serializing_if = "Option::is_none"
    )]
    pub fec_oti_max_number_of_encoding_symbols: Option<u64>,
    /// Per-file scheme-specific information override, base64
    #[serde(
        rename = "@FEC-OTI-Scheme-Specific-Info",
        skip_serializing_if = "Option::is_none"
    )]
    pub fec_oti_scheme_specific_info: Option<String>,
    /// Cache behavior the receiver should apply to this file
    #[serde(rename = "Cache-Control", skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<CacheControl>,
}

/// `Cache-Control` element of a `File`.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct CacheControl {
    /// Selected cache directive
    #[serde(rename = "$value")]
    pub value: CacheControlChoice,
}

/// Cache directives a `Cache-Control` element can carry.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub enum CacheControlChoice {
    /// The receiver should not cache the file
    #[serde(rename = "no-cache")]
    NoCache,
    /// The receiver can keep the file indefinitely, even stale
    #[serde(rename = "max-stale")]
    MaxStale,
    /// Expiry time of the file, NTP seconds
    #[serde(rename = "Expires")]
    Expires(u32),
}

fn reed_solomon_scheme_specific(
    fec_oti_scheme_specific_info: &Option<String>,
) -> Option<ReedSolomonGf2mSchemeSpecific> {
    fec_oti_scheme_specific_info
        .as_ref()
        .and_then(|info| ReedSolomonGf2mSchemeSpecific::decode(info).ok())
}

fn build_oti(
    fec_encoding_id: Option<u8>,
    fec_instance_id: Option<u64>,
    maximum_source_block_length: Option<u64>,
    encoding_symbol_length: Option<u64>,
    max_number_of_encoding_symbols: Option<u64>,
    scheme_specific_info: &Option<String>,
) -> Option<oti::Oti> {
    let fec_encoding_id: oti::FecEncodingId = fec_encoding_id?.try_into().ok()?;
    let maximum_source_block_length = maximum_source_block_length?;
    let max_number_of_encoding_symbols = max_number_of_encoding_symbols?;

    let scheme_specific = match fec_encoding_id {
        oti::FecEncodingId::ReedSolomonGf2m => reed_solomon_scheme_specific(scheme_specific_info),
        _ => None,
    };

    Some(oti::Oti {
        fec_encoding_id,
        fec_instance_id: fec_instance_id.unwrap_or_default() as u16,
        maximum_source_block_length: maximum_source_block_length as u32,
        encoding_symbol_length: encoding_symbol_length? as u16,
        max_number_of_parity_symbols: max_number_of_encoding_symbols
            .saturating_sub(maximum_source_block_length) as u32,
        scheme_specific,
        inband_fti: false,
    })
}

impl FdtInstance {
    /// Parse an FDT-Instance XML document.
    pub fn parse(buffer: &[u8]) -> Result<FdtInstance> {
        from_reader(buffer).map_err(|err| FluteError::malformed(err.to_string()))
    }

    /// Find the `File` element transferred with `toi`.
    pub fn get_file(&self, toi: &str) -> Option<&File> {
        self.file
            .as_ref()
            .and_then(|file| file.iter().find(|&file| file.toi == toi))
    }

    /// OTI of a file, the per-file override or the FDT default.
    pub fn get_oti_for_file(&self, file: &File) -> Option<oti::Oti> {
        file.get_oti().or_else(|| self.get_oti())
    }

    /// Default OTI of the FDT-Instance.
    pub fn get_oti(&self) -> Option<oti::Oti> {
        build_oti(
            self.fec_oti_fec_encoding_id,
            self.fec_oti_fec_instance_id,
            self.fec_oti_maximum_source_block_length,
            self.fec_oti_encoding_symbol_length,
            self.fec_oti_max_number_of_encoding_symbols,
            &self.fec_oti_scheme_specific_info,
        )
    }
}

impl File {
    /// Per-file OTI override, when the `File` element carries one.
    pub fn get_oti(&self) -> Option<oti::Oti> {
        build_oti(
            self.fec_oti_fec_encoding_id,
            self.fec_oti_fec_instance_id,
            self.fec_oti_maximum_source_block_length,
            self.fec_oti_encoding_symbol_length,
            self.fec_oti_max_number_of_encoding_symbols,
            &self.fec_oti_scheme_specific_info,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{CacheControl, CacheControlChoice, FdtInstance};

    #[test]
    pub fn test_fdt_instance_parse() {
        crate::tests::init();
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<FDT-Instance Expires="3927130539" Complete="true"
    FEC-OTI-FEC-Encoding-ID="0"
    FEC-OTI-Maximum-Source-Block-Length="64"
    FEC-OTI-Encoding-Symbol-Length="1424"
    FEC-OTI-Max-Number-of-Encoding-Symbols="64"
    Unknown-Attribute="ignored">
  <File Content-Location="file:///hello.txt" TOI="1"
        Content-Length="42" Transfer-Length="42"
        Content-Type="text/plain" Content-Encoding="null">
     <Cache-Control><no-cache/></Cache-Control>
  </File>
</FDT-Instance>"#;

        let instance = FdtInstance::parse(xml.as_bytes()).unwrap();
        assert_eq!(instance.expires, "3927130539");
        assert_eq!(instance.complete, Some(true));

        let oti = instance.get_oti().unwrap();
        assert_eq!(oti.encoding_symbol_length, 1424);
        assert_eq!(oti.maximum_source_block_length, 64);
        assert_eq!(oti.max_number_of_parity_symbols, 0);

        let file = instance.get_file("1").unwrap();
        assert_eq!(file.content_location, "file:///hello.txt");
        assert_eq!(file.transfer_length, Some(42));
        assert_eq!(
            file.cache_control,
            Some(CacheControl {
                value: CacheControlChoice::NoCache
            })
        );
        assert!(instance.get_file("2").is_none());
    }

    #[test]
    pub fn test_fdt_instance_cache_expires() {
        crate::tests::init();
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<FDT-Instance Expires="3927130539">
  <File Content-Location="file:///a" TOI="18446744073709551616">
     <Cache-Control><Expires>3927130000</Expires></Cache-Control>
  </File>
</FDT-Instance>"#;

        let instance = FdtInstance::parse(xml.as_bytes()).unwrap();
        // TOI larger than 64 bits is carried as a decimal string
        let file = instance.get_file("18446744073709551616").unwrap();
        assert_eq!(
            file.cache_control,
            Some(CacheControl {
                value: CacheControlChoice::Expires(3927130000)
            })
        );
    }
}
