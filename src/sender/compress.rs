//! Content encoding of whole object buffers, applied once at object
//! creation time.

use std::io::Write;

use crate::common::lct;
use crate::tools::error::{FluteError, Result};
use flate2::write::{DeflateEncoder, GzEncoder, ZlibEncoder};
use flate2::Compression;

/// Encode an object buffer with the requested `Cenc` codec.
///
/// `Cenc::Null` is the absence of a codec, asking to compress with it is a
/// configuration error.
pub fn compress(data: &[u8], cenc: lct::Cenc) -> Result<Vec<u8>> {
    log::debug!("Encode {} bytes with Cenc {}", data.len(), cenc.to_str());
    let level = Compression::default();
    match cenc {
        lct::Cenc::Null => Err(FluteError::invalid("Cenc null is not a codec")),
        lct::Cenc::Zlib => encode(ZlibEncoder::new(Vec::new(), level), data, ZlibEncoder::finish),
        lct::Cenc::Deflate => encode(
            DeflateEncoder::new(Vec::new(), level),
            data,
            DeflateEncoder::finish,
        ),
        lct::Cenc::Gzip => encode(GzEncoder::new(Vec::new(), level), data, GzEncoder::finish),
    }
}

/// Run one flate2 encoder over the whole buffer.
///
/// The encoders share their `Write` surface but each has its own `finish`,
/// so the consuming step is passed in.
fn encode<E, F>(mut encoder: E, data: &[u8], finish: F) -> Result<Vec<u8>>
where
    E: Write,
    F: FnOnce(E) -> std::io::Result<Vec<u8>>,
{
    encoder.write_all(data)?;
    let output = finish(encoder)?;
    log::debug!("Encoded into {} bytes", output.len());
    Ok(output)
}

#[cfg(test)]
mod tests {
    use crate::common::lct;

    #[test]
    pub fn test_compress_null_is_rejected() {
        crate::tests::init();
        assert!(super::compress(b"hello", lct::Cenc::Null).is_err());
    }

    #[test]
    pub fn test_compress_codecs() {
        crate::tests::init();
        let data = vec![0x42u8; 4096];
        for cenc in [lct::Cenc::Zlib, lct::Cenc::Deflate, lct::Cenc::Gzip] {
            let output = super::compress(&data, cenc).unwrap();
            assert!(!output.is_empty());
            assert!(
                output.len() < data.len(),
                "{} did not shrink the buffer",
                cenc.to_str()
            );
        }
    }

    #[test]
    pub fn test_compress_codecs_differ() {
        crate::tests::init();
        let data = b"hello world".to_vec();
        let gzip = super::compress(&data, lct::Cenc::Gzip).unwrap();
        let zlib = super::compress(&data, lct::Cenc::Zlib).unwrap();
        assert_ne!(gzip, zlib);
        // gzip magic number
        assert_eq!(&gzip[..2], &[0x1F, 0x8B]);
    }
}
