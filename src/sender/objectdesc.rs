use base64::Engine;

use super::compress;
use super::toiallocator::Toi;
use crate::common::{fdtinstance, lct, oti};
use crate::tools;
use crate::tools::error::{FluteError, Result};
use std::ffi::OsStr;
use std::io::BufReader;
use std::io::{Read, Seek};
use std::sync::Mutex;
use std::time::SystemTime;

/// Cache behavior the receiver should apply to a file.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum CacheControl {
    /// The receiver should not cache the file.
    NoCache,

    /// The receiver can keep the file for an indefinite period of time,
    /// serving stale versions after they expired.
    MaxStale,

    /// The file expires after this duration.
    Expires(std::time::Duration),

    /// The file expires at this timestamp.
    ExpiresAt(SystemTime),
}

/// Convert a [`CacheControl`] into its FDT XML element.
pub fn create_fdt_cache_control(cc: &CacheControl, now: SystemTime) -> fdtinstance::CacheControl {
    match cc {
        CacheControl::NoCache => fdtinstance::CacheControl {
            value: fdtinstance::CacheControlChoice::NoCache,
        },
        CacheControl::MaxStale => fdtinstance::CacheControl {
            value: fdtinstance::CacheControlChoice::MaxStale,
        },
        CacheControl::Expires(duration) => {
            let expires = now + *duration;
            let ntp = tools::system_time_to_ntp(expires).unwrap_or_default();
            fdtinstance::CacheControl {
                value: fdtinstance::CacheControlChoice::Expires((ntp >> 32) as u32),
            }
        }
        CacheControl::ExpiresAt(timestamp) => {
            let ntp = tools::system_time_to_ntp(*timestamp).unwrap_or_default();
            fdtinstance::CacheControl {
                value: fdtinstance::CacheControlChoice::Expires((ntp >> 32) as u32),
            }
        }
    }
}

/// Transfer speed goal of an object.
#[derive(Debug, Clone)]
pub enum TargetAcquisition {
    /// Transfer the object as fast as possible
    AsFastAsPossible,
    /// Spread the transfer over the specified duration
    WithinDuration(std::time::Duration),
    /// Finish the transfer before the specified timestamp
    WithinTime(SystemTime),
}

/// Seekable stream backing an object.
pub trait ObjectDataStreamTrait:
    std::io::Read + std::io::Seek + Send + Sync + std::fmt::Debug
{
}
impl<T: std::io::Read + std::io::Seek + Send + Sync + std::fmt::Debug> ObjectDataStreamTrait for T {}

impl dyn ObjectDataStreamTrait + '_ {
    /// MD5 of the stream, base64 as used by Content-MD5.
    pub fn md5_base64(&mut self) -> Result<String> {
        let md5 = self.md5()?;
        // https://www.rfc-editor.org/rfc/rfc2616#section-14.15
        Ok(base64::engine::general_purpose::STANDARD.encode(md5.0))
    }

    fn md5(&mut self) -> Result<md5::Digest> {
        self.seek(std::io::SeekFrom::Start(0))?;
        let mut reader = BufReader::new(self);
        let mut context = md5::Context::new();
        let mut buffer = vec![0; 102400];

        loop {
            let count = reader.read(&mut buffer)?;
            if count == 0 {
                break;
            }
            context.consume(&buffer[0..count]);
        }

        reader.seek(std::io::SeekFrom::Start(0))?;
        Ok(context.compute())
    }
}

/// Boxed seekable stream backing an object.
pub type ObjectDataStream = Box<dyn ObjectDataStreamTrait>;

/// Bytes of an object, either in memory or behind a seekable stream.
#[derive(Debug)]
pub enum ObjectDataSource {
    /// Source from a stream.
    ///
    /// Reads are serialized behind a mutex, a stream is never read by two
    /// sessions at the same time.
    Stream(Mutex<ObjectDataStream>),
    /// Source from a buffer
    Buffer(Vec<u8>),
}

impl ObjectDataSource {
    fn from_vec(buffer: Vec<u8>, cenc: lct::Cenc) -> Result<Self> {
        let data = match cenc {
            lct::Cenc::Null => Ok(buffer),
            _ => compress::compress(&buffer, cenc),
        }?;

        Ok(ObjectDataSource::Buffer(data))
    }

    fn from_stream(stream: ObjectDataStream) -> Self {
        ObjectDataSource::Stream(Mutex::new(stream))
    }

    fn len(&mut self) -> Result<u64> {
        match self {
            ObjectDataSource::Buffer(buffer) => Ok(buffer.len() as u64),
            ObjectDataSource::Stream(stream) => {
                let stream = stream.get_mut().unwrap();
                let current_pos = stream.stream_position()?;
                let end_pos = stream.seek(std::io::SeekFrom::End(0))?;
                stream.seek(std::io::SeekFrom::Start(current_pos))?;
                Ok(end_pos)
            }
        }
    }
}

/// Controls how an object is repeatedly transferred in a carousel loop.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CarouselRepeatMode {
    /// Wait for the specified duration at the end of a transfer before
    /// starting the next one.
    DelayBetweenTransfers(std::time::Duration),

    /// Start each transfer at a fixed interval from the start of the
    /// previous one.
    IntervalBetweenStartTimes(std::time::Duration),
}

///
/// Object (file) that can be sent over FLUTE
///
#[derive(Debug)]
pub struct ObjectDesc {
    /// Resource location of this object,
    /// as defined in [rfc2616 14.14](https://www.rfc-editor.org/rfc/rfc2616#section-14.14)
    pub content_location: url::Url,
    /// Data source of the object
    pub source: ObjectDataSource,
    /// Media type of the object,
    /// as defined in [rfc2616 14.17](https://www.rfc-editor.org/rfc/rfc2616#section-14.17)
    pub content_type: String,
    /// Size of the object, before content encoding
    pub content_length: u64,
    /// Size of the object on the wire, after content encoding
    pub transfer_length: u64,
    /// Content encoding (compression) applied to the object
    pub cenc: lct::Cenc,
    /// If `true`, a CENC extension is added to the ALC/LCT packets,
    /// else the content encoding is only described inside the FDT
    pub inband_cenc: bool,
    /// MD5 of the object, base64
    pub md5: Option<String>,
    /// Per-object OTI overriding the default OTI of the FDT
    pub oti: Option<oti::Oti>,
    /// Number of times the object is transferred before expiring
    pub max_transfer_count: u32,
    /// Desired transfer speed of the object.
    /// The per-packet emission of this object is shaped to reach the goal.
    pub target_acquisition: Option<TargetAcquisition>,
    /// When set, the object stays in the carousel and is transferred again
    /// at regular intervals until it is explicitly removed
    pub carousel_mode: Option<CarouselRepeatMode>,
    /// Earliest start time of the first transfer.
    /// If not set, the transfer can start immediately.
    pub transfer_start_time: Option<SystemTime>,
    /// Cache behavior the receiver should apply to this object
    pub cache_control: Option<CacheControl>,
    /// Groups this object belongs to
    pub groups: Option<Vec<String>>,
    /// Pre-allocated TOI of this object
    pub toi: Option<Box<Toi>>,
    /// Insert the Sender Current Time extension inside the ALC/LCT packets
    /// of this object
    pub sender_current_time: bool,
    /// If `true`, the transfer can be stopped before the object was
    /// transferred once, else a started transfer always completes at least
    /// one pass
    pub allow_immediate_stop_before_first_transfer: bool,
}

impl ObjectDesc {
    /// Assign a reserved TOI to this object.
    ///
    /// Without a pre-assigned TOI, one is allocated when the object is added
    /// to the sender.
    pub fn set_toi(&mut self, toi: Box<Toi>) {
        self.toi = Some(toi);
    }

    /// Create an `ObjectDesc` from a file.
    ///
    /// With `cache_in_ram` the whole file is read (and possibly compressed)
    /// immediately, else the file is streamed during the transfer.
    /// Streamed files cannot be combined with a content encoding.
    #[allow(clippy::too_many_arguments)]
    pub fn create_from_file(
        path: &std::path::Path,
        content_location: Option<&url::Url>,
        content_type: &str,
        cache_in_ram: bool,
        max_transfer_count: u32,
        carousel_mode: Option<CarouselRepeatMode>,
        target_acquisition: Option<TargetAcquisition>,
        cache_control: Option<CacheControl>,
        groups: Option<Vec<String>>,
        cenc: lct::Cenc,
        inband_cenc: bool,
        oti: Option<oti::Oti>,
        md5: bool,
    ) -> Result<Box<ObjectDesc>> {
        let content_location = match content_location {
            Some(cl) => cl.clone(),
            None => url::Url::parse(&format!(
                "file:///{}",
                path.file_name()
                    .unwrap_or(OsStr::new(""))
                    .to_str()
                    .unwrap_or("")
            ))
            .unwrap_or_else(|_| url::Url::parse("file:///").unwrap()),
        };

        if cache_in_ram {
            let content = std::fs::read(path)?;
            Self::create_with_content(
                content,
                content_type.to_string(),
                content_location,
                max_transfer_count,
                carousel_mode,
                target_acquisition,
                cache_control,
                groups,
                cenc,
                inband_cenc,
                oti,
                md5,
            )
        } else {
            if cenc != lct::Cenc::Null {
                return Err(FluteError::invalid(
                    "Compressed object is not compatible with a streamed file",
                ));
            }
            let file = std::fs::File::open(path)?;
            Self::create_from_stream(
                Box::new(file),
                content_type,
                &content_location,
                max_transfer_count,
                carousel_mode,
                target_acquisition,
                cache_control,
                groups,
                inband_cenc,
                oti,
                md5,
            )
        }
    }

    /// Create an `ObjectDesc` from a seekable stream.
    ///
    /// The stream is transferred without content encoding.
    #[allow(clippy::too_many_arguments)]
    pub fn create_from_stream(
        mut stream: ObjectDataStream,
        content_type: &str,
        content_location: &url::Url,
        max_transfer_count: u32,
        carousel_mode: Option<CarouselRepeatMode>,
        target_acquisition: Option<TargetAcquisition>,
        cache_control: Option<CacheControl>,
        groups: Option<Vec<String>>,
        inband_cenc: bool,
        oti: Option<oti::Oti>,
        md5: bool,
    ) -> Result<Box<ObjectDesc>> {
        let md5 = match md5 {
            true => Some(stream.md5_base64()?),
            false => None,
        };

        let mut source = ObjectDataSource::from_stream(stream);
        let transfer_length = source.len()?;

        Ok(Box::new(ObjectDesc {
            content_location: content_location.clone(),
            source,
            content_type: content_type.to_string(),
            content_length: transfer_length,
            transfer_length,
            cenc: lct::Cenc::Null,
            inband_cenc,
            md5,
            oti,
            max_transfer_count,
            carousel_mode,
            target_acquisition,
            transfer_start_time: None,
            cache_control,
            groups,
            toi: None,
            sender_current_time: false,
            allow_immediate_stop_before_first_transfer: false,
        }))
    }

    /// Create an `ObjectDesc` from a buffer.
    ///
    /// The content encoding, when requested, is applied immediately.
    #[allow(clippy::too_many_arguments)]
    pub fn create_from_buffer(
        content: Vec<u8>,
        content_type: &str,
        content_location: &url::Url,
        max_transfer_count: u32,
        carousel_mode: Option<CarouselRepeatMode>,
        target_acquisition: Option<TargetAcquisition>,
        cache_control: Option<CacheControl>,
        groups: Option<Vec<String>>,
        cenc: lct::Cenc,
        inband_cenc: bool,
        oti: Option<oti::Oti>,
        md5: bool,
    ) -> Result<Box<ObjectDesc>> {
        ObjectDesc::create_with_content(
            content,
            content_type.to_string(),
            content_location.clone(),
            max_transfer_count,
            carousel_mode,
            target_acquisition,
            cache_control,
            groups,
            cenc,
            inband_cenc,
            oti,
            md5,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn create_with_content(
        content: Vec<u8>,
        content_type: String,
        content_location: url::Url,
        max_transfer_count: u32,
        carousel_mode: Option<CarouselRepeatMode>,
        target_acquisition: Option<TargetAcquisition>,
        cache_control: Option<CacheControl>,
        groups: Option<Vec<String>>,
        cenc: lct::Cenc,
        inband_cenc: bool,
        oti: Option<oti::Oti>,
        md5: bool,
    ) -> Result<Box<ObjectDesc>> {
        let content_length = content.len() as u64;

        let md5 = match md5 {
            // https://www.rfc-editor.org/rfc/rfc2616#section-14.15
            true => {
                Some(base64::engine::general_purpose::STANDARD.encode(md5::compute(&content).0))
            }
            false => None,
        };

        let mut source = ObjectDataSource::from_vec(content, cenc)?;
        let transfer_length = source.len()?;

        Ok(Box::new(ObjectDesc {
            content_location,
            source,
            content_type,
            content_length,
            transfer_length,
            cenc,
            inband_cenc,
            md5,
            oti,
            max_transfer_count,
            carousel_mode,
            target_acquisition,
            transfer_start_time: None,
            cache_control,
            groups,
            toi: None,
            sender_current_time: false,
            allow_immediate_stop_before_first_transfer: false,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::{ObjectDataSource, ObjectDesc};
    use crate::common::lct;
    use std::io::Write;

    #[test]
    pub fn test_object_from_buffer_cenc() {
        crate::tests::init();
        let content = vec![0u8; 10000];
        let obj = ObjectDesc::create_from_buffer(
            content,
            "application/octet-stream",
            &url::Url::parse("file:///test.bin").unwrap(),
            1,
            None,
            None,
            None,
            None,
            lct::Cenc::Gzip,
            true,
            None,
            true,
        )
        .unwrap();

        assert_eq!(obj.content_length, 10000);
        assert!(obj.transfer_length < obj.content_length);
        assert!(obj.md5.is_some());
        match &obj.source {
            ObjectDataSource::Buffer(buffer) => {
                assert_eq!(buffer.len() as u64, obj.transfer_length)
            }
            _ => panic!("expected a buffer source"),
        }
    }

    #[test]
    pub fn test_object_from_stream() {
        crate::tests::init();
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(&[42u8; 2048]).unwrap();

        let obj = ObjectDesc::create_from_stream(
            Box::new(file),
            "application/octet-stream",
            &url::Url::parse("file:///stream.bin").unwrap(),
            1,
            None,
            None,
            None,
            None,
            true,
            None,
            true,
        )
        .unwrap();

        assert_eq!(obj.transfer_length, 2048);
        assert_eq!(obj.cenc, lct::Cenc::Null);
    }

    #[test]
    pub fn test_object_stream_with_cenc_is_rejected() {
        crate::tests::init();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[1u8; 16]).unwrap();

        let res = ObjectDesc::create_from_file(
            file.path(),
            None,
            "application/octet-stream",
            false,
            1,
            None,
            None,
            None,
            None,
            lct::Cenc::Gzip,
            true,
            None,
            false,
        );
        assert!(res.is_err());
    }
}
