use super::objectdesc::{self, CarouselRepeatMode, ObjectDesc, TargetAcquisition};
use super::sender::FdtPublishMode;
use crate::common::{fdtinstance, oti};
use crate::tools::error::{FluteError, Result};
use crate::tools::uint128::Uint128;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use std::time::{Duration, SystemTime};

#[derive(Debug)]
struct TransferInfo {
    transferring: bool,
    transfer_count: u32,
    total_nb_transfer: u64,
    last_transfer_start_time: Option<SystemTime>,
    last_transfer_end_time: Option<SystemTime>,
    next_transfer_timestamp: Option<SystemTime>,
    packet_transmission_tick: Option<Duration>,
    transfer_start_time: Option<SystemTime>,
}

impl TransferInfo {
    fn started(&mut self, object: &ObjectDesc, oti: &oti::Oti, now: SystemTime) {
        self.transferring = true;
        self.last_transfer_start_time = Some(now);

        self.packet_transmission_tick = match &object.target_acquisition {
            Some(TargetAcquisition::WithinDuration(duration)) => {
                packet_tick(*duration, object.transfer_length, oti)
            }
            Some(TargetAcquisition::WithinTime(deadline)) => {
                let window = deadline.duration_since(now).unwrap_or_else(|_| {
                    log::warn!("Target acquisition time is already reached");
                    Duration::ZERO
                });
                packet_tick(window, object.transfer_length, oti)
            }
            Some(TargetAcquisition::AsFastAsPossible) | None => None,
        };
        self.next_transfer_timestamp = self.packet_transmission_tick.map(|_| now);

        // New carousel pass
        if object.max_transfer_count > 0
            && object.carousel_mode.is_some()
            && self.transfer_count == object.max_transfer_count
        {
            self.transfer_count = 0;
        }
    }

    fn done(&mut self, now: SystemTime) {
        self.transferring = false;
        self.transfer_count += 1;
        self.total_nb_transfer += 1;
        self.last_transfer_end_time = Some(now);
    }

    fn tick(&mut self) {
        if let (Some(next), Some(tick)) = (self.next_transfer_timestamp, self.packet_transmission_tick)
        {
            self.next_transfer_timestamp = Some(next + tick);
        }
    }
}

/// Rate-shaping interval so that the transfer spans `window`.
fn packet_tick(window: Duration, transfer_length: u64, oti: &oti::Oti) -> Option<Duration> {
    let nb_packets = num_integer::div_ceil(transfer_length, oti.encoding_symbol_length as u64);
    if nb_packets == 0 {
        return None;
    }
    Some(window / nb_packets as u32)
}

/// An object owned by the FDT, with its effective OTI, TOI and transfer
/// bookkeeping.
#[derive(Debug)]
pub struct FileDesc {
    pub priority: u32,
    pub object: Box<ObjectDesc>,
    pub oti: oti::Oti,
    pub toi: Uint128,
    pub fdt_id: Option<u32>,
    pub sender_current_time: bool,
    published: AtomicBool,
    transfer_info: RwLock<TransferInfo>,
}

impl FileDesc {
    pub fn new(
        priority: u32,
        object: Box<ObjectDesc>,
        default_oti: &oti::Oti,
        fdt_id: Option<u32>,
        sender_current_time: bool,
    ) -> Result<FileDesc> {
        let toi = match object.toi.as_ref() {
            Some(toi) => toi.get(),
            None => return Err(FluteError::invalid("Object TOI is not allocated")),
        };

        let oti = match &object.oti {
            Some(oti) => oti.clone(),
            None => default_oti.clone(),
        };

        let max_transfer_length = oti.max_transfer_length();
        if object.transfer_length > max_transfer_length {
            return Err(FluteError::InvalidConfiguration(format!(
                "Object transfer length of {} is bigger than {}, so is incompatible with the parameters of your OTI",
                object.transfer_length, max_transfer_length
            )));
        }

        let transfer_start_time = object.transfer_start_time;
        let sender_current_time = sender_current_time || object.sender_current_time;
        Ok(FileDesc {
            priority,
            object,
            oti,
            toi,
            fdt_id,
            sender_current_time,
            published: AtomicBool::new(false),
            transfer_info: RwLock::new(TransferInfo {
                transferring: false,
                transfer_count: 0,
                total_nb_transfer: 0,
                last_transfer_start_time: None,
                last_transfer_end_time: None,
                next_transfer_timestamp: None,
                packet_transmission_tick: None,
                transfer_start_time,
            }),
        })
    }

    pub fn total_nb_transfer(&self) -> u64 {
        let info = self.transfer_info.read().unwrap();
        info.total_nb_transfer
    }

    /// A transfer can be interrupted mid-flight only after the object was
    /// fully transferred once, unless the object explicitly allows it.
    pub fn can_transfer_be_stopped(&self) -> bool {
        self.object.allow_immediate_stop_before_first_transfer || self.total_nb_transfer() > 0
    }

    pub fn transfer_started(&self, now: SystemTime) {
        let mut info = self.transfer_info.write().unwrap();
        info.started(&self.object, &self.oti, now);
    }

    pub fn transfer_done(&self, now: SystemTime) {
        let mut info = self.transfer_info.write().unwrap();
        debug_assert!(info.transferring);
        info.done(now);
    }

    pub fn is_expired(&self) -> bool {
        let info = self.transfer_info.read().unwrap();
        if self.object.max_transfer_count > info.transfer_count {
            return false;
        }
        self.object.carousel_mode.is_none()
    }

    pub fn is_transferring(&self) -> bool {
        let info = self.transfer_info.read().unwrap();
        info.transferring
    }

    /// True when the coming transfer pass is the last one, so the final
    /// packet of the pass can carry the close-object flag.
    pub fn is_last_transfer(&self) -> bool {
        if self.object.carousel_mode.is_some() || self.object.max_transfer_count == 0 {
            return false;
        }
        let info = self.transfer_info.read().unwrap();
        info.transfer_count + 1 >= self.object.max_transfer_count
    }

    pub fn next_transfer_timestamp(&self) -> Option<SystemTime> {
        let info = self.transfer_info.read().unwrap();
        info.next_transfer_timestamp
    }

    pub fn inc_next_transfer_timestamp(&self) {
        let mut info = self.transfer_info.write().unwrap();
        info.tick();
    }

    /// Forget the previous transfers so the carousel re-transfers the object,
    /// optionally not before `start_time`.
    pub fn reset_last_transfer(&self, start_time: Option<SystemTime>) {
        let mut info = self.transfer_info.write().unwrap();
        info.last_transfer_start_time = None;
        info.last_transfer_end_time = None;
        if start_time.is_some() {
            info.transfer_start_time = start_time;
        }
    }

    pub fn should_transfer_now(&self, priority: u32, mode: FdtPublishMode, now: SystemTime) -> bool {
        if self.priority != priority {
            return false;
        }

        if mode == FdtPublishMode::FullFdt && !self.is_published() {
            log::warn!("File with TOI {} is not published yet", self.toi);
            return false;
        }

        let info = self.transfer_info.read().unwrap();

        if let Some(start_time) = info.transfer_start_time {
            if now < start_time {
                return false;
            }
        }

        if info.transferring {
            return false;
        }

        if self.object.max_transfer_count > info.transfer_count {
            return true;
        }

        if self.object.carousel_mode.is_none()
            || info.last_transfer_end_time.is_none()
            || info.last_transfer_start_time.is_none()
        {
            return true;
        }

        let (last, interval) = match self.object.carousel_mode.as_ref().unwrap() {
            CarouselRepeatMode::DelayBetweenTransfers(interval) => {
                (info.last_transfer_end_time.unwrap(), *interval)
            }
            CarouselRepeatMode::IntervalBetweenStartTimes(interval) => {
                (info.last_transfer_start_time.unwrap(), *interval)
            }
        };
        now.duration_since(last).unwrap_or_default() > interval
    }

    pub fn is_published(&self) -> bool {
        self.published.load(Ordering::Relaxed)
    }

    pub fn set_published(&self) {
        self.published.store(true, Ordering::Relaxed);
    }

    pub fn to_file_xml(&self, now: SystemTime) -> fdtinstance::File {
        let oti_attributes = self.object.oti.as_ref().map(|oti| oti.get_attributes());

        fdtinstance::File {
            content_location: self.object.content_location.to_string(),
            toi: self.toi.to_string(),
            content_length: Some(self.object.content_length),
            transfer_length: Some(self.object.transfer_length),
            content_type: Some(self.object.content_type.clone()),
            content_encoding: Some(self.object.cenc.to_str().to_string()),
            content_md5: self.object.md5.clone(),
            fec_oti_fec_encoding_id: oti_attributes
                .as_ref()
                .and_then(|f| f.fec_oti_fec_encoding_id),
            fec_oti_fec_instance_id: oti_attributes
                .as_ref()
                .and_then(|f| f.fec_oti_fec_instance_id),
            fec_oti_maximum_source_block_length: oti_attributes
                .as_ref()
                .and_then(|f| f.fec_oti_maximum_source_block_length),
            fec_oti_encoding_symbol_length: oti_attributes
                .as_ref()
                .and_then(|f| f.fec_oti_encoding_symbol_length),
            fec_oti_max_number_of_encoding_symbols: oti_attributes
                .as_ref()
                .and_then(|f| f.fec_oti_max_number_of_encoding_symbols),
            fec_oti_scheme_specific_info: oti_attributes
                .and_then(|f| f.fec_oti_scheme_specific_info),
            cache_control: self
                .object
                .cache_control
                .as_ref()
                .map(|cc| objectdesc::create_fdt_cache_control(cc, now)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FileDesc;
    use crate::common::{lct, oti};
    use crate::sender::toiallocator::ToiAllocator;
    use crate::sender::{CarouselRepeatMode, FdtPublishMode, ObjectDesc, ToiMaxLength};
    use crate::tools::uint128::Uint128;
    use std::time::{Duration, SystemTime};

    fn create_filedesc(
        size: usize,
        max_transfer_count: u32,
        carousel_mode: Option<CarouselRepeatMode>,
    ) -> FileDesc {
        let allocator = ToiAllocator::new(ToiMaxLength::ToiMax112, Some(Uint128::from(1)));
        let mut obj = ObjectDesc::create_from_buffer(
            vec![0; size],
            "application/octet-stream",
            &url::Url::parse("file:///object").unwrap(),
            max_transfer_count,
            carousel_mode,
            None,
            None,
            None,
            lct::Cenc::Null,
            true,
            None,
            false,
        )
        .unwrap();
        obj.set_toi(ToiAllocator::allocate(&allocator));
        let filedesc = FileDesc::new(0, obj, &Default::default(), None, false).unwrap();
        filedesc.set_published();
        filedesc
    }

    #[test]
    pub fn test_filedesc_expiry() {
        crate::tests::init();
        let now = SystemTime::now();
        let filedesc = create_filedesc(1024, 2, None);
        assert!(!filedesc.is_expired());

        filedesc.transfer_started(now);
        assert!(filedesc.is_transferring());
        filedesc.transfer_done(now);
        assert!(!filedesc.is_expired());

        filedesc.transfer_started(now);
        filedesc.transfer_done(now);
        assert!(filedesc.is_expired());
        assert_eq!(filedesc.total_nb_transfer(), 2);
    }

    #[test]
    pub fn test_filedesc_carousel_delay() {
        crate::tests::init();
        let now = SystemTime::now();
        let delay = Duration::from_millis(500);
        let filedesc =
            create_filedesc(1024, 1, Some(CarouselRepeatMode::DelayBetweenTransfers(delay)));

        assert!(filedesc.should_transfer_now(0, FdtPublishMode::FullFdt, now));
        filedesc.transfer_started(now);
        filedesc.transfer_done(now);

        assert!(!filedesc.is_expired());
        assert!(!filedesc.should_transfer_now(0, FdtPublishMode::FullFdt, now));
        assert!(!filedesc
            .should_transfer_now(0, FdtPublishMode::FullFdt, now + Duration::from_millis(400)));
        assert!(filedesc
            .should_transfer_now(0, FdtPublishMode::FullFdt, now + Duration::from_millis(600)));
    }

    #[test]
    pub fn test_filedesc_wrong_priority() {
        crate::tests::init();
        let now = SystemTime::now();
        let filedesc = create_filedesc(1024, 1, None);
        assert!(!filedesc.should_transfer_now(1, FdtPublishMode::FullFdt, now));
    }

    #[test]
    pub fn test_filedesc_too_large() {
        crate::tests::init();
        let oti = oti::Oti::new_no_code(4, 2);
        let allocator = ToiAllocator::new(ToiMaxLength::ToiMax112, Some(Uint128::from(1)));
        let mut obj = ObjectDesc::create_from_buffer(
            vec![0; oti.max_transfer_length() as usize + 1],
            "application/octet-stream",
            &url::Url::parse("file:///object").unwrap(),
            1,
            None,
            None,
            None,
            None,
            lct::Cenc::Null,
            true,
            None,
            false,
        )
        .unwrap();
        obj.set_toi(ToiAllocator::allocate(&allocator));
        assert!(FileDesc::new(0, obj, &oti, None, false).is_err());
    }
}
