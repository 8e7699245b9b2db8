use super::filedesc::FileDesc;
use super::objectdesc::{self, CarouselRepeatMode};
use super::observer::{self, ObserverList};
use super::sender::FdtPublishMode;
use super::toiallocator::{Toi, ToiAllocator};
use super::ToiMaxLength;
use crate::common::{fdtinstance::FdtInstance, lct, oti};
use crate::tools;
use crate::tools::error::{FluteError, Result};
use crate::tools::uint128::Uint128;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Lifetime of the FDT and catalog of the objects it describes.
#[derive(Debug)]
pub struct Fdt {
    tsi: u64,
    fdt_id: u32,
    oti: oti::Oti,
    files_transfer_queue: VecDeque<Arc<FileDesc>>,
    fdt_transfer_queue: VecDeque<Arc<FileDesc>>,
    files: HashMap<Uint128, Arc<FileDesc>>,
    current_fdt_transfer: Option<Arc<FileDesc>>,
    complete: Option<bool>,
    cenc: lct::Cenc,
    duration: Duration,
    carousel_mode: CarouselRepeatMode,
    inband_sct: bool,
    last_publish: Option<SystemTime>,
    observers: ObserverList,
    groups: Option<Vec<String>>,
    toi_allocator: Arc<ToiAllocator>,
    publish_mode: FdtPublishMode,
}

impl Fdt {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tsi: u64,
        fdt_id: u32,
        default_oti: &oti::Oti,
        cenc: lct::Cenc,
        duration: Duration,
        carousel_mode: CarouselRepeatMode,
        inband_sct: bool,
        observers: ObserverList,
        toi_max_length: ToiMaxLength,
        toi_initial_value: Option<Uint128>,
        groups: Option<Vec<String>>,
        publish_mode: FdtPublishMode,
    ) -> Fdt {
        Fdt {
            tsi,
            fdt_id,
            oti: default_oti.clone(),
            files_transfer_queue: VecDeque::new(),
            fdt_transfer_queue: VecDeque::new(),
            files: HashMap::new(),
            current_fdt_transfer: None,
            complete: None,
            cenc,
            duration,
            carousel_mode,
            inband_sct,
            last_publish: None,
            observers,
            groups,
            toi_allocator: ToiAllocator::new(toi_max_length, toi_initial_value),
            publish_mode,
        }
    }

    fn get_fdt_instance(&self, now: SystemTime) -> FdtInstance {
        let ntp = tools::system_time_to_ntp(now).unwrap_or(0);
        let expires_ntp = (ntp >> 32) + self.duration.as_secs();

        let oti_attributes = self.oti.get_attributes();

        let mut files: Vec<&Arc<FileDesc>> = match self.publish_mode {
            FdtPublishMode::ObjectsBeingTransferred => self
                .files
                .values()
                .filter(|desc| desc.is_transferring())
                .collect(),
            FdtPublishMode::FullFdt => self.files.values().collect(),
        };
        // Stable document output
        files.sort_by_key(|desc| desc.toi);

        FdtInstance {
            expires: expires_ntp.to_string(),
            complete: self.complete,
            fec_oti_fec_encoding_id: oti_attributes.fec_oti_fec_encoding_id,
            fec_oti_fec_instance_id: oti_attributes.fec_oti_fec_instance_id,
            fec_oti_maximum_source_block_length: oti_attributes
                .fec_oti_maximum_source_block_length,
            fec_oti_encoding_symbol_length: oti_attributes.fec_oti_encoding_symbol_length,
            fec_oti_max_number_of_encoding_symbols: oti_attributes
                .fec_oti_max_number_of_encoding_symbols,
            fec_oti_scheme_specific_info: oti_attributes.fec_oti_scheme_specific_info,
            group: self.groups.clone(),
            file: Some(files.iter().map(|desc| desc.to_file_xml(now)).collect()),
        }
    }

    pub fn allocate_toi(&mut self) -> Box<Toi> {
        ToiAllocator::allocate(&self.toi_allocator)
    }

    pub fn add_object(
        &mut self,
        priority: u32,
        mut obj: Box<objectdesc::ObjectDesc>,
    ) -> Result<Uint128> {
        if self.complete == Some(true) {
            return Err(FluteError::FdtComplete);
        }

        if obj.toi.is_none() {
            obj.set_toi(self.allocate_toi());
        }

        let filedesc = Arc::new(FileDesc::new(priority, obj, &self.oti, None, false)?);
        if self.files.contains_key(&filedesc.toi) {
            return Err(FluteError::DuplicateToi(filedesc.toi.to_string()));
        }

        let toi = filedesc.toi;
        self.files.insert(toi, filedesc.clone());
        self.files_transfer_queue.push_back(filedesc);
        Ok(toi)
    }

    pub fn is_added(&self, toi: Uint128) -> bool {
        self.files.contains_key(&toi)
    }

    pub fn remove_object(&mut self, toi: Uint128) -> bool {
        if self.files.remove(&toi).is_none() {
            return false;
        }
        self.files_transfer_queue.retain(|obj| obj.toi != toi);
        true
    }

    pub fn trigger_transfer_at(&mut self, toi: Uint128, start_time: Option<SystemTime>) -> bool {
        let filedesc = match self.files.get(&toi) {
            Some(filedesc) => filedesc,
            None => return false,
        };
        if filedesc.is_transferring() {
            return true;
        }
        filedesc.reset_last_transfer(start_time);
        true
    }

    pub fn nb_transfers(&self, toi: Uint128) -> Option<u64> {
        self.files.get(&toi).map(|desc| desc.total_nb_transfer())
    }

    pub fn nb_objects(&self) -> usize {
        self.files.len()
    }

    pub fn get_objects_in_fdt(&self) -> HashMap<Uint128, &objectdesc::ObjectDesc> {
        self.files
            .iter()
            .map(|(toi, desc)| (*toi, desc.object.as_ref()))
            .collect()
    }

    pub fn publish(&mut self, now: SystemTime) -> Result<()> {
        log::debug!("TSI={} Publish a new FDT instance {}", self.tsi, self.fdt_id);
        let content = self.to_xml(now)?;
        let mut obj = objectdesc::ObjectDesc::create_from_buffer(
            content,
            "text/xml",
            &url::Url::parse("file:///").unwrap(),
            1,
            Some(self.carousel_mode),
            None,
            None,
            self.groups.clone(),
            self.cenc,
            true,
            None,
            true,
        )?;
        obj.set_toi(ToiAllocator::allocate_toi_fdt(&self.toi_allocator));
        let filedesc = Arc::new(FileDesc::new(
            0,
            obj,
            &self.oti,
            Some(self.fdt_id),
            self.inband_sct,
        )?);
        filedesc.set_published();
        self.fdt_transfer_queue.push_back(filedesc);
        self.fdt_id = (self.fdt_id + 1) & 0xFFFFF;
        self.last_publish = Some(now);

        for filedesc in self.files.values() {
            filedesc.set_published();
        }
        Ok(())
    }

    pub fn need_transfer_fdt(&self) -> bool {
        !self.fdt_transfer_queue.is_empty()
    }

    fn current_fdt_will_expire(&self, now: SystemTime) -> bool {
        if !self.fdt_transfer_queue.is_empty() {
            return false;
        }

        if self.current_fdt_transfer.is_none() || self.last_publish.is_none() {
            return true;
        }

        let elapsed = now
            .duration_since(self.last_publish.unwrap())
            .unwrap_or_default();

        if self.duration > Duration::from_secs(30) {
            return self.duration + Duration::from_secs(5) < elapsed;
        }
        self.duration <= elapsed
    }

    pub fn get_next_fdt_transfer(&mut self, now: SystemTime) -> Option<Arc<FileDesc>> {
        if let Some(current) = self.current_fdt_transfer.as_ref() {
            if current.is_transferring() {
                return None;
            }
        }

        if self.current_fdt_will_expire(now) {
            log::debug!("FDT will expire soon, publish a new version");
            self.publish(now).ok();
        }

        if !self.fdt_transfer_queue.is_empty() {
            self.current_fdt_transfer = self.fdt_transfer_queue.pop_front();
        }

        match &self.current_fdt_transfer {
            Some(value) if value.should_transfer_now(0, self.publish_mode, now) => {
                log::debug!("TSI={} Start transmission of the FDT", self.tsi);
                value.transfer_started(now);
                Some(value.clone())
            }
            _ => None,
        }
    }

    pub fn get_next_file_transfer(&mut self, priority: u32, now: SystemTime) -> Option<Arc<FileDesc>> {
        let index = self
            .files_transfer_queue
            .iter()
            .position(|item| item.should_transfer_now(priority, self.publish_mode, now))?;

        let file = self.files_transfer_queue.remove(index).unwrap();
        log::info!(
            "Start transmission of {}",
            file.object.content_location.as_str()
        );

        let evt = observer::Event::StartTransfer(observer::FileInfo { toi: file.toi });
        self.observers.dispatch(&evt, now);

        file.transfer_started(now);

        if self.publish_mode == FdtPublishMode::ObjectsBeingTransferred {
            self.publish(now).ok();
        }

        Some(file)
    }

    pub fn transfer_done(&mut self, file: Arc<FileDesc>, now: SystemTime) {
        file.transfer_done(now);

        if file.toi == lct::TOI_FDT {
            log::debug!("TSI={} Stop transmission of the FDT", self.tsi);
            if file.is_expired() {
                self.current_fdt_transfer = None;
            }
            return;
        }

        let evt = observer::Event::StopTransfer(observer::FileInfo { toi: file.toi });
        self.observers.dispatch(&evt, now);

        if !self.files.contains_key(&file.toi) {
            log::debug!("Transfer is finished and the file was removed from the FDT");
            return;
        }

        log::info!(
            "Stop transmission of {}",
            file.object.content_location.as_str()
        );
        if !file.is_expired() {
            self.files_transfer_queue.push_back(file);
        } else {
            self.files.remove(&file.toi);
        }
    }

    pub fn set_complete(&mut self) {
        self.complete = Some(true)
    }

    pub fn to_xml(&self, now: SystemTime) -> Result<Vec<u8>> {
        let mut buffer = ToFmtWrite(Vec::new());
        let mut writer = quick_xml::Writer::new(&mut buffer);

        writer
            .write_event(quick_xml::events::Event::Decl(
                quick_xml::events::BytesDecl::new("1.0", Some("UTF-8"), None),
            ))
            .map_err(|e| FluteError::invalid(e.to_string()))?;

        let ser = quick_xml::se::Serializer::with_root(&mut buffer, Some("FDT-Instance"))
            .map_err(|e| FluteError::invalid(e.to_string()))?;
        self.get_fdt_instance(now)
            .serialize(ser)
            .map_err(|e| FluteError::invalid(e.to_string()))?;

        Ok(buffer.0)
    }
}

struct ToFmtWrite<T>(pub T);

impl<T> std::fmt::Write for ToFmtWrite<T>
where
    T: std::io::Write,
{
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        self.0.write_all(s.as_bytes()).map_err(|_| std::fmt::Error)
    }
}

impl<T> std::io::Write for ToFmtWrite<T>
where
    T: std::io::Write,
{
    fn flush(&mut self) -> std::io::Result<()> {
        self.0.flush()
    }

    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.write(buf)
    }
}
