use super::blockencoder::BlockEncoder;
use super::fdt::Fdt;
use super::filedesc::FileDesc;
use crate::common::{alc, Profile};
use crate::tools::uint128::Uint128;
use std::sync::Arc;
use std::time::SystemTime;

/// One lane of the packet scheduler, transferring one object at a time.
#[derive(Debug)]
pub struct SenderSession {
    priority: u32,
    tsi: u64,
    file: Option<Arc<FileDesc>>,
    encoder: Option<BlockEncoder>,
    interleave_blocks: usize,
    transfer_fdt_only: bool,
    profile: Profile,
}

impl SenderSession {
    pub fn new(
        priority: u32,
        tsi: u64,
        interleave_blocks: usize,
        transfer_fdt_only: bool,
        profile: Profile,
    ) -> SenderSession {
        SenderSession {
            priority,
            tsi,
            file: None,
            encoder: None,
            interleave_blocks,
            transfer_fdt_only,
            profile,
        }
    }

    pub fn run(&mut self, fdt: &mut Fdt, now: SystemTime) -> Option<Vec<u8>> {
        loop {
            if self.encoder.is_none() {
                self.get_next(fdt, now);
            }

            let (file, encoder) = match (&self.file, &mut self.encoder) {
                (Some(file), Some(encoder)) => (file.clone(), encoder),
                _ => return None,
            };

            // Let the FDT lane announce a pending FDT before more object
            // packets are emitted
            if !self.transfer_fdt_only && fdt.need_transfer_fdt() {
                return None;
            }

            let must_stop_transfer =
                !self.transfer_fdt_only && file.can_transfer_be_stopped() && !fdt.is_added(file.toi);
            if must_stop_transfer {
                log::info!(
                    "File was removed from the FDT, stop the transfer of {}",
                    file.object.content_location.as_str()
                );
            }

            // Rate-shaped silence
            if let Some(next_timestamp) = file.next_transfer_timestamp() {
                if next_timestamp > now {
                    return None;
                }
            }

            let pkt = encoder.read(must_stop_transfer);
            if pkt.is_none() {
                self.release_file(fdt, now);
                continue;
            }

            file.inc_next_transfer_timestamp();

            let pkt = pkt.as_ref().unwrap();
            return Some(alc::new_alc_pkt(
                &file.oti,
                &Uint128::ZERO,
                self.tsi,
                pkt,
                self.profile,
                now,
            ));
        }
    }

    fn get_next(&mut self, fdt: &mut Fdt, now: SystemTime) {
        self.encoder = None;
        if self.transfer_fdt_only {
            self.file = fdt.get_next_fdt_transfer(now);
        } else {
            self.file = fdt.get_next_file_transfer(self.priority, now);
        }

        let file = match &self.file {
            Some(file) => file.clone(),
            None => return,
        };

        let closable_object = file.is_last_transfer();
        match BlockEncoder::new(file, self.interleave_blocks, closable_object) {
            Ok(encoder) => self.encoder = Some(encoder),
            Err(e) => {
                log::error!("Fail to create a block encoder: {:?}", e);
                self.release_file(fdt, now);
            }
        }
    }

    fn release_file(&mut self, fdt: &mut Fdt, now: SystemTime) {
        if let Some(file) = &self.file {
            fdt.transfer_done(file.clone(), now);
        }
        self.file = None;
        self.encoder = None;
    }
}
