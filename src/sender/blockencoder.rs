use std::io::{Read, Seek};
use std::sync::Arc;

use super::block::Block;
use super::filedesc::FileDesc;
use super::objectdesc::ObjectDataSource;
use crate::common::partition::BlockPartitioning;
use crate::common::pkt;
use crate::tools::error::{FluteError, Result};

/// Produces the encoding symbols of one object transfer.
///
/// Pulls the object bytes block by block into a bounded window and
/// multiplexes the symbols of the window round-robin, so a burst of lost
/// datagrams does not concentrate on a single source block.
#[derive(Debug)]
pub struct BlockEncoder {
    file: Arc<FileDesc>,
    partitioning: BlockPartitioning,
    curr_content_offset: u64,
    curr_sbn: u32,
    blocks: Vec<Box<Block>>,
    window_size: usize,
    window_index: usize,
    read_end: bool,
    source_size_transferred: usize,
    nb_pkt_sent: usize,
    stopped: bool,
    closable_object: bool,
}

impl BlockEncoder {
    pub fn new(
        file: Arc<FileDesc>,
        window_size: usize,
        closable_object: bool,
    ) -> Result<BlockEncoder> {
        match &file.object.source {
            ObjectDataSource::Buffer(_) => {}
            ObjectDataSource::Stream(stream) => {
                stream.lock().unwrap().seek(std::io::SeekFrom::Start(0))?;
            }
        }

        let oti = &file.oti;
        let partitioning = BlockPartitioning::compute(
            oti.maximum_source_block_length as u64,
            file.object.transfer_length,
            oti.encoding_symbol_length as u64,
        )?;

        Ok(BlockEncoder {
            file,
            partitioning,
            curr_content_offset: 0,
            curr_sbn: 0,
            blocks: Vec::new(),
            window_size: window_size.max(1),
            window_index: 0,
            read_end: false,
            source_size_transferred: 0,
            nb_pkt_sent: 0,
            stopped: false,
            closable_object,
        })
    }

    pub fn read(&mut self, force_close_object: bool) -> Option<pkt::Pkt> {
        if self.stopped {
            return None;
        }

        if force_close_object {
            self.stopped = true;
        }

        loop {
            self.read_window();

            if self.blocks.is_empty() {
                if self.nb_pkt_sent == 0 {
                    log::debug!("Empty object, send a single packet with the close-object flag");
                    self.nb_pkt_sent += 1;

                    debug_assert!(self.file.object.transfer_length == 0);
                    return Some(pkt::Pkt {
                        payload: Vec::new(),
                        transfer_length: self.file.object.transfer_length,
                        esi: 0,
                        sbn: 0,
                        toi: self.file.toi,
                        fdt_id: self.file.fdt_id,
                        cenc: self.file.object.cenc,
                        inband_cenc: self.file.object.inband_cenc,
                        close_object: true,
                        source_block_length: 0,
                        sender_current_time: self.file.sender_current_time,
                    });
                }

                return None;
            }

            if self.window_index >= self.blocks.len() {
                self.window_index = 0;
            }

            let block = &mut self.blocks[self.window_index];
            let symbol = block.read();
            if symbol.is_none() {
                // The next block takes this slot, do not advance the index
                self.blocks.remove(self.window_index);
                continue;
            }

            let (symbol, is_last_symbol) = symbol.unwrap();

            self.window_index += 1;
            if symbol.is_source_symbol {
                self.source_size_transferred += symbol.symbols.len();
            }

            self.nb_pkt_sent += 1;

            let is_last_packet = is_last_symbol
                && (self.source_size_transferred >= self.file.object.transfer_length as usize);

            return Some(pkt::Pkt {
                payload: symbol.symbols.to_vec(),
                transfer_length: self.file.object.transfer_length,
                esi: symbol.esi,
                sbn: symbol.sbn,
                toi: self.file.toi,
                fdt_id: self.file.fdt_id,
                cenc: self.file.object.cenc,
                inband_cenc: self.file.object.inband_cenc,
                close_object: force_close_object || (self.closable_object && is_last_packet),
                source_block_length: block.nb_source_symbols as u32,
                sender_current_time: self.file.sender_current_time,
            });
        }
    }

    fn read_block(&mut self) -> Result<()> {
        debug_assert!(!self.read_end);
        match &self.file.object.source {
            ObjectDataSource::Buffer(_) => self.read_block_buffer(),
            ObjectDataSource::Stream(_) => self.read_block_stream(),
        }
    }

    fn read_block_buffer(&mut self) -> Result<()> {
        log::debug!("Read block nb {}", self.curr_sbn);

        let content = match &self.file.object.source {
            ObjectDataSource::Buffer(buffer) => Ok(buffer),
            _ => Err(FluteError::invalid("Not a data source buffer")),
        }?;

        let oti = &self.file.oti;
        let nb_symbols = self.partitioning.nb_source_symbols(self.curr_sbn);

        let offset_start = self.curr_content_offset as usize;
        let offset_end = offset_start + self.partitioning.block_size(self.curr_sbn) as usize;
        debug_assert!(offset_end <= content.len());

        let buffer = &content.as_slice()[offset_start..offset_end];
        let block = Block::new_from_buffer(self.curr_sbn, buffer, nb_symbols, oti)?;
        self.blocks.push(block);
        self.curr_sbn += 1;
        self.read_end = offset_end == content.len();
        self.curr_content_offset = offset_end as u64;
        Ok(())
    }

    fn read_block_stream(&mut self) -> Result<()> {
        log::debug!("Read block nb {}", self.curr_sbn);

        let mut stream = match &self.file.object.source {
            ObjectDataSource::Stream(stream) => Ok(stream.lock().unwrap()),
            _ => Err(FluteError::invalid("Not a data source stream")),
        }?;

        let oti = &self.file.oti;
        let nb_symbols = self.partitioning.nb_source_symbols(self.curr_sbn);
        let mut buffer: Vec<u8> =
            vec![0; nb_symbols as usize * oti.encoding_symbol_length as usize];
        let result = match stream.read(&mut buffer) {
            Ok(read) => read,
            Err(e) => {
                log::error!("Fail to read the object source: {:?}", e.to_string());
                self.read_end = true;
                return Ok(());
            }
        };

        if result == 0 {
            self.read_end = true;
            return Ok(());
        }

        buffer.truncate(result);

        let block = Block::new_from_buffer(self.curr_sbn, &buffer, nb_symbols, oti)?;
        self.blocks.push(block);
        self.curr_sbn += 1;
        self.curr_content_offset += result as u64;
        Ok(())
    }

    fn read_window(&mut self) {
        while !self.read_end && (self.blocks.len() < self.window_size) {
            match self.read_block() {
                Ok(_) => {}
                Err(e) => {
                    log::error!("Fail to read a block: {:?}", e);
                    self.read_end = true;
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::BlockEncoder;
    use crate::common::oti::Oti;
    use crate::sender::filedesc::FileDesc;
    use crate::sender::toiallocator::ToiAllocator;
    use crate::sender::{ObjectDesc, ToiMaxLength};
    use crate::tools::uint128::Uint128;
    use std::sync::Arc;

    fn create_filedesc(buffer: Vec<u8>, oti: &Oti) -> Arc<FileDesc> {
        let allocator = ToiAllocator::new(ToiMaxLength::ToiMax112, Some(Uint128::from(1)));
        let mut obj = ObjectDesc::create_from_buffer(
            buffer,
            "application/octet-stream",
            &url::Url::parse("file:///object").unwrap(),
            1,
            None,
            None,
            None,
            None,
            crate::common::lct::Cenc::Null,
            true,
            None,
            false,
        )
        .unwrap();
        obj.set_toi(ToiAllocator::allocate(&allocator));
        Arc::new(FileDesc::new(0, obj, oti, None, false).unwrap())
    }

    #[test]
    pub fn test_encoder_emits_all_symbols() {
        crate::tests::init();
        // 10 source symbols over 3 blocks of [4, 3, 3]
        let oti = Oti::new_no_code(1024, 4);
        let file = create_filedesc(vec![0xCA; 10240], &oti);
        let mut encoder = BlockEncoder::new(file, 4, true).unwrap();

        let mut nb_pkt = 0;
        let mut last_close_object = false;
        while let Some(pkt) = encoder.read(false) {
            nb_pkt += 1;
            last_close_object = pkt.close_object;
        }
        assert_eq!(nb_pkt, 10);
        assert!(last_close_object);
    }

    #[test]
    pub fn test_encoder_rs_symbol_count() {
        crate::tests::init();
        // 8 source symbols over 2 blocks, plus 2 parity symbols per block
        let oti = Oti::new_reed_solomon_gf28(32, 4, 2).unwrap();
        let file = create_filedesc(vec![1; 256], &oti);
        let mut encoder = BlockEncoder::new(file, 4, true).unwrap();

        let mut nb_source = 0;
        let mut nb_total = 0;
        while let Some(pkt) = encoder.read(false) {
            nb_total += 1;
            if (pkt.esi as u64) < 4 {
                nb_source += 1;
            }
            assert_eq!(pkt.source_block_length, 4);
        }
        assert_eq!(nb_source, 8);
        assert_eq!(nb_total, 12);
    }

    #[test]
    pub fn test_encoder_interleaves_blocks() {
        crate::tests::init();
        let oti = Oti::new_no_code(1024, 2);
        let file = create_filedesc(vec![0; 4096], &oti);
        let mut encoder = BlockEncoder::new(file, 2, true).unwrap();

        let mut sbns = Vec::new();
        while let Some(pkt) = encoder.read(false) {
            sbns.push(pkt.sbn);
        }
        // two blocks of two symbols, interleaved round-robin
        assert_eq!(sbns, vec![0, 1, 0, 1]);
    }

    #[test]
    pub fn test_encoder_force_close() {
        crate::tests::init();
        let oti = Oti::new_no_code(1024, 4);
        let file = create_filedesc(vec![0; 10240], &oti);
        let mut encoder = BlockEncoder::new(file, 4, false).unwrap();

        let pkt = encoder.read(true).unwrap();
        assert!(pkt.close_object);
        assert!(encoder.read(false).is_none());
        assert!(encoder.read(true).is_none());
    }

    #[test]
    pub fn test_encoder_empty_object() {
        crate::tests::init();
        let oti = Oti::new_no_code(1024, 4);
        let file = create_filedesc(Vec::new(), &oti);
        let mut encoder = BlockEncoder::new(file, 4, true).unwrap();

        let pkt = encoder.read(false).unwrap();
        assert!(pkt.close_object);
        assert!(pkt.payload.is_empty());
        assert_eq!(pkt.sbn, 0);
        assert_eq!(pkt.esi, 0);
        assert!(encoder.read(false).is_none());
    }
}
