use crate::common::oti::{FecEncodingId, Oti};
use crate::fec::rscodec::RsGalois8Codec;
use crate::fec::{nocode, FecEncoder, FecShard, ShardType};
use crate::tools::error::{FluteError, Result};

/// A source block with its encoding symbols, consumed one symbol at a time.
#[derive(Debug)]
pub struct Block {
    sbn: u32,
    read_index: usize,
    shards: Vec<Box<dyn FecShard>>,
    pub nb_source_symbols: usize,
}

/// One encoding symbol pulled out of a block.
pub struct EncodingSymbol<'a> {
    pub sbn: u32,
    pub esi: u32,
    pub symbols: &'a [u8],
    pub is_source_symbol: bool,
}

impl Block {
    pub fn new_from_buffer(
        sbn: u32,
        buffer: &[u8],
        block_length: u64,
        oti: &Oti,
    ) -> Result<Box<Block>> {
        let nb_source_symbols: usize =
            num_integer::div_ceil(buffer.len(), oti.encoding_symbol_length as usize);
        log::debug!(
            "sbn={} nb_source_symbols={} encoding_symbol_length={}",
            sbn,
            nb_source_symbols,
            oti.encoding_symbol_length
        );
        debug_assert!(nb_source_symbols as u64 <= block_length);

        let shards: Vec<Box<dyn FecShard>> = match oti.fec_encoding_id {
            FecEncodingId::NoCode => {
                nocode::create_shards(oti.encoding_symbol_length as usize, buffer)
            }
            FecEncodingId::ReedSolomonGf28 | FecEncodingId::ReedSolomonGf28UnderSpecified => {
                Block::create_shards_reed_solomon_gf8(oti, nb_source_symbols, buffer)?
            }
            FecEncodingId::ReedSolomonGf2m => {
                let m = oti.scheme_specific.as_ref().map(|s| s.m).unwrap_or(8);
                if m != 8 {
                    return Err(FluteError::invalid(
                        "Only GF(2^8) Reed-Solomon encoding is supported",
                    ));
                }
                Block::create_shards_reed_solomon_gf8(oti, nb_source_symbols, buffer)?
            }
        };

        Ok(Box::new(Block {
            sbn,
            read_index: 0,
            shards,
            nb_source_symbols,
        }))
    }

    pub fn is_empty(&self) -> bool {
        self.read_index == self.shards.len()
    }

    pub fn read(&mut self) -> Option<(EncodingSymbol<'_>, bool)> {
        if self.is_empty() {
            return None;
        }
        let shard = self.shards[self.read_index].as_ref();
        let symbol = EncodingSymbol {
            sbn: self.sbn,
            esi: shard.esi(),
            symbols: shard.data(),
            is_source_symbol: shard.shard_type() == ShardType::SourceSymbol,
        };
        self.read_index += 1;
        Some((symbol, self.is_empty()))
    }

    fn create_shards_reed_solomon_gf8(
        oti: &Oti,
        nb_source_symbols: usize,
        buffer: &[u8],
    ) -> Result<Vec<Box<dyn FecShard>>> {
        debug_assert!(nb_source_symbols <= oti.maximum_source_block_length as usize);
        let encoder = RsGalois8Codec::new(
            nb_source_symbols,
            oti.max_number_of_parity_symbols as usize,
            oti.encoding_symbol_length as usize,
        )?;
        encoder.encode(buffer)
    }
}
