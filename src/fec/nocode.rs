//! Pass-through "FEC" scheme, symbols are plain slices of the source block.

use super::{DataFecShard, FecDecoder, FecShard, ShardType};
use crate::tools::error::{FluteError, Result};

/// Slice a source block into encoding symbols of `encoding_symbol_length`
/// bytes, zero-padding the last symbol when the block is not a multiple of
/// the symbol length. The ESI of each symbol is its position in the block.
pub fn create_shards(encoding_symbol_length: usize, buffer: &[u8]) -> Vec<Box<dyn FecShard>> {
    buffer
        .chunks(encoding_symbol_length)
        .enumerate()
        .map(|(index, chunk)| {
            let mut shard = chunk.to_vec();
            shard.resize(encoding_symbol_length, 0);
            Box::new(DataFecShard::new(
                shard,
                index as u32,
                ShardType::SourceSymbol,
            )) as Box<dyn FecShard>
        })
        .collect()
}

/// Collects the source symbols of a NoCode block.
pub struct NoCodeDecoder {
    shards: Vec<Option<Vec<u8>>>,
    nb_symbols: usize,
    data: Option<Vec<u8>>,
}

impl NoCodeDecoder {
    /// Decoder for a block of `nb_source_symbols` symbols.
    pub fn new(nb_source_symbols: usize) -> NoCodeDecoder {
        NoCodeDecoder {
            shards: vec![None; nb_source_symbols],
            nb_symbols: 0,
            data: None,
        }
    }
}

impl std::fmt::Debug for NoCodeDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "NoCodeDecoder {{ nb_symbols: {} }}", self.nb_symbols)
    }
}

impl FecDecoder for NoCodeDecoder {
    fn push_symbol(&mut self, encoding_symbol: &[u8], esi: u32) {
        if self.shards.len() <= esi as usize {
            log::error!("ESI {} is outside the block of {}", esi, self.shards.len());
            return;
        }

        if self.shards[esi as usize].is_some() {
            return;
        }

        self.shards[esi as usize] = Some(encoding_symbol.to_vec());
        self.nb_symbols += 1;
    }

    fn can_decode(&self) -> bool {
        self.nb_symbols == self.shards.len()
    }

    fn decode(&mut self) -> bool {
        if self.data.is_some() {
            return true;
        }

        if !self.can_decode() {
            return false;
        }

        let mut output = Vec::new();
        for shard in &self.shards {
            output.extend(shard.as_ref().unwrap());
        }

        self.data = Some(output);
        true
    }

    fn source_block(&self) -> Result<&[u8]> {
        match self.data.as_ref() {
            Some(e) => Ok(e),
            None => Err(FluteError::malformed("Block is not decoded")),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::fec::FecDecoder;

    #[test]
    pub fn test_nocode_shards() {
        crate::tests::init();
        let data: Vec<u8> = (0..10).collect();
        let shards = super::create_shards(4, &data);
        assert_eq!(shards.len(), 3);
        assert_eq!(shards[0].data(), &[0, 1, 2, 3]);
        assert_eq!(shards[2].data(), &[8, 9, 0, 0]); // zero-padded tail
        assert_eq!(shards[2].esi(), 2);
    }

    #[test]
    pub fn test_nocode_decoder() {
        crate::tests::init();
        let data: Vec<u8> = (0..8).collect();
        let shards = super::create_shards(4, &data);

        let mut decoder = super::NoCodeDecoder::new(2);
        decoder.push_symbol(shards[1].data(), 1);
        assert!(!decoder.can_decode());
        decoder.push_symbol(shards[0].data(), 0);
        assert!(decoder.can_decode());
        assert!(decoder.decode());
        assert_eq!(decoder.source_block().unwrap(), data.as_slice());
    }
}
