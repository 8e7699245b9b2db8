//! Systematic Reed-Solomon code over GF(2^8).

use super::{DataFecShard, FecDecoder, FecEncoder, FecShard, ShardType};
use crate::tools::error::{FluteError, Result};

#[derive(Debug, Clone, Copy)]
struct RsCodecParam {
    nb_source_symbols: usize,
    nb_parity_symbols: usize,
    encoding_symbol_length: usize,
}

/// Reed-Solomon GF(2^8) encoder producing `k + r` shards of one block,
/// shards `0..k-1` are the source symbols in order, shards `k..k+r-1` parity.
#[derive(Debug)]
pub struct RsGalois8Codec {
    params: RsCodecParam,
    rs: reed_solomon_erasure::galois_8::ReedSolomon,
}

impl RsCodecParam {
    fn create_shards(&self, data: &[u8]) -> Result<Vec<Vec<u8>>> {
        let mut shards: Vec<Vec<u8>> = data
            .chunks(self.encoding_symbol_length)
            .map(|chunk| chunk.to_vec())
            .collect();

        let last = shards
            .last_mut()
            .ok_or_else(|| FluteError::invalid("Fail to encode an empty block"))?;
        if last.len() < self.encoding_symbol_length {
            last.resize(self.encoding_symbol_length, 0)
        }
        if shards.len() != self.nb_source_symbols {
            return Err(FluteError::InvalidConfiguration(format!(
                "nb source symbols is {} instead of {}",
                shards.len(),
                self.nb_source_symbols
            )));
        }

        for _ in 0..self.nb_parity_symbols {
            shards.push(vec![0; self.encoding_symbol_length]);
        }
        Ok(shards)
    }
}

impl RsGalois8Codec {
    /// Codec for blocks of `nb_source_symbols` source symbols protected by
    /// `nb_parity_symbols` parity symbols of `encoding_symbol_length` bytes.
    ///
    /// # Errors
    /// `nb_source_symbols + nb_parity_symbols` must stay within the 255
    /// symbols of GF(2^8).
    pub fn new(
        nb_source_symbols: usize,
        nb_parity_symbols: usize,
        encoding_symbol_length: usize,
    ) -> Result<RsGalois8Codec> {
        let rs =
            reed_solomon_erasure::galois_8::ReedSolomon::new(nb_source_symbols, nb_parity_symbols)
                .map_err(|_| FluteError::invalid("Fail to create RS codec"))?;

        Ok(RsGalois8Codec {
            params: RsCodecParam {
                nb_source_symbols,
                nb_parity_symbols,
                encoding_symbol_length,
            },
            rs,
        })
    }
}

impl FecEncoder for RsGalois8Codec {
    fn encode(&self, data: &[u8]) -> Result<Vec<Box<dyn FecShard>>> {
        let mut shards = self.params.create_shards(data)?;
        self.rs
            .encode(&mut shards)
            .map_err(|_| FluteError::invalid("Fail to encode RS"))?;

        let shards: Vec<Box<dyn FecShard>> = shards
            .into_iter()
            .enumerate()
            .map(|(index, shard)| {
                let shard_type = match index < self.params.nb_source_symbols {
                    true => ShardType::SourceSymbol,
                    false => ShardType::RepairSymbol,
                };
                Box::new(DataFecShard::new(shard, index as u32, shard_type)) as Box<dyn FecShard>
            })
            .collect();

        Ok(shards)
    }
}

/// Reed-Solomon GF(2^8) decoder, rebuilds a source block once any `k`
/// distinct encoding symbols of the block are known.
pub struct RsGalois8Decoder {
    params: RsCodecParam,
    rs: reed_solomon_erasure::galois_8::ReedSolomon,
    shards: Vec<Option<Vec<u8>>>,
    nb_symbols_received: usize,
    data: Option<Vec<u8>>,
}

impl std::fmt::Debug for RsGalois8Decoder {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "RsGalois8Decoder {{ received: {}/{} }}",
            self.nb_symbols_received, self.params.nb_source_symbols
        )
    }
}

impl RsGalois8Decoder {
    /// Decoder counterpart of [`RsGalois8Codec`].
    pub fn new(
        nb_source_symbols: usize,
        nb_parity_symbols: usize,
        encoding_symbol_length: usize,
    ) -> Result<RsGalois8Decoder> {
        let rs =
            reed_solomon_erasure::galois_8::ReedSolomon::new(nb_source_symbols, nb_parity_symbols)
                .map_err(|_| FluteError::invalid("Fail to create RS codec"))?;

        Ok(RsGalois8Decoder {
            params: RsCodecParam {
                nb_source_symbols,
                nb_parity_symbols,
                encoding_symbol_length,
            },
            rs,
            shards: vec![None; nb_source_symbols + nb_parity_symbols],
            nb_symbols_received: 0,
            data: None,
        })
    }
}

impl FecDecoder for RsGalois8Decoder {
    fn push_symbol(&mut self, encoding_symbol: &[u8], esi: u32) {
        if self.data.is_some() {
            return;
        }

        if self.shards.len() <= esi as usize {
            log::error!("ESI {} is outside the block of {}", esi, self.shards.len());
            return;
        }

        if self.shards[esi as usize].is_some() {
            return;
        }

        let mut shard = encoding_symbol.to_vec();
        shard.resize(self.params.encoding_symbol_length, 0);
        self.shards[esi as usize] = Some(shard);
        self.nb_symbols_received += 1;
    }

    fn can_decode(&self) -> bool {
        self.nb_symbols_received >= self.params.nb_source_symbols
    }

    fn decode(&mut self) -> bool {
        if self.data.is_some() {
            return true;
        }

        if !self.can_decode() {
            return false;
        }

        if self.rs.reconstruct(&mut self.shards).is_err() {
            log::error!("Fail to reconstruct RS block");
            return false;
        }

        let mut output = Vec::new();
        for shard in self.shards.iter().take(self.params.nb_source_symbols) {
            match shard {
                Some(shard) => output.extend(shard),
                None => return false,
            }
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
