pub mod nocode;
pub mod rscodec;

use crate::tools::error::Result;

/// Kind of an encoding symbol inside a coded block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShardType {
    /// Symbol carrying object bytes
    SourceSymbol,
    /// Parity symbol generated by the FEC scheme
    RepairSymbol,
}

/// One encoding symbol produced by a FEC encoder.
pub trait FecShard: Send + Sync {
    /// Symbol bytes
    fn data(&self) -> &[u8];
    /// Encoding Symbol ID
    fn esi(&self) -> u32;
    /// Source or repair symbol
    fn shard_type(&self) -> ShardType;
}

/// Encoding symbol holding its own bytes.
#[derive(Debug)]
pub struct DataFecShard {
    shard: Vec<u8>,
    index: u32,
    shard_type: ShardType,
}

impl FecShard for DataFecShard {
    fn data(&self) -> &[u8] {
        &self.shard
    }
    fn esi(&self) -> u32 {
        self.index
    }
    fn shard_type(&self) -> ShardType {
        self.shard_type
    }
}

impl DataFecShard {
    /// Wrap symbol bytes into a shard.
    pub fn new(shard: Vec<u8>, index: u32, shard_type: ShardType) -> Self {
        DataFecShard {
            shard,
            index,
            shard_type,
        }
    }
}

/// Produce the encoding symbols of one source block.
pub trait FecEncoder {
    /// Encode a source block into its source and repair symbols.
    fn encode(&self, data: &[u8]) -> Result<Vec<Box<dyn FecShard>>>;
}

/// Rebuild a source block from received encoding symbols.
///
/// Receiver-side half of the FEC contract, kept for symmetry with the
/// encoders and exercised by the recovery tests.
pub trait FecDecoder {
    /// Add a received symbol.
    fn push_symbol(&mut self, encoding_symbol: &[u8], esi: u32);
    /// True once enough symbols are known to rebuild the block.
    fn can_decode(&self) -> bool;
    /// Try to rebuild the source block.
    fn decode(&mut self) -> bool;
    /// The rebuilt source block, `k * E` bytes, caller truncates to the block length.
    fn source_block(&self) -> Result<&[u8]>;
}

impl std::fmt::Debug for dyn FecShard {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "FecShard {{ esi: {} }}", self.esi())
    }
}
