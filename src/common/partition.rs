//! Block partitioning algorithm of RFC 5052.

use crate::tools::error::{FluteError, Result};

/// Partitioning of a transfer into source blocks.
///
/// Computed once per transfer with the block partitioning algorithm of
/// [RFC 5052 section 9.1](https://www.rfc-editor.org/rfc/rfc5052#section-9.1):
/// the transfer is cut into `nb_blocks` source blocks, the first
/// `nb_a_large` ones carrying `a_large` encoding symbols and the following
/// ones `a_small`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockPartitioning {
    /// Number of source symbols of each of the larger source blocks
    pub a_large: u64,
    /// Number of source symbols of each of the smaller source blocks
    pub a_small: u64,
    /// Number of source blocks carrying `a_large` symbols, they come first
    pub nb_a_large: u64,
    /// Total number of source blocks
    pub nb_blocks: u64,
    transfer_length: u64,
    encoding_symbol_length: u64,
}

impl BlockPartitioning {
    /// Partition a transfer of `transfer_length` octets into source blocks
    /// of at most `max_source_block_length` encoding symbols of
    /// `encoding_symbol_length` octets each.
    ///
    /// An empty transfer yields a partitioning without any block.
    ///
    /// # Errors
    /// A maximum source block length or an encoding symbol length of 0
    /// cannot partition anything and is rejected.
    pub fn compute(
        max_source_block_length: u64,
        transfer_length: u64,
        encoding_symbol_length: u64,
    ) -> Result<Self> {
        if max_source_block_length == 0 {
            return Err(FluteError::invalid("Maximum Source Block Length is 0"));
        }

        if encoding_symbol_length == 0 {
            return Err(FluteError::invalid("Encoding Symbol Length is 0"));
        }

        let nb_symbols = num_integer::div_ceil(transfer_length, encoding_symbol_length);
        let nb_blocks = num_integer::div_ceil(nb_symbols, max_source_block_length);
        log::debug!(
            "Partition {} bytes into {} blocks of at most {} symbols of {} bytes",
            transfer_length,
            nb_blocks,
            max_source_block_length,
            encoding_symbol_length
        );

        let (a_large, a_small) = match nb_blocks {
            0 => (0, 0),
            n => (
                num_integer::div_ceil(nb_symbols, n),
                num_integer::div_floor(nb_symbols, n),
            ),
        };

        Ok(BlockPartitioning {
            a_large,
            a_small,
            nb_a_large: nb_symbols - a_small * nb_blocks,
            nb_blocks,
            transfer_length,
            encoding_symbol_length,
        })
    }

    /// Number of source symbols of the block `sbn`.
    pub fn nb_source_symbols(&self, sbn: u32) -> u64 {
        match (sbn as u64) < self.nb_a_large {
            true => self.a_large,
            false => self.a_small,
        }
    }

    /// Offset in octets of the block `sbn` inside the transfer.
    fn block_offset(&self, sbn: u64) -> u64 {
        let nb_large = sbn.min(self.nb_a_large);
        let nb_small = sbn - nb_large;
        (nb_large * self.a_large + nb_small * self.a_small) * self.encoding_symbol_length
    }

    /// Size in octets of the block `sbn`.
    ///
    /// The last block is truncated so the block sizes sum to the transfer
    /// length.
    pub fn block_size(&self, sbn: u32) -> u64 {
        let offset = self.block_offset(sbn as u64);
        let symbols_size = self.nb_source_symbols(sbn) * self.encoding_symbol_length;
        symbols_size.min(self.transfer_length.saturating_sub(offset))
    }
}

#[cfg(test)]
mod tests {
    use super::BlockPartitioning;

    #[test]
    pub fn partition_rejects_zero_parameters() {
        crate::tests::init();
        assert!(BlockPartitioning::compute(0, 10240, 1024).is_err());
        assert!(BlockPartitioning::compute(64, 10240, 0).is_err());
    }

    #[test]
    pub fn partition_empty_transfer() {
        crate::tests::init();
        let partitioning = BlockPartitioning::compute(64, 0, 1024).unwrap();
        assert_eq!(partitioning.nb_blocks, 0);
        assert_eq!(partitioning.block_size(0), 0);
    }

    #[test]
    pub fn partition_rfc_formulas() {
        crate::tests::init();
        // 10 symbols over 3 blocks: A_large = ceil(10/3), A_small = floor(10/3)
        let partitioning = BlockPartitioning::compute(4, 10240, 1024).unwrap();
        assert_eq!(partitioning.a_large, 4);
        assert_eq!(partitioning.a_small, 3);
        assert_eq!(partitioning.nb_a_large, 1);
        assert_eq!(partitioning.nb_blocks, 3);

        assert_eq!(partitioning.nb_source_symbols(0), 4);
        assert_eq!(partitioning.nb_source_symbols(1), 3);
        assert_eq!(partitioning.nb_source_symbols(2), 3);
    }

    #[test]
    pub fn partition_exact_fit() {
        crate::tests::init();
        // 8 symbols over 2 blocks of 4, no larger block
        let partitioning = BlockPartitioning::compute(4, 8192, 1024).unwrap();
        assert_eq!(partitioning.a_large, 4);
        assert_eq!(partitioning.a_small, 4);
        assert_eq!(partitioning.nb_a_large, 0);
        assert_eq!(partitioning.nb_blocks, 2);
    }

    #[test]
    pub fn block_sizes_sum_to_transfer_length() {
        crate::tests::init();
        let transfer_length = 10245u64;
        let partitioning = BlockPartitioning::compute(4, transfer_length, 1024).unwrap();
        let total: u64 = (0..partitioning.nb_blocks)
            .map(|sbn| partitioning.block_size(sbn as u32))
            .sum();
        assert_eq!(total, transfer_length);
        // only the tail block is truncated
        assert_eq!(
            partitioning.block_size((partitioning.nb_blocks - 1) as u32),
            2053
        );
    }
}
