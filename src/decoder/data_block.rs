use crate::decoder::version::Version;
use crate::error::Error;
use crate::models::ECLevel;

/// One deinterleaved block of codewords: data first, then error correction
pub struct DataBlock {
    /// How many leading codewords are data
    pub num_data_codewords: usize,
    /// Data codewords followed by error correction codewords
    pub codewords: Vec<u8>,
}

impl DataBlock {
    /// Undo the column-major interleaving of the raw codeword stream.
    ///
    /// All blocks carry the same amount of data except that the last group
    /// may carry one extra byte; error correction codewords are spread evenly
    /// across every block.
    pub fn get_data_blocks(
        raw_codewords: &[u8],
        version: Version,
        ec_level: ECLevel,
    ) -> Result<Vec<DataBlock>, Error> {
        if raw_codewords.len() != version.total_codewords() {
            return Err(Error::IllegalArgument(
                "codeword count does not match version",
            ));
        }

        let ec_blocks = version.ec_blocks(ec_level);
        let ec_per_block = ec_blocks.ec_codewords_per_block;

        let mut result: Vec<DataBlock> = Vec::with_capacity(ec_blocks.num_blocks());
        for group in &ec_blocks.groups {
            for _ in 0..group.count {
                result.push(DataBlock {
                    num_data_codewords: group.data_codewords,
                    codewords: vec![0; group.data_codewords + ec_per_block],
                });
            }
        }
        // Find where the longer blocks start
        let shorter_blocks_total = result[0].codewords.len();
        let mut longer_blocks_start_at = result.len();
        while longer_blocks_start_at > 0 {
            if result[longer_blocks_start_at - 1].codewords.len() == shorter_blocks_total {
                break;
            }
            longer_blocks_start_at -= 1;
        }

        let shorter_blocks_num_data = shorter_blocks_total - ec_per_block;
        let mut raw_offset = 0;

        // Data codewords, column-major across blocks
        for i in 0..shorter_blocks_num_data {
            for block in result.iter_mut() {
                block.codewords[i] = raw_codewords[raw_offset];
                raw_offset += 1;
            }
        }
        // The last data codeword of each longer block
        for block in result.iter_mut().skip(longer_blocks_start_at) {
            block.codewords[shorter_blocks_num_data] = raw_codewords[raw_offset];
            raw_offset += 1;
        }

        // Error correction codewords, also column-major
        let max = result[0].codewords.len();
        for i in shorter_blocks_num_data..max {
            for (j, block) in result.iter_mut().enumerate() {
                let offset = if j < longer_blocks_start_at { i } else { i + 1 };
                block.codewords[offset] = raw_codewords[raw_offset];
                raw_offset += 1;
            }
        }

        debug_assert_eq!(raw_offset, raw_codewords.len());
        Ok(result)
    }
}
