use tracing::{debug, trace};

use super::parser::BitMatrixParser;
use crate::common::{
    decode, rectify, BitMatrix, CharacterSet, DecoderResult, ECLevel, QRResult, Version,
};

// Data blocks
//------------------------------------------------------------------------------

/// One Reed-Solomon block: data codewords followed by their error correction codewords.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataBlock {
    pub data_len: usize,
    pub codewords: Vec<u8>,
}

/// Undoes the interleaving of the raw codeword stream. Blocks of the shorter group come first
/// and the longer blocks hold one extra data codeword each.
pub fn deinterleave(raw: &[u8], version: Version, ecl: ECLevel) -> Vec<DataBlock> {
    let ec_len = version.ecc_per_block(ecl);
    let (d1, c1, d2, c2) = version.data_codewords_per_block(ecl);
    debug_assert_eq!(raw.len(), version.total_codewords(), "Raw codeword count");

    let mut blocks: Vec<DataBlock> = std::iter::repeat(d1)
        .take(c1)
        .chain(std::iter::repeat(d2).take(c2))
        .map(|data_len| DataBlock { data_len, codewords: Vec::with_capacity(data_len + ec_len) })
        .collect();
    let block_count = blocks.len();
    let shorter = if c1 > 0 { d1 } else { d2 };

    let mut raw = raw.iter().copied();
    for _ in 0..shorter {
        for block in blocks.iter_mut() {
            block.codewords.extend(raw.next());
        }
    }
    for block in blocks.iter_mut().filter(|b| b.data_len > shorter) {
        block.codewords.extend(raw.next());
    }
    for _ in 0..ec_len {
        for block in blocks.iter_mut() {
            block.codewords.extend(raw.next());
        }
    }

    trace!(block_count, ec_len, "Deinterleaved codewords");
    blocks
}


// Bit matrix decoder
//------------------------------------------------------------------------------

/// Decodes a sampled module grid, retrying on its transpose when the first attempt fails on
/// something a mirror image would explain.
pub fn decode_bit_matrix(bits: &BitMatrix, hint: Option<CharacterSet>) -> QRResult<DecoderResult> {
    let err = match decode_grid(bits, hint) {
        Ok(res) => return Ok(res),
        Err(e) if e.is_recoverable_by_mirroring() => e,
        Err(e) => return Err(e),
    };

    debug!("Decoding failed with \"{err}\", trying mirrored grid");
    let mut mirrored = bits.clone();
    mirrored.transpose();
    match decode_grid(&mirrored, hint) {
        Ok(mut res) => {
            res.mirrored = true;
            Ok(res)
        }
        Err(_) => Err(err),
    }
}

fn decode_grid(bits: &BitMatrix, hint: Option<CharacterSet>) -> QRResult<DecoderResult> {
    let parser = BitMatrixParser::new(bits)?;
    let version = parser.read_version()?;
    let format = parser.read_format_info()?;
    let raw = parser.read_codewords(version, format)?;
    let ecl = format.ec_level;

    let ec_len = version.ecc_per_block(ecl);
    let mut data = Vec::with_capacity(version.data_codewords(ecl));
    let mut errors_corrected = 0;
    for mut block in deinterleave(&raw, version, ecl) {
        errors_corrected += rectify(&mut block.codewords, ec_len)?;
        data.extend_from_slice(&block.codewords[..block.data_len]);
    }
    debug!(%version, %ecl, mask = *format.mask, errors_corrected, "Codewords corrected");

    let mut res = decode(&data, version, ecl, hint)?;
    res.errors_corrected = errors_corrected;
    Ok(res)
}
