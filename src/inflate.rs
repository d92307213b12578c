//! Decompress data compressed with the DEFLATE algorithm (RFC 1951).
//!
//! The DEFLATE algorithm combines LZ77 back-references with Huffman
//! coding. Decoding pulls bits from a [`BitReader`] to read block
//! headers, builds or selects a literal/length Huffman table per block,
//! and emits literal bytes and back-reference copies into a
//! caller-provided output slice.

use std::sync::OnceLock;

use thiserror::Error;

use crate::bit_stream::BitReader;
use crate::error::DecodeError;
use crate::huffman::{decode_symbol, HuffmanTable};

const BTYPE_NO_COMPRESSION: u32 = 0b00;
const BTYPE_FIXED_HUFFMAN: u32 = 0b01;
const BTYPE_DYNAMIC_HUFFMAN: u32 = 0b10;

const END_OF_BLOCK: u32 = 256;
const LENGTH_CODE_BASE: u32 = 257;
const LENGTH_CODE_MAX: u32 = 285;

const CL_ALPHABET_SIZE: usize = 19;

/// `length_table[i]` is `(extra_bits, base_length)` for literal/length
/// symbol `257 + i`. Defined in RFC 1951 §3.2.5.
const LENGTH_TABLE: [(u8, u32); 29] = [
    (0, 3),
    (0, 4),
    (0, 5),
    (0, 6),
    (0, 7),
    (0, 8),
    (0, 9),
    (0, 10),
    (1, 11),
    (1, 13),
    (1, 15),
    (1, 17),
    (2, 19),
    (2, 23),
    (2, 27),
    (2, 31),
    (3, 35),
    (3, 43),
    (3, 51),
    (3, 59),
    (4, 67),
    (4, 83),
    (4, 99),
    (4, 115),
    (5, 131),
    (5, 163),
    (5, 195),
    (5, 227),
    (0, 258),
];

/// `distance_table[i]` is `(extra_bits, base_distance)` for distance code
/// `i`. Codes 30 and 31 are reserved and never appear in this table.
const DISTANCE_TABLE: [(u8, u32); 30] = [
    (0, 1),
    (0, 2),
    (0, 3),
    (0, 4),
    (1, 5),
    (1, 7),
    (2, 9),
    (2, 13),
    (3, 17),
    (3, 25),
    (4, 33),
    (4, 49),
    (5, 65),
    (5, 97),
    (6, 129),
    (6, 193),
    (7, 257),
    (7, 385),
    (8, 513),
    (8, 769),
    (9, 1025),
    (9, 1537),
    (10, 2049),
    (10, 3073),
    (11, 4097),
    (11, 6145),
    (12, 8193),
    (12, 12289),
    (13, 16385),
    (13, 24577),
];

/// Order in which HCLEN code-length-alphabet lengths are transmitted.
/// RFC 1951 §3.2.7.
const CL_ORDER: [usize; CL_ALPHABET_SIZE] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

static FIXED_LITERAL_TABLE: OnceLock<HuffmanTable> = OnceLock::new();

/// The RFC 1951 fixed literal/length table, built once and shared by
/// every decoder (it never mutates after construction, so sharing it
/// across threads needs no locking).
fn fixed_literal_table() -> &'static HuffmanTable {
    FIXED_LITERAL_TABLE.get_or_init(HuffmanTable::fixed_literal_length)
}

/// Successful decode: bytes produced and total bits consumed, the
/// latter useful to a caller wanting to locate trailing data such as a
/// container checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeSuccess {
    pub bytes_written: usize,
    pub bits_read: usize,
}

/// A decode failure, with enough context to point a caller at the
/// offending bit in the input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (block {block_number}, byte {byte_offset}, bit {bit_offset})")]
pub struct DecodeFailure {
    pub byte_offset: usize,
    pub bit_offset: usize,
    pub block_number: usize,
    pub message: String,
}

/// Outcome of decoding one block's body: either it ran to its
/// end-of-block symbol, or the output slice filled up exactly between
/// symbols.
enum BodyOutcome {
    EndOfBlock,
    Full,
}

enum BlockOutcome {
    Continue,
    Done,
}

/// Selects how a length/distance back-reference's distance code is
/// decoded: fixed blocks read a raw 5-bit value, dynamic blocks walk a
/// block-local Huffman table. A tagged enum rather than a boxed closure
/// keeps this out of the inner symbol loop's hot path (see DESIGN.md).
enum DistanceSource<'t> {
    Fixed,
    Dynamic(&'t HuffmanTable),
}

/// A DEFLATE decoder over a borrowed input slice.
///
/// Exclusively owns its bit reader and, for dynamic blocks, its
/// block-local Huffman tables; those tables live only for the block
/// that built them. The input slice is borrowed and never retained past
/// the call to [`Decoder::decode`].
pub struct Decoder<'a> {
    reader: BitReader<'a>,
    block_number: usize,
}

impl<'a> Decoder<'a> {
    /// Construct a decoder over `input`, starting at bit offset 0.
    pub fn new(input: &'a [u8]) -> Self {
        Self::with_start_offset(input, 0)
    }

    /// Construct a decoder over `input`, starting `start_bit_offset`
    /// bits in (useful for container formats that embed a DEFLATE
    /// stream after their own header bits).
    pub fn with_start_offset(input: &'a [u8], start_bit_offset: usize) -> Self {
        Self {
            reader: BitReader::with_start_offset(input, start_bit_offset),
            block_number: 0,
        }
    }

    /// Decode into `output`, returning bytes written and bits read, or
    /// the failure snapshot (cursor position and block index) at the
    /// point decoding stopped.
    pub fn decode(&mut self, output: &mut [u8]) -> Result<DecodeSuccess, DecodeFailure> {
        self.decode_result(output).map_err(|err| DecodeFailure {
            byte_offset: self.reader.byte_offset(),
            bit_offset: self.reader.bit_offset(),
            block_number: self.block_number,
            message: err.to_string(),
        })
    }

    fn decode_result(&mut self, output: &mut [u8]) -> Result<DecodeSuccess, DecodeError> {
        self.block_number = 0;
        let mut out_pos = 0usize;
        loop {
            match self.decode_block(output, &mut out_pos)? {
                BlockOutcome::Done => break,
                BlockOutcome::Continue => self.block_number += 1,
            }
        }
        Ok(DecodeSuccess {
            bytes_written: out_pos,
            bits_read: self.reader.bit_position(),
        })
    }

    fn decode_block(
        &mut self,
        output: &mut [u8],
        out_pos: &mut usize,
    ) -> Result<BlockOutcome, DecodeError> {
        let is_final = self.reader.read_bit()?;
        let block_type = self.reader.read_bits(2)?;
        log::debug!(
            "block {}: type={:#04b} final={}",
            self.block_number,
            block_type,
            is_final
        );

        let outcome = match block_type {
            BTYPE_NO_COMPRESSION => {
                self.decode_stored_block(output, out_pos)?;
                BodyOutcome::EndOfBlock
            }
            BTYPE_FIXED_HUFFMAN => {
                let table = fixed_literal_table();
                self.decode_body(output, out_pos, table, DistanceSource::Fixed)?
            }
            BTYPE_DYNAMIC_HUFFMAN => {
                let (lit_table, dist_table) = self.read_dynamic_tables()?;
                self.decode_body(output, out_pos, &lit_table, DistanceSource::Dynamic(&dist_table))?
            }
            _ => return Err(DecodeError::InvalidData("reserved block type (BTYPE=11)")),
        };

        match outcome {
            BodyOutcome::Full => Ok(BlockOutcome::Done),
            BodyOutcome::EndOfBlock if is_final => Ok(BlockOutcome::Done),
            BodyOutcome::EndOfBlock => Ok(BlockOutcome::Continue),
        }
    }

    /// Stored (uncompressed) block: RFC 1951 §3.2.4.
    fn decode_stored_block(
        &mut self,
        output: &mut [u8],
        out_pos: &mut usize,
    ) -> Result<(), DecodeError> {
        self.reader.align_to_byte();

        let len = self.reader.read_bits(16)?;
        let nlen = self.reader.read_bits(16)?;
        if (len ^ nlen) != 0xFFFF {
            return Err(DecodeError::InvalidData("stored block LEN/NLEN mismatch"));
        }
        let len = len as usize;

        if len > self.reader.left_bits() / 8 {
            return Err(DecodeError::EndOfBuffer);
        }
        if *out_pos + len > output.len() {
            return Err(DecodeError::OutputTooSmall);
        }

        let start = self.reader.byte_offset();
        output[*out_pos..*out_pos + len].copy_from_slice(&self.reader.data()[start..start + len]);
        self.reader.skip(len * 8);
        *out_pos += len;
        Ok(())
    }

    /// Read a dynamic block's header and build its two block-local
    /// Huffman tables: RFC 1951 §3.2.7.
    fn read_dynamic_tables(&mut self) -> Result<(HuffmanTable, HuffmanTable), DecodeError> {
        if self.reader.left_bits() < 14 {
            return Err(DecodeError::EndOfBuffer);
        }

        let hlit = self.reader.read_bits(5)? as usize + 257;
        let hdist = self.reader.read_bits(5)? as usize + 1;
        let hclen = self.reader.read_bits(4)? as usize + 4;

        let mut cl_lengths = [0u8; CL_ALPHABET_SIZE];
        for &slot in CL_ORDER.iter().take(hclen) {
            cl_lengths[slot] = self.reader.read_bits(3)? as u8;
        }
        let cl_table = HuffmanTable::build(&cl_lengths)?;

        let lit_lengths = self.read_code_lengths(&cl_table, hlit)?;
        let dist_lengths = self.read_code_lengths(&cl_table, hdist)?;

        let lit_table = HuffmanTable::build(&lit_lengths)?;
        let dist_table = HuffmanTable::build(&dist_lengths)?;
        Ok((lit_table, dist_table))
    }

    /// Decode `hcodes` code lengths from the run-length-encoded
    /// code-length alphabet (RFC 1951 §3.2.7, symbols 16/17/18).
    fn read_code_lengths(
        &mut self,
        cl_table: &HuffmanTable,
        hcodes: usize,
    ) -> Result<Vec<u8>, DecodeError> {
        let mut lengths = vec![0u8; hcodes];
        let mut i = 0usize;

        while i < hcodes {
            let symbol = decode_symbol(&mut self.reader, cl_table)?;
            match symbol {
                0..=15 => {
                    lengths[i] = symbol as u8;
                    i += 1;
                }
                16 => {
                    if i == 0 {
                        return Err(DecodeError::InvalidData(
                            "repeat-previous code length at position 0",
                        ));
                    }
                    let repeat = self.reader.read_bits(2)? as usize + 3;
                    if i + repeat > hcodes {
                        return Err(DecodeError::InvalidData(
                            "code length run overruns target length",
                        ));
                    }
                    let prev = lengths[i - 1];
                    for _ in 0..repeat {
                        lengths[i] = prev;
                        i += 1;
                    }
                }
                17 => {
                    let repeat = self.reader.read_bits(3)? as usize + 3;
                    if i + repeat > hcodes {
                        return Err(DecodeError::InvalidData(
                            "code length run overruns target length",
                        ));
                    }
                    for _ in 0..repeat {
                        lengths[i] = 0;
                        i += 1;
                    }
                }
                18 => {
                    let repeat = self.reader.read_bits(7)? as usize + 11;
                    if i + repeat > hcodes {
                        return Err(DecodeError::InvalidData(
                            "code length run overruns target length",
                        ));
                    }
                    for _ in 0..repeat {
                        lengths[i] = 0;
                        i += 1;
                    }
                }
                _ => return Err(DecodeError::InvalidData("invalid code length symbol")),
            }
        }

        Ok(lengths)
    }

    /// Decode a fixed- or dynamic-Huffman block body: literals, the
    /// end-of-block symbol, and length/distance back-references.
    fn decode_body(
        &mut self,
        output: &mut [u8],
        out_pos: &mut usize,
        lit_table: &HuffmanTable,
        dist_source: DistanceSource,
    ) -> Result<BodyOutcome, DecodeError> {
        loop {
            if *out_pos >= output.len() {
                return Ok(BodyOutcome::Full);
            }

            let symbol = decode_symbol(&mut self.reader, lit_table)?;
            match symbol {
                0..=255 => {
                    output[*out_pos] = symbol as u8;
                    *out_pos += 1;
                }
                END_OF_BLOCK => return Ok(BodyOutcome::EndOfBlock),
                LENGTH_CODE_BASE..=LENGTH_CODE_MAX => {
                    let (extra, base) = LENGTH_TABLE[(symbol - LENGTH_CODE_BASE) as usize];
                    let extra_bits = self.reader.read_bits(extra as usize)?;
                    let length = (base + extra_bits) as usize;

                    let distance_code = match &dist_source {
                        DistanceSource::Fixed => self.reader.read_bits(5)?,
                        DistanceSource::Dynamic(table) => decode_symbol(&mut self.reader, table)?,
                    };
                    if distance_code >= 30 {
                        return Err(DecodeError::InvalidData("reserved distance code"));
                    }
                    let (d_extra, d_base) = DISTANCE_TABLE[distance_code as usize];
                    let d_extra_bits = self.reader.read_bits(d_extra as usize)?;
                    let distance = (d_base + d_extra_bits) as usize;

                    if distance > *out_pos {
                        return Err(DecodeError::InvalidData(
                            "back-reference distance exceeds bytes written",
                        ));
                    }
                    if *out_pos + length > output.len() {
                        return Err(DecodeError::OutputTooSmall);
                    }

                    // Byte-at-a-time, not a slice copy: when distance <
                    // length this must replicate the run, which a
                    // vectorized copy would get wrong.
                    for i in 0..length {
                        output[*out_pos + i] = output[*out_pos - distance + i];
                    }
                    *out_pos += length;
                }
                _ => return Err(DecodeError::InvalidData("invalid literal/length symbol")),
            }
        }
    }
}

/// Decode `data` into a freshly allocated `Vec<u8>`, growing the output
/// buffer as needed. A convenience wrapper around [`Decoder`] for
/// callers who don't know the decompressed length up front.
pub fn inflate_to_vec(data: &[u8]) -> Result<Vec<u8>, DecodeFailure> {
    let mut capacity = (data.len() * 3).max(256);
    loop {
        let mut output = vec![0u8; capacity];
        let mut decoder = Decoder::new(data);
        match decoder.decode_result(&mut output) {
            Ok(success) => {
                output.truncate(success.bytes_written);
                return Ok(output);
            }
            Err(DecodeError::OutputTooSmall) => {
                capacity *= 2;
            }
            Err(err) => {
                return Err(DecodeFailure {
                    byte_offset: decoder.reader.byte_offset(),
                    bit_offset: decoder.reader.bit_offset(),
                    block_number: decoder.block_number,
                    message: err.to_string(),
                });
            }
        }
    }
}
