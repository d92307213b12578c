//! Integration-level checks of the bit reader and Huffman table against
//! their public crate API, complementing the block-level scenarios in
//! `inflate_test.rs`.

use inflate_toy::bit_stream::BitReader;
use inflate_toy::huffman::{decode_symbol, HuffmanTable};

#[test]
fn bit_reader_tracks_offsets_across_a_stored_block_header() {
    // LEN=5, NLEN=!5, at a byte-aligned start.
    let data: &[u8] = &[0x05, 0x00, 0xFA, 0xFF, b'h', b'e', b'l', b'l', b'o'];
    let mut reader = BitReader::new(data);
    let len = reader.read_bits(16).unwrap();
    let nlen = reader.read_bits(16).unwrap();
    assert_eq!(len ^ nlen, 0xFFFF);
    assert_eq!(reader.byte_offset(), 4);
    assert_eq!(reader.bit_offset(), 0);
}

#[test]
fn bit_reader_with_start_offset_skips_a_container_header() {
    // Pretend the first 2 bytes are a foreign container header; decoding
    // should start exactly at bit 16.
    let data: &[u8] = &[0xAA, 0xAA, 0x05, 0x00, 0xFA, 0xFF];
    let mut reader = BitReader::with_start_offset(data, 16);
    assert_eq!(reader.byte_offset(), 2);
    let len = reader.read_bits(16).unwrap();
    assert_eq!(len, 5);
}

#[test]
fn huffman_table_decodes_every_symbol_of_a_small_alphabet() {
    // Canonical lengths for a 4-symbol alphabet: {2, 1, 3, 3}.
    let table = HuffmanTable::build(&[2, 1, 3, 3]).unwrap();

    // Canonical codes (MSB-first): symbol1="0" (1 bit),
    // symbol0="10" (2 bits), symbol2="110" (3 bits), symbol3="111" (3 bits).
    let cases: &[(u32, u32, u32)] = &[(0b0, 1, 1), (0b10, 2, 0), (0b110, 3, 2), (0b111, 3, 3)];
    for &(code, len, expected_symbol) in cases {
        let mut bits = Vec::new();
        for i in (0..len).rev() {
            bits.push((code >> i) & 1 != 0);
        }
        let mut data = Vec::new();
        let mut byte = 0u8;
        let mut n = 0;
        for bit in bits {
            if bit {
                byte |= 1 << n;
            }
            n += 1;
            if n == 8 {
                data.push(byte);
                byte = 0;
                n = 0;
            }
        }
        if n > 0 {
            data.push(byte);
        }
        let mut reader = BitReader::new(&data);
        let symbol = decode_symbol(&mut reader, &table).unwrap();
        assert_eq!(symbol, expected_symbol);
    }
}

#[test]
fn fixed_distance_table_is_canonical_five_bit_codes() {
    let table = HuffmanTable::fixed_distance();
    // Every symbol has length 5; symbol 0 is code 00000, symbol 31 is
    // code 11111.
    let data_zero: &[u8] = &[0b0000_0000];
    let mut reader = BitReader::new(data_zero);
    assert_eq!(decode_symbol(&mut reader, &table).unwrap(), 0);

    // Five ones read LSB-first fill the byte's low 5 bits; the top 3 are
    // unread padding.
    let data_max: &[u8] = &[0b0001_1111];
    let mut reader = BitReader::new(data_max);
    assert_eq!(decode_symbol(&mut reader, &table).unwrap(), 31);
}
