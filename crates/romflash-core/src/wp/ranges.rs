//! Write protection range decoding
//!
//! Turns BP/TB/SEC/CMP bit values into the address range they protect, and
//! searches the bit space for the encoding of a requested range.

use super::types::{RangeDecoder, WpBits, WpRange};

/// Decode the protected range from WP bits using the specified decoder
pub fn decode_range(bits: &WpBits, total_size: u32, decoder: RangeDecoder) -> WpRange {
    match decoder {
        RangeDecoder::Spi25 => decode_range_generic(bits, total_size, false, false),
        RangeDecoder::Spi25_64kBlock => decode_range_generic(bits, total_size, true, false),
        RangeDecoder::Spi25BitCmp => decode_range_bit_cmp(bits, total_size),
        RangeDecoder::Spi25_2xBlock => decode_range_generic(bits, total_size, false, true),
    }
}

/// CMP inverts the BP value instead of the resulting range
fn decode_range_bit_cmp(bits: &WpBits, total_size: u32) -> WpRange {
    let mut modified = *bits;
    if bits.cmp == Some(1) {
        let max_bp = (1u8 << bits.bp_count).wrapping_sub(1);
        modified.set_bp_value(bits.bp_value() ^ max_bp, bits.bp_count);
        modified.cmp = Some(0);
    }
    decode_range_generic(&modified, total_size, false, false)
}

/// Shared decoder
///
/// BP=0 protects nothing and BP=max protects the whole chip. Otherwise the
/// protected size is `block * 2^(bp - 1)`, where the block is 4 KiB with
/// SEC=1 (capped at 32 KiB) and 64 KiB otherwise. TB=1 anchors the range at
/// the bottom of the chip, TB=0 at the top. CMP=1 complements the result.
fn decode_range_generic(
    bits: &WpBits,
    total_size: u32,
    fixed_64k: bool,
    double_coeff: bool,
) -> WpRange {
    let bp = bits.bp_value();
    let max_bp = (1u8 << bits.bp_count).saturating_sub(1);

    let range = if bp == 0 {
        WpRange::none()
    } else if bp == max_bp && bits.bp_count > 0 {
        WpRange::full(total_size)
    } else {
        let sector_mode = bits.sec == Some(1) && !fixed_64k;
        let block_size: u32 = if sector_mode { 4 * 1024 } else { 64 * 1024 };

        let mut coefficient: u32 = 1 << (bp - 1);
        if double_coeff {
            coefficient *= 2;
        }

        let mut protected = block_size.saturating_mul(coefficient);
        if sector_mode {
            protected = protected.min(32 * 1024);
        }
        protected = protected.min(total_size);

        if bits.tb == Some(1) {
            WpRange::new(0, protected)
        } else {
            WpRange::new(total_size - protected, protected)
        }
    };

    apply_cmp(range, bits.cmp, total_size)
}

/// Apply the CMP (complement) bit to invert the protected range
fn apply_cmp(range: WpRange, cmp: Option<u8>, total_size: u32) -> WpRange {
    if cmp != Some(1) {
        return range;
    }

    if range.len == 0 {
        WpRange::full(total_size)
    } else if range.len == total_size {
        WpRange::none()
    } else if range.start == 0 {
        WpRange::new(range.end(), total_size - range.end())
    } else {
        WpRange::new(0, range.start)
    }
}

/// Every combination of the range bits present in `template`
fn bit_combinations(template: &WpBits) -> impl Iterator<Item = WpBits> + '_ {
    let choices = |bit: Option<u8>| -> &'static [Option<u8>] {
        if bit.is_some() {
            &[Some(0), Some(1)]
        } else {
            &[None]
        }
    };
    let max_bp: u8 = (1u8 << template.bp_count).saturating_sub(1);

    choices(template.tb).iter().flat_map(move |&tb| {
        choices(template.sec).iter().flat_map(move |&sec| {
            choices(template.cmp).iter().flat_map(move |&cmp| {
                (0..=max_bp).map(move |bp| {
                    let mut bits = *template;
                    bits.tb = tb;
                    bits.sec = sec;
                    bits.cmp = cmp;
                    bits.set_bp_value(bp, template.bp_count);
                    bits
                })
            })
        })
    })
}

/// Find WP bits that produce the given range
///
/// Returns `None` if no combination of the template's bits encodes it.
pub fn find_bits_for_range(
    target: &WpRange,
    total_size: u32,
    template: &WpBits,
    decoder: RangeDecoder,
) -> Option<WpBits> {
    bit_combinations(template).find(|bits| decode_range(bits, total_size, decoder) == *target)
}

/// All distinct ranges the template's bits can encode, sorted by start then length
pub fn all_ranges(template: &WpBits, total_size: u32, decoder: RangeDecoder) -> Vec<WpRange> {
    let mut ranges: Vec<WpRange> = Vec::new();
    for bits in bit_combinations(template) {
        let range = decode_range(&bits, total_size, decoder);
        if !ranges.contains(&range) {
            ranges.push(range);
        }
    }
    ranges.sort_by(|a, b| a.start.cmp(&b.start).then(a.len.cmp(&b.len)));
    ranges
}
