//! Table-geometry entry sizes.
//!
//! Maps `(k, table_index, phase)` to the byte width of one table entry.
//! These widths define the on-disk layout of every scratch table, so the
//! constants here are part of the plot format and must not drift.

/// Extra collation bits carried by `f` values during phase 1.
pub const EXTRA_BITS: u32 = 6;

/// Bit width of the offset component of a (pos, offset) back-pointer.
pub const OFFSET_SIZE: u32 = 10;

/// Collated-metadata vector length per table (indexed by table number;
/// entry `t` is the length for matches feeding table `t`).
const VECTOR_LENS: [u32; 8] = [0, 0, 1, 2, 4, 4, 3, 2];

/// Round a bit width up to a whole number of bytes, in bits.
const fn byte_align(bits: u32) -> u32 {
    bits + (8 - bits % 8) % 8
}

/// Largest entry size, in bytes, for `table_index` at parameter `k`.
///
/// `phase_1_size` selects the wide phase-1 layout (with `f` values and
/// metadata) over the compacted layout used from phase 2 onwards.
#[must_use]
pub fn max_entry_size(k: u8, table_index: u8, phase_1_size: bool) -> u32 {
    let k = u32::from(k);
    match table_index {
        1 => {
            // f1 and x during phase 1; bare x afterwards.
            if phase_1_size {
                byte_align(k + EXTRA_BITS + k) / 8
            } else {
                byte_align(k) / 8
            }
        }
        2..=6 => {
            if phase_1_size {
                // f, pos, offset, and collated metadata.
                let meta = k * VECTOR_LENS[usize::from(table_index) + 1];
                byte_align(k + EXTRA_BITS + (k + 1) + OFFSET_SIZE + meta) / 8
            } else {
                // pos and offset only.
                byte_align((k + 1) + OFFSET_SIZE) / 8
            }
        }
        // Table 7: f7, pos, offset.
        _ => byte_align(k + (k + 1) + OFFSET_SIZE) / 8,
    }
}

/// Byte width of a sort key plus (pos, offset) back-pointer at `k`.
#[must_use]
pub fn key_pos_offset_size(k: u8) -> u32 {
    (2 * u32::from(k) + OFFSET_SIZE).div_ceil(8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table1_compacted_width() {
        // Bare x, byte-aligned.
        assert_eq!(max_entry_size(18, 1, false), 3);
        assert_eq!(max_entry_size(32, 1, false), 4);
    }

    #[test]
    fn table1_phase1_width() {
        // k=18: 18 + 6 + 18 = 42 bits -> 6 bytes.
        assert_eq!(max_entry_size(18, 1, true), 6);
    }

    #[test]
    fn middle_tables_compacted_width_is_pos_offset() {
        // k=18: (18 + 1) + 10 = 29 bits -> 4 bytes, same for tables 2-6.
        for t in 2..=6 {
            assert_eq!(max_entry_size(18, t, false), 4);
        }
    }

    #[test]
    fn middle_tables_phase1_width_uses_metadata_vector() {
        // k=18, table 2: 18 + 6 + 19 + 10 + 18*2 = 89 bits -> 12 bytes.
        assert_eq!(max_entry_size(18, 2, true), 12);
        // k=18, table 6: 18 + 6 + 19 + 10 + 18*2 = 89 bits -> 12 bytes.
        assert_eq!(max_entry_size(18, 6, true), 12);
        // k=18, table 4: metadata len 4 -> 18 + 6 + 19 + 10 + 72 = 125 bits -> 16 bytes.
        assert_eq!(max_entry_size(18, 4, true), 16);
    }

    #[test]
    fn table7_width() {
        // k=18: 18 + 19 + 10 = 47 bits -> 6 bytes.
        assert_eq!(max_entry_size(18, 7, false), 6);
        assert_eq!(max_entry_size(18, 7, true), 6);
    }

    #[test]
    fn key_pos_offset() {
        // k=18: 36 + 10 = 46 bits -> 6 bytes.
        assert_eq!(key_pos_offset_size(18), 6);
        // k=32: 64 + 10 = 74 bits -> 10 bytes.
        assert_eq!(key_pos_offset_size(32), 10);
    }
}
