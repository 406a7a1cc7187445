//! SAM alignment flag bits.

pub const PAIRED: u16 = 0x1;
pub const UNMAPPED: u16 = 0x4;
pub const MATE_UNMAPPED: u16 = 0x8;
pub const REVERSE: u16 = 0x10;
pub const FIRST_IN_PAIR: u16 = 0x40;
pub const SECOND_IN_PAIR: u16 = 0x80;
pub const SECONDARY: u16 = 0x100;

/// Named predicates of a raw flag. Bits not listed here are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    pub unmapped: bool,
    pub mate_unmapped: bool,
    pub reverse: bool,
    pub secondary: bool,
    pub first_in_pair: bool,
    pub second_in_pair: bool,
}

impl Flags {
    #[inline]
    pub const fn decode(flag: u16) -> Self {
        Self {
            unmapped: flag & UNMAPPED != 0,
            mate_unmapped: flag & MATE_UNMAPPED != 0,
            reverse: flag & REVERSE != 0,
            secondary: flag & SECONDARY != 0,
            first_in_pair: flag & FIRST_IN_PAIR != 0,
            second_in_pair: flag & SECOND_IN_PAIR != 0,
        }
    }
}

/// Flag for a fully de-mapped mate: paired, unmapped, mate unmapped, keeping
/// only the first/second-in-pair bits of `flag`.
#[inline]
pub const fn demapped(flag: u16) -> u16 {
    (flag & (FIRST_IN_PAIR | SECOND_IN_PAIR)) | PAIRED | UNMAPPED | MATE_UNMAPPED
}
