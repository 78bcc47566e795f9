//! Structured form of one test vector.

use std::fmt;

/// A latch pair of the register file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegPair {
    AF,
    BC,
    DE,
    HL,
    AF2,
    BC2,
    DE2,
    HL2,
    IX,
    IY,
    SP,
    PC,
    /// I and R, latched together.
    IR,
}

/// The 12 general pairs in the order the vector files list them.
pub const GENERAL_PAIRS: [RegPair; 12] = [
    RegPair::AF,
    RegPair::BC,
    RegPair::DE,
    RegPair::HL,
    RegPair::AF2,
    RegPair::BC2,
    RegPair::DE2,
    RegPair::HL2,
    RegPair::IX,
    RegPair::IY,
    RegPair::SP,
    RegPair::PC,
];

/// One 8-bit half of a latch pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Half {
    Hi,
    Lo,
}

impl Half {
    pub fn suffix(self) -> &'static str {
        match self {
            Half::Hi => "hi",
            Half::Lo => "lo",
        }
    }

    pub fn of(self, value: u16) -> u8 {
        match self {
            Half::Hi => (value >> 8) as u8,
            Half::Lo => value as u8,
        }
    }
}

impl RegPair {
    /// Name of the pair's latches in the register file netlist.
    pub fn latch_name(self) -> &'static str {
        match self {
            RegPair::AF => "af",
            RegPair::BC => "bc",
            RegPair::DE => "de",
            RegPair::HL => "hl",
            RegPair::AF2 => "af2",
            RegPair::BC2 => "bc2",
            RegPair::DE2 => "de2",
            RegPair::HL2 => "hl2",
            RegPair::IX => "ix",
            RegPair::IY => "iy",
            RegPair::SP => "sp",
            RegPair::PC => "pc",
            RegPair::IR => "ir",
        }
    }

    /// Letter used for one half in mismatch reports: `a`/`f` for AF, etc.
    pub fn half_label(self, half: Half) -> char {
        let mut letters = self.latch_name().chars();
        let hi = letters.next().unwrap_or('?');
        let lo = letters.next().unwrap_or('?');
        match half {
            Half::Hi => hi,
            Half::Lo => lo,
        }
    }
}

impl fmt::Display for RegPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.latch_name())
    }
}

/// The 12 general register pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Registers([u16; 12]);

impl Registers {
    pub fn new(values: [u16; 12]) -> Self {
        Self(values)
    }

    pub fn get(&self, pair: RegPair) -> Option<u16> {
        GENERAL_PAIRS
            .iter()
            .position(|&p| p == pair)
            .map(|i| self.0[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (RegPair, u16)> + '_ {
        GENERAL_PAIRS.iter().copied().zip(self.0.iter().copied())
    }
}

/// The `I R IFF1 IFF2 IM halted tstates` line.
///
/// Only `i` and `r` are driven into the core today. The interrupt state and
/// the halt flag are kept so they can be wired in without reparsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpecialRegisters {
    pub i: u8,
    pub r: u8,
    pub iff1: bool,
    pub iff2: bool,
    pub im: u8,
    pub halted: bool,
    pub tstates: u32,
}

impl SpecialRegisters {
    /// I and R as the value of the combined IR latch pair.
    pub fn ir(&self) -> u16 {
        (u16::from(self.i) << 8) | u16::from(self.r)
    }
}

/// A contiguous run of bytes starting at `start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryPatch {
    pub start: u16,
    pub bytes: Vec<u8>,
}

impl MemoryPatch {
    /// `(address, byte)` for every cell of the patch.
    pub fn cells(&self) -> impl Iterator<Item = (u16, u8)> + '_ {
        self.bytes
            .iter()
            .enumerate()
            .map(move |(i, &b)| (self.start.wrapping_add(i as u16), b))
    }
}

/// Initial state for one test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub name: String,
    /// The whole first line of the block, name included.
    pub description: String,
    pub registers: Registers,
    pub special: SpecialRegisters,
    pub memory: Vec<MemoryPatch>,
}

/// Expected final state for one test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedOutcome {
    pub name: String,
    pub registers: Registers,
    pub special: SpecialRegisters,
    /// Line number and text of the special register line in the expected
    /// file.
    pub special_line: usize,
    pub special_text: String,
    /// Addresses not listed here are not checked.
    pub memory: Vec<MemoryPatch>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_labels() {
        assert_eq!(RegPair::AF.half_label(Half::Hi), 'a');
        assert_eq!(RegPair::AF.half_label(Half::Lo), 'f');
        assert_eq!(RegPair::HL2.half_label(Half::Lo), 'l');
        assert_eq!(RegPair::IR.half_label(Half::Hi), 'i');
    }

    #[test]
    fn test_registers_iterate_in_file_order() {
        let regs = Registers::new([0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]);
        let order: Vec<_> = regs.iter().collect();
        assert_eq!(order[0], (RegPair::AF, 0));
        assert_eq!(order[4], (RegPair::AF2, 4));
        assert_eq!(order[11], (RegPair::PC, 11));
        assert_eq!(regs.get(RegPair::SP), Some(10));
        assert_eq!(regs.get(RegPair::IR), None);
    }

    #[test]
    fn test_ir_packs_i_high() {
        let special = SpecialRegisters {
            i: 0x12,
            r: 0x34,
            ..Default::default()
        };
        assert_eq!(special.ir(), 0x1234);
        assert_eq!(Half::Hi.of(0x1234), 0x12);
        assert_eq!(Half::Lo.of(0x1234), 0x34);
    }

    #[test]
    fn test_patch_cells_are_contiguous() {
        let patch = MemoryPatch {
            start: 0x0100,
            bytes: vec![0xaa, 0xbb, 0xcc],
        };
        let cells: Vec<_> = patch.cells().collect();
        assert_eq!(cells, vec![(0x0100, 0xaa), (0x0101, 0xbb), (0x0102, 0xcc)]);
    }
}
