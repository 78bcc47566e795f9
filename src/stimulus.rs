//! Per-test stimulus: the timed signal protocol that loads a test's state
//! into the register file, lets the core run one instruction, and reads the
//! result back.
//!
//! Timing is carried only by `Op::Wait`, so the tick count of any sequence
//! is the sum of its waits and always agrees with the rendered script.

use crate::error::{GenError, Result};
use crate::record::{ExpectedOutcome, Half, RegPair, TestCase};

/// A signal the stimulus drives or samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Write enable of one latch half.
    LatchWe(RegPair, Half),
    /// Output enable of one latch half.
    LatchOe(RegPair, Half),
    /// Data bus of one latch half.
    LatchDb(RegPair, Half),
    /// General purpose register write enable (forced 0 = inhibited).
    GpWe,
    /// System register (PC, IR) write enable (forced 0 = inhibited).
    SysWe,
    /// Reset of the core, driven from the FPGA reset input.
    Reset,
}

impl Signal {
    pub fn width(self) -> u32 {
        match self {
            Signal::LatchDb(..) => 8,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// Advance the stimulus clock.
    Wait { ticks: u32, note: Option<&'static str> },
    /// Message to the simulation log.
    Display(String),
    Force(Signal, u8),
    Release(Signal),
    /// Zero-time write straight into the memory array.
    Poke { addr: u16, byte: u8 },
    /// Report if the latch half does not drive exactly `expected`.
    CheckLatch {
        pair: RegPair,
        half: Half,
        expected: u8,
    },
    /// Report if the memory cell does not hold exactly `expected`.
    CheckMem { addr: u16, expected: u8 },
}

/// Ticks spent by a sequence of ops.
pub fn ticks(ops: &[Op]) -> u64 {
    ops.iter()
        .map(|op| match op {
            Op::Wait { ticks, .. } => u64::from(*ticks),
            _ => 0,
        })
        .sum()
}

/// From releasing reset to the core running with all write enables free.
pub const RESET_WINDOW_TICKS: u64 = 9;
/// From the end of the execute wait to the first read-back.
pub const REINHIBIT_TICKS: u64 = 5;
/// Per-test ticks that do not depend on the instruction's length.
///
/// 26 load, 9 reset window, -6 execute offset, 5 re-inhibit, 26 check,
/// 1 closing.
pub const FIXED_TEST_TICKS: u64 = 61;
/// Harness setup before the first test.
pub const SETUP_TICKS: u64 = 2;

/// Shortest instruction whose execute wait is not negative.
pub const MIN_TSTATES: u32 = 3;

/// Ticks the core needs to execute an instruction of `tstates` T-states.
///
/// The stimulus clock runs at twice the T-state rate. The last 6 ticks of
/// the instruction are covered by the reset and re-inhibit windows. `None`
/// when the instruction is too short for that overlap, or the wait does not
/// fit in 32 bits.
pub fn execute_ticks(tstates: u32) -> Option<u32> {
    tstates.checked_mul(2)?.checked_sub(6)
}

/// Ops for one test, in script order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stimulus {
    ops: Vec<Op>,
}

impl Stimulus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn ticks(&self) -> u64 {
        ticks(&self.ops)
    }

    pub fn wait(&mut self, ticks: u32) -> &mut Self {
        self.wait_noted(ticks, None)
    }

    pub fn wait_noted(&mut self, ticks: u32, note: Option<&'static str>) -> &mut Self {
        if ticks > 0 {
            self.ops.push(Op::Wait { ticks, note });
        }
        self
    }

    pub fn force(&mut self, signal: Signal, value: u8) -> &mut Self {
        self.ops.push(Op::Force(signal, value));
        self
    }

    pub fn release(&mut self, signal: Signal) -> &mut Self {
        self.ops.push(Op::Release(signal));
        self
    }

    pub fn display(&mut self, msg: impl Into<String>) -> &mut Self {
        self.ops.push(Op::Display(msg.into()));
        self
    }

    /// Latch `value` into `pair` through its write port. 2 ticks.
    pub fn load(&mut self, pair: RegPair, value: u16) -> &mut Self {
        self.force(Signal::LatchWe(pair, Half::Lo), 1)
            .force(Signal::LatchWe(pair, Half::Hi), 1)
            .force(Signal::LatchDb(pair, Half::Lo), Half::Lo.of(value))
            .force(Signal::LatchDb(pair, Half::Hi), Half::Hi.of(value))
            .wait(1)
            .release(Signal::LatchWe(pair, Half::Lo))
            .release(Signal::LatchWe(pair, Half::Hi))
            .release(Signal::LatchDb(pair, Half::Lo))
            .release(Signal::LatchDb(pair, Half::Hi))
            .wait(1)
    }

    /// Drive `pair` onto its outputs and compare both halves. 2 ticks.
    pub fn check(&mut self, pair: RegPair, expected: u16) -> &mut Self {
        self.force(Signal::LatchOe(pair, Half::Lo), 1)
            .force(Signal::LatchOe(pair, Half::Hi), 1)
            .wait(1);
        for half in [Half::Lo, Half::Hi] {
            self.ops.push(Op::CheckLatch {
                pair,
                half,
                expected: half.of(expected),
            });
        }
        self.release(Signal::LatchOe(pair, Half::Lo))
            .release(Signal::LatchOe(pair, Half::Hi))
            .wait(1)
    }

    pub fn poke(&mut self, addr: u16, byte: u8) -> &mut Self {
        self.ops.push(Op::Poke { addr, byte });
        self
    }

    pub fn check_mem(&mut self, addr: u16, expected: u8) -> &mut Self {
        self.ops.push(Op::CheckMem { addr, expected });
        self
    }
}

/// Harness state before the first test: core held in reset, every
/// register write inhibited.
pub fn setup() -> Stimulus {
    let mut stim = Stimulus::new();
    stim.force(Signal::GpWe, 0)
        .force(Signal::SysWe, 0)
        .force(Signal::Reset, 1)
        .wait(SETUP_TICKS as u32);
    stim
}

/// Build the stimulus for one test.
///
/// Expects the core to be in reset with both write enables inhibited, and
/// leaves it the same way.
pub fn emit_test(case: &TestCase, expected: &ExpectedOutcome) -> Result<Stimulus> {
    let tstates = expected.special.tstates;
    let execute = execute_ticks(tstates).ok_or_else(|| {
        let reason = if tstates < MIN_TSTATES {
            format!("{tstates} t-states is shorter than the {MIN_TSTATES} the execute wait needs")
        } else {
            format!("execute wait for {tstates} t-states overflows")
        };
        GenError::MalformedVector {
            test: expected.name.clone(),
            line_no: expected.special_line,
            line: expected.special_text.clone(),
            reason,
        }
    })?;

    let mut stim = Stimulus::new();
    stim.display(format!("Testing opcode {}", case.description));

    for (pair, value) in case.registers.iter() {
        stim.load(pair, value);
    }
    stim.load(RegPair::IR, case.special.ir());

    for patch in &case.memory {
        for (addr, byte) in patch.cells() {
            stim.poke(addr, byte);
        }
    }

    // Once reset is released the core clears PC and IR for one T-state, so
    // system register writes stay inhibited for a while. The first T-states
    // also overlap the writeback of the (non-existent) previous
    // instruction, which must not touch the general purpose registers.
    stim.wait(1)
        .force(Signal::Reset, 0)
        .wait(2)
        .release(Signal::SysWe)
        .wait(5)
        .release(Signal::GpWe)
        .wait(1);

    stim.wait_noted(execute, Some("Execute"));

    // The core runs 2 ticks into the next instruction, but may not update
    // PC and IR again.
    stim.force(Signal::SysWe, 0)
        .wait(4)
        .force(Signal::GpWe, 0)
        .force(Signal::Reset, 1)
        .wait(1);

    for (pair, value) in expected.registers.iter() {
        stim.check(pair, value);
    }
    stim.check(RegPair::IR, expected.special.ir());

    for patch in &expected.memory {
        for (addr, byte) in patch.cells() {
            stim.check_mem(addr, byte);
        }
    }

    stim.wait(1);
    Ok(stim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{MemoryPatch, Registers, SpecialRegisters};

    fn nop(tstates: u32) -> (TestCase, ExpectedOutcome) {
        let special = SpecialRegisters {
            tstates,
            ..Default::default()
        };
        let case = TestCase {
            name: "00".into(),
            description: "00".into(),
            registers: Registers::default(),
            special,
            memory: vec![],
        };
        let expected = ExpectedOutcome {
            name: "00".into(),
            registers: Registers::default(),
            special,
            special_line: 3,
            special_text: format!("00 00 0 0 0 0 {tstates}"),
            memory: vec![],
        };
        (case, expected)
    }

    #[test]
    fn test_load_and_check_cost_two_ticks() {
        let mut stim = Stimulus::new();
        stim.load(RegPair::BC, 0x1234);
        assert_eq!(stim.ticks(), 2);
        assert!(stim
            .ops()
            .contains(&Op::Force(Signal::LatchDb(RegPair::BC, Half::Hi), 0x12)));
        assert!(stim
            .ops()
            .contains(&Op::Force(Signal::LatchDb(RegPair::BC, Half::Lo), 0x34)));

        let mut stim = Stimulus::new();
        stim.check(RegPair::BC, 0x1234);
        assert_eq!(stim.ticks(), 2);
    }

    #[test]
    fn test_nop_takes_69_ticks() {
        let (case, expected) = nop(4);
        let stim = emit_test(&case, &expected).unwrap();
        assert_eq!(stim.ticks(), 69);
    }

    #[test]
    fn test_three_tstates_has_no_execute_wait() {
        let (case, expected) = nop(3);
        let stim = emit_test(&case, &expected).unwrap();
        assert_eq!(stim.ticks(), 2 * 3 + FIXED_TEST_TICKS);
        assert!(!stim
            .ops()
            .iter()
            .any(|op| matches!(op, Op::Wait { note: Some(_), .. })));
    }

    #[test]
    fn test_short_instruction_is_rejected() {
        let (case, expected) = nop(2);
        match emit_test(&case, &expected) {
            Err(GenError::MalformedVector {
                test,
                line_no,
                line,
                reason,
            }) => {
                assert_eq!(test, "00");
                assert_eq!(line_no, 3);
                assert_eq!(line, "00 00 0 0 0 0 2");
                assert!(reason.contains("shorter"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_huge_tstates_overflow_is_rejected() {
        let (case, expected) = nop(4_000_000_000);
        match emit_test(&case, &expected) {
            Err(GenError::MalformedVector { line, reason, .. }) => {
                assert_eq!(line, "00 00 0 0 0 0 4000000000");
                assert!(reason.contains("overflows"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_memory_is_poked_and_checked() {
        let (mut case, mut expected) = nop(7);
        case.memory.push(MemoryPatch {
            start: 0x10,
            bytes: vec![1, 2],
        });
        expected.memory.push(MemoryPatch {
            start: 0x20,
            bytes: vec![3],
        });
        let stim = emit_test(&case, &expected).unwrap();
        let pokes: Vec<_> = stim
            .ops()
            .iter()
            .filter(|op| matches!(op, Op::Poke { .. }))
            .collect();
        assert_eq!(
            pokes,
            vec![
                &Op::Poke { addr: 0x10, byte: 1 },
                &Op::Poke { addr: 0x11, byte: 2 }
            ]
        );
        assert!(stim.ops().contains(&Op::CheckMem {
            addr: 0x20,
            expected: 3
        }));
        assert_eq!(stim.ticks(), 2 * 7 + FIXED_TEST_TICKS);
    }

    #[test]
    fn test_setup_leaves_core_in_reset() {
        let stim = setup();
        assert_eq!(stim.ticks(), SETUP_TICKS);
        assert_eq!(stim.ops()[2], Op::Force(Signal::Reset, 1));
    }
}
