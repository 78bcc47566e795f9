//! SystemVerilog rendering of stimulus ops.
//!
//! The generated file is `include`d into the body of the testbench's
//! `initial` block, so everything is plain procedural statements. A wait
//! becomes a `#n` delay prefixed to the statement after it.

use std::fmt::Write as _;

use crate::stimulus::{Op, Signal};

/// Where the signals live in the testbench.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hierarchy {
    /// Instance name of the CPU core.
    pub dut: String,
    /// Memory array of the RAM model.
    pub ram: String,
    /// File handle diagnostics are written to.
    pub log_handle: String,
}

impl Default for Hierarchy {
    fn default() -> Self {
        Self {
            dut: "dut".into(),
            ram: "ram.Mem".into(),
            log_handle: "f".into(),
        }
    }
}

impl Hierarchy {
    pub fn signal(&self, signal: Signal) -> String {
        let dut = &self.dut;
        match signal {
            Signal::LatchWe(pair, half) => {
                format!("{dut}.reg_file.b2v_latch_{pair}_{}.we", half.suffix())
            }
            Signal::LatchOe(pair, half) => {
                format!("{dut}.reg_file.b2v_latch_{pair}_{}.oe", half.suffix())
            }
            Signal::LatchDb(pair, half) => {
                format!("{dut}.reg_file.b2v_latch_{pair}_{}.db", half.suffix())
            }
            Signal::GpWe => format!("{dut}.reg_file.reg_gp_we"),
            Signal::SysWe => format!("{dut}.reg_control.ctl_reg_sys_we"),
            Signal::Reset => format!("{dut}.z80_top.fpga_reset"),
        }
    }

    pub fn mem(&self, addr: u16) -> String {
        format!("{}[{addr}]", self.ram)
    }
}

/// Literal for `value` sized to `signal`.
fn literal(signal: Signal, value: u8) -> String {
    match signal.width() {
        8 => format!("8'h{value:02x}"),
        _ => value.to_string(),
    }
}

/// Make `text` safe inside a `$fdisplay` format string.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '%' => out.push_str("%%"),
            c => out.push(c),
        }
    }
    out
}

pub struct ScriptWriter<'h> {
    hier: &'h Hierarchy,
    out: String,
    pending: Option<u32>,
    block_start: bool,
}

impl<'h> ScriptWriter<'h> {
    pub fn new(hier: &'h Hierarchy) -> Self {
        Self {
            hier,
            out: String::new(),
            pending: None,
            block_start: true,
        }
    }

    fn flush_wait(&mut self) {
        if let Some(ticks) = self.pending.take() {
            let _ = writeln!(self.out, "#{ticks}");
        }
    }

    fn stmt(&mut self, text: &str) {
        let lead = match self.pending.take() {
            Some(ticks) => format!("#{ticks} "),
            None if self.block_start => String::new(),
            None => "   ".to_string(),
        };
        let _ = writeln!(self.out, "{lead}{text}");
        self.block_start = false;
    }

    /// A line written as is, after any pending delay.
    pub fn raw(&mut self, text: &str) {
        self.flush_wait();
        let _ = writeln!(self.out, "{text}");
        self.block_start = true;
    }

    pub fn comment(&mut self, text: &str) {
        self.raw(&format!("//{text}"));
    }

    pub fn blank(&mut self) {
        self.raw("");
    }

    pub fn define(&mut self, name: &str, value: impl std::fmt::Display) {
        self.raw(&format!("`define {name} {value}"));
    }

    pub fn display(&mut self, msg: &str) {
        let f = &self.hier.log_handle;
        let text = format!("$fdisplay({f},\"{}\");", escape(msg));
        self.stmt(&text);
    }

    pub fn op(&mut self, op: &Op) {
        let hier = self.hier;
        match op {
            Op::Wait { ticks, note: None } => {
                self.flush_wait();
                self.pending = Some(*ticks);
            }
            Op::Wait {
                ticks,
                note: Some(note),
            } => {
                self.flush_wait();
                let _ = writeln!(self.out, "#{ticks} // {note}");
                self.block_start = false;
            }
            Op::Display(msg) => self.display(msg),
            Op::Force(signal, value) => {
                let text = format!("force {}={};", hier.signal(*signal), literal(*signal, *value));
                self.stmt(&text);
            }
            Op::Release(signal) => {
                let text = format!("release {};", hier.signal(*signal));
                self.stmt(&text);
            }
            Op::Poke { addr, byte } => {
                let text = format!("{} = 8'h{byte:02x};", hier.mem(*addr));
                self.stmt(&text);
            }
            Op::CheckLatch {
                pair,
                half,
                expected,
            } => {
                let db = hier.signal(Signal::LatchDb(*pair, *half));
                let label = pair.half_label(*half);
                let text = format!(
                    "if ({db}!==8'h{expected:02x}) $fdisplay({f},\"* Reg {pair} {label}=%h !={expected:02x}\",{db});",
                    f = hier.log_handle,
                );
                self.stmt(&text);
            }
            Op::CheckMem { addr, expected } => {
                let cell = hier.mem(*addr);
                let text = format!(
                    "if ({cell}!==8'h{expected:02x}) $fdisplay({f},\"* Mem[{addr:x}]=%h !={expected:02x}\",{cell});",
                    f = hier.log_handle,
                );
                self.stmt(&text);
            }
        }
    }

    pub fn ops(&mut self, ops: &[Op]) {
        for op in ops {
            self.op(op);
        }
    }

    pub fn finish(mut self) -> String {
        self.flush_wait();
        self.out
    }
}

/// Render a list of ops on its own, mostly useful for inspection.
pub fn render(hier: &Hierarchy, ops: &[Op]) -> String {
    let mut w = ScriptWriter::new(hier);
    w.ops(ops);
    w.finish()
}
