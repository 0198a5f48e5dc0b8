//! Instruction execution
//!
//! One routine per instruction class. Each routine reads its operands
//! through the register file (so reads of x0 yield zero), computes the
//! RV32I result, optionally emits a single annotated trace line, and
//! writes back to the register file and/or memory before advancing the
//! pc. Branches, jumps and the halting instructions update the pc
//! themselves.
//!
//! Trace lines consist of the rendered instruction left-justified in a
//! 35-character field followed by `// ` and a commentary showing the
//! live operand values.

use crate::hart::Hart;
use crate::hex::hex0x32;
use crate::instr::{Branch, Instr, Load, RegImm, RegReg, Shift, Store};
use crate::render;

/// Width of the rendered-instruction field preceding the `//`
/// commentary in a trace line.
pub const INSTRUCTION_WIDTH: usize = 35;

/// Receives one rendered line per executed instruction.
pub trait TraceSink {
    fn line(&mut self, line: &str);

    /// Whether lines passed to this sink are observable. Executors
    /// skip formatting entirely when they are not.
    fn active(&self) -> bool {
        true
    }
}

/// Prints each trace line to standard output.
pub struct StdoutTrace;

impl TraceSink for StdoutTrace {
    fn line(&mut self, line: &str) {
        println!("{line}");
    }
}

/// Discards all trace output; used when instruction printing is off.
pub struct NullTrace;

impl TraceSink for NullTrace {
    fn line(&mut self, _line: &str) {}

    fn active(&self) -> bool {
        false
    }
}

/// Collects trace lines for inspection in tests.
impl TraceSink for Vec<String> {
    fn line(&mut self, line: &str) {
        self.push(line.to_string());
    }
}

fn traceln(trace: &mut dyn TraceSink, rendered: &str, comment: &str) {
    trace.line(&format!("{rendered:<w$}// {comment}", w = INSTRUCTION_WIDTH));
}

/// Execute one decoded instruction against the hart state.
pub fn execute(hart: &mut Hart, instr: Instr, trace: &mut dyn TraceSink) {
    match instr {
        Instr::Lui { rd, imm_u } => exec_lui(hart, rd, imm_u, trace),
        Instr::Auipc { rd, imm_u } => exec_auipc(hart, rd, imm_u, trace),
        Instr::Jal { rd, imm_j } => exec_jal(hart, rd, imm_j, trace),
        Instr::Jalr { rd, rs1, imm_i } => exec_jalr(hart, rd, rs1, imm_i, trace),
        Instr::Branch {
            mnemonic,
            rs1,
            rs2,
            imm_b,
        } => exec_branch(hart, mnemonic, rs1, rs2, imm_b, trace),
        Instr::Load {
            mnemonic,
            rd,
            rs1,
            imm_i,
        } => exec_load(hart, mnemonic, rd, rs1, imm_i, trace),
        Instr::Store {
            mnemonic,
            rs1,
            rs2,
            imm_s,
        } => exec_store(hart, mnemonic, rs1, rs2, imm_s, trace),
        Instr::RegImm {
            mnemonic,
            rd,
            rs1,
            imm_i,
        } => exec_reg_imm(hart, mnemonic, rd, rs1, imm_i, trace),
        Instr::Shift {
            mnemonic,
            rd,
            rs1,
            shamt,
        } => exec_shift(hart, mnemonic, rd, rs1, shamt, trace),
        Instr::RegReg {
            mnemonic,
            rd,
            rs1,
            rs2,
        } => exec_reg_reg(hart, mnemonic, rd, rs1, rs2, trace),
        Instr::Fence { pred, succ } => exec_fence(hart, pred, succ, trace),
        Instr::Ebreak => exec_halt(hart, "ebreak", trace),
        Instr::Ecall => exec_halt(hart, "ecall", trace),
        Instr::Illegal => exec_illegal(hart, trace),
    }
}

/// rd := imm_u (upper 20 bits of the word, low 12 bits zero)
fn exec_lui(hart: &mut Hart, rd: u32, imm_u: i32, trace: &mut dyn TraceSink) {
    if trace.active() {
        let text = render::utype("lui", rd, imm_u);
        traceln(trace, &text, &format!("x{rd} = {}", hex0x32(imm_u as u32)));
    }
    hart.regs.set(rd, imm_u);
    hart.pc = hart.pc.wrapping_add(4);
}

/// rd := pc + imm_u
fn exec_auipc(hart: &mut Hart, rd: u32, imm_u: i32, trace: &mut dyn TraceSink) {
    let value = hart.pc.wrapping_add(imm_u as u32);
    if trace.active() {
        let text = render::utype("auipc", rd, imm_u);
        let comment = format!(
            "x{rd} = {} + {} = {}",
            hex0x32(hart.pc),
            hex0x32(imm_u as u32),
            hex0x32(value)
        );
        traceln(trace, &text, &comment);
    }
    hart.regs.set(rd, value as i32);
    hart.pc = hart.pc.wrapping_add(4);
}

/// rd := pc + 4; pc := pc + imm_j
fn exec_jal(hart: &mut Hart, rd: u32, imm_j: i32, trace: &mut dyn TraceSink) {
    let link = hart.pc.wrapping_add(4);
    let target = hart.pc.wrapping_add(imm_j as u32);
    if trace.active() {
        let text = render::jal(rd, imm_j, hart.pc);
        let comment = format!(
            "x{rd} = {},  pc = {} + {} = {}",
            hex0x32(link),
            hex0x32(hart.pc),
            hex0x32(imm_j as u32),
            hex0x32(target)
        );
        traceln(trace, &text, &comment);
    }
    hart.regs.set(rd, link as i32);
    hart.pc = target;
}

/// rd := pc + 4; pc := (rs1 + imm_i) with the lowest bit cleared
fn exec_jalr(hart: &mut Hart, rd: u32, rs1: u32, imm_i: i32, trace: &mut dyn TraceSink) {
    let base = hart.regs.get(rs1) as u32;
    let link = hart.pc.wrapping_add(4);
    let target = base.wrapping_add(imm_i as u32) & 0xffff_fffe;
    if trace.active() {
        let text = render::itype_load("jalr", rd, rs1, imm_i);
        let comment = format!(
            "x{rd} = {},  pc = ({} + {}) & {} = {}",
            hex0x32(link),
            hex0x32(imm_i as u32),
            hex0x32(base),
            hex0x32(0xffff_fffe),
            hex0x32(target)
        );
        traceln(trace, &text, &comment);
    }
    hart.regs.set(rd, link as i32);
    hart.pc = target;
}

/// Compare rs1 and rs2; on success pc += imm_b, otherwise pc += 4
fn exec_branch(
    hart: &mut Hart,
    mnemonic: Branch,
    rs1: u32,
    rs2: u32,
    imm_b: i32,
    trace: &mut dyn TraceSink,
) {
    let lhs = hart.regs.get(rs1);
    let rhs = hart.regs.get(rs2);
    let taken = match mnemonic {
        Branch::Beq => lhs == rhs,
        Branch::Bne => lhs != rhs,
        Branch::Blt => lhs < rhs,
        Branch::Bge => lhs >= rhs,
        Branch::Bltu => (lhs as u32) < (rhs as u32),
        Branch::Bgeu => (lhs as u32) >= (rhs as u32),
    };
    let step = if taken { imm_b as u32 } else { 4 };
    let target = hart.pc.wrapping_add(step);
    if trace.active() {
        let op = match mnemonic {
            Branch::Beq => "==",
            Branch::Bne => "!=",
            Branch::Blt => "<",
            Branch::Bge => ">=",
            Branch::Bltu => "<U",
            Branch::Bgeu => ">=U",
        };
        let text = render::btype(mnemonic.mnemonic(), rs1, rs2, imm_b, hart.pc);
        let comment = format!(
            "pc += ({} {op} {} ? {} : 4) = {}",
            hex0x32(lhs as u32),
            hex0x32(rhs as u32),
            hex0x32(imm_b as u32),
            hex0x32(target)
        );
        traceln(trace, &text, &comment);
    }
    hart.pc = target;
}

/// rd := extended memory value at rs1 + imm_i
fn exec_load(
    hart: &mut Hart,
    mnemonic: Load,
    rd: u32,
    rs1: u32,
    imm_i: i32,
    trace: &mut dyn TraceSink,
) {
    let base = hart.regs.get(rs1) as u32;
    let address = base.wrapping_add(imm_i as u32);
    // The memory read happens before the trace line so that any
    // out-of-range warning precedes it, as in the hardware dumps
    let (value, tag) = match mnemonic {
        Load::Lb => (hart.mem.get8(address) as i8 as i32, "sx(m8"),
        Load::Lh => (hart.mem.get16(address) as i16 as i32, "sx(m16"),
        Load::Lw => (hart.mem.get32(address) as i32, "sx(m32"),
        Load::Lbu => (hart.mem.get8(address) as i32, "zx(m8"),
        Load::Lhu => (hart.mem.get16(address) as i32, "zx(m16"),
    };
    if trace.active() {
        let text = render::itype_load(mnemonic.mnemonic(), rd, rs1, imm_i);
        let comment = format!(
            "x{rd} = {tag}({} + {})) = {}",
            hex0x32(base),
            hex0x32(imm_i as u32),
            hex0x32(value as u32)
        );
        traceln(trace, &text, &comment);
    }
    hart.regs.set(rd, value);
    hart.pc = hart.pc.wrapping_add(4);
}

/// memory at rs1 + imm_s := low bits of rs2
fn exec_store(
    hart: &mut Hart,
    mnemonic: Store,
    rs1: u32,
    rs2: u32,
    imm_s: i32,
    trace: &mut dyn TraceSink,
) {
    let base = hart.regs.get(rs1) as u32;
    let address = base.wrapping_add(imm_s as u32);
    let full = hart.regs.get(rs2) as u32;
    let (value, tag) = match mnemonic {
        Store::Sb => (full & 0xff, "m8"),
        Store::Sh => (full & 0xffff, "m16"),
        Store::Sw => (full, "m32"),
    };
    if trace.active() {
        let text = render::stype(mnemonic.mnemonic(), rs1, rs2, imm_s);
        let comment = format!(
            "{tag}({} + {}) = {}",
            hex0x32(base),
            hex0x32(imm_s as u32),
            hex0x32(value)
        );
        traceln(trace, &text, &comment);
    }
    match mnemonic {
        Store::Sb => hart.mem.set8(address, value as u8),
        Store::Sh => hart.mem.set16(address, value as u16),
        Store::Sw => hart.mem.set32(address, value),
    }
    hart.pc = hart.pc.wrapping_add(4);
}

/// rd := rs1 op sign-extended imm_i
fn exec_reg_imm(
    hart: &mut Hart,
    mnemonic: RegImm,
    rd: u32,
    rs1: u32,
    imm_i: i32,
    trace: &mut dyn TraceSink,
) {
    let src = hart.regs.get(rs1);
    let value = match mnemonic {
        RegImm::Addi => src.wrapping_add(imm_i),
        RegImm::Slti => (src < imm_i) as i32,
        RegImm::Sltiu => ((src as u32) < imm_i as u32) as i32,
        RegImm::Xori => src ^ imm_i,
        RegImm::Ori => src | imm_i,
        RegImm::Andi => src & imm_i,
    };
    if trace.active() {
        let text = render::itype_alu(mnemonic.mnemonic(), rd, rs1, imm_i);
        let comment = match mnemonic {
            RegImm::Slti => format!(
                "x{rd} = ({} < {imm_i}) ? 1 : 0 = {}",
                hex0x32(src as u32),
                hex0x32(value as u32)
            ),
            RegImm::Sltiu => format!(
                "x{rd} = ({} <U {}) ? 1 : 0 = {}",
                hex0x32(src as u32),
                imm_i as u32,
                hex0x32(value as u32)
            ),
            _ => {
                let op = match mnemonic {
                    RegImm::Addi => "+",
                    RegImm::Xori => "^",
                    RegImm::Ori => "|",
                    RegImm::Andi => "&",
                    RegImm::Slti | RegImm::Sltiu => unreachable!(),
                };
                format!(
                    "x{rd} = {} {op} {} = {}",
                    hex0x32(src as u32),
                    hex0x32(imm_i as u32),
                    hex0x32(value as u32)
                )
            }
        };
        traceln(trace, &text, &comment);
    }
    hart.regs.set(rd, value);
    hart.pc = hart.pc.wrapping_add(4);
}

/// rd := rs1 shifted by the 5-bit shamt; srai preserves the sign
fn exec_shift(
    hart: &mut Hart,
    mnemonic: Shift,
    rd: u32,
    rs1: u32,
    shamt: u32,
    trace: &mut dyn TraceSink,
) {
    let src = hart.regs.get(rs1);
    let value = match mnemonic {
        Shift::Slli => ((src as u32) << shamt) as i32,
        Shift::Srli => ((src as u32) >> shamt) as i32,
        Shift::Srai => src >> shamt,
    };
    if trace.active() {
        let op = match mnemonic {
            Shift::Slli => "<<",
            Shift::Srli | Shift::Srai => ">>",
        };
        let text = render::itype_shift(mnemonic.mnemonic(), rd, rs1, shamt);
        let comment = format!(
            "x{rd} = {} {op} {shamt} = {}",
            hex0x32(src as u32),
            hex0x32(value as u32)
        );
        traceln(trace, &text, &comment);
    }
    hart.regs.set(rd, value);
    hart.pc = hart.pc.wrapping_add(4);
}

/// rd := rs1 op rs2; shifts use the low five bits of rs2
fn exec_reg_reg(
    hart: &mut Hart,
    mnemonic: RegReg,
    rd: u32,
    rs1: u32,
    rs2: u32,
    trace: &mut dyn TraceSink,
) {
    let lhs = hart.regs.get(rs1);
    let rhs = hart.regs.get(rs2);
    let shift = rhs as u32 & 0x1f;
    let value = match mnemonic {
        RegReg::Add => lhs.wrapping_add(rhs),
        RegReg::Sub => lhs.wrapping_sub(rhs),
        RegReg::Sll => ((lhs as u32) << shift) as i32,
        RegReg::Slt => (lhs < rhs) as i32,
        RegReg::Sltu => ((lhs as u32) < (rhs as u32)) as i32,
        RegReg::Xor => lhs ^ rhs,
        RegReg::Srl => ((lhs as u32) >> shift) as i32,
        RegReg::Sra => lhs >> shift,
        RegReg::Or => lhs | rhs,
        RegReg::And => lhs & rhs,
    };
    if trace.active() {
        let text = render::rtype(mnemonic.mnemonic(), rd, rs1, rs2);
        let comment = match mnemonic {
            RegReg::Slt => format!(
                "x{rd} = ({} < {}) ? 1 : 0 = {}",
                hex0x32(lhs as u32),
                hex0x32(rhs as u32),
                hex0x32(value as u32)
            ),
            RegReg::Sltu => format!(
                "x{rd} = ({} <U {}) ? 1 : 0 = {}",
                hex0x32(lhs as u32),
                hex0x32(rhs as u32),
                hex0x32(value as u32)
            ),
            RegReg::Sll => format!(
                "x{rd} = {} << {shift} = {}",
                hex0x32(lhs as u32),
                hex0x32(value as u32)
            ),
            RegReg::Srl | RegReg::Sra => format!(
                "x{rd} = {} >> {shift} = {}",
                hex0x32(lhs as u32),
                hex0x32(value as u32)
            ),
            _ => {
                let op = match mnemonic {
                    RegReg::Add => "+",
                    RegReg::Sub => "-",
                    RegReg::Xor => "^",
                    RegReg::Or => "|",
                    RegReg::And => "&",
                    _ => unreachable!(),
                };
                format!(
                    "x{rd} = {} {op} {} = {}",
                    hex0x32(lhs as u32),
                    hex0x32(rhs as u32),
                    hex0x32(value as u32)
                )
            }
        };
        traceln(trace, &text, &comment);
    }
    hart.regs.set(rd, value);
    hart.pc = hart.pc.wrapping_add(4);
}

/// Memory ordering is trivially satisfied in a single-hart world, so
/// fence is an observable no-op
fn exec_fence(hart: &mut Hart, pred: u32, succ: u32, trace: &mut dyn TraceSink) {
    if trace.active() {
        traceln(trace, &render::fence(pred, succ), "fence");
    }
    hart.pc = hart.pc.wrapping_add(4);
}

/// ebreak and ecall both terminate the run; pc is left unchanged
fn exec_halt(hart: &mut Hart, mnemonic: &str, trace: &mut dyn TraceSink) {
    if trace.active() {
        traceln(trace, mnemonic, "HALT");
    }
    hart.halt = true;
}

/// An unrecognized encoding halts the hart; the marker line has no
/// commentary
fn exec_illegal(hart: &mut Hart, trace: &mut dyn TraceSink) {
    if trace.active() {
        trace.line(&format!("{:<w$}", render::illegal(), w = INSTRUCTION_WIDTH));
    }
    hart.halt = true;
}
