//! Canonical assembler-style rendering
//!
//! Each decoded instruction maps to exactly one line of text: the
//! mnemonic left-justified in an 8-character field followed by the
//! operand list. Branch and jal targets are pc-relative, so those
//! renderers take the address the instruction was fetched from.

use crate::instr::Instr;

/// Width of the left-justified mnemonic field.
pub const MNEMONIC_WIDTH: usize = 8;

/// Render the canonical text of a decoded instruction. `pc` is the
/// address the instruction was fetched from; it only affects the
/// pc-relative targets of `jal` and the branches.
pub fn render(instr: &Instr, pc: u32) -> String {
    match *instr {
        Instr::Lui { rd, imm_u } => utype("lui", rd, imm_u),
        Instr::Auipc { rd, imm_u } => utype("auipc", rd, imm_u),
        Instr::Jal { rd, imm_j } => jal(rd, imm_j, pc),
        Instr::Jalr { rd, rs1, imm_i } => itype_load("jalr", rd, rs1, imm_i),
        Instr::Branch {
            mnemonic,
            rs1,
            rs2,
            imm_b,
        } => btype(mnemonic.mnemonic(), rs1, rs2, imm_b, pc),
        Instr::Load {
            mnemonic,
            rd,
            rs1,
            imm_i,
        } => itype_load(mnemonic.mnemonic(), rd, rs1, imm_i),
        Instr::Store {
            mnemonic,
            rs1,
            rs2,
            imm_s,
        } => stype(mnemonic.mnemonic(), rs1, rs2, imm_s),
        Instr::RegImm {
            mnemonic,
            rd,
            rs1,
            imm_i,
        } => itype_alu(mnemonic.mnemonic(), rd, rs1, imm_i),
        Instr::Shift {
            mnemonic,
            rd,
            rs1,
            shamt,
        } => itype_shift(mnemonic.mnemonic(), rd, rs1, shamt),
        Instr::RegReg {
            mnemonic,
            rd,
            rs1,
            rs2,
        } => rtype(mnemonic.mnemonic(), rd, rs1, rs2),
        Instr::Fence { pred, succ } => fence(pred, succ),
        Instr::Ebreak => "ebreak".to_string(),
        Instr::Ecall => "ecall".to_string(),
        Instr::Illegal => illegal(),
    }
}

/// The marker emitted for any word outside the recognized encodings.
pub fn illegal() -> String {
    "ERROR: UNIMPLEMENTED INSTRUCTION".to_string()
}

/// `lui`/`auipc`: the upper-immediate operand prints as the raw 20-bit
/// field, without sign.
pub(crate) fn utype(mnemonic: &str, rd: u32, imm_u: i32) -> String {
    let upper = (imm_u as u32 >> 12) & 0xfffff;
    format!("{mnemonic:<w$}x{rd},0x{upper:x}", w = MNEMONIC_WIDTH)
}

pub(crate) fn jal(rd: u32, imm_j: i32, pc: u32) -> String {
    let target = pc.wrapping_add(imm_j as u32);
    format!("{:<w$}x{rd},0x{target:x}", "jal", w = MNEMONIC_WIDTH)
}

pub(crate) fn btype(mnemonic: &str, rs1: u32, rs2: u32, imm_b: i32, pc: u32) -> String {
    let target = pc.wrapping_add(imm_b as u32);
    format!("{mnemonic:<w$}x{rs1},x{rs2},0x{target:x}", w = MNEMONIC_WIDTH)
}

/// Loads and `jalr` share the `rd,imm(rs1)` shape.
pub(crate) fn itype_load(mnemonic: &str, rd: u32, rs1: u32, imm_i: i32) -> String {
    format!("{mnemonic:<w$}x{rd},{imm_i}(x{rs1})", w = MNEMONIC_WIDTH)
}

pub(crate) fn stype(mnemonic: &str, rs1: u32, rs2: u32, imm_s: i32) -> String {
    format!("{mnemonic:<w$}x{rs2},{imm_s}(x{rs1})", w = MNEMONIC_WIDTH)
}

pub(crate) fn itype_alu(mnemonic: &str, rd: u32, rs1: u32, imm_i: i32) -> String {
    format!("{mnemonic:<w$}x{rd},x{rs1},{imm_i}", w = MNEMONIC_WIDTH)
}

pub(crate) fn itype_shift(mnemonic: &str, rd: u32, rs1: u32, shamt: u32) -> String {
    format!("{mnemonic:<w$}x{rd},x{rs1},{shamt}", w = MNEMONIC_WIDTH)
}

pub(crate) fn rtype(mnemonic: &str, rd: u32, rs1: u32, rs2: u32) -> String {
    format!("{mnemonic:<w$}x{rd},x{rs1},x{rs2}", w = MNEMONIC_WIDTH)
}

pub(crate) fn fence(pred: u32, succ: u32) -> String {
    format!(
        "{:<w$}{},{}",
        "fence",
        fence_flags(pred),
        fence_flags(succ),
        w = MNEMONIC_WIDTH
    )
}

/// Expand a 4-bit pred/succ field into the canonical `iorw` letters.
/// All 16 values decode structurally; zero renders as empty.
fn fence_flags(bits: u32) -> String {
    let mut flags = String::new();
    if bits & 0b1000 != 0 {
        flags.push('i');
    }
    if bits & 0b0100 != 0 {
        flags.push('o');
    }
    if bits & 0b0010 != 0 {
        flags.push('r');
    }
    if bits & 0b0001 != 0 {
        flags.push('w');
    }
    flags
}

#[cfg(test)]
mod tests {

    use super::*;

    fn rendered(insn: u32, pc: u32) -> String {
        render(&Instr::decode(insn), pc)
    }

    #[test]
    fn check_utype_rendering() {
        assert_eq!(rendered(0x1234_5137, 0), "lui     x2,0x12345");
        assert_eq!(rendered(0x0000_1197, 0), "auipc   x3,0x1");
        // negative upper immediate prints unsigned
        assert_eq!(rendered(0xffff_f0b7, 0), "lui     x1,0xfffff");
    }

    #[test]
    fn check_jal_target_is_pc_relative() {
        // jal x1, 8 fetched from 0x10
        assert_eq!(rendered(0x0080_00ef, 0x10), "jal     x1,0x18");
    }

    #[test]
    fn check_branch_target_is_pc_relative() {
        // beq x1, x2, 16 fetched from 4
        assert_eq!(rendered(0x0020_8863, 4), "beq     x1,x2,0x14");
        // bne x1, x2, -4 fetched from 8
        assert_eq!(rendered(0xfe20_9ee3, 8), "bne     x1,x2,0x4");
    }

    #[test]
    fn check_load_store_rendering() {
        // lw x2, 0(x1)
        assert_eq!(rendered(0x0000_a103, 0), "lw      x2,0(x1)");
        // sw x2, 8(x1)
        assert_eq!(rendered(0x0020_a423, 0), "sw      x2,8(x1)");
        // lb x1, -1(x2)
        assert_eq!(rendered(0xfff1_0083, 0), "lb      x1,-1(x2)");
    }

    #[test]
    fn check_jalr_uses_load_shape() {
        // jalr x1, 4(x5)
        assert_eq!(rendered(0x0042_80e7, 0), "jalr    x1,4(x5)");
    }

    #[test]
    fn check_alu_rendering() {
        assert_eq!(rendered(0x0050_0093, 0), "addi    x1,x0,5");
        assert_eq!(rendered(0xfff0_0293, 0), "addi    x5,x0,-1");
        assert_eq!(rendered(0x4042_d313, 0), "srai    x6,x5,4");
        assert_eq!(rendered(0x0031_00b3, 0), "add     x1,x2,x3");
    }

    #[test]
    fn check_fence_rendering() {
        assert_eq!(rendered(0x0ff0_000f, 0), "fence   iorw,iorw");
        assert_eq!(rendered(0x0210_000f, 0), "fence   r,w");
        assert_eq!(rendered(0x0840_000f, 0), "fence   i,o");
    }

    #[test]
    fn check_system_rendering() {
        assert_eq!(rendered(0x0010_0073, 0), "ebreak");
        assert_eq!(rendered(0x0000_0073, 0), "ecall");
    }

    #[test]
    fn check_illegal_rendering() {
        assert_eq!(rendered(0, 0), "ERROR: UNIMPLEMENTED INSTRUCTION");
    }
}
