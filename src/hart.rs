//! RISC-V Hardware Thread
//!
//! The simplest possible RV32I hart: a single privilege-free execution
//! environment where all of memory is readable and writable and every
//! trap is fatal. The hart owns the program counter, the instruction
//! counter, the halt flag and the register file, and borrows the
//! memory it executes from for its whole lifetime.
//!
//! `tick` is the only scheduling unit. Once the halt flag is set (by
//! ebreak/ecall, an unrecognized encoding, or the run limit) the hart
//! is terminal: further ticks do nothing.

use crate::exec::{execute, NullTrace, StdoutTrace, TraceSink};
use crate::hex::hex32;
use crate::instr::Instr;
use crate::memory::Memory;
use crate::registers::RegisterFile;
use crate::render::render;

pub struct Hart<'m> {
    pub mem: &'m mut Memory,
    pub pc: u32,
    pub insn_counter: u64,
    pub halt: bool,
    show_instructions: bool,
    show_registers: bool,
    pub regs: RegisterFile,
}

impl<'m> Hart<'m> {
    /// Bind a hart to a memory image. The initial state matches
    /// `reset`: pc 0, counter 0, not halted, registers at their reset
    /// pattern.
    pub fn new(mem: &'m mut Memory) -> Self {
        Self {
            mem,
            pc: 0,
            insn_counter: 0,
            halt: false,
            show_instructions: false,
            show_registers: false,
            regs: RegisterFile::new(),
        }
    }

    pub fn reset(&mut self) {
        self.pc = 0;
        self.insn_counter = 0;
        self.halt = false;
        self.regs.reset();
    }

    pub fn is_halted(&self) -> bool {
        self.halt
    }

    /// Print a trace line for every executed instruction.
    pub fn set_show_instructions(&mut self, on: bool) {
        self.show_instructions = on;
    }

    /// Dump the registers and pc before every executed instruction.
    pub fn set_show_registers(&mut self, on: bool) {
        self.show_registers = on;
    }

    /// Walk memory linearly from address 0 and print every aligned
    /// word in `address: word  mnemonic` form. The pc tracks the walk
    /// so pc-relative targets come out right; call `reset` before
    /// executing afterwards. The register file is untouched.
    pub fn disasm(&mut self) {
        self.disasm_to(&mut StdoutTrace);
    }

    pub fn disasm_to(&mut self, out: &mut dyn TraceSink) {
        self.pc = 0;
        let size = self.mem.size();
        let mut addr = 0;
        while addr < size {
            self.pc = addr;
            let word = self.mem.get32(addr);
            let text = render(&Instr::decode(word), self.pc);
            out.line(&format!("{}: {}  {}", hex32(addr), hex32(word), text));
            addr += 4;
        }
    }

    /// Execute the instruction at the current pc. A no-op once halted.
    pub fn tick(&mut self) {
        if self.halt {
            return;
        }
        self.insn_counter += 1;
        if self.show_registers {
            self.dump();
        }
        let word = self.mem.get32(self.pc);
        let instr = Instr::decode(word);
        if self.show_instructions {
            print!("{}: {}  ", hex32(self.pc), hex32(word));
            execute(self, instr, &mut StdoutTrace);
        } else {
            execute(self, instr, &mut NullTrace);
        }
    }

    /// Run until the hart halts. A nonzero `limit` stops execution
    /// after that many instructions. x2 starts as a stack pointer at
    /// the top of memory. The closing banner is the same whatever
    /// caused the halt.
    pub fn run(&mut self, limit: u64) {
        self.regs.set(2, self.mem.size() as i32);
        while !self.halt {
            if limit != 0 && self.insn_counter == limit {
                self.halt = true;
            }
            self.tick();
        }
        println!("Execution terminated by EBREAK instruction");
        println!("{} instructions executed", self.insn_counter);
    }

    /// Print the register file followed by the pc.
    pub fn dump(&self) {
        self.regs.dump();
        println!(" pc {}", hex32(self.pc));
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::encode;

    fn loaded(words: &[u32]) -> Memory {
        let mut mem = Memory::new(0x100);
        for (n, &word) in words.iter().enumerate() {
            mem.set32(4 * n as u32, word);
        }
        mem
    }

    #[test]
    fn check_reset_state() {
        let mut mem = Memory::new(0x100);
        let mut hart = Hart::new(&mut mem);
        hart.pc = 0x40;
        hart.insn_counter = 9;
        hart.halt = true;
        hart.regs.set(5, 123);
        hart.reset();
        assert_eq!(hart.pc, 0);
        assert_eq!(hart.insn_counter, 0);
        assert!(!hart.halt);
        assert_eq!(hart.regs.get(0), 0);
        for r in 1..32 {
            assert_eq!(hart.regs.get(r) as u32, 0xf0f0_f0f0);
        }
    }

    #[test]
    fn check_addi_then_ebreak() {
        let mut mem = loaded(&[encode::addi(1, 0, 5), encode::ebreak()]);
        let mut hart = Hart::new(&mut mem);
        hart.run(0);
        assert_eq!(hart.regs.get(1), 5);
        assert_eq!(hart.pc, 4);
        assert!(hart.is_halted());
        assert_eq!(hart.insn_counter, 2);
    }

    #[test]
    fn check_lui() {
        let mut mem = loaded(&[encode::lui(2, 0x12345), encode::ebreak()]);
        let mut hart = Hart::new(&mut mem);
        hart.run(0);
        assert_eq!(hart.regs.get(2) as u32, 0x1234_5000);
    }

    #[test]
    fn check_auipc() {
        let mut mem = loaded(&[encode::auipc(3, 1), encode::ebreak()]);
        let mut hart = Hart::new(&mut mem);
        hart.run(0);
        assert_eq!(hart.regs.get(3) as u32, 0x0000_1000);
    }

    #[test]
    fn check_jal_skips_ebreak() {
        let mut mem = loaded(&[
            encode::jal(1, 8),
            encode::ebreak(), // skipped
            encode::ebreak(),
        ]);
        let mut hart = Hart::new(&mut mem);
        hart.run(0);
        assert_eq!(hart.regs.get(1), 4);
        assert_eq!(hart.pc, 8);
        assert_eq!(hart.insn_counter, 2);
    }

    #[test]
    fn check_jalr_clears_low_bit() {
        let mut mem = loaded(&[
            encode::addi(5, 0, 9),
            encode::jalr(1, 5, 0), // target 9 & ~1 = 8
            encode::ebreak(),
        ]);
        let mut hart = Hart::new(&mut mem);
        hart.run(0);
        assert_eq!(hart.regs.get(1), 8);
        assert_eq!(hart.pc, 8);
    }

    #[test]
    fn check_srai_preserves_sign() {
        let mut mem = loaded(&[
            encode::addi(5, 0, -1),
            encode::srai(6, 5, 4),
            encode::ebreak(),
        ]);
        let mut hart = Hart::new(&mut mem);
        hart.run(0);
        assert_eq!(hart.regs.get(6) as u32, 0xffff_ffff);
    }

    #[test]
    fn check_lw_round_trip_through_memory() {
        let mut mem = loaded(&[
            encode::addi(1, 0, 0x10),
            encode::lw(2, 1, 0),
            encode::ebreak(),
        ]);
        mem.set32(0x10, 0xdead_beef);
        let mut hart = Hart::new(&mut mem);
        hart.run(0);
        assert_eq!(hart.regs.get(2) as u32, 0xdead_beef);
    }

    #[test]
    fn check_branch_taken_and_not_taken() {
        // x1 = 1; beq x1, x0, +8 not taken; bne x1, x0, +8 taken
        let mut mem = loaded(&[
            encode::addi(1, 0, 1),
            encode::beq(1, 0, 8),
            encode::bne(1, 0, 8),
            encode::ebreak(), // skipped by the bne
            encode::ebreak(),
        ]);
        let mut hart = Hart::new(&mut mem);
        hart.run(0);
        assert_eq!(hart.pc, 16);
        assert_eq!(hart.insn_counter, 4);
    }

    #[test]
    fn check_unsigned_branch_compare() {
        // -1 is large unsigned, so bltu x0, x5 is taken
        let mut mem = loaded(&[
            encode::addi(5, 0, -1),
            encode::bltu(0, 5, 8),
            encode::ebreak(), // skipped
            encode::ebreak(),
        ]);
        let mut hart = Hart::new(&mut mem);
        hart.run(0);
        assert_eq!(hart.pc, 12);
    }

    #[test]
    fn check_store_writes_memory() {
        let mut mem = loaded(&[
            encode::lui(3, 0x12345),
            encode::addi(3, 3, 0x678),
            encode::addi(1, 0, 0x20),
            encode::sw(3, 1, 0),
            encode::sh(3, 1, 4),
            encode::sb(3, 1, 6),
            encode::ebreak(),
        ]);
        let mut hart = Hart::new(&mut mem);
        hart.run(0);
        assert_eq!(hart.mem.get32(0x20), 0x1234_5678);
        assert_eq!(hart.mem.get16(0x24), 0x5678);
        assert_eq!(hart.mem.get8(0x26), 0x78);
    }

    #[test]
    fn check_illegal_instruction_halts() {
        let mut mem = loaded(&[0xffff_ffff]);
        let mut hart = Hart::new(&mut mem);
        hart.run(0);
        assert!(hart.is_halted());
        assert_eq!(hart.pc, 0);
        assert_eq!(hart.insn_counter, 1);
    }

    #[test]
    fn check_run_limit() {
        // An infinite loop of jumps to self, bounded by the limit
        let mut mem = loaded(&[encode::jal(0, 0)]);
        let mut hart = Hart::new(&mut mem);
        hart.run(3);
        assert!(hart.is_halted());
        assert_eq!(hart.insn_counter, 3);
    }

    #[test]
    fn check_run_sets_stack_pointer() {
        let mut mem = loaded(&[encode::ebreak()]);
        let size = mem.size() as i32;
        let mut hart = Hart::new(&mut mem);
        hart.run(0);
        assert_eq!(hart.regs.get(2), size);
    }

    #[test]
    fn check_tick_is_noop_after_halt() {
        let mut mem = loaded(&[encode::ebreak()]);
        let mut hart = Hart::new(&mut mem);
        hart.run(0);
        let counter = hart.insn_counter;
        hart.tick();
        assert_eq!(hart.insn_counter, counter);
        assert_eq!(hart.pc, 0);
    }

    #[test]
    fn check_x0_writes_are_dropped() {
        let mut mem = loaded(&[encode::addi(0, 0, 1), encode::ebreak()]);
        let mut hart = Hart::new(&mut mem);
        hart.run(0);
        assert_eq!(hart.regs.get(0), 0);
        // Every other register keeps its reset or sp value
        for r in 3..32 {
            assert_eq!(hart.regs.get(r) as u32, 0xf0f0_f0f0);
        }
    }

    #[test]
    fn check_disasm_golden() {
        let mut mem = Memory::new(16);
        mem.set32(0, encode::addi(1, 0, 5));
        mem.set32(4, encode::lui(2, 0x12345));
        mem.set32(8, encode::jal(1, 8));
        mem.set32(12, encode::ebreak());
        let mut hart = Hart::new(&mut mem);
        let mut lines: Vec<String> = Vec::new();
        hart.disasm_to(&mut lines);
        assert_eq!(
            lines,
            vec![
                "00000000: 00500093  addi    x1,x0,5",
                "00000004: 12345137  lui     x2,0x12345",
                "00000008: 008000ef  jal     x1,0x10",
                "0000000c: 00100073  ebreak",
            ]
        );
    }

    #[test]
    fn check_pc_aligned_before_each_fetch() {
        let mut mem = loaded(&[
            encode::jal(1, 8),
            encode::ebreak(),
            encode::jal(2, -4),
        ]);
        let mut hart = Hart::new(&mut mem);
        while !hart.is_halted() {
            assert_eq!(hart.pc % 4, 0);
            hart.tick();
        }
        assert_eq!(hart.pc, 4);
    }
}
