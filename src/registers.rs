//! General-purpose register file
//!
//! Thirty-two signed 32-bit registers. x0 is hard-wired to zero at
//! this boundary: reads of index 0 always return 0 and writes to it
//! are dropped, so the executors never special-case it.

use itertools::Itertools;

use crate::hex::hex32;

/// Value taken by x1..x31 on reset, chosen to make uninitialized
/// register use visible in dumps.
const RESET_PATTERN: i32 = 0xf0f0_f0f0_u32 as i32;

#[derive(Debug)]
pub struct RegisterFile {
    regs: [i32; 32],
}

impl RegisterFile {
    pub fn new() -> Self {
        let mut file = Self { regs: [0; 32] };
        file.reset();
        file
    }

    /// x0 becomes 0 and every other register takes the reset pattern.
    pub fn reset(&mut self) {
        self.regs[0] = 0;
        for reg in &mut self.regs[1..] {
            *reg = RESET_PATTERN;
        }
    }

    /// Read register `r`. Index 0 reads as zero regardless of any
    /// earlier write.
    pub fn get(&self, r: u32) -> i32 {
        if r == 0 {
            0
        } else {
            self.regs[r as usize]
        }
    }

    /// Write register `r`. Writes to index 0 are dropped.
    pub fn set(&mut self, r: u32, value: i32) {
        if r != 0 {
            self.regs[r as usize] = value;
        }
    }

    /// Print the registers eight per line, each line led by a
    /// right-aligned `xN` label.
    pub fn dump(&self) {
        for (row, chunk) in self.regs.chunks(8).enumerate() {
            let label = format!("x{}", 8 * row);
            let values = chunk.iter().map(|&v| hex32(v as u32)).join(" ");
            println!("{label:>3} {values} ");
        }
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}
