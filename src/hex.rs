//! Fixed-width hexadecimal formatting
//!
//! Every dump, disassembly and trace line in the simulator prints
//! addresses, words and bytes in one of three fixed shapes, collected
//! here so the line formats stay consistent.

/// Exactly two lowercase hex digits representing one byte.
pub fn hex8(value: u8) -> String {
    format!("{value:02x}")
}

/// Exactly eight lowercase hex digits representing a 32-bit word.
pub fn hex32(value: u32) -> String {
    format!("{value:08x}")
}

/// `0x` followed by exactly eight lowercase hex digits.
pub fn hex0x32(value: u32) -> String {
    format!("0x{}", hex32(value))
}
