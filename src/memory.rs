//! Simulated byte-addressable memory
//!
//! A fixed-size byte array with bounds-checked little-endian accesses.
//! The size is rounded up to a multiple of 16 so the dump always
//! prints full lines, and every byte starts at the sentinel `0xa5` so
//! untouched memory is recognizable. Out-of-range accesses are not
//! fatal: they print a warning, reads yield zero and writes are
//! dropped, and the simulation carries on.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use itertools::Itertools;
use thiserror::Error;

use crate::hex::{hex0x32, hex32, hex8};

/// Fill byte for freshly allocated memory.
const FILL: u8 = 0xa5;

#[derive(Debug)]
pub struct Memory {
    bytes: Vec<u8>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error("Can't open file '{path}' for reading.")]
    Open { path: String },
    #[error("Program too big.")]
    TooBig,
}

impl Memory {
    /// Allocate `requested` bytes rounded up to a multiple of 16, all
    /// set to the fill sentinel.
    pub fn new(requested: u32) -> Self {
        let size = requested.wrapping_add(15) & 0xffff_fff0;
        Self {
            bytes: vec![FILL; size as usize],
        }
    }

    pub fn size(&self) -> u32 {
        self.bytes.len() as u32
    }

    /// True if `addr` lies inside the simulated memory; prints a
    /// warning line otherwise.
    pub fn check_address(&self, addr: u32) -> bool {
        let ok = (addr as usize) < self.bytes.len();
        if !ok {
            println!("WARNING: Address out of range: {}", hex0x32(addr));
        }
        ok
    }

    /// Read one byte; out-of-range reads yield zero.
    pub fn get8(&self, addr: u32) -> u8 {
        if self.check_address(addr) {
            self.bytes[addr as usize]
        } else {
            0
        }
    }

    /// Little-endian halfword composed from two byte reads.
    pub fn get16(&self, addr: u32) -> u16 {
        u16::from(self.get8(addr)) | u16::from(self.get8(addr.wrapping_add(1))) << 8
    }

    /// Little-endian word composed from two halfword reads.
    pub fn get32(&self, addr: u32) -> u32 {
        u32::from(self.get16(addr)) | u32::from(self.get16(addr.wrapping_add(2))) << 16
    }

    /// Write one byte; out-of-range writes are dropped.
    pub fn set8(&mut self, addr: u32, value: u8) {
        if self.check_address(addr) {
            self.bytes[addr as usize] = value;
        }
    }

    pub fn set16(&mut self, addr: u32, value: u16) {
        self.set8(addr.wrapping_add(1), (value >> 8) as u8);
        self.set8(addr, value as u8);
    }

    pub fn set32(&mut self, addr: u32, value: u32) {
        self.set16(addr.wrapping_add(2), (value >> 16) as u16);
        self.set16(addr, value as u16);
    }

    /// Print the whole memory image, sixteen bytes per line with a
    /// printable-ASCII column on the right.
    pub fn dump(&self) {
        for (row, chunk) in self.bytes.chunks(16).enumerate() {
            let addr = 16 * row as u32;
            let (low, high) = chunk.split_at(8);
            let ascii: String = chunk
                .iter()
                .map(|&b| if (0x20..=0x7e).contains(&b) { b as char } else { '.' })
                .collect();
            println!(
                "{}: {}  {} *{}*",
                hex32(addr),
                hex_row(low),
                hex_row(high),
                ascii
            );
        }
    }

    /// Read a flat binary image into successive addresses starting at
    /// zero. The file carries no header and no relocation; address 0
    /// is the entry point.
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), LoadError> {
        let path = path.as_ref();
        let open_failed = || LoadError::Open {
            path: path.display().to_string(),
        };
        let mut file = File::open(path).map_err(|_| open_failed())?;
        let mut image = Vec::new();
        file.read_to_end(&mut image).map_err(|_| open_failed())?;

        let mut addr = 0u32;
        for byte in image {
            if !self.check_address(addr) {
                return Err(LoadError::TooBig);
            }
            self.set8(addr, byte);
            addr = addr.wrapping_add(1);
        }
        Ok(())
    }
}

fn hex_row(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| hex8(b)).join(" ")
}
