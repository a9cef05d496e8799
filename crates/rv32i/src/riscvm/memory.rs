use thiserror::Error;

use crate::riscvm::consts::{HALF_WORD_SIZE, WORD_SIZE};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    #[error("access of {len} bytes at 0x{addr:08x} is outside memory of {capacity} bytes")]
    OutOfBounds {
        addr: u32,
        len: usize,
        capacity: usize,
    },
}

/// Fixed-size, byte-addressable main memory of the VM.
///
/// Every address is a byte offset. Multi-byte values are stored big-endian,
/// the most significant byte at the lowest address. Unaligned accesses are
/// allowed, accesses reaching past the capacity are not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    bytes: Box<[u8]>,
}

impl Memory {
    pub fn new(capacity: usize) -> Self {
        Memory {
            bytes: vec![0; capacity].into_boxed_slice(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    fn range(&self, addr: u32, len: usize) -> Result<std::ops::Range<usize>, MemoryError> {
        let start = addr as usize;
        match start.checked_add(len) {
            Some(end) if end <= self.bytes.len() => Ok(start..end),
            _ => Err(MemoryError::OutOfBounds {
                addr,
                len,
                capacity: self.bytes.len(),
            }),
        }
    }

    fn read<const N: usize>(&self, addr: u32) -> Result<[u8; N], MemoryError> {
        let range = self.range(addr, N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.bytes[range]);
        Ok(out)
    }

    fn write<const N: usize>(&mut self, addr: u32, data: [u8; N]) -> Result<(), MemoryError> {
        let range = self.range(addr, N)?;
        self.bytes[range].copy_from_slice(&data);
        Ok(())
    }

    pub fn read_byte(&self, addr: u32) -> Result<u8, MemoryError> {
        let [b] = self.read::<1>(addr)?;
        Ok(b)
    }

    pub fn write_byte(&mut self, addr: u32, data: u8) -> Result<(), MemoryError> {
        self.write(addr, [data])
    }

    pub fn read_half(&self, addr: u32) -> Result<u16, MemoryError> {
        self.read::<HALF_WORD_SIZE>(addr).map(u16::from_be_bytes)
    }

    pub fn write_half(&mut self, addr: u32, data: u16) -> Result<(), MemoryError> {
        self.write(addr, data.to_be_bytes())
    }

    pub fn read_word(&self, addr: u32) -> Result<u32, MemoryError> {
        self.read::<WORD_SIZE>(addr).map(u32::from_be_bytes)
    }

    pub fn write_word(&mut self, addr: u32, data: u32) -> Result<(), MemoryError> {
        self.write(addr, data.to_be_bytes())
    }

    /// Zeroes the whole memory.
    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }
}
