//! Bit packing helpers and the sequential bit-stream codec used to persist
//! generator state.
//!
//! Every helper follows one convention: the most significant bit of a byte
//! comes first, and the most significant byte of a wider value comes first.

use std::io::{self, Read, Write};

// ---------------------------------------------------------------------------
// Packing
// ---------------------------------------------------------------------------

/// Read 8 bits starting at `at` as a byte (MSB first). No wraparound.
pub fn read_byte(bits: &[bool], at: usize) -> u8 {
    bits[at..at + 8]
        .iter()
        .fold(0u8, |acc, &bit| (acc << 1) | bit as u8)
}

/// Write `value` into 8 bits starting at `at` (MSB first). No wraparound.
pub fn write_byte(bits: &mut [bool], at: usize, value: u8) {
    for (i, slot) in bits[at..at + 8].iter_mut().enumerate() {
        *slot = (value >> (7 - i)) & 1 == 1;
    }
}

/// Read 64 bits starting at `at` as an unsigned integer (MSB first).
pub fn read_u64(bits: &[bool], at: usize) -> u64 {
    bits[at..at + 64]
        .iter()
        .fold(0u64, |acc, &bit| (acc << 1) | bit as u64)
}

/// Write `value` into 64 bits starting at `at` (MSB first).
pub fn write_u64(bits: &mut [bool], at: usize, value: u64) {
    for (i, slot) in bits[at..at + 64].iter_mut().enumerate() {
        *slot = (value >> (63 - i)) & 1 == 1;
    }
}

// ---------------------------------------------------------------------------
// Sequential bit streams
// ---------------------------------------------------------------------------

/// Writes booleans one at a time into an underlying byte sink.
///
/// Bits accumulate MSB-first into a pending byte that is emitted every eighth
/// bit. [`terminate`](Self::terminate) pads the last byte with zeros.
pub struct BitWriter<W: Write> {
    inner: W,
    pending: u8,
    filled: u8,
}

impl<W: Write> BitWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            pending: 0,
            filled: 0,
        }
    }

    /// Append one bit.
    pub fn write(&mut self, bit: bool) -> io::Result<()> {
        self.pending |= (bit as u8) << (7 - self.filled);
        self.filled += 1;
        if self.filled == 8 {
            self.inner.write_all(&[self.pending])?;
            self.pending = 0;
            self.filled = 0;
        }
        Ok(())
    }

    /// Append every bit of `bits` in order.
    pub fn write_bits(&mut self, bits: &[bool]) -> io::Result<()> {
        for &bit in bits {
            self.write(bit)?;
        }
        Ok(())
    }

    /// Pad to a byte boundary, flush, and hand back the sink.
    pub fn terminate(mut self) -> io::Result<W> {
        if self.filled > 0 {
            self.inner.write_all(&[self.pending])?;
        }
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// Reads booleans one at a time from an underlying byte source.
///
/// Running out of bytes mid-read yields [`io::ErrorKind::UnexpectedEof`].
pub struct BitReader<R: Read> {
    inner: R,
    current: u8,
    remaining: u8,
}

impl<R: Read> BitReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            current: 0,
            remaining: 0,
        }
    }

    /// Read the next bit.
    pub fn read(&mut self) -> io::Result<bool> {
        if self.remaining == 0 {
            let mut byte = [0u8; 1];
            self.inner.read_exact(&mut byte)?;
            self.current = byte[0];
            self.remaining = 8;
        }
        self.remaining -= 1;
        Ok((self.current >> self.remaining) & 1 == 1)
    }

    /// Read `n` bits in order.
    pub fn read_bits(&mut self, n: usize) -> io::Result<Vec<bool>> {
        let mut bits = Vec::with_capacity(n);
        for _ in 0..n {
            bits.push(self.read()?);
        }
        Ok(bits)
    }

    /// Drop the padding of the current byte and hand back the source.
    pub fn terminate(self) -> R {
        self.inner
    }
}
