//! Bounds-checked reads over an immutable byte buffer.

use super::DecodeError;

/// Longest varint the protocol allows: ten groups of seven bits.
const MAX_VARINT_LEN: usize = 10;

/// A read position over a borrowed byte slice.
///
/// Every read either advances `pos` by exactly the bytes it consumed or
/// returns an error and leaves `pos` where it was.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current read offset from the start of the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Reads a base-128 varint (least significant group first).
    ///
    /// # Errors
    ///
    /// [`DecodeError::Truncated`] if the buffer ends before the final byte, or
    /// if the encoding runs past ten bytes or past 64 bits of payload.
    pub fn read_varint(&mut self) -> Result<u64, DecodeError> {
        let mut value = 0u64;

        for (i, &byte) in self.buf[self.pos..].iter().take(MAX_VARINT_LEN).enumerate() {
            let group = u64::from(byte & 0x7F);

            // The tenth group only has room for bit 63.
            if i == MAX_VARINT_LEN - 1 && group > 1 {
                return Err(DecodeError::Truncated);
            }

            value |= group << (7 * i);

            if byte & 0x80 == 0 {
                self.pos += i + 1;
                return Ok(value);
            }
        }

        Err(DecodeError::Truncated)
    }

    /// Reads four little-endian bytes as an IEEE-754 single.
    pub fn read_fixed32(&mut self) -> Result<f32, DecodeError> {
        let bytes = self.take_array::<4>()?;
        Ok(f32::from_le_bytes(bytes))
    }

    /// Reads eight little-endian bytes as an IEEE-754 double.
    pub fn read_fixed64(&mut self) -> Result<f64, DecodeError> {
        let bytes = self.take_array::<8>()?;
        Ok(f64::from_le_bytes(bytes))
    }

    /// Reads a varint length prefix and borrows that many bytes.
    ///
    /// If the declared length overruns the buffer, the length prefix is not
    /// consumed either.
    pub fn read_length_delimited(&mut self) -> Result<&'a [u8], DecodeError> {
        let start = self.pos;
        let len = self.read_varint()?;

        let len = match usize::try_from(len) {
            Ok(len) if len <= self.remaining() => len,
            _ => {
                self.pos = start;
                return Err(DecodeError::Truncated);
            }
        };

        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let bytes = self
            .buf
            .get(self.pos..self.pos + N)
            .ok_or(DecodeError::Truncated)?;

        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        self.pos += N;
        Ok(out)
    }
}

#[cfg(test)]
pub(crate) fn encode_varint(mut value: u64, out: &mut Vec<u8>) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}
