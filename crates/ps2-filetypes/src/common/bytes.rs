use std::io::{Cursor, Read, Seek, SeekFrom};

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt};

use crate::{Error, Result};

pub fn read_le_u16(buf: &[u8]) -> u16 {
    LittleEndian::read_u16(buf)
}

pub fn read_le_u32(buf: &[u8]) -> u32 {
    LittleEndian::read_u32(buf)
}

pub fn read_le_u64(buf: &[u8]) -> u64 {
    LittleEndian::read_u64(buf)
}

pub fn read_be_u16(buf: &[u8]) -> u16 {
    BigEndian::read_u16(buf)
}

pub fn append_le_u16(out: &mut Vec<u8>, value: u16) {
    let mut buf = [0u8; 2];
    LittleEndian::write_u16(&mut buf, value);
    out.extend_from_slice(&buf);
}

pub fn append_le_u32(out: &mut Vec<u8>, value: u32) {
    let mut buf = [0u8; 4];
    LittleEndian::write_u32(&mut buf, value);
    out.extend_from_slice(&buf);
}

pub fn append_le_u64(out: &mut Vec<u8>, value: u64) {
    let mut buf = [0u8; 8];
    LittleEndian::write_u64(&mut buf, value);
    out.extend_from_slice(&buf);
}

/// `out[i] = a[i] ^ b[i]` over the length of `out`.
pub fn memxor(a: &[u8], b: &[u8], out: &mut [u8]) {
    for ((dst, lhs), rhs) in out.iter_mut().zip(a).zip(b) {
        *dst = lhs ^ rhs;
    }
}

/// Copies `src` into `dst` in reverse byte order.
pub fn memrcpy(dst: &mut [u8], src: &[u8]) {
    for (dst, src) in dst.iter_mut().zip(src.iter().rev()) {
        *dst = *src;
    }
}

pub fn round_up(value: usize, multiple: usize) -> usize {
    value.div_ceil(multiple) * multiple
}

/// Decodes a NUL-terminated string stored in a fixed-width field.
pub fn fixed_str(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

/// Appends `value` as a fixed-width, NUL-padded field. Always leaves room for
/// the terminator.
pub fn put_fixed_str(out: &mut Vec<u8>, value: &str, width: usize) {
    let bytes = value.as_bytes();
    let len = bytes.len().min(width.saturating_sub(1));
    out.extend_from_slice(&bytes[..len]);
    out.resize(out.len() + width - len, 0);
}

/// Bounds-checked little-endian reader used by every container decoder.
pub struct ByteReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(data),
        }
    }

    pub fn at(data: &'a [u8], position: usize) -> Result<Self> {
        let mut reader = Self::new(data);
        reader.seek(position)?;
        Ok(reader)
    }

    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    pub fn len(&self) -> usize {
        self.cursor.get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn remaining(&self) -> usize {
        self.len().saturating_sub(self.position())
    }

    pub fn seek(&mut self, position: usize) -> Result<()> {
        if position > self.len() {
            return Err(Error::truncated(format!(
                "seek to {position:#x} past end of {} byte buffer",
                self.len()
            )));
        }
        self.cursor.seek(SeekFrom::Start(position as u64))?;
        Ok(())
    }

    pub fn skip(&mut self, count: usize) -> Result<()> {
        let target = self
            .position()
            .checked_add(count)
            .ok_or_else(|| Error::truncated("offset overflow"))?;
        self.seek(target)
    }

    pub fn take(&mut self, count: usize) -> Result<&'a [u8]> {
        if count > self.remaining() {
            return Err(Error::truncated(format!(
                "need {count} bytes at {:#x}, only {} left",
                self.position(),
                self.remaining()
            )));
        }
        let start = self.position();
        let data: &'a [u8] = *self.cursor.get_ref();
        self.cursor.set_position((start + count) as u64);
        Ok(&data[start..start + count])
    }

    pub fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        self.cursor.read_exact(&mut out).map_err(eof)?;
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8> {
        self.cursor.read_u8().map_err(eof)
    }

    pub fn u16(&mut self) -> Result<u16> {
        self.cursor.read_u16::<LittleEndian>().map_err(eof)
    }

    pub fn u16_be(&mut self) -> Result<u16> {
        self.cursor.read_u16::<BigEndian>().map_err(eof)
    }

    pub fn u32(&mut self) -> Result<u32> {
        self.cursor.read_u32::<LittleEndian>().map_err(eof)
    }
}

fn eof(err: std::io::Error) -> Error {
    Error::truncated(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn little_endian_helpers_agree() {
        let mut out = Vec::new();
        append_le_u16(&mut out, 0x8427);
        append_le_u32(&mut out, 0x0001_0203);
        append_le_u64(&mut out, 0x1122_3344_5566_7788);

        assert_eq!(&out[..2], &[0x27, 0x84]);
        assert_eq!(read_le_u16(&out), 0x8427);
        assert_eq!(read_le_u32(&out[2..]), 0x0001_0203);
        assert_eq!(read_le_u64(&out[6..]), 0x1122_3344_5566_7788);
        assert_eq!(read_be_u16(&out), 0x2784);
    }

    #[test]
    fn memxor_and_memrcpy() {
        let mut out = [0u8; 4];
        memxor(&[0xFF, 0x0F, 0x00, 0xAA], &[0x0F, 0x0F, 0x36, 0xAA], &mut out);
        assert_eq!(out, [0xF0, 0x00, 0x36, 0x00]);

        let mut reversed = [0u8; 3];
        memrcpy(&mut reversed, b"abc");
        assert_eq!(&reversed, b"cba");
    }

    #[test]
    fn fixed_strings_are_nul_padded() {
        let mut out = Vec::new();
        put_fixed_str(&mut out, "BESLES-12345", 32);
        assert_eq!(out.len(), 32);
        assert_eq!(fixed_str(&out), "BESLES-12345");

        let mut clipped = Vec::new();
        put_fixed_str(&mut clipped, "ABCDEFGH", 4);
        assert_eq!(clipped, b"ABC\0");
    }

    #[test]
    fn reader_reports_truncation() {
        let data = [1u8, 0, 0];
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.u16().unwrap(), 1);
        assert!(matches!(reader.u32(), Err(Error::TruncatedOrCorrupt(_))));
        assert!(reader.take(2).is_err());
        assert!(ByteReader::at(&data, 4).is_err());
    }

    #[test]
    fn round_up_to_multiple() {
        assert_eq!(round_up(0, 16), 0);
        assert_eq!(round_up(1, 16), 16);
        assert_eq!(round_up(1024, 1024), 1024);
    }
}
