use std::io::{self, Read, Seek, SeekFrom};

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};

use crate::error::{Error, Result};

/// Little-endian stream reader that reports short reads as
/// [`Error::Truncated`] tagged with what was being read.
pub struct LittleEndianReader<R> {
    inner: R,
}

impl<R: Read + Seek> LittleEndianReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn read_u32(&mut self, context: &str) -> Result<u32> {
        self.inner
            .read_u32::<LittleEndian>()
            .map_err(|e| eof_to_truncated(e, context))
    }

    pub fn read_bytes(&mut self, n: usize, context: &str) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.read_into(&mut buf, context)?;
        Ok(buf)
    }

    pub fn read_into(&mut self, buf: &mut [u8], context: &str) -> Result<()> {
        self.inner
            .read_exact(buf)
            .map_err(|e| eof_to_truncated(e, context))
    }

    pub fn seek_to(&mut self, pos: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    pub fn position(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()?)
    }

    /// Total stream length. The read position is left where it was.
    pub fn stream_len(&mut self) -> Result<u64> {
        let here = self.position()?;
        let len = self.inner.seek(SeekFrom::End(0))?;
        self.seek_to(here)?;
        Ok(len)
    }
}

fn eof_to_truncated(err: io::Error, context: &str) -> Error {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        Error::truncated(context)
    } else {
        Error::Io(err)
    }
}

// Slice accessors. All return `None` instead of panicking when the field
// would run past the end of the buffer.

pub fn u16_at(data: &[u8], offset: usize) -> Option<u16> {
    data.get(offset..offset.checked_add(2)?)
        .map(LittleEndian::read_u16)
}

pub fn u32_at(data: &[u8], offset: usize) -> Option<u32> {
    data.get(offset..offset.checked_add(4)?)
        .map(LittleEndian::read_u32)
}

pub fn i32_at(data: &[u8], offset: usize) -> Option<i32> {
    data.get(offset..offset.checked_add(4)?)
        .map(LittleEndian::read_i32)
}

pub fn u64_at(data: &[u8], offset: usize) -> Option<u64> {
    data.get(offset..offset.checked_add(8)?)
        .map(LittleEndian::read_u64)
}

pub fn put_u64_at(data: &mut [u8], offset: usize, value: u64) -> bool {
    match offset
        .checked_add(8)
        .and_then(|end| data.get_mut(offset..end))
    {
        Some(field) => {
            LittleEndian::write_u64(field, value);
            true
        }
        None => false,
    }
}

/// Reads a NUL-terminated UTF-16LE string of at most `max_units` code units.
/// Stops at the end of the buffer if no terminator is found.
pub fn wide_units_at(data: &[u8], offset: usize, max_units: usize) -> Vec<u16> {
    let mut units = Vec::new();
    for i in 0..max_units {
        let Some(unit) = offset.checked_add(i * 2).and_then(|pos| u16_at(data, pos)) else {
            break;
        };
        if unit == 0 {
            break;
        }
        units.push(unit);
    }
    units
}

pub fn wide_string_at(data: &[u8], offset: usize, max_units: usize) -> String {
    String::from_utf16_lossy(&wide_units_at(data, offset, max_units))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn short_stream_reports_context() {
        let mut r = LittleEndianReader::new(Cursor::new(vec![1u8, 2]));
        let err = r.read_u32("magic").expect_err("two bytes cannot hold a u32");
        match err {
            Error::Truncated { context } => assert_eq!(context, "magic"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn slice_accessors_are_bounds_checked() {
        let data = [0x34, 0x12, 0x78, 0x56];
        assert_eq!(u16_at(&data, 0), Some(0x1234));
        assert_eq!(u32_at(&data, 0), Some(0x5678_1234));
        assert_eq!(u32_at(&data, 1), None);
        assert_eq!(u64_at(&data, 0), None);
        assert_eq!(u16_at(&data, usize::MAX), None);
    }

    #[test]
    fn wide_string_stops_at_terminator() {
        let mut data = Vec::new();
        for unit in "Melina".encode_utf16() {
            data.extend_from_slice(&unit.to_le_bytes());
        }
        data.extend_from_slice(&[0, 0, b'x', 0]);
        assert_eq!(wide_string_at(&data, 0, 17), "Melina");
        assert_eq!(wide_string_at(&data, 0, 3), "Mel");
    }

    #[test]
    fn put_refuses_out_of_range_writes() {
        let mut data = [0u8; 4];
        assert!(!put_u64_at(&mut data, 0, 7));
        assert_eq!(data, [0; 4]);
    }
}
