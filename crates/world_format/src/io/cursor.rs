use thiserror::Error;

pub const MAX_STRING_LEN: usize = u16::MAX as usize;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CursorError {
    #[error("unexpected end of data at offset {offset}: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEndOfData {
        offset: usize,
        needed: usize,
        remaining: usize,
    },
    #[error("invalid UTF-8 string at offset {offset}")]
    InvalidUtf8 { offset: usize },
    #[error("string of {len} bytes does not fit a u16 length prefix")]
    StringTooLong { len: usize },
    #[error("section of {len} bytes does not fit a u32 length prefix")]
    SectionTooLarge { len: usize },
}

impl CursorError {
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::UnexpectedEndOfData { offset, .. } | Self::InvalidUtf8 { offset } => {
                Some(*offset)
            }
            Self::StringTooLong { .. } | Self::SectionTooLarge { .. } => None,
        }
    }
}

/// Forward-only reader over a fixed buffer.
///
/// `base` is the absolute file offset of `bytes[0]`, so a reader created for
/// a bounded section still reports offsets relative to the whole file.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    base: usize,
}

macro_rules! read_le {
    ($name:ident, $ty:ty) => {
        pub fn $name(&mut self) -> Result<$ty, CursorError> {
            let raw = self.read_array::<{ std::mem::size_of::<$ty>() }>()?;
            Ok(<$ty>::from_le_bytes(raw))
        }
    };
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self::with_base(bytes, 0)
    }

    pub fn with_base(bytes: &'a [u8], base: usize) -> Self {
        Self {
            bytes,
            pos: 0,
            base,
        }
    }

    /// Absolute offset of the next unread byte.
    pub fn position(&self) -> usize {
        self.base + self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// The part of this buffer already read.
    pub fn consumed(&self) -> &'a [u8] {
        &self.bytes[..self.pos]
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], CursorError> {
        let end = self.pos.saturating_add(len);
        if end > self.bytes.len() {
            return Err(CursorError::UnexpectedEndOfData {
                offset: self.position(),
                needed: len,
                remaining: self.remaining(),
            });
        }
        let out = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CursorError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Splits off the next `len` bytes as a bounded reader and advances past them.
    pub fn sub_reader(&mut self, len: usize) -> Result<ByteReader<'a>, CursorError> {
        let base = self.position();
        let bytes = self.read_bytes(len)?;
        Ok(ByteReader::with_base(bytes, base))
    }

    pub fn read_u8(&mut self) -> Result<u8, CursorError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, CursorError> {
        Ok(self.read_u8()? as i8)
    }

    read_le!(read_u16, u16);
    read_le!(read_u32, u32);
    read_le!(read_u64, u64);
    read_le!(read_i16, i16);
    read_le!(read_i32, i32);
    read_le!(read_i64, i64);
    read_le!(read_f32, f32);
    read_le!(read_f64, f64);

    pub fn read_bool(&mut self) -> Result<bool, CursorError> {
        Ok(self.read_u8()? != 0)
    }

    /// Reads one byte as eight flags, least significant bit first.
    pub fn read_flag_byte(&mut self) -> Result<[bool; 8], CursorError> {
        let raw = self.read_u8()?;
        let mut flags = [false; 8];
        for (bit, flag) in flags.iter_mut().enumerate() {
            *flag = raw & (1 << bit) != 0;
        }
        Ok(flags)
    }

    pub fn read_string(&mut self) -> Result<String, CursorError> {
        let len = self.read_u16()? as usize;
        let offset = self.position();
        let raw = self.read_bytes(len)?;
        std::str::from_utf8(raw)
            .map(ToString::to_string)
            .map_err(|_| CursorError::InvalidUtf8 { offset })
    }
}

/// Append-only writer; the buffer grows as needed.
#[derive(Debug, Clone, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

macro_rules! write_le {
    ($name:ident, $ty:ty) => {
        pub fn $name(&mut self, value: $ty) {
            self.buf.extend_from_slice(&value.to_le_bytes());
        }
    };
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_i8(&mut self, value: i8) {
        self.buf.push(value as u8);
    }

    write_le!(write_u16, u16);
    write_le!(write_u32, u32);
    write_le!(write_u64, u64);
    write_le!(write_i16, i16);
    write_le!(write_i32, i32);
    write_le!(write_i64, i64);
    write_le!(write_f32, f32);
    write_le!(write_f64, f64);

    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(u8::from(value));
    }

    pub fn write_flag_byte(&mut self, flags: [bool; 8]) {
        let mut raw = 0u8;
        for (bit, flag) in flags.iter().enumerate() {
            if *flag {
                raw |= 1 << bit;
            }
        }
        self.buf.push(raw);
    }

    pub fn write_string(&mut self, value: &str) -> Result<(), CursorError> {
        let bytes = value.as_bytes();
        if bytes.len() > MAX_STRING_LEN {
            return Err(CursorError::StringTooLong { len: bytes.len() });
        }
        self.write_u16(bytes.len() as u16);
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    /// Writes `payload` prefixed with its `u32` byte length.
    pub fn write_framed(&mut self, payload: &[u8]) -> Result<(), CursorError> {
        let len = u32::try_from(payload.len())
            .map_err(|_| CursorError::SectionTooLarge { len: payload.len() })?;
        self.write_u32(len);
        self.buf.extend_from_slice(payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_primitives_in_order() {
        let mut writer = ByteWriter::new();
        writer.write_u8(7);
        writer.write_u16(0x1234);
        writer.write_i32(-5);
        writer.write_u64(u64::MAX - 1);
        writer.write_f32(1.5);
        writer.write_f64(-2.25);
        writer.write_bool(true);
        let bytes = writer.into_bytes();
        assert_eq!(&bytes[1..3], &[0x34, 0x12]);

        let mut reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_u8().expect("u8"), 7);
        assert_eq!(reader.read_u16().expect("u16"), 0x1234);
        assert_eq!(reader.read_i32().expect("i32"), -5);
        assert_eq!(reader.read_u64().expect("u64"), u64::MAX - 1);
        assert_eq!(reader.read_f32().expect("f32"), 1.5);
        assert_eq!(reader.read_f64().expect("f64"), -2.25);
        assert!(reader.read_bool().expect("bool"));
        assert!(reader.is_empty());
    }

    #[test]
    fn short_read_reports_offset_and_widths() {
        let bytes = [1u8, 2, 3];
        let mut reader = ByteReader::new(&bytes);
        reader.read_u8().expect("first byte");
        let err = reader.read_u32().expect_err("too short");
        assert_eq!(
            err,
            CursorError::UnexpectedEndOfData {
                offset: 1,
                needed: 4,
                remaining: 2
            }
        );
    }

    #[test]
    fn string_roundtrip_and_invalid_utf8() {
        let mut writer = ByteWriter::new();
        writer.write_string("Glimmerdeep").expect("write");
        let bytes = writer.into_bytes();
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_string().expect("read"), "Glimmerdeep");

        let bad = [2u8, 0, 0xff, 0xfe];
        let err = ByteReader::new(&bad).read_string().expect_err("bad utf8");
        assert_eq!(err, CursorError::InvalidUtf8 { offset: 2 });
    }

    #[test]
    fn oversized_string_is_rejected_without_writing() {
        let mut writer = ByteWriter::new();
        let long = "x".repeat(MAX_STRING_LEN + 1);
        let err = writer.write_string(&long).expect_err("too long");
        assert_eq!(
            err,
            CursorError::StringTooLong {
                len: MAX_STRING_LEN + 1
            }
        );
        assert!(writer.is_empty());
    }

    #[test]
    fn flag_byte_is_lsb_first() {
        let mut writer = ByteWriter::new();
        writer.write_flag_byte([true, false, true, false, false, false, false, true]);
        assert_eq!(writer.as_bytes(), &[0b1000_0101]);
        let bytes = writer.into_bytes();
        let flags = ByteReader::new(&bytes).read_flag_byte().expect("flags");
        assert_eq!(flags, [true, false, true, false, false, false, false, true]);
    }

    #[test]
    fn sub_reader_keeps_absolute_offsets() {
        let bytes = [0u8, 0, 9, 8];
        let mut reader = ByteReader::new(&bytes);
        reader.read_u16().expect("prefix");
        let mut section = reader.sub_reader(1).expect("section");
        assert_eq!(section.position(), 2);
        assert_eq!(section.read_u8().expect("byte"), 9);
        let err = section.read_u8().expect_err("bounded");
        assert_eq!(err.offset(), Some(3));
        assert_eq!(reader.read_u8().expect("after section"), 8);
    }
}
