//! Little-endian primitives and length-framed blocks.
//!
//! Every mdb structure is framed by a 4-byte length that is only known once
//! the block body has been written, so the writer records the frame start
//! and back-patches it afterwards.

use std::io::{self, Read, Seek, SeekFrom, Write};

use glam::{Vec2, Vec3};

/// Sequential reader over an mdb byte stream.
pub(crate) struct MdbReader<R> {
    inner: R,
}

impl<R: Read + Seek> MdbReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    fn read_array<const N: usize>(&mut self) -> io::Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    pub fn read_u16(&mut self) -> io::Result<u16> {
        self.read_array().map(u16::from_le_bytes)
    }

    pub fn read_u32(&mut self) -> io::Result<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    pub fn read_i32(&mut self) -> io::Result<i32> {
        self.read_array().map(i32::from_le_bytes)
    }

    pub fn read_f32(&mut self) -> io::Result<f32> {
        self.read_array().map(f32::from_le_bytes)
    }

    pub fn read_bool(&mut self) -> io::Result<bool> {
        self.read_array::<1>().map(|[b]| b != 0)
    }

    pub fn read_vec2(&mut self) -> io::Result<Vec2> {
        Ok(Vec2::new(self.read_f32()?, self.read_f32()?))
    }

    pub fn read_vec3(&mut self) -> io::Result<Vec3> {
        Ok(Vec3::new(self.read_f32()?, self.read_f32()?, self.read_f32()?))
    }

    /// Read `len` raw bytes as a single-byte code page string.
    pub fn read_string(&mut self, len: usize) -> io::Result<String> {
        let mut buf = Vec::new();
        (&mut self.inner).take(len as u64).read_to_end(&mut buf)?;
        if buf.len() != len {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        Ok(decode_latin1(&buf))
    }

    /// Skip `count` bytes; fails if the stream is already exhausted.
    pub fn skip(&mut self, count: u64) -> io::Result<()> {
        let position = self.position()?;
        let end = self.inner.seek(SeekFrom::End(0))?;
        if position + count > end {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        self.inner.seek(SeekFrom::Start(position + count))?;
        Ok(())
    }

    pub fn position(&mut self) -> io::Result<u64> {
        self.inner.stream_position()
    }
}

/// Sequential writer producing an mdb byte stream.
pub(crate) struct MdbWriter<W> {
    inner: W,
}

impl<W: Write + Seek> MdbWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn write_u16(&mut self, value: u16) -> io::Result<()> {
        self.inner.write_all(&value.to_le_bytes())
    }

    pub fn write_u32(&mut self, value: u32) -> io::Result<()> {
        self.inner.write_all(&value.to_le_bytes())
    }

    pub fn write_u64(&mut self, value: u64) -> io::Result<()> {
        self.inner.write_all(&value.to_le_bytes())
    }

    pub fn write_f32(&mut self, value: f32) -> io::Result<()> {
        self.inner.write_all(&value.to_le_bytes())
    }

    pub fn write_bool(&mut self, value: bool) -> io::Result<()> {
        self.inner.write_all(&[u8::from(value)])
    }

    pub fn write_vec2(&mut self, value: Vec2) -> io::Result<()> {
        self.write_f32(value.x)?;
        self.write_f32(value.y)
    }

    pub fn write_vec3(&mut self, value: Vec3) -> io::Result<()> {
        self.write_f32(value.x)?;
        self.write_f32(value.y)?;
        self.write_f32(value.z)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.inner.write_all(bytes)
    }

    /// Write a 4-byte length prefix followed by the string bytes.
    pub fn write_string(&mut self, value: &str) -> io::Result<()> {
        let bytes = encode_latin1(value);
        self.write_u32(bytes.len() as u32)?;
        self.write_bytes(&bytes)
    }

    /// Reserve a 4-byte frame length and return where it lives.
    pub fn begin_block(&mut self) -> io::Result<u64> {
        let start = self.position()?;
        self.write_u32(0)?;
        Ok(start)
    }

    /// Patch the frame opened at `start` with the number of bytes written
    /// since, length field included.
    pub fn end_block(&mut self, start: u64) -> io::Result<u32> {
        let end = self.position()?;
        let length = u32::try_from(end - start)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "block exceeds 4 GiB"))?;
        self.patch(start, |w| w.write_u32(length))?;
        Ok(length)
    }

    /// Overwrite bytes at `at`, then return to the end of the stream.
    pub fn patch(
        &mut self,
        at: u64,
        write: impl FnOnce(&mut Self) -> io::Result<()>,
    ) -> io::Result<()> {
        self.inner.seek(SeekFrom::Start(at))?;
        write(self)?;
        self.inner.seek(SeekFrom::End(0))?;
        Ok(())
    }

    pub fn position(&mut self) -> io::Result<u64> {
        self.inner.stream_position()
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Map each byte to the code point of the same value.
pub(crate) fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().copied().map(char::from).collect()
}

/// Inverse of [`decode_latin1`]; characters outside the code page become `?`.
pub(crate) fn encode_latin1(value: &str) -> Vec<u8> {
    value
        .chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}
