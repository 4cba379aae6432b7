//! TFRecord container: a sequence of length-delimited, checksummed records.
//!
//! Each record is framed as
//!
//! ```text
//! u64  length        (little endian)
//! u32  masked_crc32c(length bytes)
//! [u8] data          (length bytes)
//! u32  masked_crc32c(data)
//! ```
//!
//! and the file carries no header or index, so readers stream it front to
//! back.

use std::io::{self, Read, Write};

use thiserror::Error;

const MASK_DELTA: u32 = 0xa282_ead8;

/// CRC32C with TFRecord's rotation-and-offset mask applied.
#[inline]
pub fn masked_crc32c(bytes: &[u8]) -> u32 {
    let crc = crc32c::crc32c(bytes);
    crc.rotate_right(15).wrapping_add(MASK_DELTA)
}

/// Appends framed records to an underlying writer.
#[derive(Debug)]
pub struct TfRecordWriter<W: Write> {
    inner: W,
    records_written: u64,
}

impl<W: Write> TfRecordWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            records_written: 0,
        }
    }

    /// Frames and writes one record.
    pub fn write_record(&mut self, data: &[u8]) -> io::Result<()> {
        let len = (data.len() as u64).to_le_bytes();
        self.inner.write_all(&len)?;
        self.inner.write_all(&masked_crc32c(&len).to_le_bytes())?;
        self.inner.write_all(data)?;
        self.inner.write_all(&masked_crc32c(data).to_le_bytes())?;
        self.records_written += 1;
        Ok(())
    }

    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    /// Flushes and returns the underlying writer.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// Why a record could not be read.
#[derive(Debug, Error)]
pub enum ReadRecordError {
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The stream ended inside a record.
    #[error("stream ends inside a record")]
    Truncated,

    /// A checksum did not match.
    #[error("{what} checksum mismatch")]
    Checksum { what: &'static str },

    /// The declared length does not fit in memory on this platform.
    #[error("record length {0} is too large")]
    Length(u64),
}

/// Reads framed records one at a time, verifying both checksums.
#[derive(Debug)]
pub struct TfRecordReader<R: Read> {
    inner: R,
    max_record_len: u64,
}

impl<R: Read> TfRecordReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            max_record_len: u64::from(u32::MAX),
        }
    }

    /// Caps the declared length accepted for a single record.
    pub fn with_max_record_len(mut self, max: u64) -> Self {
        self.max_record_len = max;
        self
    }

    /// Reads the next record, or `Ok(None)` at a clean end of stream.
    pub fn read_record(&mut self) -> Result<Option<Vec<u8>>, ReadRecordError> {
        let mut len_bytes = [0u8; 8];
        match read_full(&mut self.inner, &mut len_bytes)? {
            0 => return Ok(None),
            8 => {}
            _ => return Err(ReadRecordError::Truncated),
        }
        let len_crc = self.read_u32()?;
        if masked_crc32c(&len_bytes) != len_crc {
            return Err(ReadRecordError::Checksum { what: "length" });
        }

        let len = u64::from_le_bytes(len_bytes);
        if len > self.max_record_len {
            return Err(ReadRecordError::Length(len));
        }
        let len = usize::try_from(len).map_err(|_| ReadRecordError::Length(len))?;
        let mut data = vec![0u8; len];
        if read_full(&mut self.inner, &mut data)? != len {
            return Err(ReadRecordError::Truncated);
        }

        let data_crc = self.read_u32()?;
        if masked_crc32c(&data) != data_crc {
            return Err(ReadRecordError::Checksum { what: "data" });
        }
        Ok(Some(data))
    }

    fn read_u32(&mut self) -> Result<u32, ReadRecordError> {
        let mut buf = [0u8; 4];
        if read_full(&mut self.inner, &mut buf)? != 4 {
            return Err(ReadRecordError::Truncated);
        }
        Ok(u32::from_le_bytes(buf))
    }
}

impl<R: Read> Iterator for TfRecordReader<R> {
    type Item = Result<Vec<u8>, ReadRecordError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}

/// Like `read_exact`, but reports how many bytes arrived before EOF.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize, ReadRecordError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

/// Parses every record from an in-memory buffer.
///
/// Useful for fuzzing and tests.
pub fn records_from_slice(bytes: &[u8]) -> Result<Vec<Vec<u8>>, ReadRecordError> {
    TfRecordReader::new(bytes)
        .with_max_record_len(bytes.len() as u64)
        .collect()
}
