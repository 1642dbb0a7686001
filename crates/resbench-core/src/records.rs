//! Length-delimited record files (TFRecord framing).
//!
//! Each record is laid out as:
//!
//! ```text
//! u64 LE  length
//! u32 LE  masked CRC32C of the length bytes
//! [u8]    data
//! u32 LE  masked CRC32C of the data
//! ```

use crate::error::{BenchError, BenchResult};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

/// Raw payload of one record.
pub type Record = Vec<u8>;

const HEADER_LEN: usize = 12;
const FOOTER_LEN: usize = 4;
const MASK_DELTA: u32 = 0xA282_EAD8;

/// CRC32C (Castagnoli polynomial, reflected 0x82F63B78).
pub(crate) fn crc32c(data: &[u8]) -> u32 {
    const TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ 0x82F6_3B78;
                } else {
                    crc >>= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        let idx = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ TABLE[idx];
    }
    !crc
}

pub(crate) fn masked_crc(data: &[u8]) -> u32 {
    let crc = crc32c(data);
    crc.rotate_right(15).wrapping_add(MASK_DELTA)
}

/// Sequential reader over the records of one file.
///
/// Yields records until a clean end of file at a record boundary. A truncated
/// frame or a checksum mismatch yields one `CorruptRecord` error and then ends.
pub struct RecordReader<R> {
    reader: R,
    path: PathBuf,
    offset: u64,
    done: bool,
}

impl RecordReader<std::io::BufReader<std::fs::File>> {
    /// Open a record file for reading.
    pub fn open(path: &Path) -> BenchResult<Self> {
        let file = std::fs::File::open(path)
            .map_err(|source| BenchError::DataFile { path: path.to_path_buf(), source })?;
        Ok(Self::new(std::io::BufReader::new(file), path))
    }
}

impl<R: Read> RecordReader<R> {
    /// Wrap a reader; `path` only names the source in errors.
    pub fn new(reader: R, path: &Path) -> Self {
        Self { reader, path: path.to_path_buf(), offset: 0, done: false }
    }

    fn corrupt(&self, reason: impl Into<String>) -> BenchError {
        BenchError::CorruptRecord { path: self.path.clone(), offset: self.offset, reason: reason.into() }
    }

    /// Fill `buf` as far as possible, returning the number of bytes read.
    fn fill(&mut self, buf: &mut [u8]) -> BenchResult<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(source) => return Err(BenchError::DataFile { path: self.path.clone(), source }),
            }
        }
        Ok(filled)
    }

    fn read_record(&mut self) -> BenchResult<Option<Record>> {
        let mut header = [0u8; HEADER_LEN];
        match self.fill(&mut header)? {
            0 => return Ok(None),
            HEADER_LEN => {}
            n => return Err(self.corrupt(format!("truncated header ({n} of {HEADER_LEN} bytes)"))),
        }

        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&header[..8]);
        let mut len_crc = [0u8; 4];
        len_crc.copy_from_slice(&header[8..]);
        if masked_crc(&len_bytes) != u32::from_le_bytes(len_crc) {
            return Err(self.corrupt("length checksum mismatch"));
        }

        // Grow with the bytes actually present; the declared length is untrusted.
        let len = u64::from_le_bytes(len_bytes);
        let mut data = Vec::new();
        let read = (&mut self.reader)
            .take(len)
            .read_to_end(&mut data)
            .map_err(|source| BenchError::DataFile { path: self.path.clone(), source })?;
        if read as u64 != len {
            return Err(self.corrupt(format!("truncated record data ({read} of {len} bytes)")));
        }

        let mut footer = [0u8; FOOTER_LEN];
        if self.fill(&mut footer)? != FOOTER_LEN {
            return Err(self.corrupt("truncated record footer"));
        }
        if masked_crc(&data) != u32::from_le_bytes(footer) {
            return Err(self.corrupt("data checksum mismatch"));
        }

        self.offset += (HEADER_LEN + FOOTER_LEN) as u64 + len;
        Ok(Some(data))
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = BenchResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Writes records with the same framing `RecordReader` expects.
pub struct RecordWriter<W> {
    writer: W,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write_record(&mut self, data: &[u8]) -> std::io::Result<()> {
        let len_bytes = (data.len() as u64).to_le_bytes();
        self.writer.write_all(&len_bytes)?;
        self.writer.write_all(&masked_crc(&len_bytes).to_le_bytes())?;
        self.writer.write_all(data)?;
        self.writer.write_all(&masked_crc(data).to_le_bytes())?;
        Ok(())
    }

    pub fn into_inner(mut self) -> std::io::Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode(records: &[&[u8]]) -> Vec<u8> {
        let mut writer = RecordWriter::new(Vec::new());
        for r in records {
            writer.write_record(r).unwrap();
        }
        writer.into_inner().unwrap()
    }

    #[test]
    fn test_crc32c_check_value() {
        assert_eq!(crc32c(b"123456789"), 0xE306_9283);
    }

    #[test]
    fn test_reads_back_written_records() {
        let bytes = encode(&[b"first", b"", b"third record"]);
        let records: Vec<_> = RecordReader::new(Cursor::new(bytes), Path::new("mem"))
            .collect::<BenchResult<_>>()
            .unwrap();
        assert_eq!(records, vec![b"first".to_vec(), Vec::new(), b"third record".to_vec()]);
    }

    #[test]
    fn test_empty_input_has_no_records() {
        let mut reader = RecordReader::new(Cursor::new(Vec::new()), Path::new("mem"));
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_truncated_data_is_corrupt() {
        let mut bytes = encode(&[b"ok", b"cut short"]);
        bytes.truncate(bytes.len() - 6);
        let mut reader = RecordReader::new(Cursor::new(bytes), Path::new("mem"));

        assert_eq!(reader.next().unwrap().unwrap(), b"ok".to_vec());
        match reader.next().unwrap() {
            Err(BenchError::CorruptRecord { offset, .. }) => assert_eq!(offset, 18),
            other => panic!("expected corrupt record, got {other:?}"),
        }
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_huge_declared_length_is_corrupt() {
        let len_bytes = (u64::MAX / 2).to_le_bytes();
        let mut bytes = len_bytes.to_vec();
        bytes.extend_from_slice(&masked_crc(&len_bytes).to_le_bytes());
        bytes.extend_from_slice(b"tiny");

        let mut reader = RecordReader::new(Cursor::new(bytes), Path::new("mem"));
        match reader.next().unwrap() {
            Err(BenchError::CorruptRecord { offset, reason, .. }) => {
                assert_eq!(offset, 0);
                assert!(reason.contains("truncated record data"));
            }
            other => panic!("expected corrupt record, got {other:?}"),
        }
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_flipped_byte_fails_checksum() {
        let mut bytes = encode(&[b"payload"]);
        bytes[HEADER_LEN] ^= 0xFF;
        let err = RecordReader::new(Cursor::new(bytes), Path::new("mem")).next().unwrap().unwrap_err();
        assert!(err.to_string().contains("data checksum mismatch"));
    }
}
