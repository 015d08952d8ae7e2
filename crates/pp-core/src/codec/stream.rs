//! Binary stream codec.
//!
//! Layout (big-endian, no header):
//!
//! ```text
//! job_id            string
//! timestamp         i64   epoch milliseconds
//! bucket_span       u64   seconds
//! count             vint
//! count x {
//!   partition_value   string
//!   max_record_score  f64
//! }
//! ```
//!
//! A string is a vint byte length followed by UTF-8 bytes. A vint stores an
//! unsigned 32-bit value in 7-bit groups, low group first, with the high bit
//! set on every byte but the last.

use std::io::{self, Cursor, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use pp_common::{Error, Result};

use super::fields;
use crate::probabilities::{timestamp_from_millis, PartitionProbability, PerPartitionMaxProbabilities};

/// Upper bound on list capacity reserved before entries are actually read.
const MAX_PREALLOCATED_ENTRIES: usize = 1024;

/// Encode a summary into a new buffer.
pub fn encode(summary: &PerPartitionMaxProbabilities) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(encoded_size_hint(summary));
    write_to(summary, &mut buf)?;
    Ok(buf)
}

/// Decode a complete payload. Bytes left over after the summary are an error.
pub fn decode(bytes: &[u8]) -> Result<PerPartitionMaxProbabilities> {
    let mut cursor = Cursor::new(bytes);
    let summary = read_from(&mut cursor)?;
    let consumed = cursor.position() as usize;
    if consumed != bytes.len() {
        return Err(Error::TrailingBytes {
            remaining: bytes.len() - consumed,
        });
    }
    Ok(summary)
}

/// Write a summary to `writer`.
pub fn write_to<W: Write>(summary: &PerPartitionMaxProbabilities, writer: &mut W) -> Result<()> {
    write_string(writer, summary.job_id())?;
    writer.write_i64::<BigEndian>(summary.timestamp().timestamp_millis())?;
    writer.write_u64::<BigEndian>(summary.bucket_span())?;

    let probabilities = summary.partition_probabilities();
    write_vint(writer, len_to_u32(probabilities.len(), "partition list")?)?;
    for probability in probabilities {
        write_string(writer, probability.partition_value())?;
        writer.write_f64::<BigEndian>(probability.max_record_score())?;
    }
    Ok(())
}

/// Read one summary from `reader`, leaving any following bytes unread.
pub fn read_from<R: Read>(reader: &mut R) -> Result<PerPartitionMaxProbabilities> {
    let job_id = read_string(reader, fields::JOB_ID)?;
    let millis = reader
        .read_i64::<BigEndian>()
        .map_err(|e| eof(e, fields::TIMESTAMP))?;
    let timestamp = timestamp_from_millis(fields::TIMESTAMP, millis)?;
    let bucket_span = reader
        .read_u64::<BigEndian>()
        .map_err(|e| eof(e, fields::BUCKET_SPAN))?;

    let count = read_vint(reader, fields::PARTITION_PROBABILITIES)? as usize;
    let mut probabilities = Vec::with_capacity(count.min(MAX_PREALLOCATED_ENTRIES));
    for _ in 0..count {
        let value = read_string(reader, fields::PARTITION_VALUE)?;
        let score = reader
            .read_f64::<BigEndian>()
            .map_err(|e| eof(e, fields::MAX_RECORD_SCORE))?;
        probabilities.push(PartitionProbability::new(value, score));
    }

    PerPartitionMaxProbabilities::new(job_id, timestamp, bucket_span, probabilities)
}

fn encoded_size_hint(summary: &PerPartitionMaxProbabilities) -> usize {
    let entries: usize = summary
        .partition_probabilities()
        .iter()
        .map(|p| p.partition_value().len() + 5 + 8)
        .sum();
    summary.job_id().len() + 5 + 8 + 8 + 5 + entries
}

fn len_to_u32(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len)
        .map_err(|_| Error::InvalidArgument(format!("{} too long to encode: {}", what, len)))
}

fn write_vint<W: Write>(writer: &mut W, mut value: u32) -> Result<()> {
    while value & !0x7F != 0 {
        writer.write_u8(((value & 0x7F) | 0x80) as u8)?;
        value >>= 7;
    }
    writer.write_u8(value as u8)?;
    Ok(())
}

fn read_vint<R: Read>(reader: &mut R, context: &'static str) -> Result<u32> {
    let mut value: u32 = 0;
    for group in 0..5 {
        let byte = reader.read_u8().map_err(|e| eof(e, context))?;
        if group == 4 && byte & 0xF0 != 0 {
            // Fifth byte may only carry the top four bits.
            return Err(Error::MalformedVarint);
        }
        value |= u32::from(byte & 0x7F) << (7 * group);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(Error::MalformedVarint)
}

fn write_string<W: Write>(writer: &mut W, s: &str) -> Result<()> {
    write_vint(writer, len_to_u32(s.len(), "string")?)?;
    writer.write_all(s.as_bytes())?;
    Ok(())
}

fn read_string<R: Read>(reader: &mut R, context: &'static str) -> Result<String> {
    let len = read_vint(reader, context)? as usize;
    // Read through `take` so a corrupt length cannot force a huge allocation.
    let mut buf = Vec::with_capacity(len.min(4096));
    reader.by_ref().take(len as u64).read_to_end(&mut buf)?;
    if buf.len() != len {
        return Err(Error::UnexpectedEof { context });
    }
    Ok(String::from_utf8(buf)?)
}

fn eof(err: io::Error, context: &'static str) -> Error {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        Error::UnexpectedEof { context }
    } else {
        Error::Io(err)
    }
}
