// Record codec: framing, byte order and chunk reassembly

use crate::core::config::FramingMode;
use crate::core::constants::*;
use crate::core::error::{EclError, Result};
use crate::core::format::{ArrayData, RecordEntry};
use std::io::{ErrorKind, Read, Seek, Write};
use tracing::warn;

fn read_exact_or_truncated<R: Read>(reader: &mut R, buf: &mut [u8], record_offset: u64) -> Result<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => EclError::TruncatedRecord {
            offset: record_offset,
        },
        _ => EclError::Io(e),
    })
}

fn read_marker<R: Read>(reader: &mut R, record_offset: u64) -> Result<i32> {
    let mut buf = [0u8; MARKER_SIZE];
    read_exact_or_truncated(reader, &mut buf, record_offset)?;
    Ok(i32::from_be_bytes(buf))
}

/// Reads a trailing marker. `None` means the stream ended exactly where the
/// marker should start.
fn read_tail_marker<R: Read>(reader: &mut R, record_offset: u64) -> Result<Option<i32>> {
    let mut buf = [0u8; MARKER_SIZE];
    let mut filled = 0;
    while filled < MARKER_SIZE {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(EclError::Io(e)),
        }
    }
    match filled {
        0 => Ok(None),
        MARKER_SIZE => Ok(Some(i32::from_be_bytes(buf))),
        _ => Err(EclError::TruncatedRecord {
            offset: record_offset,
        }),
    }
}

fn check_tail(tail: Option<i32>, head: i32, record_offset: u64, mode: FramingMode) -> Result<()> {
    match (tail, mode) {
        (Some(tail), FramingMode::Strict) if tail != head => Err(EclError::malformed(
            record_offset,
            format!("trailing marker {} does not match leading marker {}", tail, head),
        )),
        (Some(_), _) => Ok(()),
        (None, FramingMode::Strict) => Err(EclError::TruncatedRecord {
            offset: record_offset,
        }),
        (None, FramingMode::Relaxed) => {
            warn!("missing trailing marker at offset {}, file still being written?", record_offset);
            Ok(())
        }
    }
}

/// Reads one record header from the current stream position.
pub fn read_header<R: Read + Seek>(reader: &mut R, mode: FramingMode) -> Result<RecordEntry> {
    let offset = reader.stream_position()?;

    let head = read_marker(reader, offset)?;
    if head != HEADER_BODY_SIZE as i32 {
        return Err(EclError::malformed(
            offset,
            format!("header marker {} (expected {})", head, HEADER_BODY_SIZE),
        ));
    }

    let mut body = [0u8; HEADER_BODY_SIZE];
    read_exact_or_truncated(reader, &mut body, offset)?;

    let name = String::from_utf8_lossy(&body[0..8]).trim_end().to_string();
    let count = i32::from_be_bytes([body[8], body[9], body[10], body[11]]);
    let tag = [body[12], body[13], body[14], body[15]];

    let array_type = ArrayType::from_tag(&tag).ok_or_else(|| {
        EclError::malformed(
            offset,
            format!("unknown type tag {:?} for {}", String::from_utf8_lossy(&tag), name),
        )
    })?;

    if count < 0 {
        return Err(EclError::malformed(offset, format!("negative element count {}", count)));
    }

    let tail = read_tail_marker(reader, offset)?;
    check_tail(tail, head, offset, mode)?;

    Ok(RecordEntry {
        name,
        array_type,
        count: count as usize,
        offset,
    })
}

/// Reads the payload of `entry` with framing stripped. The stream must be
/// positioned at `entry.data_offset()`.
pub fn read_raw_payload<R: Read>(reader: &mut R, entry: &RecordEntry, mode: FramingMode) -> Result<Vec<u8>> {
    let width = entry.array_type.width();
    let block = entry.array_type.block_size();

    let mut raw = Vec::with_capacity(entry.count * width);
    let mut remaining = entry.count;

    if width == 0 {
        return Ok(raw);
    }

    while remaining > 0 {
        let n = remaining.min(block);
        let expected = (n * width) as i32;

        let head = read_marker(reader, entry.offset)?;
        if head != expected {
            return Err(EclError::malformed(
                entry.offset,
                format!("{}: chunk marker {} (expected {})", entry.name, head, expected),
            ));
        }

        let start = raw.len();
        raw.resize(start + n * width, 0);
        read_exact_or_truncated(reader, &mut raw[start..], entry.offset)?;

        remaining -= n;

        let tail = read_tail_marker(reader, entry.offset)?;
        if tail.is_none() && remaining > 0 {
            return Err(EclError::TruncatedRecord {
                offset: entry.offset,
            });
        }
        check_tail(tail, head, entry.offset, mode)?;
    }

    Ok(raw)
}

/// Reads and decodes the payload of `entry`.
pub fn read_payload<R: Read>(reader: &mut R, entry: &RecordEntry, mode: FramingMode) -> Result<ArrayData> {
    let raw = read_raw_payload(reader, entry, mode)?;
    Ok(decode(&raw, entry.array_type))
}

/// Converts big-endian payload bytes into typed elements.
pub fn decode(raw: &[u8], array_type: ArrayType) -> ArrayData {
    fn words(raw: &[u8]) -> impl Iterator<Item = [u8; 4]> + '_ {
        raw.chunks_exact(4).map(|c| [c[0], c[1], c[2], c[3]])
    }

    match array_type {
        ArrayType::Inte => ArrayData::Inte(words(raw).map(i32::from_be_bytes).collect()),
        ArrayType::Real => ArrayData::Real(words(raw).map(f32::from_be_bytes).collect()),
        ArrayType::Logi => ArrayData::Logi(words(raw).map(|w| i32::from_be_bytes(w) != 0).collect()),
        ArrayType::Doub => ArrayData::Doub(
            raw.chunks_exact(8)
                .map(|c| f64::from_be_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                .collect(),
        ),
        ArrayType::Char => ArrayData::Char(
            raw.chunks_exact(CHAR_WIDTH)
                .map(|c| String::from_utf8_lossy(c).trim_end().to_string())
                .collect(),
        ),
        ArrayType::Mess => ArrayData::Mess,
    }
}

/// Converts typed elements into big-endian payload bytes.
pub fn encode(data: &ArrayData) -> Vec<u8> {
    match data {
        ArrayData::Inte(v) => v.iter().flat_map(|x| x.to_be_bytes()).collect(),
        ArrayData::Real(v) => v.iter().flat_map(|x| x.to_be_bytes()).collect(),
        ArrayData::Doub(v) => v.iter().flat_map(|x| x.to_be_bytes()).collect(),
        ArrayData::Logi(v) => v
            .iter()
            .flat_map(|&b| (if b { -1i32 } else { 0i32 }).to_be_bytes())
            .collect(),
        ArrayData::Char(v) => v.iter().flat_map(|s| pad_name(s)).collect(),
        ArrayData::Mess => Vec::new(),
    }
}

fn pad_name(s: &str) -> [u8; NAME_WIDTH] {
    let mut out = [b' '; NAME_WIDTH];
    for (dst, src) in out.iter_mut().zip(s.bytes()) {
        *dst = src;
    }
    out
}

/// Writes a header record and the chunked payload of `data`.
pub fn write_record<W: Write>(writer: &mut W, name: &str, data: &ArrayData) -> Result<()> {
    if name.len() > NAME_WIDTH {
        return Err(EclError::malformed(0, format!("array name {:?} longer than 8 characters", name)));
    }
    if let ArrayData::Char(values) = data {
        if let Some(long) = values.iter().find(|s| s.len() > CHAR_WIDTH) {
            return Err(EclError::malformed(0, format!("{}: string {:?} longer than 8 characters", name, long)));
        }
    }

    let array_type = data.array_type();
    let count = data.len();

    let marker = (HEADER_BODY_SIZE as i32).to_be_bytes();
    writer.write_all(&marker)?;
    writer.write_all(&pad_name(name))?;
    writer.write_all(&(count as i32).to_be_bytes())?;
    writer.write_all(array_type.tag())?;
    writer.write_all(&marker)?;

    let raw = encode(data);
    let width = array_type.width();
    if width == 0 {
        return Ok(());
    }

    for chunk in raw.chunks(array_type.block_size() * width) {
        let marker = (chunk.len() as i32).to_be_bytes();
        writer.write_all(&marker)?;
        writer.write_all(chunk)?;
        writer.write_all(&marker)?;
    }

    Ok(())
}
