use std::io::{Read, Write};

use crc::Crc;
use flate2::{read::GzDecoder, write::GzEncoder};

use crate::error::{Error, Result};

const CRC32: Crc<u32> = Crc::<u32>::new(&crc::CRC_32_ISO_HDLC);

/// Header written by the JVM snappy stream codec ahead of its chunks.
const XERIAL_MAGIC: [u8; 8] = [0x82, b'S', b'N', b'A', b'P', b'P', b'Y', 0];
/// Magic, version and compatible version.
const XERIAL_HEADER_LEN: usize = 16;

/// Upper bound on the bytes a single compressed wrapper may inflate to.
pub const MAX_DECOMPRESSED_LEN: usize = 64 * 1024 * 1024;

/// CRC32 (IEEE) of `data`, reinterpreted as the signed value the wire carries.
pub fn to_crc(data: &[u8]) -> i32 {
    CRC32.checksum(data) as i32
}

pub fn gzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder
        .write_all(data)
        .map_err(|err| Error::CompressionError(err.to_string()))?;
    encoder
        .finish()
        .map_err(|err| Error::CompressionError(err.to_string()))
}

pub fn gunzip(data: &[u8]) -> Result<Vec<u8>> {
    gunzip_limited(data, MAX_DECOMPRESSED_LEN)
}

/// Inflate `data`, failing once the output grows past `limit` bytes.
pub fn gunzip_limited(data: &[u8], limit: usize) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(data)
        .take(limit as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|err| Error::CompressionError(err.to_string()))?;
    if out.len() > limit {
        return Err(Error::CompressionError(format!(
            "gzip data inflates past {limit} bytes"
        )));
    }
    Ok(out)
}

pub fn snappy(data: &[u8]) -> Result<Vec<u8>> {
    snap::raw::Encoder::new()
        .compress_vec(data)
        .map_err(|err| Error::CompressionError(err.to_string()))
}

/// Decompress a raw snappy block, or the chunked xerial framing used by JVM
/// producers.
pub fn unsnappy(data: &[u8]) -> Result<Vec<u8>> {
    unsnappy_limited(data, MAX_DECOMPRESSED_LEN)
}

/// Like [`unsnappy`], failing when the output would exceed `limit` bytes.
pub fn unsnappy_limited(data: &[u8], limit: usize) -> Result<Vec<u8>> {
    if data.len() < XERIAL_HEADER_LEN || data[..XERIAL_MAGIC.len()] != XERIAL_MAGIC {
        return unsnappy_block(data, limit);
    }

    let mut out = Vec::new();
    let mut chunks = &data[XERIAL_HEADER_LEN..];
    while !chunks.is_empty() {
        if chunks.len() < 4 {
            return Err(Error::CompressionError("truncated snappy chunk".to_string()));
        }
        let len = u32::from_be_bytes([chunks[0], chunks[1], chunks[2], chunks[3]]) as usize;
        let chunk = chunks
            .get(4..4 + len)
            .ok_or_else(|| Error::CompressionError("truncated snappy chunk".to_string()))?;
        out.extend(unsnappy_block(chunk, limit - out.len())?);
        chunks = &chunks[4 + len..];
    }
    Ok(out)
}

/// The block header claims its own length, up to 2^32-1, so it is checked
/// against `limit` before anything is allocated.
fn unsnappy_block(data: &[u8], limit: usize) -> Result<Vec<u8>> {
    let claimed = snap::raw::decompress_len(data)
        .map_err(|err| Error::CompressionError(err.to_string()))?;
    if claimed > limit {
        return Err(Error::CompressionError(format!(
            "snappy block claims {claimed} bytes, more than {limit}"
        )));
    }

    let mut out = vec![0u8; claimed];
    let written = snap::raw::Decoder::new()
        .decompress(data, &mut out)
        .map_err(|err| Error::CompressionError(err.to_string()))?;
    if written != claimed {
        return Err(Error::CompressionError("broken snappy data".to_string()));
    }
    Ok(out)
}
