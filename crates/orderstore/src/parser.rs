//! Record file parser using nom
//!
//! File format:
//! ```text
//! ORDS001\n
//! [version: u32]
//! [record_count: u32]
//! ...records (\n-terminated)...
//! ```
//!
//! Record format:
//! ```text
//! <key>\t<payload>\n
//! ```

use nom::{
    bytes::complete::{tag, take_till1, take_until},
    character::complete::char,
    number::complete::le_u32,
    sequence::{terminated, tuple},
    IResult,
};

use crate::error::{Error, Result};

/// Magic header for record files
pub const STORE_MAGIC: &[u8] = b"ORDS001\n";

/// Current file format version
pub const STORE_VERSION: u32 = 1;

/// Length of the full file header in bytes
pub const HEADER_LEN: usize = STORE_MAGIC.len() + 8;

/// Record file header
#[derive(Debug, Clone, PartialEq)]
pub struct StoreHeader {
    /// File format version
    pub version: u32,
    /// Number of records written at the last clean close
    pub record_count: u32,
}

/// A single record borrowed from the data file
#[derive(Debug, Clone, PartialEq)]
pub struct Record<'a> {
    /// Raw key bytes
    pub key: &'a [u8],
    /// Raw payload bytes (without the trailing newline)
    pub payload: &'a [u8],
}

fn header(input: &[u8]) -> IResult<&[u8], StoreHeader> {
    let (rest, (_, version, record_count)) = tuple((tag(STORE_MAGIC), le_u32, le_u32))(input)?;
    Ok((rest, StoreHeader { version, record_count }))
}

/// Parse the record file header
pub fn parse_header(input: &[u8]) -> Result<StoreHeader> {
    if input.len() < HEADER_LEN {
        return Err(Error::Parse("Input too short for header".to_string()));
    }

    match header(input) {
        Ok((_, header)) => Ok(header),
        Err(_) => Err(Error::Parse("Invalid store magic header".to_string())),
    }
}

/// Create a record file header
pub fn create_header(version: u32, record_count: u32) -> Vec<u8> {
    let mut header = Vec::with_capacity(HEADER_LEN);
    header.extend_from_slice(STORE_MAGIC);
    header.extend_from_slice(&version.to_le_bytes());
    header.extend_from_slice(&record_count.to_le_bytes());
    header
}

/// Parse a single `key\tpayload\n` record
pub fn parse_record(input: &[u8]) -> IResult<&[u8], Record<'_>> {
    let (rest, key) = terminated(take_till1(|b| b == b'\t' || b == b'\n'), char('\t'))(input)?;
    let (rest, payload) = terminated(take_until("\n"), char('\n'))(rest)?;
    Ok((rest, Record { key, payload }))
}

/// Encode a record, including the trailing newline
pub fn encode_record(key: &str, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(key.len() + payload.len() + 2);
    buf.extend_from_slice(key.as_bytes());
    buf.push(b'\t');
    buf.extend_from_slice(payload);
    buf.push(b'\n');
    buf
}
