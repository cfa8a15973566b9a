//! RESP (REdis Serialization Protocol) parser and serializer
//!
//! Implements the RESP2 subset needed for request/reply lookups

use std::fmt;
use std::io::Cursor;

use bytes::{Buf, BytesMut};

/// Maximum bulk string size (2 MB), orders are capped at 1 MB in the store
const MAX_BULK_STRING_SIZE: usize = 2 * 1024 * 1024;

/// Maximum array size (1M elements)
const MAX_ARRAY_SIZE: usize = 1024 * 1024;

/// RESP data types
#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    /// Simple string: +OK\r\n
    SimpleString(String),
    /// Error: -Error message\r\n
    Error(String),
    /// Integer: :1000\r\n
    Integer(i64),
    /// Bulk string: $6\r\nfoobar\r\n
    BulkString(Option<Vec<u8>>),
    /// Array: *2\r\n$3\r\nfoo\r\n$3\r\nbar\r\n
    Array(Option<Vec<RespValue>>),
}

/// Malformed RESP input
#[derive(Debug, Clone, PartialEq)]
pub enum RespError {
    UnknownType(u8),
    InvalidUtf8,
    InvalidLength(String),
    BulkTooLarge(usize),
    ArrayTooLarge(usize),
    MissingTerminator,
}

impl fmt::Display for RespError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RespError::UnknownType(b) => write!(f, "unknown RESP type byte {:?}", *b as char),
            RespError::InvalidUtf8 => write!(f, "invalid UTF-8 in RESP line"),
            RespError::InvalidLength(s) => write!(f, "invalid RESP integer {:?}", s),
            RespError::BulkTooLarge(len) => write!(
                f,
                "bulk string too large: {} bytes (max: {} bytes)",
                len, MAX_BULK_STRING_SIZE
            ),
            RespError::ArrayTooLarge(len) => write!(
                f,
                "array too large: {} elements (max: {} elements)",
                len, MAX_ARRAY_SIZE
            ),
            RespError::MissingTerminator => write!(f, "expected \\r\\n after bulk string"),
        }
    }
}

impl std::error::Error for RespError {}

type ParseResult = Result<Option<RespValue>, RespError>;

impl RespValue {
    pub fn ok() -> Self {
        RespValue::SimpleString("OK".to_string())
    }

    pub fn error(msg: impl fmt::Display) -> Self {
        RespValue::Error(format!("ERR {}", msg))
    }

    pub fn bulk(data: impl Into<Vec<u8>>) -> Self {
        RespValue::BulkString(Some(data.into()))
    }

    pub fn nil() -> Self {
        RespValue::BulkString(None)
    }

    /// Serialize to RESP format
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_to(&mut out);
        out
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            RespValue::SimpleString(s) => out.extend_from_slice(format!("+{}\r\n", s).as_bytes()),
            RespValue::Error(e) => out.extend_from_slice(format!("-{}\r\n", e).as_bytes()),
            RespValue::Integer(i) => out.extend_from_slice(format!(":{}\r\n", i).as_bytes()),
            RespValue::BulkString(None) => out.extend_from_slice(b"$-1\r\n"),
            RespValue::BulkString(Some(data)) => {
                out.extend_from_slice(format!("${}\r\n", data.len()).as_bytes());
                out.extend_from_slice(data);
                out.extend_from_slice(b"\r\n");
            }
            RespValue::Array(None) => out.extend_from_slice(b"*-1\r\n"),
            RespValue::Array(Some(items)) => {
                out.extend_from_slice(format!("*{}\r\n", items.len()).as_bytes());
                for item in items {
                    item.write_to(out);
                }
            }
        }
    }

    /// Parse one value from the front of `buf`
    ///
    /// Returns `Ok(None)` and leaves `buf` untouched when more data is needed.
    pub fn parse(buf: &mut BytesMut) -> ParseResult {
        if buf.is_empty() {
            return Ok(None);
        }

        let mut cursor = Cursor::new(&buf[..]);
        let value = parse_value(&mut cursor)?;
        if value.is_some() {
            let consumed = cursor.position() as usize;
            buf.advance(consumed);
        }
        Ok(value)
    }
}

fn parse_value(cursor: &mut Cursor<&[u8]>) -> ParseResult {
    if !cursor.has_remaining() {
        return Ok(None);
    }

    match cursor.get_u8() {
        b'+' => Ok(read_text(cursor)?.map(RespValue::SimpleString)),
        b'-' => Ok(read_text(cursor)?.map(RespValue::Error)),
        b':' => Ok(read_integer(cursor)?.map(RespValue::Integer)),
        b'$' => parse_bulk_string(cursor),
        b'*' => parse_array(cursor),
        other => Err(RespError::UnknownType(other)),
    }
}

fn parse_bulk_string(cursor: &mut Cursor<&[u8]>) -> ParseResult {
    let len = match read_integer(cursor)? {
        Some(-1) => return Ok(Some(RespValue::BulkString(None))),
        Some(len) if len < 0 => return Err(RespError::InvalidLength(len.to_string())),
        Some(len) => len as usize,
        None => return Ok(None),
    };

    if len > MAX_BULK_STRING_SIZE {
        return Err(RespError::BulkTooLarge(len));
    }

    if cursor.remaining() < len + 2 {
        return Ok(None);
    }

    let mut data = vec![0u8; len];
    cursor.copy_to_slice(&mut data);

    if cursor.get_u8() != b'\r' || cursor.get_u8() != b'\n' {
        return Err(RespError::MissingTerminator);
    }

    Ok(Some(RespValue::BulkString(Some(data))))
}

fn parse_array(cursor: &mut Cursor<&[u8]>) -> ParseResult {
    let len = match read_integer(cursor)? {
        Some(-1) => return Ok(Some(RespValue::Array(None))),
        Some(len) if len < 0 => return Err(RespError::InvalidLength(len.to_string())),
        Some(len) => len as usize,
        None => return Ok(None),
    };

    if len > MAX_ARRAY_SIZE {
        return Err(RespError::ArrayTooLarge(len));
    }

    let mut items = Vec::with_capacity(len.min(64));
    for _ in 0..len {
        match parse_value(cursor)? {
            Some(item) => items.push(item),
            None => return Ok(None),
        }
    }

    Ok(Some(RespValue::Array(Some(items))))
}

fn read_integer(cursor: &mut Cursor<&[u8]>) -> Result<Option<i64>, RespError> {
    match read_text(cursor)? {
        Some(text) => text
            .parse::<i64>()
            .map(Some)
            .map_err(|_| RespError::InvalidLength(text)),
        None => Ok(None),
    }
}

fn read_text(cursor: &mut Cursor<&[u8]>) -> Result<Option<String>, RespError> {
    match read_line(cursor) {
        Some(line) => String::from_utf8(line.to_vec())
            .map(Some)
            .map_err(|_| RespError::InvalidUtf8),
        None => Ok(None),
    }
}

fn read_line<'a>(cursor: &mut Cursor<&'a [u8]>) -> Option<&'a [u8]> {
    let data: &'a [u8] = *cursor.get_ref();
    let start = cursor.position() as usize;
    let end = start + data[start..].windows(2).position(|w| w == b"\r\n")?;

    cursor.set_position((end + 2) as u64);
    Some(&data[start..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_all(data: &[u8]) -> RespValue {
        let mut buf = BytesMut::from(data);
        let value = RespValue::parse(&mut buf).unwrap().unwrap();
        assert!(buf.is_empty(), "parser left {} bytes behind", buf.len());
        value
    }

    #[test]
    fn test_scalar_types() {
        assert_eq!(parse_all(b"+OK\r\n"), RespValue::ok());
        assert_eq!(parse_all(b"-ERR boom\r\n"), RespValue::error("boom"));
        assert_eq!(parse_all(b":1000\r\n"), RespValue::Integer(1000));
        assert_eq!(parse_all(b"$6\r\nfoobar\r\n"), RespValue::bulk("foobar"));
        assert_eq!(parse_all(b"$-1\r\n"), RespValue::nil());
        assert_eq!(parse_all(b"*-1\r\n"), RespValue::Array(None));
    }

    #[test]
    fn test_serialize() {
        assert_eq!(RespValue::ok().serialize(), b"+OK\r\n");
        assert_eq!(RespValue::error("bad").serialize(), b"-ERR bad\r\n");
        assert_eq!(RespValue::Integer(-3).serialize(), b":-3\r\n");
        assert_eq!(RespValue::nil().serialize(), b"$-1\r\n");
        assert_eq!(
            RespValue::Array(Some(vec![RespValue::bulk("a"), RespValue::Integer(1)])).serialize(),
            b"*2\r\n$1\r\na\r\n:1\r\n"
        );
    }

    #[test]
    fn test_command_array() {
        let value = parse_all(b"*2\r\n$3\r\nGET\r\n$19\r\nb563feb7b2b84b6test\r\n");

        assert_eq!(
            value,
            RespValue::Array(Some(vec![
                RespValue::bulk("GET"),
                RespValue::bulk("b563feb7b2b84b6test"),
            ]))
        );
    }

    #[test]
    fn test_bulk_string_with_crlf_inside() {
        assert_eq!(parse_all(b"$4\r\na\r\nb\r\n"), RespValue::bulk("a\r\nb"));
    }

    #[test]
    fn test_incomplete_data_leaves_buffer() {
        for data in [&b"$6\r\nfoo"[..], &b"*2\r\n$3\r\nGET\r\n"[..], &b":12"[..], &b"$6"[..]] {
            let mut buf = BytesMut::from(data);
            assert_eq!(RespValue::parse(&mut buf).unwrap(), None);
            assert_eq!(&buf[..], data);
        }
    }

    #[test]
    fn test_pipelined_values() {
        let mut buf = BytesMut::from(&b"+A\r\n+B\r\n"[..]);

        assert_eq!(
            RespValue::parse(&mut buf).unwrap(),
            Some(RespValue::SimpleString("A".to_string()))
        );
        assert_eq!(
            RespValue::parse(&mut buf).unwrap(),
            Some(RespValue::SimpleString("B".to_string()))
        );
        assert_eq!(RespValue::parse(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_malformed_input() {
        let cases: [(&[u8], RespError); 4] = [
            (b"?what\r\n", RespError::UnknownType(b'?')),
            (b"$abc\r\n", RespError::InvalidLength("abc".to_string())),
            (b"$3\r\nfooXY", RespError::MissingTerminator),
            (b"$99999999\r\n", RespError::BulkTooLarge(99_999_999)),
        ];

        for (data, expected) in cases {
            let mut buf = BytesMut::from(data);
            assert_eq!(RespValue::parse(&mut buf), Err(expected));
        }
    }
}
