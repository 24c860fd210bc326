//! Serialize data into the bytecode protocol.
//!
//! Every primitive is written big-endian. Strings carry an `int16` length
//! prefix and byte arrays an `int32` one, where a length of `-1` marks an
//! absent value.
use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};

// Convert a usize length into the signed width of its prefix, returning
// `EncodingError` when it does not fit.
macro_rules! try_usize_to_int {
    ($value:expr, $ttype:ident) => {{
        let maxv = $ttype::MAX;
        let x: usize = $value;
        if (x as u64) <= (maxv as u64) {
            x as $ttype
        } else {
            return Err(Error::EncodingError);
        }
    }};
}

pub trait ToByte {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()>;
}

impl<'a, T: ToByte + 'a + ?Sized> ToByte for &'a T {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        (*self).encode(buffer)
    }
}

impl ToByte for i8 {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        buffer.put_i8(*self);
        Ok(())
    }
}

impl ToByte for i16 {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        buffer.put_i16(*self);
        Ok(())
    }
}

impl ToByte for i32 {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        buffer.put_i32(*self);
        Ok(())
    }
}

impl ToByte for i64 {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        buffer.put_i64(*self);
        Ok(())
    }
}

impl ToByte for str {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        let l = try_usize_to_int!(self.len(), i16);
        buffer.put_i16(l);
        buffer.put(self.as_bytes());
        Ok(())
    }
}

impl ToByte for String {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        self.as_str().encode(buffer)
    }
}

impl<V: ToByte> ToByte for [V] {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        encode_as_array(buffer, self, |buffer, x| x.encode(buffer))
    }
}

impl ToByte for [u8] {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        let l = try_usize_to_int!(self.len(), i32);
        buffer.put_i32(l);
        buffer.put(self);
        Ok(())
    }
}

impl ToByte for Bytes {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        self.as_ref().encode(buffer)
    }
}

/// Renders the length of `xs` to `buffer` as the start of a protocol array
/// and then invokes `f` to render each element.
pub fn encode_as_array<T, F, W>(buffer: &mut W, xs: &[T], mut f: F) -> Result<()>
where
    F: FnMut(&mut W, &T) -> Result<()>,
    W: BufMut,
{
    let l = try_usize_to_int!(xs.len(), i32);
    buffer.put_i32(l);
    for x in xs {
        f(buffer, x)?;
    }
    Ok(())
}

impl<'a> ToByte for Option<&'a [u8]> {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        match *self {
            Some(xs) => xs.encode(buffer),
            None => (-1i32).encode(buffer),
        }
    }
}

impl ToByte for Option<Bytes> {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        match self {
            Some(xs) => xs.encode(buffer),
            None => (-1i32).encode(buffer),
        }
    }
}

impl<'a> ToByte for Option<&'a str> {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        match *self {
            Some(xs) => xs.encode(buffer),
            None => (-1i16).encode(buffer),
        }
    }
}

impl ToByte for Option<String> {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        self.as_deref().encode(buffer)
    }
}

/// Growable output buffer for building protocol bytes.
///
/// There are two ways to get the bytes back out. [`Writer::take_bytes`] hands
/// over what was written and leaves the writer empty, ready for more.
/// [`Writer::peek_bytes`] copies what was written and leaves it in place.
#[derive(Debug, Default)]
pub struct Writer {
    buffer: BytesMut,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    /// Append the encoding of `value`.
    pub fn write<V: ToByte + ?Sized>(&mut self, value: &V) -> Result<&mut Self> {
        value.encode(&mut self.buffer)?;
        Ok(self)
    }

    /// Append raw bytes with no length prefix.
    pub fn write_raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buffer.put_slice(bytes);
        self
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Return everything written so far and reset the write position.
    pub fn take_bytes(&mut self) -> Bytes {
        self.buffer.split().freeze()
    }

    /// Return a copy of everything written so far.
    pub fn peek_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(&self.buffer)
    }
}

#[test]
fn test_string_too_long() {
    let s = "a".repeat(i16::MAX as usize + 1);
    let mut buf = Vec::new();
    match s.encode(&mut buf) {
        Err(Error::EncodingError) => {}
        _ => panic!(),
    }
    assert!(buf.is_empty());
}

#[test]
fn codec_i8() {
    let mut buf = vec![];
    let orig: i8 = 5;

    // Encode into buffer
    orig.encode(&mut buf).unwrap();
    assert_eq!(buf, [5]);
}

#[test]
fn codec_i16() {
    let mut buf = vec![];
    let orig: i16 = -2;

    orig.encode(&mut buf).unwrap();
    assert_eq!(buf, [255, 254]);
}

#[test]
fn codec_32() {
    let mut buf = vec![];
    let orig: i32 = 5;

    orig.encode(&mut buf).unwrap();
    assert_eq!(buf, [0, 0, 0, 5]);
}

#[test]
fn codec_i64() {
    let mut buf = vec![];
    let orig: i64 = 5;

    orig.encode(&mut buf).unwrap();
    assert_eq!(buf, [0, 0, 0, 0, 0, 0, 0, 5]);
}

#[test]
fn codec_string() {
    let mut buf = vec![];
    let orig = "test".to_owned();

    orig.encode(&mut buf).unwrap();
    assert_eq!(buf, [0, 4, 116, 101, 115, 116]);
}

#[test]
fn codec_vec_u8() {
    let mut buf = vec![];
    let orig: Vec<u8> = vec![1, 2, 3];

    orig.encode(&mut buf).unwrap();
    assert_eq!(buf, [0, 0, 0, 3, 1, 2, 3]);
}

#[test]
fn codec_nullable_fields() {
    let mut buf = vec![];
    None::<Bytes>.encode(&mut buf).unwrap();
    Some(Bytes::new()).encode(&mut buf).unwrap();
    None::<&str>.encode(&mut buf).unwrap();
    assert_eq!(buf, [255, 255, 255, 255, 0, 0, 0, 0, 255, 255]);
}

#[test]
fn codec_array() {
    let mut buf = vec![];
    let orig: Vec<i32> = vec![7, 8];

    orig.encode(&mut buf).unwrap();
    assert_eq!(buf, [0, 0, 0, 2, 0, 0, 0, 7, 0, 0, 0, 8]);
}

#[test]
fn writer_take_resets() {
    let mut writer = Writer::new();
    writer.write(&1i16).unwrap().write(&"ab").unwrap();

    let first = writer.take_bytes();
    assert_eq!(first.as_ref(), [0, 1, 0, 2, b'a', b'b']);
    assert!(writer.is_empty());

    writer.write(&3i8).unwrap();
    assert_eq!(writer.take_bytes().as_ref(), [3]);
}

#[test]
fn writer_peek_keeps_contents() {
    let mut writer = Writer::new();
    writer.write(&9i32).unwrap();

    let peeked = writer.peek_bytes();
    assert_eq!(peeked.as_ref(), [0, 0, 0, 9]);
    assert_eq!(writer.len(), 4);

    writer.write(&1i8).unwrap();
    assert_eq!(peeked.len(), 4);
    assert_eq!(writer.peek_bytes().as_ref(), [0, 0, 0, 9, 1]);
}
