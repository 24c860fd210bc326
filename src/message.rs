//! A single log record in the v0 message format.
//!
//! ### Protocol Def
//! ```text
//! Message => crc magic_byte attributes key value
//!   crc => INT32
//!   magic_byte => INT8
//!   attributes => INT8
//!     bit 0~1: compression codec (0 none, 1 gzip, 2 snappy)
//!     bit 2~7: unused, written as zero
//!   key => BYTES
//!   value => BYTES
//! ```
//!
//! The crc covers everything after itself. It is verified by the enclosing
//! [`MessageSet`](crate::message_set::MessageSet) frame, which is the only
//! place that knows the exact body length.

use bytes::{BufMut, Bytes};
use nom::{number::streaming::be_i8, IResult};
use nombytes::NomBytes;

use crate::{
    encode::{ToByte, Writer},
    error::{Error, Result},
    message_set::{DecodeOptions, MessageSet},
    parser, utils,
};

/// The magic byte (a.k.a version) we use for sent messages.
pub const MESSAGE_MAGIC_BYTE: i8 = 0;

const COMPRESSION_MASK: i8 = 0b11;

/// Compression codec negotiated through the attribute byte.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Snappy,
}

impl Compression {
    pub(crate) fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            Compression::None => Ok(data.to_vec()),
            Compression::Gzip => utils::gzip(data),
            Compression::Snappy => utils::snappy(data),
        }
    }

    pub(crate) fn uncompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            Compression::None => Ok(data.to_vec()),
            Compression::Gzip => utils::gunzip(data),
            Compression::Snappy => utils::unsnappy(data),
        }
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Attributes {
    pub compression: Compression,
}

impl Attributes {
    pub fn new(compression: Compression) -> Self {
        Self { compression }
    }

    pub fn to_byte(&self) -> i8 {
        match self.compression {
            Compression::None => 0,
            Compression::Gzip => 1,
            Compression::Snappy => 2,
        }
    }

    /// Read the codec from the low two bits; the other bits are ignored.
    pub fn from_byte(byte: i8) -> Result<Self> {
        let compression = match byte & COMPRESSION_MASK {
            0 => Compression::None,
            1 => Compression::Gzip,
            2 => Compression::Snappy,
            codec => {
                tracing::error!("ERROR: Unsupported compression codec {}", codec);
                return Err(Error::UnsupportedCompressionCodec(codec));
            }
        };
        Ok(Self { compression })
    }
}

/// One record: an optional key and a value.
///
/// A `None` key is written as length `-1`, which the broker keeps apart from
/// an empty key. The value is always present for messages built here; a
/// decoded message keeps a null value if the broker sent one.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub magic_byte: i8,
    pub attributes: Attributes,
    pub key: Option<Bytes>,
    pub value: Option<Bytes>,
}

impl Message {
    pub fn new(key: Option<Bytes>, value: Bytes) -> Self {
        Self {
            magic_byte: MESSAGE_MAGIC_BYTE,
            attributes: Attributes::default(),
            key,
            value: Some(value),
        }
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Encode as `[crc][magic][attributes][key][value]`.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut scratch = Writer::new();
        scratch
            .write(&self.magic_byte)?
            .write(&self.attributes.to_byte())?
            .write(&self.key)?
            .write(&self.value)?;
        let body = scratch.take_bytes();

        let mut out = Writer::with_capacity(body.len() + 4);
        out.write(&utils::to_crc(&body))?.write_raw(&body);
        Ok(out.take_bytes())
    }

    /// Decode a message body: everything after the crc.
    ///
    /// The caller has already checked the crc against these exact bytes,
    /// which must hold exactly one message.
    pub fn decode(body: Bytes) -> Result<Self> {
        let (rest, (magic_byte, attributes, key, value)) =
            parse_message_body(NomBytes::new(body.clone()))
                .map_err(|err| parser::into_error(err, &body))?;
        if !rest.into_bytes().is_empty() {
            tracing::error!("ERROR: Trailing bytes after message value {:?}", body);
            return Err(Error::MalformedProtocolData(body));
        }

        Ok(Self {
            magic_byte,
            attributes: Attributes::from_byte(attributes)?,
            key,
            value,
        })
    }

    /// Unpack the message set carried by a compressed wrapper message.
    ///
    /// Returns `None` when the message is not compressed.
    pub fn decompress(&self) -> Result<Option<MessageSet>> {
        self.decompress_with(DecodeOptions::default())
    }

    /// Like [`Message::decompress`], applying `options` to the inner set.
    ///
    /// The inner set is complete once decompressed, so a partial trailing
    /// frame is malformed rather than dropped.
    pub fn decompress_with(&self, options: DecodeOptions) -> Result<Option<MessageSet>> {
        let codec = self.attributes.compression;
        if codec == Compression::None {
            return Ok(None);
        }
        let value = self.value.as_deref().unwrap_or_default();
        let inner = codec.uncompress(value)?;
        tracing::trace!(
            "Decompressed {:?} message from {} to {} bytes",
            codec,
            value.len(),
            inner.len()
        );
        MessageSet::decode_complete(Bytes::from(inner), options).map(Some)
    }
}

impl ToByte for Message {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        buffer.put(self.to_bytes()?);
        Ok(())
    }
}

type MessageBody = (i8, i8, Option<Bytes>, Option<Bytes>);

fn parse_message_body(s: NomBytes) -> IResult<NomBytes, MessageBody> {
    let (s, magic_byte) = be_i8(s)?;
    let (s, attributes) = be_i8(s)?;
    let (s, key) = parser::parse_nullable_bytes(s)?;
    let (s, value) = parser::parse_nullable_bytes(s)?;
    Ok((s, (magic_byte, attributes, key, value)))
}
