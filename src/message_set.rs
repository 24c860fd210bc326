//! Ordered batch of offset tagged messages.
//!
//! ### Protocol Def
//! ```text
//! MessageSet => [offset message_size message]
//!   offset => INT64
//!   message_size => INT32
//!   message => MESSAGE
//! ```
//!
//! Unlike other protocol arrays a message set has no element count; it
//! simply runs to the end of its enclosing buffer. A broker answering a size
//! bounded fetch may cut the last message short, so decoding stops quietly
//! at a partial trailing frame and returns the messages before it.

use std::collections::{btree_map, BTreeMap};

use bytes::{BufMut, Bytes};
use nom::{
    bytes::streaming::take,
    error::{ErrorKind, ParseError},
    number::streaming::{be_i32, be_i64},
    IResult, InputLength,
};
use nombytes::NomBytes;

use crate::{
    encode::{ToByte, Writer},
    error::{Error, Result},
    message::{Attributes, Compression, Message},
    parser, utils,
};

/// What to do with a frame whose checksum does not match.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum CorruptionPolicy {
    /// Abort the decode with [`Error::ChecksumMismatch`].
    #[default]
    Fail,
    /// Keep the messages before the corrupt frame and stop, as for a
    /// truncated one.
    Stop,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    pub corruption: CorruptionPolicy,
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn corruption(mut self, policy: CorruptionPolicy) -> Self {
        self.corruption = policy;
        self
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct MessageSet {
    messages: BTreeMap<i64, Message>,
}

/// One `[offset size crc body]` entry as read off the wire.
struct Frame {
    offset: i64,
    crc: i32,
    body: Bytes,
}

impl MessageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message one past the highest offset held, starting at 0.
    ///
    /// These are placeholders; the broker assigns real log offsets on produce.
    pub fn add_message(&mut self, message: Message) -> i64 {
        let offset = self
            .messages
            .keys()
            .next_back()
            .map_or(0, |last| last + 1);
        self.messages.insert(offset, message);
        offset
    }

    /// Place a message at an explicit offset, returning any it replaced.
    pub fn insert(&mut self, offset: i64, message: Message) -> Option<Message> {
        self.messages.insert(offset, message)
    }

    pub fn get(&self, offset: i64) -> Option<&Message> {
        self.messages.get(&offset)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages in ascending offset order.
    pub fn iter(&self) -> impl Iterator<Item = (i64, &Message)> {
        self.messages.iter().map(|(offset, message)| (*offset, message))
    }

    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut writer = Writer::new();
        writer.write(self)?;
        Ok(writer.take_bytes())
    }

    pub fn decode(bytes: Bytes) -> Result<Self> {
        Self::decode_with(bytes, DecodeOptions::default())
    }

    pub fn decode_with(bytes: Bytes, options: DecodeOptions) -> Result<Self> {
        Self::decode_frames(bytes, options, true)
    }

    /// Decode a set that must end on a frame boundary, such as the payload of
    /// a compressed wrapper. A partial trailing frame is malformed.
    pub fn decode_complete(bytes: Bytes, options: DecodeOptions) -> Result<Self> {
        Self::decode_frames(bytes, options, false)
    }

    fn decode_frames(bytes: Bytes, options: DecodeOptions, partial_tail: bool) -> Result<Self> {
        tracing::trace!("Parsing MessageSet {:?}", bytes);
        let mut set = MessageSet::new();
        let mut s = NomBytes::new(bytes.clone());

        while s.input_len() > 0 {
            let (rest, frame) = match parse_frame(s.clone()) {
                Ok(parsed) => parsed,
                Err(nom::Err::Incomplete(_)) if !partial_tail => {
                    tracing::error!(
                        "ERROR: MessageSet ends inside a frame after {} messages",
                        set.len()
                    );
                    return Err(Error::MalformedProtocolData(bytes));
                }
                Err(nom::Err::Incomplete(_)) => {
                    tracing::debug!(
                        "Dropping partial trailing message ({} bytes) after {} messages",
                        s.input_len(),
                        set.len()
                    );
                    break;
                }
                Err(err) => {
                    tracing::error!("ERROR: Failed parsing MessageSet frame {:?}", err);
                    return Err(parser::into_error(err, &bytes));
                }
            };
            s = rest;

            let actual = utils::to_crc(&frame.body);
            if actual != frame.crc {
                match options.corruption {
                    CorruptionPolicy::Fail => {
                        tracing::error!(
                            "ERROR: Checksum mismatch at offset {}: expected {}, computed {}",
                            frame.offset,
                            frame.crc,
                            actual
                        );
                        return Err(Error::ChecksumMismatch {
                            offset: frame.offset,
                            expected: frame.crc,
                            actual,
                        });
                    }
                    CorruptionPolicy::Stop => {
                        tracing::warn!(
                            "Stopping at corrupt message at offset {} after {} messages",
                            frame.offset,
                            set.len()
                        );
                        break;
                    }
                }
            }

            // the body is complete, so running short inside it means its
            // own length fields are wrong
            let message = Message::decode(frame.body.clone()).map_err(|err| match err {
                Error::Underflow => Error::MalformedProtocolData(frame.body),
                err => err,
            })?;
            set.messages.insert(frame.offset, message);
        }

        tracing::trace!("Parsed MessageSet with {} messages", set.len());
        Ok(set)
    }

    /// Pack the whole set into a single compressed wrapper message.
    pub fn compress(&self, codec: Compression) -> Result<Message> {
        if codec == Compression::None {
            return Err(Error::CompressionError(
                "no compression codec selected".to_string(),
            ));
        }
        let inner = self.to_bytes()?;
        let value = codec.compress(&inner)?;
        tracing::trace!(
            "Compressed {} messages with {:?} from {} to {} bytes",
            self.len(),
            codec,
            inner.len(),
            value.len()
        );
        Ok(Message::new(None, Bytes::from(value)).with_attributes(Attributes::new(codec)))
    }
}

impl ToByte for MessageSet {
    // render: [Offset MessageSize Message], with no leading element count
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        for (offset, message) in self.iter() {
            let bytes = message.to_bytes()?;
            let size = i32::try_from(bytes.len()).map_err(|_| Error::EncodingError)?;
            offset.encode(buffer)?;
            size.encode(buffer)?;
            buffer.put(bytes);
        }
        Ok(())
    }
}

impl IntoIterator for MessageSet {
    type Item = (i64, Message);
    type IntoIter = btree_map::IntoIter<i64, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}

impl FromIterator<Message> for MessageSet {
    fn from_iter<I: IntoIterator<Item = Message>>(iter: I) -> Self {
        let mut set = MessageSet::new();
        for message in iter {
            set.add_message(message);
        }
        set
    }
}

fn parse_frame(s: NomBytes) -> IResult<NomBytes, Frame> {
    let (s, offset) = be_i64(s)?;
    let (s, size) = be_i32(s)?;
    if size < 4 {
        return Err(nom::Err::Error(nom::error::Error::from_error_kind(
            s,
            ErrorKind::LengthValue,
        )));
    }
    let (s, crc) = be_i32(s)?;
    let (s, body) = take((size - 4) as usize)(s)?;

    Ok((
        s,
        Frame {
            offset,
            crc,
            body: body.into_bytes(),
        },
    ))
}

#[cfg(test)]
mod test {
    use super::*;

    fn example_set() -> MessageSet {
        ["one", "two", "three"]
            .into_iter()
            .map(|value| {
                Message::new(
                    Some(Bytes::from_static(b"key")),
                    Bytes::from(value.as_bytes().to_vec()),
                )
            })
            .collect()
    }

    #[test]
    fn encode() {
        let mut set = MessageSet::new();
        set.add_message(Message::new(
            Some(Bytes::from_static(b"Tester")),
            Bytes::from_static(b"Value 1"),
        ));

        let b = [
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 27, 58, 153, 7, 97, 0, 0, 0, 0, 0, 6, 84, 101, 115,
            116, 101, 114, 0, 0, 0, 7, 86, 97, 108, 117, 101, 32, 49,
        ];

        assert_eq!(set.to_bytes().unwrap().as_ref(), b);
    }

    #[test]
    fn add_message_assigns_sequential_offsets() {
        let mut set = MessageSet::new();
        assert_eq!(set.add_message(Message::new(None, Bytes::new())), 0);
        assert_eq!(set.add_message(Message::new(None, Bytes::new())), 1);
        assert_eq!(set.add_message(Message::new(None, Bytes::new())), 2);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn add_message_after_insert_keeps_every_message() {
        let mut set = MessageSet::new();
        set.insert(1, Message::new(None, Bytes::from_static(b"a")));
        assert_eq!(set.add_message(Message::new(None, Bytes::from_static(b"b"))), 2);
        assert_eq!(set.add_message(Message::new(None, Bytes::from_static(b"c"))), 3);

        assert_eq!(set.len(), 3);
        assert_eq!(set.get(1).unwrap().value, Some(Bytes::from_static(b"a")));
        assert_eq!(set.get(3).unwrap().value, Some(Bytes::from_static(b"c")));
    }

    #[test]
    fn decode_preserves_offsets() {
        let set = example_set();
        let decoded = MessageSet::decode(set.to_bytes().unwrap()).unwrap();

        assert_eq!(decoded, set);
        assert_eq!(
            decoded.iter().map(|(offset, _)| offset).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn decode_sparse_offsets() {
        let mut set = MessageSet::new();
        set.insert(42, Message::new(None, Bytes::from_static(b"a")));
        set.insert(7, Message::new(None, Bytes::from_static(b"b")));

        let decoded = MessageSet::decode(set.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded.get(7), set.get(7));
        assert_eq!(decoded.get(42), set.get(42));
    }

    #[test]
    fn decode_empty() {
        assert!(MessageSet::decode(Bytes::new()).unwrap().is_empty());
    }

    #[test]
    fn any_flipped_byte_fails_the_checksum() {
        let mut set = MessageSet::new();
        set.add_message(Message::new(
            Some(Bytes::from_static(b"k")),
            Bytes::from_static(b"value"),
        ));
        let bytes = set.to_bytes().unwrap();

        // everything after offset and size belongs to the message
        for i in 12..bytes.len() {
            let mut corrupt = bytes.to_vec();
            corrupt[i] ^= 0xff;
            assert!(
                matches!(
                    MessageSet::decode(Bytes::from(corrupt)),
                    Err(Error::ChecksumMismatch { offset: 0, .. })
                ),
                "byte {} was not caught",
                i
            );
        }
    }

    #[test]
    fn truncated_tail_is_dropped() {
        let set = example_set();
        let bytes = set.to_bytes().unwrap();
        let last_frame = 12 + set.get(2).unwrap().to_bytes().unwrap().len();
        let boundary = bytes.len() - last_frame;

        for cut in boundary..bytes.len() {
            let decoded = MessageSet::decode(bytes.slice(..cut)).unwrap();
            assert_eq!(decoded.len(), 2, "cut at {}", cut);
            assert_eq!(decoded.get(0), set.get(0));
            assert_eq!(decoded.get(1), set.get(1));
        }
    }

    #[test]
    fn corruption_policy() {
        let set = example_set();
        let mut corrupt = set.to_bytes().unwrap().to_vec();
        let last = corrupt.len() - 1;
        corrupt[last] ^= 0x01;
        let corrupt = Bytes::from(corrupt);

        assert!(matches!(
            MessageSet::decode(corrupt.clone()),
            Err(Error::ChecksumMismatch { offset: 2, .. })
        ));

        let options = DecodeOptions::new().corruption(CorruptionPolicy::Stop);
        let decoded = MessageSet::decode_with(corrupt, options).unwrap();
        assert_eq!(decoded.len(), 2);
    }

    #[test]
    fn undersized_frame_is_malformed() {
        let bytes = Bytes::from_static(&[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 3, 0, 0, 0]);
        assert!(MessageSet::decode(bytes).unwrap_err().is_malformed());
    }

    #[test]
    fn inner_length_overrun_is_malformed() {
        // a body whose value claims more bytes than the frame holds
        let body: &[u8] = &[0, 0, 255, 255, 255, 255, 0, 0, 0, 9, 1];
        let mut bytes = vec![0, 0, 0, 0, 0, 0, 0, 0];
        bytes.extend(((body.len() + 4) as i32).to_be_bytes());
        bytes.extend(utils::to_crc(body).to_be_bytes());
        bytes.extend(body);

        assert!(matches!(
            MessageSet::decode(Bytes::from(bytes)),
            Err(Error::MalformedProtocolData(_))
        ));
    }

    #[test]
    fn compressed_wrapper() {
        let set = example_set();

        for codec in [Compression::Gzip, Compression::Snappy] {
            let wrapper = set.compress(codec).unwrap();
            assert_eq!(wrapper.attributes.compression, codec);
            assert_eq!(wrapper.key, None);

            let mut outer = MessageSet::new();
            outer.add_message(wrapper);
            let decoded = MessageSet::decode(outer.to_bytes().unwrap()).unwrap();
            let (_, wrapper) = decoded.into_iter().next().unwrap();
            assert_eq!(wrapper.decompress().unwrap(), Some(set.clone()));
        }

        assert!(set.compress(Compression::None).is_err());
        assert_eq!(set.get(0).unwrap().decompress().unwrap(), None);
    }
}
