//! Parsing and processing for Fetch responses.
//!
//! ### Protocol Def
//! ```text
//! Fetch Response (Version: 0) => [responses]
//!   responses => topic [partitions]
//!     topic => STRING
//!     partitions => partition_index error_code high_watermark message_set_size message_set
//!       partition_index => INT32
//!       error_code => INT16
//!       high_watermark => INT64
//!       message_set_size => INT32
//!       message_set => MESSAGE SET
//! ```
//!
//! The broker fills each message set up to the requested byte limit, so the
//! last message of a partition is often cut short. That tail is dropped; see
//! [`MessageSet::decode_with`].

use bytes::Bytes;
use nom::{
    number::streaming::{be_i16, be_i32, be_i64},
    IResult,
};
use nombytes::NomBytes;

use crate::{
    error::{check_error_codes, Error, Result},
    message_set::{DecodeOptions, MessageSet},
    offset::TopicPartition,
    parser,
};

#[derive(Debug, Default, PartialEq)]
pub struct FetchResponse {
    /// The response topics.
    pub topics: Vec<Topic>,
}

/// The response topics.
#[derive(Debug, Clone, PartialEq)]
pub struct Topic {
    pub name: String,
    pub partitions: Vec<Partition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub partition_index: i32,
    pub error_code: i16,
    /// The offset at the end of the log for this partition.
    pub high_water_mark: i64,
    pub messages: MessageSet,
}

/// A topic as read off the wire, before its message sets are decoded.
#[derive(Debug, PartialEq)]
pub struct TopicData {
    pub name: Bytes,
    pub partitions: Vec<PartitionData>,
}

#[derive(Debug, PartialEq)]
pub struct PartitionData {
    pub partition_index: i32,
    pub error_code: i16,
    pub high_water_mark: i64,
    pub message_set: Bytes,
}

// this helps us cast the server response into this type
impl TryFrom<Bytes> for FetchResponse {
    type Error = Error;

    fn try_from(s: Bytes) -> Result<Self> {
        Self::decode_with(s, DecodeOptions::default())
    }
}

impl FetchResponse {
    pub fn decode_with(s: Bytes, options: DecodeOptions) -> Result<Self> {
        tracing::trace!("Parsing FetchResponse {:?}", s);
        let (_, topics) = parse_fetch_response(NomBytes::new(s.clone())).map_err(|err| {
            tracing::error!("ERROR: Failed parsing FetchResponse {:?}", err);
            tracing::error!("ERROR: FetchResponse Bytes {:?}", s);
            parser::into_error(err, &s)
        })?;
        check_error_codes(
            topics
                .iter()
                .flat_map(|topic| topic.partitions.iter().map(|p| p.error_code)),
        )?;

        let mut fetch_response = FetchResponse::default();
        for topic in topics {
            let mut partitions = Vec::with_capacity(topic.partitions.len());
            for partition in topic.partitions {
                partitions.push(Partition {
                    partition_index: partition.partition_index,
                    error_code: partition.error_code,
                    high_water_mark: partition.high_water_mark,
                    messages: MessageSet::decode_with(partition.message_set, options)?,
                });
            }
            fetch_response.topics.push(Topic {
                name: parser::into_string(topic.name)?,
                partitions,
            });
        }
        tracing::trace!(
            "Parsed FetchResponse with {} messages",
            fetch_response.message_count()
        );
        Ok(fetch_response)
    }

    pub fn message_count(&self) -> usize {
        self.topics.iter().map(|topic| topic.message_count()).sum()
    }

    pub fn partition(&self, tp: &TopicPartition) -> Option<&Partition> {
        self.topics
            .iter()
            .filter(|topic| topic.name == tp.topic)
            .flat_map(|topic| topic.partitions.iter())
            .find(|partition| partition.partition_index == tp.partition)
    }
}

impl Topic {
    pub fn message_count(&self) -> usize {
        self.partitions.iter().map(|p| p.messages.len()).sum()
    }
}

impl Partition {
    /// The partition's messages with compressed wrappers replaced by the
    /// messages they carry.
    pub fn unpacked(&self) -> Result<MessageSet> {
        self.unpacked_with(DecodeOptions::default())
    }

    /// [`Partition::unpacked`], decoding the inner sets with `options`.
    pub fn unpacked_with(&self, options: DecodeOptions) -> Result<MessageSet> {
        let mut set = MessageSet::new();
        for (offset, message) in self.messages.iter() {
            match message.decompress_with(options)? {
                None => {
                    set.insert(offset, message.clone());
                }
                Some(inner) => {
                    for (inner_offset, inner_message) in inner {
                        set.insert(inner_offset, inner_message);
                    }
                }
            }
        }
        Ok(set)
    }

    /// Offset to fetch from next, one past the last message returned.
    pub fn next_offset(&self) -> Option<i64> {
        self.messages.iter().last().map(|(offset, _)| offset + 1)
    }
}

pub fn parse_fetch_response(s: NomBytes) -> IResult<NomBytes, Vec<TopicData>> {
    parser::parse_array(parse_topic)(s)
}

fn parse_topic(s: NomBytes) -> IResult<NomBytes, TopicData> {
    let (s, name) = parser::parse_string(s)?;
    let (s, partitions) = parser::parse_array(parse_partition)(s)?;

    Ok((s, TopicData { name, partitions }))
}

fn parse_partition(s: NomBytes) -> IResult<NomBytes, PartitionData> {
    let (s, partition_index) = be_i32(s)?;
    let (s, error_code) = be_i16(s)?;
    let (s, high_water_mark) = be_i64(s)?;
    let (s, message_set) = parser::parse_bytes(s)?;

    Ok((
        s,
        PartitionData {
            partition_index,
            error_code,
            high_water_mark,
            message_set,
        },
    ))
}
