//! Parsing and processing for Offset Fetch responses.
//!
//! ### Example
//! ```rust,ignore
//! let offset_response = protocol::OffsetFetchResponse::try_from(response_body)?;
//! for offset in offset_response.offsets {
//!     println!("{}:{} at {}", offset.topic, offset.partition, offset.offset);
//! }
//! ```
//!
//! ### Protocol Def
//! ```text
//! OffsetFetch Response (Version: 1) => [topics]
//!   topics => name [partitions]
//!     name => STRING
//!     partitions => partition_index committed_offset metadata error_code
//!       partition_index => INT32
//!       committed_offset => INT64
//!       metadata => NULLABLE_STRING
//!       error_code => INT16
//! ```

use bytes::Bytes;
use nom::{
    number::streaming::{be_i16, be_i32, be_i64},
    IResult,
};
use nombytes::NomBytes;

use crate::{
    error::{check_error_codes, Error, Result},
    offset::{ConsumerOffset, TopicPartition},
    parser,
};

/// The committed offsets of a group, one per requested partition.
///
/// Construction fails with [`Error::ProtocolError`] as soon as any partition
/// carries a non zero error code.
#[derive(Debug, PartialEq)]
pub struct OffsetFetchResponse {
    pub offsets: Vec<ConsumerOffset>,
}

/// The responses per topic, as read off the wire.
#[derive(Debug, PartialEq)]
pub struct Topic {
    /// The topic name.
    pub name: Bytes,
    /// The responses per partition.
    pub partitions: Vec<Partition>,
}

/// The responses per partition.
#[derive(Debug, PartialEq)]
pub struct Partition {
    /// The partition index.
    pub partition_index: i32,
    /// The committed message offset.
    pub committed_offset: i64,
    /// The partition metadata.
    pub metadata: Option<Bytes>,
    /// The error code, or 0 if there was no error.
    pub error_code: i16,
}

impl TryFrom<Bytes> for OffsetFetchResponse {
    type Error = Error;

    fn try_from(s: Bytes) -> Result<Self> {
        tracing::trace!("Parsing OffsetFetchResponse {:?}", s);
        let (_, topics) = parse_offset_fetch_response(NomBytes::new(s.clone())).map_err(|err| {
            tracing::error!("ERROR: Failed parsing OffsetFetchResponse {:?}", err);
            tracing::error!("ERROR: OffsetFetchResponse Bytes {:?}", s);
            parser::into_error(err, &s)
        })?;

        check_error_codes(
            topics
                .iter()
                .flat_map(|topic| topic.partitions.iter().map(|p| p.error_code)),
        )?;

        let mut offsets = vec![];
        for topic in topics {
            let name = parser::into_string(topic.name)?;
            for partition in topic.partitions {
                offsets.push(ConsumerOffset {
                    topic: name.clone(),
                    partition: partition.partition_index,
                    offset: partition.committed_offset,
                    metadata: partition.metadata.map(parser::into_string).transpose()?,
                    error_code: partition.error_code,
                });
            }
        }

        let offset_fetch = OffsetFetchResponse { offsets };
        tracing::trace!("Parsed OffsetFetchResponse {:?}", offset_fetch);
        Ok(offset_fetch)
    }
}

impl OffsetFetchResponse {
    pub fn offset_for(&self, topic_partition: &TopicPartition) -> Option<&ConsumerOffset> {
        self.offsets.iter().find(|offset| {
            offset.partition == topic_partition.partition && offset.topic == topic_partition.topic
        })
    }
}

pub fn parse_offset_fetch_response(s: NomBytes) -> IResult<NomBytes, Vec<Topic>> {
    parser::parse_array(parse_topic)(s)
}

fn parse_topic(s: NomBytes) -> IResult<NomBytes, Topic> {
    let (s, name) = parser::parse_string(s)?;
    let (s, partitions) = parser::parse_array(parse_partition)(s)?;

    Ok((s, Topic { name, partitions }))
}

fn parse_partition(s: NomBytes) -> IResult<NomBytes, Partition> {
    let (s, partition_index) = be_i32(s)?;
    let (s, committed_offset) = be_i64(s)?;
    let (s, metadata) = parser::parse_nullable_string(s)?;
    let (s, error_code) = be_i16(s)?;

    Ok((
        s,
        Partition {
            partition_index,
            committed_offset,
            metadata,
            error_code,
        },
    ))
}
