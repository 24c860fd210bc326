//! Parsing and processing for Offset Commit responses.
//!
//! ### Example
//! ```rust,ignore
//! let offset_response = protocol::OffsetCommitResponse::try_from(response_body)?;
//! ```
//!
//! ### Protocol Def
//! ```text
//! OffsetCommit Response (Version: 1) => [topics]
//!   topics => name [partitions]
//!     name => STRING
//!     partitions => partition_index error_code
//!       partition_index => INT32
//!       error_code => INT16
//! ```

use bytes::Bytes;
use nom::{
    number::streaming::{be_i16, be_i32},
    IResult,
};
use nombytes::NomBytes;

use crate::{
    error::{check_error_codes, Error, Result},
    offset::TopicPartition,
    parser::{self, parse_array},
};

/// The base Offset Commit response object.
///
/// Only responses where every partition committed cleanly can be built.
#[derive(Debug, PartialEq)]
pub struct OffsetCommitResponse {
    pub topics: Vec<Topic>,
}

#[derive(Debug, PartialEq)]
pub struct Topic {
    pub name: Bytes,
    pub partitions: Vec<Partition>,
}

#[derive(Debug, PartialEq)]
pub struct Partition {
    pub partition_index: i32,
    pub error_code: i16,
}

// this helps us cast the server response into this type
impl TryFrom<Bytes> for OffsetCommitResponse {
    type Error = Error;

    fn try_from(s: Bytes) -> Result<Self> {
        tracing::trace!("Parsing OffsetCommitResponse {:?}", s);
        let (_, offset_commit) =
            parse_offset_commit_response(NomBytes::new(s.clone())).map_err(|err| {
                tracing::error!("ERROR: Failed parsing OffsetCommitResponse {:?}", err);
                tracing::error!("ERROR: OffsetCommitResponse Bytes {:?}", s);
                parser::into_error(err, &s)
            })?;
        check_error_codes(
            offset_commit
                .topics
                .iter()
                .flat_map(|topic| topic.partitions.iter().map(|p| p.error_code)),
        )?;
        tracing::trace!("Parsed OffsetCommitResponse {:?}", offset_commit);
        Ok(offset_commit)
    }
}

impl OffsetCommitResponse {
    /// The partitions the broker acknowledged.
    pub fn committed(&self) -> Result<Vec<TopicPartition>> {
        let mut committed = vec![];
        for topic in &self.topics {
            let name = parser::into_string(topic.name.clone())?;
            for partition in &topic.partitions {
                committed.push(TopicPartition::new(name.clone(), partition.partition_index));
            }
        }
        Ok(committed)
    }
}

pub fn parse_offset_commit_response(s: NomBytes) -> IResult<NomBytes, OffsetCommitResponse> {
    let (s, topics) = parse_array(parse_topic)(s)?;

    Ok((s, OffsetCommitResponse { topics }))
}

fn parse_topic(s: NomBytes) -> IResult<NomBytes, Topic> {
    let (s, name) = parser::parse_string(s)?;
    let (s, partitions) = parser::parse_array(parse_partition)(s)?;

    Ok((s, Topic { name, partitions }))
}

fn parse_partition(s: NomBytes) -> IResult<NomBytes, Partition> {
    let (s, partition_index) = be_i32(s)?;
    let (s, error_code) = be_i16(s)?;

    Ok((
        s,
        Partition {
            partition_index,
            error_code,
        },
    ))
}
