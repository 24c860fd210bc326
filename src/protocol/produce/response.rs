//! Parsing and processing for Produce responses.
//!
//! ### Example
//! ```rust,ignore
//! let (header, produce_response) =
//!     protocol::decode_response_frame(&produce_request, response_bytes)?;
//! ```
//!
//! ### Protocol Def
//! ```text
//! Produce Response (Version: 0) => [responses]
//!   responses => name [partition_responses]
//!     name => STRING
//!     partition_responses => index error_code base_offset
//!       index => INT32
//!       error_code => INT16
//!       base_offset => INT64
//! ```
//!
//! Note we are using version 0 for the response.

use bytes::Bytes;
use nom::{
    number::streaming::{be_i16, be_i32, be_i64},
    IResult,
};
use nombytes::NomBytes;

use crate::{
    error::{check_error_codes, Error, Result},
    offset::TopicPartition,
    parser,
};

/// The base Produce response object.
///
/// Note, the request needs to have a non-zero value for `required_acks` to receive a response.
#[derive(Debug, PartialEq)]
pub struct ProduceResponse {
    /// Each produce response
    pub responses: Vec<Response>,
}

#[derive(Debug, PartialEq)]
pub struct Response {
    /// The topic name
    pub name: Bytes,
    /// Each partition that we produced to within the topic.
    pub partition_responses: Vec<PartitionResponse>,
}

#[derive(Debug, PartialEq)]
pub struct PartitionResponse {
    /// The partition index.
    pub index: i32,
    /// The error code, or 0 if there was no error.
    pub error_code: i16,
    /// The offset assigned to the first message of the set.
    pub base_offset: i64,
}

impl TryFrom<Bytes> for ProduceResponse {
    type Error = Error;

    fn try_from(s: Bytes) -> Result<Self> {
        tracing::trace!("Parsing ProduceResponse {:?}", s);
        let (_, produce) = parse_produce_response(NomBytes::new(s.clone())).map_err(|err| {
            tracing::error!("ERROR: Failed parsing ProduceResponse {:?}", err);
            tracing::error!("ERROR: ProduceResponse Bytes {:?}", s);
            parser::into_error(err, &s)
        })?;
        check_error_codes(
            produce
                .responses
                .iter()
                .flat_map(|r| r.partition_responses.iter().map(|p| p.error_code)),
        )?;
        tracing::trace!("Parsed ProduceResponse {:?}", produce);
        Ok(produce)
    }
}

impl ProduceResponse {
    /// Base offsets keyed by the partition they were assigned in.
    pub fn base_offsets(&self) -> Result<Vec<(TopicPartition, i64)>> {
        let mut offsets = vec![];
        for response in &self.responses {
            let name = parser::into_string(response.name.clone())?;
            for partition in &response.partition_responses {
                offsets.push((
                    TopicPartition::new(name.clone(), partition.index),
                    partition.base_offset,
                ));
            }
        }
        Ok(offsets)
    }
}

pub fn parse_produce_response(s: NomBytes) -> IResult<NomBytes, ProduceResponse> {
    let (s, responses) = parser::parse_array(parse_response)(s)?;

    Ok((s, ProduceResponse { responses }))
}

pub fn parse_response(s: NomBytes) -> IResult<NomBytes, Response> {
    let (s, name) = parser::parse_string(s)?;
    let (s, partition_responses) = parser::parse_array(parse_partition_response)(s)?;

    Ok((
        s,
        Response {
            name,
            partition_responses,
        },
    ))
}

pub fn parse_partition_response(s: NomBytes) -> IResult<NomBytes, PartitionResponse> {
    let (s, index) = be_i32(s)?;
    let (s, error_code) = be_i16(s)?;
    let (s, base_offset) = be_i64(s)?;

    Ok((
        s,
        PartitionResponse {
            index,
            error_code,
            base_offset,
        },
    ))
}
