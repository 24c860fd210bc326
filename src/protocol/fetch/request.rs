//! Encoding and creation for Fetch requests.
//!
//! ### Example
//! ```rust,ignore
//! let mut fetch_request = protocol::FetchRequest::new(FetchParams::default());
//! fetch_request.add("purchases", 0, 300);
//! let frame = protocol::encode_request_frame(&fetch_request, correlation_id, client_id)?;
//! ```
//!
//! ### Protocol Def
//! ```text
//! Fetch Request (Version: 0) => replica_id max_wait_ms min_bytes [topics]
//!   replica_id => INT32
//!   max_wait_ms => INT32
//!   min_bytes => INT32
//!   topics => topic [partitions]
//!     topic => STRING
//!     partitions => partition fetch_offset partition_max_bytes
//!       partition => INT32
//!       fetch_offset => INT64
//!       partition_max_bytes => INT32
//! ```

use bytes::{BufMut, Bytes};

use crate::{
    encode::ToByte,
    error::Result,
    message_set::DecodeOptions,
    protocol::{FetchResponse, ProtocolCall},
};

pub const API_KEY_FETCH: i16 = 1;
pub const API_VERSION: i16 = 0;

/// Replica id sent by ordinary consumers.
pub const CONSUMER_REPLICA_ID: i32 = -1;

pub const DEFAULT_MAX_WAIT_MS: i32 = 200;
pub const DEFAULT_MIN_BYTES: i32 = 100;
pub const DEFAULT_MAX_BYTES: i32 = 30000;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FetchParams {
    pub max_wait_ms: i32,
    pub min_bytes: i32,
    /// Upper bound for each partition's message set.
    pub max_bytes: i32,
    /// How the returned message sets are decoded.
    pub decode: DecodeOptions,
}

impl Default for FetchParams {
    fn default() -> Self {
        Self::new()
    }
}

impl FetchParams {
    pub fn new() -> Self {
        Self {
            max_wait_ms: DEFAULT_MAX_WAIT_MS,
            min_bytes: DEFAULT_MIN_BYTES,
            max_bytes: DEFAULT_MAX_BYTES,
            decode: DecodeOptions::default(),
        }
    }

    pub fn max_wait_ms(mut self, max_wait_ms: i32) -> Self {
        self.max_wait_ms = max_wait_ms;
        self
    }

    pub fn min_bytes(mut self, min_bytes: i32) -> Self {
        self.min_bytes = min_bytes;
        self
    }

    pub fn max_bytes(mut self, max_bytes: i32) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn decode(mut self, decode: DecodeOptions) -> Self {
        self.decode = decode;
        self
    }
}

#[derive(Debug, Clone)]
pub struct FetchRequest<'a> {
    /// The broker ID of the follower, of -1 if this request is from a consumer.
    pub replica: i32,
    /// The maximum time in milliseconds to wait for the response.
    pub max_wait_ms: i32,
    /// The minimum bytes to accumulate in the response.
    pub min_bytes: i32,
    /// Partition limit used by [`FetchRequest::add`].
    pub max_bytes: i32,
    /// Applied when the response to this request is decoded.
    pub decode: DecodeOptions,
    /// The topics to fetch.
    pub topics: Vec<TopicPartition<'a>>,
}

/// The topics to fetch.
#[derive(Debug, Clone)]
pub struct TopicPartition<'a> {
    /// The name of the topic to fetch.
    pub topic_name: &'a str,
    /// The partitions to fetch.
    pub partitions: Vec<Partition>,
}

/// The partitions to fetch.
#[derive(Debug, Clone)]
pub struct Partition {
    /// The partition index.
    pub partition_index: i32,
    /// The message offset.
    pub offset: i64,
    /// The maximum bytes to fetch from this partition.
    pub max_bytes: i32,
}

impl<'a> FetchRequest<'a> {
    pub fn new(params: FetchParams) -> FetchRequest<'a> {
        FetchRequest {
            replica: CONSUMER_REPLICA_ID,
            max_wait_ms: params.max_wait_ms,
            min_bytes: params.min_bytes,
            max_bytes: params.max_bytes,
            decode: params.decode,
            topics: vec![],
        }
    }

    pub fn add(&mut self, topic_name: &'a str, partition_index: i32, offset: i64) {
        self.add_with_max_bytes(topic_name, partition_index, offset, self.max_bytes);
    }

    /// Request a partition starting at `offset`. A partition already in the
    /// request keeps its first position.
    pub fn add_with_max_bytes(
        &mut self,
        topic_name: &'a str,
        partition_index: i32,
        offset: i64,
        max_bytes: i32,
    ) {
        let partition = Partition {
            partition_index,
            offset,
            max_bytes,
        };
        match self
            .topics
            .iter_mut()
            .find(|topic| topic.topic_name == topic_name)
        {
            None => self.topics.push(TopicPartition {
                topic_name,
                partitions: vec![partition],
            }),
            Some(topic) => {
                if !topic
                    .partitions
                    .iter()
                    .any(|p| p.partition_index == partition_index)
                {
                    topic.partitions.push(partition)
                }
            }
        }
    }
}

impl<'a> ProtocolCall for FetchRequest<'a> {
    const API_KEY: i16 = API_KEY_FETCH;
    const API_VERSION: i16 = API_VERSION;

    type Response = FetchResponse;

    fn decode_response(&self, bytes: Bytes) -> Result<FetchResponse> {
        FetchResponse::decode_with(bytes, self.decode)
    }
}

impl<'a> ToByte for FetchRequest<'a> {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        tracing::trace!("Encoding FetchRequest {:?}", self);
        self.replica.encode(buffer)?;
        self.max_wait_ms.encode(buffer)?;
        self.min_bytes.encode(buffer)?;
        self.topics.encode(buffer)?;
        Ok(())
    }
}

impl<'a> ToByte for TopicPartition<'a> {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        self.topic_name.encode(buffer)?;
        self.partitions.encode(buffer)?;
        Ok(())
    }
}

impl ToByte for Partition {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        self.partition_index.encode(buffer)?;
        self.offset.encode(buffer)?;
        self.max_bytes.encode(buffer)?;
        Ok(())
    }
}
