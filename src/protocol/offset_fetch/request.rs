//! Encoding and creation for Offset Fetch requests.
//!
//! ### Example
//! ```rust,ignore
//! let partitions = vec![TopicPartition::new("purchases", 0), TopicPartition::new("purchases", 1)];
//! let offset_request = protocol::OffsetFetchRequest::new("Big Dogs", &partitions);
//! let frame = protocol::encode_request_frame(&offset_request, correlation_id, client_id)?;
//! ```
//!
//! ### Protocol Def
//! ```text
//! OffsetFetch Request (Version: 1) => group_id [topics]
//!   group_id => STRING
//!   topics => name [partition_indexes]
//!     name => STRING
//!     partition_indexes => INT32
//! ```

use bytes::BufMut;

use crate::{
    encode::ToByte,
    error::Result,
    offset::TopicPartition,
    protocol::{OffsetFetchResponse, ProtocolCall},
};

pub const API_KEY_OFFSET_FETCH: i16 = 9;
pub const API_VERSION: i16 = 1;

/// The base Offset Fetch request object.
///
/// The wire format nests partitions under their topic, so the flat list of
/// topic partitions is grouped by topic. Topics keep the order they were
/// first seen in and partitions keep their order within a topic.
#[derive(Debug)]
pub struct OffsetFetchRequest<'a> {
    /// The group to fetch offsets for.
    pub group_id: &'a str,
    /// Each topic we would like to fetch offsets for.
    pub topics: Vec<Topic<'a>>,
}

/// Each topic we would like to fetch offsets for.
#[derive(Debug)]
pub struct Topic<'a> {
    /// The topic name.
    pub name: &'a str,
    /// The partition indexes we would like to fetch offsets for.
    pub partition_indexes: Vec<i32>,
}

impl<'a> OffsetFetchRequest<'a> {
    pub fn new(group_id: &'a str, partitions: &'a [TopicPartition]) -> Self {
        let mut request = Self {
            group_id,
            topics: vec![],
        };
        for tp in partitions {
            request.add(&tp.topic, tp.partition);
        }
        request
    }

    pub fn add(&mut self, topic_name: &'a str, partition_index: i32) {
        match self
            .topics
            .iter_mut()
            .find(|topic| topic.name == topic_name)
        {
            None => self.topics.push(Topic {
                name: topic_name,
                partition_indexes: vec![partition_index],
            }),
            Some(topic) => topic.partition_indexes.push(partition_index),
        }
    }
}

impl<'a> ProtocolCall for OffsetFetchRequest<'a> {
    const API_KEY: i16 = API_KEY_OFFSET_FETCH;
    const API_VERSION: i16 = API_VERSION;

    type Response = OffsetFetchResponse;
}

impl<'a> ToByte for OffsetFetchRequest<'a> {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        tracing::trace!("Encoding OffsetFetchRequest {:?}", self);
        self.group_id.encode(buffer)?;
        self.topics.encode(buffer)?;
        Ok(())
    }
}

impl<'a> ToByte for Topic<'a> {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        self.name.encode(buffer)?;
        self.partition_indexes.encode(buffer)?;
        Ok(())
    }
}
