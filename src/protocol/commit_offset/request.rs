//! Encoding and creation for Offset Commit requests.
//!
//! Note that when this API is used for a "simple consumer," which is not part of a consumer group, then the generationId must be set to -1 and the memberId must be empty (not null). Additionally, if there is an active consumer group with the same groupId, then the commit will be rejected (typically with an UNKNOWN_MEMBER_ID or ILLEGAL_GENERATION error).
//!
//! ### Example
//! ```rust,ignore
//! let offsets = vec![ConsumerOffset::new("purchases", 0, 300)];
//! let offset_request = protocol::OffsetCommitRequest::from_offsets(group_id, &offsets);
//! let frame = protocol::encode_request_frame(&offset_request, correlation_id, client_id)?;
//! ```
//!
//! ### Protocol Def
//! ```text
//! OffsetCommit Request (Version: 1) => group_id generation_id member_id [topics]
//!   group_id => STRING
//!   generation_id => INT32
//!   member_id => STRING
//!   topics => name [partitions]
//!     name => STRING
//!     partitions => partition_index committed_offset commit_timestamp committed_metadata
//!       partition_index => INT32
//!       committed_offset => INT64
//!       commit_timestamp => INT64
//!       committed_metadata => NULLABLE_STRING
//! ```

use bytes::BufMut;

use crate::{
    encode::ToByte,
    error::Result,
    offset::ConsumerOffset,
    protocol::{OffsetCommitResponse, ProtocolCall},
};

pub const API_KEY_OFFSET_COMMIT: i16 = 8;
pub const API_VERSION: i16 = 1;

/// Generation used by consumers outside of a managed group.
pub const SIMPLE_CONSUMER_GENERATION_ID: i32 = -1;
/// Asks the broker to stamp the commit with its own clock.
pub const BROKER_COMMIT_TIMESTAMP: i64 = -1;

/// The base Offset Commit request object.
#[derive(Debug)]
pub struct OffsetCommitRequest<'a> {
    /// The unique group identifier.
    pub group_id: &'a str,
    /// The generation of the group.
    pub generation_id: i32,
    /// The member ID assigned by the group coordinator.
    pub member_id: &'a str,
    /// The topics to commit offsets for.
    pub topics: Vec<Topic<'a>>,
}

/// The topics to commit offsets for.
#[derive(Debug)]
pub struct Topic<'a> {
    /// The topic name.
    pub name: &'a str,
    /// Each partition to commit offsets for.
    pub partitions: Vec<Partition<'a>>,
}

/// Each partition to commit offsets for.
#[derive(Debug)]
pub struct Partition<'a> {
    /// The partition index.
    pub partition_index: i32,
    /// The message offset to be committed.
    pub committed_offset: i64,
    /// The timestamp of the commit.
    pub commit_timestamp: i64,
    /// Any associated metadata the client wants to keep.
    pub committed_metadata: Option<&'a str>,
}

impl<'a> OffsetCommitRequest<'a> {
    /// Create a new Offset Commit Request
    ///
    /// This request needs to be given commits for a topic and partition
    /// before being sent to the broker. You can do this by using the `add` method.
    pub fn new(group_id: &'a str, generation_id: i32, member_id: &'a str) -> Self {
        Self {
            group_id,
            generation_id,
            member_id,
            topics: vec![],
        }
    }

    /// Commit a set of snapshots as a simple consumer.
    pub fn from_offsets(group_id: &'a str, offsets: &'a [ConsumerOffset]) -> Self {
        let mut request = Self::new(group_id, SIMPLE_CONSUMER_GENERATION_ID, "");
        for offset in offsets {
            request.add_offset(offset);
        }
        request
    }

    pub fn add_offset(&mut self, offset: &'a ConsumerOffset) {
        self.add(
            &offset.topic,
            offset.partition,
            offset.offset,
            offset.metadata.as_deref(),
        );
    }

    /// Stage a commit for a given topic and partition.
    ///
    /// If the same topic and partition is used twice, the offset will be
    /// overwritten.
    pub fn add(
        &mut self,
        topic_name: &'a str,
        partition_index: i32,
        committed_offset: i64,
        committed_metadata: Option<&'a str>,
    ) {
        let partition = Partition {
            partition_index,
            committed_offset,
            commit_timestamp: BROKER_COMMIT_TIMESTAMP,
            committed_metadata,
        };
        match self
            .topics
            .iter_mut()
            .find(|topic| topic.name == topic_name)
        {
            None => self.topics.push(Topic {
                name: topic_name,
                partitions: vec![partition],
            }),
            Some(topic) => {
                match topic
                    .partitions
                    .iter_mut()
                    .find(|staged| staged.partition_index == partition_index)
                {
                    None => topic.partitions.push(partition),
                    Some(staged) => {
                        tracing::warn!(
                            "Overwriting commit offset for {} {}",
                            topic_name,
                            partition_index
                        );
                        *staged = partition;
                    }
                }
            }
        }
    }
}

impl<'a> ProtocolCall for OffsetCommitRequest<'a> {
    const API_KEY: i16 = API_KEY_OFFSET_COMMIT;
    const API_VERSION: i16 = API_VERSION;

    type Response = OffsetCommitResponse;
}

impl<'a> ToByte for OffsetCommitRequest<'a> {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        tracing::trace!("Encoding OffsetCommitRequest {:?}", self);
        self.group_id.encode(buffer)?;
        self.generation_id.encode(buffer)?;
        self.member_id.encode(buffer)?;
        self.topics.encode(buffer)?;
        Ok(())
    }
}

impl<'a> ToByte for Topic<'a> {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        self.name.encode(buffer)?;
        self.partitions.encode(buffer)?;
        Ok(())
    }
}

impl<'a> ToByte for Partition<'a> {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        self.partition_index.encode(buffer)?;
        self.committed_offset.encode(buffer)?;
        self.commit_timestamp.encode(buffer)?;
        self.committed_metadata.encode(buffer)?;
        Ok(())
    }
}
