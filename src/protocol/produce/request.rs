//! Encoding and creation for Produce requests.
//!
//! ### Example
//! ```rust,ignore
//! let mut produce_request = protocol::ProduceRequest::new(ProduceParams::default());
//! produce_request.add("purchases", 0, Some(Bytes::from_static(b"Tester")), Bytes::from_static(b"Value"));
//! let frame = protocol::encode_request_frame(&produce_request, correlation_id, client_id)?;
//! ```
//!
//! ### Protocol Def
//! ```text
//! Produce Request (Version: 0) => acks timeout_ms [topic_data]
//!   acks => INT16
//!   timeout_ms => INT32
//!   topic_data => name [partition_data]
//!     name => STRING
//!     partition_data => index message_set_size message_set
//!       index => INT32
//!       message_set_size => INT32
//!       message_set => MESSAGE SET
//! ```
//!
//! When a compression codec is chosen, the message set of each partition is
//! packed into one wrapper message before it is written.

use bytes::{BufMut, Bytes};

use crate::{
    encode::{encode_as_array, ToByte},
    error::{Error, Result},
    message::{Compression, Message},
    message_set::MessageSet,
    protocol::{ProduceResponse, ProtocolCall},
};

pub const API_KEY_PRODUCE: i16 = 0;
pub const API_VERSION: i16 = 0;

pub const DEFAULT_REQUIRED_ACKS: i16 = 1;
pub const DEFAULT_TIMEOUT_MS: i32 = 1000;

/// Settings shared by every partition of a produce request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProduceParams {
    /// The number of acknowledgments the producer requires the leader to have received before considering a request complete. Allowed values: 0 for no acknowledgments, 1 for only the leader and -1 for the full ISR.
    pub required_acks: i16,
    /// The timeout to await a response in milliseconds.
    pub timeout_ms: i32,
    /// Codec used to wrap each partition's messages.
    pub compression: Compression,
}

impl Default for ProduceParams {
    fn default() -> Self {
        Self::new()
    }
}

impl ProduceParams {
    pub fn new() -> Self {
        Self {
            required_acks: DEFAULT_REQUIRED_ACKS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            compression: Compression::None,
        }
    }

    pub fn required_acks(mut self, required_acks: i16) -> Self {
        self.required_acks = required_acks;
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: i32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }
}

#[derive(Debug)]
pub struct ProduceRequest<'a> {
    pub required_acks: i16,
    pub timeout_ms: i32,
    pub compression: Compression,
    /// Each topic to produce to.
    pub topic_partitions: Vec<TopicPartitionProduceRequest<'a>>,
}

#[derive(Debug)]
pub struct TopicPartitionProduceRequest<'a> {
    /// The topic name.
    pub index: &'a str,
    /// Each partition to produce to.
    pub partitions: Vec<PartitionProduceRequest>,
}

#[derive(Debug)]
pub struct PartitionProduceRequest {
    /// The partition index.
    pub partition: i32,
    /// The record data to be produced.
    pub messages: MessageSet,
}

impl<'a> ProduceRequest<'a> {
    pub fn new(params: ProduceParams) -> ProduceRequest<'a> {
        ProduceRequest {
            required_acks: params.required_acks,
            timeout_ms: params.timeout_ms,
            compression: params.compression,
            topic_partitions: vec![],
        }
    }

    pub fn add(&mut self, topic: &'a str, partition: i32, key: Option<Bytes>, value: Bytes) {
        self.add_message(topic, partition, Message::new(key, value));
    }

    /// Append a message to the set of the given topic and partition.
    pub fn add_message(&mut self, topic: &'a str, partition: i32, message: Message) {
        for tp in &mut self.topic_partitions {
            if tp.index == topic {
                tp.add(partition, message);
                return;
            }
        }
        let mut tp = TopicPartitionProduceRequest::new(topic);
        tp.add(partition, message);
        self.topic_partitions.push(tp);
    }

    pub fn message_count(&self) -> usize {
        self.topic_partitions
            .iter()
            .flat_map(|tp| tp.partitions.iter())
            .map(|pp| pp.messages.len())
            .sum()
    }
}

impl<'a> TopicPartitionProduceRequest<'a> {
    pub fn new(index: &'a str) -> TopicPartitionProduceRequest<'a> {
        TopicPartitionProduceRequest {
            index,
            partitions: vec![],
        }
    }

    pub fn add(&mut self, partition: i32, message: Message) {
        for pp in &mut self.partitions {
            if pp.partition == partition {
                pp.messages.add_message(message);
                return;
            }
        }
        let mut messages = MessageSet::new();
        messages.add_message(message);
        self.partitions.push(PartitionProduceRequest {
            partition,
            messages,
        });
    }
}

impl PartitionProduceRequest {
    /// The message set as it goes on the wire.
    pub fn message_set_bytes(&self, compression: Compression) -> Result<Bytes> {
        match compression {
            Compression::None => self.messages.to_bytes(),
            codec => {
                let wrapper = self.messages.compress(codec)?;
                std::iter::once(wrapper).collect::<MessageSet>().to_bytes()
            }
        }
    }
}

impl<'a> ProtocolCall for ProduceRequest<'a> {
    const API_KEY: i16 = API_KEY_PRODUCE;
    const API_VERSION: i16 = API_VERSION;

    type Response = ProduceResponse;
}

impl<'a> ToByte for ProduceRequest<'a> {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        tracing::trace!("Encoding ProduceRequest {:?}", self);
        self.required_acks.encode(buffer)?;
        self.timeout_ms.encode(buffer)?;
        // render: TopicName [Partition MessageSetSize MessageSet]
        encode_as_array(buffer, &self.topic_partitions, |buffer, tp| {
            tp.index.encode(buffer)?;
            encode_as_array(buffer, &tp.partitions, |buffer, pp| {
                let set = pp.message_set_bytes(self.compression)?;
                let size = i32::try_from(set.len()).map_err(|_| Error::EncodingError)?;
                pp.partition.encode(buffer)?;
                size.encode(buffer)?;
                buffer.put(set);
                Ok(())
            })
        })
    }
}
