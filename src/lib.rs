//! # Logwire
//! Rust-native codec for the Kafka v0 message format and the request
//! framing around it.
//!
//! This crate turns messages, message sets and protocol requests into the
//! exact bytes a broker expects, and turns broker replies back into typed
//! values. It does no I/O of its own: frames are handed to whatever transport
//! the caller already has.
//!
//! ## Goals
//! - Easy to understand code
//! - Leverage Nom for parsing and Bytes for zero-copy buffers
//! - Exact, checksum-verified wire bytes
//!
//! ## Table of contents
//! - [Getting started](#getting-started)
//!     - [Messages](#messages)
//!     - [Requests](#requests)
//! - [Resources](#resources)
//!
//! ## Getting started
//! Include the following snippet in your `Cargo.toml` dependencies:
//! ```toml
//! logwire = "0.1"
//! ```
//!
//! ### Messages
//! A [`MessageSet`](prelude::MessageSet) holds messages keyed by offset. Encoding
//! frames each message with its offset, size and crc.
//! ```rust
//! use logwire::prelude::*;
//!
//! let mut set = MessageSet::new();
//! set.add_message(Message::new(Some(bytes::Bytes::from_static(b"Tester")), bytes::Bytes::from_static(b"Value")));
//!
//! let encoded = set.to_bytes()?;
//! assert_eq!(MessageSet::decode(encoded)?, set);
//! # Ok::<(), Error>(())
//! ```
//!
//! Decoding stops quietly at a partially received trailing message, and fails
//! on a checksum mismatch unless told otherwise through
//! [`DecodeOptions`](prelude::DecodeOptions).
//!
//! ### Requests
//! Every request implements [`ProtocolCall`](prelude::ProtocolCall), which ties it
//! to its API key, version and response type.
//! ```rust
//! use logwire::prelude::*;
//!
//! let partitions = vec![TopicPartition::new("purchases", 0)];
//! let request = protocol::OffsetFetchRequest::new("my-group", &partitions);
//! let frame = encode_request_frame(&request, 1, "logwire")?;
//! // send `frame`, read the size-prefixed reply, then:
//! // let (header, response) = decode_response_frame(&request, reply)?;
//! # Ok::<(), Error>(())
//! ```
//!
//! ## Resources
//! - [Kafka Protocol Spec](https://kafka.apache.org/protocol.html)
//! - [Confluence Docs](https://cwiki.apache.org/confluence/display/KAFKA/A+Guide+To+The+Kafka+Protocol)

mod encode;
mod error;
mod message;
mod message_set;
mod offset;
mod parser;
mod protocol;
mod utils;

pub mod prelude {
    //! Main export of various structures and methods
    //!
    //! The message format lives at the top level of the prelude:
    //! [`Message`], [`MessageSet`] and their [`Attributes`]. Request and
    //! response pairs for each API are in the [protocol module].
    //!
    //! [protocol module]: protocol

    pub use crate::error::{check_error_codes, Error, KafkaCode, Result};
    pub use crate::message::{Attributes, Compression, Message, MESSAGE_MAGIC_BYTE};
    pub use crate::message_set::{CorruptionPolicy, DecodeOptions, MessageSet};
    pub use crate::offset::{ConsumerOffset, TopicPartition};
    pub use crate::protocol::{
        decode_response_frame, encode_request_frame, fetch::request::FetchParams,
        produce::request::ProduceParams, HeaderRequest, HeaderResponse, ProtocolCall,
    };

    pub mod encode {
        //! Lower level encoding helpers.
        pub use crate::encode::{ToByte, Writer};
    }

    pub mod protocol {
        //! Bytecode protocol requests & responses.
        pub use crate::protocol::*;
    }

    pub use bytes;
}
