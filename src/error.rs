//! Errors raised while encoding and decoding the wire protocol.
//!
//! Broker failures arrive as numeric codes inside otherwise well formed
//! responses. Those are surfaced through [`Error::ProtocolError`] and can be
//! rendered with the [`KafkaCode`] registry.
use std::fmt;

use bytes::Bytes;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The bytes do not follow the wire format, e.g. a negative length prefix.
    MalformedProtocolData(Bytes),
    /// The low two bits of a message attribute byte name no known codec.
    UnsupportedCompressionCodec(i8),
    /// The checksum stored in a message frame does not match its body.
    ChecksumMismatch {
        offset: i64,
        expected: i32,
        actual: i32,
    },
    /// Input ended in the middle of a field.
    Underflow,
    /// The broker reported a non zero error code. Only the first one is kept.
    ProtocolError(i16),
    /// A length does not fit in its prefix.
    EncodingError,
    DecodingUtf8Error,
    /// The compression codec failed to pack or unpack a message set.
    CompressionError(String),
}

impl Error {
    /// Whether the failure comes from bytes that break the wire format.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Error::MalformedProtocolData(_) | Error::UnsupportedCompressionCodec(_)
        )
    }

    /// The broker code behind a [`Error::ProtocolError`].
    pub fn kafka_code(&self) -> Option<KafkaCode> {
        match self {
            Error::ProtocolError(code) => Some(KafkaCode::from_code(*code)),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MalformedProtocolData(bytes) => {
                write!(f, "malformed protocol data ({} bytes)", bytes.len())
            }
            Error::UnsupportedCompressionCodec(codec) => {
                write!(f, "unsupported compression codec {}", codec)
            }
            Error::ChecksumMismatch {
                offset,
                expected,
                actual,
            } => write!(
                f,
                "checksum mismatch at offset {}: expected {}, computed {}",
                offset, expected, actual
            ),
            Error::Underflow => write!(f, "buffer underflow"),
            Error::ProtocolError(code) => write!(
                f,
                "broker returned error code {} ({:?})",
                code,
                KafkaCode::from_code(*code)
            ),
            Error::EncodingError => write!(f, "value too large for its length prefix"),
            Error::DecodingUtf8Error => write!(f, "string is not valid utf-8"),
            Error::CompressionError(reason) => write!(f, "compression failed: {}", reason),
        }
    }
}

impl std::error::Error for Error {}

/// Error codes returned by the broker.
///
/// See the [error code table](https://kafka.apache.org/protocol.html#protocol_error_codes).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, FromPrimitive)]
pub enum KafkaCode {
    /// Any code this registry does not know, including the broker's own
    /// "unknown server error" (-1).
    Unknown = -1,
    None = 0,
    OffsetOutOfRange = 1,
    CorruptMessage = 2,
    UnknownTopicOrPartition = 3,
    InvalidMessageSize = 4,
    LeaderNotAvailable = 5,
    NotLeaderForPartition = 6,
    RequestTimedOut = 7,
    BrokerNotAvailable = 8,
    ReplicaNotAvailable = 9,
    MessageSizeTooLarge = 10,
    StaleControllerEpoch = 11,
    OffsetMetadataTooLarge = 12,
    NetworkException = 13,
    GroupLoadInProgress = 14,
    GroupCoordinatorNotAvailable = 15,
    NotCoordinatorForGroup = 16,
    InvalidTopic = 17,
    RecordListTooLarge = 18,
    NotEnoughReplicas = 19,
    NotEnoughReplicasAfterAppend = 20,
    InvalidRequiredAcks = 21,
    IllegalGeneration = 22,
    InconsistentGroupProtocol = 23,
    InvalidGroupId = 24,
    UnknownMemberId = 25,
    InvalidSessionTimeout = 26,
    RebalanceInProgress = 27,
    InvalidCommitOffsetSize = 28,
    TopicAuthorizationFailed = 29,
    GroupAuthorizationFailed = 30,
    ClusterAuthorizationFailed = 31,
    InvalidTimestamp = 32,
    UnsupportedSaslMechanism = 33,
    IllegalSaslState = 34,
    UnsupportedVersion = 35,
    TopicAlreadyExists = 36,
    InvalidPartitions = 37,
    InvalidReplicationFactor = 38,
    InvalidReplicaAssignment = 39,
    InvalidConfig = 40,
    NotController = 41,
    InvalidRequest = 42,
    UnsupportedForMessageFormat = 43,
    PolicyViolation = 44,
}

impl KafkaCode {
    /// Look up a code, falling back to [`KafkaCode::Unknown`].
    pub fn from_code(code: i16) -> KafkaCode {
        FromPrimitive::from_i16(code).unwrap_or(KafkaCode::Unknown)
    }

    /// Whether the broker considers the condition transient.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            KafkaCode::CorruptMessage
                | KafkaCode::UnknownTopicOrPartition
                | KafkaCode::LeaderNotAvailable
                | KafkaCode::NotLeaderForPartition
                | KafkaCode::RequestTimedOut
                | KafkaCode::NetworkException
                | KafkaCode::GroupLoadInProgress
                | KafkaCode::GroupCoordinatorNotAvailable
                | KafkaCode::NotCoordinatorForGroup
                | KafkaCode::NotEnoughReplicas
                | KafkaCode::NotEnoughReplicasAfterAppend
                | KafkaCode::NotController
        )
    }
}

/// Fail on the first non zero code, in the order the codes are yielded.
pub fn check_error_codes<I>(codes: I) -> Result<()>
where
    I: IntoIterator<Item = i16>,
{
    match codes.into_iter().find(|code| *code != 0) {
        Some(code) => {
            tracing::error!(
                "ERROR: Kafka Error {} ({:?})",
                code,
                KafkaCode::from_code(code)
            );
            Err(Error::ProtocolError(code))
        }
        None => Ok(()),
    }
}
