//! Bytecode protocol requests & responses.
//!
//! This module implements the request/response pairs outlined in the
//! [Kafka Documentation](https://kafka.apache.org/protocol.html)
//!
//! The module is set up as a list of message pairs containing two files
//! each corresponding to the request and response.
//!
//! The request files hold the logic for creating and encoding structs that
//! will be sent to the broker. The response files hold the logic for parsing
//! and processing the messages coming from the broker.
//!
//! Each request type implements [`ProtocolCall`], which fixes its API key,
//! version and response type at compile time. Whoever sent a request already
//! knows which decoder applies to the reply; nothing ever inspects the API key
//! of incoming bytes.

pub mod commit_offset;
pub mod fetch;
pub mod offset_fetch;
pub mod produce;

use bytes::{BufMut, Bytes};
use nom::{number::streaming::be_i32, IResult};
use nombytes::NomBytes;

// re exporting these for ease
pub use self::{
    commit_offset::{request::OffsetCommitRequest, response::OffsetCommitResponse},
    fetch::{request::FetchRequest, response::FetchResponse},
    offset_fetch::{request::OffsetFetchRequest, response::OffsetFetchResponse},
    produce::{request::ProduceRequest, response::ProduceResponse},
};
use crate::{
    encode::{ToByte, Writer},
    error::{Error, Result},
    parser,
};

/// Binds a request type to its API key, version, encoder and decoder.
///
/// The encoder is the request's [`ToByte`] impl and renders only the RPC
/// body. The common header is added by [`encode_request_frame`].
pub trait ProtocolCall: ToByte {
    const API_KEY: i16;
    const API_VERSION: i16;

    type Response: TryFrom<Bytes, Error = Error>;

    /// Render the request body.
    fn encode_body(&self) -> Result<Bytes> {
        let mut writer = Writer::new();
        writer.write(self)?;
        Ok(writer.take_bytes())
    }

    /// Decode a response body for this request.
    ///
    /// Requests that carry decode settings override this to apply them.
    fn decode_response(&self, bytes: Bytes) -> Result<Self::Response> {
        Self::Response::try_from(bytes)
    }
}

#[derive(Debug, Clone)]
pub struct HeaderRequest<'a> {
    /// The API key of this request.
    pub api_key: i16,
    /// The API version of this request.
    pub api_version: i16,
    /// The correlation ID of this request.
    pub correlation_id: i32,
    /// The client ID string.
    pub client_id: &'a str,
}

impl<'a> HeaderRequest<'a> {
    /// Create new header request.
    ///
    /// This goes at the beginning of every single request.
    pub fn new(
        api_key: i16,
        api_version: i16,
        correlation_id: i32,
        client_id: &'a str,
    ) -> HeaderRequest<'a> {
        HeaderRequest {
            api_key,
            api_version,
            correlation_id,
            client_id,
        }
    }

    pub fn for_call<C: ProtocolCall>(correlation_id: i32, client_id: &'a str) -> HeaderRequest<'a> {
        Self::new(C::API_KEY, C::API_VERSION, correlation_id, client_id)
    }
}

impl<'a> ToByte for HeaderRequest<'a> {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        self.api_key.encode(buffer)?;
        self.api_version.encode(buffer)?;
        self.correlation_id.encode(buffer)?;
        self.client_id.encode(buffer)?;
        Ok(())
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct HeaderResponse {
    /// The correlation ID of this response.
    pub correlation_id: i32,
}

pub fn parse_header_response(s: NomBytes) -> IResult<NomBytes, HeaderResponse> {
    let (s, correlation_id) = be_i32(s)?;
    Ok((s, HeaderResponse { correlation_id }))
}

/// Render a size delimited request: `[size][header][body]`.
pub fn encode_request_frame<C: ProtocolCall>(
    call: &C,
    correlation_id: i32,
    client_id: &str,
) -> Result<Bytes> {
    let header = HeaderRequest::for_call::<C>(correlation_id, client_id);
    tracing::trace!("Encoding request frame {:?}", header);

    let mut body = Writer::new();
    body.write(&header)?.write(call)?;
    let body = body.take_bytes();
    let size = i32::try_from(body.len()).map_err(|_| Error::EncodingError)?;

    let mut frame = Writer::with_capacity(body.len() + 4);
    frame.write(&size)?.write_raw(&body);
    Ok(frame.take_bytes())
}

/// Split the reply to `call` (with its size prefix already removed) into the
/// header and the decoded body.
pub fn decode_response_frame<C: ProtocolCall>(
    call: &C,
    bytes: Bytes,
) -> Result<(HeaderResponse, C::Response)> {
    let (rest, header) = parse_header_response(NomBytes::new(bytes.clone())).map_err(|err| {
        tracing::error!("ERROR: Failed parsing response header {:?}", err);
        parser::into_error(err, &bytes)
    })?;
    let response = call.decode_response(rest.into_bytes())?;
    Ok((header, response))
}
