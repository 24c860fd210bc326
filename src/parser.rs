//! Deserialize data from the bytecode protocol.
//!
//! All readers are nom *streaming* parsers. Running out of input surfaces as
//! [`nom::Err::Incomplete`], which callers can tell apart from a malformed
//! field (`nom::Err::Error`). Message set decoding relies on this to stop at a
//! partially transmitted trailing frame.
use bytes::Bytes;
use nom::{
    bytes::streaming::take,
    error::{ErrorKind, ParseError},
    multi::many_m_n,
    number::streaming::{be_i16, be_i32},
    IResult,
};
use nombytes::NomBytes;

use crate::error::{Error, Result};

fn invalid_length<O>(s: NomBytes) -> IResult<NomBytes, O> {
    Err(nom::Err::Error(nom::error::Error::from_error_kind(
        s,
        ErrorKind::LengthValue,
    )))
}

pub fn parse_string(s: NomBytes) -> IResult<NomBytes, Bytes> {
    let (s, length) = be_i16(s)?;
    if length < 0 {
        return invalid_length(s);
    }
    let (s, string) = take(length as usize)(s)?;
    Ok((s, string.into_bytes()))
}

pub fn parse_nullable_string(s: NomBytes) -> IResult<NomBytes, Option<Bytes>> {
    let (s, length) = be_i16(s)?;
    match length {
        -1 => Ok((s, None)),
        l if l < -1 => invalid_length(s),
        l => {
            let (s, string) = take(l as usize)(s)?;
            Ok((s, Some(string.into_bytes())))
        }
    }
}

pub fn parse_bytes(s: NomBytes) -> IResult<NomBytes, Bytes> {
    let (s, length) = be_i32(s)?;
    if length < 0 {
        return invalid_length(s);
    }
    let (s, bytes) = take(length as usize)(s)?;
    Ok((s, bytes.into_bytes()))
}

pub fn parse_nullable_bytes(s: NomBytes) -> IResult<NomBytes, Option<Bytes>> {
    let (s, length) = be_i32(s)?;
    match length {
        -1 => Ok((s, None)),
        l if l < -1 => invalid_length(s),
        l => {
            let (s, bytes) = take(l as usize)(s)?;
            Ok((s, Some(bytes.into_bytes())))
        }
    }
}

pub fn parse_array<O, E, F>(f: F) -> impl FnMut(NomBytes) -> IResult<NomBytes, Vec<O>, E>
where
    F: nom::Parser<NomBytes, O, E> + Copy,
    E: ParseError<NomBytes>,
{
    move |input: NomBytes| {
        let i = input.clone();
        let (i, length) = be_i32(i)?;
        if length == -1 {
            return Ok((i, vec![]));
        }
        if length < 0 {
            return Err(nom::Err::Error(E::from_error_kind(i, ErrorKind::LengthValue)));
        }
        many_m_n(length as usize, length as usize, f)(i)
    }
}

/// Translate a parser failure into a crate error.
///
/// Incomplete input becomes [`Error::Underflow`]; anything else is malformed
/// data and carries the buffer that failed to parse.
pub fn into_error(err: nom::Err<nom::error::Error<NomBytes>>, input: &Bytes) -> Error {
    match err {
        nom::Err::Incomplete(_) => Error::Underflow,
        nom::Err::Error(_) | nom::Err::Failure(_) => Error::MalformedProtocolData(input.clone()),
    }
}

pub fn into_string(bytes: Bytes) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|_| Error::DecodingUtf8Error)
}
