//! Fetch messages from a broker.

pub mod request;
pub mod response;
