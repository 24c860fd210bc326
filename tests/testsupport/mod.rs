use bytes::Bytes;
use logwire::prelude::{encode::Writer, Message, MessageSet};

/// Route `tracing` output through the test harness so it only shows for
/// failing tests. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

/// A set of unkeyed messages at offsets `0..values.len()`.
#[allow(dead_code)]
pub fn message_set(values: &[&'static str]) -> MessageSet {
    values
        .iter()
        .map(|value| Message::new(None, Bytes::from_static(value.as_bytes())))
        .collect()
}

/// A Fetch v0 response body with one topic and one partition.
#[allow(dead_code)]
pub fn fetch_response(topic: &str, partition: i32, error_code: i16, set: &[u8]) -> Bytes {
    let mut writer = Writer::new();
    writer
        .write(&1i32)
        .unwrap()
        .write(topic)
        .unwrap()
        .write(&1i32)
        .unwrap()
        .write(&partition)
        .unwrap()
        .write(&error_code)
        .unwrap()
        .write(&0i64)
        .unwrap()
        .write(&(set.len() as i32))
        .unwrap()
        .write_raw(set);
    writer.take_bytes()
}
