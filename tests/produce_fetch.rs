mod testsupport;

use bytes::Bytes;
use logwire::prelude::{
    decode_response_frame, encode::Writer, encode_request_frame, protocol, Compression,
    CorruptionPolicy, DecodeOptions, Error, FetchParams, KafkaCode, MessageSet, ProduceParams,
    ProtocolCall, TopicPartition,
};

const CLIENT_ID: &str = "produce & fetch protocol integration test";
const CORRELATION_ID: i32 = 1;
const PARTITION_ID: i32 = 0;
const TOPIC: &str = "purchases";

fn with_correlation_id(correlation_id: i32, body: &[u8]) -> Bytes {
    let mut writer = Writer::new();
    writer.write(&correlation_id).unwrap().write_raw(body);
    writer.take_bytes()
}

#[test]
fn it_frames_a_produce_request() -> Result<(), Box<Error>> {
    testsupport::init_tracing();

    let key = Bytes::from("testing testing...");
    let value = Bytes::from("123!");

    let mut produce_request = protocol::ProduceRequest::new(ProduceParams::default());
    produce_request.add(TOPIC, PARTITION_ID, Some(key.clone()), value.clone());

    let frame = encode_request_frame(&produce_request, CORRELATION_ID, CLIENT_ID)?;
    let size = i32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]);
    assert_eq!(size as usize, frame.len() - 4);
    assert_eq!(&frame[4..6], protocol::ProduceRequest::API_KEY.to_be_bytes());
    assert_eq!(&frame[6..8], protocol::ProduceRequest::API_VERSION.to_be_bytes());
    assert_eq!(&frame[8..12], CORRELATION_ID.to_be_bytes());
    assert!(frame.ends_with(&produce_request.encode_body()?));

    // the message set is the tail of the body
    let set = produce_request.topic_partitions[0].partitions[0]
        .message_set_bytes(Compression::None)?;
    assert!(frame.ends_with(&set));
    let decoded = MessageSet::decode(set)?;
    assert_eq!(decoded.get(0).unwrap().key, Some(key));
    assert_eq!(decoded.get(0).unwrap().value, Some(value));
    Ok(())
}

#[test]
fn it_reads_produce_acknowledgements() -> Result<(), Box<Error>> {
    testsupport::init_tracing();

    let mut produce_request = protocol::ProduceRequest::new(ProduceParams::default());
    produce_request.add(TOPIC, PARTITION_ID, None, Bytes::from("123!"));

    let body = b"\0\0\0\x01\0\x09purchases\0\0\0\x01\0\0\0\0\0\0\0\0\0\0\0\0\0\x04";
    let (header, response) =
        decode_response_frame(&produce_request, with_correlation_id(9, body))?;

    assert_eq!(header.correlation_id, 9);
    assert_eq!(
        response.base_offsets()?,
        vec![(TopicPartition::new(TOPIC, PARTITION_ID), 4)]
    );
    Ok(())
}

#[test]
fn it_fetches_what_was_produced() -> Result<(), Box<Error>> {
    testsupport::init_tracing();

    let params = ProduceParams::new().compression(Compression::Snappy);
    let mut produce_request = protocol::ProduceRequest::new(params);
    for value in ["one", "two", "three"] {
        produce_request.add(TOPIC, PARTITION_ID, None, Bytes::from(value));
    }
    let set = produce_request.topic_partitions[0].partitions[0]
        .message_set_bytes(params.compression)?;

    let mut fetch_request = protocol::FetchRequest::new(FetchParams::default());
    fetch_request.add(TOPIC, PARTITION_ID, 0);

    let body = testsupport::fetch_response(TOPIC, PARTITION_ID, 0, &set);
    let (_, fetch_response) = decode_response_frame(&fetch_request, with_correlation_id(2, &body))?;

    let partition = fetch_response
        .partition(&TopicPartition::new(TOPIC, PARTITION_ID))
        .unwrap();
    assert_eq!(partition.messages.len(), 1);
    assert_eq!(
        partition.unpacked()?,
        testsupport::message_set(&["one", "two", "three"])
    );
    Ok(())
}

#[test]
fn it_applies_fetch_decode_options() -> Result<(), Box<Error>> {
    testsupport::init_tracing();

    let mut set = testsupport::message_set(&["good", "bad"]).to_bytes()?.to_vec();
    let last = set.len() - 1;
    set[last] = b'!';
    let body = testsupport::fetch_response(TOPIC, PARTITION_ID, 0, &set);

    let reply = with_correlation_id(5, &body);

    let mut strict = protocol::FetchRequest::new(FetchParams::default());
    strict.add(TOPIC, PARTITION_ID, 0);
    assert!(matches!(
        decode_response_frame(&strict, reply.clone()),
        Err(Error::ChecksumMismatch { offset: 1, .. })
    ));

    let params =
        FetchParams::new().decode(DecodeOptions::new().corruption(CorruptionPolicy::Stop));
    let mut fetch_request = protocol::FetchRequest::new(params);
    fetch_request.add(TOPIC, PARTITION_ID, 0);
    let (header, fetch_response) = decode_response_frame(&fetch_request, reply)?;
    assert_eq!(header.correlation_id, 5);
    assert_eq!(
        fetch_response.topics[0].partitions[0].messages,
        testsupport::message_set(&["good"])
    );
    Ok(())
}

#[test]
fn it_surfaces_broker_errors() {
    testsupport::init_tracing();

    let body = testsupport::fetch_response(TOPIC, PARTITION_ID, 3, &[]);
    let err = protocol::FetchResponse::try_from(body).unwrap_err();
    assert_eq!(err, Error::ProtocolError(3));
    assert_eq!(err.kafka_code(), Some(KafkaCode::UnknownTopicOrPartition));
}
