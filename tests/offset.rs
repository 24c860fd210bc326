mod testsupport;

use bytes::Bytes;
use logwire::prelude::{
    decode_response_frame, encode::Writer, encode_request_frame, protocol, ConsumerOffset, Error,
    ProtocolCall, TopicPartition,
};

const CLIENT_ID: &str = "offset protocol integration test";
const GROUP_ID: &str = "Big Dogs";

fn offset_fetch_reply(correlation_id: i32, partitions: &[(i32, i64, i16)]) -> Bytes {
    let mut writer = Writer::new();
    writer
        .write(&correlation_id)
        .unwrap()
        .write(&1i32)
        .unwrap()
        .write("purchases")
        .unwrap()
        .write(&(partitions.len() as i32))
        .unwrap();
    for (partition, offset, error_code) in partitions {
        writer
            .write(partition)
            .unwrap()
            .write(offset)
            .unwrap()
            .write(&Some("checkpoint"))
            .unwrap()
            .write(error_code)
            .unwrap();
    }
    writer.take_bytes()
}

#[test]
fn it_can_fetch_and_commit_offsets() -> Result<(), Box<Error>> {
    testsupport::init_tracing();

    let partitions = vec![
        TopicPartition::new("purchases", 0),
        TopicPartition::new("purchases", 1),
    ];
    let fetch_request = protocol::OffsetFetchRequest::new(GROUP_ID, &partitions);
    let frame = encode_request_frame(&fetch_request, 3, CLIENT_ID)?;
    assert_eq!(&frame[4..6], protocol::OffsetFetchRequest::API_KEY.to_be_bytes());

    let (header, fetched) = decode_response_frame(
        &fetch_request,
        offset_fetch_reply(3, &[(0, 10, 0), (1, -1, 0)]),
    )?;
    assert_eq!(header.correlation_id, 3);

    let committed = fetched.offset_for(&partitions[0]).unwrap();
    assert_eq!(committed.offset, 10);
    assert_eq!(committed.metadata.as_deref(), Some("checkpoint"));
    // nothing committed yet
    assert_eq!(fetched.offset_for(&partitions[1]).unwrap().offset, -1);

    let next: Vec<ConsumerOffset> = fetched
        .offsets
        .iter()
        .map(|offset| offset.with_offset(offset.offset + 5, None))
        .collect();
    let commit_request = protocol::OffsetCommitRequest::from_offsets(GROUP_ID, &next);
    let frame = encode_request_frame(&commit_request, 4, CLIENT_ID)?;
    assert_eq!(&frame[4..6], protocol::OffsetCommitRequest::API_KEY.to_be_bytes());
    assert!(frame.ends_with(&commit_request.encode_body()?));
    assert_eq!(commit_request.topics.len(), 1);
    assert_eq!(commit_request.topics[0].partitions[0].committed_offset, 15);
    assert_eq!(commit_request.topics[0].partitions[1].committed_offset, 4);

    let reply = b"\0\0\0\x04\0\0\0\x01\0\x09purchases\0\0\0\x02\0\0\0\0\0\0\0\0\0\x01\0\0";
    let (_, commit_response) = decode_response_frame(&commit_request, Bytes::from_static(reply))?;
    assert_eq!(commit_response.committed()?, partitions);
    Ok(())
}

#[test]
fn it_fails_on_the_first_partition_error() {
    testsupport::init_tracing();

    let requested: Vec<TopicPartition> = (0..3)
        .map(|partition| TopicPartition::new("purchases", partition))
        .collect();
    let request = protocol::OffsetFetchRequest::new(GROUP_ID, &requested);

    for codes in [[0, 0, 5], [0, 5, 0], [5, 0, 0]] {
        let partitions: Vec<(i32, i64, i16)> = codes
            .iter()
            .enumerate()
            .map(|(i, code)| (i as i32, 0, *code))
            .collect();
        let reply = offset_fetch_reply(1, &partitions);
        let result = decode_response_frame(&request, reply);
        assert!(matches!(result, Err(Error::ProtocolError(5))));
    }
}
