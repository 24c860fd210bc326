use bytes::{Bytes, BytesMut};
use criterion::*;
use logwire::prelude::{encode::ToByte, protocol, Compression, ProduceParams};

fn produce_request(compression: Compression) -> protocol::ProduceRequest<'static> {
    let topic_name = "purchases";
    let partition_id = 3;

    let mut produce_req = protocol::ProduceRequest::new(ProduceParams::new().compression(compression));
    for i in 0..64 {
        produce_req.add(
            topic_name,
            partition_id + i % 2,
            Some(Bytes::from_static(b"Tester")),
            Bytes::from(format!("Value {}", i)),
        );
    }
    produce_req
}

fn criterion_benchmark(c: &mut Criterion) {
    let mut encoder_group = c.benchmark_group("encoder");

    for compression in [Compression::None, Compression::Gzip, Compression::Snappy] {
        let produce_req = produce_request(compression);
        let mut buffer = Vec::with_capacity(4);
        produce_req.encode(&mut buffer).unwrap();

        encoder_group.throughput(Throughput::Bytes(buffer.len() as u64));
        encoder_group.bench_with_input(
            BenchmarkId::new(format!("produce/{:?}", compression), buffer.len()),
            &produce_req,
            |b, data| {
                let mut buff = BytesMut::with_capacity(buffer.len());
                b.iter(|| {
                    buff.clear();
                    data.encode(&mut buff).unwrap()
                });
            },
        );
    }

    encoder_group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
