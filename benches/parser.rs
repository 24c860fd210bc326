use bytes::Bytes;
use criterion::*;
use logwire::prelude::{encode::Writer, protocol, Message, MessageSet};

fn message_set(count: usize) -> Bytes {
    (0..count)
        .map(|i| {
            Message::new(
                Some(Bytes::from_static(b"TSLA")),
                Bytes::from(format!(
                    "{{\"symbol\": \"TSLA\", \"sequence\": {}, \"close\": 227.17}}",
                    i
                )),
            )
        })
        .collect::<MessageSet>()
        .to_bytes()
        .unwrap()
}

fn fetch_response(set: &Bytes) -> Bytes {
    let mut writer = Writer::new();
    writer
        .write(&1i32)
        .unwrap()
        .write("price-updates")
        .unwrap()
        .write(&1i32)
        .unwrap()
        .write(&0i32)
        .unwrap()
        .write(&0i16)
        .unwrap()
        .write(&14i64)
        .unwrap()
        .write(&(set.len() as i32))
        .unwrap()
        .write_raw(set);
    writer.take_bytes()
}

fn criterion_benchmark(c: &mut Criterion) {
    let mut parser_group = c.benchmark_group("parser");

    let set = message_set(500);
    parser_group.throughput(Throughput::Bytes(set.len() as u64));
    parser_group.bench_with_input(
        BenchmarkId::new("message_set", set.len()),
        &set,
        |b, data| b.iter(|| MessageSet::decode(data.clone()).unwrap()),
    );

    // the broker cuts the last message short at its byte limit
    let partial = set.slice(..set.len() - 7);
    parser_group.bench_with_input(
        BenchmarkId::new("message_set_partial", partial.len()),
        &partial,
        |b, data| b.iter(|| MessageSet::decode(data.clone()).unwrap()),
    );

    let res = fetch_response(&set);
    parser_group.throughput(Throughput::Bytes(res.len() as u64));
    parser_group.bench_with_input(BenchmarkId::new("fetch", res.len()), &res, |b, data| {
        b.iter(|| protocol::FetchResponse::try_from(data.clone()).unwrap())
    });

    parser_group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
