//! Decoder benchmarks: zero-copy stream parsing against a naive baseline
//! that copies every field out through `memcpy`-style reads.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use itch_replay::wire::AddOrder;
use itch_replay::{Decoder, MessageVisitor};

fn add_order_message() -> Vec<u8> {
    let mut buf = vec![0u8; 36];
    buf[0] = b'A';
    buf[1..3].copy_from_slice(&1234u16.to_be_bytes());
    buf[3..5].copy_from_slice(&5678u16.to_be_bytes());
    let ts: u64 = 45_296_789_012_345;
    for i in 0..6 {
        buf[5 + i] = (ts >> (40 - i * 8)) as u8;
    }
    buf[11..19].copy_from_slice(&0x1234_5678_9ABC_DEF0u64.to_be_bytes());
    buf[19] = b'B';
    buf[20..24].copy_from_slice(&1000u32.to_be_bytes());
    buf[24..32].copy_from_slice(b"AAPL    ");
    buf[32..36].copy_from_slice(&1_502_500u32.to_be_bytes());
    buf
}

fn message_stream(count: usize) -> Vec<u8> {
    let msg = add_order_message();
    let mut buf = Vec::with_capacity(count * msg.len());
    for _ in 0..count {
        buf.extend_from_slice(&msg);
    }
    buf
}

#[derive(Default)]
struct Counting {
    count: u64,
    total_shares: u64,
}

impl MessageVisitor for Counting {
    fn on_add_order(&mut self, msg: &AddOrder) {
        self.count += 1;
        self.total_shares += msg.shares() as u64;
    }
}

/// What a straightforward implementation does: copy every field into an
/// owned struct, swapping as it goes.
#[allow(dead_code)]
struct NaiveAddOrder {
    stock_locate: u16,
    tracking_number: u16,
    timestamp: u64,
    order_ref: u64,
    side: u8,
    shares: u32,
    stock: [u8; 8],
    price: u32,
}

#[inline]
fn parse_naive(buf: &[u8]) -> NaiveAddOrder {
    let mut ts = 0u64;
    for &b in &buf[5..11] {
        ts = ts << 8 | b as u64;
    }
    let mut stock = [0u8; 8];
    stock.copy_from_slice(&buf[24..32]);
    NaiveAddOrder {
        stock_locate: u16::from_be_bytes([buf[1], buf[2]]),
        tracking_number: u16::from_be_bytes([buf[3], buf[4]]),
        timestamp: ts,
        order_ref: u64::from_be_bytes(buf[11..19].try_into().unwrap()),
        side: buf[19],
        shares: u32::from_be_bytes(buf[20..24].try_into().unwrap()),
        stock,
        price: u32::from_be_bytes(buf[32..36].try_into().unwrap()),
    }
}

fn bench_stream_zero_copy(c: &mut Criterion) {
    const MESSAGES: usize = 10_000;
    let buf = message_stream(MESSAGES);
    let decoder = Decoder::new();

    let mut group = c.benchmark_group("decode_stream");
    group.throughput(Throughput::Bytes(buf.len() as u64));
    group.bench_function("zero_copy", |b| {
        b.iter(|| {
            let mut visitor = Counting::default();
            let consumed = decoder.decode_stream(black_box(&buf), &mut visitor);
            black_box((consumed, visitor.count, visitor.total_shares))
        })
    });
    group.bench_function("naive_copy", |b| {
        b.iter(|| {
            let mut count = 0u64;
            let mut total_shares = 0u64;
            for chunk in buf.chunks_exact(36) {
                let order = black_box(parse_naive(black_box(chunk)));
                count += 1;
                total_shares += order.shares as u64;
            }
            black_box((count, total_shares))
        })
    });
    group.finish();
}

fn bench_single_message(c: &mut Criterion) {
    let msg = add_order_message();
    let decoder = Decoder::new();

    c.bench_function("decode_one", |b| {
        b.iter(|| {
            let mut visitor = Counting::default();
            let result = decoder.decode_one(black_box(&msg), &mut visitor);
            black_box((result, visitor.total_shares))
        })
    });

    c.bench_function("raw_view_access", |b| {
        b.iter(|| {
            let view = AddOrder::from_bytes(black_box(&msg)).unwrap();
            black_box((view.shares(), view.price()))
        })
    });
}

criterion_group!(benches, bench_stream_zero_copy, bench_single_message);
criterion_main!(benches);
