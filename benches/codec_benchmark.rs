use criterion::{black_box, criterion_group, criterion_main, Criterion};
use elster_rs::catalogue::signal_by_index;
use elster_rs::elster::{decode_value, parse_frame, ValueType};
use elster_rs::quality::is_invalid_value;

fn benchmark_parse_frame(c: &mut Criterion) {
    let short = [0xD2, 0x00, 0x0E, 0x00, 0xDC, 0x00, 0x00];
    let extended = [0xD2, 0x00, 0xFA, 0x01, 0xD4, 0x01, 0x2C];

    c.bench_function("parse_frame_short", |b| {
        b.iter(|| parse_frame(black_box(0x180), black_box(&short)))
    });
    c.bench_function("parse_frame_extended", |b| {
        b.iter(|| parse_frame(black_box(0x180), black_box(&extended)))
    });
}

fn benchmark_catalogue_lookup(c: &mut Criterion) {
    c.bench_function("signal_by_index", |b| b.iter(|| signal_by_index(black_box(0x092B))));
}

fn benchmark_decode_pipeline(c: &mut Criterion) {
    let frame = [0xD2, 0x00, 0xFA, 0x01, 0xD4, 0x01, 0x2C];

    c.bench_function("decode_value_dec_val", |b| {
        b.iter(|| decode_value(black_box(ValueType::DecVal), black_box(300)))
    });
    c.bench_function("frame_to_checked_value", |b| {
        b.iter(|| {
            let parsed = parse_frame(0x180, black_box(&frame)).ok()?;
            let signal = signal_by_index(parsed.index);
            let value = decode_value(signal.value_type, parsed.raw);
            Some(is_invalid_value(&value, signal.value_type))
        })
    });
}

criterion_group!(
    benches,
    benchmark_parse_frame,
    benchmark_catalogue_lookup,
    benchmark_decode_pipeline
);
criterion_main!(benches);
