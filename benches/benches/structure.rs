//! Benchmark suite for section codecs and structural edits
//!
//! Run with: cargo bench --manifest-path benches/Cargo.toml

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use efx_benches::{BASE, generate_effect, load_image, sizes};
use efx_types::codec::timing_curve::{pack_nibbles, unpack_nibbles};
use efx_types::config::EditorConfig;
use efx_types::container::SectionId;
use efx_types::session::Session;
use efx_types::structure::{SectionDelta, apply_structure_changes, read_memory_layout, shift_bytes};

/// Benchmark opening a session from a file buffer
fn bench_session_parse(c: &mut Criterion) {
	let mut group = c.benchmark_group("session_parse");

	for (name, (emitters, curves)) in
		[("small", sizes::SMALL), ("medium", sizes::MEDIUM), ("large", sizes::LARGE)]
	{
		let data = generate_effect(emitters, curves);
		group.throughput(Throughput::Bytes(data.len() as u64));
		group.bench_with_input(BenchmarkId::new("from_buffer", name), &data, |b, data| {
			b.iter(|| {
				let session = Session::from_buffer(black_box(data), BASE, EditorConfig::default());
				black_box(session)
			});
		});
	}

	group.finish();
}

/// Benchmark rebuilding a container from its records
fn bench_session_encode(c: &mut Criterion) {
	let mut group = c.benchmark_group("session_encode");

	let (emitters, curves) = sizes::MEDIUM;
	let data = generate_effect(emitters, curves);
	let session = Session::from_buffer(&data, BASE, EditorConfig::default()).unwrap();

	group.throughput(Throughput::Bytes(data.len() as u64));
	group.bench_function("to_bytes", |b| {
		b.iter(|| black_box(session.to_bytes()));
	});

	group.finish();
}

/// Benchmark nibble packing of timing curves
fn bench_nibbles(c: &mut Criterion) {
	let mut group = c.benchmark_group("timing_nibbles");

	let samples: Vec<u8> = (0..600).map(|i| (i % 16) as u8).collect();
	let packed = pack_nibbles(&samples);

	group.throughput(Throughput::Elements(samples.len() as u64));
	group.bench_function("pack", |b| {
		b.iter(|| black_box(pack_nibbles(black_box(&samples))));
	});
	group.bench_function("unpack", |b| {
		b.iter(|| black_box(unpack_nibbles(black_box(&packed), samples.len())));
	});

	group.finish();
}

/// Benchmark raw byte shifting in both directions
fn bench_shift_bytes(c: &mut Criterion) {
	let mut group = c.benchmark_group("shift_bytes");

	for len in [0x800usize, 0x8000, 0x2_0000] {
		let data = vec![0x5Au8; len];
		group.throughput(Throughput::Bytes(len as u64));
		group.bench_with_input(BenchmarkId::new("grow_then_shrink", len), &len, |b, &len| {
			let mut mem = load_image(&data, 0x1000);
			b.iter(|| {
				shift_bytes(&mut mem, BASE, len, 0x100).unwrap();
				shift_bytes(&mut mem, BASE + 0x100, len, -0x100).unwrap();
			});
		});
	}

	group.finish();
}

/// Benchmark a full emitter-table growth through the structure manager
fn bench_apply_changes(c: &mut Criterion) {
	let mut group = c.benchmark_group("apply_structure_changes");

	let (emitters, curves) = sizes::MEDIUM;
	let data = generate_effect(emitters, curves);
	let end = BASE + data.len() as u32;
	let config = EditorConfig::default();

	group.bench_function("effect_data_grow_shrink", |b| {
		let mut mem = load_image(&data, 0x1000);
		b.iter(|| {
			let mut layout = read_memory_layout(&mem, BASE, end).unwrap();
			for delta in [0xC4, -0xC4] {
				let changes = [SectionDelta::new(SectionId::EffectData, delta)];
				apply_structure_changes(&mut mem, &mut layout, &changes, &config).unwrap();
			}
			black_box(layout)
		});
	});

	group.finish();
}

criterion_group!(
	benches,
	bench_session_parse,
	bench_session_encode,
	bench_nibbles,
	bench_shift_bytes,
	bench_apply_changes,
);

criterion_main!(benches);
