//! Nibble-packed timing curves (optional `timing_curve` section).
//!
//! The section holds two curves of 600 four-bit samples. Each curve is packed
//! into 300 bytes: sample `2k` in the low nibble of byte `k`, sample `2k + 1`
//! in the high nibble.

use serde::Serialize;

use crate::container::SectionId;
use crate::error::EfxError;
use crate::memory::ByteSource;

use super::{SectionCodec, require_len};

/// Samples per curve
pub const TIMING_CURVE_SAMPLES: usize = 600;

/// Packed size of one curve
pub const PACKED_CURVE_SIZE: usize = TIMING_CURVE_SAMPLES / 2;

/// Size of the whole section
pub const TIMING_CURVE_SIZE: usize = PACKED_CURVE_SIZE * 2;

/// Largest sample value
pub const MAX_SAMPLE: u8 = 0x0F;

/// Packs samples two per byte, clamping each one to `0..=15`.
///
/// An odd trailing sample occupies the low nibble of the last byte.
pub fn pack_nibbles(values: &[u8]) -> Vec<u8> {
	values
		.chunks(2)
		.map(|pair| {
			let low = pair[0].min(MAX_SAMPLE);
			let high = pair.get(1).map_or(0, |&v| v.min(MAX_SAMPLE));
			low | (high << 4)
		})
		.collect()
}

/// Unpacks `count` samples from nibble-packed bytes.
///
/// Samples past the end of `packed` read as zero.
pub fn unpack_nibbles(packed: &[u8], count: usize) -> Vec<u8> {
	(0..count)
		.map(|i| {
			let byte = packed.get(i / 2).copied().unwrap_or(0);
			if i % 2 == 0 { byte & 0x0F } else { byte >> 4 }
		})
		.collect()
}

/// Selects one of the two curves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveKind {
	/// Effect timing curve, stored first
	Effect,
	/// Sound volume curve, stored second
	Volume,
}

/// Two 600-sample timing curves
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TimingCurve {
	effect: Vec<u8>,
	volume: Vec<u8>,
}

impl TimingCurve {
	/// Creates both curves flat at `value` (clamped)
	pub fn flat(value: u8) -> Self {
		let value = value.min(MAX_SAMPLE);
		Self {
			effect: vec![value; TIMING_CURVE_SAMPLES],
			volume: vec![value; TIMING_CURVE_SAMPLES],
		}
	}

	/// Samples of one curve
	pub fn values(&self, kind: CurveKind) -> &[u8] {
		match kind {
			CurveKind::Effect => &self.effect,
			CurveKind::Volume => &self.volume,
		}
	}

	/// Sets one sample, clamping to `0..=15`.
	///
	/// Returns `false` if `index` is out of range.
	pub fn set(&mut self, kind: CurveKind, index: usize, value: i32) -> bool {
		let curve = match kind {
			CurveKind::Effect => &mut self.effect,
			CurveKind::Volume => &mut self.volume,
		};
		match curve.get_mut(index) {
			Some(slot) => {
				*slot = value.clamp(0, i32::from(MAX_SAMPLE)) as u8;
				true
			}
			None => false,
		}
	}

	/// Decodes both curves from the 600-byte section payload
	pub fn from_bytes(data: &[u8]) -> Result<Self, EfxError> {
		require_len(SectionId::TimingCurve, TIMING_CURVE_SIZE, data.len())?;
		Ok(Self {
			effect: unpack_nibbles(&data[..PACKED_CURVE_SIZE], TIMING_CURVE_SAMPLES),
			volume: unpack_nibbles(
				&data[PACKED_CURVE_SIZE..TIMING_CURVE_SIZE],
				TIMING_CURVE_SAMPLES,
			),
		})
	}
}

/// Payload written when the section is inserted: both curves at full scale
impl Default for TimingCurve {
	fn default() -> Self {
		Self::flat(MAX_SAMPLE)
	}
}

impl SectionCodec for TimingCurve {
	const SECTION: SectionId = SectionId::TimingCurve;

	fn parse<S: ByteSource + ?Sized>(
		source: &S,
		address: u32,
		len: usize,
	) -> Result<Self, EfxError> {
		require_len(Self::SECTION, TIMING_CURVE_SIZE, len)?;
		Self::from_bytes(&source.read_bytes(address, TIMING_CURVE_SIZE)?)
	}

	fn serialize_to_bytes(&self) -> Vec<u8> {
		let mut bytes = pack_nibbles(&self.effect);
		bytes.extend(pack_nibbles(&self.volume));
		bytes
	}

	fn byte_size(&self) -> usize {
		TIMING_CURVE_SIZE
	}
}
