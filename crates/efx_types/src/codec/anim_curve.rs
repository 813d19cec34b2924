//! Animation curve table (`anim_table` section).
//!
//! ```text
//! Offset          Size  Field
//! --------------  ----  -----------------------
//! 0x00            4     count (u32)
//! 0x04 + i*0xA0   0xA0  curve i, 160 raw samples
//! ```

use serde::Serialize;

use crate::container::SectionId;
use crate::error::EfxError;
use crate::memory::ByteSource;

use super::{SectionCodec, require_len};

/// Number of samples in one curve
pub const ANIM_CURVE_SIZE: usize = 160;

/// Size of the count prefix
pub const ANIM_TABLE_HEADER_SIZE: usize = 4;

/// One 160-sample animation curve
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AnimCurve {
	values: Vec<u8>,
}

impl AnimCurve {
	/// Creates a curve with every sample set to `value`
	pub fn flat(value: u8) -> Self {
		Self {
			values: vec![value; ANIM_CURVE_SIZE],
		}
	}

	/// Creates a curve from exactly 160 samples
	pub fn from_bytes(data: &[u8]) -> Result<Self, EfxError> {
		require_len(SectionId::AnimTable, ANIM_CURVE_SIZE, data.len())?;
		Ok(Self {
			values: data[..ANIM_CURVE_SIZE].to_vec(),
		})
	}

	/// Samples in order
	pub fn values(&self) -> &[u8] {
		&self.values
	}

	/// Mutable access to the samples; the length is fixed
	pub fn values_mut(&mut self) -> &mut [u8] {
		&mut self.values
	}
}

impl Default for AnimCurve {
	fn default() -> Self {
		Self::flat(0)
	}
}

/// Contents of the `anim_table` section
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct AnimCurveTable {
	/// Curves in index order
	pub curves: Vec<AnimCurve>,
}

impl AnimCurveTable {
	/// Size of a table holding `count` curves
	pub const fn size_for(count: usize) -> usize {
		ANIM_TABLE_HEADER_SIZE + count * ANIM_CURVE_SIZE
	}

	/// Number of curves
	pub fn len(&self) -> usize {
		self.curves.len()
	}

	/// Returns `true` if the table holds no curve
	pub fn is_empty(&self) -> bool {
		self.curves.is_empty()
	}
}

impl SectionCodec for AnimCurveTable {
	const SECTION: SectionId = SectionId::AnimTable;

	fn parse<S: ByteSource + ?Sized>(
		source: &S,
		address: u32,
		len: usize,
	) -> Result<Self, EfxError> {
		require_len(Self::SECTION, ANIM_TABLE_HEADER_SIZE, len)?;
		let declared = source.read32(address)? as usize;
		let fits = (len - ANIM_TABLE_HEADER_SIZE) / ANIM_CURVE_SIZE;
		let count = if declared > fits {
			log::warn!("anim table declares {declared} curves, section holds {fits}");
			fits
		} else {
			declared
		};

		let mut curves = Vec::with_capacity(count);
		for i in 0..count {
			let offset = ANIM_TABLE_HEADER_SIZE + i * ANIM_CURVE_SIZE;
			curves.push(AnimCurve {
				values: source.read_bytes(address + offset as u32, ANIM_CURVE_SIZE)?,
			});
		}

		Ok(Self {
			curves,
		})
	}

	fn serialize_to_bytes(&self) -> Vec<u8> {
		let mut bytes = Vec::with_capacity(self.byte_size());
		bytes.extend_from_slice(&(self.curves.len() as u32).to_le_bytes());
		for curve in &self.curves {
			bytes.extend_from_slice(&curve.values);
		}
		bytes
	}

	fn byte_size(&self) -> usize {
		Self::size_for(self.curves.len())
	}
}
