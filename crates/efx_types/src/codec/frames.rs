//! Sprite framesets (`frames` section).
//!
//! # Layout
//!
//! ```text
//! section start
//!   u32 offsets[n]         frameset offsets from the section start,
//!                          n = offsets[0] / 4
//! frameset start
//!   u16 offsets[m]         frame offsets from the frameset start,
//!                          m = offsets[0] / 2
//! frame                    24 bytes, see `Frame`
//! ```
//!
//! Serializing lays every frameset out as its offset table followed by its
//! frames, in order. Frames shared between framesets are written once per
//! reference.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::container::SectionId;
use crate::error::EfxError;
use crate::memory::ByteSource;

use super::SectionCodec;

/// Size of one frame record
pub const FRAME_SIZE: usize = 24;

/// Frame flag: `u`/`v` are signed
pub const FLAG_SIGNED_UV: u16 = 1 << 5;

/// Sprite frame record (24 bytes).
///
/// ```text
/// 0x00 flags   0x02 tpage   0x04 x       0x06 y
/// 0x08 width   0x0A height  0x0C u       0x0E v
/// 0x10 clut    0x12 rotation 0x14 scale_x 0x16 scale_y
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Frame {
	/// Flag bits
	pub flags: u16,

	/// Texture page
	pub tpage: u16,

	/// Horizontal offset from the anchor
	pub x: i16,

	/// Vertical offset from the anchor
	pub y: i16,

	/// Width in pixels
	pub width: u16,

	/// Height in pixels
	pub height: u16,

	/// Texture u coordinate, signed when [`FLAG_SIGNED_UV`] is set
	pub u: i32,

	/// Texture v coordinate, signed when [`FLAG_SIGNED_UV`] is set
	pub v: i32,

	/// Colour lookup table
	pub clut: u16,

	/// Rotation angle
	pub rotation: u16,

	/// Horizontal scale
	pub scale_x: u16,

	/// Vertical scale
	pub scale_y: u16,
}

impl Frame {
	/// Returns `true` if `u`/`v` are signed
	#[inline]
	pub fn has_signed_uv(&self) -> bool {
		self.flags & FLAG_SIGNED_UV != 0
	}

	/// Decodes a frame from 24 bytes
	pub fn from_bytes(data: &[u8]) -> Result<Self, EfxError> {
		if data.len() < FRAME_SIZE {
			return Err(EfxError::insufficient_data(SectionId::Frames, FRAME_SIZE, data.len()));
		}
		let half = |at: usize| u16::from_le_bytes([data[at], data[at + 1]]);
		let flags = half(0x00);
		let uv = |at: usize| {
			if flags & FLAG_SIGNED_UV != 0 {
				i32::from(half(at) as i16)
			} else {
				i32::from(half(at))
			}
		};

		Ok(Self {
			flags,
			tpage: half(0x02),
			x: half(0x04) as i16,
			y: half(0x06) as i16,
			width: half(0x08),
			height: half(0x0A),
			u: uv(0x0C),
			v: uv(0x0E),
			clut: half(0x10),
			rotation: half(0x12),
			scale_x: half(0x14),
			scale_y: half(0x16),
		})
	}

	/// Encodes the frame into 24 bytes
	pub fn to_bytes(&self) -> [u8; FRAME_SIZE] {
		let halves = [
			self.flags,
			self.tpage,
			self.x as u16,
			self.y as u16,
			self.width,
			self.height,
			self.u as u16,
			self.v as u16,
			self.clut,
			self.rotation,
			self.scale_x,
			self.scale_y,
		];
		let mut out = [0u8; FRAME_SIZE];
		for (i, half) in halves.iter().enumerate() {
			out[i * 2..i * 2 + 2].copy_from_slice(&half.to_le_bytes());
		}
		out
	}
}

/// A group of frames shown together
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Frameset {
	/// Frames in table order
	pub frames: Vec<Frame>,
}

impl Frameset {
	/// Encoded size: offset table (at least one slot) plus frames
	pub fn byte_size(&self) -> usize {
		(self.frames.len() * 2).max(2) + self.frames.len() * FRAME_SIZE
	}
}

/// Contents of the `frames` section
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
pub struct FrameTable {
	/// Framesets in table order
	pub framesets: Vec<Frameset>,
}

fn check(needed: usize, len: usize) -> Result<(), EfxError> {
	if needed > len {
		return Err(EfxError::insufficient_data(SectionId::Frames, needed, len));
	}
	Ok(())
}

impl FrameTable {
	/// Decodes the table from the section bytes
	pub fn from_bytes(data: &[u8]) -> Result<Self, EfxError> {
		if data.is_empty() {
			return Ok(Self::default());
		}
		check(4, data.len())?;
		let word = |at: usize| u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]]);
		let half = |at: usize| usize::from(u16::from_le_bytes([data[at], data[at + 1]]));

		let count = word(0) as usize / 4;
		check(count * 4, data.len())?;

		let mut framesets = Vec::with_capacity(count);
		let mut seen = BTreeSet::new();
		let mut shared = 0;
		for i in 0..count {
			let base = word(i * 4) as usize;
			check(base + 2, data.len())?;
			let frame_count = half(base) / 2;
			check(base + frame_count * 2, data.len())?;

			let mut frames = Vec::with_capacity(frame_count);
			for j in 0..frame_count {
				let at = base + half(base + j * 2);
				check(at + FRAME_SIZE, data.len())?;
				if !seen.insert(at) {
					shared += 1;
				}
				frames.push(Frame::from_bytes(&data[at..at + FRAME_SIZE])?);
			}
			framesets.push(Frameset {
				frames,
			});
		}

		let table = Self {
			framesets,
		};
		if shared > 0 {
			log::warn!(
				"frames: {shared} shared frame reference(s), section grows from {} to {} bytes when written",
				data.len(),
				table.byte_len()
			);
		}
		Ok(table)
	}

	/// Encodes the table with freshly computed offsets
	pub fn to_bytes(&self) -> Vec<u8> {
		let mut out = Vec::with_capacity(self.byte_len());
		let mut cursor = self.framesets.len() * 4;
		for set in &self.framesets {
			out.extend_from_slice(&(cursor as u32).to_le_bytes());
			cursor += set.byte_size();
		}

		for set in &self.framesets {
			let table = (set.frames.len() * 2).max(2);
			if set.frames.is_empty() {
				out.extend_from_slice(&[0, 0]);
			}
			for j in 0..set.frames.len() {
				out.extend_from_slice(&((table + j * FRAME_SIZE) as u16).to_le_bytes());
			}
			for frame in &set.frames {
				out.extend_from_slice(&frame.to_bytes());
			}
		}
		out
	}

	/// Encoded size in bytes
	pub fn byte_len(&self) -> usize {
		self.framesets.len() * 4 + self.framesets.iter().map(Frameset::byte_size).sum::<usize>()
	}

	/// Total number of frames
	pub fn frame_count(&self) -> usize {
		self.framesets.iter().map(|s| s.frames.len()).sum()
	}
}

impl SectionCodec for FrameTable {
	const SECTION: SectionId = SectionId::Frames;

	fn parse<S: ByteSource + ?Sized>(
		source: &S,
		address: u32,
		len: usize,
	) -> Result<Self, EfxError> {
		Self::from_bytes(&source.read_bytes(address, len)?)
	}

	fn serialize_to_bytes(&self) -> Vec<u8> {
		self.to_bytes()
	}

	fn byte_size(&self) -> usize {
		self.byte_len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn frame(flags: u16, u: i32, v: i32) -> Frame {
		Frame {
			flags,
			tpage: 0x1C,
			x: -16,
			y: -32,
			width: 32,
			height: 64,
			u,
			v,
			clut: 0x7F80,
			rotation: 0,
			scale_x: 0x1000,
			scale_y: 0x1000,
		}
	}

	#[test]
	fn test_uv_signedness_follows_flag() {
		let mut bytes = frame(0, 0, 0).to_bytes();
		bytes[0x0C..0x0E].copy_from_slice(&0xFFF0u16.to_le_bytes());

		assert_eq!(Frame::from_bytes(&bytes).unwrap().u, 0xFFF0);

		bytes[0] |= FLAG_SIGNED_UV as u8;
		let signed = Frame::from_bytes(&bytes).unwrap();
		assert!(signed.has_signed_uv());
		assert_eq!(signed.u, -16);
		assert_eq!(signed.to_bytes(), bytes);
	}

	#[test]
	fn test_table_roundtrip() {
		let table = FrameTable {
			framesets: vec![
				Frameset {
					frames: vec![frame(0, 10, 20), frame(FLAG_SIGNED_UV, -4, 8)],
				},
				Frameset {
					frames: vec![frame(0, 0, 255)],
				},
			],
		};
		let bytes = table.to_bytes();
		assert_eq!(bytes.len(), table.byte_len());
		assert_eq!(&bytes[0..4], &8u32.to_le_bytes());
		assert_eq!(&bytes[8..10], &4u16.to_le_bytes());
		assert_eq!(FrameTable::parse_from_buffer(&bytes).unwrap(), table);
		assert_eq!(table.frame_count(), 3);
	}

	#[test]
	fn test_empty_framesets() {
		let table = FrameTable {
			framesets: vec![Frameset::default(), Frameset::default()],
		};
		let bytes = table.to_bytes();
		assert_eq!(bytes.len(), 12);
		assert_eq!(FrameTable::from_bytes(&bytes).unwrap(), table);
		assert_eq!(FrameTable::from_bytes(&[]).unwrap(), FrameTable::default());
	}

	#[test_log::test]
	fn test_shared_frames_are_duplicated() {
		// two framesets pointing at the same frame
		let mut bytes = Vec::new();
		bytes.extend_from_slice(&8u32.to_le_bytes());
		bytes.extend_from_slice(&8u32.to_le_bytes());
		bytes.extend_from_slice(&2u16.to_le_bytes());
		bytes.extend(frame(0, 4, 4).to_bytes());
		assert_eq!(bytes.len(), 34);

		let table = FrameTable::from_bytes(&bytes).unwrap();
		assert_eq!(table.framesets.len(), 2);
		assert_eq!(table.framesets[0], table.framesets[1]);
		assert_eq!(table.byte_len(), 8 + 2 * (2 + FRAME_SIZE));
		assert_eq!(FrameTable::from_bytes(&table.to_bytes()).unwrap(), table);
	}

	#[test]
	fn test_offsets_past_the_end_rejected() {
		let mut bytes = FrameTable {
			framesets: vec![Frameset {
				frames: vec![frame(0, 0, 0)],
			}],
		}
		.to_bytes();
		bytes[4] = 0xF0;
		assert!(FrameTable::from_bytes(&bytes).is_err());
	}
}
