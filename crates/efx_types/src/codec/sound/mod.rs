//! Sound definition block (`sound_def` section).
//!
//! # Layout
//!
//! ```text
//! Offset      Size  Field
//! ----------  ----  -----------------------------------------------
//! 0x00        4     magic "feds"
//! 0x04        4     data_size, total bytes from the magic on
//! 0x08        4     pair_count_plus_one, channel count + 1
//! 0x0C        4     resource_id
//! 0x10        4     data_offset, first channel byte from the magic
//! 0x14        8     reserved
//! 0x1C        2n    channel offsets (u16, relative to the magic)
//! ...               channel SMD streams, back to back
//! ```
//!
//! Channel `i` runs from its offset to the next channel's offset; the last
//! one runs to `data_size`. Offsets, `data_offset` and `data_size` are
//! recomputed on every serialize.

mod smd;

use serde::Serialize;

use crate::container::SectionId;
use crate::error::EfxError;
use crate::memory::ByteSource;

use super::{SectionCodec, require_len};

pub use self::smd::{SMD_OPCODES, SmdEvent, SmdOpcode, decode_events, encode_events, smd_opcode};

/// Block magic
pub const FEDS_MAGIC: &[u8; 4] = b"feds";

/// Size of the magic plus the fixed header
pub const FEDS_HEADER_SIZE: usize = 0x1C;

/// Largest channel offset the 16-bit offset table can hold
pub const MAX_CHANNEL_OFFSET: usize = u16::MAX as usize;

/// One sound channel
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
pub struct SoundChannel {
	/// Decoded events
	pub events: Vec<SmdEvent>,
}

impl SoundChannel {
	/// Decodes a channel from its raw stream
	pub fn from_bytes(data: &[u8]) -> Self {
		Self {
			events: decode_events(data),
		}
	}

	/// Encodes the channel stream
	pub fn to_bytes(&self) -> Vec<u8> {
		encode_events(&self.events)
	}

	/// Encoded size of the channel
	pub fn byte_size(&self) -> usize {
		self.events.iter().map(SmdEvent::byte_size).sum()
	}
}

/// Contents of the `sound_def` section
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
pub struct SoundDefinition {
	/// Sound bank resource
	pub resource_id: u32,
	/// Reserved header bytes
	pub reserved: [u8; 8],
	/// Channels in table order
	pub channels: Vec<SoundChannel>,
}

impl SoundDefinition {
	/// Offset of the first channel byte
	pub fn data_offset(&self) -> usize {
		FEDS_HEADER_SIZE + self.channels.len() * 2
	}

	/// Fails if a channel would start past [`MAX_CHANNEL_OFFSET`]
	pub fn check_offsets(&self) -> Result<(), EfxError> {
		let mut offset = self.data_offset();
		for (i, channel) in self.channels.iter().enumerate() {
			if offset > MAX_CHANNEL_OFFSET {
				return Err(EfxError::capacity(format!(
					"feds: channel {i} would start at 0x{offset:X}, past the 16-bit offset table"
				)));
			}
			offset += channel.byte_size();
		}
		Ok(())
	}

	/// Decodes a block from a byte slice starting at the magic
	pub fn from_bytes(data: &[u8]) -> Result<Self, EfxError> {
		let section = SectionId::SoundDef;
		require_len(section, FEDS_HEADER_SIZE, data.len())?;
		if &data[0..4] != FEDS_MAGIC {
			return Err(EfxError::invalid_magic(section, FEDS_MAGIC, &data[0..4]));
		}

		let word = |at: usize| u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]]);
		let data_size = word(0x04) as usize;
		let pair_count_plus_one = word(0x08) as usize;
		let resource_id = word(0x0C);
		let mut reserved = [0u8; 8];
		reserved.copy_from_slice(&data[0x14..0x1C]);

		let count = pair_count_plus_one.saturating_sub(1);
		let table_end = FEDS_HEADER_SIZE + count * 2;
		require_len(section, table_end, data.len())?;

		let end = if data_size > data.len() {
			log::warn!("feds: data_size {data_size} exceeds the {} byte section", data.len());
			data.len()
		} else {
			data_size
		};

		let offsets: Vec<usize> = (0..count)
			.map(|i| {
				let at = FEDS_HEADER_SIZE + i * 2;
				usize::from(u16::from_le_bytes([data[at], data[at + 1]]))
			})
			.collect();

		let mut channels = Vec::with_capacity(count);
		for (i, &start) in offsets.iter().enumerate() {
			let stop = offsets.get(i + 1).copied().unwrap_or(end);
			if start < table_end || start > stop || stop > data.len() {
				return Err(EfxError::insufficient_data(section, start.max(stop), data.len()));
			}
			channels.push(SoundChannel::from_bytes(&data[start..stop]));
		}

		Ok(Self {
			resource_id,
			reserved,
			channels,
		})
	}
}

impl SectionCodec for SoundDefinition {
	const SECTION: SectionId = SectionId::SoundDef;

	fn parse<S: ByteSource + ?Sized>(
		source: &S,
		address: u32,
		len: usize,
	) -> Result<Self, EfxError> {
		require_len(Self::SECTION, FEDS_HEADER_SIZE, len)?;
		// data_size bounds the read so trailing section bytes are not pulled in
		let data_size = source.read32(address + 4)? as usize;
		Self::from_bytes(&source.read_bytes(address, data_size.clamp(FEDS_HEADER_SIZE, len))?)
	}

	/// Channel offsets past [`MAX_CHANNEL_OFFSET`] wrap; see
	/// [`SoundDefinition::check_offsets`].
	fn serialize_to_bytes(&self) -> Vec<u8> {
		if let Err(err) = self.check_offsets() {
			log::warn!("{err}");
		}
		let data_offset = self.data_offset();
		let total = data_offset + self.channels.iter().map(SoundChannel::byte_size).sum::<usize>();

		let mut out = Vec::with_capacity(total);
		out.extend_from_slice(FEDS_MAGIC);
		out.extend_from_slice(&(total as u32).to_le_bytes());
		out.extend_from_slice(&(self.channels.len() as u32 + 1).to_le_bytes());
		out.extend_from_slice(&self.resource_id.to_le_bytes());
		out.extend_from_slice(&(data_offset as u32).to_le_bytes());
		out.extend_from_slice(&self.reserved);

		let mut offset = data_offset;
		for channel in &self.channels {
			out.extend_from_slice(&(offset as u16).to_le_bytes());
			offset += channel.byte_size();
		}
		for channel in &self.channels {
			out.extend(channel.to_bytes());
		}
		out
	}

	fn byte_size(&self) -> usize {
		self.data_offset() + self.channels.iter().map(SoundChannel::byte_size).sum::<usize>()
	}
}
