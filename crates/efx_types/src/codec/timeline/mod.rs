//! Timeline section.
//!
//! # Layout
//!
//! ```text
//! Offset   Size    Field
//! -------  ------  --------------------------------------
//! 0x0000   0x0C    header
//! 0x000C   0x780   15 keyframe channels (128 bytes each)
//! 0x078C   0x3AC   3 camera tables
//! 0x0B38   0xAEC   12 colour tracks
//! 0x1624           end
//! ```
//!
//! Bytes not covered by a decoded field (alignment gaps between camera
//! arrays, the spare byte of each screen keyframe) are carried through
//! unchanged.

mod camera;
mod channel;
mod color;

use serde::Serialize;

use crate::container::SectionId;
use crate::error::EfxError;
use crate::memory::ByteSource;

use super::{SectionCodec, require_len};

pub use self::camera::{
	CAMERA_KEYFRAMES, CAMERA_LAYOUTS, CAMERA_TABLE_COUNT, CameraCommand, CameraKeyframe,
	CameraLayout, CameraTable, CameraTableKind, Interpolation, PositionSource,
};
pub use self::channel::{
	CHANNEL_COUNT, CHANNEL_KEYFRAMES, CHANNEL_SIZE, CHANNELS_PER_GROUP, ChannelGroup, ChannelKey,
	TimelineChannel,
};
pub use self::color::{
	COLOR_CONTEXTS, COLOR_KEYFRAMES, COLOR_TRACK_OFFSETS, ColorTrack, PaletteKey, ScreenKey,
	TRACKS_PER_CONTEXT,
};

/// Size of the timeline section
pub const TIMELINE_SIZE: usize = 0x1624;

/// Size of the timeline header
pub const TIMELINE_HEADER_SIZE: usize = 0x0C;

pub(crate) fn read_u16(data: &[u8], offset: usize) -> u16 {
	u16::from_le_bytes([data[offset], data[offset + 1]])
}

pub(crate) fn write_u16(data: &mut [u8], offset: usize, value: u16) {
	data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

/// Timeline header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct TimelineHeader {
	/// Length of the effect in frames
	pub total_frames: u16,
	/// First frame of phase 1
	pub phase1_start: u16,
	/// First frame of phase 2
	pub phase2_start: u16,
	/// Frame to return to when looping
	pub loop_frame: u16,
	/// Target selection mode
	pub target_mode: u8,
	/// Enabled channel groups
	pub channel_mask: u8,
	/// Timeline flags
	pub flags: u16,
}

impl TimelineHeader {
	fn decode(data: &[u8]) -> Self {
		Self {
			total_frames: read_u16(data, 0),
			phase1_start: read_u16(data, 2),
			phase2_start: read_u16(data, 4),
			loop_frame: read_u16(data, 6),
			target_mode: data[8],
			channel_mask: data[9],
			flags: read_u16(data, 0xA),
		}
	}

	fn encode(&self, data: &mut [u8]) {
		write_u16(data, 0, self.total_frames);
		write_u16(data, 2, self.phase1_start);
		write_u16(data, 4, self.phase2_start);
		write_u16(data, 6, self.loop_frame);
		data[8] = self.target_mode;
		data[9] = self.channel_mask;
		write_u16(data, 0xA, self.flags);
	}
}

/// Contents of the `timeline` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Timeline {
	/// Header
	pub header: TimelineHeader,
	/// Keyframe channels, 5 per context
	pub channels: Vec<TimelineChannel>,
	/// Main, for-each-target and cleanup camera tables
	pub cameras: Vec<CameraTable>,
	/// Colour tracks indexed `[context][track]`
	pub colors: Vec<Vec<ColorTrack>>,
	#[serde(skip)]
	raw: Vec<u8>,
}

impl Default for Timeline {
	fn default() -> Self {
		Self::decode(&[0u8; TIMELINE_SIZE])
	}
}

impl Timeline {
	fn decode(data: &[u8]) -> Self {
		let channels = (0..CHANNEL_COUNT)
			.map(|i| {
				let start = TIMELINE_HEADER_SIZE + i * CHANNEL_SIZE;
				TimelineChannel::decode(&data[start..start + CHANNEL_SIZE])
			})
			.collect();
		let cameras = CAMERA_LAYOUTS.iter().map(|&layout| CameraTable::decode(data, layout)).collect();
		let colors = (0..COLOR_CONTEXTS)
			.map(|context| {
				(0..TRACKS_PER_CONTEXT)
					.map(|track| ColorTrack::decode(data, context, track))
					.collect()
			})
			.collect();

		Self {
			header: TimelineHeader::decode(data),
			channels,
			cameras,
			colors,
			raw: data[..TIMELINE_SIZE].to_vec(),
		}
	}

	/// Decodes a timeline from its 0x1624-byte section payload
	pub fn from_bytes(data: &[u8]) -> Result<Self, EfxError> {
		require_len(SectionId::Timeline, TIMELINE_SIZE, data.len())?;
		Ok(Self::decode(data))
	}

	/// Camera table by kind
	pub fn camera(&self, kind: CameraTableKind) -> Option<&CameraTable> {
		self.cameras.get(kind as usize)
	}

	/// Mutable camera table by kind
	pub fn camera_mut(&mut self, kind: CameraTableKind) -> Option<&mut CameraTable> {
		self.cameras.get_mut(kind as usize)
	}

	/// Channels of one execution context
	pub fn group(&self, group: ChannelGroup) -> &[TimelineChannel] {
		let start = group as usize * CHANNELS_PER_GROUP;
		let end = (start + CHANNELS_PER_GROUP).min(self.channels.len());
		self.channels.get(start..end).unwrap_or(&[])
	}
}

impl SectionCodec for Timeline {
	const SECTION: SectionId = SectionId::Timeline;

	fn parse<S: ByteSource + ?Sized>(
		source: &S,
		address: u32,
		len: usize,
	) -> Result<Self, EfxError> {
		require_len(Self::SECTION, TIMELINE_SIZE, len)?;
		Ok(Self::decode(&source.read_bytes(address, TIMELINE_SIZE)?))
	}

	fn serialize_to_bytes(&self) -> Vec<u8> {
		let mut data = self.raw.clone();
		data.resize(TIMELINE_SIZE, 0);

		self.header.encode(&mut data);
		for (i, channel) in self.channels.iter().take(CHANNEL_COUNT).enumerate() {
			let start = TIMELINE_HEADER_SIZE + i * CHANNEL_SIZE;
			channel.encode(&mut data[start..start + CHANNEL_SIZE]);
		}
		for (table, layout) in self.cameras.iter().zip(CAMERA_LAYOUTS) {
			table.encode(&mut data, layout);
		}
		for (context, tracks) in self.colors.iter().take(COLOR_CONTEXTS).enumerate() {
			for (track, color) in tracks.iter().take(TRACKS_PER_CONTEXT).enumerate() {
				color.encode(&mut data, context, track);
			}
		}
		data
	}

	fn byte_size(&self) -> usize {
		TIMELINE_SIZE
	}
}
