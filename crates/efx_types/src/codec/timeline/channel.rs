//! Keyframe channels.
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----------------------------
//! 0x00    1     count
//! 0x01    1     flags
//! 0x02    50    times (u16 x 25)
//! 0x32    25    emitter ids (u8 x 25)
//! 0x4B    1     padding
//! 0x4C    50    actions (u16 x 25)
//! 0x7E    2     reserved
//! ```
//!
//! The emitter id array starts on the last time slot. Times are written first
//! and ids second, so the bytes at 0x32..0x34 always hold the first two ids.

use serde::Serialize;

use super::{read_u16, write_u16};

/// Number of channels in a timeline
pub const CHANNEL_COUNT: usize = 15;

/// Channels per execution context
pub const CHANNELS_PER_GROUP: usize = 5;

/// Size of one channel in bytes
pub const CHANNEL_SIZE: usize = 0x80;

/// Keyframe slots per channel
pub const CHANNEL_KEYFRAMES: usize = 25;

const TIMES_OFFSET: usize = 0x02;
const EMITTER_IDS_OFFSET: usize = 0x32;
const PADDING_OFFSET: usize = 0x4B;
const ACTIONS_OFFSET: usize = 0x4C;
const RESERVED_OFFSET: usize = 0x7E;

/// Execution context a channel belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelGroup {
	/// Runs every animation tick
	AnimateTick,
	/// Runs during phase 1
	Phase1,
	/// Runs during phase 2
	Phase2,
}

impl ChannelGroup {
	/// Group of the channel at `index`
	pub fn of(index: usize) -> Option<Self> {
		match index / CHANNELS_PER_GROUP {
			0 => Some(Self::AnimateTick),
			1 => Some(Self::Phase1),
			2 => Some(Self::Phase2),
			_ => None,
		}
	}
}

/// One resolved keyframe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ChannelKey {
	/// Frame at which the key fires
	pub time: u16,
	/// Emitter triggered by the key
	pub emitter_id: u8,
	/// Action flags
	pub action: u16,
}

/// A 25-slot keyframe channel
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
pub struct TimelineChannel {
	/// Number of active keyframes
	pub count: u8,
	/// Channel flags
	pub flags: u8,
	/// Keyframe times
	pub times: [u16; CHANNEL_KEYFRAMES],
	/// Emitter ids
	pub emitter_ids: [u8; CHANNEL_KEYFRAMES],
	/// Action flags
	pub actions: [u16; CHANNEL_KEYFRAMES],
	padding: u8,
	reserved: u16,
}

impl TimelineChannel {
	/// Decodes a channel from its 128 bytes
	pub(super) fn decode(data: &[u8]) -> Self {
		let mut channel = Self {
			count: data[0],
			flags: data[1],
			padding: data[PADDING_OFFSET],
			reserved: read_u16(data, RESERVED_OFFSET),
			..Self::default()
		};
		for i in 0..CHANNEL_KEYFRAMES {
			channel.times[i] = read_u16(data, TIMES_OFFSET + i * 2);
			channel.emitter_ids[i] = data[EMITTER_IDS_OFFSET + i];
			channel.actions[i] = read_u16(data, ACTIONS_OFFSET + i * 2);
		}
		channel
	}

	/// Encodes the channel into `out`, which must be 128 bytes
	pub(super) fn encode(&self, out: &mut [u8]) {
		out[0] = self.count;
		out[1] = self.flags;
		for (i, &time) in self.times.iter().enumerate() {
			write_u16(out, TIMES_OFFSET + i * 2, time);
		}
		out[EMITTER_IDS_OFFSET..EMITTER_IDS_OFFSET + CHANNEL_KEYFRAMES]
			.copy_from_slice(&self.emitter_ids);
		out[PADDING_OFFSET] = self.padding;
		for (i, &action) in self.actions.iter().enumerate() {
			write_u16(out, ACTIONS_OFFSET + i * 2, action);
		}
		write_u16(out, RESERVED_OFFSET, self.reserved);
	}

	/// Active keyframes
	pub fn keys(&self) -> impl Iterator<Item = ChannelKey> + '_ {
		(0..usize::from(self.count).min(CHANNEL_KEYFRAMES)).map(|i| ChannelKey {
			time: self.times[i],
			emitter_id: self.emitter_ids[i],
			action: self.actions[i],
		})
	}

	/// Appends a keyframe; returns `false` when all slots are used
	pub fn push_key(&mut self, key: ChannelKey) -> bool {
		let index = usize::from(self.count);
		if index >= CHANNEL_KEYFRAMES {
			return false;
		}
		self.times[index] = key.time;
		self.emitter_ids[index] = key.emitter_id;
		self.actions[index] = key.action;
		self.count += 1;
		true
	}

	/// Drops every keyframe
	pub fn clear(&mut self) {
		self.count = 0;
	}
}
