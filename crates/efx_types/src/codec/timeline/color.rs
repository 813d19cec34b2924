//! Colour tracks.
//!
//! Four tracks per context, three contexts. Tracks 0 to 2 fade the palette,
//! track 3 fades the whole screen between two colours.
//!
//! ```text
//! Context        pal 0   pal 1   pal 2   screen
//! -------------  ------  ------  ------  ------
//! animate tick   0xB38   0xC00   0xCC8   0xD90
//! phase 1        0xEDC   0xFA4   0x106C  0x1134
//! phase 2        0x1280  0x1348  0x1410  0x14D8
//! ```
//!
//! The animate tick context stores the keyframe count before the keyframes;
//! the phase contexts store it after them.

use serde::Serialize;

use super::{read_u16, write_u16};

/// Keyframe slots per track
pub const COLOR_KEYFRAMES: usize = 33;

/// Tracks per context
pub const TRACKS_PER_CONTEXT: usize = 4;

/// Number of contexts
pub const COLOR_CONTEXTS: usize = 3;

/// Size of a palette keyframe
pub const PALETTE_KEY_SIZE: usize = 6;

/// Size of a screen keyframe
pub const SCREEN_KEY_SIZE: usize = 10;

/// Size of a palette track including its count
pub const PALETTE_TRACK_SIZE: usize = COLOR_KEYFRAMES * PALETTE_KEY_SIZE + 2;

/// Size of a screen track including its count
pub const SCREEN_TRACK_SIZE: usize = COLOR_KEYFRAMES * SCREEN_KEY_SIZE + 2;

/// Track offsets per context
pub const COLOR_TRACK_OFFSETS: [[usize; TRACKS_PER_CONTEXT]; COLOR_CONTEXTS] = [
	[0xB38, 0xC00, 0xCC8, 0xD90],
	[0xEDC, 0xFA4, 0x106C, 0x1134],
	[0x1280, 0x1348, 0x1410, 0x14D8],
];

/// One palette fade keyframe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct PaletteKey {
	/// Frame
	pub time: u16,
	/// Target colour
	pub rgb: [u8; 3],
	/// Control byte
	pub ctrl: u8,
}

/// One screen fade keyframe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct ScreenKey {
	/// Frame
	pub time: u16,
	/// Colour at the start of the fade
	pub start: [u8; 3],
	/// Colour at the end of the fade
	pub end: [u8; 3],
	/// Control byte
	pub ctrl: u8,
}

/// A colour track of either shape
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ColorTrack {
	/// Palette fade track
	Palette {
		/// Number of active keyframes
		count: u16,
		/// All 33 slots
		keys: Vec<PaletteKey>,
	},
	/// Screen fade track
	Screen {
		/// Number of active keyframes
		count: u16,
		/// All 33 slots
		keys: Vec<ScreenKey>,
	},
}

impl ColorTrack {
	/// An empty track of the shape used by slot `track`
	pub fn empty(track: usize) -> Self {
		if track == TRACKS_PER_CONTEXT - 1 {
			Self::Screen {
				count: 0,
				keys: vec![ScreenKey::default(); COLOR_KEYFRAMES],
			}
		} else {
			Self::Palette {
				count: 0,
				keys: vec![PaletteKey::default(); COLOR_KEYFRAMES],
			}
		}
	}

	/// Number of active keyframes
	pub fn count(&self) -> u16 {
		match self {
			Self::Palette {
				count,
				..
			}
			| Self::Screen {
				count,
				..
			} => *count,
		}
	}

	/// Returns `true` for the screen shape
	pub fn is_screen(&self) -> bool {
		matches!(self, Self::Screen { .. })
	}

	/// Encoded size of the track
	pub fn byte_size(&self) -> usize {
		if self.is_screen() { SCREEN_TRACK_SIZE } else { PALETTE_TRACK_SIZE }
	}

	/// Decodes track `track` of `context` from the whole timeline buffer
	pub(super) fn decode(data: &[u8], context: usize, track: usize) -> Self {
		let offset = COLOR_TRACK_OFFSETS[context][track];
		let screen = track == TRACKS_PER_CONTEXT - 1;
		let key_size = if screen { SCREEN_KEY_SIZE } else { PALETTE_KEY_SIZE };
		let (count_at, keys_at) = if context == 0 {
			(offset, offset + 2)
		} else {
			(offset + COLOR_KEYFRAMES * key_size, offset)
		};
		let count = read_u16(data, count_at);

		let key_base = |i: usize| keys_at + i * key_size;
		if screen {
			let keys = (0..COLOR_KEYFRAMES)
				.map(|i| {
					let at = key_base(i);
					ScreenKey {
						time: read_u16(data, at),
						start: [data[at + 2], data[at + 3], data[at + 4]],
						end: [data[at + 5], data[at + 6], data[at + 7]],
						ctrl: data[at + 8],
					}
				})
				.collect();
			Self::Screen {
				count,
				keys,
			}
		} else {
			let keys = (0..COLOR_KEYFRAMES)
				.map(|i| {
					let at = key_base(i);
					PaletteKey {
						time: read_u16(data, at),
						rgb: [data[at + 2], data[at + 3], data[at + 4]],
						ctrl: data[at + 5],
					}
				})
				.collect();
			Self::Palette {
				count,
				keys,
			}
		}
	}

	/// Encodes the track into the whole timeline buffer.
	///
	/// The shape is taken from the slot, not from the value; a track of the
	/// wrong shape is written as empty keyframes.
	pub(super) fn encode(&self, data: &mut [u8], context: usize, track: usize) {
		let offset = COLOR_TRACK_OFFSETS[context][track];
		let screen = track == TRACKS_PER_CONTEXT - 1;
		let key_size = if screen { SCREEN_KEY_SIZE } else { PALETTE_KEY_SIZE };
		let (count_at, keys_at) = if context == 0 {
			(offset, offset + 2)
		} else {
			(offset + COLOR_KEYFRAMES * key_size, offset)
		};
		write_u16(data, count_at, self.count());

		match self {
			Self::Screen {
				keys,
				..
			} if screen => {
				for (i, key) in keys.iter().take(COLOR_KEYFRAMES).enumerate() {
					let at = keys_at + i * key_size;
					write_u16(data, at, key.time);
					data[at + 2..at + 5].copy_from_slice(&key.start);
					data[at + 5..at + 8].copy_from_slice(&key.end);
					data[at + 8] = key.ctrl;
				}
			}
			Self::Palette {
				keys,
				..
			} if !screen => {
				for (i, key) in keys.iter().take(COLOR_KEYFRAMES).enumerate() {
					let at = keys_at + i * key_size;
					write_u16(data, at, key.time);
					data[at + 2..at + 5].copy_from_slice(&key.rgb);
					data[at + 5] = key.ctrl;
				}
			}
			_ => {
				log::warn!("colour track {context}/{track} has the wrong shape, writing it empty");
				data[keys_at..keys_at + COLOR_KEYFRAMES * key_size].fill(0);
			}
		}
	}
}
