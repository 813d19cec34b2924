//! Camera keyframe tables.
//!
//! Each table stores a keyframe count followed by five parallel arrays of 17
//! slots. The tables were laid out by hand, so every array has its own fixed
//! offset inside the timeline:
//!
//! ```text
//! Table            count  end    rot    pos    zoom   cmd
//! ---------------  -----  -----  -----  -----  -----  -----
//! main             0x78C  0x78E  0x7B0  0x816  0x87C  0x89E
//! for each target  0x8C0  0x8C4  0x8E8  0x94E  0x9B4  0x9D8
//! cleanup          0x9FC  0xA00  0xA24  0xA8A  0xAF0  0xB14
//! ```

use std::fmt::Display;

use serde::Serialize;

use super::{read_u16, write_u16};

/// Keyframe slots per table
pub const CAMERA_KEYFRAMES: usize = 17;

/// Number of camera tables
pub const CAMERA_TABLE_COUNT: usize = 3;

/// Offsets of one table's fields within the timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraLayout {
	/// Keyframe count (u16)
	pub count: usize,
	/// End frame array
	pub end_frame: usize,
	/// Pitch/yaw/roll triplets
	pub rotation: usize,
	/// x/y/z triplets
	pub position: usize,
	/// Zoom array
	pub zoom: usize,
	/// Command word array
	pub command: usize,
}

/// Layouts of the main, for-each-target and cleanup tables
pub const CAMERA_LAYOUTS: [CameraLayout; CAMERA_TABLE_COUNT] = [
	CameraLayout {
		count: 0x78C,
		end_frame: 0x78E,
		rotation: 0x7B0,
		position: 0x816,
		zoom: 0x87C,
		command: 0x89E,
	},
	CameraLayout {
		count: 0x8C0,
		end_frame: 0x8C4,
		rotation: 0x8E8,
		position: 0x94E,
		zoom: 0x9B4,
		command: 0x9D8,
	},
	CameraLayout {
		count: 0x9FC,
		end_frame: 0xA00,
		rotation: 0xA24,
		position: 0xA8A,
		zoom: 0xAF0,
		command: 0xB14,
	},
];

/// Which of the three tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraTableKind {
	/// Plays once for the whole effect
	Main,
	/// Plays once per target
	ForEachTarget,
	/// Plays after the effect ends
	Cleanup,
}

impl CameraTableKind {
	/// All tables in storage order
	pub const ALL: [Self; CAMERA_TABLE_COUNT] = [Self::Main, Self::ForEachTarget, Self::Cleanup];

	/// Field offsets of this table
	pub const fn layout(self) -> CameraLayout {
		CAMERA_LAYOUTS[self as usize]
	}
}

/// Where the camera position is taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionSource {
	/// Absolute coordinates
	Fixed,
	/// Relative to the caster
	Caster,
	/// Relative to the current target
	Target,
	/// Centre of all targets
	TargetCenter,
	/// Midpoint between caster and target
	CasterToTarget,
	/// Centre of the party
	PartyCenter,
	/// Centre of the enemy group
	EnemyCenter,
	/// Centre of the field
	FieldCenter,
	/// Keep the previous keyframe's position
	Previous,
	/// Follow the first emitter
	Emitter,
	/// Value outside the known range
	Unknown(u8),
}

impl PositionSource {
	/// Decodes a 4-bit source value
	pub fn from_bits(value: u8) -> Self {
		match value {
			0 => Self::Fixed,
			1 => Self::Caster,
			2 => Self::Target,
			3 => Self::TargetCenter,
			4 => Self::CasterToTarget,
			5 => Self::PartyCenter,
			6 => Self::EnemyCenter,
			7 => Self::FieldCenter,
			8 => Self::Previous,
			9 => Self::Emitter,
			other => Self::Unknown(other),
		}
	}

	/// Encodes the source value
	pub fn bits(self) -> u8 {
		match self {
			Self::Fixed => 0,
			Self::Caster => 1,
			Self::Target => 2,
			Self::TargetCenter => 3,
			Self::CasterToTarget => 4,
			Self::PartyCenter => 5,
			Self::EnemyCenter => 6,
			Self::FieldCenter => 7,
			Self::Previous => 8,
			Self::Emitter => 9,
			Self::Unknown(value) => value,
		}
	}
}

/// Curve used between two camera keyframes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
	/// Linear
	Linear,
	/// Slow start
	EaseIn,
	/// Slow end
	EaseOut,
	/// Slow start and end
	EaseInOut,
	/// Jump at the keyframe
	Step,
	/// Smoothstep
	Smooth,
	/// Bounce at the end
	Bounce,
	/// Overshoot then settle
	Overshoot,
	/// Sine wave
	Sine,
	/// Exponential
	Exponential,
	/// Keep the start value until the end frame
	Hold,
	/// Value outside the known range
	Unknown(u8),
}

impl Interpolation {
	/// Decodes a 4-bit interpolation value
	pub fn from_bits(value: u8) -> Self {
		match value {
			0 => Self::Linear,
			1 => Self::EaseIn,
			2 => Self::EaseOut,
			3 => Self::EaseInOut,
			4 => Self::Step,
			5 => Self::Smooth,
			6 => Self::Bounce,
			7 => Self::Overshoot,
			8 => Self::Sine,
			9 => Self::Exponential,
			10 => Self::Hold,
			other => Self::Unknown(other),
		}
	}

	/// Encodes the interpolation value
	pub fn bits(self) -> u8 {
		match self {
			Self::Linear => 0,
			Self::EaseIn => 1,
			Self::EaseOut => 2,
			Self::EaseInOut => 3,
			Self::Step => 4,
			Self::Smooth => 5,
			Self::Bounce => 6,
			Self::Overshoot => 7,
			Self::Sine => 8,
			Self::Exponential => 9,
			Self::Hold => 10,
			Self::Unknown(value) => value,
		}
	}
}

/// Decoded camera command word.
///
/// ```text
/// bit  0      rotation track enabled
/// bit  1      position track enabled
/// bit  2      zoom track enabled
/// bits 3..6   position source
/// bits 7..10  interpolation
/// bits 11..15 kept verbatim
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CameraCommand {
	/// Rotation track enabled
	pub rotation: bool,
	/// Position track enabled
	pub position: bool,
	/// Zoom track enabled
	pub zoom: bool,
	/// Position source
	pub source: PositionSource,
	/// Interpolation curve
	pub interpolation: Interpolation,
	/// Bits 11..15, shifted down
	pub extra: u8,
}

impl CameraCommand {
	/// Decodes a command word
	pub fn from_word(word: u16) -> Self {
		Self {
			rotation: word & 0x1 != 0,
			position: word & 0x2 != 0,
			zoom: word & 0x4 != 0,
			source: PositionSource::from_bits(((word >> 3) & 0xF) as u8),
			interpolation: Interpolation::from_bits(((word >> 7) & 0xF) as u8),
			extra: (word >> 11) as u8,
		}
	}

	/// Encodes the command word
	pub fn to_word(self) -> u16 {
		u16::from(self.rotation)
			| u16::from(self.position) << 1
			| u16::from(self.zoom) << 2
			| u16::from(self.source.bits() & 0xF) << 3
			| u16::from(self.interpolation.bits() & 0xF) << 7
			| u16::from(self.extra & 0x1F) << 11
	}
}

impl Default for CameraCommand {
	fn default() -> Self {
		Self::from_word(0)
	}
}

impl Display for CameraCommand {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let tracks: Vec<&str> = [(self.rotation, "rot"), (self.position, "pos"), (self.zoom, "zoom")]
			.iter()
			.filter(|(on, _)| *on)
			.map(|(_, name)| *name)
			.collect();
		write!(f, "[{}] {:?} {:?}", tracks.join(","), self.source, self.interpolation)
	}
}

/// One camera keyframe slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct CameraKeyframe {
	/// Frame at which the keyframe is reached
	pub end_frame: u16,
	/// Pitch, yaw, roll
	pub rotation: [i16; 3],
	/// x, y, z
	pub position: [i16; 3],
	/// Zoom
	pub zoom: u16,
	/// Command word
	pub command: CameraCommand,
}

/// A 17-slot camera table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CameraTable {
	/// Number of active keyframes
	pub count: u16,
	/// All slots, active ones first
	pub keyframes: [CameraKeyframe; CAMERA_KEYFRAMES],
}

impl Default for CameraTable {
	fn default() -> Self {
		Self {
			count: 0,
			keyframes: [CameraKeyframe::default(); CAMERA_KEYFRAMES],
		}
	}
}

fn read_triplet(data: &[u8], offset: usize) -> [i16; 3] {
	[0, 1, 2].map(|i| read_u16(data, offset + i * 2) as i16)
}

fn write_triplet(data: &mut [u8], offset: usize, value: [i16; 3]) {
	for (i, v) in value.iter().enumerate() {
		write_u16(data, offset + i * 2, *v as u16);
	}
}

impl CameraTable {
	/// Decodes a table from the whole timeline buffer
	pub(super) fn decode(data: &[u8], layout: CameraLayout) -> Self {
		let mut table = Self {
			count: read_u16(data, layout.count),
			..Self::default()
		};
		for (i, key) in table.keyframes.iter_mut().enumerate() {
			*key = CameraKeyframe {
				end_frame: read_u16(data, layout.end_frame + i * 2),
				rotation: read_triplet(data, layout.rotation + i * 6),
				position: read_triplet(data, layout.position + i * 6),
				zoom: read_u16(data, layout.zoom + i * 2),
				command: CameraCommand::from_word(read_u16(data, layout.command + i * 2)),
			};
		}
		table
	}

	/// Encodes the table into the whole timeline buffer
	pub(super) fn encode(&self, data: &mut [u8], layout: CameraLayout) {
		write_u16(data, layout.count, self.count);
		for (i, key) in self.keyframes.iter().enumerate() {
			write_u16(data, layout.end_frame + i * 2, key.end_frame);
			write_triplet(data, layout.rotation + i * 6, key.rotation);
			write_triplet(data, layout.position + i * 6, key.position);
			write_u16(data, layout.zoom + i * 2, key.zoom);
			write_u16(data, layout.command + i * 2, key.command.to_word());
		}
	}

	/// Active keyframes
	pub fn active(&self) -> &[CameraKeyframe] {
		&self.keyframes[..usize::from(self.count).min(CAMERA_KEYFRAMES)]
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_layouts_fit_arrays() {
		for layout in CAMERA_LAYOUTS {
			assert!(layout.count + 2 <= layout.end_frame);
			assert!(layout.end_frame + CAMERA_KEYFRAMES * 2 <= layout.rotation);
			assert!(layout.rotation + CAMERA_KEYFRAMES * 6 <= layout.position);
			assert!(layout.position + CAMERA_KEYFRAMES * 6 <= layout.zoom);
			assert!(layout.zoom + CAMERA_KEYFRAMES * 2 <= layout.command);
		}
		assert_eq!(CAMERA_LAYOUTS[2].command + CAMERA_KEYFRAMES * 2, 0xB36);
	}

	#[test]
	fn test_command_word_fields() {
		let word = 0b10101_0011_0010_1_0_1;
		let cmd = CameraCommand::from_word(word);
		assert!(cmd.rotation);
		assert!(!cmd.position);
		assert!(cmd.zoom);
		assert_eq!(cmd.source, PositionSource::Target);
		assert_eq!(cmd.interpolation, Interpolation::EaseInOut);
		assert_eq!(cmd.extra, 0b10101);
		assert_eq!(cmd.to_word(), word);
	}

	#[test]
	fn test_unknown_enum_values_survive() {
		let word = (14 << 3) | (12 << 7);
		let cmd = CameraCommand::from_word(word);
		assert_eq!(cmd.source, PositionSource::Unknown(14));
		assert_eq!(cmd.interpolation, Interpolation::Unknown(12));
		assert_eq!(cmd.to_word(), word);
	}

	#[test]
	fn test_display() {
		let cmd = CameraCommand {
			rotation: true,
			position: true,
			zoom: false,
			source: PositionSource::Caster,
			interpolation: Interpolation::Linear,
			extra: 0,
		};
		assert_eq!(cmd.to_string(), "[rot,pos] Caster Linear");
	}

	#[test]
	fn test_table_roundtrip() {
		let layout = CameraTableKind::ForEachTarget.layout();
		let mut data = vec![0u8; 0x1624];
		let mut table = CameraTable {
			count: 2,
			..CameraTable::default()
		};
		table.keyframes[1] = CameraKeyframe {
			end_frame: 40,
			rotation: [-100, 200, 0],
			position: [10, -20, 30],
			zoom: 0x1000,
			command: CameraCommand::from_word(0x0187),
		};
		table.encode(&mut data, layout);

		assert_eq!(read_u16(&data, 0x8C0), 2);
		assert_eq!(read_u16(&data, 0x8C4 + 2), 40);
		let decoded = CameraTable::decode(&data, layout);
		assert_eq!(decoded, table);
		assert_eq!(decoded.active().len(), 2);
	}
}
