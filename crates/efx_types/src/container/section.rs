//! Section identifiers and the section descriptor table.

use std::fmt::Display;

use serde::Serialize;

/// Number of sections addressed by the header
pub const SECTION_COUNT: usize = 10;

/// Sections of an effect container, in nominal header order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionId {
	/// Sprite framesets
	Frames = 0,
	/// Sprite sequencing bytecode
	Animation = 1,
	/// Effect control script bytecode
	Script = 2,
	/// Particle header and emitters
	EffectData = 3,
	/// Animation curve table
	AnimTable = 4,
	/// Nibble-packed timing curves (optional)
	TimingCurve = 5,
	/// Effect and sound flag words
	EffectFlags = 6,
	/// Timeline channels, cameras and colour tracks
	Timeline = 7,
	/// `feds` sound definition block
	SoundDef = 8,
	/// Texture data
	Texture = 9,
}

impl SectionId {
	/// All sections in nominal order
	pub const ALL: [Self; SECTION_COUNT] = [
		Self::Frames,
		Self::Animation,
		Self::Script,
		Self::EffectData,
		Self::AnimTable,
		Self::TimingCurve,
		Self::EffectFlags,
		Self::Timeline,
		Self::SoundDef,
		Self::Texture,
	];

	/// Position of the section in the header
	pub const fn index(self) -> usize {
		self as usize
	}

	/// Byte offset of the section pointer within the header
	pub const fn header_offset(self) -> usize {
		self.index() * 4
	}

	/// Returns `true` if a zero pointer marks the section as absent
	pub const fn is_optional(self) -> bool {
		matches!(self, Self::TimingCurve)
	}

	/// Canonical section name
	pub const fn name(self) -> &'static str {
		SECTIONS[self.index()].name
	}

	/// Looks a section up by its canonical name
	pub fn from_name(name: &str) -> Option<Self> {
		SECTIONS.iter().find(|d| d.name == name).map(|d| d.id)
	}
}

impl Display for SectionId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.name())
	}
}

/// Static description of one header slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionDescriptor {
	/// Section identifier
	pub id: SectionId,
	/// Canonical name
	pub name: &'static str,
	/// Byte offset of the pointer within the header
	pub header_offset: usize,
	/// Whether a zero pointer means "absent"
	pub optional: bool,
}

const fn descriptor(id: SectionId, name: &'static str) -> SectionDescriptor {
	SectionDescriptor {
		id,
		name,
		header_offset: id.header_offset(),
		optional: id.is_optional(),
	}
}

/// The section table, in nominal header order
pub const SECTIONS: [SectionDescriptor; SECTION_COUNT] = [
	descriptor(SectionId::Frames, "frames"),
	descriptor(SectionId::Animation, "animation"),
	descriptor(SectionId::Script, "script"),
	descriptor(SectionId::EffectData, "effect_data"),
	descriptor(SectionId::AnimTable, "anim_table"),
	descriptor(SectionId::TimingCurve, "timing_curve"),
	descriptor(SectionId::EffectFlags, "effect_flags"),
	descriptor(SectionId::Timeline, "timeline"),
	descriptor(SectionId::SoundDef, "sound_def"),
	descriptor(SectionId::Texture, "texture"),
];
