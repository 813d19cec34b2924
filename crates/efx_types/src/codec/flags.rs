//! Effect and sound flag words (`effect_flags` section).

use bitflags::bitflags;
use serde::Serialize;

use crate::container::SectionId;
use crate::error::EfxError;
use crate::memory::ByteSource;

use super::{SectionCodec, require_len};

/// Size of the section in bytes
pub const FLAG_BLOCK_SIZE: usize = 8;

bitflags! {
	/// Behaviour switches of the effect.
	///
	/// Bits without a name are kept as-is.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
	#[serde(transparent)]
	pub struct EffectFlags: u32 {
		/// Restart at the loop frame when the timeline ends
		const LOOPING = 1 << 0;
		/// Emitters follow the caster
		const FOLLOW_CASTER = 1 << 1;
		/// Emitters follow the current target
		const FOLLOW_TARGET = 1 << 2;
		/// Coordinates are in screen space
		const SCREEN_SPACE = 1 << 3;
		/// Particle timing is driven by the timing curve section
		const TIMING_CURVE = 1 << 8;

		const _ = !0;
	}
}

bitflags! {
	/// Sound playback switches.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
	#[serde(transparent)]
	pub struct SoundFlags: u32 {
		/// The sound definition is played
		const ENABLED = 1 << 0;
		/// Volume and pan follow the emitter position
		const POSITIONAL = 1 << 1;
		/// Volume is driven by the timing curve section
		const TIMING_VOLUME = 1 << 8;

		const _ = !0;
	}
}

/// Contents of the `effect_flags` section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct FlagBlock {
	/// Effect flag word
	pub effect: EffectFlags,
	/// Sound flag word
	pub sound: SoundFlags,
}

impl FlagBlock {
	/// Returns `true` if either word references the timing curve section
	pub fn uses_timing_curve(&self) -> bool {
		self.effect.contains(EffectFlags::TIMING_CURVE)
			|| self.sound.contains(SoundFlags::TIMING_VOLUME)
	}

	/// Clears every bit that references the timing curve section
	pub fn clear_timing_curve(&mut self) {
		self.effect.remove(EffectFlags::TIMING_CURVE);
		self.sound.remove(SoundFlags::TIMING_VOLUME);
	}
}

impl SectionCodec for FlagBlock {
	const SECTION: SectionId = SectionId::EffectFlags;

	fn parse<S: ByteSource + ?Sized>(
		source: &S,
		address: u32,
		len: usize,
	) -> Result<Self, EfxError> {
		require_len(Self::SECTION, FLAG_BLOCK_SIZE, len)?;
		Ok(Self {
			effect: EffectFlags::from_bits_retain(source.read32(address)?),
			sound: SoundFlags::from_bits_retain(source.read32(address + 4)?),
		})
	}

	fn serialize_to_bytes(&self) -> Vec<u8> {
		let mut bytes = Vec::with_capacity(FLAG_BLOCK_SIZE);
		bytes.extend_from_slice(&self.effect.bits().to_le_bytes());
		bytes.extend_from_slice(&self.sound.bits().to_le_bytes());
		bytes
	}

	fn byte_size(&self) -> usize {
		FLAG_BLOCK_SIZE
	}
}
