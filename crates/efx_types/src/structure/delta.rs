//! Delta calculators.
//!
//! Each calculator compares the size a record needs with the size its section
//! currently occupies in the live image. After the deltas are applied every
//! calculator returns zero.

use crate::codec::particle::{EMITTER_SIZE, PARTICLE_HEADER_SIZE};
use crate::codec::anim_curve::{ANIM_CURVE_SIZE, ANIM_TABLE_HEADER_SIZE};
use crate::codec::sound::FEDS_MAGIC;
use crate::codec::{
	AnimCurveTable, EffectData, FrameTable, ScriptStream, SectionCodec, SequenceStream,
	SoundDefinition,
};
use crate::config::EditorConfig;
use crate::container::SectionId;
use crate::error::EfxError;
use crate::memory::ByteSource;
use crate::records::EffectRecords;

use super::{MemoryLayout, SectionDelta};

fn live_len(layout: &MemoryLayout, id: SectionId) -> i64 {
	layout.extent(id).map_or(0, |e| e.len() as i64)
}

fn diff(desired: usize, current: i64) -> i64 {
	desired as i64 - current
}

/// Size change of the `frames` section
pub fn frames_delta(layout: &MemoryLayout, frames: &FrameTable) -> i64 {
	diff(frames.byte_size(), live_len(layout, SectionId::Frames))
}

/// Size change of the `animation` section.
///
/// A shrink of at most `tolerance` bytes is absorbed by padding the stream
/// when it is written, so no shift happens.
pub fn animation_delta(layout: &MemoryLayout, animation: &SequenceStream, tolerance: usize) -> i64 {
	let delta = diff(animation.byte_size(), live_len(layout, SectionId::Animation));
	if delta < 0 && delta >= -(tolerance as i64) {
		log::warn!("animation: padding {} byte(s) instead of shifting", -delta);
		return 0;
	}
	delta
}

/// Size change of the `script` section
pub fn script_delta(layout: &MemoryLayout, script: &ScriptStream) -> i64 {
	diff(script.byte_size(), live_len(layout, SectionId::Script))
}

/// Size change of the `effect_data` section, from the live emitter count.
///
/// A count claiming more emitters than the extent holds is capped at the
/// extent, as decoding does.
pub fn effect_data_delta<S: ByteSource + ?Sized>(
	source: &S,
	layout: &MemoryLayout,
	data: &EffectData,
) -> Result<i64, EfxError> {
	let live_count = source.read32(layout.header.pointer(SectionId::EffectData))? as usize;
	let counted = PARTICLE_HEADER_SIZE.saturating_add(live_count.saturating_mul(EMITTER_SIZE));
	let current = (counted as i64).min(live_len(layout, SectionId::EffectData));
	Ok(diff(data.byte_size(), current))
}

/// Size change of the `anim_table` section, from the live curve count capped
/// at the extent
pub fn anim_table_delta<S: ByteSource + ?Sized>(
	source: &S,
	layout: &MemoryLayout,
	table: &AnimCurveTable,
) -> Result<i64, EfxError> {
	let live_count = source.read32(layout.header.pointer(SectionId::AnimTable))? as usize;
	let counted = ANIM_TABLE_HEADER_SIZE.saturating_add(live_count.saturating_mul(ANIM_CURVE_SIZE));
	let current = (counted as i64).min(live_len(layout, SectionId::AnimTable));
	Ok(diff(table.byte_size(), current))
}

/// Size change of the `sound_def` section.
///
/// The live `data_size` field is the current size; padding between the block
/// and the next section stays where it is. Without a valid magic the whole
/// extent counts. Fails if a channel would start past the 16-bit offset range.
pub fn sound_def_delta<S: ByteSource + ?Sized>(
	source: &S,
	layout: &MemoryLayout,
	sound: &SoundDefinition,
) -> Result<i64, EfxError> {
	sound.check_offsets()?;
	let address = layout.header.pointer(SectionId::SoundDef);
	let extent = live_len(layout, SectionId::SoundDef);
	let current = if extent >= 8 && source.read_bytes(address, 4)? == FEDS_MAGIC {
		i64::from(source.read32(address + 4)?).min(extent)
	} else {
		extent
	};
	Ok(diff(sound.byte_size(), current))
}

/// Collects the non-zero deltas of every variable-size section.
///
/// Sections held undecoded are written back as they were and never resized.
pub fn compute_all_deltas<S: ByteSource + ?Sized>(
	source: &S,
	layout: &MemoryLayout,
	records: &EffectRecords,
	config: &EditorConfig,
) -> Result<Vec<SectionDelta>, EfxError> {
	let mut deltas = Vec::new();
	for id in [
		SectionId::Frames,
		SectionId::Animation,
		SectionId::Script,
		SectionId::EffectData,
		SectionId::AnimTable,
		SectionId::SoundDef,
	] {
		if records.is_undecoded(id) {
			log::debug!("{id}: kept verbatim, not resized");
			continue;
		}
		let delta = match id {
			SectionId::Frames => frames_delta(layout, &records.frames),
			SectionId::Animation => {
				animation_delta(layout, &records.animation, config.sequence_pad_tolerance)
			}
			SectionId::Script => script_delta(layout, &records.script),
			SectionId::EffectData => effect_data_delta(source, layout, &records.effect_data)?,
			SectionId::AnimTable => anim_table_delta(source, layout, &records.anim_table)?,
			_ => sound_def_delta(source, layout, &records.sound)?,
		};
		if delta != 0 {
			deltas.push(SectionDelta::new(id, delta));
		}
	}
	Ok(deltas)
}
