//! The decoded contents of every section of one effect.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::codec::{
	AnimCurveTable, EffectData, FlagBlock, FrameTable, ScriptStream, SectionCodec, SequenceStream,
	SoundDefinition, Timeline, TimingCurve,
};
use crate::container::{Extent, HEADER_SIZE, Header, SECTION_COUNT, SectionId, Violation, compute_extents};
use crate::error::EfxError;
use crate::memory::ByteSource;

/// Logical records of one effect
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectRecords {
	/// Sprite framesets
	pub frames: FrameTable,
	/// Sprite sequencing stream
	pub animation: SequenceStream,
	/// Effect control script
	pub script: ScriptStream,
	/// Particle header and emitters
	pub effect_data: EffectData,
	/// Animation curves
	pub anim_table: AnimCurveTable,
	/// Timing curves, `None` when the section is absent
	pub timing_curve: Option<TimingCurve>,
	/// Effect and sound flags
	pub flags: FlagBlock,
	/// Timeline
	pub timeline: Timeline,
	/// Sound definition
	pub sound: SoundDefinition,
	/// Raw texture data
	#[serde(skip)]
	pub texture: Vec<u8>,
	/// Sections that failed to decode, kept verbatim
	#[serde(skip)]
	undecoded: BTreeMap<SectionId, Vec<u8>>,
}

/// Section extents clamped to `[base + HEADER_SIZE, end]`
fn clamped_extents(header: &Header, base: u32, end: u32) -> [Option<Extent>; SECTION_COUNT] {
	let lowest = base.saturating_add(HEADER_SIZE as u32).min(end);
	compute_extents(header, end).map(|extent| {
		extent.map(|e| Extent {
			start: e.start.clamp(lowest, end),
			end: e.end.clamp(lowest, end),
		})
	})
}

struct Decoder<'a, S: ?Sized> {
	source: &'a S,
	extents: [Option<Extent>; SECTION_COUNT],
	lenient: bool,
	violations: Vec<Violation>,
	undecoded: BTreeMap<SectionId, Vec<u8>>,
}

impl<S: ByteSource + ?Sized> Decoder<'_, S> {
	fn span(&self, id: SectionId) -> (u32, usize) {
		self.extents[id.index()].map_or((0, 0), |e| (e.start, e.len()))
	}

	fn keep_raw(&mut self, id: SectionId, err: EfxError) -> Result<(), EfxError> {
		if !self.lenient {
			return Err(err);
		}
		let (start, len) = self.span(id);
		log::warn!("{id}: keeping {len} byte(s) undecoded: {err}");
		self.violations.push(Violation::Undecodable {
			section: id,
			reason: err.to_string(),
		});
		self.undecoded.insert(id, self.source.read_bytes(start, len).unwrap_or_default());
		Ok(())
	}

	fn section<T: SectionCodec + Default>(&mut self) -> Result<T, EfxError> {
		let (start, len) = self.span(T::SECTION);
		match T::parse(self.source, start, len) {
			Ok(record) => Ok(record),
			Err(err) => self.keep_raw(T::SECTION, err).map(|()| T::default()),
		}
	}

	fn texture(&mut self) -> Result<Vec<u8>, EfxError> {
		let (start, len) = self.span(SectionId::Texture);
		match self.source.read_bytes(start, len) {
			Ok(bytes) => Ok(bytes),
			Err(err) => self.keep_raw(SectionId::Texture, err).map(|()| Vec::new()),
		}
	}

	fn records(&mut self, header: &Header) -> Result<EffectRecords, EfxError> {
		let timing_curve = if header.is_present(SectionId::TimingCurve) {
			Some(self.section()?)
		} else {
			None
		};
		Ok(EffectRecords {
			frames: self.section()?,
			animation: self.section()?,
			script: self.section()?,
			effect_data: self.section()?,
			anim_table: self.section()?,
			timing_curve,
			flags: self.section()?,
			timeline: self.section()?,
			sound: self.section()?,
			texture: self.texture()?,
			undecoded: std::mem::take(&mut self.undecoded),
		})
	}
}

impl EffectRecords {
	/// Decodes every section of the effect whose header sits at `base` and
	/// whose last section ends at `end`, failing on the first section that
	/// does not decode
	pub fn parse<S: ByteSource + ?Sized>(
		source: &S,
		header: &Header,
		base: u32,
		end: u32,
	) -> Result<Self, EfxError> {
		Decoder {
			source,
			extents: clamped_extents(header, base, end),
			lenient: false,
			violations: Vec::new(),
			undecoded: BTreeMap::new(),
		}
		.records(header)
	}

	/// Like [`EffectRecords::parse`], but a section that does not decode is
	/// kept verbatim and reported as [`Violation::Undecodable`]
	pub fn parse_lenient<S: ByteSource + ?Sized>(
		source: &S,
		header: &Header,
		base: u32,
		end: u32,
	) -> Result<(Self, Vec<Violation>), EfxError> {
		let mut decoder = Decoder {
			source,
			extents: clamped_extents(header, base, end),
			lenient: true,
			violations: Vec::new(),
			undecoded: BTreeMap::new(),
		};
		let records = decoder.records(header)?;
		Ok((records, decoder.violations))
	}

	/// Verbatim bytes of a section that did not decode
	pub fn undecoded(&self, id: SectionId) -> Option<&[u8]> {
		self.undecoded.get(&id).map(Vec::as_slice)
	}

	/// Whether a section is held verbatim
	pub fn is_undecoded(&self, id: SectionId) -> bool {
		self.undecoded.contains_key(&id)
	}

	/// Drops the verbatim bytes of a section so its record is written instead
	pub fn discard_undecoded(&mut self, id: SectionId) -> Option<Vec<u8>> {
		self.undecoded.remove(&id)
	}

	/// Encodes one section; `None` for an absent timing curve
	pub fn encode_section(&self, id: SectionId) -> Option<Vec<u8>> {
		if let Some(raw) = self.undecoded.get(&id) {
			return Some(raw.clone());
		}
		Some(match id {
			SectionId::Frames => self.frames.serialize_to_bytes(),
			SectionId::Animation => self.animation.serialize_to_bytes(),
			SectionId::Script => self.script.serialize_to_bytes(),
			SectionId::EffectData => self.effect_data.serialize_to_bytes(),
			SectionId::AnimTable => self.anim_table.serialize_to_bytes(),
			SectionId::TimingCurve => self.timing_curve.as_ref()?.serialize_to_bytes(),
			SectionId::EffectFlags => self.flags.serialize_to_bytes(),
			SectionId::Timeline => self.timeline.serialize_to_bytes(),
			SectionId::SoundDef => self.sound.serialize_to_bytes(),
			SectionId::Texture => self.texture.clone(),
		})
	}

	/// Logical size of one section
	pub fn byte_size(&self, id: SectionId) -> usize {
		if let Some(raw) = self.undecoded.get(&id) {
			return raw.len();
		}
		match id {
			SectionId::Frames => self.frames.byte_size(),
			SectionId::Animation => self.animation.byte_size(),
			SectionId::Script => self.script.byte_size(),
			SectionId::EffectData => self.effect_data.byte_size(),
			SectionId::AnimTable => self.anim_table.byte_size(),
			SectionId::TimingCurve => self.timing_curve.as_ref().map_or(0, TimingCurve::byte_size),
			SectionId::EffectFlags => self.flags.byte_size(),
			SectionId::Timeline => self.timeline.byte_size(),
			SectionId::SoundDef => self.sound.byte_size(),
			SectionId::Texture => self.texture.len(),
		}
	}
}
