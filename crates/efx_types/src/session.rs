//! Editing session.
//!
//! A [`Session`] owns the decoded records of one effect together with a
//! snapshot of the records as they were loaded. Edits go to the records; a
//! [`Session::commit`] works out which sections changed size, shifts the live
//! image accordingly and writes every section back.
//!
//! ```
//! use efx_types::config::EditorConfig;
//! use efx_types::session::Session;
//!
//! # fn main() -> Result<(), efx_types::error::EfxError> {
//! # let bytes = efx_types::session::tests_support::sample_effect(0x8010_0000);
//! let mut session = Session::from_buffer(&bytes, 0x8010_0000, EditorConfig::default())?;
//! session.records_mut().effect_data.add_emitter(Default::default());
//! let rebuilt = session.to_bytes();
//! assert_eq!(rebuilt.len(), bytes.len() + 0xC4);
//! # Ok(())
//! # }
//! ```

use serde::Serialize;

use crate::config::EditorConfig;
use crate::container::{HEADER_SIZE, Header, SectionId, Violation, validate};
use crate::error::EfxError;
use crate::memory::{ByteSource, MemoryImage, VecMemory};
use crate::records::EffectRecords;
use crate::structure::{self, MemoryLayout, SectionDelta, read_memory_layout};

/// One open effect
#[derive(Debug, Clone)]
pub struct Session {
	config: EditorConfig,
	base: u32,
	end: u32,
	header: Header,
	violations: Vec<Violation>,
	current: EffectRecords,
	original: EffectRecords,
}

/// Size difference of one section against the loaded records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizeChange {
	/// Section
	pub section: SectionId,
	/// Size when loaded
	pub before: usize,
	/// Current logical size
	pub after: usize,
}

impl SizeChange {
	/// Signed difference
	pub fn delta(&self) -> i64 {
		self.after as i64 - self.before as i64
	}
}

impl Session {
	fn open<S: ByteSource + ?Sized>(
		source: &S,
		base: u32,
		end: u32,
		config: EditorConfig,
	) -> Result<Self, EfxError> {
		let header = Header::parse(source, base)?;
		let mut violations = validate(&header, base, end, config.max_section_size);
		for violation in &violations {
			log::warn!("{violation}");
		}

		let (records, undecodable) = EffectRecords::parse_lenient(source, &header, base, end)?;
		violations.extend(undecodable);
		log::info!(
			"opened effect at 0x{base:08X}..0x{end:08X}, {} emitter(s), {} violation(s)",
			records.effect_data.emitters.len(),
			violations.len()
		);

		Ok(Self {
			config,
			base,
			end,
			header,
			violations,
			original: records.clone(),
			current: records,
		})
	}

	/// Opens an effect from a file buffer whose first byte sits at `base`
	pub fn from_buffer(bytes: &[u8], base: u32, config: EditorConfig) -> Result<Self, EfxError> {
		if bytes.len() < HEADER_SIZE {
			return Err(EfxError::insufficient_data(SectionId::Frames, HEADER_SIZE, bytes.len()));
		}
		let end = u32::try_from(u64::from(base) + bytes.len() as u64)
			.map_err(|_| EfxError::out_of_bounds(base, bytes.len()))?;
		let image = VecMemory::from_bytes(base, bytes.to_vec());
		Self::open(&image, base, end, config)
	}

	/// Opens the `size`-byte effect at `base` in a live image
	pub fn from_memory<M: MemoryImage + ?Sized>(
		mem: &M,
		base: u32,
		size: usize,
		config: EditorConfig,
	) -> Result<Self, EfxError> {
		if !mem.contains(base, size) {
			return Err(EfxError::out_of_bounds(base, size));
		}
		Self::open(mem, base, base + size as u32, config)
	}

	/// Header as last committed
	pub fn header(&self) -> &Header {
		&self.header
	}

	/// Address of the header
	pub fn base(&self) -> u32 {
		self.base
	}

	/// One past the last byte of the effect
	pub fn end(&self) -> u32 {
		self.end
	}

	/// Configuration in use
	pub fn config(&self) -> &EditorConfig {
		&self.config
	}

	/// Header and decoding problems found when the effect was opened
	pub fn violations(&self) -> &[Violation] {
		&self.violations
	}

	/// Current records
	pub fn records(&self) -> &EffectRecords {
		&self.current
	}

	/// Current records, for editing
	pub fn records_mut(&mut self) -> &mut EffectRecords {
		&mut self.current
	}

	/// Fails with [`EfxError::Validation`] if opening found any violation
	pub fn ensure_valid(&self) -> Result<(), EfxError> {
		if self.violations.is_empty() {
			Ok(())
		} else {
			Err(EfxError::Validation(self.violations.clone()))
		}
	}

	/// Records as they were loaded
	pub fn original(&self) -> &EffectRecords {
		&self.original
	}

	/// Sections whose logical size differs from the loaded one
	pub fn size_changes_since_load(&self) -> Vec<SizeChange> {
		SectionId::ALL
			.iter()
			.map(|&section| SizeChange {
				section,
				before: self.original.byte_size(section),
				after: self.current.byte_size(section),
			})
			.filter(|change| change.before != change.after)
			.collect()
	}

	fn layout(&self) -> MemoryLayout {
		MemoryLayout {
			base: self.base,
			end: self.end,
			header: self.header,
		}
	}

	fn adopt(&mut self, layout: MemoryLayout) {
		self.header = layout.header;
		self.end = layout.end;
	}

	/// Writes the records to the live image.
	///
	/// Sections whose size changed are made room for first. Every section is
	/// checked to fit before anything is written. Returns `true` if the
	/// layout changed.
	pub fn commit<M: MemoryImage + ?Sized>(&mut self, mem: &mut M) -> Result<bool, EfxError> {
		let live = read_memory_layout(mem, self.base, self.end)?;
		let deltas = structure::compute_all_deltas(mem, &live, &self.current, &self.config)?;
		for SectionDelta {
			section,
			delta,
		} in &deltas
		{
			log::debug!("{section}: size delta {delta}");
		}

		let image = u64::from(mem.base())..mem.end();
		let plan = structure::plan_structure_changes(&live, &deltas, image, &self.config)?;

		let extents = plan.after.extents();
		let mut writes = Vec::new();
		for id in SectionId::ALL {
			let (Some(extent), Some(mut bytes)) = (extents[id.index()], self.current.encode_section(id))
			else {
				continue;
			};
			if bytes.len() > extent.len() {
				return Err(EfxError::capacity(format!(
					"{id}: {} bytes do not fit the {} byte section",
					bytes.len(),
					extent.len()
				)));
			}
			if id == SectionId::Animation {
				bytes.resize(extent.len(), 0);
			}
			if bytes.is_empty() {
				continue;
			}
			writes.push((extent.start, bytes));
		}

		let changed = structure::apply_plan(mem, &plan)?;
		for (address, bytes) in &writes {
			mem.write_bytes(*address, bytes)?;
		}
		mem.refresh();

		self.adopt(plan.after);
		log::info!("committed {} section(s), layout changed: {changed}", writes.len());
		Ok(changed)
	}

	/// Inserts the timing curve section in the live image.
	///
	/// A default record is created unless one already exists.
	pub fn add_timing_curve<M: MemoryImage + ?Sized>(&mut self, mem: &mut M) -> Result<bool, EfxError> {
		let mut layout = self.layout();
		let changed = structure::add_timing_curve(mem, &mut layout, &self.config)?;
		self.adopt(layout);
		if self.current.timing_curve.is_none() {
			self.current.timing_curve = Some(Default::default());
		}
		Ok(changed)
	}

	/// Removes the timing curve section from the live image and the records
	pub fn remove_timing_curve<M: MemoryImage + ?Sized>(
		&mut self,
		mem: &mut M,
	) -> Result<bool, EfxError> {
		let mut layout = self.layout();
		let changed = structure::remove_timing_curve(mem, &mut layout, &self.config)?;
		self.adopt(layout);
		self.current.timing_curve = None;
		self.current.discard_undecoded(SectionId::TimingCurve);
		self.current.flags.clear_timing_curve();
		Ok(changed)
	}

	/// Rebuilds a standalone container with freshly laid out pointers
	pub fn to_bytes(&self) -> Vec<u8> {
		let mut header = Header::default();
		let mut body = Vec::new();
		let mut cursor = self.base + HEADER_SIZE as u32;

		for id in SectionId::ALL {
			let Some(bytes) = self.current.encode_section(id) else {
				header.set_pointer(id, 0);
				continue;
			};
			header.set_pointer(id, cursor);
			cursor += bytes.len() as u32;
			body.extend(bytes);
		}

		let mut out = header.to_bytes().to_vec();
		out.extend(body);
		out
	}

	/// Ends the session, handing back the current records
	pub fn close(self) -> EffectRecords {
		log::debug!("closing effect at 0x{:08X}", self.base);
		self.current
	}
}

/// Builders shared by doctests and integration tests.
#[doc(hidden)]
pub mod tests_support {
	use crate::codec::{
		AnimCurve, AnimCurveTable, EffectData, Emitter, FlagBlock, Frame, FrameTable, Frameset,
		ScriptInstruction, ScriptStream, SectionCodec, SequenceInstruction, SequenceStream,
		SmdEvent, SoundChannel, SoundDefinition, Timeline,
	};
	use crate::container::{HEADER_SIZE, Header, SectionId};

	/// A small well-formed effect: 3 emitters, 2 curves, no timing curve
	pub fn sample_effect(base: u32) -> Vec<u8> {
		let mut effect_data = EffectData::default();
		for i in 0..3 {
			let mut emitter = Emitter::new();
			emitter.set_field("emitter_type", i + 1);
			effect_data.add_emitter(emitter);
		}

		let sections: [Option<Vec<u8>>; 10] = [
			Some(
				FrameTable {
					framesets: vec![Frameset {
						frames: vec![Frame::default()],
					}],
				}
				.serialize_to_bytes(),
			),
			Some(
				SequenceStream {
					instructions: vec![SequenceInstruction::display(0, 8), SequenceInstruction::End],
				}
				.serialize_to_bytes(),
			),
			Some(
				ScriptStream {
					instructions: [
						ScriptInstruction::call("wait", &[4]),
						ScriptInstruction::call("set_alpha", &[1, 128]),
						ScriptInstruction::call("end", &[]),
					]
					.into_iter()
					.flatten()
					.collect(),
					trailing: Vec::new(),
				}
				.serialize_to_bytes(),
			),
			Some(effect_data.serialize_to_bytes()),
			Some(
				AnimCurveTable {
					curves: vec![AnimCurve::flat(1), AnimCurve::flat(2)],
				}
				.serialize_to_bytes(),
			),
			None,
			Some(FlagBlock::default().serialize_to_bytes()),
			Some(Timeline::default().serialize_to_bytes()),
			Some(
				SoundDefinition {
					resource_id: 7,
					reserved: [0; 8],
					channels: vec![SoundChannel {
						events: vec![SmdEvent::note(0x40, 0x7F)],
					}],
				}
				.serialize_to_bytes(),
			),
			Some(vec![0x5A; 0x40]),
		];

		let mut header = Header::default();
		let mut body = Vec::new();
		let mut cursor = base + HEADER_SIZE as u32;
		for (id, bytes) in SectionId::ALL.iter().zip(sections) {
			if let Some(bytes) = bytes {
				header.set_pointer(*id, cursor);
				cursor += bytes.len() as u32;
				body.extend(bytes);
			}
		}
		let mut out = header.to_bytes().to_vec();
		out.extend(body);
		out
	}
}

#[cfg(test)]
mod tests {
	use super::tests_support::sample_effect;
	use super::*;
	use crate::codec::{Emitter, SequenceInstruction};
	use crate::error::ErrorKind;
	use crate::memory::ByteSink;

	const BASE: u32 = 0x8010_0000;

	fn load(bytes: &[u8]) -> VecMemory {
		let mut mem = VecMemory::new(BASE, 0x4000);
		mem.write_bytes(BASE, bytes).unwrap();
		mem
	}

	fn set_pointer(bytes: &mut [u8], id: SectionId, pointer: u32) {
		let at = id.header_offset();
		bytes[at..at + 4].copy_from_slice(&pointer.to_le_bytes());
	}

	fn pointer(bytes: &[u8], id: SectionId) -> usize {
		let at = id.header_offset();
		(u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap()) - BASE) as usize
	}

	#[test]
	fn test_from_buffer_roundtrip() {
		let bytes = sample_effect(BASE);
		let session = Session::from_buffer(&bytes, BASE, EditorConfig::default()).unwrap();
		assert!(session.violations().is_empty());
		assert_eq!(session.records().effect_data.emitters.len(), 3);
		assert!(session.records().timing_curve.is_none());
		assert_eq!(session.to_bytes(), bytes);
		assert!(session.size_changes_since_load().is_empty());
	}

	#[test]
	fn test_size_changes_since_load() {
		let bytes = sample_effect(BASE);
		let mut session = Session::from_buffer(&bytes, BASE, EditorConfig::default()).unwrap();
		session.records_mut().effect_data.add_emitter(Emitter::new());
		session.records_mut().anim_table.curves.pop();

		let changes = session.size_changes_since_load();
		assert_eq!(changes.len(), 2);
		assert_eq!(changes[0].section, SectionId::EffectData);
		assert_eq!(changes[0].delta(), 196);
		assert_eq!(changes[1].delta(), -160);
	}

	#[test]
	fn test_from_memory_rejects_out_of_image() {
		let mem = VecMemory::new(BASE, 0x100);
		assert!(Session::from_memory(&mem, BASE, 0x200, EditorConfig::default()).is_err());
	}

	#[test]
	fn test_ensure_valid_promotes_violations() {
		let mut bytes = sample_effect(BASE);
		assert!(Session::from_buffer(&bytes, BASE, EditorConfig::default()).unwrap().ensure_valid().is_ok());

		// script before animation
		bytes[8..12].copy_from_slice(&(BASE + HEADER_SIZE as u32).to_le_bytes());
		let session = Session::from_buffer(&bytes, BASE, EditorConfig::default()).unwrap();
		let err = session.ensure_valid().unwrap_err();
		assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
	}

	#[test]
	fn test_short_buffer_rejected() {
		assert!(Session::from_buffer(&[0u8; 12], BASE, EditorConfig::default()).is_err());
	}

	#[test]
	fn test_close_returns_current_records() {
		let bytes = sample_effect(BASE);
		let mut session = Session::from_buffer(&bytes, BASE, EditorConfig::default()).unwrap();
		session.records_mut().flags.effect = crate::codec::EffectFlags::LOOPING;
		let records = session.close();
		assert_eq!(records.flags.effect, crate::codec::EffectFlags::LOOPING);
	}

	#[test_log::test]
	fn test_texture_pointer_past_end_is_reported() {
		let mut bytes = sample_effect(BASE);
		let end = BASE + bytes.len() as u32;
		set_pointer(&mut bytes, SectionId::Texture, end + 0x100);

		let session = Session::from_buffer(&bytes, BASE, EditorConfig::default()).unwrap();
		assert!(session.violations().contains(&Violation::OutOfRange {
			section: SectionId::Texture,
			pointer: end + 0x100,
		}));
		assert!(session.records().texture.is_empty());
		assert_eq!(session.records().sound.resource_id, 7);
		assert_eq!(session.ensure_valid().unwrap_err().kind(), ErrorKind::Validation);

		// nothing to write for the texture, the rest is unchanged
		let mut mem = load(&bytes);
		let snapshot = mem.as_slice().to_vec();
		let mut session = Session::from_memory(&mem, BASE, bytes.len(), EditorConfig::default()).unwrap();
		assert!(!session.commit(&mut mem).unwrap());
		assert_eq!(mem.as_slice(), &snapshot[..]);
	}

	#[test_log::test]
	fn test_undecodable_sound_kept_verbatim() {
		let mut bytes = sample_effect(BASE);
		let sound = pointer(&bytes, SectionId::SoundDef);
		bytes[sound..sound + 4].copy_from_slice(b"xeds");

		let session = Session::from_buffer(&bytes, BASE, EditorConfig::default()).unwrap();
		assert!(matches!(
			session.violations(),
			[Violation::Undecodable {
				section: SectionId::SoundDef,
				..
			}]
		));
		assert!(session.records().is_undecoded(SectionId::SoundDef));
		assert_eq!(session.records().undecoded(SectionId::SoundDef), Some(&bytes[sound..sound + 32]));
		assert_eq!(session.records().effect_data.emitters.len(), 3);
		assert_eq!(session.to_bytes(), bytes);
		assert_eq!(session.ensure_valid().unwrap_err().kind(), ErrorKind::Validation);

		// the raw block follows the rest of the effect when it moves
		let mut mem = load(&bytes);
		let mut session = Session::from_memory(&mem, BASE, bytes.len(), EditorConfig::default()).unwrap();
		session.records_mut().effect_data.add_emitter(Emitter::new());
		assert!(session.commit(&mut mem).unwrap());
		let moved = session.header().pointer(SectionId::SoundDef);
		assert_eq!(moved, BASE + sound as u32 + 196);
		assert_eq!(mem.read_bytes(moved, 32).unwrap(), &bytes[sound..sound + 32]);
	}

	#[test]
	fn test_discarding_undecoded_bytes_writes_the_record() {
		let mut bytes = sample_effect(BASE);
		let sound = pointer(&bytes, SectionId::SoundDef);
		bytes[sound..sound + 4].copy_from_slice(b"xeds");

		let mut session = Session::from_buffer(&bytes, BASE, EditorConfig::default()).unwrap();
		assert!(session.records_mut().discard_undecoded(SectionId::SoundDef).is_some());
		assert!(!session.records().is_undecoded(SectionId::SoundDef));
		let rebuilt = session.to_bytes();
		assert_eq!(&rebuilt[sound..sound + 4], b"feds");
	}

	#[test_log::test]
	fn test_small_animation_shrink_commits_as_padding() {
		let bytes = sample_effect(BASE);
		let animation = pointer(&bytes, SectionId::Animation);
		let mut mem = load(&bytes);
		let mut session = Session::from_memory(&mem, BASE, bytes.len(), EditorConfig::default()).unwrap();
		let header = *session.header();

		session.records_mut().animation.instructions = vec![SequenceInstruction::End];
		assert!(!session.commit(&mut mem).unwrap());
		assert_eq!(session.header(), &header);
		assert_eq!(Header::parse(&mem, BASE).unwrap(), header);
		assert_eq!(mem.read_bytes(BASE + animation as u32, 4).unwrap(), vec![0x01, 0, 0, 0]);
	}

	#[test_log::test]
	fn test_unedited_commit_with_overstated_emitter_count() {
		let mut bytes = sample_effect(BASE);
		let effect_data = pointer(&bytes, SectionId::EffectData);
		bytes[effect_data..effect_data + 4].copy_from_slice(&9u32.to_le_bytes());
		let mut mem = load(&bytes);

		let mut session = Session::from_memory(&mem, BASE, bytes.len(), EditorConfig::default()).unwrap();
		assert_eq!(session.records().effect_data.emitters.len(), 3);
		assert!(!session.commit(&mut mem).unwrap());
		assert_eq!(mem.read32(BASE + effect_data as u32).unwrap(), 3);
	}
}
