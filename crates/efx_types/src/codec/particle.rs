//! Particle header and emitter records (`effect_data` section).
//!
//! ```text
//! Offset              Size   Field
//! ------------------  -----  ------------------------------
//! 0x00                0x14   particle header
//! 0x14 + i * 0xC4     0xC4   emitter i (i < emitter_count)
//! ```
//!
//! Both records are fixed layouts described by field schemas; the emitter
//! schema carries 100 fields.

use serde::Serialize;

use crate::container::SectionId;
use crate::error::EfxError;
use crate::memory::{ByteSink, ByteSource};
use crate::schema::{self, FieldDef, FieldType, Record, Schema};

use super::{SectionCodec, require_len};

/// Size of the particle header in bytes
pub const PARTICLE_HEADER_SIZE: usize = 0x14;

/// Size of one emitter record in bytes
pub const EMITTER_SIZE: usize = 0xC4;

/// Particle header layout
pub const PARTICLE_HEADER_SCHEMA: &Schema = &[
	FieldDef::new("emitter_count", 0x00, FieldType::U32),
	FieldDef::new("gravity_x", 0x04, FieldType::S16),
	FieldDef::new("gravity_y", 0x06, FieldType::S16),
	FieldDef::new("gravity_z", 0x08, FieldType::S16),
	FieldDef::new("reserved_0", 0x0A, FieldType::U16),
	FieldDef::new("inertia_threshold", 0x0C, FieldType::U32),
	FieldDef::new("reserved_1", 0x10, FieldType::U32),
];

/// Emitter layout
pub const EMITTER_SCHEMA: &Schema = &[
	FieldDef::new("emitter_type", 0x00, FieldType::U8),
	FieldDef::new("blend_mode", 0x01, FieldType::U8),
	FieldDef::new("texture_slot", 0x02, FieldType::U8),
	FieldDef::new("control_flags", 0x03, FieldType::U8),
	FieldDef::new("position_curve", 0x04, FieldType::U8),
	FieldDef::new("spread_curve", 0x05, FieldType::U8),
	FieldDef::new("velocity_curve", 0x06, FieldType::U8),
	FieldDef::new("inertia_curve", 0x07, FieldType::U8),
	FieldDef::new("weight_curve", 0x08, FieldType::U8),
	FieldDef::new("drag_curve", 0x09, FieldType::U8),
	FieldDef::new("lifetime_curve", 0x0A, FieldType::U8),
	FieldDef::new("target_offset_curve", 0x0B, FieldType::U8),
	FieldDef::new("homing_curve", 0x0C, FieldType::U8),
	FieldDef::new("color_curve", 0x0D, FieldType::U8),
	FieldDef::new("size_curve", 0x0E, FieldType::U8),
	FieldDef::new("alpha_curve", 0x0F, FieldType::U8),
	FieldDef::new("position_start_x", 0x10, FieldType::S16),
	FieldDef::new("position_start_y", 0x12, FieldType::S16),
	FieldDef::new("position_start_z", 0x14, FieldType::S16),
	FieldDef::new("position_end_x", 0x16, FieldType::S16),
	FieldDef::new("position_end_y", 0x18, FieldType::S16),
	FieldDef::new("position_end_z", 0x1A, FieldType::S16),
	FieldDef::new("spread_start_x", 0x1C, FieldType::S16),
	FieldDef::new("spread_start_y", 0x1E, FieldType::S16),
	FieldDef::new("spread_start_z", 0x20, FieldType::S16),
	FieldDef::new("spread_end_x", 0x22, FieldType::S16),
	FieldDef::new("spread_end_y", 0x24, FieldType::S16),
	FieldDef::new("spread_end_z", 0x26, FieldType::S16),
	FieldDef::new("velocity_start_x", 0x28, FieldType::S16),
	FieldDef::new("velocity_start_y", 0x2A, FieldType::S16),
	FieldDef::new("velocity_start_z", 0x2C, FieldType::S16),
	FieldDef::new("velocity_end_x", 0x2E, FieldType::S16),
	FieldDef::new("velocity_end_y", 0x30, FieldType::S16),
	FieldDef::new("velocity_end_z", 0x32, FieldType::S16),
	FieldDef::new("inertia_start_x", 0x34, FieldType::S16),
	FieldDef::new("inertia_start_y", 0x36, FieldType::S16),
	FieldDef::new("inertia_start_z", 0x38, FieldType::S16),
	FieldDef::new("inertia_end_x", 0x3A, FieldType::S16),
	FieldDef::new("inertia_end_y", 0x3C, FieldType::S16),
	FieldDef::new("inertia_end_z", 0x3E, FieldType::S16),
	FieldDef::new("weight_start_x", 0x40, FieldType::S16),
	FieldDef::new("weight_start_y", 0x42, FieldType::S16),
	FieldDef::new("weight_start_z", 0x44, FieldType::S16),
	FieldDef::new("weight_end_x", 0x46, FieldType::S16),
	FieldDef::new("weight_end_y", 0x48, FieldType::S16),
	FieldDef::new("weight_end_z", 0x4A, FieldType::S16),
	FieldDef::new("drag_start_x", 0x4C, FieldType::S16),
	FieldDef::new("drag_start_y", 0x4E, FieldType::S16),
	FieldDef::new("drag_start_z", 0x50, FieldType::S16),
	FieldDef::new("drag_end_x", 0x52, FieldType::S16),
	FieldDef::new("drag_end_y", 0x54, FieldType::S16),
	FieldDef::new("drag_end_z", 0x56, FieldType::S16),
	FieldDef::new("lifetime_start_x", 0x58, FieldType::S16),
	FieldDef::new("lifetime_start_y", 0x5A, FieldType::S16),
	FieldDef::new("lifetime_start_z", 0x5C, FieldType::S16),
	FieldDef::new("lifetime_end_x", 0x5E, FieldType::S16),
	FieldDef::new("lifetime_end_y", 0x60, FieldType::S16),
	FieldDef::new("lifetime_end_z", 0x62, FieldType::S16),
	FieldDef::new("target_offset_start_x", 0x64, FieldType::S16),
	FieldDef::new("target_offset_start_y", 0x66, FieldType::S16),
	FieldDef::new("target_offset_start_z", 0x68, FieldType::S16),
	FieldDef::new("target_offset_end_x", 0x6A, FieldType::S16),
	FieldDef::new("target_offset_end_y", 0x6C, FieldType::S16),
	FieldDef::new("target_offset_end_z", 0x6E, FieldType::S16),
	FieldDef::new("homing_start_x", 0x70, FieldType::S16),
	FieldDef::new("homing_start_y", 0x72, FieldType::S16),
	FieldDef::new("homing_start_z", 0x74, FieldType::S16),
	FieldDef::new("homing_end_x", 0x76, FieldType::S16),
	FieldDef::new("homing_end_y", 0x78, FieldType::S16),
	FieldDef::new("homing_end_z", 0x7A, FieldType::S16),
	FieldDef::new("spawn_rate", 0x7C, FieldType::U16),
	FieldDef::new("spawn_count", 0x7E, FieldType::U16),
	FieldDef::new("spawn_delay", 0x80, FieldType::U16),
	FieldDef::new("spawn_duration", 0x82, FieldType::U16),
	FieldDef::new("max_particles", 0x84, FieldType::U16),
	FieldDef::new("burst_count", 0x86, FieldType::U16),
	FieldDef::new("burst_interval", 0x88, FieldType::U16),
	FieldDef::new("spawn_radius", 0x8A, FieldType::U16),
	FieldDef::new("child_emitter_a", 0x8C, FieldType::U8),
	FieldDef::new("child_emitter_b", 0x8D, FieldType::U8),
	FieldDef::new("child_trigger", 0x8E, FieldType::U8),
	FieldDef::new("child_flags", 0x8F, FieldType::U8),
	FieldDef::new("start_size", 0x90, FieldType::U16),
	FieldDef::new("end_size", 0x92, FieldType::U16),
	FieldDef::new("start_alpha", 0x94, FieldType::U16),
	FieldDef::new("end_alpha", 0x96, FieldType::U16),
	FieldDef::new("rotation_speed", 0x98, FieldType::U16),
	FieldDef::new("rotation_start", 0x9A, FieldType::S16),
	FieldDef::new("color_start", 0x9C, FieldType::U32),
	FieldDef::new("color_end", 0xA0, FieldType::U32),
	FieldDef::new("sprite_sequence", 0xA4, FieldType::U16),
	FieldDef::new("sprite_frame_rate", 0xA6, FieldType::U16),
	FieldDef::new("behavior_flags", 0xA8, FieldType::U32),
	FieldDef::new("sound_id", 0xAC, FieldType::U16),
	FieldDef::new("sound_delay", 0xAE, FieldType::U16),
	FieldDef::new("reserved_0", 0xB0, FieldType::U32),
	FieldDef::new("reserved_1", 0xB4, FieldType::U32),
	FieldDef::new("reserved_2", 0xB8, FieldType::U32),
	FieldDef::new("reserved_3", 0xBC, FieldType::U32),
	FieldDef::new("reserved_4", 0xC0, FieldType::U32),
];

/// Address of emitter `index` in an `effect_data` section at `section`
pub fn emitter_address(section: u32, index: usize) -> u32 {
	section + (PARTICLE_HEADER_SIZE + index * EMITTER_SIZE) as u32
}

fn field_name(schema: &Schema, name: &str) -> Option<&'static str> {
	schema.iter().find(|f| f.name == name).map(|f| f.name)
}

/// Particle system header preceding the emitter array
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticleHeader {
	record: Record,
}

impl ParticleHeader {
	/// Creates a zeroed header
	pub fn new() -> Self {
		let mut record = Record::new();
		for field in PARTICLE_HEADER_SCHEMA {
			record.set(field.name, 0);
		}
		Self {
			record,
		}
	}

	/// Returns the underlying field record
	pub fn record(&self) -> &Record {
		&self.record
	}

	/// Number of emitters declared by the header
	pub fn emitter_count(&self) -> u32 {
		self.record.value("emitter_count") as u32
	}

	/// Gravity vector
	pub fn gravity(&self) -> (i16, i16, i16) {
		(
			self.record.value("gravity_x") as i16,
			self.record.value("gravity_y") as i16,
			self.record.value("gravity_z") as i16,
		)
	}

	/// Sets the gravity vector
	pub fn set_gravity(&mut self, x: i16, y: i16, z: i16) {
		self.record.set("gravity_x", i64::from(x));
		self.record.set("gravity_y", i64::from(y));
		self.record.set("gravity_z", i64::from(z));
	}

	/// Inertia threshold
	pub fn inertia_threshold(&self) -> u32 {
		self.record.value("inertia_threshold") as u32
	}

	/// Sets the inertia threshold
	pub fn set_inertia_threshold(&mut self, value: u32) {
		self.record.set("inertia_threshold", i64::from(value));
	}

	fn set_emitter_count(&mut self, count: usize) {
		self.record.set("emitter_count", count as i64);
	}
}

impl Default for ParticleHeader {
	fn default() -> Self {
		Self::new()
	}
}

/// A particle emitter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Emitter {
	record: Record,
}

impl Emitter {
	/// Creates an emitter with every field zeroed
	pub fn new() -> Self {
		let mut record = Record::new();
		for field in EMITTER_SCHEMA {
			record.set(field.name, 0);
		}
		Self {
			record,
		}
	}

	/// Wraps an existing record, keeping only emitter fields
	pub fn from_record(record: &Record) -> Self {
		Self {
			record: schema::clone(EMITTER_SCHEMA, record),
		}
	}

	/// Returns the underlying field record
	pub fn record(&self) -> &Record {
		&self.record
	}

	/// Returns a field value by name
	pub fn field(&self, name: &str) -> Option<i64> {
		self.record.get(name)
	}

	/// Sets a field by name.
	///
	/// Returns `false` if the emitter layout has no such field.
	pub fn set_field(&mut self, name: &str, value: i64) -> bool {
		match field_name(EMITTER_SCHEMA, name) {
			Some(name) => {
				self.record.set(name, value);
				true
			}
			None => false,
		}
	}

	/// Decodes an emitter from its 196-byte record
	pub fn from_bytes(data: &[u8]) -> Result<Self, EfxError> {
		require_len(SectionId::EffectData, EMITTER_SIZE, data.len())?;
		Ok(Self {
			record: schema::decode(EMITTER_SCHEMA, data)?,
		})
	}

	/// Encodes the emitter into its 196-byte record
	pub fn to_bytes(&self) -> Vec<u8> {
		schema::encode(EMITTER_SCHEMA, &self.record, EMITTER_SIZE)
	}

	/// Writes only the fields present in `changes` to the emitter at `address`
	pub fn write_fields<T: ByteSink + ?Sized>(
		target: &mut T,
		address: u32,
		changes: &Record,
	) -> Result<(), EfxError> {
		schema::write(EMITTER_SCHEMA, target, address, changes)
	}
}

impl Default for Emitter {
	fn default() -> Self {
		Self::new()
	}
}

/// Contents of the `effect_data` section
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct EffectData {
	/// Particle header
	pub header: ParticleHeader,
	/// Emitters in record order
	pub emitters: Vec<Emitter>,
}

impl EffectData {
	/// Appends an emitter, returning its index
	pub fn add_emitter(&mut self, emitter: Emitter) -> usize {
		self.emitters.push(emitter);
		self.emitters.len() - 1
	}

	/// Removes the emitter at `index`
	pub fn remove_emitter(&mut self, index: usize) -> Option<Emitter> {
		(index < self.emitters.len()).then(|| self.emitters.remove(index))
	}

	/// Size of a section holding `count` emitters
	pub const fn size_for(count: usize) -> usize {
		PARTICLE_HEADER_SIZE + count * EMITTER_SIZE
	}
}

impl SectionCodec for EffectData {
	const SECTION: SectionId = SectionId::EffectData;

	fn parse<S: ByteSource + ?Sized>(
		source: &S,
		address: u32,
		len: usize,
	) -> Result<Self, EfxError> {
		require_len(Self::SECTION, PARTICLE_HEADER_SIZE, len)?;
		let header = ParticleHeader {
			record: schema::parse(PARTICLE_HEADER_SCHEMA, source, address)?,
		};

		let declared = header.emitter_count() as usize;
		let fits = (len - PARTICLE_HEADER_SIZE) / EMITTER_SIZE;
		let count = if declared > fits {
			log::warn!("particle header declares {declared} emitters, section holds {fits}");
			fits
		} else {
			declared
		};

		let emitters = (0..count)
			.map(|i| {
				schema::parse(EMITTER_SCHEMA, source, emitter_address(address, i)).map(|record| {
					Emitter {
						record,
					}
				})
			})
			.collect::<Result<Vec<_>, _>>()?;

		Ok(Self {
			header,
			emitters,
		})
	}

	fn serialize_to_bytes(&self) -> Vec<u8> {
		let mut header = self.header.clone();
		header.set_emitter_count(self.emitters.len());

		let mut bytes = Vec::with_capacity(self.byte_size());
		bytes.extend(schema::encode(PARTICLE_HEADER_SCHEMA, &header.record, PARTICLE_HEADER_SIZE));
		for emitter in &self.emitters {
			bytes.extend(emitter.to_bytes());
		}
		bytes
	}

	fn byte_size(&self) -> usize {
		Self::size_for(self.emitters.len())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::memory::VecMemory;
	use crate::schema::schema_size;

	#[test]
	fn test_schema_sizes() {
		assert_eq!(schema_size(PARTICLE_HEADER_SCHEMA), PARTICLE_HEADER_SIZE);
		assert_eq!(schema_size(EMITTER_SCHEMA), EMITTER_SIZE);
		assert_eq!(EMITTER_SCHEMA.len(), 100);
	}

	#[test]
	fn test_emitter_schema_has_no_overlaps() {
		let mut covered = [false; EMITTER_SIZE];
		for field in EMITTER_SCHEMA {
			for byte in &mut covered[field.offset..field.offset + field.ty.size()] {
				assert!(!*byte, "{} overlaps another field", field.name);
				*byte = true;
			}
		}
		assert!(covered.iter().all(|&b| b));
	}

	#[test]
	fn test_emitter_address() {
		assert_eq!(emitter_address(0x8010_0300, 0), 0x8010_0314);
		assert_eq!(emitter_address(0x8010_0300, 2), 0x8010_0300 + 0x14 + 2 * 0xC4);
	}

	#[test]
	fn test_set_field_rejects_unknown_names() {
		let mut emitter = Emitter::new();
		assert!(emitter.set_field("spawn_rate", 12));
		assert!(!emitter.set_field("warp_factor", 9));
		assert_eq!(emitter.field("spawn_rate"), Some(12));
		assert_eq!(emitter.field("warp_factor"), None);
	}

	#[test]
	fn test_roundtrip_empty() {
		let data = EffectData::default();
		let bytes = data.serialize_to_bytes();
		assert_eq!(bytes.len(), PARTICLE_HEADER_SIZE);
		assert_eq!(EffectData::parse_from_buffer(&bytes).unwrap(), data);
	}

	#[test]
	fn test_roundtrip_with_emitters() {
		let mut data = EffectData::default();
		data.header.set_gravity(0, -40, 3);
		data.header.set_inertia_threshold(500);
		for i in 0..3 {
			let mut emitter = Emitter::new();
			emitter.set_field("emitter_type", i + 1);
			emitter.set_field("velocity_start_y", -200);
			emitter.set_field("color_end", 0x00FF_8040);
			data.add_emitter(emitter);
		}

		let bytes = data.serialize_to_bytes();
		assert_eq!(bytes.len(), EffectData::size_for(3));
		assert_eq!(u32::from_le_bytes(bytes[0..4].try_into().unwrap()), 3);

		let parsed = EffectData::parse_from_buffer(&bytes).unwrap();
		assert_eq!(parsed.emitters, data.emitters);
		assert_eq!(parsed.header.gravity(), (0, -40, 3));
		assert_eq!(parsed.header.emitter_count(), 3);
	}

	#[test]
	fn test_parse_clamps_declared_count() {
		let mut bytes = vec![0u8; EffectData::size_for(1)];
		bytes[0..4].copy_from_slice(&9u32.to_le_bytes());
		let parsed = EffectData::parse_from_buffer(&bytes).unwrap();
		assert_eq!(parsed.emitters.len(), 1);
	}

	#[test]
	fn test_partial_emitter_write() {
		let mut data = EffectData::default();
		data.add_emitter(Emitter::new());
		let mut mem = VecMemory::new(0x8010_0000, 0x400);
		data.write_to_memory(&mut mem, 0x8010_0000).unwrap();

		let mut changes = Record::new();
		changes.set("spawn_count", 64);
		Emitter::write_fields(&mut mem, emitter_address(0x8010_0000, 0), &changes).unwrap();

		let parsed = EffectData::parse_from_memory(&mem, 0x8010_0000, 0x400).unwrap();
		assert_eq!(parsed.emitters[0].field("spawn_count"), Some(64));
		assert_eq!(parsed.emitters[0].field("spawn_rate"), Some(0));
	}
}
