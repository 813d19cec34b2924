//! Declarative typed-field schemas.
//!
//! A schema is an ordered list of `{name, offset, type}` descriptors. The same
//! schema parses and writes a record against any [`ByteSource`]/[`ByteSink`],
//! so a fixed-layout structure is described once and used for both the file
//! buffer and the live memory image.
//!
//! ```
//! use efx_types::memory::BufferSource;
//! use efx_types::schema::{self, FieldDef, FieldType};
//!
//! const POINT: &[FieldDef] = &[
//!     FieldDef::new("x", 0, FieldType::S16),
//!     FieldDef::new("y", 2, FieldType::S16),
//! ];
//!
//! let bytes = [0xFF, 0xFF, 0x10, 0x00];
//! let record = schema::parse(POINT, &BufferSource::new(&bytes), 0).unwrap();
//! assert_eq!(record.get("x"), Some(-1));
//! assert_eq!(record.get("y"), Some(16));
//! ```

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::EfxError;
use crate::memory::{BufferSource, ByteSink, ByteSource};

/// Primitive field types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FieldType {
	/// Unsigned byte
	U8,
	/// Signed halfword
	S16,
	/// Unsigned halfword
	U16,
	/// Word
	U32,
}

impl FieldType {
	/// Size of the field in bytes
	pub const fn size(self) -> usize {
		match self {
			Self::U8 => 1,
			Self::S16 | Self::U16 => 2,
			Self::U32 => 4,
		}
	}

	/// Reads a value of this type
	pub fn read<S: ByteSource + ?Sized>(self, source: &S, address: u32) -> Result<i64, EfxError> {
		Ok(match self {
			Self::U8 => i64::from(source.read8(address)?),
			Self::S16 => i64::from(source.read16s(address)?),
			Self::U16 => i64::from(source.read16u(address)?),
			Self::U32 => i64::from(source.read32(address)?),
		})
	}

	/// Writes a value of this type, truncating it to the field width
	pub fn write<T: ByteSink + ?Sized>(
		self,
		target: &mut T,
		address: u32,
		value: i64,
	) -> Result<(), EfxError> {
		match self {
			Self::U8 => target.write8(address, value as u8),
			Self::S16 => target.write16(address, value as i16 as u16),
			Self::U16 => target.write16(address, value as u16),
			Self::U32 => target.write32(address, value as u32),
		}
	}

	/// Encodes a value of this type into `buf` at `offset`
	pub fn encode(self, buf: &mut [u8], offset: usize, value: i64) {
		match self {
			Self::U8 => buf[offset] = value as u8,
			Self::S16 => buf[offset..offset + 2].copy_from_slice(&(value as i16).to_le_bytes()),
			Self::U16 => buf[offset..offset + 2].copy_from_slice(&(value as u16).to_le_bytes()),
			Self::U32 => buf[offset..offset + 4].copy_from_slice(&(value as u32).to_le_bytes()),
		}
	}
}

/// One field of a fixed-layout record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldDef {
	/// Field name, unique within its schema
	pub name: &'static str,
	/// Byte offset from the record start
	pub offset: usize,
	/// Field type
	pub ty: FieldType,
}

impl FieldDef {
	/// Creates a field descriptor
	pub const fn new(name: &'static str, offset: usize, ty: FieldType) -> Self {
		Self {
			name,
			offset,
			ty,
		}
	}

	fn address(&self, base: u32) -> u32 {
		base.wrapping_add(self.offset as u32)
	}
}

/// An ordered field list
pub type Schema = [FieldDef];

/// Number of bytes spanned by a schema
pub fn schema_size(schema: &Schema) -> usize {
	schema.iter().map(|f| f.offset + f.ty.size()).max().unwrap_or(0)
}

/// Field values keyed by name.
///
/// A record may hold a subset of its schema's fields; [`write`] only touches
/// the fields that are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Record {
	fields: BTreeMap<&'static str, i64>,
}

impl Record {
	/// Creates an empty record
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns a field value
	pub fn get(&self, name: &str) -> Option<i64> {
		self.fields.get(name).copied()
	}

	/// Returns a field value, or 0 when absent
	pub fn value(&self, name: &str) -> i64 {
		self.get(name).unwrap_or(0)
	}

	/// Sets a field value
	pub fn set(&mut self, name: &'static str, value: i64) {
		self.fields.insert(name, value);
	}

	/// Removes a field, returning its value
	pub fn remove(&mut self, name: &str) -> Option<i64> {
		self.fields.remove(name)
	}

	/// Returns `true` if the field is present
	pub fn contains(&self, name: &str) -> bool {
		self.fields.contains_key(name)
	}

	/// Number of fields present
	pub fn len(&self) -> usize {
		self.fields.len()
	}

	/// Returns `true` if no field is present
	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}

	/// Iterates over present fields in name order
	pub fn iter(&self) -> impl Iterator<Item = (&'static str, i64)> + '_ {
		self.fields.iter().map(|(name, value)| (*name, *value))
	}
}

/// Reads every field of `schema` from `source` at `base`
pub fn parse<S: ByteSource + ?Sized>(
	schema: &Schema,
	source: &S,
	base: u32,
) -> Result<Record, EfxError> {
	let mut record = Record::new();
	for field in schema {
		record.set(field.name, field.ty.read(source, field.address(base))?);
	}
	Ok(record)
}

/// Parses a record from the start of `bytes`
pub fn decode(schema: &Schema, bytes: &[u8]) -> Result<Record, EfxError> {
	parse(schema, &BufferSource::new(bytes), 0)
}

/// Writes the fields of `record` that `schema` knows about.
///
/// Fields absent from the record are left untouched in the target.
pub fn write<T: ByteSink + ?Sized>(
	schema: &Schema,
	target: &mut T,
	base: u32,
	record: &Record,
) -> Result<(), EfxError> {
	for field in schema {
		if let Some(value) = record.get(field.name) {
			field.ty.write(target, field.address(base), value)?;
		}
	}
	Ok(())
}

/// Encodes `record` into a zero-filled buffer of `size` bytes
pub fn encode(schema: &Schema, record: &Record, size: usize) -> Vec<u8> {
	let mut buf = vec![0u8; size.max(schema_size(schema))];
	for field in schema {
		if let Some(value) = record.get(field.name) {
			field.ty.encode(&mut buf, field.offset, value);
		}
	}
	buf.truncate(size);
	buf
}

/// Copies the schema's fields out of `record`
pub fn clone(schema: &Schema, record: &Record) -> Record {
	let mut copy = Record::new();
	for field in schema {
		if let Some(value) = record.get(field.name) {
			copy.set(field.name, value);
		}
	}
	copy
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::memory::VecMemory;

	const SAMPLE: &[FieldDef] = &[
		FieldDef::new("kind", 0, FieldType::U8),
		FieldDef::new("angle", 2, FieldType::S16),
		FieldDef::new("speed", 4, FieldType::U16),
		FieldDef::new("flags", 8, FieldType::U32),
	];

	fn sample_bytes() -> Vec<u8> {
		vec![0x07, 0x00, 0x00, 0x80, 0x34, 0x12, 0x00, 0x00, 0x01, 0x00, 0x00, 0x80]
	}

	#[test]
	fn test_schema_size() {
		assert_eq!(schema_size(SAMPLE), 12);
		assert_eq!(schema_size(&[]), 0);
	}

	#[test]
	fn test_parse_buffer_and_memory_agree() {
		let bytes = sample_bytes();
		let from_buffer = decode(SAMPLE, &bytes).unwrap();

		let mut mem = VecMemory::new(0x8001_0000, 64);
		mem.write_bytes(0x8001_0010, &bytes).unwrap();
		let from_memory = parse(SAMPLE, &mem, 0x8001_0010).unwrap();

		assert_eq!(from_buffer, from_memory);
		assert_eq!(from_buffer.get("kind"), Some(7));
		assert_eq!(from_buffer.get("angle"), Some(-32768));
		assert_eq!(from_buffer.get("speed"), Some(0x1234));
		assert_eq!(from_buffer.get("flags"), Some(0x8000_0001));
	}

	#[test]
	fn test_partial_write_only_touches_present_fields() {
		let mut mem = VecMemory::from_bytes(0, sample_bytes());
		let mut record = Record::new();
		record.set("speed", 0xBEEF);

		write(SAMPLE, &mut mem, 0, &record).unwrap();

		let reread = parse(SAMPLE, &mem, 0).unwrap();
		assert_eq!(reread.get("speed"), Some(0xBEEF));
		assert_eq!(reread.get("kind"), Some(7));
		assert_eq!(reread.get("angle"), Some(-32768));
	}

	#[test]
	fn test_write_ignores_fields_outside_schema() {
		let mut mem = VecMemory::new(0, 12);
		let mut record = Record::new();
		record.set("not_in_schema", 99);
		write(SAMPLE, &mut mem, 0, &record).unwrap();
		assert!(mem.as_slice().iter().all(|&b| b == 0));
	}

	#[test]
	fn test_encode_matches_source_bytes() {
		let bytes = sample_bytes();
		let record = decode(SAMPLE, &bytes).unwrap();
		assert_eq!(encode(SAMPLE, &record, 12), bytes);
	}

	#[test]
	fn test_encode_truncates_out_of_range_values() {
		let mut record = Record::new();
		record.set("kind", 0x1FF);
		record.set("angle", -2);
		let bytes = encode(SAMPLE, &record, 12);
		assert_eq!(bytes[0], 0xFF);
		assert_eq!(&bytes[2..4], &[0xFE, 0xFF]);
	}

	#[test]
	fn test_clone_copies_schema_fields_only() {
		let mut record = decode(SAMPLE, &sample_bytes()).unwrap();
		record.set("scratch", 5);
		let copy = clone(SAMPLE, &record);
		assert_eq!(copy.len(), 4);
		assert!(!copy.contains("scratch"));
		assert_eq!(copy.get("flags"), record.get("flags"));
	}
}
