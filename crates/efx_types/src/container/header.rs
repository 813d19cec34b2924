//! The 10-pointer container header.

use std::fmt::Display;

use serde::Serialize;

use crate::error::EfxError;
use crate::memory::{BufferSource, ByteSink, ByteSource};

use super::section::{SECTION_COUNT, SectionId};

/// Size of the header in bytes
pub const HEADER_SIZE: usize = SECTION_COUNT * 4;

/// Fixed header of absolute section pointers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Header {
	pointers: [u32; SECTION_COUNT],
}

impl Header {
	/// Creates a header from raw pointer values in nominal order
	pub fn from_pointers(pointers: [u32; SECTION_COUNT]) -> Self {
		Self {
			pointers,
		}
	}

	/// Reads the header at `address`
	pub fn parse<S: ByteSource + ?Sized>(source: &S, address: u32) -> Result<Self, EfxError> {
		let mut pointers = [0u32; SECTION_COUNT];
		for id in SectionId::ALL {
			pointers[id.index()] = source.read32(address + id.header_offset() as u32)?;
		}
		Ok(Self {
			pointers,
		})
	}

	/// Reads the header from the start of `data`
	pub fn from_bytes(data: &[u8]) -> Result<Self, EfxError> {
		if data.len() < HEADER_SIZE {
			return Err(EfxError::insufficient_data(SectionId::Frames, HEADER_SIZE, data.len()));
		}
		Self::parse(&BufferSource::new(data), 0)
	}

	/// Serializes the header
	pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
		let mut buffer = [0u8; HEADER_SIZE];
		for (i, pointer) in self.pointers.iter().enumerate() {
			buffer[i * 4..i * 4 + 4].copy_from_slice(&pointer.to_le_bytes());
		}
		buffer
	}

	/// Writes the full pointer table at `address`
	pub fn write_to_memory<T: ByteSink + ?Sized>(
		&self,
		target: &mut T,
		address: u32,
	) -> Result<(), EfxError> {
		target.write_bytes(address, &self.to_bytes())
	}

	/// Returns all pointers in nominal order
	pub fn pointers(&self) -> &[u32; SECTION_COUNT] {
		&self.pointers
	}

	/// Returns the pointer of a section
	pub fn pointer(&self, id: SectionId) -> u32 {
		self.pointers[id.index()]
	}

	/// Replaces the pointer of a section
	pub fn set_pointer(&mut self, id: SectionId, value: u32) {
		self.pointers[id.index()] = value;
	}

	/// Returns `true` unless the section is optional and its pointer is zero
	pub fn is_present(&self, id: SectionId) -> bool {
		!id.is_optional() || self.pointer(id) != 0
	}

	/// Present sections sorted by address, ties broken by nominal order
	pub fn address_order(&self) -> Vec<(SectionId, u32)> {
		let mut entries: Vec<(SectionId, u32)> = SectionId::ALL
			.iter()
			.filter(|&&id| self.is_present(id))
			.map(|&id| (id, self.pointer(id)))
			.collect();
		entries.sort_by_key(|&(id, pointer)| (pointer, id.index()));
		entries
	}

	/// The section physically following `id`, if any.
	///
	/// The search runs over current pointer values, not over declaration
	/// order, so a physically reordered container is handled correctly.
	pub fn next_in_memory(&self, id: SectionId) -> Option<(SectionId, u32)> {
		let order = self.address_order();
		let position = order.iter().position(|&(other, _)| other == id)?;
		order.get(position + 1).copied()
	}
}

impl Display for Header {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		writeln!(f, "Header:")?;
		for id in SectionId::ALL {
			if self.is_present(id) {
				writeln!(f, "- {:<12} 0x{:08X}", id.name(), self.pointer(id))?;
			} else {
				writeln!(f, "- {:<12} (absent)", id.name())?;
			}
		}
		Ok(())
	}
}
