//! Backing stores for container data.
//!
//! Every codec reads through [`ByteSource`] and writes through [`ByteSink`], so
//! the same code path serves both representations of an effect:
//!
//! - [`BufferSource`]: a read-only byte buffer (file data, 0-based offsets)
//! - [`MemoryImage`]: a read/write addressable image (live data, absolute addresses)
//!
//! All multi-byte values are little-endian.

pub mod host;

use crate::error::EfxError;

/// Read access to a byte store.
///
/// Implementors only provide [`read_exact_at`](Self::read_exact_at); the typed
/// accessors are derived from it.
pub trait ByteSource {
	/// Fills `buf` with the bytes starting at `address`
	fn read_exact_at(&self, address: u32, buf: &mut [u8]) -> Result<(), EfxError>;

	/// Reads an unsigned byte
	fn read8(&self, address: u32) -> Result<u8, EfxError> {
		let mut buf = [0u8; 1];
		self.read_exact_at(address, &mut buf)?;
		Ok(buf[0])
	}

	/// Reads an unsigned halfword
	fn read16u(&self, address: u32) -> Result<u16, EfxError> {
		let mut buf = [0u8; 2];
		self.read_exact_at(address, &mut buf)?;
		Ok(u16::from_le_bytes(buf))
	}

	/// Reads a signed halfword
	fn read16s(&self, address: u32) -> Result<i16, EfxError> {
		let mut buf = [0u8; 2];
		self.read_exact_at(address, &mut buf)?;
		Ok(i16::from_le_bytes(buf))
	}

	/// Reads a word
	fn read32(&self, address: u32) -> Result<u32, EfxError> {
		let mut buf = [0u8; 4];
		self.read_exact_at(address, &mut buf)?;
		Ok(u32::from_le_bytes(buf))
	}

	/// Reads `len` bytes into a new vector
	fn read_bytes(&self, address: u32, len: usize) -> Result<Vec<u8>, EfxError> {
		let mut buf = vec![0u8; len];
		self.read_exact_at(address, &mut buf)?;
		Ok(buf)
	}
}

/// Write access to a byte store.
pub trait ByteSink {
	/// Writes `data` starting at `address`
	fn write_bytes(&mut self, address: u32, data: &[u8]) -> Result<(), EfxError>;

	/// Writes a byte
	fn write8(&mut self, address: u32, value: u8) -> Result<(), EfxError> {
		self.write_bytes(address, &[value])
	}

	/// Writes a halfword
	fn write16(&mut self, address: u32, value: u16) -> Result<(), EfxError> {
		self.write_bytes(address, &value.to_le_bytes())
	}

	/// Writes a word
	fn write32(&mut self, address: u32, value: u32) -> Result<(), EfxError> {
		self.write_bytes(address, &value.to_le_bytes())
	}
}

/// An addressable read/write image, typically emulated RAM.
pub trait MemoryImage: ByteSource + ByteSink {
	/// First valid address
	fn base(&self) -> u32;

	/// Number of addressable bytes
	fn size(&self) -> usize;

	/// One past the last valid address
	fn end(&self) -> u64 {
		u64::from(self.base()) + self.size() as u64
	}

	/// Returns `true` if `[address, address + len)` lies inside the image
	fn contains(&self, address: u32, len: usize) -> bool {
		address >= self.base() && u64::from(address) + len as u64 <= self.end()
	}

	/// Drops any cached handle to the underlying image.
	///
	/// Hosts may relocate their RAM buffer between operations; the structure
	/// manager calls this after every batch of writes.
	fn refresh(&mut self) {}
}

/// Read-only view over file bytes, addressed from offset 0.
#[derive(Debug, Clone, Copy)]
pub struct BufferSource<'a> {
	data: &'a [u8],
}

impl<'a> BufferSource<'a> {
	/// Wraps a byte slice
	pub fn new(data: &'a [u8]) -> Self {
		Self {
			data,
		}
	}

	/// Returns the wrapped bytes
	pub fn as_slice(&self) -> &'a [u8] {
		self.data
	}

	/// Returns the number of bytes in the buffer
	pub fn len(&self) -> usize {
		self.data.len()
	}

	/// Returns `true` if the buffer is empty
	pub fn is_empty(&self) -> bool {
		self.data.is_empty()
	}
}

impl ByteSource for BufferSource<'_> {
	fn read_exact_at(&self, address: u32, buf: &mut [u8]) -> Result<(), EfxError> {
		let start = address as usize;
		let bytes = start
			.checked_add(buf.len())
			.and_then(|end| self.data.get(start..end))
			.ok_or_else(|| EfxError::out_of_bounds(address, buf.len()))?;
		buf.copy_from_slice(bytes);
		Ok(())
	}
}

/// PSX main RAM base address (KSEG0)
pub const PSX_RAM_BASE: u32 = 0x8000_0000;

/// PSX main RAM size (2 MiB)
pub const PSX_RAM_SIZE: usize = 0x20_0000;

/// A memory image backed by a `Vec<u8>`.
///
/// Used for tests, for offline editing of raw RAM dumps and as the reference
/// implementation of [`MemoryImage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VecMemory {
	base: u32,
	data: Vec<u8>,
	generation: u64,
}

impl VecMemory {
	/// Creates a zero-filled image of `size` bytes starting at `base`
	pub fn new(base: u32, size: usize) -> Self {
		Self {
			base,
			data: vec![0; size],
			generation: 0,
		}
	}

	/// Creates an image holding `data` starting at `base`
	pub fn from_bytes(base: u32, data: Vec<u8>) -> Self {
		Self {
			base,
			data,
			generation: 0,
		}
	}

	/// Creates an empty 2 MiB PSX RAM image
	pub fn psx() -> Self {
		Self::new(PSX_RAM_BASE, PSX_RAM_SIZE)
	}

	/// Returns the raw image bytes
	pub fn as_slice(&self) -> &[u8] {
		&self.data
	}

	/// Consumes the image and returns its bytes
	pub fn into_bytes(self) -> Vec<u8> {
		self.data
	}

	/// Number of times [`MemoryImage::refresh`] has been called
	pub fn generation(&self) -> u64 {
		self.generation
	}

	fn range(&self, address: u32, len: usize) -> Result<std::ops::Range<usize>, EfxError> {
		if !self.contains(address, len) {
			return Err(EfxError::out_of_bounds(address, len));
		}
		let start = (address - self.base) as usize;
		Ok(start..start + len)
	}
}

impl ByteSource for VecMemory {
	fn read_exact_at(&self, address: u32, buf: &mut [u8]) -> Result<(), EfxError> {
		let range = self.range(address, buf.len())?;
		buf.copy_from_slice(&self.data[range]);
		Ok(())
	}
}

impl ByteSink for VecMemory {
	fn write_bytes(&mut self, address: u32, data: &[u8]) -> Result<(), EfxError> {
		let range = self.range(address, data.len())?;
		self.data[range].copy_from_slice(data);
		Ok(())
	}
}

impl MemoryImage for VecMemory {
	fn base(&self) -> u32 {
		self.base
	}

	fn size(&self) -> usize {
		self.data.len()
	}

	fn refresh(&mut self) {
		self.generation += 1;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_buffer_source_reads() {
		let data = [0x01, 0xFE, 0xFF, 0x78, 0x56, 0x34, 0x12];
		let src = BufferSource::new(&data);

		assert_eq!(src.read8(0).unwrap(), 0x01);
		assert_eq!(src.read16u(1).unwrap(), 0xFFFE);
		assert_eq!(src.read16s(1).unwrap(), -2);
		assert_eq!(src.read32(3).unwrap(), 0x1234_5678);
		assert_eq!(src.read_bytes(5, 2).unwrap(), vec![0x34, 0x12]);
	}

	#[test]
	fn test_buffer_source_out_of_bounds() {
		let data = [0u8; 4];
		let src = BufferSource::new(&data);
		assert!(src.read32(1).is_err());
		assert!(src.read8(4).is_err());
		assert!(src.read_bytes(u32::MAX, 2).is_err());
	}

	#[test]
	fn test_vec_memory_uses_absolute_addresses() {
		let mut mem = VecMemory::new(0x8001_0000, 16);
		mem.write32(0x8001_0004, 0xDEAD_BEEF).unwrap();
		mem.write16(0x8001_0008, 0xFFFF).unwrap();
		mem.write8(0x8001_000A, 0x7F).unwrap();

		assert_eq!(mem.read32(0x8001_0004).unwrap(), 0xDEAD_BEEF);
		assert_eq!(mem.read16s(0x8001_0008).unwrap(), -1);
		assert_eq!(mem.read8(0x8001_000A).unwrap(), 0x7F);
		assert_eq!(mem.as_slice()[4..8], [0xEF, 0xBE, 0xAD, 0xDE]);
	}

	#[test]
	fn test_vec_memory_bounds() {
		let mut mem = VecMemory::new(0x8001_0000, 16);
		assert!(mem.read8(0x8000_FFFF).is_err());
		assert!(mem.write32(0x8001_000E, 0).is_err());
		assert!(mem.contains(0x8001_0000, 16));
		assert!(!mem.contains(0x8001_0000, 17));
	}

	#[test]
	fn test_refresh_bumps_generation() {
		let mut mem = VecMemory::psx();
		assert_eq!(mem.base(), PSX_RAM_BASE);
		assert_eq!(mem.size(), PSX_RAM_SIZE);
		mem.refresh();
		mem.refresh();
		assert_eq!(mem.generation(), 2);
	}
}
