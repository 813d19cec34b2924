//! Error types for container parsing and structural editing.

use thiserror::Error;

use crate::container::{SectionId, Violation};

/// Broad failure classes a caller can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// The container is malformed in a way the caller asked to treat as fatal
	Validation,
	/// A structural change does not fit the image or the configured bounds
	Capacity,
	/// Collaborator I/O or configuration failed
	Io,
	/// Bytes could not be decoded into a record
	Data,
}

/// Errors produced while reading, editing or shifting an effect container
#[derive(Debug, Error)]
pub enum EfxError {
	/// Not enough bytes to decode a record
	#[error("{section}: insufficient data, expected {expected} bytes, got {actual} bytes")]
	InsufficientData {
		/// Section being decoded
		section: SectionId,
		/// Expected number of bytes
		expected: usize,
		/// Actual number of bytes
		actual: usize,
	},

	/// Magic tag mismatch
	#[error("{section}: invalid magic, expected {expected:02X?}, got {actual:02X?}")]
	InvalidMagic {
		/// Section being decoded
		section: SectionId,
		/// Expected magic bytes
		expected: Vec<u8>,
		/// Magic bytes actually found
		actual: Vec<u8>,
	},

	/// A read or write touched bytes outside the backing store
	#[error("Access of {len} bytes at 0x{address:08X} is outside the backing store")]
	OutOfBounds {
		/// First address of the access
		address: u32,
		/// Length of the access in bytes
		len: usize,
	},

	/// Header violations promoted to a hard failure
	#[error("Container failed validation with {} violation(s)", .0.len())]
	Validation(Vec<Violation>),

	/// A structural change was rejected before any byte was written
	#[error("Capacity error: {message}")]
	Capacity {
		/// Human readable description
		message: String,
	},

	/// Configuration could not be loaded
	#[error(transparent)]
	Config(#[from] config::ConfigError),

	/// IO error
	#[error(transparent)]
	Io(#[from] std::io::Error),
}

impl EfxError {
	/// Creates an insufficient data error
	pub fn insufficient_data(section: SectionId, expected: usize, actual: usize) -> Self {
		Self::InsufficientData {
			section,
			expected,
			actual,
		}
	}

	/// Creates an invalid magic error
	pub fn invalid_magic(section: SectionId, expected: &[u8], actual: &[u8]) -> Self {
		Self::InvalidMagic {
			section,
			expected: expected.to_vec(),
			actual: actual.to_vec(),
		}
	}

	/// Creates an out of bounds error
	pub fn out_of_bounds(address: u32, len: usize) -> Self {
		Self::OutOfBounds {
			address,
			len,
		}
	}

	/// Creates a capacity error
	pub fn capacity(message: impl Into<String>) -> Self {
		Self::Capacity {
			message: message.into(),
		}
	}

	/// Returns the failure class of this error
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::InsufficientData {
				..
			}
			| Self::InvalidMagic {
				..
			}
			| Self::OutOfBounds {
				..
			} => ErrorKind::Data,
			Self::Validation(_) => ErrorKind::Validation,
			Self::Capacity {
				..
			} => ErrorKind::Capacity,
			Self::Config(_) | Self::Io(_) => ErrorKind::Io,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_error_kinds() {
		assert_eq!(EfxError::capacity("too big").kind(), ErrorKind::Capacity);
		assert_eq!(EfxError::out_of_bounds(0x8000_0000, 4).kind(), ErrorKind::Data);
		assert_eq!(EfxError::Validation(Vec::new()).kind(), ErrorKind::Validation);

		let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
		assert_eq!(EfxError::from(io).kind(), ErrorKind::Io);
	}

	#[test]
	fn test_error_messages() {
		let err = EfxError::insufficient_data(SectionId::Timeline, 12, 4);
		assert_eq!(err.to_string(), "timeline: insufficient data, expected 12 bytes, got 4 bytes");

		let err = EfxError::out_of_bounds(0x8001_0000, 2);
		assert_eq!(
			err.to_string(),
			"Access of 2 bytes at 0x80010000 is outside the backing store"
		);
	}
}
