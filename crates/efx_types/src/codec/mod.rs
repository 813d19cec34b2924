//! Section codecs.
//!
//! Each codec turns the packed bytes of one section into an editable logical
//! record and back. Parsing is written once against [`ByteSource`], so the
//! same code reads file buffers and live memory images.

pub mod anim_curve;
pub mod flags;
pub mod frames;
pub mod particle;
pub mod script;
pub mod sequence;
pub mod sound;
pub mod timeline;
pub mod timing_curve;

use crate::container::SectionId;
use crate::error::EfxError;
use crate::memory::{BufferSource, ByteSink, ByteSource};

pub use self::anim_curve::{AnimCurve, AnimCurveTable};
pub use self::flags::{EffectFlags, FlagBlock, SoundFlags};
pub use self::frames::{Frame, FrameTable, Frameset};
pub use self::particle::{EffectData, Emitter, ParticleHeader};
pub use self::script::{ScriptInstruction, ScriptStream};
pub use self::sequence::{SequenceInstruction, SequenceStream};
pub use self::sound::{SmdEvent, SoundChannel, SoundDefinition};
pub use self::timeline::Timeline;
pub use self::timing_curve::TimingCurve;

/// Parse/serialize contract shared by every section record.
pub trait SectionCodec: Sized + Clone {
	/// Section this codec decodes
	const SECTION: SectionId;

	/// Decodes the record stored at `address`, reading at most `len` bytes
	fn parse<S: ByteSource + ?Sized>(source: &S, address: u32, len: usize)
	-> Result<Self, EfxError>;

	/// Encodes the record into its on-disk byte layout
	fn serialize_to_bytes(&self) -> Vec<u8>;

	/// Size of the encoded record in bytes
	fn byte_size(&self) -> usize {
		self.serialize_to_bytes().len()
	}

	/// Decodes the record from a file buffer holding exactly this section
	fn parse_from_buffer(data: &[u8]) -> Result<Self, EfxError> {
		Self::parse(&BufferSource::new(data), 0, data.len())
	}

	/// Decodes the record from a live memory image
	fn parse_from_memory<S: ByteSource + ?Sized>(
		source: &S,
		address: u32,
		len: usize,
	) -> Result<Self, EfxError> {
		Self::parse(source, address, len)
	}

	/// Writes the encoded record to a live memory image at `address`
	fn write_to_memory<T: ByteSink + ?Sized>(
		&self,
		target: &mut T,
		address: u32,
	) -> Result<(), EfxError> {
		target.write_bytes(address, &self.serialize_to_bytes())
	}
}

/// Fails with `InsufficientData` unless `len >= expected`
pub(crate) fn require_len(section: SectionId, expected: usize, len: usize) -> Result<(), EfxError> {
	if len < expected {
		return Err(EfxError::insufficient_data(section, expected, len));
	}
	Ok(())
}
