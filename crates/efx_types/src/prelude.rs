//! Prelude module for `efx_types`.
//!
//! ```
//! use efx_types::prelude::*;
//!
//! let header = Header::default();
//! assert!(!header.is_present(SectionId::TimingCurve));
//! ```

#[doc(inline)]
pub use crate::codec::{
	AnimCurve, AnimCurveTable, EffectData, EffectFlags, Emitter, FlagBlock, Frame, FrameTable,
	Frameset, ParticleHeader, ScriptInstruction, ScriptStream, SectionCodec, SequenceInstruction,
	SequenceStream, SmdEvent, SoundChannel, SoundDefinition, SoundFlags, Timeline, TimingCurve,
};
#[doc(inline)]
pub use crate::config::EditorConfig;
#[doc(inline)]
pub use crate::container::{Extent, HEADER_SIZE, Header, SectionId, Violation};
#[doc(inline)]
pub use crate::error::{EfxError, ErrorKind};
#[doc(inline)]
pub use crate::memory::host::{Capture, CaptureState, HostControl, with_paused};
#[doc(inline)]
pub use crate::memory::{BufferSource, ByteSink, ByteSource, MemoryImage, VecMemory};
#[doc(inline)]
pub use crate::records::EffectRecords;
#[doc(inline)]
pub use crate::schema::{FieldDef, FieldType, Record};
#[doc(inline)]
pub use crate::session::{Session, SizeChange};
#[doc(inline)]
pub use crate::structure::{MemoryLayout, SectionDelta, ShiftPlan};
