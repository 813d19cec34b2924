#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! `efx-rs` reads, inspects and structurally edits the effect containers of a
//! PlayStation title, both as files and inside a live emulator memory image.
//!
//! The heavy lifting lives in [`efx_types`]; this crate re-exports it and adds
//! a [`prelude`].
//!
//! ```no_run
//! use efx_rs::prelude::*;
//!
//! let bytes = std::fs::read("EFFECT.EFX").unwrap();
//! let session = Session::from_buffer(&bytes, 0x8010_0000, EditorConfig::default()).unwrap();
//! print!("{}", session.header());
//! ```

/// `use efx_rs::prelude::*;` to import commonly used items.
pub mod prelude {
	pub use efx_types::prelude::*;
}

pub use efx_types;

// Re-export commonly used types at crate root
pub use efx_types::config::EditorConfig;
pub use efx_types::container::{Header, SectionId};
pub use efx_types::error::{EfxError, ErrorKind};
pub use efx_types::memory::{MemoryImage, VecMemory};
pub use efx_types::records::EffectRecords;
pub use efx_types::session::Session;
