//! This crate provides the container model, section codecs and structure
//! manager for the `efx-rs` project.
//!
//! # Modules
//!
//! - **schema**: declarative typed-field records over buffers and memory images
//! - **container**: the 10-pointer header, section table and validation
//! - **codec**: per-section parse/serialize (emitters, curves, timeline, script, sound, ...)
//! - **structure**: byte shifting and pointer cascades for size-changing edits
//! - **session**: an editing session owning current and loaded records
//!
//! # Examples
//!
//! Using the prelude (recommended):
//!
//! ```no_run
//! use efx_types::prelude::*;
//!
//! # fn main() -> Result<(), EfxError> {
//! let mut mem = VecMemory::psx();
//! let config = EditorConfig::default();
//! let mut session = Session::from_memory(&mem, config.base_address, 0x4000, config)?;
//!
//! session.records_mut().effect_data.add_emitter(Emitter::new());
//! session.commit(&mut mem)?;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod container;
pub mod error;
pub mod memory;
pub mod records;
pub mod schema;
pub mod session;
pub mod structure;

/// `use efx_types::prelude::*;` to import commonly used items.
pub mod prelude;
