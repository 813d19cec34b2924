//! Editor configuration.
//!
//! Settings come from built-in defaults, an optional TOML file and `EFX_*`
//! environment variables, in increasing priority:
//!
//! ```toml
//! base_address = 2147549184
//! shift_margin = 131072
//! sequence_pad_tolerance = 4
//! ```
//!
//! ```text
//! EFX_SHIFT_MARGIN=65536 efx_utils info effect.bin
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EfxError;
use crate::memory::PSX_RAM_SIZE;

/// Limits and addresses used while reading and editing containers.
///
/// # Presets
///
/// - `default()`: the effect area of a retail image, 128 KiB bounds
/// - `strict()`: tight bounds, no sequence padding
/// - `lenient()`: bounds up to the whole image
///
/// # Examples
///
/// ```
/// use efx_types::config::EditorConfig;
///
/// let config = EditorConfig::default();
/// assert_eq!(config.shift_margin, 0x2_0000);
///
/// let strict = EditorConfig::strict();
/// assert_eq!(strict.sequence_pad_tolerance, 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
	/// Address of the effect header in the live image
	pub base_address: u32,
	/// Largest byte range one shift may move
	pub shift_margin: usize,
	/// Sections larger than this are reported at load
	pub max_section_size: usize,
	/// How many bytes a shrunk sequence stream may be padded instead of shifted
	pub sequence_pad_tolerance: usize,
	/// Size of the emulated memory image
	pub image_size: usize,
}

impl Default for EditorConfig {
	fn default() -> Self {
		Self {
			base_address: 0x8001_0000,
			shift_margin: 0x2_0000,
			max_section_size: 0x2_0000,
			sequence_pad_tolerance: 4,
			image_size: PSX_RAM_SIZE,
		}
	}
}

impl EditorConfig {
	/// Tight bounds for small, well-formed effects
	pub fn strict() -> Self {
		Self {
			shift_margin: 0x8000,
			max_section_size: 0x8000,
			sequence_pad_tolerance: 0,
			..Self::default()
		}
	}

	/// Bounds up to the whole image
	pub fn lenient() -> Self {
		Self {
			shift_margin: PSX_RAM_SIZE,
			max_section_size: PSX_RAM_SIZE,
			sequence_pad_tolerance: 16,
			..Self::default()
		}
	}

	/// Loads the configuration.
	///
	/// A missing file is not an error; the defaults and the environment
	/// still apply.
	pub fn load(path: Option<&Path>) -> Result<Self, EfxError> {
		let mut builder = config::Config::builder();
		if let Some(path) = path {
			builder = builder.add_source(config::File::from(path).required(false));
		}
		let settings = builder
			.add_source(config::Environment::with_prefix("EFX").try_parsing(true))
			.build()?;
		let config: Self = settings.try_deserialize()?;
		log::debug!("editor config: {config:?}");
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use super::*;

	#[test]
	fn test_presets_differ_from_default() {
		let default = EditorConfig::default();
		assert!(EditorConfig::strict().shift_margin < default.shift_margin);
		assert!(EditorConfig::lenient().shift_margin > default.shift_margin);
		assert_eq!(EditorConfig::lenient().base_address, default.base_address);
	}

	#[test]
	fn test_load_without_file_gives_defaults() {
		let config = EditorConfig::load(None).unwrap();
		assert_eq!(config.base_address, EditorConfig::default().base_address);
	}

	#[test]
	fn test_load_toml_overrides_some_fields() {
		let path = std::env::temp_dir().join(format!("efx_config_{}.toml", std::process::id()));
		let mut file = std::fs::File::create(&path).unwrap();
		writeln!(file, "sequence_pad_tolerance = 8").unwrap();
		writeln!(file, "max_section_size = 4096").unwrap();
		drop(file);

		let config = EditorConfig::load(Some(&path)).unwrap();
		std::fs::remove_file(&path).unwrap();

		assert_eq!(config.sequence_pad_tolerance, 8);
		assert_eq!(config.max_section_size, 4096);
		assert_eq!(config.shift_margin, EditorConfig::default().shift_margin);
	}

	#[test]
	fn test_missing_file_is_not_an_error() {
		let path = std::env::temp_dir().join("efx_config_does_not_exist.toml");
		assert!(EditorConfig::load(Some(&path)).is_ok());
	}
}
