//! Effect control script (`script` section).
//!
//! Each instruction starts with a little-endian opcode word:
//!
//! ```text
//! bits 0..8   handler id (0..=45)
//! bits 9..15  flags, kept verbatim
//! ```
//!
//! followed by the handler's fixed parameter list. The stream has no length
//! prefix; decoding runs to the end of the section. An instruction that would
//! cross the section end is not decoded, its bytes are kept as trailing data.

mod handlers;

use std::fmt::Display;

use serde::Serialize;

use crate::container::SectionId;
use crate::error::EfxError;
use crate::memory::ByteSource;

use super::SectionCodec;

pub use self::handlers::{
	HANDLER_COUNT, HANDLERS, HandlerDef, ParamType, handler_by_name, handler_def,
};

/// Mask of the handler id in the opcode word
pub const HANDLER_MASK: u16 = 0x01FF;

/// Shift of the flag bits in the opcode word
pub const FLAGS_SHIFT: u16 = 9;

/// One script instruction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScriptInstruction {
	/// Call of a known handler
	Call {
		/// Handler id
		handler: u16,
		/// Opcode flag bits
		flags: u8,
		/// Arguments, one per handler parameter
		args: Vec<i64>,
	},
	/// Unknown handler; holds the rest of the stream
	Unknown {
		/// Raw bytes
		bytes: Vec<u8>,
	},
}

impl ScriptInstruction {
	/// Builds a call by mnemonic.
	///
	/// Returns `None` if the handler is unknown or `args` has the wrong length.
	pub fn call(name: &str, args: &[i64]) -> Option<Self> {
		let def = handler_by_name(name)?;
		(def.params.len() == args.len()).then(|| Self::Call {
			handler: def.id,
			flags: 0,
			args: args.to_vec(),
		})
	}

	/// Handler definition of a call
	pub fn def(&self) -> Option<&'static HandlerDef> {
		match self {
			Self::Call {
				handler,
				..
			} => handler_def(*handler),
			Self::Unknown {
				..
			} => None,
		}
	}

	/// Mnemonic
	pub fn name(&self) -> &'static str {
		self.def().map_or("unknown", |def| def.name)
	}

	/// Encoded size in bytes
	pub fn byte_size(&self) -> usize {
		match self {
			Self::Call {
				..
			} => self.def().map_or(2, HandlerDef::byte_len),
			Self::Unknown {
				bytes,
			} => bytes.len(),
		}
	}

	/// Appends the encoded instruction to `out`
	pub fn encode_into(&self, out: &mut Vec<u8>) {
		match self {
			Self::Call {
				handler,
				flags,
				args,
			} => {
				let word = (handler & HANDLER_MASK) | (u16::from(*flags) << FLAGS_SHIFT);
				out.extend_from_slice(&word.to_le_bytes());
				if let Some(def) = self.def() {
					for (i, param) in def.params.iter().enumerate() {
						param.encode_into(args.get(i).copied().unwrap_or(0), out);
					}
				}
			}
			Self::Unknown {
				bytes,
			} => out.extend_from_slice(bytes),
		}
	}
}

impl Display for ScriptInstruction {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Call {
				flags,
				args,
				..
			} => {
				write!(f, "{}", self.name())?;
				if *flags != 0 {
					write!(f, " [flags {flags:#04x}]")?;
				}
				for arg in args {
					write!(f, " {arg}")?;
				}
				Ok(())
			}
			Self::Unknown {
				bytes,
			} => write!(f, "unknown ({} bytes)", bytes.len()),
		}
	}
}

/// Contents of the `script` section
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
pub struct ScriptStream {
	/// Decoded instructions
	pub instructions: Vec<ScriptInstruction>,
	/// Bytes too short to hold the next instruction
	pub trailing: Vec<u8>,
}

impl ScriptStream {
	/// Decodes a stream spanning all of `data`
	pub fn from_bytes(data: &[u8]) -> Self {
		let mut instructions = Vec::new();
		let mut pos = 0;

		while pos + 2 <= data.len() {
			let word = u16::from_le_bytes([data[pos], data[pos + 1]]);
			let handler = word & HANDLER_MASK;
			let flags = (word >> FLAGS_SHIFT) as u8;

			let Some(def) = handler_def(handler) else {
				log::debug!("script: unknown handler {handler} at +{pos}");
				instructions.push(ScriptInstruction::Unknown {
					bytes: data[pos..].to_vec(),
				});
				pos = data.len();
				break;
			};

			let end = pos + def.byte_len();
			if end > data.len() {
				log::debug!("script: {} at +{pos} crosses the section end", def.name);
				break;
			}

			let mut at = pos + 2;
			let args = def
				.params
				.iter()
				.map(|param| {
					let value = param.decode(&data[at..]);
					at += param.size();
					value
				})
				.collect();
			instructions.push(ScriptInstruction::Call {
				handler,
				flags,
				args,
			});
			pos = end;
		}

		Self {
			instructions,
			trailing: data[pos..].to_vec(),
		}
	}

	/// Encodes the stream
	pub fn to_bytes(&self) -> Vec<u8> {
		let mut out = Vec::with_capacity(self.byte_len());
		for instruction in &self.instructions {
			instruction.encode_into(&mut out);
		}
		out.extend_from_slice(&self.trailing);
		out
	}

	/// Encoded size in bytes
	pub fn byte_len(&self) -> usize {
		self.instructions.iter().map(ScriptInstruction::byte_size).sum::<usize>()
			+ self.trailing.len()
	}

	/// Byte offset of instruction `index` within the stream
	pub fn offset_of(&self, index: usize) -> usize {
		self.instructions.iter().take(index).map(ScriptInstruction::byte_size).sum()
	}
}

impl SectionCodec for ScriptStream {
	const SECTION: SectionId = SectionId::Script;

	fn parse<S: ByteSource + ?Sized>(
		source: &S,
		address: u32,
		len: usize,
	) -> Result<Self, EfxError> {
		Ok(Self::from_bytes(&source.read_bytes(address, len)?))
	}

	fn serialize_to_bytes(&self) -> Vec<u8> {
		self.to_bytes()
	}

	fn byte_size(&self) -> usize {
		self.byte_len()
	}
}
