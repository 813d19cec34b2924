//! Sprite sequencing bytecode (`animation` section).
//!
//! ```text
//! Opcode  Size  Instruction
//! ------  ----  ----------------------------------------
//! 0x00    3     display     frameset:u8  ticks:u8
//! 0x01    1     end
//! 0x02    5     display     frameset:u16 ticks:u16
//! 0x03    3     jump        offset:u16
//! ```
//!
//! Any other opcode, or an instruction cut short by the section end, stops
//! decoding; the remaining bytes are kept as [`SequenceInstruction::Unknown`].

use std::fmt::Display;

use serde::Serialize;

use crate::container::SectionId;
use crate::error::EfxError;
use crate::memory::ByteSource;

use super::SectionCodec;

/// Short display opcode
pub const OP_DISPLAY: u8 = 0x00;
/// End opcode
pub const OP_END: u8 = 0x01;
/// Long display opcode
pub const OP_DISPLAY_LONG: u8 = 0x02;
/// Jump opcode
pub const OP_JUMP: u8 = 0x03;

/// One sequencing instruction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SequenceInstruction {
	/// Show a frameset for a number of ticks
	Display {
		/// Frameset index
		frameset: u8,
		/// Duration in ticks
		ticks: u8,
	},
	/// Stop the sequence
	End,
	/// Show a frameset, wide operands
	DisplayLong {
		/// Frameset index
		frameset: u16,
		/// Duration in ticks
		ticks: u16,
	},
	/// Continue at a byte offset within the stream
	Jump {
		/// Target offset
		offset: u16,
	},
	/// Undecodable rest of the stream
	Unknown {
		/// Raw bytes
		bytes: Vec<u8>,
	},
}

impl SequenceInstruction {
	/// Creates a display instruction, choosing the short form when it fits
	pub fn display(frameset: u16, ticks: u16) -> Self {
		match (u8::try_from(frameset), u8::try_from(ticks)) {
			(Ok(frameset), Ok(ticks)) => Self::Display {
				frameset,
				ticks,
			},
			_ => Self::DisplayLong {
				frameset,
				ticks,
			},
		}
	}

	/// Creates a jump instruction
	pub fn jump(offset: u16) -> Self {
		Self::Jump {
			offset,
		}
	}

	/// Returns `true` for the end marker
	pub fn is_end(&self) -> bool {
		matches!(self, Self::End)
	}

	/// Returns `true` for either display form
	pub fn is_display(&self) -> bool {
		matches!(self, Self::Display { .. } | Self::DisplayLong { .. })
	}

	/// Frameset and ticks of a display instruction
	pub fn frame_and_ticks(&self) -> Option<(u16, u16)> {
		match self {
			Self::Display {
				frameset,
				ticks,
			} => Some((u16::from(*frameset), u16::from(*ticks))),
			Self::DisplayLong {
				frameset,
				ticks,
			} => Some((*frameset, *ticks)),
			_ => None,
		}
	}

	/// Encoded size in bytes
	pub fn byte_size(&self) -> usize {
		match self {
			Self::Display {
				..
			}
			| Self::Jump {
				..
			} => 3,
			Self::End => 1,
			Self::DisplayLong {
				..
			} => 5,
			Self::Unknown {
				bytes,
			} => bytes.len(),
		}
	}

	/// Decodes one instruction from the start of `data`.
	///
	/// Returns `None` for an unknown opcode or a truncated instruction.
	pub fn from_bytes(data: &[u8]) -> Option<Self> {
		let word = |at: usize| u16::from_le_bytes([data[at], data[at + 1]]);
		match *data.first()? {
			OP_DISPLAY if data.len() >= 3 => Some(Self::Display {
				frameset: data[1],
				ticks: data[2],
			}),
			OP_END => Some(Self::End),
			OP_DISPLAY_LONG if data.len() >= 5 => Some(Self::DisplayLong {
				frameset: word(1),
				ticks: word(3),
			}),
			OP_JUMP if data.len() >= 3 => Some(Self::jump(word(1))),
			_ => None,
		}
	}

	/// Appends the encoded instruction to `out`
	pub fn encode_into(&self, out: &mut Vec<u8>) {
		match self {
			Self::Display {
				frameset,
				ticks,
			} => out.extend_from_slice(&[OP_DISPLAY, *frameset, *ticks]),
			Self::End => out.push(OP_END),
			Self::DisplayLong {
				frameset,
				ticks,
			} => {
				out.push(OP_DISPLAY_LONG);
				out.extend_from_slice(&frameset.to_le_bytes());
				out.extend_from_slice(&ticks.to_le_bytes());
			}
			Self::Jump {
				offset,
			} => {
				out.push(OP_JUMP);
				out.extend_from_slice(&offset.to_le_bytes());
			}
			Self::Unknown {
				bytes,
			} => out.extend_from_slice(bytes),
		}
	}
}

impl Display for SequenceInstruction {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Display {
				frameset,
				ticks,
			} => write!(f, "display {frameset} x{ticks}"),
			Self::End => write!(f, "end"),
			Self::DisplayLong {
				frameset,
				ticks,
			} => write!(f, "display.l {frameset} x{ticks}"),
			Self::Jump {
				offset,
			} => write!(f, "jump +{offset}"),
			Self::Unknown {
				bytes,
			} => write!(f, "unknown ({} bytes)", bytes.len()),
		}
	}
}

/// Contents of the `animation` section
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
pub struct SequenceStream {
	/// Decoded instructions
	pub instructions: Vec<SequenceInstruction>,
}

impl SequenceStream {
	/// Decodes a stream spanning all of `data`
	pub fn from_bytes(data: &[u8]) -> Self {
		let mut instructions = Vec::new();
		let mut pos = 0;
		while pos < data.len() {
			match SequenceInstruction::from_bytes(&data[pos..]) {
				Some(instruction) => {
					pos += instruction.byte_size();
					instructions.push(instruction);
				}
				None => {
					log::debug!("sequence: opaque tail at +{pos} (opcode 0x{:02X})", data[pos]);
					instructions.push(SequenceInstruction::Unknown {
						bytes: data[pos..].to_vec(),
					});
					break;
				}
			}
		}
		Self {
			instructions,
		}
	}

	/// Encodes the stream
	pub fn to_bytes(&self) -> Vec<u8> {
		let mut out = Vec::with_capacity(self.byte_len());
		for instruction in &self.instructions {
			instruction.encode_into(&mut out);
		}
		out
	}

	/// Encoded size in bytes
	pub fn byte_len(&self) -> usize {
		self.instructions.iter().map(SequenceInstruction::byte_size).sum()
	}

	/// Total ticks shown before the first end or jump
	pub fn duration(&self) -> u32 {
		self.instructions
			.iter()
			.take_while(|i| i.is_display())
			.filter_map(SequenceInstruction::frame_and_ticks)
			.map(|(_, ticks)| u32::from(ticks))
			.sum()
	}
}

impl SectionCodec for SequenceStream {
	const SECTION: SectionId = SectionId::Animation;

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

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_decode_all_opcodes() {
		let data = [0x00, 3, 10, 0x02, 0x00, 0x01, 0x2C, 0x01, 0x03, 0x00, 0x00, 0x01];
		let stream = SequenceStream::from_bytes(&data);
		assert_eq!(
			stream.instructions,
			vec![
				SequenceInstruction::display(3, 10),
				SequenceInstruction::display(256, 300),
				SequenceInstruction::jump(0),
				SequenceInstruction::End,
			]
		);
		assert_eq!(stream.to_bytes(), data);
		assert_eq!(stream.byte_len(), 12);
	}

	#[test]
	fn test_display_picks_form() {
		assert_eq!(SequenceInstruction::display(5, 255).byte_size(), 3);
		assert_eq!(SequenceInstruction::display(5, 256).byte_size(), 5);
	}

	#[test]
	fn test_unknown_opcode_keeps_tail() {
		let data = [0x01, 0x07, 0xAA, 0xBB];
		let stream = SequenceStream::from_bytes(&data);
		assert_eq!(stream.instructions.len(), 2);
		assert_eq!(
			stream.instructions[1],
			SequenceInstruction::Unknown {
				bytes: vec![0x07, 0xAA, 0xBB]
			}
		);
		assert_eq!(stream.to_bytes(), data);
	}

	#[test]
	fn test_truncated_instruction_kept() {
		let stream = SequenceStream::from_bytes(&[0x02, 0x01, 0x00]);
		assert_eq!(stream.byte_len(), 3);
		assert!(matches!(stream.instructions[0], SequenceInstruction::Unknown { .. }));
	}

	#[test]
	fn test_duration() {
		let stream = SequenceStream {
			instructions: vec![
				SequenceInstruction::display(0, 4),
				SequenceInstruction::display(1, 600),
				SequenceInstruction::End,
				SequenceInstruction::display(2, 9),
			],
		};
		assert_eq!(stream.duration(), 604);
		assert_eq!(stream.instructions[1].to_string(), "display.l 1 x600");
	}
}
