//! SMD channel opcode stream.
//!
//! Bytes below 0x80 are note events followed by one parameter byte. Bytes from
//! 0x80 up are commands whose parameter count comes from [`SMD_OPCODES`].
//! Anything the table does not know ends decoding; the rest of the channel is
//! kept as an opaque [`SmdEvent::Unknown`].

use std::fmt::Display;

use serde::Serialize;

/// A known SMD command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SmdOpcode {
	/// Opcode byte
	pub opcode: u8,
	/// Mnemonic
	pub name: &'static str,
	/// Parameter bytes following the opcode
	pub params: usize,
}

const fn op(opcode: u8, name: &'static str, params: usize) -> SmdOpcode {
	SmdOpcode {
		opcode,
		name,
		params,
	}
}

/// Commands from 0x80 up
pub const SMD_OPCODES: &[SmdOpcode] = &[
	op(0x80, "wait_0", 0),
	op(0x81, "wait_1", 0),
	op(0x82, "wait_2", 0),
	op(0x83, "wait_3", 0),
	op(0x84, "wait_4", 0),
	op(0x85, "wait_5", 0),
	op(0x86, "wait_6", 0),
	op(0x87, "wait_7", 0),
	op(0x88, "wait_8", 0),
	op(0x89, "wait_9", 0),
	op(0x8A, "wait_10", 0),
	op(0x8B, "wait_11", 0),
	op(0x8C, "wait_12", 0),
	op(0x8D, "wait_13", 0),
	op(0x8E, "wait_14", 0),
	op(0x8F, "wait_15", 0),
	op(0x90, "repeat_last_wait", 0),
	op(0x91, "add_to_last_wait", 1),
	op(0x92, "wait_u8", 1),
	op(0x93, "wait_u16", 2),
	op(0x94, "wait_u24", 3),
	op(0x95, "check_wait", 1),
	op(0x98, "end_track", 0),
	op(0x99, "loop_point", 0),
	op(0xA0, "set_octave", 1),
	op(0xA1, "add_octave", 1),
	op(0xA4, "set_tempo", 1),
	op(0xA9, "set_bank_low", 1),
	op(0xAA, "set_bank_high", 1),
	op(0xAC, "set_program", 1),
	op(0xBE, "set_modulation", 1),
	op(0xBF, "set_bend_range", 1),
	op(0xD7, "pitch_bend", 2),
	op(0xE0, "set_volume", 1),
	op(0xE3, "set_expression", 1),
	op(0xE8, "set_pan", 1),
	op(0xF8, "set_reverb", 1),
];

/// Looks up a command by opcode byte
pub fn smd_opcode(opcode: u8) -> Option<&'static SmdOpcode> {
	SMD_OPCODES.iter().find(|op| op.opcode == opcode)
}

/// One decoded SMD event
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SmdEvent {
	/// Note event (`key < 0x80`)
	Note {
		/// Key and velocity byte
		key: u8,
		/// Note parameter
		param: u8,
	},
	/// Known command
	Command {
		/// Opcode byte
		opcode: u8,
		/// Parameter bytes
		params: Vec<u8>,
	},
	/// Undecodable tail of the channel
	Unknown {
		/// Raw bytes
		bytes: Vec<u8>,
	},
}

impl SmdEvent {
	/// Creates a note event
	pub fn note(key: u8, param: u8) -> Self {
		Self::Note {
			key,
			param,
		}
	}

	/// Creates a command, or `None` if the opcode or parameter count is wrong
	pub fn command(opcode: u8, params: &[u8]) -> Option<Self> {
		let def = smd_opcode(opcode)?;
		(def.params == params.len()).then(|| Self::Command {
			opcode,
			params: params.to_vec(),
		})
	}

	/// Mnemonic of the event
	pub fn name(&self) -> &'static str {
		match self {
			Self::Note {
				..
			} => "note",
			Self::Command {
				opcode,
				..
			} => smd_opcode(*opcode).map_or("unknown", |op| op.name),
			Self::Unknown {
				..
			} => "unknown",
		}
	}

	/// Encoded size in bytes
	pub fn byte_size(&self) -> usize {
		match self {
			Self::Note {
				..
			} => 2,
			Self::Command {
				params,
				..
			} => 1 + params.len(),
			Self::Unknown {
				bytes,
			} => bytes.len(),
		}
	}

	/// Returns `true` for the end-of-track command
	pub fn is_end(&self) -> bool {
		matches!(self, Self::Command { opcode: 0x98, .. })
	}

	/// Appends the encoded event to `out`
	pub fn encode_into(&self, out: &mut Vec<u8>) {
		match self {
			Self::Note {
				key,
				param,
			} => out.extend_from_slice(&[*key, *param]),
			Self::Command {
				opcode,
				params,
			} => {
				out.push(*opcode);
				out.extend_from_slice(params);
			}
			Self::Unknown {
				bytes,
			} => out.extend_from_slice(bytes),
		}
	}
}

impl Display for SmdEvent {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Note {
				key,
				param,
			} => write!(f, "note {key:#04x} {param}"),
			Self::Command {
				params,
				..
			} => {
				write!(f, "{}", self.name())?;
				for p in params {
					write!(f, " {p}")?;
				}
				Ok(())
			}
			Self::Unknown {
				bytes,
			} => write!(f, "unknown ({} bytes)", bytes.len()),
		}
	}
}

/// Decodes a whole channel stream
pub fn decode_events(data: &[u8]) -> Vec<SmdEvent> {
	let mut events = Vec::new();
	let mut pos = 0;

	while pos < data.len() {
		let opcode = data[pos];
		let params = if opcode < 0x80 {
			Some(1)
		} else {
			smd_opcode(opcode).map(|op| op.params)
		};

		match params {
			Some(n) if pos + 1 + n <= data.len() => {
				let args = &data[pos + 1..pos + 1 + n];
				events.push(if opcode < 0x80 {
					SmdEvent::note(opcode, args[0])
				} else {
					SmdEvent::Command {
						opcode,
						params: args.to_vec(),
					}
				});
				pos += 1 + n;
			}
			_ => {
				log::debug!("smd: opaque tail at +{pos} (opcode 0x{opcode:02X})");
				events.push(SmdEvent::Unknown {
					bytes: data[pos..].to_vec(),
				});
				break;
			}
		}
	}

	events
}

/// Encodes a channel stream
pub fn encode_events(events: &[SmdEvent]) -> Vec<u8> {
	let mut out = Vec::with_capacity(events.iter().map(SmdEvent::byte_size).sum());
	for event in events {
		event.encode_into(&mut out);
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_table_is_sorted_and_unique() {
		for pair in SMD_OPCODES.windows(2) {
			assert!(pair[0].opcode < pair[1].opcode);
		}
		assert!(SMD_OPCODES.iter().all(|op| op.opcode >= 0x80));
	}

	#[test]
	fn test_decode_mixed_stream() {
		let data = [0xA4, 120, 0x3C, 0x64, 0x93, 0x10, 0x00, 0x85, 0x98];
		let events = decode_events(&data);
		assert_eq!(
			events,
			vec![
				SmdEvent::command(0xA4, &[120]).unwrap(),
				SmdEvent::note(0x3C, 0x64),
				SmdEvent::command(0x93, &[0x10, 0x00]).unwrap(),
				SmdEvent::command(0x85, &[]).unwrap(),
				SmdEvent::command(0x98, &[]).unwrap(),
			]
		);
		assert!(events[4].is_end());
		assert_eq!(encode_events(&events), data);
	}

	#[test]
	fn test_unknown_opcode_keeps_tail() {
		let data = [0xE0, 100, 0xC3, 0x01, 0x02];
		let events = decode_events(&data);
		assert_eq!(events.len(), 2);
		assert_eq!(
			events[1],
			SmdEvent::Unknown {
				bytes: vec![0xC3, 0x01, 0x02]
			}
		);
		assert_eq!(encode_events(&events), data);
	}

	#[test]
	fn test_truncated_command_kept_opaque() {
		let data = [0xD7, 0x01];
		assert_eq!(
			decode_events(&data),
			vec![SmdEvent::Unknown {
				bytes: vec![0xD7, 0x01]
			}]
		);
	}

	#[test]
	fn test_command_checks_arity() {
		assert!(SmdEvent::command(0xD7, &[1]).is_none());
		assert!(SmdEvent::command(0x96, &[]).is_none());
		assert_eq!(SmdEvent::command(0xE8, &[64]).map(|e| e.to_string()), Some("set_pan 64".into()));
	}
}
