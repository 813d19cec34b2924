//! Script handler table.

use serde::Serialize;

/// Parameter encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
	/// Unsigned byte
	U8,
	/// Signed byte
	S8,
	/// Unsigned halfword
	U16,
	/// Signed halfword
	S16,
	/// Word
	U32,
}

impl ParamType {
	/// Size in bytes
	pub const fn size(self) -> usize {
		match self {
			Self::U8 | Self::S8 => 1,
			Self::U16 | Self::S16 => 2,
			Self::U32 => 4,
		}
	}

	/// Reads a little-endian value from the start of `data`
	pub fn decode(self, data: &[u8]) -> i64 {
		match self {
			Self::U8 => i64::from(data[0]),
			Self::S8 => i64::from(data[0] as i8),
			Self::U16 => i64::from(u16::from_le_bytes([data[0], data[1]])),
			Self::S16 => i64::from(i16::from_le_bytes([data[0], data[1]])),
			Self::U32 => i64::from(u32::from_le_bytes([data[0], data[1], data[2], data[3]])),
		}
	}

	/// Appends `value` truncated to this width
	pub fn encode_into(self, value: i64, out: &mut Vec<u8>) {
		match self {
			Self::U8 | Self::S8 => out.push(value as u8),
			Self::U16 | Self::S16 => out.extend_from_slice(&(value as u16).to_le_bytes()),
			Self::U32 => out.extend_from_slice(&(value as u32).to_le_bytes()),
		}
	}
}

/// A script handler: name and parameter list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerDef {
	/// Handler id (low 9 bits of the opcode word)
	pub id: u16,
	/// Mnemonic
	pub name: &'static str,
	/// Parameters, in stream order
	pub params: &'static [ParamType],
}

impl HandlerDef {
	/// Instruction length including the opcode word
	pub fn byte_len(&self) -> usize {
		2 + self.params.iter().map(|p| p.size()).sum::<usize>()
	}
}

use ParamType::{S8, S16, U8, U16, U32};

const fn handler(id: u16, name: &'static str, params: &'static [ParamType]) -> HandlerDef {
	HandlerDef {
		id,
		name,
		params,
	}
}

/// Number of known handlers
pub const HANDLER_COUNT: usize = 46;

/// Handler table indexed by id
pub const HANDLERS: [HandlerDef; HANDLER_COUNT] = [
	handler(0, "end", &[]),
	handler(1, "wait", &[U16]),
	handler(2, "spawn_emitter", &[U8, U8]),
	handler(3, "kill_emitter", &[U8, U8]),
	handler(4, "play_sound", &[U16, U16]),
	handler(5, "set_camera", &[U8, U8]),
	handler(6, "shake_screen", &[U16, U16]),
	handler(7, "flash_screen", &[U8, U8, U8, U8, U16]),
	handler(8, "set_color_track", &[U8, U8]),
	handler(9, "jump", &[S16]),
	handler(10, "branch_if_flag", &[U16, S16]),
	handler(11, "loop_start", &[U16]),
	handler(12, "loop_end", &[]),
	handler(13, "set_var", &[U8, U8, S16]),
	handler(14, "add_var", &[U8, U8, S16]),
	handler(15, "call_timeline", &[U16]),
	handler(16, "set_position", &[S16, S16, S16]),
	handler(17, "move_to", &[S16, S16, S16, U16]),
	handler(18, "set_scale", &[U16, U16]),
	handler(19, "set_rotation", &[S16, S16, S16]),
	handler(20, "set_alpha", &[U8, U8]),
	handler(21, "fade", &[U8, U8, U16]),
	handler(22, "show_sprite", &[U16]),
	handler(23, "hide_sprite", &[U16]),
	handler(24, "play_sequence", &[U16, U16]),
	handler(25, "set_target", &[U8, U8]),
	handler(26, "for_each_target", &[U16]),
	handler(27, "end_for_each", &[]),
	handler(28, "damage_tick", &[U16]),
	handler(29, "set_palette", &[U16, U16]),
	handler(30, "wait_sound", &[U16]),
	handler(31, "set_layer", &[U8, U8]),
	handler(32, "set_blend", &[U8, U8]),
	handler(33, "spawn_child", &[U8, U8, S16, S16, S16]),
	handler(34, "stop_sound", &[U16]),
	handler(35, "set_gravity", &[S16, S16, S16]),
	handler(36, "set_timing_curve", &[U8, U8]),
	handler(37, "random_wait", &[U16, U16]),
	handler(38, "sync_phase", &[U8, U8]),
	handler(39, "set_flag", &[U32]),
	handler(40, "clear_flag", &[U32]),
	handler(41, "set_speed", &[S16]),
	handler(42, "attach_to_target", &[U8, S8]),
	handler(43, "detach", &[]),
	handler(44, "nop", &[]),
	handler(45, "halt", &[]),
];

/// Looks a handler up by id
pub fn handler_def(id: u16) -> Option<&'static HandlerDef> {
	HANDLERS.get(usize::from(id))
}

/// Looks a handler up by mnemonic
pub fn handler_by_name(name: &str) -> Option<&'static HandlerDef> {
	HANDLERS.iter().find(|h| h.name == name)
}
