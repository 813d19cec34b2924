//! Benchmark helper utilities for efx-rs
//!
//! Builds synthetic effect containers and memory images so the codec and
//! shifting benchmarks run without game data.

use efx_types::codec::{
	AnimCurve, AnimCurveTable, EffectData, Emitter, FlagBlock, Frame, FrameTable, Frameset,
	ScriptInstruction, ScriptStream, SectionCodec, SequenceInstruction, SequenceStream, SmdEvent,
	SoundChannel, SoundDefinition, Timeline,
};
use efx_types::container::{HEADER_SIZE, Header, SectionId};
use efx_types::memory::{ByteSink, VecMemory};

/// Address the synthetic effects are built for
pub const BASE: u32 = 0x8010_0000;

/// Builds a container with `emitters` emitters and `curves` animation curves
pub fn generate_effect(emitters: usize, curves: usize) -> Vec<u8> {
	let mut effect_data = EffectData::default();
	for i in 0..emitters {
		let mut emitter = Emitter::new();
		emitter.set_field("emitter_type", (i % 8) as i64);
		effect_data.add_emitter(emitter);
	}

	let script = ScriptStream {
		instructions: (0..64)
			.filter_map(|i| ScriptInstruction::call("wait", &[i]))
			.chain(ScriptInstruction::call("end", &[]))
			.collect(),
		trailing: Vec::new(),
	};

	let animation = SequenceStream {
		instructions: (0..32)
			.map(|i| SequenceInstruction::display(i, 4))
			.chain([SequenceInstruction::End])
			.collect(),
	};

	let sections = [
		FrameTable {
			framesets: vec![Frameset {
				frames: vec![Frame::default(); 4],
			}],
		}
		.serialize_to_bytes(),
		animation.serialize_to_bytes(),
		script.serialize_to_bytes(),
		effect_data.serialize_to_bytes(),
		AnimCurveTable {
			curves: (0..curves).map(|i| AnimCurve::flat(i as u8)).collect(),
		}
		.serialize_to_bytes(),
		Vec::new(),
		FlagBlock::default().serialize_to_bytes(),
		Timeline::default().serialize_to_bytes(),
		SoundDefinition {
			resource_id: 1,
			reserved: [0; 8],
			channels: vec![SoundChannel {
				events: vec![SmdEvent::note(0x3C, 0x60); 16],
			}],
		}
		.serialize_to_bytes(),
		vec![0xA5; 0x2000],
	];

	let mut header = Header::default();
	let mut body = Vec::new();
	let mut cursor = BASE + HEADER_SIZE as u32;
	for (id, bytes) in SectionId::ALL.iter().zip(sections) {
		if id.is_optional() {
			continue;
		}
		header.set_pointer(*id, cursor);
		cursor += bytes.len() as u32;
		body.extend(bytes);
	}

	let mut out = header.to_bytes().to_vec();
	out.extend(body);
	out
}

/// Loads `effect` at [`BASE`] into an image with `slack` free bytes behind it
pub fn load_image(effect: &[u8], slack: usize) -> VecMemory {
	let mut mem = VecMemory::new(BASE, effect.len() + slack);
	mem.write_bytes(BASE, effect).unwrap();
	mem
}

/// Common benchmark sizes as `(emitters, curves)`
pub mod sizes {
	/// A handful of emitters
	pub const SMALL: (usize, usize) = (4, 2);
	/// Mid-sized effect
	pub const MEDIUM: (usize, usize) = (32, 16);
	/// Stress size
	pub const LARGE: (usize, usize) = (128, 64);
}

#[cfg(test)]
mod tests {
	use super::*;
	use efx_types::config::EditorConfig;
	use efx_types::session::Session;

	#[test]
	fn test_generated_effect_parses() {
		let (emitters, curves) = sizes::SMALL;
		let data = generate_effect(emitters, curves);
		let session = Session::from_buffer(&data, BASE, EditorConfig::default()).unwrap();
		assert!(session.violations().is_empty());
		assert_eq!(session.records().effect_data.emitters.len(), emitters);
		assert_eq!(session.records().anim_table.curves.len(), curves);
	}

	#[test]
	fn test_load_image_leaves_slack() {
		let data = generate_effect(1, 1);
		let mem = load_image(&data, 0x100);
		assert_eq!(mem.as_slice().len(), data.len() + 0x100);
		assert_eq!(&mem.as_slice()[..data.len()], &data[..]);
	}
}
