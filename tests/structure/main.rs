//! Editing sessions against a live memory image

use efx_rs::efx_types::session::tests_support::sample_effect;
use efx_rs::prelude::*;

const BASE: u32 = 0x8010_0000;

fn image() -> (VecMemory, usize) {
	let bytes = sample_effect(BASE);
	let mut mem = VecMemory::new(BASE, 0x8000);
	mem.write_bytes(BASE, &bytes).unwrap();
	(mem, bytes.len())
}

fn reopen(mem: &VecMemory, session: &Session) -> Session {
	let size = (session.end() - session.base()) as usize;
	Session::from_memory(mem, session.base(), size, *session.config()).unwrap()
}

#[test_log::test]
fn commit_grown_emitter_table() {
	let (mut mem, size) = image();
	let mut session = Session::from_memory(&mem, BASE, size, EditorConfig::default()).unwrap();
	let timeline_before = session.header().pointer(SectionId::Timeline);

	let mut emitter = Emitter::new();
	assert!(emitter.set_field("emitter_type", 9));
	session.records_mut().effect_data.add_emitter(emitter.clone());
	session.records_mut().effect_data.add_emitter(emitter);

	assert!(session.commit(&mut mem).unwrap());
	assert_eq!(session.end() as usize, BASE as usize + size + 2 * 0xC4);
	assert_eq!(session.header().pointer(SectionId::Timeline), timeline_before + 392);
	assert_eq!(Header::parse(&mem, BASE).unwrap(), *session.header());

	let reopened = reopen(&mem, &session);
	assert!(reopened.violations().is_empty());
	assert_eq!(reopened.records().effect_data.emitters, session.records().effect_data.emitters);
	assert_eq!(reopened.records().effect_data.header.emitter_count(), 5);
	assert_eq!(reopened.records().timeline, session.records().timeline);
	assert_eq!(reopened.records().sound, session.records().sound);
	assert_eq!(reopened.records().effect_data.emitters[4].field("emitter_type"), Some(9));
	assert_eq!(reopened.records().texture, vec![0x5A; 0x40]);
}

#[test_log::test]
fn commit_without_edits_changes_nothing() {
	let (mut mem, size) = image();
	let snapshot = mem.as_slice().to_vec();
	let mut session = Session::from_memory(&mem, BASE, size, EditorConfig::default()).unwrap();

	assert!(!session.commit(&mut mem).unwrap());
	assert_eq!(mem.as_slice(), &snapshot[..]);
}

#[test_log::test]
fn commit_shrunk_script_keeps_neighbours() {
	let (mut mem, size) = image();
	let mut session = Session::from_memory(&mem, BASE, size, EditorConfig::default()).unwrap();
	let original = session.records().clone();

	// drop `set_alpha 1 128`
	session.records_mut().script.instructions.remove(1);
	assert!(session.commit(&mut mem).unwrap());
	assert_eq!(session.end() as usize, BASE as usize + size - 4);

	let reopened = reopen(&mem, &session);
	let records = reopened.records();
	assert_eq!(records.script.instructions.len(), 2);
	assert_eq!(records.script.instructions[1].name(), "end");
	assert_eq!(records.animation, original.animation);
	assert_eq!(records.effect_data, original.effect_data);
	assert_eq!(records.sound, original.sound);
	assert_eq!(records.texture, original.texture);
}

#[test_log::test]
fn timing_curve_insert_and_remove() {
	let (mut mem, size) = image();
	let snapshot = mem.as_slice().to_vec();
	let mut session = Session::from_memory(&mem, BASE, size, EditorConfig::default()).unwrap();
	let flags_at = session.header().pointer(SectionId::EffectFlags);

	assert!(session.add_timing_curve(&mut mem).unwrap());
	assert_eq!(session.header().pointer(SectionId::TimingCurve), flags_at);
	assert_eq!(session.header().pointer(SectionId::EffectFlags), flags_at + 600);

	let reopened = reopen(&mem, &session);
	assert_eq!(reopened.records().timing_curve, Some(TimingCurve::default()));
	assert_eq!(reopened.records().timeline, session.records().timeline);

	assert!(session.remove_timing_curve(&mut mem).unwrap());
	assert_eq!(session.end() as usize, BASE as usize + size);
	assert_eq!(&mem.as_slice()[..size], &snapshot[..size]);
}

#[test_log::test]
fn oversized_shift_is_rejected() {
	let (mut mem, size) = image();
	let snapshot = mem.as_slice().to_vec();
	let config = EditorConfig {
		shift_margin: 0x40,
		..EditorConfig::strict()
	};
	let mut session = Session::from_memory(&mem, BASE, size, config).unwrap();
	session.records_mut().frames.framesets[0].frames.push(Frame::default());

	let err = session.commit(&mut mem).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::Capacity);
	assert_eq!(mem.as_slice(), &snapshot[..]);
	assert_eq!(session.end() as usize, BASE as usize + size);
}

#[test_log::test]
fn file_buffer_roundtrip() {
	let bytes = sample_effect(BASE);
	let mut session = Session::from_buffer(&bytes, BASE, EditorConfig::default()).unwrap();
	assert_eq!(session.to_bytes(), bytes);

	session.records_mut().anim_table.curves.push(AnimCurve::flat(3));
	let rebuilt = session.to_bytes();
	assert_eq!(rebuilt.len(), bytes.len() + 160);

	let reparsed = Session::from_buffer(&rebuilt, BASE, EditorConfig::default()).unwrap();
	assert_eq!(reparsed.records().anim_table.curves.len(), 3);
	assert_eq!(reparsed.records(), session.records());
}
