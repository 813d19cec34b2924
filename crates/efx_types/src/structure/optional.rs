//! Insertion and removal of the optional timing curve section.

use crate::codec::flags::FLAG_BLOCK_SIZE;
use crate::codec::timing_curve::TIMING_CURVE_SIZE;
use crate::codec::{FlagBlock, SectionCodec, TimingCurve};
use crate::config::EditorConfig;
use crate::container::SectionId;
use crate::error::EfxError;
use crate::memory::{ByteSink, MemoryImage};

use super::{
	MemoryLayout, ShiftStep, check_step, image_range, offset_address, read_memory_layout,
	shift_bytes,
};

const BLOCK: i64 = TIMING_CURVE_SIZE as i64;

/// Moves every section at or after `anchor` in address order by `delta`
fn move_from(layout: &mut MemoryLayout, anchor: SectionId, delta: i64) -> Result<(), EfxError> {
	let order = layout.header.address_order();
	let Some(position) = order.iter().position(|&(id, _)| id == anchor) else {
		return Ok(());
	};
	for &(id, ptr) in &order[position..] {
		let moved = offset_address(ptr, delta)
			.ok_or_else(|| EfxError::capacity(format!("{id}: pointer leaves the address space")))?;
		layout.header.set_pointer(id, moved);
	}
	layout.end = offset_address(layout.end, delta)
		.ok_or_else(|| EfxError::capacity("effect end leaves the address space"))?;
	Ok(())
}

/// Inserts a timing curve section in front of `effect_flags`.
///
/// Every section from `effect_flags` on moves up by 600 bytes and the new
/// block is filled with the default curves. Returns `Ok(false)` when the live
/// header already has a timing curve.
pub fn add_timing_curve<M: MemoryImage + ?Sized>(
	mem: &mut M,
	layout: &mut MemoryLayout,
	config: &EditorConfig,
) -> Result<bool, EfxError> {
	let live = read_memory_layout(mem, layout.base, layout.end)?;
	if live.header.is_present(SectionId::TimingCurve) {
		log::debug!(
			"timing_curve already present at 0x{:08X}",
			live.header.pointer(SectionId::TimingCurve)
		);
		*layout = live;
		return Ok(false);
	}

	let insert_at = live.header.pointer(SectionId::EffectFlags);
	let step = ShiftStep {
		section: SectionId::TimingCurve,
		delta: BLOCK,
		shift_start: insert_at,
		region_end: live.end,
	};
	check_step(&step, insert_at, &image_range(mem), config)?;

	let mut after = live;
	move_from(&mut after, SectionId::EffectFlags, BLOCK)?;
	after.header.set_pointer(SectionId::TimingCurve, insert_at);

	shift_bytes(mem, step.shift_start, step.len(), step.delta)?;
	TimingCurve::default().write_to_memory(mem, insert_at)?;
	// includes the timing_curve slot, which was zero
	for id in SectionId::ALL {
		if after.header.pointer(id) != live.header.pointer(id) {
			mem.write32(after.base + id.header_offset() as u32, after.header.pointer(id))?;
		}
	}
	mem.refresh();

	log::info!("timing_curve inserted at 0x{insert_at:08X}, later sections moved by +{BLOCK}");
	*layout = after;
	Ok(true)
}

/// Removes the timing curve section.
///
/// Every later section moves down by 600 bytes, the pointer becomes zero and
/// the flag bits referring to the curves are cleared in the live flag block.
/// Returns `Ok(false)` when the live header has no timing curve.
pub fn remove_timing_curve<M: MemoryImage + ?Sized>(
	mem: &mut M,
	layout: &mut MemoryLayout,
	config: &EditorConfig,
) -> Result<bool, EfxError> {
	let live = read_memory_layout(mem, layout.base, layout.end)?;
	if !live.header.is_present(SectionId::TimingCurve) {
		*layout = live;
		return Ok(false);
	}

	let start = live.header.pointer(SectionId::TimingCurve);
	let block_end = offset_address(start, BLOCK)
		.ok_or_else(|| EfxError::capacity("timing_curve leaves the address space"))?;
	let step = ShiftStep {
		section: SectionId::TimingCurve,
		delta: -BLOCK,
		shift_start: block_end,
		region_end: live.end,
	};
	check_step(&step, start, &image_range(mem), config)?;

	let mut after = live;
	if let Some((next, _)) = live.header.next_in_memory(SectionId::TimingCurve) {
		move_from(&mut after, next, -BLOCK)?;
	} else {
		after.end = offset_address(live.end, -BLOCK)
			.ok_or_else(|| EfxError::capacity("effect end leaves the address space"))?;
	}
	after.header.set_pointer(SectionId::TimingCurve, 0);

	shift_bytes(mem, step.shift_start, step.len(), step.delta)?;
	for id in SectionId::ALL {
		if after.header.pointer(id) != live.header.pointer(id) {
			mem.write32(after.base + id.header_offset() as u32, after.header.pointer(id))?;
		}
	}

	let flags_at = after.header.pointer(SectionId::EffectFlags);
	let mut flags = FlagBlock::parse_from_memory(mem, flags_at, FLAG_BLOCK_SIZE)?;
	if flags.uses_timing_curve() {
		flags.clear_timing_curve();
		flags.write_to_memory(mem, flags_at)?;
	}
	mem.refresh();

	log::info!("timing_curve removed from 0x{start:08X}, later sections moved by -{BLOCK}");
	*layout = after;
	Ok(true)
}
