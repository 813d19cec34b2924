//! Structure manager.
//!
//! Moves bytes in a live memory image when a section's logical size differs
//! from the size it occupies, and rewrites every header pointer behind the
//! edit point.
//!
//! # Shifting
//!
//! For a section `S` changing by `Δ` bytes, the region from the next section in
//! address order up to the end of the effect moves by `Δ`:
//!
//! ```text
//!            S.ptr        shift_start                     end
//! before:    |---- S ----|---- later sections ---------|
//! after:     |---- S + Δ ----|---- later sections ---------|
//!                            shift_start + Δ               end + Δ
//! ```
//!
//! Growing copies from the top down, shrinking from the bottom up, so the
//! overlapping ranges never clobber unread bytes. Bytes opened up by a growth
//! are zero-filled.
//!
//! A change set is planned completely before the first byte moves. If any step
//! fails a bound check the image is left untouched.

mod delta;
mod optional;


use std::ops::Range;

use serde::Serialize;

use crate::config::EditorConfig;
use crate::container::{Extent, Header, SECTION_COUNT, SectionId, compute_extents};
use crate::error::EfxError;
use crate::memory::{ByteSink, ByteSource, MemoryImage};

pub use self::delta::{
	anim_table_delta, animation_delta, compute_all_deltas, effect_data_delta, frames_delta,
	script_delta, sound_def_delta,
};
pub use self::optional::{add_timing_curve, remove_timing_curve};

/// Bytes moved per copy when shifting
pub const SHIFT_CHUNK: usize = 0x800;

/// Header pointers and the end of an effect as seen in the live image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryLayout {
	/// Address of the header
	pub base: u32,
	/// One past the last byte of the effect
	pub end: u32,
	/// Section pointers
	pub header: Header,
}

impl MemoryLayout {
	/// Extent of every present section
	pub fn extents(&self) -> [Option<Extent>; SECTION_COUNT] {
		compute_extents(&self.header, self.end)
	}

	/// Extent of one section
	pub fn extent(&self, id: SectionId) -> Option<Extent> {
		self.extents()[id.index()]
	}

	/// Writes the pointers that differ from `previous` to the header in `target`.
	///
	/// `timing_curve` is only written when `live_timing` is non-zero, so an
	/// absent slot is never touched.
	fn write_changed_pointers<T: ByteSink + ?Sized>(
		&self,
		target: &mut T,
		previous: &Header,
		live_timing: u32,
	) -> Result<(), EfxError> {
		for id in SectionId::ALL {
			let value = self.header.pointer(id);
			if value == previous.pointer(id) {
				continue;
			}
			if id == SectionId::TimingCurve && live_timing == 0 {
				continue;
			}
			log::debug!("{id}: pointer 0x{:08X} -> 0x{value:08X}", previous.pointer(id));
			target.write32(self.base + id.header_offset() as u32, value)?;
		}
		Ok(())
	}
}

/// Snapshots the live header at `base`.
///
/// The header does not record where the effect ends, so the caller passes the
/// end it is tracking.
pub fn read_memory_layout<S: ByteSource + ?Sized>(
	source: &S,
	base: u32,
	end: u32,
) -> Result<MemoryLayout, EfxError> {
	Ok(MemoryLayout {
		base,
		end,
		header: Header::parse(source, base)?,
	})
}

/// A requested size change of one section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SectionDelta {
	/// Section whose size changes
	pub section: SectionId,
	/// Signed size difference in bytes
	pub delta: i64,
}

impl SectionDelta {
	/// Creates a delta
	pub fn new(section: SectionId, delta: i64) -> Self {
		Self {
			section,
			delta,
		}
	}
}

/// One planned byte move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ShiftStep {
	/// Section that changes size
	pub section: SectionId,
	/// Signed size difference
	pub delta: i64,
	/// First byte of the moved region
	pub shift_start: u32,
	/// One past the last byte of the moved region
	pub region_end: u32,
}

impl ShiftStep {
	/// Length of the moved region
	pub fn len(&self) -> usize {
		self.region_end.saturating_sub(self.shift_start) as usize
	}

	/// Returns `true` if no byte moves
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

/// A validated change set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShiftPlan {
	/// Moves in execution order
	pub steps: Vec<ShiftStep>,
	/// Layout the plan starts from
	pub before: MemoryLayout,
	/// Layout after every step
	pub after: MemoryLayout,
}

impl ShiftPlan {
	/// Returns `true` if the plan changes nothing
	pub fn is_noop(&self) -> bool {
		self.before == self.after
	}
}

pub(crate) fn offset_address(address: u32, delta: i64) -> Option<u32> {
	u32::try_from(i64::from(address) + delta).ok()
}

/// Checks one move against the image bounds and the shift margin.
pub(crate) fn check_step(
	step: &ShiftStep,
	section_start: u32,
	image: &Range<u64>,
	config: &EditorConfig,
) -> Result<(), EfxError> {
	let name = step.section;
	if step.len() > config.shift_margin {
		return Err(EfxError::capacity(format!(
			"{name}: moving {} bytes exceeds the shift margin of {} bytes",
			step.len(),
			config.shift_margin
		)));
	}

	let Some(new_start) = offset_address(step.shift_start, step.delta) else {
		return Err(EfxError::capacity(format!("{name}: shifted region leaves the address space")));
	};
	if new_start < section_start {
		return Err(EfxError::capacity(format!(
			"{name}: shrinking by {} bytes would cut below the section start 0x{section_start:08X}",
			-step.delta
		)));
	}

	let new_end = i64::from(step.region_end) + step.delta;
	let lowest = u64::from(step.shift_start.min(new_start));
	let highest = u64::from(step.region_end).max(new_end.max(0) as u64);
	if lowest < image.start || highest > image.end {
		return Err(EfxError::capacity(format!(
			"{name}: range 0x{lowest:08X}..0x{highest:08X} is outside the image"
		)));
	}
	Ok(())
}

/// Plans a change set without touching memory.
///
/// Deltas are processed in ascending order of their section's pointer. Zero
/// deltas and deltas on absent optional sections are dropped.
pub fn plan_structure_changes(
	layout: &MemoryLayout,
	changes: &[SectionDelta],
	image: Range<u64>,
	config: &EditorConfig,
) -> Result<ShiftPlan, EfxError> {
	let mut pending: Vec<SectionDelta> = Vec::with_capacity(changes.len());
	for change in changes {
		if change.delta == 0 {
			continue;
		}
		if !layout.header.is_present(change.section) {
			log::warn!("{}: ignoring delta {} on an absent section", change.section, change.delta);
			continue;
		}
		pending.push(*change);
	}
	pending.sort_by_key(|c| (layout.header.pointer(c.section), c.section.index()));

	let mut after = *layout;
	let mut steps = Vec::with_capacity(pending.len());

	for change in pending {
		let section_start = after.header.pointer(change.section);
		let order = after.header.address_order();
		let position = order.iter().position(|&(id, _)| id == change.section).unwrap_or(order.len());
		let successors = &order[(position + 1).min(order.len())..];

		let step = ShiftStep {
			section: change.section,
			delta: change.delta,
			shift_start: successors.first().map_or(after.end, |&(_, ptr)| ptr),
			region_end: after.end,
		};
		check_step(&step, section_start, &image, config)?;
		log::debug!(
			"{}: planned shift of 0x{:08X}..0x{:08X} by {}",
			step.section,
			step.shift_start,
			step.region_end,
			step.delta
		);

		for &(id, ptr) in successors {
			let moved = offset_address(ptr, change.delta).ok_or_else(|| {
				EfxError::capacity(format!("{id}: pointer leaves the address space"))
			})?;
			after.header.set_pointer(id, moved);
		}
		after.end = offset_address(after.end, change.delta)
			.ok_or_else(|| EfxError::capacity("effect end leaves the address space"))?;
		steps.push(step);
	}

	Ok(ShiftPlan {
		steps,
		before: *layout,
		after,
	})
}

/// Moves `len` bytes at `start` by `delta`.
///
/// Growing zero-fills the `delta` bytes opened at `start`.
pub fn shift_bytes<M: ByteSource + ByteSink + ?Sized>(
	mem: &mut M,
	start: u32,
	len: usize,
	delta: i64,
) -> Result<(), EfxError> {
	let distance = u32::try_from(delta.unsigned_abs())
		.map_err(|_| EfxError::capacity(format!("shift distance {delta} is too large")))?;

	if delta > 0 {
		let mut remaining = len;
		while remaining > 0 {
			let n = remaining.min(SHIFT_CHUNK);
			let src = start + (remaining - n) as u32;
			let chunk = mem.read_bytes(src, n)?;
			mem.write_bytes(src + distance, &chunk)?;
			remaining -= n;
		}
		mem.write_bytes(start, &vec![0u8; distance as usize])?;
	} else if delta < 0 {
		let mut done = 0;
		while done < len {
			let n = (len - done).min(SHIFT_CHUNK);
			let src = start + done as u32;
			let chunk = mem.read_bytes(src, n)?;
			mem.write_bytes(src - distance, &chunk)?;
			done += n;
		}
	}
	Ok(())
}

fn image_range<M: MemoryImage + ?Sized>(mem: &M) -> Range<u64> {
	u64::from(mem.base())..mem.end()
}

/// Executes a plan produced by [`plan_structure_changes`]
pub fn apply_plan<M: MemoryImage + ?Sized>(
	mem: &mut M,
	plan: &ShiftPlan,
) -> Result<bool, EfxError> {
	if plan.is_noop() {
		return Ok(false);
	}

	let live_timing = mem.read32(plan.before.base + SectionId::TimingCurve.header_offset() as u32)?;
	for step in &plan.steps {
		shift_bytes(mem, step.shift_start, step.len(), step.delta)?;
	}
	plan.after.write_changed_pointers(mem, &plan.before.header, live_timing)?;
	mem.refresh();

	log::info!(
		"applied {} shift(s), effect end 0x{:08X} -> 0x{:08X}",
		plan.steps.len(),
		plan.before.end,
		plan.after.end
	);
	Ok(true)
}

/// Applies a batch of size changes to a live image.
///
/// The live pointers are re-read first; `layout.end` supplies the effect end.
/// On success `layout` holds the new pointers and end. Returns `Ok(false)` if
/// nothing had to change.
pub fn apply_structure_changes<M: MemoryImage + ?Sized>(
	mem: &mut M,
	layout: &mut MemoryLayout,
	changes: &[SectionDelta],
	config: &EditorConfig,
) -> Result<bool, EfxError> {
	let live = read_memory_layout(mem, layout.base, layout.end)?;
	let plan = plan_structure_changes(&live, changes, image_range(mem), config)?;
	let changed = apply_plan(mem, &plan)?;
	*layout = plan.after;
	Ok(changed)
}
