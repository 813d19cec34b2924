//! Header and section table model.
//!
//! # Container Layout
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  ------------------------------------------
//! 0x00    4     frames        sprite framesets
//! 0x04    4     animation     sprite sequencing bytecode
//! 0x08    4     script        effect control bytecode
//! 0x0C    4     effect_data   particle header + emitters
//! 0x10    4     anim_table    animation curves
//! 0x14    4     timing_curve  nibble-packed curves (0 = absent)
//! 0x18    4     effect_flags  effect / sound flag words
//! 0x1C    4     timeline      channels, cameras, colour tracks
//! 0x20    4     sound_def     `feds` block
//! 0x24    4     texture       texture data
//! ```
//!
//! Every pointer is an absolute address. A section spans from its pointer to
//! the next present pointer in address order; the last one ends at the end of
//! the effect.

mod header;
mod section;

use std::fmt::Display;

use serde::Serialize;

pub use self::header::{HEADER_SIZE, Header};
pub use self::section::{SECTION_COUNT, SECTIONS, SectionDescriptor, SectionId};

/// Byte range `[start, end)` occupied by a section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Extent {
	/// First address of the section
	pub start: u32,
	/// One past the last address of the section
	pub end: u32,
}

impl Extent {
	/// Length of the section in bytes
	pub fn len(&self) -> usize {
		self.end.saturating_sub(self.start) as usize
	}

	/// Returns `true` when the section is empty
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

/// Computes the extent of every present section.
///
/// Sections are ordered by address; each one ends where the next one starts
/// and the last one ends at `end`.
pub fn compute_extents(header: &Header, end: u32) -> [Option<Extent>; SECTION_COUNT] {
	let mut extents = [None; SECTION_COUNT];
	let order = header.address_order();

	for (i, &(id, start)) in order.iter().enumerate() {
		let next = order.get(i + 1).map_or(end, |&(_, next_start)| next_start);
		extents[id.index()] = Some(Extent {
			start,
			end: next.max(start),
		});
	}

	extents
}

/// A structural problem found in a header.
///
/// Violations are reported, never raised: a partially understood container
/// can still be inspected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
	/// A present section starts before the preceding present section
	OutOfOrder {
		/// Offending section
		section: SectionId,
		/// Its pointer
		pointer: u32,
		/// Preceding present section in nominal order
		previous: SectionId,
		/// Pointer of the preceding section
		previous_pointer: u32,
	},
	/// A pointer lies outside `[base + HEADER_SIZE, end]`
	OutOfRange {
		/// Offending section
		section: SectionId,
		/// Its pointer
		pointer: u32,
	},
	/// A section is larger than the configured bound
	SectionTooLarge {
		/// Offending section
		section: SectionId,
		/// Computed size
		size: usize,
		/// Configured maximum
		max: usize,
	},
	/// A section's bytes could not be decoded and are kept verbatim
	Undecodable {
		/// Offending section
		section: SectionId,
		/// Decoder error
		reason: String,
	},
}

impl Display for Violation {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::OutOfOrder {
				section,
				pointer,
				previous,
				previous_pointer,
			} => write!(
				f,
				"{section} (0x{pointer:08X}) starts before {previous} (0x{previous_pointer:08X})"
			),
			Self::OutOfRange {
				section,
				pointer,
			} => write!(f, "{section} pointer 0x{pointer:08X} is outside the effect"),
			Self::SectionTooLarge {
				section,
				size,
				max,
			} => write!(f, "{section} spans {size} bytes, more than the {max} byte limit"),
			Self::Undecodable {
				section,
				reason,
			} => write!(f, "{section} could not be decoded: {reason}"),
		}
	}
}

/// Checks pointer ordering, pointer range and section sizes.
///
/// `base` is the address of the header and `end` one past the last byte of
/// the effect.
pub fn validate(header: &Header, base: u32, end: u32, max_section_size: usize) -> Vec<Violation> {
	let mut violations = Vec::new();
	let lowest = base.saturating_add(HEADER_SIZE as u32);

	let mut previous: Option<(SectionId, u32)> = None;
	for id in SectionId::ALL {
		if !header.is_present(id) {
			continue;
		}
		let pointer = header.pointer(id);

		if pointer < lowest || pointer > end {
			violations.push(Violation::OutOfRange {
				section: id,
				pointer,
			});
		}

		if let Some((previous_id, previous_pointer)) = previous
			&& pointer < previous_pointer
		{
			violations.push(Violation::OutOfOrder {
				section: id,
				pointer,
				previous: previous_id,
				previous_pointer,
			});
		}
		previous = Some((id, pointer));
	}

	for (id, extent) in SectionId::ALL.iter().zip(compute_extents(header, end)) {
		if let Some(extent) = extent
			&& extent.len() > max_section_size
		{
			violations.push(Violation::SectionTooLarge {
				section: *id,
				size: extent.len(),
				max: max_section_size,
			});
		}
	}

	violations
}
