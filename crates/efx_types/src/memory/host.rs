//! Host emulator collaborators.
//!
//! The core never drives the emulator itself. It consumes two things from the
//! host: a way to halt the emulated program around a mutation, and the event
//! "a live effect image is now available at address A", which is modelled by
//! the [`Capture`] state machine.

/// Pause/resume control of the emulated target.
pub trait HostControl {
	/// Halts the emulated program
	fn pause(&mut self);

	/// Resumes the emulated program
	fn resume(&mut self);
}

/// Runs `f` with the host paused, resuming afterwards even when `f` fails.
pub fn with_paused<H, T>(host: &mut H, f: impl FnOnce() -> T) -> T
where
	H: HostControl + ?Sized,
{
	host.pause();
	let result = f();
	host.resume();
	result
}

/// Capture progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureState {
	/// Nothing requested
	#[default]
	Idle,
	/// Waiting for the program counter to reach `breakpoint`
	Armed {
		/// Breakpoint address
		breakpoint: u32,
	},
	/// An effect image was found at `address`
	Captured {
		/// Address of the effect header in the live image
		address: u32,
	},
}

/// Breakpoint-driven capture of a live effect image.
///
/// `Idle → Armed → Captured`; [`take`](Self::take) hands the captured address
/// to the caller and returns to `Idle`.
#[derive(Debug, Clone, Default)]
pub struct Capture {
	state: CaptureState,
}

impl Capture {
	/// Creates an idle capture
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the current state
	pub fn state(&self) -> CaptureState {
		self.state
	}

	/// Arms the capture at `breakpoint`, replacing any previous state
	pub fn arm(&mut self, breakpoint: u32) {
		log::debug!("capture armed at 0x{breakpoint:08X}");
		self.state = CaptureState::Armed {
			breakpoint,
		};
	}

	/// Feeds a breakpoint hit from the host.
	///
	/// Returns `true` when the hit matched the armed breakpoint and the
	/// capture moved to `Captured`.
	pub fn on_breakpoint(&mut self, pc: u32, effect_address: u32) -> bool {
		match self.state {
			CaptureState::Armed {
				breakpoint,
			} if breakpoint == pc => {
				log::info!("captured effect image at 0x{effect_address:08X}");
				self.state = CaptureState::Captured {
					address: effect_address,
				};
				true
			}
			_ => false,
		}
	}

	/// Takes the captured address, returning to `Idle`
	pub fn take(&mut self) -> Option<u32> {
		match self.state {
			CaptureState::Captured {
				address,
			} => {
				self.state = CaptureState::Idle;
				Some(address)
			}
			_ => None,
		}
	}

	/// Cancels any pending capture
	pub fn reset(&mut self) {
		self.state = CaptureState::Idle;
	}
}
