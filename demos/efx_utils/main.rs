//! Effect container utility.
//!
//! Provides the following subcommands:
//! - `info`: print the header, section extents and structural violations
//! - `dump`: print one section as JSON or as a hex listing
//! - `disasm`: list the animation and script bytecode
//! - `emitters`: add or remove emitters and write the shifted container
//! - `timing`: insert or remove the optional timing curve section
//! - `verify`: check that every section re-encodes to its original bytes
//!
//! Settings are read from `efx.toml` (or `--config`) and `EFX_*` variables.
//!
//! ```bash
//! cargo run --example efx_utils info EFFECT.BIN
//! cargo run --example efx_utils emitters EFFECT.BIN --add 2 -o OUT.BIN
//! cargo run --example efx_utils timing EFFECT.BIN add -o OUT.BIN
//! ```

use std::{
	fs,
	path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use efx_rs::efx_types::container::compute_extents;
use efx_rs::prelude::*;
use serde::Serialize;

/// Extra room behind the effect so edits can grow it
const IMAGE_SLACK: usize = 0x1_0000;

fn main() -> Result<()> {
	env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

	let cli = Cli::parse();
	match cli.command {
		Command::Info(args) => run_info(args),
		Command::Dump(args) => run_dump(args),
		Command::Disasm(args) => run_disasm(args),
		Command::Emitters(args) => run_emitters(args),
		Command::Timing(args) => run_timing(args),
		Command::Verify(args) => run_verify(args),
	}
}

#[derive(Parser)]
#[command(name = "efx_utils")]
#[command(author = "efx-rs project")]
#[command(version)]
#[command(about = "Inspect and structurally edit effect containers", long_about = None)]
struct Cli {
	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand)]
enum Command {
	/// Print the header, section extents and violations
	Info(InfoArgs),
	/// Dump one section
	Dump(DumpArgs),
	/// List the animation and script bytecode
	Disasm(InputArgs),
	/// Add or remove emitters
	Emitters(EmittersArgs),
	/// Insert or remove the timing curve section
	Timing(TimingArgs),
	/// Check that every section re-encodes byte for byte
	Verify(InputArgs),
}

#[derive(Args)]
struct InputArgs {
	/// Effect container file
	#[arg(value_name = "FILE")]
	file: PathBuf,

	/// Configuration file (defaults to built-in settings)
	#[arg(short, long, value_name = "TOML")]
	config: Option<PathBuf>,

	/// Address the header is loaded at, overriding the configuration
	#[arg(short, long, value_name = "ADDR", value_parser = parse_address)]
	base: Option<u32>,
}

#[derive(Args)]
struct InfoArgs {
	#[command(flatten)]
	input: InputArgs,

	/// Print a JSON summary instead of text
	#[arg(long, default_value_t = false)]
	json: bool,
}

#[derive(Args)]
struct DumpArgs {
	#[command(flatten)]
	input: InputArgs,

	/// Section name, e.g. `effect_data` or `timeline`
	#[arg(value_name = "SECTION")]
	section: String,

	/// Print the raw bytes instead of the decoded record
	#[arg(long, default_value_t = false)]
	raw: bool,
}

#[derive(Args)]
struct EmittersArgs {
	#[command(flatten)]
	input: InputArgs,

	/// Number of zeroed emitters to append
	#[arg(long, value_name = "COUNT", default_value_t = 0)]
	add: usize,

	/// Index of an emitter to remove
	#[arg(long, value_name = "INDEX")]
	remove: Option<usize>,

	/// Output file (defaults to overwriting the input)
	#[arg(short, long, value_name = "FILE")]
	output: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum TimingAction {
	/// Insert a default timing curve in front of the flags
	Add,
	/// Remove the timing curve and clear the flags using it
	Remove,
}

#[derive(Args)]
struct TimingArgs {
	#[command(flatten)]
	input: InputArgs,

	/// Whether to insert or remove the section
	#[arg(value_enum)]
	action: TimingAction,

	/// Output file (defaults to overwriting the input)
	#[arg(short, long, value_name = "FILE")]
	output: Option<PathBuf>,
}

fn parse_address(value: &str) -> Result<u32, String> {
	let digits = value.trim_start_matches("0x").trim_start_matches("0X");
	u32::from_str_radix(digits, 16).map_err(|err| format!("invalid address {value}: {err}"))
}

/// An effect loaded into a scratch memory image
struct Loaded {
	mem: VecMemory,
	session: Session,
	original: Vec<u8>,
}

fn load(input: &InputArgs) -> Result<Loaded> {
	let mut config = EditorConfig::load(input.config.as_deref())
		.with_context(|| "Failed to load configuration")?;
	if let Some(base) = input.base {
		config.base_address = base;
	}

	let original =
		fs::read(&input.file).with_context(|| format!("Failed to read {}", input.file.display()))?;
	if original.len() < HEADER_SIZE {
		bail!("{} is too small to hold an effect header", input.file.display());
	}

	let mut mem = VecMemory::new(config.base_address, original.len() + IMAGE_SLACK);
	mem.write_bytes(config.base_address, &original)?;
	let session = Session::from_memory(&mem, config.base_address, original.len(), config)
		.with_context(|| format!("Failed to parse {}", input.file.display()))?;

	Ok(Loaded {
		mem,
		session,
		original,
	})
}

fn save(loaded: &Loaded, input: &Path, output: Option<&Path>) -> Result<()> {
	let len = (loaded.session.end() - loaded.session.base()) as usize;
	let bytes = loaded.mem.read_bytes(loaded.session.base(), len)?;
	let path = output.unwrap_or(input);
	fs::write(path, &bytes).with_context(|| format!("Failed to write {}", path.display()))?;
	println!("✓ Wrote {} ({} -> {} bytes)", path.display(), loaded.original.len(), bytes.len());
	Ok(())
}

#[derive(Serialize)]
struct SectionSummary {
	section: SectionId,
	start: Option<u32>,
	len: usize,
}

#[derive(Serialize)]
struct EffectSummary<'a> {
	base: u32,
	end: u32,
	sections: Vec<SectionSummary>,
	violations: &'a [Violation],
	emitters: usize,
	anim_curves: usize,
	sound_channels: usize,
	has_timing_curve: bool,
}

fn summarize(session: &Session) -> EffectSummary<'_> {
	let extents = compute_extents(session.header(), session.end());
	let records = session.records();
	EffectSummary {
		base: session.base(),
		end: session.end(),
		sections: SectionId::ALL
			.iter()
			.map(|&section| SectionSummary {
				section,
				start: extents[section.index()].map(|e| e.start),
				len: extents[section.index()].map_or(0, |e| e.len()),
			})
			.collect(),
		violations: session.violations(),
		emitters: records.effect_data.emitters.len(),
		anim_curves: records.anim_table.curves.len(),
		sound_channels: records.sound.channels.len(),
		has_timing_curve: records.timing_curve.is_some(),
	}
}

fn run_info(args: InfoArgs) -> Result<()> {
	let loaded = load(&args.input)?;
	let summary = summarize(&loaded.session);

	if args.json {
		println!("{}", serde_json::to_string_pretty(&summary)?);
		return Ok(());
	}

	println!("File: {} (size: {} bytes)", args.input.file.display(), loaded.original.len());
	print!("{}", loaded.session.header());
	println!("Sections:");
	for section in &summary.sections {
		match section.start {
			Some(start) => {
				println!("  {:<12} 0x{start:08X} {:>6} bytes", section.section.name(), section.len);
			}
			None => println!("  {:<12} absent", section.section.name()),
		}
	}
	println!(
		"Emitters: {} | curves: {} | sound channels: {} | timing curve: {}",
		summary.emitters,
		summary.anim_curves,
		summary.sound_channels,
		if summary.has_timing_curve {
			"yes"
		} else {
			"no"
		}
	);

	if summary.violations.is_empty() {
		println!("✓ No structural violations");
	} else {
		for violation in summary.violations {
			println!("⚠ {violation}");
		}
	}
	Ok(())
}

fn run_dump(args: DumpArgs) -> Result<()> {
	let Some(section) = SectionId::from_name(&args.section) else {
		bail!("Unknown section {}", args.section);
	};
	let loaded = load(&args.input)?;

	if args.raw {
		let Some(extent) = compute_extents(loaded.session.header(), loaded.session.end())
			[section.index()]
		else {
			bail!("{section} is absent");
		};
		let bytes = loaded.mem.read_bytes(extent.start, extent.len())?;
		for (i, row) in bytes.chunks(16).enumerate() {
			println!("{:08X}  {}", extent.start as usize + i * 16, hex::encode(row));
		}
		return Ok(());
	}

	let records = loaded.session.records();
	let json = match section {
		SectionId::Frames => serde_json::to_string_pretty(&records.frames)?,
		SectionId::Animation => serde_json::to_string_pretty(&records.animation)?,
		SectionId::Script => serde_json::to_string_pretty(&records.script)?,
		SectionId::EffectData => serde_json::to_string_pretty(&records.effect_data)?,
		SectionId::AnimTable => serde_json::to_string_pretty(&records.anim_table)?,
		SectionId::TimingCurve => serde_json::to_string_pretty(&records.timing_curve)?,
		SectionId::EffectFlags => serde_json::to_string_pretty(&records.flags)?,
		SectionId::Timeline => serde_json::to_string_pretty(&records.timeline)?,
		SectionId::SoundDef => serde_json::to_string_pretty(&records.sound)?,
		SectionId::Texture => {
			format!("\"{}\"", hex::encode(&records.texture))
		}
	};
	println!("{json}");
	Ok(())
}

fn run_disasm(args: InputArgs) -> Result<()> {
	let loaded = load(&args)?;
	let records = loaded.session.records();

	println!("Animation ({} ticks):", records.animation.duration());
	let mut offset = 0;
	for instruction in &records.animation.instructions {
		println!("  {offset:04X}: {instruction}");
		offset += instruction.byte_size();
	}

	println!("Script:");
	for (i, instruction) in records.script.instructions.iter().enumerate() {
		println!("  {:04X}: {instruction}", records.script.offset_of(i));
	}
	if !records.script.trailing.is_empty() {
		println!("  trailing: {}", hex::encode(&records.script.trailing));
	}

	for (i, channel) in records.sound.channels.iter().enumerate() {
		println!("Sound channel {i}:");
		for event in &channel.events {
			println!("  {event}");
		}
	}
	Ok(())
}

fn run_emitters(args: EmittersArgs) -> Result<()> {
	if args.add == 0 && args.remove.is_none() {
		bail!("Nothing to do: pass --add and/or --remove");
	}
	let mut loaded = load(&args.input)?;
	loaded.session.ensure_valid().with_context(|| "Refusing to edit a malformed container")?;

	let effect_data = &mut loaded.session.records_mut().effect_data;
	if let Some(index) = args.remove
		&& effect_data.remove_emitter(index).is_none()
	{
		bail!("Emitter {index} does not exist ({} present)", effect_data.emitters.len());
	}
	for _ in 0..args.add {
		effect_data.add_emitter(Emitter::new());
	}

	for change in loaded.session.size_changes_since_load() {
		log::info!("{}: {} -> {} bytes", change.section, change.before, change.after);
	}
	loaded.session.commit(&mut loaded.mem)?;
	save(&loaded, &args.input.file, args.output.as_deref())
}

fn run_timing(args: TimingArgs) -> Result<()> {
	let mut loaded = load(&args.input)?;
	loaded.session.ensure_valid().with_context(|| "Refusing to edit a malformed container")?;
	let changed = match args.action {
		TimingAction::Add => loaded.session.add_timing_curve(&mut loaded.mem)?,
		TimingAction::Remove => loaded.session.remove_timing_curve(&mut loaded.mem)?,
	};
	if !changed {
		println!("Nothing to do");
		return Ok(());
	}
	save(&loaded, &args.input.file, args.output.as_deref())
}

fn run_verify(args: InputArgs) -> Result<()> {
	let loaded = load(&args)?;
	let session = &loaded.session;
	let extents = compute_extents(session.header(), session.end());
	let mut mismatches = 0;

	for id in SectionId::ALL {
		let (Some(extent), Some(encoded)) =
			(extents[id.index()], session.records().encode_section(id))
		else {
			continue;
		};
		let live = loaded.mem.read_bytes(extent.start, extent.len())?;
		if live.starts_with(&encoded) && live[encoded.len()..].iter().all(|&b| b == 0) {
			println!("✓ {:<12} {:>6} bytes", id.name(), encoded.len());
		} else {
			mismatches += 1;
			let first = live.iter().zip(&encoded).position(|(a, b)| a != b);
			println!(
				"✗ {:<12} {:>6} -> {:>6} bytes, first difference at {}",
				id.name(),
				live.len(),
				encoded.len(),
				first.map_or_else(|| "the end".to_owned(), |i| format!("+0x{i:X}"))
			);
		}
	}

	if mismatches > 0 {
		bail!("{mismatches} section(s) do not re-encode to their original bytes");
	}
	println!("✅ All sections round-trip");
	Ok(())
}
