use std::path::{Path, PathBuf};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{info, LevelFilter};
use quill::MappingFormat;
use quill::tree::{ClassMapping, Mappings};

#[derive(Debug, Parser)]
struct Cli {
	/// Log everything that happens.
	#[arg(short = 'v', long = "verbose")]
	verbose: bool,

	/// Only log errors.
	#[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
	quiet: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
	/// Reads mappings in one format and writes them in another
	Convert {
		input: PathBuf,
		output: PathBuf,
		/// The format of the input, guessed from the path if not given.
		#[arg(long = "from", value_enum)]
		from: Option<Format>,
		/// The format of the output, guessed from the path if not given.
		#[arg(long = "to", value_enum)]
		to: Option<Format>,
	},
	/// Prints how much of some mappings is named
	Stats {
		input: PathBuf,
		#[arg(long = "from", value_enum)]
		from: Option<Format>,
	},
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
	/// A single `.mapping` file.
	Enigma,
	/// A directory with one `.mapping` file per class.
	EnigmaDir,
	/// A directory with one `.json` file per class.
	JsonDir,
	Srg,
	/// Tiny v1.
	Tiny,
}

impl From<Format> for MappingFormat {
	fn from(value: Format) -> Self {
		match value {
			Format::Enigma => MappingFormat::EnigmaFile,
			Format::EnigmaDir => MappingFormat::EnigmaDirectory,
			Format::JsonDir => MappingFormat::JsonDirectory,
			Format::Srg => MappingFormat::Srg,
			Format::Tiny => MappingFormat::Tiny,
		}
	}
}

fn format_of(given: Option<Format>, path: &Path) -> Result<MappingFormat> {
	given.map(MappingFormat::from)
		.or_else(|| MappingFormat::detect(path))
		.with_context(|| anyhow!("can't guess the mapping format of {path:?}, please give it"))
}

fn setup_logging(level: LevelFilter) -> Result<()> {
	fern::Dispatch::new()
		.format(|out, message, record| {
			out.finish(format_args!("[{} {}] {}", record.level(), record.target(), message))
		})
		.level(level)
		.chain(std::io::stderr())
		.apply()
		.with_context(|| anyhow!("failed to set up logging"))
}

#[derive(Debug, Default)]
struct Stats {
	classes: (usize, usize),
	fields: (usize, usize),
	methods: (usize, usize),
	arguments: usize,
}

impl Stats {
	fn count(mappings: &Mappings) -> Stats {
		fn count_class(class: &ClassMapping, stats: &mut Stats) {
			stats.classes.0 += usize::from(class.deobf_name().is_some());
			stats.classes.1 += 1;
			for field in class.fields() {
				stats.fields.0 += usize::from(field.deobf_name().is_some());
				stats.fields.1 += 1;
			}
			for method in class.methods().filter(|method| !method.is_constructor()) {
				stats.methods.0 += usize::from(method.deobf_name().is_some());
				stats.methods.1 += 1;
			}
			stats.arguments += class.methods().map(|method| method.arguments().count()).sum::<usize>();
			for inner in class.inner_classes() {
				count_class(inner, stats);
			}
		}

		let mut stats = Stats::default();
		for class in mappings.classes() {
			count_class(class, &mut stats);
		}
		stats
	}
}

fn main() -> Result<()> {
	let cli = Cli::parse();

	let level = match (cli.verbose, cli.quiet) {
		(true, _) => LevelFilter::Trace,
		(_, true) => LevelFilter::Error,
		_ => LevelFilter::Info,
	};
	setup_logging(level)?;

	match cli.command {
		Command::Convert { input, output, from, to } => {
			let from = format_of(from, &input)?;
			let to = match to {
				Some(to) => to.into(),
				// the output may not exist yet, so don't guess a directory from it
				None => MappingFormat::detect(&output).filter(|format| !format.is_directory()).unwrap_or(from),
			};

			let mappings = from.read(&input)?;
			to.write(&mappings, &output)?;
			info!("converted {} classes from {from} to {to}", mappings.len());
		},
		Command::Stats { input, from } => {
			let from = format_of(from, &input)?;
			let mappings = from.read(&input)?;
			let stats = Stats::count(&mappings);

			println!("classes:   {} of {} named", stats.classes.0, stats.classes.1);
			println!("fields:    {} of {} named", stats.fields.0, stats.fields.1);
			println!("methods:   {} of {} named", stats.methods.0, stats.methods.1);
			println!("arguments: {}", stats.arguments);
		},
	}

	Ok(())
}
