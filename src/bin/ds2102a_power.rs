
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use ds2102a::devices::ds2102a::{Channel, RawReadConfig, DS2102A, DEFAULT_CHUNK_POLL_SEC, DEFAULT_EMPTY_POLL_SEC};
use ds2102a::power;

#[derive(Parser)]
#[command(name = "ds2102a_power")]
#[command(version)]
#[command(about = "Single-phase power measurements with a Rigol DS2102A over VXI-11")]
struct Args {
	/// Hostname or IP address of the scope
	host: String,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand)]
enum Command {
	/// Capture voltage and current, plot volts/amps/volt-amps and print the power summary
	Figure {
		#[arg(long, default_value = "CH1", help = "Channel carrying the voltage probe")]
		volts: Channel,

		#[arg(long, default_value = "CH2", help = "Channel carrying the current transformer burden voltage")]
		amps: Channel,

		#[arg(long, default_value = "figure.svg")]
		svg: PathBuf,

		#[arg(long, default_value = "data.csv.gz")]
		csv: PathBuf,
	},

	/// Stop the scope and dump the deep memory of one channel to JSON
	Raw {
		#[arg(default_value = "CH1")]
		channel: Channel,

		#[arg(long, default_value = "raw.json")]
		json: PathBuf,

		#[arg(long, default_value_t = DEFAULT_EMPTY_POLL_SEC, help = "Seconds to wait when no points are ready")]
		empty_poll: f32,

		#[arg(long, default_value_t = DEFAULT_CHUNK_POLL_SEC, help = "Seconds to wait after each chunk")]
		chunk_poll: f32,
	},
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
	env_logger::init();
	let args = Args::parse();

	let mut rigol = DS2102A::new(&args.host)?;

	match args.command {
		Command::Figure{ volts, amps, svg, csv } => {
			power::draw_figure(&mut rigol, volts, amps, &svg, &csv)?;
		},
		Command::Raw{ channel, json, empty_poll, chunk_poll } => {
			let config = RawReadConfig {
				empty_poll: Duration::try_from_secs_f32(empty_poll)?,
				chunk_poll: Duration::try_from_secs_f32(chunk_poll)?,
			};

			let waveform = rigol.stop_and_read_raw(channel, &config)?;
			let mut out = BufWriter::new(File::create(&json)?);
			serde_json::to_writer(&mut out, &waveform)?;
			out.flush()?;
			println!("Wrote {} points of {} to {}", waveform.len(), channel, json.display());
		},
	}

	Ok(())
}
