
// Single-phase power measurement: voltage on one channel, current transformer burden voltage on the other

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::devices::ds2102a::{last_x_values, read_normal, Channel, TimeAxis, PSEC_PER_USEC};
use crate::error::{Error, Result};
use crate::transport::Transport;

pub mod csv;
pub mod plot;
pub mod units;

pub use plot::FigureStyle;
pub use units::{Amps, VoltAmps, Volts, Watts};

// 1000:1 current transformer into a 100 ohm burden resistor
pub const AMPS_PER_VOLT:f64 = 10.0;

/// A paired voltage/current read on a shared time axis.
#[derive(Debug, Clone, Serialize)]
pub struct Capture {
	pub time_ps: TimeAxis,
	pub volts: Vec<Volts>,
	pub amps: Vec<Amps>,
}

impl Capture {

	/// Reads both channels in normal mode, then takes the time axis from a fresh preamble.
	pub fn acquire<T: Transport + ?Sized>(rigol:&mut T, volt_chan:Channel, amp_chan:Channel) -> Result<Self> {
		let volts:Vec<Volts> = read_normal(rigol, volt_chan)?.volts.into_iter().map(Volts).collect();
		let amps:Vec<Amps> = read_normal(rigol, amp_chan)?.volts.into_iter().map(|v| Amps(v * AMPS_PER_VOLT)).collect();

		if volts.len() != amps.len() {
			return Err(Error::SizeMismatch{ expected: volts.len(), actual: amps.len() });
		}

		let time_ps = last_x_values(rigol)?;
		if time_ps.len() != volts.len() {
			return Err(Error::SizeMismatch{ expected: time_ps.len(), actual: volts.len() });
		}

		log::info!("Captured {} points of {} (volts) and {} (amps)", volts.len(), volt_chan, amp_chan);
		Ok(Self{ time_ps, volts, amps })
	}

	pub fn len(&self) -> usize { self.volts.len() }
	pub fn is_empty(&self) -> bool { self.volts.is_empty() }

	pub fn power(&self) -> Vec<VoltAmps> {
		self.volts.iter().zip(&self.amps).map(|(&v, &a)| v * a).collect()
	}

	// Floors toward negative infinity so pre-trigger samples land in the right microsecond
	pub fn usec(&self) -> Vec<i64> {
		self.time_ps.iter().map(|t| t.div_euclid(PSEC_PER_USEC)).collect()
	}

	pub fn summary(&self) -> Result<PowerSummary> { PowerSummary::from_samples(&self.volts, &self.amps) }

}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PowerSummary {
	pub vrms: Volts,
	pub irms: Amps,
	pub apparent_power: VoltAmps,
	pub real_power: Watts,
	pub power_factor: f64,
}

fn rms(xs:impl Iterator<Item=f64>, n:usize) -> f64 {
	(xs.map(|x| x * x).sum::<f64>() / n as f64).sqrt()
}

impl PowerSummary {

	pub fn from_samples(volts:&[Volts], amps:&[Amps]) -> Result<Self> {
		if volts.len() != amps.len() {
			return Err(Error::SizeMismatch{ expected: volts.len(), actual: amps.len() });
		}
		if volts.is_empty() {
			return Err(Error::EmptyCapture);
		}

		let n = volts.len();
		let vrms = Volts(rms(volts.iter().map(|v| v.0), n));
		let irms = Amps(rms(amps.iter().map(|a| a.0), n));
		let apparent_power = vrms * irms;
		let real_power = Watts(volts.iter().zip(amps).map(|(&v, &a)| (v * a).0).sum::<f64>() / n as f64);

		// A dead channel gives S = 0; report no power factor rather than NaN
		let power_factor = if apparent_power.0 > 0.0 { real_power.0 / apparent_power.0 } else { 0.0 };

		Ok(Self{ vrms, irms, apparent_power, real_power, power_factor })
	}

}

impl fmt::Display for PowerSummary {
	fn fmt(&self, f:&mut fmt::Formatter) -> fmt::Result {
		writeln!(f, "Irms: {:.4}", self.irms)?;
		writeln!(f, "Vrms: {:.2}", self.vrms)?;
		writeln!(f, "Apparent power: {:.4}", self.apparent_power)?;
		writeln!(f, "Avg real power: {:.4}", self.real_power)?;
		write!(f, "Power factor: {:.4}", self.power_factor)
	}
}

/// Instantaneous power `v(t) * i(t)` and its time axis in picoseconds.
pub fn measure_power<T: Transport + ?Sized>(rigol:&mut T, volt_chan:Channel, amp_chan:Channel) -> Result<(Vec<VoltAmps>, TimeAxis)> {
	let capture = Capture::acquire(rigol, volt_chan, amp_chan)?;
	Ok((capture.power(), capture.time_ps))
}

/// Captures both channels, renders the volts/amps/volt-amps figure to `svg_path`, writes the samples to
/// `csv_path` as gzipped CSV and prints the summary.
pub fn draw_figure<T: Transport + ?Sized>(rigol:&mut T, volt_chan:Channel, amp_chan:Channel, svg_path:&Path, csv_path:&Path) -> Result<PowerSummary> {
	draw_figure_with(rigol, volt_chan, amp_chan, svg_path, csv_path, &FigureStyle::default())
}

pub fn draw_figure_with<T: Transport + ?Sized>(rigol:&mut T, volt_chan:Channel, amp_chan:Channel, svg_path:&Path, csv_path:&Path, style:&FigureStyle) -> Result<PowerSummary> {
	let capture = Capture::acquire(rigol, volt_chan, amp_chan)?;
	let summary = capture.summary()?;

	plot::render_svg(&capture, style, svg_path)?;
	csv::write_csv_gz(csv_path, &capture.usec(), &capture.volts, &capture.amps)?;

	println!("{}", summary);
	Ok(summary)
}
