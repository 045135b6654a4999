
use std::ops::Range;
use std::path::Path;

use plotters::prelude::*;

use crate::error::Result;
use super::Capture;

/// Layout and fixed y ranges of the three stacked panels.
#[derive(Clone, Debug)]
pub struct FigureStyle {
	pub width: u32,
	pub height: u32,
	pub volts_range: Range<f64>,
	pub amps_range: Range<f64>,
	pub power_range: Range<f64>,
}

impl Default for FigureStyle {
	fn default() -> Self {
		Self {
			width: 1024,
			height: 768,
			volts_range: -200.0..200.0,
			amps_range: -0.2..0.2,
			power_range: -7.0..35.0,
		}
	}
}

fn x_range(usec:&[f64]) -> Range<f64> {
	let lo = usec.iter().copied().fold(f64::INFINITY, f64::min);
	let hi = usec.iter().copied().fold(f64::NEG_INFINITY, f64::max);
	if !lo.is_finite() || !hi.is_finite() { 0.0..1.0 }
	else if hi > lo { lo..hi }
	else { (lo - 1.0)..(hi + 1.0) }
}

/// Volts, amps and volt-amps against time in microseconds, sharing the x axis.
pub fn render_svg(capture:&Capture, style:&FigureStyle, path:&Path) -> Result<()> {
	let usec:Vec<f64> = capture.usec().into_iter().map(|t| t as f64).collect();
	let power = capture.power();
	let x = x_range(&usec);

	let panels:[(&str, Range<f64>, usize, RGBColor, Vec<f64>); 3] = [
		("Volts",     style.volts_range.clone(), 4, BLUE,  capture.volts.iter().map(|v| v.0).collect()),
		("Amps",      style.amps_range.clone(),  4, RED,   capture.amps.iter().map(|a| a.0).collect()),
		("Volt-Amps", style.power_range.clone(), 6, GREEN, power.iter().map(|p| p.0).collect()),
	];

	let root = SVGBackend::new(path, (style.width, style.height)).into_drawing_area();
	root.fill(&WHITE)?;

	let areas = root.split_evenly((3, 1));
	for (idx, (area, (label, y, n_labels, color, values))) in areas.iter().zip(panels).enumerate() {
		let mut builder = ChartBuilder::on(area);
		builder.margin(8).set_label_area_size(LabelAreaPosition::Left, 60);
		if idx == 0 {
			builder.caption("Instantaneous Power", ("sans-serif", 20));
		}
		if idx == 2 {
			builder.set_label_area_size(LabelAreaPosition::Bottom, 40);
		}

		let mut chart = builder.build_cartesian_2d(x.clone(), y)?;
		let mut mesh = chart.configure_mesh();
		mesh.disable_x_mesh().y_labels(n_labels).y_desc(label);
		if idx == 2 {
			mesh.x_desc("Time (us)");
		} else {
			mesh.x_labels(0);
		}
		mesh.draw()?;

		chart.draw_series(LineSeries::new(usec.iter().copied().zip(values), &color))?;
	}

	root.present()?;
	log::info!("Wrote figure to {}", path.display());
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn degenerate_x_ranges_are_widened() {
		assert_eq!(x_range(&[]), 0.0..1.0);
		assert_eq!(x_range(&[5.0]), 4.0..6.0);
		assert_eq!(x_range(&[-3.0, 2.0, 1.0]), -3.0..2.0);
	}
}
