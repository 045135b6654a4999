
use std::str::FromStr;

use serde::Serialize;

use crate::error::{Error, Result};
use super::time::{parse_time, TimeAxis};

const N_FIELDS:usize = 10;

/// Decoded reply to `:WAV:PRE?`.
///
/// The time fields are kept in the exact text the scope sent; the `f64` copies are only for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Preamble {
	pub format: String,
	pub kind: String,
	pub points: usize,
	pub count: u32,
	pub x_increment_text: String,
	pub x_increment: f64,
	pub x_origin_text: String,
	pub x_origin: f64,
	pub y_increment: f64,
	pub y_origin: i32,
	pub y_reference: i32,
}

fn field<'a>(elems:&[&'a str], idx:usize) -> &'a str { elems[idx].trim() }

fn parse_num<T: FromStr>(elems:&[&str], idx:usize, name:&str) -> Result<T> {
	let text = field(elems, idx);
	text.parse::<T>().map_err(|_| Error::protocol(format!("Preamble field {} ({}) isn't a valid number: {:?}", idx, name, text)))
}

// Vertical codes are integers, but some firmware prints them in NR3 form
fn parse_code(elems:&[&str], idx:usize, name:&str) -> Result<i32> {
	parse_num::<i32>(elems, idx, name).or_else(|e| {
		let x:f64 = parse_num(elems, idx, name)?;
		if x.fract() == 0.0 && x.abs() <= i32::MAX as f64 { Ok(x as i32) } else { Err(e) }
	})
}

impl Preamble {

	pub fn parse(s:&str) -> Result<Self> {
		let elems:Vec<&str> = s.trim().split(',').collect();
		if elems.len() < N_FIELDS {
			return Err(Error::protocol(format!("Preamble has {} fields, expected {}: {:?}", elems.len(), N_FIELDS, s)));
		}

		let x_increment_text = field(&elems, 4).to_owned();
		let x_origin_text    = field(&elems, 5).to_owned();

		// Decoded once here so a bad time field is reported with the preamble rather than at x_values()
		parse_time(&x_increment_text)?;
		parse_time(&x_origin_text)?;

		let y_increment:f64 = parse_num(&elems, 7, "y_increment")?;
		if !(y_increment.is_finite() && y_increment > 0.0) {
			return Err(Error::protocol(format!("Preamble y_increment must be positive, got {}", y_increment)));
		}

		Ok(Preamble {
			format:      field(&elems, 0).to_owned(),
			kind:        field(&elems, 1).to_owned(),
			points:      parse_num(&elems, 2, "points")?,
			count:       parse_num(&elems, 3, "count")?,
			x_increment: parse_num(&elems, 4, "x_increment")?,
			x_origin:    parse_num(&elems, 5, "x_origin")?,
			x_increment_text,
			x_origin_text,
			y_increment,
			y_origin:    parse_code(&elems, 8, "y_origin")?,
			y_reference: parse_code(&elems, 9, "y_reference")?,
		})
	}

	/// Converts raw byte codes to volts: `(raw - y_origin - y_reference) * y_increment`.
	pub fn normalize(&self, raw:&[u8]) -> Vec<f64> {
		let offset = i64::from(self.y_origin) + i64::from(self.y_reference);
		raw.iter()
			.map(|&code| (i64::from(code) - offset) as f64 * self.y_increment)
			.collect()
	}

	pub fn x_origin_ps(&self) -> Result<i64> { parse_time(&self.x_origin_text) }
	pub fn x_increment_ps(&self) -> Result<i64> { parse_time(&self.x_increment_text) }

	/// Sample times in picoseconds: `origin + i * increment` for `i` in `0..points`.
	pub fn x_values(&self) -> Result<TimeAxis> {
		let origin = self.x_origin_ps()?;
		let step   = self.x_increment_ps()?;

		// The axis is linear, so if the last sample fits in an i64 every sample does
		let last = i128::from(origin) + i128::from(step) * (self.points.saturating_sub(1) as i128);
		if i64::try_from(last).is_err() {
			return Err(Error::Range{ text: format!("{} + {} * {}", self.x_origin_text, self.x_increment_text, self.points) });
		}

		Ok((0..self.points as i64).map(|i| origin + step * i).collect())
	}

}

impl FromStr for Preamble {
	type Err = Error;
	fn from_str(s:&str) -> Result<Self> { Preamble::parse(s) }
}

#[cfg(test)]
mod tests {
	use super::*;

	const SCREEN:&str = "BYTE,NORM,1200,1,2.000000e-07,-1.200000e-04,0,3.906250e-02,127,0\n";

	#[test]
	fn screen_preamble() {
		let pre = Preamble::parse(SCREEN).unwrap();
		assert_eq!(pre.points, 1200);
		assert_eq!(pre.count, 1);
		assert_eq!(pre.x_increment_text, "2.000000e-07");
		assert_eq!(pre.x_origin_text, "-1.200000e-04");
		assert_eq!(pre.y_origin, 127);
		assert_eq!(pre.y_reference, 0);
		assert!((pre.x_origin + 1.2e-4).abs() < 1e-12);

		let xs = pre.x_values().unwrap();
		assert_eq!(xs.len(), 1200);
		assert_eq!(xs[0], -120_000_000);
		assert!(xs.windows(2).all(|w| w[1] - w[0] == 200_000));

		let volts = pre.normalize(&[128u8; 1200]);
		assert_eq!(volts.len(), 1200);
		assert!(volts.iter().all(|&v| v == 3.90625e-2));
	}

	#[test]
	fn four_point_axis() {
		let pre:Preamble = "0,2,4,1,5.000000e-10,0.000000e+00,0,1.0e-02,0,0".parse().unwrap();
		assert_eq!(pre.x_values().unwrap(), vec![0, 500, 1000, 1500]);
	}

	#[test]
	fn axis_steps_are_exact_at_long_spans() {
		// A float origin of -1.2 ms is off by a fraction of a picosecond, the text isn't
		let pre = Preamble::parse("BYTE,RAW,140000,1,5.000000e-10,-1.200000e-03,0,1.0e-02,0,0").unwrap();
		let step = pre.x_increment_ps().unwrap();
		let xs = pre.x_values().unwrap();
		assert_eq!(xs.len(), pre.points);
		assert_eq!(xs[0], -1_200_000_000);
		assert!(xs.windows(2).all(|w| w[1] - w[0] == step && w[1] > w[0]));
		assert_eq!(*xs.last().unwrap(), -1_200_000_000 + 500 * 139_999);
	}

	#[test]
	fn empty_capture_has_an_empty_axis() {
		let pre = Preamble::parse("0,0,0,1,5.0e-10,0.0e+00,0,1.0e-02,0,0").unwrap();
		assert!(pre.x_values().unwrap().is_empty());
		assert!(pre.normalize(&[]).is_empty());
	}

	#[test]
	fn normalize_is_linear_in_the_code() {
		let pre = Preamble::parse("0,0,3,1,5.0e-10,0.0e+00,0,4.0e-01,100,27").unwrap();
		let a = pre.normalize(&[0, 127, 255]);
		let b = pre.normalize(&[10, 100, 200]);
		assert_eq!(a[0], -127.0 * 0.4);
		assert_eq!(a[1], 0.0);
		for ((va, vb), d) in a.iter().zip(&b).zip([-10.0, 27.0, 55.0]) {
			assert!((va - vb - d * 0.4).abs() < 1e-9);
		}
	}

	#[test]
	fn nr3_vertical_codes() {
		let pre = Preamble::parse("0,0,1,1,5.0e-10,0.0e+00,0,1.0e-02,1.270000e+02,0").unwrap();
		assert_eq!(pre.y_origin, 127);
	}

	#[test]
	fn malformed_preambles() {
		let bad = [
			"BYTE,NORM,1200,1,2.0e-07,-1.2e-04,0,3.9e-02,127",          // nine fields
			"BYTE,NORM,-1,1,2.0e-07,-1.2e-04,0,3.9e-02,127,0",          // negative points
			"BYTE,NORM,1200,1,2.0e-07,-1.2e-04,0,0,127,0",              // zero y_increment
			"BYTE,NORM,1200,1,2.0e-07,-1.2e-04,0,abc,127,0",
			"BYTE,NORM,1200,1,0.2us,-1.2e-04,0,3.9e-02,127,0",
			"BYTE,NORM,1200,1,2.0e-07,-1.2e-04,0,3.9e-02,127.5,0",
		];
		for s in bad {
			assert!(matches!(Preamble::parse(s), Err(Error::Protocol(_))), "{}", s);
		}
	}

	#[test]
	fn axis_overflow_is_a_range_error() {
		let pre = Preamble::parse("0,0,4000000000,1,5.0e+00,0.0e+00,0,1.0e-02,0,0").unwrap();
		assert!(matches!(pre.x_values(), Err(Error::Range{ .. })));
	}
}
