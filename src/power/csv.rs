
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{Error, Result};
use super::units::{Amps, Volts};

pub const HEADER:&str = "usec,volts,amps";

// C's %e: six fractional digits and at least two exponent digits, e.g. -1.234560e-03
pub fn format_sci(x:f64) -> String {
	if !x.is_finite() {
		return x.to_string().to_lowercase();
	}

	let s = format!("{:.6e}", x);
	match s.split_once('e') {
		Some((mantissa, exp)) => {
			let exp:i32 = exp.parse().unwrap_or(0);
			format!("{}e{}{:02}", mantissa, if exp < 0 { '-' } else { '+' }, exp.unsigned_abs())
		},
		None => s,
	}
}

pub fn write_csv<W: Write>(w:&mut W, usec:&[i64], volts:&[Volts], amps:&[Amps]) -> io::Result<()> {
	writeln!(w, "{}", HEADER)?;
	for ((t, v), a) in usec.iter().zip(volts).zip(amps) {
		writeln!(w, "{},{},{}", t, format_sci(v.0), format_sci(a.0))?;
	}
	Ok(())
}

/// Writes the `usec,volts,amps` table gzip-compressed to `path`.
pub fn write_csv_gz(path:&Path, usec:&[i64], volts:&[Volts], amps:&[Amps]) -> Result<()> {
	let file = File::create(path).map_err(Error::Export)?;
	let mut gz = GzEncoder::new(BufWriter::new(file), Compression::default());

	write_csv(&mut gz, usec, volts, amps).map_err(Error::Export)?;
	gz.finish().and_then(|mut w| w.flush()).map_err(Error::Export)?;

	log::info!("Wrote {} rows to {}", usec.len().min(volts.len()).min(amps.len()), path.display());
	Ok(())
}
