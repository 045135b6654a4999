
// Exact decoding of the scope's scientific-notation time fields, such as -1.200000e-04, straight into integer
// picoseconds. An f64 loses picoseconds a few milliseconds away from the trigger. The DS2102A samples no faster
// than every 500 ps, so anything below one picosecond is floored away.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{Error, Result};

lazy_static! {
	static ref TIME_RE: Regex = Regex::new(r"^\s*([+-]?)(\d+)(?:\.(\d*))?[eE]([+-]?\d+)\s*$").unwrap();
}

pub const PSEC_PER_SEC:i64 = 1_000_000_000_000;

/// Picoseconds per microsecond, used when exporting the time axis.
pub const PSEC_PER_USEC:i64 = 1_000_000;

// Fractional digits that still land on a whole picosecond at exponent 0
const PSEC_DIGITS:usize = 12;

/// Sample instants in picoseconds, one per point.
pub type TimeAxis = Vec<i64>;

fn out_of_range(text:&str) -> Error { Error::Range{ text: text.to_owned() } }

/// Converts text like `-1.234500e-06` into picoseconds (`-1_234_500`).
///
/// The fractional digits take the sign of the whole value, so `-1.5e+00` is `-1.5 s` and not `-0.5 s`.
/// Negative exponents floor-divide, which discards anything below one picosecond.
pub fn parse_time(text:&str) -> Result<i64> {
	let caps = TIME_RE.captures(text)
		.ok_or_else(|| Error::protocol(format!("{:?} isn't a time in scientific notation", text)))?;

	let negative = &caps[1] == "-";
	let intg:i128 = caps[2].parse().map_err(|_| out_of_range(text))?;
	let exp:i32 = caps[4].parse().map_err(|_| out_of_range(text))?;

	// Digits past the twelfth are below a picosecond before the exponent is applied; the instrument never
	// sends that many, so they're truncated rather than carried along
	let frac_text = caps.get(3).map_or("", |m| &m.as_str()[..m.as_str().len().min(PSEC_DIGITS)]);
	let frac:i128 = if frac_text.is_empty() { 0 } else { frac_text.parse().map_err(|_| out_of_range(text))? };
	let frac_scale = 10i128.pow((PSEC_DIGITS - frac_text.len()) as u32);

	let magnitude = intg.checked_mul(PSEC_PER_SEC as i128)
		.and_then(|x| x.checked_add(frac * frac_scale))
		.ok_or_else(|| out_of_range(text))?;
	let mantissa = if negative { -magnitude } else { magnitude };

	let psec:i128 = if mantissa == 0 {
		0
	} else if exp >= 0 {
		10i128.checked_pow(exp as u32)
			.and_then(|scale| mantissa.checked_mul(scale))
			.ok_or_else(|| out_of_range(text))?
	} else {
		match 10i128.checked_pow(exp.unsigned_abs()) {
			Some(scale) => mantissa.div_euclid(scale),
			// The divisor is bigger than any mantissa that fits, so only the floor's sign is left
			None => if mantissa < 0 { -1 } else { 0 },
		}
	};

	i64::try_from(psec).map_err(|_| out_of_range(text))
}
