
// Unit-tagged sample values. Each quantity is a transparent wrapper around f64. Instantaneous volts times amps
// gives volt-amperes; averaged real power is carried as watts.

use std::fmt;
use std::ops::Mul;

use serde::Serialize;

macro_rules! quantity {
	($name:ident, $symbol:expr) => {
		#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize)]
		#[serde(transparent)]
		pub struct $name(pub f64);

		impl $name {
			pub const SYMBOL:&'static str = $symbol;

			pub fn value(self) -> f64 { self.0 }
		}

		impl fmt::Display for $name {
			fn fmt(&self, f:&mut fmt::Formatter) -> fmt::Result {
				// Forward precision so "{:.2}" works on the quantity itself
				match f.precision() {
					Some(p) => write!(f, "{:.*} {}", p, self.0, $symbol),
					None    => write!(f, "{} {}", self.0, $symbol),
				}
			}
		}
	};
}

quantity!(Volts, "V");
quantity!(Amps, "A");
quantity!(VoltAmps, "VA");
quantity!(Watts, "W");

impl Mul<Amps> for Volts {
	type Output = VoltAmps;
	fn mul(self, rhs:Amps) -> VoltAmps { VoltAmps(self.0 * rhs.0) }
}

impl Mul<Volts> for Amps {
	type Output = VoltAmps;
	fn mul(self, rhs:Volts) -> VoltAmps { VoltAmps(self.0 * rhs.0) }
}
