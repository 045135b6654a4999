
// Rigol DS2102A (and the rest of the DS2000A family, which shares the :WAV subsystem)

use std::fmt;
use std::io::{self, Error as IoError, ErrorKind};
use std::ops::Drop;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::error::Result;
use crate::transport::Transport;
use crate::vxi11::CoreClient;

pub mod acquisition;
pub mod preamble;
pub mod status;
pub mod time;

pub use acquisition::{last_x_values, read_normal, read_preamble, stop_and_read_raw, RawReadConfig, Waveform, DEFAULT_CHUNK_POLL_SEC, DEFAULT_EMPTY_POLL_SEC};
pub use preamble::Preamble;
pub use status::{decode_status, ReadState, ReadStatus};
pub use time::{parse_time, TimeAxis, PSEC_PER_SEC, PSEC_PER_USEC};

lazy_static! {
	static ref IDN_RE: Regex = Regex::new("^([^,]+),([^,]+),([^,]+),([^,\\s]+)").unwrap();
}

/// Waveform sources addressable with `:WAV:SOUR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Channel { Ch1, Ch2, Math, Fft }

impl Channel {
	pub const ALL:[Channel; 4] = [Channel::Ch1, Channel::Ch2, Channel::Math, Channel::Fft];

	pub fn token(self) -> &'static str {
		match self {
			Channel::Ch1  => "CHAN1",
			Channel::Ch2  => "CHAN2",
			Channel::Math => "MATH",
			Channel::Fft  => "FFT",
		}
	}
}

impl fmt::Display for Channel {
	fn fmt(&self, f:&mut fmt::Formatter) -> fmt::Result { f.write_str(self.token()) }
}

impl FromStr for Channel {
	type Err = String;

	fn from_str(s:&str) -> std::result::Result<Self, String> {
		match s.trim().to_ascii_uppercase().as_str() {
			"CH1" | "CHAN1" | "1" => Ok(Channel::Ch1),
			"CH2" | "CHAN2" | "2" => Ok(Channel::Ch2),
			"MATH"                => Ok(Channel::Math),
			"FFT"                 => Ok(Channel::Fft),
			_ => Err(format!("Unknown channel {:?}, expected one of CH1, CH2, MATH, FFT", s)),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
	pub manufacturer: String,
	pub model: String,
	pub serial_num: String,
	pub fw_version: String,
}

impl Identity {
	pub fn parse(idn:&str) -> Option<Self> {
		let caps = IDN_RE.captures(idn.trim())?;
		Some(Identity {
			manufacturer: caps[1].trim().to_owned(),
			model:        caps[2].trim().to_owned(),
			serial_num:   caps[3].trim().to_owned(),
			fw_version:   caps[4].to_owned(),
		})
	}
}

pub struct DS2102A {
	core: CoreClient,
	identity: Identity,
}

impl DS2102A {

	pub fn new(host:&str) -> io::Result<Self> {
		let mut core = CoreClient::new(host)?;

		core.create_link()?;

		let idn = core.query("*IDN?")?;
		let identity = Identity::parse(&idn)
			.ok_or_else(|| IoError::new(ErrorKind::InvalidData, format!("Unable to interpret *IDN? reply {:?}", idn)))?;

		if !identity.model.contains("DS2102A") {
			// Drop destroys the link on the way out
			drop(Self{ core, identity: identity.clone() });
			return Err(IoError::new(ErrorKind::Other, format!("Connected to a {} {}, which isn't a DS2102A", identity.manufacturer, identity.model)));
		}

		log::info!("Connected to {} {} (serial {}, firmware {}) at {}", identity.manufacturer, identity.model, identity.serial_num, identity.fw_version, host);
		Ok(Self{ core, identity })
	}

	pub fn identity(&self) -> &Identity { &self.identity }

	// One-liners
	pub fn clear(&mut self) -> io::Result<()> { self.core.clear() }
	pub fn read_normal(&mut self, source:Channel) -> Result<Waveform> { acquisition::read_normal(self, source) }
	pub fn last_x_values(&mut self) -> Result<TimeAxis> { acquisition::last_x_values(self) }

	pub fn stop_and_read_raw(&mut self, source:Channel, config:&RawReadConfig) -> Result<Waveform> {
		acquisition::stop_and_read_raw(self, source, config)
	}

}

impl Transport for DS2102A {
	fn write(&mut self, data:&[u8]) -> io::Result<()> { self.core.write(data) }
	fn read(&mut self) -> io::Result<Vec<u8>> { self.core.read() }
}

impl Drop for DS2102A {

	fn drop(&mut self) {
		if let Err(e) = self.core.destroy_link() {
			log::warn!("Unable to destroy link for DS2102A: {}", e);
		}
	}

}
