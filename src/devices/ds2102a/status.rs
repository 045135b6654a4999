
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{Error, Result};

lazy_static! {
	// Firmware revisions differ in whitespace around the comma, so don't rely on fixed offsets
	static ref STAT_RE: Regex = Regex::new(r"^\s*(READ|IDLE)\s*,\s*(\d+)\s*$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState { Read, Idle }

/// Reply to `:WAV:STAT?` during a deep-memory read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadStatus {
	pub state: ReadState,
	pub ready: usize,
}

pub fn decode_status(s:&str) -> Result<ReadStatus> {
	let caps = STAT_RE.captures(s)
		.ok_or_else(|| Error::protocol(format!("Unrecognized :WAV:STAT? reply {:?}", s)))?;

	let state = match &caps[1] {
		"READ" => ReadState::Read,
		_      => ReadState::Idle,
	};
	let ready = caps[2].parse()
		.map_err(|_| Error::protocol(format!("Point count in :WAV:STAT? reply {:?} is too large", s)))?;

	Ok(ReadStatus{ state, ready })
}
