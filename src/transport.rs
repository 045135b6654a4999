
// The byte channel every acquisition runs over.  Implementors only provide raw write/read; the SCPI-level
// helpers (text queries, binary blocks, integer replies) are built on top of those two.

use std::io::{self, Error as IoError, ErrorKind};
use std::str;

use crate::error::{Error, Result};

pub trait Transport {

	fn write(&mut self, data:&[u8]) -> io::Result<()>;

	fn read(&mut self) -> io::Result<Vec<u8>>;

	fn ask(&mut self, data:&[u8]) -> io::Result<Vec<u8>> {
		self.write(data)?;
		self.read()
	}

	fn command(&mut self, cmd:&str) -> io::Result<()> {
		log::debug!("-> {}", cmd);
		self.write(cmd.as_bytes())
	}

	fn query(&mut self, cmd:&str) -> io::Result<String> {
		log::debug!("-> {}", cmd);
		let resp = self.ask(cmd.as_bytes())?;
		let text = str::from_utf8(&resp)
			.map_err(|_| IoError::new(ErrorKind::InvalidData, "Unable to parse response as UTF-8"))?
			.trim_end()
			.to_owned();
		log::debug!("<- {}", text);
		Ok(text)
	}

	fn query_binary(&mut self, cmd:&str) -> Result<Vec<u8>> {
		log::debug!("-> {}", cmd);
		let resp = self.ask(cmd.as_bytes())?;
		let data = decode_block(&resp)?.to_vec();
		log::debug!("<- #block of {} bytes", data.len());
		Ok(data)
	}

	fn query_ascii_int(&mut self, cmd:&str) -> Result<i64> {
		let resp = self.query(cmd)?;
		let text = resp.trim();
		if let Ok(n) = text.parse::<i64>() {
			return Ok(n);
		}

		// Some firmware reports integer settings in NR3 form, e.g. 1.4000e+04
		match text.parse::<f64>() {
			Ok(x) if x.fract() == 0.0 && x.abs() < 9.0e18 => Ok(x as i64),
			_ => Err(Error::protocol(format!("Expected an integer in reply to {} but got {:?}", cmd, text))),
		}
	}

}

// IEEE 488.2 arbitrary block: '#', a digit n, n digits of length, then the payload
pub fn decode_block(resp:&[u8]) -> Result<&[u8]> {
	let start = resp.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(resp.len());
	let resp = &resp[start..];

	if resp.first() != Some(&b'#') {
		return Err(Error::protocol("Binary block doesn't start with '#'"));
	}

	let n_digits = match resp.get(1) {
		Some(d) if d.is_ascii_digit() => (d - b'0') as usize,
		_ => return Err(Error::protocol("Binary block header is missing its digit count")),
	};

	if n_digits == 0 {
		// Indefinite length, terminated by the message terminator
		let body = &resp[2..];
		return Ok(body.strip_suffix(b"\n").unwrap_or(body));
	}

	let len_field = resp.get(2..2 + n_digits)
		.ok_or_else(|| Error::protocol("Binary block header is truncated"))?;
	let len:usize = str::from_utf8(len_field)
		.ok()
		.and_then(|s| s.parse().ok())
		.ok_or_else(|| Error::protocol(format!("Binary block length {:?} isn't a number", String::from_utf8_lossy(len_field))))?;

	let body_start = 2 + n_digits;
	resp.get(body_start..body_start + len)
		.ok_or_else(|| Error::protocol(format!("Binary block declares {} bytes but only {} arrived", len, resp.len() - body_start)))
}

#[cfg(test)]
pub(crate) mod mock {
	use std::collections::{HashMap, VecDeque};
	use std::io::{self, Error, ErrorKind};

	use super::Transport;

	// Replays canned replies per query and records every message written, in order
	#[derive(Default)]
	pub struct ScriptedTransport {
		pub written: Vec<String>,
		replies: HashMap<String, VecDeque<Vec<u8>>>,
		pending: Option<String>,
	}

	impl ScriptedTransport {
		pub fn new() -> Self { Self::default() }

		pub fn reply(&mut self, query:&str, resp:impl Into<Vec<u8>>) -> &mut Self {
			self.replies.entry(query.to_owned()).or_default().push_back(resp.into());
			self
		}

		pub fn reply_block(&mut self, query:&str, payload:&[u8]) -> &mut Self {
			let mut resp = format!("#9{:09}", payload.len()).into_bytes();
			resp.extend_from_slice(payload);
			resp.push(b'\n');
			self.reply(query, resp)
		}

		pub fn count(&self, cmd:&str) -> usize {
			self.written.iter().filter(|w| *w == cmd).count()
		}

		pub fn position(&self, cmd:&str) -> Option<usize> {
			self.written.iter().position(|w| w == cmd)
		}
	}

	impl Transport for ScriptedTransport {
		fn write(&mut self, data:&[u8]) -> io::Result<()> {
			let cmd = String::from_utf8_lossy(data).into_owned();
			self.pending = Some(cmd.clone());
			self.written.push(cmd);
			Ok(())
		}

		fn read(&mut self) -> io::Result<Vec<u8>> {
			let cmd = self.pending.take()
				.ok_or_else(|| Error::new(ErrorKind::Other, "read without a preceding query"))?;
			self.replies.get_mut(&cmd)
				.and_then(|q| q.pop_front())
				.ok_or_else(|| Error::new(ErrorKind::UnexpectedEof, format!("no scripted reply for {}", cmd)))
		}
	}
}
