
use std::io::{self, Read, Write, Error, ErrorKind};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use byteorder::{BigEndian, WriteBytesExt, ReadBytesExt};

use crate::xdr::{Packer, Unpacker};
use super::xdr_pack::pack_callheader_no_auth;
use super::xdr_unpack;

const LAST_FRAGMENT:u32 = 0x8000_0000;

pub const DEFAULT_IO_TIMEOUT_SEC:u64 = 30;

// Record marking (RFC 5531 section 11): each fragment is prefixed with a 4-byte length whose
// high bit flags the last fragment of the record
pub fn write_record<W: Write>(w:&mut W, record:&[u8]) -> io::Result<()> {
	let len = u32::try_from(record.len())
		.ok()
		.filter(|n| n & LAST_FRAGMENT == 0)
		.ok_or_else(|| Error::new(ErrorKind::InvalidInput, "RPC record too long for a single fragment"))?;

	let mut send_bytes:Vec<u8> = Vec::with_capacity(record.len() + 4);
	send_bytes.write_u32::<BigEndian>(len | LAST_FRAGMENT)?;
	send_bytes.extend_from_slice(record);
	w.write_all(&send_bytes)
}

pub fn read_record<R: Read>(r:&mut R) -> io::Result<Vec<u8>> {
	let mut record:Vec<u8> = vec![];

	let mut last = false;
	while !last {
		let header = r.read_u32::<BigEndian>()?;
		last = (header & LAST_FRAGMENT) != 0;

		let n = (header & !LAST_FRAGMENT) as usize;
		let start = record.len();
		record.resize(start + n, 0);
		r.read_exact(&mut record[start..])?;
	}

	Ok(record)
}

pub struct TcpClient {
	pub stream: TcpStream,
	pub prog: u32,
	pub vers: u32,
	pub lastxid: u32,
	pub packer: Packer,
	pub unpacker: Unpacker,
}

impl TcpClient {

	pub fn connect<A: ToSocketAddrs>(addr:A, prog:u32, vers:u32) -> io::Result<Self> {
		let stream = TcpStream::connect(addr)?;
		stream.set_read_timeout(Some(Duration::from_secs(DEFAULT_IO_TIMEOUT_SEC)))?;
		stream.set_nodelay(true)?;
		Ok(Self{ stream, prog, vers, lastxid: 0, packer: Packer::new(), unpacker: Unpacker::new() })
	}

	// Resets the packer and writes a call header for `prc`; the caller packs the arguments after this
	pub fn start_call(&mut self, prc:u32) -> io::Result<()> {
		self.lastxid = self.lastxid.wrapping_add(1);
		self.packer.reset();
		pack_callheader_no_auth(&mut self.packer, self.lastxid, self.prog, self.vers, prc)
	}

	// Sends the packed call and loads the matching reply's results into the unpacker
	pub fn do_call(&mut self) -> io::Result<()> {
		write_record(&mut self.stream, self.packer.get_buf())?;

		loop {
			let reply = read_record(&mut self.stream)?;
			self.unpacker.reset(&reply);

			let (xid, _) = xdr_unpack::unpack_replyheader(&mut self.unpacker)?;
			if xid == self.lastxid {
				return Ok(());
			} else if xid < self.lastxid {
				// Stale reply to an earlier call that timed out on our side
				log::debug!("Discarding stale RPC reply xid={} (expecting {})", xid, self.lastxid);
				continue;
			} else {
				return Err(Error::new(ErrorKind::Other, "Received an RPC reply for a call that hasn't been made yet"));
			}
		}
	}

}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Cursor;

	#[test]
	fn record_round_trip_through_marking() {
		let mut wire:Vec<u8> = vec![];
		write_record(&mut wire, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
		assert_eq!(&wire[0..4], &[0x80, 0, 0, 8]);

		let record = read_record(&mut Cursor::new(wire)).unwrap();
		assert_eq!(record, vec![1, 2, 3, 4, 5, 6, 7, 8]);
	}

	#[test]
	fn fragments_are_concatenated() {
		// Two fragments of odd lengths, only the second flagged as last
		let wire:Vec<u8> = vec![0, 0, 0, 3, 9, 8, 7, 0x80, 0, 0, 1, 6];
		let record = read_record(&mut Cursor::new(wire)).unwrap();
		assert_eq!(record, vec![9, 8, 7, 6]);
	}

	#[test]
	fn truncated_fragment_is_an_error() {
		let wire:Vec<u8> = vec![0x80, 0, 0, 10, 1, 2];
		assert!(read_record(&mut Cursor::new(wire)).is_err());
	}
}
