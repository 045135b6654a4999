
// Device core
pub const DEVICE_CORE_PROG:u32  = 0x0607af;
pub const DEVICE_CORE_VERS:u32  = 1;
pub const CREATE_LINK:u32       = 10;
pub const DEVICE_WRITE:u32      = 11;
pub const DEVICE_READ:u32       = 12;
pub const DEVICE_CLEAR:u32      = 15;
pub const DESTROY_LINK:u32      = 23;

pub const CLIENT_ID:i32 = 3333;
pub const DEFAULT_LOCK_TIMEOUT:u32 = 10000;
pub const DEFAULT_IO_TIMEOUT:u32   = 10000;

pub const OPERATION_FLAGS_END_ONLY:i32 = 8;

// Reason bits in a device_read reply
pub const REASON_REQCNT:i32 = 1;
pub const REASON_CHR:i32    = 2;
pub const REASON_END:i32    = 4;

use std::io::{self, Error, ErrorKind};

use crate::rpc::port_mapping::{TcpPortMapperClient, Mapping, Protocol};
use crate::rpc::tcp_clients::TcpClient;
use crate::transport::Transport;

fn err(msg:&str) -> io::Error { Error::new(ErrorKind::Other, msg) }

pub mod xdr_pack;

// Device error codes from the VXI-11 standard, table B.2
fn device_error(code:i32) -> io::Result<()> {
	match code {
		0  => Ok(()),
		1  => Err(err("VXI-11 syntax error")),
		3  => Err(err("VXI-11 device not accessible")),
		4  => Err(err("VXI-11 invalid link identifier")),
		5  => Err(err("VXI-11 parameter error")),
		6  => Err(err("VXI-11 channel not established")),
		8  => Err(err("VXI-11 operation not supported")),
		9  => Err(err("VXI-11 out of resources")),
		11 => Err(err("VXI-11 device locked by another link")),
		12 => Err(err("VXI-11 no lock held by this link")),
		15 => Err(Error::new(ErrorKind::TimedOut, "VXI-11 I/O timeout")),
		17 => Err(err("VXI-11 I/O error")),
		21 => Err(err("VXI-11 invalid address")),
		23 => Err(Error::new(ErrorKind::Interrupted, "VXI-11 abort")),
		29 => Err(err("VXI-11 channel already established")),
		_  => Err(Error::new(ErrorKind::Other, format!("VXI-11 unknown device error {}", code))),
	}
}

pub struct CoreClient {
	client: TcpClient,
	opt_link: Option<Link>,
}

#[derive(Debug, Clone, Copy)]
pub struct Link {
	pub link_id: i32,
	pub abort_port: u16,
	pub max_recv_size: u32,
}

impl CoreClient {

	fn get_link(&self) -> io::Result<Link> {
		self.opt_link.ok_or_else(|| err("No VXI-11 link"))
	}

	pub fn new(host:&str) -> io::Result<Self> {

		// Find the port to use for the core program
		let mut pmap_client = TcpPortMapperClient::new(host)?;

		let mapping = Mapping {
			program: DEVICE_CORE_PROG,
			version: DEVICE_CORE_VERS,
			protocol: Protocol::TCP,
			port: 0,
		};

		let port = pmap_client.get_port(&mapping)?;
		log::debug!("VXI-11 core channel for {} is on port {}", host, port);

		let client = TcpClient::connect((host, port), DEVICE_CORE_PROG, DEVICE_CORE_VERS)?;

		Ok(CoreClient{ client, opt_link: None })
	}

	pub fn link(&self) -> Option<Link> { self.opt_link }

	pub fn create_link(&mut self) -> io::Result<()> {
		if self.opt_link.is_some() {
			return Err(err("Already connected to a link"));
		}

		self.client.start_call(CREATE_LINK)?;
		xdr_pack::pack_create_link_parms(&mut self.client.packer, CLIENT_ID, false, DEFAULT_LOCK_TIMEOUT, "inst0")?;
		self.client.do_call()?;

		let error         = self.client.unpacker.unpack_i32()?;
		let link_id       = self.client.unpacker.unpack_i32()?;
		let abort_port    = self.client.unpacker.unpack_u32()?;
		let max_recv_size = self.client.unpacker.unpack_u32()?;

		device_error(error)?;

		let abort_port = u16::try_from(abort_port).map_err(|_| err("Abort port outside the u16 range"))?;
		self.opt_link = Some(Link{ link_id, abort_port, max_recv_size });
		log::debug!("Created VXI-11 link {:?}", self.opt_link);

		Ok(())
	}

	pub fn ask(&mut self, data:&[u8]) -> io::Result<Vec<u8>> {
		self.write(data)?;
		self.read()
	}

	pub fn write(&mut self, data:&[u8]) -> io::Result<()> {
		let link = self.get_link()?;
		if link.max_recv_size != 0 && data.len() > link.max_recv_size as usize {
			return Err(Error::new(ErrorKind::InvalidInput, "Message is larger than the device's max_recv_size"));
		}

		self.client.start_call(DEVICE_WRITE)?;
		xdr_pack::pack_device_write_parms(&mut self.client.packer, link.link_id, DEFAULT_IO_TIMEOUT, DEFAULT_LOCK_TIMEOUT, OPERATION_FLAGS_END_ONLY, data)?;
		self.client.do_call()?;

		let error = self.client.unpacker.unpack_i32()?;
		let size  = self.client.unpacker.unpack_u32()?;
		device_error(error)?;

		if size as usize != data.len() {
			return Err(err("Number of bytes in confirmation doesn't match number of bytes sent"));
		}

		Ok(())
	}

	// Keeps issuing device_read until the END reason bit shows up, since the instrument is free to split a
	// large response (a deep-memory chunk, for example) across several replies
	pub fn read(&mut self) -> io::Result<Vec<u8>> {
		let link = self.get_link()?;
		let mut ans:Vec<u8> = vec![];

		loop {
			self.client.start_call(DEVICE_READ)?;
			xdr_pack::pack_device_read_parms(&mut self.client.packer, link.link_id, u32::MAX, DEFAULT_IO_TIMEOUT, DEFAULT_LOCK_TIMEOUT, 0, 0)?;
			self.client.do_call()?;

			let error  = self.client.unpacker.unpack_i32()?;
			let reason = self.client.unpacker.unpack_i32()?;
			let data   = self.client.unpacker.unpack_variable_len_opaque()?;
			device_error(error)?;

			ans.extend_from_slice(&data);

			if reason & !(REASON_REQCNT | REASON_CHR | REASON_END) != 0 {
				return Err(err("Reserved bits set in device_read reason"));
			} else if reason & (REASON_END | REASON_CHR) != 0 {
				return Ok(ans);
			} else if data.is_empty() {
				return Err(err("Device returned an empty, unterminated read"));
			}
		}
	}

	pub fn clear(&mut self) -> io::Result<()> {
		let link = self.get_link()?;

		self.client.start_call(DEVICE_CLEAR)?;
		self.client.packer.pack_i32(link.link_id)?;
		self.client.packer.pack_i32(0)?;
		self.client.packer.pack_u32(DEFAULT_LOCK_TIMEOUT)?;
		self.client.packer.pack_u32(DEFAULT_IO_TIMEOUT)?;
		self.client.do_call()?;

		device_error(self.client.unpacker.unpack_i32()?)
	}

	pub fn destroy_link(&mut self) -> io::Result<()> {
		let link = self.opt_link.take().ok_or_else(|| err("No link to destroy"))?;

		self.client.start_call(DESTROY_LINK)?;
		self.client.packer.pack_i32(link.link_id)?;
		self.client.do_call()?;

		device_error(self.client.unpacker.unpack_i32()?)
	}

}

impl Transport for CoreClient {
	fn write(&mut self, data:&[u8]) -> io::Result<()> { CoreClient::write(self, data) }
	fn read(&mut self) -> io::Result<Vec<u8>> { CoreClient::read(self) }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn device_errors_map_to_io_kinds() {
		assert!(device_error(0).is_ok());
		assert_eq!(device_error(15).unwrap_err().kind(), ErrorKind::TimedOut);
		assert_eq!(device_error(23).unwrap_err().kind(), ErrorKind::Interrupted);
		assert!(device_error(99).unwrap_err().to_string().contains("99"));
	}
}
