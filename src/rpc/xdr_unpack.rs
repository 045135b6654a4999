use std::io::{self, Error, ErrorKind};

use crate::xdr::Unpacker;
use crate::rpc::{REPLY, MSG_DENIED, RPC_MISMATCH, AUTH_ERROR, MSG_ACCEPTED, PROG_UNAVAIL, PROG_MISMATCH, PROC_UNAVAIL, GARBAGE_ARGS, SYSTEM_ERR, SUCCESS};

fn err(msg:&str) -> io::Error { Error::new(ErrorKind::Other, msg) }

pub struct Auth {
	pub flavor: i32,
	pub body: Vec<u8>,
}

pub fn unpack_auth(unpacker:&mut Unpacker) -> io::Result<Auth> {
	let flavor = unpacker.unpack_enum()?;
	let body   = unpacker.unpack_variable_len_opaque()?;
	Ok(Auth{ flavor, body })
}

// Consumes an accepted, successful reply header and leaves the unpacker positioned at the procedure's results
pub fn unpack_replyheader(unpacker:&mut Unpacker) -> io::Result<(u32, Auth)> {
	let xid = unpacker.unpack_u32()?;

	if unpacker.unpack_enum()? != REPLY { return Err(err("Expected REPLY message type in RPC reply header")); }

	match unpacker.unpack_enum()? {
		MSG_ACCEPTED => { },
		MSG_DENIED => {
			return match unpacker.unpack_enum()? {
				RPC_MISMATCH => {
					let lo = unpacker.unpack_u32()?;
					let hi = unpacker.unpack_u32()?;
					Err(Error::new(ErrorKind::Other, format!("RPC message denied, server supports versions {}..{}", lo, hi)))
				},
				AUTH_ERROR => {
					let stat = unpacker.unpack_u32()?;
					Err(Error::new(ErrorKind::PermissionDenied, format!("RPC message denied with auth error {}", stat)))
				},
				_ => Err(err("RPC message denied for an unknown reason")),
			};
		},
		_ => return Err(err("Neither MSG_DENIED nor MSG_ACCEPTED in RPC reply header")),
	}

	let verf = unpack_auth(unpacker)?;

	match unpacker.unpack_enum()? {
		SUCCESS       => Ok((xid, verf)),
		PROG_UNAVAIL  => Err(err("RPC program unavailable")),
		PROG_MISMATCH => {
			let lo = unpacker.unpack_u32()?;
			let hi = unpacker.unpack_u32()?;
			Err(Error::new(ErrorKind::Other, format!("RPC program mismatch, server supports versions {}..{}", lo, hi)))
		},
		PROC_UNAVAIL  => Err(err("RPC procedure unavailable")),
		GARBAGE_ARGS  => Err(err("RPC server could not decode the arguments")),
		SYSTEM_ERR    => Err(err("RPC server system error")),
		_             => Err(err("RPC call failed for an unknown reason")),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::xdr::Packer;

	fn reply(accept_stat:i32) -> Vec<u8> {
		let mut packer = Packer::new();
		packer.pack_u32(42).unwrap();
		packer.pack_enum(REPLY).unwrap();
		packer.pack_enum(MSG_ACCEPTED).unwrap();
		packer.pack_enum(0).unwrap();
		packer.pack_variable_len_opaque(&[]).unwrap();
		packer.pack_enum(accept_stat).unwrap();
		packer.pack_u32(0xdead).unwrap();
		packer.buff
	}

	#[test]
	fn accepted_reply_leaves_results() {
		let mut unpacker = Unpacker::new();
		unpacker.reset(&reply(SUCCESS));
		let (xid, verf) = unpack_replyheader(&mut unpacker).unwrap();
		assert_eq!(xid, 42);
		assert_eq!(verf.flavor, 0);
		assert_eq!(unpacker.unpack_u32().unwrap(), 0xdead);
	}

	#[test]
	fn garbage_args_is_an_error() {
		let mut unpacker = Unpacker::new();
		unpacker.reset(&reply(GARBAGE_ARGS));
		assert!(unpack_replyheader(&mut unpacker).is_err());
	}
}
