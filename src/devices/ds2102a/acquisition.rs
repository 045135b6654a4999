
use std::thread;
use std::time::Duration;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::transport::Transport;
use super::Channel;
use super::preamble::Preamble;
use super::status::{decode_status, ReadState};
use super::time::TimeAxis;

pub const DEFAULT_EMPTY_POLL_SEC:f32 = 3.0;
pub const DEFAULT_CHUNK_POLL_SEC:f32 = 2.0;

/// Pacing for [`stop_and_read_raw`]. Both intervals must be non-zero; the scope answers `:WAV:STAT?`
/// slowly while it's filling the transfer buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawReadConfig {
	/// Wait after a status poll that reports no points ready.
	pub empty_poll: Duration,
	/// Wait after draining a chunk before polling again.
	pub chunk_poll: Duration,
}

impl Default for RawReadConfig {
	fn default() -> Self {
		Self {
			empty_poll: Duration::from_secs_f32(DEFAULT_EMPTY_POLL_SEC),
			chunk_poll: Duration::from_secs_f32(DEFAULT_CHUNK_POLL_SEC),
		}
	}
}

impl RawReadConfig {
	fn validate(&self) -> Result<()> {
		if self.empty_poll.is_zero() { return Err(Error::InvalidConfig("empty_poll must be non-zero")); }
		if self.chunk_poll.is_zero() { return Err(Error::InvalidConfig("chunk_poll must be non-zero")); }
		Ok(())
	}
}

/// Voltages for one channel together with the preamble that produced them.
#[derive(Debug, Clone, Serialize)]
pub struct Waveform {
	pub preamble: Preamble,
	pub volts: Vec<f64>,
}

impl Waveform {
	fn from_raw(preamble:Preamble, raw:&[u8]) -> Result<Self> {
		if raw.len() != preamble.points {
			return Err(Error::SizeMismatch{ expected: preamble.points, actual: raw.len() });
		}
		Ok(Waveform{ volts: preamble.normalize(raw), preamble })
	}

	pub fn len(&self) -> usize { self.volts.len() }
	pub fn is_empty(&self) -> bool { self.volts.is_empty() }

	pub fn x_values(&self) -> Result<TimeAxis> { self.preamble.x_values() }
}

pub fn read_preamble<T: Transport + ?Sized>(rigol:&mut T) -> Result<Preamble> {
	Preamble::parse(&rigol.query(":WAV:PRE?")?)
}

/// Time axis of whatever the waveform settings currently point at, from a fresh preamble.
pub fn last_x_values<T: Transport + ?Sized>(rigol:&mut T) -> Result<TimeAxis> {
	read_preamble(rigol)?.x_values()
}

/// Reads the screen buffer of `source` (at most ~1200 points) in one transfer.
pub fn read_normal<T: Transport + ?Sized>(rigol:&mut T, source:Channel) -> Result<Waveform> {
	rigol.command(&format!(":WAV:SOUR {}", source.token()))?;
	rigol.command(":WAV:MODE NORM")?;
	rigol.command(":WAV:FORM BYTE")?;

	let preamble = read_preamble(rigol)?;
	let raw = rigol.query_binary(":WAV:DATA?")?;
	log::debug!("Normal read of {} returned {} points", source, raw.len());

	Waveform::from_raw(preamble, &raw)
}

/// Stops the scope and reads its whole acquisition memory for `source`.
///
/// The transfer is paced by `:WAV:STAT?`: each poll reports how many points are buffered, those are drained
/// with `:WAV:DATA?`, and the read ends once the scope reports `IDLE` and the final chunk has been taken.
/// The scope is left stopped.
pub fn stop_and_read_raw<T: Transport + ?Sized>(rigol:&mut T, source:Channel, config:&RawReadConfig) -> Result<Waveform> {
	config.validate()?;

	rigol.command(":STOP")?;

	let depth = rigol.query_ascii_int(":ACQ:MDEP?")?;
	let n_pts = usize::try_from(depth).ok()
		.filter(|n| *n > 0)
		.ok_or_else(|| Error::protocol(format!("Memory depth {} isn't a positive point count", depth)))?;
	log::info!("Expecting {} points from {}", n_pts, source);

	rigol.command(&format!(":WAV:SOUR {}", source.token()))?;
	rigol.command(":WAV:MODE RAW")?;
	rigol.command(":WAV:FORM BYTE")?;
	rigol.command(":WAV:STAR 1")?;
	rigol.command(&format!(":WAV:STOP {}", n_pts))?;
	rigol.command(":WAV:RES")?;

	// Captured before BEG so every DATA? below refers to this window
	let preamble = read_preamble(rigol)?;
	if preamble.points != n_pts {
		return Err(Error::protocol(format!("Preamble reports {} points but memory depth is {}", preamble.points, n_pts)));
	}

	rigol.command(":WAV:BEG")?;

	let mut raw:Vec<u8> = Vec::with_capacity(n_pts);
	let mut n_chunks = 0usize;
	loop {
		let status = decode_status(&rigol.query(":WAV:STAT?")?)?;

		if status.ready == 0 {
			// The scope has nothing left to send; a short total is reported below
			if status.state == ReadState::Idle && n_chunks > 0 {
				break;
			}
			log::info!("No points ready, sleeping...");
			thread::sleep(config.empty_poll);
			continue;
		}

		log::info!("Reading {} points", status.ready);
		let chunk = rigol.query_binary(":WAV:DATA?")?;
		if chunk.len() != status.ready {
			log::debug!("Scope reported {} points ready but sent {}", status.ready, chunk.len());
		}
		raw.extend_from_slice(&chunk);
		n_chunks += 1;
		log::info!("{} of {} points read in {} chunks", raw.len(), preamble.points, n_chunks);

		// IDLE arrives together with the final chunk, which has just been drained
		if status.state == ReadState::Idle {
			break;
		}

		log::debug!("Sleeping...");
		thread::sleep(config.chunk_poll);
	}

	rigol.command(":WAV:END")?;

	Waveform::from_raw(preamble, &raw)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::transport::mock::ScriptedTransport;

	const FAST:RawReadConfig = RawReadConfig{ empty_poll: Duration::from_millis(1), chunk_poll: Duration::from_millis(1) };

	const SCREEN_PRE:&str = "BYTE,NORM,1200,1,2.000000e-07,-1.200000e-04,0,3.906250e-02,127,0\n";

	fn raw_pre(points:usize) -> String {
		format!("BYTE,RAW,{},1,5.000000e-10,-1.500000e-04,0,1.000000e-01,100,28\n", points)
	}

	fn raw_scope(depth:usize, statuses:&[&str], chunks:&[Vec<u8>]) -> ScriptedTransport {
		let mut t = ScriptedTransport::new();
		t.reply(":ACQ:MDEP?", format!("{}\n", depth));
		t.reply(":WAV:PRE?", raw_pre(depth));
		for s in statuses { t.reply(":WAV:STAT?", format!("{}\n", s)); }
		for c in chunks { t.reply_block(":WAV:DATA?", c); }
		t
	}

	#[test]
	fn normal_read_issues_setup_then_reads() {
		let mut t = ScriptedTransport::new();
		t.reply(":WAV:PRE?", SCREEN_PRE).reply_block(":WAV:DATA?", &[128u8; 1200]);

		let wf = read_normal(&mut t, Channel::Ch2).unwrap();
		assert_eq!(t.written, vec![":WAV:SOUR CHAN2", ":WAV:MODE NORM", ":WAV:FORM BYTE", ":WAV:PRE?", ":WAV:DATA?"]);
		assert_eq!(wf.len(), 1200);
		assert!(wf.volts.iter().all(|&v| v == 3.90625e-2));

		let xs = wf.x_values().unwrap();
		assert_eq!(xs[0], -120_000_000);
		assert_eq!(xs[1199], -120_000_000 + 1199 * 200_000);
	}

	#[test]
	fn normal_short_read_is_fatal() {
		let mut t = ScriptedTransport::new();
		t.reply(":WAV:PRE?", SCREEN_PRE).reply_block(":WAV:DATA?", &[128u8; 1100]);
		assert!(matches!(read_normal(&mut t, Channel::Ch1), Err(Error::SizeMismatch{ expected: 1200, actual: 1100 })));
	}

	#[test]
	fn transport_errors_propagate() {
		// No scripted preamble, so the query fails at the transport
		let mut t = ScriptedTransport::new();
		assert!(matches!(read_normal(&mut t, Channel::Math), Err(Error::Transport(_))));
	}

	#[test]
	fn last_x_values_queries_a_fresh_preamble() {
		let mut t = ScriptedTransport::new();
		t.reply(":WAV:PRE?", "0,0,4,1,5.000000e-10,0.000000e+00,0,1.0e-02,0,0\n");
		assert_eq!(last_x_values(&mut t).unwrap(), vec![0, 500, 1000, 1500]);
		assert_eq!(t.written, vec![":WAV:PRE?"]);
	}

	#[test]
	fn raw_read_of_three_chunks() {
		let chunks:Vec<Vec<u8>> = (0..3u8).map(|i| vec![128 + i; 100]).collect();
		let mut t = raw_scope(300, &["READ,100", "READ,100", "IDLE,100"], &chunks);

		let wf = stop_and_read_raw(&mut t, Channel::Ch1, &FAST).unwrap();
		assert_eq!(wf.len(), 300);
		assert!((wf.volts[0] - 0.0).abs() < 1e-12);
		assert!((wf.volts[299] - 0.2).abs() < 1e-12);

		assert_eq!(t.count(":WAV:DATA?"), 3);
		assert_eq!(t.count(":WAV:END"), 1);
		assert_eq!(t.written.last().map(String::as_str), Some(":WAV:END"));
	}

	#[test]
	fn raw_read_command_order() {
		let mut t = raw_scope(10, &["IDLE,10"], &[vec![0; 10]]);
		stop_and_read_raw(&mut t, Channel::Fft, &FAST).unwrap();

		assert_eq!(&t.written[..10], &[
			":STOP", ":ACQ:MDEP?", ":WAV:SOUR FFT", ":WAV:MODE RAW", ":WAV:FORM BYTE",
			":WAV:STAR 1", ":WAV:STOP 10", ":WAV:RES", ":WAV:PRE?", ":WAV:BEG",
		]);
		assert!(t.position(":WAV:PRE?") < t.position(":WAV:BEG"));
	}

	#[test]
	fn raw_read_drains_the_tail_on_idle() {
		let mut t = raw_scope(150, &["READ,100", "IDLE,50"], &[vec![1; 100], vec![2; 50]]);
		let wf = stop_and_read_raw(&mut t, Channel::Ch1, &FAST).unwrap();
		assert_eq!(wf.len(), 150);
		assert_eq!(t.count(":WAV:STAT?"), 2);
		assert_eq!(t.count(":WAV:DATA?"), 2);
	}

	#[test]
	fn raw_read_waits_while_nothing_is_ready() {
		let mut t = raw_scope(64, &["READ,0", "READ,0", "READ,0", "IDLE,64"], &[vec![7; 64]]);
		let wf = stop_and_read_raw(&mut t, Channel::Ch2, &FAST).unwrap();
		assert_eq!(wf.len(), 64);
		assert_eq!(t.count(":WAV:STAT?"), 4);
		assert_eq!(t.count(":WAV:DATA?"), 1);
	}

	#[test]
	fn raw_read_stops_on_idle_once_everything_is_drained() {
		let mut t = raw_scope(20, &["READ,20", "IDLE,0"], &[vec![3; 20]]);
		let wf = stop_and_read_raw(&mut t, Channel::Ch1, &FAST).unwrap();
		assert_eq!(wf.len(), 20);
		assert_eq!(t.count(":WAV:END"), 1);
	}

	#[test]
	fn raw_read_length_mismatch_is_fatal() {
		let mut t = raw_scope(300, &["READ,100", "IDLE,100"], &[vec![0; 100], vec![0; 100]]);
		assert!(matches!(
			stop_and_read_raw(&mut t, Channel::Ch1, &FAST),
			Err(Error::SizeMismatch{ expected: 300, actual: 200 })
		));
	}

	#[test]
	fn raw_read_short_drain_then_idle_is_a_mismatch() {
		let mut t = raw_scope(300, &["READ,100", "IDLE,0"], &[vec![0; 100]]);
		assert!(matches!(
			stop_and_read_raw(&mut t, Channel::Ch1, &FAST),
			Err(Error::SizeMismatch{ expected: 300, actual: 100 })
		));
		assert_eq!(t.count(":WAV:STAT?"), 2);
	}

	#[test]
	fn raw_read_preamble_must_match_depth() {
		for points in ["18446744073709551615", "299"] {
			let mut t = ScriptedTransport::new();
			t.reply(":ACQ:MDEP?", "300\n")
				.reply(":WAV:PRE?", format!("BYTE,RAW,{},1,5.000000e-10,-1.500000e-04,0,1.000000e-01,100,28\n", points));

			assert!(matches!(stop_and_read_raw(&mut t, Channel::Ch1, &FAST), Err(Error::Protocol(_))), "{}", points);
			assert_eq!(t.count(":WAV:BEG"), 0);
		}
	}

	#[test]
	fn raw_read_rejects_bad_depth_and_config() {
		let mut t = raw_scope(0, &[], &[]);
		assert!(matches!(stop_and_read_raw(&mut t, Channel::Ch1, &FAST), Err(Error::Protocol(_))));

		let zero = RawReadConfig{ empty_poll: Duration::ZERO, ..FAST };
		let mut t = raw_scope(10, &["IDLE,10"], &[vec![0; 10]]);
		assert!(matches!(stop_and_read_raw(&mut t, Channel::Ch1, &zero), Err(Error::InvalidConfig(_))));
		assert!(t.written.is_empty());
	}

	#[test]
	fn raw_read_bad_status_is_a_protocol_error() {
		let mut t = raw_scope(10, &["BUSY"], &[]);
		assert!(matches!(stop_and_read_raw(&mut t, Channel::Ch1, &FAST), Err(Error::Protocol(_))));
	}
}
