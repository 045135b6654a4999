
// External data representation, a protocol for serializing data to be sent over the network
pub mod xdr;

// Remote procedure call, a protocol build on top of XDR to provide something like C-style function calls over the network
pub mod rpc;

// A protocol using RPC that's meant to communicate with instruments like oscilloscopes, power supplies, waveform generators, etc
pub mod vxi11;

// The SCPI-level byte channel acquisitions run over, plus IEEE 488.2 block decoding
pub mod transport;

// Errors shared by every layer above the raw transport
pub mod error;

// Module for devices that implement the VXI11 protocol
pub mod devices;

// Voltage/current analysis on top of paired channel reads
pub mod power;

pub use error::{Error, Result};
pub use transport::Transport;
