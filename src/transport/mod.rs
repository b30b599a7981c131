//! Transport module - event stream encoding

pub mod wire;

pub use wire::{decode_record, encode, encode_stream, EventDecoder, WireEvent};
