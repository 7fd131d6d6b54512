//! Frame format parsers
//!
//! This module contains the two passes of frame decoding (tokenizer and
//! frame decoder) and the counts-only variant.

pub mod counts;
pub mod frame;
pub mod tokenizer;

// Re-export parser types
pub use counts::decode_counts;
pub use frame::{DecodedLine, FrameDecoder};
pub use tokenizer::{tokenize, Marker, MarkerIndex, Token};
