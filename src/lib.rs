//! Hogwarts Legacy save tool: convert the `RawDatabaseImage` region of a
//! `.sav` file between the game's chunked compressed format and a raw
//! SQLite file that external save editors understand.
//!
//! The transform is byte-exact: everything outside the located property is
//! copied through untouched, and `decompress` followed by `compress` (with
//! a deterministic codec) reproduces the input bit-for-bit.

pub mod cli;
pub mod codec;
pub mod error;
pub mod gvas;
pub mod save;
pub mod sqlite;
pub mod upk;

pub use codec::{Codec, OozCodec, ZlibCodec};
pub use error::{Error, Result};
pub use save::{transform, Direction};
