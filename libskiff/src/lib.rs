#![deny(rust_2018_idioms)]

#[macro_use]
extern crate anyhow;

#[macro_use]
extern crate bitflags;

#[macro_use]
extern crate log;

#[macro_use]
extern crate smallvec;

#[cfg(test)]
#[macro_use]
extern crate maplit;

#[cfg(test)]
#[macro_use(quickcheck)]
extern crate quickcheck_macros;

#[cfg(test)]
pub mod test_utils;

#[macro_use]
mod macros;

pub mod error;
pub mod hash;
pub mod linker;
pub mod node;
pub mod path;
pub mod resolve;
pub mod serialize;
pub mod sync;

mod io;
