#![doc = include_str!("../README.md")]

mod common;
pub use common::*;

mod mux;
pub use mux::*;
