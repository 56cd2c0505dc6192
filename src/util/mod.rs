//! Various helpful things.

pub mod hex;
