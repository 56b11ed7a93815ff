//! Platform abstraction: raw metadata and extended-attribute capture.

pub mod pal;
