//! Integration test crate for MemeFill.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! Everything runs on in-memory frame sources and sinks, so no FFmpeg
//! install is needed.

#[cfg(test)]
mod end_to_end;

#[cfg(test)]
mod timeline;
