//! Integration test crate for ReelCam.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on the reelcam crates to verify they work together.

#[cfg(test)]
mod support;

#[cfg(test)]
mod timeline;

#[cfg(test)]
mod compose;

#[cfg(test)]
mod recorder;
