//! Integration test crate for Tintcut.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on every tintcut crate to verify they work together.

#[cfg(test)]
mod support;

#[cfg(test)]
mod editing;

#[cfg(test)]
mod export;

#[cfg(test)]
mod library;
