//! Test utilities and process spawner doubles
//!
//! Provides a scripted [`MockSpawner`] for exact command assertions and the
//! [`FakeRegExe`] emulator for exercising whole registry workflows without a
//! Windows host.

pub mod fake_reg;
pub mod mocks;

pub use fake_reg::{FakeRegExe, Locale};
pub use mocks::{MockSpawner, RecordedCall};
