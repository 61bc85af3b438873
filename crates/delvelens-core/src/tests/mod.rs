//! Crate-level integration tests.
//!
//! Unit tests live next to their modules; the tests here drive whole
//! lifecycles through the public surface, with the host side faked out.

pub mod helpers;

mod integration;
