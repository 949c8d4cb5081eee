//! # Chainsign Testkit
//!
//! Testing utilities for Chainsign.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Scenario vectors**: Scripted call sequences with expected outcomes,
//!   runnable against the reference ledger or any notary
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Helper structs for setting up test scenarios
//!
//! ## Scenario Vectors
//!
//! Every backend must agree with the reference ledger on every vector:
//!
//! ```rust
//! use chainsign_testkit::vectors::{all_vectors, run_on_ledger};
//!
//! for vector in all_vectors() {
//!     run_on_ledger(&vector).unwrap();
//! }
//! ```
//!
//! ## Property Testing
//!
//! Use the generators with proptest:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use chainsign_core::Ledger;
//! use chainsign_testkit::generators::{ops, Op};
//!
//! proptest! {
//!     #[test]
//!     fn replay_is_deterministic(ops in ops(64)) {
//!         let mut a = Ledger::new();
//!         let mut b = Ledger::new();
//!         for op in &ops {
//!             prop_assert_eq!(op.apply(&mut a), op.apply(&mut b));
//!         }
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! Quickly set up test scenarios:
//!
//! ```rust
//! use chainsign_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let signatory = fixture.signatory();
//! assert_eq!(signatory.identity, fixture.identity);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{memory_notary, multi_party_fixtures, TestFixture};
pub use generators::{ops, Op};
pub use vectors::{all_vectors, run_on_ledger, run_on_notary, verify_all_vectors, ScenarioVector};
