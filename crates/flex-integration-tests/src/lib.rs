//! Integration test crate for the FLEX payout contracts.
//!
//! This crate has no library code; it only contains integration tests
//! that drive payout engines and distributors through the serial chain
//! executor, one block per transaction.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p flex-integration-tests
//! ```
