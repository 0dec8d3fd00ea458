//! Client-side core of the Sidekick meeting companion: a durable
//! multi-conversation store, the query backend client, and the CLI around them.

// Hard bans
#![deny(warnings)]
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(non_camel_case_types)]
#![deny(non_snake_case)]
#![deny(non_upper_case_globals)]
#![deny(nonstandard_style)]
#![deny(unused_must_use)]
#![deny(overflowing_literals)]
#![forbid(unsafe_op_in_unsafe_fn)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(unused_variables)]

// Clippy discipline
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::print_stdout)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::missing_const_for_fn)]
#![deny(clippy::unwrap_in_result)]
#![deny(clippy::module_inception)]
#![deny(clippy::redundant_clone)]
#![deny(clippy::shadow_unrelated)]
#![deny(clippy::too_many_arguments)]
#![deny(clippy::cognitive_complexity)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::panic))]
#![allow(clippy::module_name_repetitions)]

/// Backend clients: query service, corpus and interviews.
pub mod backend;
/// Command-line parsing and command execution.
pub mod cli;
/// Configuration, errors, and clocks.
pub mod common;
/// The ask-then-record flow.
pub mod companion;
/// Conversation store, identifiers, naming, and data types.
pub mod conversations;
/// Startup helpers for the `sidekick` binary.
pub mod start_sidekick;
/// Durable storage backends for the session record.
pub mod storage;
