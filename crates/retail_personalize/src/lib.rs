//! Retail recommendation setup.
//!
//! Drives the managed recommendation service through two stages: the data
//! layer (schemas, datasets, imports) and the training layer (solutions,
//! campaigns, filter). Identifiers created by one stage are persisted in a
//! local state store for the next.

pub mod commands;
