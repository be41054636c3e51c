//! Consumer-facing relying party model.
//!
//! # Responsibility
//! - Define the shape the WS-Federation host works with: parsed certificate,
//!   claim mappings as an original-to-new lookup.
//! - Stay free of storage concerns (no ids, no rows).

pub mod certificate;
pub mod relying_party;
