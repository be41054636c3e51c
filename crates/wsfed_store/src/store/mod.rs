//! Read-side stores consumed by the WS-Federation host.

pub mod relying_party_store;
