//! Warden Common - Shared domain types and durable state for the warden daemon
//!
//! Everything in this crate is platform-free: pure moderation logic plus local
//! JSON persistence. All chat-platform I/O lives behind the gateway port in
//! the `wardend` crate.

pub mod config;
pub mod error;
pub mod filter;
pub mod ids;
pub mod ledger;
pub mod store;

pub use config::WardenConfig;
pub use error::{Result, WardenError};
pub use filter::{ContentPolicyFilter, Verdict};
pub use ids::{ChannelId, MessageId, RoleId, UserId};
pub use ledger::InfractionLedger;
pub use store::{CounterStore, InfractionRecord, InfractionStore};
