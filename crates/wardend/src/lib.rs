//! Warden Daemon - community moderation and support tickets
//!
//! Event-driven: the external gateway connector POSTs platform events to the
//! HTTP server, and the daemon calls back out through the `ChatGateway` port.

pub mod automod;
pub mod commands;
pub mod events;
pub mod gateway;
pub mod moderation;
pub mod server;
pub mod tickets;

#[cfg(test)]
pub(crate) mod testutil;
