//! FIX gateway: session plumbing between client sockets and the matching
//! core.
//!
//! A [`server::Server`] accepts TCP connections and reads until one
//! complete message is buffered; the [`registry::SessionRegistry`]
//! resolves that message to a [`session::Session`] (creating one on first
//! contact), which then owns the socket through its three worker threads
//! (reader, inbound processor, outbound writer) until something
//! deactivates it.

pub mod registry;
pub mod server;
pub mod session;
