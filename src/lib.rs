//! Cross-process log relay for the fitness tracker app.
//!
//! The client half ([`emitter`] + [`transport`]) builds records and ships
//! them to the server with fire-and-forget HTTP delivery. The server half
//! ([`server`] + [`writer`] + [`sink`]) ingests those records, instruments
//! its own request traffic, and fans everything out to the console and two
//! rotating log files.

pub mod config;
pub mod emitter;
pub mod nav;
pub mod record;
pub mod server;
pub mod sink;
pub mod transport;
pub mod writer;
