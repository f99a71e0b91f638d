//! WebSocket-framed REPL access over a UNIX or TCP socket.
#![deny(rust_2018_idioms)]
#![warn(missing_debug_implementations, clippy::clone_on_ref_ptr)]

mod connection;
mod listener;
mod server;

pub use server::Server;
