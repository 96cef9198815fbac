//! `streaming` crate — the concrete websocket transport for
//! `nodes::ExecutionChannel`, plus the registry that lets a client attach
//! to an already-running execution and lets an admin broadcast across
//! every live one.

pub mod channel;
pub mod registry;
pub mod ws;

pub use channel::WsChannel;
pub use registry::ConnectionRegistry;
pub use ws::execution_ws;
