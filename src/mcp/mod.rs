//! JSON-RPC 2.0 tool and resource surface (MCP method names)
//!
//! One [`McpHandler`] serves both transports: HTTP (`POST /mcp`) and
//! newline-delimited stdio.

pub mod handler;
pub mod protocol;
pub mod routes;
pub mod stdio;
pub mod tools;

pub use handler::McpHandler;
pub use protocol::{McpError, McpRequest, McpResponse};
pub use routes::build_router;
pub use stdio::{serve_lines, serve_stdio};
pub use tools::ToolName;
