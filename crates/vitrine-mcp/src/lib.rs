mod mcp;

pub use mcp::McpServer;
