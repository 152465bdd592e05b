mod server;
mod tools;

pub use server::CodectxMcpServer;
pub use tools::*;
