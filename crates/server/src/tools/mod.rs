//! MCP tool implementations.
//!
//! This module contains all tools exposed by the railbook-sw server.

pub mod cache;
pub mod clients;
pub mod events;
pub mod fetch;
pub mod lifecycle;

#[cfg(test)]
pub(crate) mod testing;

use rmcp::model::{CallToolResult, Content};
use serde::Serialize;

use railbook_core::Error;

/// Render a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, Error> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
