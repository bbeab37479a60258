//! clients_poll tool implementation.
//!
//! Drains everything the worker handed to pages and the registration since
//! the last poll.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use serde::Serialize;

use super::json_result;
use crate::host::{Delivered, Outbox};

#[derive(Debug, Clone, Serialize)]
pub struct ClientsPollOutput {
    pub events: Vec<Delivered>,
}

pub async fn poll_impl(outbox: &Outbox) -> Result<CallToolResult, McpError> {
    Ok(json_result(&ClientsPollOutput { events: outbox.drain() })?)
}
