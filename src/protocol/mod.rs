pub mod batch;
pub mod request;
pub mod response;

pub use batch::{parse_body, InboundMessage, MAX_BODY_BYTES};
pub use request::{InitializeParams, JsonRpcRequest, ListToolsParams, RpcId, ToolCallParams};
pub use response::{CallToolResult, JsonRpcError, JsonRpcResponse, ToolResultContent};
