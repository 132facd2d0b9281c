#![no_main]

use indian_store_mcp::server::dispatcher::McpDispatcher;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Either a request or a -32700 response, never a panic
    if let Err(response) = McpDispatcher::parse(data) {
        let _ = serde_json::to_vec(&response);
    }
});
