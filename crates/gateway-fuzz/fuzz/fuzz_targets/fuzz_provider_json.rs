#![no_main]

use indian_store_mcp::models::{ConsentRequest, IntrospectionResult, TokenResponse, UserInfo};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Provider responses are untrusted input
    let _ = serde_json::from_slice::<TokenResponse>(data);
    let _ = serde_json::from_slice::<IntrospectionResult>(data);
    let _ = serde_json::from_slice::<UserInfo>(data);
    let _ = serde_json::from_slice::<ConsentRequest>(data);
});
