#![no_main]

use indian_store_mcp::models::RegistrationRequest;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(request) = serde_json::from_slice::<RegistrationRequest>(data) {
        let _ = serde_json::to_vec(&request.normalize());
    }
});
