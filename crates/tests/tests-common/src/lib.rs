//! Common functionality used across integration tests: in-process stand-ins for the OData
//! service and the chat-completion backend, and the fixtures they serve.

pub mod fixtures;
pub mod mock;

/// Route test logging to the test harness. Safe to call from every test.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
