mod retry;
mod secret;

pub use retry::RetrySettings;
pub use secret::Secret;
