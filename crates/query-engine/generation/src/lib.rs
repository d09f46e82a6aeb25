//! Generate query plans from natural-language requests with a chat-completion backend.

pub mod generation;
