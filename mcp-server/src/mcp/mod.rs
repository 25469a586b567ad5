pub mod handler;
pub mod protocol;
pub mod resolve;
pub mod session_store;
pub mod tools;
