//! Request handlers.

pub mod chat;
pub mod download;
pub mod finalize;
pub mod health;
pub mod status;
pub mod upload;

pub use chat::*;
pub use download::*;
pub use finalize::*;
pub use health::*;
pub use status::*;
pub use upload::*;
