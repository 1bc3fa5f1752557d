pub mod core;
pub mod main_module;
pub mod meeting_requests;
pub mod security;

pub use crate::core::config::AppConfig;
pub use crate::core::shared::state::AppState;
pub use crate::main_module::build_router;
