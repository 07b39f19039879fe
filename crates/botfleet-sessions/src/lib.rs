pub mod manager;
pub mod types;
pub mod worker;

pub use manager::SessionManager;
pub use types::{expand_prompt_placeholders, new_session_id, LlmSession};
pub use worker::{autonomous_update_tick, perform_autonomous_update, BotRegistry, ProviderRegistry, StreamableRegistry};
