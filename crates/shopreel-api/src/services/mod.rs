//! Business logic shared by handlers.

pub mod prompts;
pub mod quota;
pub mod script;

pub use quota::{QuotaGrant, QuotaService};
pub use script::ScriptWriter;
