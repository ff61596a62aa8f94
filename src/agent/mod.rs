//! LLM tool selection for on-demand queries.
//!
//! The LLM is an external decision source: it receives the tool catalog
//! and a natural-language prompt and hands back a tool name plus an
//! argument payload. Execution stays in the dispatch engine.

pub mod selector;

pub use selector::{SelectorConfig, ToolInvocation, ToolSelector};
