//! These models represent the objects passed around during a chat turn
//!
//! There are several different related formats we need to interact with:
//! - openai messages/tools, sent from the orchestrator to an OpenAI compatible endpoint
//! - ollama messages/tools, sent from the orchestrator to a local ollama server
//! - tool invocations, sent from the dispatcher to whatever executes the tools
//! - transcript lines, written to disk after every turn
//!
//! These all overlap to varying degrees. We always immediately convert those data models
//! into the internal structs using to/from helpers. Because of the need for compatibility,
//! the internal models are not an exact match to any of these formats.
pub mod message;
pub mod tool;
