//! Query-processing core: unified router, reply generation, and the
//! end-to-end pipeline gluing retrieval, quality gating, ticketing, and
//! conversation memory together.
//!
//! The pipeline is total by construction: every collaborator failure
//! degrades to a safe default (router fallback, empty context, apology
//! reply), so [`pipeline::AgentPipeline::process`] always produces a
//! customer-facing reply.

pub mod cfg;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod reply;
pub mod router;

pub use cfg::AgentConfig;
pub use llm::TextGeneration;
pub use pipeline::{AgentPipeline, IncomingQuery, ProcessedReply};
pub use router::{RouteMode, UnifiedDecision, classify};
