//! # kbchat
//!
//! Glue between a document bucket, a Bedrock knowledge base, and the agent
//! that retrieves from it.
//!
//! kbchat uploads documents to S3, starts knowledge base ingestion jobs,
//! runs multi-turn conversations with a Bedrock agent, and handles the
//! agent's own "save this file" action calls.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  kbchat    │──▶│ upload       │──▶│ S3 bucket    │
//! │  CLI/REPL  │   │ save_handler │   └──────┬───────┘
//! └─────┬──────┘   └──────┬───────┘          │ ingestion
//!       │                 ▼                  ▼
//!       │          ┌──────────────┐   ┌──────────────┐
//!       └─────────▶│ agent        │──▶│ Bedrock      │
//!                  │ context      │   │ agent + KB   │
//!                  └──────────────┘   └──────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration with environment overrides |
//! | [`models`] | Core data types |
//! | [`sanitize`] | Filename normalization for object keys |
//! | [`content_type`] | MIME type resolution |
//! | [`context`] | Conversation history folding |
//! | [`session`] | Explicit chat session |
//! | [`upload`] | Upload pipeline and bucket housekeeping |
//! | [`ingestion`] | Knowledge base sync trigger |
//! | [`agent`] | Agent invocation, discovery, and credential checks |
//! | [`save_handler`] | Action-group save handler |
//! | [`server`] | HTTP front end for the save handler |
//! | [`traits`] | Collaborator traits |
//! | [`error`] | Service error type |
//! | [`aws`] | SigV4-signed AWS implementations of the traits |
//! | [`scan`] | Local file discovery for uploads |
//! | [`progress`] | Upload progress reporting |
//! | [`format`] | Display helpers |
//! | [`commands`] | CLI command implementations |
//! | [`chat`] | Interactive chat loop |

pub mod agent;
pub mod aws;
pub mod chat;
pub mod commands;
pub mod config;
pub mod content_type;
pub mod context;
pub mod error;
pub mod format;
pub mod ingestion;
pub mod models;
pub mod progress;
pub mod sanitize;
pub mod save_handler;
pub mod scan;
pub mod server;
pub mod session;
pub mod traits;
pub mod upload;
