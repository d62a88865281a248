//! # Issue Lens
//!
//! Caches a GitHub repository's open issues in SQLite and answers free-form
//! questions about them with an LLM, using a map-reduce pass when the issues
//! do not fit in one request.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌────────────┐   ┌──────────────┐
//! │  GitHub  │──▶│   Scan   │──▶│  SQLite  │──▶│  Analysis  │──▶│ LLM provider │
//! │  client  │   │  + prune │   │  cache   │   │ map/reduce │   │ (+ retry)    │
//! └──────────┘   └──────────┘   └────┬─────┘   └────────────┘   └──────────────┘
//!                                    │
//!                      ┌─────────────┤
//!                      ▼             ▼
//!                 ┌──────────┐  ┌──────────┐
//!                 │   CLI    │  │   HTTP   │
//!                 │  (lens)  │  │  (axum)  │
//!                 └──────────┘  └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! lens init
//! lens scan rust-lang/rust
//! OPENAI_API_KEY=sk-... lens analyze rust-lang/rust "What are the most common crash reports?"
//! lens serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`github`] | GitHub issues client |
//! | [`cache`] | Issue cache queries |
//! | [`scan`] | Fetch → cache → prune pipeline |
//! | [`llm`] | Generation providers, selection, and retry |
//! | [`plan`] | Chunk planning |
//! | [`prompt`] | Prompt templates |
//! | [`analysis`] | Map-reduce analysis engine |
//! | [`listing`] | CLI views of the cache |
//! | [`server`] | HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |

pub mod analysis;
pub mod cache;
pub mod config;
pub mod db;
pub mod github;
pub mod listing;
pub mod llm;
pub mod migrate;
pub mod models;
pub mod plan;
pub mod prompt;
pub mod scan;
pub mod server;
