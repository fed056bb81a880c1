//! # Klipper Docs
//!
//! Full-text search, section browsing and config-option lookup over the
//! Klipper firmware's markdown documentation.
//!
//! The ranking, snippet and extraction logic lives in the
//! `klipper-docs-core` crate. This crate adds everything around it:
//! reading docs from disk or a git checkout, configuration, the `kdocs`
//! CLI, and the HTTP and MCP tool servers.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────────┐
//! │ docs dir /  │──▶│   parser    │──▶│  DocsEngine  │
//! │ git checkout│   │ frontmatter │   │ index+search │
//! └─────────────┘   └─────────────┘   └──────┬───────┘
//!                                            │
//!                     ┌──────────────────────┼───────────┐
//!                     ▼                      ▼           ▼
//!                ┌──────────┐          ┌──────────┐ ┌─────────┐
//!                │   CLI    │          │   HTTP   │ │   MCP   │
//!                │  (kdocs) │          │  tools   │ │  stdio  │
//!                └──────────┘          └──────────┘ └─────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! kdocs search "pressure advance"
//! kdocs lookup bed_mesh
//! kdocs sync                    # clone or update the repository
//! kdocs serve http              # JSON tool server
//! kdocs serve mcp               # MCP over stdio
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`parser`] | Markdown discovery and frontmatter parsing |
//! | [`sync`] | Repository clone and update |
//! | [`service`] | Shared engine and refresh logic |
//! | [`lookup`] | Config-section lookup across documents |
//! | [`traits`] | Tool trait, registry and built-in tools |
//! | [`server`] | HTTP tool server |
//! | [`mcp`] | MCP stdio bridge |

pub mod config;
pub mod get;
pub mod logging;
pub mod lookup;
pub mod mcp;
pub mod parser;
pub mod search;
pub mod server;
pub mod service;
pub mod stats;
pub mod sync;
pub mod traits;
