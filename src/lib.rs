// ABOUTME: Streaming adapter library synthesizing OpenAI SSE streams from complete chat completions
// ABOUTME: Re-exports the response model, chunker, tool-call splitter, synthesizer, config, and backend
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

//! # llama-stream: Response-to-Stream Synthesis
//!
//! Some inference servers only answer chat completions in one piece, even
//! when a client asked for `stream: true` and even when the answer carries
//! tool calls. This library re-expresses such a complete response as the
//! ordered event sequence an OpenAI streaming client expects.
//!
//! ## Quick Start
//!
//! ```rust
//! use llama_stream::parse::parse_chat_response;
//! use llama_stream::synthesizer::{StreamEvent, SynthesisOptions, Synthesizer};
//!
//! # fn example() -> Result<(), llama_stream::types::ProxyError> {
//! let body = br#"{"choices":[{"message":{"role":"assistant","content":"Hello world"}}]}"#;
//! let response = parse_chat_response(body)?;
//!
//! let synthesizer = Synthesizer::new(response, SynthesisOptions::default());
//! let events: Vec<StreamEvent> = synthesizer.collect();
//! assert_eq!(events.first(), Some(&StreamEvent::Role));
//! assert_eq!(events.last(), Some(&StreamEvent::Done));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Modules
//!
//! - [`types`]: Chat-response model, finish reasons, and errors
//! - [`parse`]: Backend JSON to chat-response model
//! - [`chunker`]: Character-bounded text chunking
//! - [`tool_delta`]: Tool-call header and argument deltas
//! - [`synthesizer`]: Ordered, lazy event synthesis
//! - [`config`]: Startup configuration and validation
//! - [`backend`]: Backend trait and reqwest client

/// Core types: chat-response model, tool calls, and errors
pub mod types;

/// Backend abstraction and HTTP client
pub mod backend;
/// Character-bounded text chunking
pub mod chunker;
/// Process-wide configuration
pub mod config;
/// Backend response parsing
pub mod parse;
/// Event synthesis state machine
pub mod synthesizer;
/// Tool-call delta splitting
pub mod tool_delta;

pub use backend::{Backend, BackendRequest, BackendResponse};
#[cfg(feature = "http-backend")]
pub use backend::ReqwestBackend;
pub use config::{ProxyConfig, TlsVerification};
pub use synthesizer::{StreamEvent, SynthesisOptions, Synthesizer};
pub use types::{ChatResponse, ErrorKind, FinishReason, ProxyError, ToolCall};
