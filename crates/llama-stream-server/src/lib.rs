// ABOUTME: Library root re-exporting server modules for integration testing
// ABOUTME: Enables tests/ to access router, state, wire types, and handler modules
//
// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 dravr.ai

pub mod completions;
pub mod error;
pub mod openai_types;
pub mod passthrough;
pub mod router;
pub mod state;
pub mod streaming;
