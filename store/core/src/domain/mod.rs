// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Mod
//!
//! Pure domain types: node topology, configuration, extension classes,
//! namespace translation and the command grammar.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Implements mod

pub mod command;
pub mod extension;
pub mod namespace;
pub mod node;
pub mod node_config;
pub mod path_sanitizer;
pub mod storage;
