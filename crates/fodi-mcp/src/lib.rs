// ABOUTME: Library root re-exporting MCP server modules for the binary and integration tests
// ABOUTME: Tool dispatcher, JSON-RPC protocol types, SSE connection registry, and transports
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

pub mod events;
pub mod protocol;
pub mod server;
pub mod state;
pub mod tools;
pub mod transport;
