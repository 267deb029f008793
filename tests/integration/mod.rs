//! Integration Tests Module
//!
//! End-to-end tests for the MEKA client against a scripted WebSocket backend
//! on a loopback port. No external services are contacted.

// Scripted loopback server and frame builders
mod support;

// Session channel over a real WebSocket connection
mod session_channel_test;

// Controller lifecycle, history refresh and deletion
mod controller_test;
