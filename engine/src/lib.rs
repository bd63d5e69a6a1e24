//! Waypoint Engine
//!
//! Chat-driven map control: a language model with tool calling turns user
//! requests into map operations (navigate, zoom, geocode), and every state
//! change is broadcast to all connected viewers.
//!
//! - [`agent`] runs the tool-calling loop for one user turn
//! - [`tools`] validates and executes the map tools
//! - [`map_state`] is the single shared map state
//! - [`connections`] fans messages out to clients
//! - [`server`] exposes the WebSocket and HTTP endpoints

pub mod agent;
pub mod cli;
pub mod config;
pub mod connections;
pub mod geocoding;
pub mod handlers;
pub mod llm;
pub mod map_state;
pub mod retry;
pub mod server;
pub mod telemetry;
pub mod tools;
