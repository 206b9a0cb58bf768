//! # VisionAid
//!
//! Backend for a camera-to-speech assistant for visually impaired users.
//!
//! A client sends a camera frame; VisionAid asks a multimodal vision model to
//! name the objects in it, read its text, or identify a banknote, and
//! returns a structured answer for the client to speak aloud. Every
//! non-trivial answer is summarized into a scan history. A single user
//! profile holds the emergency contact dialed by the SOS endpoint.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────────┐   ┌──────────────┐
//! │  Client  │──▶│   HTTP (axum)    │──▶│ Vision model │
//! │  camera  │   │ scan / profile / │   │ (chat API)   │
//! └──────────┘   │   emergency      │   └──────────────┘
//!                └────────┬─────────┘
//!                         ▼
//!                   ┌──────────┐
//!                   │  SQLite  │
//!                   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! visionaid init                          # create database, seed profile
//! visionaid serve                         # start HTTP server
//! visionaid scan text ./sign.jpg          # analyze a local file
//! visionaid history --limit 10
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite `Store` implementation |
//! | [`vision`] | Vision model backends |
//! | [`server`] | HTTP API server |
//! | [`scan_cmd`] | `visionaid scan` |
//! | [`history`] | `visionaid history` |
//! | [`logging`] | `tracing` subscriber setup |

pub mod config;
pub mod db;
pub mod history;
pub mod logging;
pub mod migrate;
pub mod scan_cmd;
pub mod server;
pub mod sqlite_store;
pub mod vision;
