//! # Core Application Logic
//!
//! This module contains roomtalk's business logic.
//! It knows nothing about any specific UI technology.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │         CORE            │
//!                    │  (this module)          │
//!                    │                         │
//!                    │  • State (app data)     │
//!                    │  • Action (events)      │
//!                    │  • update() (reducer)   │
//!                    │                         │
//!                    │  No I/O. No UI. Pure.   │
//!                    └───────────┬─────────────┘
//!                                │
//!            ┌───────────────────┼───────────────────┐
//!            ▼                   ▼                   ▼
//!     ┌────────────┐      ┌────────────┐      ┌────────────┐
//!     │    TUI     │      │  channel   │      │    api     │
//!     │  Adapter   │      │   task     │      │  (REST)    │
//!     │ (ratatui)  │      │ (WebSocket)│      │            │
//!     └────────────┘      └────────────┘      └────────────┘
//! ```
//!
//! Effects returned by `update()` name the I/O to perform; the TUI adapter
//! runs them against the channel task and the REST client.
//!
//! ## Modules
//!
//! - [`state`]: The `App` struct holding all application state
//! - [`action`]: The `Action` enum and the `update()` reducer
//! - [`compose`]: Chat input to wire text (`/ask` shortcuts)
//! - [`config`]: Config file, env and CLI resolution
//! - [`session`]: Username + tokens, persisted between runs

pub mod action;
pub mod compose;
pub mod config;
pub mod session;
pub mod state;
