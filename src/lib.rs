//! taskdeck - local-first project and task board
//!
//! This library provides the core functionality for the taskdeck CLI:
//! projects and tasks persisted as JSON documents, a kanban board with
//! calendar, timeline and dashboard views, outbound notifications and
//! optional sync to a hosted backend.
//!
//! # Core Concepts
//!
//! - **Board**: the in-memory task and project lists; every mutation
//!   commits locally first and returns effects to run afterwards
//! - **Effects**: remote upserts and status-change notifications,
//!   dispatched fire-and-forget and drained before exit
//! - **Reconciliation**: records are merged by id, whether they come from
//!   a local edit, a pull or the realtime feed
//! - **Migration**: stored data is upgraded once per schema version
//!
//! # Module Organization
//!
//! - `board`: application state and its operations
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `.taskdeck.toml`
//! - `error`: Error types and result aliases
//! - `export`: CSV export and JSON backups
//! - `migrate`: Stored schema upgrades
//! - `model`: Tasks, projects, comments and attachments
//! - `notify`: Notification delivery
//! - `reconcile`: Upsert-by-id and change folding
//! - `remote`: Hosted backend tables, storage, auth and realtime feed
//! - `server`: Reference notification endpoint
//! - `storage`: JSON document store
//! - `lock`: File locking and atomic writes
//! - `sync`: Effect dispatch
//! - `views`: Kanban, calendar, timeline and dashboard

pub mod author;
pub mod board;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod lock;
pub mod migrate;
pub mod model;
pub mod notify;
pub mod output;
pub mod reconcile;
pub mod remote;
pub mod server;
pub mod storage;
pub mod sync;
pub mod views;

pub use error::{Error, Result};
