//! Hosted backend adapter: tables, object storage, auth and realtime.

pub mod auth;
pub mod client;
pub mod realtime;
pub mod row;

pub use auth::{clear_session, load_session, save_session, Session, SessionUser};
pub use client::RemoteClient;
pub use realtime::{RemoteChange, Subscription};
pub use row::{ProjectRow, RemoteRow, TaskRow};
