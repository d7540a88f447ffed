//! Client-side data layer for the Taskdeck task manager.
//!
//! This crate is the piece of a Taskdeck client that sits between the UI
//! and the REST API: it caches task and project collections, applies
//! mutations optimistically before the server confirms them, rolls them
//! back when the server rejects them, and turns every transport/API
//! failure into a uniform severity-tagged notification.
//!
//! The moving parts, leaves first:
//!
//! - [`api`] - the HTTP transport adapter, the failure classifier and the
//!   session state (bearer credential + logout de-duplication).
//! - [`notify`] - the global notification store with severity-based
//!   auto-expiry, toast observers and online/offline tracking.
//! - [`store`] - the entity cache and mutation synchronizer.
//! - [`client`] - [`TaskdeckClient`], the composition root.
//!
//! ```ignore
//! let config = Config::from_url("https://api.taskdeck.example");
//! let client = TaskdeckClient::new(&config)?;
//!
//! client.login("dev@taskdeck.example", "hunter2").await?;
//! let projects = client.projects().load(types::ALL_PROJECTS).await?;
//! client.tasks().create(&projects[0].id, json!({ "title": "Ship it" })).await?;
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod notify;
pub mod store;
pub mod types;

pub use client::TaskdeckClient;
pub use config::Config;
