//! Job lifecycle
//!
//! - **manager**: JobsManager, the single writer for tickets and jobs
//! - **storage**: redb persistence for tickets, jobs, timelines and indexes
//! - **transitions**: who may take which edge of the status graph
//! - **actor**: caller identity passed into every mutation
//!
//! # Data Flow
//!
//! ```text
//! HTTP handler → Actor → JobsManager ──► redb (one write txn per operation)
//!                              │
//!                              └──► broadcast DomainEvent ──► ETA estimator
//!                                                         └──► event logger
//! ```

pub mod actor;
pub mod manager;
pub mod storage;
pub mod transitions;

pub use actor::Actor;
pub use manager::{JobsManager, ManagerError, ManagerResult, NewOffer, NewTicket};
pub use storage::{JobStorage, StorageError, StorageStats};
