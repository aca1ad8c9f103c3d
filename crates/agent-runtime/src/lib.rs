//! Routing runtime for agent-rs
//!
//! This crate provides the pieces that decide where and whether an agent
//! call may run: the [`Router`] that maps a task onto a catalog model, the
//! [`BudgetTracker`] that meters spend against a session cap, and the
//! [`RetryPolicy`] used for transient provider failures.

pub mod budget;
pub mod retry;
pub mod router;

pub use budget::{BudgetConfig, BudgetStatus, BudgetTracker, Reservation};
pub use retry::RetryPolicy;
pub use router::{REFERENCE_USAGE, RouteRequest, Router, RouterConfig, RouterConfigBuilder};
