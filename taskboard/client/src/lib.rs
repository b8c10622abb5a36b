//! Typed client for the taskboard REST API.
//!
//! [`TaskApi`] is the transport seam, [`HttpTaskApi`] talks to a running server
//! and [`TaskClientState`] keeps the view a task dashboard renders from.

pub mod api;
pub mod auth;
pub mod error;
pub mod model;
pub mod state;

pub use api::{HttpTaskApi, TaskApi};
pub use auth::{AuthClient, Session};
pub use error::ClientError;
pub use model::{NewTask, Task, TaskPatch, TaskStats, TaskStatus, UserProfile};
pub use state::TaskClientState;
