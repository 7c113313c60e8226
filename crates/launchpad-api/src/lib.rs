pub mod access;
pub mod admin;
pub mod applications;
pub mod auth;
pub mod email;
pub mod error;
pub mod extract;
pub mod posts;
pub mod programs;
pub mod role_switch;
pub mod routes;
pub mod session;
pub mod startups;
pub mod state;
pub mod workflow;

pub use error::ApiError;
pub use routes::router;
pub use state::{ApiConfig, AppState, AppStateInner};
