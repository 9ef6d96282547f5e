//! SignDesk HTTP server: composition root, routes and the error boundary.

pub mod app;
pub mod error;
pub mod logging;
pub mod routes;

pub use app::{AppBootstrap, AppState, bootstrap};
pub use routes::router;
