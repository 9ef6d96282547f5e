pub mod bootstrap;
pub mod state;

pub use bootstrap::{AppBootstrap, bootstrap};
pub use state::AppState;
