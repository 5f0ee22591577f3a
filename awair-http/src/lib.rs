pub mod handlers;
pub mod server;

pub use server::{AppState, MetricsServer, ServeError, build_router};
