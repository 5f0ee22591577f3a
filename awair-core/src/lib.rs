pub mod config;
pub mod error;
pub mod reading;
pub mod shutdown;

pub use config::ExporterConfig;
pub use error::AwairError;
pub use reading::Reading;
pub use shutdown::{ShutdownSignal, ShutdownTrigger};
