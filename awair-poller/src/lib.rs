pub mod client;
pub mod poller;

pub use client::{FetchError, SensorClient};
pub use poller::Poller;

#[cfg(test)]
pub(crate) mod testutil;
