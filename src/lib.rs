//! Passive ARP watcher: reports every hardware address seen on the local
//! network for the first time and remembers it in an append-only store.

pub mod address;
pub mod capture;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod privileges;
pub mod shutdown;
pub mod sink;
pub mod store;
pub mod worker;

pub use error::{Error, Result};
