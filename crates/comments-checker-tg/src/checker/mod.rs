//! Channel checking pipeline. Nothing in this module talks to Telegram
//! directly, the messaging and the channel lookups are abstracted away
//! behind [`ChannelDirectory`] and [`ProgressSink`] traits.

mod classifier;
mod extract;
mod governor;
mod progress;
mod registry;
mod remaining;
mod runner;
mod username;
mod verdict;

#[cfg(test)]
mod testing;

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

pub(crate) use classifier::*;
pub(crate) use extract::*;
pub(crate) use progress::*;
pub(crate) use registry::*;
pub(crate) use remaining::*;
pub(crate) use runner::*;
pub(crate) use username::*;
pub(crate) use verdict::*;

#[derive(Deserialize, Clone, Debug)]
pub(crate) struct Config {
    /// Max number of channels checked in a single run. The rest of the
    /// channels is deferred to the list of unchecked channels.
    #[serde(default = "default_max_batch_size")]
    pub(crate) max_batch_size: usize,

    /// Listings longer than this are sent as a file instead of a message
    #[serde(default = "default_export_threshold")]
    pub(crate) export_threshold: usize,

    /// Directory where the lists of unchecked channels are stored
    #[serde(default = "default_data_dir")]
    pub(crate) data_dir: PathBuf,

    #[serde(default = "default_lookup_timeout_secs")]
    lookup_timeout_secs: u64,
}

impl Config {
    pub(crate) fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }
}

fn default_max_batch_size() -> usize {
    200
}

fn default_export_threshold() -> usize {
    50
}

fn default_data_dir() -> PathBuf {
    "data".into()
}

fn default_lookup_timeout_secs() -> u64 {
    60
}
