use std::{io, time::Duration};

use thiserror::Error;

// スレッドを1本も起動する前に返す設定エラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid arguments: at least one philosopher is required")]
    NoPhilosophers,

    #[error("invalid arguments: {count} philosophers exceeds the limit of {max}")]
    TooManyPhilosophers { count: usize, max: usize },

    #[error("invalid arguments: {0} must be a positive number of milliseconds")]
    ZeroDuration(&'static str),

    #[error("poll interval {interval:?} must be shorter than the shortest duration ({shortest:?})")]
    PollTooCoarse { interval: Duration, shortest: Duration },
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error("thread creation failed for {name}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("thread {0} panicked")]
    Panicked(String),
}
