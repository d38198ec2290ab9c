use std::time::Duration;

use crate::error::ConfigError;

// 哲学者の最大数
pub const PHILO_MAX: usize = 200;

// 終了フラグを確認する間隔のデフォルト値
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_micros(500);

// 検証済みのパラメータ。時間はすべてミリ秒
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    philosophers: usize,
    time_to_die: u64,
    time_to_eat: u64,
    time_to_sleep: u64,
    must_eat: Option<u64>,
    poll_interval: Duration,
}

impl Config {
    pub fn new(
        philosophers: usize,
        time_to_die: u64,
        time_to_eat: u64,
        time_to_sleep: u64,
        must_eat: Option<u64>,
    ) -> Result<Self, ConfigError> {
        if philosophers == 0 {
            return Err(ConfigError::NoPhilosophers);
        }
        if philosophers > PHILO_MAX {
            return Err(ConfigError::TooManyPhilosophers {
                count: philosophers,
                max: PHILO_MAX,
            });
        }

        for (name, ms) in [
            ("time_to_die", time_to_die),
            ("time_to_eat", time_to_eat),
            ("time_to_sleep", time_to_sleep),
        ] {
            if ms == 0 {
                return Err(ConfigError::ZeroDuration(name));
            }
        }

        let config = Config {
            philosophers,
            time_to_die,
            time_to_eat,
            time_to_sleep,
            must_eat,
            poll_interval: DEFAULT_POLL_INTERVAL,
        };
        config.check_poll_interval()?;
        Ok(config)
    }

    // ポーリング間隔はどの時間よりも短くないといけない
    // でないと餓死の検出が遅れる
    pub fn with_poll_interval(mut self, interval: Duration) -> Result<Self, ConfigError> {
        self.poll_interval = interval;
        self.check_poll_interval()?;
        Ok(self)
    }

    fn check_poll_interval(&self) -> Result<(), ConfigError> {
        let shortest = Duration::from_millis(
            self.time_to_die
                .min(self.time_to_eat)
                .min(self.time_to_sleep),
        );
        if self.poll_interval.is_zero() || self.poll_interval >= shortest {
            return Err(ConfigError::PollTooCoarse {
                interval: self.poll_interval,
                shortest,
            });
        }
        Ok(())
    }

    pub fn philosophers(&self) -> usize {
        self.philosophers
    }

    pub fn time_to_die(&self) -> u64 {
        self.time_to_die
    }

    pub fn time_to_eat(&self) -> u64 {
        self.time_to_eat
    }

    pub fn time_to_sleep(&self) -> u64 {
        self.time_to_sleep
    }

    pub fn must_eat(&self) -> Option<u64> {
        self.must_eat
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}
