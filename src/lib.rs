// 食事する哲学者
// 哲学者ごとに1スレッド、隣同士の間にフォークの Mutex、
// 誰かが餓死するか全員が食べ終えたら止めるモニタスレッド

pub mod clock;
pub mod config;
pub mod error;
pub mod fork;
pub mod monitor;
pub mod philosopher;
pub mod report;
pub mod simulation;
pub mod table;

pub use config::{Config, PHILO_MAX};
pub use error::{ConfigError, SimError};
pub use report::{Action, Console, Event, Journal, Sink};
pub use simulation::{Simulation, StopHandle, Summary};
pub use table::Outcome;
