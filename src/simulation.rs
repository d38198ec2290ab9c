use std::{
    sync::Arc,
    thread::{self, JoinHandle},
};

use tracing::{debug, info};

use crate::{
    config::Config,
    error::SimError,
    fork::ForkSet,
    monitor::Monitor,
    philosopher::Philosopher,
    report::{Reporter, Sink},
    table::{Outcome, Table, Termination},
};

// 実行結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub outcome: Outcome,
    pub meals: Vec<u64>,
    pub elapsed_ms: u64,
    pub forks_released: bool,
}

// 外から (シグナルハンドラなど) 実行を止めるためのハンドル
#[derive(Clone)]
pub struct StopHandle {
    termination: Arc<Termination>,
}

impl StopHandle {
    pub fn interrupt(&self) -> bool {
        self.termination.stop(Outcome::Interrupted)
    }
}

// テーブルとフォークは run で作る。時刻 0 はスレッド起動の直前
pub struct Simulation {
    config: Config,
    termination: Arc<Termination>,
    reporter: Arc<Reporter>,
}

impl Simulation {
    pub fn new(config: Config, sink: impl Sink + 'static) -> Self {
        Simulation {
            config,
            termination: Arc::new(Termination::default()),
            reporter: Arc::new(Reporter::new(sink)),
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            termination: self.termination.clone(),
        }
    }

    // 哲学者ごとに1本、モニタに1本スレッドを立てて、全部終わるまで待つ
    pub fn run(self) -> Result<Summary, SimError> {
        let config = self.config;
        let table = Arc::new(Table::with_termination(config, self.termination.clone()));
        let forks = Arc::new(ForkSet::new(config.philosophers()));
        info!(
            philosophers = config.philosophers(),
            time_to_die = config.time_to_die(),
            time_to_eat = config.time_to_eat(),
            time_to_sleep = config.time_to_sleep(),
            must_eat = ?config.must_eat(),
            "dinner is served"
        );

        let mut v: Vec<(String, JoinHandle<()>)> = Vec::new();

        for id in 1..=config.philosophers() {
            let p = Philosopher::new(id, table.clone(), forks.clone(), self.reporter.clone());
            let name = format!("philo-{}", p.id());
            match spawn(name, move || p.run()) {
                Ok(t) => v.push(t),
                Err(err) => return Err(abort(&table, v, err)),
            }
        }

        let m = Monitor::new(table.clone(), self.reporter.clone());
        match spawn("monitor".to_string(), move || m.run()) {
            Ok(t) => v.push(t),
            Err(err) => return Err(abort(&table, v, err)),
        }

        // 哲学者を先に、最後にモニタを待つ
        let mut panicked = None;
        for (name, t) in v {
            if t.join().is_err() {
                // 他のスレッドが抜けられるよう止めておく
                table.stop(Outcome::Interrupted);
                panicked.get_or_insert(name);
            }
        }
        if let Some(name) = panicked {
            return Err(SimError::Panicked(name));
        }

        let summary = Summary {
            outcome: table.outcome().unwrap_or(Outcome::Interrupted),
            meals: table.meals(),
            elapsed_ms: table.now_ms(),
            forks_released: forks.all_free(),
        };
        info!(outcome = ?summary.outcome, meals = ?summary.meals, "dinner is over");
        Ok(summary)
    }
}

// スレッド生成に失敗したら、起動済みのものを止めて逆順に回収する
fn abort(table: &Table, v: Vec<(String, JoinHandle<()>)>, err: SimError) -> SimError {
    table.stop(Outcome::Interrupted);
    for (name, t) in v.into_iter().rev() {
        debug!(thread = %name, "joining after failed start");
        let _ = t.join();
    }
    err
}

fn spawn<F>(name: String, f: F) -> Result<(String, JoinHandle<()>), SimError>
where
    F: FnOnce() + Send + 'static,
{
    match thread::Builder::new().name(name.clone()).spawn(f) {
        Ok(t) => Ok((name, t)),
        Err(source) => Err(SimError::Spawn { name, source }),
    }
}
