use std::sync::Arc;

use tracing::debug;

use crate::{
    clock::{Poller, Wait},
    fork::{ForkPair, ForkSet},
    report::{Action, Reporter},
    table::{Table, Termination},
};

// 哲学者の状態。Eating の間だけフォークのガードを持っている
enum State<'a> {
    Thinking { first: bool },
    AcquiringForks,
    Eating(ForkPair<'a>),
    Sleeping,
    Stopped,
}

pub struct Philosopher {
    id: usize, // 1 始まり
    table: Arc<Table>,
    forks: Arc<ForkSet>,
    reporter: Arc<Reporter>,
}

impl Philosopher {
    pub fn new(id: usize, table: Arc<Table>, forks: Arc<ForkSet>, reporter: Arc<Reporter>) -> Self {
        Philosopher {
            id,
            table,
            forks,
            reporter,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    fn poller(&self) -> Poller<'_, Termination> {
        Poller::new(self.table.termination(), self.table.config().poll_interval())
    }

    pub fn run(&self) {
        debug!(philosopher = self.id, "sits down");
        if self.forks.len() == 1 {
            self.alone();
        } else {
            self.dine();
        }
        debug!(philosopher = self.id, "leaves the table");
    }

    // フォークが一本しかないので絶対に食べられない
    // 一本取って time_to_die だけ待ち、死亡を報告する
    fn alone(&self) {
        let (left, _) = self.forks.seat(self.id);
        let _fork = self.forks.pick_up_one(left);
        self.reporter.status(&self.table, self.id, Action::TakenFork);

        let time_to_die = self.table.config().time_to_die();
        if self.poller().wait(time_to_die) == Wait::Elapsed {
            // モニタが先に報告していればここでは何も出ない
            self.reporter.death(&self.table, self.id);
        }
    }

    fn dine(&self) {
        let mut state = State::Thinking { first: true };
        loop {
            state = match state {
                State::Thinking { first } => self.think(first),
                State::AcquiringForks => self.take_forks(),
                State::Eating(forks) => self.eat(forks),
                State::Sleeping => self.sleep(),
                State::Stopped => return,
            };
        }
    }

    fn think(&self, first: bool) -> State<'_> {
        if !self.reporter.status(&self.table, self.id, Action::Thinking) {
            return State::Stopped;
        }
        // 偶数番は最初に少し待って、最初の取り合いをずらす
        if first && self.id % 2 == 0 {
            let delay = self.table.config().time_to_eat() / 2;
            if self.poller().wait(delay) == Wait::Stopped {
                return State::Stopped;
            }
        }
        State::AcquiringForks
    }

    fn take_forks(&self) -> State<'_> {
        if self.table.is_stopped() {
            return State::Stopped;
        }

        // 隣がもっと飢えていれば、その隣が食べ始めるまで手を出さない
        // フォークの取り合いで同じ哲学者が負け続けるのを防ぐ
        self.table.set_hungry(self.id);
        let poller = self.poller();
        while self.table.should_yield(self.id) {
            if !poller.tick() {
                return State::Stopped;
            }
        }

        let (left, right) = self.forks.seat(self.id);
        let pair = self.forks.pick_up(left, right, |_| {
            self.reporter.status(&self.table, self.id, Action::TakenFork);
        });

        // 待っている間に終了していたら、食べずに置いて帰る
        if self.table.is_stopped() {
            return State::Stopped;
        }
        State::Eating(pair)
    }

    fn eat(&self, forks: ForkPair<'_>) -> State<'_> {
        // 時刻の記録と食事中フラグを先に立ててから報告する
        self.table.begin_meal(self.id);
        self.reporter.status(&self.table, self.id, Action::Eating);

        let wait = self.poller().wait(self.table.config().time_to_eat());
        if wait == Wait::Stopped {
            self.table.end_meal(self.id);
            drop(forks);
            return State::Stopped;
        }

        let meals = self.table.add_meal(self.id);
        self.table.end_meal(self.id);
        drop(forks);

        match self.table.config().must_eat() {
            Some(quota) if meals >= quota => {
                debug!(philosopher = self.id, meals, "had enough");
                State::Stopped
            }
            _ => State::Sleeping,
        }
    }

    fn sleep(&self) -> State<'_> {
        if !self.reporter.status(&self.table, self.id, Action::Sleeping) {
            return State::Stopped;
        }
        match self.poller().wait(self.table.config().time_to_sleep()) {
            Wait::Elapsed => State::Thinking { first: false },
            Wait::Stopped => State::Stopped,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        config::Config,
        report::Journal,
        table::Outcome,
    };
    use std::{thread, time::Duration};

    fn seat(config: Config, id: usize) -> (Philosopher, Arc<Table>, Arc<ForkSet>, Journal) {
        let table = Arc::new(Table::new(config));
        let forks = Arc::new(ForkSet::new(config.philosophers()));
        let journal = Journal::new();
        let reporter = Arc::new(Reporter::new(journal.clone()));
        let p = Philosopher::new(id, table.clone(), forks.clone(), reporter);
        (p, table, forks, journal)
    }

    #[test]
    fn test_alone_dies_without_eating() {
        let config = Config::new(1, 50, 10, 10, None).unwrap();
        let (p, table, forks, journal) = seat(config, 1);

        p.run();

        let actions: Vec<_> = journal.events().iter().map(|e| e.action).collect();
        assert_eq!(actions, vec![Action::TakenFork, Action::Died]);
        assert!(journal.events()[1].at_ms >= 50);
        assert_eq!(table.meals(), vec![0]);
        assert!(matches!(
            table.outcome(),
            Some(Outcome::Starved { philosopher: 1, .. })
        ));
        assert!(forks.all_free());
    }

    // 隣がいない状態で一人だけ回すと、ちょうど must_eat 回食べて帰る
    #[test]
    fn test_stops_at_quota() {
        let config = Config::new(2, 1_000, 10, 10, Some(3)).unwrap();
        let (p, table, forks, journal) = seat(config, 1);

        p.run();

        assert_eq!(table.meals(), vec![3, 0]);
        assert_eq!(journal.count(Action::Eating), 3);
        assert_eq!(journal.count(Action::TakenFork), 6);
        assert_eq!(journal.count(Action::Sleeping), 2);
        assert!(!table.meal_clock(1).eating);
        assert!(forks.all_free());
        // 終了フラグを立てるのはモニタの仕事
        assert!(!table.is_stopped());
    }

    #[test]
    fn test_cycle_order() {
        let config = Config::new(2, 1_000, 10, 10, Some(2)).unwrap();
        let (p, _table, _forks, journal) = seat(config, 1);

        p.run();

        let actions: Vec<_> = journal.events().iter().map(|e| e.action).collect();
        assert_eq!(
            actions,
            vec![
                Action::Thinking,
                Action::TakenFork,
                Action::TakenFork,
                Action::Eating,
                Action::Sleeping,
                Action::Thinking,
                Action::TakenFork,
                Action::TakenFork,
                Action::Eating,
            ]
        );
    }

    // 長く食べていない隣が待っている間はフォークに触らない
    #[test]
    fn test_waits_for_hungrier_neighbor() {
        let config = Config::new(3, 10_000, 10, 10, Some(1)).unwrap();
        let (p, table, forks, journal) = seat(config, 2);

        // 1 は食べずに待ち続けている
        table.set_hungry(1);
        let t = thread::spawn(move || p.run());
        thread::sleep(Duration::from_millis(50));
        assert_eq!(journal.count(Action::TakenFork), 0);
        assert!(table.meal_clock(2).hungry_since.is_some());
        assert!(forks.all_free());

        // 1 が食べ始めたら 2 の番
        table.begin_meal(1);
        t.join().unwrap();
        assert_eq!(table.meals(), vec![0, 1, 0]);
        assert_eq!(journal.count(Action::Eating), 1);
        assert!(forks.all_free());
    }

    // 食事中に終了しても、フォークは必ず置いてから抜ける
    #[test]
    fn test_releases_forks_when_stopped_mid_meal() {
        let config = Config::new(3, 10_000, 5_000, 10, None).unwrap();
        let (p, table, forks, journal) = seat(config, 1);

        let t = thread::spawn(move || p.run());
        while journal.count(Action::Eating) == 0 {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(table.meal_clock(1).eating);
        assert!(!forks.is_free(0));
        assert!(!forks.is_free(1));

        table.stop(Outcome::Interrupted);
        t.join().unwrap();

        assert!(forks.all_free());
        assert!(!table.meal_clock(1).eating);
        assert_eq!(table.meals(), vec![0, 0, 0]);
    }
}
