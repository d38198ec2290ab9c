use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    clock::Poller,
    report::Reporter,
    table::{Outcome, Table},
};

// 全員の最終食事時刻と食事回数を監視するスレッド
pub struct Monitor {
    table: Arc<Table>,
    reporter: Arc<Reporter>,
}

impl Monitor {
    pub fn new(table: Arc<Table>, reporter: Arc<Reporter>) -> Self {
        Monitor { table, reporter }
    }

    pub fn run(&self) {
        let poller = Poller::new(
            self.table.termination(),
            self.table.config().poll_interval(),
        );
        loop {
            if self.check() || !poller.tick() {
                break;
            }
        }
        debug!(outcome = ?self.table.outcome(), "monitor exits");
    }

    // 1回分の観察。終了していれば true
    // 規定回数に達した哲学者は餓死判定から外れるので、全員が達していれば
    // 餓死は起こりえない。餓死と完了が同じ回で両方成り立つことはなく、
    // 餓死を先に見る順番は念のためのもの
    pub fn check(&self) -> bool {
        if self.table.is_stopped() {
            return true;
        }

        let config = self.table.config();
        let quota = config.must_eat();
        let meals = self.table.meals();

        for id in 1..=config.philosophers() {
            // 規定回数食べ終えた哲学者はもう席を立っている
            if quota.is_some_and(|q| meals[id - 1] >= q) {
                continue;
            }

            let seat = self.table.meal_clock(id);
            let now = self.table.now_ms();
            if !seat.eating && now.saturating_sub(seat.last_meal_ms) >= config.time_to_die() {
                if self.reporter.death(&self.table, id) {
                    info!(philosopher = id, at_ms = now, "starved");
                }
                return true;
            }
        }

        if let Some(quota) = quota {
            if meals.iter().all(|&m| m >= quota) {
                if self.table.stop(Outcome::Satisfied) {
                    info!(quota, "every philosopher has eaten enough");
                }
                return true;
            }
        }

        false
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        config::Config,
        report::{Action, Journal},
    };
    use std::{thread, time::Duration};

    fn monitor(config: Config) -> (Monitor, Arc<Table>, Journal) {
        let table = Arc::new(Table::new(config));
        let journal = Journal::new();
        let reporter = Arc::new(Reporter::new(journal.clone()));
        (Monitor::new(table.clone(), reporter), table, journal)
    }

    #[test]
    fn test_detects_starvation() {
        let config = Config::new(2, 30, 10, 10, None).unwrap();
        let (m, table, journal) = monitor(config);

        m.run();

        let events = journal.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, Action::Died);
        assert_eq!(events[0].philosopher, 1);
        // 検出の遅れはポーリング間隔程度に収まる
        assert!(events[0].at_ms >= 30);
        assert!(events[0].at_ms < 30 + 50);
        assert!(matches!(
            table.outcome(),
            Some(Outcome::Starved { philosopher: 1, .. })
        ));
    }

    #[test]
    fn test_eating_philosopher_is_not_starving() {
        let config = Config::new(2, 20, 10, 10, None).unwrap();
        let (m, table, journal) = monitor(config);
        table.begin_meal(1);
        table.begin_meal(2);

        thread::sleep(Duration::from_millis(40));
        assert!(!m.check());
        assert!(journal.events().is_empty());

        // 食べ終わった瞬間に、最後の食事開始から time_to_die 過ぎていれば死亡
        table.end_meal(2);
        assert!(m.check());
        assert!(matches!(
            table.outcome(),
            Some(Outcome::Starved { philosopher: 2, .. })
        ));
    }

    #[test]
    fn test_completion_without_death_line() {
        let config = Config::new(3, 1_000, 10, 10, Some(2)).unwrap();
        let (m, table, journal) = monitor(config);
        for id in 1..=3 {
            table.add_meal(id);
            table.add_meal(id);
        }

        m.run();

        assert_eq!(table.outcome(), Some(Outcome::Satisfied));
        assert!(journal.events().is_empty());
    }

    #[test]
    fn test_not_complete_until_everyone_ate() {
        let config = Config::new(3, 1_000, 10, 10, Some(2)).unwrap();
        let (m, table, _journal) = monitor(config);
        table.add_meal(1);
        table.add_meal(1);
        table.add_meal(2);
        table.add_meal(2);
        table.add_meal(3);

        assert!(!m.check());
        table.add_meal(3);
        assert!(m.check());
        assert_eq!(table.outcome(), Some(Outcome::Satisfied));
    }

    // 食べ終えて席を立った哲学者は餓死扱いしない
    #[test]
    fn test_satisfied_philosopher_is_skipped() {
        let config = Config::new(2, 20, 10, 10, Some(1)).unwrap();
        let (m, table, journal) = monitor(config);
        table.add_meal(1);

        thread::sleep(Duration::from_millis(30));
        assert!(m.check());
        assert_eq!(journal.count(Action::Died), 1);
        assert!(matches!(
            table.outcome(),
            Some(Outcome::Starved { philosopher: 2, .. })
        ));
    }

    // 全員が規定回数に達していれば、どれだけ時間が経っていても完了になる
    #[test]
    fn test_satisfied_table_never_starves() {
        let config = Config::new(3, 20, 10, 10, Some(1)).unwrap();
        let (m, table, journal) = monitor(config);
        for id in 1..=3 {
            table.add_meal(id);
        }

        thread::sleep(Duration::from_millis(40));
        assert!(m.check());
        assert_eq!(table.outcome(), Some(Outcome::Satisfied));
        assert_eq!(journal.count(Action::Died), 0);
        assert!(journal.events().is_empty());
    }

    #[test]
    fn test_exits_on_external_stop() {
        let config = Config::new(2, 10_000, 10, 10, None).unwrap();
        let (m, table, journal) = monitor(config);

        let table0 = table.clone();
        let t = thread::spawn(move || m.run());
        thread::sleep(Duration::from_millis(20));
        assert!(table0.stop(Outcome::Interrupted));
        t.join().unwrap();

        assert_eq!(table.outcome(), Some(Outcome::Interrupted));
        assert!(journal.events().is_empty());
    }
}
