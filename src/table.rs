use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    clock::{Clock, StopFlag},
    config::Config,
};

// 終了理由。終了フラグと一緒に記録する
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Starved { philosopher: usize, at_ms: u64 },
    Satisfied,
    Interrupted,
}

// 終了フラグ
// None -> Some への遷移は一度だけ。一度立ったら戻らない
#[derive(Debug, Default)]
pub struct Termination {
    outcome: Mutex<Option<Outcome>>,
}

impl Termination {
    // フラグを立てる。最初の呼び出しだけが勝ち、勝ったかどうかを返す
    pub fn stop(&self, outcome: Outcome) -> bool {
        let mut current = lock(&self.outcome);
        if current.is_some() {
            return false;
        }
        *current = Some(outcome);
        true
    }

    pub fn outcome(&self) -> Option<Outcome> {
        *lock(&self.outcome)
    }
}

impl StopFlag for Termination {
    fn is_stopped(&self) -> bool {
        lock(&self.outcome).is_some()
    }
}

// 最後に食べ始めた時刻と食事中フラグ
// 必ず同じロックの下でまとめて読み書きする
// hungry_since はフォーク待ちに入った時刻。食べ始めたら None に戻る
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MealClock {
    pub last_meal_ms: u64,
    pub eating: bool,
    pub hungry_since: Option<u64>,
}

// 哲学者とモニタが共有するもの。フィールドは外に出さず、
// スレッド間の読み書きは下のメソッド経由だけにする
#[derive(Debug)]
pub struct Table {
    config: Config,
    clock: Clock,
    termination: Arc<Termination>,
    // 哲学者ごとのロック
    seats: Vec<Mutex<MealClock>>,
    // 食事回数は全員分で一つのロック
    meals: Mutex<Vec<u64>>,
}

impl Table {
    pub fn new(config: Config) -> Self {
        Table::with_termination(config, Arc::new(Termination::default()))
    }

    // 時計の起点はここで決まる。スレッドを起動する直前に作ること
    pub fn with_termination(config: Config, termination: Arc<Termination>) -> Self {
        let n = config.philosophers();
        Table {
            config,
            clock: Clock::start(),
            termination,
            seats: (0..n).map(|_| Mutex::new(MealClock::default())).collect(),
            meals: Mutex::new(vec![0; n]),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn termination(&self) -> &Termination {
        &self.termination
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.elapsed_ms()
    }

    pub fn is_stopped(&self) -> bool {
        self.termination.is_stopped()
    }

    pub fn stop(&self, outcome: Outcome) -> bool {
        self.termination.stop(outcome)
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.termination.outcome()
    }

    // id は 1 始まり
    fn seat(&self, id: usize) -> &Mutex<MealClock> {
        &self.seats[id - 1]
    }

    // 席のロックの下で、最終食事時刻の更新と食事中フラグをまとめて行う
    pub fn begin_meal(&self, id: usize) -> u64 {
        let mut seat = lock(self.seat(id));
        let now = self.clock.elapsed_ms();
        seat.last_meal_ms = now;
        seat.eating = true;
        seat.hungry_since = None;
        now
    }

    pub fn set_hungry(&self, id: usize) {
        let mut seat = lock(self.seat(id));
        seat.hungry_since = Some(self.clock.elapsed_ms());
    }

    // 隣に自分より先に譲るべき空腹の哲学者がいるか
    // 最後の食事が古い方、同じなら先に待ち始めた方、それも同じなら番号の小さい方が先
    // 全順序なので、譲り合いが輪になって止まることはない
    pub fn should_yield(&self, id: usize) -> bool {
        let me = self.meal_clock(id);
        let Some(since) = me.hungry_since else {
            return false;
        };
        let key = (me.last_meal_ms, since, id);
        let n = self.seats.len();
        [(id + n - 2) % n + 1, id % n + 1]
            .into_iter()
            .filter(|&other| other != id)
            .any(|other| {
                let seat = self.meal_clock(other);
                seat.hungry_since
                    .is_some_and(|s| (seat.last_meal_ms, s, other) < key)
            })
    }

    pub fn end_meal(&self, id: usize) {
        lock(self.seat(id)).eating = false;
    }

    pub fn meal_clock(&self, id: usize) -> MealClock {
        *lock(self.seat(id))
    }

    pub fn add_meal(&self, id: usize) -> u64 {
        let mut meals = lock(&self.meals);
        meals[id - 1] += 1;
        meals[id - 1]
    }

    pub fn meals(&self) -> Vec<u64> {
        lock(&self.meals).clone()
    }
}

// ロック中のスレッドが panic してもデータ自体は壊れないので、そのまま使う
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
