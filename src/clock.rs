use std::{
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::{Duration, Instant},
};

// シミュレーション開始時刻を起点とするミリ秒時計
// 起点は生成時に一度だけ決まり、以降は読み込みのみ
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    origin: Instant,
}

impl Clock {
    pub fn start() -> Self {
        Clock {
            origin: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

// 待ちを途中で打ち切るためのフラグ
pub trait StopFlag {
    fn is_stopped(&self) -> bool;
}

impl StopFlag for AtomicBool {
    fn is_stopped(&self) -> bool {
        self.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    Elapsed,
    Stopped,
}

// 一回の sleep で寝過ごすのは最大でも granularity まで
// なので終了フラグの観測遅延も granularity で抑えられる
pub struct Poller<'a, F: StopFlag + ?Sized> {
    flag: &'a F,
    granularity: Duration,
}

impl<'a, F: StopFlag + ?Sized> Poller<'a, F> {
    pub fn new(flag: &'a F, granularity: Duration) -> Self {
        Poller { flag, granularity }
    }

    // ms ミリ秒を細切れに寝る。フラグが立ったらすぐ戻る
    pub fn wait(&self, ms: u64) -> Wait {
        let deadline = Instant::now() + Duration::from_millis(ms);
        loop {
            if self.flag.is_stopped() {
                return Wait::Stopped;
            }
            let now = Instant::now();
            if now >= deadline {
                return Wait::Elapsed;
            }
            thread::sleep(self.granularity.min(deadline - now));
        }
    }

    // モニタ用の1ティック。まだ続けてよいなら true
    pub fn tick(&self) -> bool {
        if self.flag.is_stopped() {
            return false;
        }
        thread::sleep(self.granularity);
        !self.flag.is_stopped()
    }
}
