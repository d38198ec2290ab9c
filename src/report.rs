use std::{
    fmt,
    io::Write,
    sync::{Arc, Mutex},
};

use tracing::warn;

use crate::table::{lock, Outcome, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    TakenFork,
    Eating,
    Sleeping,
    Thinking,
    Died,
}

impl Action {
    pub fn text(self) -> &'static str {
        match self {
            Action::TakenFork => "has taken a fork",
            Action::Eating => "is eating",
            Action::Sleeping => "is sleeping",
            Action::Thinking => "is thinking",
            Action::Died => "died",
        }
    }

    fn color(self) -> &'static str {
        match self {
            Action::TakenFork => "\x1b[0;33m",
            Action::Eating => "\x1b[0;32m",
            Action::Sleeping => "\x1b[0;34m",
            Action::Thinking => "\x1b[0;36m",
            Action::Died => "\x1b[0;31m",
        }
    }
}

const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub at_ms: u64,
    pub philosopher: usize,
    pub action: Action,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.at_ms, self.philosopher, self.action.text())
    }
}

// イベントの出力先。出力ロックを握った状態で呼ばれる
pub trait Sink: Send {
    fn emit(&mut self, event: &Event);
}

// 標準出力などの Write に一行ずつ書き出す
pub struct Console<W> {
    out: W,
    color: bool,
}

impl<W: Write + Send> Console<W> {
    pub fn new(out: W, color: bool) -> Self {
        Console { out, color }
    }
}

impl<W: Write + Send> Sink for Console<W> {
    fn emit(&mut self, event: &Event) {
        let result = if self.color {
            writeln!(self.out, "{}{}{}", event.action.color(), event, RESET)
        } else {
            writeln!(self.out, "{}", event)
        };
        if let Err(err) = result.and_then(|_| self.out.flush()) {
            warn!(error = %err, "failed to write event");
        }
    }
}

// メモリ上に溜める出力先。clone しても同じログを共有する
#[derive(Debug, Clone, Default)]
pub struct Journal {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Journal {
    pub fn new() -> Self {
        Journal::default()
    }

    pub fn events(&self) -> Vec<Event> {
        lock(&self.events).clone()
    }

    pub fn of(&self, philosopher: usize) -> Vec<Event> {
        lock(&self.events)
            .iter()
            .filter(|e| e.philosopher == philosopher)
            .copied()
            .collect()
    }

    pub fn count(&self, action: Action) -> usize {
        lock(&self.events)
            .iter()
            .filter(|e| e.action == action)
            .count()
    }
}

impl Sink for Journal {
    fn emit(&mut self, event: &Event) {
        lock(&self.events).push(*event);
    }
}

// 出力は全スレッドでこのロック一つを共有する
pub struct Reporter {
    sink: Mutex<Box<dyn Sink>>,
}

impl Reporter {
    pub fn new(sink: impl Sink + 'static) -> Self {
        Reporter {
            sink: Mutex::new(Box::new(sink)),
        }
    }

    // 終了後は出さずに false を返す
    pub fn status(&self, table: &Table, philosopher: usize, action: Action) -> bool {
        debug_assert_ne!(action, Action::Died);
        let mut sink = lock(&self.sink);
        if table.is_stopped() {
            return false;
        }
        sink.emit(&Event {
            at_ms: table.now_ms(),
            philosopher,
            action,
        });
        true
    }

    // 出力ロックの中で終了フラグを立てるので、死亡は必ず最後の一行になる
    // 出力するのはフラグを立てた呼び出しだけ
    pub fn death(&self, table: &Table, philosopher: usize) -> bool {
        let mut sink = lock(&self.sink);
        let at_ms = table.now_ms();
        if !table.stop(Outcome::Starved { philosopher, at_ms }) {
            return false;
        }
        sink.emit(&Event {
            at_ms,
            philosopher,
            action: Action::Died,
        });
        true
    }
}
