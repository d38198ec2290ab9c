use std::sync::{Mutex, MutexGuard, TryLockError};

use crate::table::lock;

// 円卓に並んだフォーク。i 番目の哲学者 (1 始まり) の左は i-1、右は i % n
#[derive(Debug)]
pub struct ForkSet {
    forks: Vec<Mutex<()>>,
}

// 二本のフォークを握っている間のガード
// first を先に取り、drop 時は second -> first の逆順で置く
pub struct ForkPair<'a> {
    first: Option<MutexGuard<'a, ()>>,
    second: Option<MutexGuard<'a, ()>>,
}

impl Drop for ForkPair<'_> {
    fn drop(&mut self) {
        drop(self.second.take());
        drop(self.first.take());
    }
}

pub struct Fork<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl ForkSet {
    pub fn new(n: usize) -> Self {
        ForkSet {
            forks: (0..n).map(|_| Mutex::new(())).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.forks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forks.is_empty()
    }

    // 哲学者 id (1 始まり) の (左, 右) のフォーク番号
    pub fn seat(&self, id: usize) -> (usize, usize) {
        let n = self.forks.len();
        (id - 1, id % n)
    }

    // 必ず番号の小さい方から取る。逆順で待ち合う組ができないのでデッドロックしない
    // on_take は一本取るたびに呼ばれる
    pub fn pick_up(&self, a: usize, b: usize, mut on_take: impl FnMut(usize)) -> ForkPair<'_> {
        debug_assert_ne!(a, b);
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };

        let first = lock(&self.forks[lo]);
        on_take(lo);
        let second = lock(&self.forks[hi]);
        on_take(hi);

        ForkPair {
            first: Some(first),
            second: Some(second),
        }
    }

    // 哲学者が一人しかいない場合用
    pub fn pick_up_one(&self, i: usize) -> Fork<'_> {
        Fork {
            _guard: lock(&self.forks[i]),
        }
    }

    pub fn is_free(&self, i: usize) -> bool {
        match self.forks[i].try_lock() {
            Ok(_) => true,
            Err(TryLockError::Poisoned(_)) => true,
            Err(TryLockError::WouldBlock) => false,
        }
    }

    pub fn all_free(&self) -> bool {
        (0..self.forks.len()).all(|i| self.is_free(i))
    }
}
