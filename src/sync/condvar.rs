//! # 条件变量（Condvar）同步原语模块
//!
//! ## Overview
//! 本模块实现内核中的 **条件变量**：由「关抢占原子段 + 显式 FIFO 等待队列」
//! 直接构建，与一把外部提供的互斥锁配对使用。它是上层一切协调模式
//! （会合信道、配额屏障等）赖以构建的基础原语。
//!
//! 条件变量本身 **不保存条件状态**，仅维护等待队列；
//! 具体条件判断由使用者在持锁临界区内以 while 循环完成。
//!
//! ## Assumptions
//! - 关联互斥锁在构造时绑定，三个操作都要求当前任务持有它
//! - 单逻辑处理器模型，并发仅来源于定时器回调或调度点
//!
//! ## Safety
//! - 入队发生在释放互斥锁 **之前**：唤醒方按约定必须持锁，
//!   因而不可能在「释放锁、尚未登记等待」的窗口中执行，唤醒不会丢失
//!
//! ## Invariants
//! - 等待队列 FIFO；一个任务同一时刻至多出现在一个等待队列中
//! - 队列中的任务必不持有关联互斥锁
//! - 未持锁调用任何操作都是不可恢复的使用错误（断言失败）
//!
//! ## Behavior
//! - `wait`：登记等待、释放锁、阻塞；被唤醒后重新加锁再返回
//! - `signal`：唤醒最早的等待者（若有）
//! - `signal_all`：按 FIFO 顺序唤醒全部等待者，各恰好一次

use crate::sync::{Mutex, UPIntrFreeCell};
use crate::task::{block_current_and_run_next, current_task, wakeup_task, TaskControlBlock};
use std::collections::VecDeque;
use std::sync::Arc;

/// 条件变量，与构造时给定的互斥锁配对
pub struct Condvar {
    lock: Arc<dyn Mutex>,
    inner: UPIntrFreeCell<CondvarInner>,
}

struct CondvarInner {
    wait_queue: VecDeque<Arc<TaskControlBlock>>,
}

impl Condvar {
    /// 创建一个新的条件变量
    ///
    /// ## Parameters
    /// - `lock`：关联互斥锁；当前任务在调用
    ///   `wait` / `signal` / `signal_all` 时必须持有它
    pub fn new(lock: Arc<dyn Mutex>) -> Self {
        Self {
            lock,
            inner: UPIntrFreeCell::new(CondvarInner {
                wait_queue: VecDeque::new(),
            }),
        }
    }

    fn assert_lock_held(&self) {
        assert!(
            self.lock.is_held_by_current_task(),
            "condvar op without holding the associated mutex"
        );
    }

    /// 释放关联锁并睡眠，被唤醒后重新加锁返回
    ///
    /// ## Behavior
    /// 1. 当前任务入队（原子段内）
    /// 2. 释放关联互斥锁
    /// 3. 阻塞，直至 `signal` / `signal_all` 唤醒
    /// 4. 重新获取关联互斥锁
    ///
    /// ## Panics
    /// - 未持有关联锁、或在任务上下文之外调用时 panic
    pub fn wait(&self) {
        self.assert_lock_held();
        let task = current_task().unwrap();
        self.inner.exclusive_session(|inner| {
            inner.wait_queue.push_back(task);
        });
        self.lock.unlock();
        block_current_and_run_next();
        self.lock.lock();
    }

    /// 唤醒最多一个等待任务（FIFO 队首）
    ///
    /// ## Behavior
    /// - 队列为空时不执行任何操作
    pub fn signal(&self) {
        self.assert_lock_held();
        let waking = self
            .inner
            .exclusive_session(|inner| inner.wait_queue.pop_front());
        if let Some(task) = waking {
            wakeup_task(task);
        }
    }

    /// 按 FIFO 顺序唤醒全部等待任务，清空队列
    pub fn signal_all(&self) {
        self.assert_lock_held();
        loop {
            let waking = self
                .inner
                .exclusive_session(|inner| inner.wait_queue.pop_front());
            match waking {
                Some(task) => wakeup_task(task),
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::MutexBlocking;
    use crate::task::{spawn, TaskStatus};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    fn wait_until(what: &str, cond: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !cond() {
            assert!(Instant::now() < deadline, "timed out waiting for {}", what);
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn signal_on_empty_queue_is_noop() {
        let lock: Arc<dyn Mutex> = Arc::new(MutexBlocking::new());
        let condvar = Arc::new(Condvar::new(Arc::clone(&lock)));
        spawn("signaler", move || {
            lock.lock();
            condvar.signal();
            condvar.signal_all();
            lock.unlock();
        })
        .join();
    }

    #[test]
    fn producer_wakes_consumer() {
        let lock: Arc<dyn Mutex> = Arc::new(MutexBlocking::new());
        let condvar = Arc::new(Condvar::new(Arc::clone(&lock)));
        let flag = Arc::new(AtomicBool::new(false));

        let (l, c, f) = (Arc::clone(&lock), Arc::clone(&condvar), Arc::clone(&flag));
        let consumer = spawn("consumer", move || {
            l.lock();
            while !f.load(Ordering::SeqCst) {
                c.wait();
            }
            assert!(l.is_held_by_current_task());
            l.unlock();
        });

        wait_until("consumer blocked", || {
            consumer.task().status() == TaskStatus::Blocked
        });

        let (l, c, f) = (Arc::clone(&lock), Arc::clone(&condvar), Arc::clone(&flag));
        let producer = spawn("producer", move || {
            l.lock();
            f.store(true, Ordering::SeqCst);
            c.signal();
            l.unlock();
        });

        producer.join();
        consumer.join();
    }

    #[test]
    fn signal_all_wakes_every_waiter_once() {
        let lock: Arc<dyn Mutex> = Arc::new(MutexBlocking::new());
        let condvar = Arc::new(Condvar::new(Arc::clone(&lock)));
        let released = Arc::new(AtomicBool::new(false));
        let woken = Arc::new(AtomicUsize::new(0));

        let waiters: Vec<_> = (0..3)
            .map(|i| {
                let (l, c) = (Arc::clone(&lock), Arc::clone(&condvar));
                let (r, w) = (Arc::clone(&released), Arc::clone(&woken));
                spawn(&format!("waiter-{}", i), move || {
                    l.lock();
                    while !r.load(Ordering::SeqCst) {
                        c.wait();
                    }
                    w.fetch_add(1, Ordering::SeqCst);
                    l.unlock();
                })
            })
            .collect();

        for waiter in &waiters {
            let task = Arc::clone(waiter.task());
            wait_until("waiter blocked", move || task.status() == TaskStatus::Blocked);
        }

        let (l, c, r) = (Arc::clone(&lock), Arc::clone(&condvar), Arc::clone(&released));
        spawn("broadcaster", move || {
            l.lock();
            r.store(true, Ordering::SeqCst);
            c.signal_all();
            l.unlock();
        })
        .join();

        for waiter in waiters {
            waiter.join();
        }
        assert_eq!(woken.load(Ordering::SeqCst), 3);
    }

    #[test]
    #[should_panic(expected = "without holding the associated mutex")]
    fn wait_without_lock_faults() {
        let lock: Arc<dyn Mutex> = Arc::new(MutexBlocking::new());
        let condvar = Condvar::new(lock);
        condvar.wait();
    }
}
