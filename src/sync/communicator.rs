//! # 会合信道（Communicator）模块
//!
//! ## Overview
//! 本模块实现一对一的同步消息会合：每次交换由 **恰好一个** `speak`
//! 与 **恰好一个** `listen` 配对完成，32 位消息只送达该次配对的
//! 倾听者。多个任务可以同时等着说、也可以同时等着听，
//! 但说者与听者从不同时空等：一旦双方就绪即刻配对。
//!
//! 由一把阻塞互斥锁加两个条件变量（说者队列、听者队列）组合而成；
//! 这是刻意的严格会合而非有界队列：没有听者时说者无限期阻塞。
//!
//! ## Invariants
//! - 状态机（每条待取消息）：`EMPTY → FULL（speak 存入） → EMPTY（listen 取走）`，
//!   两个状态有且仅有一个成立，转换只在持锁时发生
//! - `word` 有值当且仅当某次 `speak` 已存入且尚未被 `listen` 取走
//! - 已返回的 `speak` 与已返回的 `listen` 一一对应（双射）
//!
//! ## Behavior
//! - `speak`：无登记听者或上一条消息未被取走时睡在说者条件上；
//!   存入消息后唤醒一个听者
//! - `listen`：登记到场；无消息时先唤醒说者再睡在听者条件上；
//!   取走消息后唤醒说者，让下一次交换开始成形

use crate::sync::{Condvar, Mutex, MutexBlocking, UPIntrFreeCell};
use std::sync::Arc;

/// 一对一同步消息会合信道
pub struct Communicator {
    lock: Arc<dyn Mutex>,
    speaker_queue: Condvar,
    listener_queue: Condvar,
    inner: UPIntrFreeCell<CommunicatorInner>,
}

/// 信道内部状态，仅在持有 `lock` 时读写
struct CommunicatorInner {
    word: Option<i32>,
    listeners: usize,
}

impl Communicator {
    pub fn new() -> Self {
        let lock: Arc<dyn Mutex> = Arc::new(MutexBlocking::new());
        Self {
            speaker_queue: Condvar::new(Arc::clone(&lock)),
            listener_queue: Condvar::new(Arc::clone(&lock)),
            lock,
            inner: UPIntrFreeCell::new(CommunicatorInner {
                word: None,
                listeners: 0,
            }),
        }
    }

    /// 等到与一个听者配对后，把 `word` 交付给它
    ///
    /// ## Behavior
    /// - 直到存在登记的听者、且上一条消息已被取走，才存入消息
    /// - 存入后唤醒一个听者；交付的消息恰好被一个 `listen` 收到
    pub fn speak(&self, word: i32) {
        self.lock.lock();
        while self
            .inner
            .exclusive_session(|inner| inner.listeners == 0 || inner.word.is_some())
        {
            self.speaker_queue.wait();
        }
        self.inner.exclusive_session(|inner| {
            inner.word = Some(word);
        });
        log::debug!("communicator: deposited word {}", word);
        self.listener_queue.signal();
        self.lock.unlock();
    }

    /// 等到某个 `speak` 存入消息后，取走并返回它
    ///
    /// ## Returns
    /// - 与本次调用配对的那一个 `speak` 所传递的消息
    pub fn listen(&self) -> i32 {
        self.lock.lock();
        self.inner.exclusive_session(|inner| inner.listeners += 1);
        while self.inner.exclusive_session(|inner| inner.word.is_none()) {
            self.speaker_queue.signal();
            self.listener_queue.wait();
        }
        // 允许下一次交换开始成形
        self.speaker_queue.signal();
        let word = self.inner.exclusive_session(|inner| {
            inner.listeners -= 1;
            inner.word.take().unwrap()
        });
        self.lock.unlock();
        word
    }
}

impl Default for Communicator {
    fn default() -> Self {
        Self::new()
    }
}
