//! # 互斥锁（Mutex）同步原语模块
//!
//! ## Overview
//! 本模块实现了内核中的互斥锁抽象及其两种具体实现：
//!
//! - `MutexSpin`：基于忙等 + 主动让出处理器的自旋互斥锁
//! - `MutexBlocking`：基于 FIFO 等待队列的阻塞型互斥锁
//!
//! 二者都实现统一的 [`Mutex`] trait，条件变量与上层复合原语
//! 以 **多态方式**（`Arc<dyn Mutex>`）使用任意一种实现。
//!
//! 与朴素互斥锁相比，这里额外维护 **持有者 tid**，
//! 以支持条件变量所需的持锁断言 `is_held_by_current_task`。
//!
//! ## Assumptions
//! - 单逻辑处理器模型；任务切换只发生在显式调度点
//! - 所有内部状态由 `UPIntrFreeCell` 提供的原子段保护
//!
//! ## Invariants
//! - 任意时刻每把互斥锁至多被一个任务持有，且 `holder` 恰为该任务的 tid
//! - `MutexBlockingInner.locked == false` ⇒ `holder` 为空且等待队列为空
//! - 等待队列中的任务一定处于阻塞状态，且不持有该锁
//!
//! ## Behavior
//! - `lock`：空闲则立即获得；被占用则按实现忙等或阻塞等待
//! - `unlock`：存在等待任务时，所有权直接移交队首任务（锁保持占用），
//!   否则置为空闲；解锁未持有的锁属于使用错误

use crate::sync::UPIntrFreeCell;
use crate::task::{
    block_current_and_run_next, current_task, suspend_current_and_run_next, wakeup_task,
    TaskControlBlock,
};
use std::collections::VecDeque;
use std::sync::Arc;

/// 互斥锁统一抽象接口
///
/// ## Safety
/// - 实现者需保证 `lock` / `unlock` 的并发安全性，
///   以及 `is_held_by_current_task` 与真实持有关系一致
pub trait Mutex: Sync + Send {
    /// 获取互斥锁，必要时阻塞或让出处理器
    fn lock(&self);
    /// 释放互斥锁
    fn unlock(&self);
    /// 当前任务是否持有该锁
    fn is_held_by_current_task(&self) -> bool;
}

fn current_tid() -> Option<usize> {
    current_task().map(|task| task.tid)
}

/// 自旋式互斥锁
///
/// ## Overview
/// - 不维护显式等待队列
/// - 被占用时主动让出处理器后重试
///
/// ## Assumptions
/// - 临界区较短
pub struct MutexSpin {
    inner: UPIntrFreeCell<MutexSpinInner>,
}

struct MutexSpinInner {
    locked: bool,
    holder: Option<usize>,
}

impl MutexSpin {
    pub fn new() -> Self {
        Self {
            inner: UPIntrFreeCell::new(MutexSpinInner {
                locked: false,
                holder: None,
            }),
        }
    }
}

impl Default for MutexSpin {
    fn default() -> Self {
        Self::new()
    }
}

impl Mutex for MutexSpin {
    fn lock(&self) {
        let tid = current_tid();
        loop {
            let mut inner = self.inner.exclusive_access();
            if inner.locked {
                drop(inner);
                suspend_current_and_run_next();
                continue;
            } else {
                inner.locked = true;
                inner.holder = tid;
                return;
            }
        }
    }

    fn unlock(&self) {
        let mut inner = self.inner.exclusive_access();
        assert!(inner.locked, "unlock of a free MutexSpin");
        assert!(
            inner.holder == current_tid(),
            "unlock of a MutexSpin held by another task"
        );
        inner.locked = false;
        inner.holder = None;
    }

    fn is_held_by_current_task(&self) -> bool {
        let inner = self.inner.exclusive_access();
        inner.locked && inner.holder.is_some() && inner.holder == current_tid()
    }
}

/// 阻塞式互斥锁
///
/// ## Overview
/// - 被占用时将当前任务加入 FIFO 等待队列并阻塞
/// - 解锁时所有权直接移交队首等待任务
pub struct MutexBlocking {
    inner: UPIntrFreeCell<MutexBlockingInner>,
}

struct MutexBlockingInner {
    locked: bool,
    holder: Option<usize>,
    wait_queue: VecDeque<Arc<TaskControlBlock>>,
}

impl MutexBlocking {
    pub fn new() -> Self {
        Self {
            inner: UPIntrFreeCell::new(MutexBlockingInner {
                locked: false,
                holder: None,
                wait_queue: VecDeque::new(),
            }),
        }
    }
}

impl Default for MutexBlocking {
    fn default() -> Self {
        Self::new()
    }
}

impl Mutex for MutexBlocking {
    /// 获取阻塞互斥锁
    ///
    /// ## Behavior
    /// - 锁被占用：当前任务入队并阻塞；被唤醒时锁已移交给自己
    /// - 锁空闲：直接获取
    fn lock(&self) {
        let task = current_task().unwrap();
        let mut mutex_inner = self.inner.exclusive_access();
        if mutex_inner.locked {
            mutex_inner.wait_queue.push_back(Arc::clone(&task));
            drop(mutex_inner);
            block_current_and_run_next();
            // 醒来即持有：unlock 已把 holder 记为本任务
        } else {
            mutex_inner.locked = true;
            mutex_inner.holder = Some(task.tid);
        }
    }

    /// 释放阻塞互斥锁
    ///
    /// ## Behavior
    /// - 等待队列非空：唤醒队首任务，锁的所有权隐式转移
    /// - 否则：置为空闲
    ///
    /// ## Panics
    /// - 锁未被持有、或持有者不是当前任务时 panic
    fn unlock(&self) {
        let mut mutex_inner = self.inner.exclusive_access();
        assert!(mutex_inner.locked, "unlock of a free MutexBlocking");
        assert!(
            mutex_inner.holder == current_tid(),
            "unlock of a MutexBlocking held by another task"
        );
        if let Some(waking_task) = mutex_inner.wait_queue.pop_front() {
            mutex_inner.holder = Some(waking_task.tid);
            drop(mutex_inner);
            wakeup_task(waking_task);
        } else {
            mutex_inner.locked = false;
            mutex_inner.holder = None;
        }
    }

    fn is_held_by_current_task(&self) -> bool {
        let inner = self.inner.exclusive_access();
        inner.locked && inner.holder.is_some() && inner.holder == current_tid()
    }
}
