//! # 配比反应屏障（ReactWater）模块
//!
//! ## Overview
//! 本模块实现 2:1 定比配额屏障：只有当 **至少 2 个氢类到场者与
//! 1 个氧类到场者** 同时等待时，才原子地消耗 2 氢 + 1 氧、
//! 触发一次「反应」，并放行这三个参与者。配额不足的到场者
//! 一直排队，直到后续到场者凑齐配额。
//!
//! 由一把阻塞互斥锁加两个条件变量（氢队列、氧队列）组合而成。
//!
//! ## Invariants
//! - 计数永不为负；一次反应恰好消耗 2 氢 + 1 氧，不存在可观测的部分消耗
//! - 计数扣减只由 **凑齐配额的那个到场者**（触发者）执行一次；
//!   被唤醒的等待者重新检查配额、发现已被消耗后直接落空返回，
//!   绝不重复扣减
//! - 任意有限到场序列后，反应次数 = `min(氢到场数 / 2, 氧到场数)` 向下取整
//!
//! ## Behavior
//! - 每次反应通过 `log::info!` 记录，并回调可选的观察者钩子

use crate::sync::{Condvar, Mutex, MutexBlocking, UPIntrFreeCell};
use std::sync::Arc;

/// 反应观察者回调类型
pub type ReactionObserver = Box<dyn Fn() + Send + Sync>;

/// 2 氢 + 1 氧定比配额屏障
pub struct ReactWater {
    lock: Arc<dyn Mutex>,
    hydrogen_queue: Condvar,
    oxygen_queue: Condvar,
    inner: UPIntrFreeCell<ReactWaterInner>,
    observer: Option<ReactionObserver>,
}

/// 屏障内部计数，仅在持有 `lock` 时修改
struct ReactWaterInner {
    hydrogen: usize,
    oxygen: usize,
    reactions: usize,
}

impl ReactWater {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// 创建屏障并挂接反应观察者，每次反应触发时回调一次
    pub fn with_observer(observer: ReactionObserver) -> Self {
        Self::build(Some(observer))
    }

    fn build(observer: Option<ReactionObserver>) -> Self {
        let lock: Arc<dyn Mutex> = Arc::new(MutexBlocking::new());
        Self {
            hydrogen_queue: Condvar::new(Arc::clone(&lock)),
            oxygen_queue: Condvar::new(Arc::clone(&lock)),
            lock,
            inner: UPIntrFreeCell::new(ReactWaterInner {
                hydrogen: 0,
                oxygen: 0,
                reactions: 0,
            }),
            observer,
        }
    }

    /// 一个氢类参与者到场
    ///
    /// ## Behavior
    /// - 配额未凑齐则睡在氢队列上；被唤醒（或到场即凑齐）后尝试触发反应
    /// - 返回时，本次到场要么已被某次反应消耗，要么仍计入未消耗存量
    pub fn hydrogen_arrive(&self) {
        self.lock.lock();
        let quorum = self.inner.exclusive_session(|inner| {
            inner.hydrogen += 1;
            inner.oxygen >= 1 && inner.hydrogen >= 2
        });
        if !quorum {
            self.hydrogen_queue.wait();
        }
        self.try_react();
        self.lock.unlock();
    }

    /// 一个氧类参与者到场
    pub fn oxygen_arrive(&self) {
        self.lock.lock();
        let quorum = self.inner.exclusive_session(|inner| {
            inner.oxygen += 1;
            inner.oxygen >= 1 && inner.hydrogen >= 2
        });
        if !quorum {
            self.oxygen_queue.wait();
        }
        self.try_react();
        self.lock.unlock();
    }

    /// 配额凑齐则触发一次反应（必须持锁调用）
    ///
    /// ## Behavior
    /// - 唤醒两个氢等待者与一个氧等待者（触发者自身未在队列中时，
    ///   多余的唤醒落在空队列上，自然无效）
    /// - 计数扣减只在此处、由触发者执行；被唤醒者重查配额后直接返回
    fn try_react(&self) {
        let fired = self.inner.exclusive_session(|inner| {
            if inner.oxygen < 1 || inner.hydrogen < 2 {
                return false;
            }
            inner.hydrogen -= 2;
            inner.oxygen -= 1;
            inner.reactions += 1;
            true
        });
        if !fired {
            return;
        }
        self.hydrogen_queue.signal();
        self.hydrogen_queue.signal();
        self.oxygen_queue.signal();
        log::info!("react_water: water molecule formed");
        if let Some(observer) = &self.observer {
            observer();
        }
    }

    /// 已触发的反应次数（瞬时快照）
    pub fn reaction_count(&self) -> usize {
        self.inner.exclusive_session(|inner| inner.reactions)
    }

    /// 尚未被消耗的（氢, 氧）到场数（瞬时快照）
    pub fn counts(&self) -> (usize, usize) {
        self.inner
            .exclusive_session(|inner| (inner.hydrogen, inner.oxygen))
    }
}

impl Default for ReactWater {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::spawn;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    fn wait_until(what: &str, cond: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !cond() {
            assert!(Instant::now() < deadline, "timed out waiting for {}", what);
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    fn run_arrivals(react: &Arc<ReactWater>, hydrogen: usize, oxygen: usize) -> Vec<crate::task::TaskHandle> {
        let mut handles = Vec::new();
        for i in 0..hydrogen {
            let r = Arc::clone(react);
            handles.push(spawn(&format!("hydrogen-{}", i), move || r.hydrogen_arrive()));
        }
        for i in 0..oxygen {
            let r = Arc::clone(react);
            handles.push(spawn(&format!("oxygen-{}", i), move || r.oxygen_arrive()));
        }
        handles
    }

    #[test]
    fn two_hydrogen_one_oxygen_react_once() {
        let observed = Arc::new(AtomicUsize::new(0));
        let o = Arc::clone(&observed);
        let react = Arc::new(ReactWater::with_observer(Box::new(move || {
            o.fetch_add(1, Ordering::SeqCst);
        })));

        for handle in run_arrivals(&react, 2, 1) {
            handle.join();
        }
        assert_eq!(react.reaction_count(), 1);
        assert_eq!(react.counts(), (0, 0));
        assert_eq!(observed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn four_hydrogen_two_oxygen_react_twice() {
        let react = Arc::new(ReactWater::new());
        for handle in run_arrivals(&react, 4, 2) {
            handle.join();
        }
        assert_eq!(react.reaction_count(), 2);
        assert_eq!(react.counts(), (0, 0));
    }

    #[test]
    fn surplus_hydrogen_keeps_waiting() {
        let react = Arc::new(ReactWater::new());
        // 3 氢 + 1 氧：恰好一次反应，剩下的那个氢继续排队
        let _handles = run_arrivals(&react, 3, 1);
        wait_until("one reaction", || react.reaction_count() == 1);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(react.reaction_count(), 1);
        assert_eq!(react.counts(), (1, 0));
        // 凑齐配额后剩余的氢也被消耗
        let extra = run_arrivals(&react, 1, 1);
        for handle in extra {
            handle.join();
        }
        wait_until("second reaction", || react.reaction_count() == 2);
        assert_eq!(react.counts(), (0, 0));
    }
}
