//! # 定时唤醒引擎（Alarm）模块
//!
//! ## Overview
//! 本模块把周期性时钟回调变成「睡到至少 T 个 tick 之后」的唤醒服务：
//! 任务调用 [`Alarm::wait_until`] 登记绝对唤醒时刻并睡眠，
//! 时钟每个 tick 触发一次回调，回调弹出所有到期表项、
//! 唤醒对应任务，随后让出处理器。
//!
//! ## Assumptions
//! - 回调运行在中断上下文的模拟中，绝不阻塞；
//!   入队与排空之间的互斥由原子段（`UPIntrFreeCell`）提供，而非互斥锁
//! - 一台机器只应存在一个 Alarm；再次构造会顶替时钟回调
//!
//! ## Invariants
//! - 唤醒队列按 `wake_time` 升序弹出（小根序），同刻表项顺序任意
//! - 每个睡眠中的任务在队列里至多有一个表项，
//!   任务被唤醒时表项即被销毁
//! - 任务绝不会早于其唤醒时刻被置为就绪；
//!   它在回调运行且 `now >= wake_time` 的第一个 tick 上被唤醒

use crate::hal;
use crate::sync::UPIntrFreeCell;
use crate::task::{
    block_current_and_run_next, current_task, suspend_current_and_run_next, wakeup_task,
    TaskControlBlock,
};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

/// 唤醒队列表项：（任务，绝对唤醒时刻）
struct WakeRequest {
    wake_time: usize,
    task: Arc<TaskControlBlock>,
}

impl PartialEq for WakeRequest {
    fn eq(&self, other: &Self) -> bool {
        self.wake_time == other.wake_time
    }
}

impl Eq for WakeRequest {}

impl PartialOrd for WakeRequest {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WakeRequest {
    // 反转比较方向，使 BinaryHeap 以最早唤醒时刻为堆顶
    fn cmp(&self, other: &Self) -> Ordering {
        other.wake_time.cmp(&self.wake_time)
    }
}

/// 定时唤醒引擎
pub struct Alarm {
    wait_queue: UPIntrFreeCell<BinaryHeap<WakeRequest>>,
}

impl Alarm {
    /// 创建 Alarm 并把自身的回调注册为机器的时钟处理函数
    pub fn new() -> Arc<Self> {
        let alarm = Arc::new(Self {
            wait_queue: UPIntrFreeCell::new(BinaryHeap::new()),
        });
        let handler = Arc::clone(&alarm);
        hal::set_timer_handler(Arc::new(move || handler.on_timer_tick()));
        alarm
    }

    /// 让当前任务睡眠至少 `ticks` 个 tick
    ///
    /// ## Behavior
    /// - `ticks <= 0`：立即返回，不让出处理器
    /// - 否则登记 `wake_time = now + ticks` 后睡眠，
    ///   直到时钟回调在第一个 `now >= wake_time` 的 tick 上唤醒本任务
    ///
    /// ## Panics
    /// - 在任务上下文之外以正数 `ticks` 调用属于使用错误
    pub fn wait_until(&self, ticks: isize) {
        if ticks <= 0 {
            return;
        }
        let wake_time = hal::get_time() + ticks as usize;
        let task = current_task().unwrap();
        log::debug!("alarm: task {} sleeping until tick {}", task.tid, wake_time);
        self.wait_queue.exclusive_session(|queue| {
            queue.push(WakeRequest { wake_time, task });
        });
        block_current_and_run_next();
    }

    /// 时钟回调：弹出并唤醒所有到期任务，然后让出处理器
    fn on_timer_tick(&self) {
        let now = hal::get_time();
        loop {
            let due = self.wait_queue.exclusive_session(|queue| {
                if queue.peek().map_or(false, |req| req.wake_time <= now) {
                    queue.pop()
                } else {
                    None
                }
            });
            match due {
                Some(req) => {
                    log::debug!("alarm: waking task {} at tick {}", req.task.tid, now);
                    wakeup_task(req.task);
                }
                None => break,
            }
        }
        suspend_current_and_run_next();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{spawn, TaskStatus};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};
    use std::sync::Mutex as HostMutex;
    use std::time::{Duration, Instant};

    // 时钟与回调槽位是整台「机器」共享的，定时相关测试串行执行
    static TIMER_TEST_LOCK: HostMutex<()> = HostMutex::new(());

    fn wait_until_cond(what: &str, cond: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !cond() {
            assert!(Instant::now() < deadline, "timed out waiting for {}", what);
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn nonpositive_wait_returns_immediately() {
        let _serial = TIMER_TEST_LOCK.lock().unwrap();
        let alarm = Alarm::new();
        let before = hal::get_time();
        // 任务上下文之外也允许：非正时长不触及任务边界
        alarm.wait_until(0);
        alarm.wait_until(-4);
        assert_eq!(hal::get_time(), before);
    }

    #[test]
    fn sleeper_wakes_on_first_due_tick() {
        let _serial = TIMER_TEST_LOCK.lock().unwrap();
        let alarm = Alarm::new();
        let done = Arc::new(AtomicBool::new(false));
        let woken_at = Arc::new(AtomicUsize::new(0));

        let t0 = hal::get_time();
        let (a, d, w) = (Arc::clone(&alarm), Arc::clone(&done), Arc::clone(&woken_at));
        let sleeper = spawn("sleeper", move || {
            a.wait_until(10);
            w.store(hal::get_time(), AtomicOrdering::SeqCst);
            d.store(true, AtomicOrdering::SeqCst);
        });

        wait_until_cond("sleeper blocked", || {
            sleeper.task().status() == TaskStatus::Blocked
        });

        hal::advance(9);
        std::thread::sleep(Duration::from_millis(20));
        assert!(!done.load(AtomicOrdering::SeqCst));
        assert_eq!(sleeper.task().status(), TaskStatus::Blocked);

        hal::advance(1);
        sleeper.join();
        assert!(woken_at.load(AtomicOrdering::SeqCst) >= t0 + 10);
    }

    #[test]
    fn earlier_deadline_wakes_first() {
        let _serial = TIMER_TEST_LOCK.lock().unwrap();
        let alarm = Alarm::new();

        let a = Arc::clone(&alarm);
        let short = spawn("short", move || a.wait_until(5));
        let a = Arc::clone(&alarm);
        let long = spawn("long", move || a.wait_until(10));
        for handle in [&short, &long] {
            let task = Arc::clone(handle.task());
            wait_until_cond("sleeper blocked", move || task.status() == TaskStatus::Blocked);
        }

        hal::advance(5);
        short.join();
        assert_eq!(long.task().status(), TaskStatus::Blocked);

        hal::advance(4);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(long.task().status(), TaskStatus::Blocked);

        hal::advance(1);
        long.join();
    }
}
