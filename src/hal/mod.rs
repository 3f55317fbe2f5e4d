//! 机器边界模块（hal）
//! # Overview
//! 本模块封装同步核心对「机器」的全部依赖：单调时钟、周期性定时器回调，
//! 以及关闭 / 恢复抢占的中断屏蔽状态。
//!
//! # Design
//! - 机器为宿主模拟：tick 计数器只在驱动方调用 [`tick`] / [`advance`] 时前进
//! - 定时器回调通过 [`set_timer_handler`] 注册，每个 tick 恰好触发一次
//! - `INTR_MASKING_INFO` 以嵌套计数实现「关抢占返回先前状态」的语义：
//!   `enter` 即 disable，`exit` 即 restore，嵌套安全
//!
//! # Assumptions
//! - 单逻辑处理器；回调在推进时钟的执行流上同步运行
//! - 回调自身不得阻塞（它运行在中断上下文的模拟中）
//!
//! # Invariants
//! - `get_time()` 单调不减
//! - 屏蔽计数大于零期间不触发定时器回调

use core::sync::atomic::{AtomicUsize, Ordering};
use lazy_static::lazy_static;
use std::sync::Arc;

/// 定时器回调类型
pub type TimerHandler = Arc<dyn Fn() + Send + Sync>;

/// 中断（抢占）屏蔽状态
///
/// ## Overview
/// 以嵌套深度模拟 `disable -> 先前状态 / restore(先前状态)` 的成对原语：
/// 每次 `enter` 相当于保存先前状态并关闭抢占，`exit` 相当于恢复。
pub struct IntrMaskingInfo {
    nested_level: AtomicUsize,
}

impl IntrMaskingInfo {
    const fn new() -> Self {
        Self {
            nested_level: AtomicUsize::new(0),
        }
    }

    /// 进入屏蔽区（关抢占）
    pub fn enter(&self) {
        self.nested_level.fetch_add(1, Ordering::SeqCst);
    }

    /// 退出屏蔽区（恢复先前状态）
    ///
    /// ## Panics
    /// - 与 `enter` 不成对调用时直接 panic，视为内核使用错误
    pub fn exit(&self) {
        let prev = self.nested_level.fetch_sub(1, Ordering::SeqCst);
        assert!(prev > 0, "IntrMaskingInfo::exit without matching enter");
    }

    /// 当前是否处于屏蔽区内
    pub fn is_masked(&self) -> bool {
        self.nested_level.load(Ordering::SeqCst) > 0
    }
}

/// 全局屏蔽状态（单处理器，仅此一份）
pub static INTR_MASKING_INFO: IntrMaskingInfo = IntrMaskingInfo::new();

struct Timer {
    ticks: AtomicUsize,
    handler: spin::Mutex<Option<TimerHandler>>,
}

lazy_static! {
    static ref TIMER: Timer = Timer {
        ticks: AtomicUsize::new(0),
        handler: spin::Mutex::new(None),
    };
}

/// 获取当前时间（tick 数）
pub fn get_time() -> usize {
    TIMER.ticks.load(Ordering::SeqCst)
}

/// 注册周期性定时器回调
///
/// # Behavior
/// - 覆盖之前注册的回调；整台机器同一时刻只有一个定时器处理函数
pub fn set_timer_handler(handler: TimerHandler) {
    *TIMER.handler.lock() = Some(handler);
}

/// 推进一个 tick 并触发定时器回调
///
/// # Behavior
/// - 若当前处于屏蔽区内，先等待屏蔽解除再触发，
///   模拟「关抢占期间中断被挂起」
pub fn tick() {
    while INTR_MASKING_INFO.is_masked() {
        std::thread::yield_now();
    }
    TIMER.ticks.fetch_add(1, Ordering::SeqCst);
    let handler = TIMER.handler.lock().clone();
    if let Some(handler) = handler {
        handler();
    }
}

/// 连续推进 `n` 个 tick，回调在每个 tick 上各触发一次
pub fn advance(n: usize) {
    for _ in 0..n {
        tick();
    }
}
