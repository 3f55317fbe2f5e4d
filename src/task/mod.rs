//! # 任务边界模块（task）
//!
//! ## Overview
//! 本模块提供同步核心所依赖的任务底座：获取当前任务、阻塞当前任务、
//! 唤醒指定任务、协作式让出处理器，以及宿主环境下的任务创建与汇合。
//!
//! 调度器本体（运行队列、时间片策略）不属于本层；这里只暴露
//! 「睡眠 = 移出运行队列，唤醒 = 移回运行队列」这一语义边界，
//! 宿主实现用承载线程的停车 / 放行来落地。
//!
//! ## Assumptions
//! - 单逻辑处理器模型：任务间不真正并行，所有共享状态
//!   另由 `UPIntrFreeCell` 或互斥锁保护
//! - 每个任务由恰好一个宿主线程承载，线程局部变量记录当前任务
//!
//! ## Invariants
//! - 处于等待队列中的任务，其状态必为 `Blocked`
//! - `wakeup_task` 只应作用于已经（或即将）阻塞的任务；
//!   唤醒许可先于睡眠到达时不会丢失
//!
//! ## Behavior
//! - `block_current_and_run_next`：标记阻塞并挂起，直至他人唤醒
//! - `suspend_current_and_run_next`：让出处理器，稍后继续运行
//! - `wakeup_task`：标记就绪并放行对应任务

mod task;

pub use task::{TaskControlBlock, TaskControlBlockInner, TaskStatus};

use std::cell::RefCell;
use std::sync::Arc;
use std::thread;

thread_local! {
    static CURRENT: RefCell<Option<Arc<TaskControlBlock>>> = RefCell::new(None);
}

/// 获取当前任务
///
/// ## Returns
/// - `Some(task)`：调用发生在某个任务上下文中
/// - `None`：调用发生在任务之外（如测试驱动线程）
pub fn current_task() -> Option<Arc<TaskControlBlock>> {
    CURRENT.with(|c| c.borrow().clone())
}

/// 阻塞当前任务并切换出去，直到被 [`wakeup_task`] 唤醒
///
/// ## Panics
/// - 在任务上下文之外调用属于使用错误，直接 panic
pub fn block_current_and_run_next() {
    let task = current_task().unwrap();
    task.inner_exclusive_access().task_status = TaskStatus::Blocked;
    task.park();
    task.inner_exclusive_access().task_status = TaskStatus::Running;
}

/// 协作式让出处理器
pub fn suspend_current_and_run_next() {
    thread::yield_now();
}

/// 唤醒一个任务，将其移回可运行集合
pub fn wakeup_task(task: Arc<TaskControlBlock>) {
    let mut task_inner = task.inner_exclusive_access();
    task_inner.task_status = TaskStatus::Ready;
    drop(task_inner);
    task.unpark();
}

/// 已创建任务的句柄，持有控制块与承载线程
pub struct TaskHandle {
    task: Arc<TaskControlBlock>,
    thread: thread::JoinHandle<()>,
}

impl TaskHandle {
    pub fn task(&self) -> &Arc<TaskControlBlock> {
        &self.task
    }

    /// 等待任务运行结束
    pub fn join(self) {
        self.thread.join().unwrap();
    }
}

/// 创建并启动一个任务
///
/// ## Behavior
/// - 新任务立即进入可运行状态，由宿主调度器择机执行
/// - 闭包返回即视为任务退出
pub fn spawn<F>(name: &str, f: F) -> TaskHandle
where
    F: FnOnce() + Send + 'static,
{
    let task = Arc::new(TaskControlBlock::new(name));
    log::debug!("spawn task {} ({})", task.tid, task.name);
    let inner_task = Arc::clone(&task);
    let thread = thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            CURRENT.with(|c| *c.borrow_mut() = Some(Arc::clone(&inner_task)));
            inner_task.inner_exclusive_access().task_status = TaskStatus::Running;
            f();
        })
        .unwrap();
    TaskHandle { task, thread }
}
