use crate::sync::{UPIntrFreeCell, UPIntrRefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};

static NEXT_TID: AtomicUsize = AtomicUsize::new(0);

pub struct TaskControlBlock {
    pub tid: usize,
    pub name: String,
    parker: Parker,
    inner: UPIntrFreeCell<TaskControlBlockInner>,
}

pub struct TaskControlBlockInner {
    pub task_status: TaskStatus,
}

impl TaskControlBlock {
    pub fn new(name: &str) -> Self {
        Self {
            tid: NEXT_TID.fetch_add(1, Ordering::SeqCst),
            name: name.to_string(),
            parker: Parker::new(),
            inner: UPIntrFreeCell::new(TaskControlBlockInner {
                task_status: TaskStatus::Ready,
            }),
        }
    }

    pub fn inner_exclusive_access(&self) -> UPIntrRefMut<'_, TaskControlBlockInner> {
        self.inner.exclusive_access()
    }

    pub fn status(&self) -> TaskStatus {
        self.inner.exclusive_access().task_status
    }

    /// 挂起当前执行流，直到本任务收到唤醒许可
    pub(crate) fn park(&self) {
        self.parker.park();
    }

    /// 投递唤醒许可；先于 `park` 到达的许可不会丢失
    pub(crate) fn unpark(&self) {
        self.parker.unpark();
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TaskStatus {
    Ready,
    Running,
    Blocked,
}

/// 带许可语义的停车原语
///
/// ## Overview
/// 宿主机器层中「把任务移出 / 移回运行队列」的落地机制：
/// `park` 消耗一个许可，无许可则阻塞承载线程；`unpark` 投递许可。
///
/// ## Invariants
/// - 许可不累积：连续多次 `unpark` 至多保留一个许可
/// - 唤醒先于睡眠到达时，随后的 `park` 立即返回（不丢失唤醒）
struct Parker {
    permit: Mutex<bool>,
    cvar: Condvar,
}

impl Parker {
    fn new() -> Self {
        Self {
            permit: Mutex::new(false),
            cvar: Condvar::new(),
        }
    }

    fn park(&self) {
        let mut permit = self.permit.lock().unwrap();
        while !*permit {
            permit = self.cvar.wait(permit).unwrap();
        }
        *permit = false;
    }

    fn unpark(&self) {
        let mut permit = self.permit.lock().unwrap();
        *permit = true;
        self.cvar.notify_one();
    }
}
