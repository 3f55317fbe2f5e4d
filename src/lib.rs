//! # 单处理器内核同步核心（upsync）
//!
//! ## Overview
//! 本 crate 实现了一个协作式、可被时钟中断抢占的 **单处理器内核** 中
//! 所有高层协调模式赖以构建的同步核心，包括：
//!
//! - `timer::Alarm`：由周期性时钟回调驱动的定时唤醒引擎
//! - `sync::Condvar`：基于「关抢占原子段 + 显式 FIFO 等待队列」的条件变量
//! - `sync::Communicator`：一对一同步会合信道（speak / listen 严格配对）
//! - `sync::ReactWater`：2:1 定比配额屏障（2 个氢 + 1 个氧才触发一次反应）
//!
//!
//! 下层只依赖两个由调度器提供的底座原语：
//! - 原子段（关闭 / 恢复抢占，见 [`hal::INTR_MASKING_INFO`]）
//! - 可被睡眠与唤醒的任务（见 [`task`] 模块）
//!
//! ## Assumptions
//! - 单逻辑处理器：任务从不真正并行运行，并发仅来源于
//!   时钟回调或显式的调度点
//! - 机器层为宿主模拟：任务由宿主线程承载，时钟 tick 由驱动方显式推进
//! - 所有共享状态都通过 `UPIntrFreeCell` 或持有互斥锁的临界区访问
//!
//! ## Behavior
//! - 阻塞操作要么被未来的唤醒满足，要么永久阻塞；没有超时与取消
//! - 使用错误（未持锁调用条件变量、任务上下文之外阻塞等）
//!   一律按内核断言失败处理，而非可恢复错误

pub mod hal;
pub mod sync;
pub mod task;
pub mod timer;

pub use sync::{Communicator, Condvar, Mutex, MutexBlocking, MutexSpin, ReactWater};
pub use task::{current_task, spawn, TaskControlBlock, TaskHandle, TaskStatus};
pub use timer::Alarm;
