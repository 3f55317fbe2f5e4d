//! # 内核同步原语模块（sync）
//!
//! ## Overview
//! 本模块是同步核心中 **所有基础同步原语的统一入口**，
//! 对外以 `pub use` 的形式导出可供上层使用的同步设施。
//!
//! 模块内部按功能拆分为多个子模块：
//! - `up`：单处理器环境下的内部可变性与抢占屏蔽封装（原子段）
//! - `mutex`：互斥锁抽象及其具体实现（自旋 / 阻塞）
//! - `condvar`：条件变量，基础阻塞原语
//! - `communicator`：一对一同步会合信道（复合原语）
//! - `react_water`：2:1 定比配额屏障（复合原语）
//!
//! 依赖方向自下而上：`up` 是一切的根基；`condvar` 建立在
//! 互斥锁与原子段之上；两个复合原语各自拥有一把互斥锁
//! 与两个条件变量，通过 **组合** 而非继承复用同一条件变量类型。
//!
//! ## Assumptions
//! - 系统运行在单逻辑处理器模型下，并发仅来源于
//!   定时器回调或显式调度点
//! - 所有同步原语都依赖 `UPIntrFreeCell` 提供的原子段语义
//!
//! ## Invariants
//! - 所有同步原语的内部状态仅能通过受控接口访问
//! - 在阻塞当前任务前，内部状态必然已经更新
//! - 被加入等待队列的任务一定处于不可运行状态
//!
//! ## Behavior
//! - 具体的睡眠与唤醒行为由 `task` 模块负责
//! - 模块本身不感知具体的任务调度策略

mod communicator;
mod condvar;
mod mutex;
mod react_water;
mod up;

/// 条件变量
pub use condvar::Condvar;

/// 互斥锁抽象与实现
pub use mutex::{Mutex, MutexBlocking, MutexSpin};

/// 一对一同步会合信道
pub use communicator::Communicator;

/// 2:1 定比配额屏障
pub use react_water::{ReactWater, ReactionObserver};

/// 单处理器内部可变性与抢占屏蔽工具
pub use up::{UPIntrFreeCell, UPIntrRefMut};
