//! # 单处理器原子段封装模块
//!
//! ## Overview
//! 本模块提供 [`UPIntrFreeCell`]：单处理器模型下、对中断（抢占）原子的
//! 内部可变性封装。进入临界区时关闭抢占，退出时恢复，并以 RAII 守卫
//! [`UPIntrRefMut`] 保证两者在所有路径（含提前返回）上成对出现。
//!
//! ## Assumptions
//! - 逻辑上运行在单处理器环境，并发仅来源于定时器回调或调度点
//! - 宿主机器层中任务由真实线程承载、可能短暂重叠，
//!   因此内部以自旋锁兜底数据互斥；屏蔽计数仅表达
//!   「定时器回调不得打断原子段」这层语义
//!
//! ## Invariants
//! - 任一时刻，若某个 `UPIntrFreeCell` 的守卫存活，则屏蔽计数必大于零
//! - 守卫 Drop 时先释放数据借用，再恢复抢占状态
//!
//! ## Behavior
//! - `exclusive_access` 返回独占访问守卫
//! - 同一任务在守卫存活期间再次进入同一 cell 属于使用错误（会死锁）
//! - 持有守卫期间严禁阻塞或让出处理器

use crate::hal::INTR_MASKING_INFO;
use core::ops::{Deref, DerefMut};
use spin::{Mutex, MutexGuard};

/// 在访问期间关闭抢占的内部可变性封装
pub struct UPIntrFreeCell<T> {
    inner: Mutex<T>,
}

/// `UPIntrFreeCell` 的独占访问守卫
///
/// ## Invariants
/// - 生命周期内：抢占始终处于关闭状态
pub struct UPIntrRefMut<'a, T>(Option<MutexGuard<'a, T>>);

impl<T> UPIntrFreeCell<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    /// 获取内部数据的独占访问权
    ///
    /// ## Behavior
    /// - 先关闭抢占，再取得数据的独占借用
    pub fn exclusive_access(&self) -> UPIntrRefMut<'_, T> {
        INTR_MASKING_INFO.enter();
        UPIntrRefMut(Some(self.inner.lock()))
    }

    /// 在独占访问会话中执行闭包
    ///
    /// ## Behavior
    /// - 自动管理抢占的关闭与恢复
    pub fn exclusive_session<F, V>(&self, f: F) -> V
    where
        F: FnOnce(&mut T) -> V,
    {
        let mut inner = self.exclusive_access();
        f(inner.deref_mut())
    }
}

impl<'a, T> Drop for UPIntrRefMut<'a, T> {
    fn drop(&mut self) {
        self.0 = None;
        INTR_MASKING_INFO.exit();
    }
}

impl<'a, T> Deref for UPIntrRefMut<'a, T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        self.0.as_ref().unwrap().deref()
    }
}

impl<'a, T> DerefMut for UPIntrRefMut<'a, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.0.as_mut().unwrap().deref_mut()
    }
}
