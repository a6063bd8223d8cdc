use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use anyhow::Result;
use log::debug;
use once_cell::sync::OnceCell;

use crate::model::boost_state::{BoostState, INPUT_BOOST, MAX_BOOST, SCREEN_OFF, StateRegister};
use crate::model::deadline::{ExpiryDeadline, now_ms};
use crate::model::timer::BoostTimer;
use crate::model::tunables::Tunables;
use crate::utils::constants::thread_names::{INPUT_TIMER_THREAD, MAX_TIMER_THREAD};

/// 协调器唤醒器
///
/// 真正的谓词是原子状态本身，这把锁只用来封住
/// “检查谓词”和“进入等待”之间的窗口，保证唤醒不丢失。
pub struct PolicyWaker {
    gate: Mutex<()>,
    cond: Condvar,
}

impl PolicyWaker {
    fn new() -> Self {
        Self {
            gate: Mutex::new(()),
            cond: Condvar::new(),
        }
    }

    pub fn wake(&self) {
        let _guard = self.gate.lock().unwrap();
        self.cond.notify_all();
    }

    pub(crate) fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.gate.lock().unwrap()
    }

    pub(crate) fn wait<'a>(
        &self,
        guard: std::sync::MutexGuard<'a, ()>,
    ) -> std::sync::MutexGuard<'a, ()> {
        self.cond.wait(guard).unwrap()
    }
}

/// 调速器上下文 - 进程启动时构造一次，所有协作方共享引用
///
/// 事件源只做三件事：原子改状态位、重置对应定时器、唤醒协调器。
/// 注册完成后上下文对事件源是只读的，因此热插拔和并发触发互不干扰。
pub struct BoostDriver {
    state: StateRegister,
    max_boost_expires: ExpiryDeadline,
    tunables: Arc<Tunables>,
    waker: PolicyWaker,
    stop: AtomicBool,
    input_timer: OnceCell<BoostTimer>,
    max_timer: OnceCell<BoostTimer>,
}

impl BoostDriver {
    /// 构造驱动上下文并启动两个过期定时器线程
    ///
    /// 任一定时器线程起不来都视为启动失败：带着死定时器运行
    /// 意味着加速位置上后永远清不掉。
    pub fn new(tunables: Arc<Tunables>) -> Result<Arc<Self>> {
        let driver = Arc::new(Self {
            state: StateRegister::new(),
            max_boost_expires: ExpiryDeadline::new(),
            tunables,
            waker: PolicyWaker::new(),
            stop: AtomicBool::new(false),
            input_timer: OnceCell::new(),
            max_timer: OnceCell::new(),
        });

        // 定时器回调经 Weak 引用回到驱动，避免 Arc 环导致析构永不发生
        let weak = Arc::downgrade(&driver);
        let timer = BoostTimer::spawn(INPUT_TIMER_THREAD, move || {
            if let Some(d) = weak.upgrade() {
                d.input_boost_expired();
            }
        })?;
        let _ = driver.input_timer.set(timer);

        let weak = Arc::downgrade(&driver);
        let timer = BoostTimer::spawn(MAX_TIMER_THREAD, move || {
            if let Some(d) = weak.upgrade() {
                d.max_boost_expired();
            }
        })?;
        let _ = driver.max_timer.set(timer);

        Ok(driver)
    }

    pub fn tunables(&self) -> &Tunables {
        &self.tunables
    }

    pub fn snapshot(&self) -> BoostState {
        self.state.snapshot()
    }

    pub fn state_bits(&self) -> u32 {
        self.state.bits()
    }

    pub fn waker(&self) -> &PolicyWaker {
        &self.waker
    }

    /// 输入触发的加速：置位、重置去抖定时器、唤醒协调器
    ///
    /// 熄屏或时长配置为 0 时是空操作。可从任意上下文调用。
    pub fn kick(&self) {
        if self.state.snapshot().screen_off() {
            return;
        }
        let duration_ms = self.tunables.input_boost_duration_ms();
        if duration_ms == 0 {
            return;
        }

        self.state.set(INPUT_BOOST);
        self.waker.wake();
        if let Some(timer) = self.input_timer.get() {
            timer.arm(Duration::from_millis(duration_ms));
        }
    }

    /// 外部请求的加速，带调用方指定的时长
    ///
    /// 截止时间只延长不缩短：CAS 失败说明已有更长的加速在生效，
    /// 此时不碰已置的定时器，后到的短请求绝不截断先到的长请求。
    pub fn kick_max(&self, duration_ms: u64) {
        if self.state.snapshot().screen_off() {
            return;
        }

        let proposed = now_ms() + duration_ms;
        if !self.max_boost_expires.extend_to(proposed) {
            debug!("kick_max({duration_ms}) superseded by a longer boost");
            return;
        }

        self.state.set(MAX_BOOST);
        self.waker.wake();
        if let Some(timer) = self.max_timer.get() {
            timer.arm(Duration::from_millis(duration_ms));
        }
    }

    /// 早期灭屏事件：立即生效，不经过任何定时器
    pub fn screen_blanked(&self) {
        self.state.set(SCREEN_OFF);
        self.waker.wake();
    }

    /// 完全亮屏
    pub fn screen_unblanked(&self) {
        self.state.clear(SCREEN_OFF);
        self.waker.wake();
    }

    fn input_boost_expired(&self) {
        self.state.clear(INPUT_BOOST);
        self.waker.wake();
    }

    fn max_boost_expired(&self) {
        self.state.clear(MAX_BOOST);
        self.waker.wake();
    }

    /// 停止信号：优先于任何待处理的状态变化，协调器观察到后不再重算
    pub fn shutdown(&self) {
        self.stop.store(true, Ordering::Release);
        self.waker.wake();
    }

    pub fn stopping(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    #[cfg(test)]
    pub(crate) fn max_boost_deadline_ms(&self) -> u64 {
        self.max_boost_expires.get()
    }
}
