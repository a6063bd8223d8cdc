use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use log::debug;

/// 运行期可调参数
///
/// 配置监控线程改写这些原子量，策略在下一次重算时读到新值，
/// 不需要任何同步点。频率单位 KHz，时长单位毫秒。
pub struct Tunables {
    idle_min_freq_lp: AtomicU64,
    boost_min_freq_lp: AtomicU64,
    input_boost_duration_ms: AtomicU64,
    disable_boost: AtomicBool,
}

impl Tunables {
    pub fn new(
        idle_min_freq_lp: u64,
        boost_min_freq_lp: u64,
        input_boost_duration_ms: u64,
        disable_boost: bool,
    ) -> Self {
        Self {
            idle_min_freq_lp: AtomicU64::new(idle_min_freq_lp),
            boost_min_freq_lp: AtomicU64::new(boost_min_freq_lp),
            input_boost_duration_ms: AtomicU64::new(input_boost_duration_ms),
            disable_boost: AtomicBool::new(disable_boost),
        }
    }

    pub fn idle_min_freq_lp(&self) -> u64 {
        self.idle_min_freq_lp.load(Ordering::Relaxed)
    }

    pub fn set_idle_min_freq_lp(&self, khz: u64) {
        self.idle_min_freq_lp.store(khz, Ordering::Relaxed);
        debug!("idle_min_freq_lp={khz}KHz");
    }

    pub fn boost_min_freq_lp(&self) -> u64 {
        self.boost_min_freq_lp.load(Ordering::Relaxed)
    }

    pub fn set_boost_min_freq_lp(&self, khz: u64) {
        self.boost_min_freq_lp.store(khz, Ordering::Relaxed);
        debug!("boost_min_freq_lp={khz}KHz");
    }

    /// 输入加速时长，0 表示禁用输入触发的加速
    pub fn input_boost_duration_ms(&self) -> u64 {
        self.input_boost_duration_ms.load(Ordering::Relaxed)
    }

    pub fn set_input_boost_duration_ms(&self, ms: u64) {
        self.input_boost_duration_ms.store(ms, Ordering::Relaxed);
        debug!("input_boost_duration_ms={ms}");
    }

    /// 全局 disable_boost 只抑制补充加速组的切换，不关掉整个调速器
    pub fn disable_boost(&self) -> bool {
        self.disable_boost.load(Ordering::Relaxed)
    }

    pub fn set_disable_boost(&self, disable: bool) {
        self.disable_boost.store(disable, Ordering::Relaxed);
        debug!("disable_boost={disable}");
    }
}

impl Default for Tunables {
    fn default() -> Self {
        Self::new(
            crate::utils::constants::defaults::IDLE_MIN_FREQ_LP,
            crate::utils::constants::defaults::BOOST_MIN_FREQ_LP,
            crate::utils::constants::defaults::INPUT_BOOST_DURATION_MS,
            false,
        )
    }
}
