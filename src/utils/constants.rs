/// CPU Governor 常量定义
/// 将分散的常量集中管理，提高代码可维护性
pub const NOTES: &str = "CPU Input Boost Frequency Floor Governor";
pub const AUTHOR: &str = "Author: walika @CoolApk, Tools-cx-app @GitHub";
pub const SPECIAL: &str =
    "Special Thanks: HamJin @CoolApk, asto18089 @CoolApk and helloklf @GitHub";
pub const VERSION: &str = "Version: v1.2.0";

/// 线程名
pub mod thread_names {
    pub const COORDINATOR_THREAD: &str = "cpu_boostd";
    pub const INPUT_TIMER_THREAD: &str = "InputBoostTimer";
    pub const MAX_TIMER_THREAD: &str = "MaxBoostTimer";
    pub const INPUT_MONITOR_THREAD: &str = "InputHotplugWatcher";
    pub const DISPLAY_MONITOR_THREAD: &str = "DisplayBlankWatcher";
    pub const KICK_NODE_THREAD: &str = "KickNodeWatcher";
    pub const CONFIG_MONITOR_THREAD: &str = "ConfigWatcher";
    pub const LOG_LEVEL_THREAD: &str = "LogLevelMonitor";
}

/// 缺省可调参数
pub mod defaults {
    pub const IDLE_MIN_FREQ_LP: u64 = 460_800; // KHz
    pub const BOOST_MIN_FREQ_LP: u64 = 1_036_800; // KHz
    pub const INPUT_BOOST_DURATION_MS: u64 = 500;
    /// 探测不到 cpuidle 时假定的最深空闲态进入延迟（微秒）
    pub const DEEPEST_IDLE_LATENCY_US: u32 = 800;
}

/// 带宽迟滞三元组 (hyst_trigger_count, hist_memory, hyst_length)
pub mod hyst {
    pub const DEFAULT: (u32, u32, u32) = (3, 20, 10);
    pub const BOOSTED: (u32, u32, u32) = (0, 0, 0);
    pub const IDLE: (u32, u32, u32) = (5, 20, 10);
}
