#![allow(dead_code)]

// File paths
pub const CONFIG_FILE: &str = "/data/adb/cpu_governor/config.toml";
pub const KICK_NODE: &str = "/data/adb/cpu_governor/kick";
pub const LOG_PATH: &str = "/data/adb/cpu_governor/log/cpu_gov.log";
pub const LOG_LEVEL_PATH: &str = "/data/adb/cpu_governor/log/log_level";

// 输入设备
pub const INPUT_DEV_DIR: &str = "/dev/input";
pub const SYS_INPUT_CLASS: &str = "/sys/class/input";

// 显示：fb blank 节点，0 = 完全亮屏，其余一律视为灭屏
pub const FB_BLANK_PATH: &str = "/sys/class/graphics/fb0/blank";

// cpufreq 策略节点下的文件名
pub const SCALING_MIN_FREQ: &str = "scaling_min_freq";
pub const CPUINFO_MIN_FREQ: &str = "cpuinfo_min_freq";

// 延迟 QoS：写入后保持 fd 打开，关闭即撤销请求
pub const CPU_DMA_LATENCY: &str = "/dev/cpu_dma_latency";

// 最深空闲态进入延迟的探测目录
pub const CPUIDLE_DIR: &str = "/sys/devices/system/cpu/cpu0/cpuidle";

// CPU 带宽 devfreq 迟滞参数目录
pub const BW_HWMON_DIR: &str = "/sys/class/devfreq/soc:qcom,cpubw/bw_hwmon";
pub const HYST_TRIGGER_COUNT: &str = "hyst_trigger_count";
pub const HIST_MEMORY: &str = "hist_memory";
pub const HYST_LENGTH: &str = "hyst_length";

// 补充加速组（schedtune top-app）
pub const SCHEDTUNE_BOOST: &str = "/dev/stune/top-app/schedtune.boost";
