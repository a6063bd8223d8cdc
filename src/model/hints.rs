use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, info, warn};

use crate::datasource::file_path::{
    BW_HWMON_DIR, CPU_DMA_LATENCY, HIST_MEMORY, HYST_LENGTH, HYST_TRIGGER_COUNT, SCHEDTUNE_BOOST,
};
use crate::model::policy::{HystProfile, PolicyHints};
use crate::model::tunables::Tunables;
use crate::utils::constants::hyst;
use crate::utils::file_operate::{read_u64, write_file_safe};

/// 延迟 QoS 下沉
///
/// /dev/cpu_dma_latency 的请求随 fd 关闭而撤销，所以句柄常开，
/// 值变化时原地重写。节点不存在（非 Android 内核等）时整体退化为空操作。
struct LatencyQosSink {
    file: Mutex<Option<File>>,
    last_us: AtomicU32,
}

impl LatencyQosSink {
    fn new() -> Self {
        let file = OpenOptions::new()
            .write(true)
            .open(CPU_DMA_LATENCY)
            .map_err(|e| {
                info!("Latency QoS unavailable ({CPU_DMA_LATENCY}): {e}");
                e
            })
            .ok();

        Self {
            file: Mutex::new(file),
            last_us: AtomicU32::new(u32::MAX),
        }
    }

    fn disabled() -> Self {
        Self {
            file: Mutex::new(None),
            last_us: AtomicU32::new(u32::MAX),
        }
    }

    fn apply(&self, latency_us: u32) {
        if self.last_us.swap(latency_us, Ordering::Relaxed) == latency_us {
            return;
        }
        let mut guard = self.file.lock().unwrap();
        if let Some(file) = guard.as_mut() {
            // 内核期望原生字节序的 32 位整数
            if let Err(e) = file.write_all(&latency_us.to_ne_bytes()) {
                warn!("Failed to update latency QoS: {e}");
            } else {
                debug!("latency QoS -> {latency_us}us");
            }
        }
    }
}

/// CPU 带宽迟滞下沉，按档位写 bw_hwmon 的三个参数
struct BwHysteresisSink {
    dir: PathBuf,
    last: AtomicU8,
}

impl BwHysteresisSink {
    fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            last: AtomicU8::new(u8::MAX),
        }
    }

    fn apply(&self, profile: HystProfile) {
        let tag = profile as u8;
        if self.last.swap(tag, Ordering::Relaxed) == tag {
            return;
        }
        let (trigger_count, memory, length) = match profile {
            HystProfile::Idle => hyst::IDLE,
            HystProfile::Default => hyst::DEFAULT,
            HystProfile::Boosted => hyst::BOOSTED,
        };
        let _ = write_file_safe(self.dir.join(HYST_TRIGGER_COUNT), trigger_count.to_string());
        let _ = write_file_safe(self.dir.join(HIST_MEMORY), memory.to_string());
        let _ = write_file_safe(self.dir.join(HYST_LENGTH), length.to_string());
        debug!("bw hysteresis -> {profile:?}");
    }
}

/// 补充加速组（schedtune top-app）开关
///
/// 全局 disable_boost 只抑制这一个副作用，其余提示照常下推。
struct BoostGroupSink {
    path: PathBuf,
    enabled_value: u64,
    tunables: Arc<Tunables>,
    last: AtomicU8,
}

impl BoostGroupSink {
    fn new(path: PathBuf, tunables: Arc<Tunables>) -> Self {
        // 记住启动时的 boost 值，关断后恢复原值而不是猜一个
        let enabled_value = read_u64(&path).unwrap_or(10);

        Self {
            path,
            enabled_value,
            tunables,
            last: AtomicU8::new(u8::MAX),
        }
    }

    fn apply(&self, enabled: bool) {
        if self.tunables.disable_boost() {
            return;
        }
        let tag = enabled as u8;
        if self.last.swap(tag, Ordering::Relaxed) == tag {
            return;
        }
        let value = if enabled { self.enabled_value } else { 0 };
        let _ = write_file_safe(&self.path, value.to_string());
        debug!("boost group -> {}", if enabled { "enabled" } else { "disabled" });
    }
}

/// 次级提示下沉的集合，随每次策略重算一起应用
pub struct HintSinks {
    latency: LatencyQosSink,
    bw: BwHysteresisSink,
    boost_group: BoostGroupSink,
}

impl HintSinks {
    pub fn new(tunables: Arc<Tunables>) -> Self {
        Self {
            latency: LatencyQosSink::new(),
            bw: BwHysteresisSink::new(PathBuf::from(BW_HWMON_DIR)),
            boost_group: BoostGroupSink::new(PathBuf::from(SCHEDTUNE_BOOST), tunables),
        }
    }

    /// 全部退化为空操作的版本，精简配置和测试用
    pub fn disabled(tunables: Arc<Tunables>) -> Self {
        Self {
            latency: LatencyQosSink::disabled(),
            bw: BwHysteresisSink::new(PathBuf::from("/nonexistent")),
            boost_group: BoostGroupSink {
                path: PathBuf::from("/nonexistent"),
                enabled_value: 0,
                tunables,
                last: AtomicU8::new(u8::MAX),
            },
        }
    }

    pub fn apply(&self, hints: PolicyHints) {
        self.latency.apply(hints.latency_us);
        self.bw.apply(hints.hyst);
        self.boost_group.apply(hints.boost_group_enabled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn hyst_profile_writes_triple() {
        let dir = tempfile::tempdir().unwrap();
        for node in [HYST_TRIGGER_COUNT, HIST_MEMORY, HYST_LENGTH] {
            fs::write(dir.path().join(node), "0").unwrap();
        }
        let sink = BwHysteresisSink::new(dir.path().to_path_buf());

        sink.apply(HystProfile::Boosted);
        assert_eq!(
            fs::read_to_string(dir.path().join(HYST_TRIGGER_COUNT)).unwrap(),
            "0"
        );

        sink.apply(HystProfile::Default);
        assert_eq!(
            fs::read_to_string(dir.path().join(HYST_TRIGGER_COUNT)).unwrap(),
            "3"
        );
        assert_eq!(fs::read_to_string(dir.path().join(HIST_MEMORY)).unwrap(), "20");
        assert_eq!(fs::read_to_string(dir.path().join(HYST_LENGTH)).unwrap(), "10");
    }

    #[test]
    fn boost_group_toggle_restores_initial_value() {
        let dir = tempfile::tempdir().unwrap();
        let node = dir.path().join("schedtune.boost");
        fs::write(&node, "15").unwrap();

        let tunables = Arc::new(Tunables::new(1, 1, 1, false));
        let sink = BoostGroupSink::new(node.clone(), tunables);
        sink.apply(false);
        assert_eq!(fs::read_to_string(&node).unwrap(), "0");
        sink.apply(true);
        assert_eq!(fs::read_to_string(&node).unwrap(), "15");
    }

    #[test]
    fn disable_boost_suppresses_only_group_toggle() {
        let dir = tempfile::tempdir().unwrap();
        let node = dir.path().join("schedtune.boost");
        fs::write(&node, "15").unwrap();

        let tunables = Arc::new(Tunables::new(1, 1, 1, true));
        let sink = BoostGroupSink::new(node.clone(), tunables);
        sink.apply(false);
        // 开关被全局旗标抑制，原值不动
        assert_eq!(fs::read_to_string(&node).unwrap(), "15");
    }
}
