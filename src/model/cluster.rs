use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Deserialize;

use crate::model::boost_state::BoostState;
use crate::model::coordinator::PolicyRefresh;
use crate::model::hints::HintSinks;
use crate::model::policy::PolicyBridge;
use crate::datasource::file_path::{CPUINFO_MIN_FREQ, SCALING_MIN_FREQ};
use crate::utils::file_operate::{read_u64, write_file_safe};

/// 簇类别：低功耗簇有独立配置的楼层，性能簇恒用自身下限
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterClass {
    LowPower,
    Performance,
}

/// 一个共享频率域的处理器簇
pub struct Cluster {
    pub name: String,
    pub class: ClusterClass,
    pub policy_path: PathBuf,
    /// 硬件绝对下限（KHz），初始化时从 cpuinfo_min_freq 探测
    pub cpuinfo_min_khz: u64,
}

impl Cluster {
    pub fn probe(name: String, class: ClusterClass, policy_path: PathBuf) -> Self {
        let cpuinfo_min_khz = match read_u64(policy_path.join(CPUINFO_MIN_FREQ)) {
            Ok(khz) => khz,
            Err(e) => {
                warn!("Failed to probe cpuinfo_min_freq for {name}: {e}");
                0
            }
        };
        info!(
            "Cluster {name}: class={class:?}, min={cpuinfo_min_khz}KHz, path={}",
            policy_path.display()
        );

        Self {
            name,
            class,
            policy_path,
            cpuinfo_min_khz,
        }
    }

    fn online(&self) -> bool {
        self.policy_path.exists()
    }

    fn commit_floor(&self, floor_khz: u64) {
        // 簇下线再上线时内核重建 policy 并复位 scaling_min_freq，
        // 不能按上次写过的值去重，每次重算都落盘
        let node = self.policy_path.join(SCALING_MIN_FREQ);
        let _ = write_file_safe(node, floor_khz.to_string());
    }
}

/// cpufreq 策略下沉
///
/// 每次重算先同步调用通知桥取楼层和提示，再提交给所有在线簇。
/// 桥的返回值优先于任何其他最低频率来源。
pub struct CpufreqSink {
    clusters: Vec<Cluster>,
    bridge: PolicyBridge,
    hints: HintSinks,
}

impl CpufreqSink {
    pub fn new(clusters: Vec<Cluster>, bridge: PolicyBridge, hints: HintSinks) -> Self {
        Self {
            clusters,
            bridge,
            hints,
        }
    }
}

impl PolicyRefresh for CpufreqSink {
    fn refresh(&self, state: BoostState) {
        for cluster in &self.clusters {
            if !cluster.online() {
                continue;
            }
            let floor = self
                .bridge
                .floor_khz(state, cluster.class, cluster.cpuinfo_min_khz);
            cluster.commit_floor(floor);
        }

        self.hints.apply(self.bridge.hints(state));
    }
}

/// 从 cpuidle 探测最深空闲态的进入延迟（微秒）
pub fn probe_deepest_idle_latency_us<P: AsRef<Path>>(cpuidle_dir: P) -> Option<u32> {
    let entries = std::fs::read_dir(cpuidle_dir).ok()?;
    let mut deepest = None;
    for entry in entries.flatten() {
        let latency_path = entry.path().join("latency");
        if let Ok(latency) = read_u64(latency_path) {
            let latency = latency as u32;
            if deepest.is_none_or(|d| latency > d) {
                deepest = Some(latency);
            }
        }
    }
    deepest
}
