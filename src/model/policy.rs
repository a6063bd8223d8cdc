use std::sync::Arc;

use crate::model::boost_state::BoostState;
use crate::model::cluster::ClusterClass;
use crate::model::tunables::Tunables;

/// /dev/cpu_dma_latency 的默认值（微秒），即不约束任何空闲态
pub const DEFAULT_LATENCY_US: u32 = 2_000_000_000;

/// 带宽迟滞档位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HystProfile {
    Idle,
    Default,
    Boosted,
}

/// 随楼层一起下推的次级提示
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyHints {
    pub latency_us: u32,
    pub hyst: HystProfile,
    pub boost_group_enabled: bool,
}

/// 频率策略通知桥
///
/// cpufreq 下沉在提交每个簇的新策略前同步调用这里。
/// 必须无阻塞、无分配、无失败路径：只读一份状态快照和几个原子参数，
/// 算出楼层和提示就返回。可以在多个簇上并发调用。
pub struct PolicyBridge {
    tunables: Arc<Tunables>,
    // 最深空闲态的进入延迟 + 1，下沉初始化时探测一次
    max_boost_latency_us: u32,
}

impl PolicyBridge {
    pub fn new(tunables: Arc<Tunables>, deepest_idle_latency_us: u32) -> Self {
        Self {
            tunables,
            max_boost_latency_us: deepest_idle_latency_us.saturating_add(1),
        }
    }

    /// 计算一个簇的最低频率约束（KHz）
    ///
    /// 楼层只对低功耗簇类配置；性能簇类恒为自身的绝对下限。
    pub fn floor_khz(&self, state: BoostState, class: ClusterClass, cluster_min_khz: u64) -> u64 {
        let class_floor = |khz: u64| match class {
            ClusterClass::LowPower => khz.max(cluster_min_khz),
            ClusterClass::Performance => cluster_min_khz,
        };

        if state.screen_off() {
            return class_floor(self.tunables.idle_min_freq_lp());
        }
        if state.boost_active() {
            return class_floor(self.tunables.boost_min_freq_lp());
        }
        cluster_min_khz
    }

    /// 计算次级提示
    ///
    /// 两种加速重叠时的优先级约定：延迟只看 max-boost，
    /// 迟滞看两者之或，加速组只看亮灭屏。
    pub fn hints(&self, state: BoostState) -> PolicyHints {
        if state.screen_off() {
            return PolicyHints {
                latency_us: DEFAULT_LATENCY_US,
                hyst: HystProfile::Idle,
                boost_group_enabled: false,
            };
        }

        let latency_us = if state.max_boost() {
            // 卡在最深空闲态入口之上，max-boost 期间不允许深睡
            self.max_boost_latency_us
        } else {
            DEFAULT_LATENCY_US
        };

        let hyst = if state.input_boost() || state.max_boost() {
            HystProfile::Boosted
        } else {
            HystProfile::Default
        };

        PolicyHints {
            latency_us,
            hyst,
            boost_group_enabled: true,
        }
    }
}
