use std::path::PathBuf;

use anyhow::{Context, Result};
use log::info;
use serde::Deserialize;

use crate::model::cluster::ClusterClass;
use crate::model::tunables::Tunables;
use crate::utils::constants::defaults;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BoostSection {
    /// 熄屏楼层（KHz，低功耗簇类）
    pub idle_min_freq_lp: u64,
    /// 加速楼层（KHz，低功耗簇类）
    pub boost_min_freq_lp: u64,
    /// 输入加速时长，0 禁用输入触发的加速
    pub input_boost_duration_ms: u64,
    /// 只抑制补充加速组切换
    pub disable_boost: bool,
}

impl Default for BoostSection {
    fn default() -> Self {
        Self {
            idle_min_freq_lp: defaults::IDLE_MIN_FREQ_LP,
            boost_min_freq_lp: defaults::BOOST_MIN_FREQ_LP,
            input_boost_duration_ms: defaults::INPUT_BOOST_DURATION_MS,
            disable_boost: false,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ClusterSection {
    pub name: String,
    pub class: ClusterClass,
    /// cpufreq 策略目录，如 /sys/devices/system/cpu/cpufreq/policy0
    pub policy_path: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct GovernorConfig {
    #[serde(default)]
    pub boost: BoostSection,
    #[serde(default, rename = "cluster")]
    pub clusters: Vec<ClusterSection>,
}

pub fn config_read(config_file: &str) -> Result<GovernorConfig> {
    let content = std::fs::read_to_string(config_file)
        .with_context(|| format!("Failed to open config file: {config_file}"))?;

    let config: GovernorConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {config_file}"))?;

    info!(
        "Config loaded: idle={}KHz, boost={}KHz, duration={}ms, disable_boost={}, {} cluster(s)",
        config.boost.idle_min_freq_lp,
        config.boost.boost_min_freq_lp,
        config.boost.input_boost_duration_ms,
        config.boost.disable_boost,
        config.clusters.len()
    );

    Ok(config)
}

/// 把 boost 段写进运行期可调参数，下一次重算生效
pub fn apply_tunables(config: &GovernorConfig, tunables: &Tunables) {
    tunables.set_idle_min_freq_lp(config.boost.idle_min_freq_lp);
    tunables.set_boost_min_freq_lp(config.boost.boost_min_freq_lp);
    tunables.set_input_boost_duration_ms(config.boost.input_boost_duration_ms);
    tunables.set_disable_boost(config.boost.disable_boost);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[boost]
idle_min_freq_lp = 300000
boost_min_freq_lp = 768000
input_boost_duration_ms = 500

[[cluster]]
name = "lp"
class = "low_power"
policy_path = "/sys/devices/system/cpu/cpufreq/policy0"

[[cluster]]
name = "perf"
class = "performance"
policy_path = "/sys/devices/system/cpu/cpufreq/policy4"
"#;

    #[test]
    fn parses_full_config() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(SAMPLE.as_bytes()).unwrap();
        let config = config_read(f.path().to_str().unwrap()).unwrap();

        assert_eq!(config.boost.idle_min_freq_lp, 300_000);
        assert_eq!(config.boost.boost_min_freq_lp, 768_000);
        assert_eq!(config.boost.input_boost_duration_ms, 500);
        assert!(!config.boost.disable_boost);
        assert_eq!(config.clusters.len(), 2);
        assert_eq!(config.clusters[0].class, ClusterClass::LowPower);
        assert_eq!(config.clusters[1].class, ClusterClass::Performance);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"").unwrap();
        let config = config_read(f.path().to_str().unwrap()).unwrap();
        assert_eq!(config.boost.input_boost_duration_ms, defaults::INPUT_BOOST_DURATION_MS);
        assert!(config.clusters.is_empty());
    }

    #[test]
    fn apply_updates_tunables() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(SAMPLE.as_bytes()).unwrap();
        let config = config_read(f.path().to_str().unwrap()).unwrap();

        let tunables = Tunables::default();
        apply_tunables(&config, &tunables);
        assert_eq!(tunables.boost_min_freq_lp(), 768_000);
        assert_eq!(tunables.input_boost_duration_ms(), 500);
    }
}
