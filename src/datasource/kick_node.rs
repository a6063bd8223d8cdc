use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use inotify::WatchMask;
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    datasource::file_path::KICK_NODE,
    model::driver::BoostDriver,
    utils::{constants::thread_names::KICK_NODE_THREAD, file_operate::read_file, inotify::InotifyWatcher},
};

static KICK_MAX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^kick_max\s+(\d+)$").unwrap());

/// 解析控制节点里的一行命令
///
/// `kick` 与 `kick_max <ms>` 之外的内容一律拒绝。
fn dispatch_line(driver: &Arc<BoostDriver>, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    if line == "kick" {
        debug!("external kick");
        driver.kick();
        return;
    }

    if let Some(caps) = KICK_MAX_RE.captures(line) {
        match caps[1].parse::<u64>() {
            Ok(ms) => {
                debug!("external kick_max({ms})");
                driver.kick_max(ms);
            }
            Err(_) => warn!("kick_max duration out of range: {line}"),
        }
        return;
    }

    warn!("Unknown kick command: {line}");
}

/// 确保控制节点存在，缺失时创建空文件
///
/// 创建失败视为注册失败，启动中止。
pub fn ensure_kick_node() -> Result<()> {
    let path = Path::new(KICK_NODE);
    if !path.exists() {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(path, "")
            .with_context(|| format!("Failed to create kick node {KICK_NODE}"))?;
    }
    Ok(())
}

/// 在监控线程起跑前注册控制节点监控，失败视为启动错误
pub fn watch_kick_node() -> Result<InotifyWatcher> {
    let mut inotify = InotifyWatcher::new()?;
    inotify.add(KICK_NODE, WatchMask::CLOSE_WRITE | WatchMask::MODIFY)?;
    Ok(inotify)
}

/// 外部加速请求监控线程：其他子系统写控制节点来调用两个入口
pub fn monitor_kick_node(driver: Arc<BoostDriver>, mut inotify: InotifyWatcher) -> Result<()> {
    info!("{KICK_NODE_THREAD} Start");

    loop {
        inotify.wait_and_handle()?;

        let content = match read_file(KICK_NODE, 256) {
            Ok(c) => c,
            Err(e) => {
                debug!("kick node read failed: {e}");
                continue;
            }
        };

        for line in content.lines() {
            dispatch_line(&driver, line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tunables::Tunables;
    use std::time::Duration;

    fn driver() -> Arc<BoostDriver> {
        BoostDriver::new(Arc::new(Tunables::new(300_000, 768_000, 200, false))).unwrap()
    }

    #[test]
    fn kick_command_sets_input_boost() {
        let d = driver();
        dispatch_line(&d, "kick");
        assert!(d.snapshot().input_boost());
    }

    #[test]
    fn kick_max_command_sets_max_boost_with_duration() {
        let d = driver();
        dispatch_line(&d, "kick_max 80");
        assert!(d.snapshot().max_boost());
        std::thread::sleep(Duration::from_millis(160));
        assert!(!d.snapshot().max_boost());
    }

    #[test]
    fn garbage_is_rejected() {
        let d = driver();
        dispatch_line(&d, "boost please");
        dispatch_line(&d, "kick_max");
        dispatch_line(&d, "kick_max -5");
        dispatch_line(&d, "");
        assert_eq!(d.snapshot().bits(), 0);
    }
}
