use std::sync::Arc;

use anyhow::Result;
use inotify::WatchMask;
use log::{error, info};

use crate::{
    datasource::{
        config_parser::{apply_tunables, config_read},
        file_path::CONFIG_FILE,
    },
    model::tunables::Tunables,
    utils::{constants::thread_names::CONFIG_MONITOR_THREAD, inotify::InotifyWatcher},
};

/// 在监控线程起跑前注册配置文件监控，失败视为启动错误
pub fn watch_config() -> Result<InotifyWatcher> {
    let mut inotify = InotifyWatcher::new()?;
    inotify.add(CONFIG_FILE, WatchMask::CLOSE_WRITE | WatchMask::MODIFY)?;
    Ok(inotify)
}

/// 配置文件监控线程
///
/// boost 段热生效；簇表只在启动时读取，改了簇表要重启才生效。
pub fn monitor_config(tunables: Arc<Tunables>, mut inotify: InotifyWatcher) -> Result<()> {
    info!("{CONFIG_MONITOR_THREAD} Start");

    loop {
        inotify.wait_and_handle()?;

        match config_read(CONFIG_FILE) {
            Ok(config) => {
                apply_tunables(&config, &tunables);
                info!("Config reloaded");
            }
            Err(e) => {
                error!("Reload config FAILED, keeping previous values: {e}");
            }
        }
    }
}
