use std::{sync::Arc, thread, time::Duration};

use anyhow::{Context, Result};
use log::{debug, info};

use crate::{
    datasource::file_path::FB_BLANK_PATH,
    model::driver::BoostDriver,
    utils::{constants::thread_names::DISPLAY_MONITOR_THREAD, file_operate::read_file},
};

// sysfs 不产生 inotify 事件，灭屏节点只能轮询。
// 周期要短于人眼可感知的亮灭屏延迟。
const POLL_INTERVAL_MS: u64 = 100;

fn read_blank_level() -> Result<i64> {
    let content = read_file(FB_BLANK_PATH, 16)?;
    content
        .trim()
        .parse::<i64>()
        .with_context(|| format!("Failed to parse blank level from {FB_BLANK_PATH}"))
}

/// 启动前检查灭屏节点可读，并把初始状态灌进驱动
///
/// 节点缺失视为注册失败，启动中止。
pub fn init_display_state(driver: &Arc<BoostDriver>) -> Result<()> {
    let level = read_blank_level()
        .with_context(|| "Display blank node unavailable, cannot register display source")?;
    apply_blank_level(driver, level);
    info!("Display source registered, initial blank level: {level}");
    Ok(())
}

// 只有 0（完全亮屏）算亮，其余等级一律按灭屏处理
fn apply_blank_level(driver: &Arc<BoostDriver>, level: i64) {
    if level == 0 {
        driver.screen_unblanked();
    } else {
        driver.screen_blanked();
    }
}

/// 显示电源监控线程
///
/// 灭屏转换在策略管线动作之前就被消费掉（早期事件语义），
/// 因为这里直接改状态位并唤醒协调器，不经过任何定时器。
pub fn monitor_display(driver: Arc<BoostDriver>) -> Result<()> {
    info!("{DISPLAY_MONITOR_THREAD} Start");

    let mut last_level = None;
    loop {
        thread::sleep(Duration::from_millis(POLL_INTERVAL_MS));

        let level = match read_blank_level() {
            Ok(l) => l,
            Err(e) => {
                debug!("blank node read failed: {e}");
                continue;
            }
        };

        if last_level == Some(level) {
            continue;
        }
        last_level = Some(level);
        debug!("display blank level -> {level}");
        apply_blank_level(&driver, level);
    }
}
