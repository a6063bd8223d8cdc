use std::{
    collections::HashSet,
    fs::File,
    io::Read,
    path::Path,
    sync::{Arc, Mutex},
    thread,
};

use anyhow::{Context, Result};
use inotify::WatchMask;
use log::{debug, error, info};

use crate::{
    datasource::file_path::{INPUT_DEV_DIR, SYS_INPUT_CLASS},
    model::driver::BoostDriver,
    utils::{constants::thread_names::INPUT_MONITOR_THREAD, file_operate::read_file, inotify::InotifyWatcher},
};

// 事件位
const EV_KEY: usize = 0x01;
const EV_ABS: usize = 0x03;
// 绝对坐标轴
const ABS_X: usize = 0x00;
const ABS_Y: usize = 0x01;
const ABS_MT_POSITION_X: usize = 0x35;
const ABS_MT_POSITION_Y: usize = 0x36;
// 按键
const BTN_TOUCH: usize = 0x14a;

/// 解析 sysfs capabilities 位图：十六进制字，高位字在前
fn parse_bitmap(raw: &str) -> Vec<u64> {
    raw.split_whitespace()
        .rev()
        .map(|word| u64::from_str_radix(word, 16).unwrap_or(0))
        .collect()
}

fn bit_set(words: &[u64], bit: usize) -> bool {
    words
        .get(bit / 64)
        .is_some_and(|w| w >> (bit % 64) & 1 != 0)
}

struct DeviceCaps {
    ev: Vec<u64>,
    key: Vec<u64>,
    abs: Vec<u64>,
}

impl DeviceCaps {
    fn read(event_name: &str) -> Result<Self> {
        let caps_dir = format!("{SYS_INPUT_CLASS}/{event_name}/device/capabilities");
        let read_map = |name: &str| -> Result<Vec<u64>> {
            Ok(parse_bitmap(&read_file(format!("{caps_dir}/{name}"), 512)?))
        };
        Ok(Self {
            ev: read_map("ev")?,
            key: read_map("key")?,
            abs: read_map("abs")?,
        })
    }

    /// 设备匹配规则：多点触摸屏、触摸板、或任何带按键能力的设备
    fn matches_boost_source(&self) -> bool {
        // 多点触摸屏
        if bit_set(&self.ev, EV_ABS)
            && bit_set(&self.abs, ABS_MT_POSITION_X)
            && bit_set(&self.abs, ABS_MT_POSITION_Y)
        {
            return true;
        }
        // 触摸板
        if bit_set(&self.key, BTN_TOUCH) && bit_set(&self.abs, ABS_X) && bit_set(&self.abs, ABS_Y) {
            return true;
        }
        // 键盘/按键
        bit_set(&self.ev, EV_KEY)
    }
}

// 已连接设备表，防止热插拔事件与初始扫描重复挂接
type Registry = Arc<Mutex<HashSet<String>>>;

/// 连接一个输入设备：打开设备节点并启动读取线程
///
/// 单个设备连接失败只影响它自己，记录后继续运行。
/// 线程共享的驱动上下文在注册后只读，并发触发无需互斥。
fn connect(driver: &Arc<BoostDriver>, registry: &Registry, event_name: &str) {
    match DeviceCaps::read(event_name) {
        Ok(caps) if caps.matches_boost_source() => {}
        Ok(_) => {
            debug!("{event_name} does not match any boost source rule");
            return;
        }
        Err(e) => {
            debug!("Failed to read capabilities of {event_name}: {e}");
            return;
        }
    }

    {
        let mut connected = registry.lock().unwrap();
        if !connected.insert(event_name.to_string()) {
            return;
        }
    }

    let dev_path = format!("{INPUT_DEV_DIR}/{event_name}");
    let file = match File::open(&dev_path) {
        Ok(f) => f,
        Err(e) => {
            // 相当于连接回调里的注册失败：只放弃这一个设备
            error!("Failed to open input device {dev_path}: {e}");
            registry.lock().unwrap().remove(event_name);
            return;
        }
    };

    info!("Input device connected: {event_name}");

    let driver = Arc::clone(driver);
    let registry_for_thread = Arc::clone(registry);
    let name = event_name.to_string();
    let spawned = thread::Builder::new()
        .name(format!("InputReader-{name}"))
        .spawn(move || read_events(driver, registry_for_thread, name, file));
    if let Err(e) = spawned {
        error!("Failed to spawn reader for {event_name}: {e}");
        registry.lock().unwrap().remove(event_name);
    }
}

/// 设备读取循环：任何事件都触发 kick，类型/代码/值无关
fn read_events(driver: Arc<BoostDriver>, registry: Registry, name: String, mut file: File) {
    let mut buf = [0u8; size_of::<libc::input_event>()];
    loop {
        match file.read_exact(&mut buf) {
            Ok(()) => driver.kick(),
            Err(e) => {
                // 设备拔出或句柄失效：断开并释放
                info!("Input device disconnected: {name} ({e})");
                registry.lock().unwrap().remove(&name);
                return;
            }
        }
    }
}

/// 初始扫描现有设备，失败视为启动错误
pub fn scan_devices(driver: &Arc<BoostDriver>, registry: &Registry) -> Result<()> {
    let entries = std::fs::read_dir(INPUT_DEV_DIR)
        .with_context(|| format!("Failed to scan {INPUT_DEV_DIR}"))?;

    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with("event") {
            connect(driver, registry, &name);
        }
    }
    Ok(())
}

pub fn new_registry() -> Registry {
    Arc::new(Mutex::new(HashSet::new()))
}

/// 在监控线程起跑前注册热插拔监控，失败视为启动错误
pub fn watch_input_dir() -> Result<InotifyWatcher> {
    let mut inotify = InotifyWatcher::new()?;
    inotify.add(
        Path::new(INPUT_DEV_DIR),
        WatchMask::CREATE | WatchMask::DELETE,
    )?;
    Ok(inotify)
}

/// 输入热插拔监控线程
pub fn monitor_input(
    driver: Arc<BoostDriver>,
    registry: Registry,
    mut inotify: InotifyWatcher,
) -> Result<()> {
    info!("{INPUT_MONITOR_THREAD} Start");

    loop {
        for event in inotify.wait_and_handle()? {
            let Some(name) = event.name else { continue };
            if !name.starts_with("event") {
                continue;
            }
            if event.mask.contains(inotify::EventMask::CREATE) {
                connect(&driver, &registry, &name);
            }
            // DELETE 无需处理：读取线程会因读错误自行断开
        }
    }
}
