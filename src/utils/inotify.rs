use std::{collections::HashMap, ffi::OsStr, path::Path, thread, time::Duration};

use anyhow::{Context, Result};
use inotify::{EventMask, Inotify, WatchMask};

const WAIT_REPLACE_US: u64 = 500 * 1000;

#[derive(Debug, Clone)]
pub struct SimpleEvent {
    pub path: String,
    pub mask: EventMask,
    pub name: Option<String>,
}

/// inotify 封装
///
/// 配置重载、日志等级、灭屏节点、kick 节点和输入热插拔都走这里。
/// 被监控的文件被删除或原子替换（编辑器写临时文件再 rename）时
/// 自动重新挂上监控。
pub struct InotifyWatcher {
    inotify: Inotify,
    watches: HashMap<inotify::WatchDescriptor, String>,
}

impl InotifyWatcher {
    pub fn new() -> Result<Self> {
        let inotify = Inotify::init().with_context(|| "Failed to initialize inotify")?;

        Ok(Self {
            inotify,
            watches: HashMap::new(),
        })
    }

    pub fn add<P: AsRef<Path>>(&mut self, path: P, mask: WatchMask) -> Result<()> {
        let path_ref = path.as_ref();
        let path_str = path_ref
            .to_str()
            .with_context(|| format!("Invalid path: {}", path_ref.display()))?;

        let mask = mask | WatchMask::DELETE_SELF | WatchMask::MOVE_SELF;

        let wd = self
            .inotify
            .watches()
            .add(path_ref, mask)
            .with_context(|| format!("Failed to add watch for: {}", path_ref.display()))?;

        self.watches.insert(wd, path_str.to_string());

        Ok(())
    }

    /// 阻塞等待一批事件，返回前自动处理监控失效
    pub fn wait_and_handle(&mut self) -> Result<Vec<SimpleEvent>> {
        let mut buffer = [0; 4096];
        let mut simple_events = Vec::new();
        let mut lost_watches = Vec::new();

        let events = self
            .inotify
            .read_events_blocking(&mut buffer)
            .with_context(|| "Failed to read inotify events")?;

        for event in events {
            let Some(path) = self.watches.get(&event.wd) else {
                continue;
            };

            simple_events.push(SimpleEvent {
                path: path.clone(),
                mask: event.mask,
                name: event.name.map(OsStr::to_string_lossy).map(String::from),
            });

            if event.mask.contains(EventMask::IGNORED)
                || event.mask.contains(EventMask::DELETE_SELF)
                || event.mask.contains(EventMask::MOVE_SELF)
            {
                lost_watches.push((event.wd.clone(), path.clone()));
            }
        }

        for (wd, path) in lost_watches {
            // 等待替换操作落盘，再把监控挂回新的 inode
            if !Path::new(&path).exists() {
                thread::sleep(Duration::from_micros(WAIT_REPLACE_US));
            }

            let mask = WatchMask::MODIFY
                | WatchMask::CLOSE_WRITE
                | WatchMask::DELETE_SELF
                | WatchMask::MOVE_SELF;

            let new_wd = self
                .inotify
                .watches()
                .add(&path, mask)
                .with_context(|| format!("Failed to re-add watch for: {path}"))?;

            self.watches.remove(&wd);
            self.watches.insert(new_wd, path);
        }

        Ok(simple_events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_on_missing_path_is_an_error() {
        // 挂接失败必须在注册时报错，调用方靠 ? 中止启动，
        // 而不是进了监控循环才发现监控根本没挂上
        let mut watcher = InotifyWatcher::new().unwrap();
        assert!(
            watcher
                .add("/nonexistent/governor/node", WatchMask::MODIFY)
                .is_err()
        );
    }

    #[test]
    fn registration_on_existing_file_succeeds() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut watcher = InotifyWatcher::new().unwrap();
        assert!(
            watcher
                .add(file.path(), WatchMask::CLOSE_WRITE | WatchMask::MODIFY)
                .is_ok()
        );
    }
}
