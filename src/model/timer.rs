use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::debug;

struct Slot {
    deadline: Option<Instant>,
    stop: bool,
}

struct Shared {
    slot: Mutex<Slot>,
    cond: Condvar,
}

/// 单槽去抖定时器，每种加速各持有一个
///
/// arm() 总是替换尚未触发的截止时间而不是排队第二次触发，
/// 语义上对应内核的 mod_delayed_work。到期后只执行一次回调。
pub struct BoostTimer {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl BoostTimer {
    /// 启动定时器线程，到期时执行 on_fire
    ///
    /// 线程起不来就返回错误：没有工作线程的定时器接受 arm()
    /// 却永远不触发，置上的加速位再也清不掉。
    pub fn spawn<F>(name: &'static str, on_fire: F) -> Result<Self>
    where
        F: Fn() + Send + 'static,
    {
        let shared = Arc::new(Shared {
            slot: Mutex::new(Slot {
                deadline: None,
                stop: false,
            }),
            cond: Condvar::new(),
        });

        let worker = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run(&worker, on_fire))
            .with_context(|| format!("Failed to spawn timer thread {name}"))?;

        Ok(Self {
            shared,
            handle: Some(handle),
        })
    }

    /// 置定时器，替换任何尚未触发的截止时间
    pub fn arm(&self, duration: Duration) {
        let mut slot = self.shared.slot.lock().unwrap();
        slot.deadline = Some(Instant::now() + duration);
        drop(slot);
        self.shared.cond.notify_all();
    }

    pub fn disarm(&self) {
        let mut slot = self.shared.slot.lock().unwrap();
        slot.deadline = None;
        drop(slot);
        self.shared.cond.notify_all();
    }

    pub fn pending(&self) -> bool {
        self.shared.slot.lock().unwrap().deadline.is_some()
    }
}

fn run<F>(shared: &Shared, on_fire: F)
where
    F: Fn(),
{
    let mut slot = shared.slot.lock().unwrap();
    loop {
        if slot.stop {
            return;
        }
        match slot.deadline {
            None => {
                slot = shared.cond.wait(slot).unwrap();
            }
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    // 到期：先清空槽位再在无锁状态下执行回调，
                    // 回调期间新的 arm() 会正常写入槽位并在下一轮生效
                    slot.deadline = None;
                    drop(slot);
                    on_fire();
                    slot = shared.slot.lock().unwrap();
                } else {
                    let (guard, _) = shared.cond.wait_timeout(slot, deadline - now).unwrap();
                    slot = guard;
                }
            }
        }
    }
}

impl Drop for BoostTimer {
    fn drop(&mut self) {
        {
            let mut slot = self.shared.slot.lock().unwrap();
            slot.stop = true;
        }
        self.shared.cond.notify_all();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        debug!("boost timer stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn fires_once_after_duration() {
        let fired = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&fired);
        let timer = BoostTimer::spawn("test_timer", move || {
            f.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        timer.arm(Duration::from_millis(30));
        assert!(timer.pending());
        thread::sleep(Duration::from_millis(100));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!timer.pending());
    }

    #[test]
    fn rearm_replaces_pending_deadline() {
        let fired = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&fired);
        let timer = BoostTimer::spawn("test_timer", move || {
            f.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        timer.arm(Duration::from_millis(50));
        thread::sleep(Duration::from_millis(20));
        timer.arm(Duration::from_millis(80));

        // 原本 50ms 的触发点已被替换
        thread::sleep(Duration::from_millis(50));
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        thread::sleep(Duration::from_millis(80));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn disarm_cancels() {
        let fired = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&fired);
        let timer = BoostTimer::spawn("test_timer", move || {
            f.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        timer.arm(Duration::from_millis(30));
        timer.disarm();
        thread::sleep(Duration::from_millis(80));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn zero_duration_fires_immediately() {
        let fired = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&fired);
        let timer = BoostTimer::spawn("test_timer", move || {
            f.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        timer.arm(Duration::from_millis(0));
        thread::sleep(Duration::from_millis(50));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
