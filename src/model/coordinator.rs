use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::model::boost_state::BoostState;
use crate::model::driver::BoostDriver;
use crate::utils::constants::thread_names::COORDINATOR_THREAD;

/// 策略重算的接收方
///
/// 协调器每观察到一个新的状态值就调用一次 refresh。
/// 生产实现是 cpufreq 下沉，测试里换成计数桩。
pub trait PolicyRefresh: Send + Sync {
    fn refresh(&self, state: BoostState);
}

/// 策略协调器 - 唯一的消费者
///
/// 把高频、竞态的触发折叠成低频、串行的策略下推：
/// 状态值与上次处理过的值相同的唤醒是空操作，
/// 每个观察到的不同状态值恰好触发一次重算。
pub struct PolicyCoordinator {
    driver: Arc<BoostDriver>,
    sink: Arc<dyn PolicyRefresh>,
}

impl PolicyCoordinator {
    pub fn new(driver: Arc<BoostDriver>, sink: Arc<dyn PolicyRefresh>) -> Self {
        Self { driver, sink }
    }

    pub fn spawn(self) -> Result<JoinHandle<()>> {
        thread::Builder::new()
            .name(COORDINATOR_THREAD.to_string())
            .spawn(move || self.run())
            .with_context(|| "Failed to spawn policy coordinator thread")
    }

    /// 工作循环：等待状态变化，重算，再等待
    ///
    /// 等待谓词每次都重读当前状态而不是只看一个入队标志，
    /// 所以唤醒不会丢；停止信号优先于任何待处理的状态变化。
    pub fn run(&self) {
        elevate_priority();
        info!("{COORDINATOR_THREAD} Start");

        // 哨兵值保证启动后立刻下推一次当前状态
        let mut last_acted = u32::MAX;
        loop {
            let waker = self.driver.waker();
            let mut guard = waker.lock();
            let curr = loop {
                if self.driver.stopping() {
                    info!("{COORDINATOR_THREAD} Stop");
                    return;
                }
                let curr = self.driver.state_bits();
                if curr != last_acted {
                    break curr;
                }
                guard = waker.wait(guard);
            };
            drop(guard);

            last_acted = curr;
            let state = BoostState::from_bits(curr);
            debug!("recompute for state {curr:#05b}");
            self.sink.refresh(state);
        }
    }
}

/// 把当前线程提升到实时优先级
///
/// 楼层变化是延迟敏感的，不能被普通负载饿死。
/// 没有权限时退回到提高 nice 值。
fn elevate_priority() {
    unsafe {
        let param = libc::sched_param {
            sched_priority: libc::sched_get_priority_max(libc::SCHED_FIFO),
        };
        if libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) == 0 {
            debug!("coordinator running with SCHED_FIFO");
            return;
        }
        if libc::setpriority(libc::PRIO_PROCESS, 0, -10) == 0 {
            warn!("SCHED_FIFO unavailable, fell back to nice -10");
        } else {
            warn!("Failed to elevate coordinator priority, running at default");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tunables::Tunables;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingSink {
        refreshes: AtomicUsize,
        seen: Mutex<Vec<u32>>,
    }

    impl CountingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                refreshes: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn count(&self) -> usize {
            self.refreshes.load(Ordering::SeqCst)
        }
    }

    impl PolicyRefresh for CountingSink {
        fn refresh(&self, state: BoostState) {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(state.bits());
        }
    }

    fn start(duration_ms: u64) -> (Arc<BoostDriver>, Arc<CountingSink>, JoinHandle<()>) {
        let driver = BoostDriver::new(Arc::new(Tunables::new(
            300_000,
            768_000,
            duration_ms,
            false,
        )))
        .unwrap();
        let sink = CountingSink::new();
        let dyn_sink: Arc<dyn PolicyRefresh> = Arc::clone(&sink) as Arc<dyn PolicyRefresh>;
        let handle = PolicyCoordinator::new(Arc::clone(&driver), dyn_sink)
            .spawn()
            .unwrap();
        (driver, sink, handle)
    }

    #[test]
    fn every_state_change_is_followed_by_a_recompute() {
        let (driver, sink, handle) = start(40);
        thread::sleep(Duration::from_millis(30));
        let initial = sink.count();
        assert!(initial >= 1);

        driver.kick();
        thread::sleep(Duration::from_millis(20));
        assert!(sink.count() > initial);

        // 定时器过期清位，又是一次重算
        thread::sleep(Duration::from_millis(80));
        let after_expiry = sink.count();
        assert!(after_expiry >= initial + 2);

        driver.shutdown();
        handle.join().unwrap();
    }

    #[test]
    fn repeated_kicks_coalesce_into_one_recompute_per_distinct_state() {
        let (driver, sink, handle) = start(200);
        thread::sleep(Duration::from_millis(30));
        let before = sink.count();

        // 同一窗口内的重复 kick 不改变状态值，最多折叠成一次重算
        for _ in 0..50 {
            driver.kick();
        }
        thread::sleep(Duration::from_millis(50));
        let after = sink.count();
        assert!(after - before <= 2, "got {} extra recomputes", after - before);

        driver.shutdown();
        handle.join().unwrap();
    }

    #[test]
    fn stop_takes_priority_over_pending_wake() {
        let (driver, sink, handle) = start(40);
        thread::sleep(Duration::from_millis(30));
        driver.shutdown();
        handle.join().unwrap();
        let at_stop = sink.count();

        // 停止之后的状态变化不再触发重算
        driver.kick();
        thread::sleep(Duration::from_millis(30));
        assert_eq!(sink.count(), at_stop);
    }

    #[test]
    fn floor_follows_kick_end_to_end() {
        use crate::model::cluster::{Cluster, ClusterClass, CpufreqSink};
        use crate::model::hints::HintSinks;
        use crate::model::policy::PolicyBridge;
        use std::fs;

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("cpuinfo_min_freq"), "300000\n").unwrap();
        fs::write(dir.path().join("scaling_min_freq"), "0\n").unwrap();
        let node = dir.path().join("scaling_min_freq");

        let tunables = Arc::new(Tunables::new(460_800, 768_000, 120, false));
        let cluster = Cluster::probe(
            "lp".into(),
            ClusterClass::LowPower,
            dir.path().to_path_buf(),
        );
        let bridge = PolicyBridge::new(Arc::clone(&tunables), 400);
        let sink: Arc<dyn PolicyRefresh> = Arc::new(CpufreqSink::new(
            vec![cluster],
            bridge,
            HintSinks::disabled(Arc::clone(&tunables)),
        ));

        let driver = BoostDriver::new(tunables).unwrap();
        let handle = PolicyCoordinator::new(Arc::clone(&driver), sink)
            .spawn()
            .unwrap();

        // 初始重算：无加速，楼层 = 簇下限
        thread::sleep(Duration::from_millis(50));
        assert_eq!(fs::read_to_string(&node).unwrap(), "300000");

        // kick 立即抬到加速楼层
        driver.kick();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(fs::read_to_string(&node).unwrap(), "768000");

        // 过期后回落
        thread::sleep(Duration::from_millis(250));
        assert_eq!(fs::read_to_string(&node).unwrap(), "300000");

        driver.shutdown();
        handle.join().unwrap();
    }

    #[test]
    fn spurious_wake_is_harmless() {
        let (driver, sink, handle) = start(40);
        thread::sleep(Duration::from_millis(30));
        let before = sink.count();
        // 状态未变的唤醒是空操作
        driver.waker().wake();
        driver.waker().wake();
        thread::sleep(Duration::from_millis(30));
        assert_eq!(sink.count(), before);

        driver.shutdown();
        handle.join().unwrap();
    }
}
