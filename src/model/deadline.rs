use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use once_cell::sync::Lazy;

// 进程级单调时间基准，所有截止时间都以它为原点（毫秒）
static EPOCH: Lazy<Instant> = Lazy::new(Instant::now);

/// 当前单调时间（毫秒）
///
/// 从 1 起计，保证初始截止时间 0 永远严格小于当前时间，
/// kick_max(0) 在没有加速时一定能武装上。
pub fn now_ms() -> u64 {
    EPOCH.elapsed().as_millis() as u64 + 1
}

/// max-boost 的到期时刻，只增不减
///
/// 多个 kick_max 调用者并发延长时靠 CAS 重试保证单调性：
/// 后到的短请求绝不会截断先到的长请求。
pub struct ExpiryDeadline {
    expires_ms: AtomicU64,
}

impl ExpiryDeadline {
    pub fn new() -> Self {
        Self {
            expires_ms: AtomicU64::new(0),
        }
    }

    pub fn get(&self) -> u64 {
        self.expires_ms.load(Ordering::Acquire)
    }

    /// 尝试把截止时间延长到 proposed_ms
    ///
    /// 返回是否真的延长了。proposed == current 视为未延长，
    /// 这样 kick_max(0) 不会截断已有的加速，但在没有加速时仍会生效
    /// （过期的旧截止时间总是小于当前时间）。
    pub fn extend_to(&self, proposed_ms: u64) -> bool {
        let mut curr = self.expires_ms.load(Ordering::Acquire);
        loop {
            if proposed_ms <= curr {
                return false;
            }
            match self.expires_ms.compare_exchange_weak(
                curr,
                proposed_ms,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => curr = actual,
            }
        }
    }
}

impl Default for ExpiryDeadline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extends_forward_only() {
        let dl = ExpiryDeadline::new();
        assert!(dl.extend_to(1000));
        assert_eq!(dl.get(), 1000);
        // 更短的请求不生效
        assert!(!dl.extend_to(300));
        assert_eq!(dl.get(), 1000);
        assert!(dl.extend_to(1500));
        assert_eq!(dl.get(), 1500);
    }

    #[test]
    fn tie_counts_as_not_extended() {
        let dl = ExpiryDeadline::new();
        assert!(dl.extend_to(500));
        assert!(!dl.extend_to(500));
    }

    #[test]
    fn never_regresses_under_racing_extenders() {
        use std::sync::Arc;
        use std::thread;

        let dl = Arc::new(ExpiryDeadline::new());
        let mut handles = Vec::new();
        for t in 0..8u64 {
            let dl = Arc::clone(&dl);
            handles.push(thread::spawn(move || {
                for i in 0..1000u64 {
                    dl.extend_to(t * 1000 + i);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(dl.get(), 7999);
    }

    #[test]
    fn monotonic_clock_moves() {
        let a = now_ms();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(now_ms() > a);
    }
}
