use std::sync::atomic::{AtomicU32, Ordering};

/// 加速状态位定义
pub const SCREEN_OFF: u32 = 1 << 0;
pub const INPUT_BOOST: u32 = 1 << 1;
pub const MAX_BOOST: u32 = 1 << 2;

const ALL_BITS: u32 = SCREEN_OFF | INPUT_BOOST | MAX_BOOST;

/// 某一时刻的加速状态快照
///
/// 三个位相互独立，任意组合都是合法状态。快照是纯值类型，
/// 状态查询和楼层判定都在快照上进行，不需要再碰原子寄存器。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoostState(u32);

impl BoostState {
    pub fn from_bits(bits: u32) -> Self {
        Self(bits & ALL_BITS)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn screen_off(self) -> bool {
        self.0 & SCREEN_OFF != 0
    }

    pub fn input_boost(self) -> bool {
        self.0 & INPUT_BOOST != 0
    }

    pub fn max_boost(self) -> bool {
        self.0 & MAX_BOOST != 0
    }

    /// 是否有任意一种加速在生效
    ///
    /// 熄屏时即使位仍然置着，也不参与楼层计算。
    pub fn boost_active(self) -> bool {
        !self.screen_off() && self.0 & (INPUT_BOOST | MAX_BOOST) != 0
    }

    pub fn with(self, mask: u32) -> Self {
        Self::from_bits(self.0 | mask)
    }

    pub fn without(self, mask: u32) -> Self {
        Self::from_bits(self.0 & !mask)
    }
}

/// 状态寄存器 - 整个调速器唯一的事实来源
///
/// 所有事件源（输入、亮灭屏、外部kick）只通过单次原子位操作修改它，
/// 读者拿到的要么是旧值要么是新值，不存在撕裂的中间态，因此不需要锁。
pub struct StateRegister {
    bits: AtomicU32,
}

impl StateRegister {
    pub fn new() -> Self {
        Self {
            bits: AtomicU32::new(0),
        }
    }

    pub fn bits(&self) -> u32 {
        self.bits.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> BoostState {
        BoostState::from_bits(self.bits())
    }

    /// 置位，返回更新后的完整状态
    pub fn set(&self, mask: u32) -> BoostState {
        let prev = self.bits.fetch_or(mask & ALL_BITS, Ordering::AcqRel);
        BoostState::from_bits(prev | mask)
    }

    /// 清位，返回更新后的完整状态
    pub fn clear(&self, mask: u32) -> BoostState {
        let prev = self.bits.fetch_and(!(mask & ALL_BITS), Ordering::AcqRel);
        BoostState::from_bits(prev & !mask)
    }
}

impl Default for StateRegister {
    fn default() -> Self {
        Self::new()
    }
}
