//! HiveOS 核心库入口 - 多内核操作系统模拟器
//!
//! 每个逻辑核心运行一个独立的内核实例(CoreKernel)，核心之间只通过
//! 有界消息队列通信，不共享任何可变进程状态。HiveSystem 负责路由表、
//! 进程放置与负载均衡；SmpSystem 是共享内存对照组，用于量化锁竞争开销。

pub mod balancer;
pub mod hive;
pub mod inbox;
pub mod kernel;
pub mod message;
pub mod smp;
pub mod telemetry;

/// 进程标识类型(进程级单调递增)
pub type Pid = u64;

/// 核心标识类型
pub type CoreId = usize;

/// 默认核心数量
pub const NUM_CORES: usize = 8;

/// 单个核心收件箱容量上限
pub const MESSAGE_QUEUE_SIZE: usize = 100;

/// 消息负载最大字节数
pub const MAX_MESSAGE_SIZE: usize = 512;

/// 系统级最大进程数(仅用于容量预留)
pub const MAX_PROCESSES: usize = 64;

/// 每个调度周期的时间片
pub const QUANTUM: std::time::Duration = std::time::Duration::from_millis(50);

/// 系统配置
///
/// 默认值即参考常量；`rng_seed` 用于可复现的随机终止策略测试。
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SystemConfig {
    /// 核心数量
    pub cores: usize,
    /// 收件箱容量
    pub queue_capacity: usize,
    /// 调度时间片
    pub quantum: std::time::Duration,
    /// 随机数种子(None时使用系统熵)
    pub rng_seed: Option<u64>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            cores: NUM_CORES,
            queue_capacity: MESSAGE_QUEUE_SIZE,
            quantum: QUANTUM,
            rng_seed: None,
        }
    }
}

impl SystemConfig {
    /// 按机器实际核心数推导配置(上限NUM_CORES)
    pub fn auto() -> Self {
        Self {
            cores: num_cpus::get().clamp(1, NUM_CORES),
            ..Self::default()
        }
    }

    /// 固定随机数种子，便于测试复现
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }
}

/// 通用错误类型
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum HiveError {
    #[error("系统未运行")]
    NotRunning,
    #[error("无效的核心编号: {0}")]
    InvalidCore(usize),
}

pub use hive::HiveSystem;
pub use inbox::{Inbox, PushOutcome};
pub use kernel::stats::{CoreSnapshot, SystemSnapshot};
pub use kernel::CoreKernel;
pub use message::{Message, MessageType};
pub use smp::SmpSystem;
