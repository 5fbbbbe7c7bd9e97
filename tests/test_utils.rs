use std::time::{Duration, Instant};

use hive_os::{HiveSystem, SystemConfig};

/// 固定随机种子，保证终止策略可复现
#[allow(dead_code)]
pub const TEST_SEED: u64 = 0x5EED;

/// 默认8核、固定种子、已启动的系统
#[allow(dead_code)]
pub fn started_system() -> HiveSystem {
    started_with(SystemConfig::default().with_seed(TEST_SEED))
}

/// 冻结调度的系统：超长时间片，测试窗口内不会发生调度遍，
/// 进程放置与迁移结果完全确定
#[allow(dead_code)]
pub fn frozen_system() -> HiveSystem {
    let config = SystemConfig {
        quantum: Duration::from_secs(3600),
        ..SystemConfig::default()
    }
    .with_seed(TEST_SEED);
    started_with(config)
}

/// 启动给定配置的系统
#[allow(dead_code)]
pub fn started_with(config: SystemConfig) -> HiveSystem {
    let system = HiveSystem::new(config);
    system.start();
    system
}

/// 带期限轮询，条件成立返回true
#[allow(dead_code)]
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    cond()
}
