//! 单核心调度器 - 每周期一次的执行与随机终止
//!
//! 模拟执行模型：每个调度周期给READY/RUNNING进程记一个固定时间片，
//! 随后按累计CPU时间做随机终止(累计越久终止概率越高)，最后清扫
//! TERMINATED进程并刷新负载。

use std::time::Duration;

use rand::rngs::SmallRng;
use rand::Rng;

use super::process::{ProcessControlBlock, ProcessState};

/// 随机终止掷骰阈值：掷出(1-100)大于阈值即终止
///
/// 阈值随累计CPU时间单调下降，终止概率随之单调上升。
pub fn termination_threshold(cpu_time: Duration) -> u32 {
    let cpu_ms = cpu_time.as_millis();
    if cpu_ms > 600 {
        20 // 80%概率
    } else if cpu_ms > 300 {
        50 // 50%
    } else if cpu_ms > 150 {
        70 // 30%
    } else {
        80 // 20%
    }
}

/// 执行一次调度周期，返回本周期终止的进程数
///
/// 周期内顺序：提升状态 → 记时间片 → 随机终止 → 清扫。调用方负责
/// 把返回后的表长度发布为current_load。
pub fn run_pass(
    table: &mut Vec<ProcessControlBlock>,
    quantum: Duration,
    rng: &mut SmallRng,
) -> PassResult {
    let mut executed = 0u64;
    for pcb in table.iter_mut() {
        if pcb.state == ProcessState::Ready || pcb.state == ProcessState::Running {
            pcb.state = ProcessState::Running;
            pcb.cpu_time += quantum;
            executed += 1;

            let roll: u32 = rng.random_range(1..=100);
            if roll > termination_threshold(pcb.cpu_time) {
                pcb.state = ProcessState::Terminated;
            }
        }
    }

    let before = table.len();
    table.retain(|pcb| pcb.state != ProcessState::Terminated);

    PassResult {
        executed,
        terminated: before - table.len(),
        load: table.len(),
    }
}

/// 单次调度周期的结果
#[derive(Debug, Clone, Copy)]
pub struct PassResult {
    /// 获得时间片的进程数
    pub executed: u64,
    /// 被终止并清扫的进程数
    pub terminated: usize,
    /// 清扫后的表长度
    pub load: usize,
}
