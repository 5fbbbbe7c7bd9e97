//! 进程控制块定义

use std::time::{Duration, Instant};

use crate::message::MAX_PRIORITY;
use crate::{CoreId, Pid};

/// 进程状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Ready,
    Running,
    Blocked,
    Terminated,
}

/// 进程控制块 - 任一时刻只属于一个核心
#[derive(Debug, Clone)]
pub struct ProcessControlBlock {
    /// 进程ID，全局唯一且不可变
    pub pid: Pid,
    /// 当前所属核心，只在迁移交接时变化
    pub core_id: CoreId,
    /// 当前状态，TERMINATED为吸收态
    pub state: ProcessState,
    /// 调度优先级(0-10，基础调度器不消费，仅记录)
    pub priority: u8,
    /// 创建时刻
    pub creation_time: Instant,
    /// 累计占用的模拟CPU时间
    pub cpu_time: Duration,
}

impl ProcessControlBlock {
    /// 创建新PCB，初始状态READY，优先级钳制到0-10
    pub fn new(pid: Pid, core_id: CoreId, priority: u8) -> Self {
        Self {
            pid,
            core_id,
            state: ProcessState::Ready,
            priority: priority.min(MAX_PRIORITY),
            creation_time: Instant::now(),
            cpu_time: Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_pcb_is_ready() {
        let pcb = ProcessControlBlock::new(7, 2, 9);
        assert_eq!(pcb.state, ProcessState::Ready);
        assert_eq!(pcb.cpu_time, Duration::ZERO);
        assert_eq!(pcb.priority, 9);
    }

    #[test]
    fn test_priority_clamped() {
        let pcb = ProcessControlBlock::new(1, 0, 200);
        assert_eq!(pcb.priority, MAX_PRIORITY);
    }
}
