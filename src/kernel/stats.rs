//! 核心统计计数器与快照聚合
//!
//! 计数器全部是原子变量，读侧快照允许字段间轻微不一致。延迟指标
//! 采用EMA平滑(而非最后一次采样)，由worker线程独占更新后发布到
//! 原子量表。

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use moving_averages::Ema;

use crate::CoreId;

/// 延迟EMA平滑系数
const LATENCY_EMA_ALPHA: f64 = 0.2;

/// 单核心原子统计
#[derive(Debug, Default)]
pub struct CoreStatistics {
    /// 发送成功的消息数
    pub messages_sent: AtomicU64,
    /// 接收到的消息数
    pub messages_received: AtomicU64,
    /// 执行过的进程时间片数
    pub processes_executed: AtomicU64,
    /// 上下文切换数
    pub context_switches: AtomicU64,
    /// 平滑后的消息延迟(微秒)
    pub avg_message_latency_us: AtomicU64,
    /// 当前进程表大小
    pub current_load: AtomicUsize,
}

impl CoreStatistics {
    /// 读取快照
    pub fn snapshot(&self, core_id: CoreId) -> CoreSnapshot {
        CoreSnapshot {
            core_id,
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            processes_executed: self.processes_executed.load(Ordering::Relaxed),
            context_switches: self.context_switches.load(Ordering::Relaxed),
            avg_message_latency_us: self.avg_message_latency_us.load(Ordering::Relaxed),
            current_load: self.current_load.load(Ordering::Relaxed),
        }
    }
}

/// 消息延迟量表 - worker线程私有，发布平滑值
#[derive(Debug)]
pub struct LatencyGauge {
    ema: Ema<f64>,
}

impl LatencyGauge {
    pub fn new() -> Self {
        Self {
            ema: Ema::new(LATENCY_EMA_ALPHA),
        }
    }

    /// 记录一次延迟采样，返回平滑后的微秒值
    pub fn record(&mut self, latency_us: f64) -> u64 {
        self.ema.next(latency_us).round().max(0.0) as u64
    }
}

impl Default for LatencyGauge {
    fn default() -> Self {
        Self::new()
    }
}

/// 单核心统计快照
#[derive(Debug, Clone, serde::Serialize)]
pub struct CoreSnapshot {
    pub core_id: CoreId,
    pub messages_sent: u64,
    pub messages_received: u64,
    pub processes_executed: u64,
    pub context_switches: u64,
    pub avg_message_latency_us: u64,
    pub current_load: usize,
}

/// 系统级统计快照与派生指标
#[derive(Debug, Clone, serde::Serialize)]
pub struct SystemSnapshot {
    pub per_core: Vec<CoreSnapshot>,
    pub total_messages_sent: u64,
    pub total_messages_received: u64,
    pub total_processes_executed: u64,
    pub total_context_switches: u64,
    /// 通信开销占比: messages / (messages + processes_executed) × 100
    pub comm_overhead_pct: f64,
    /// 投递率: received / sent × 100
    pub delivery_rate: f64,
}

impl SystemSnapshot {
    /// 从各核心快照聚合
    pub fn from_cores(per_core: Vec<CoreSnapshot>) -> Self {
        let total_messages_sent: u64 = per_core.iter().map(|c| c.messages_sent).sum();
        let total_messages_received: u64 = per_core.iter().map(|c| c.messages_received).sum();
        let total_processes_executed: u64 = per_core.iter().map(|c| c.processes_executed).sum();
        let total_context_switches: u64 = per_core.iter().map(|c| c.context_switches).sum();

        let total_messages = total_messages_sent + total_messages_received;
        let comm_overhead_pct = if total_messages + total_processes_executed == 0 {
            0.0
        } else {
            total_messages as f64 / (total_messages + total_processes_executed) as f64 * 100.0
        };
        let delivery_rate = if total_messages_sent == 0 {
            100.0
        } else {
            total_messages_received as f64 / total_messages_sent as f64 * 100.0
        };

        Self {
            per_core,
            total_messages_sent,
            total_messages_received,
            total_processes_executed,
            total_context_switches,
            comm_overhead_pct,
            delivery_rate,
        }
    }

    /// 渲染统计报表(外部看板按行解析，字段名保持稳定)
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("========================================================\n");
        out.push_str("           MULTIKERNEL OS STATISTICS\n");
        out.push_str("========================================================\n");
        for core in &self.per_core {
            out.push_str(&format!("\n--- Core {} ---\n", core.core_id));
            out.push_str(&format!(
                "  Current Load:      {} processes\n",
                core.current_load
            ));
            out.push_str(&format!("  Messages Sent:     {}\n", core.messages_sent));
            out.push_str(&format!(
                "  Messages Received: {}\n",
                core.messages_received
            ));
            out.push_str(&format!(
                "  Processes Executed:{}\n",
                core.processes_executed
            ));
            out.push_str(&format!(
                "  Context Switches:  {}\n",
                core.context_switches
            ));
            out.push_str(&format!(
                "  Avg Msg Latency:   {} us\n",
                core.avg_message_latency_us
            ));
        }
        out.push_str("\n--- System Totals ---\n");
        out.push_str(&format!(
            "  Total Messages Sent:     {}\n",
            self.total_messages_sent
        ));
        out.push_str(&format!(
            "  Total Messages Received: {}\n",
            self.total_messages_received
        ));
        out.push_str(&format!(
            "  Total Processes Executed:{}\n",
            self.total_processes_executed
        ));
        out.push_str(&format!(
            "  Total Context Switches:  {}\n",
            self.total_context_switches
        ));
        out.push_str(&format!(
            "  Message Delivery Rate:   {:.2}%\n",
            self.delivery_rate
        ));
        out.push_str(&format!(
            "  Communication Overhead:  {:.2}%\n",
            self.comm_overhead_pct
        ));
        out.push_str("========================================================\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(core_id: CoreId, sent: u64, recv: u64, executed: u64) -> CoreSnapshot {
        CoreSnapshot {
            core_id,
            messages_sent: sent,
            messages_received: recv,
            processes_executed: executed,
            context_switches: executed,
            avg_message_latency_us: 0,
            current_load: 0,
        }
    }

    #[test]
    fn test_empty_system_has_no_overhead() {
        let s = SystemSnapshot::from_cores(vec![snap(0, 0, 0, 0)]);
        assert_eq!(s.comm_overhead_pct, 0.0);
        assert_eq!(s.delivery_rate, 100.0);
    }

    #[test]
    fn test_derived_counters() {
        // 10条消息(5发5收)对10次执行: 开销 10/20
        let s = SystemSnapshot::from_cores(vec![snap(0, 5, 0, 10), snap(1, 0, 5, 0)]);
        assert!((s.comm_overhead_pct - 50.0).abs() < f64::EPSILON);
        assert!((s.delivery_rate - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_delivery_rate_reflects_drops() {
        let s = SystemSnapshot::from_cores(vec![snap(0, 10, 0, 0), snap(1, 0, 8, 0)]);
        assert!((s.delivery_rate - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_latency_gauge_smooths() {
        let mut gauge = LatencyGauge::new();
        let first = gauge.record(100.0);
        assert_eq!(first, 100);
        // 突刺被平滑，不会直接跳到1000
        let second = gauge.record(1000.0);
        assert!(second > first && second < 1000);
    }
}
