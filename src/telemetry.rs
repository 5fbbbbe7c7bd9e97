//! 宿主机指标采样 - 心跳负载内容
//!
//! 心跳消息携带采样时刻的真实CPU/内存占用比，外部看板可以据此
//! 观察模拟器自身的资源消耗。

use chrono::Utc;
use sysinfo::{CpuExt, System, SystemExt};

/// 宿主机采样器
pub struct HostSampler {
    sys: System,
}

impl HostSampler {
    pub fn new() -> Self {
        Self {
            sys: System::new_all(),
        }
    }

    /// 采样CPU与内存占用比(0.0-1.0)
    pub fn sample(&mut self) -> (f32, f32) {
        self.sys.refresh_cpu();
        self.sys.refresh_memory();

        let cpu = self.sys.global_cpu_info().cpu_usage() / 100.0;
        let total = self.sys.total_memory();
        let mem = if total == 0 {
            0.0
        } else {
            self.sys.used_memory() as f32 / total as f32
        };
        (cpu, mem)
    }

    /// 构造心跳负载: ts=<unix秒> cpu=<占比> mem=<占比>
    pub fn heartbeat_payload(&mut self) -> String {
        let (cpu, mem) = self.sample();
        format!(
            "ts={} cpu={:.2} mem={:.2}",
            Utc::now().timestamp(),
            cpu,
            mem
        )
    }
}

impl Default for HostSampler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_in_range() {
        let mut sampler = HostSampler::new();
        let (cpu, mem) = sampler.sample();
        assert!((0.0..=1.0).contains(&mem));
        assert!(cpu >= 0.0);
    }

    #[test]
    fn test_payload_has_all_keys() {
        let mut sampler = HostSampler::new();
        let payload = sampler.heartbeat_payload();
        for key in ["ts=", "cpu=", "mem="] {
            assert!(payload.contains(key), "missing {} in {}", key, payload);
        }
    }
}
