//! 共享内存对照组(SMP基线)
//!
//! 与多内核跑同一套工作负载API，但所有核心竞争同一把全局锁、
//! 共享同一张进程表。每次建进程、每次worker滴答、每次负载查询都
//! 要拿全局锁并累加竞争计数。这个实现刻意保持粗糙，职责是暴露
//! 共享内存协调的代价，不要优化它。

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::info;
use parking_lot::Mutex;

use crate::{CoreId, Pid};

/// SMP worker的滴答间隔
const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// 共享进程表中的进程记录
#[derive(Debug, Clone)]
pub struct SmpProcess {
    pub pid: Pid,
    pub priority: u8,
    pub assigned_core: CoreId,
    pub creation_time: Instant,
}

/// 全局锁保护的共享状态
#[derive(Debug, Default)]
struct SmpState {
    table: Vec<SmpProcess>,
    next_pid: Pid,
}

/// 竞争计数器
#[derive(Debug, Default)]
struct SmpCounters {
    lock_contentions: AtomicU64,
    cache_invalidations: AtomicU64,
    total_operations: AtomicU64,
}

/// 共享内存基线系统
pub struct SmpSystem {
    cores: usize,
    state: Arc<Mutex<SmpState>>,
    counters: Arc<SmpCounters>,
    running: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
}

impl SmpSystem {
    pub fn new(cores: usize) -> Self {
        Self {
            cores,
            state: Arc::new(Mutex::new(SmpState::default())),
            counters: Arc::new(SmpCounters::default()),
            running: Arc::new(AtomicBool::new(false)),
            workers: Vec::new(),
        }
    }

    /// 启动N个worker线程，全部竞争同一把锁
    pub fn start(&mut self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        info!("[SMP] Starting traditional SMP system...");
        info!("[SMP] Using SHARED MEMORY model");
        info!("[SMP] Single global lock for all cores");

        for _ in 0..self.cores {
            let state = Arc::clone(&self.state);
            let counters = Arc::clone(&self.counters);
            let running = Arc::clone(&self.running);
            self.workers.push(thread::spawn(move || {
                while running.load(Ordering::SeqCst) {
                    {
                        let _table = state.lock();
                        // 共享内存模型下每次访问都是一次竞争加一次
                        // 缓存失效
                        counters.lock_contentions.fetch_add(1, Ordering::Relaxed);
                        counters.total_operations.fetch_add(1, Ordering::Relaxed);
                        counters
                            .cache_invalidations
                            .fetch_add(1, Ordering::Relaxed);
                    }
                    thread::sleep(TICK_INTERVAL);
                }
            }));
        }
    }

    /// 停止并合流全部worker。幂等
    pub fn stop(&mut self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }

    /// 在全局锁内创建进程并扫描共享表选核
    pub fn create_process(&self, priority: u8) -> Pid {
        let mut state = self.state.lock();
        self.counters
            .lock_contentions
            .fetch_add(1, Ordering::Relaxed);

        let pid = state.next_pid;
        state.next_pid += 1;

        let assigned_core = Self::least_loaded_locked(&state.table, self.cores);
        state.table.push(SmpProcess {
            pid,
            priority,
            assigned_core,
            creation_time: Instant::now(),
        });

        self.counters
            .cache_invalidations
            .fetch_add(1, Ordering::Relaxed);

        info!("[SMP] Process {} created (GLOBAL LOCK held)", pid);
        pid
    }

    /// 统计快照
    pub fn snapshot(&self) -> SmpSnapshot {
        let table_len = self.state.lock().table.len();
        SmpSnapshot {
            lock_contentions: self.counters.lock_contentions.load(Ordering::Relaxed),
            cache_invalidations: self.counters.cache_invalidations.load(Ordering::Relaxed),
            total_operations: self.counters.total_operations.load(Ordering::Relaxed),
            total_processes: table_len,
        }
    }

    /// 渲染SMP统计报表
    pub fn report(&self) -> String {
        let snap = self.snapshot();
        format!(
            "========== SMP SYSTEM STATISTICS ==========\n\
             \x20 Lock Contentions:     {}\n\
             \x20 Cache Invalidations:  {}\n\
             \x20 Total Processes:      {}\n\
             \x20 Operations:           {}\n\
             ===========================================\n",
            snap.lock_contentions,
            snap.cache_invalidations,
            snap.total_processes,
            snap.total_operations
        )
    }

    /// 共享表扫描选核，必须在持锁状态下调用
    fn least_loaded_locked(table: &[SmpProcess], cores: usize) -> CoreId {
        let mut loads = vec![0usize; cores];
        for proc in table {
            if proc.assigned_core < cores {
                loads[proc.assigned_core] += 1;
            }
        }
        let mut min_core = 0;
        for (core, &load) in loads.iter().enumerate() {
            if load < loads[min_core] {
                min_core = core;
            }
        }
        min_core
    }
}

impl Drop for SmpSystem {
    fn drop(&mut self) {
        self.stop();
    }
}

/// SMP基线统计快照
#[derive(Debug, Clone, serde::Serialize)]
pub struct SmpSnapshot {
    pub lock_contentions: u64,
    pub cache_invalidations: u64,
    pub total_operations: u64,
    pub total_processes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_assigns_least_loaded() {
        let smp = SmpSystem::new(4);
        for _ in 0..8 {
            smp.create_process(5);
        }
        let state = smp.state.lock();
        let mut loads = vec![0usize; 4];
        for proc in &state.table {
            loads[proc.assigned_core] += 1;
        }
        // 8个进程均匀铺满4个核心
        assert_eq!(loads, vec![2, 2, 2, 2]);
    }

    #[test]
    fn test_every_create_counts_contention() {
        let smp = SmpSystem::new(4);
        for _ in 0..10 {
            smp.create_process(5);
        }
        let snap = smp.snapshot();
        assert_eq!(snap.lock_contentions, 10);
        assert_eq!(snap.cache_invalidations, 10);
        assert_eq!(snap.total_processes, 10);
    }

    #[test]
    fn test_workers_accumulate_contention() {
        let mut smp = SmpSystem::new(4);
        smp.start();
        thread::sleep(Duration::from_millis(250));
        smp.stop();
        let snap = smp.snapshot();
        // 4个worker各至少滴答一次
        assert!(snap.total_operations >= 4);
        assert!(snap.lock_contentions >= snap.total_operations);
    }
}
