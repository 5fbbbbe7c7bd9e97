//! 单核心内核实例
//!
//! 每个CoreKernel是一个隔离代理：私有收件箱、私有进程表、独立的
//! worker线程。它是自己进程表的唯一执行者，对外只暴露原子统计。
//! 出站消息通过启动时下发的路由表寻址，路由表在启动后不可变。

pub mod process;
pub mod scheduler;
pub mod stats;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::inbox::{Inbox, PushOutcome};
use crate::message::{self, Message, MessageType};
use crate::{CoreId, Pid, SystemConfig, MAX_PROCESSES};

use process::ProcessControlBlock;
use stats::{CoreSnapshot, CoreStatistics, LatencyGauge};

/// 核心间路由表：按核心编号索引的稳定句柄，启动后只读
pub type RoutingTable = Arc<Vec<Arc<CoreKernel>>>;

/// 单核心内核代理
pub struct CoreKernel {
    core_id: CoreId,
    running: AtomicBool,
    inbox: Inbox,
    process_table: Mutex<Vec<ProcessControlBlock>>,
    stats: CoreStatistics,
    /// 进程级pid分配器，所有核心共享同一个计数器
    next_pid: Arc<AtomicU64>,
    routing: OnceLock<RoutingTable>,
    worker: Mutex<Option<JoinHandle<()>>>,
    quantum: Duration,
    rng_seed: Option<u64>,
}

impl CoreKernel {
    /// 创建核心实例，worker线程在start时才启动
    pub fn new(core_id: CoreId, next_pid: Arc<AtomicU64>, config: &SystemConfig) -> Self {
        let reserve = (MAX_PROCESSES / config.cores.max(1)).max(1);
        Self {
            core_id,
            running: AtomicBool::new(false),
            inbox: Inbox::with_capacity(config.queue_capacity),
            process_table: Mutex::new(Vec::with_capacity(reserve)),
            stats: CoreStatistics::default(),
            next_pid,
            routing: OnceLock::new(),
            worker: Mutex::new(None),
            quantum: config.quantum,
            rng_seed: config.rng_seed,
        }
    }

    /// 启动worker线程，幂等
    ///
    /// 路由表必须已包含全部核心：协调器先完整建表再逐核启动，保证
    /// 任何核心都不会向半初始化的对端发送消息。
    pub fn start(self: &Arc<Self>, routing: RoutingTable) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.routing.set(routing);

        let kernel = Arc::clone(self);
        let handle = thread::spawn(move || kernel.worker_loop());
        *self.worker.lock() = Some(handle);

        info!("[Core {}] Started successfully", self.core_id);
    }

    /// 停止并合流worker线程，幂等
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.inbox.wake_all();
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("[Core {}] Worker thread panicked", self.core_id);
            }
            info!("[Core {}] Stopped", self.core_id);
        }
    }

    /// 发送消息到路由表中的目标核心
    ///
    /// 非法目标直接丢弃并记日志；对端队列满时丢弃并上报，不重试，
    /// 发送方永不阻塞。
    pub fn send(&self, msg: Message) {
        let Some(routing) = self.routing.get() else {
            error!("[Core {}] Core system not initialized", self.core_id);
            return;
        };
        let Some(peer) = routing.get(msg.dest) else {
            error!(
                "[Core {}] Invalid destination core: {}",
                self.core_id, msg.dest
            );
            return;
        };

        let label = msg.source_label();
        let dest = msg.dest;
        let msg_type = msg.msg_type;
        match peer.inbox.push(msg) {
            PushOutcome::Accepted => {
                self.stats.messages_sent.fetch_add(1, Ordering::Relaxed);
                info!("[MSG] {} → Core {}: {}", label, dest, msg_type);
            }
            PushOutcome::Rejected => {
                error!(
                    "[Core {}] Destination queue full (Core {})",
                    self.core_id, dest
                );
            }
        }
    }

    /// 向除自己外的所有核心各发送一份带址副本
    pub fn broadcast(&self, msg_type: MessageType, process_id: Option<Pid>, payload: &str) {
        let Some(routing) = self.routing.get() else {
            error!("[Core {}] Core system not initialized", self.core_id);
            return;
        };
        for dest in 0..routing.len() {
            if dest == self.core_id {
                continue;
            }
            // 每份副本在各自入队时刻单独打时间戳
            self.send(Message::new(
                Some(self.core_id),
                dest,
                msg_type,
                process_id,
                payload,
            ));
        }
    }

    /// 在本核心创建新进程，返回全局唯一pid
    pub fn create_local_process(&self, priority: u8) -> Pid {
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        let mut table = self.process_table.lock();
        table.push(ProcessControlBlock::new(pid, self.core_id, priority));
        self.stats.current_load.store(table.len(), Ordering::Relaxed);
        drop(table);

        info!(
            "[Core {}] Created process {} (priority={})",
            self.core_id, pid, priority
        );
        pid
    }

    /// 把本地进程迁出到目标核心
    ///
    /// 顺序固定为先入队MIGRATE再移除本地PCB，目标端不可能同时在
    /// 两个表里看到同一个pid。pid不在本地时返回false。
    pub fn migrate_process(&self, pid: Pid, target: CoreId) -> bool {
        let mut table = self.process_table.lock();
        let Some(idx) = table.iter().position(|pcb| pcb.pid == pid) else {
            return false;
        };

        let priority = table[idx].priority;
        self.send(Message::new(
            Some(self.core_id),
            target,
            MessageType::Migrate,
            Some(pid),
            message::priority_payload(priority),
        ));

        table.remove(idx);
        self.stats.current_load.store(table.len(), Ordering::Relaxed);
        drop(table);

        info!(
            "[Core {}] Migrated process {} to Core {}",
            self.core_id, pid, target
        );
        true
    }

    /// 终止本地进程，pid未知时静默忽略
    pub fn terminate_process(&self, pid: Pid) {
        let mut table = self.process_table.lock();
        let Some(idx) = table.iter().position(|pcb| pcb.pid == pid) else {
            return;
        };
        table.remove(idx);
        self.stats.current_load.store(table.len(), Ordering::Relaxed);
        drop(table);

        info!("[Core {}] Terminated process {}", self.core_id, pid);
    }

    /// 读取统计快照
    pub fn get_statistics(&self) -> CoreSnapshot {
        self.stats.snapshot(self.core_id)
    }

    /// 当前负载(进程表大小)
    pub fn load(&self) -> usize {
        self.stats.current_load.load(Ordering::Relaxed)
    }

    /// 核心编号
    pub fn core_id(&self) -> CoreId {
        self.core_id
    }

    /// worker是否在运行
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// 收件箱句柄(测试驱动用)
    pub fn inbox(&self) -> &Inbox {
        &self.inbox
    }

    /// 当前驻留的pid列表快照
    pub fn resident_pids(&self) -> Vec<Pid> {
        self.process_table.lock().iter().map(|pcb| pcb.pid).collect()
    }

    // ------------------------------------------------------------------
    // worker循环与消息分发
    // ------------------------------------------------------------------

    fn worker_loop(self: Arc<Self>) {
        info!("[Core {}] Worker thread started", self.core_id);

        let mut rng = match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed.wrapping_add(self.core_id as u64)),
            None => SmallRng::from_os_rng(),
        };
        let mut latency = LatencyGauge::new();
        let mut next_pass = Instant::now() + self.quantum;

        'run: while self.running.load(Ordering::SeqCst) {
            // 先清空收件箱再调度
            while let Some(msg) = self.inbox.pop_nonblocking() {
                self.note_receive(&msg, &mut latency);
                self.dispatch(msg);
                if !self.running.load(Ordering::SeqCst) {
                    break 'run;
                }
            }

            let now = Instant::now();
            if now >= next_pass {
                self.run_scheduler_pass(&mut rng);
                next_pass = now + self.quantum;
                continue;
            }

            // 周期剩余时间在收件箱上等待：新消息或停机唤醒都提前
            // 返回，调度遍保持每个时间片一次的节奏
            if let Some(msg) = self.inbox.pop_blocking(next_pass - now) {
                self.note_receive(&msg, &mut latency);
                self.dispatch(msg);
            }
        }

        info!("[Core {}] Worker thread stopped", self.core_id);
    }

    fn note_receive(&self, msg: &Message, latency: &mut LatencyGauge) {
        self.stats.messages_received.fetch_add(1, Ordering::Relaxed);
        let sample_us = msg.sent_at.elapsed().as_micros() as f64;
        let smoothed = latency.record(sample_us);
        self.stats
            .avg_message_latency_us
            .store(smoothed, Ordering::Relaxed);
    }

    fn run_scheduler_pass(&self, rng: &mut SmallRng) {
        let mut table = self.process_table.lock();
        let result = scheduler::run_pass(&mut table, self.quantum, rng);
        // 负载发布保持在表锁内，读数与表长度始终一致
        self.stats.current_load.store(result.load, Ordering::Relaxed);
        drop(table);

        self.stats
            .processes_executed
            .fetch_add(result.executed, Ordering::Relaxed);
        self.stats
            .context_switches
            .fetch_add(result.executed, Ordering::Relaxed);

        if result.terminated > 0 {
            info!(
                "[Core {}] Terminated {} processes (load now: {})",
                self.core_id, result.terminated, result.load
            );
        }
    }

    fn dispatch(&self, msg: Message) {
        match msg.msg_type {
            MessageType::Create => {
                let priority = message::parse_priority(&msg.payload);
                self.create_local_process(priority);
            }
            MessageType::Migrate => self.handle_migrate(&msg),
            MessageType::Terminate => match msg.process_id {
                Some(pid) => self.terminate_process(pid),
                None => warn!("[Core {}] TERMINATE without process id", self.core_id),
            },
            MessageType::Heartbeat => {
                debug!(
                    "[Core {}] Heartbeat from {}",
                    self.core_id,
                    msg.source_label()
                );
            }
            MessageType::Shutdown => {
                debug!("[Core {}] Shutdown message received", self.core_id);
                self.running.store(false, Ordering::SeqCst);
            }
            MessageType::ResourceRequest
            | MessageType::ResourceRelease
            | MessageType::SyncBarrier => {
                // 传输层演示消息：只计数记日志，不改变内核状态
                debug!(
                    "[Core {}] {} from {}",
                    self.core_id,
                    msg.msg_type,
                    msg.source_label()
                );
            }
        }
    }

    /// 接收迁入进程：pid原样接受，不重新编号
    fn handle_migrate(&self, msg: &Message) {
        let Some(pid) = msg.process_id else {
            warn!("[Core {}] MIGRATE without process id", self.core_id);
            return;
        };
        let priority = message::parse_priority(&msg.payload);

        let mut table = self.process_table.lock();
        if table.iter().any(|pcb| pcb.pid == pid) {
            // 正常握手下不可能出现：源端必然已先移除本地PCB
            warn!("[Core {}] Duplicate migrated process {}", self.core_id, pid);
            return;
        }
        table.push(ProcessControlBlock::new(pid, self.core_id, priority));
        self.stats.current_load.store(table.len(), Ordering::Relaxed);
        drop(table);

        info!("[Core {}] Received migrated process {}", self.core_id, pid);
    }
}

impl std::fmt::Debug for CoreKernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreKernel")
            .field("core_id", &self.core_id)
            .field("running", &self.is_running())
            .field("load", &self.load())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lone_kernel() -> Arc<CoreKernel> {
        Arc::new(CoreKernel::new(
            0,
            Arc::new(AtomicU64::new(0)),
            &SystemConfig::default(),
        ))
    }

    #[test]
    fn test_create_local_before_start() {
        let kernel = lone_kernel();
        let pid = kernel.create_local_process(9);
        assert_eq!(kernel.load(), 1);
        assert_eq!(kernel.resident_pids(), vec![pid]);
    }

    #[test]
    fn test_migrate_unknown_pid_false() {
        let kernel = lone_kernel();
        assert!(!kernel.migrate_process(42, 1));
        assert_eq!(kernel.load(), 0);
    }

    #[test]
    fn test_terminate_idempotent() {
        let kernel = lone_kernel();
        let pid = kernel.create_local_process(5);
        kernel.terminate_process(pid);
        // 第二次终止静默忽略
        kernel.terminate_process(pid);
        assert_eq!(kernel.load(), 0);
        assert!(kernel.resident_pids().is_empty());
    }

    #[test]
    fn test_send_without_routing_drops() {
        let kernel = lone_kernel();
        kernel.send(Message::new(Some(0), 1, MessageType::Heartbeat, None, ""));
        // 路由表未下发时消息被丢弃，计数不动
        assert_eq!(kernel.get_statistics().messages_sent, 0);
    }

    #[test]
    fn test_stop_without_start_is_noop() {
        let kernel = lone_kernel();
        kernel.stop();
        assert!(!kernel.is_running());
    }
}
