//! 系统协调器
//!
//! HiveSystem拥有全部核心实例与路由表，负责两段式启动(先完整建表、
//! 再逐核启动worker)、按负载放置新进程、发起迁移与再均衡，以及
//! 聚合统计。均衡锁只覆盖选核与意图计算，绝不跨越对核心的调用。

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use log::{error, info, warn};
use parking_lot::Mutex;

use crate::balancer::{self, MigrationIntent};
use crate::kernel::stats::SystemSnapshot;
use crate::kernel::{CoreKernel, RoutingTable};
use crate::message::{Message, MessageType};
use crate::telemetry::HostSampler;
use crate::{CoreId, HiveError, Pid, SystemConfig};

/// 资源演示中扮演资源管理者的核心
const RESOURCE_MANAGER_CORE: CoreId = 4;

/// 多内核系统协调器
pub struct HiveSystem {
    config: SystemConfig,
    agents: Vec<Arc<CoreKernel>>,
    routing: RoutingTable,
    running: AtomicBool,
    /// 选核与再均衡的互斥锁，保证负载读数单调
    balancer_lock: Mutex<()>,
    sampler: Mutex<HostSampler>,
}

impl HiveSystem {
    /// 按配置构造系统，核心实例立即创建，worker在start时启动
    pub fn new(config: SystemConfig) -> Self {
        let next_pid = Arc::new(AtomicU64::new(0));
        let agents: Vec<Arc<CoreKernel>> = (0..config.cores)
            .map(|id| Arc::new(CoreKernel::new(id, Arc::clone(&next_pid), &config)))
            .collect();
        let routing: RoutingTable = Arc::new(agents.clone());

        info!("==================================================");
        info!("  MULTIKERNEL OPERATING SYSTEM INITIALIZED");
        info!("  Cores: {}", config.cores);
        info!("  Message Queue Size: {}", config.queue_capacity);
        info!("==================================================");

        Self {
            config,
            agents,
            routing,
            running: AtomicBool::new(false),
            balancer_lock: Mutex::new(()),
            sampler: Mutex::new(HostSampler::new()),
        }
    }

    /// 默认配置的系统
    pub fn with_defaults() -> Self {
        Self::new(SystemConfig::default())
    }

    /// 启动全部核心
    ///
    /// 路由表在构造时已完整建立，这里只负责逐核拉起worker，所以
    /// 第一条消息流动之前每个核心都能看到全部对端。幂等。
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("[SYSTEM] Already running");
            return;
        }
        for agent in &self.agents {
            agent.start(Arc::clone(&self.routing));
        }
        info!("[SYSTEM] All cores started successfully");
        info!("[SYSTEM] Message-passing infrastructure active");
        info!("[SYSTEM] Ready for process creation");
    }

    /// 停机：先向每个核心投递SHUTDOWN，再逐核stop合流。幂等
    pub fn shutdown(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        info!("[SYSTEM] Initiating shutdown...");

        for agent in &self.agents {
            // 经由核心自身的send计数，收发两侧账目对称
            agent.send(Message::system(agent.core_id(), MessageType::Shutdown));
        }
        for agent in &self.agents {
            agent.stop();
        }

        info!("[SYSTEM] Shutdown complete");
    }

    /// 在最小负载核心上创建进程
    pub fn create_process(&self, priority: u8) -> Result<Pid, HiveError> {
        if !self.running.load(Ordering::SeqCst) {
            error!("[SYSTEM] Cannot create process: system not running");
            return Err(HiveError::NotRunning);
        }

        let target = self.least_loaded_core();
        let Some(agent) = self.agents.get(target) else {
            return Err(HiveError::InvalidCore(target));
        };
        let pid = agent.create_local_process(priority);
        info!(
            "[SYSTEM] Process {} assigned to Core {} (load={})",
            pid,
            target,
            agent.load()
        );
        Ok(pid)
    }

    /// 发起一次显式迁移，委托给源核心执行
    pub fn migrate_process(&self, pid: Pid, source: CoreId, target: CoreId) -> bool {
        if source >= self.config.cores || target >= self.config.cores {
            error!("[SYSTEM] Invalid core IDs for migration");
            return false;
        }
        if !self.running.load(Ordering::SeqCst) {
            error!("[SYSTEM] Cannot migrate: system not running");
            return false;
        }
        self.agents[source].migrate_process(pid, target)
    }

    /// 最小负载核心编号，平局取最小编号
    ///
    /// 均衡锁内完成整轮读数，保证并发调用读到单调的负载序列。
    pub fn least_loaded_core(&self) -> CoreId {
        let _guard = self.balancer_lock.lock();
        let loads = self.collect_loads();
        balancer::least_loaded(&loads).unwrap_or(0)
    }

    /// 再均衡：计算并记录迁移意图
    ///
    /// 负载只从原子计数读取，锁内不调用任何核心方法，结构上排除
    /// 协调器与核心间的死锁。
    pub fn balance_load(&self) -> Vec<MigrationIntent> {
        let _guard = self.balancer_lock.lock();
        let loads = self.collect_loads();
        let total: usize = loads.iter().sum();
        if total == 0 {
            return Vec::new();
        }

        info!(
            "[LOAD BALANCER] Average load: {:.2}",
            balancer::average(&loads)
        );
        let intents = balancer::rebalance(&loads);
        for intent in &intents {
            info!(
                "[LOAD BALANCER] Core {} overloaded (load={})",
                intent.source, loads[intent.source]
            );
            info!(
                "[LOAD BALANCER] Would migrate process from Core {} to Core {}",
                intent.source, intent.target
            );
        }
        intents
    }

    /// 核心0向其余核心广播心跳，负载携带宿主机指标
    pub fn heartbeat_fanout(&self) {
        if !self.running.load(Ordering::SeqCst) {
            error!("[SYSTEM] Cannot send heartbeats: system not running");
            return;
        }
        let Some(origin) = self.agents.first() else {
            return;
        };
        info!("[SYSTEM] Core 0 sending heartbeat to all other cores...");
        let payload = self.sampler.lock().heartbeat_payload();
        origin.broadcast(MessageType::Heartbeat, None, &payload);
    }

    /// 资源消息演示：核心0-3向核心4请求资源，核心4逐个应答释放
    pub fn resource_demo(&self) {
        if !self.running.load(Ordering::SeqCst) {
            error!("[SYSTEM] Cannot demo resources: system not running");
            return;
        }
        if self.config.cores <= RESOURCE_MANAGER_CORE {
            warn!(
                "[SYSTEM] Resource demo needs at least {} cores",
                RESOURCE_MANAGER_CORE + 1
            );
            return;
        }

        info!("[SYSTEM] Simulating resource contention...");
        for requester in 0..RESOURCE_MANAGER_CORE {
            self.agents[requester].send(Message::new(
                Some(requester),
                RESOURCE_MANAGER_CORE,
                MessageType::ResourceRequest,
                None,
                format!("resource=shared requester={}", requester),
            ));
        }
        for requester in 0..RESOURCE_MANAGER_CORE {
            self.agents[RESOURCE_MANAGER_CORE].send(Message::new(
                Some(RESOURCE_MANAGER_CORE),
                requester,
                MessageType::ResourceRelease,
                None,
                format!("resource=shared granted={}", requester),
            ));
        }
    }

    /// 聚合统计快照
    pub fn snapshot(&self) -> SystemSnapshot {
        SystemSnapshot::from_cores(
            self.agents
                .iter()
                .map(|agent| agent.get_statistics())
                .collect(),
        )
    }

    /// 通信开销占比
    pub fn comm_overhead_pct(&self) -> f64 {
        self.snapshot().comm_overhead_pct
    }

    /// 渲染统计报表
    pub fn report(&self) -> String {
        self.snapshot().render()
    }

    /// 在所有核心中定位pid
    pub fn locate(&self, pid: Pid) -> Option<CoreId> {
        self.agents
            .iter()
            .find(|agent| agent.resident_pids().contains(&pid))
            .map(|agent| agent.core_id())
    }

    /// 核心数量
    pub fn cores(&self) -> usize {
        self.config.cores
    }

    /// 系统是否在运行
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// 访问指定核心(测试驱动用)
    pub fn agent(&self, core: CoreId) -> Option<&Arc<CoreKernel>> {
        self.agents.get(core)
    }

    fn collect_loads(&self) -> Vec<usize> {
        self.agents.iter().map(|agent| agent.load()).collect()
    }
}

impl Drop for HiveSystem {
    fn drop(&mut self) {
        self.shutdown();
    }
}
