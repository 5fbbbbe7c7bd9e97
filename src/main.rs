//! 脚本化场景驱动 - 主演示程序
//!
//! 按固定脚本依次演示进程放置、核心间消息、显式迁移、心跳、资源
//! 消息、再均衡与SMP对照。干净停机后退出码0，初始化失败非0。
//! stdout按行输出，外部看板逐行解析[MSG]/[Core]/[SYSTEM]等前缀。

use std::io::Write;
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use hive_os::{HiveError, HiveSystem, Pid, SmpSystem, SystemConfig};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .target(env_logger::Target::Stdout)
        .init();

    println!("==========================================================");
    println!("       MULTIKERNEL OPERATING SYSTEM SIMULATOR");
    println!("   Treating Multi-Core Systems as Distributed Systems");
    println!("==========================================================");

    match run(SystemConfig::default()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("initialization failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(config: SystemConfig) -> Result<(), HiveError> {
    if config.cores == 0 {
        return Err(HiveError::InvalidCore(0));
    }

    let system = HiveSystem::new(config);
    system.start();

    demo_basic_operation(&system);
    println!("{}", system.report());

    demo_explicit_migration(&system);
    println!("{}", system.report());

    demo_heartbeat(&system);
    demo_resource_contention(&system);
    println!("{}", system.report());

    demo_load_balancing(&system);
    demo_scalability(&system);
    println!("{}", system.report());

    demo_smp_comparison();

    system.shutdown();
    Ok(())
}

/// 演示1: 基础进程创建与按负载放置
fn demo_basic_operation(system: &HiveSystem) {
    println!("\n=== DEMO 1: Basic Process Creation ===");
    for i in 0..8u8 {
        let priority = (i % 10) + 1;
        let _ = system.create_process(priority);
        thread::sleep(Duration::from_millis(100));
    }
    thread::sleep(Duration::from_secs(1));
}

/// 演示2: 显式迁移消息
fn demo_explicit_migration(system: &HiveSystem) {
    println!("\n=== DEMO 2: Explicit Process Migration ===");
    let pids: Vec<Pid> = (0..6)
        .filter_map(|_| {
            let pid = system.create_process(5).ok();
            thread::sleep(Duration::from_millis(100));
            pid
        })
        .collect();

    thread::sleep(Duration::from_millis(500));

    for pid in pids.iter().take(3) {
        if let Some(source) = system.locate(*pid) {
            let target = (source + 4) % system.cores();
            system.migrate_process(*pid, source, target);
            thread::sleep(Duration::from_millis(300));
        }
    }
    thread::sleep(Duration::from_secs(1));
}

/// 演示3: 心跳扇出
fn demo_heartbeat(system: &HiveSystem) {
    println!("\n=== DEMO 3: Core Heartbeat Messages ===");
    system.heartbeat_fanout();
    thread::sleep(Duration::from_secs(1));
}

/// 演示4: 资源请求/释放消息
fn demo_resource_contention(system: &HiveSystem) {
    println!("\n=== DEMO 4: Resource Request/Release Messages ===");
    system.resource_demo();
    thread::sleep(Duration::from_secs(1));
}

/// 演示5: 动态再均衡
fn demo_load_balancing(system: &HiveSystem) {
    println!("\n=== DEMO 5: Dynamic Load Balancing ===");
    for _ in 0..10 {
        let _ = system.create_process(5);
        thread::sleep(Duration::from_millis(80));
    }
    thread::sleep(Duration::from_millis(500));
    let intents = system.balance_load();
    println!("[LOAD BALANCER] {} migration intents recorded", intents.len());
    thread::sleep(Duration::from_millis(800));
}

/// 演示6: 放置吞吐
fn demo_scalability(system: &HiveSystem) {
    println!("\n=== DEMO 6: Scalability Test ===");
    let start = Instant::now();
    for i in 0..20u8 {
        let _ = system.create_process((i % 10) + 1);
        thread::sleep(Duration::from_millis(40));
    }
    println!(
        "Created 20 processes in {}ms",
        start.elapsed().as_millis()
    );
    thread::sleep(Duration::from_secs(1));
}

/// 演示7: SMP对照组，同一负载在单把全局锁下的代价
fn demo_smp_comparison() {
    println!("\n=== DEMO 7: Multikernel vs Traditional SMP ===");
    let mut smp = SmpSystem::new(hive_os::NUM_CORES);
    smp.start();
    for _ in 0..20 {
        smp.create_process(5);
        thread::sleep(Duration::from_millis(50));
    }
    thread::sleep(Duration::from_millis(500));
    println!("{}", smp.report());
    smp.stop();
}
