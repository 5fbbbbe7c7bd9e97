//! 随机终止排水测试
//!
//! 固定种子下，100个进程在2秒空转内至少90%被随机终止；负载在
//! 创建停止后只降不升。

mod test_utils;

use std::time::Duration;

use test_utils::{started_system, wait_until};

fn total_load(system: &hive_os::HiveSystem) -> usize {
    system
        .snapshot()
        .per_core
        .iter()
        .map(|c| c.current_load)
        .sum()
}

#[test]
fn test_stochastic_drainage() {
    let system = started_system();

    for _ in 0..100 {
        system.create_process(5).expect("创建进程失败");
    }

    // 空转2秒：负载应降到创建量的10%以下
    assert!(
        wait_until(Duration::from_secs(2), || total_load(&system) <= 10),
        "2秒后仍有{}个进程存活",
        total_load(&system)
    );

    system.shutdown();
}

#[test]
fn test_load_trends_downward() {
    let system = started_system();

    for _ in 0..64 {
        system.create_process(5).unwrap();
    }

    // 创建停止后没有新来源，负载单调不增
    let mut prev = total_load(&system);
    for _ in 0..12 {
        std::thread::sleep(Duration::from_millis(100));
        let now = total_load(&system);
        assert!(now <= prev, "负载不应回升: {} -> {}", prev, now);
        prev = now;
    }

    system.shutdown();
}

#[test]
fn test_load_matches_table_len() {
    let system = started_system();

    for _ in 0..32 {
        system.create_process(5).unwrap();
    }

    // 排水完成后系统静止，负载读数必须与进程表长度一致
    assert!(wait_until(Duration::from_secs(5), || total_load(&system) == 0));
    for core in 0..system.cores() {
        let agent = system.agent(core).unwrap();
        assert_eq!(agent.load(), 0);
        assert!(agent.resident_pids().is_empty());
    }

    system.shutdown();
}

#[test]
fn test_executed_counts_grow_under_load() {
    let system = started_system();

    for _ in 0..32 {
        system.create_process(5).unwrap();
    }
    let before = system.snapshot().total_processes_executed;
    std::thread::sleep(Duration::from_millis(400));
    let after = system.snapshot().total_processes_executed;
    assert!(after > before, "有负载时执行计数必须增长");

    system.shutdown();
}
