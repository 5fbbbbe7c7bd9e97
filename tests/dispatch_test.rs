//! 消息分发集成测试
//!
//! CREATE与TERMINATE走完整的收件箱分发路径：消息入队、worker唤醒、
//! 按类型分发、负载解析。与直接调用create_local_process的放置测试
//! 互补。

mod test_utils;

use std::time::Duration;

use hive_os::message::priority_payload;
use hive_os::{Message, MessageType};
use test_utils::{frozen_system, wait_until};

#[test]
fn test_create_message_spawns_process() {
    let system = frozen_system();

    let agent = system.agent(0).unwrap();
    agent.inbox().push(Message::new(
        Some(1),
        0,
        MessageType::Create,
        None,
        priority_payload(7),
    ));

    // worker被消息唤醒后在本地建进程
    assert!(wait_until(Duration::from_secs(2), || agent.load() == 1));
    assert_eq!(agent.resident_pids().len(), 1);

    system.shutdown();
}

#[test]
fn test_create_message_with_malformed_payload() {
    let system = frozen_system();

    // 负载乱码时回退默认优先级，进程照常创建
    let agent = system.agent(2).unwrap();
    agent.inbox().push(Message::new(
        Some(0),
        2,
        MessageType::Create,
        None,
        "priority=garbage",
    ));

    assert!(wait_until(Duration::from_secs(2), || agent.load() == 1));

    system.shutdown();
}

#[test]
fn test_terminate_message_removes_process() {
    let system = frozen_system();

    let pid = system.create_process(5).unwrap();
    let holder = system.locate(pid).unwrap();
    let agent = system.agent(holder).unwrap();
    assert_eq!(agent.load(), 1);

    agent.inbox().push(Message::new(
        Some((holder + 1) % system.cores()),
        holder,
        MessageType::Terminate,
        Some(pid),
        "",
    ));

    assert!(wait_until(Duration::from_secs(2), || agent.load() == 0));
    assert!(system.locate(pid).is_none());

    system.shutdown();
}

#[test]
fn test_terminate_unknown_pid_ignored() {
    let system = frozen_system();

    let pid = system.create_process(5).unwrap();
    let holder = system.locate(pid).unwrap();
    let agent = system.agent(holder).unwrap();

    agent.inbox().push(Message::new(
        Some(0),
        holder,
        MessageType::Terminate,
        Some(9999),
        "",
    ));

    // 未知pid静默忽略，现有进程不受影响
    assert!(wait_until(Duration::from_secs(2), || {
        agent.get_statistics().messages_received >= 1
    }));
    assert_eq!(agent.load(), 1);
    assert_eq!(system.locate(pid), Some(holder));
    assert!(system.is_running());

    system.shutdown();
}

#[test]
fn test_terminate_without_pid_ignored() {
    let system = frozen_system();

    let pid = system.create_process(5).unwrap();
    let holder = system.locate(pid).unwrap();
    let agent = system.agent(holder).unwrap();

    agent
        .inbox()
        .push(Message::new(Some(0), holder, MessageType::Terminate, None, ""));

    assert!(wait_until(Duration::from_secs(2), || {
        agent.get_statistics().messages_received >= 1
    }));
    assert_eq!(agent.load(), 1);

    system.shutdown();
}
