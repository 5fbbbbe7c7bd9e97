//! 核心间通信消息定义
//!
//! 消息是值语义的数据包：发送即复制，负载为key=value文本，
//! 超出MAX_MESSAGE_SIZE的部分在构造时截断。时间戳由发送方在
//! 入队时刻填写，接收方只读。

use std::fmt;
use std::time::Instant;

use crate::{CoreId, Pid, MAX_MESSAGE_SIZE};

/// 默认进程优先级
pub const DEFAULT_PRIORITY: u8 = 5;

/// 优先级上限(0-10，数值越大越紧急)
pub const MAX_PRIORITY: u8 = 10;

/// 消息类型枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum MessageType {
    /// 创建新进程
    Create,
    /// 进程迁移到另一核心
    Migrate,
    /// 终止进程
    Terminate,
    /// 请求共享资源
    ResourceRequest,
    /// 释放共享资源
    ResourceRelease,
    /// 同步屏障
    SyncBarrier,
    /// 核心健康心跳
    Heartbeat,
    /// 关机信号
    Shutdown,
}

impl MessageType {
    /// 日志与外部看板使用的稳定名称
    pub fn as_str_name(&self) -> &'static str {
        match self {
            MessageType::Create => "CREATE",
            MessageType::Migrate => "MIGRATE",
            MessageType::Terminate => "TERMINATE",
            MessageType::ResourceRequest => "RESOURCE_REQUEST",
            MessageType::ResourceRelease => "RESOURCE_RELEASE",
            MessageType::SyncBarrier => "SYNC_BARRIER",
            MessageType::Heartbeat => "HEARTBEAT",
            MessageType::Shutdown => "SHUTDOWN",
        }
    }

    /// 从稳定名称解析
    pub fn from_str_name(value: &str) -> Option<Self> {
        match value {
            "CREATE" => Some(Self::Create),
            "MIGRATE" => Some(Self::Migrate),
            "TERMINATE" => Some(Self::Terminate),
            "RESOURCE_REQUEST" => Some(Self::ResourceRequest),
            "RESOURCE_RELEASE" => Some(Self::ResourceRelease),
            "SYNC_BARRIER" => Some(Self::SyncBarrier),
            "HEARTBEAT" => Some(Self::Heartbeat),
            "SHUTDOWN" => Some(Self::Shutdown),
            _ => None,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str_name())
    }
}

/// 核心间通信数据包
#[derive(Debug, Clone)]
pub struct Message {
    /// 发送方核心(None表示系统来源)
    pub source: Option<CoreId>,
    /// 接收方核心，入队时必须在[0, N)内
    pub dest: CoreId,
    /// 消息类型
    pub msg_type: MessageType,
    /// 关联的进程ID
    pub process_id: Option<Pid>,
    /// key=value文本负载
    pub payload: String,
    /// 发送方入队时刻，用于延迟统计
    pub sent_at: Instant,
}

impl Message {
    /// 构造新消息，负载截断到MAX_MESSAGE_SIZE
    pub fn new(
        source: Option<CoreId>,
        dest: CoreId,
        msg_type: MessageType,
        process_id: Option<Pid>,
        payload: impl Into<String>,
    ) -> Self {
        let mut payload = payload.into();
        truncate_to_boundary(&mut payload, MAX_MESSAGE_SIZE);
        Self {
            source,
            dest,
            msg_type,
            process_id,
            payload,
            sent_at: Instant::now(),
        }
    }

    /// 系统来源的控制消息
    pub fn system(dest: CoreId, msg_type: MessageType) -> Self {
        Self::new(None, dest, msg_type, None, "")
    }

    /// 发送方在日志中的显示名
    pub fn source_label(&self) -> String {
        match self.source {
            Some(id) => format!("Core {}", id),
            None => "SYSTEM".to_string(),
        }
    }
}

/// 构造priority=<n>负载
pub fn priority_payload(priority: u8) -> String {
    format!("priority={}", priority)
}

/// 从负载解析priority键值，缺失或非法时回退默认值并钳制到0-10
pub fn parse_priority(payload: &str) -> u8 {
    payload
        .split_whitespace()
        .find_map(|pair| pair.strip_prefix("priority="))
        .and_then(|v| v.parse::<u8>().ok())
        .unwrap_or(DEFAULT_PRIORITY)
        .min(MAX_PRIORITY)
}

/// 在字符边界上截断，负载始终是合法UTF-8
fn truncate_to_boundary(s: &mut String, max_bytes: usize) {
    if s.len() <= max_bytes {
        return;
    }
    let mut cut = max_bytes;
    while cut > 0 && !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
}
