//! 有界收件箱 - 单消费者FIFO消息队列
//!
//! 每个核心持有一个收件箱，是该核心唯一的消息入口。push满时立即
//! 拒绝并让发送方可见，绝不阻塞发送方；消费侧支持阻塞/非阻塞两种
//! 取出方式。内部实现为一把互斥锁加一个条件变量，锁只在入队、
//! 出队和唤醒期间持有。

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::message::Message;

/// push操作的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// 消息已入队
    Accepted,
    /// 队列已满，消息被拒绝
    Rejected,
}

/// 有界FIFO收件箱
pub struct Inbox {
    queue: Mutex<VecDeque<Message>>,
    available: Condvar,
    capacity: usize,
    /// 关闭后阻塞中的消费者立即返回None
    closed: AtomicBool,
}

impl Inbox {
    /// 创建指定容量的收件箱
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            available: Condvar::new(),
            capacity,
            closed: AtomicBool::new(false),
        }
    }

    /// 入队消息
    ///
    /// 占用量达到容量时快速失败，溢出对发送方可见，永不丢弃队列
    /// 中间的消息。成功时唤醒一个等待中的消费者。
    pub fn push(&self, msg: Message) -> PushOutcome {
        let mut queue = self.queue.lock();
        if queue.len() >= self.capacity {
            return PushOutcome::Rejected;
        }
        queue.push_back(msg);
        drop(queue);
        self.available.notify_one();
        PushOutcome::Accepted
    }

    /// 阻塞取出，最多等待timeout
    ///
    /// 超时或收件箱已被wake_all关闭时返回None。timeout为零等价于
    /// 非阻塞取出。
    pub fn pop_blocking(&self, timeout: Duration) -> Option<Message> {
        let deadline = Instant::now() + timeout;
        let mut queue = self.queue.lock();
        loop {
            if let Some(msg) = queue.pop_front() {
                return Some(msg);
            }
            if self.closed.load(Ordering::Acquire) {
                return None;
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let _ = self.available.wait_for(&mut queue, deadline - now);
        }
    }

    /// 非阻塞取出
    pub fn pop_nonblocking(&self) -> Option<Message> {
        self.queue.lock().pop_front()
    }

    /// 关闭并唤醒所有阻塞中的消费者，用于停机
    pub fn wake_all(&self) {
        self.closed.store(true, Ordering::Release);
        self.available.notify_all();
    }

    /// 当前占用量
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// 容量上限
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl fmt::Debug for Inbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inbox")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}
