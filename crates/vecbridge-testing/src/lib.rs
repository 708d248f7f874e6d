//! VecBridge Testing - 内存中的模拟后端客户端与测试记录

pub mod fixtures;
pub mod qdrant;
pub mod redis;
pub mod search;

pub use fixtures::*;
pub use qdrant::MockQdrant;
pub use redis::MockRedis;
pub use search::MockSearchIndex;

use std::sync::{Arc, Mutex};
use vecbridge_vector::{ClientError, ClientResult};

/// 各模拟客户端共用的调用计数与故障注入
#[derive(Clone, Default)]
pub struct MockControl {
    call_count: Arc<Mutex<u32>>,
    should_fail: Arc<Mutex<bool>>,
    create_race: Arc<Mutex<bool>>,
}

impl MockControl {
    pub fn call_count(&self) -> u32 {
        *self.call_count.lock().unwrap()
    }

    pub fn reset_count(&self) {
        *self.call_count.lock().unwrap() = 0;
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        *self.should_fail.lock().unwrap() = should_fail;
    }

    /// 模拟 "检查后创建" 之间另一个进程抢先创建了集合：
    /// 存在性检查返回不存在，创建返回已存在
    pub fn set_create_race(&self, race: bool) {
        *self.create_race.lock().unwrap() = race;
    }

    pub fn create_race(&self) -> bool {
        *self.create_race.lock().unwrap()
    }

    /// 记录一次调用，故障注入开启时返回传输错误
    pub fn enter(&self, backend: &str) -> ClientResult<()> {
        *self.call_count.lock().unwrap() += 1;

        if *self.should_fail.lock().unwrap() {
            return Err(ClientError::Transport(format!("Mock {} error", backend)));
        }
        Ok(())
    }
}
