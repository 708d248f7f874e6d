use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use vecbridge_vector::{
    ClientError, ClientResult, HashEntry, RedisClient, RedisHashClient, RedisIndexDefinition,
    RedisIndexInfo, RedisJsonClient, RedisStorageType,
};

use crate::MockControl;

#[derive(Default)]
struct RedisState {
    indexes: BTreeMap<String, RedisIndexDefinition>,
    json: BTreeMap<String, Value>,
    hashes: BTreeMap<String, Vec<HashEntry>>,
}

/// 同时支持 RediSearch、RedisJSON 与 Hash 命令的内存 Redis
#[derive(Clone, Default)]
pub struct MockRedis {
    state: Arc<Mutex<RedisState>>,
    control: MockControl,
}

impl MockRedis {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn control(&self) -> &MockControl {
        &self.control
    }

    pub fn call_count(&self) -> u32 {
        self.control.call_count()
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.control.set_should_fail(should_fail);
    }

    /// 所有物理键 (JSON 与 Hash)，已排序
    pub fn keys(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        let mut keys: Vec<String> = state
            .json
            .keys()
            .chain(state.hashes.keys())
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    pub fn json_value(&self, key: &str) -> Option<Value> {
        self.state.lock().unwrap().json.get(key).cloned()
    }

    pub fn hash_entries(&self, key: &str) -> Option<Vec<HashEntry>> {
        self.state.lock().unwrap().hashes.get(key).cloned()
    }

    pub fn index(&self, name: &str) -> Option<RedisIndexDefinition> {
        self.state.lock().unwrap().indexes.get(name).cloned()
    }

    /// 绕过映射直接写入，用于构造异常数据
    pub fn put_json(&self, key: &str, value: Value) {
        self.state
            .lock()
            .unwrap()
            .json
            .insert(key.to_string(), value);
    }

    fn project(value: &Value, paths: Option<&[String]>) -> Value {
        match (value, paths) {
            (Value::Object(object), Some(paths)) => {
                let projected: Map<String, Value> = object
                    .iter()
                    .filter(|(k, _)| paths.contains(k))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                Value::Object(projected)
            }
            _ => value.clone(),
        }
    }
}

#[async_trait]
impl RedisClient for MockRedis {
    async fn ft_create(&self, definition: &RedisIndexDefinition) -> ClientResult<()> {
        self.control.enter("redis")?;

        if self.control.create_race() {
            return Err(ClientError::AlreadyExists("Index already exists".to_string()));
        }

        let mut state = self.state.lock().unwrap();
        if state.indexes.contains_key(&definition.name) {
            return Err(ClientError::AlreadyExists("Index already exists".to_string()));
        }
        state
            .indexes
            .insert(definition.name.clone(), definition.clone());
        Ok(())
    }

    async fn ft_info(&self, index: &str) -> ClientResult<RedisIndexInfo> {
        self.control.enter("redis")?;

        let state = self.state.lock().unwrap();
        let definition = state
            .indexes
            .get(index)
            .ok_or_else(|| ClientError::NotFound("Unknown index name".to_string()))?;

        let keys: Vec<&String> = match definition.storage_type {
            RedisStorageType::Json => state.json.keys().collect(),
            RedisStorageType::Hash => state.hashes.keys().collect(),
        };
        let num_docs = keys
            .into_iter()
            .filter(|k| {
                definition.prefixes.is_empty()
                    || definition.prefixes.iter().any(|p| k.starts_with(p.as_str()))
            })
            .count() as u64;

        Ok(RedisIndexInfo {
            name: definition.name.clone(),
            storage_type: definition.storage_type,
            num_docs,
        })
    }

    async fn ft_dropindex(&self, index: &str) -> ClientResult<()> {
        self.control.enter("redis")?;

        match self.state.lock().unwrap().indexes.remove(index) {
            Some(_) => Ok(()),
            None => Err(ClientError::NotFound("Unknown index name".to_string())),
        }
    }

    async fn ft_list(&self) -> ClientResult<Vec<String>> {
        self.control.enter("redis")?;
        Ok(self.state.lock().unwrap().indexes.keys().cloned().collect())
    }

    async fn del(&self, keys: &[String]) -> ClientResult<u64> {
        self.control.enter("redis")?;

        let mut state = self.state.lock().unwrap();
        let mut removed = 0;
        for key in keys {
            if state.json.remove(key).is_some() || state.hashes.remove(key).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl RedisJsonClient for MockRedis {
    async fn json_get(&self, key: &str, paths: Option<&[String]>) -> ClientResult<Option<Value>> {
        self.control.enter("redis")?;

        let state = self.state.lock().unwrap();
        Ok(state.json.get(key).map(|v| Self::project(v, paths)))
    }

    async fn json_mget(
        &self,
        keys: &[String],
        paths: Option<&[String]>,
    ) -> ClientResult<Vec<Option<Value>>> {
        self.control.enter("redis")?;

        let state = self.state.lock().unwrap();
        Ok(keys
            .iter()
            .map(|key| state.json.get(key).map(|v| Self::project(v, paths)))
            .collect())
    }

    async fn json_mset(&self, entries: &[(String, Value)]) -> ClientResult<()> {
        self.control.enter("redis")?;

        let mut state = self.state.lock().unwrap();
        for (key, value) in entries {
            state.json.insert(key.clone(), value.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl RedisHashClient for MockRedis {
    async fn hget(&self, key: &str, fields: Option<&[String]>) -> ClientResult<Option<Vec<HashEntry>>> {
        self.control.enter("redis")?;

        if fields.is_some_and(|f| f.is_empty()) {
            return Err(ClientError::Transport(
                "ERR wrong number of arguments for 'hmget' command".to_string(),
            ));
        }

        let state = self.state.lock().unwrap();
        Ok(state.hashes.get(key).map(|entries| match fields {
            Some(fields) => entries
                .iter()
                .filter(|e| fields.contains(&e.field))
                .cloned()
                .collect(),
            None => entries.clone(),
        }))
    }

    async fn hset_multiple(&self, records: &[(String, Vec<HashEntry>)]) -> ClientResult<()> {
        self.control.enter("redis")?;

        let mut state = self.state.lock().unwrap();
        for (key, entries) in records {
            state.hashes.insert(key.clone(), entries.clone());
        }
        Ok(())
    }
}
