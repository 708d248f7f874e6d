//! 模式读取器：把声明分类为键、数据、向量属性，并按类型缓存结果

use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::any::TypeId;
use std::collections::HashSet;
use std::sync::Arc;

use vecbridge_core::{Result, VecBridgeError};

use super::{KeyProperty, RecordDefinition, RecordProperty, RecordSchema};

/// 可存入向量存储的记录类型
///
/// 记录通过 serde 序列化，属性按 serde 字段名匹配。读取时若不包含向量，
/// 向量字段需要能够缺省 (`Option<Vec<f32>>` 或 `#[serde(default)]`)。
pub trait VectorStoreRecord: Serialize + DeserializeOwned + Send + Sync + 'static {
    fn record_definition() -> RecordDefinition;
}

static SCHEMA_CACHE: Lazy<DashMap<TypeId, Arc<RecordSchema>>> = Lazy::new(DashMap::new);

pub struct SchemaReader;

impl SchemaReader {
    /// 从声明推导模式
    pub fn derive(definition: &RecordDefinition) -> Result<RecordSchema> {
        let mut key: Option<KeyProperty> = None;
        let mut data = Vec::new();
        let mut vectors = Vec::new();
        let mut names = HashSet::new();
        let mut storage_names = HashSet::new();

        for property in &definition.properties {
            let name = property.name();
            if name.is_empty() {
                return Err(VecBridgeError::Schema("属性名不能为空".to_string()));
            }
            if !names.insert(name) {
                return Err(VecBridgeError::Schema(format!(
                    "属性 '{}' 被重复声明",
                    name
                )));
            }
            if !storage_names.insert(property.storage_name()) {
                return Err(VecBridgeError::Schema(format!(
                    "存储字段名 '{}' 被多个属性使用",
                    property.storage_name()
                )));
            }

            match property {
                RecordProperty::Key(p) => {
                    if let Some(existing) = &key {
                        return Err(VecBridgeError::Schema(format!(
                            "发现多个键属性: '{}' 和 '{}'",
                            existing.name, p.name
                        )));
                    }
                    key = Some(p.clone());
                }
                RecordProperty::Data(p) => data.push(p.clone()),
                RecordProperty::Vector(p) => {
                    if p.element_type.is_none() {
                        return Err(VecBridgeError::Schema(format!(
                            "向量属性 '{}' 缺少元素类型",
                            p.name
                        )));
                    }
                    if p.dimensions == Some(0) {
                        return Err(VecBridgeError::Schema(format!(
                            "向量属性 '{}' 的维度必须大于 0",
                            p.name
                        )));
                    }
                    vectors.push(p.clone());
                }
            }
        }

        let key = key.ok_or_else(|| VecBridgeError::Schema("未找到键属性".to_string()))?;
        if vectors.is_empty() {
            return Err(VecBridgeError::Schema("至少需要一个向量属性".to_string()));
        }

        Ok(RecordSchema {
            properties: definition.properties.clone(),
            key,
            data,
            vectors,
        })
    }

    /// 获取记录类型的模式，每个类型只推导一次
    pub fn schema_for<R: VectorStoreRecord>() -> Result<Arc<RecordSchema>> {
        let type_id = TypeId::of::<R>();
        if let Some(schema) = SCHEMA_CACHE.get(&type_id) {
            return Ok(schema.clone());
        }

        let schema = Arc::new(Self::derive(&R::record_definition())?);
        tracing::debug!(
            "Derived schema for {} ({} properties)",
            std::any::type_name::<R>(),
            schema.properties().len()
        );
        Ok(SCHEMA_CACHE.entry(type_id).or_insert(schema).clone())
    }

    /// 显式定义优先，否则使用类型自身的声明
    pub fn resolve<R: VectorStoreRecord>(
        definition: Option<&RecordDefinition>,
    ) -> Result<Arc<RecordSchema>> {
        match definition {
            Some(definition) => Ok(Arc::new(Self::derive(definition)?)),
            None => Self::schema_for::<R>(),
        }
    }
}
