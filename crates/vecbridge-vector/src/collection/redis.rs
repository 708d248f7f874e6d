//! RediSearch 索引管理 (JSON 与 Hash 共用)

use async_trait::async_trait;
use std::sync::Arc;

use vecbridge_core::{Result, VecBridgeError};

use super::{CollectionManager, CollectionNames, lazy_names, require_dimensions};
use crate::client::{
    ClientError, RedisClient, RedisDistanceMetric, RedisFieldKind, RedisIndexDefinition,
    RedisIndexField, RedisStorageType, RedisVectorAlgorithm,
};
use crate::schema::{
    DataProperty, DataType, DistanceFunction, IndexKind, RecordProperty, RecordSchema,
    VectorElementType, VectorProperty,
};

const BACKEND: &str = "redis";

pub struct RedisCollectionManager {
    client: Arc<dyn RedisClient>,
    storage_type: RedisStorageType,
    prefix_keys: bool,
}

impl RedisCollectionManager {
    pub fn new(client: Arc<dyn RedisClient>, storage_type: RedisStorageType, prefix_keys: bool) -> Self {
        Self {
            client,
            storage_type,
            prefix_keys,
        }
    }

    /// 把模式翻译为 FT.CREATE 请求
    pub fn index_definition(&self, name: &str, schema: &RecordSchema) -> Result<RedisIndexDefinition> {
        let mut fields = Vec::new();
        for property in schema.properties() {
            match property {
                RecordProperty::Key(_) => {}
                RecordProperty::Data(p) => {
                    if let Some(field) = self.data_field(p)? {
                        fields.push(field);
                    }
                }
                RecordProperty::Vector(p) => fields.push(self.vector_field(p)?),
            }
        }

        let prefixes = if self.prefix_keys {
            vec![format!("{}:", name)]
        } else {
            Vec::new()
        };

        Ok(RedisIndexDefinition {
            name: name.to_string(),
            storage_type: self.storage_type,
            prefixes,
            fields,
        })
    }

    fn path(&self, storage_name: &str) -> String {
        match self.storage_type {
            RedisStorageType::Json => format!("$.{}", storage_name),
            RedisStorageType::Hash => storage_name.to_string(),
        }
    }

    fn data_field(&self, property: &DataProperty) -> Result<Option<RedisIndexField>> {
        let storage_name = property.storage_name();

        if property.is_full_text_searchable {
            if property.data_type != DataType::String {
                return Err(VecBridgeError::Config(format!(
                    "全文检索属性 '{}' 必须是字符串类型",
                    property.name
                )));
            }
            return Ok(Some(RedisIndexField {
                path: self.path(storage_name),
                alias: storage_name.to_string(),
                kind: RedisFieldKind::Text,
            }));
        }

        if !property.is_filterable {
            return Ok(None);
        }

        let (path, kind) = match &property.data_type {
            DataType::String | DataType::Guid | DataType::Bool => {
                (self.path(storage_name), RedisFieldKind::Tag)
            }
            data_type if data_type.is_numeric() => (self.path(storage_name), RedisFieldKind::Numeric),
            DataType::Collection(inner)
                if **inner == DataType::String && self.storage_type == RedisStorageType::Json =>
            {
                (format!("$.{}.*", storage_name), RedisFieldKind::Tag)
            }
            other => {
                return Err(VecBridgeError::Config(format!(
                    "Redis 不支持过滤 {:?} 类型的属性 '{}'",
                    other, property.name
                )));
            }
        };

        Ok(Some(RedisIndexField {
            path,
            alias: storage_name.to_string(),
            kind,
        }))
    }

    fn vector_field(&self, property: &VectorProperty) -> Result<RedisIndexField> {
        let dimensions = require_dimensions(property)?;

        let algorithm = match property.index_kind {
            IndexKind::Hnsw => RedisVectorAlgorithm::Hnsw,
            IndexKind::Flat => RedisVectorAlgorithm::Flat,
        };

        let distance_metric = match property.distance_function {
            DistanceFunction::Cosine => RedisDistanceMetric::Cosine,
            DistanceFunction::DotProduct => RedisDistanceMetric::Ip,
            DistanceFunction::Euclidean => RedisDistanceMetric::L2,
            other => {
                return Err(VecBridgeError::Config(format!(
                    "Redis 不支持向量属性 '{}' 的距离函数 {:?}",
                    property.name, other
                )));
            }
        };

        let element_type = match property.element_type {
            Some(VectorElementType::Float32) => "FLOAT32",
            Some(VectorElementType::Float64) => "FLOAT64",
            other => {
                return Err(VecBridgeError::Config(format!(
                    "Redis 不支持向量属性 '{}' 的元素类型 {:?}",
                    property.name, other
                )));
            }
        };

        Ok(RedisIndexField {
            path: self.path(property.storage_name()),
            alias: property.storage_name().to_string(),
            kind: RedisFieldKind::Vector {
                algorithm,
                element_type: element_type.to_string(),
                dimensions,
                distance_metric,
            },
        })
    }
}

#[async_trait]
impl CollectionManager for RedisCollectionManager {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn create_collection(&self, name: &str, schema: &RecordSchema) -> Result<()> {
        let definition = self.index_definition(name, schema)?;
        self.client
            .ft_create(&definition)
            .await
            .map_err(|e| e.into_store_error(BACKEND, name, "FT.CREATE"))?;
        tracing::info!(
            "Created Redis {} index {} with {} fields",
            self.storage_type.as_str(),
            name,
            definition.fields.len()
        );
        Ok(())
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        match self.client.ft_info(name).await {
            Ok(_) => Ok(true),
            Err(ClientError::NotFound(_)) => Ok(false),
            Err(e) => Err(e.into_store_error(BACKEND, name, "FT.INFO")),
        }
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        match self.client.ft_dropindex(name).await {
            Ok(()) => {
                tracing::info!("Dropped Redis index {}", name);
                Ok(())
            }
            Err(ClientError::NotFound(_)) => Ok(()),
            Err(e) => Err(e.into_store_error(BACKEND, name, "FT.DROPINDEX")),
        }
    }

    fn list_collection_names(&self) -> CollectionNames {
        let client = self.client.clone();
        lazy_names(async move {
            client
                .ft_list()
                .await
                .map_err(|e| e.into_store_error(BACKEND, "*", "FT._LIST"))
        })
    }
}
