//! 搜索索引管理

use async_trait::async_trait;
use std::sync::Arc;

use vecbridge_core::{Result, VecBridgeError};

use super::{CollectionManager, CollectionNames, lazy_names, require_dimensions};
use crate::client::{
    ClientError, SearchField, SearchFieldDataType, SearchIndex, SearchIndexClient,
    VectorSearchAlgorithm, VectorSearchAlgorithmKind, VectorSearchMetric, VectorSearchProfile,
};
use crate::schema::{DataType, DistanceFunction, IndexKind, RecordProperty, RecordSchema};

const BACKEND: &str = "search";

pub struct SearchIndexCollectionManager {
    client: Arc<dyn SearchIndexClient>,
}

impl SearchIndexCollectionManager {
    pub fn new(client: Arc<dyn SearchIndexClient>) -> Self {
        Self { client }
    }

    /// 把模式翻译为索引定义
    ///
    /// 每个向量字段对应一个 `{storage}Profile` 配置和一个 `{storage}AlgoConfig` 算法。
    pub fn index_definition(name: &str, schema: &RecordSchema) -> Result<SearchIndex> {
        let mut fields = Vec::new();
        let mut algorithms = Vec::new();
        let mut profiles = Vec::new();

        for property in schema.properties() {
            match property {
                RecordProperty::Key(p) => {
                    let mut field = SearchField::simple(p.storage_name(), SearchFieldDataType::String);
                    field.key = true;
                    field.filterable = true;
                    fields.push(field);
                }
                RecordProperty::Data(p) => {
                    let field_type = field_type(&p.data_type).ok_or_else(|| {
                        VecBridgeError::Config(format!(
                            "搜索索引不支持属性 '{}' 的类型 {:?}",
                            p.name, p.data_type
                        ))
                    })?;
                    if p.is_full_text_searchable && *p.data_type.element_type() != DataType::String {
                        return Err(VecBridgeError::Config(format!(
                            "全文检索属性 '{}' 必须是字符串或字符串集合",
                            p.name
                        )));
                    }
                    let mut field = SearchField::simple(p.storage_name(), field_type);
                    field.filterable = p.is_filterable;
                    field.searchable = p.is_full_text_searchable;
                    fields.push(field);
                }
                RecordProperty::Vector(p) => {
                    let dimensions = require_dimensions(p)?;
                    let kind = match p.index_kind {
                        IndexKind::Hnsw => VectorSearchAlgorithmKind::Hnsw,
                        IndexKind::Flat => VectorSearchAlgorithmKind::ExhaustiveKnn,
                    };
                    let metric = match p.distance_function {
                        DistanceFunction::Cosine => VectorSearchMetric::Cosine,
                        DistanceFunction::DotProduct => VectorSearchMetric::DotProduct,
                        DistanceFunction::Euclidean => VectorSearchMetric::Euclidean,
                        other => {
                            return Err(VecBridgeError::Config(format!(
                                "搜索索引不支持向量属性 '{}' 的距离函数 {:?}",
                                p.name, other
                            )));
                        }
                    };

                    let algorithm_name = format!("{}AlgoConfig", p.storage_name());
                    let profile_name = format!("{}Profile", p.storage_name());
                    algorithms.push(VectorSearchAlgorithm {
                        name: algorithm_name.clone(),
                        kind,
                        metric,
                    });
                    profiles.push(VectorSearchProfile {
                        name: profile_name.clone(),
                        algorithm_name,
                    });

                    let mut field = SearchField::simple(
                        p.storage_name(),
                        SearchFieldDataType::Collection(Box::new(SearchFieldDataType::Single)),
                    );
                    field.searchable = true;
                    field.vector_dimensions = Some(dimensions);
                    field.vector_search_profile = Some(profile_name);
                    fields.push(field);
                }
            }
        }

        Ok(SearchIndex {
            name: name.to_string(),
            fields,
            algorithms,
            profiles,
        })
    }
}

fn field_type(data_type: &DataType) -> Option<SearchFieldDataType> {
    match data_type {
        DataType::String | DataType::Guid => Some(SearchFieldDataType::String),
        DataType::Bool => Some(SearchFieldDataType::Boolean),
        DataType::Int32 => Some(SearchFieldDataType::Int32),
        DataType::Int64 => Some(SearchFieldDataType::Int64),
        DataType::Float32 | DataType::Float64 => Some(SearchFieldDataType::Double),
        DataType::DateTime => Some(SearchFieldDataType::DateTimeOffset),
        DataType::Collection(inner) => match inner.as_ref() {
            DataType::Collection(_) => None,
            scalar => field_type(scalar).map(|t| SearchFieldDataType::Collection(Box::new(t))),
        },
    }
}

#[async_trait]
impl CollectionManager for SearchIndexCollectionManager {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn create_collection(&self, name: &str, schema: &RecordSchema) -> Result<()> {
        let index = Self::index_definition(name, schema)?;
        self.client
            .create_index(&index)
            .await
            .map_err(|e| e.into_store_error(BACKEND, name, "create_index"))?;
        tracing::info!("Created search index {} with {} fields", name, index.fields.len());
        Ok(())
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        match self.client.get_index(name).await {
            Ok(_) => Ok(true),
            Err(ClientError::NotFound(_)) => Ok(false),
            Err(e) => Err(e.into_store_error(BACKEND, name, "get_index")),
        }
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        match self.client.delete_index(name).await {
            Ok(()) => {
                tracing::info!("Deleted search index {}", name);
                Ok(())
            }
            Err(ClientError::NotFound(_)) => Ok(()),
            Err(e) => Err(e.into_store_error(BACKEND, name, "delete_index")),
        }
    }

    fn list_collection_names(&self) -> CollectionNames {
        let client = self.client.clone();
        lazy_names(async move {
            client
                .list_index_names()
                .await
                .map_err(|e| e.into_store_error(BACKEND, "*", "list_index_names"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DataProperty, KeyProperty, KeyType, RecordDefinition, SchemaReader, VectorProperty};
    use crate::test_support::hotel_definition;

    #[test]
    fn test_hotel_index_definition() {
        let schema = SchemaReader::derive(&hotel_definition()).unwrap();
        let index = SearchIndexCollectionManager::index_definition("hotels", &schema).unwrap();

        let key = index.key_field().unwrap();
        assert_eq!(key.name, "hotel_id");

        let rating = index.fields.iter().find(|f| f.name == "rating").unwrap();
        assert_eq!(rating.field_type, SearchFieldDataType::Double);
        assert!(rating.filterable);

        let description = index.fields.iter().find(|f| f.name == "description").unwrap();
        assert!(description.searchable);

        let renovated = index.fields.iter().find(|f| f.name == "last_renovated").unwrap();
        assert_eq!(renovated.field_type.to_string(), "Edm.DateTimeOffset");

        let embedding = index
            .fields
            .iter()
            .find(|f| f.name == "description_embedding")
            .unwrap();
        assert_eq!(embedding.field_type.to_string(), "Collection(Edm.Single)");
        assert_eq!(embedding.vector_dimensions, Some(4));
        assert_eq!(
            embedding.vector_search_profile.as_deref(),
            Some("description_embeddingProfile")
        );

        assert_eq!(index.algorithms.len(), 1);
        assert_eq!(index.algorithms[0].name, "description_embeddingAlgoConfig");
        assert_eq!(index.algorithms[0].kind, VectorSearchAlgorithmKind::Hnsw);
        assert_eq!(index.algorithms[0].metric, VectorSearchMetric::Cosine);
        assert_eq!(index.profiles[0].algorithm_name, "description_embeddingAlgoConfig");
    }

    #[test]
    fn test_flat_maps_to_exhaustive_knn_and_collections() {
        let schema = SchemaReader::derive(
            &RecordDefinition::new()
                .key(KeyProperty::new("id", KeyType::String))
                .data(DataProperty::new("tags", DataType::collection_of(DataType::String)).filterable())
                .vector(
                    VectorProperty::new("v", 3)
                        .with_index_kind(IndexKind::Flat)
                        .with_distance_function(DistanceFunction::Euclidean),
                ),
        )
        .unwrap();
        let index = SearchIndexCollectionManager::index_definition("c", &schema).unwrap();
        assert_eq!(index.fields[1].field_type.to_string(), "Collection(Edm.String)");
        assert_eq!(index.algorithms[0].kind, VectorSearchAlgorithmKind::ExhaustiveKnn);
        assert_eq!(index.algorithms[0].metric, VectorSearchMetric::Euclidean);
    }

    #[test]
    fn test_manhattan_is_rejected() {
        let schema = SchemaReader::derive(
            &RecordDefinition::new()
                .key(KeyProperty::new("id", KeyType::String))
                .vector(VectorProperty::new("v", 3).with_distance_function(DistanceFunction::Manhattan)),
        )
        .unwrap();
        let err = SearchIndexCollectionManager::index_definition("c", &schema).unwrap_err();
        assert!(matches!(err, VecBridgeError::Config(_)));
    }
}
