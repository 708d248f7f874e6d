//! 测试记录类型

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use vecbridge_vector::{
    DataProperty, DataType, DistanceFunction, KeyProperty, KeyType, RecordDefinition,
    VectorProperty, VectorStoreRecord,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotel {
    pub hotel_id: String,
    pub hotel_name: String,
    pub rating: Option<f64>,
    pub parking_included: bool,
    pub description: String,
    pub last_renovated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub description_embedding: Option<Vec<f32>>,
}

impl VectorStoreRecord for Hotel {
    fn record_definition() -> RecordDefinition {
        RecordDefinition::new()
            .key(KeyProperty::new("hotel_id", KeyType::String))
            .data(DataProperty::new("hotel_name", DataType::String).filterable())
            .data(DataProperty::new("rating", DataType::Float64).filterable())
            .data(
                DataProperty::new("parking_included", DataType::Bool)
                    .with_storage_name("parking_is_included"),
            )
            .data(DataProperty::new("description", DataType::String).full_text_searchable())
            .data(DataProperty::new("last_renovated", DataType::DateTime))
            .vector(VectorProperty::new("description_embedding", 4))
    }
}

impl Hotel {
    pub fn new(id: &str, name: &str, embedding: [f32; 4]) -> Self {
        Self {
            hotel_id: id.to_string(),
            hotel_name: name.to_string(),
            rating: None,
            parking_included: false,
            description: format!("{} description", name),
            last_renovated: None,
            description_embedding: Some(embedding.to_vec()),
        }
    }
}

pub fn paradise_patch() -> Hotel {
    Hotel {
        hotel_id: "h1".to_string(),
        hotel_name: "Paradise Patch".to_string(),
        rating: Some(4.5),
        parking_included: true,
        description: "A quiet garden hotel".to_string(),
        last_renovated: Utc.with_ymd_and_hms(2021, 5, 17, 8, 30, 0).single(),
        description_embedding: Some(vec![0.1, 0.2, 0.3, 0.4]),
    }
}

/// UUID 键、单个无名向量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memo {
    pub memo_id: Uuid,
    pub text: String,
    pub tags: Vec<String>,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

impl VectorStoreRecord for Memo {
    fn record_definition() -> RecordDefinition {
        RecordDefinition::new()
            .key(KeyProperty::new("memo_id", KeyType::Guid))
            .data(DataProperty::new("text", DataType::String).full_text_searchable())
            .data(DataProperty::new("tags", DataType::collection_of(DataType::String)).filterable())
            .vector(VectorProperty::new("embedding", 3).with_distance_function(DistanceFunction::DotProduct))
    }
}

impl Memo {
    pub fn new(text: &str, embedding: [f32; 3]) -> Self {
        Self {
            memo_id: Uuid::new_v4(),
            text: text.to_string(),
            tags: vec!["inbox".to_string()],
            embedding: Some(embedding.to_vec()),
        }
    }
}

/// 整数键、两个命名向量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub article_id: u64,
    pub title: String,
    pub word_count: i64,
    #[serde(default)]
    pub title_embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub body_embedding: Option<Vec<f32>>,
}

impl VectorStoreRecord for Article {
    fn record_definition() -> RecordDefinition {
        RecordDefinition::new()
            .key(KeyProperty::new("article_id", KeyType::UInt64))
            .data(DataProperty::new("title", DataType::String).filterable())
            .data(DataProperty::new("word_count", DataType::Int64).filterable())
            .vector(VectorProperty::new("title_embedding", 2).with_storage_name("title_vec"))
            .vector(
                VectorProperty::new("body_embedding", 3)
                    .with_distance_function(DistanceFunction::Manhattan),
            )
    }
}

impl Article {
    pub fn new(id: u64, title: &str) -> Self {
        Self {
            article_id: id,
            title: title.to_string(),
            word_count: 1200,
            title_embedding: Some(vec![0.5, 0.25]),
            body_embedding: Some(vec![1.0, 0.0, -1.0]),
        }
    }
}
