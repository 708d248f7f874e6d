//! 单元测试共用的记录类型
//!
//! 与 `vecbridge-testing::fixtures` 中的 Hotel 保持一致。那个 crate 依赖本 crate，
//! 在 `#[cfg(test)]` 中引用它会得到本 crate 的第二份副本，其 `VectorStoreRecord`
//! 实现无法用于这里的类型，所以单元测试保留这一份，集成测试使用 fixtures。

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::schema::{
    DataProperty, DataType, KeyProperty, KeyType, RecordDefinition, VectorProperty,
    VectorStoreRecord,
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
        hotel_definition()
    }
}

pub fn hotel_definition() -> RecordDefinition {
    RecordDefinition::new()
        .key(KeyProperty::new("hotel_id", KeyType::String))
        .data(DataProperty::new("hotel_name", DataType::String).filterable())
        .data(DataProperty::new("rating", DataType::Float64).filterable())
        .data(DataProperty::new("parking_included", DataType::Bool).with_storage_name("parking_is_included"))
        .data(DataProperty::new("description", DataType::String).full_text_searchable())
        .data(DataProperty::new("last_renovated", DataType::DateTime))
        .vector(VectorProperty::new("description_embedding", 4))
}

pub fn paradise_patch() -> Hotel {
    Hotel {
        hotel_id: "h1".to_string(),
        hotel_name: "Paradise Patch".to_string(),
        rating: Some(4.5),
        parking_included: true,
        description: "A quiet garden hotel".to_string(),
        last_renovated: Some(Utc.with_ymd_and_hms(2021, 5, 17, 8, 30, 0).unwrap()),
        description_embedding: Some(vec![0.1, 0.2, 0.3, 0.4]),
    }
}
