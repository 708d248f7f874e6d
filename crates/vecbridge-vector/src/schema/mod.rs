//! 记录模式定义
//!
//! `RecordDefinition` 是声明式输入，`RecordSchema` 是经过校验的不可变结果。

mod reader;
mod validator;

pub use reader::*;
pub use validator::*;

use serde::{Deserialize, Serialize};

/// 键类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyType {
    String,
    UInt64,
    Guid,
}

/// 数据字段类型
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    String,
    Bool,
    Int32,
    Int64,
    Float32,
    Float64,
    DateTime,
    Guid,
    Collection(Box<DataType>),
}

impl DataType {
    pub fn collection_of(element: DataType) -> Self {
        DataType::Collection(Box::new(element))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::Int32 | DataType::Int64 | DataType::Float32 | DataType::Float64
        )
    }

    /// 集合类型返回元素类型，标量返回自身
    pub fn element_type(&self) -> &DataType {
        match self {
            DataType::Collection(inner) => inner.element_type(),
            other => other,
        }
    }
}

/// 向量元素类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorElementType {
    Float32,
    Float64,
    Float16,
    Int8,
}

impl VectorElementType {
    /// 定宽编码下每个元素占用的字节数
    pub fn width(&self) -> usize {
        match self {
            VectorElementType::Float32 => 4,
            VectorElementType::Float64 => 8,
            VectorElementType::Float16 => 2,
            VectorElementType::Int8 => 1,
        }
    }
}

/// 向量索引算法
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    #[default]
    Hnsw,
    Flat,
}

/// 相似度度量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceFunction {
    #[default]
    Cosine,
    DotProduct,
    Euclidean,
    Manhattan,
}

/// 键属性
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyProperty {
    pub name: String,
    pub storage_name: Option<String>,
    pub key_type: KeyType,
}

impl KeyProperty {
    pub fn new(name: impl Into<String>, key_type: KeyType) -> Self {
        Self {
            name: name.into(),
            storage_name: None,
            key_type,
        }
    }

    pub fn with_storage_name(mut self, storage_name: impl Into<String>) -> Self {
        self.storage_name = Some(storage_name.into());
        self
    }

    pub fn storage_name(&self) -> &str {
        self.storage_name.as_deref().unwrap_or(&self.name)
    }
}

/// 数据 (标量) 属性
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataProperty {
    pub name: String,
    pub storage_name: Option<String>,
    pub data_type: DataType,
    pub is_filterable: bool,
    pub is_full_text_searchable: bool,
}

impl DataProperty {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            storage_name: None,
            data_type,
            is_filterable: false,
            is_full_text_searchable: false,
        }
    }

    pub fn with_storage_name(mut self, storage_name: impl Into<String>) -> Self {
        self.storage_name = Some(storage_name.into());
        self
    }

    pub fn filterable(mut self) -> Self {
        self.is_filterable = true;
        self
    }

    pub fn full_text_searchable(mut self) -> Self {
        self.is_full_text_searchable = true;
        self
    }

    pub fn storage_name(&self) -> &str {
        self.storage_name.as_deref().unwrap_or(&self.name)
    }
}

/// 向量属性
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorProperty {
    pub name: String,
    pub storage_name: Option<String>,
    pub element_type: Option<VectorElementType>,
    pub dimensions: Option<usize>,
    pub index_kind: IndexKind,
    pub distance_function: DistanceFunction,
}

impl VectorProperty {
    /// 默认 f32 元素、HNSW 索引、余弦距离
    pub fn new(name: impl Into<String>, dimensions: usize) -> Self {
        Self {
            name: name.into(),
            storage_name: None,
            element_type: Some(VectorElementType::Float32),
            dimensions: Some(dimensions),
            index_kind: IndexKind::default(),
            distance_function: DistanceFunction::default(),
        }
    }

    /// 未指定维度，仅能用于读写，不能用于创建集合
    pub fn without_dimensions(name: impl Into<String>) -> Self {
        Self {
            dimensions: None,
            ..Self::new(name, 0)
        }
    }

    pub fn with_storage_name(mut self, storage_name: impl Into<String>) -> Self {
        self.storage_name = Some(storage_name.into());
        self
    }

    pub fn with_element_type(mut self, element_type: Option<VectorElementType>) -> Self {
        self.element_type = element_type;
        self
    }

    pub fn with_index_kind(mut self, index_kind: IndexKind) -> Self {
        self.index_kind = index_kind;
        self
    }

    pub fn with_distance_function(mut self, distance_function: DistanceFunction) -> Self {
        self.distance_function = distance_function;
        self
    }

    pub fn storage_name(&self) -> &str {
        self.storage_name.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordProperty {
    Key(KeyProperty),
    Data(DataProperty),
    Vector(VectorProperty),
}

impl RecordProperty {
    pub fn name(&self) -> &str {
        match self {
            RecordProperty::Key(p) => &p.name,
            RecordProperty::Data(p) => &p.name,
            RecordProperty::Vector(p) => &p.name,
        }
    }

    pub fn storage_name(&self) -> &str {
        match self {
            RecordProperty::Key(p) => p.storage_name(),
            RecordProperty::Data(p) => p.storage_name(),
            RecordProperty::Vector(p) => p.storage_name(),
        }
    }
}

/// 声明式记录定义，未经校验
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDefinition {
    pub properties: Vec<RecordProperty>,
}

impl RecordDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(mut self, property: KeyProperty) -> Self {
        self.properties.push(RecordProperty::Key(property));
        self
    }

    pub fn data(mut self, property: DataProperty) -> Self {
        self.properties.push(RecordProperty::Data(property));
        self
    }

    pub fn vector(mut self, property: VectorProperty) -> Self {
        self.properties.push(RecordProperty::Vector(property));
        self
    }
}

/// 校验后的记录模式
///
/// 恰好一个键属性、零或多个数据属性、至少一个向量属性，保持声明顺序。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    properties: Vec<RecordProperty>,
    key: KeyProperty,
    data: Vec<DataProperty>,
    vectors: Vec<VectorProperty>,
}

impl RecordSchema {
    pub fn properties(&self) -> &[RecordProperty] {
        &self.properties
    }

    pub fn key_property(&self) -> &KeyProperty {
        &self.key
    }

    pub fn data_properties(&self) -> &[DataProperty] {
        &self.data
    }

    pub fn vector_properties(&self) -> &[VectorProperty] {
        &self.vectors
    }

    pub fn data_property(&self, name: &str) -> Option<&DataProperty> {
        self.data.iter().find(|p| p.name == name)
    }

    pub fn vector_property(&self, name: &str) -> Option<&VectorProperty> {
        self.vectors.iter().find(|p| p.name == name)
    }

    /// 不含向量的存储字段名 (读取时省略向量使用)
    pub fn non_vector_storage_names(&self) -> Vec<String> {
        self.properties
            .iter()
            .filter(|p| !matches!(p, RecordProperty::Vector(_)))
            .map(|p| p.storage_name().to_string())
            .collect()
    }
}
