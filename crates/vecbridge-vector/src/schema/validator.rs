//! 类型校验：检查模式中的类型是否被目标后端支持
//!
//! 只在构造集合时执行一次，不在每次操作时执行。

use vecbridge_core::{Result, VecBridgeError};

use super::{DataType, KeyType, RecordSchema, VectorElementType};

/// 某个后端支持的类型集合
#[derive(Debug, Clone, Copy)]
pub struct SupportedTypes {
    pub backend: &'static str,
    pub key_types: &'static [KeyType],
    /// `None` 表示任意数据类型
    pub data_types: Option<&'static [DataType]>,
    pub allow_collections: bool,
    pub vector_element_types: &'static [VectorElementType],
}

pub struct TypeValidator;

impl TypeValidator {
    pub fn validate(schema: &RecordSchema, supported: &SupportedTypes) -> Result<()> {
        let key = schema.key_property();
        if !supported.key_types.contains(&key.key_type) {
            return Err(VecBridgeError::UnsupportedType(format!(
                "{} 不支持键属性 '{}' 的类型 {:?}，支持的类型: {:?}",
                supported.backend, key.name, key.key_type, supported.key_types
            )));
        }

        for property in schema.data_properties() {
            Self::validate_data_type(&property.name, &property.data_type, supported)?;
        }

        for property in schema.vector_properties() {
            // 模式推导已保证元素类型存在
            let element_type = property.element_type.ok_or_else(|| {
                VecBridgeError::Schema(format!("向量属性 '{}' 缺少元素类型", property.name))
            })?;
            if !supported.vector_element_types.contains(&element_type) {
                return Err(VecBridgeError::UnsupportedType(format!(
                    "{} 不支持向量属性 '{}' 的元素类型 {:?}，支持的类型: {:?}",
                    supported.backend,
                    property.name,
                    element_type,
                    supported.vector_element_types
                )));
            }
        }

        Ok(())
    }

    /// 模式声明的键类型必须与集合使用的 Rust 键类型一致
    pub fn validate_key_type(schema: &RecordSchema, key_type: KeyType) -> Result<()> {
        let key = schema.key_property();
        if key.key_type != key_type {
            return Err(VecBridgeError::Config(format!(
                "键属性 '{}' 声明为 {:?}，但集合的键类型为 {:?}",
                key.name, key.key_type, key_type
            )));
        }
        Ok(())
    }

    fn validate_data_type(name: &str, data_type: &DataType, supported: &SupportedTypes) -> Result<()> {
        let scalar = match data_type {
            DataType::Collection(inner) => {
                if !supported.allow_collections {
                    return Err(VecBridgeError::UnsupportedType(format!(
                        "{} 不支持集合类型的数据属性 '{}'",
                        supported.backend, name
                    )));
                }
                if matches!(inner.as_ref(), DataType::Collection(_)) {
                    return Err(VecBridgeError::UnsupportedType(format!(
                        "数据属性 '{}' 不能是嵌套集合",
                        name
                    )));
                }
                inner.as_ref()
            }
            other => other,
        };

        if let Some(data_types) = supported.data_types
            && !data_types.contains(scalar)
        {
            return Err(VecBridgeError::UnsupportedType(format!(
                "{} 不支持数据属性 '{}' 的类型 {:?}",
                supported.backend, name, data_type
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        DataProperty, KeyProperty, RecordDefinition, SchemaReader, VectorProperty,
    };

    const STRING_ONLY: SupportedTypes = SupportedTypes {
        backend: "test",
        key_types: &[KeyType::String],
        data_types: Some(&[DataType::String, DataType::Int64]),
        allow_collections: false,
        vector_element_types: &[VectorElementType::Float32, VectorElementType::Float64],
    };

    fn schema(key_type: KeyType, data_type: DataType, element: VectorElementType) -> RecordSchema {
        SchemaReader::derive(
            &RecordDefinition::new()
                .key(KeyProperty::new("id", key_type))
                .data(DataProperty::new("field", data_type))
                .vector(VectorProperty::new("embedding", 3).with_element_type(Some(element))),
        )
        .unwrap()
    }

    #[test]
    fn test_supported_schema_passes() {
        let schema = schema(KeyType::String, DataType::Int64, VectorElementType::Float64);
        assert!(TypeValidator::validate(&schema, &STRING_ONLY).is_ok());
    }

    #[test]
    fn test_unsupported_key_type() {
        let schema = schema(KeyType::UInt64, DataType::String, VectorElementType::Float32);
        let err = TypeValidator::validate(&schema, &STRING_ONLY).unwrap_err();
        assert!(matches!(err, VecBridgeError::UnsupportedType(_)));
    }

    #[test]
    fn test_unsupported_vector_element_type() {
        let schema = schema(KeyType::String, DataType::String, VectorElementType::Int8);
        let err = TypeValidator::validate(&schema, &STRING_ONLY).unwrap_err();
        assert!(matches!(err, VecBridgeError::UnsupportedType(_)));
    }

    #[test]
    fn test_unsupported_data_and_collection_types() {
        let schema = schema(KeyType::String, DataType::Bool, VectorElementType::Float32);
        assert!(TypeValidator::validate(&schema, &STRING_ONLY).is_err());

        let schema = self::schema(
            KeyType::String,
            DataType::collection_of(DataType::String),
            VectorElementType::Float32,
        );
        assert!(TypeValidator::validate(&schema, &STRING_ONLY).is_err());
    }

    #[test]
    fn test_key_type_mismatch() {
        let schema = schema(KeyType::String, DataType::String, VectorElementType::Float32);
        assert!(TypeValidator::validate_key_type(&schema, KeyType::String).is_ok());
        let err = TypeValidator::validate_key_type(&schema, KeyType::Guid).unwrap_err();
        assert!(matches!(err, VecBridgeError::Config(_)));
    }
}
