//! 搜索索引文档映射

use serde_json::{Map, Value};
use std::marker::PhantomData;
use std::sync::Arc;

use vecbridge_core::{Result, VecBridgeError};

use super::{GetRecordOptions, RecordMapper, json_kind, move_field, object_to_record, record_to_object};
use crate::client::SearchDocument;
use crate::schema::{RecordProperty, RecordSchema, VectorStoreRecord};

pub struct SearchIndexRecordMapper<R> {
    schema: Arc<RecordSchema>,
    _record: PhantomData<fn() -> R>,
}

impl<R> SearchIndexRecordMapper<R> {
    pub fn new(schema: Arc<RecordSchema>) -> Self {
        Self {
            schema,
            _record: PhantomData,
        }
    }
}

impl<R: VectorStoreRecord> RecordMapper<R> for SearchIndexRecordMapper<R> {
    type Storage = SearchDocument;

    fn to_storage(&self, record: &R) -> Result<SearchDocument> {
        let mut object = record_to_object(record)?;
        let mut document = Map::new();

        for property in self.schema.properties() {
            if let RecordProperty::Key(p) = property {
                match object.get(&p.name) {
                    Some(Value::String(_)) => {}
                    Some(other) => {
                        return Err(VecBridgeError::Mapping(format!(
                            "键属性 '{}' 必须是字符串，实际为 {}",
                            p.name,
                            json_kind(other)
                        )));
                    }
                    None => {
                        return Err(VecBridgeError::Mapping(format!(
                            "记录缺少键属性 '{}'",
                            p.name
                        )));
                    }
                }
            }
            move_field(&mut object, property.name(), &mut document, property.storage_name());
        }

        Ok(document)
    }

    fn from_storage(&self, storage: SearchDocument, options: &GetRecordOptions) -> Result<R> {
        let mut document = storage;
        let mut object = Map::new();

        for property in self.schema.properties() {
            match property {
                RecordProperty::Key(p) => {
                    if !document.contains_key(p.storage_name()) {
                        return Err(VecBridgeError::Mapping(format!(
                            "文档缺少键字段 '{}'",
                            p.storage_name()
                        )));
                    }
                    move_field(&mut document, p.storage_name(), &mut object, &p.name);
                }
                RecordProperty::Data(p) => {
                    move_field(&mut document, p.storage_name(), &mut object, &p.name);
                }
                RecordProperty::Vector(p) => {
                    if options.include_vectors {
                        move_field(&mut document, p.storage_name(), &mut object, &p.name);
                    }
                }
            }
        }

        object_to_record(object)
    }
}

/// 从映射后的文档中取出键
pub(crate) fn document_key(schema: &RecordSchema, document: &SearchDocument) -> Result<String> {
    let key_name = schema.key_property().storage_name();
    document
        .get(key_name)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| VecBridgeError::Mapping(format!("文档缺少字符串键字段 '{}'", key_name)))
}
