use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use vecbridge_vector::{
    ClientError, ClientResult, IndexingResult, SearchDocument, SearchIndex, SearchIndexClient,
};

use crate::MockControl;

#[derive(Default)]
struct SearchState {
    indexes: BTreeMap<String, SearchIndex>,
    documents: BTreeMap<String, BTreeMap<String, SearchDocument>>,
    rejected_keys: BTreeSet<String>,
    silent_keys: BTreeSet<String>,
}

/// 内存搜索索引服务
#[derive(Clone, Default)]
pub struct MockSearchIndex {
    state: Arc<Mutex<SearchState>>,
    control: MockControl,
}

impl MockSearchIndex {
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

    /// 上传该键的文档时返回逐文档失败
    pub fn reject_key(&self, key: &str) {
        self.state
            .lock()
            .unwrap()
            .rejected_keys
            .insert(key.to_string());
    }

    /// 该键的文档照常写入，但结果列表中不返回它
    pub fn drop_result_for(&self, key: &str) {
        self.state
            .lock()
            .unwrap()
            .silent_keys
            .insert(key.to_string());
    }

    pub fn index(&self, name: &str) -> Option<SearchIndex> {
        self.state.lock().unwrap().indexes.get(name).cloned()
    }

    pub fn document(&self, index: &str, key: &str) -> Option<SearchDocument> {
        self.state
            .lock()
            .unwrap()
            .documents
            .get(index)
            .and_then(|docs| docs.get(key))
            .cloned()
    }

    pub fn document_count(&self, index: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .documents
            .get(index)
            .map_or(0, |docs| docs.len())
    }
}

fn index_not_found(name: &str) -> ClientError {
    ClientError::NotFound(format!("No index with the name '{}' was found", name))
}

#[async_trait]
impl SearchIndexClient for MockSearchIndex {
    async fn create_index(&self, index: &SearchIndex) -> ClientResult<()> {
        self.control.enter("search")?;

        if self.control.create_race() {
            return Err(ClientError::AlreadyExists(format!(
                "Index '{}' already exists",
                index.name
            )));
        }

        let mut state = self.state.lock().unwrap();
        if state.indexes.contains_key(&index.name) {
            return Err(ClientError::AlreadyExists(format!(
                "Index '{}' already exists",
                index.name
            )));
        }
        state.indexes.insert(index.name.clone(), index.clone());
        state.documents.insert(index.name.clone(), BTreeMap::new());
        Ok(())
    }

    async fn get_index(&self, name: &str) -> ClientResult<SearchIndex> {
        self.control.enter("search")?;

        self.state
            .lock()
            .unwrap()
            .indexes
            .get(name)
            .cloned()
            .ok_or_else(|| index_not_found(name))
    }

    async fn delete_index(&self, name: &str) -> ClientResult<()> {
        self.control.enter("search")?;

        let mut state = self.state.lock().unwrap();
        state.documents.remove(name);
        state
            .indexes
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| index_not_found(name))
    }

    async fn list_index_names(&self) -> ClientResult<Vec<String>> {
        self.control.enter("search")?;
        Ok(self.state.lock().unwrap().indexes.keys().cloned().collect())
    }

    async fn get_document(
        &self,
        index: &str,
        key: &str,
        selected_fields: Option<&[String]>,
    ) -> ClientResult<Option<SearchDocument>> {
        self.control.enter("search")?;

        let state = self.state.lock().unwrap();
        let documents = state.documents.get(index).ok_or_else(|| index_not_found(index))?;

        Ok(documents.get(key).map(|document| match selected_fields {
            Some(fields) => document
                .iter()
                .filter(|(name, _)| fields.contains(name))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
            None => document.clone(),
        }))
    }

    async fn upload_documents(
        &self,
        index: &str,
        documents: Vec<SearchDocument>,
    ) -> ClientResult<Vec<IndexingResult>> {
        self.control.enter("search")?;

        let mut state = self.state.lock().unwrap();
        let key_field = state
            .indexes
            .get(index)
            .and_then(|i| i.key_field())
            .map(|f| f.name.clone())
            .ok_or_else(|| index_not_found(index))?;
        let rejected = state.rejected_keys.clone();
        let silent = state.silent_keys.clone();
        let stored = state.documents.entry(index.to_string()).or_default();

        let mut results = Vec::with_capacity(documents.len());
        for document in documents {
            let key = match document.get(&key_field) {
                Some(Value::String(key)) => key.clone(),
                _ => {
                    results.push(IndexingResult {
                        key: String::new(),
                        succeeded: false,
                        error_message: Some(format!("Missing key field '{}'", key_field)),
                    });
                    continue;
                }
            };

            if rejected.contains(&key) {
                results.push(IndexingResult {
                    key,
                    succeeded: false,
                    error_message: Some("Document rejected".to_string()),
                });
                continue;
            }

            stored.insert(key.clone(), document);
            if silent.contains(&key) {
                continue;
            }
            results.push(IndexingResult {
                key,
                succeeded: true,
                error_message: None,
            });
        }
        Ok(results)
    }

    async fn delete_documents(&self, index: &str, _key_field: &str, keys: &[String]) -> ClientResult<()> {
        self.control.enter("search")?;

        let mut state = self.state.lock().unwrap();
        let documents = state
            .documents
            .get_mut(index)
            .ok_or_else(|| index_not_found(index))?;
        for key in keys {
            documents.remove(key);
        }
        Ok(())
    }
}
