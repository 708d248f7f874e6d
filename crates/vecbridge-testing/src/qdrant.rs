use async_trait::async_trait;
use serde_json::Map;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use vecbridge_vector::{
    ClientError, ClientResult, PayloadSchemaType, PointId, PointStruct, QdrantClient,
    VectorsConfig,
};

use crate::MockControl;

struct CollectionState {
    vectors: VectorsConfig,
    payload_indexes: BTreeMap<String, PayloadSchemaType>,
    points: BTreeMap<PointId, PointStruct>,
}

/// 内存 Qdrant
///
/// `retrieve` 按请求的逆序返回点，调用方不能依赖返回顺序。
#[derive(Clone, Default)]
pub struct MockQdrant {
    collections: Arc<Mutex<BTreeMap<String, CollectionState>>>,
    control: MockControl,
}

impl MockQdrant {
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

    pub fn vectors_config(&self, collection: &str) -> Option<VectorsConfig> {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .map(|c| c.vectors.clone())
    }

    pub fn payload_indexes(&self, collection: &str) -> BTreeMap<String, PayloadSchemaType> {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .map(|c| c.payload_indexes.clone())
            .unwrap_or_default()
    }

    pub fn point(&self, collection: &str, id: PointId) -> Option<PointStruct> {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .and_then(|c| c.points.get(&id))
            .cloned()
    }
}

fn collection_not_found(name: &str) -> ClientError {
    ClientError::NotFound(format!("Collection `{}` doesn't exist!", name))
}

#[async_trait]
impl QdrantClient for MockQdrant {
    async fn create_collection(&self, name: &str, vectors: &VectorsConfig) -> ClientResult<()> {
        self.control.enter("qdrant")?;

        if self.control.create_race() {
            return Err(ClientError::AlreadyExists(format!(
                "Collection `{}` already exists!",
                name
            )));
        }

        let mut collections = self.collections.lock().unwrap();
        if collections.contains_key(name) {
            return Err(ClientError::AlreadyExists(format!(
                "Collection `{}` already exists!",
                name
            )));
        }
        collections.insert(
            name.to_string(),
            CollectionState {
                vectors: vectors.clone(),
                payload_indexes: BTreeMap::new(),
                points: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn create_payload_index(
        &self,
        collection: &str,
        field: &str,
        schema: PayloadSchemaType,
    ) -> ClientResult<()> {
        self.control.enter("qdrant")?;

        let mut collections = self.collections.lock().unwrap();
        let state = collections
            .get_mut(collection)
            .ok_or_else(|| collection_not_found(collection))?;
        state.payload_indexes.insert(field.to_string(), schema);
        Ok(())
    }

    async fn collection_exists(&self, name: &str) -> ClientResult<bool> {
        self.control.enter("qdrant")?;
        Ok(self.collections.lock().unwrap().contains_key(name))
    }

    async fn delete_collection(&self, name: &str) -> ClientResult<()> {
        self.control.enter("qdrant")?;

        self.collections
            .lock()
            .unwrap()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| collection_not_found(name))
    }

    async fn list_collections(&self) -> ClientResult<Vec<String>> {
        self.control.enter("qdrant")?;
        Ok(self.collections.lock().unwrap().keys().cloned().collect())
    }

    async fn retrieve(
        &self,
        collection: &str,
        ids: &[PointId],
        with_payload: bool,
        with_vectors: bool,
    ) -> ClientResult<Vec<PointStruct>> {
        self.control.enter("qdrant")?;

        let collections = self.collections.lock().unwrap();
        let state = collections
            .get(collection)
            .ok_or_else(|| collection_not_found(collection))?;

        Ok(ids
            .iter()
            .rev()
            .filter_map(|id| state.points.get(id))
            .map(|point| PointStruct {
                id: point.id,
                vectors: if with_vectors { point.vectors.clone() } else { None },
                payload: if with_payload {
                    point.payload.clone()
                } else {
                    Map::new()
                },
            })
            .collect())
    }

    async fn upsert(&self, collection: &str, points: Vec<PointStruct>) -> ClientResult<()> {
        self.control.enter("qdrant")?;

        let mut collections = self.collections.lock().unwrap();
        let state = collections
            .get_mut(collection)
            .ok_or_else(|| collection_not_found(collection))?;
        for point in points {
            state.points.insert(point.id, point);
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, ids: &[PointId]) -> ClientResult<()> {
        self.control.enter("qdrant")?;

        let mut collections = self.collections.lock().unwrap();
        let state = collections
            .get_mut(collection)
            .ok_or_else(|| collection_not_found(collection))?;
        for id in ids {
            state.points.remove(id);
        }
        Ok(())
    }
}
