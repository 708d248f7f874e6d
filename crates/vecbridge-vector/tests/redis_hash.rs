use serde::{Deserialize, Serialize};
use std::sync::Arc;

use vecbridge_core::VecBridgeError;
use vecbridge_testing::{Hotel, MockRedis, Memo, paradise_patch};
use vecbridge_vector::{
    GetRecordOptions, HashEntry, KeyProperty, KeyType, RecordCollection, RecordDefinition,
    RedisHashCollection, RedisHashCollectionOptions, VectorProperty, VectorStoreRecord,
};
use uuid::Uuid;

fn hotels(redis: &MockRedis) -> RedisHashCollection<String, Hotel> {
    RedisHashCollection::new(
        Arc::new(redis.clone()),
        "hotels",
        RedisHashCollectionOptions {
            prefix_collection_name_to_key_names: true,
            ..Default::default()
        },
    )
    .unwrap()
}

fn entry<'a>(entries: &'a [HashEntry], field: &str) -> Option<&'a [u8]> {
    entries
        .iter()
        .find(|e| e.field == field)
        .map(|e| e.value.as_slice())
}

#[tokio::test]
async fn test_hotel_roundtrip() {
    let redis = MockRedis::new();
    let collection = hotels(&redis);
    collection.create_collection().await.unwrap();

    let key = collection.upsert(&paradise_patch()).await.unwrap();
    assert_eq!(key, "h1");
    assert_eq!(redis.keys(), vec!["hotels:h1"]);

    let entries = redis.hash_entries("hotels:h1").unwrap();
    assert!(entry(&entries, "hotel_id").is_none());
    assert_eq!(entry(&entries, "parking_is_included"), Some(&b"true"[..]));
    assert_eq!(entry(&entries, "rating"), Some(&b"4.5"[..]));

    // 向量按小端 f32 连续打包
    let expected: Vec<u8> = [0.1f32, 0.2, 0.3, 0.4]
        .iter()
        .flat_map(|x| x.to_le_bytes())
        .collect();
    assert_eq!(entry(&entries, "description_embedding"), Some(expected.as_slice()));

    let hotel = collection
        .get(&"h1".to_string(), GetRecordOptions::with_vectors())
        .await
        .unwrap();
    assert_eq!(hotel, paradise_patch());
}

#[tokio::test]
async fn test_get_without_vectors() {
    let redis = MockRedis::new();
    let collection = hotels(&redis);
    collection.upsert(&paradise_patch()).await.unwrap();

    let hotel = collection
        .get(&"h1".to_string(), GetRecordOptions::without_vectors())
        .await
        .unwrap();
    assert_eq!(hotel.description_embedding, None);
    assert_eq!(hotel.hotel_name, "Paradise Patch");
    assert_eq!(hotel.rating, Some(4.5));
}

#[tokio::test]
async fn test_null_fields_are_not_written() {
    let redis = MockRedis::new();
    let collection = hotels(&redis);

    let mut hotel = Hotel::new("h2", "Sparse", [0.0; 4]);
    hotel.rating = None;
    collection.upsert(&hotel).await.unwrap();

    let entries = redis.hash_entries("hotels:h2").unwrap();
    assert!(entry(&entries, "rating").is_none());
    assert!(entry(&entries, "last_renovated").is_none());

    let loaded = collection
        .get(&"h2".to_string(), GetRecordOptions::default())
        .await
        .unwrap();
    assert_eq!(loaded, hotel);
}

#[tokio::test]
async fn test_upsert_replaces_existing_hash() {
    let redis = MockRedis::new();
    let collection = hotels(&redis);
    collection.upsert(&paradise_patch()).await.unwrap();

    let mut renamed = paradise_patch();
    renamed.hotel_name = "Paradise Patch II".to_string();
    renamed.rating = None;
    renamed.last_renovated = None;
    collection.upsert(&renamed).await.unwrap();

    let entries = redis.hash_entries("hotels:h1").unwrap();
    assert!(entry(&entries, "rating").is_none());
    assert!(entry(&entries, "last_renovated").is_none());

    let loaded = collection
        .get(&"h1".to_string(), GetRecordOptions::with_vectors())
        .await
        .unwrap();
    assert_eq!(loaded, renamed);
}

#[tokio::test]
async fn test_batch_fails_on_missing_key() {
    let redis = MockRedis::new();
    let collection = hotels(&redis);
    collection
        .upsert_batch(&[
            Hotel::new("a", "Alpha", [1.0, 0.0, 0.0, 0.0]),
            Hotel::new("b", "Bravo", [0.0, 1.0, 0.0, 0.0]),
        ])
        .await
        .unwrap();

    let keys = vec!["a".to_string(), "missing".to_string(), "b".to_string()];
    let err = collection
        .get_batch(&keys, GetRecordOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let found = collection
        .get_batch(&["b".to_string(), "a".to_string()], GetRecordOptions::default())
        .await
        .unwrap();
    assert_eq!(found[0].hotel_id, "b");
    assert_eq!(found[1].hotel_id, "a");
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let redis = MockRedis::new();
    let collection = hotels(&redis);
    collection.upsert(&paradise_patch()).await.unwrap();

    collection.delete(&"h1".to_string()).await.unwrap();
    collection.delete(&"h1".to_string()).await.unwrap();
    assert!(redis.keys().is_empty());
}

#[tokio::test]
async fn test_hash_index_uses_plain_field_names() {
    let redis = MockRedis::new();
    let collection = hotels(&redis);
    collection.create_collection_if_not_exists().await.unwrap();

    let args = redis.index("hotels").unwrap().to_args();
    assert_eq!(&args[..3], &["hotels", "ON", "HASH"]);
    assert!(args.contains(&"hotel_name".to_string()));
    assert!(!args.iter().any(|a| a.starts_with("$.")));
}

#[tokio::test]
async fn test_corrupt_vector_is_mapping_error() {
    let redis = MockRedis::new();
    let collection = hotels(&redis);
    collection.upsert(&paradise_patch()).await.unwrap();

    use vecbridge_vector::RedisHashClient;
    let mut entries = redis.hash_entries("hotels:h1").unwrap();
    for e in entries.iter_mut().filter(|e| e.field == "description_embedding") {
        e.value = vec![0u8; 5];
    }
    redis
        .hset_multiple(&[("hotels:h1".to_string(), entries)])
        .await
        .unwrap();

    let err = collection
        .get(&"h1".to_string(), GetRecordOptions::with_vectors())
        .await
        .unwrap_err();
    assert!(matches!(err, VecBridgeError::Mapping(_)));

    // 不读取向量时不受影响
    assert!(
        collection
            .get(&"h1".to_string(), GetRecordOptions::without_vectors())
            .await
            .is_ok()
    );
}

#[test]
fn test_collections_are_unsupported() {
    let redis = MockRedis::new();
    let result = RedisHashCollection::<Uuid, Memo>::new(
        Arc::new(redis),
        "memos",
        RedisHashCollectionOptions::default(),
    );
    assert!(matches!(result, Err(VecBridgeError::UnsupportedType(_))));
}

/// 只有键和向量，没有数据字段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Bare {
    id: String,
    #[serde(default)]
    embedding: Option<Vec<f32>>,
}

impl VectorStoreRecord for Bare {
    fn record_definition() -> RecordDefinition {
        RecordDefinition::new()
            .key(KeyProperty::new("id", KeyType::String))
            .vector(VectorProperty::new("embedding", 2))
    }
}

#[tokio::test]
async fn test_vector_only_record_without_vectors() {
    let redis = MockRedis::new();
    let collection = RedisHashCollection::<String, Bare>::new(
        Arc::new(redis.clone()),
        "bare",
        RedisHashCollectionOptions::default(),
    )
    .unwrap();
    collection
        .upsert(&Bare {
            id: "b1".to_string(),
            embedding: Some(vec![1.0, 2.0]),
        })
        .await
        .unwrap();

    let loaded = collection
        .get(&"b1".to_string(), GetRecordOptions::without_vectors())
        .await
        .unwrap();
    assert_eq!(loaded.id, "b1");
    assert_eq!(loaded.embedding, None);

    let err = collection
        .get(&"missing".to_string(), GetRecordOptions::without_vectors())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}
