use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use vecbridge_core::VecBridgeError;
use vecbridge_testing::{Article, Hotel, Memo, MockQdrant};
use vecbridge_vector::{
    GetRecordOptions, PayloadSchemaType, PointId, PointVectors, QdrantCollection,
    QdrantCollectionOptions, QdrantDistance, RecordCollection, VectorParams, VectorsConfig,
};

async fn articles(qdrant: &MockQdrant) -> QdrantCollection<u64, Article> {
    let collection = QdrantCollection::new(
        Arc::new(qdrant.clone()),
        "articles",
        QdrantCollectionOptions {
            has_named_vectors: true,
            ..Default::default()
        },
    )
    .unwrap();
    collection.create_collection_if_not_exists().await.unwrap();
    collection
}

#[tokio::test]
async fn test_named_vectors_collection() {
    let qdrant = MockQdrant::new();
    articles(&qdrant).await;

    let mut expected = BTreeMap::new();
    expected.insert(
        "title_vec".to_string(),
        VectorParams {
            size: 2,
            distance: QdrantDistance::Cosine,
        },
    );
    expected.insert(
        "body_embedding".to_string(),
        VectorParams {
            size: 3,
            distance: QdrantDistance::Manhattan,
        },
    );
    assert_eq!(
        qdrant.vectors_config("articles"),
        Some(VectorsConfig::Named(expected))
    );

    let indexes = qdrant.payload_indexes("articles");
    assert_eq!(indexes.get("title"), Some(&PayloadSchemaType::Keyword));
    assert_eq!(indexes.get("word_count"), Some(&PayloadSchemaType::Integer));
}

#[tokio::test]
async fn test_article_roundtrip() {
    let qdrant = MockQdrant::new();
    let collection = articles(&qdrant).await;

    let key = collection.upsert(&Article::new(7, "Rust in Production")).await.unwrap();
    assert_eq!(key, 7);

    let point = qdrant.point("articles", PointId::Num(7)).unwrap();
    assert_eq!(point.payload.get("title"), Some(&json!("Rust in Production")));
    assert!(point.payload.get("article_id").is_none());
    match point.vectors {
        Some(PointVectors::Named(vectors)) => {
            assert_eq!(vectors.get("title_vec"), Some(&vec![0.5, 0.25]));
            assert_eq!(vectors.get("body_embedding"), Some(&vec![1.0, 0.0, -1.0]));
        }
        other => panic!("unexpected vectors: {:?}", other),
    }

    let article = collection.get(&7, GetRecordOptions::with_vectors()).await.unwrap();
    assert_eq!(article, Article::new(7, "Rust in Production"));

    let article = collection
        .get(&7, GetRecordOptions::without_vectors())
        .await
        .unwrap();
    assert_eq!(article.title_embedding, None);
    assert_eq!(article.body_embedding, None);
    assert_eq!(article.word_count, 1200);
}

#[tokio::test]
async fn test_batch_is_reordered_to_input() {
    let qdrant = MockQdrant::new();
    let collection = articles(&qdrant).await;
    collection
        .upsert_batch(&[
            Article::new(1, "one"),
            Article::new(2, "two"),
            Article::new(3, "three"),
        ])
        .await
        .unwrap();

    let found = collection
        .get_batch(&[3, 1, 2], GetRecordOptions::default())
        .await
        .unwrap();
    let titles: Vec<&str> = found.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(titles, vec!["three", "one", "two"]);

    let err = collection
        .get_batch(&[1, 99, 2], GetRecordOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let partial = collection
        .get_batch_partial(&[1, 99], GetRecordOptions::default())
        .await
        .unwrap();
    assert!(partial[0].is_some());
    assert!(partial[1].is_none());
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let qdrant = MockQdrant::new();
    let collection = articles(&qdrant).await;
    collection.upsert(&Article::new(5, "five")).await.unwrap();

    collection.delete_batch(&[5, 6]).await.unwrap();
    collection.delete(&5).await.unwrap();
    assert!(qdrant.point("articles", PointId::Num(5)).is_none());
}

#[tokio::test]
async fn test_unnamed_vector_with_uuid_key() {
    let qdrant = MockQdrant::new();
    let collection = QdrantCollection::<Uuid, Memo>::new(
        Arc::new(qdrant.clone()),
        "memos",
        QdrantCollectionOptions::default(),
    )
    .unwrap();
    collection.create_collection().await.unwrap();

    assert_eq!(
        qdrant.vectors_config("memos"),
        Some(VectorsConfig::Single(VectorParams {
            size: 3,
            distance: QdrantDistance::Dot,
        }))
    );
    let indexes = qdrant.payload_indexes("memos");
    assert_eq!(indexes.get("text"), Some(&PayloadSchemaType::Text));
    assert_eq!(indexes.get("tags"), Some(&PayloadSchemaType::Keyword));

    let memo = Memo::new("buy milk", [0.25, 0.5, 0.75]);
    let key = collection.upsert(&memo).await.unwrap();
    assert_eq!(key, memo.memo_id);

    let point = qdrant.point("memos", PointId::Uuid(memo.memo_id)).unwrap();
    assert_eq!(point.vectors, Some(PointVectors::Unnamed(vec![0.25, 0.5, 0.75])));

    let loaded = collection
        .get(&memo.memo_id, GetRecordOptions::default())
        .await
        .unwrap();
    assert_eq!(loaded, memo);
}

#[tokio::test]
async fn test_create_race_is_benign() {
    let qdrant = MockQdrant::new();
    qdrant.control().set_create_race(true);
    let collection = QdrantCollection::<Uuid, Memo>::new(
        Arc::new(qdrant.clone()),
        "memos",
        QdrantCollectionOptions::default(),
    )
    .unwrap();

    collection.create_collection_if_not_exists().await.unwrap();
    assert!(collection.create_collection().await.unwrap_err().is_already_exists());
}

#[tokio::test]
async fn test_transport_error_is_wrapped() {
    let qdrant = MockQdrant::new();
    let collection = articles(&qdrant).await;
    qdrant.set_should_fail(true);

    match collection.get(&1, GetRecordOptions::default()).await {
        Err(VecBridgeError::Backend {
            backend, operation, ..
        }) => {
            assert_eq!(backend, "qdrant");
            assert_eq!(operation, "Retrieve");
        }
        other => panic!("unexpected result: {:?}", other.map(|a| a.article_id)),
    }
}

#[test]
fn test_construction_checks() {
    let qdrant = MockQdrant::new();

    // 两个向量但未启用命名向量
    let unnamed = QdrantCollection::<u64, Article>::new(
        Arc::new(qdrant.clone()),
        "articles",
        QdrantCollectionOptions::default(),
    );
    assert!(matches!(unnamed, Err(VecBridgeError::Config(_))));

    let string_key = QdrantCollection::<String, Hotel>::new(
        Arc::new(qdrant.clone()),
        "hotels",
        QdrantCollectionOptions::default(),
    );
    assert!(matches!(string_key, Err(VecBridgeError::UnsupportedType(_))));

    let wrong_key = QdrantCollection::<Uuid, Article>::new(
        Arc::new(qdrant),
        "articles",
        QdrantCollectionOptions {
            has_named_vectors: true,
            ..Default::default()
        },
    );
    assert!(matches!(wrong_key, Err(VecBridgeError::Config(_))));
}
