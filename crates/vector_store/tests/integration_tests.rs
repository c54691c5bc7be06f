//! End-to-end tests for building and querying the persisted index
use embeddings::{ChunkConfig, EmbeddingProvider, FallbackEmbeddingProvider};
use tempfile::TempDir;
use vector_store::{DatasetNotFound, IndexBuilder, IndexSettings, SourcePage, VectorStore};

fn schema_pages() -> Vec<SourcePage> {
    vec![
        SourcePage::new(
            "schema.pdf",
            1,
            "Table customers: customer_id INTEGER PRIMARY KEY, name TEXT, city TEXT.\n\n\
             Table products: product_id INTEGER PRIMARY KEY, title TEXT, price NUMERIC.",
        ),
        SourcePage::new(
            "schema.pdf",
            2,
            "Table invoices: invoice_id INTEGER PRIMARY KEY, customer_id INTEGER, amount NUMERIC, issued_on DATE.",
        ),
        SourcePage::new(
            "examples.pdf",
            1,
            "Example: total amount per customer\nSELECT customer_id, SUM(amount) FROM invoices GROUP BY customer_id;",
        ),
    ]
}

fn fixture(name: &str) -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

async fn embed_one(embedder: &dyn EmbeddingProvider, text: &str) -> Vec<f32> {
    embedder
        .embed(vec![text.to_string()])
        .await
        .unwrap()
        .remove(0)
}

#[tokio::test]
async fn should_build_persist_and_query_index() {
    let temp_dir = TempDir::new().unwrap();
    let mut settings = IndexSettings::new(
        temp_dir.path().join("dataset"),
        temp_dir.path().join("chroma_db"),
    );
    settings.chunk = ChunkConfig {
        chunk_size: 120,
        overlap_size: 20,
    };
    let embedder = FallbackEmbeddingProvider::with_standard_dimension();

    let built = IndexBuilder::new(&settings, &embedder)
        .build_from_pages(&schema_pages())
        .await
        .unwrap();
    let built_count = built.get_document_count().await.unwrap();
    assert!(built_count >= 3);
    built.close().await;

    let store = VectorStore::open(&settings.persist_dir).await.unwrap();
    assert_eq!(store.get_document_count().await.unwrap(), built_count);
    assert_eq!(store.manifest().dimension, 384);

    let query = embed_one(&embedder, "invoices amount issued_on").await;
    let results = store.search_similar(&query, 4).await.unwrap();

    assert!(results.len() <= 4);
    assert!(results[0].document.content.contains("invoices"));
    for pair in results.windows(2) {
        assert!(pair[0].similarity >= pair[1].similarity);
    }
}

#[tokio::test]
async fn should_reuse_index_on_second_start() {
    let temp_dir = TempDir::new().unwrap();
    let settings = IndexSettings::new(
        temp_dir.path().join("dataset"),
        temp_dir.path().join("chroma_db"),
    );
    let embedder = FallbackEmbeddingProvider::new(128);
    let builder = IndexBuilder::new(&settings, &embedder);

    builder
        .build_from_pages(&schema_pages())
        .await
        .unwrap()
        .close()
        .await;

    let first = builder.load_or_build().await.unwrap();
    let created_at = first.manifest().created_at;
    first.close().await;

    let second = builder.load_or_build().await.unwrap();
    assert_eq!(second.manifest().created_at, created_at);
}

#[tokio::test]
async fn should_not_persist_anything_when_dataset_is_missing() {
    let temp_dir = TempDir::new().unwrap();
    let settings = IndexSettings::new(
        temp_dir.path().join("dataset"),
        temp_dir.path().join("chroma_db"),
    );
    let embedder = FallbackEmbeddingProvider::new(128);

    let err = IndexBuilder::new(&settings, &embedder)
        .load_or_build()
        .await
        .err()
        .unwrap();

    assert!(err.downcast_ref::<DatasetNotFound>().is_some());
    assert!(!settings.persist_dir.exists());

    // A second attempt finds the directory but still no PDFs.
    let err = IndexBuilder::new(&settings, &embedder)
        .load_or_build()
        .await
        .err()
        .unwrap();
    assert!(err.to_string().starts_with("No PDF documents found in"));
}

#[tokio::test]
async fn should_index_pdfs_from_dataset_directory() {
    let temp_dir = TempDir::new().unwrap();
    let settings = IndexSettings::new(
        temp_dir.path().join("dataset"),
        temp_dir.path().join("chroma_db"),
    );
    std::fs::create_dir_all(&settings.dataset_dir).unwrap();
    std::fs::copy(
        fixture("schema.pdf"),
        settings.dataset_dir.join("schema.pdf"),
    )
    .unwrap();
    let embedder = FallbackEmbeddingProvider::with_standard_dimension();

    let store = IndexBuilder::new(&settings, &embedder)
        .load_or_build()
        .await
        .unwrap();
    assert_eq!(store.get_document_count().await.unwrap(), 2);

    let query = embed_one(&embedder, "CREATE TABLE orders").await;
    let results = store.search_similar(&query, 2).await.unwrap();
    store.close().await;

    let mut pages: Vec<(String, usize)> = results
        .iter()
        .map(|r| (r.document.file_name.clone(), r.document.page))
        .collect();
    pages.sort();
    assert_eq!(
        pages,
        vec![("schema.pdf".to_string(), 1), ("schema.pdf".to_string(), 2)]
    );
    assert!(settings.persist_dir.is_dir());
    assert!(!temp_dir.path().join("chroma_db.building").exists());
}
