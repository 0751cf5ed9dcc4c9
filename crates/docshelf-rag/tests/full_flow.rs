//! End-to-end flow over the real collaborators: filesystem loader, splitter,
//! LanceDB index with the hashing embedder, and a prompt-echoing generator.

use std::fs;
use std::path::Path;

use async_trait::async_trait;
use figment::providers::{Format, Toml};
use figment::Figment;
use tempfile::TempDir;

use docshelf_core::config::Settings;
use docshelf_core::traits::Generator;
use docshelf_core::Error;
use docshelf_embed::HashEmbedder;
use docshelf_ingest::DocumentLoader;
use docshelf_rag::RagEngine;
use docshelf_vector::LanceVectorIndex;

struct EchoGenerator;

#[async_trait]
impl Generator for EchoGenerator {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        Ok(prompt.to_string())
    }
}

fn settings_for(tmp: &TempDir) -> Settings {
    let toml = format!(
        r#"
        [chunking]
        chunk_size = 60
        chunk_overlap = 10

        [retrieval]
        k = 3

        [index]
        dir = "{}"

        [embedding]
        backend = "hash"
        dim = 64
        "#,
        tmp.path().join("vectorstore").display()
    );
    Settings::from_figment(Figment::new().merge(Toml::string(&toml))).expect("settings")
}

fn engine_for(settings: &Settings) -> RagEngine {
    let index = LanceVectorIndex::from_settings(settings, Box::new(HashEmbedder::new(64)));
    RagEngine::new(
        settings,
        Box::new(DocumentLoader::new()),
        Box::new(index),
        Box::new(EchoGenerator),
    )
    .expect("engine")
}

#[tokio::test]
async fn index_then_query_then_delete() {
    let tmp = TempDir::new().expect("tempdir");
    let corpus = tmp.path().join("corpus");
    fs::create_dir(&corpus).expect("mkdir");
    fs::write(
        corpus.join("ferris.txt"),
        "Ferris the crab is the unofficial mascot of the Rust language.",
    )
    .expect("write");
    fs::write(
        corpus.join("garden.md"),
        "Tomatoes grow best with full sun and regular watering.",
    )
    .expect("write");

    let settings = settings_for(&tmp);
    let mut engine = engine_for(&settings);

    assert!(!engine.is_ready());
    let indexed = engine.index_documents(&corpus).await.expect("index");
    assert!(indexed);
    assert!(engine.is_ready());

    let stats = engine.stats().await.expect("stats");
    assert!(stats.is_ready);
    assert!(stats.total_chunks >= 2);

    let result = engine
        .query("who is the mascot of Rust?", None)
        .await
        .expect("query");
    // The echo generator hands back the prompt, proving the retrieved
    // chunks were flattened into it.
    assert!(result.answer.contains("[Document 1]"));
    assert!(result.answer.contains("who is the mascot of Rust?"));
    assert!(!result.sources.is_empty());
    let names: Vec<&str> = result.sources.iter().map(|s| s.file_name.as_str()).collect();
    assert!(names.iter().all(|n| *n == "ferris.txt" || *n == "garden.md"));

    engine.delete_index().await.expect("delete");
    assert!(!engine.is_ready());
    let err = engine.query("anything", None).await.expect_err("deleted");
    assert!(matches!(err, Error::NotReady));
}

#[tokio::test]
async fn fresh_engine_loads_persisted_index() {
    let tmp = TempDir::new().expect("tempdir");
    let corpus = tmp.path().join("corpus");
    fs::create_dir(&corpus).expect("mkdir");
    fs::write(corpus.join("note.txt"), "The password reset flow emails a token.")
        .expect("write");

    let settings = settings_for(&tmp);
    {
        let mut writer = engine_for(&settings);
        assert!(writer.index_documents(&corpus).await.expect("index"));
    }

    let mut reader = engine_for(&settings);
    assert!(!reader.is_ready());
    assert!(reader.load_existing_index().await.expect("load"));
    assert!(reader.is_ready());

    let result = reader
        .query("how does password reset work?", None)
        .await
        .expect("query");
    assert!(result.answer.contains("password reset"));
    assert_eq!(result.sources[0].file_name, "note.txt");
}

#[tokio::test]
async fn indexing_missing_path_propagates_not_found() {
    let tmp = TempDir::new().expect("tempdir");
    let settings = settings_for(&tmp);
    let mut engine = engine_for(&settings);

    let err = engine
        .index_documents(Path::new("/definitely/not/here"))
        .await
        .expect_err("missing");
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn indexing_empty_directory_returns_false() {
    let tmp = TempDir::new().expect("tempdir");
    let corpus = tmp.path().join("empty");
    fs::create_dir(&corpus).expect("mkdir");

    let settings = settings_for(&tmp);
    let mut engine = engine_for(&settings);

    let indexed = engine.index_documents(&corpus).await.expect("index");
    assert!(!indexed);
    assert!(!engine.is_ready());
}
