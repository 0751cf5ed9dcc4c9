use figment::providers::{Format, Toml};
use figment::Figment;

use docshelf_core::config::{EmbeddingBackend, Settings};
use docshelf_core::types::{DocumentChunk, QueryResult, ScoredMatch, SourceCitation};
use docshelf_core::Error;

fn chunk(content: &str, path: &str, page: Option<u32>) -> DocumentChunk {
    DocumentChunk {
        content: content.to_string(),
        source_path: path.to_string(),
        page,
    }
}

#[test]
fn settings_defaults_are_valid() {
    let settings = Settings::from_figment(Figment::new()).expect("defaults");
    assert_eq!(settings.chunking.chunk_size, 1000);
    assert_eq!(settings.chunking.chunk_overlap, 200);
    assert_eq!(settings.retrieval.k, 4);
    assert_eq!(settings.embedding.backend, EmbeddingBackend::Local);
}

#[test]
fn settings_rejects_overlap_not_smaller_than_size() {
    let figment = Figment::new().merge(Toml::string(
        "[chunking]\nchunk_size = 100\nchunk_overlap = 100\n",
    ));
    let err = Settings::from_figment(figment).expect_err("overlap == size");
    assert!(matches!(err, Error::InvalidConfig(_)));
    assert!(err.to_string().contains("chunk_overlap"));
}

#[test]
fn settings_rejects_zero_k_and_bad_endpoint() {
    let figment = Figment::new().merge(Toml::string("[retrieval]\nk = 0\n"));
    assert!(matches!(
        Settings::from_figment(figment),
        Err(Error::InvalidConfig(_))
    ));

    let figment = Figment::new().merge(Toml::string(
        "[generation]\nendpoint = \"localhost:11434\"\n",
    ));
    let err = Settings::from_figment(figment).expect_err("missing scheme");
    assert!(err.to_string().contains("http"));
}

#[test]
fn similarity_is_one_minus_distance_clamped() {
    let exact = SourceCitation::from_match(&ScoredMatch {
        chunk: chunk("text", "/docs/a.txt", None),
        distance: 0.0,
    });
    assert!((exact.similarity - 1.0).abs() < f32::EPSILON);

    let near = SourceCitation::from_match(&ScoredMatch {
        chunk: chunk("text", "/docs/a.txt", None),
        distance: 0.25,
    });
    assert!((near.similarity - 0.75).abs() < 1e-6);

    // Unbounded metrics floor at 0.0 instead of going negative.
    for distance in [1.0, 1.5, 37.0] {
        let far = SourceCitation::from_match(&ScoredMatch {
            chunk: chunk("text", "/docs/a.txt", None),
            distance,
        });
        assert_eq!(far.similarity, 0.0, "distance {distance}");
    }
}

#[test]
fn citation_uses_base_name_and_truncated_preview() {
    let long = "x".repeat(400);
    let citation = SourceCitation::from_match(&ScoredMatch {
        chunk: chunk(&long, "/deep/nested/dir/report.pdf", Some(3)),
        distance: 0.1,
    });
    assert_eq!(citation.file_name, "report.pdf");
    assert_eq!(citation.page, Some(3));
    assert_eq!(citation.preview.chars().count(), 153);
    assert!(citation.preview.ends_with("..."));

    let short = SourceCitation::from_match(&ScoredMatch {
        chunk: chunk("short text", "notes.md", None),
        distance: 0.1,
    });
    assert_eq!(short.preview, "short text");
}

#[test]
fn format_sources_lists_every_citation_and_page_labels() {
    let result = QueryResult {
        answer: "because".to_string(),
        sources: vec![
            SourceCitation {
                file_name: "a.pdf".to_string(),
                page: Some(2),
                preview: "alpha".to_string(),
                similarity: 0.9,
            },
            SourceCitation {
                file_name: "b.txt".to_string(),
                page: None,
                preview: "beta".to_string(),
                similarity: 0.4,
            },
        ],
        question: "why?".to_string(),
    };
    let rendered = result.format_sources();
    assert!(rendered.contains("[1] File: a.pdf"));
    assert!(rendered.contains("Page: 2"));
    assert!(rendered.contains("[2] File: b.txt"));
    assert!(rendered.contains("Page: N/A"));
    assert!(rendered.contains("Similarity: 90%"));
}

#[test]
fn format_sources_empty_when_no_sources() {
    let result = QueryResult {
        answer: String::new(),
        sources: vec![],
        question: String::new(),
    };
    assert!(result.format_sources().is_empty());
}

#[test]
fn error_detail_appends_cause_chain() {
    let err = Error::Query(anyhow::anyhow!("connection refused"));
    let detail = err.detail();
    assert!(detail.starts_with("Query failed"));
    assert!(detail.contains("connection refused"));

    let plain = Error::NotReady;
    assert_eq!(plain.detail(), plain.to_string());
}
