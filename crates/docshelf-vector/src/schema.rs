use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

/// One row per chunk: source metadata, content, and a fixed-size vector
/// whose length is the embedder's dimension.
pub fn build_arrow_schema(dim: i32) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("source_path", DataType::Utf8, false),
        Field::new("page", DataType::Int32, true),
        Field::new("content", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim),
            true,
        ),
    ]))
}
