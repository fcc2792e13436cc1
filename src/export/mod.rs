//! Model export and serialization module
//!
//! Fitted pipelines are written in a native binary envelope (bincode) that
//! carries metadata and an integrity checksum, and can be read back with
//! [`load_pipeline`].

mod serializer;

pub use serializer::{
    load_model, load_pipeline, save_model, save_pipeline, ModelMetadata, SerializedModel,
};
