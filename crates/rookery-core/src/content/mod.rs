//! Content pipeline capabilities: generation, image synthesis, publishing.

pub mod generator;
pub mod image;
pub mod model;
pub mod publisher;

pub use generator::ContentGenerator;
pub use image::ImageSynthesizer;
pub use model::{GeneratedPost, PostId};
pub use publisher::Publisher;
