/// AI Content Creator - Rust Implementation
///
/// Headless content assembly pipeline: an LLM writes a narration script,
/// ElevenLabs voices it, an image-search scrape (with synthesized fallback
/// cards) supplies visuals, and ffmpeg sequences the result into a video.

pub mod config;
pub mod images;
pub mod llm;
pub mod pipeline;
pub mod script;
pub mod video;
pub mod voice;

// Re-export main types for easy access
pub use crate::config::{
    Config, ConfigBuilder, ContentBrief, ContentStyle, ScriptDuration, Transition, VoicePreset,
};
pub use crate::images::{extract_keywords, ImageFetcher};
pub use crate::llm::{LanguageModel, ScriptProvider};
pub use crate::pipeline::{ConnectionStatus, Pipeline, PipelineStage, ProgressUpdate, RunReport};
pub use crate::script::ScriptGenerator;
pub use crate::video::VideoComposer;
pub use crate::voice::{VoiceError, VoiceSynthesizer};
