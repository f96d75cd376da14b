pub mod providers;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ScriptConfig;

/// Script generation provider types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ScriptProvider {
    Gemini,
    OpenAI,
}

/// Generation response
#[derive(Debug, Clone)]
pub struct GenerationResponse {
    pub text: String,
    pub tokens_used: Option<u32>,
}

/// Trait for text generation providers
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate text for a single prompt
    async fn generate(&self, prompt: &str) -> Result<GenerationResponse>;

    /// Cheap availability probe for the connection check
    async fn is_available(&self) -> bool;

    fn provider_type(&self) -> ScriptProvider;
}

/// Create a language model instance based on configuration
pub fn create_model(config: &ScriptConfig) -> Result<Box<dyn LanguageModel>> {
    match config.provider {
        ScriptProvider::Gemini => Ok(Box::new(providers::GeminiProvider::new(config.clone())?)),
        ScriptProvider::OpenAI => Ok(Box::new(providers::OpenAIProvider::new(config.clone())?)),
    }
}
