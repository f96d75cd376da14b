use anyhow::{anyhow, Result};
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::{ContentBrief, ScriptConfig, ScriptDuration};
use crate::llm::{create_model, LanguageModel};

/// Substrings that mark a script as placeholder output
const PLACEHOLDER_TOKENS: &[&str] = &["lorem", "ipsum", "undefined", "example", "placeholder"];

/// Generates and quality-gates narration scripts via the configured LLM
pub struct ScriptGenerator {
    model: Box<dyn LanguageModel>,
}

impl ScriptGenerator {
    pub fn new(config: &ScriptConfig) -> Result<Self> {
        let model = create_model(config)?;
        Ok(Self { model })
    }

    /// Assemble the generation prompt from a content brief
    pub fn build_prompt(brief: &ContentBrief) -> String {
        format!(
            "Create a professional {duration} YouTube script about {topic} with this structure:\n\
            1. Engaging hook (first 5-10 seconds)\n\
            2. 3-5 key points with supporting facts\n\
            3. Clear transitions between sections\n\
            4. Call-to-action at the end\n\
            Style: {style}\n\
            Tone: Professional but engaging\n\
            Target audience: General YouTube viewers\n\
            Make it factual, well-structured, and suitable for voiceover narration.\n\
            Avoid filler content and maintain consistent quality throughout.",
            duration = brief.duration.label(),
            topic = brief.content_type,
            style = brief.style.label(),
        )
    }

    /// Generate a script for the brief and run it through the quality gate
    pub async fn generate(&self, brief: &ContentBrief) -> Result<String> {
        let prompt = Self::build_prompt(brief);
        debug!("Requesting script for topic: {}", brief.content_type);

        let response = self.model.generate(&prompt).await?;
        let script = response.text.trim().to_string();

        if script.is_empty() {
            return Err(anyhow!("Empty response from script provider"));
        }

        Self::validate(&script, brief.duration)?;

        info!(
            "📝 Script generated: {} words{}",
            script.split_whitespace().count(),
            response
                .tokens_used
                .map(|t| format!(" ({} tokens)", t))
                .unwrap_or_default()
        );

        Ok(script)
    }

    /// Quality gate: length floor and placeholder rejection
    pub fn validate(script: &str, duration: ScriptDuration) -> Result<()> {
        let word_count = script.split_whitespace().count();
        let min_words = duration.min_words();
        if word_count < min_words {
            return Err(anyhow!(
                "Script too short ({} words). Needs at least {} words",
                word_count,
                min_words
            ));
        }

        let lowered = script.to_lowercase();
        if PLACEHOLDER_TOKENS.iter().any(|t| lowered.contains(t)) {
            return Err(anyhow!("Script contains placeholder/nonsense text"));
        }

        Ok(())
    }

    /// Probe the provider for the connection check
    pub async fn is_available(&self) -> bool {
        self.model.is_available().await
    }
}

/// Persist the accepted script as markdown with a metadata header
pub async fn save_script(script: &str, brief: &ContentBrief, output_dir: &Path) -> Result<PathBuf> {
    let path = output_dir.join("generated_script.md");

    let mut content = String::new();
    content.push_str("# AI Generated Script\n\n");
    content.push_str(&format!("- Content Type: {}\n", brief.content_type));
    content.push_str(&format!("- Style: {}\n", brief.style.label()));
    content.push_str(&format!("- Duration: {}\n", brief.duration.label()));
    content.push_str(&format!(
        "- Created: {}\n\n",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    ));

    for paragraph in script.split('\n') {
        if !paragraph.trim().is_empty() {
            content.push_str(paragraph.trim_end());
            content.push_str("\n\n");
        }
    }

    tokio::fs::write(&path, content).await?;
    info!("💾 Script saved to: {}", path.display());

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ContentStyle, VoicePreset};
    use tempfile::TempDir;

    fn brief() -> ContentBrief {
        ContentBrief {
            content_type: "Technology".to_string(),
            style: ContentStyle::Educational,
            duration: ScriptDuration::ThirtySeconds,
            voice: VoicePreset::Narrator,
        }
    }

    fn words(n: usize) -> String {
        std::iter::repeat("quantum")
            .take(n)
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_prompt_includes_brief() {
        let prompt = ScriptGenerator::build_prompt(&brief());
        assert!(prompt.contains("30 seconds"));
        assert!(prompt.contains("Technology"));
        assert!(prompt.contains("Style: Educational"));
        assert!(prompt.contains("Call-to-action"));
    }

    #[test]
    fn test_validate_rejects_short_script() {
        let err = ScriptGenerator::validate(&words(50), ScriptDuration::ThirtySeconds)
            .unwrap_err()
            .to_string();
        assert!(err.contains("too short"));

        // 100 words passes the 30-second gate but not the longer one
        assert!(ScriptGenerator::validate(&words(100), ScriptDuration::ThirtySeconds).is_ok());
        assert!(ScriptGenerator::validate(&words(100), ScriptDuration::TwoMinutes).is_err());
    }

    #[test]
    fn test_validate_rejects_placeholder_text() {
        let script = format!("{} Lorem ipsum dolor sit amet", words(120));
        let err = ScriptGenerator::validate(&script, ScriptDuration::ThirtySeconds)
            .unwrap_err()
            .to_string();
        assert!(err.contains("placeholder"));
    }

    #[tokio::test]
    async fn test_save_script_writes_header() {
        let temp_dir = TempDir::new().unwrap();
        let script = "First paragraph.\n\nSecond paragraph.";

        let path = save_script(script, &brief(), temp_dir.path()).await.unwrap();
        let saved = tokio::fs::read_to_string(&path).await.unwrap();

        assert!(saved.starts_with("# AI Generated Script"));
        assert!(saved.contains("- Content Type: Technology"));
        assert!(saved.contains("First paragraph."));
        assert!(saved.contains("Second paragraph."));
    }
}
