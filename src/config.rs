use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::llm::ScriptProvider;

/// Configuration for the content creation pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Script generation settings
    pub script: ScriptConfig,

    /// Text-to-speech settings
    pub voice: VoiceConfig,

    /// Image search and fallback settings
    pub images: ImageConfig,

    /// Clip sequencing and encoder settings
    pub video: VideoConfig,

    /// Output and temp file settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptConfig {
    /// LLM provider for script generation
    pub provider: ScriptProvider,

    /// API key (cloud providers)
    pub api_key: Option<String>,

    /// Model to use
    pub model: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Temperature for generation
    pub temperature: f32,

    /// Nucleus sampling cutoff
    pub top_p: f32,

    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// ElevenLabs API key
    pub api_key: Option<String>,

    /// TTS model id
    pub model_id: String,

    /// Voice stability setting
    pub stability: f32,

    /// Similarity boost setting
    pub similarity_boost: f32,

    /// Style exaggeration setting
    pub style: f32,

    /// Enable speaker boost
    pub speaker_boost: bool,

    /// Maximum characters sent to the TTS service per request
    pub max_text_chars: usize,

    /// Maximum retries for failed synthesis requests
    pub max_retries: u32,

    /// Delay between retries in seconds
    pub retry_delay_seconds: u64,

    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Maximum images collected per run
    pub max_images: usize,

    /// Download cap per search term
    pub per_term_limit: usize,

    /// Number of keywords promoted to search terms
    pub search_term_count: usize,

    /// Timeout for individual image downloads (seconds)
    pub download_timeout_seconds: u64,

    /// Timeout for the search page request (seconds)
    pub search_timeout_seconds: u64,

    /// User agent sent with scrape requests
    pub user_agent: String,

    /// Fallback card width in pixels
    pub fallback_width: u32,

    /// Fallback card height in pixels
    pub fallback_height: u32,

    /// Footer caption drawn on fallback cards
    pub fallback_caption: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Output frame rate
    pub fps: u32,

    /// Frame height clips are scaled to
    pub target_height: u32,

    /// Ken Burns zoom factor (1.0 = none, 1.2 = max)
    pub zoom_factor: f64,

    /// Portion of each clip the zoom runs over
    pub zoom_portion: f64,

    /// Transition between consecutive clips
    pub transition: Transition,

    /// Transition duration in seconds
    pub transition_duration: f64,

    /// Minimum seconds each image stays on screen
    pub seconds_per_image: f64,

    /// Encoder bitrate
    pub bitrate: String,

    /// x264 preset for the quality encode
    pub preset: String,

    /// CRF for the quality encode
    pub crf: u32,

    /// Encoder threads for the quality encode
    pub threads: u32,

    /// x264 preset used when the quality encode fails
    pub fallback_preset: String,

    /// CRF used when the quality encode fails
    pub fallback_crf: u32,

    /// Encoder threads used when the quality encode fails
    pub fallback_threads: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Base output directory
    pub base_dir: PathBuf,

    /// Keep temp voiceover and image files after the run
    pub keep_temp_files: bool,
}

/// Transition applied between consecutive clips
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    Crossfade,
    Slide,
    FadeToBlack,
    None,
}

impl Transition {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "crossfade" => Ok(Transition::Crossfade),
            "slide" => Ok(Transition::Slide),
            "fade-to-black" | "fadetoblack" | "fade" => Ok(Transition::FadeToBlack),
            "none" => Ok(Transition::None),
            other => Err(anyhow!("Unknown transition: {}", other)),
        }
    }
}

/// Target script length, which also drives the quality gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScriptDuration {
    ThirtySeconds,
    SixtySeconds,
    NinetySeconds,
    TwoMinutes,
    ThreeMinutes,
    FiveMinutes,
}

impl ScriptDuration {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().replace(' ', "").as_str() {
            "30s" | "30seconds" => Ok(ScriptDuration::ThirtySeconds),
            "60s" | "60seconds" | "1m" => Ok(ScriptDuration::SixtySeconds),
            "90s" | "90seconds" => Ok(ScriptDuration::NinetySeconds),
            "2m" | "2minutes" => Ok(ScriptDuration::TwoMinutes),
            "3m" | "3minutes" => Ok(ScriptDuration::ThreeMinutes),
            "5m" | "5minutes" => Ok(ScriptDuration::FiveMinutes),
            other => Err(anyhow!("Unknown duration: {}", other)),
        }
    }

    /// Human label used in prompts and saved scripts
    pub fn label(&self) -> &'static str {
        match self {
            ScriptDuration::ThirtySeconds => "30 seconds",
            ScriptDuration::SixtySeconds => "60 seconds",
            ScriptDuration::NinetySeconds => "90 seconds",
            ScriptDuration::TwoMinutes => "2 minutes",
            ScriptDuration::ThreeMinutes => "3 minutes",
            ScriptDuration::FiveMinutes => "5 minutes",
        }
    }

    /// Minimum acceptable word count for a script of this length
    pub fn min_words(&self) -> usize {
        match self {
            ScriptDuration::ThirtySeconds => 100,
            _ => 150,
        }
    }
}

/// Narration voice presets mapped to ElevenLabs voice ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoicePreset {
    ProfessionalMale,
    InspirationalFemale,
    YoungMale,
    YoungFemale,
    Narrator,
}

impl VoicePreset {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().replace([' ', '-', '_'], "").as_str() {
            "professionalmale" => Ok(VoicePreset::ProfessionalMale),
            "inspirationalfemale" => Ok(VoicePreset::InspirationalFemale),
            "youngmale" => Ok(VoicePreset::YoungMale),
            "youngfemale" => Ok(VoicePreset::YoungFemale),
            "narrator" => Ok(VoicePreset::Narrator),
            other => Err(anyhow!("Unknown voice preset: {}", other)),
        }
    }

    pub fn voice_id(&self) -> &'static str {
        match self {
            VoicePreset::ProfessionalMale => "pNInz6obpgDQGcFmaJgB",
            VoicePreset::InspirationalFemale => "IKne3meq5aSn9XLyUdCD",
            VoicePreset::YoungMale => "g5CIjZEefAph4nQFvHAz",
            VoicePreset::YoungFemale => "jBpfuIE2acCO8z3wKNLl",
            VoicePreset::Narrator => "wViXBPUzp2ZZixB1xQuM",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            VoicePreset::ProfessionalMale => "Professional Male",
            VoicePreset::InspirationalFemale => "Inspirational Female",
            VoicePreset::YoungMale => "Young Male",
            VoicePreset::YoungFemale => "Young Female",
            VoicePreset::Narrator => "Narrator",
        }
    }
}

/// Script style options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentStyle {
    Professional,
    Casual,
    Educational,
    Entertaining,
    Inspirational,
}

impl ContentStyle {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "professional" => Ok(ContentStyle::Professional),
            "casual" => Ok(ContentStyle::Casual),
            "educational" => Ok(ContentStyle::Educational),
            "entertaining" => Ok(ContentStyle::Entertaining),
            "inspirational" => Ok(ContentStyle::Inspirational),
            other => Err(anyhow!("Unknown style: {}", other)),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ContentStyle::Professional => "Professional",
            ContentStyle::Casual => "Casual",
            ContentStyle::Educational => "Educational",
            ContentStyle::Entertaining => "Entertaining",
            ContentStyle::Inspirational => "Inspirational",
        }
    }
}

/// Suggested content types; any free-form topic is accepted
pub const CONTENT_TYPES: &[&str] = &[
    "Sports",
    "Technology",
    "Health & Fitness",
    "Business",
    "Travel",
    "Education",
    "Entertainment",
    "News",
    "Science",
    "Motivational",
];

/// What to make: the inputs the pipeline runs from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentBrief {
    pub content_type: String,
    pub style: ContentStyle,
    pub duration: ScriptDuration,
    pub voice: VoicePreset,
}

impl Default for ContentBrief {
    fn default() -> Self {
        Self {
            content_type: "Sports".to_string(),
            style: ContentStyle::Professional,
            duration: ScriptDuration::SixtySeconds,
            voice: VoicePreset::ProfessionalMale,
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        let config_paths = [
            "content-creator.toml",
            "config/content-creator.toml",
            "~/.config/content-creator/config.toml",
        ];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str::<Config>(&config_str) {
                    Ok(mut config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        config.apply_env_overrides();
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        Err(anyhow!("No configuration file found"))
    }

    /// Build configuration from defaults plus environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            if self.script.provider == ScriptProvider::Gemini && !key.trim().is_empty() {
                self.script.api_key = Some(key.trim().to_string());
            }
        }

        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if self.script.provider == ScriptProvider::OpenAI && !key.trim().is_empty() {
                self.script.api_key = Some(key.trim().to_string());
            }
        }

        if let Ok(key) = std::env::var("ELEVENLABS_API_KEY") {
            if !key.trim().is_empty() {
                self.voice.api_key = Some(key.trim().to_string());
            }
        }

        if let Ok(dir) = std::env::var("CONTENT_CREATOR_OUTPUT_DIR") {
            self.output.base_dir = PathBuf::from(dir);
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &str) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.script.api_key.as_deref().unwrap_or("").trim().is_empty() {
            return Err(anyhow!("Script provider API key is required"));
        }

        if self.voice.api_key.as_deref().unwrap_or("").trim().is_empty() {
            return Err(anyhow!("ElevenLabs API key is required"));
        }

        if !(1.0..=1.2).contains(&self.video.zoom_factor) {
            return Err(anyhow!("zoom_factor must be between 1.0 and 1.2"));
        }

        if self.video.seconds_per_image <= 0.0 {
            return Err(anyhow!("seconds_per_image must be greater than 0"));
        }

        // Each xfade starts transition_duration before the clip ends, so
        // clips must outlast the transition
        if self.video.transition != Transition::None
            && self.video.seconds_per_image <= self.video.transition_duration
        {
            return Err(anyhow!(
                "seconds_per_image must be greater than transition_duration ({}s)",
                self.video.transition_duration
            ));
        }

        if self.images.max_images == 0 {
            return Err(anyhow!("max_images must be greater than 0"));
        }

        if !self.output.base_dir.exists() {
            if let Err(e) = std::fs::create_dir_all(&self.output.base_dir) {
                return Err(anyhow!("Cannot create output directory: {}", e));
            }
        }

        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Content Creator Configuration:\n\
            - Script Provider: {:?} ({})\n\
            - Voice Model: {}\n\
            - Max Images: {}\n\
            - Encoder: libx264 {} crf {}\n\
            - Output Directory: {}",
            self.script.provider,
            self.script.model,
            self.voice.model_id,
            self.images.max_images,
            self.video.preset,
            self.video.crf,
            self.output.base_dir.display()
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            script: ScriptConfig {
                provider: ScriptProvider::Gemini,
                api_key: None,
                model: "gemini-1.5-pro".to_string(),
                max_tokens: 2000,
                temperature: 0.3,
                top_p: 0.7,
                timeout_seconds: 60,
            },
            voice: VoiceConfig {
                api_key: None,
                model_id: "eleven_multilingual_v2".to_string(),
                stability: 0.5,
                similarity_boost: 0.75,
                style: 0.3,
                speaker_boost: true,
                max_text_chars: 5000,
                max_retries: 3,
                retry_delay_seconds: 5,
                timeout_seconds: 60,
            },
            images: ImageConfig {
                max_images: 5,
                per_term_limit: 2,
                search_term_count: 3,
                download_timeout_seconds: 15,
                search_timeout_seconds: 30,
                user_agent: "Mozilla/5.0".to_string(),
                fallback_width: 1920,
                fallback_height: 1080,
                fallback_caption: "Generated by AI Content Creator Pro".to_string(),
            },
            video: VideoConfig {
                fps: 24,
                target_height: 1080,
                zoom_factor: 1.03,
                zoom_portion: 0.8,
                transition: Transition::Crossfade,
                transition_duration: 0.5,
                seconds_per_image: 5.0,
                bitrate: "8000k".to_string(),
                preset: "slow".to_string(),
                crf: 18,
                threads: 4,
                fallback_preset: "fast".to_string(),
                fallback_crf: 23,
                fallback_threads: 2,
            },
            output: OutputConfig {
                base_dir: PathBuf::from("./output"),
                keep_temp_files: false,
            },
        }
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_script_api_key(mut self, api_key: String) -> Self {
        self.config.script.api_key = Some(api_key);
        self
    }

    pub fn with_voice_api_key(mut self, api_key: String) -> Self {
        self.config.voice.api_key = Some(api_key);
        self
    }

    pub fn with_provider(mut self, provider: ScriptProvider) -> Self {
        self.config.script.provider = provider;
        self
    }

    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.config.output.base_dir = dir;
        self
    }

    pub fn with_zoom_factor(mut self, factor: f64) -> Self {
        self.config.video.zoom_factor = factor;
        self
    }

    pub fn with_transition(mut self, transition: Transition) -> Self {
        self.config.video.transition = transition;
        self
    }

    pub fn with_seconds_per_image(mut self, seconds: f64) -> Self {
        self.config.video.seconds_per_image = seconds;
        self
    }

    pub fn keep_temp_files(mut self, keep: bool) -> Self {
        self.config.output.keep_temp_files = keep;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.video.fps, 24);
        assert_eq!(config.video.zoom_factor, 1.03);
        assert_eq!(config.images.max_images, 5);
        assert_eq!(config.voice.max_retries, 3);
        assert_eq!(config.voice.max_text_chars, 5000);
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .with_zoom_factor(1.1)
            .with_transition(Transition::FadeToBlack)
            .with_seconds_per_image(3.0)
            .build();

        assert_eq!(config.video.zoom_factor, 1.1);
        assert_eq!(config.video.transition, Transition::FadeToBlack);
        assert_eq!(config.video.seconds_per_image, 3.0);
    }

    #[test]
    fn test_validation_requires_keys() {
        let mut config = Config::default();
        config.output.base_dir = std::env::temp_dir().join("acc-test-validate");
        assert!(config.validate().is_err());

        config.script.api_key = Some("gk".to_string());
        config.voice.api_key = Some("ek".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_zoom() {
        let mut config = Config::default();
        config.script.api_key = Some("gk".to_string());
        config.voice.api_key = Some("ek".to_string());
        config.video.zoom_factor = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_image_seconds_under_transition() {
        let mut config = Config::default();
        config.script.api_key = Some("gk".to_string());
        config.voice.api_key = Some("ek".to_string());
        config.output.base_dir = std::env::temp_dir().join("acc-test-validate");
        config.video.seconds_per_image = 0.3;
        assert!(config.validate().is_err());

        // no transitions, no overlap to respect
        config.video.transition = Transition::None;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duration_word_gate() {
        assert_eq!(ScriptDuration::ThirtySeconds.min_words(), 100);
        assert_eq!(ScriptDuration::TwoMinutes.min_words(), 150);
    }

    #[test]
    fn test_voice_preset_ids() {
        assert_eq!(
            VoicePreset::ProfessionalMale.voice_id(),
            "pNInz6obpgDQGcFmaJgB"
        );
        assert_eq!(VoicePreset::Narrator.voice_id(), "wViXBPUzp2ZZixB1xQuM");
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!(
            Transition::parse("fade-to-black").unwrap(),
            Transition::FadeToBlack
        );
        assert_eq!(
            ScriptDuration::parse("30 seconds").unwrap(),
            ScriptDuration::ThirtySeconds
        );
        assert_eq!(
            VoicePreset::parse("young female").unwrap(),
            VoicePreset::YoungFemale
        );
        assert!(ContentStyle::parse("dramatic").is_err());
    }
}
