use ai_content_creator::config::{
    Config, ConfigBuilder, ContentBrief, ContentStyle, ScriptDuration, Transition, VoicePreset,
};
use ai_content_creator::pipeline::Pipeline;
use ai_content_creator::script::ScriptGenerator;
use ai_content_creator::video::VideoComposer;
use ai_content_creator::{extract_keywords, ScriptProvider};
use std::path::Path;
use tempfile::TempDir;

fn configured(dir: &Path) -> Config {
    ConfigBuilder::new()
        .with_script_api_key("test-gemini-key".to_string())
        .with_voice_api_key("test-eleven-key".to_string())
        .with_output_dir(dir.to_path_buf())
        .build()
}

#[test]
fn test_config_toml_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let config = configured(temp_dir.path());

    let serialized = toml::to_string_pretty(&config).unwrap();
    let restored: Config = toml::from_str(&serialized).unwrap();

    assert_eq!(restored.script.provider, ScriptProvider::Gemini);
    assert_eq!(restored.video.transition, Transition::Crossfade);
    assert_eq!(restored.video.zoom_factor, config.video.zoom_factor);
    assert_eq!(restored.voice.max_retries, 3);
}

#[test]
fn test_brief_parsing_from_cli_strings() {
    let brief = ContentBrief {
        content_type: "Science".to_string(),
        style: ContentStyle::parse("entertaining").unwrap(),
        duration: ScriptDuration::parse("2m").unwrap(),
        voice: VoicePreset::parse("inspirational-female").unwrap(),
    };

    assert_eq!(brief.style, ContentStyle::Entertaining);
    assert_eq!(brief.duration, ScriptDuration::TwoMinutes);
    assert_eq!(brief.voice.voice_id(), "IKne3meq5aSn9XLyUdCD");
}

#[test]
fn test_script_gate_matches_duration() {
    let filler = "discover ".repeat(120);
    assert!(ScriptGenerator::validate(&filler, ScriptDuration::ThirtySeconds).is_ok());
    assert!(ScriptGenerator::validate(&filler, ScriptDuration::FiveMinutes).is_err());

    let with_placeholder = format!("{} lorem ipsum", filler);
    assert!(ScriptGenerator::validate(&with_placeholder, ScriptDuration::ThirtySeconds).is_err());
}

#[test]
fn test_keywords_feed_search_terms() {
    let script = "Modern telescopes capture distant galaxies while orbiting \
                  satellites measure radiation across several spectrums";
    let keywords = extract_keywords(script);

    assert!(keywords.contains(&"telescopes".to_string()));
    assert!(keywords.contains(&"galaxies".to_string()));
    assert!(!keywords.contains(&"while".to_string()));
}

#[test]
fn test_output_video_path_is_timestamped() {
    let path = VideoComposer::output_video_path(Path::new("/videos"), "Travel");
    let name = path.file_name().unwrap().to_str().unwrap();

    assert!(name.starts_with("AI_Video_Travel_"));
    assert!(name.ends_with(".mp4"));
    // AI_Video_Travel_YYYYmmdd_HHMMSS.mp4
    assert_eq!(name.len(), "AI_Video_Travel_".len() + 15 + ".mp4".len());
}

#[tokio::test]
async fn test_pipeline_builds_from_valid_config() {
    let temp_dir = TempDir::new().unwrap();
    let pipeline = Pipeline::new(configured(temp_dir.path()));
    assert!(pipeline.is_ok());
}

#[tokio::test]
async fn test_pipeline_requires_both_keys() {
    let temp_dir = TempDir::new().unwrap();

    let mut config = configured(temp_dir.path());
    config.script.api_key = None;
    assert!(Pipeline::new(config).is_err());

    let mut config = configured(temp_dir.path());
    config.voice.api_key = None;
    assert!(Pipeline::new(config).is_err());
}

#[tokio::test]
async fn test_cancel_flag_is_shared() {
    let temp_dir = TempDir::new().unwrap();
    let pipeline = Pipeline::new(configured(temp_dir.path())).unwrap();

    let flag = pipeline.cancel_flag();
    assert!(!flag.load(std::sync::atomic::Ordering::Relaxed));
    flag.store(true, std::sync::atomic::Ordering::Relaxed);

    let again = pipeline.cancel_flag();
    assert!(again.load(std::sync::atomic::Ordering::Relaxed));
}
