use anyhow::Result;
use clap::{Arg, Command};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{info, warn};

use ai_content_creator::config::{
    Config, ContentBrief, ContentStyle, ScriptDuration, Transition, VoicePreset, CONTENT_TYPES,
};
use ai_content_creator::pipeline::Pipeline;

fn cli() -> Command {
    Command::new("AI Content Creator")
        .version("0.1.0")
        .author("CATSMOKER")
        .about("Creates narrated slideshow videos from a topic: LLM script, TTS voiceover, image search, ffmpeg assembly")
        .arg(
            Arg::new("topic")
                .short('t')
                .long("topic")
                .value_name("TOPIC")
                .help(format!("Content topic (e.g. {})", CONTENT_TYPES.join(", ")))
                .default_value("Sports")
        )
        .arg(
            Arg::new("style")
                .short('s')
                .long("style")
                .value_name("STYLE")
                .help("Script style: professional, casual, educational, entertaining, inspirational")
                .default_value("professional")
        )
        .arg(
            Arg::new("duration")
                .short('d')
                .long("duration")
                .value_name("DURATION")
                .help("Target length: 30s, 60s, 90s, 2m, 3m, 5m")
                .default_value("60s")
        )
        .arg(
            Arg::new("voice")
                .long("voice")
                .value_name("VOICE")
                .help("Voice preset: professional-male, inspirational-female, young-male, young-female, narrator")
                .default_value("professional-male")
        )
        .arg(
            Arg::new("transition")
                .long("transition")
                .value_name("KIND")
                .help("Clip transition: crossfade, slide, fade-to-black, none")
        )
        .arg(
            Arg::new("zoom")
                .long("zoom")
                .value_name("FACTOR")
                .help("Ken Burns zoom factor, 1.0 to 1.2")
        )
        .arg(
            Arg::new("image-seconds")
                .long("image-seconds")
                .value_name("SECONDS")
                .help("Minimum seconds each image stays on screen")
        )
        .arg(
            Arg::new("output-dir")
                .short('o')
                .long("output-dir")
                .value_name("DIR")
                .help("Output directory for the video and script")
        )
        .arg(
            Arg::new("preview")
                .long("preview")
                .help("Render a 10-second preview instead of the full video")
                .action(clap::ArgAction::SetTrue)
        )
        .arg(
            Arg::new("check")
                .long("check")
                .help("Check API connections and exit")
                .action(clap::ArgAction::SetTrue)
        )
        .arg(
            Arg::new("keep-temp")
                .long("keep-temp")
                .help("Keep temp voiceover and image files")
                .action(clap::ArgAction::SetTrue)
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug logging")
                .action(clap::ArgAction::SetTrue)
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    // Initialize logging
    let filter = if matches.get_flag("verbose") {
        "ai_content_creator=debug,info"
    } else {
        "ai_content_creator=info,warn"
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let brief = ContentBrief {
        content_type: matches.get_one::<String>("topic").unwrap().clone(),
        style: ContentStyle::parse(matches.get_one::<String>("style").unwrap())?,
        duration: ScriptDuration::parse(matches.get_one::<String>("duration").unwrap())?,
        voice: VoicePreset::parse(matches.get_one::<String>("voice").unwrap())?,
    };

    // Load configuration
    let mut config = Config::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        Config::from_env()
    });

    if let Some(transition) = matches.get_one::<String>("transition") {
        config.video.transition = Transition::parse(transition)?;
    }
    if let Some(zoom) = matches.get_one::<String>("zoom") {
        config.video.zoom_factor = zoom.parse()?;
    }
    if let Some(seconds) = matches.get_one::<String>("image-seconds") {
        config.video.seconds_per_image = seconds.parse()?;
    }
    if let Some(dir) = matches.get_one::<String>("output-dir") {
        config.output.base_dir = PathBuf::from(dir);
    }
    if matches.get_flag("keep-temp") {
        config.output.keep_temp_files = true;
    }

    info!("🚀 AI Content Creator starting...");
    info!("📋 Topic: {} | Style: {} | Duration: {} | Voice: {}",
        brief.content_type,
        brief.style.label(),
        brief.duration.label(),
        brief.voice.label(),
    );
    info!("📂 Output directory: {}", config.output.base_dir.display());

    let pipeline = Pipeline::new(config)?;

    // Connection check mode
    if matches.get_flag("check") {
        let status = pipeline.check_connections().await;
        println!(
            "Script provider: {}",
            if status.script_provider { "✅ OK" } else { "❌ unavailable" }
        );
        println!(
            "Voice service:   {}",
            if status.voice_service { "✅ OK" } else { "❌ unavailable" }
        );
        if !status.all_ok() {
            return Err(anyhow::anyhow!("One or more API connections failed"));
        }
        println!("Both API connections are working!");
        return Ok(());
    }

    // Progress bar driven by pipeline events
    let (tx, mut rx) = mpsc::channel::<ai_content_creator::ProgressUpdate>(16);
    let progress = ProgressBar::new(100);
    progress.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let bar = progress.clone();
    let display = tokio::spawn(async move {
        while let Some(update) = rx.recv().await {
            bar.set_position(update.percent as u64);
            bar.set_message(update.message);
        }
    });

    let pipeline = pipeline.with_progress(tx);

    let report = if matches.get_flag("preview") {
        pipeline.run_preview(&brief).await
    } else {
        pipeline.run(&brief).await
    };

    // Drop the pipeline so the progress sender closes and the display
    // task drains
    drop(pipeline);
    let _ = display.await;
    progress.finish_and_clear();

    let report = report?;

    info!("🎉 Completed in {:.2}s", report.total_time.as_secs_f64());
    info!("📝 Script: {} words", report.word_count);
    info!("🖼️ Images: {}", report.image_count);
    if let Some(path) = &report.video_path {
        info!("🎬 Video saved to: {}", path.display());
        println!("\nVideo created successfully!\n\nSaved to:\n{}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_flag_off_by_default() {
        let matches = cli().try_get_matches_from(["ai-content-creator"]).unwrap();
        assert!(!matches.get_flag("verbose"));
    }

    #[test]
    fn test_verbose_flag_short_and_long() {
        let matches = cli()
            .try_get_matches_from(["ai-content-creator", "-v"])
            .unwrap();
        assert!(matches.get_flag("verbose"));

        let matches = cli()
            .try_get_matches_from(["ai-content-creator", "--verbose"])
            .unwrap();
        assert!(matches.get_flag("verbose"));
    }
}
