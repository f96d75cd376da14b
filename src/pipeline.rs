use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::{Config, ContentBrief};
use crate::images::ImageFetcher;
use crate::script::{save_script, ScriptGenerator};
use crate::video::VideoComposer;
use crate::voice::VoiceSynthesizer;

/// Pipeline stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    Script,
    SaveScript,
    Voiceover,
    Images,
    Video,
    Cleanup,
    Completed,
}

/// Progress event emitted between stages for the CLI to display
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub stage: PipelineStage,
    pub percent: u8,
    pub message: String,
}

/// Outcome of a pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub brief: ContentBrief,
    pub script_path: Option<PathBuf>,
    pub video_path: Option<PathBuf>,
    pub stages_completed: Vec<PipelineStage>,
    pub total_time: Duration,
    pub word_count: usize,
    pub image_count: usize,
}

/// Result of the connection check operation
#[derive(Debug, Clone, Copy)]
pub struct ConnectionStatus {
    pub script_provider: bool,
    pub voice_service: bool,
}

impl ConnectionStatus {
    pub fn all_ok(&self) -> bool {
        self.script_provider && self.voice_service
    }
}

/// Drives the script → voice → images → video sequence
pub struct Pipeline {
    config: Config,
    script_generator: ScriptGenerator,
    voice: VoiceSynthesizer,
    images: ImageFetcher,
    composer: VideoComposer,
    cancel: Arc<AtomicBool>,
    progress: Option<mpsc::Sender<ProgressUpdate>>,
}

impl Pipeline {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let script_generator = ScriptGenerator::new(&config.script)?;
        let voice = VoiceSynthesizer::new(config.voice.clone())?;
        let images = ImageFetcher::new(config.images.clone());
        let composer = VideoComposer::new(config.video.clone());

        Ok(Self {
            config,
            script_generator,
            voice,
            images,
            composer,
            cancel: Arc::new(AtomicBool::new(false)),
            progress: None,
        })
    }

    /// Attach a progress channel
    pub fn with_progress(mut self, tx: mpsc::Sender<ProgressUpdate>) -> Self {
        self.progress = Some(tx);
        self
    }

    /// Flag that callers can set to stop the run between stages
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.load(Ordering::Relaxed) {
            Err(anyhow!("Process cancelled"))
        } else {
            Ok(())
        }
    }

    async fn report(&self, stage: PipelineStage, percent: u8, message: &str) {
        info!("{}", message);
        if let Some(tx) = &self.progress {
            let _ = tx
                .send(ProgressUpdate {
                    stage,
                    percent,
                    message: message.to_string(),
                })
                .await;
        }
    }

    /// Probe both external services
    pub async fn check_connections(&self) -> ConnectionStatus {
        let (script_provider, voice_service) =
            tokio::join!(self.script_generator.is_available(), self.voice.is_available());

        ConnectionStatus {
            script_provider,
            voice_service,
        }
    }

    /// Run the full pipeline for a brief
    pub async fn run(&self, brief: &ContentBrief) -> Result<RunReport> {
        let start_time = Instant::now();
        let mut stages_completed = Vec::new();

        let work_dir = self.config.output.base_dir.join("tmp");
        let image_dir = work_dir.join("images");
        let voiceover_path = work_dir.join("voiceover.mp3");
        tokio::fs::create_dir_all(&image_dir).await?;

        let result = self
            .run_stages(
                brief,
                &image_dir,
                &voiceover_path,
                &mut stages_completed,
            )
            .await;

        self.cleanup(&work_dir).await;
        stages_completed.push(PipelineStage::Cleanup);

        let (script_path, video_path, word_count, image_count) = result?;
        stages_completed.push(PipelineStage::Completed);

        self.report(PipelineStage::Completed, 100, "🎉 Process completed!")
            .await;

        let report = RunReport {
            brief: brief.clone(),
            script_path: Some(script_path),
            video_path: Some(video_path.clone()),
            stages_completed,
            total_time: start_time.elapsed(),
            word_count,
            image_count,
        };

        self.write_report(&report).await?;
        Ok(report)
    }

    async fn run_stages(
        &self,
        brief: &ContentBrief,
        image_dir: &Path,
        voiceover_path: &Path,
        stages_completed: &mut Vec<PipelineStage>,
    ) -> Result<(PathBuf, PathBuf, usize, usize)> {
        self.report(PipelineStage::Script, 10, "📝 Generating script...")
            .await;
        let script = self.script_generator.generate(brief).await?;
        let word_count = script.split_whitespace().count();
        stages_completed.push(PipelineStage::Script);
        self.check_cancelled()?;

        self.report(PipelineStage::SaveScript, 20, "💾 Saving script...")
            .await;
        let script_path = save_script(&script, brief, &self.config.output.base_dir).await?;
        stages_completed.push(PipelineStage::SaveScript);
        self.check_cancelled()?;

        self.report(PipelineStage::Voiceover, 30, "🎙️ Generating voiceover...")
            .await;
        self.voice
            .synthesize(&script, brief.voice, voiceover_path)
            .await?;
        stages_completed.push(PipelineStage::Voiceover);
        self.check_cancelled()?;

        self.report(PipelineStage::Images, 50, "🖼️ Downloading images...")
            .await;
        let images = self
            .images
            .collect(&script, &brief.content_type, image_dir)
            .await?;
        stages_completed.push(PipelineStage::Images);
        self.check_cancelled()?;

        self.report(PipelineStage::Video, 80, "🎬 Creating video...")
            .await;
        let output_path =
            VideoComposer::output_video_path(&self.config.output.base_dir, &brief.content_type);
        let video_path = self
            .composer
            .compose(image_dir, voiceover_path, &output_path)
            .await?;
        stages_completed.push(PipelineStage::Video);

        Ok((script_path, video_path, word_count, images.len()))
    }

    /// Run the preview variant: truncated script and narration, two images,
    /// ten seconds, no effects
    pub async fn run_preview(&self, brief: &ContentBrief) -> Result<RunReport> {
        let start_time = Instant::now();
        let mut stages_completed = Vec::new();

        let work_dir = self.config.output.base_dir.join("tmp_preview");
        let image_dir = work_dir.join("images");
        let voiceover_path = work_dir.join("voiceover.mp3");
        tokio::fs::create_dir_all(&image_dir).await?;

        let result = self
            .run_preview_stages(brief, &image_dir, &voiceover_path, &mut stages_completed)
            .await;

        self.cleanup(&work_dir).await;
        stages_completed.push(PipelineStage::Cleanup);

        let (video_path, word_count, image_count) = result?;
        stages_completed.push(PipelineStage::Completed);

        self.report(PipelineStage::Completed, 100, "🎉 Preview created!")
            .await;

        Ok(RunReport {
            brief: brief.clone(),
            script_path: None,
            video_path: Some(video_path),
            stages_completed,
            total_time: start_time.elapsed(),
            word_count,
            image_count,
        })
    }

    async fn run_preview_stages(
        &self,
        brief: &ContentBrief,
        image_dir: &Path,
        voiceover_path: &Path,
        stages_completed: &mut Vec<PipelineStage>,
    ) -> Result<(PathBuf, usize, usize)> {
        self.report(PipelineStage::Script, 20, "📝 Generating preview script...")
            .await;
        let script = self.script_generator.generate(brief).await?;
        let script: String = script.chars().take(500).collect();
        let word_count = script.split_whitespace().count();
        stages_completed.push(PipelineStage::Script);
        self.check_cancelled()?;

        self.report(
            PipelineStage::Voiceover,
            40,
            "🎙️ Generating preview voiceover...",
        )
        .await;
        let narration: String = script.chars().take(300).collect();
        self.voice
            .synthesize(&narration, brief.voice, voiceover_path)
            .await?;
        stages_completed.push(PipelineStage::Voiceover);
        self.check_cancelled()?;

        self.report(PipelineStage::Images, 60, "🖼️ Downloading preview images...")
            .await;
        let mut preview_images = self.config.images.clone();
        preview_images.max_images = 2;
        let fetcher = ImageFetcher::new(preview_images);
        let images = fetcher
            .collect(&script, &brief.content_type, image_dir)
            .await?;
        stages_completed.push(PipelineStage::Images);
        self.check_cancelled()?;

        self.report(PipelineStage::Video, 80, "🎬 Creating preview video...")
            .await;
        let output_path = self.config.output.base_dir.join("preview.mp4");
        let video_path = self
            .composer
            .compose_preview(image_dir, voiceover_path, &output_path, 10.0)
            .await?;
        stages_completed.push(PipelineStage::Video);

        Ok((video_path, word_count, images.len()))
    }

    /// Remove the work dir; failures are logged, never fatal
    async fn cleanup(&self, work_dir: &Path) {
        if self.config.output.keep_temp_files {
            info!("Keeping temp files in {}", work_dir.display());
            return;
        }

        if let Err(e) = tokio::fs::remove_dir_all(work_dir).await {
            if work_dir.exists() {
                warn!("Cleanup failed for {}: {}", work_dir.display(), e);
            }
        }
    }

    async fn write_report(&self, report: &RunReport) -> Result<()> {
        let path = self.config.output.base_dir.join("run_report.json");
        let json = serde_json::to_string_pretty(report)?;
        tokio::fs::write(&path, json).await?;
        info!("💾 Run report saved to: {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use tempfile::TempDir;

    fn test_config(dir: &Path) -> Config {
        ConfigBuilder::new()
            .with_script_api_key("gk".to_string())
            .with_voice_api_key("ek".to_string())
            .with_output_dir(dir.to_path_buf())
            .build()
    }

    #[tokio::test]
    async fn test_pipeline_creation() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = Pipeline::new(test_config(temp_dir.path()));
        assert!(pipeline.is_ok());
    }

    #[tokio::test]
    async fn test_pipeline_rejects_missing_keys() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(temp_dir.path());
        config.voice.api_key = None;
        assert!(Pipeline::new(config).is_err());
    }

    #[tokio::test]
    async fn test_cancel_flag_stops_run() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = Pipeline::new(test_config(temp_dir.path())).unwrap();

        let flag = pipeline.cancel_flag();
        flag.store(true, Ordering::Relaxed);

        assert!(pipeline.check_cancelled().is_err());
    }

    #[test]
    fn test_connection_status_all_ok() {
        let status = ConnectionStatus {
            script_provider: true,
            voice_service: false,
        };
        assert!(!status.all_ok());

        let status = ConnectionStatus {
            script_provider: true,
            voice_service: true,
        };
        assert!(status.all_ok());
    }

    #[test]
    fn test_run_report_serializes() {
        let report = RunReport {
            brief: ContentBrief::default(),
            script_path: Some(PathBuf::from("/out/generated_script.md")),
            video_path: Some(PathBuf::from("/out/AI_Video_Sports_20260826_120000.mp4")),
            stages_completed: vec![PipelineStage::Script, PipelineStage::Completed],
            total_time: Duration::from_secs(42),
            word_count: 180,
            image_count: 5,
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["word_count"], 180);
        assert_eq!(json["stages_completed"][0], "Script");
    }
}
