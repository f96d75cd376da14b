use anyhow::{anyhow, Result};
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::{Transition, VideoConfig};
use crate::images::list_images;

/// Sequences still images into clips and encodes the final video with ffmpeg
pub struct VideoComposer {
    config: VideoConfig,
}

impl VideoComposer {
    pub fn new(config: VideoConfig) -> Self {
        Self { config }
    }

    /// Frame width for the configured height at 16:9, kept even for x264
    fn frame_width(&self) -> u32 {
        let width = self.config.target_height * 16 / 9;
        width - (width % 2)
    }

    /// Probe media duration in seconds using ffprobe
    pub async fn probe_duration(path: &Path) -> Result<f64> {
        let output = tokio::process::Command::new("ffprobe")
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                path.to_str().ok_or_else(|| anyhow!("Non-UTF8 path"))?,
            ])
            .output()
            .await?;

        if !output.status.success() {
            return Err(anyhow!("ffprobe failed for {}", path.display()));
        }

        let json_str = String::from_utf8(output.stdout)?;
        let probe: serde_json::Value = serde_json::from_str(&json_str)?;

        let duration: f64 = probe["format"]["duration"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| anyhow!("Invalid audio file: no duration in {}", path.display()))?;

        if duration <= 0.0 {
            return Err(anyhow!("Invalid audio file: zero duration"));
        }

        Ok(duration)
    }

    /// Collect decodable images from the temp dir, sorted by name
    pub async fn collect_valid_images(&self, image_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut valid = Vec::new();

        for path in list_images(image_dir)? {
            let bytes = tokio::fs::read(&path).await?;
            match image::load_from_memory(&bytes) {
                Ok(_) => valid.push(path),
                Err(e) => {
                    warn!("Skipping unreadable image {}: {}", path.display(), e);
                }
            }
        }

        Ok(valid)
    }

    /// Seconds each image stays on screen: at least the configured minimum,
    /// stretched so the slideshow covers the narration
    pub fn seconds_per_image(&self, audio_duration: f64, image_count: usize) -> f64 {
        if image_count == 0 {
            return self.config.seconds_per_image;
        }
        self.config
            .seconds_per_image
            .max(audio_duration / image_count as f64)
    }

    /// Timestamped output path for the final video
    pub fn output_video_path(output_dir: &Path, content_type: &str) -> PathBuf {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let content_type = content_type.replace(' ', "_");
        output_dir.join(format!("AI_Video_{}_{}.mp4", content_type, timestamp))
    }

    /// Render the full video: per-image zoom clips, transitions, narration mux
    pub async fn compose(
        &self,
        image_dir: &Path,
        audio_path: &Path,
        output_path: &Path,
    ) -> Result<PathBuf> {
        let images = self.collect_valid_images(image_dir).await?;
        if images.is_empty() {
            return Err(anyhow!("No valid images available for video creation"));
        }

        let audio_duration = Self::probe_duration(audio_path).await?;
        let clip_duration = self.seconds_per_image(audio_duration, images.len());

        info!(
            "🎬 Sequencing {} clips at {:.1}s each ({:.1}s narration)",
            images.len(),
            clip_duration,
            audio_duration
        );

        let clips_dir = tempfile::tempdir()?;
        let clips = self.render_clips(&images, clip_duration, clips_dir.path()).await?;
        if clips.is_empty() {
            return Err(anyhow!("Could not create any valid video clips"));
        }

        self.encode_final(&clips, clip_duration, audio_path, output_path)
            .await?;

        Ok(output_path.to_path_buf())
    }

    /// Render a short preview: even split of the first seconds of narration,
    /// plain stills, no effects
    pub async fn compose_preview(
        &self,
        image_dir: &Path,
        audio_path: &Path,
        output_path: &Path,
        max_seconds: f64,
    ) -> Result<PathBuf> {
        let images = self.collect_valid_images(image_dir).await?;
        if images.is_empty() {
            return Err(anyhow!("No valid images available for preview"));
        }

        let audio_duration = Self::probe_duration(audio_path).await?;
        let target = audio_duration.min(max_seconds);
        let clip_duration = target / images.len() as f64;

        let clips_dir = tempfile::tempdir()?;
        let mut clips = Vec::new();
        for (index, img) in images.iter().enumerate() {
            let clip = clips_dir.path().join(format!("clip_{:03}.mp4", index));
            self.render_still(img, clip_duration, &clip).await?;
            clips.push(clip);
        }

        let mut args = self.concat_args(&clips, clip_duration, Transition::None, audio_path)?;
        args.extend(vec![
            "-t".to_string(),
            format!("{:.3}", target),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-r".to_string(),
            self.config.fps.to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-y".to_string(),
            path_arg(output_path)?,
        ]);

        run_ffmpeg(&args).await?;
        info!("✅ Preview written: {}", output_path.display());
        Ok(output_path.to_path_buf())
    }

    /// Render per-image clips; a failed zoom render degrades to a plain
    /// still, a failed still is skipped
    async fn render_clips(
        &self,
        images: &[PathBuf],
        clip_duration: f64,
        clips_dir: &Path,
    ) -> Result<Vec<PathBuf>> {
        let mut clips = Vec::new();

        for (index, img) in images.iter().enumerate() {
            let clip = clips_dir.join(format!("clip_{:03}.mp4", index));

            match self.render_zoom_clip(img, clip_duration, &clip).await {
                Ok(()) => clips.push(clip),
                Err(e) => {
                    warn!(
                        "Error processing {}, using simple clip: {}",
                        img.display(),
                        e
                    );
                    match self.render_still(img, clip_duration, &clip).await {
                        Ok(()) => clips.push(clip),
                        Err(e) => {
                            warn!("Failed to create clip for {}, skipping: {}", img.display(), e);
                        }
                    }
                }
            }
        }

        Ok(clips)
    }

    /// Ken Burns render: cover-scale to the frame, slow centered zoom-in
    /// over the first portion of the clip
    async fn render_zoom_clip(&self, image: &Path, duration: f64, output: &Path) -> Result<()> {
        let width = self.frame_width();
        let height = self.config.target_height;
        let fps = self.config.fps;

        let total_frames = (duration * fps as f64).round().max(1.0) as u64;
        let zoom_frames =
            ((total_frames as f64) * self.config.zoom_portion).round().max(1.0) as u64;
        let factor = self.config.zoom_factor;

        let filter = format!(
            "scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h},\
             zoompan=z='min(1+{gain:.6}*on/{zf},{factor:.4})':d={frames}:\
             x='iw/2-(iw/zoom/2)':y='ih/2-(ih/zoom/2)':s={w}x{h}:fps={fps},format=yuv420p",
            w = width,
            h = height,
            gain = factor - 1.0,
            zf = zoom_frames,
            factor = factor,
            frames = total_frames,
            fps = fps,
        );

        let args = vec![
            "-loop".to_string(),
            "1".to_string(),
            "-i".to_string(),
            path_arg(image)?,
            "-vf".to_string(),
            filter,
            "-t".to_string(),
            format!("{:.3}", duration),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            "veryfast".to_string(),
            "-y".to_string(),
            path_arg(output)?,
        ];

        run_ffmpeg(&args).await
    }

    /// Plain still clip: fit-scale with letterbox padding
    async fn render_still(&self, image: &Path, duration: f64, output: &Path) -> Result<()> {
        let width = self.frame_width();
        let height = self.config.target_height;

        let filter = format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,\
             pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,format=yuv420p",
            w = width,
            h = height,
        );

        let args = vec![
            "-loop".to_string(),
            "1".to_string(),
            "-i".to_string(),
            path_arg(image)?,
            "-vf".to_string(),
            filter,
            "-t".to_string(),
            format!("{:.3}", duration),
            "-r".to_string(),
            self.config.fps.to_string(),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            "veryfast".to_string(),
            "-y".to_string(),
            path_arg(output)?,
        ];

        run_ffmpeg(&args).await
    }

    /// Input and filter_complex arguments joining the clips with the
    /// configured transition, mapping [vout] plus the narration track
    fn concat_args(
        &self,
        clips: &[PathBuf],
        clip_duration: f64,
        transition: Transition,
        audio_path: &Path,
    ) -> Result<Vec<String>> {
        let mut args = Vec::new();
        for clip in clips {
            args.push("-i".to_string());
            args.push(path_arg(clip)?);
        }
        args.push("-i".to_string());
        args.push(path_arg(audio_path)?);

        let filter = build_transition_filter(
            clips.len(),
            clip_duration,
            transition,
            self.config.transition_duration,
        );
        args.push("-filter_complex".to_string());
        args.push(filter);
        args.push("-map".to_string());
        args.push("[vout]".to_string());
        args.push("-map".to_string());
        args.push(format!("{}:a", clips.len()));

        Ok(args)
    }

    /// Final encode with quality settings; retried once with the fast
    /// fallback profile when the encoder fails
    async fn encode_final(
        &self,
        clips: &[PathBuf],
        clip_duration: f64,
        audio_path: &Path,
        output_path: &Path,
    ) -> Result<()> {
        let base = self.concat_args(clips, clip_duration, self.config.transition, audio_path)?;

        let mut quality = base.clone();
        quality.extend(vec![
            "-c:v".to_string(),
            "libx264".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-r".to_string(),
            self.config.fps.to_string(),
            "-b:v".to_string(),
            self.config.bitrate.clone(),
            "-preset".to_string(),
            self.config.preset.clone(),
            "-crf".to_string(),
            self.config.crf.to_string(),
            "-threads".to_string(),
            self.config.threads.to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
            "-shortest".to_string(),
            "-y".to_string(),
            path_arg(output_path)?,
        ]);

        match run_ffmpeg(&quality).await {
            Ok(()) => {
                info!("✅ Video written: {}", output_path.display());
                return Ok(());
            }
            Err(e) => {
                warn!("High quality render failed, trying faster settings: {}", e);
            }
        }

        let mut fast = base;
        fast.extend(vec![
            "-c:v".to_string(),
            "libx264".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-r".to_string(),
            self.config.fps.to_string(),
            "-preset".to_string(),
            self.config.fallback_preset.clone(),
            "-crf".to_string(),
            self.config.fallback_crf.to_string(),
            "-threads".to_string(),
            self.config.fallback_threads.to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-shortest".to_string(),
            "-y".to_string(),
            path_arg(output_path)?,
        ]);

        run_ffmpeg(&fast).await?;
        info!("✅ Video written (fallback encode): {}", output_path.display());
        Ok(())
    }
}

/// Build the filter_complex joining `n` equal-length clips.
///
/// Transitions chain pairwise xfades; each xfade starts one transition
/// length before the end of the accumulated head. None concatenates.
fn build_transition_filter(
    n: usize,
    clip_duration: f64,
    transition: Transition,
    transition_duration: f64,
) -> String {
    if n == 1 {
        return "[0:v]copy[vout]".to_string();
    }

    if transition == Transition::None {
        let inputs: String = (0..n).map(|i| format!("[{}:v]", i)).collect();
        return format!("{}concat=n={}:v=1:a=0[vout]", inputs, n);
    }

    let kind = match transition {
        Transition::Crossfade => "fade",
        Transition::Slide => "slideleft",
        Transition::FadeToBlack => "fadeblack",
        Transition::None => unreachable!(),
    };

    let mut filter = String::new();
    let mut head_duration = clip_duration;

    for i in 1..n {
        // xfade rejects negative offsets; very short clips degrade to
        // back-to-back transitions
        let offset = (head_duration - transition_duration).max(0.0);
        let src = if i == 1 {
            "[0:v]".to_string()
        } else {
            format!("[x{}]", i - 1)
        };
        let dst = if i == n - 1 {
            "[vout]".to_string()
        } else {
            format!("[x{}]", i)
        };

        filter.push_str(&format!(
            "{src}[{i}:v]xfade=transition={kind}:duration={td:.3}:offset={offset:.3}{dst};",
            src = src,
            i = i,
            kind = kind,
            td = transition_duration,
            offset = offset,
            dst = dst,
        ));

        // Each xfade overlaps the next clip by the transition length
        head_duration = offset + clip_duration;
    }

    filter.pop(); // trailing semicolon
    filter
}

fn path_arg(path: &Path) -> Result<String> {
    path.to_str()
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow!("Non-UTF8 path: {}", path.display()))
}

async fn run_ffmpeg(args: &[String]) -> Result<()> {
    debug!("ffmpeg {}", args.join(" "));

    let output = tokio::process::Command::new("ffmpeg")
        .args(args)
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let tail: String = stderr
            .lines()
            .rev()
            .take(5)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect::<Vec<_>>()
            .join("\n");
        return Err(anyhow!("ffmpeg failed: {}", tail));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn composer() -> VideoComposer {
        VideoComposer::new(crate::config::Config::default().video)
    }

    #[test]
    fn test_frame_width_is_even_16x9() {
        assert_eq!(composer().frame_width(), 1920);

        let mut config = crate::config::Config::default().video;
        config.target_height = 720;
        assert_eq!(VideoComposer::new(config).frame_width(), 1280);
    }

    #[test]
    fn test_seconds_per_image_stretches_to_audio() {
        let composer = composer();
        // 60s narration over 5 images needs 12s each, above the 5s floor
        assert_eq!(composer.seconds_per_image(60.0, 5), 12.0);
        // short narration falls back to the floor
        assert_eq!(composer.seconds_per_image(6.0, 5), 5.0);
        assert_eq!(composer.seconds_per_image(10.0, 0), 5.0);
    }

    #[test]
    fn test_output_path_format() {
        let path = VideoComposer::output_video_path(Path::new("/out"), "Health & Fitness");
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("AI_Video_Health_&_Fitness_"));
        assert!(name.ends_with(".mp4"));
        assert!(!name.contains(' '));
    }

    #[test]
    fn test_transition_filter_single_clip() {
        let filter = build_transition_filter(1, 5.0, Transition::Crossfade, 0.5);
        assert_eq!(filter, "[0:v]copy[vout]");
    }

    #[test]
    fn test_transition_filter_none_concats() {
        let filter = build_transition_filter(3, 5.0, Transition::None, 0.5);
        assert_eq!(filter, "[0:v][1:v][2:v]concat=n=3:v=1:a=0[vout]");
    }

    #[test]
    fn test_transition_filter_chains_xfades() {
        let filter = build_transition_filter(3, 5.0, Transition::Crossfade, 0.5);
        assert_eq!(
            filter,
            "[0:v][1:v]xfade=transition=fade:duration=0.500:offset=4.500[x1];\
             [x1][2:v]xfade=transition=fade:duration=0.500:offset=9.000[vout]"
        );
    }

    #[test]
    fn test_transition_filter_offset_never_negative() {
        let filter = build_transition_filter(3, 0.2, Transition::Crossfade, 0.5);
        assert!(!filter.contains("offset=-"));
        assert!(filter.contains("offset=0.000"));
    }

    #[test]
    fn test_transition_filter_kinds() {
        let slide = build_transition_filter(2, 5.0, Transition::Slide, 0.5);
        assert!(slide.contains("transition=slideleft"));

        let fade_black = build_transition_filter(2, 5.0, Transition::FadeToBlack, 0.5);
        assert!(fade_black.contains("transition=fadeblack"));
    }
}
