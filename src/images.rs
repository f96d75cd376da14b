use anyhow::{anyhow, Result};
use regex::Regex;
use scraper::{Html, Selector};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ImageConfig;

/// Common words excluded from keyword extraction
const STOP_WORDS: &[&str] = &[
    "this", "that", "with", "have", "they", "what", "your", "will", "when", "like", "just",
    "about", "some", "from", "were", "them",
];

const SEARCH_URL: &str = "https://www.google.com/search";

/// Collects visuals for a script: image-search scrape plus fallback synthesis
pub struct ImageFetcher {
    config: ImageConfig,
    client: reqwest::Client,
}

/// Extract search keywords from script text.
///
/// Words of four or more letters, lowercased, stop-word filtered, first
/// occurrence wins, capped at ten.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let word_re = Regex::new(r"\b\w{4,}\b").expect("keyword regex");

    let mut keywords = Vec::new();
    for m in word_re.find_iter(&text.to_lowercase()) {
        let word = m.as_str().to_string();
        if STOP_WORDS.contains(&word.as_str()) {
            continue;
        }
        if !keywords.contains(&word) {
            keywords.push(word);
        }
        if keywords.len() == 10 {
            break;
        }
    }

    keywords
}

/// Pull candidate image URLs out of a search results page.
///
/// The first `<img>` is the site logo and is skipped; only absolute http(s)
/// sources count.
fn parse_image_urls(html: &str, limit: usize) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("img").expect("img selector");

    document
        .select(&selector)
        .skip(1)
        .filter_map(|img| img.value().attr("src"))
        .filter(|src| {
            Url::parse(src)
                .map(|u| matches!(u.scheme(), "http" | "https"))
                .unwrap_or(false)
        })
        .take(limit)
        .map(|src| src.to_string())
        .collect()
}

/// Make a search term safe for use in a file name
fn term_file_stem(term: &str) -> String {
    term.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

/// Strip characters that break ffmpeg drawtext quoting
fn drawtext_safe(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '&' || *c == '-')
        .collect::<String>()
        .trim()
        .to_string()
}

impl ImageFetcher {
    pub fn new(config: ImageConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.search_timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { config, client }
    }

    /// Collect images for the script into `output_dir`.
    ///
    /// Scrapes the top keywords; a term that yields nothing gets one
    /// synthesized fallback card for the whole run. Fails only when the
    /// directory ends up empty.
    pub async fn collect(
        &self,
        script: &str,
        content_type: &str,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>> {
        tokio::fs::create_dir_all(output_dir).await?;

        let mut terms = extract_keywords(script);
        if terms.is_empty() {
            terms = vec![content_type.to_lowercase()];
        }

        let search_terms: Vec<String> = terms
            .iter()
            .take(self.config.search_term_count)
            .map(|t| format!("{} high quality", t))
            .collect();

        let mut remaining = self.config.max_images;
        let mut fallback_created = false;

        for term in &search_terms {
            if remaining == 0 {
                break;
            }

            let want = self.config.per_term_limit.min(remaining);
            match self.download_for_term(term, want, output_dir).await {
                Ok(0) if !fallback_created => {
                    if let Err(e) = self.render_fallback(term, output_dir).await {
                        warn!("Fallback card for '{}' failed: {}", term, e);
                    } else {
                        fallback_created = true;
                        remaining = remaining.saturating_sub(1);
                    }
                }
                Ok(downloaded) => {
                    remaining = remaining.saturating_sub(downloaded);
                }
                Err(e) => {
                    warn!("Failed to download images for '{}': {}", term, e);
                    if !fallback_created && remaining > 0 {
                        if let Err(e) = self.render_fallback(term, output_dir).await {
                            warn!("Fallback card for '{}' failed: {}", term, e);
                        } else {
                            fallback_created = true;
                            remaining = remaining.saturating_sub(1);
                        }
                    }
                }
            }
        }

        let images = list_images(output_dir)?;
        if images.is_empty() {
            return Err(anyhow!("Failed to download any images for the video"));
        }

        info!("🖼️ Collected {} images", images.len());
        Ok(images)
    }

    /// Scrape the image search page for one term and download verified hits
    async fn download_for_term(
        &self,
        query: &str,
        count: usize,
        output_dir: &Path,
    ) -> Result<usize> {
        debug!("Searching images for: {}", query);

        let response = self
            .client
            .get(SEARCH_URL)
            .query(&[("q", query), ("tbm", "isch"), ("hl", "en"), ("tbs", "isz:l")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("Image search returned {}", response.status()));
        }

        let page = response.text().await?;
        // Html is parsed and dropped before any download await
        let urls = parse_image_urls(&page, count + 2);

        let stem = term_file_stem(query);
        let mut downloaded = 0;

        for url in urls {
            if downloaded >= count {
                break;
            }

            match self.download_one(&url).await {
                Ok(bytes) => {
                    let path = output_dir.join(format!("{}_{}.jpg", stem, downloaded));
                    tokio::fs::write(&path, &bytes).await?;
                    downloaded += 1;
                    debug!("Saved image: {}", path.display());
                }
                Err(e) => {
                    warn!("Error downloading image: {}", e);
                }
            }
        }

        Ok(downloaded)
    }

    /// Fetch one candidate and verify it decodes as a real image
    async fn download_one(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .timeout(Duration::from_secs(self.config.download_timeout_seconds))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("Image fetch returned {}", response.status()));
        }

        let bytes = response.bytes().await?.to_vec();
        image::load_from_memory(&bytes)
            .map_err(|e| anyhow!("Downloaded data is not a valid image: {}", e))?;

        Ok(bytes)
    }

    /// Render a dark-gradient title card for a term that produced no hits
    pub async fn render_fallback(&self, term: &str, output_dir: &Path) -> Result<PathBuf> {
        let title = drawtext_safe(&term.replace("high quality", ""));
        let caption = drawtext_safe(&self.config.fallback_caption);
        let path = output_dir.join(format!("fallback_{}.jpg", term_file_stem(term)));

        let source = format!(
            "gradients=s={}x{}:c0=0x1E1E28:c1=0x32323C:x0=0:y0=0:x1=0:y1={}",
            self.config.fallback_width, self.config.fallback_height, self.config.fallback_height
        );
        let filter = format!(
            "drawtext=text='{}':fontcolor=white:fontsize=72:x=(w-text_w)/2:y=(h-text_h)/2,\
             drawtext=text='{}':fontcolor=0xC8C8C8:fontsize=36:x=50:y=h-80",
            title, caption
        );

        let status = tokio::process::Command::new("ffmpeg")
            .args([
                "-f",
                "lavfi",
                "-i",
                &source,
                "-vf",
                &filter,
                "-frames:v",
                "1",
                "-y",
                path.to_str().ok_or_else(|| anyhow!("Non-UTF8 path"))?,
            ])
            .status()
            .await?;

        if !status.success() {
            return Err(anyhow!("ffmpeg failed to render fallback card"));
        }

        info!("🎨 Created fallback image: {}", path.display());
        Ok(path)
    }
}

/// List png/jpg/jpeg files in a directory, sorted by name
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut images: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map(|e| matches!(e.to_lowercase().as_str(), "png" | "jpg" | "jpeg"))
                .unwrap_or(false)
        })
        .collect();

    images.sort();
    Ok(images)
}
