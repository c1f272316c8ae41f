//! Speech synthesis engines

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use castline_core::http::get_bytes;
use castline_core::retry_with_backoff;
use castline_pipeline::{BoxError, Synthesizer};

const GOOGLE_TTS_URL: &str = "https://translate.google.com/translate_tts";

/// Longest text the Google endpoint accepts per request
const MAX_CHUNK_CHARS: usize = 100;

/// Google Translate text-to-speech, producing MP3.
pub struct GoogleTts {
    client: reqwest::Client,
    language: String,
    max_retries: u32,
}

impl GoogleTts {
    pub fn new(client: reqwest::Client, language: impl Into<String>, max_retries: u32) -> Self {
        Self {
            client,
            language: language.into(),
            max_retries,
        }
    }

    fn chunk_url(&self, chunk: &str, idx: usize, total: usize) -> Result<reqwest::Url, BoxError> {
        let idx = idx.to_string();
        let total = total.to_string();
        let len = chunk.chars().count().to_string();
        let url = reqwest::Url::parse_with_params(
            GOOGLE_TTS_URL,
            &[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", self.language.as_str()),
                ("q", chunk),
                ("idx", idx.as_str()),
                ("total", total.as_str()),
                ("textlen", len.as_str()),
            ],
        )?;
        Ok(url)
    }
}

#[async_trait]
impl Synthesizer for GoogleTts {
    async fn synthesize(&self, text: &str, output: &Path) -> Result<(), BoxError> {
        let chunks = split_chunks(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err("nothing to synthesize".into());
        }

        let mut audio = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            let url = self.chunk_url(chunk, idx, chunks.len())?;
            let bytes = retry_with_backoff("tts", self.max_retries, || {
                get_bytes(&self.client, url.as_str(), "audio/mpeg")
            })
            .await?;
            if bytes.is_empty() {
                return Err(format!("empty audio for chunk {}/{}", idx + 1, chunks.len()).into());
            }
            audio.extend_from_slice(&bytes);
        }

        write_atomic(output, &audio).await?;
        log::debug!(
            "synthesized {} chunks ({} bytes) to {}",
            chunks.len(),
            audio.len(),
            output.display()
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "gtts"
    }
}

/// Writes the text itself; no audio. For offline use.
#[derive(Debug, Default, Clone, Copy)]
pub struct TranscriptWriter;

#[async_trait]
impl Synthesizer for TranscriptWriter {
    async fn synthesize(&self, text: &str, output: &Path) -> Result<(), BoxError> {
        write_atomic(output, text.as_bytes()).await?;
        Ok(())
    }

    fn file_extension(&self) -> &'static str {
        "txt"
    }

    fn name(&self) -> &'static str {
        "transcript"
    }
}

/// Engine by configured name. Unknown names fall back to [`TranscriptWriter`].
pub fn synthesizer_by_name(
    name: &str,
    client: reqwest::Client,
    language: &str,
    max_retries: u32,
) -> Arc<dyn Synthesizer> {
    match name.trim().to_ascii_lowercase().as_str() {
        "gtts" | "google" => Arc::new(GoogleTts::new(client, language, max_retries)),
        "transcript" | "noop" => Arc::new(TranscriptWriter),
        other => {
            log::warn!("unknown TTS engine '{other}', writing transcripts instead");
            Arc::new(TranscriptWriter)
        }
    }
}

/// Split text into chunks of at most `max` chars, breaking on whitespace.
/// Words longer than `max` are split on char boundaries.
pub fn split_chunks(text: &str, max: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        let needed = if current.is_empty() { word_len } else { current_len + 1 + word_len };
        if needed <= max {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
            current_len = needed;
            continue;
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if word_len <= max {
            current.push_str(word);
            current_len = word_len;
        } else {
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max) {
                chunks.push(piece.iter().collect());
            }
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Write via a sibling `.part` file and rename, so readers never see a
/// truncated artifact.
async fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let tmp = part_path(path);
    if let Err(e) = tokio::fs::write(&tmp, data).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}
