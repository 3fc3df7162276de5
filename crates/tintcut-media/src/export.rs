//! Export options and encoder command construction.
//!
//! Adjustments, the committed trim window and the output options translate
//! deterministically into ffmpeg tokens. Trim is an input seek (`-ss` before
//! `-i`) plus a `-t` duration, never a trim filter.

use crate::media::MediaFile;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tintcut_core::{Result, TintcutError, TrimWindow};
use tintcut_effects::{AdjustmentParameters, FilterGraph};
use tracing::debug;
use uuid::Uuid;

/// Staged name of the replacement audio input.
pub const REPLACEMENT_AUDIO_NAME: &str = "temp_audio";

// ── Output types ────────────────────────────────────────────────

/// Output container or image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Mp4,
    Webm,
    Png,
    Jpg,
    Webp,
}

impl FileType {
    pub const VIDEO: [Self; 2] = [Self::Mp4, Self::Webm];
    pub const IMAGE: [Self; 3] = [Self::Png, Self::Jpg, Self::Webp];

    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Webp => "webp",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Mp4 => "video/mp4",
            Self::Webm => "video/webm",
            Self::Png => "image/png",
            Self::Jpg => "image/jpeg",
            Self::Webp => "image/webp",
        }
    }

    /// FFmpeg video encoder, for video outputs.
    pub fn ffmpeg_encoder(self) -> Option<&'static str> {
        match self {
            Self::Mp4 => Some("libx264"),
            Self::Webm => Some("libvpx"),
            Self::Png | Self::Jpg | Self::Webp => None,
        }
    }

    pub fn is_video(self) -> bool {
        Self::VIDEO.contains(&self)
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for FileType {
    type Err = TintcutError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp4" => Ok(Self::Mp4),
            "webm" => Ok(Self::Webm),
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpg),
            "webp" => Ok(Self::Webp),
            other => Err(TintcutError::InvalidParameter(format!(
                "unknown output type {other:?}"
            ))),
        }
    }
}

/// Which audio ends up in a video export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioSource {
    /// Keep the clip's own audio.
    #[default]
    Default,
    /// Replace it with an imported audio file.
    Replacement(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Width,
    Height,
}

// ── Options ─────────────────────────────────────────────────────

/// User-facing export settings, seeded from the selected media.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportOptions {
    pub file_name: String,
    pub file_type: FileType,
    width: u32,
    height: u32,
    source_width: u32,
    source_height: u32,
    use_source_dimensions: bool,
    pub audio: AudioSource,
}

impl ExportOptions {
    /// Defaults for a media file: its stem, its native size, mp4 or png.
    pub fn for_media(media: &MediaFile) -> Self {
        let (w, h) = media.dimensions().unwrap_or((0, 0));
        Self {
            file_name: media.stem().to_string(),
            file_type: if media.is_image() {
                FileType::Png
            } else {
                FileType::Mp4
            },
            width: w,
            height: h,
            source_width: w,
            source_height: h,
            use_source_dimensions: true,
            audio: AudioSource::Default,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn source_dimensions(&self) -> (u32, u32) {
        (self.source_width, self.source_height)
    }

    pub fn uses_source_dimensions(&self) -> bool {
        self.use_source_dimensions
    }

    /// Toggle "use original size". Turning it on restores the source size.
    pub fn set_use_source_dimensions(&mut self, on: bool) {
        self.use_source_dimensions = on;
        if on {
            self.width = self.source_width;
            self.height = self.source_height;
        }
    }

    /// Typed dimension text. Non-numeric and zero values are ignored; the
    /// rest is rounded. Ignored while the source size is in use.
    pub fn set_dimension_input(&mut self, axis: Axis, text: &str) -> bool {
        if self.use_source_dimensions {
            return false;
        }
        let Ok(value) = text.trim().parse::<f64>() else {
            debug!(input = text, "Ignoring non-numeric dimension");
            return false;
        };
        let rounded = value.round();
        if !rounded.is_finite() || rounded < 1.0 || rounded > f64::from(u32::MAX - 1) {
            return false;
        }
        let slot = match axis {
            Axis::Width => &mut self.width,
            Axis::Height => &mut self.height,
        };
        *slot = rounded as u32;
        true
    }

    /// Round odd dimensions up to the next even number, as the encoders need.
    pub fn commit_dimensions(&mut self) {
        for slot in [&mut self.width, &mut self.height] {
            if *slot % 2 == 1 {
                *slot += 1;
            }
        }
    }

    /// Output larger than the source loses quality.
    pub fn exceeds_source(&self, axis: Axis) -> bool {
        match axis {
            Axis::Width => self.width > self.source_width,
            Axis::Height => self.height > self.source_height,
        }
    }

    /// Whether a `scale` stage is needed.
    pub fn needs_scale(&self) -> bool {
        !self.use_source_dimensions
            && (self.width, self.height) != (self.source_width, self.source_height)
    }

    /// Fall back to the original audio when the replacement is gone.
    pub fn validate_audio(&mut self, available: &[Uuid]) {
        if let AudioSource::Replacement(id) = self.audio {
            if !available.contains(&id) {
                debug!(%id, "Replacement audio removed, using original audio");
                self.audio = AudioSource::Default;
            }
        }
    }
}

// ── Commands ────────────────────────────────────────────────────

/// A file the encoder needs before running.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedInput {
    pub name: String,
    pub source: crate::handle::SourceHandle,
}

/// A fully resolved encoder job.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeCommand {
    pub args: Vec<String>,
    pub inputs: Vec<StagedInput>,
    /// Name the encoder writes to.
    pub output_name: String,
    pub mime_type: &'static str,
    /// Name the artifact is offered under.
    pub download_name: String,
    pub trim: Option<TrimWindow>,
}

impl EncodeCommand {
    /// The comma-separated filter chain passed to `-filter_complex`.
    pub fn filters(&self) -> Option<&str> {
        let i = self.args.iter().position(|a| a == "-filter_complex")?;
        self.args.get(i + 1).map(String::as_str)
    }

    /// Shell-style rendering, for display only.
    pub fn to_command_line(&self) -> String {
        std::iter::once("ffmpeg")
            .chain(self.args.iter().map(String::as_str))
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn shell_quote(token: &str) -> String {
    let safe = !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_.,:=/+@%".contains(c));
    if safe {
        token.to_string()
    } else {
        format!("'{}'", token.replace('\'', r"'\''"))
    }
}

fn filter_chain(adjustments: &AdjustmentParameters, options: &ExportOptions) -> String {
    let mut stages = FilterGraph::from_params(adjustments).encoder_stages();
    if options.needs_scale() {
        let (w, h) = options.dimensions();
        stages.push(format!("scale={w}x{h}"));
    }
    stages.join(",")
}

fn output_names(options: &ExportOptions) -> Result<(String, String)> {
    if options.file_name.trim().is_empty() {
        return Err(TintcutError::InvalidParameter("file name is empty".into()));
    }
    let ext = options.file_type.extension();
    Ok((
        format!("{}_temp.{ext}", options.file_name),
        format!("{}.{ext}", options.file_name),
    ))
}

/// Build the export job for a video.
pub fn build_export_job(
    media: &MediaFile,
    adjustments: &AdjustmentParameters,
    trim: TrimWindow,
    options: &ExportOptions,
    audio_replacement: Option<&MediaFile>,
) -> Result<EncodeCommand> {
    if !media.is_video() {
        return Err(TintcutError::InvalidParameter(format!(
            "{} is not a video",
            media.name
        )));
    }
    let encoder = options.file_type.ffmpeg_encoder().ok_or_else(|| {
        TintcutError::InvalidParameter(format!("{} is not a video format", options.file_type))
    })?;
    let duration = media.duration_seconds.unwrap_or(f64::INFINITY);
    if !(trim.start >= 0.0 && trim.start < trim.end && trim.end <= duration) {
        return Err(TintcutError::InvalidTrim {
            start: trim.start,
            end: trim.end,
            duration,
        });
    }
    let (w, h) = options.dimensions();
    if options.needs_scale() && (w % 2 == 1 || h % 2 == 1) {
        return Err(TintcutError::InvalidParameter(format!(
            "output size {w}x{h} must be even"
        )));
    }
    let (output_name, download_name) = output_names(options)?;

    let mut inputs = vec![StagedInput {
        name: media.name.clone(),
        source: media.source,
    }];
    let mut args: Vec<String> = vec![
        "-ss".into(),
        trim.start.to_string(),
        "-i".into(),
        media.name.clone(),
    ];

    if let Some(audio) = audio_replacement {
        // Replace, not mix: video from input 0, audio from input 1.
        args.extend(
            ["-i", REPLACEMENT_AUDIO_NAME, "-map", "0:v:0", "-map", "1:a:0"].map(String::from),
        );
        inputs.push(StagedInput {
            name: REPLACEMENT_AUDIO_NAME.to_string(),
            source: audio.source,
        });
    }

    args.extend([
        "-filter_complex".into(),
        filter_chain(adjustments, options),
        "-t".into(),
        trim.length().to_string(),
        "-c:v".into(),
        encoder.into(),
        output_name.clone(),
    ]);

    debug!(media = %media.name, ?args, "Built export command");
    Ok(EncodeCommand {
        args,
        inputs,
        output_name,
        mime_type: options.file_type.mime_type(),
        download_name,
        trim: Some(trim),
    })
}

/// Build the export job for a still: one filtered frame.
pub fn build_image_export_job(
    media: &MediaFile,
    adjustments: &AdjustmentParameters,
    options: &ExportOptions,
) -> Result<EncodeCommand> {
    if !media.is_image() {
        return Err(TintcutError::InvalidParameter(format!(
            "{} is not an image",
            media.name
        )));
    }
    if options.file_type.is_video() {
        return Err(TintcutError::InvalidParameter(format!(
            "{} is not an image format",
            options.file_type
        )));
    }
    let (output_name, download_name) = output_names(options)?;
    let args = vec![
        "-i".into(),
        media.name.clone(),
        "-filter_complex".into(),
        filter_chain(adjustments, options),
        "-frames:v".into(),
        "1".into(),
        output_name.clone(),
    ];
    Ok(EncodeCommand {
        args,
        inputs: vec![StagedInput {
            name: media.name.clone(),
            source: media.source,
        }],
        output_name,
        mime_type: options.file_type.mime_type(),
        download_name,
        trim: None,
    })
}
