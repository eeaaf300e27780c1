//! FFmpeg clip encoder.
//!
//! Turns a crop plan and an optional cue track into one vertical clip file.
//! Per-frame crop positions are fed to ffmpeg through a sendcmd script;
//! captions are rendered from a generated ASS subtitle file.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info};

use oshorts_captions::{CaptionCue, CueTrack, StylePreset, TextCase};
use oshorts_models::HexColor;
use oshorts_tracker::{CropPlacement, CropRect};
use oshorts_worker::{ClipEncoder, EncodeRequest, WorkerError, WorkerResult};

/// Output canvas for every clip.
const OUT_WIDTH: u32 = 1080;
const OUT_HEIGHT: u32 = 1920;

/// Encoder backed by the ffmpeg binary.
pub struct FfmpegEncoder;

impl FfmpegEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
struct SourceInfo {
    width: u32,
    height: u32,
    fps: f64,
}

#[derive(Deserialize)]
struct FfprobeOutput {
    streams: Vec<FfprobeStream>,
}

#[derive(Deserialize)]
struct FfprobeStream {
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
}

async fn probe_source(path: &Path) -> WorkerResult<SourceInfo> {
    which::which("ffprobe")
        .map_err(|_| WorkerError::config_error("ffprobe binary not found on PATH"))?;

    let output = Command::new("ffprobe")
        .args(["-v", "quiet", "-print_format", "json", "-show_streams"])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(WorkerError::EncodingFailed(format!(
            "ffprobe failed: {}",
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)
        .map_err(|e| WorkerError::EncodingFailed(format!("Bad ffprobe output: {}", e)))?;

    let stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| WorkerError::EncodingFailed("No video stream found".into()))?;

    let fps = stream
        .avg_frame_rate
        .as_deref()
        .or(stream.r_frame_rate.as_deref())
        .and_then(parse_frame_rate)
        .unwrap_or(30.0);

    Ok(SourceInfo {
        width: stream.width.unwrap_or(0),
        height: stream.height.unwrap_or(0),
        fps,
    })
}

/// Parse a frame rate string such as "30/1" or "29.97".
fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 {
            return Some(num / den);
        }
    }
    s.parse().ok()
}

/// Largest 9:16 rectangle fitting the source, centered.
fn centered_crop(width: u32, height: u32) -> CropRect {
    let target = f64::from(height) * 9.0 / 16.0;
    let crop_w = target.min(f64::from(width)) as i32;
    let crop_h = if target <= f64::from(width) {
        height as i32
    } else {
        (f64::from(width) * 16.0 / 9.0) as i32
    };
    CropRect::new(
        (width as i32 - crop_w) / 2,
        (height as i32 - crop_h) / 2,
        crop_w,
        crop_h,
    )
}

/// Smallest rectangle covering every planned region. `None` for an
/// empty plan.
fn plan_union(plan: &[CropPlacement]) -> Option<CropRect> {
    let mut rects = plan.iter().map(CropPlacement::rect);
    let first = rects.next()?;
    let (mut x1, mut y1) = (first.x, first.y);
    let (mut x2, mut y2) = (first.x + first.width, first.y + first.height);
    for r in rects {
        x1 = x1.min(r.x);
        y1 = y1.min(r.y);
        x2 = x2.max(r.x + r.width);
        y2 = y2.max(r.y + r.height);
    }
    Some(CropRect::new(x1, y1, x2 - x1, y2 - y1))
}

/// Write the sendcmd script driving per-frame crop positions.
async fn write_crop_script(
    path: &Path,
    plan: &[CropPlacement],
    fps: f64,
) -> WorkerResult<()> {
    let mut script = String::new();
    let mut last: Option<(i32, i32)> = None;

    for (i, placement) in plan.iter().enumerate() {
        let rect = placement.rect();
        // Only emit commands when the position actually moves.
        if last == Some((rect.x, rect.y)) {
            continue;
        }
        last = Some((rect.x, rect.y));
        let t = i as f64 / fps;
        script.push_str(&format!(
            "{t:.4} crop x {x}, crop y {y};\n",
            x = rect.x,
            y = rect.y,
        ));
    }

    tokio::fs::write(path, script).await?;
    Ok(())
}

fn ass_timestamp(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let h = (seconds / 3600.0) as u64;
    let m = ((seconds % 3600.0) / 60.0) as u64;
    let s = seconds % 60.0;
    format!("{}:{:02}:{:05.2}", h, m, s)
}

/// ASS colors are &HAABBGGRR with 00 meaning opaque.
fn ass_color(color: HexColor, alpha: u8) -> String {
    format!(
        "&H{:02X}{:02X}{:02X}{:02X}",
        255 - alpha,
        color.b,
        color.g,
        color.r
    )
}

fn apply_case(text: &str, case: TextCase) -> String {
    match case {
        TextCase::AsIs => text.to_string(),
        TextCase::Upper => text.to_uppercase(),
        TextCase::Lower => text.to_lowercase(),
    }
}

fn escape_ass(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('{', "(")
        .replace('}', ")")
        .replace('\n', " ")
}

fn dialogue_text(cue: &CaptionCue, preset: &StylePreset) -> String {
    if cue.words.is_empty() {
        return escape_ass(&apply_case(&cue.text, preset.case));
    }

    // Karaoke: one \k block per word, durations in centiseconds. Each
    // word's block spans until the next word starts so gaps stay lit.
    let mut text = String::new();
    for (i, word) in cue.words.iter().enumerate() {
        let until = cue
            .words
            .get(i + 1)
            .map(|next| next.start)
            .unwrap_or(word.end);
        let centis = ((until - word.start) * 100.0).round().max(1.0) as u64;
        if i > 0 {
            text.push(' ');
        }
        text.push_str(&format!(
            "{{\\k{}}}{}",
            centis,
            escape_ass(&apply_case(&word.text, preset.case))
        ));
    }
    text
}

/// Render the cue track to an ASS subtitle file.
async fn write_subtitles(path: &Path, track: &CueTrack) -> WorkerResult<()> {
    let preset = &track.style;
    let font_size = (64.0 * preset.font_scale).round() as u32;
    let primary = ass_color(preset.color, 255);
    let outline = ass_color(preset.outline_color.unwrap_or(HexColor::BLACK), 255);
    let karaoke = preset
        .highlight_color
        .map(|c| ass_color(c, 255))
        .unwrap_or_else(|| primary.clone());
    let (back, border_style) = match preset.background {
        Some((color, alpha)) => (ass_color(color, alpha), 3),
        None => ("&H00000000".to_string(), 1),
    };
    // ASS encodes bold as -1.
    let bold = if matches!(preset.weight, oshorts_captions::FontWeight::Bold) {
        -1
    } else {
        0
    };

    let mut ass = format!(
        "[Script Info]\n\
         ScriptType: v4.00+\n\
         PlayResX: {OUT_WIDTH}\n\
         PlayResY: {OUT_HEIGHT}\n\
         WrapStyle: 0\n\n\
         [V4+ Styles]\n\
         Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV\n\
         Style: Caption,Arial,{font_size},{karaoke},{primary},{outline},{back},{bold},{border_style},{outline_w},0,2,60,60,220\n\n\
         [Events]\n\
         Format: Layer, Start, End, Style, Text\n",
        outline_w = preset.outline_thickness,
    );

    for cue in &track.cues {
        ass.push_str(&format!(
            "Dialogue: 0,{},{},Caption,{}\n",
            ass_timestamp(cue.start),
            ass_timestamp(cue.end),
            dialogue_text(cue, preset)
        ));
    }

    tokio::fs::write(path, ass).await?;
    Ok(())
}

#[async_trait]
impl ClipEncoder for FfmpegEncoder {
    async fn encode(&self, request: EncodeRequest<'_>) -> WorkerResult<()> {
        which::which("ffmpeg")
            .map_err(|_| WorkerError::config_error("ffmpeg binary not found on PATH"))?;

        let info = probe_source(request.source).await?;
        let work_dir = request
            .output
            .parent()
            .ok_or_else(|| WorkerError::EncodingFailed("Output path has no parent".into()))?;
        tokio::fs::create_dir_all(work_dir).await?;

        let letterboxed = request.crop_plan.iter().any(CropPlacement::is_letterboxed);

        let mut filter = if letterboxed {
            // Crop to the union of every planned region so cropped frames
            // of a mixed plan stay in view, then fit onto the canvas with
            // vertical bars.
            let region = plan_union(request.crop_plan)
                .unwrap_or_else(|| CropRect::new(0, 0, info.width as i32, info.height as i32));
            format!(
                "crop={}:{}:{}:{},scale={OUT_WIDTH}:{OUT_HEIGHT}:force_original_aspect_ratio=decrease,pad={OUT_WIDTH}:{OUT_HEIGHT}:(ow-iw)/2:(oh-ih)/2,setsar=1",
                region.width, region.height, region.x, region.y
            )
        } else if request.crop_plan.is_empty() {
            // No detections at all: centered static crop.
            let rect = centered_crop(info.width, info.height);
            format!(
                "crop={}:{}:{}:{},scale={OUT_WIDTH}:{OUT_HEIGHT},setsar=1",
                rect.width, rect.height, rect.x, rect.y
            )
        } else {
            let first = request.crop_plan[0].rect();
            let script = request.output.with_extension("cmd");
            write_crop_script(&script, request.crop_plan, info.fps).await?;
            format!(
                "sendcmd=f='{}',crop={}:{}:{}:{},scale={OUT_WIDTH}:{OUT_HEIGHT},setsar=1",
                script.to_string_lossy(),
                first.width,
                first.height,
                first.x,
                first.y
            )
        };

        if let Some(track) = request.captions {
            let subtitles = request.output.with_extension("ass");
            write_subtitles(&subtitles, track).await?;
            filter.push_str(&format!(",ass='{}'", subtitles.to_string_lossy()));
        }

        let duration = (request.end - request.start).max(0.1);
        let args = [
            "-y".to_string(),
            "-v".to_string(),
            "error".to_string(),
            "-ss".to_string(),
            format!("{:.3}", request.start),
            "-t".to_string(),
            format!("{:.3}", duration),
            "-i".to_string(),
            request.source.to_string_lossy().into_owned(),
            "-vf".to_string(),
            filter,
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            "veryfast".to_string(),
            "-crf".to_string(),
            "20".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            "128k".to_string(),
            request.output.to_string_lossy().into_owned(),
        ];

        debug!("Running ffmpeg {}", args.join(" "));
        let result = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(WorkerError::EncodingFailed(format!(
                "ffmpeg failed: {}",
                stderr.lines().last().unwrap_or("unknown error")
            )));
        }

        info!(output = %request.output.display(), "Encoded clip");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oshorts_captions::build_cues;
    use oshorts_models::{
        CaptionSettings, CaptionStyle, Transcript, TranscriptSegment, Word,
    };

    #[test]
    fn test_ass_timestamp() {
        assert_eq!(ass_timestamp(0.0), "0:00:00.00");
        assert_eq!(ass_timestamp(61.5), "0:01:01.50");
        assert_eq!(ass_timestamp(3723.25), "1:02:03.25");
    }

    #[test]
    fn test_ass_color_is_bgr() {
        assert_eq!(ass_color(HexColor::new(0x11, 0x22, 0x33), 255), "&H00332211");
        // Semi-transparent background
        assert_eq!(ass_color(HexColor::BLACK, 180), "&H4B000000");
    }

    #[test]
    fn test_centered_crop_landscape() {
        let rect = centered_crop(1920, 1080);
        assert_eq!(rect.height, 1080);
        assert_eq!(rect.width, 607);
        assert_eq!(rect.x, (1920 - 607) / 2);
        assert_eq!(rect.y, 0);
    }

    #[test]
    fn test_karaoke_dialogue_has_k_tags() {
        let transcript = Transcript {
            segments: vec![TranscriptSegment {
                text: "hello world".into(),
                start: 0.0,
                end: 1.5,
                words: vec![
                    Word { word: "hello".into(), start: 0.0, end: 0.6 },
                    Word { word: "world".into(), start: 0.8, end: 1.5 },
                ],
            }],
        };
        let settings = CaptionSettings {
            include_captions: true,
            style: CaptionStyle::Karaoke,
            color: None,
            outline_color: None,
        };
        let track = build_cues(&transcript, &settings).unwrap();
        let text = dialogue_text(&track.cues[0], &track.style);

        // First word holds until the second begins (0.8s = 80cs).
        assert!(text.contains("{\\k80}hello"));
        assert!(text.contains("{\\k70}world"));
    }

    #[test]
    fn test_dialogue_applies_case() {
        let cue = CaptionCue {
            start: 0.0,
            end: 1.0,
            text: "Stay Loud".into(),
            words: vec![],
        };
        let preset = StylePreset::for_style(CaptionStyle::Bold).unwrap();
        assert_eq!(dialogue_text(&cue, &preset), "STAY LOUD");
    }

    #[test]
    fn test_plan_union_spans_all_regions() {
        // A mixed plan: one wide letterboxed region and one 9:16 crop.
        let plan = vec![
            CropPlacement::Letterboxed(CropRect::new(20, 100, 1880, 400)),
            CropPlacement::Cropped(CropRect::new(600, 0, 607, 1080)),
        ];
        let region = plan_union(&plan).unwrap();

        assert_eq!(region.x, 20);
        assert_eq!(region.y, 0);
        assert_eq!(region.x + region.width, 1900);
        assert_eq!(region.y + region.height, 1080);

        assert!(plan_union(&[]).is_none());
    }

    #[tokio::test]
    async fn test_crop_script_dedupes_static_positions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.cmd");

        let plan = vec![
            CropPlacement::Cropped(CropRect::new(100, 0, 600, 1066)),
            CropPlacement::Cropped(CropRect::new(100, 0, 600, 1066)),
            CropPlacement::Cropped(CropRect::new(140, 0, 600, 1066)),
        ];
        write_crop_script(&path, &plan, 30.0).await.unwrap();

        let script = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = script.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("0.0000 crop x 100"));
        assert!(lines[1].starts_with("0.0667 crop x 140"));
    }
}
