//! ASS subtitle generation for burned-in word captions.

use std::fmt::Write as _;
use std::path::Path;

use reel_models::TranscriptWord;

use crate::error::MediaResult;

/// Format milliseconds as an ASS timestamp (`H:MM:SS.CC`).
pub fn format_ass_time(ms: u64) -> String {
    let total_secs = ms / 1000;
    let centis = (ms % 1000) / 10;
    format!(
        "{}:{:02}:{:02}.{:02}",
        total_secs / 3600,
        (total_secs % 3600) / 60,
        total_secs % 60,
        centis
    )
}

/// Render an ASS document showing one word at a time.
///
/// Word timings must already be relative to the clip start.
pub fn render_ass(words: &[TranscriptWord], play_res: (u32, u32)) -> String {
    let (width, height) = play_res;
    let mut doc = format!(
        "[Script Info]\n\
         ScriptType: v4.00+\n\
         WrapStyle: 0\n\
         PlayResX: {width}\n\
         PlayResY: {height}\n\
         ScaledBorderAndShadow: yes\n\
         \n\
         [V4+ Styles]\n\
         Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n\
         Style: Caption,Arial Black,60,&H00FFFF00,&H000000FF,&H00000000,&H80000000,-1,0,0,0,100,100,0,0,1,4,3,2,10,10,120,1\n\
         \n\
         [Events]\n\
         Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n"
    );

    for word in words {
        let text = clean_text(&word.text);
        if text.is_empty() {
            continue;
        }
        let _ = writeln!(
            doc,
            "Dialogue: 0,{},{},Caption,,0,0,0,,{{\\b1\\fs60\\c&H00FFFF&}}{}",
            format_ass_time(word.start_ms),
            format_ass_time(word.end_ms.max(word.start_ms)),
            text
        );
    }

    doc
}

/// Write an ASS subtitle file.
pub async fn write_ass_subtitles(
    words: &[TranscriptWord],
    play_res: (u32, u32),
    path: impl AsRef<Path>,
) -> MediaResult<()> {
    tokio::fs::write(path, render_ass(words, play_res)).await?;
    Ok(())
}

/// Strip override braces and escape backslashes.
fn clean_text(text: &str) -> String {
    text.trim()
        .replace('\\', "\\\\")
        .replace(['{', '}'], "")
        .replace('\n', " ")
}
