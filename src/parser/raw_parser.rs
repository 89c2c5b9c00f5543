//! # Raw 格式解析器

use crate::parser::types::{LyricLine, LyricsFormat, ParsedLyrics, RawLyricLine};

/// 将纯文本按换行切分为无时间信息的歌词行。
///
/// 所有产出行的 `is_valid` 均为 `false`，不参与高亮计算；
/// 调用方通常以"全部展示"的方式呈现这类歌词。此解析器不会失败。
#[must_use]
pub fn parse_raw(content: &str) -> ParsedLyrics {
    let lines = content
        .lines()
        .filter(|line| !line.is_empty())
        .map(|line| LyricLine::Raw(RawLyricLine::new(line)))
        .collect();

    ParsedLyrics {
        format: LyricsFormat::Raw,
        lines,
        ..Default::default()
    }
}
