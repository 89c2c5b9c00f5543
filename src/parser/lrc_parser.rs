//! # LRC 格式解析器

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;
use uuid::Uuid;

use crate::parser::{
    types::{LrcLyricLine, LyricLine, LyricsFormat, ParseError, ParsedLyrics},
    utils::{normalize_text_whitespace, parse_lrc_metadata_tag},
};

/// 用于匹配一个完整的 LRC 歌词行，捕获时间戳部分和文本部分
static LRC_LINE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^((?:\[\d{2,}:\d{2}[.:]\d{2,3}\])+)(.*)$").expect("编译 LRC_LINE_REGEX 失败")
});

/// 用于从一个时间戳组中提取出单个时间戳
static LRC_TIMESTAMP_EXTRACT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(\d{2,}):(\d{2})[.:](\d{2,3})\]").expect("编译 LRC_TIMESTAMP_EXTRACT_REGEX 失败")
});

/// 解析 LRC 格式内容到 [`ParsedLyrics`] 结构。
///
/// 每个带时间戳的源行按其时间戳标签数量产出同等数量的歌词行，
/// 共享同一份文本和翻译。产出行保持源文件顺序，只携带开始时间
/// （标准 LRC 没有结束时间，行的时间范围是开放区间）。
///
/// 翻译附加策略：紧跟在带时间戳源行之后的第一个无时间戳、非元数据
/// 文本行会被作为上一源行所有产出行的 `translation`；若已附加过翻译，
/// 后续的无时间戳行只记录警告。
///
/// # 返回
/// `Err(ParseError::InvalidLyricFormat)` - 当整个文档未能提取出任何
/// 带时间戳的歌词行时。单个损坏的时间戳只会跳过该标签并记录警告。
pub fn parse_lrc(content: &str) -> Result<ParsedLyrics, ParseError> {
    let mut raw_metadata: HashMap<String, Vec<String>> = HashMap::new();
    let mut warnings: Vec<String> = Vec::new();
    let mut lines: Vec<LyricLine> = Vec::new();

    // 上一个时间戳源行产出的行区间 [start, end)，用于附加翻译
    let mut last_group: Option<(usize, usize)> = None;
    // 该区间是否仍可接受一条翻译
    let mut translation_armed = false;

    for (line_num_zero_based, line_str_raw) in content.lines().enumerate() {
        let line_num_one_based = line_num_zero_based + 1;
        let line_str_trimmed = line_str_raw.trim();

        if line_str_trimmed.is_empty() {
            // 空行打断翻译的紧邻关系
            translation_armed = false;
            continue;
        }

        if let Some(line_caps) = LRC_LINE_REGEX.captures(line_str_trimmed) {
            translation_armed = false;
            let all_timestamps_str = line_caps.get(1).map_or("", |m| m.as_str());
            let raw_text_part = line_caps.get(2).map_or("", |m| m.as_str());
            let text_part = normalize_text_whitespace(raw_text_part);

            let group_start = lines.len();
            for ts_cap in LRC_TIMESTAMP_EXTRACT_REGEX.captures_iter(all_timestamps_str) {
                match parse_lrc_timestamp_ms(&ts_cap) {
                    Some(total_ms) => {
                        lines.push(LyricLine::Lrc(LrcLyricLine {
                            id: Uuid::new_v4(),
                            begin_ms: Some(total_ms),
                            end_ms: None,
                            content: text_part.clone(),
                            translation: None,
                        }));
                    }
                    None => {
                        let tag = ts_cap.get(0).map_or("", |m| m.as_str());
                        warn!("LRC 解析 (行 {line_num_one_based}): 无法解析时间戳 '{tag}'");
                        warnings.push(format!(
                            "LRC 解析警告 (行 {line_num_one_based}): 无法解析时间戳 '{tag}'，已跳过。"
                        ));
                    }
                }
            }

            if lines.len() > group_start {
                last_group = Some((group_start, lines.len()));
                translation_armed = true;
            }
            continue;
        }

        if parse_lrc_metadata_tag(line_str_trimmed, &mut raw_metadata) {
            translation_armed = false;
            continue;
        }

        // 无时间戳的普通文本行：紧跟时间戳行时作为其翻译
        if translation_armed && let Some((start, end)) = last_group {
            let translation = normalize_text_whitespace(line_str_trimmed);
            for line in &mut lines[start..end] {
                if let LyricLine::Lrc(lrc_line) = line {
                    lrc_line.translation = Some(translation.clone());
                }
            }
            translation_armed = false;
        } else {
            warnings.push(format!(
                "LRC 解析警告 (行 {line_num_one_based}): 无法识别的行格式 '{line_str_trimmed}'。"
            ));
        }
    }

    if lines.is_empty() {
        return Err(ParseError::InvalidLyricFormat(
            "未找到任何带时间戳的 LRC 歌词行".to_string(),
        ));
    }

    Ok(ParsedLyrics {
        format: LyricsFormat::Lrc,
        lines,
        raw_metadata,
        warnings,
    })
}

/// 将单个时间戳捕获解析为毫秒，分钟:秒.厘秒（两位小数 ×10，三位为毫秒）。
fn parse_lrc_timestamp_ms(ts_cap: &regex::Captures<'_>) -> Option<u64> {
    let minutes: u64 = ts_cap.get(1)?.as_str().parse().ok()?;
    let seconds: u64 = ts_cap.get(2)?.as_str().parse().ok()?;
    let fraction_str = ts_cap.get(3)?.as_str();
    let milliseconds = match fraction_str.len() {
        2 => fraction_str.parse::<u64>().ok()? * 10,
        3 => fraction_str.parse::<u64>().ok()?,
        _ => return None,
    };
    if seconds >= 60 {
        return None;
    }
    Some((minutes * 60 + seconds) * 1000 + milliseconds)
}
