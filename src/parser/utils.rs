//! 包含一些工具函数的模块。

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::parser::types::ParseError;

static METADATA_TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(?P<key>[a-zA-Z]+):(?P<value>.*)\]$").expect("编译 METADATA_TAG_REGEX 失败")
});

/// 尝试将一行文本解析为 LRC 风格的 `[key:value]` 元数据。
/// 如果成功，则将结果存入 `raw_metadata` 并返回 `true`。
///
/// # 返回
/// `true` - 如果该行是有效的元数据标签并已处理。
/// `false` - 如果该行不是元数据标签。
pub fn parse_lrc_metadata_tag(line: &str, raw_metadata: &mut HashMap<String, Vec<String>>) -> bool {
    if let Some(caps) = METADATA_TAG_REGEX.captures(line)
        && let (Some(key), Some(value)) = (caps.name("key"), caps.name("value"))
    {
        raw_metadata
            .entry(key.as_str().to_string())
            .or_default()
            .push(normalize_text_whitespace(value.as_str()));
        return true;
    }
    false
}

/// 规范化文本中的空白字符
pub fn normalize_text_whitespace(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    trimmed.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// 解析 TTML 时间表达式为毫秒。
///
/// 支持钟面格式 `HH:MM:SS.mmm`、`MM:SS.mmm`、`SS.mmm`，
/// 以及偏移格式 `1234ms`、`12.3s` 和裸秒数。
///
/// # 返回
/// `Err(ParseError::InvalidTime)` - 如果表达式无法被解析。
pub fn parse_ttml_time_ms(value: &str) -> Result<u64, ParseError> {
    let invalid = || ParseError::InvalidTime(value.to_string());
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(invalid());
    }

    if let Some(ms_part) = trimmed.strip_suffix("ms") {
        let ms: f64 = ms_part.trim().parse().map_err(|_| invalid())?;
        if ms < 0.0 {
            return Err(invalid());
        }
        return Ok(ms.round() as u64);
    }

    let clock_part = trimmed.strip_suffix('s').unwrap_or(trimmed);
    let parts: Vec<&str> = clock_part.split(':').collect();
    match parts.as_slice() {
        [seconds] => parse_seconds_ms(seconds).ok_or_else(invalid),
        [minutes, seconds] => {
            let min: u64 = minutes.parse().map_err(|_| invalid())?;
            let sec_ms = parse_seconds_ms(seconds).ok_or_else(invalid)?;
            Ok(min * 60 * 1000 + sec_ms)
        }
        [hours, minutes, seconds] => {
            let hour: u64 = hours.parse().map_err(|_| invalid())?;
            let min: u64 = minutes.parse().map_err(|_| invalid())?;
            let sec_ms = parse_seconds_ms(seconds).ok_or_else(invalid)?;
            Ok(hour * 3600 * 1000 + min * 60 * 1000 + sec_ms)
        }
        _ => Err(invalid()),
    }
}

/// 解析 `SS` 或 `SS.fff` 形式的秒数为毫秒，小数部分按位数补齐。
fn parse_seconds_ms(s: &str) -> Option<u64> {
    if let Some(dot_pos) = s.find('.') {
        let sec: u64 = s[..dot_pos].parse().ok()?;
        let frac_str = &s[dot_pos + 1..];
        let ms = match frac_str.len() {
            0 => 0,
            1 => frac_str.parse::<u64>().ok()? * 100,
            2 => frac_str.parse::<u64>().ok()? * 10,
            3 => frac_str.parse::<u64>().ok()?,
            _ => frac_str[..3].parse::<u64>().ok()?,
        };
        Some(sec * 1000 + ms)
    } else {
        let sec: u64 = s.parse().ok()?;
        Some(sec * 1000)
    }
}
