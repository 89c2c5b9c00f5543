//! # 歌词解析
//!
//! 提供格式识别与三种格式（Raw、LRC、TTML）的解析入口。
//! 识别和解析都是纯函数，不做任何 I/O。

pub mod lrc_parser;
pub mod raw_parser;
pub mod ttml_parser;
pub mod types;
pub mod utils;

use std::sync::LazyLock;

use quick_xml::{Reader, events::Event};
use regex::Regex;

pub use self::{
    lrc_parser::parse_lrc,
    raw_parser::parse_raw,
    ttml_parser::parse_ttml,
    types::{
        LrcLyricLine, LyricLine, LyricsFormat, ParseError, ParsedLyrics, RawLyricLine,
        TtmlLyricLine, TtmlLyrics, TtmlPosition, TtmlSyllable, TtmlTranslation,
    },
};

/// 歌词文本以任意 `[...]` 括号标记开头即视为 LRC。
static LRC_HINT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[.+\]").expect("编译 LRC_HINT_REGEX 失败"));

/// 从原始文本识别歌词格式。
///
/// 1. 去除首尾空白后以括号标记开头，识别为 LRC；
/// 2. 否则若文本中出现 `<tt>` 根元素，识别为 TTML；
/// 3. 否则回退为 Raw。
///
/// 纯函数，永不失败：TTML 嗅探中的标记损坏按"不是 TTML"处理。
#[must_use]
pub fn recognize(text: &str) -> LyricsFormat {
    let trimmed = text.trim();
    if LRC_HINT_REGEX.is_match(trimmed) {
        LyricsFormat::Lrc
    } else if contains_ttml_root(trimmed) {
        LyricsFormat::Ttml
    } else {
        LyricsFormat::Raw
    }
}

/// 嗅探文本中是否存在 `tt` 元素（忽略命名空间前缀）。
fn contains_ttml_root(text: &str) -> bool {
    let mut reader = Reader::from_str(text);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.name().local_name().as_ref() == b"tt" {
                    return true;
                }
            }
            Ok(Event::Eof) | Err(_) => return false,
            Ok(_) => {}
        }
    }
}

/// 按指定格式分发到对应的解析器。
///
/// # 返回
/// `Err(ParseError)` - 当 LRC 或 TTML 文档严重损坏、无法提取任何
/// 歌词行时。Raw 解析不会失败。
pub fn parse(format: LyricsFormat, content: &str) -> Result<ParsedLyrics, ParseError> {
    match format {
        LyricsFormat::Raw => Ok(parse_raw(content)),
        LyricsFormat::Lrc => parse_lrc(content),
        LyricsFormat::Ttml => parse_ttml(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognize_lrc() {
        assert_eq!(recognize("[00:01.23]Hello"), LyricsFormat::Lrc);
        assert_eq!(recognize("  \n[ti:标题]\n[00:01.23]Hello"), LyricsFormat::Lrc);
    }

    #[test]
    fn test_recognize_ttml() {
        let text = r#"<tt xmlns="http://www.w3.org/ns/ttml"><body/></tt>"#;
        assert_eq!(recognize(text), LyricsFormat::Ttml);
    }

    #[test]
    fn test_recognize_raw() {
        assert_eq!(recognize("只是普通的一段文字"), LyricsFormat::Raw);
        // 损坏的标记不会中断识别，回退为 Raw
        assert_eq!(recognize("<<<< 不是有效的标记"), LyricsFormat::Raw);
    }

    #[test]
    fn test_parse_dispatch() {
        assert!(parse(LyricsFormat::Raw, "任意文本").is_ok());
        assert!(parse(LyricsFormat::Lrc, "没有时间戳").is_err());
    }
}
