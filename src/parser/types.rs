//! 定义了歌词同步引擎使用的核心数据类型。

use std::{collections::HashMap, fmt};

use quick_xml::Error as QuickXmlError;
use serde::{Deserialize, Serialize};
use strum_macros::{EnumIter, EnumString};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

//=============================================================================
// 1. 错误枚举
//=============================================================================

/// 定义歌词解析过程中可能发生的各种错误。
///
/// 只有当整个文档严重损坏、无法提取出任何歌词行时才会返回错误；
/// 单行、单音节级别的损坏会被跳过并记录到 [`ParsedLyrics::warnings`] 中。
#[derive(Error, Debug)]
pub enum ParseError {
    /// XML 解析错误，通常来自 `quick-xml` 库。
    #[error("XML 解析错误: {0}")]
    Xml(#[from] QuickXmlError),
    /// 无效的时间格式字符串。
    #[error("无效的时间格式: {0}")]
    InvalidTime(String),
    /// 无效的歌词格式。
    #[error("无效的歌词格式: {0}")]
    InvalidLyricFormat(String),
}

//=============================================================================
// 2. 歌词格式枚举
//=============================================================================

/// 枚举：表示支持的歌词格式。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, Serialize, Deserialize, Default,
)]
#[strum(ascii_case_insensitive)]
pub enum LyricsFormat {
    /// 未解析的纯文本，按行切分，无时间信息。
    #[default]
    Raw,
    /// 标准 LRC (`LyRiCs`) 格式，逐行时间戳。
    Lrc,
    /// `Timed Text Markup Language` 格式，逐字时间戳。
    Ttml,
}

impl LyricsFormat {
    /// 将歌词格式枚举转换为对应的文件扩展名字符串。
    #[must_use]
    pub fn to_extension_str(self) -> &'static str {
        match self {
            LyricsFormat::Raw => "txt",
            LyricsFormat::Lrc => "lrc",
            LyricsFormat::Ttml => "ttml",
        }
    }

    /// 从字符串（通常是文件扩展名或用户输入）解析歌词格式枚举。
    /// 此方法不区分大小写，并会移除输入字符串中的空格和点。
    pub fn from_string(s: &str) -> Option<Self> {
        let normalized_s = s.to_uppercase().replace([' ', '.'], "");
        match normalized_s.as_str() {
            "RAW" | "TXT" | "TEXT" => Some(LyricsFormat::Raw),
            "LRC" => Some(LyricsFormat::Lrc),
            "TTML" | "XML" => Some(LyricsFormat::Ttml),
            _ => {
                warn!("[LyricsFormat] 未知的格式字符串: {}", s);
                None
            }
        }
    }
}

impl fmt::Display for LyricsFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LyricsFormat::Raw => write!(f, "Raw"),
            LyricsFormat::Lrc => write!(f, "LRC"),
            LyricsFormat::Ttml => write!(f, "TTML"),
        }
    }
}

//=============================================================================
// 3. 歌词行结构
//=============================================================================

/// 未解析纯文本中的一行歌词。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLyricLine {
    /// 解析时分配的稳定唯一标识。
    pub id: Uuid,
    /// 行的开始时间，相对于歌曲开始的绝对时间（毫秒）。Raw 行恒为 `None`。
    pub begin_ms: Option<u64>,
    /// 行的结束时间（毫秒）。Raw 行恒为 `None`。
    pub end_ms: Option<u64>,
    /// 该行的显示文本。
    pub content: String,
}

impl RawLyricLine {
    /// 创建一个无时间信息的纯文本行。
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            begin_ms: None,
            end_ms: None,
            content: content.into(),
        }
    }
}

/// LRC 歌词中的一行。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LrcLyricLine {
    /// 解析时分配的稳定唯一标识。
    pub id: Uuid,
    /// 行的开始时间（毫秒）。由解析器从时间戳标签填充。
    pub begin_ms: Option<u64>,
    /// 行的结束时间（毫秒）。标准 LRC 不携带结束时间，保持 `None`（开放区间）。
    pub end_ms: Option<u64>,
    /// 该行的显示文本。
    pub content: String,
    /// 可选的翻译文本，来自紧随其后的无时间戳行。
    pub translation: Option<String>,
}

/// 表示 TTML 行的对齐角色（主唱或对唱）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TtmlPosition {
    /// 主唱行，常规左对齐。
    #[default]
    Main,
    /// 对唱行（非主 agent），右对齐显示。
    Sub,
}

/// TTML 行内一个带时间的子音节。
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtmlSyllable {
    /// 音节的文本内容。不含尾随空格；前导空格已归入前一个音节的
    /// 尾随空格计数，仅行内首个音节可能保留前导空格。
    pub text: String,
    /// 音节开始时间（毫秒）。若源文件缺失则回退为所属行的开始时间。
    pub begin_ms: u64,
    /// 音节结束时间（毫秒）。若源文件缺失则回退为所属行的结束时间。
    pub end_ms: u64,
    /// 紧随该音节之后的字面空格数量，用于拼接显示时精确还原原始间距。
    pub trailing_space_count: usize,
}

/// 依附于某一行的一条翻译。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtmlTranslation {
    /// 可选的 BCP 47 语言代码，来自 `xml:lang` 属性。
    pub lang: Option<String>,
    /// 翻译文本。
    pub text: String,
}

/// 一组带时间的 TTML 歌词内容（主唱或背景人声共用此形状）。
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtmlLyrics {
    /// 按源文件顺序排列的音节列表。
    pub children: Vec<TtmlSyllable>,
    /// 依附于该组歌词的翻译列表，每种语言一条。
    pub translations: Vec<TtmlTranslation>,
    /// 可选的罗马音转写文本。
    pub roman: Option<String>,
    /// 解析时派生的元音时间标记（毫秒，升序去重），
    /// 用于驱动与词边界无关的元音强调动画。
    pub vowel_times: Vec<u64>,
}

impl TtmlLyrics {
    /// 将所有音节文本连同其尾随空格拼接成完整的一行文本。
    ///
    /// 拼接结果与源文件中该行的原始拼写逐字符一致。
    #[must_use]
    pub fn text(&self) -> String {
        self.children
            .iter()
            .map(|syl| format!("{}{}", syl.text, " ".repeat(syl.trailing_space_count)))
            .collect()
    }

    /// 该组歌词是否不含任何音节。
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// TTML 歌词中的一行，携带主唱内容和可选的背景人声。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtmlLyricLine {
    /// 解析时分配的稳定唯一标识。
    pub id: Uuid,
    /// 行的开始时间（毫秒）。缺失时回退为第一个音节的开始时间。
    pub begin_ms: Option<u64>,
    /// 行的结束时间（毫秒）。缺失时回退为最后一个音节的结束时间。
    pub end_ms: Option<u64>,
    /// 该行的对齐角色。
    pub position: TtmlPosition,
    /// 主唱歌词内容。
    pub lyrics: TtmlLyrics,
    /// 可选的背景人声，与主唱并行演唱，独立计时。
    pub background_lyrics: Option<TtmlLyrics>,
}

/// 歌词行结构，按来源格式分发的带标签变体。
///
/// 三种格式共享 `id`、起止时间、文本和有效性判断这组能力，
/// 通过模式匹配分发，保证编译期的完备性检查。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LyricLine {
    /// 纯文本行。
    Raw(RawLyricLine),
    /// LRC 行。
    Lrc(LrcLyricLine),
    /// TTML 行。
    Ttml(TtmlLyricLine),
}

impl LyricLine {
    /// 该行的稳定唯一标识。
    #[must_use]
    pub fn id(&self) -> Uuid {
        match self {
            LyricLine::Raw(line) => line.id,
            LyricLine::Lrc(line) => line.id,
            LyricLine::Ttml(line) => line.id,
        }
    }

    /// 行的开始时间（毫秒）。
    #[must_use]
    pub fn begin_ms(&self) -> Option<u64> {
        match self {
            LyricLine::Raw(line) => line.begin_ms,
            LyricLine::Lrc(line) => line.begin_ms,
            LyricLine::Ttml(line) => line.begin_ms,
        }
    }

    /// 行的结束时间（毫秒）。
    #[must_use]
    pub fn end_ms(&self) -> Option<u64> {
        match self {
            LyricLine::Raw(line) => line.end_ms,
            LyricLine::Lrc(line) => line.end_ms,
            LyricLine::Ttml(line) => line.end_ms,
        }
    }

    /// 该行的完整显示文本。TTML 行由音节和尾随空格拼接而来。
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            LyricLine::Raw(line) => line.content.clone(),
            LyricLine::Lrc(line) => line.content.clone(),
            LyricLine::Ttml(line) => line.lyrics.text(),
        }
    }

    /// 该行是否携带时间信息（开始或结束时间至少存在一个）。
    ///
    /// 无效行不参与高亮计算。
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.begin_ms().is_some() || self.end_ms().is_some()
    }
}

//=============================================================================
// 4. 解析结果容器
//=============================================================================

/// 存储从歌词文本解析出的完整结果。
/// 这是解析阶段的主要输出，也是会话和高亮计算的主要输入。
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedLyrics {
    /// 解析的源格式。
    pub format: LyricsFormat,
    /// 按源文件顺序排列的歌词行列表。
    pub lines: Vec<LyricLine>,
    /// 从文件头或元数据标签中解析出的原始（未规范化）元数据。
    /// 键是原始标签名，值是该标签对应的所有值。
    pub raw_metadata: HashMap<String, Vec<String>>,
    /// 解析过程中产生的警告信息列表。
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_validity() {
        let raw = LyricLine::Raw(RawLyricLine::new("hello"));
        assert!(!raw.is_valid(), "无时间信息的行应无效");

        let lrc = LyricLine::Lrc(LrcLyricLine {
            id: Uuid::new_v4(),
            begin_ms: Some(1000),
            end_ms: None,
            content: "hello".to_string(),
            translation: None,
        });
        assert!(lrc.is_valid(), "只有开始时间的行也应有效");
    }

    #[test]
    fn test_ttml_lyrics_text_preserves_spacing() {
        let lyrics = TtmlLyrics {
            children: vec![
                TtmlSyllable {
                    text: "Hello".to_string(),
                    begin_ms: 0,
                    end_ms: 500,
                    trailing_space_count: 2,
                },
                TtmlSyllable {
                    text: "world".to_string(),
                    begin_ms: 500,
                    end_ms: 1000,
                    trailing_space_count: 0,
                },
            ],
            ..Default::default()
        };
        assert_eq!(lyrics.text(), "Hello  world");
    }

    #[test]
    fn test_format_from_string() {
        assert_eq!(LyricsFormat::from_string(".lrc"), Some(LyricsFormat::Lrc));
        assert_eq!(LyricsFormat::from_string("TTML"), Some(LyricsFormat::Ttml));
        assert_eq!(LyricsFormat::from_string("txt"), Some(LyricsFormat::Raw));
        assert_eq!(LyricsFormat::from_string("unknown"), None);
    }
}
