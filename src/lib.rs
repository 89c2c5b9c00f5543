#![warn(missing_docs)]

//! # Lyrics Sync RS
//!
//! 一个用于音乐播放器的歌词同步引擎：解析带时间信息的歌词格式，
//! 并在播放时间持续推进时计算应当高亮的歌词行区间。
//!
//! ## 主要功能
//!
//! - **格式识别与解析**: 支持纯文本 (Raw)、逐行时间戳 (LRC) 和
//!   逐字时间戳 (TTML) 三种格式，自动识别输入文本的格式。
//! - **高亮计算**: 给定任意播放时间，计算当前活跃的连续行区间，
//!   正确处理行间空隙的保持/悬停策略、同时结束的多行分组和开放区间行。
//! - **逐字渲染**: 为 TTML 歌词提供音节级和字素级的强调进度，
//!   以及驱动元音强调动画的时间标记。
//! - **会话管理**: 加载去抖、解析失败静默降级、切歌竞态下的
//!   陈旧查询拦截。
//!
//! 引擎自身不做任何网络或文件 I/O，输入是上游元数据层已经取出的
//! 歌词文本字符串；所有时间值是相对于曲目开头的毫秒数。
//!
//! ## 解析歌词
//!
//! ```rust
//! use lyrics_sync_rs::parser::{self, LyricsFormat};
//!
//! let text = "[00:10.00]第一句\n[00:20.50]第二句";
//! let format = parser::recognize(text);
//! assert_eq!(format, LyricsFormat::Lrc);
//!
//! let parsed = parser::parse(format, text).unwrap();
//! assert_eq!(parsed.lines.len(), 2);
//! assert_eq!(parsed.lines[0].begin_ms(), Some(10_000));
//! ```
//!
//! ## 会话与高亮
//!
//! ```rust
//! use lyrics_sync_rs::session::{LyricsSession, TrackId};
//!
//! let mut session = LyricsSession::new();
//! session.identify(Some(TrackId::from("file:///music/song.flac")));
//! session.load(Some("[00:10.00]第一句\n[00:12.00]第二句"), true);
//!
//! // 播放到 10.5 秒时，第一句处于高亮区间
//! assert_eq!(session.highlight(10_500, None), 0..1);
//!
//! // 为其他曲目发出的陈旧查询被拦截为空区间
//! let stale = TrackId::from("file:///music/other.flac");
//! assert_eq!(session.highlight(10_500, Some(&stale)), 0..0);
//! ```

pub mod error;
pub mod highlight;
pub mod karaoke;
pub mod parser;
pub mod session;

pub use crate::{
    error::{LyricsSyncError, Result},
    highlight::{HighlightConfig, HighlightResolver},
    parser::{LyricLine, LyricsFormat, ParsedLyrics},
    session::{LyricsSession, TrackId},
};

/// 识别并解析歌词文本的便捷入口。
///
/// 先运行格式识别（识别永不失败，最差回退为 Raw），再分发到对应的
/// 解析器。需要显式指定格式、或希望像会话那样把解析失败降级为
/// 空结果时，请分别使用 [`parser::parse`] 和 [`LyricsSession::load`]。
///
/// # 返回
/// `Err(LyricsSyncError)` - 当识别出的格式无法从文本中提取出任何
/// 歌词行时（例如只有元数据标签的 LRC 文档）。
///
/// ```rust
/// let parsed = lyrics_sync_rs::parse_lyrics("[00:10.00]第一句").unwrap();
/// assert_eq!(parsed.lines.len(), 1);
/// ```
pub fn parse_lyrics(text: &str) -> Result<ParsedLyrics> {
    let format = parser::recognize(text);
    Ok(parser::parse(format, text)?)
}
