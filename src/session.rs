//! # 歌词会话
//!
//! [`LyricsSession`] 持有"当前显示曲目"的解析结果和曲目身份，
//! 负责加载去抖、格式识别兜底和跨异步边界的陈旧查询拦截。
//! 每个正在显示的曲目对应一个会话实例，随其展示生命周期创建和销毁。
//!
//! 会话自身是单线程拥有的可变结构；解析与高亮计算都是同步纯函数，
//! 异步只发生在上游取词的边界上。迟到的旧曲目取词结果通过身份比对
//! 丢弃，不需要锁。

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    highlight::{HighlightConfig, HighlightResolver},
    parser::{self, LyricLine, LyricsFormat, ParsedLyrics},
};

/// 曲目的不透明身份标识（通常是文件 URL 或等效的唯一键）。
///
/// 会话只做相等比较，不解释其内容。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId(String);

impl TrackId {
    /// 创建一个曲目身份标识。
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// 标识的原始字符串。
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TrackId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// 当前曲目的歌词会话。
///
/// 状态在"未加载"与"已加载(格式, 行序列)"之间迁移。解析失败不会
/// 向调用方抛出，而是降级为空的行序列；展示层观察到的是"没有歌词"
/// 而非错误弹窗。
#[derive(Debug, Default)]
pub struct LyricsSession {
    config: HighlightConfig,
    track: Option<TrackId>,
    format: Option<LyricsFormat>,
    parsed: Option<ParsedLyrics>,
    resolver: Option<HighlightResolver>,
    /// 上一次加载的原始文本，用于去抖。
    cache: Option<String>,
    /// 每次实际重建解析结果时递增，用于观察去抖是否生效。
    generation: u64,
}

impl LyricsSession {
    /// 创建一个使用默认高亮配置的空会话。
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建一个使用指定高亮配置的空会话。
    #[must_use]
    pub fn with_config(config: HighlightConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// 记录随后加载的歌词文本所属的曲目，不触发解析。
    pub fn identify(&mut self, track: Option<TrackId>) {
        self.track = track;
    }

    /// 当前记录的曲目身份。
    #[must_use]
    pub fn track(&self) -> Option<&TrackId> {
        self.track.as_ref()
    }

    /// 当前已识别（或被显式覆盖）的歌词格式。
    #[must_use]
    pub fn format(&self) -> Option<LyricsFormat> {
        self.format
    }

    /// 显式覆盖歌词格式，下一次 [`load`](Self::load) 时生效
    /// （需以 `auto_recognize = false` 调用，否则会被识别结果覆盖）。
    pub fn set_format(&mut self, format: Option<LyricsFormat>) {
        self.format = format;
    }

    /// 当前加载的歌词行序列，未加载时为空。
    #[must_use]
    pub fn lines(&self) -> &[LyricLine] {
        self.parsed.as_ref().map_or(&[], |parsed| &parsed.lines)
    }

    /// 当前的完整解析结果（含元数据和警告）。
    #[must_use]
    pub fn parsed(&self) -> Option<&ParsedLyrics> {
        self.parsed.as_ref()
    }

    /// 解析结果的版本号，只在实际重建时递增。
    ///
    /// 两次 `load` 之间版本号不变即说明去抖命中，没有发生重解析。
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// 加载歌词文本。
    ///
    /// `auto_recognize` 为真时先运行格式识别（识别永不失败，最差
    /// 回退为 Raw）；随后仅当解析格式或文本与上一次加载不同时才
    /// 重新解析（去抖），相同的 (格式, 文本) 重复加载不产生任何
    /// 可观察的变化。解析失败时行序列被清空，错误不向外传播。
    pub fn load(&mut self, text: Option<&str>, auto_recognize: bool) {
        if auto_recognize {
            self.format = text.map(parser::recognize);
        }

        // 去抖：格式与文本均与当前加载结果一致时直接返回
        let loaded_format = self.parsed.as_ref().map(|parsed| parsed.format);
        if self.format == loaded_format && text == self.cache.as_deref() {
            return;
        }

        self.cache = text.map(str::to_owned);
        self.generation += 1;

        let (Some(text), Some(format)) = (text, self.format) else {
            self.parsed = None;
            self.resolver = None;
            return;
        };

        match parser::parse(format, text) {
            Ok(parsed) => {
                debug!(
                    "歌词加载完成: 格式 {format}, {} 行, {} 条警告",
                    parsed.lines.len(),
                    parsed.warnings.len()
                );
                self.resolver = Some(HighlightResolver::new(&parsed.lines, self.config));
                self.parsed = Some(parsed);
            }
            Err(e) => {
                // 解析失败降级为"没有歌词"
                warn!("歌词解析失败, 已清空行序列: {e}");
                self.parsed = None;
                self.resolver = None;
            }
        }
    }

    /// 计算 `time_ms` 时刻的高亮区间。
    ///
    /// 提供 `for_track` 时会先与会话当前记录的身份比对，不一致则
    /// 立即返回空区间。这是对异步切歌竞态的拦截：为旧曲目发出的
    /// 查询绝不会返回属于错误曲目的非空区间。
    #[must_use]
    pub fn highlight(&self, time_ms: u64, for_track: Option<&TrackId>) -> Range<usize> {
        if let Some(for_track) = for_track
            && Some(for_track) != self.track.as_ref()
        {
            return 0..0;
        }
        self.resolver
            .as_ref()
            .map_or(0..0, |resolver| resolver.resolve(time_ms))
    }

    /// 清空已加载的歌词并更新曲目身份。
    ///
    /// 在切换曲目、新歌词文本尚未到达时调用，避免间隙期间展示
    /// 上一首曲目的歌词。
    pub fn clear(&mut self, new_track: Option<TrackId>) {
        self.track = new_track;
        self.format = None;
        self.parsed = None;
        self.resolver = None;
        self.cache = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LRC: &str = "[00:10.00]第一句\n[00:20.00]第二句";

    #[test]
    fn test_load_recognizes_format() {
        let mut session = LyricsSession::new();
        session.load(Some(LRC), true);

        assert_eq!(session.format(), Some(LyricsFormat::Lrc));
        assert_eq!(session.lines().len(), 2);
    }

    #[test]
    fn test_load_debounces_identical_text() {
        let mut session = LyricsSession::new();
        session.load(Some(LRC), true);
        let generation = session.generation();
        let first_id = session.lines()[0].id();

        session.load(Some(LRC), true);
        assert_eq!(session.generation(), generation, "相同文本不应重解析");
        assert_eq!(session.lines()[0].id(), first_id, "行对象应保持不变");
    }

    #[test]
    fn test_load_reparses_on_new_text() {
        let mut session = LyricsSession::new();
        session.load(Some(LRC), true);
        let generation = session.generation();

        session.load(Some("[00:30.00]另一份歌词"), true);
        assert!(session.generation() > generation);
        assert_eq!(session.lines().len(), 1);
    }

    #[test]
    fn test_parse_failure_degrades_to_empty() {
        let mut session = LyricsSession::new();
        session.set_format(Some(LyricsFormat::Lrc));
        // 按 LRC 解析纯文本会失败，会话静默降级
        session.load(Some("没有任何时间戳的文本"), false);

        assert!(session.lines().is_empty());
    }

    #[test]
    fn test_explicit_format_override() {
        let mut session = LyricsSession::new();
        session.set_format(Some(LyricsFormat::Raw));
        session.load(Some(LRC), false);

        assert_eq!(session.format(), Some(LyricsFormat::Raw));
        assert!(session.lines().iter().all(|line| !line.is_valid()));
    }

    #[test]
    fn test_highlight_delegates_to_resolver() {
        let mut session = LyricsSession::new();
        session.identify(Some(TrackId::from("track-a")));
        session.load(Some(LRC), true);

        assert_eq!(session.highlight(12_000, None), 0..1);
    }

    #[test]
    fn test_stale_identity_returns_empty() {
        let mut session = LyricsSession::new();
        session.identify(Some(TrackId::from("track-a")));
        session.load(Some(LRC), true);

        let stale = TrackId::from("track-b");
        assert_eq!(session.highlight(12_000, Some(&stale)), 0..0);
        // 身份匹配时正常返回
        let current = TrackId::from("track-a");
        assert_eq!(session.highlight(12_000, Some(&current)), 0..1);
    }

    #[test]
    fn test_clear_resets_lines_and_identity() {
        let mut session = LyricsSession::new();
        session.identify(Some(TrackId::from("track-a")));
        session.load(Some(LRC), true);

        session.clear(Some(TrackId::from("track-b")));
        assert!(session.lines().is_empty());
        assert_eq!(session.track(), Some(&TrackId::from("track-b")));

        // 清空后即便行序列被错误地重新填充，旧身份的查询也只能得到空区间
        session.load(Some(LRC), true);
        let old = TrackId::from("track-a");
        assert_eq!(session.highlight(12_000, Some(&old)), 0..0);
    }

    #[test]
    fn test_load_none_unloads() {
        let mut session = LyricsSession::new();
        session.load(Some(LRC), true);
        session.load(None, true);

        assert!(session.lines().is_empty());
        assert_eq!(session.format(), None);
    }
}
