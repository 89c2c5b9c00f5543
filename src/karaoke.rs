//! # 逐字渲染计算
//!
//! 为 TTML 逐字歌词提供纯函数式的进度计算：给定当前播放时间和一行的
//! 音节列表，得出每个音节（或每个字素）的强调进度，取值范围 `[0, 1]`。
//! 所有函数无内部状态，相同输入必然得到相同输出，可在拖动进度条、
//! 回退播放时任意重放。

use std::sync::LazyLock;

use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use crate::parser::types::TtmlSyllable;

/// 元音簇模式，按词边界搜索（音节带标点也能命中），命中任一模式的
/// 音节，其开始时间会被记为元音时间标记：
/// 1. 2 到 7 个连续元音构成整词（单个 "a" 不算）；
/// 2. 2 到 7 个元音（小写不含 i）后接 1 到 7 个 h/m；
/// 3. h 开头、后接至多 6 个 m 的哼鸣（"mm" 不算）。
static VOWEL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\b[aeiouAEIOU]{2,7}\b",
        r"\b[aeouAEIOU]{2,7}[hmHM]{1,7}\b",
        r"\b[hH][mM]{0,6}\b",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("编译 VOWEL_PATTERNS 失败"))
    .collect()
});

/// 计算单个音节在指定时间的强调进度。
///
/// 音节开始前为 `0.0`，结束后为 `1.0`，期间按经过时长线性插值。
/// 时长为零的音节在到达开始时间后立即视为完成。
#[must_use]
pub fn syllable_progress(syllable: &TtmlSyllable, time_ms: u64) -> f64 {
    if time_ms <= syllable.begin_ms {
        return 0.0;
    }
    if time_ms >= syllable.end_ms || syllable.end_ms <= syllable.begin_ms {
        return 1.0;
    }
    (time_ms - syllable.begin_ms) as f64 / (syllable.end_ms - syllable.begin_ms) as f64
}

/// 计算一行中每个音节在指定时间的强调进度。
///
/// 返回向量与 `children` 一一对应。
#[must_use]
pub fn line_progress(children: &[TtmlSyllable], time_ms: u64) -> Vec<f64> {
    children
        .iter()
        .map(|syllable| syllable_progress(syllable, time_ms))
        .collect()
}

/// 将音节进度细分到每个字素簇，供逐字符强调动画使用。
///
/// 音节时长在其字素之间均分；返回向量按字素顺序给出各自的进度。
#[must_use]
pub fn grapheme_progress(syllable: &TtmlSyllable, time_ms: u64) -> Vec<f64> {
    let count = syllable.text.graphemes(true).count();
    if count == 0 {
        return Vec::new();
    }

    let overall = syllable_progress(syllable, time_ms);
    (0..count)
        .map(|index| (overall * count as f64 - index as f64).clamp(0.0, 1.0))
        .collect()
}

/// 从音节文本中派生元音时间标记。
///
/// 扫描每个音节的文本是否命中元音簇模式，命中则记录该音节的开始时间。
/// 返回值升序且去重。在解析阶段调用一次，结果存入
/// [`TtmlLyrics::vowel_times`](crate::parser::types::TtmlLyrics::vowel_times)。
#[must_use]
pub fn collect_vowel_times(children: &[TtmlSyllable]) -> Vec<u64> {
    let mut times: Vec<u64> = children
        .iter()
        .filter(|syllable| {
            VOWEL_PATTERNS
                .iter()
                .any(|pattern| pattern.is_match(&syllable.text))
        })
        .map(|syllable| syllable.begin_ms)
        .collect();
    times.sort_unstable();
    times.dedup();
    times
}
