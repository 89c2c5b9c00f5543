//! # 高亮区间计算
//!
//! 给定解析后的歌词行序列和当前播放时间，计算此刻应当高亮的连续行
//! 区间 `[lo, hi)`。这是同步引擎的核心时间算法，处理行间空隙的
//! 保持/悬停策略、同时结束的多行分组，以及开放区间行。
//!
//! 调用方在每个动画帧都会查询一次，因此 [`HighlightResolver`] 在
//! 构建时缓存按开始时间排序的索引，查询阶段只做二分查找和局部的
//! 向后扩展，不会重新过滤或排序。

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::parser::types::LyricLine;

/// 高亮策略的可调参数。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightConfig {
    /// 悬停阈值（毫秒）。
    ///
    /// 一行结束后，若下一行的开始时间距离其结束时间不小于该阈值，
    /// 间隙期间不高亮任何行（悬停）；小于该阈值则让已结束的行保持
    /// 高亮直到下一行开始（保持）。
    pub suspension_threshold_ms: u64,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            suspension_threshold_ms: 1000,
        }
    }
}

/// 一条参与高亮计算的行条目。
#[derive(Debug, Clone, Copy)]
struct IndexedLine {
    begin_ms: u64,
    index: usize,
}

/// 针对一份解析结果的高亮计算器。
///
/// 构建时抽取所有携带开始时间的行并按 `(开始时间, 源顺序)` 排序缓存；
/// 歌词文档被整体替换时应重建。查询是只读的，可在同一线程内任意重放，
/// 相同输入必然得到相同区间。
#[derive(Debug, Clone)]
pub struct HighlightResolver {
    config: HighlightConfig,
    line_count: usize,
    /// 按 (begin_ms, index) 升序排列的有效行。
    sorted: Vec<IndexedLine>,
    /// 按文档顺序索引的 (开始, 结束) 时间；无开始时间的行为 `None`。
    by_index: Vec<Option<(u64, Option<u64>)>>,
}

impl HighlightResolver {
    /// 从歌词行序列构建计算器。
    ///
    /// 无开始时间的行（Raw 行、损坏行）不参与高亮，但仍占据文档索引，
    /// 返回区间始终以原始文档索引表达。
    #[must_use]
    pub fn new(lines: &[LyricLine], config: HighlightConfig) -> Self {
        let by_index: Vec<Option<(u64, Option<u64>)>> = lines
            .iter()
            .map(|line| line.begin_ms().map(|begin| (begin, line.end_ms())))
            .collect();

        let mut sorted: Vec<IndexedLine> = by_index
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                slot.map(|(begin_ms, _)| IndexedLine { begin_ms, index })
            })
            .collect();
        sorted.sort_by_key(|entry| (entry.begin_ms, entry.index));

        Self {
            config,
            line_count: lines.len(),
            sorted,
            by_index,
        }
    }

    /// 计算 `time_ms` 时刻的高亮区间 `[lo, hi)`。
    ///
    /// 返回区间恒为 `[0, 行数]` 的合法子区间；空区间表示此刻无行高亮，
    /// 其位置指示下一处将要高亮的索引。
    #[must_use]
    pub fn resolve(&self, time_ms: u64) -> Range<usize> {
        // 前缀：开始时间 <= t 的行；后缀：开始时间 > t 的行
        let split = self.sorted.partition_point(|entry| entry.begin_ms <= time_ms);
        let Some(last_prefix) = split.checked_sub(1).map(|i| self.sorted[i]) else {
            // 还没有任何行开始
            return 0..0;
        };
        let first_suffix = self.sorted.get(split).copied();

        let end_ms = self.by_index[last_prefix.index].and_then(|(_, end)| end);
        match end_ms {
            Some(end_ms) if time_ms > end_ms => self.resolve_after_end(last_prefix, end_ms, first_suffix),
            Some(end_ms) => {
                // 仍处于最后前缀行的区间内：向后并入同时结束的相邻行
                let lo = self.expand_equal_end(last_prefix.index, time_ms, Some(end_ms));
                lo..last_prefix.index + 1
            }
            None => match first_suffix {
                Some(suffix) => last_prefix.index..suffix.index.max(last_prefix.index),
                None => {
                    let lo = self.expand_held_group(last_prefix.index, time_ms);
                    lo..last_prefix.index + 1
                }
            },
        }
    }

    /// 最后前缀行已结束：根据到下一行的间隙决定悬停还是保持。
    fn resolve_after_end(
        &self,
        last_prefix: IndexedLine,
        end_ms: u64,
        first_suffix: Option<IndexedLine>,
    ) -> Range<usize> {
        match first_suffix {
            Some(suffix) => {
                let gap = suffix.begin_ms.saturating_sub(end_ms);
                if gap >= self.config.suspension_threshold_ms {
                    // 悬停：静默间隙期间不高亮
                    suffix.index..suffix.index
                } else {
                    // 保持：让已结束的行亮到下一行开始
                    last_prefix.index..suffix.index.max(last_prefix.index)
                }
            }
            // 歌词已全部唱完
            None => self.line_count..self.line_count,
        }
    }

    /// 向后并入与 `end_ms` 完全同时结束的相邻前缀行（例如同时收尾的对唱）。
    fn expand_equal_end(&self, from: usize, time_ms: u64, end_ms: Option<u64>) -> usize {
        let mut lo = from;
        while lo > 0 {
            let Some((begin, end)) = self.by_index[lo - 1] else {
                break;
            };
            if begin > time_ms || end != end_ms {
                break;
            }
            lo -= 1;
        }
        lo
    }

    /// 开放区间行的向后扩展：并入同为开放区间的相邻前缀行，以及结束
    /// 时间距后一行开始不足悬停阈值的相邻前缀行（保持策略的推广）。
    fn expand_held_group(&self, from: usize, time_ms: u64) -> usize {
        let mut lo = from;
        while lo > 0 {
            let Some((begin, end)) = self.by_index[lo - 1] else {
                break;
            };
            if begin > time_ms {
                break;
            }
            match end {
                None => {}
                Some(prev_end) => {
                    let Some((next_begin, _)) = self.by_index[lo] else {
                        break;
                    };
                    if next_begin.saturating_sub(prev_end) >= self.config.suspension_threshold_ms {
                        break;
                    }
                }
            }
            lo -= 1;
        }
        lo
    }
}

/// 一次性计算高亮区间的便捷函数，使用默认配置。
///
/// 每帧查询的调用方应改为持有 [`HighlightResolver`] 以复用排序缓存。
#[must_use]
pub fn highlight(lines: &[LyricLine], time_ms: u64) -> Range<usize> {
    HighlightResolver::new(lines, HighlightConfig::default()).resolve(time_ms)
}
