//! # TTML 格式解析器
//!
//! 基于 `quick-xml` 的事件流状态机，将 TTML 文档解析为逐字歌词行。
//! 支持主唱/对唱 agent 区分、`x-bg` 背景人声、`x-translation` 翻译、
//! `x-roman` 罗马音，以及音节间字面空格的精确保留。

use std::collections::HashMap;

use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};
use tracing::warn;
use uuid::Uuid;

use crate::{
    karaoke,
    parser::{
        types::{
            LyricLine, LyricsFormat, ParseError, ParsedLyrics, TtmlLyricLine, TtmlLyrics,
            TtmlPosition, TtmlSyllable, TtmlTranslation,
        },
        utils::{normalize_text_whitespace, parse_ttml_time_ms},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    PreRoot,
    InTt,
    InHead,
    InMetadata,
    InBody,
    InDiv,
    InP,
    InSpan,
    InTranslationSpan,
    InRomanSpan,
    InBgSpan,
    InBgInnerSpan,
    InBgTranslationSpan,
    InBgRomanSpan,
}

/// 正在构建中的一行歌词。
#[derive(Debug, Default)]
struct PendingLine {
    begin_ms: Option<u64>,
    end_ms: Option<u64>,
    position: TtmlPosition,
    lyrics: TtmlLyrics,
    background: Option<TtmlLyrics>,
    bg_begin_ms: Option<u64>,
    bg_end_ms: Option<u64>,
    /// `<p>` 元素的直接文本内容，用于逐行计时（无 span）的文档。
    plain_text: String,
}

/// 解析 TTML 格式内容到 [`ParsedLyrics`] 结构。
///
/// 每个 `<p>` 元素产出一行；`begin`/`end` 属性接受钟面或偏移时间表达式；
/// `ttm:agent` 与 head 中声明的主 agent 比对，决定主唱/对唱角色。
/// 行内 `<span>` 成为音节，缺失时间时回退为所属行（或背景组）的边界。
/// 音节间与音节内的尾随空格被计入 `trailing_space_count`，
/// 使拼接显示与源文件逐字符一致。
///
/// # 返回
/// `Err(ParseError)` - 仅当文档缺少 `<tt>` 根元素，或根元素之前的 XML
/// 已不可读。单行、单音节级别的损坏会被跳过并记录警告。
pub fn parse_ttml(content: &str) -> Result<ParsedLyrics, ParseError> {
    let mut reader = Reader::from_str(content);

    let mut state = ParseState::PreRoot;
    let mut lines: Vec<LyricLine> = Vec::new();
    let mut raw_metadata: HashMap<String, Vec<String>> = HashMap::new();
    let mut warnings: Vec<String> = Vec::new();

    let mut main_agent: Option<String> = None;
    let mut pending: Option<PendingLine> = None;
    let mut span_begin_ms: Option<u64> = None;
    let mut span_end_ms: Option<u64> = None;
    let mut translation_lang: Option<String> = None;
    let mut str_buf = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"tt" => {
                    if state == ParseState::PreRoot {
                        state = ParseState::InTt;
                    }
                }
                b"head" => {
                    if state == ParseState::InTt {
                        state = ParseState::InHead;
                    }
                }
                b"metadata" => {
                    if state == ParseState::InHead {
                        state = ParseState::InMetadata;
                    }
                }
                b"ttm:agent" => {
                    if state == ParseState::InMetadata {
                        register_agent(&e, &mut main_agent);
                    }
                }
                b"body" => {
                    if state == ParseState::InTt {
                        state = ParseState::InBody;
                    }
                }
                b"div" => {
                    if state == ParseState::InBody {
                        state = ParseState::InDiv;
                    }
                }
                b"p" => {
                    if matches!(state, ParseState::InDiv | ParseState::InBody) {
                        let mut line = PendingLine {
                            begin_ms: time_attr(&e, b"begin", &mut warnings),
                            end_ms: time_attr(&e, b"end", &mut warnings),
                            ..Default::default()
                        };
                        line.position = resolve_position(&e, main_agent.as_deref());
                        pending = Some(line);
                        state = ParseState::InP;
                    }
                }
                b"span" => match state {
                    ParseState::InP => {
                        str_buf.clear();
                        match attr_value(&e, b"ttm:role").as_deref() {
                            Some("x-bg") => {
                                if let Some(line) = pending.as_mut() {
                                    line.background = Some(TtmlLyrics::default());
                                    line.bg_begin_ms = time_attr(&e, b"begin", &mut warnings);
                                    line.bg_end_ms = time_attr(&e, b"end", &mut warnings);
                                }
                                state = ParseState::InBgSpan;
                            }
                            Some("x-translation") => {
                                translation_lang = attr_value(&e, b"xml:lang");
                                state = ParseState::InTranslationSpan;
                            }
                            Some("x-roman") => {
                                state = ParseState::InRomanSpan;
                            }
                            _ => {
                                span_begin_ms = time_attr(&e, b"begin", &mut warnings);
                                span_end_ms = time_attr(&e, b"end", &mut warnings);
                                state = ParseState::InSpan;
                            }
                        }
                    }
                    ParseState::InBgSpan => {
                        str_buf.clear();
                        match attr_value(&e, b"ttm:role").as_deref() {
                            Some("x-translation") => {
                                translation_lang = attr_value(&e, b"xml:lang");
                                state = ParseState::InBgTranslationSpan;
                            }
                            Some("x-roman") => {
                                state = ParseState::InBgRomanSpan;
                            }
                            _ => {
                                span_begin_ms = time_attr(&e, b"begin", &mut warnings);
                                span_end_ms = time_attr(&e, b"end", &mut warnings);
                                state = ParseState::InBgInnerSpan;
                            }
                        }
                    }
                    _ => {}
                },
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if state == ParseState::InMetadata {
                    match e.name().as_ref() {
                        b"ttm:agent" => register_agent(&e, &mut main_agent),
                        b"amll:meta" => register_meta(&e, &mut raw_metadata),
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"tt" => state = ParseState::PreRoot,
                b"head" => {
                    if state == ParseState::InHead {
                        state = ParseState::InTt;
                    }
                }
                b"metadata" => {
                    if state == ParseState::InMetadata {
                        state = ParseState::InHead;
                    }
                }
                b"body" => {
                    if state == ParseState::InBody {
                        state = ParseState::InTt;
                    }
                }
                b"div" => {
                    if state == ParseState::InDiv {
                        state = ParseState::InBody;
                    }
                }
                b"p" => {
                    if state == ParseState::InP {
                        if let Some(line) = pending.take()
                            && let Some(line) = finalize_line(line, &mut warnings)
                        {
                            lines.push(line);
                        }
                        state = ParseState::InDiv;
                    }
                }
                b"span" => match state {
                    ParseState::InSpan => {
                        if let Some(line) = pending.as_mut() {
                            push_syllable(
                                &mut line.lyrics.children,
                                &str_buf,
                                span_begin_ms.or(line.begin_ms),
                                span_end_ms.or(line.end_ms),
                                &mut warnings,
                            );
                        }
                        str_buf.clear();
                        state = ParseState::InP;
                    }
                    ParseState::InBgInnerSpan => {
                        if let Some(line) = pending.as_mut() {
                            let parent_begin = span_begin_ms.or(line.bg_begin_ms);
                            let parent_end = span_end_ms.or(line.bg_end_ms);
                            if let Some(background) = line.background.as_mut() {
                                push_syllable(
                                    &mut background.children,
                                    &str_buf,
                                    parent_begin,
                                    parent_end,
                                    &mut warnings,
                                );
                            }
                        }
                        str_buf.clear();
                        state = ParseState::InBgSpan;
                    }
                    ParseState::InBgSpan => {
                        str_buf.clear();
                        state = ParseState::InP;
                    }
                    ParseState::InTranslationSpan | ParseState::InBgTranslationSpan => {
                        let text = normalize_text_whitespace(&str_buf);
                        let lang = translation_lang.take();
                        if !text.is_empty()
                            && let Some(line) = pending.as_mut()
                        {
                            let target = if state == ParseState::InBgTranslationSpan {
                                line.background.as_mut()
                            } else {
                                Some(&mut line.lyrics)
                            };
                            if let Some(lyrics) = target {
                                lyrics.translations.push(TtmlTranslation { lang, text });
                            }
                        }
                        str_buf.clear();
                        state = if state == ParseState::InBgTranslationSpan {
                            ParseState::InBgSpan
                        } else {
                            ParseState::InP
                        };
                    }
                    ParseState::InRomanSpan | ParseState::InBgRomanSpan => {
                        let text = normalize_text_whitespace(&str_buf);
                        if !text.is_empty()
                            && let Some(line) = pending.as_mut()
                        {
                            let target = if state == ParseState::InBgRomanSpan {
                                line.background.as_mut()
                            } else {
                                Some(&mut line.lyrics)
                            };
                            if let Some(lyrics) = target {
                                lyrics.roman = Some(text);
                            }
                        }
                        str_buf.clear();
                        state = if state == ParseState::InBgRomanSpan {
                            ParseState::InBgSpan
                        } else {
                            ParseState::InP
                        };
                    }
                    _ => {}
                },
                _ => {}
            },
            Ok(Event::Text(t)) => {
                if let Ok(text) = t.xml_content() {
                    match state {
                        ParseState::InSpan
                        | ParseState::InBgInnerSpan
                        | ParseState::InTranslationSpan
                        | ParseState::InRomanSpan
                        | ParseState::InBgTranslationSpan
                        | ParseState::InBgRomanSpan => str_buf.push_str(&text),
                        ParseState::InP => {
                            if let Some(line) = pending.as_mut() {
                                if text.trim().is_empty() {
                                    apply_inter_span_spacing(&mut line.lyrics.children, &text);
                                } else {
                                    line.plain_text.push_str(&text);
                                }
                            }
                        }
                        ParseState::InBgSpan => {
                            if text.trim().is_empty()
                                && let Some(background) =
                                    pending.as_mut().and_then(|l| l.background.as_mut())
                            {
                                apply_inter_span_spacing(&mut background.children, &text);
                            }
                        }
                        _ => {}
                    }
                }
            }
            Ok(_) => {}
            Err(e) => {
                // 根元素之后的 XML 错误只截断文档，保留已解析的行
                if state == ParseState::PreRoot {
                    return Err(ParseError::Xml(e));
                }
                warn!("TTML 解析在中途遇到 XML 错误，已截断: {e}");
                warnings.push(format!("TTML 解析警告: 文档在中途损坏，已截断 ({e})。"));
                break;
            }
        }
    }

    if state == ParseState::PreRoot && lines.is_empty() && pending.is_none() {
        // 从未进入 <tt> 根元素
        if !document_had_root(content) {
            return Err(ParseError::InvalidLyricFormat(
                "缺少 TTML 根元素 <tt>".to_string(),
            ));
        }
    }

    Ok(ParsedLyrics {
        format: LyricsFormat::Ttml,
        lines,
        raw_metadata,
        warnings,
    })
}

/// 判断文档是否出现过 `<tt>` 根元素（解析结束后的兜底检查）。
fn document_had_root(content: &str) -> bool {
    let mut reader = Reader::from_str(content);
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

/// 读取一个属性的字符串值。
fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .map(|attr| String::from_utf8_lossy(&attr.value).into_owned())
}

/// 读取并解析一个时间属性，失败时记录警告并返回 `None`。
fn time_attr(e: &BytesStart<'_>, key: &[u8], warnings: &mut Vec<String>) -> Option<u64> {
    let value = attr_value(e, key)?;
    match parse_ttml_time_ms(&value) {
        Ok(ms) => Some(ms),
        Err(_) => {
            warn!("TTML 解析: 无效的时间表达式 '{value}'");
            warnings.push(format!("TTML 解析警告: 无效的时间表达式 '{value}'，已忽略。"));
            None
        }
    }
}

/// 从 head 元数据中的 `ttm:agent` 声明里识别主 agent（第一个 person）。
fn register_agent(e: &BytesStart<'_>, main_agent: &mut Option<String>) {
    if main_agent.is_some() {
        return;
    }
    let agent_type = attr_value(e, b"type");
    let agent_id = attr_value(e, b"xml:id");
    if agent_type.as_deref() == Some("person")
        && let Some(id) = agent_id
    {
        *main_agent = Some(id);
    }
}

/// 将 `amll:meta` 的键值对存入原始元数据。
fn register_meta(e: &BytesStart<'_>, raw_metadata: &mut HashMap<String, Vec<String>>) {
    let key = attr_value(e, b"key");
    let value = attr_value(e, b"value");
    if let (Some(key), Some(value)) = (key, value)
        && !key.is_empty()
    {
        raw_metadata.entry(key).or_default().push(value);
    }
}

/// 根据 `ttm:agent` 属性决定行的角色。
///
/// 与 head 中声明的主 agent 一致（或属性缺失）为主唱，否则为对唱。
/// 未声明主 agent 时按惯例将 `v1` 视为主唱。
fn resolve_position(e: &BytesStart<'_>, main_agent: Option<&str>) -> TtmlPosition {
    match attr_value(e, b"ttm:agent") {
        None => TtmlPosition::Main,
        Some(agent) => {
            let is_main = match main_agent {
                Some(main) => agent == main,
                None => agent == "v1",
            };
            if is_main {
                TtmlPosition::Main
            } else {
                TtmlPosition::Sub
            }
        }
    }
}

/// 将一个 span 的原始文本转为音节并追加到列表。
///
/// 前导空格归入前一个音节的尾随空格计数（行内首个音节没有前驱，
/// 前导空格保留在其文本中）；尾随空格记入本音节。
/// 缺失时间边界（span 与所属行均未提供）的音节会被跳过并记录警告。
fn push_syllable(
    children: &mut Vec<TtmlSyllable>,
    raw_text: &str,
    begin_ms: Option<u64>,
    end_ms: Option<u64>,
    warnings: &mut Vec<String>,
) {
    // 前导空格归入前一个音节的尾随空格；首个音节没有前驱，
    // 空格保留在自身文本里，整行拼接仍与源文件逐字符一致
    let stripped = raw_text.trim_start_matches(' ');
    let leading_spaces = raw_text.len() - stripped.len();
    let kept = if leading_spaces > 0
        && let Some(last) = children.last_mut()
    {
        last.trailing_space_count += leading_spaces;
        stripped
    } else {
        raw_text
    };

    let text = kept.trim_end_matches(' ');
    let trailing_spaces = kept.len() - text.len();
    if text.is_empty() {
        return;
    }

    let (Some(begin_ms), Some(end_ms)) = (begin_ms, end_ms) else {
        warn!("TTML 解析: 音节 '{text}' 缺少时间边界，已跳过");
        warnings.push(format!("TTML 解析警告: 音节 '{text}' 缺少时间边界，已跳过。"));
        return;
    };

    children.push(TtmlSyllable {
        text: text.to_string(),
        begin_ms,
        end_ms,
        trailing_space_count: trailing_spaces,
    });
}

/// 将 span 之间的空白文本计入前一个音节的尾随空格。
///
/// 未格式化文档中的空白逐字符保留；含换行的空白视为格式化缩进，按一个空格计。
fn apply_inter_span_spacing(children: &mut [TtmlSyllable], text: &str) {
    let Some(last) = children.last_mut() else {
        return;
    };
    let count = if text.contains('\n') {
        1
    } else {
        text.chars().filter(|c| *c == ' ').count()
    };
    last.trailing_space_count += count;
}

/// 收尾一行：补齐行边界、剥离背景人声括号、派生元音时间标记。
fn finalize_line(mut pending: PendingLine, warnings: &mut Vec<String>) -> Option<LyricLine> {
    // 无 span 的逐行计时文档：整行文本作为单个音节
    if pending.lyrics.children.is_empty() {
        let plain = normalize_text_whitespace(&pending.plain_text);
        if !plain.is_empty() {
            let (Some(begin_ms), Some(end_ms)) = (pending.begin_ms, pending.end_ms) else {
                warn!("TTML 解析: 行 '{plain}' 缺少时间边界，已跳过");
                warnings.push(format!("TTML 解析警告: 行 '{plain}' 缺少时间边界，已跳过。"));
                return None;
            };
            pending.lyrics.children.push(TtmlSyllable {
                text: plain,
                begin_ms,
                end_ms,
                trailing_space_count: 0,
            });
        }
    }

    let background = pending.background.take().and_then(|mut background| {
        strip_background_parentheses(&mut background.children);
        if background.is_empty() {
            None
        } else {
            background.vowel_times = karaoke::collect_vowel_times(&background.children);
            Some(background)
        }
    });

    if pending.lyrics.is_empty() && background.is_none() {
        return None;
    }

    let begin_ms = pending
        .begin_ms
        .or_else(|| pending.lyrics.children.first().map(|s| s.begin_ms));
    let end_ms = pending
        .end_ms
        .or_else(|| pending.lyrics.children.last().map(|s| s.end_ms));

    pending.lyrics.vowel_times = karaoke::collect_vowel_times(&pending.lyrics.children);

    Some(LyricLine::Ttml(TtmlLyricLine {
        id: Uuid::new_v4(),
        begin_ms,
        end_ms,
        position: pending.position,
        lyrics: pending.lyrics,
        background_lyrics: background,
    }))
}

/// 剥离背景人声首尾音节上的装饰性括号。
fn strip_background_parentheses(children: &mut [TtmlSyllable]) {
    if let Some(first) = children.first_mut()
        && let Some(stripped) = first.text.strip_prefix('(')
    {
        first.text = stripped.to_string();
    }
    if let Some(last) = children.last_mut()
        && let Some(stripped) = last.text.strip_suffix(')')
    {
        last.text = stripped.to_string();
    }
}
