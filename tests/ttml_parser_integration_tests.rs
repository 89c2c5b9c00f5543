use std::path::Path;

use lyrics_sync_rs::parser::{LyricLine, TtmlPosition, parse_ttml};

fn load_test_data(filename: &str) -> String {
    let path = Path::new("tests/test_data").join(filename);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("读取测试文件 '{:?}' 失败: {}", path, e))
}

fn ttml_line(line: &LyricLine) -> &lyrics_sync_rs::parser::TtmlLyricLine {
    match line {
        LyricLine::Ttml(line) => line,
        other => panic!("应为 TTML 行, 实际为 {other:?}"),
    }
}

#[test]
fn test_parse_word_timed_basic() {
    let content = load_test_data("word_timed_basic.ttml");
    let result = parse_ttml(&content).unwrap();

    assert_eq!(result.lines.len(), 1);
    let line = ttml_line(&result.lines[0]);
    assert_eq!(line.begin_ms, Some(5000));
    assert_eq!(line.end_ms, Some(6200));

    let syllables = &line.lyrics.children;
    assert_eq!(syllables.len(), 2, "应该有两个音节");

    assert_eq!(syllables[0].text, "Hello");
    assert_eq!(syllables[0].begin_ms, 5000);
    assert_eq!(syllables[0].end_ms, 5500);
    assert_eq!(syllables[0].trailing_space_count, 1, "第一个音节后面应该有空格");

    assert_eq!(syllables[1].text, "world");
    assert_eq!(syllables[1].begin_ms, 5600);
    assert_eq!(syllables[1].end_ms, 6200);
    assert_eq!(syllables[1].trailing_space_count, 0);
}

#[test]
fn test_spacing_round_trip() {
    let content = load_test_data("word_timed_basic.ttml");
    let result = parse_ttml(&content).unwrap();

    // 音节文本连同尾随空格拼接后应与源文件中的整行拼写一致
    assert_eq!(result.lines[0].text(), "Hello world");
}

#[test]
fn test_parse_line_timed_basic() {
    let content = load_test_data("line_timed_basic.ttml");
    let result = parse_ttml(&content).unwrap();

    assert_eq!(result.lines.len(), 2, "应该解析两行歌词");

    let first = ttml_line(&result.lines[0]);
    assert_eq!(first.begin_ms, Some(10_000));
    assert_eq!(first.end_ms, Some(15_500));
    assert_eq!(first.lyrics.children.len(), 1, "逐行歌词整行作为单个音节");
    assert_eq!(result.lines[0].text(), "这是一行歌词.");
    assert_eq!(result.lines[1].text(), "第二行.");
}

#[test]
fn test_agent_positions() {
    let content = load_test_data("duet_with_background.ttml");
    let result = parse_ttml(&content).unwrap();

    assert_eq!(result.lines.len(), 2);
    assert_eq!(ttml_line(&result.lines[0]).position, TtmlPosition::Main);
    assert_eq!(
        ttml_line(&result.lines[1]).position,
        TtmlPosition::Sub,
        "非主 agent 的行应为对唱"
    );
}

#[test]
fn test_translation_and_roman() {
    let content = load_test_data("duet_with_background.ttml");
    let result = parse_ttml(&content).unwrap();

    let line = ttml_line(&result.lines[0]);
    assert_eq!(line.lyrics.translations.len(), 1);
    assert_eq!(line.lyrics.translations[0].text, "中文翻译");
    assert_eq!(line.lyrics.translations[0].lang.as_deref(), Some("zh-Hans"));
    assert_eq!(line.lyrics.roman.as_deref(), Some("zhu chang"));
}

#[test]
fn test_background_vocals() {
    let content = load_test_data("duet_with_background.ttml");
    let result = parse_ttml(&content).unwrap();

    let line = ttml_line(&result.lines[0]);
    let background = line
        .background_lyrics
        .as_ref()
        .expect("第一行应携带背景人声");

    assert_eq!(background.children.len(), 2);
    // 首尾音节上的装饰性括号应被剥离
    assert_eq!(background.children[0].text, "Ooh");
    assert_eq!(background.children[1].text, "aah");
    assert_eq!(background.children[0].begin_ms, 13_000);
    assert_eq!(background.children[1].end_ms, 15_000);
}

#[test]
fn test_vowel_times_derived_at_parse() {
    let content = load_test_data("duet_with_background.ttml");
    let result = parse_ttml(&content).unwrap();

    let line = ttml_line(&result.lines[0]);
    // 主唱音节都不命中元音簇模式
    assert!(line.lyrics.vowel_times.is_empty());
    // 背景人声的 "Ooh" 和 "aah" 都是元音加 h/m 尾音的元音簇
    let background = line.background_lyrics.as_ref().unwrap();
    assert_eq!(background.vowel_times, vec![13_000, 14_000]);
}

#[test]
fn test_metadata_extraction() {
    let content = load_test_data("duet_with_background.ttml");
    let result = parse_ttml(&content).unwrap();

    assert_eq!(result.raw_metadata.get("musicName").unwrap()[0], "测试曲目");
    assert_eq!(result.raw_metadata.get("artists").unwrap()[0], "测试歌手");
}
