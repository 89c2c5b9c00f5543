use std::path::Path;

use lyrics_sync_rs::{
    karaoke,
    parser::{LyricLine, LyricsFormat},
    session::{LyricsSession, TrackId},
};

fn load_test_data(filename: &str) -> String {
    let path = Path::new("tests/test_data").join(filename);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("读取测试文件 '{:?}' 失败: {}", path, e))
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,lyrics_sync_rs=debug"));
    let _ = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

#[test]
fn test_lrc_full_flow() {
    init_tracing();
    let content = load_test_data("translated.lrc");
    let mut session = LyricsSession::new();
    session.identify(Some(TrackId::from("file:///music/star-summer.flac")));
    session.load(Some(&content), true);

    assert_eq!(session.format(), Some(LyricsFormat::Lrc));
    // 一行单时间戳 + 一行双时间戳, 共三行
    assert_eq!(session.lines().len(), 3);

    let LyricLine::Lrc(first) = &session.lines()[0] else {
        panic!("应为 LRC 行");
    };
    assert_eq!(first.translation.as_deref(), Some("夏日微風正暖"));

    let metadata = &session.parsed().unwrap().raw_metadata;
    assert_eq!(metadata.get("ti").unwrap()[0], "星夏");
    assert_eq!(metadata.get("ar").unwrap()[0], "小蓝背心");

    // 播放推进时的高亮区间
    assert!(session.highlight(5_000, None).is_empty(), "开唱前无高亮");
    assert_eq!(session.highlight(11_000, None), 0..1);
    assert_eq!(session.highlight(16_000, None), 1..2);
}

#[test]
fn test_ttml_full_flow_with_karaoke() {
    let content = load_test_data("word_timed_basic.ttml");
    let mut session = LyricsSession::new();
    session.identify(Some(TrackId::from("file:///music/song.flac")));
    session.load(Some(&content), true);

    assert_eq!(session.format(), Some(LyricsFormat::Ttml));
    assert_eq!(session.highlight(5_200, None), 0..1);

    // 逐字进度: 第一个音节唱到一半, 第二个还没开始
    let LyricLine::Ttml(line) = &session.lines()[0] else {
        panic!("应为 TTML 行");
    };
    let progress = karaoke::line_progress(&line.lyrics.children, 5_250);
    assert!((progress[0] - 0.5).abs() < 1e-9);
    assert_eq!(progress[1], 0.0);

    // 回退播放后重新查询, 得到完全相同的结果
    let replayed = karaoke::line_progress(&line.lyrics.children, 5_250);
    assert_eq!(progress, replayed);
}

#[test]
fn test_track_switch_discards_stale_queries() {
    let lrc = load_test_data("translated.lrc");
    let ttml = load_test_data("word_timed_basic.ttml");

    let mut session = LyricsSession::new();
    let track_a = TrackId::from("file:///music/a.flac");
    let track_b = TrackId::from("file:///music/b.flac");

    session.identify(Some(track_a.clone()));
    session.load(Some(&lrc), true);
    assert_eq!(session.highlight(11_000, Some(&track_a)), 0..1);

    // 切歌: 先清空, 新文本稍后才到达
    session.clear(Some(track_b.clone()));
    assert!(session.lines().is_empty(), "间隙期间不应展示旧歌词");

    // 新文本到达并加载后, 旧曲目的迟到查询仍被拦截
    session.load(Some(&ttml), true);
    assert_eq!(session.highlight(5_200, Some(&track_a)), 0..0);
    assert_eq!(session.highlight(5_200, Some(&track_b)), 0..1);
}

#[test]
fn test_reload_same_text_keeps_line_identity() {
    let content = load_test_data("translated.lrc");
    let mut session = LyricsSession::new();
    session.load(Some(&content), true);

    let ids: Vec<_> = session.lines().iter().map(LyricLine::id).collect();
    let generation = session.generation();

    session.load(Some(&content), true);
    let ids_after: Vec<_> = session.lines().iter().map(LyricLine::id).collect();

    assert_eq!(session.generation(), generation, "去抖命中时不应重解析");
    assert_eq!(ids, ids_after, "行标识应保持不变");
}

#[test]
fn test_raw_fallback_for_plain_text() {
    let mut session = LyricsSession::new();
    session.load(Some("只是一些没有时间信息的文字\n第二行"), true);

    assert_eq!(session.format(), Some(LyricsFormat::Raw));
    assert_eq!(session.lines().len(), 2);
    // Raw 歌词不参与高亮
    assert!(session.highlight(10_000, None).is_empty());
}
