//! 定义了整个 `lyrics-sync` 库的错误类型 `LyricsSyncError`。

use thiserror::Error;

use crate::parser::ParseError;

/// `lyrics-sync` 库的通用错误枚举。
///
/// 会话层会自行捕获解析错误并降级为空结果，此类型主要供直接调用
/// 解析入口的使用方处理。
#[derive(Error, Debug)]
pub enum LyricsSyncError {
    /// XML 解析失败 (源自 `quick_xml::Error`)
    #[error("XML 解析失败: {0}")]
    XmlParse(#[from] quick_xml::Error),

    /// 无效的时间格式
    #[error("无效的时间格式: {0}")]
    InvalidTime(String),

    /// 通用的歌词解析错误
    #[error("歌词解析失败: {0}")]
    Parser(String),
}

/// `LyricsSyncError` 的 `Result` 类型别名，方便在函数签名中使用。
pub type Result<T> = std::result::Result<T, LyricsSyncError>;

impl From<ParseError> for LyricsSyncError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Xml(e) => Self::XmlParse(e),
            ParseError::InvalidTime(s) => Self::InvalidTime(s),
            ParseError::InvalidLyricFormat(s) => Self::Parser(s),
        }
    }
}
