//! エラー型

use std::io;
use std::path::PathBuf;

/// このクレートの処理結果
pub type Result<T> = std::result::Result<T, Error>;

/// ロガーの構築、書き込み、読み込みで発生するエラー
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// ログファイルを格納するディレクトリを作成できなかった。
    #[error("failed to create log directory at {path}: {source}")]
    CreateDirectory { path: PathBuf, source: io::Error },

    /// ログファイルを開けなかった。
    #[error("failed to open log file {path}: {source}")]
    Open { path: PathBuf, source: io::Error },

    /// ローテーション中にファイルの名前を変更できなかった。
    #[error("failed to rotate {from} to {to}: {source}")]
    Rotation {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },

    /// ファイルの読み書きに失敗した。
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// 設定値が不正。
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// 日付書式を解析できなかった。
    #[error("invalid date format: {0}")]
    DateFormat(#[from] time::error::InvalidFormatDescription),

    /// タイムスタンプを書式化できなかった。
    #[error("failed to format timestamp: {0}")]
    TimestampFormat(#[from] time::error::Format),

    /// 登録しようとしたレベル名が既に存在する。
    #[error("severity name `{name}` is already registered")]
    LevelCollision { name: String },

    /// 登録しようとした優先度が既に存在する。
    #[error("severity priority {priority} is already used by `{existing}`")]
    PriorityCollision { priority: u32, existing: String },

    /// レベル名として使用できない文字列。
    #[error("invalid severity name `{0}`")]
    InvalidLevelName(String),

    /// 登録されていないレベル名。
    #[error("unknown severity `{0}`")]
    UnknownLevel(String),

    /// 同期オブジェクトがポイズニングされている。
    #[error("some synchronization object is poisoned")]
    Poison,
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(e) => e,
            other => io::Error::new(io::ErrorKind::Other, other),
        }
    }
}
