//! ロガーの設定

use std::path::{Path, PathBuf};

use time::format_description;

use crate::error::{Error, Result};
use crate::formatter::Record;
use crate::severity::Severity;

/// 既定のタイムスタンプ書式（`YYYY/MM/DD HH:MM:SS`）
pub const DEFAULT_DATEFMT: &str = "[year]/[month]/[day] [hour]:[minute]:[second]";
/// 既定の区切り文字
pub const DEFAULT_DELIMITER: char = ',';
/// 1ファイルあたりの既定の最大サイズ（10MiB）
pub const DEFAULT_MAX_SIZE: u64 = 10 * 1024 * 1024;
/// 既定の最大バックアップファイル数
pub const DEFAULT_MAX_FILES: u16 = 10;

/// 記録する最低の重要度
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MinLevel {
    /// 登録簿に存在する重要度の名前
    Name(String),
    /// 優先度
    Priority(u32),
}

impl Default for MinLevel {
    fn default() -> Self {
        MinLevel::Priority(Severity::INFO.priority())
    }
}

impl From<&str> for MinLevel {
    fn from(name: &str) -> Self {
        MinLevel::Name(name.to_string())
    }
}

impl From<String> for MinLevel {
    fn from(name: String) -> Self {
        MinLevel::Name(name)
    }
}

impl From<u32> for MinLevel {
    fn from(priority: u32) -> Self {
        MinLevel::Priority(priority)
    }
}

impl From<Severity> for MinLevel {
    fn from(severity: Severity) -> Self {
        MinLevel::Priority(severity.priority())
    }
}

/// ロガーの設定
///
/// `LoggerConfig::new`で既定値を持つ設定を作成し、各メソッドで値を上書きする。
///
/// ```
/// use rolling_record_logger::LoggerConfig;
///
/// let config = LoggerConfig::new("logs/log.csv")
///     .max_size(1024)
///     .max_files(4)
///     .header(vec!["date", "value_1", "value_2"]);
/// assert_eq!(4, config.get_max_files());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LoggerConfig {
    path: PathBuf,
    delimiter: char,
    level: MinLevel,
    custom_levels: Vec<String>,
    custom_level_priorities: Option<Vec<u32>>,
    fmt: Option<String>,
    datefmt: String,
    max_size: u64,
    max_files: u16,
    header: Option<Record>,
}

impl LoggerConfig {
    /// 既定値を持つ設定を作成する。
    ///
    /// # 引数
    ///
    /// * path: ログファイルのパス。ディレクトリを含む場合、ロガーの作成時に作成する。
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            delimiter: DEFAULT_DELIMITER,
            level: MinLevel::default(),
            custom_levels: Vec::new(),
            custom_level_priorities: None,
            fmt: None,
            datefmt: DEFAULT_DATEFMT.to_string(),
            max_size: DEFAULT_MAX_SIZE,
            max_files: DEFAULT_MAX_FILES,
            header: None,
        }
    }

    /// フィールドの区切り文字。書き込み、ヘッダーの分割、読み込みのすべてで使用する。
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn level(mut self, level: impl Into<MinLevel>) -> Self {
        self.level = level.into();
        self
    }

    /// ロガーの作成時に登録するカスタム重要度の名前
    pub fn custom_levels<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.custom_levels = names.into_iter().map(Into::into).collect();
        self
    }

    /// カスタム重要度の優先度。`custom_levels`と同じ順序、同じ数で指定する。
    /// 指定しない場合は自動で割り当てる。
    pub fn custom_level_priorities(mut self, priorities: impl IntoIterator<Item = u32>) -> Self {
        self.custom_level_priorities = Some(priorities.into_iter().collect());
        self
    }

    /// 行の書式
    ///
    /// `{timestamp}`、`{severity}`、`{priority}`、`{message}`を置換する。
    /// 指定しない場合は`{timestamp}<区切り文字>{message}`となる。
    pub fn fmt(mut self, fmt: impl Into<String>) -> Self {
        self.fmt = Some(fmt.into());
        self
    }

    /// タイムスタンプの書式（`time`クレートの書式記述）
    pub fn datefmt(mut self, datefmt: impl Into<String>) -> Self {
        self.datefmt = datefmt.into();
        self
    }

    /// 1ファイルあたりの最大バイト数。`0`の場合はローテーションしない。
    pub fn max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    /// 残すバックアップファイルの最大数
    pub fn max_files(mut self, max_files: u16) -> Self {
        self.max_files = max_files;
        self
    }

    /// 各ファイルの先頭に書き込むヘッダー。フィールドの列、または区切り済みの文字列。
    pub fn header(mut self, header: impl Into<Record>) -> Self {
        self.header = Some(header.into());
        self
    }

    pub fn get_path(&self) -> &Path {
        &self.path
    }

    pub fn get_delimiter(&self) -> char {
        self.delimiter
    }

    pub fn get_level(&self) -> &MinLevel {
        &self.level
    }

    pub fn get_custom_levels(&self) -> &[String] {
        &self.custom_levels
    }

    pub fn get_custom_level_priorities(&self) -> Option<&[u32]> {
        self.custom_level_priorities.as_deref()
    }

    pub fn get_datefmt(&self) -> &str {
        &self.datefmt
    }

    pub fn get_max_size(&self) -> u64 {
        self.max_size
    }

    pub fn get_max_files(&self) -> u16 {
        self.max_files
    }

    pub fn get_header(&self) -> Option<&Record> {
        self.header.as_ref()
    }

    /// 実際に使用する行の書式を返却する。
    pub fn line_template(&self) -> String {
        match &self.fmt {
            Some(fmt) => fmt.clone(),
            None => format!("{{timestamp}}{}{{message}}", self.delimiter),
        }
    }

    /// 設定値を検証する。
    pub fn validate(&self) -> Result<()> {
        if self.path.file_name().is_none() {
            return Err(Error::InvalidConfig(format!(
                "log file path {} has no file name",
                self.path.display()
            )));
        }
        if matches!(self.delimiter, '\n' | '\r') {
            return Err(Error::InvalidConfig(
                "delimiter must not be a line terminator".to_string(),
            ));
        }
        if !self.line_template().contains("{message}") {
            return Err(Error::InvalidConfig(
                "line format must contain a {message} placeholder".to_string(),
            ));
        }
        format_description::parse_owned::<2>(&self.datefmt)?;
        if let Some(priorities) = &self.custom_level_priorities {
            if priorities.len() != self.custom_levels.len() {
                return Err(Error::InvalidConfig(format!(
                    "{} custom level priorities given for {} custom levels",
                    priorities.len(),
                    self.custom_levels.len()
                )));
            }
        }

        Ok(())
    }
}
