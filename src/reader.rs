//! ログファイルの読み込み
//!
//! 書き込み中のファイルとすべてのバックアップを読み込み、区切り文字で分割した
//! 行として返却する。書き込み側とはロックを共有しないため、読み込み中に
//! ローテーションが起きると、消えたファイルや空になったファイルを読むことがある。

use std::fs;
use std::io;
use std::ops::Deref;
use std::path::PathBuf;

use crate::config::LoggerConfig;
use crate::error::Result;
use crate::formatter::Formatter;
use crate::rotation::RotationPolicy;
use crate::value::Value;

/// 読み込んだ1行
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow(Vec<Value>);

impl ParsedRow {
    pub fn fields(&self) -> &[Value] {
        &self.0
    }

    pub fn into_fields(self) -> Vec<Value> {
        self.0
    }

    /// 各フィールドを文字列として返却する。
    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }
}

impl Deref for ParsedRow {
    type Target = [Value];

    fn deref(&self) -> &[Value] {
        &self.0
    }
}

impl From<Vec<Value>> for ParsedRow {
    fn from(fields: Vec<Value>) -> Self {
        Self(fields)
    }
}

impl IntoIterator for ParsedRow {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// ログファイルの読み込み器
///
/// 書き込み中のロガーがなくても、設定だけから作成できる。
#[derive(Debug, Clone)]
pub struct LogReader {
    policy: RotationPolicy,
    formatter: Formatter,
    header: Option<Vec<String>>,
}

impl LogReader {
    pub fn new(config: &LoggerConfig) -> Result<Self> {
        let formatter = Formatter::new(config)?;
        let header = config
            .get_header()
            .map(|header| formatter.header_fields(header))
            .transpose()?;

        Ok(Self {
            policy: RotationPolicy::new(
                config.get_path(),
                config.get_max_size(),
                config.get_max_files(),
            ),
            formatter,
            header,
        })
    }

    /// 読み込むファイルを、読み込む順に返却する。
    ///
    /// 番号の大きい（古い）バックアップから順に並べ、書き込み中のファイルを最後にする。
    pub fn log_files(&self) -> Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = self
            .policy
            .backups()?
            .into_iter()
            .map(|(_, path)| path)
            .collect();
        if self.policy.path().is_file() {
            files.push(self.policy.path().to_path_buf());
        }

        Ok(files)
    }

    /// すべてのログを読み込む。
    ///
    /// # 引数
    ///
    /// - evaluate: `true`の場合、各フィールドを数値、タイムスタンプ、文字列の順に変換する。
    ///   `false`の場合は、すべて文字列のまま返却する。
    ///
    /// # 戻り値
    ///
    /// ヘッダー行を除いた、すべての行。
    pub fn get_logs(&self, evaluate: bool) -> Result<Vec<ParsedRow>> {
        let mut rows = Vec::new();
        for path in self.log_files()? {
            let bytes = match fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    tracing::warn!(path = %path.display(), "log file disappeared before it was read");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            let content = String::from_utf8_lossy(&bytes);
            rows.extend(content.lines().filter_map(|line| self.parse_line(line, evaluate)));
        }

        Ok(rows)
    }

    /// 1行を分割する。空行とヘッダー行の場合は`None`を返却する。
    ///
    /// 列数はヘッダーと照合しない。
    pub fn parse_line(&self, line: &str, evaluate: bool) -> Option<ParsedRow> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            return None;
        }

        let tokens: Vec<&str> = line.split(self.formatter.delimiter()).collect();
        if let Some(header) = &self.header {
            if header.iter().map(String::as_str).eq(tokens.iter().copied()) {
                return None;
            }
        }

        let fields = tokens
            .into_iter()
            .map(|token| {
                if evaluate {
                    Value::coerce(token, self.formatter.datefmt())
                } else {
                    Value::Str(token.to_string())
                }
            })
            .collect();

        Some(ParsedRow(fields))
    }
}
