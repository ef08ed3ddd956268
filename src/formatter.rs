//! レコードを1行のテキストに整形する。
//!
//! データのレコードは行の書式に埋め込んで出力し、ヘッダーは同じ区切り文字で
//! 連結しただけの行として出力する。

use std::sync::OnceLock;

use regex::Regex;
use time::format_description::{self, OwnedFormatItem};
use time::OffsetDateTime;

use crate::config::LoggerConfig;
use crate::error::Result;
use crate::severity::Severity;
use crate::value::Value;

/// 1回の記録で渡される内容
///
/// フィールドの列は区切り文字で連結し、文字列はそのままメッセージとして扱う。
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Fields(Vec<Value>),
    Line(String),
}

impl<T: Into<Value>> From<Vec<T>> for Record {
    fn from(fields: Vec<T>) -> Self {
        Record::Fields(fields.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Record {
    fn from(fields: [T; N]) -> Self {
        Record::Fields(fields.into_iter().map(Into::into).collect())
    }
}

impl From<&str> for Record {
    fn from(line: &str) -> Self {
        Record::Line(line.to_string())
    }
}

impl From<String> for Record {
    fn from(line: String) -> Self {
        Record::Line(line)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Timestamp,
    Severity,
    Priority,
    Message,
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{(timestamp|severity|priority|message)\}")
            .expect("Unable to compile the placeholder pattern; this is a bug in rolling-record-logger")
    })
}

/// 行の書式を、リテラルとプレースホルダーの列に分解する。
fn parse_template(template: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last = 0;
    for captures in placeholder_pattern().captures_iter(template) {
        let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        if whole.start() > last {
            segments.push(Segment::Literal(template[last..whole.start()].to_string()));
        }
        segments.push(match name.as_str() {
            "timestamp" => Segment::Timestamp,
            "severity" => Segment::Severity,
            "priority" => Segment::Priority,
            _ => Segment::Message,
        });
        last = whole.end();
    }
    if last < template.len() {
        segments.push(Segment::Literal(template[last..].to_string()));
    }

    segments
}

/// 改行を空白に置き換え、必ず1行にする。
fn single_line(line: String) -> String {
    if !line.contains(['\n', '\r']) {
        return line;
    }
    line.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

/// 現在時刻。ローカルのオフセットを取得できない場合はUTCとする。
pub(crate) fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// レコードの整形器
#[derive(Debug, Clone)]
pub struct Formatter {
    delimiter: char,
    template: Vec<Segment>,
    datefmt: OwnedFormatItem,
}

impl Formatter {
    pub fn new(config: &LoggerConfig) -> Result<Self> {
        Ok(Self {
            delimiter: config.get_delimiter(),
            template: parse_template(&config.line_template()),
            datefmt: format_description::parse_owned::<2>(config.get_datefmt())?,
        })
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    pub fn datefmt(&self) -> &OwnedFormatItem {
        &self.datefmt
    }

    /// データのレコードを行の書式に従って整形する。
    ///
    /// # 引数
    ///
    /// * record: 記録する内容。
    /// * severity: レコードの重要度。
    /// * timestamp: レコードの時刻。
    ///
    /// # 戻り値
    ///
    /// 改行を含まない1行。
    pub fn format_record(
        &self,
        record: &Record,
        severity: &Severity,
        timestamp: OffsetDateTime,
    ) -> Result<String> {
        let mut line = String::new();
        for segment in &self.template {
            match segment {
                Segment::Literal(text) => line.push_str(text),
                Segment::Timestamp => line.push_str(&timestamp.format(&self.datefmt)?),
                Segment::Severity => line.push_str(severity.name()),
                Segment::Priority => line.push_str(&severity.priority().to_string()),
                Segment::Message => line.push_str(&self.format_message(record)?),
            }
        }

        Ok(single_line(line))
    }

    /// ヘッダーを整形する。行の書式は適用せず、フィールドを連結するだけ。
    pub fn format_header(&self, header: &Record) -> Result<String> {
        Ok(single_line(self.format_message(header)?))
    }

    /// ヘッダーをフィールドに分割して返却する。読み込み時のヘッダー行の除外に使用する。
    pub fn header_fields(&self, header: &Record) -> Result<Vec<String>> {
        Ok(self
            .format_header(header)?
            .split(self.delimiter)
            .map(str::to_string)
            .collect())
    }

    /// レコードのメッセージ部分を返却する。
    pub fn format_message(&self, record: &Record) -> Result<String> {
        match record {
            Record::Line(line) => Ok(line.clone()),
            Record::Fields(fields) => {
                let rendered = fields
                    .iter()
                    .map(|field| self.format_field(field))
                    .collect::<Result<Vec<_>>>()?;
                let mut delimiter = [0u8; 4];
                Ok(rendered.join(self.delimiter.encode_utf8(&mut delimiter)))
            }
        }
    }

    fn format_field(&self, field: &Value) -> Result<String> {
        match field {
            Value::Timestamp(ts) => Ok(ts.format(&self.datefmt)?),
            other => Ok(other.to_string()),
        }
    }
}
