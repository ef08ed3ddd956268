//! 整形器、追記先、読み込み器をまとめたロガー

use crate::appenders::AppendSink;
use crate::config::{LoggerConfig, MinLevel};
use crate::error::{Error, Result};
use crate::formatter::{self, Formatter, Record};
use crate::reader::{LogReader, ParsedRow};
use crate::rotation::RotationPolicy;
use crate::severity::{Severity, SeverityRegistry};

/// 区切り文字で整形したレコードを、ローテーションするファイルに記録するロガー
#[derive(Debug)]
pub struct Logger {
    config: LoggerConfig,
    formatter: Formatter,
    sink: AppendSink,
    reader: LogReader,
    threshold: u32,
}

impl Logger {
    /// `Logger`を作成する。
    ///
    /// 設定されたカスタム重要度をプロセス全体の登録簿に登録してから、
    /// ログファイルを開く。いずれかに失敗した場合はエラーを返却し、
    /// この呼び出しで登録した重要度は登録簿から取り除く。
    ///
    /// # 引数
    ///
    /// * config: ロガーの設定。
    ///
    /// # 戻り値
    ///
    /// `Logger`インスタンス。
    pub fn new(config: LoggerConfig) -> Result<Logger> {
        config.validate()?;
        let formatter = Formatter::new(&config)?;
        let header = config
            .get_header()
            .map(|header| formatter.format_header(header))
            .transpose()?;
        let reader = LogReader::new(&config)?;

        let registry = SeverityRegistry::global();
        let registered = register_custom_levels(&config, registry)?;
        let opened = resolve_threshold(config.get_level(), registry).and_then(|threshold| {
            let policy = RotationPolicy::new(
                config.get_path(),
                config.get_max_size(),
                config.get_max_files(),
            );
            Ok((threshold, AppendSink::new(policy, header)?))
        });
        let (threshold, sink) = match opened {
            Ok(opened) => opened,
            Err(e) => {
                registry.unregister_all(&registered)?;
                return Err(e);
            }
        };

        Ok(Self {
            config,
            formatter,
            sink,
            reader,
            threshold,
        })
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    /// 追記先。`tracing-subscriber`のライターとしても使用できる。
    pub fn sink(&self) -> &AppendSink {
        &self.sink
    }

    pub fn reader(&self) -> &LogReader {
        &self.reader
    }

    /// 名前で指定した重要度でレコードを記録する。
    ///
    /// 最低の重要度より低い場合は何もしない。書き込みに失敗した場合はエラーを返却する。
    pub fn log(&self, level: &str, record: impl Into<Record>) -> Result<()> {
        let severity = SeverityRegistry::global()
            .lookup(level)?
            .ok_or_else(|| Error::UnknownLevel(level.to_string()))?;
        self.emit(&severity, record)
    }

    /// 指定した重要度でレコードを記録する。
    pub fn emit(&self, severity: &Severity, record: impl Into<Record>) -> Result<()> {
        if severity.priority() < self.threshold {
            return Ok(());
        }
        let line = self
            .formatter
            .format_record(&record.into(), severity, formatter::now())?;
        self.sink.write(&line)
    }

    /// 名前で指定した重要度が記録される場合は`true`。
    pub fn is_enabled(&self, level: &str) -> Result<bool> {
        let severity = SeverityRegistry::global()
            .lookup(level)?
            .ok_or_else(|| Error::UnknownLevel(level.to_string()))?;
        Ok(severity.priority() >= self.threshold)
    }

    pub fn debug(&self, record: impl Into<Record>) -> Result<()> {
        self.emit(&Severity::DEBUG, record)
    }

    pub fn info(&self, record: impl Into<Record>) -> Result<()> {
        self.emit(&Severity::INFO, record)
    }

    pub fn warning(&self, record: impl Into<Record>) -> Result<()> {
        self.emit(&Severity::WARNING, record)
    }

    pub fn error(&self, record: impl Into<Record>) -> Result<()> {
        self.emit(&Severity::ERROR, record)
    }

    pub fn critical(&self, record: impl Into<Record>) -> Result<()> {
        self.emit(&Severity::CRITICAL, record)
    }

    /// 書き込み中のファイルとバックアップから、すべてのログを読み込む。
    pub fn get_logs(&self, evaluate: bool) -> Result<Vec<ParsedRow>> {
        self.reader.get_logs(evaluate)
    }
}

/// 設定されたカスタム重要度をまとめて登録する。1つでも衝突すれば何も登録しない。
fn register_custom_levels(
    config: &LoggerConfig,
    registry: &SeverityRegistry,
) -> Result<Vec<Severity>> {
    let priorities = config.get_custom_level_priorities();
    let levels: Vec<(&str, Option<u32>)> = config
        .get_custom_levels()
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let priority = priorities.and_then(|priorities| priorities.get(i).copied());
            (name.as_str(), priority)
        })
        .collect();

    registry.register_all(&levels)
}

fn resolve_threshold(level: &MinLevel, registry: &SeverityRegistry) -> Result<u32> {
    match level {
        MinLevel::Priority(priority) => Ok(*priority),
        MinLevel::Name(name) => registry
            .lookup(name)?
            .map(|severity| severity.priority())
            .ok_or_else(|| Error::UnknownLevel(name.clone())),
    }
}
