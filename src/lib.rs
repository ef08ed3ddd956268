//! Rolling Record Logger
//!
//! ----------------------------------------------------------------------------
//!
//! このクレートには、`Logger`構造体が含まれており、この構造体は、区切り文字で
//! フィールドを連結したレコードを、ファイルに記録することを目的としている。
//! `Logger`は、整形を`Formatter`に、ファイルへの追記を`AppendSink`に、
//! 読み込みを`LogReader`に移譲している。
//!
//! `AppendSink`は、ファイルに指定されたサイズを超えて書き込もうとしたとき、
//! 現在のファイルを番号付きのバックアップに切り替える。バックアップの数が
//! 最大ファイル数を超えた場合は、最も古いファイルから削除する。
//! ヘッダーが設定されている場合は、新しく作成したファイルの先頭に書き込む。
//!
//! `LogReader`は、バックアップを古い順に、最後に現在のファイルを読み込み、
//! ヘッダー行を除いた行を返却する。必要であれば、各フィールドを数値や
//! タイムスタンプに変換する。
//!
//! ```no_run
//! use rolling_record_logger::{Logger, LoggerConfig};
//!
//! # fn main() -> rolling_record_logger::Result<()> {
//! let logger = Logger::new(
//!     LoggerConfig::new("logs/log.csv")
//!         .fmt("{timestamp},{severity},{message}")
//!         .custom_levels(["logs_a"])
//!         .max_size(1024)
//!         .max_files(4)
//!         .header(vec!["date", "level", "value_1", "value_2"]),
//! )?;
//!
//! logger.log("logs_a", vec![1, 2])?;
//! logger.critical("3000,4000")?;
//!
//! for row in logger.get_logs(true)? {
//!     println!("{:?}", row);
//! }
//! # Ok(())
//! # }
//! ```

pub mod appenders;
pub mod config;
pub mod error;
pub mod formatter;
pub mod logger;
pub mod reader;
pub mod rotation;
pub mod severity;
pub mod value;

pub use appenders::{AppendSink, RollingWriter};
pub use config::{LoggerConfig, MinLevel};
pub use error::{Error, Result};
pub use formatter::{Formatter, Record};
pub use logger::Logger;
pub use reader::{LogReader, ParsedRow};
pub use rotation::RotationPolicy;
pub use severity::{Severity, SeverityRegistry};
pub use value::Value;
