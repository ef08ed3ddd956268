//! フィールドの値と、文字列からの型推定

use std::fmt;

use time::format_description::OwnedFormatItem;
use time::{Date, PrimitiveDateTime, Time};

/// レコードを構成するフィールドの値
///
/// 書き込み時はレコードのフィールドとして、読み込み時は`ParsedRow`の
/// フィールドとして使用する。
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Timestamp(PrimitiveDateTime),
    Str(String),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// 整数も浮動小数点数として返却する。
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<PrimitiveDateTime> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// 文字列を、数値、タイムスタンプ、文字列の順に変換を試みる。
    ///
    /// どの変換に失敗しても呼び出し側にエラーは返さず、次の表現に落ちる。
    ///
    /// # 引数
    ///
    /// - raw: ファイルから読み込んだフィールド。
    /// - datefmt: タイムスタンプの書式。
    ///
    /// # 戻り値
    ///
    /// 最初に成功した変換の結果。
    pub fn coerce(raw: &str, datefmt: &OwnedFormatItem) -> Value {
        const ATTEMPTS: [fn(&str, &OwnedFormatItem) -> Option<Value>; 3] =
            [parse_int, parse_float, parse_timestamp];

        ATTEMPTS
            .iter()
            .find_map(|attempt| attempt(raw, datefmt))
            .unwrap_or_else(|| Value::Str(raw.to_string()))
    }
}

fn parse_int(raw: &str, _: &OwnedFormatItem) -> Option<Value> {
    raw.trim().parse::<i64>().ok().map(Value::Int)
}

fn parse_float(raw: &str, _: &OwnedFormatItem) -> Option<Value> {
    raw.trim().parse::<f64>().ok().map(Value::Float)
}

// 時刻を含まない書式では日付だけを解析し、午前0時として扱う。
fn parse_timestamp(raw: &str, datefmt: &OwnedFormatItem) -> Option<Value> {
    PrimitiveDateTime::parse(raw, datefmt)
        .or_else(|_| Date::parse(raw, datefmt).map(|date| date.with_time(Time::MIDNIGHT)))
        .ok()
        .map(Value::Timestamp)
}

impl fmt::Display for Value {
    /// タイムスタンプは書式を持たないため、ISO 8601 に近い形で出力する。
    /// 設定された書式で出力するには`Formatter`を経由する。
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            // `2.0`を`2`ではなく`2.0`と出力し、読み戻したときに浮動小数点数のままにする。
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Timestamp(ts) => write!(f, "{} {}", ts.date(), ts.time()),
            Value::Str(s) => f.write_str(s),
        }
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Int(i64::from(v))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<PrimitiveDateTime> for Value {
    fn from(v: PrimitiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Str(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use time::format_description;
    use time::macros::datetime;

    use super::*;

    fn datefmt() -> OwnedFormatItem {
        format_description::parse_owned::<2>("[year]/[month]/[day] [hour]:[minute]:[second]")
            .unwrap()
    }

    #[test]
    fn test_coerce_numbers() {
        let datefmt = datefmt();

        assert_eq!(Value::Int(42), Value::coerce("42", &datefmt));
        assert_eq!(Value::Int(-7), Value::coerce("-7", &datefmt));
        assert_eq!(Value::Float(3.14), Value::coerce("3.14", &datefmt));
        assert_eq!(Value::Float(2.0), Value::coerce("2.0", &datefmt));
    }

    #[test]
    fn test_coerce_timestamp() {
        let datefmt = datefmt();

        assert_eq!(
            Value::Timestamp(datetime!(2022-05-26 15:25:32)),
            Value::coerce("2022/05/26 15:25:32", &datefmt)
        );
    }

    #[test]
    fn test_coerce_date_only_format() {
        let datefmt = format_description::parse_owned::<2>("[year]-[month]-[day]").unwrap();

        assert_eq!(
            Value::Timestamp(datetime!(2022-05-26 0:00)),
            Value::coerce("2022-05-26", &datefmt)
        );
    }

    #[test]
    fn test_coerce_falls_back_to_string() {
        let datefmt = datefmt();

        assert_eq!(Value::Str("value_1".into()), Value::coerce("value_1", &datefmt));
        assert_eq!(Value::Str("".into()), Value::coerce("", &datefmt));
        assert_eq!(
            Value::Str("2022/13/40 99:99:99".into()),
            Value::coerce("2022/13/40 99:99:99", &datefmt)
        );
    }

    #[test]
    fn test_display_keeps_float_form() {
        assert_eq!("1000.1", Value::from(1000.1).to_string());
        assert_eq!("2.0", Value::from(2.0).to_string());
        assert_eq!("42", Value::from(42).to_string());
        assert_eq!("abc", Value::from("abc").to_string());
    }
}
