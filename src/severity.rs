//! 重要度（Severity）とその登録簿
//!
//! 標準の重要度（`DEBUG`〜`CRITICAL`）に加えて、任意の名前と優先度を持つ
//! カスタム重要度を登録できる。登録簿はプロセス全体で共有され、
//! ロガーのインスタンスごとには分かれない。

use std::borrow::Cow;
use std::fmt;
use std::sync::{OnceLock, RwLock};

use regex::Regex;

use crate::error::{Error, Result};

/// 優先度を指定せずに登録したカスタム重要度に、最初に割り当てる優先度
pub const AUTO_PRIORITY_START: u32 = 100;

/// `Logger`が持つエントリポイントの名前
///
/// カスタム重要度から導出したメソッド名は、これらと衝突してはならない。
const RESERVED_METHOD_NAMES: &[&str] = &[
    "log",
    "get_logs",
    "is_enabled",
    "config",
    "sink",
    "reader",
    "warn",
    "fatal",
    "exception",
];

/// 名前と優先度の組
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Severity {
    name: Cow<'static, str>,
    priority: u32,
}

impl Severity {
    pub const DEBUG: Severity = Severity::builtin("DEBUG", 10);
    pub const INFO: Severity = Severity::builtin("INFO", 20);
    pub const WARNING: Severity = Severity::builtin("WARNING", 30);
    pub const ERROR: Severity = Severity::builtin("ERROR", 40);
    pub const CRITICAL: Severity = Severity::builtin("CRITICAL", 50);

    const fn builtin(name: &'static str, priority: u32) -> Self {
        Self {
            name: Cow::Borrowed(name),
            priority,
        }
    }

    /// 重要度を作成する。名前は大文字に正規化される。
    pub fn new(name: &str, priority: u32) -> Self {
        Self {
            name: Cow::Owned(name.to_uppercase()),
            priority,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    /// この重要度で記録するときのエントリポイント名（小文字）
    pub fn method_name(&self) -> String {
        self.name.to_lowercase()
    }

    /// 標準の重要度の一覧
    pub fn builtins() -> [Severity; 5] {
        [
            Self::DEBUG,
            Self::INFO,
            Self::WARNING,
            Self::ERROR,
            Self::CRITICAL,
        ]
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn level_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$")
            .expect("Unable to compile the level name pattern; this is a bug in rolling-record-logger")
    })
}

/// 重要度の登録簿
///
/// 名前の比較は大文字と小文字を区別しない。レベル名（大文字）と
/// メソッド名（小文字）のどちらで衝突しても登録は拒否される。
#[derive(Debug)]
pub struct SeverityRegistry {
    levels: RwLock<Vec<Severity>>,
}

impl SeverityRegistry {
    /// 標準の重要度だけを持つ登録簿を作成する。
    pub fn new() -> Self {
        Self {
            levels: RwLock::new(Severity::builtins().to_vec()),
        }
    }

    /// プロセス全体で共有される登録簿を返却する。
    pub fn global() -> &'static SeverityRegistry {
        static GLOBAL: OnceLock<SeverityRegistry> = OnceLock::new();
        GLOBAL.get_or_init(SeverityRegistry::new)
    }

    /// カスタム重要度を登録する。
    ///
    /// # 引数
    ///
    /// - name: 重要度の名前。英字またはアンダースコアで始まる識別子。
    /// - priority: 優先度。`None`の場合は`AUTO_PRIORITY_START`から降順に、
    ///   未使用の値を割り当てる。
    ///
    /// # 戻り値
    ///
    /// 登録した重要度。名前または優先度が衝突した場合はエラーを返却し、
    /// 登録簿は変更しない。
    pub fn register(&self, name: &str, priority: Option<u32>) -> Result<Severity> {
        let mut registered = self.register_all(&[(name, priority)])?;
        registered
            .pop()
            .ok_or_else(|| Error::InvalidLevelName(name.to_string()))
    }

    /// 複数のカスタム重要度をまとめて登録する。
    ///
    /// 1つのロックの中ですべての名前と優先度を検証してから登録する。
    /// 既存の重要度、または同じ呼び出しの中の別の重要度と衝突した場合は
    /// エラーを返却し、どれも登録しない。
    ///
    /// # 引数
    ///
    /// - levels: 名前と優先度の組。優先度の意味は`register`と同じ。
    ///
    /// # 戻り値
    ///
    /// 登録した重要度。`levels`と同じ順序。
    pub fn register_all(&self, levels: &[(&str, Option<u32>)]) -> Result<Vec<Severity>> {
        let mut current = self.levels.write().map_err(|_| Error::Poison)?;

        let mut staged = current.clone();
        let mut registered = Vec::with_capacity(levels.len());
        for (name, priority) in levels {
            let severity = stage(&mut staged, name, *priority)?;
            registered.push(severity);
        }
        *current = staged;
        drop(current);

        for severity in &registered {
            tracing::debug!(
                name = severity.name(),
                priority = severity.priority(),
                "registered custom severity"
            );
        }

        Ok(registered)
    }

    /// 登録した重要度を取り除く。標準の重要度は取り除かない。
    pub fn unregister_all(&self, severities: &[Severity]) -> Result<()> {
        let builtins = Severity::builtins();
        let mut levels = self.levels.write().map_err(|_| Error::Poison)?;
        levels.retain(|level| builtins.contains(level) || !severities.contains(level));

        Ok(())
    }

    /// 名前から重要度を検索する。
    pub fn lookup(&self, name: &str) -> Result<Option<Severity>> {
        let levels = self.levels.read().map_err(|_| Error::Poison)?;
        Ok(levels
            .iter()
            .find(|level| level.name().eq_ignore_ascii_case(name))
            .cloned())
    }

    /// 優先度から重要度を検索する。
    pub fn by_priority(&self, priority: u32) -> Result<Option<Severity>> {
        let levels = self.levels.read().map_err(|_| Error::Poison)?;
        Ok(levels.iter().find(|level| level.priority == priority).cloned())
    }

    /// 登録されている重要度を優先度の昇順で返却する。
    pub fn levels(&self) -> Result<Vec<Severity>> {
        let mut levels = self.levels.read().map_err(|_| Error::Poison)?.clone();
        levels.sort_by_key(Severity::priority);
        Ok(levels)
    }
}

impl Default for SeverityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// 衝突を確認してから`levels`に重要度を追加する。
fn stage(levels: &mut Vec<Severity>, name: &str, priority: Option<u32>) -> Result<Severity> {
    if !level_name_pattern().is_match(name) {
        return Err(Error::InvalidLevelName(name.to_string()));
    }

    let method_name = name.to_lowercase();
    let name_taken = levels
        .iter()
        .any(|level| level.name().eq_ignore_ascii_case(name));
    if name_taken || RESERVED_METHOD_NAMES.contains(&method_name.as_str()) {
        return Err(Error::LevelCollision {
            name: name.to_string(),
        });
    }

    let priority = match priority {
        Some(priority) => {
            if let Some(existing) = levels.iter().find(|level| level.priority == priority) {
                return Err(Error::PriorityCollision {
                    priority,
                    existing: existing.name().to_string(),
                });
            }
            priority
        }
        None => next_free_priority(levels)?,
    };

    let severity = Severity::new(name, priority);
    levels.push(severity.clone());

    Ok(severity)
}

fn next_free_priority(levels: &[Severity]) -> Result<u32> {
    (1..=AUTO_PRIORITY_START)
        .rev()
        .find(|candidate| levels.iter().all(|level| level.priority != *candidate))
        .ok_or_else(|| Error::InvalidConfig("no free severity priority left".to_string()))
}
