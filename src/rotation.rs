//! サイズによるローテーション
//!
//! バックアップファイルの名前は、拡張子の前に`_`と番号を挿入したものとなる。
//! 番号は最大バックアップ数の桁数でゼロ埋めされ、`1`が最も新しく、
//! 番号が大きいほど古い。

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::{Error, Result};

/// ローテーションの方針
#[derive(Debug, Clone)]
pub struct RotationPolicy {
    path: PathBuf,
    max_size: u64,
    max_files: u16,
    width: usize,
}

impl RotationPolicy {
    /// `RotationPolicy`を作成する。
    ///
    /// # 引数
    ///
    /// * path: 書き込み中のログファイルのパス。
    /// * max_size: 1ファイルあたりの最大バイト数。`0`の場合はローテーションしない。
    /// * max_files: 残すバックアップファイルの最大数。
    pub fn new(path: impl AsRef<Path>, max_size: u64, max_files: u16) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            max_size,
            max_files,
            width: suffix_width(max_files),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    pub fn max_files(&self) -> u16 {
        self.max_files
    }

    /// 書き込む前にローテーションが必要か判定する。
    ///
    /// ヘッダーしか書き込まれていないファイルはローテーションしない。
    ///
    /// # 引数
    ///
    /// * current_size: 書き込み中のファイルのサイズ。
    /// * header_size: 書き込み中のファイルに書き込んだヘッダーのサイズ。
    /// * incoming: これから書き込むバイト数。
    pub fn should_rotate(&self, current_size: u64, header_size: u64, incoming: u64) -> bool {
        self.max_size > 0
            && current_size > header_size
            && current_size.saturating_add(incoming) > self.max_size
    }

    /// 番号`index`のバックアップファイルのパスを返却する。
    pub fn backup_path(&self, index: u32) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let filename = match self.path.extension() {
            Some(ext) => format!(
                "{}_{:0width$}.{}",
                stem,
                index,
                ext.to_string_lossy(),
                width = self.width
            ),
            None => format!("{}_{:0width$}", stem, index, width = self.width),
        };

        self.path.with_file_name(filename)
    }

    /// バックアップファイルの名前に一致する正規表現を返却する。
    fn backup_pattern(&self) -> Result<Regex> {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = self
            .path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let pattern = format!(r"^{}_(\d+){}$", regex::escape(&stem), regex::escape(&ext));

        Regex::new(&pattern).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    /// 存在するバックアップファイルを、番号の降順（古い順）で返却する。
    ///
    /// 最大バックアップ数を超える番号のファイルも、名前が一致すれば含める。
    pub fn backups(&self) -> Result<Vec<(u32, PathBuf)>> {
        let pattern = self.backup_pattern()?;
        let directory = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let entries = match fs::read_dir(&directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut backups = Vec::new();
        for entry in entries {
            let entry = entry?;
            let filename = entry.file_name();
            let filename = filename.to_string_lossy();
            let index = pattern
                .captures(&filename)
                .and_then(|captures| captures.get(1))
                .and_then(|index| index.as_str().parse::<u32>().ok());
            if let Some(index) = index {
                backups.push((index, self.path.with_file_name(&*filename)));
            }
        }
        backups.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));

        Ok(backups)
    }

    /// 書き込み中のファイルをバックアップに切り替える。
    ///
    /// `active`を閉じてから、既存のバックアップの番号を1つずつ繰り上げ、
    /// 書き込み中のファイルを番号`1`にする。最大数を超えたバックアップは削除する。
    /// 最大バックアップ数が`0`の場合は、書き込み中のファイルを削除する。
    /// 新しいファイルを開くのは呼び出し側の責務。
    ///
    /// 書き込みのロックを保持したまま呼ばれるため、ここでは`tracing`のイベントを発行しない。
    pub fn rollover(&self, active: Option<File>) -> Result<()> {
        drop(active);

        if self.max_files == 0 {
            return remove_if_exists(&self.path);
        }

        let max_files = u32::from(self.max_files);
        remove_if_exists(&self.backup_path(max_files))?;
        for index in (1..max_files).rev() {
            let from = self.backup_path(index);
            if from.exists() {
                rename(&from, &self.backup_path(index + 1))?;
            }
        }
        if self.path.exists() {
            rename(&self.path, &self.backup_path(1))?;
        }

        Ok(())
    }
}

/// バックアップ番号の桁数。最大バックアップ数を10進数で表す桁数（最小1桁）。
pub fn suffix_width(max_files: u16) -> usize {
    max_files.max(1).to_string().len()
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

fn rename(from: &Path, to: &Path) -> Result<()> {
    fs::rename(from, to).map_err(|source| Error::Rotation {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix_width() {
        assert_eq!(1, suffix_width(0));
        assert_eq!(1, suffix_width(4));
        assert_eq!(1, suffix_width(9));
        assert_eq!(2, suffix_width(10));
        assert_eq!(3, suffix_width(100));
    }

    #[test]
    fn test_backup_path() {
        let policy = RotationPolicy::new("logs/log.csv", 1024, 4);
        assert_eq!(PathBuf::from("logs/log_1.csv"), policy.backup_path(1));
        assert_eq!(PathBuf::from("logs/log_4.csv"), policy.backup_path(4));

        let policy = RotationPolicy::new("logs/log.csv", 1024, 10);
        assert_eq!(PathBuf::from("logs/log_01.csv"), policy.backup_path(1));
        assert_eq!(PathBuf::from("logs/log_10.csv"), policy.backup_path(10));

        let policy = RotationPolicy::new("log", 1024, 3);
        assert_eq!(PathBuf::from("log_2"), policy.backup_path(2));
    }

    #[test]
    fn test_should_rotate() {
        let policy = RotationPolicy::new("log.csv", 100, 4);

        assert!(!policy.should_rotate(80, 0, 20));
        assert!(policy.should_rotate(81, 0, 20));
        // ヘッダーだけのファイル
        assert!(!policy.should_rotate(10, 10, 500));
        assert!(!policy.should_rotate(0, 0, 500));

        let unlimited = RotationPolicy::new("log.csv", 0, 4);
        assert!(!unlimited.should_rotate(u64::MAX - 1, 0, 500));
    }

    #[test]
    fn test_rollover_shifts_backups() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let policy = RotationPolicy::new(&path, 10, 2);

        for content in ["first", "second", "third"] {
            fs::write(&path, content).unwrap();
            policy.rollover(None).unwrap();
        }

        assert!(!path.exists());
        assert_eq!("third", fs::read_to_string(policy.backup_path(1)).unwrap());
        assert_eq!("second", fs::read_to_string(policy.backup_path(2)).unwrap());
        assert!(!policy.backup_path(3).exists());
    }

    #[test]
    fn test_rollover_without_backups_discards_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let policy = RotationPolicy::new(&path, 10, 0);

        fs::write(&path, "content").unwrap();
        policy.rollover(None).unwrap();

        assert!(!path.exists());
        assert!(policy.backups().unwrap().is_empty());
    }

    #[test]
    fn test_backups_are_listed_oldest_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let policy = RotationPolicy::new(&path, 10, 10);

        for index in [1, 3, 2, 10] {
            fs::write(policy.backup_path(index), "").unwrap();
        }
        fs::write(&path, "").unwrap();
        fs::write(dir.path().join("log_x.csv"), "").unwrap();
        fs::write(dir.path().join("other_1.csv"), "").unwrap();
        fs::write(dir.path().join("log_1.txt"), "").unwrap();

        let indices: Vec<u32> = policy
            .backups()
            .unwrap()
            .into_iter()
            .map(|(index, _)| index)
            .collect();
        assert_eq!(vec![10, 3, 2, 1], indices);
    }

    #[test]
    fn test_backups_of_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let policy = RotationPolicy::new(dir.path().join("missing").join("log.csv"), 10, 4);

        assert!(policy.backups().unwrap().is_empty());
    }
}
