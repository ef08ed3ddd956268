use std::{
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::Path,
    sync::{Mutex, MutexGuard, PoisonError},
};

use tracing_subscriber::fmt::MakeWriter;

use crate::error::{Error, Result};
use crate::rotation::RotationPolicy;

/// 書き込み中のファイルとそのサイズ
#[derive(Debug)]
struct SinkState {
    /// ローテーションに失敗した直後は`None`となり、次の書き込みで開き直す。
    file: Option<File>,
    current_size: u64,
    header_size: u64,
}

/// ログファイルへの追記を担う。
///
/// サイズの確認、ローテーション、書き込みは1つのロックの中で行う。
#[derive(Debug)]
pub struct AppendSink {
    policy: RotationPolicy,
    header: Option<String>,
    state: Mutex<SinkState>,
}

/// `tracing-subscriber`に渡すライター。ロックを保持している間だけ存在する。
#[derive(Debug)]
pub struct RollingWriter<'a> {
    sink: &'a AppendSink,
    state: MutexGuard<'a, SinkState>,
}

impl AppendSink {
    /// `AppendSink`を作成する。
    ///
    /// # 引数
    ///
    /// * policy: ローテーションの方針。書き込み先のパスを含む。
    /// * header: ファイルの先頭に書き込むヘッダー行（改行を含まない）。
    ///
    /// # 戻り値
    ///
    /// `AppendSink`インスタンス。ディレクトリの作成、またはファイルを開くことに
    /// 失敗した場合はエラー。
    pub fn new(policy: RotationPolicy, header: Option<String>) -> Result<AppendSink> {
        create_log_directory(policy.path())?;

        let sink = Self {
            policy,
            header,
            state: Mutex::new(SinkState {
                file: None,
                current_size: 0,
                header_size: 0,
            }),
        };
        {
            let mut state = sink.state.lock().map_err(|_| Error::Poison)?;
            let file = sink.open_active(&mut state)?;
            state.file = Some(file);
        }
        tracing::debug!(path = %sink.path().display(), "opened log sink");

        Ok(sink)
    }

    pub fn path(&self) -> &Path {
        self.policy.path()
    }

    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    /// 書き込み中のファイルのサイズ
    pub fn current_size(&self) -> Result<u64> {
        Ok(self.state.lock().map_err(|_| Error::Poison)?.current_size)
    }

    /// 1行を追記する。改行はこのメソッドで付加する。
    pub fn write(&self, line: &str) -> Result<()> {
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');

        let rolled_over = {
            let mut state = self.state.lock().map_err(|_| Error::Poison)?;
            self.append(&mut state, &buf)?
        };
        // ロックを解放してから発行する。この追記先が`tracing`の出力先の場合もある。
        if rolled_over {
            tracing::debug!(
                path = %self.path().display(),
                max_size = self.policy.max_size(),
                max_files = self.policy.max_files(),
                "rolled over log file"
            );
        }

        Ok(())
    }

    pub fn flush(&self) -> Result<()> {
        let mut state = self.state.lock().map_err(|_| Error::Poison)?;
        if let Some(file) = state.file.as_mut() {
            file.flush()?;
        }
        Ok(())
    }

    /// 必要であればローテーションしてから、`buf`を書き込み中のファイルに追記する。
    ///
    /// ローテーションした場合は`true`を返却する。
    fn append(&self, state: &mut SinkState, buf: &[u8]) -> Result<bool> {
        let incoming = buf.len() as u64;
        let rolled_over = self
            .policy
            .should_rotate(state.current_size, state.header_size, incoming);
        if rolled_over {
            self.rotate(state)?;
        }

        let mut file = match state.file.take() {
            Some(file) => file,
            None => self.open_active(state)?,
        };
        file.write_all(buf)?;
        state.file = Some(file);
        state.current_size += incoming;

        Ok(rolled_over)
    }

    fn rotate(&self, state: &mut SinkState) -> Result<()> {
        self.policy.rollover(state.file.take())?;
        let file = self.open_active(state)?;
        state.file = Some(file);

        Ok(())
    }

    /// 書き込み中のファイルを開き、空であればヘッダーを書き込む。
    ///
    /// 既存のファイルがヘッダー行だけを含む場合も、その長さをヘッダーのサイズとする。
    fn open_active(&self, state: &mut SinkState) -> Result<File> {
        let mut file = create_writer(self.path())?;
        let mut size = file.metadata()?.len();
        let mut header_size = 0;

        if let Some(header) = &self.header {
            let header_line_len = header.len() as u64 + 1;
            if size == 0 {
                file.write_all(header.as_bytes())?;
                file.write_all(b"\n")?;
                header_size = header_line_len;
                size = header_size;
            } else if size == header_line_len && holds_only_header(self.path(), header)? {
                header_size = header_line_len;
            }
        }
        state.current_size = size;
        state.header_size = header_size;

        Ok(file)
    }
}

impl io::Write for RollingWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sink.append(&mut self.state, buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.state.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for AppendSink {
    type Writer = RollingWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        RollingWriter {
            sink: self,
            state: self.state.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }
}

/// ファイルの内容がヘッダー行だけであれば`true`を返却する。
fn holds_only_header(path: &Path, header: &str) -> Result<bool> {
    let content = fs::read(path)?;
    Ok(content.strip_suffix(b"\n") == Some(header.as_bytes()))
}

/// ログファイルを格納するディレクトリを作成する。既に存在する場合は何もしない。
fn create_log_directory(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|source| Error::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}

/// ライターを作成する。
///
/// # 引数
///
/// * path: ログファイルパス。
///
/// # 戻り値
///
/// 追記モードで開いた`File`インスタンス。
fn create_writer(path: &Path) -> Result<File> {
    OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })
}
