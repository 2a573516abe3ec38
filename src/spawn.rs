//! `posix_spawn()` による外部コマンド起動と出力キャプチャ。
//!
//! 子プロセスの stdout / stderr をそれぞれパイプに繋ぎ、`poll(2)` で両方を
//! EOF まで読み切ってから `waitpid(2)` で終了を待つ（ストリーミングなし、ブロッキング）。
//! 片方のパイプが詰まって子が止まらないよう、2 本を同時に監視する。
//!
//! | 型 | 役割 |
//! |-----|------|
//! | [`FileActions`] | `posix_spawn_file_actions_t` の RAII ラッパー（dup2 / close） |
//! | [`CStringVec`] | argv 用の NULL 終端ポインタ配列 |
//! | [`Pipe`] | `pipe(2)` の両端を保持し、Drop で閉じる |
//! | [`capture`] | 上記を組み合わせて起動・読み取り・待機を行う公開関数 |

use std::ffi::CString;
use std::fmt;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

// ── エラー型 ──────────────────────────────────────────────────────

/// 起動・読み取り・待機の失敗。非ゼロ終了はここには含まれない。
#[derive(Debug)]
pub struct SpawnError {
    /// errno 値。
    pub errno: i32,
    /// コマンド名（エラーメッセージ用）。
    pub command: String,
}

impl fmt::Display for SpawnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errno {
            libc::ENOENT => write!(f, "{}: command not found", self.command),
            libc::EACCES => write!(f, "{}: permission denied", self.command),
            errno => write!(
                f,
                "{}: spawn failed: {}",
                self.command,
                std::io::Error::from_raw_os_error(errno)
            ),
        }
    }
}

impl std::error::Error for SpawnError {}

fn last_errno() -> i32 {
    std::io::Error::last_os_error()
        .raw_os_error()
        .unwrap_or(libc::EIO)
}

// ── FileActions ───────────────────────────────────────────────────

/// `posix_spawn_file_actions_t` の RAII ラッパー。Drop で自動 destroy。
struct FileActions {
    inner: libc::posix_spawn_file_actions_t,
}

impl FileActions {
    fn new() -> Self {
        unsafe {
            let mut actions: libc::posix_spawn_file_actions_t = std::mem::zeroed();
            libc::posix_spawn_file_actions_init(&mut actions);
            Self { inner: actions }
        }
    }

    /// `dup2(fd, newfd)` アクションを追加する。
    fn add_dup2(&mut self, fd: i32, newfd: i32) {
        unsafe {
            libc::posix_spawn_file_actions_adddup2(&mut self.inner, fd, newfd);
        }
    }

    /// `close(fd)` アクションを追加する。
    fn add_close(&mut self, fd: i32) {
        unsafe {
            libc::posix_spawn_file_actions_addclose(&mut self.inner, fd);
        }
    }

    fn as_ptr(&self) -> *const libc::posix_spawn_file_actions_t {
        &self.inner
    }
}

impl Drop for FileActions {
    fn drop(&mut self) {
        unsafe {
            libc::posix_spawn_file_actions_destroy(&mut self.inner);
        }
    }
}

// ── CStringVec ────────────────────────────────────────────────────

/// argv 用の CString ベクタ。NULL 終端のポインタ配列を構築する。
struct CStringVec {
    _strings: Vec<CString>,
    ptrs: Vec<*mut libc::c_char>,
}

impl CStringVec {
    /// NUL を含む引数は空文字列になる。
    fn from_args<'a>(args: impl IntoIterator<Item = &'a str>) -> Self {
        let strings: Vec<CString> = args
            .into_iter()
            .map(|s| CString::new(s).unwrap_or_default())
            .collect();
        let mut ptrs: Vec<*mut libc::c_char> = strings
            .iter()
            .map(|s| s.as_ptr() as *mut libc::c_char)
            .collect();
        ptrs.push(std::ptr::null_mut());
        Self {
            _strings: strings,
            ptrs,
        }
    }

    fn as_ptr(&self) -> *const *mut libc::c_char {
        self.ptrs.as_ptr()
    }
}

// ── Pipe ──────────────────────────────────────────────────────────

/// `pipe(2)` の両端。閉じた端は `-1`。
struct Pipe {
    read: i32,
    write: i32,
}

impl Pipe {
    fn new() -> Result<Self, i32> {
        let mut fds = [-1i32; 2];
        if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
            return Err(last_errno());
        }
        Ok(Self {
            read: fds[0],
            write: fds[1],
        })
    }

    /// 親側の書き込み端を閉じる。子の終了とともに読み取り端が EOF になる。
    fn close_write(&mut self) {
        if self.write >= 0 {
            unsafe {
                libc::close(self.write);
            }
            self.write = -1;
        }
    }
}

impl Drop for Pipe {
    fn drop(&mut self) {
        self.close_write();
        if self.read >= 0 {
            unsafe {
                libc::close(self.read);
            }
        }
    }
}

// ── capture ───────────────────────────────────────────────────────

/// 子プロセスの全出力と終了ステータス。
#[derive(Debug, Default)]
pub struct Captured {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// 正常終了ならその終了コード、シグナル終了なら 128 + シグナル番号。
    pub status: i32,
}

/// `program` を `argv0 args...` で起動し、終了まで待って出力を返す。
///
/// stdin は端末を継承する。stdout / stderr はパイプ経由で全量バッファする。
pub fn capture(argv0: &str, program: &Path, args: &[String]) -> Result<Captured, SpawnError> {
    let fail = |errno: i32| SpawnError {
        errno,
        command: argv0.to_string(),
    };

    let path = CString::new(program.as_os_str().as_bytes()).map_err(|_| fail(libc::EINVAL))?;
    let argv = CStringVec::from_args(std::iter::once(argv0).chain(args.iter().map(String::as_str)));

    let mut out = Pipe::new().map_err(fail)?;
    let mut err = Pipe::new().map_err(fail)?;

    let mut actions = FileActions::new();
    actions.add_dup2(out.write, libc::STDOUT_FILENO);
    actions.add_dup2(err.write, libc::STDERR_FILENO);
    for fd in [out.read, out.write, err.read, err.write] {
        actions.add_close(fd);
    }

    // environ を継承
    extern "C" {
        static environ: *const *mut libc::c_char;
    }

    let mut pid: libc::pid_t = 0;
    let ret = unsafe {
        libc::posix_spawn(
            &mut pid,
            path.as_ptr(),
            actions.as_ptr(),
            std::ptr::null(),
            argv.as_ptr(),
            environ as *const *mut libc::c_char,
        )
    };

    out.close_write();
    err.close_write();

    if ret != 0 {
        return Err(fail(ret));
    }
    log::trace!("spawn: {} pid={}", program.display(), pid);

    // 読み取りに失敗しても子は必ず回収する
    let drained = drain(out.read, err.read);
    let status = wait_child(pid).map_err(fail)?;
    let (stdout, stderr) = drained.map_err(fail)?;

    Ok(Captured {
        stdout,
        stderr,
        status,
    })
}

/// 2 本の読み取り端を `poll` で同時に監視し、両方 EOF になるまで読む。
fn drain(out_fd: i32, err_fd: i32) -> Result<(Vec<u8>, Vec<u8>), i32> {
    let mut bufs = [Vec::new(), Vec::new()];
    let mut pfds = [
        libc::pollfd {
            fd: out_fd,
            events: libc::POLLIN,
            revents: 0,
        },
        libc::pollfd {
            fd: err_fd,
            events: libc::POLLIN,
            revents: 0,
        },
    ];
    let mut chunk = [0u8; 4096];

    // 負の fd は poll に無視される。EOF になった側は -1 にする。
    while pfds.iter().any(|p| p.fd >= 0) {
        let ready = unsafe { libc::poll(pfds.as_mut_ptr(), pfds.len() as libc::nfds_t, -1) };
        if ready < 0 {
            match last_errno() {
                libc::EINTR => continue,
                errno => return Err(errno),
            }
        }

        for (pfd, buf) in pfds.iter_mut().zip(bufs.iter_mut()) {
            if pfd.fd < 0 || pfd.revents == 0 {
                continue;
            }
            let n = unsafe {
                libc::read(pfd.fd, chunk.as_mut_ptr() as *mut libc::c_void, chunk.len())
            };
            if n > 0 {
                buf.extend_from_slice(&chunk[..n as usize]);
            } else if n == 0 {
                pfd.fd = -1;
            } else {
                match last_errno() {
                    libc::EINTR | libc::EAGAIN => {}
                    errno => return Err(errno),
                }
            }
        }
    }

    let [stdout, stderr] = bufs;
    Ok((stdout, stderr))
}

/// `waitpid` で子の終了を待ち、終了ステータスに変換する。
fn wait_child(pid: libc::pid_t) -> Result<i32, i32> {
    let mut status = 0i32;
    loop {
        let r = unsafe { libc::waitpid(pid, &mut status, 0) };
        if r == pid {
            break;
        }
        if r < 0 {
            match last_errno() {
                libc::EINTR => continue,
                errno => return Err(errno),
            }
        }
    }

    if libc::WIFEXITED(status) {
        Ok(libc::WEXITSTATUS(status))
    } else if libc::WIFSIGNALED(status) {
        Ok(128 + libc::WTERMSIG(status))
    } else {
        Ok(1)
    }
}
