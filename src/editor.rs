//! 行リーダー: raw モード、1 文字ずつの読み取りとエコー、Tab 補完。
//!
//! ターミナルを raw モードに切り替え、入力を 1 文字ずつ [`ArgParser`] に直接流す。
//! 行バッファを持たず、パーサーの状態がそのまま行の状態になる。
//!
//! ## raw モードの範囲
//!
//! [`RawMode`] は `main` で起動時に一度だけ取得し、プロセスが終わるまで保持する。
//! RAII ガードなので、EOF・`exit`・パニックのどの経路でも Drop で元の termios が復元される。
//! `OPOST` も無効にするため、端末への出力は呼び出し側で `\r\n` にする必要がある
//! （[`output::for_terminal`](crate::output::for_terminal)）。
//!
//! ## キー
//!
//! | 入力 | 動作 |
//! |------|------|
//! | `\r` / `\n` | `\r\n` をエコーして行を確定 |
//! | Tab | ビルトイン名の補完（[`complete`](crate::complete)） |
//! | Ctrl+D | 空行なら入力終了、それ以外は無視 |
//! | 印字可能文字（UTF-8 含む） | エコーしてパーサーへ |
//!
//! バックスペースやカーソル移動などの行編集はない。

use std::io::{self, Read, Write};

use crate::complete;
use crate::parser::{ArgParser, ParseError, ParseResult};

// ── RawMode ガード ────────────────────────────────────────────────

/// RAII ガードで raw モードを管理する。Drop で元の termios を自動復元する。
///
/// ## termios 設定
///
/// | フラグ | 操作 |
/// |--------|------|
/// | `c_iflag` | `BRKINT\|ICRNL\|INPCK\|ISTRIP\|IXON` OFF |
/// | `c_oflag` | `OPOST` OFF |
/// | `c_cflag` | `CS8` ON |
/// | `c_lflag` | `ECHO\|ICANON\|IEXTEN\|ISIG` OFF |
/// | `VMIN`/`VTIME` | `1` / `0` |
pub struct RawMode {
    /// `tcgetattr` で保存した元の termios 設定。
    orig: libc::termios,
    fd: i32,
}

impl RawMode {
    /// 現在の設定を保存して raw モードを適用する。`fd` が端末でなければエラー。
    pub fn enable(fd: i32) -> io::Result<Self> {
        let mut orig: libc::termios = unsafe { std::mem::zeroed() };
        if unsafe { libc::tcgetattr(fd, &mut orig) } != 0 {
            return Err(io::Error::last_os_error());
        }
        let mut raw = orig;
        raw.c_iflag &= !(libc::BRKINT | libc::ICRNL | libc::INPCK | libc::ISTRIP | libc::IXON);
        raw.c_oflag &= !libc::OPOST;
        raw.c_cflag |= libc::CS8;
        raw.c_lflag &= !(libc::ECHO | libc::ICANON | libc::IEXTEN | libc::ISIG);
        raw.c_cc[libc::VMIN] = 1;
        raw.c_cc[libc::VTIME] = 0;
        if unsafe { libc::tcsetattr(fd, libc::TCSAFLUSH, &raw) } != 0 {
            return Err(io::Error::last_os_error());
        }
        log::debug!("raw mode enabled on fd {}", fd);
        Ok(Self { orig, fd })
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        unsafe {
            libc::tcsetattr(self.fd, libc::TCSAFLUSH, &self.orig);
        }
        log::debug!("raw mode restored on fd {}", self.fd);
    }
}

// ── fd 入出力 ─────────────────────────────────────────────────────

/// `libc::read` で直接読む（Rust の stdin バッファをバイパス）。
pub struct FdReader(pub i32);

impl Read for FdReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = unsafe { libc::read(self.0, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(n as usize)
    }
}

/// `libc::write` で直接書く（Rust の stdout バッファをバイパス）。
pub struct FdWriter(pub i32);

impl Write for FdWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = unsafe { libc::write(self.0, buf.as_ptr() as *const libc::c_void, buf.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(n as usize)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ── Key 入力 ──────────────────────────────────────────────────────

enum Key {
    Char(char),
    /// `\r` または `\n`。
    Enter,
    Tab,
    /// Ctrl+D（`0x04`）。
    CtrlD,
    /// `read` が 0 を返した。
    Eof,
    /// 未対応の制御文字や不正な UTF-8。無視される。
    Unknown,
}

/// 1 バイト読む。EOF なら `None`。
fn read_byte<R: Read>(input: &mut R) -> io::Result<Option<u8>> {
    let mut buf = [0u8; 1];
    loop {
        match input.read(&mut buf) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(buf[0])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

/// UTF-8 マルチバイト文字の残りのバイトを読み取り、`Key::Char` に変換する。
fn read_utf8<R: Read>(input: &mut R, first: u8, expected_len: usize) -> io::Result<Key> {
    let mut buf = [0u8; 4];
    buf[0] = first;
    for slot in buf.iter_mut().take(expected_len).skip(1) {
        match read_byte(input)? {
            Some(b) => *slot = b,
            None => return Ok(Key::Unknown),
        }
    }
    Ok(match std::str::from_utf8(&buf[..expected_len]) {
        Ok(s) => s.chars().next().map_or(Key::Unknown, Key::Char),
        Err(_) => Key::Unknown,
    })
}

fn read_key<R: Read>(input: &mut R) -> io::Result<Key> {
    let Some(byte) = read_byte(input)? else {
        return Ok(Key::Eof);
    };
    Ok(match byte {
        b'\r' | b'\n' => Key::Enter,
        b'\t' => Key::Tab,
        4 => Key::CtrlD,
        b if (32..127).contains(&b) => Key::Char(b as char),
        b if b & 0xE0 == 0xC0 => return read_utf8(input, b, 2),
        b if b & 0xF0 == 0xE0 => return read_utf8(input, b, 3),
        b if b & 0xF8 == 0xF0 => return read_utf8(input, b, 4),
        _ => Key::Unknown,
    })
}

// ── LineReader ────────────────────────────────────────────────────

/// 1 行の読み取り結果。
#[derive(Debug, PartialEq, Eq)]
pub enum Line {
    Parsed(ParseResult),
    Invalid(ParseError),
    /// 入力終了（EOF または空行での Ctrl+D）。
    Eof,
}

/// 入力を 1 文字ずつパーサーに流す行リーダー。パーサーは行をまたいで再利用する。
pub struct LineReader<R, W> {
    input: R,
    echo: W,
    parser: ArgParser,
    /// 補完候補（ビルトイン名、名前順）。
    names: Vec<&'static str>,
    min_prefix: usize,
}

impl<R: Read, W: Write> LineReader<R, W> {
    pub fn new(input: R, echo: W, names: Vec<&'static str>, min_prefix: usize) -> Self {
        Self {
            input,
            echo,
            parser: ArgParser::new(),
            names,
            min_prefix,
        }
    }

    /// 1 行読む。行の途中で EOF になった場合はそこまでを 1 行として返す。
    pub fn read_line(&mut self) -> io::Result<Line> {
        loop {
            match read_key(&mut self.input)? {
                Key::Enter => {
                    self.echo.write_all(b"\r\n")?;
                    self.echo.flush()?;
                    return Ok(self.finish());
                }
                Key::Eof if self.parser.is_blank() => return Ok(Line::Eof),
                Key::Eof => {
                    self.echo.write_all(b"\r\n")?;
                    self.echo.flush()?;
                    return Ok(self.finish());
                }
                Key::CtrlD if self.parser.is_blank() => return Ok(Line::Eof),
                Key::Tab => self.complete()?,
                Key::Char(ch) => {
                    let mut utf8 = [0u8; 4];
                    self.echo.write_all(ch.encode_utf8(&mut utf8).as_bytes())?;
                    self.echo.flush()?;
                    self.parser.push(ch);
                }
                Key::CtrlD | Key::Unknown => {}
            }
        }
    }

    fn finish(&mut self) -> Line {
        match self.parser.finish() {
            Ok(parsed) => Line::Parsed(parsed),
            Err(e) => Line::Invalid(e),
        }
    }

    /// 補完できれば残りの文字と空白をエコーし、トークンをその場で確定する。
    fn complete(&mut self) -> io::Result<()> {
        let prefix = self.parser.current_token();
        let Some(name) =
            complete::complete_builtin(prefix, self.names.iter().copied(), self.min_prefix)
        else {
            return Ok(());
        };
        let suffix = &name[prefix.len()..];
        self.echo.write_all(suffix.as_bytes())?;
        self.echo.write_all(b" ")?;
        self.echo.flush()?;
        self.parser.complete_token(name);
        Ok(())
    }
}
