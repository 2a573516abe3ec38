//! 出力ルーター: コマンドの stdout / stderr テキストをファイルまたは端末に振り分ける。
//!
//! - リダイレクト指定ごとにファイルを開き（無ければ作成、上書き or 追記）、
//!   該当ストリームのテキストを改行変換なしで書いて閉じる
//! - どの指定にも対象にされなかったストリームは端末へ。raw モードでは `\n` だけでは
//!   行頭に戻らないため、端末向けテキストは `\r\n` に変換し、末尾改行を保証する
//! - ファイルを開けない / 書けない場合のエラーは常に端末に直接出す
//!   （リダイレクト先そのものが失敗箇所なので、リダイレクトできない）

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

use thiserror::Error;

use crate::executor::CommandOutcome;
use crate::redirect::{Mode, RedirectSpec, Stream};

/// リダイレクト先ファイルの I/O エラー。
#[derive(Debug, Error)]
#[error("{}: {source}", .path.display())]
pub struct RedirectError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// 端末表示用に変換する。単独の `\n` を `\r\n` にし、非空なら改行で終わらせる。
pub fn for_terminal(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut prev = '\0';
    for ch in text.chars() {
        if ch == '\n' && prev != '\r' {
            out.push('\r');
        }
        out.push(ch);
        prev = ch;
    }
    if !out.is_empty() && !out.ends_with('\n') {
        out.push_str("\r\n");
    }
    out
}

/// `outcome` を `redirects` に従って書き出す。端末への書き込みエラーのみ返す。
pub fn route<W: Write>(
    outcome: &CommandOutcome,
    redirects: &[RedirectSpec],
    term: &mut W,
) -> io::Result<()> {
    let mut stdout_claimed = false;
    let mut stderr_claimed = false;

    for spec in redirects {
        let text = match spec.stream {
            Stream::Stdout => {
                stdout_claimed = true;
                &outcome.stdout
            }
            Stream::Stderr => {
                stderr_claimed = true;
                &outcome.stderr
            }
        };
        if let Err(e) = write_to_file(spec, text) {
            log::debug!("redirect failed: {}", e);
            term.write_all(for_terminal(&e.to_string()).as_bytes())?;
        }
    }

    if !stdout_claimed {
        term.write_all(for_terminal(&outcome.stdout).as_bytes())?;
    }
    if !stderr_claimed {
        term.write_all(for_terminal(&outcome.stderr).as_bytes())?;
    }
    term.flush()
}

/// 1 つのリダイレクト先を開いて書き、すぐ閉じる（ハンドルは保持しない）。
fn write_to_file(spec: &RedirectSpec, text: &str) -> Result<(), RedirectError> {
    let wrap = |source: io::Error| RedirectError {
        path: PathBuf::from(&spec.path),
        source,
    };
    let mut file = open(spec).map_err(wrap)?;
    file.write_all(text.as_bytes()).map_err(wrap)?;
    log::debug!("redirect: {} bytes -> {} ({:?})", text.len(), spec.path, spec.mode);
    Ok(())
}

fn open(spec: &RedirectSpec) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.create(true);
    match spec.mode {
        Mode::Truncate => options.write(true).truncate(true),
        Mode::Append => options.append(true),
    };
    options.open(&spec.path)
}
