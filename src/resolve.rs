//! 実行ファイル解決: `$PATH` を先頭から走査して最初に見つかった実行可能ファイルを返す。
//!
//! プラットフォーム差分（区切り文字、実行ファイル拡張子、実行ビット判定）は
//! 起動時に一度だけ作る [`Platform`] にまとめ、呼び出し側で文字列分岐をしない。

use std::fs;
use std::path::{Path, PathBuf};

/// プラットフォームごとの PATH 解決パラメータ。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    /// `$PATH` のディレクトリ区切り（POSIX は `:`、Windows は `;`）。
    pub separator: char,
    /// コマンド名に付加する拡張子（Windows は `.exe`）。
    pub exe_suffix: &'static str,
    /// 実行ビット（`0o111`）のないファイルを候補から外すか。
    pub check_exec_bit: bool,
}

impl Platform {
    pub const fn posix() -> Self {
        Self {
            separator: ':',
            exe_suffix: "",
            check_exec_bit: true,
        }
    }

    pub const fn windows() -> Self {
        Self {
            separator: ';',
            exe_suffix: ".exe",
            check_exec_bit: false,
        }
    }

    /// ビルド対象のプラットフォーム。
    pub const fn native() -> Self {
        if cfg!(windows) {
            Self::windows()
        } else {
            Self::posix()
        }
    }

    /// メタデータが実行可能ファイルを指すか。ディレクトリは常に false。
    pub fn is_executable(&self, meta: &fs::Metadata) -> bool {
        if meta.is_dir() {
            return false;
        }
        !self.check_exec_bit || has_exec_bit(meta)
    }
}

#[cfg(unix)]
fn has_exec_bit(meta: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn has_exec_bit(_meta: &fs::Metadata) -> bool {
    true
}

/// `name` を `path_var` のディレクトリ順に検索する。
///
/// - 先に見つかったものが優先され、以降は探さない
/// - 存在しない候補・ディレクトリ・（POSIX で）実行ビットのないファイルはスキップ
/// - `name` に `/` が含まれる場合は PATH を使わずそのパスだけを検査する
pub fn find_executable(name: &str, path_var: &str, platform: &Platform) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }
    if name.contains('/') {
        let candidate = PathBuf::from(name);
        return check(&candidate, platform).then_some(candidate);
    }

    let file_name = format!("{}{}", name, platform.exe_suffix);
    path_var
        .split(platform.separator)
        .filter(|dir| !dir.is_empty())
        .map(|dir| Path::new(dir).join(&file_name))
        .find(|candidate| check(candidate, platform))
}

fn check(candidate: &Path, platform: &Platform) -> bool {
    let ok = fs::metadata(candidate)
        .map(|meta| platform.is_executable(&meta))
        .unwrap_or(false);
    log::trace!("resolve: {} -> {}", candidate.display(), ok);
    ok
}
