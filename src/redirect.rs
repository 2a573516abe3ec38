//! リダイレクト演算子の判定。
//!
//! パーサーが閉じたトークンを引数リストに入れる前に [`classify`] で判定する。
//! 一致すればパス未設定の [`RedirectSpec`] を返し、パーサーは次のトークンをそのパスに回す。
//!
//! | トークン | ストリーム | モード |
//! |----------|-----------|--------|
//! | `>` / `1>` | stdout | 上書き |
//! | `>>` / `1>>` | stdout | 追記 |
//! | `2>` | stderr | 上書き |
//! | `2>>` | stderr | 追記 |

/// リダイレクト対象のストリーム。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// ファイルの開き方。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// 既存内容を切り詰めて書き込む。
    Truncate,
    /// 既存内容の末尾に追記する。
    Append,
}

/// 1 つのリダイレクト指定。`path` は演算子の次のトークンで埋まる。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectSpec {
    pub stream: Stream,
    pub mode: Mode,
    pub path: String,
}

impl RedirectSpec {
    /// パス未設定（保留中）の指定を作る。
    fn pending(stream: Stream, mode: Mode) -> Self {
        Self {
            stream,
            mode,
            path: String::new(),
        }
    }
}

/// トークンがリダイレクト演算子ならパス未設定の [`RedirectSpec`] を返す。
pub fn classify(token: &str) -> Option<RedirectSpec> {
    let spec = match token {
        ">" | "1>" => RedirectSpec::pending(Stream::Stdout, Mode::Truncate),
        ">>" | "1>>" => RedirectSpec::pending(Stream::Stdout, Mode::Append),
        "2>" => RedirectSpec::pending(Stream::Stderr, Mode::Truncate),
        "2>>" => RedirectSpec::pending(Stream::Stderr, Mode::Append),
        _ => return None,
    };
    Some(spec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stdout_operators() {
        for op in [">", "1>"] {
            let spec = classify(op).unwrap();
            assert_eq!(spec.stream, Stream::Stdout);
            assert_eq!(spec.mode, Mode::Truncate);
            assert!(spec.path.is_empty());
        }
        for op in [">>", "1>>"] {
            let spec = classify(op).unwrap();
            assert_eq!(spec.stream, Stream::Stdout);
            assert_eq!(spec.mode, Mode::Append);
        }
    }

    #[test]
    fn stderr_operators() {
        assert_eq!(
            classify("2>"),
            Some(RedirectSpec::pending(Stream::Stderr, Mode::Truncate)),
        );
        assert_eq!(
            classify("2>>"),
            Some(RedirectSpec::pending(Stream::Stderr, Mode::Append)),
        );
    }

    #[test]
    fn non_operators() {
        for tok in ["", "echo", ">>>", "3>", "2>&1", ">file", "<"] {
            assert_eq!(classify(tok), None, "{tok}");
        }
    }
}
