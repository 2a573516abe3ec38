//! 引数パーサー: 入力 1 行を引数リストとリダイレクト指定に分解する状態機械。
//!
//! 1 文字ずつ [`ArgParser::push`] で受け取るため、行エディタの raw 入力と直結できる。
//! 文字列全体をまとめて処理する場合は [`parse`] を使う。
//!
//! ## 状態
//!
//! | 状態 | `\` | `'` | `"` | 空白 |
//! |------|-----|-----|-----|------|
//! | `Normal` | 次の 1 文字をリテラル化 | `Single` へ | `Double` へ | トークンを閉じる |
//! | `Single` | リテラル | `Normal` へ | リテラル | リテラル |
//! | `Double` | `"` `$` `\` のみエスケープ | リテラル | `Normal` へ | リテラル |
//!
//! ## リダイレクト
//!
//! 閉じたトークンは [`redirect::classify`] で判定し、演算子なら次に閉じたトークンを
//! そのパスとして消費する（引数リストには入れない）。

use thiserror::Error;

use crate::redirect::{self, RedirectSpec};

/// パース時に発生しうるエラー。どちらの場合もコマンドは実行しない。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// 行末でシングル / ダブルクォートが閉じていない。
    #[error("unclosed quote")]
    UnclosedQuote,
    /// リダイレクト演算子の後にパスとなるトークンがない。
    #[error("syntax error near unexpected token `newline'")]
    DanglingRedirect,
}

/// 1 行分のパース結果。行ごとに生成され、ディスパッチ後に捨てられる。
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParseResult {
    /// コマンド名を先頭とする引数リスト（出現順）。
    pub args: Vec<String>,
    /// リダイレクト指定（出現順）。`path` は常に非空。
    pub redirects: Vec<RedirectSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quote {
    Normal,
    Single,
    Double,
}

/// クォート / エスケープ状態を持つインクリメンタルパーサー。
///
/// トークンバッファは行をまたいで再利用する（[`ArgParser::finish`] は `clear` のみ）。
pub struct ArgParser {
    quote: Quote,
    /// 直前が `\`。`Normal` と `Double` でのみ意味を持つ。
    escape_next: bool,
    buf: String,
    args: Vec<String>,
    redirects: Vec<RedirectSpec>,
    /// パス待ちのリダイレクト指定。
    pending: Option<RedirectSpec>,
}

impl Default for ArgParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ArgParser {
    pub fn new() -> Self {
        Self {
            quote: Quote::Normal,
            escape_next: false,
            buf: String::with_capacity(64),
            args: Vec::new(),
            redirects: Vec::new(),
            pending: None,
        }
    }

    /// 1 文字を状態機械に流す。
    pub fn push(&mut self, ch: char) {
        match self.quote {
            Quote::Single => {
                if ch == '\'' {
                    self.quote = Quote::Normal;
                } else {
                    self.buf.push(ch);
                }
            }
            Quote::Double => {
                if self.escape_next {
                    self.escape_next = false;
                    if !matches!(ch, '"' | '$' | '\\') {
                        self.buf.push('\\');
                    }
                    self.buf.push(ch);
                } else {
                    match ch {
                        '\\' => self.escape_next = true,
                        '"' => self.quote = Quote::Normal,
                        _ => self.buf.push(ch),
                    }
                }
            }
            Quote::Normal if self.escape_next => {
                self.escape_next = false;
                self.buf.push(ch);
            }
            Quote::Normal => match ch {
                '\\' => self.escape_next = true,
                '\'' => self.quote = Quote::Single,
                '"' => self.quote = Quote::Double,
                ' ' => self.close_token(),
                _ => self.buf.push(ch),
            },
        }
    }

    /// 文字列をまとめて流す。
    pub fn push_str(&mut self, s: &str) {
        for ch in s.chars() {
            self.push(ch);
        }
    }

    /// 現在組み立て中のトークン。Tab 補完の接頭辞に使う。
    pub fn current_token(&self) -> &str {
        &self.buf
    }

    /// 組み立て中のトークンを `word` で置き換え、その場で閉じる（Tab 補完の確定）。
    pub fn complete_token(&mut self, word: &str) {
        self.buf.clear();
        self.buf.push_str(word);
        self.escape_next = false;
        self.quote = Quote::Normal;
        self.close_token();
    }

    /// まだ何も入力されていなければ true。
    pub fn is_blank(&self) -> bool {
        self.buf.is_empty()
            && self.args.is_empty()
            && self.redirects.is_empty()
            && self.pending.is_none()
            && self.quote == Quote::Normal
            && !self.escape_next
    }

    /// 行末処理。結果を返し、パーサーを次の行のために初期状態へ戻す。
    ///
    /// エラー時も引数・リダイレクトは破棄される。
    pub fn finish(&mut self) -> Result<ParseResult, ParseError> {
        let unclosed = self.quote != Quote::Normal;
        if !unclosed {
            self.close_token();
        }
        let dangling = self.pending.is_some();
        let result = ParseResult {
            args: std::mem::take(&mut self.args),
            redirects: std::mem::take(&mut self.redirects),
        };
        self.reset();

        if unclosed {
            return Err(ParseError::UnclosedQuote);
        }
        if dangling {
            return Err(ParseError::DanglingRedirect);
        }
        Ok(result)
    }

    /// トークンを閉じる。保留中のリダイレクトがあればそのパスに、
    /// 演算子なら保留に、それ以外は引数リストに入れる。
    fn close_token(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        if let Some(mut spec) = self.pending.take() {
            spec.path = self.buf.clone();
            self.redirects.push(spec);
        } else if let Some(spec) = redirect::classify(&self.buf) {
            self.pending = Some(spec);
        } else {
            self.args.push(self.buf.clone());
        }
        self.buf.clear();
    }

    fn reset(&mut self) {
        self.quote = Quote::Normal;
        self.escape_next = false;
        self.buf.clear();
        self.args.clear();
        self.redirects.clear();
        self.pending = None;
    }
}

/// 入力 1 行をパースする。同じ入力には常に同じ結果を返す。
pub fn parse(line: &str) -> Result<ParseResult, ParseError> {
    let mut parser = ArgParser::new();
    parser.push_str(line);
    parser.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redirect::{Mode, Stream};

    fn args(input: &str) -> Vec<String> {
        parse(input).unwrap().args
    }

    // ── 単純コマンド ──

    #[test]
    fn simple_command() {
        assert_eq!(args("echo hello world"), vec!["echo", "hello", "world"]);
    }

    #[test]
    fn extra_whitespace() {
        assert_eq!(args("  echo   hello  "), vec!["echo", "hello"]);
    }

    #[test]
    fn empty_line() {
        assert_eq!(parse("").unwrap(), ParseResult::default());
        assert_eq!(parse("    ").unwrap(), ParseResult::default());
    }

    // ── クォート ──

    #[test]
    fn mixed_quotes() {
        assert_eq!(
            args("echo 'a b' \"c d\" e"),
            vec!["echo", "a b", "c d", "e"],
        );
    }

    #[test]
    fn adjacent_quotes_join() {
        assert_eq!(args("echo 'foo'\"bar\"baz"), vec!["echo", "foobarbaz"]);
    }

    #[test]
    fn empty_quotes_are_dropped() {
        assert_eq!(args("echo '' \"\""), vec!["echo"]);
    }

    #[test]
    fn single_quote_is_literal() {
        assert_eq!(args(r"'a\b'"), vec![r"a\b"]);
        assert_eq!(args(r#"'say "hi"'"#), vec![r#"say "hi""#]);
    }

    #[test]
    fn double_quote_escapes() {
        assert_eq!(args(r#""a\"b""#), vec![r#"a"b"#]);
        assert_eq!(args(r#""a\\b""#), vec![r"a\b"]);
        assert_eq!(args(r#""\$HOME""#), vec!["$HOME"]);
    }

    #[test]
    fn double_quote_keeps_unknown_escape() {
        assert_eq!(args(r#""a\nb""#), vec![r"a\nb"]);
    }

    #[test]
    fn double_quote_keeps_single_quote() {
        assert_eq!(args(r#""it's""#), vec!["it's"]);
    }

    // ── エスケープ ──

    #[test]
    fn backslash_outside_quotes() {
        assert_eq!(args(r"echo a\ b"), vec!["echo", "a b"]);
        assert_eq!(args(r"echo \'x\'"), vec!["echo", "'x'"]);
        assert_eq!(args(r"echo \\n"), vec!["echo", r"\n"]);
    }

    #[test]
    fn trailing_backslash_is_dropped() {
        assert_eq!(args(r"echo a\"), vec!["echo", "a"]);
    }

    // ── エラー ──

    #[test]
    fn unclosed_double_quote() {
        assert_eq!(parse("echo \"abc"), Err(ParseError::UnclosedQuote));
    }

    #[test]
    fn unclosed_single_quote() {
        assert_eq!(parse("echo 'abc > out"), Err(ParseError::UnclosedQuote));
    }

    #[test]
    fn dangling_redirect() {
        assert_eq!(parse("echo hi >"), Err(ParseError::DanglingRedirect));
        assert_eq!(parse("echo hi 2>>   "), Err(ParseError::DanglingRedirect));
    }

    // ── リダイレクト ──

    #[test]
    fn stdout_redirect() {
        let r = parse("echo hi > out.txt").unwrap();
        assert_eq!(r.args, vec!["echo", "hi"]);
        assert_eq!(
            r.redirects,
            vec![RedirectSpec {
                stream: Stream::Stdout,
                mode: Mode::Truncate,
                path: "out.txt".to_string(),
            }],
        );
    }

    #[test]
    fn multiple_redirects_in_order() {
        let r = parse("cmd 1>> a 2> b x").unwrap();
        assert_eq!(r.args, vec!["cmd", "x"]);
        let kinds: Vec<_> = r
            .redirects
            .iter()
            .map(|s| (s.stream, s.mode, s.path.as_str()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (Stream::Stdout, Mode::Append, "a"),
                (Stream::Stderr, Mode::Truncate, "b"),
            ],
        );
    }

    #[test]
    fn quoted_redirect_target() {
        let r = parse("echo hi > 'my file'").unwrap();
        assert_eq!(r.redirects[0].path, "my file");
    }

    #[test]
    fn operator_as_target_is_not_reclassified() {
        let r = parse("echo > >").unwrap();
        assert_eq!(r.args, vec!["echo"]);
        assert_eq!(r.redirects.len(), 1);
        assert_eq!(r.redirects[0].path, ">");
    }

    #[test]
    fn redirect_without_command() {
        let r = parse("> out").unwrap();
        assert!(r.args.is_empty());
        assert_eq!(r.redirects.len(), 1);
    }

    // ── 状態の再利用 ──

    #[test]
    fn parse_is_repeatable() {
        let line = r#"echo "x\"y" 'z' > f 2>> g"#;
        assert_eq!(parse(line), parse(line));
    }

    #[test]
    fn finish_resets_after_error() {
        let mut p = ArgParser::new();
        p.push_str("echo \"abc");
        assert_eq!(p.finish(), Err(ParseError::UnclosedQuote));
        assert!(p.is_blank());
        p.push_str("pwd");
        assert_eq!(p.finish().unwrap().args, vec!["pwd"]);
    }

    #[test]
    fn complete_token_closes_immediately() {
        let mut p = ArgParser::new();
        p.push_str("ech");
        assert_eq!(p.current_token(), "ech");
        p.complete_token("echo");
        assert_eq!(p.current_token(), "");
        p.push_str("hi");
        assert_eq!(p.finish().unwrap().args, vec!["echo", "hi"]);
    }

    #[test]
    fn is_blank_tracks_input() {
        let mut p = ArgParser::new();
        assert!(p.is_blank());
        p.push(' ');
        assert!(p.is_blank());
        p.push('\'');
        assert!(!p.is_blank());
    }
}
