//! シェル本体: 設定とビルトインレジストリを保持し、REPL ループを回す。
//!
//! 1 周の流れ: プロンプト表示 → [`LineReader`] で 1 行読み取り（同時にパース）
//! → [`executor::dispatch`] → [`output::route`]。
//!
//! ループは `exit` の [`TerminateRequest`] か入力終了で抜け、終了コードを返すだけ。
//! プロセスの終了と raw モードの解除は呼び出し側（`main`）が行う。

use std::io::{self, Read, Write};

use crate::builtins::{Context, Registry};
use crate::config::Config;
use crate::editor::{Line, LineReader};
use crate::executor::{self, Action, TerminateRequest};
use crate::output;
use crate::parser::ParseResult;

/// REPL の実行状態。起動時に作られ、以降は変更されない。
pub struct Shell {
    pub config: Config,
    pub registry: Registry,
}

impl Shell {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            registry: Registry::standard(),
        }
    }

    fn context(&self) -> Context<'_> {
        Context {
            config: &self.config,
            registry: &self.registry,
        }
    }

    /// このシェル用の行リーダーを作る。補完候補はレジストリの名前。
    pub fn line_reader<R: Read, E: Write>(&self, input: R, echo: E) -> LineReader<R, E> {
        LineReader::new(
            input,
            echo,
            self.registry.names().collect(),
            self.config.min_completion_prefix,
        )
    }

    /// 入力が尽きるか `exit` されるまでループし、終了コードを返す。
    ///
    /// 入力終了は終了コード 0。端末への書き込みや入力の読み取りに失敗したら `Err`。
    pub fn run<R, E, W>(&self, reader: &mut LineReader<R, E>, term: &mut W) -> io::Result<i32>
    where
        R: Read,
        E: Write,
        W: Write,
    {
        loop {
            term.write_all(self.config.prompt.as_bytes())?;
            term.flush()?;

            let parsed = match reader.read_line()? {
                Line::Eof => {
                    log::debug!("end of input");
                    term.write_all(b"\r\n")?;
                    term.flush()?;
                    return Ok(0);
                }
                Line::Invalid(e) => {
                    term.write_all(output::for_terminal(&e.to_string()).as_bytes())?;
                    term.flush()?;
                    continue;
                }
                Line::Parsed(parsed) => parsed,
            };

            if let Some(request) = self.execute(&parsed, term)? {
                log::debug!("exit requested with code {}", request.code);
                return Ok(request.code);
            }
        }
    }

    /// パース済みの 1 行を実行し、出力を振り分ける。`exit` なら終了要求を返す。
    pub fn execute<W: Write>(
        &self,
        parsed: &ParseResult,
        term: &mut W,
    ) -> io::Result<Option<TerminateRequest>> {
        match executor::dispatch(&self.context(), &parsed.args) {
            Action::Terminate(request) => Ok(Some(request)),
            Action::Output(outcome) => {
                output::route(&outcome, &parsed.redirects, term)?;
                Ok(None)
            }
        }
    }
}
