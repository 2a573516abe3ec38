//! コマンドのディスパッチ: ビルトイン → PATH 上の実行ファイル → not found の順に解決する。
//!
//! どの経路でも結果は [`CommandOutcome`]（stdout テキスト + stderr テキスト）に揃え、
//! 出力ルーターがビルトインか外部コマンドかを区別しなくて済むようにする。
//! `exit` だけは [`Action::Terminate`] を返し、REPL ループに終了処理を任せる。

use std::path::Path;

use thiserror::Error;

use crate::builtins::Context;
use crate::resolve;
use crate::spawn::{self, SpawnError};

/// 1 コマンドの出力。ビルトイン・外部コマンド共通。
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutcome {
    pub fn stdout(text: impl Into<String>) -> Self {
        Self {
            stdout: text.into(),
            stderr: String::new(),
        }
    }

    pub fn stderr(text: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: text.into(),
        }
    }
}

/// `exit` が返す終了要求。プロセス終了は REPL ループが端末を復元してから行う。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminateRequest {
    pub code: i32,
}

/// ディスパッチ結果。
#[derive(Debug)]
pub enum Action {
    Output(CommandOutcome),
    Terminate(TerminateRequest),
}

/// 外部コマンドの失敗。
#[derive(Debug, Error)]
pub enum ExecError {
    /// 非ゼロ終了。表示文字列は子プロセスの stderr そのもの。
    #[error("{stderr}")]
    Failed {
        status: i32,
        stdout: String,
        stderr: String,
    },
    /// 起動そのものに失敗（解決後にパーミッションが変わった等）。
    #[error(transparent)]
    Spawn(#[from] SpawnError),
}

/// 引数リスト（先頭がコマンド名）を実行する。空なら空の出力を返す。
pub fn dispatch(ctx: &Context<'_>, args: &[String]) -> Action {
    let Some((name, rest)) = args.split_first() else {
        return Action::Output(CommandOutcome::default());
    };

    if let Some(handler) = ctx.registry.get(name) {
        log::debug!("dispatch: builtin {}", name);
        return match handler(ctx, rest) {
            Ok(action) => action,
            Err(e) => Action::Output(CommandOutcome::stderr(format!("{}\n", e))),
        };
    }

    let path_var = ctx.config.search_path();
    let Some(path) = resolve::find_executable(name, &path_var, &ctx.config.platform) else {
        log::debug!("dispatch: {} not found", name);
        return Action::Output(CommandOutcome::stderr(format!(
            "{}: command not found\n",
            name
        )));
    };

    log::debug!("dispatch: external {} -> {}", name, path.display());
    let outcome = match run_external(name, &path, rest) {
        Ok(outcome) => outcome,
        Err(ExecError::Failed { status, stdout, stderr }) => {
            log::debug!("{}: exited with status {}", name, status);
            CommandOutcome { stdout, stderr }
        }
        Err(e @ ExecError::Spawn(_)) => CommandOutcome::stderr(format!("{}\n", e)),
    };
    Action::Output(outcome)
}

/// 解決済みの実行ファイルを起動し、終了まで待って出力を返す。
///
/// 終了ステータスが 0 なら stdout だけの `Ok`（stderr は捨てる）、
/// それ以外は stdout と stderr を持つ [`ExecError::Failed`]。
pub fn run_external(
    name: &str,
    path: &Path,
    args: &[String],
) -> Result<CommandOutcome, ExecError> {
    let captured = spawn::capture(name, path, args)?;
    let stdout = String::from_utf8_lossy(&captured.stdout).into_owned();
    if captured.status != 0 {
        return Err(ExecError::Failed {
            status: captured.status,
            stdout,
            stderr: String::from_utf8_lossy(&captured.stderr).into_owned(),
        });
    }
    Ok(CommandOutcome::stdout(stdout))
}
