//! ビルトインコマンドの実装とレジストリ。
//!
//! ビルトインはプロセス内で直接実行され、出力をテキストとして返す（端末には直接書かない）。
//! 出力先の振り分けは [`output`](crate::output) が行う。
//!
//! | 名前 | 動作 |
//! |------|------|
//! | `exit [N]` | 終了要求を返す（N 省略時 0、数値でなければ 2） |
//! | `echo [args...]` | 引数を空白で連結し改行を付ける |
//! | `type [names...]` | ビルトイン / PATH 上の実行ファイル / not found を判定 |
//! | `cd [dir]` | カレントディレクトリを変更（`~` はホームに展開） |
//! | `pwd` | カレントディレクトリを表示 |
//!
//! `exit` は自分でプロセスを終了せず、[`Action::Terminate`] を REPL ループに返す。
//! raw モードの復元はループ側の責務。

use std::collections::BTreeMap;
use std::env;
use std::io;

use thiserror::Error;

use crate::config::Config;
use crate::executor::{Action, CommandOutcome, TerminateRequest};
use crate::resolve;

/// ビルトインの意味的な失敗。表示文字列は stderr チャネルにそのまま流れる。
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("cd: {0}: No such file or directory")]
    NoSuchDirectory(String),
    #[error("cd: too many arguments")]
    TooManyArguments,
    #[error("{0}: not found")]
    NotFound(String),
    #[error("cd: {0} not set")]
    HomeNotSet(&'static str),
    #[error("cd: {path}: {source}")]
    ChangeDir {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("pwd: {0}")]
    CurrentDir(#[source] io::Error),
}

/// ビルトインに渡す実行コンテキスト。`type` がレジストリと PATH 設定を参照する。
pub struct Context<'a> {
    pub config: &'a Config,
    pub registry: &'a Registry,
}

/// ビルトインのハンドラ。`args` にコマンド名は含まれない。
pub type Handler = fn(&Context<'_>, &[String]) -> Result<Action, CommandError>;

/// 名前 → ハンドラの不変テーブル。起動時に一度だけ作り、参照で引き回す。
pub struct Registry {
    handlers: BTreeMap<&'static str, Handler>,
}

impl Registry {
    /// `exit`, `echo`, `type`, `cd`, `pwd` を登録したレジストリ。
    pub fn standard() -> Self {
        let mut handlers: BTreeMap<&'static str, Handler> = BTreeMap::new();
        handlers.insert("exit", builtin_exit);
        handlers.insert("echo", builtin_echo);
        handlers.insert("type", builtin_type);
        handlers.insert("cd", builtin_cd);
        handlers.insert("pwd", builtin_pwd);
        Self { handlers }
    }

    pub fn get(&self, name: &str) -> Option<Handler> {
        self.handlers.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// 登録済みの名前（アルファベット順）。Tab 補完の候補に使う。
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.keys().copied()
    }
}

/// `exit [N]`
fn builtin_exit(_ctx: &Context<'_>, args: &[String]) -> Result<Action, CommandError> {
    let code = match args.first() {
        None => 0,
        Some(arg) => arg.parse::<i32>().unwrap_or(2),
    };
    Ok(Action::Terminate(TerminateRequest { code }))
}

/// `echo [args...]`: 引数ゼロなら改行のみ。
fn builtin_echo(_ctx: &Context<'_>, args: &[String]) -> Result<Action, CommandError> {
    let mut out = args.join(" ");
    out.push('\n');
    Ok(Action::Output(CommandOutcome::stdout(out)))
}

/// `type [names...]`: 名前ごとに 1 行。見つからない名前は stderr 側に積む。
fn builtin_type(ctx: &Context<'_>, args: &[String]) -> Result<Action, CommandError> {
    let path_var = ctx.config.search_path();
    let mut outcome = CommandOutcome::default();
    for name in args {
        if ctx.registry.contains(name) {
            outcome.stdout.push_str(&format!("{} is a shell builtin\n", name));
        } else if let Some(path) = resolve::find_executable(name, &path_var, &ctx.config.platform) {
            outcome
                .stdout
                .push_str(&format!("{} is {}\n", name, path.display()));
        } else {
            outcome
                .stderr
                .push_str(&format!("{}\n", CommandError::NotFound(name.clone())));
        }
    }
    Ok(Action::Output(outcome))
}

/// `cd [dir]`: 引数なしは何もしない。
fn builtin_cd(ctx: &Context<'_>, args: &[String]) -> Result<Action, CommandError> {
    let target = match args {
        [] => return Ok(Action::Output(CommandOutcome::default())),
        [one] => one,
        _ => return Err(CommandError::TooManyArguments),
    };

    let dir = expand_home(target, ctx.config)?;
    log::debug!("cd: {} -> {}", target, dir);
    env::set_current_dir(&dir).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => CommandError::NoSuchDirectory(target.clone()),
        _ => CommandError::ChangeDir {
            path: target.clone(),
            source: e,
        },
    })?;
    Ok(Action::Output(CommandOutcome::default()))
}

/// `pwd`
fn builtin_pwd(_ctx: &Context<'_>, _args: &[String]) -> Result<Action, CommandError> {
    let cwd = env::current_dir().map_err(CommandError::CurrentDir)?;
    Ok(Action::Output(CommandOutcome::stdout(format!(
        "{}\n",
        cwd.display()
    ))))
}

/// 先頭の `~`（単独 or `~/...`）をホームディレクトリに置き換える。
fn expand_home(target: &str, config: &Config) -> Result<String, CommandError> {
    let rest = match target.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => return Ok(target.to_string()),
    };
    let home = config
        .home()
        .ok_or(CommandError::HomeNotSet(config.home_var))?;
    Ok(format!("{}{}", home, rest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn run(config: &Config, name: &str, args: &[&str]) -> Result<Action, CommandError> {
        let registry = Registry::standard();
        let ctx = Context {
            config,
            registry: &registry,
        };
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let handler = registry.get(name).unwrap();
        handler(&ctx, &args)
    }

    fn outcome(action: Action) -> CommandOutcome {
        match action {
            Action::Output(o) => o,
            Action::Terminate(req) => panic!("unexpected {:?}", req),
        }
    }

    #[test]
    fn registry_names_sorted() {
        let names: Vec<_> = Registry::standard().names().collect();
        assert_eq!(names, vec!["cd", "echo", "exit", "pwd", "type"]);
    }

    #[test]
    fn echo_joins_args() {
        let cfg = Config::native();
        let out = outcome(run(&cfg, "echo", &["a b", "c"]).unwrap());
        assert_eq!(out.stdout, "a b c\n");
        assert!(out.stderr.is_empty());
    }

    #[test]
    fn echo_without_args_prints_newline() {
        let cfg = Config::native();
        assert_eq!(outcome(run(&cfg, "echo", &[]).unwrap()).stdout, "\n");
    }

    #[test]
    fn exit_codes() {
        let cfg = Config::native();
        let code = |args: &[&str]| match run(&cfg, "exit", args) {
            Ok(Action::Terminate(TerminateRequest { code })) => code,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(code(&[]), 0);
        assert_eq!(code(&["4"]), 4);
        assert_eq!(code(&["abc"]), 2);
    }

    #[test]
    fn type_builtin() {
        let cfg = Config::native();
        let out = outcome(run(&cfg, "type", &["cd"]).unwrap());
        assert_eq!(out.stdout, "cd is a shell builtin\n");
    }

    #[test]
    fn type_not_found() {
        let cfg = Config::native();
        let out = outcome(run(&cfg, "type", &["nope123"]).unwrap());
        assert!(out.stdout.is_empty());
        assert_eq!(out.stderr, "nope123: not found\n");
    }

    #[cfg(unix)]
    #[test]
    fn type_mixed_keeps_order() {
        let cfg = Config::native();
        let out = outcome(run(&cfg, "type", &["echo", "sh", "nope123", "pwd"]).unwrap());
        let lines: Vec<&str> = out.stdout.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "echo is a shell builtin");
        assert!(lines[1].starts_with("sh is /"), "{}", lines[1]);
        assert_eq!(lines[2], "pwd is a shell builtin");
        assert_eq!(out.stderr, "nope123: not found\n");
    }

    #[test]
    fn cd_argument_errors() {
        let cfg = Config::native();
        assert!(matches!(
            run(&cfg, "cd", &["a", "b"]),
            Err(CommandError::TooManyArguments)
        ));
        let err = run(&cfg, "cd", &["/definitely/not/here"]).unwrap_err();
        assert!(matches!(err, CommandError::NoSuchDirectory(_)));
        assert_eq!(
            err.to_string(),
            "cd: /definitely/not/here: No such file or directory"
        );
        let noop = outcome(run(&cfg, "cd", &[]).unwrap());
        assert!(noop.stdout.is_empty() && noop.stderr.is_empty());
    }

    #[test]
    fn expand_home_variants() {
        let mut cfg = Config::native();
        cfg.home_var = "RAWSH_TEST_HOME_EXPAND";
        std::env::set_var("RAWSH_TEST_HOME_EXPAND", "/home/tester");
        assert_eq!(expand_home("~", &cfg).unwrap(), "/home/tester");
        assert_eq!(expand_home("~/src", &cfg).unwrap(), "/home/tester/src");
        assert_eq!(expand_home("~other", &cfg).unwrap(), "~other");
        assert_eq!(expand_home("a/~", &cfg).unwrap(), "a/~");

        cfg.home_var = "RAWSH_TEST_HOME_UNSET";
        assert!(matches!(
            expand_home("~", &cfg),
            Err(CommandError::HomeNotSet("RAWSH_TEST_HOME_UNSET"))
        ));
    }

    /// カレントディレクトリはプロセス全体の状態なので、cd と pwd は 1 テストにまとめる。
    #[test]
    fn cd_and_pwd() {
        let original = env::current_dir().unwrap();
        let target: PathBuf = env::temp_dir().join(format!("rawsh-cd-{}", std::process::id()));
        fs::create_dir_all(&target).unwrap();
        let target = target.canonicalize().unwrap();

        let mut cfg = Config::native();
        cfg.home_var = "RAWSH_TEST_HOME_CD";
        std::env::set_var("RAWSH_TEST_HOME_CD", &target);

        outcome(run(&cfg, "cd", &["/"]).unwrap());
        outcome(run(&cfg, "cd", &["~"]).unwrap());
        let out = outcome(run(&cfg, "pwd", &[]).unwrap());
        assert_eq!(out.stdout, format!("{}\n", target.display()));

        env::set_current_dir(&original).unwrap();
        fs::remove_dir_all(&target).unwrap();
    }
}
