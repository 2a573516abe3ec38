//! rawsh: raw モード端末で動く小さな対話シェル
//!
//! 起動時に一度だけ端末を raw モードにし、[`Shell::run`] の REPL ループを回す。
//! ループが終了コードを返したら raw モードを解除してからプロセスを終了する。

use std::process;

use env_logger::Env;

use rawsh::config::Config;
use rawsh::editor::{FdReader, FdWriter, RawMode};
use rawsh::shell::Shell;

fn main() {
    // ログは stderr へ。既定は warn、`RUST_LOG=debug` などで詳細化する。
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let code = run();
    process::exit(code);
}

/// REPL を実行して終了コードを返す。raw モードのガードはここで取得・解放される。
fn run() -> i32 {
    let shell = Shell::new(Config::native());

    let _raw = match RawMode::enable(libc::STDIN_FILENO) {
        Ok(guard) => Some(guard),
        Err(e) => {
            log::debug!("stdin is not a terminal, running without raw mode: {}", e);
            None
        }
    };

    let mut reader = shell.line_reader(
        FdReader(libc::STDIN_FILENO),
        FdWriter(libc::STDOUT_FILENO),
    );
    let mut term = FdWriter(libc::STDOUT_FILENO);

    match shell.run(&mut reader, &mut term) {
        Ok(code) => code,
        Err(e) => {
            log::error!("terminal I/O failed: {}", e);
            1
        }
    }
}
