//! rawsh ライブラリ: ベンチマーク・テスト用にモジュールを公開する。
//!
//! バイナリ本体は `main.rs`。端末を raw モードにして [`shell::Shell::run`] を呼ぶだけで、
//! 処理はすべてこのライブラリ側にある。
//!
//! ## モジュール構成
//!
//! | モジュール | 役割 |
//! |-----------|------|
//! | [`editor`] | 行リーダー（raw モード、1 文字ずつのエコー、Tab 補完、Ctrl+D） |
//! | [`complete`] | ビルトイン名の Tab 補完（最小接頭辞長つき） |
//! | [`parser`] | 引数パーサー（シングル/ダブルクォート、バックスラッシュ、リダイレクト収集） |
//! | [`redirect`] | リダイレクト演算子の分類（`>`, `1>`, `>>`, `1>>`, `2>`, `2>>`） |
//! | [`builtins`] | ビルトイン（`exit`, `echo`, `type`, `cd`, `pwd`）とレジストリ |
//! | [`resolve`] | PATH 上の実行ファイル探索（区切り文字・拡張子・実行ビットのプラットフォーム差） |
//! | [`executor`] | ディスパッチ（ビルトイン → 外部コマンド → not found）と出力の統一 |
//! | [`spawn`] | `posix_spawn` による外部コマンド起動と stdout / stderr キャプチャ |
//! | [`output`] | 出力ルーター（ファイルへの上書き/追記、端末向け `\r\n` 変換） |
//! | [`shell`] | REPL ループ |
//! | [`config`] | プロンプト、補完設定、環境変数名などの起動時設定 |

pub mod builtins;
pub mod complete;
pub mod config;
pub mod editor;
pub mod executor;
pub mod output;
pub mod parser;
pub mod redirect;
pub mod resolve;
pub mod shell;
pub mod spawn;
