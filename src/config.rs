//! 起動時設定。コマンドライン引数は持たず、環境変数とビルド対象から一度だけ組み立てる。

use crate::resolve::Platform;

/// Tab 補完が動き出す最小接頭辞長。
pub const MIN_COMPLETION_PREFIX: usize = 3;

/// シェル全体で共有する不変の設定。
#[derive(Debug, Clone)]
pub struct Config {
    /// 各行の読み取り前に表示するプロンプト。
    pub prompt: String,
    /// Tab 補完の最小接頭辞長。
    pub min_completion_prefix: usize,
    /// 検索ディレクトリ一覧を持つ環境変数名。
    pub path_var: &'static str,
    /// `cd ~` の展開先を持つ環境変数名。
    pub home_var: &'static str,
    pub platform: Platform,
}

impl Config {
    /// ビルド対象プラットフォームの既定値。
    pub fn native() -> Self {
        Self::for_platform(Platform::native())
    }

    pub fn for_platform(platform: Platform) -> Self {
        let home_var = if platform == Platform::windows() {
            "USERPROFILE"
        } else {
            "HOME"
        };
        Self {
            prompt: "$ ".to_string(),
            min_completion_prefix: MIN_COMPLETION_PREFIX,
            path_var: "PATH",
            home_var,
            platform,
        }
    }

    /// 現在の `$PATH`。未設定なら空文字列（何も見つからない）。
    pub fn search_path(&self) -> String {
        std::env::var(self.path_var).unwrap_or_default()
    }

    /// ホームディレクトリ。未設定なら `None`。
    pub fn home(&self) -> Option<String> {
        std::env::var(self.home_var).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn posix_defaults() {
        let cfg = Config::for_platform(Platform::posix());
        assert_eq!(cfg.prompt, "$ ");
        assert_eq!(cfg.min_completion_prefix, 3);
        assert_eq!(cfg.path_var, "PATH");
        assert_eq!(cfg.home_var, "HOME");
    }

    #[test]
    fn windows_home_var() {
        let cfg = Config::for_platform(Platform::windows());
        assert_eq!(cfg.home_var, "USERPROFILE");
        assert_eq!(cfg.platform.separator, ';');
    }
}
