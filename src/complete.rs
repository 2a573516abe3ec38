//! Tab 補完（ビルトイン名のみ）。
//!
//! 組み立て中のトークンが最小接頭辞長（既定 3 文字）以上のとき、その接頭辞で始まる
//! ビルトイン名を名前順で探し、最初に一致したものを返す。
//! 候補の適用（残りの文字のエコーとトークンの確定）は [`editor`](crate::editor) 側で行う。

/// `prefix` を補完するビルトイン名を返す。短すぎる・一致なしなら `None`。
pub fn complete_builtin<'a, I>(prefix: &str, names: I, min_prefix: usize) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    if prefix.chars().count() < min_prefix {
        return None;
    }
    names.into_iter().find(|name| name.starts_with(prefix))
}
