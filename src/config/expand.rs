//! Shell-style variable expansion for configured path strings.
//!
//! Supports `${NAME}` and `${NAME:-default}`. Expansion is best-effort:
//! anything that does not form a complete placeholder is copied through
//! untouched, and it never fails.

use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is valid"));

/// Expand placeholders against the process environment.
#[must_use]
pub fn expand(input: &str) -> String {
    expand_with(input, env_lookup)
}

/// Expand an optional value, propagating absence.
#[must_use]
pub fn expand_opt(input: Option<&str>) -> Option<String> {
    input.map(expand)
}

/// Expand placeholders using a custom variable lookup.
///
/// `${NAME}` is replaced by the looked-up value, or left as written when the
/// variable is unset. `${NAME:-default}` uses the value when it is set and
/// non-empty, otherwise the literal default text.
pub fn expand_with<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    PLACEHOLDER
        .replace_all(input, |caps: &Captures<'_>| {
            let expr = &caps[1];
            match expr.split_once(":-") {
                Some((name, default)) => match lookup(name) {
                    Some(value) if !value.is_empty() => value,
                    _ => default.to_string(),
                },
                None => lookup(expr).unwrap_or_else(|| caps[0].to_string()),
            }
        })
        .into_owned()
}

/// Replace a leading `~` or `~/` with the user's home directory.
///
/// Left unchanged when no home directory can be determined.
#[must_use]
pub fn expand_home(input: &str) -> Cow<'_, str> {
    let rest = match input.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => return Cow::Borrowed(input),
    };
    match dirs::home_dir() {
        Some(home) => Cow::Owned(format!("{}{rest}", home.display())),
        None => Cow::Borrowed(input),
    }
}

/// Full treatment for a configured path: variables first, then `~`.
#[must_use]
pub fn expand_path(input: &str) -> PathBuf {
    let expanded = expand(input);
    PathBuf::from(expand_home(&expanded).into_owned())
}

/// Process environment lookup used by [`expand`].
pub(crate) fn env_lookup(name: &str) -> Option<String> {
    // `std::env::var` rejects these keys outright.
    if name.is_empty() || name.contains(['=', '\0']) {
        return None;
    }
    std::env::var(name).ok()
}
