use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref UNIX_VAR: Regex =
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)").unwrap();
}

/// Expand Unix-style environment variables (`$VAR` and `${VAR}`) in a path.
///
/// Variables that are not set are left in place, so a typo shows up as a
/// missing file rather than silently pointing somewhere else.
pub fn expand_env_vars(path: &str) -> String {
    if !path.contains('$') {
        return path.to_string();
    }

    UNIX_VAR
        .replace_all(path, |caps: &Captures| {
            let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            std::env::var(name).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}
