use lazy_static::lazy_static;
use regex::Regex;

use crate::constants::MANGLED_NAME_MAX;

lazy_static! {
    static ref BIN_PREFIX: Regex = Regex::new(r"^/(usr/)?(bin|sbin)/").unwrap();
    static ref UNSAFE_RUN: Regex = Regex::new(r"[^A-Za-z0-9_\-./]+").unwrap();
}

/// Derive a filesystem-safe file name from a command line.
///
/// `/usr/bin/uname -a` becomes `uname_-a` and `/bin/ls -la /etc` becomes
/// `ls_-la_.etc`. The result never contains a path separator, so it always
/// names a single file directly under the command directory, and is plain
/// ASCII of at most [`MANGLED_NAME_MAX`] bytes.
pub fn mangle_command(command: &str) -> String {
    let name = BIN_PREFIX.replace(command.trim(), "");
    let name = UNSAFE_RUN.replace_all(&name, "_");
    let name = name.replace('/', ".");
    let name = name.trim_matches(|c: char| matches!(c, ' ' | '.' | '_' | '-'));

    let mut end = name.len().min(MANGLED_NAME_MAX);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    name[..end].to_string()
}
