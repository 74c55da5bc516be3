use anyhow::{bail, Result};
use serde_json::{json, Map, Value};

use crate::processors::{ContextParser, ProcessorContext, ProcessorRegistry};

pub const LINE_COUNT: &str = "line_count";
pub const KEY_VALUE: &str = "key_value";

/// Identifiers accepted by [`register_builtin`].
pub const BUILTIN_PROCESSORS: &[&str] = &[LINE_COUNT, KEY_VALUE];

/// Count the lines of an artifact.
pub fn line_count(ctx: &ProcessorContext) -> Result<Option<Value>> {
    Ok(Some(json!({
        "path": ctx.path.to_string_lossy(),
        "lines": ctx.content.len(),
    })))
}

/// Parses `KEY=VALUE` files such as `/etc/os-release`.
///
/// Blank lines and `#` comments are ignored, surrounding quotes are removed
/// from values. A line without `=` makes the whole artifact unparseable.
pub struct KeyValueParser;

impl ContextParser for KeyValueParser {
    fn name(&self) -> &str {
        KEY_VALUE
    }

    fn parse_context(&self, ctx: &ProcessorContext) -> Result<Option<Value>> {
        let mut map = Map::new();

        for (number, line) in ctx.content.iter().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                bail!("line {} of {} is not KEY=VALUE", number + 1, ctx.path.display());
            };
            let value = value.trim().trim_matches(|c: char| c == '"' || c == '\'');
            map.insert(key.trim().to_string(), Value::String(value.to_string()));
        }

        if map.is_empty() {
            return Ok(None);
        }
        Ok(Some(Value::Object(map)))
    }
}

/// Register the built-in processor `id` under the logical name `name`.
pub fn register_builtin(registry: &mut ProcessorRegistry, name: &str, id: &str) -> Result<()> {
    match id {
        LINE_COUNT => {
            registry.register_fn(name, LINE_COUNT, line_count);
        }
        KEY_VALUE => {
            registry.register_parser(name, KeyValueParser);
        }
        other => bail!(
            "Unknown processor '{}' (available: {})",
            other,
            BUILTIN_PROCESSORS.join(", ")
        ),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::invoke_isolated;
    use std::path::Path;

    fn ctx(output: &str) -> ProcessorContext {
        ProcessorContext::new(output, Path::new("/staging/etc/os-release"))
    }

    #[test]
    fn test_key_value_parser() {
        let output = "# comment\nNAME=\"Fedora Linux\"\nID=fedora\n\nVERSION_ID='40'\n";
        let value = KeyValueParser.parse_context(&ctx(output)).unwrap().unwrap();

        assert_eq!(
            value,
            json!({"NAME": "Fedora Linux", "ID": "fedora", "VERSION_ID": "40"})
        );
    }

    #[test]
    fn test_key_value_parser_rejects_garbage() {
        assert!(KeyValueParser.parse_context(&ctx("not a pair")).is_err());
        assert_eq!(KeyValueParser.parse_context(&ctx("# only\n")).unwrap(), None);
    }

    #[test]
    fn test_line_count() {
        let value = line_count(&ctx("a\nb\nc")).unwrap().unwrap();
        assert_eq!(value["lines"], json!(3));
    }

    #[test]
    fn test_register_builtin() {
        let mut registry = ProcessorRegistry::new();
        register_builtin(&mut registry, "os_release", KEY_VALUE).unwrap();
        register_builtin(&mut registry, "os_release", LINE_COUNT).unwrap();
        assert!(register_builtin(&mut registry, "os_release", "nope").is_err());

        let processors = registry.lookup("os_release");
        let ids: Vec<&str> = processors.iter().map(|p| p.id()).collect();
        assert_eq!(ids, vec![KEY_VALUE, LINE_COUNT]);

        let outcome = invoke_isolated(processors[0].as_ref(), &ctx("ID=fedora"));
        assert_eq!(outcome.into_result(), Some(json!({"ID": "fedora"})));
    }
}
