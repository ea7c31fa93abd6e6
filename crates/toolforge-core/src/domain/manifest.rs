//! Tool manifest: the declarative description of a generated program.
//!
//! Agents produce `manifest.json` files of uneven quality. Everything that
//! reads a manifest goes through [`normalize_manifest`], which fills
//! defaults, sanitizes the name into a kebab-case slug, and pins the runtime
//! literal, so downstream code never sees a partial manifest.

use serde::{Deserialize, Serialize};

/// Runtime identifier every generated tool declares.
pub const TOOL_RUNTIME: &str = "python";

/// Default entrypoint relative path.
pub const DEFAULT_ENTRYPOINT: &str = "tool.py";

/// Name used when neither the manifest nor the intent yields a usable slug.
pub const FALLBACK_TOOL_NAME: &str = "generated-tool";

/// Words carrying no naming signal when distilling a tool name from intent.
const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "to", "for", "and", "or", "with", "using", "from", "of", "in", "on", "make",
    "build", "create", "tool", "that",
];

/// A named argument declared by a generated tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolArgument {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

/// Declarative description of a generated program.
///
/// Serialized keys are the wire format: `name`, `description`, `version`,
/// `runtime`, `entrypoint`, `examples`, `arguments`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolManifest {
    pub name: String,
    pub description: String,
    pub version: String,
    pub runtime: String,
    pub entrypoint: String,
    pub examples: Vec<String>,
    #[serde(default)]
    pub arguments: Vec<ToolArgument>,
}

impl ToolManifest {
    /// Baseline manifest for an intent, used when the agent produced none.
    pub fn fallback(intent: &str) -> Self {
        Self {
            name: derive_fallback_tool_name(intent),
            description: "Generated tool".to_string(),
            version: "1.0.0".to_string(),
            runtime: TOOL_RUNTIME.to_string(),
            entrypoint: DEFAULT_ENTRYPOINT.to_string(),
            examples: Vec::new(),
            arguments: Vec::new(),
        }
    }
}

/// Normalize a raw manifest value parsed from the agent's `manifest.json`.
///
/// `raw` may be any JSON value; non-objects yield the intent-derived
/// fallback. String fields are taken when present and string-typed, the name
/// is sanitized, the runtime is always pinned, and `examples`/`arguments`
/// collapse to empty lists rather than null.
pub fn normalize_manifest(raw: Option<&serde_json::Value>, intent: &str) -> ToolManifest {
    let base = ToolManifest::fallback(intent);

    let Some(object) = raw.and_then(|v| v.as_object()) else {
        return base;
    };

    let string_field = |key: &str, default: &str| -> String {
        object
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .unwrap_or_else(|| default.to_string())
    };

    let examples = object
        .get("examples")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default();

    let arguments = object
        .get("arguments")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|v| {
                    let arg = v.as_object()?;
                    Some(ToolArgument {
                        name: arg.get("name")?.as_str()?.to_string(),
                        description: arg.get("description")?.as_str()?.to_string(),
                        required: arg
                            .get("required")
                            .and_then(|r| r.as_bool())
                            .unwrap_or(false),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    ToolManifest {
        name: sanitize_tool_name(&string_field("name", &base.name)),
        description: string_field("description", &base.description),
        version: string_field("version", &base.version),
        runtime: TOOL_RUNTIME.to_string(),
        entrypoint: string_field("entrypoint", &base.entrypoint),
        examples,
        arguments,
    }
}

/// Collapse an arbitrary name into a non-empty kebab-case slug.
pub fn sanitize_tool_name(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for ch in name.to_lowercase().chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            slug.push(ch);
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    let slug = slug.trim_matches('-').to_string();

    if slug.is_empty() {
        FALLBACK_TOOL_NAME.to_string()
    } else {
        slug
    }
}

/// Distill a tool name from the user's intent: drop stop-words and
/// single-letter fragments, keep the first four significant words.
pub fn derive_fallback_tool_name(intent: &str) -> String {
    let normalized: String = intent
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
                c
            } else {
                ' '
            }
        })
        .collect();

    let parts: Vec<&str> = normalized
        .split_whitespace()
        .filter(|part| part.len() > 1 && !STOP_WORDS.contains(part))
        .take(4)
        .collect();

    if parts.is_empty() {
        FALLBACK_TOOL_NAME.to_string()
    } else {
        sanitize_tool_name(&parts.join("-"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sanitize_collapses_punctuation_and_case() {
        assert_eq!(sanitize_tool_name("CSV Cleaner!!"), "csv-cleaner");
        assert_eq!(sanitize_tool_name("--already--kebab--"), "already-kebab");
        assert_eq!(sanitize_tool_name("***"), FALLBACK_TOOL_NAME);
        assert_eq!(sanitize_tool_name(""), FALLBACK_TOOL_NAME);
    }

    #[test]
    fn fallback_name_strips_stop_words() {
        assert_eq!(derive_fallback_tool_name("create a csv cleaner"), "csv-cleaner");
        assert_eq!(
            derive_fallback_tool_name("Make the tool that renames mp3 files"),
            "renames-mp3-files"
        );
        assert_eq!(derive_fallback_tool_name("a an the"), FALLBACK_TOOL_NAME);
        assert_eq!(derive_fallback_tool_name(""), FALLBACK_TOOL_NAME);
    }

    #[test]
    fn fallback_name_caps_significant_words() {
        let name = derive_fallback_tool_name("convert json records into csv rows quickly please");
        assert!(name.split('-').count() <= 4, "got: {name}");
    }

    #[test]
    fn normalize_null_yields_intent_fallback() {
        let manifest = normalize_manifest(None, "create csv cleaner");
        assert_eq!(manifest.name, "csv-cleaner");
        assert_eq!(manifest.runtime, TOOL_RUNTIME);
        assert_eq!(manifest.entrypoint, DEFAULT_ENTRYPOINT);
        assert!(manifest.examples.is_empty());
        assert!(manifest.arguments.is_empty());
    }

    #[test]
    fn normalize_fills_missing_optionals() {
        let raw = json!({ "name": "My Tool", "description": "desc" });
        let manifest = normalize_manifest(Some(&raw), "whatever intent");
        assert_eq!(manifest.name, "my-tool");
        assert_eq!(manifest.version, "1.0.0");
        assert_eq!(manifest.runtime, TOOL_RUNTIME);
        assert_eq!(manifest.entrypoint, DEFAULT_ENTRYPOINT);
        assert!(manifest.examples.is_empty());
        assert!(manifest.arguments.is_empty());
    }

    #[test]
    fn normalize_pins_runtime_literal() {
        let raw = json!({ "name": "x-tool", "runtime": "node" });
        let manifest = normalize_manifest(Some(&raw), "anything");
        assert_eq!(manifest.runtime, TOOL_RUNTIME);
    }

    #[test]
    fn normalize_keeps_well_formed_arguments() {
        let raw = json!({
            "name": "arg-tool",
            "arguments": [
                { "name": "input", "description": "input file", "required": true },
                { "name": "bad" },
                { "name": "output", "description": "output file" }
            ]
        });
        let manifest = normalize_manifest(Some(&raw), "anything");
        assert_eq!(manifest.arguments.len(), 2);
        assert!(manifest.arguments[0].required);
        assert!(!manifest.arguments[1].required);
    }

    #[test]
    fn manifest_wire_keys_round_trip() {
        let manifest = ToolManifest::fallback("csv cleaner");
        let value = serde_json::to_value(&manifest).unwrap();
        for key in [
            "name",
            "description",
            "version",
            "runtime",
            "entrypoint",
            "examples",
            "arguments",
        ] {
            assert!(value.get(key).is_some(), "missing key {key}");
        }
        let back: ToolManifest = serde_json::from_value(value).unwrap();
        assert_eq!(back, manifest);
    }
}
