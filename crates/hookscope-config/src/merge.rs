//! Layered configuration merging.

/// Which file layer a loaded config file belongs to.
///
/// The embedded defaults always apply and environment variables are reported
/// separately, so neither is a file layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayer {
    /// `~/.hookscope/config.toml`.
    User,
    /// `{workspace}/.hookscope/config.toml`.
    Workspace,
    /// File passed explicitly on the command line.
    Explicit,
}

impl std::fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::User => "user",
            Self::Workspace => "workspace",
            Self::Explicit => "explicit",
        };
        f.write_str(name)
    }
}

/// Recursively deep-merge `overlay` into `base`.
///
/// - Tables merge recursively per-field.
/// - Scalars and arrays from the overlay **replace** the base value.
pub fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                if let Some(base_val) = base_table.get_mut(key) {
                    deep_merge(base_val, overlay_val);
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
        },
    }
}

/// Collect the dotted paths of every leaf in `value`.
pub fn leaf_paths(value: &toml::Value, prefix: &str, out: &mut Vec<String>) {
    if let toml::Value::Table(table) = value {
        for (key, child) in table {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            leaf_paths(child, &path, out);
        }
    } else {
        out.push(prefix.to_owned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> toml::Value {
        toml::from_str(s).unwrap()
    }

    #[test]
    fn overlay_replaces_scalars_and_keeps_siblings() {
        let mut base = parse("[tools]\ntracer = \"strace\"\nextractor = \"tar\"\n");
        let overlay = parse("[tools]\ntracer = \"/opt/strace\"\n");
        deep_merge(&mut base, &overlay);

        assert_eq!(base["tools"]["tracer"].as_str(), Some("/opt/strace"));
        assert_eq!(base["tools"]["extractor"].as_str(), Some("tar"));
    }

    #[test]
    fn overlay_replaces_arrays_wholesale() {
        let mut base = parse("[logging]\ndirectives = [\"a=debug\", \"b=trace\"]\n");
        let overlay = parse("[logging]\ndirectives = [\"c=info\"]\n");
        deep_merge(&mut base, &overlay);

        let directives = base["logging"]["directives"].as_array().unwrap();
        assert_eq!(directives.len(), 1);
    }

    #[test]
    fn leaf_paths_are_dotted() {
        let value = parse("[trace]\nstring_limit = 1\n[fetch]\nignore_scripts = true\n");
        let mut paths = Vec::new();
        leaf_paths(&value, "", &mut paths);
        paths.sort();
        assert_eq!(paths, vec!["fetch.ignore_scripts", "trace.string_limit"]);
    }
}
