//! Shell escaping, quoting and command-line assembly.

use std::collections::BTreeMap;

/// Escape a value for use inside single quotes.
/// Replaces `'` with `'\''` (end quote, escaped quote, start quote).
pub fn escape_single_quote_content(value: &str) -> String {
    value.replace('\'', "'\\''")
}

/// Quote a single argument for shell execution.
/// - Empty strings become `''`
/// - Strings with shell metacharacters are wrapped in single quotes
/// - Embedded single quotes are escaped
pub fn quote_arg(arg: &str) -> String {
    if arg.is_empty() {
        return "''".to_string();
    }

    // Characters that require quoting
    const SHELL_META: &[char] = &[
        ' ', '\t', '\n', '\'', '"', '\\', '$', '`', '!', '*', '?', '[', ']', '(', ')', '{', '}',
        '<', '>', '|', '&', ';', '#', '~',
    ];

    if !arg.contains(SHELL_META) {
        return arg.to_string();
    }

    format!("'{}'", escape_single_quote_content(arg))
}

/// Quote and join multiple arguments for shell execution.
pub fn quote_args(args: &[String]) -> String {
    args.iter()
        .map(|a| quote_arg(a))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Quote a path for shell execution (always quotes).
pub fn quote_path(path: &str) -> String {
    format!("'{}'", escape_single_quote_content(path))
}

/// Quote a path for a remote shell. A leading `~` stays outside the quotes
/// so the host expands it.
pub fn quote_remote_path(path: &str) -> String {
    match path.strip_prefix("~/") {
        Some("") => "~/".to_string(),
        Some(rest) => format!("~/{}", quote_path(rest)),
        None if path == "~" => "~".to_string(),
        None => quote_path(path),
    }
}

/// Render `export K=V K2=V2` for a set of variables, values quoted as needed.
/// Returns `None` for an empty set.
pub fn export_clause(vars: &BTreeMap<String, String>) -> Option<String> {
    if vars.is_empty() {
        return None;
    }
    let assignments = vars
        .iter()
        .map(|(k, v)| format!("{}={}", k, quote_arg(v)))
        .collect::<Vec<_>>()
        .join(" ");
    Some(format!("export {}", assignments))
}

/// Argument-list formatter for assembling shell commands.
///
/// Every argument pushed through [`CommandLine::arg`] is quoted consistently;
/// [`CommandLine::raw`] appends a fragment untouched (for operator-supplied
/// passthrough such as `docker <args...>`).
#[derive(Debug, Clone, Default)]
pub struct CommandLine {
    parts: Vec<String>,
}

impl CommandLine {
    pub fn new(program: &str) -> Self {
        Self {
            parts: vec![quote_arg(program)],
        }
    }

    pub fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.parts.push(quote_arg(arg.as_ref()));
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for arg in args {
            self.parts.push(quote_arg(arg.as_ref()));
        }
        self
    }

    /// `--flag value`, skipped when `value` is `None`.
    pub fn opt(self, flag: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.arg(flag).arg(v),
            None => self,
        }
    }

    /// Append an unquoted fragment.
    pub fn raw(mut self, fragment: impl AsRef<str>) -> Self {
        let fragment = fragment.as_ref().trim();
        if !fragment.is_empty() {
            self.parts.push(fragment.to_string());
        }
        self
    }

    pub fn render(&self) -> String {
        self.parts.join(" ")
    }
}

impl std::fmt::Display for CommandLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// Parse `KEY=VAL,KEY2=VAL2` into a map. Only the first `=` splits.
pub fn parse_env_pairs(spec: &str) -> Option<BTreeMap<String, String>> {
    let mut vars = BTreeMap::new();
    for item in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (key, value) = item.split_once('=')?;
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        vars.insert(key.to_string(), value.to_string());
    }
    Some(vars)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_paths_keep_home_unquoted() {
        assert_eq!(quote_remote_path("/srv/apps/toolset"), "'/srv/apps/toolset'");
        assert_eq!(quote_remote_path("~/app"), "~/'app'");
        assert_eq!(quote_remote_path("~"), "~");
        assert_eq!(quote_remote_path("~/"), "~/");
        assert_eq!(quote_remote_path("/tmp/~x"), "'/tmp/~x'");
    }

    #[test]
    fn quote_arg_simple() {
        assert_eq!(quote_arg("push"), "push");
        assert_eq!(quote_arg("obitec/webapp:1.2.0"), "obitec/webapp:1.2.0");
    }

    #[test]
    fn quote_arg_with_spaces() {
        assert_eq!(quote_arg("hello world"), "'hello world'");
    }

    #[test]
    fn quote_arg_with_single_quote() {
        assert_eq!(quote_arg("it's"), "'it'\\''s'");
    }

    #[test]
    fn quote_arg_empty() {
        assert_eq!(quote_arg(""), "''");
    }

    #[test]
    fn quote_path_with_quote() {
        assert_eq!(quote_path("/srv/apps/it's"), "'/srv/apps/it'\\''s'");
    }

    #[test]
    fn export_clause_orders_keys_and_quotes_values() {
        let mut vars = BTreeMap::new();
        vars.insert("RECIPE".to_string(), "toolset-1.0.0".to_string());
        vars.insert("CEXT".to_string(), "True".to_string());
        vars.insert("MSG".to_string(), "two words".to_string());
        assert_eq!(
            export_clause(&vars).unwrap(),
            "export CEXT=True MSG='two words' RECIPE=toolset-1.0.0"
        );
        assert_eq!(export_clause(&BTreeMap::new()), None);
    }

    #[test]
    fn command_line_quotes_each_argument() {
        let cmd = CommandLine::new("git")
            .arg("tag")
            .arg("-a")
            .arg("v1.0.0")
            .arg("-m")
            .arg("release 1.0.0; rm -rf /");
        assert_eq!(
            cmd.render(),
            "git tag -a v1.0.0 -m 'release 1.0.0; rm -rf /'"
        );
    }

    #[test]
    fn command_line_opt_and_raw() {
        let cmd = CommandLine::new("docker")
            .arg("build")
            .opt("-f", Some("Dockerfile-wheel"))
            .opt("--target", None)
            .raw("  --no-cache .  ");
        assert_eq!(cmd.render(), "docker build -f Dockerfile-wheel --no-cache .");
    }

    #[test]
    fn parse_env_pairs_splits_on_first_equals() {
        let vars = parse_env_pairs("FOO=bar, URL=postgres://u:p@h/db?x=1").unwrap();
        assert_eq!(vars["FOO"], "bar");
        assert_eq!(vars["URL"], "postgres://u:p@h/db?x=1");
    }

    #[test]
    fn parse_env_pairs_rejects_missing_equals() {
        assert!(parse_env_pairs("FOO").is_none());
        assert!(parse_env_pairs("=bar").is_none());
    }
}
