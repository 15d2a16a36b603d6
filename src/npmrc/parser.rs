//! Parser for the ini-style npmrc format

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

static ENV_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\\*)\$\{([^}]+)\}").expect("environment reference pattern is valid")
});

/// Key/value pairs of one npmrc file.
///
/// Keys under a `[section]` header are stored as `section.key`.
pub type NpmrcValues = HashMap<String, String>;

/// Parse npmrc content.
///
/// - `;` and `#` start comment lines
/// - `key = value` pairs, whitespace trimmed, surrounding quotes removed
/// - bare `key` lines are stored as `"true"`
/// - `key[] = value` array entries keep the last value
/// - `${VAR}` references expand from the process environment
pub fn parse(content: &str) -> NpmrcValues {
    parse_with_env(content, |name| std::env::var(name).ok())
}

/// Same as [`parse`] with an explicit environment lookup
pub fn parse_with_env<F>(content: &str, env: F) -> NpmrcValues
where
    F: Fn(&str) -> Option<String>,
{
    let mut values = NpmrcValues::new();
    let mut section: Option<String> = None;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let name = unquote(name.trim());
            section = (!name.is_empty()).then(|| expand_env(name, &env));
            continue;
        }

        let (key, value) = match line.split_once('=') {
            Some((key, value)) => (key.trim(), unquote(value.trim())),
            None => (line, "true"),
        };
        let key = key.strip_suffix("[]").unwrap_or(key);
        let key = expand_env(unquote(key), &env);
        if key.is_empty() {
            continue;
        }

        let key = match &section {
            Some(section) => format!("{}.{}", section, key),
            None => key,
        };
        values.insert(key, expand_env(value, &env));
    }

    values
}

fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2
        && (bytes[0] == b'"' || bytes[0] == b'\'')
        && bytes[bytes.len() - 1] == bytes[0]
    {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

/// Replace `${VAR}` with its value; an odd number of preceding backslashes
/// escapes the reference.
fn expand_env<F>(value: &str, env: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    ENV_REFERENCE
        .replace_all(value, |caps: &regex::Captures| {
            let escapes = &caps[1];
            let name = &caps[2];
            if escapes.len() % 2 == 1 {
                format!("{}${{{}}}", &escapes[..escapes.len() - 1], name)
            } else {
                format!("{}{}", escapes, env(name).unwrap_or_default())
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[rstest]
    #[case("foo=bar", "foo", "bar")]
    #[case("  foo  =  bar  ", "foo", "bar")]
    #[case("foo=\"bar baz\"", "foo", "bar baz")]
    #[case("foo='bar'", "foo", "bar")]
    #[case("flag", "flag", "true")]
    #[case("list[]=a\nlist[]=b", "list", "b")]
    #[case("//localhost:4873/:_authToken=secret", "//localhost:4873/:_authToken", "secret")]
    #[case("@scope:registry=https://npm.example.com/", "@scope:registry", "https://npm.example.com/")]
    fn parse_reads_key_value_pairs(#[case] content: &str, #[case] key: &str, #[case] value: &str) {
        let values = parse_with_env(content, no_env);

        assert_eq!(values.get(key).map(String::as_str), Some(value));
    }

    #[test]
    fn parse_skips_comments_and_blank_lines() {
        let content = "; comment\n# another\n\nfoo=bar\n";

        let values = parse_with_env(content, no_env);

        assert_eq!(values.len(), 1);
        assert_eq!(values["foo"], "bar");
    }

    #[test]
    fn parse_prefixes_keys_with_section_name() {
        let content = "top=1\n[scope]\ninner=2\n";

        let values = parse_with_env(content, no_env);

        assert_eq!(values["top"], "1");
        assert_eq!(values["scope.inner"], "2");
        assert!(!values.contains_key("inner"));
    }

    #[test]
    fn parse_expands_environment_references() {
        let content = "//registry.example.com/:_authToken=${NPM_TOKEN}\nmissing=${UNSET}";
        let env = |name: &str| (name == "NPM_TOKEN").then(|| "t0ken".to_string());

        let values = parse_with_env(content, env);

        assert_eq!(values["//registry.example.com/:_authToken"], "t0ken");
        assert_eq!(values["missing"], "");
    }

    #[test]
    fn parse_keeps_escaped_environment_references() {
        let env = |_: &str| Some("expanded".to_string());

        let values = parse_with_env(r"literal=\${HOME}", env);

        assert_eq!(values["literal"], "${HOME}");
    }

    #[test]
    fn parse_value_may_contain_equals_sign() {
        let values = parse_with_env("key=a=b", no_env);

        assert_eq!(values["key"], "a=b");
    }

    #[test]
    #[serial_test::serial]
    fn parse_expands_process_environment() {
        // SAFETY: serialized with every other test touching this variable
        unsafe { std::env::set_var("DEPKEEPER_TEST_NPM_TOKEN", "from-env") };

        let values = parse("token=${DEPKEEPER_TEST_NPM_TOKEN}");

        unsafe { std::env::remove_var("DEPKEEPER_TEST_NPM_TOKEN") };
        assert_eq!(values["token"], "from-env");
    }
}
