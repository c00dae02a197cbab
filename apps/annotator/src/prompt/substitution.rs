use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::codec::template::Template;

static EXTRA_BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n\s*\n").expect("blank-line pattern is valid"));

/// Replaces `{{ key }}` for every key in `context`. Unknown placeholders are left as-is.
pub fn substitute(template: &str, context: &HashMap<String, String>) -> String {
    Template::compile(template).render(|name| context.get(name))
}

/// Fills `{{ INPUT }}` and `{{ EXAMPLES }}` in an augmentation prompt.
///
/// An empty `examples` blanks its placeholder; the blank lines this leaves
/// behind collapse to a single empty line.
pub fn build_prompt(prompt: &str, input: &str, examples: &str) -> String {
    let filled = Template::compile(prompt).render(|name| match name {
        "INPUT" => Some(input),
        "EXAMPLES" => Some(examples),
        _ => None,
    });
    EXTRA_BLANK_LINES
        .replace_all(&filled, "\n\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_substitute_known_keys_whitespace_tolerant() {
        let ctx = context(&[("NAME", "Ada"), ("LANG", "Rust")]);
        assert_eq!(
            substitute("Hi {{NAME}}, write {{  LANG }}.", &ctx),
            "Hi Ada, write Rust."
        );
    }

    #[test]
    fn test_substitute_leaves_unknown_placeholders() {
        let ctx = context(&[("NAME", "Ada")]);
        assert_eq!(substitute("{{ NAME }} {{ OTHER }}", &ctx), "Ada {{ OTHER }}");
    }

    #[test]
    fn test_substitute_non_ascii_and_spaced_keys() {
        let ctx = context(&[("目标语言", "中文"), ("target language", "English")]);
        assert_eq!(
            substitute("{{ 目标语言 }} / {{target language}}", &ctx),
            "中文 / English"
        );
    }

    #[test]
    fn test_substitute_does_not_rescan_values() {
        let ctx = context(&[("A", "{{ B }}"), ("B", "x")]);
        assert_eq!(substitute("{{ A }}", &ctx), "{{ B }}");
    }

    #[test]
    fn test_build_prompt_fills_input_and_examples() {
        let prompt = "Examples:\n{{ EXAMPLES }}\n\nInput:\n{{ INPUT }}";
        assert_eq!(
            build_prompt(prompt, "It rained.", "Ex 1"),
            "Examples:\nEx 1\n\nInput:\nIt rained."
        );
    }

    #[test]
    fn test_build_prompt_collapses_blank_lines_when_examples_empty() {
        let prompt = "Annotate.\n\n{{ EXAMPLES }}\n\nInput: {{ INPUT }}\n";
        assert_eq!(build_prompt(prompt, "x", ""), "Annotate.\n\nInput: x");
    }
}
