//! Entry-script version stamping.
//!
//! The archive's stub supplies execution semantics, so the entry script's
//! own shebang is dropped unconditionally. When a version tag is given,
//! the version-declaration line is rewritten to carry the literal tag;
//! the result is the exact byte content embedded in the archive.

use regex::Regex;

/// A version declaration: a single line assigning a quoted literal to the
/// version variable.
const VERSION_LINE: &str = r"(?m)^\$version = '.*?';$";

/// Prepare entry-script content for embedding.
///
/// Drops the first line (the shebang). A non-empty `tag` replaces the
/// version-declaration line with an assignment of the literal tag,
/// keeping the statement terminator; an absent or empty tag leaves the
/// line as authored.
pub fn stamp_entry_script(source: &str, tag: Option<&str>) -> String {
    let body = match source.split_once('\n') {
        Some((_shebang, rest)) => rest,
        None => "",
    };

    let tag = match tag {
        Some(tag) if !tag.is_empty() => tag,
        _ => return body.to_string(),
    };

    let pattern = Regex::new(VERSION_LINE).expect("version line pattern is valid");
    let replacement = format!("$version = {};", php_string_literal(tag));
    pattern
        .replace(body, regex::NoExpand(&replacement))
        .into_owned()
}

/// Render a PHP single-quoted string literal (backslash and quote
/// escaped), matching `var_export` output for strings.
pub fn php_string_literal(value: &str) -> String {
    let mut literal = String::with_capacity(value.len() + 2);
    literal.push('\'');
    for c in value.chars() {
        if c == '\\' || c == '\'' {
            literal.push('\\');
        }
        literal.push(c);
    }
    literal.push('\'');
    literal
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = "#!/usr/bin/env php\n<?php\n\n$version = '1.0.0-dev';\n\nexit(main($version));\n";

    #[test]
    fn shebang_is_always_dropped() {
        let stamped = stamp_entry_script(SCRIPT, None);
        assert!(stamped.starts_with("<?php\n"));
        assert!(!stamped.contains("#!/usr/bin/env php"));
    }

    #[test]
    fn without_tag_the_version_line_is_untouched() {
        let stamped = stamp_entry_script(SCRIPT, None);
        assert!(stamped.contains("$version = '1.0.0-dev';"));
    }

    #[test]
    fn empty_tag_means_no_stamp() {
        let stamped = stamp_entry_script(SCRIPT, Some(""));
        assert!(stamped.contains("$version = '1.0.0-dev';"));
    }

    #[test]
    fn tag_replaces_the_version_line_exactly() {
        let stamped = stamp_entry_script(SCRIPT, Some("9.9.9"));
        assert!(stamped.contains("$version = '9.9.9';"));
        assert!(!stamped.contains("1.0.0-dev"));
        // The rest of the script is untouched.
        assert!(stamped.ends_with("exit(main($version));\n"));
    }

    #[test]
    fn only_the_declaration_line_matches() {
        let source = "#!/usr/bin/env php\n<?php\n$version = 'a';\n$other = '$version = \\'x\\';';\n";
        let stamped = stamp_entry_script(source, Some("2.0"));
        assert!(stamped.contains("$version = '2.0';"));
        assert!(stamped.contains("$other = "));
    }

    #[test]
    fn literal_escaping_matches_var_export() {
        assert_eq!(php_string_literal("1.2.3"), "'1.2.3'");
        assert_eq!(php_string_literal("it's"), r"'it\'s'");
        assert_eq!(php_string_literal(r"a\b"), r"'a\\b'");
    }

    #[test]
    fn script_without_newline_becomes_empty() {
        assert_eq!(stamp_entry_script("#!/usr/bin/env php", Some("1.0")), "");
    }
}
