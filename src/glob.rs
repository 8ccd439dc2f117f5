//! Prefix/suffix glob matching for namespace and name filters (§4.2e, §4.2.1).
//!
//! Deliberately narrower than a general glob: the spec only ever asks for a
//! single leading and/or trailing `*`, so rather than compiling an arbitrary
//! wildcard pattern we translate the pattern's edges directly into anchored
//! regex fragments.

use crate::config::GlobStyle;
use regex::Regex;

/// Match `value` against `pattern`, honoring a trailing `*` always and a
/// leading `*` only when `style` is `PrefixAndSuffix`.
pub fn glob_match(pattern: &str, value: &str, style: GlobStyle) -> bool {
    if pattern == "*" {
        return true;
    }

    let allow_leading = matches!(style, GlobStyle::PrefixAndSuffix);
    let leading = allow_leading && pattern.starts_with('*');
    let trailing = pattern.ends_with('*') && pattern.len() > 1;

    let core = {
        let mut s = pattern;
        if leading {
            s = &s[1..];
        }
        if trailing {
            s = &s[..s.len() - 1];
        }
        s
    };

    let mut regex_str = String::from("^");
    if leading {
        regex_str.push_str(".*");
    }
    regex_str.push_str(&regex::escape(core));
    if trailing {
        regex_str.push_str(".*");
    }
    regex_str.push('$');

    Regex::new(&regex_str).map(|re| re.is_match(value)).unwrap_or(false)
}

/// `true` if `value` matches none of `excluded`, given the supplied style.
pub fn matches_none(excluded: &[String], value: &str, style: GlobStyle) -> bool {
    !excluded.iter().any(|p| glob_match(p, value, style))
}

/// `true` if `patterns` is empty (no constraint) or `value` matches at least
/// one pattern.
pub fn matches_any_or_unconstrained(patterns: &[String], value: &str, style: GlobStyle) -> bool {
    patterns.is_empty() || patterns.iter().any(|p| glob_match(p, value, style))
}
