//! Building blocks for generated XPath expressions.

pub const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";

const XPATH_PREFIXES: [&str; 4] = ["/", "(", ".//", "//*"];
const XPATH_MARKERS: [&str; 6] = ["::", "()", "@", "text(", "contains(", "normalize-space("];

/// Quotes `value` as an XPath 1.0 string literal.
///
/// Single quotes are preferred; a value containing single quotes is wrapped in
/// double quotes; a value containing both is assembled with `concat()`.
pub fn xpath_string_literal(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{}'", value);
    }
    if !value.contains('"') {
        return format!("\"{}\"", value);
    }
    let parts: Vec<String> = value.split('\'').map(|part| format!("'{}'", part)).collect();
    format!("concat({})", parts.join(", \"'\", "))
}

/// Heuristic: does this string read like an XPath expression already?
pub fn looks_xpath_like(locator: &str) -> bool {
    let locator = locator.trim();
    XPATH_PREFIXES.iter().any(|p| locator.starts_with(p)) || XPATH_MARKERS.iter().any(|m| locator.contains(m))
}

/// `contains(translate(<subject>, A-Z, a-z), '<needle lowercased>')`
pub fn lowercase_contains(subject: &str, needle: &str) -> String {
    format!(
        "contains(translate({}, '{}', '{}'), {})",
        subject,
        UPPERCASE,
        LOWERCASE,
        xpath_string_literal(&needle.to_lowercase())
    )
}
