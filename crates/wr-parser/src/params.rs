//! Parameter list parsing.
//!
//! Parses `key="value" key2='value' key3=value` lists used by macro calls,
//! block parameters `(% ... %)` and link/image parameters. Inside quoted values
//! `~` escapes the next character.

use wr_xdom::Parameters;

/// Parse a parameter list.
///
/// Unrecognized fragments (bare words, stray quotes) are skipped.
#[must_use]
pub fn parse_params(s: &str) -> Parameters {
    let mut params = Parameters::new();
    let mut remaining = s.trim();

    while !remaining.is_empty() {
        remaining = remaining.trim_start();
        if let Some((key, value, rest)) = parse_key_value(remaining) {
            params.insert(key.to_owned(), value);
            remaining = rest;
        } else {
            let skip = remaining
                .find(char::is_whitespace)
                .unwrap_or(remaining.len());
            remaining = &remaining[skip..];
        }
    }

    params
}

/// Parse one `key=value` pair from the start of `s`.
fn parse_key_value(s: &str) -> Option<(&str, String, &str)> {
    let eq_pos = s.find('=')?;
    let key = s[..eq_pos].trim();

    if key.is_empty() || key.contains(char::is_whitespace) {
        return None;
    }

    let after_eq = s[eq_pos + 1..].trim_start();

    match after_eq.chars().next() {
        Some(quote @ ('"' | '\'')) => {
            let (value, consumed) = read_quoted(&after_eq[1..], quote)?;
            Some((key, value, &after_eq[1 + consumed..]))
        }
        _ => {
            let end = after_eq
                .find(char::is_whitespace)
                .unwrap_or(after_eq.len());
            Some((key, after_eq[..end].to_owned(), &after_eq[end..]))
        }
    }
}

/// Read up to the closing `quote`; returns the unescaped value and the number
/// of bytes consumed including the closing quote.
fn read_quoted(s: &str, quote: char) -> Option<(String, usize)> {
    let mut value = String::new();
    let mut chars = s.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '~' => {
                if let Some((_, escaped)) = chars.next() {
                    value.push(escaped);
                }
            }
            c if c == quote => return Some((value, i + c.len_utf8())),
            c => value.push(c),
        }
    }
    None
}

/// Serialize parameters as `key="value"` pairs in key order.
#[must_use]
pub fn format_params(params: &Parameters) -> String {
    params
        .iter()
        .map(|(key, value)| format!(r#"{key}="{}""#, escape_value(value)))
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '"' | '~') {
            escaped.push('~');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get<'a>(params: &'a Parameters, key: &str) -> Option<&'a str> {
        params.get(key).map(String::as_str)
    }

    #[test]
    fn test_empty() {
        assert!(parse_params("").is_empty());
        assert!(parse_params("   ").is_empty());
    }

    #[test]
    fn test_quoted_and_unquoted() {
        let params = parse_params(r#"reference="Main.Page" context=new title='A b'"#);
        assert_eq!(get(&params, "reference"), Some("Main.Page"));
        assert_eq!(get(&params, "context"), Some("new"));
        assert_eq!(get(&params, "title"), Some("A b"));
    }

    #[test]
    fn test_escaped_quote() {
        let params = parse_params(r#"value="say ~"hi~" ~~""#);
        assert_eq!(get(&params, "value"), Some(r#"say "hi" ~"#));
    }

    #[test]
    fn test_unterminated_quote_is_skipped() {
        let params = parse_params(r#"a="open b=2"#);
        assert_eq!(get(&params, "a"), None);
        assert_eq!(get(&params, "b"), Some("2"));
    }

    #[test]
    fn test_bare_words_skipped() {
        let params = parse_params("flag k=v");
        assert_eq!(params.len(), 1);
        assert_eq!(get(&params, "k"), Some("v"));
    }

    #[test]
    fn test_format_params_round_trips() {
        let params = parse_params(r#"b="2" a="x ~"y~"""#);
        let formatted = format_params(&params);
        assert_eq!(formatted, r#"a="x ~"y~"" b="2""#);
        assert_eq!(parse_params(&formatted), params);
    }
}
