//! Renderer trait and output helpers shared by the renderers.

use std::collections::HashMap;

use wr_xdom::Listener;

/// A listener that accumulates its output as text.
///
/// A renderer is created for a single render and consumed by
/// [`finish`](Self::finish).
pub trait PrintRenderer: Listener {
    /// Return the rendered text.
    fn finish(self: Box<Self>) -> String;
}

/// Escape special HTML characters.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

/// Generates unique heading ids within one document.
///
/// Ids are `H` followed by the lowercase letters and digits of the heading
/// text; repeated ids get a `-1`, `-2`, ... suffix.
#[derive(Debug, Default)]
pub(crate) struct HeadingIds {
    seen: HashMap<String, usize>,
}

impl HeadingIds {
    pub(crate) fn next(&mut self, text: &str) -> String {
        let base: String = std::iter::once('H')
            .chain(
                text.chars()
                    .filter(|c| c.is_alphanumeric())
                    .flat_map(char::to_lowercase),
            )
            .collect();
        let count = self.seen.entry(base.clone()).or_insert(0);
        let id = if *count == 0 {
            base
        } else {
            format!("{base}-{count}")
        };
        *count += 1;
        id
    }
}
