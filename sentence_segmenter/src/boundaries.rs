//! Sentence-boundary marking over a protection-substituted paragraph.

pub(crate) const SPLIT_MARKER: &str = "__SPLIT_MARKER__";

const fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

const fn is_closer(c: char) -> bool {
    matches!(c, '"' | '”' | '\'' | '’' | ']' | ')')
}

fn is_opener_or_capital(c: char) -> bool {
    c.is_uppercase() || matches!(c, '“' | '"' | '\'' | '‘')
}

/// Insert `SPLIT_MARKER` after every true sentence boundary.
///
/// A boundary is terminal punctuation, optionally followed by exactly one
/// closing quote or bracket, followed either by whitespace and then a
/// capital letter or opening quote, or by the end of the string. The
/// whitespace between boundary and next sentence is consumed; everything
/// else passes through untouched.
pub(crate) fn mark_boundaries(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut out = String::with_capacity(text.len() + SPLIT_MARKER.len());
    let mut i = 0;

    while i < len {
        let c = chars[i];
        if is_terminal(c) {
            let mut j = i + 1;
            let mut closer = None;
            if j < len && is_closer(chars[j]) {
                closer = Some(chars[j]);
                j += 1;
            }
            let whitespace_start = j;
            while j < len && chars[j].is_whitespace() {
                j += 1;
            }
            let at_end = j >= len;
            let had_whitespace = j > whitespace_start;
            let splits = if at_end {
                // end-of-paragraph punctuation is always a boundary
                true
            } else {
                had_whitespace && is_opener_or_capital(chars[j])
            };
            if splits {
                out.push(c);
                if let Some(q) = closer {
                    out.push(q);
                }
                out.push_str(SPLIT_MARKER);
                i = j;
                continue;
            }
        }
        out.push(c);
        i += 1;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marked(src: &str) -> Vec<String> {
        mark_boundaries(src)
            .split(SPLIT_MARKER)
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn splits_before_capitals() {
        assert_eq!(marked("One. Two."), vec!["One.", "Two."]);
        assert_eq!(marked("Ready? Go!"), vec!["Ready?", "Go!"]);
    }

    #[test]
    fn no_split_without_whitespace() {
        assert_eq!(marked("3.14 is pi."), vec!["3.14 is pi."]);
        assert_eq!(marked("e.g.Apples"), vec!["e.g.Apples"]);
    }

    #[test]
    fn no_split_before_lowercase() {
        assert_eq!(marked("one. two."), vec!["one. two."]);
    }

    #[test]
    fn closer_rides_with_the_boundary() {
        assert_eq!(
            marked("He said \"stop.\" Then he left."),
            vec!["He said \"stop.\"", "Then he left."]
        );
        assert_eq!(marked("(Done.) Next."), vec!["(Done.)", "Next."]);
    }

    #[test]
    fn end_of_string_is_a_boundary() {
        assert_eq!(marked("The end.\""), vec!["The end.\""]);
        assert_eq!(mark_boundaries("Over."), format!("Over.{}", SPLIT_MARKER));
    }

    #[test]
    fn only_one_closer_is_consumed() {
        // a second closer defeats the boundary mid-string
        assert_eq!(marked("(He said \"go.\") Now."), vec!["(He said \"go.\") Now."]);
    }
}
