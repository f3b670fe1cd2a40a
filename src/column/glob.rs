use regex::Regex;

/// Matcher for SQLite `GLOB` patterns.
///
/// `*` matches any run of characters, `?` a single character and `[...]` a
/// character class (negated with a leading `^`). Matching is case sensitive
/// and anchored at both ends.
#[derive(Debug, Clone)]
pub struct GlobMatcher {
    regex: Regex,
    literal: Option<String>,
}

impl GlobMatcher {
    /// Compiles `pattern`.
    ///
    /// # Errors
    ///
    /// Fails when a character class does not translate into a valid regular
    /// expression, e.g. a reversed range like `[z-a]`.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let literal = (!pattern.contains(['*', '?', '['])).then(|| pattern.to_owned());
        let regex = Regex::new(&glob_to_regex(pattern))?;
        Ok(Self { regex, literal })
    }

    /// Whether the pattern has no special characters and so only matches
    /// itself.
    pub fn is_equality(&self) -> bool {
        self.literal.is_some()
    }

    /// The pattern text when [`is_equality`](Self::is_equality) holds.
    pub fn literal(&self) -> Option<&str> {
        self.literal.as_deref()
    }

    pub fn matches(&self, input: &str) -> bool {
        match &self.literal {
            Some(literal) => literal == input,
            None => self.regex.is_match(input),
        }
    }
}

fn glob_to_regex(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push_str("(?s)^");

    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    push_class(&chars[i + 1..end], &mut out);
                    i = end;
                }
                None => out.push_str(r"\["),
            },
            c => {
                let mut buf = [0u8; 4];
                out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
            }
        }
        i += 1;
    }

    out.push('$');
    out
}

/// Index of the `]` closing the class opened at `open`. A `]` directly after
/// the opening bracket (or after `^`) is a literal member.
fn class_end(chars: &[char], open: usize) -> Option<usize> {
    let mut i = open + 1;
    if chars.get(i) == Some(&'^') {
        i += 1;
    }
    if chars.get(i) == Some(&']') {
        i += 1;
    }
    chars[i.min(chars.len())..]
        .iter()
        .position(|c| *c == ']')
        .map(|offset| i + offset)
}

fn push_class(body: &[char], out: &mut String) {
    out.push('[');
    let mut members = body;
    if let Some((&'^', rest)) = members.split_first() {
        out.push('^');
        members = rest;
    }
    for c in members {
        match c {
            '\\' | '[' | ']' | '&' | '~' | '^' => {
                out.push('\\');
                out.push(*c);
            }
            other => out.push(*other),
        }
    }
    out.push(']');
}
