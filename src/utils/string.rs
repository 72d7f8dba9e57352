/// Strips the quotes (and Python string prefixes such as `b` or `r`) from a
/// string literal's source text and resolves common escape sequences.
pub fn unquote_string(s: &str) -> String {
    let s = s.trim();
    let body = s.trim_start_matches(|c: char| {
        matches!(c, 'b' | 'B' | 'r' | 'R' | 'u' | 'U' | 'f' | 'F')
    });
    let raw = body.len() != s.len() && s[..s.len() - body.len()].to_lowercase().contains('r');

    let inner = ["\"\"\"", "'''", "\"", "'", "`"]
        .iter()
        .find(|q| body.len() >= 2 * q.len() && body.starts_with(**q) && body.ends_with(**q))
        .map(|q| &body[q.len()..body.len() - q.len()]);

    match inner {
        Some(inner) if raw => inner.to_string(),
        Some(inner) => unescape(inner),
        None => s.to_string(),
    }
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Removes generic arguments: `Map<String, List<Key>>` becomes `Map`.
pub fn strip_generics(type_text: &str) -> String {
    let mut depth = 0usize;
    let mut out = String::with_capacity(type_text.len());
    for c in type_text.chars() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            c if depth == 0 && !c.is_whitespace() => out.push(c),
            _ => {}
        }
    }
    out
}

/// `UPPER_SNAKE` names are treated as constants.
pub fn is_constant_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

pub fn starts_uppercase(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_uppercase())
}

/// `s` without `prefix`, compared ASCII case-insensitively.
pub fn strip_prefix_ignore_case<'s>(s: &'s str, prefix: &str) -> Option<&'s str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}
