//! Inline spans: math passthrough, code, emphasis, links.

use crate::escape::{push_escaped, push_escaped_char};
use crate::RenderOptions;

/// Characters that lose their markup meaning when preceded by a backslash.
const ESCAPABLE: &[char] = &['*', '_', '`', '#', '|', '~', '$', '[', ']'];

/// How far past an opener the scan for its closer may look, in bytes.
const MAX_SPAN_LOOKAHEAD: usize = 1024;
/// Emphasis and link labels nest at most this deep.
const MAX_INLINE_DEPTH: usize = 8;

pub(crate) fn render_inline(text: &str, opts: &RenderOptions) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 4);
    render_into(text, opts, 0, &mut out);
    out
}

fn render_into(text: &str, opts: &RenderOptions, depth: usize, out: &mut String) {
    let mut i = 0;
    let mut prev: Option<char> = None;
    while let Some(ch) = text[i..].chars().next() {
        let rest = &text[i..];
        match try_span(rest, prev, opts, depth, out) {
            Some(len) => {
                prev = rest[..len].chars().last();
                i += len;
            }
            None => {
                push_escaped_char(out, ch);
                prev = Some(ch);
                i += ch.len_utf8();
            }
        }
    }
}

/// Try every span rule at the start of `rest`; on success the span has been
/// written to `out` and its byte length is returned.
fn try_span(rest: &str, prev: Option<char>, opts: &RenderOptions, depth: usize, out: &mut String) -> Option<usize> {
    if opts.math {
        if let Some(len) = math_span(rest) {
            push_escaped(out, &rest[..len]);
            return Some(len);
        }
    }
    if let Some(len) = escaped_char(rest, out) {
        return Some(len);
    }
    if let Some(len) = code_span(rest, out) {
        return Some(len);
    }
    if depth >= MAX_INLINE_DEPTH {
        return None;
    }
    if let Some(len) = emphasis(rest, prev, opts, depth, out) {
        return Some(len);
    }
    if opts.links {
        if let Some(len) = link(rest, opts, depth, out) {
            return Some(len);
        }
    }
    None
}

/// Byte length of a LaTeX span starting at `rest`, delimiters included.
pub(crate) fn math_span(rest: &str) -> Option<usize> {
    for (open, close) in [("\\(", "\\)"), ("\\[", "\\]"), ("$$", "$$")] {
        if let Some(body) = rest.strip_prefix(open) {
            let end = body.find(close)?;
            if end == 0 {
                return None;
            }
            return Some(open.len() + end + close.len());
        }
    }
    single_dollar(rest)
}

/// `$…$`: the opener must be followed by a non-space, the closer preceded by
/// a non-space and not followed by a digit, so "$5 and $6" stays text.
fn single_dollar(rest: &str) -> Option<usize> {
    let body = rest.strip_prefix('$')?;
    let first = body.chars().next()?;
    if first.is_whitespace() || first == '$' {
        return None;
    }
    let mut search = 0;
    while let Some(pos) = body[search..].find('$') {
        let at = search + pos;
        if at > MAX_SPAN_LOOKAHEAD {
            return None;
        }
        let before = body[..at].chars().last();
        let after = body[at + 1..].chars().next();
        let closes = at > 0
            && !before.is_some_and(char::is_whitespace)
            && before != Some('\\')
            && !after.is_some_and(|c| c.is_ascii_digit());
        if closes {
            return Some(at + 2);
        }
        search = at + 1;
    }
    None
}

fn escaped_char(rest: &str, out: &mut String) -> Option<usize> {
    let mut chars = rest.chars();
    if chars.next()? != '\\' {
        return None;
    }
    let next = chars.next()?;
    if !ESCAPABLE.contains(&next) {
        return None;
    }
    push_escaped_char(out, next);
    Some(1 + next.len_utf8())
}

fn code_span(rest: &str, out: &mut String) -> Option<usize> {
    let body = rest.strip_prefix('`')?;
    let end = body.find('`')?;
    if end == 0 {
        return None;
    }
    out.push_str("<code>");
    push_escaped(out, &body[..end]);
    out.push_str("</code>");
    Some(end + 2)
}

fn emphasis(rest: &str, prev: Option<char>, opts: &RenderOptions, depth: usize, out: &mut String) -> Option<usize> {
    for (delim, tag) in [("**", "strong"), ("__", "strong"), ("*", "em"), ("_", "em")] {
        if !rest.starts_with(delim) {
            continue;
        }
        let underscore = delim.starts_with('_');
        // snake_case identifiers are not emphasis
        if underscore && prev.is_some_and(char::is_alphanumeric) {
            return None;
        }
        let body = &rest[delim.len()..];
        return match find_closing(body, delim, underscore) {
            Some(end) => {
                out.push('<');
                out.push_str(tag);
                out.push('>');
                render_into(&body[..end], opts, depth + 1, out);
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
                Some(end + delim.len() * 2)
            }
            // An unmatched `**` stays literal rather than opening an `*` span.
            None if delim.len() == 2 => {
                out.push_str(delim);
                Some(2)
            }
            None => None,
        };
    }
    None
}

fn find_closing(body: &str, delim: &str, underscore: bool) -> Option<usize> {
    let first = body.chars().next()?;
    if first.is_whitespace() {
        return None;
    }
    let marker = delim.as_bytes()[0];
    let mut i = 0;
    while let Some(ch) = body[i..].chars().next() {
        if i > MAX_SPAN_LOOKAHEAD {
            return None;
        }
        let rest = &body[i..];
        if ch == '\\' {
            i += 1 + rest[1..].chars().next().map_or(0, char::len_utf8);
            continue;
        }
        if ch == '`' {
            if let Some(end) = rest[1..].find('`') {
                i += end + 2;
                continue;
            }
        }
        if ch == '$' || rest.starts_with("\\(") || rest.starts_with("\\[") {
            if let Some(len) = math_span(rest) {
                i += len;
                continue;
            }
        }
        // A single delimiter steps over doubled ones so nested strong does not close it.
        if delim.len() == 1 && rest.as_bytes().get(1) == Some(&marker) && rest.as_bytes()[0] == marker {
            i += 2;
            continue;
        }
        if i > 0 && rest.starts_with(delim) {
            let before = body[..i].chars().last();
            let after = rest[delim.len()..].chars().next();
            let ok_before = !before.is_some_and(char::is_whitespace);
            let ok_after = !underscore || !after.is_some_and(char::is_alphanumeric);
            if ok_before && ok_after {
                return Some(i);
            }
        }
        i += ch.len_utf8();
    }
    None
}

fn link(rest: &str, opts: &RenderOptions, depth: usize, out: &mut String) -> Option<usize> {
    let body = rest.strip_prefix('[')?;
    let close = body.find("](")?;
    let label = &body[..close];
    if label.is_empty() || label.contains('[') {
        return None;
    }
    let target = &body[close + 2..];
    let end = target.find(')')?;
    let url = target[..end].trim();
    if url.is_empty() || url.contains(char::is_whitespace) || !is_safe_url(url) {
        return None;
    }
    out.push_str("<a href=\"");
    push_escaped(out, url);
    out.push_str("\" target=\"_blank\" rel=\"noopener noreferrer\">");
    render_into(label, opts, depth + 1, out);
    out.push_str("</a>");
    Some(1 + close + 2 + end + 1)
}

fn is_safe_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.starts_with("https://")
        || lower.starts_with("http://")
        || (url.starts_with('/') && !url.starts_with("//"))
        || url.starts_with('#')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(text: &str) -> String {
        render_inline(text, &RenderOptions::default())
    }

    #[test]
    fn test_strong_and_em() {
        assert_eq!(r("**bold** and *it*"), "<strong>bold</strong> and <em>it</em>");
        assert_eq!(r("__bold__ and _it_"), "<strong>bold</strong> and <em>it</em>");
    }

    #[test]
    fn test_nested_strong_inside_em() {
        assert_eq!(r("*a **b** c*"), "<em>a <strong>b</strong> c</em>");
    }

    #[test]
    fn test_spaced_asterisks_are_multiplication() {
        assert_eq!(r("2 * 3 * 4"), "2 * 3 * 4");
    }

    #[test]
    fn test_snake_case_is_not_emphasis() {
        assert_eq!(r("use pass_rate_value here"), "use pass_rate_value here");
    }

    #[test]
    fn test_unterminated_delimiters_stay_literal() {
        assert_eq!(r("**open"), "**open");
        assert_eq!(r("`open"), "`open");
        assert_eq!(r("\\(x"), "\\(x");
    }

    #[test]
    fn test_math_spans_untouched() {
        assert_eq!(r(r"\(a_1 * b_2\)"), r"\(a_1 * b_2\)");
        assert_eq!(r("$x_1 < x_2$"), "$x_1 &lt; x_2$");
        assert_eq!(r("$$\\int_0^1 x\\,dx$$"), "$$\\int_0^1 x\\,dx$$");
    }

    #[test]
    fn test_currency_is_not_math() {
        assert_eq!(r("$5 and *six* $6"), "$5 and <em>six</em> $6");
    }

    #[test]
    fn test_math_inside_strong() {
        assert_eq!(r("**area $a*b$**"), "<strong>area $a*b$</strong>");
    }

    #[test]
    fn test_code_span_escapes() {
        assert_eq!(r("run `a<b && *c*`"), "run <code>a&lt;b &amp;&amp; *c*</code>");
    }

    #[test]
    fn test_backslash_escapes() {
        assert_eq!(r(r"\*not em\*"), "*not em*");
        assert_eq!(r(r"cost \$5"), "cost $5");
    }

    #[test]
    fn test_links_only_for_safe_schemes() {
        assert_eq!(
            r("[Elements](https://example.org/e)"),
            "<a href=\"https://example.org/e\" target=\"_blank\" rel=\"noopener noreferrer\">Elements</a>"
        );
        assert_eq!(r("[x](javascript:alert(1))"), "[x](javascript:alert(1))");
    }

    #[test]
    fn test_unmatched_openers_scan_a_bounded_window() {
        let text = "*a ".repeat(20_000);
        let started = std::time::Instant::now();
        assert_eq!(r(&text), text);
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }

    #[test]
    fn test_emphasis_past_lookahead_stays_literal() {
        let long = format!("*{}*", "x".repeat(MAX_SPAN_LOOKAHEAD + 10));
        assert_eq!(r(&long), long);
        assert_eq!(r("*short*"), "<em>short</em>");
    }

    #[test]
    fn test_four_level_emphasis_nesting() {
        assert_eq!(
            r("**a *b __c _d_ c__ b* a**"),
            "<strong>a <em>b <strong>c <em>d</em> c</strong> b</em> a</strong>"
        );
    }

    #[test]
    fn test_alternating_delimiters_on_small_stack() {
        let text = format!("{}x{}", "*_".repeat(2000), "_*".repeat(2000));
        let handle = std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(move || r(&text))
            .unwrap();
        assert!(handle.join().unwrap().contains('x'));
    }

    #[test]
    fn test_math_disabled_allows_emphasis() {
        let opts = RenderOptions { math: false, ..RenderOptions::default() };
        assert_eq!(render_inline("$*a*$", &opts), "$<em>a</em>$");
    }
}
