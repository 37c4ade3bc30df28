//! Line-oriented block scanner.
//!
//! Each input line is classified once; consecutive lines of the same kind
//! accumulate into an open block which is written out when a different kind
//! of line (or a blank line) arrives.

use crate::escape::push_escaped;
use crate::inline::render_inline;
use crate::RenderOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    None,
    Left,
    Center,
    Right,
}

#[derive(Debug)]
enum Block {
    Paragraph(Vec<String>),
    List { ordered: bool, start: u64, items: Vec<String> },
    Quote(Vec<String>),
    /// Pipe-prefixed lines; only a table if the second line is a separator row.
    Table(Vec<String>),
    Code { lang: Option<String>, lines: Vec<String> },
    Math { close: &'static str, lines: Vec<String> },
}

/// Blockquotes nest at most this deep; further `>` markers are plain text.
const MAX_QUOTE_DEPTH: usize = 8;

pub(crate) fn render_blocks(text: &str, opts: &RenderOptions) -> String {
    render_nested(text, opts, 0)
}

fn render_nested(text: &str, opts: &RenderOptions, depth: usize) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 2);
    let mut current: Option<Block> = None;

    for line in text.lines() {
        // Verbatim blocks swallow everything until their closing line.
        match &mut current {
            Some(Block::Code { lines, .. }) => {
                if line.trim_start().starts_with("```") {
                    flush(&mut current, &mut out, opts, depth);
                } else {
                    lines.push(line.to_string());
                }
                continue;
            }
            Some(Block::Math { close, lines }) => {
                let done = line.trim() == *close;
                lines.push(line.to_string());
                if done {
                    flush(&mut current, &mut out, opts, depth);
                }
                continue;
            }
            _ => {}
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            flush(&mut current, &mut out, opts, depth);
            continue;
        }

        if let Some(info) = trimmed.strip_prefix("```") {
            flush(&mut current, &mut out, opts, depth);
            current = Some(Block::Code { lang: code_language(info), lines: Vec::new() });
            continue;
        }

        if opts.math && (trimmed == "$$" || trimmed == "\\[") {
            flush(&mut current, &mut out, opts, depth);
            let close = if trimmed == "$$" { "$$" } else { "\\]" };
            current = Some(Block::Math { close, lines: vec![trimmed.to_string()] });
            continue;
        }

        if is_rule(trimmed) {
            flush(&mut current, &mut out, opts, depth);
            out.push_str("<hr>\n");
            continue;
        }

        if let Some((level, heading)) = heading(trimmed) {
            flush(&mut current, &mut out, opts, depth);
            out.push_str(&format!("<h{level}>{}</h{level}>\n", render_inline(heading, opts)));
            continue;
        }

        if trimmed.starts_with('|') {
            match &mut current {
                Some(Block::Table(rows)) => rows.push(trimmed.to_string()),
                _ => {
                    flush(&mut current, &mut out, opts, depth);
                    current = Some(Block::Table(vec![trimmed.to_string()]));
                }
            }
            continue;
        }

        if let Some(quoted) = quote_text(trimmed).filter(|_| depth < MAX_QUOTE_DEPTH) {
            match &mut current {
                Some(Block::Quote(lines)) => lines.push(quoted.to_string()),
                _ => {
                    flush(&mut current, &mut out, opts, depth);
                    current = Some(Block::Quote(vec![quoted.to_string()]));
                }
            }
            continue;
        }

        if let Some(item) = list_item(trimmed) {
            match &mut current {
                Some(Block::List { ordered, items, .. }) if *ordered == item.ordered => {
                    items.push(item.text.to_string());
                }
                _ => {
                    flush(&mut current, &mut out, opts, depth);
                    current = Some(Block::List {
                        ordered: item.ordered,
                        start: item.number,
                        items: vec![item.text.to_string()],
                    });
                }
            }
            continue;
        }

        // Indented lines continue the previous list item.
        if line.starts_with("  ") || line.starts_with('\t') {
            if let Some(Block::List { items, .. }) = &mut current {
                if let Some(last) = items.last_mut() {
                    last.push(' ');
                    last.push_str(trimmed);
                    continue;
                }
            }
        }

        match &mut current {
            Some(Block::Paragraph(lines)) => lines.push(trimmed.to_string()),
            _ => {
                flush(&mut current, &mut out, opts, depth);
                current = Some(Block::Paragraph(vec![trimmed.to_string()]));
            }
        }
    }

    flush(&mut current, &mut out, opts, depth);
    out
}

fn flush(current: &mut Option<Block>, out: &mut String, opts: &RenderOptions, depth: usize) {
    let Some(block) = current.take() else {
        return;
    };
    match block {
        Block::Paragraph(lines) => write_paragraph(&lines, out, opts),
        Block::List { ordered, start, items } => {
            let tag = if ordered { "ol" } else { "ul" };
            if ordered && start != 1 {
                out.push_str(&format!("<ol start=\"{start}\">\n"));
            } else {
                out.push_str(&format!("<{tag}>\n"));
            }
            for item in &items {
                out.push_str(&format!("<li>{}</li>\n", render_inline(item, opts)));
            }
            out.push_str(&format!("</{tag}>\n"));
        }
        Block::Quote(lines) => {
            out.push_str("<blockquote>\n");
            out.push_str(&render_nested(&lines.join("\n"), opts, depth + 1));
            out.push_str("</blockquote>\n");
        }
        Block::Table(rows) => write_table(&rows, out, opts),
        Block::Code { lang, lines } => {
            match lang {
                Some(lang) => out.push_str(&format!("<pre><code class=\"language-{lang}\">")),
                None => out.push_str("<pre><code>"),
            }
            push_escaped(out, &lines.join("\n"));
            out.push_str("</code></pre>\n");
        }
        Block::Math { lines, .. } => {
            out.push_str("<div class=\"math-display\">");
            push_escaped(out, &lines.join("\n"));
            out.push_str("</div>\n");
        }
    }
}

fn write_paragraph(lines: &[String], out: &mut String, opts: &RenderOptions) {
    let separator = if opts.line_breaks { "<br>\n" } else { "\n" };
    let rendered: Vec<String> = lines.iter().map(|l| render_inline(l, opts)).collect();
    out.push_str("<p>");
    out.push_str(&rendered.join(separator));
    out.push_str("</p>\n");
}

fn write_table(rows: &[String], out: &mut String, opts: &RenderOptions) {
    let aligns = match rows.get(1).and_then(|r| separator_row(r)) {
        Some(aligns) => aligns,
        // Without a separator row this is prose that happens to start with `|`, e.g. `|x| = 3`.
        None => return write_paragraph(rows, out, opts),
    };
    let header = split_cells(&rows[0]);
    let width = header.len();

    out.push_str("<table>\n<thead>\n<tr>");
    for (idx, cell) in header.iter().enumerate() {
        write_cell(out, "th", cell, aligns.get(idx).copied().unwrap_or(Align::None), opts);
    }
    out.push_str("</tr>\n</thead>\n");

    if rows.len() > 2 {
        out.push_str("<tbody>\n");
        for row in &rows[2..] {
            let cells = split_cells(row);
            out.push_str("<tr>");
            for idx in 0..width {
                let cell = cells.get(idx).map(String::as_str).unwrap_or("");
                write_cell(out, "td", cell, aligns.get(idx).copied().unwrap_or(Align::None), opts);
            }
            out.push_str("</tr>\n");
        }
        out.push_str("</tbody>\n");
    }
    out.push_str("</table>\n");
}

fn write_cell(out: &mut String, tag: &str, text: &str, align: Align, opts: &RenderOptions) {
    let style = match align {
        Align::None => "",
        Align::Left => " style=\"text-align:left\"",
        Align::Center => " style=\"text-align:center\"",
        Align::Right => " style=\"text-align:right\"",
    };
    out.push_str(&format!("<{tag}{style}>{}</{tag}>", render_inline(text, opts)));
}

/// Split a pipe row into trimmed cells, honouring `\|` and pipes inside code or math.
fn split_cells(row: &str) -> Vec<String> {
    let inner = row.trim();
    let inner = inner.strip_prefix('|').unwrap_or(inner);
    let inner = match inner.strip_suffix('|') {
        Some(stripped) if !stripped.ends_with('\\') => stripped,
        _ => inner,
    };

    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut in_code = false;
    let mut in_math = false;
    let mut chars = inner.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' if chars.peek() == Some(&'|') => {
                cell.push('|');
                chars.next();
            }
            '`' => {
                in_code = !in_code;
                cell.push(ch);
            }
            '$' if !in_code => {
                in_math = !in_math;
                cell.push(ch);
            }
            '|' if !in_code && !in_math => {
                cells.push(cell.trim().to_string());
                cell.clear();
            }
            _ => cell.push(ch),
        }
    }
    cells.push(cell.trim().to_string());
    cells
}

fn separator_row(row: &str) -> Option<Vec<Align>> {
    let cells = split_cells(row);
    let mut aligns = Vec::with_capacity(cells.len());
    for cell in &cells {
        let left = cell.starts_with(':');
        let right = cell.ends_with(':') && cell.len() > 1;
        let dashes = cell.trim_start_matches(':').trim_end_matches(':');
        if dashes.is_empty() || !dashes.chars().all(|c| c == '-') {
            return None;
        }
        aligns.push(match (left, right) {
            (true, true) => Align::Center,
            (true, false) => Align::Left,
            (false, true) => Align::Right,
            (false, false) => Align::None,
        });
    }
    Some(aligns)
}

fn is_rule(line: &str) -> bool {
    let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    compact.len() >= 3
        && ['-', '*', '_']
            .iter()
            .any(|marker| compact.chars().all(|c| c == *marker))
}

fn heading(line: &str) -> Option<(usize, &str)> {
    let level = line.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &line[level..];
    if !rest.starts_with(' ') {
        return None;
    }
    let text = rest.trim().trim_end_matches('#').trim_end();
    Some((level, text))
}

fn quote_text(line: &str) -> Option<&str> {
    let rest = line.strip_prefix('>')?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

struct ListItem<'a> {
    ordered: bool,
    number: u64,
    text: &'a str,
}

fn list_item(line: &str) -> Option<ListItem<'_>> {
    for bullet in ["- ", "* ", "+ ", "• "] {
        if let Some(text) = line.strip_prefix(bullet) {
            return Some(ListItem { ordered: false, number: 0, text: text.trim() });
        }
    }

    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 || digits > 9 {
        return None;
    }
    let rest = &line[digits..];
    let text = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") "))?;
    let number = line[..digits].parse().ok()?;
    Some(ListItem { ordered: true, number, text: text.trim() })
}

fn code_language(info: &str) -> Option<String> {
    let lang: String = info
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '_'))
        .collect();
    (!lang.is_empty()).then_some(lang)
}
