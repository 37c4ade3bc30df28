use euclid_render::{render_markdown, RenderOptions, Renderer};
use pretty_assertions::assert_eq;

#[test]
fn test_paragraph_lines_join_with_breaks() {
    assert_eq!(
        render_markdown("First line\nsecond line\n\nNew paragraph"),
        "<p>First line<br>\nsecond line</p>\n<p>New paragraph</p>\n"
    );
}

#[test]
fn test_line_breaks_can_be_disabled() {
    let renderer = Renderer::new(RenderOptions { line_breaks: false, ..RenderOptions::default() });
    assert_eq!(renderer.render("a\nb"), "<p>a\nb</p>\n");
}

#[test]
fn test_tutor_answer_document() {
    let answer = "\
## Pythagorean theorem

For a right triangle with legs $a$ and $b$:

\\[
a^2 + b^2 = c^2
\\]

- **Legs**: the two shorter sides
- *Hypotenuse*: opposite the right angle

> Euclid proves this as Proposition I.47.

---

1. Draw squares on each side
2. Compare areas";

    let expected = "\
<h2>Pythagorean theorem</h2>
<p>For a right triangle with legs $a$ and $b$:</p>
<div class=\"math-display\">\\[
a^2 + b^2 = c^2
\\]</div>
<ul>
<li><strong>Legs</strong>: the two shorter sides</li>
<li><em>Hypotenuse</em>: opposite the right angle</li>
</ul>
<blockquote>
<p>Euclid proves this as Proposition I.47.</p>
</blockquote>
<hr>
<ol>
<li>Draw squares on each side</li>
<li>Compare areas</li>
</ol>
";
    assert_eq!(render_markdown(answer), expected);
}

#[test]
fn test_table_with_alignment_and_padding() {
    let table = "\
| n | n² | prime? |
|:--|:--:|---:|
| 2 | 4 | yes |
| 4 | 16 |";

    let expected = "\
<table>
<thead>
<tr><th style=\"text-align:left\">n</th><th style=\"text-align:center\">n²</th><th style=\"text-align:right\">prime?</th></tr>
</thead>
<tbody>
<tr><td style=\"text-align:left\">2</td><td style=\"text-align:center\">4</td><td style=\"text-align:right\">yes</td></tr>
<tr><td style=\"text-align:left\">4</td><td style=\"text-align:center\">16</td><td style=\"text-align:right\"></td></tr>
</tbody>
</table>
";
    assert_eq!(render_markdown(table), expected);
}

#[test]
fn test_pipe_prose_is_not_a_table() {
    assert_eq!(render_markdown("|x| = 3 means x = ±3"), "<p>|x| = 3 means x = ±3</p>\n");
}

#[test]
fn test_html_is_escaped_everywhere() {
    let html = render_markdown("<script>alert(1)</script>\n\n- <b>item</b>\n\n| <i> |\n|---|\n| & |");
    assert!(!html.contains("<script>"));
    assert!(!html.contains("<b>"));
    assert!(!html.contains("<i>"));
    assert!(html.contains("&lt;script&gt;"));
    assert!(html.contains("<td>&amp;</td>"));
}

#[test]
fn test_fenced_code_is_verbatim() {
    let doc = "```python\nfor i in range(3):\n    print(i * 2)  # **not bold**\n```";
    assert_eq!(
        render_markdown(doc),
        "<pre><code class=\"language-python\">for i in range(3):\n    print(i * 2)  # **not bold**</code></pre>\n"
    );
}

#[test]
fn test_unterminated_fence_still_renders_code() {
    assert_eq!(render_markdown("```\nx < y"), "<pre><code>x &lt; y</code></pre>\n");
}

#[test]
fn test_display_dollar_math_block() {
    assert_eq!(
        render_markdown("$$\n\\sum_{k=1}^n k = \\frac{n(n+1)}{2}\n$$"),
        "<div class=\"math-display\">$$\n\\sum_{k=1}^n k = \\frac{n(n+1)}{2}\n$$</div>\n"
    );
}

#[test]
fn test_list_continuation_and_type_switch() {
    let doc = "- first item\n  continues here\n1. numbered";
    assert_eq!(
        render_markdown(doc),
        "<ul>\n<li>first item continues here</li>\n</ul>\n<ol>\n<li>numbered</li>\n</ol>\n"
    );
}

#[test]
fn test_ordered_list_start() {
    assert_eq!(render_markdown("3. three\n4. four"), "<ol start=\"3\">\n<li>three</li>\n<li>four</li>\n</ol>\n");
}

#[test]
fn test_section_headers_from_tutor_agents() {
    let html = render_markdown("💡 **Intuition**\nThink of slopes.\n\n🌐 **Web RAG Notes**\n- Derivative: rate of change.");
    assert!(html.starts_with("<p>💡 <strong>Intuition</strong><br>\nThink of slopes.</p>\n"));
    assert!(html.contains("<li>Derivative: rate of change.</li>"));
}

#[test]
fn test_empty_input() {
    assert_eq!(render_markdown(""), "");
    assert_eq!(render_markdown("\n\n  \n"), "");
}

#[test]
fn test_thousands_of_quote_markers_render_on_a_worker_sized_stack() {
    let html = std::thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(|| render_markdown(&format!("{} x", ">".repeat(3999))))
        .unwrap()
        .join()
        .unwrap();
    assert_eq!(html.matches("<blockquote>").count(), 8);
    assert!(html.contains("&gt; x</p>"));
}

#[test]
fn test_nested_quotes_below_the_cap() {
    assert_eq!(
        render_markdown("> outer\n>> inner"),
        "<blockquote>\n<p>outer</p>\n<blockquote>\n<p>inner</p>\n</blockquote>\n</blockquote>\n"
    );
}
