//! euclid-render — markdown subset to HTML.
//!
//! Tutor answers are written in a small markdown dialect with embedded LaTeX.
//! This crate turns them into HTML fragments for the browser:
//!
//!   - blocks: paragraphs, headings, bullet and numbered lists, blockquotes,
//!     pipe tables, horizontal rules, fenced code and display math
//!   - inline: `**strong**`, `*em*`, `` `code` ``, links, and LaTeX spans
//!     (`\( \)`, `\[ \]`, `$$ $$`, `$ $`) passed through untouched for a
//!     client-side typesetter
//!
//! Everything else is HTML-escaped, so the output is safe to inject.
//! Rendering never fails: malformed markup degrades to literal text.

mod block;
mod escape;
mod inline;

pub use escape::escape_html;

/// Knobs for the renderer. The defaults match what the tutor UI expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Pass LaTeX spans through verbatim instead of treating `*`/`_` inside them as emphasis.
    pub math: bool,
    /// Turn `[text](url)` into anchors (only for http(s), root-relative and fragment URLs).
    pub links: bool,
    /// Join consecutive paragraph lines with `<br>` rather than a space.
    pub line_breaks: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { math: true, links: true, line_breaks: true }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Renderer {
    options: RenderOptions,
}

impl Renderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> RenderOptions {
        self.options
    }

    /// Render a markdown document into an HTML fragment.
    pub fn render(&self, markdown: &str) -> String {
        block::render_blocks(markdown, &self.options)
    }

    /// Render a single line of inline markup (no block structure).
    pub fn render_inline(&self, text: &str) -> String {
        inline::render_inline(text, &self.options)
    }
}

/// Render with [`RenderOptions::default`].
pub fn render_markdown(markdown: &str) -> String {
    Renderer::default().render(markdown)
}
