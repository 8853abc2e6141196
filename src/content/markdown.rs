//! Markdown rendering with syntax highlighting

use anyhow::Result;
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use syntect::easy::HighlightLines;
use syntect::highlighting::{Style, Theme, ThemeSet};
use syntect::html::{styled_line_to_highlighted_html, IncludeBackground};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

use crate::config::MarkdownConfig;

const DEFAULT_THEME: &str = "base16-ocean.dark";

/// Markdown to HTML converter used for `index.md` pages
pub struct MarkdownRenderer {
    syntax_set: SyntaxSet,
    theme: Theme,
    line_numbers: bool,
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self::with_options(DEFAULT_THEME, false)
    }

    /// Renderer using the named syntect theme. Unknown names fall back to the default theme.
    pub fn with_options(theme_name: &str, line_numbers: bool) -> Self {
        let mut themes = ThemeSet::load_defaults().themes;
        let theme = match themes.remove(theme_name) {
            Some(theme) => theme,
            None => {
                tracing::warn!(
                    "Unknown highlight theme {:?}, using {}",
                    theme_name,
                    DEFAULT_THEME
                );
                themes.remove(DEFAULT_THEME).unwrap_or_default()
            }
        };

        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme,
            line_numbers,
        }
    }

    pub fn from_config(config: &MarkdownConfig) -> Self {
        Self::with_options(&config.highlight_theme, config.line_numbers)
    }

    /// Convert Markdown to HTML; fenced code blocks are highlighted
    pub fn render(&self, markdown: &str) -> Result<String> {
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_HEADING_ATTRIBUTES;

        let mut events: Vec<Event> = Vec::new();
        let mut code: Option<(Option<String>, String)> = None;

        for event in Parser::new_ext(markdown, options) {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(lang) if !lang.is_empty() => Some(lang.to_string()),
                        _ => None,
                    };
                    code = Some((lang, String::new()));
                }
                Event::End(TagEnd::CodeBlock) => {
                    if let Some((lang, source)) = code.take() {
                        let block = self.highlight_code(&source, lang.as_deref())?;
                        events.push(Event::Html(CowStr::from(block)));
                    }
                }
                Event::Text(text) if code.is_some() => {
                    if let Some((_, source)) = code.as_mut() {
                        source.push_str(&text);
                    }
                }
                _ if code.is_some() => {}
                event => events.push(event),
            }
        }

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());
        Ok(html_output)
    }

    fn highlight_code(&self, code: &str, lang: Option<&str>) -> Result<String> {
        // info strings may carry more than the language (`rust,ignore`)
        let token = lang
            .and_then(|l| l.split(|c: char| c == ',' || c.is_whitespace()).next())
            .unwrap_or("text");
        let syntax = self
            .syntax_set
            .find_syntax_by_token(token)
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let mut highlighter = HighlightLines::new(syntax, &self.theme);
        let mut lines = Vec::new();
        for line in LinesWithEndings::from(code) {
            let regions: Vec<(Style, &str)> = highlighter
                .highlight_line(line, &self.syntax_set)?
                .into_iter()
                .map(|(style, text)| (style, text.trim_end_matches(&['\r', '\n'][..])))
                .collect();
            lines.push(styled_line_to_highlighted_html(&regions, IncludeBackground::No)?);
        }

        let class = language_class(token);
        let code_html = format!(
            r#"<code class="language-{}">{}</code>"#,
            class,
            lines.join("\n")
        );
        let pre_style = self
            .theme
            .settings
            .background
            .map(|c| format!(r#" style="background-color:#{:02x}{:02x}{:02x};""#, c.r, c.g, c.b))
            .unwrap_or_default();

        if !self.line_numbers {
            return Ok(format!(r#"<pre class="highlight"{}>{}</pre>"#, pre_style, code_html));
        }

        let gutter = (1..=lines.len())
            .map(|n| format!(r#"<span class="line-number">{}</span>"#, n))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(format!(
            r#"<figure class="highlight {}"><table><tr><td class="gutter"><pre>{}</pre></td><td class="code"><pre{}>{}</pre></td></tr></table></figure>"#,
            class, gutter, pre_style, code_html
        ))
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Language token reduced to characters safe inside a class attribute
fn language_class(token: &str) -> String {
    token
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '#'))
        .collect()
}
