//! Summarise HTML pages for the crawler.
//!
//! Extraction is driven by the html5gum tokenizer. It does not
//! build a DOM; it tracks just enough state (the open element, its
//! attributes and whether we are inside `<title>` or the first `<p>`) to
//! pick out what a crawl result needs.

use html5gum::{
    Tokenizer,
    emitters::callback::{Callback, CallbackEmitter, CallbackEvent},
};
use std::collections::{HashMap, HashSet};
use url::Url;

use crate::utils::url::{is_http, normalize_url};

/// Maximum number of characters kept for a page description
pub const MAX_DESCRIPTION_CHARS: usize = 200;

/// What a crawler keeps of a page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSummary {
    /// Text of the first `<title>` element
    pub title: Option<String>,
    /// `content` of `<meta name="description">`
    pub meta_description: Option<String>,
    /// Text of the first non-empty `<p>` element
    pub first_paragraph: Option<String>,
    /// Absolute http(s) links of `<a href>` elements, normalised and in order
    /// of first appearance
    pub links: Vec<String>,
}

impl PageSummary {
    /// The meta description, or else the first paragraph, cut to
    /// [`MAX_DESCRIPTION_CHARS`] characters
    #[must_use]
    pub fn description(&self) -> Option<String> {
        self.meta_description
            .as_deref()
            .or(self.first_paragraph.as_deref())
            .map(|text| text.chars().take(MAX_DESCRIPTION_CHARS).collect())
    }
}

/// Elements whose text content is never part of a summary
fn is_hidden_elem(name: &str) -> bool {
    matches!(name, "script" | "style" | "noscript" | "template")
}

/// Collapse runs of whitespace into single spaces and trim the ends
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Tokenizer callback collecting a [`PageSummary`]
#[derive(Debug)]
struct PageExtractor<'a> {
    /// Page address, used to resolve relative links
    base: &'a Url,
    summary: PageSummary,
    /// Normalised links seen so far
    seen_links: HashSet<String>,
    /// Current element name being processed.
    /// This is called a tag in html5gum.
    current_element: String,
    /// Attributes of the current element
    current_attributes: HashMap<String, String>,
    /// Current attribute name being processed
    current_attribute_name: String,
    /// Open elements whose text we skip, e.g. `<script>`
    hidden_stack: Vec<String>,
    /// Text collected inside `<title>`, if open
    title_text: Option<String>,
    /// Text collected inside the current `<p>`, if open
    paragraph_text: Option<String>,
}

impl<'a> PageExtractor<'a> {
    fn new(base: &'a Url) -> Self {
        Self {
            base,
            summary: PageSummary::default(),
            seen_links: HashSet::default(),
            current_element: String::default(),
            current_attributes: HashMap::default(),
            current_attribute_name: String::default(),
            hidden_stack: Vec::default(),
            title_text: None,
            paragraph_text: None,
        }
    }

    /// Handle a complete start tag once all of its attributes are known
    fn flush_element(&mut self, self_closing: bool) {
        let element = std::mem::take(&mut self.current_element);
        let attributes = std::mem::take(&mut self.current_attributes);
        if !self.hidden_stack.is_empty() {
            return;
        }
        match element.as_str() {
            "a" => {
                if let Some(href) = attributes.get("href") {
                    self.add_link(href);
                }
            }
            "meta" if self.summary.meta_description.is_none() => {
                let is_description = attributes
                    .get("name")
                    .is_some_and(|name| name.trim().eq_ignore_ascii_case("description"));
                if is_description && let Some(content) = attributes.get("content") {
                    let content = collapse_whitespace(content);
                    if !content.is_empty() {
                        self.summary.meta_description = Some(content);
                    }
                }
            }
            "title" if !self_closing && self.summary.title.is_none() => {
                self.title_text = Some(String::new());
            }
            "p" if !self_closing && self.summary.first_paragraph.is_none() => {
                // `<p>` is closed implicitly by the next one
                self.finish_paragraph();
                if self.summary.first_paragraph.is_none() {
                    self.paragraph_text = Some(String::new());
                }
            }
            name if !self_closing && is_hidden_elem(name) => {
                self.hidden_stack.push(name.to_string());
            }
            _ => {}
        }
    }

    fn add_link(&mut self, href: &str) {
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') {
            return;
        }
        let Ok(url) = self.base.join(href) else {
            log::trace!("Skipping invalid link {href} on {}", self.base);
            return;
        };
        if !is_http(&url) {
            return;
        }
        let link = normalize_url(&url);
        if self.seen_links.insert(link.clone()) {
            self.summary.links.push(link);
        }
    }

    fn finish_title(&mut self) {
        if let Some(text) = self.title_text.take() {
            let title = collapse_whitespace(&text);
            if !title.is_empty() {
                self.summary.title = Some(title);
            }
        }
    }

    fn finish_paragraph(&mut self) {
        if let Some(text) = self.paragraph_text.take() {
            let paragraph = collapse_whitespace(&text);
            if !paragraph.is_empty() && self.summary.first_paragraph.is_none() {
                self.summary.first_paragraph = Some(paragraph);
            }
        }
    }

    fn handle_end_tag(&mut self, name: &str) {
        if self.hidden_stack.last().is_some_and(|last| last == name) {
            self.hidden_stack.pop();
            return;
        }
        match name {
            "title" => self.finish_title(),
            "p" => self.finish_paragraph(),
            // An unclosed paragraph ends with its container
            "body" | "html" | "div" | "section" | "article" | "main" => self.finish_paragraph(),
            _ => {}
        }
    }

    fn handle_text(&mut self, text: &str) {
        if !self.hidden_stack.is_empty() {
            return;
        }
        if let Some(title) = self.title_text.as_mut() {
            title.push_str(text);
        } else if let Some(paragraph) = self.paragraph_text.as_mut() {
            paragraph.push_str(text);
        }
    }

    fn finish(mut self) -> PageSummary {
        self.finish_title();
        self.finish_paragraph();
        self.summary
    }
}

impl Callback<(), usize> for &mut PageExtractor<'_> {
    fn handle_event(
        &mut self,
        event: CallbackEvent<'_>,
        _span: html5gum::Span<usize>,
    ) -> Option<()> {
        match event {
            CallbackEvent::OpenStartTag { name } => {
                self.current_element = String::from_utf8_lossy(name).into_owned();
                self.current_attributes.clear();
            }
            CallbackEvent::AttributeName { name } => {
                self.current_attribute_name = String::from_utf8_lossy(name).into_owned();
            }
            CallbackEvent::AttributeValue { value } => {
                let value = String::from_utf8_lossy(value);
                self.current_attributes
                    .entry(self.current_attribute_name.clone())
                    .and_modify(|v| v.push_str(&value))
                    .or_insert_with(|| value.into_owned());
            }
            CallbackEvent::CloseStartTag { self_closing } => {
                self.flush_element(self_closing);
            }
            CallbackEvent::EndTag { name } => {
                self.handle_end_tag(&String::from_utf8_lossy(name));
            }
            CallbackEvent::String { value } => {
                self.handle_text(&String::from_utf8_lossy(value));
            }
            CallbackEvent::Comment { .. }
            | CallbackEvent::Doctype { .. }
            | CallbackEvent::Error(_) => {}
        }
        None
    }
}

/// Summarise an HTML document fetched from `base`.
///
/// Relative links are resolved against `base`; only http(s) links are kept.
///
/// # Examples
///
/// ```
/// use netverse_lib::extract::extract_page;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/blog/").unwrap();
/// let page = extract_page(
///     r#"<title>Blog</title><p>Hello <b>world</b></p><a href="post/1">1</a>"#,
///     &base,
/// );
/// assert_eq!(page.title.as_deref(), Some("Blog"));
/// assert_eq!(page.description().as_deref(), Some("Hello world"));
/// assert_eq!(page.links, vec!["https://example.com/blog/post/1"]);
/// ```
#[must_use]
pub fn extract_page(html: &str, base: &Url) -> PageSummary {
    let mut extractor = PageExtractor::new(base);
    let tokenizer = Tokenizer::new_with_emitter(html, CallbackEmitter::new(&mut extractor));
    tokenizer.for_each(drop);
    extractor.finish()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const HTML_INPUT: &str = r##"
<!DOCTYPE html>
<html>
    <head>
        <title>
            Netverse   Lab
        </title>
        <meta name="Description" content="A search engine  for the curious">
        <style>p { color: red; }</style>
        <script>var p = "<p>not a paragraph</p>";</script>
    </head>
    <body>
        <p>   </p>
        <p>First <em>real</em>
           paragraph</p>
        <p>Second paragraph</p>
        <a href="/about/">About</a>
        <a href="https://example.org/#top">Example</a>
        <a href="https://example.org">Example again</a>
        <a href="mailto:hello@example.com">Mail</a>
        <a href="#section">Anchor</a>
        <a href="docs/intro.html">Docs</a>
        <a>No href</a>
    </body>
</html>"##;

    fn base() -> Url {
        Url::parse("https://netverse.example/home/").unwrap()
    }

    #[test]
    fn test_extract_summary() {
        let page = extract_page(HTML_INPUT, &base());

        assert_eq!(page.title.as_deref(), Some("Netverse Lab"));
        assert_eq!(
            page.meta_description.as_deref(),
            Some("A search engine for the curious")
        );
        assert_eq!(
            page.first_paragraph.as_deref(),
            Some("First real paragraph")
        );
        assert_eq!(
            page.links,
            vec![
                "https://netverse.example/about",
                "https://example.org",
                "https://netverse.example/home/docs/intro.html",
            ]
        );
    }

    #[test]
    fn test_description_prefers_meta() {
        let page = extract_page(HTML_INPUT, &base());
        assert_eq!(
            page.description().as_deref(),
            Some("A search engine for the curious")
        );
    }

    #[test]
    fn test_description_falls_back_to_truncated_paragraph() {
        let long = "word ".repeat(100);
        let html = format!("<html><body><p>{long}</p></body></html>");
        let page = extract_page(&html, &base());

        assert_eq!(page.meta_description, None);
        let description = page.description().unwrap();
        assert_eq!(description.chars().count(), MAX_DESCRIPTION_CHARS);
        assert!(description.starts_with("word word"));
    }

    #[test]
    fn test_unclosed_paragraph() {
        let page = extract_page("<body><p>one<p>two</body>", &base());
        assert_eq!(page.first_paragraph.as_deref(), Some("one"));

        let page = extract_page("<p>dangling text", &base());
        assert_eq!(page.first_paragraph.as_deref(), Some("dangling text"));
    }

    #[test]
    fn test_empty_document() {
        let page = extract_page("", &base());
        assert_eq!(page, PageSummary::default());
        assert_eq!(page.description(), None);
    }
}
