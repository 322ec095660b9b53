//! Main-content detection and XHTML sanitizing.
//!
//! Paragraph-like elements are scored by text length and comma count, and
//! the score is propagated to their parent and grandparent. Containers are
//! weighted by tag and by class/id hints, then discounted by link density.
//! The best container, plus any siblings that score well enough, is
//! serialized as a well-formed XHTML fragment.

use std::collections::{HashMap, HashSet};

use ego_tree::NodeId;
use ego_tree::iter::Edge;
use epubify_core::util::{collapse_whitespace, escape_xml};
use scraper::{ElementRef, Html, Node};
use url::Url;

/// Dropped together with everything inside them.
const REMOVED_TAGS: &[&str] = &[
    "head", "script", "style", "noscript", "template", "form", "nav", "header", "footer", "aside",
    "iframe", "frame", "svg", "math", "canvas", "object", "embed", "button", "input", "select",
    "textarea", "label", "link", "meta", "img", "picture", "video", "audio", "source", "track",
    "map", "dialog",
];

/// Kept in the output; any other element is unwrapped.
const ALLOWED_TAGS: &[&str] = &[
    "p", "div", "section", "article", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "li", "dl",
    "dt", "dd", "pre", "code", "kbd", "samp", "var", "blockquote", "q", "cite", "em", "strong",
    "b", "i", "u", "s", "sub", "sup", "small", "mark", "abbr", "del", "ins", "br", "hr", "a",
    "table", "thead", "tbody", "tfoot", "tr", "th", "td", "caption", "colgroup", "col", "figure",
    "figcaption", "span", "details", "summary",
];

const VOID_TAGS: &[&str] = &["br", "hr", "col"];

/// Tags whose text is scored directly.
const SCORED_TAGS: &[&str] = &["p", "pre", "td", "dd"];

/// A `div` containing any of these is a container, not a paragraph.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dl", "div", "figure", "footer", "form", "h1",
    "h2", "h3", "h4", "h5", "h6", "header", "ol", "p", "pre", "section", "table", "ul",
];

const UNLIKELY_HINTS: &[&str] = &[
    "banner",
    "breadcrumb",
    "combx",
    "comment",
    "cookie",
    "disqus",
    "edit-page",
    "feedback",
    "footer",
    "header",
    "menu",
    "modal",
    "pager",
    "pagination",
    "popup",
    "related",
    "share",
    "sidebar",
    "skip",
    "social",
    "sponsor",
    "advert",
];

const MAYBE_HINTS: &[&str] = &["article", "body", "column", "content", "main", "shadow"];

const POSITIVE_HINTS: &[&str] = &[
    "article",
    "body",
    "content",
    "documentation",
    "entry",
    "main",
    "markdown",
    "page",
    "post",
    "prose",
    "story",
    "text",
];

const NEGATIVE_HINTS: &[&str] = &[
    "banner", "combx", "comment", "contact", "foot", "footnote", "hidden", "masthead", "meta",
    "nav", "promo", "related", "scroll", "share", "sidebar", "sponsor", "tags", "toolbar",
    "widget",
];

const MIN_PARAGRAPH_CHARS: usize = 25;

/// The readable part of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Readable {
    /// Sanitized XHTML fragment.
    pub content: String,
    /// Text of the first non-empty paragraph in the content, whitespace collapsed.
    pub first_paragraph: Option<String>,
}

/// Find and sanitize the main content of `document`.
///
/// Relative links are resolved against `base`. Returns `None` when nothing
/// resembling article text is found.
pub fn extract(document: &Html, base: &Url) -> Option<Readable> {
    let parts = main_content(document)?;

    let mut content = String::new();
    for part in &parts {
        write_xhtml(*part, base, &mut content);
    }
    let content = content.trim().to_string();
    if content.is_empty() {
        return None;
    }

    let first_paragraph = parts.iter().find_map(|part| first_paragraph(*part));
    Some(Readable {
        content,
        first_paragraph,
    })
}

fn main_content(document: &Html) -> Option<Vec<ElementRef<'_>>> {
    let paragraphs = collect_paragraphs(document.root_element());

    let mut scores: HashMap<NodeId, f64> = HashMap::new();
    let mut order: Vec<NodeId> = Vec::new();

    for paragraph in paragraphs {
        let text = visible_text(paragraph);
        let len = text.trim().chars().count();
        if len < MIN_PARAGRAPH_CHARS {
            continue;
        }

        let score = 1.0 + text.matches(',').count() as f64 + (len as f64 / 100.0).min(3.0);
        let ancestors = paragraph.ancestors().filter_map(ElementRef::wrap).take(2);
        for (level, ancestor) in ancestors.enumerate() {
            let entry = scores.entry(ancestor.id()).or_insert_with(|| {
                order.push(ancestor.id());
                initial_score(ancestor)
            });
            *entry += score / (level + 1) as f64;
        }
    }

    let mut best: Option<(ElementRef<'_>, f64)> = None;
    for id in &order {
        let (Some(el), Some(raw)) = (document.tree.get(*id).and_then(ElementRef::wrap), scores.get(id))
        else {
            continue;
        };
        let score = raw * (1.0 - link_density(el));
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((el, score));
        }
    }

    let Some((top, top_score)) = best else {
        return fallback_container(document).map(|el| vec![el]);
    };

    let Some(parent) = top.parent().and_then(ElementRef::wrap) else {
        return Some(vec![top]);
    };

    let threshold = (top_score * 0.2).max(10.0);
    let parts = parent
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|sibling| {
            sibling.id() == top.id()
                || (!is_removed(*sibling) && sibling_qualifies(*sibling, &scores, threshold))
        })
        .collect();
    Some(parts)
}

fn sibling_qualifies(el: ElementRef<'_>, scores: &HashMap<NodeId, f64>, threshold: f64) -> bool {
    let density = link_density(el);
    if let Some(score) = scores.get(&el.id())
        && score * (1.0 - density) >= threshold
    {
        return true;
    }

    if el.value().name() != "p" {
        return false;
    }
    let text = collapse_whitespace(&visible_text(el));
    let len = text.chars().count();
    (len > 80 && density < 0.25) || (len > 0 && density == 0.0 && text.contains(". "))
}

/// Used when no paragraph scored: the page's `main` or `article`, if any.
fn fallback_container(document: &Html) -> Option<ElementRef<'_>> {
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| {
            matches!(el.value().name(), "main" | "article")
                && !collapse_whitespace(&visible_text(*el)).is_empty()
        })
}

/// Scored tags and `div`s without block descendants, in document order.
/// Nothing inside a collected element is collected again.
fn collect_paragraphs(root: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let with_blocks = elements_with_block_descendants(root);
    let mut out = Vec::new();
    let mut inside: Option<NodeId> = None;

    for edge in visible_edges(root) {
        match edge {
            Edge::Open(node) if inside.is_none() && node.id() != root.id() => {
                let Some(el) = ElementRef::wrap(node) else {
                    continue;
                };
                let name = el.value().name();
                if SCORED_TAGS.contains(&name) || (name == "div" && !with_blocks.contains(&el.id()))
                {
                    out.push(el);
                    inside = Some(el.id());
                }
            }
            Edge::Close(node) if inside == Some(node.id()) => inside = None,
            _ => {}
        }
    }
    out
}

/// Ids of elements under `root` that contain a [`BLOCK_TAGS`] element.
fn elements_with_block_descendants(root: ElementRef<'_>) -> HashSet<NodeId> {
    let mut found = HashSet::new();
    let mut open: Vec<bool> = Vec::new();

    for edge in root.traverse() {
        match edge {
            Edge::Open(node) if node.value().is_element() => open.push(false),
            Edge::Close(node) => {
                let Some(el) = node.value().as_element() else {
                    continue;
                };
                let has_block = open.pop().unwrap_or(false);
                if has_block {
                    found.insert(node.id());
                }
                if let Some(parent) = open.last_mut() {
                    *parent |= has_block || BLOCK_TAGS.contains(&el.name());
                }
            }
            _ => {}
        }
    }
    found
}

/// Walk `root`'s subtree depth first, skipping removed elements together
/// with their contents. `root` itself is never skipped.
fn visible_edges<'a>(root: ElementRef<'a>) -> impl Iterator<Item = Edge<'a, Node>> {
    let root_id = root.id();
    let mut skipped: Option<NodeId> = None;
    root.traverse().filter(move |edge| match (edge, skipped) {
        (Edge::Close(node), Some(id)) if node.id() == id => {
            skipped = None;
            false
        }
        (_, Some(_)) => false,
        (Edge::Open(node), None) => {
            let removed =
                node.id() != root_id && ElementRef::wrap(*node).is_some_and(is_removed);
            if removed {
                skipped = Some(node.id());
            }
            !removed
        }
        (Edge::Close(_), None) => true,
    })
}

fn initial_score(el: ElementRef<'_>) -> f64 {
    let base = match el.value().name() {
        "div" | "article" | "main" | "section" => 5.0,
        "pre" | "td" | "blockquote" => 3.0,
        "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" | "form" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" => -5.0,
        _ => 0.0,
    };
    base + class_weight(el)
}

fn class_weight(el: ElementRef<'_>) -> f64 {
    let hints = hints(el);
    if hints.is_empty() {
        return 0.0;
    }
    let mut weight = 0.0;
    if NEGATIVE_HINTS.iter().any(|h| hints.contains(h)) {
        weight -= 25.0;
    }
    if POSITIVE_HINTS.iter().any(|h| hints.contains(h)) {
        weight += 25.0;
    }
    weight
}

/// Lowercased `class` and `id` values joined by a space.
fn hints(el: ElementRef<'_>) -> String {
    let value = el.value();
    let class = value.attr("class").unwrap_or_default();
    let id = value.attr("id").unwrap_or_default();
    format!("{class} {id}").trim().to_ascii_lowercase()
}

/// Chrome, hidden elements and unlikely candidates.
fn is_removed(el: ElementRef<'_>) -> bool {
    let value = el.value();
    let name = value.name();
    if REMOVED_TAGS.contains(&name) {
        return true;
    }

    if value.attr("hidden").is_some() || value.attr("aria-hidden") == Some("true") {
        return true;
    }
    if value
        .attr("style")
        .is_some_and(|s| s.replace(' ', "").to_ascii_lowercase().contains("display:none"))
    {
        return true;
    }

    if matches!(name, "html" | "body" | "main" | "article") {
        return false;
    }
    let hints = hints(el);
    !hints.is_empty()
        && UNLIKELY_HINTS.iter().any(|h| hints.contains(h))
        && !MAYBE_HINTS.iter().any(|h| hints.contains(h))
}

fn visible_text(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    for edge in visible_edges(el) {
        if let Edge::Open(node) = edge
            && let Node::Text(text) = node.value()
        {
            out.push_str(text);
        }
    }
    out
}

/// Share of the visible text that sits inside links.
fn link_density(el: ElementRef<'_>) -> f64 {
    let mut total = 0;
    let mut linked = 0;
    let mut link: Option<NodeId> = None;

    for edge in visible_edges(el) {
        match edge {
            Edge::Open(node) => match node.value() {
                Node::Text(text) => {
                    let chars = text.chars().count();
                    total += chars;
                    if link.is_some() {
                        linked += chars;
                    }
                }
                Node::Element(e) if link.is_none() && node.id() != el.id() && e.name() == "a" => {
                    link = Some(node.id());
                }
                _ => {}
            },
            Edge::Close(node) if link == Some(node.id()) => link = None,
            _ => {}
        }
    }

    if total == 0 {
        return 0.0;
    }
    linked as f64 / total as f64
}

fn first_paragraph(el: ElementRef<'_>) -> Option<String> {
    let own = (el.value().name() == "p").then_some(el);
    own.into_iter()
        .chain(
            el.descendants()
                .skip(1)
                .filter_map(ElementRef::wrap)
                .filter(|d| d.value().name() == "p"),
        )
        .map(|p| collapse_whitespace(&visible_text(p)))
        .find(|text| !text.is_empty())
}

/// Serialize `root` as XHTML through the tag and attribute allow-lists.
/// Unknown elements and `a` without a usable `href` are unwrapped.
fn write_xhtml(root: ElementRef<'_>, base: &Url, out: &mut String) {
    if is_removed(root) {
        return;
    }

    // Closing tag owed for each open element; `None` when it was unwrapped.
    let mut open: Vec<Option<&str>> = Vec::new();
    for edge in visible_edges(root) {
        match edge {
            Edge::Open(node) => match node.value() {
                Node::Text(text) => out.push_str(&escape_xml(text)),
                Node::Element(_) => {
                    let close = ElementRef::wrap(node).and_then(|el| write_open_tag(el, base, out));
                    open.push(close);
                }
                _ => {}
            },
            Edge::Close(node) if node.value().is_element() => {
                if let Some(Some(name)) = open.pop() {
                    out.push_str("</");
                    out.push_str(name);
                    out.push('>');
                }
            }
            _ => {}
        }
    }
}

/// Write the start tag of `el` if it is kept, returning the name to close
/// it with. Void elements are self-closed and return `None`.
fn write_open_tag<'a>(el: ElementRef<'a>, base: &Url, out: &mut String) -> Option<&'a str> {
    let name = el.value().name();
    if !ALLOWED_TAGS.contains(&name) {
        return None;
    }

    let attributes = safe_attributes(el, base);
    if name == "a" && attributes.is_empty() {
        return None;
    }

    out.push('<');
    out.push_str(name);
    for (key, value) in attributes {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape_xml(&value));
        out.push('"');
    }

    if VOID_TAGS.contains(&name) {
        out.push_str("/>");
        return None;
    }
    out.push('>');
    Some(name)
}

fn safe_attributes(el: ElementRef<'_>, base: &Url) -> Vec<(&'static str, String)> {
    let value = el.value();
    let mut attributes = Vec::new();
    match value.name() {
        "a" => {
            if let Some(href) = value.attr("href").and_then(|h| absolutize(h, base)) {
                attributes.push(("href", href));
            }
            if let Some(title) = value.attr("title") {
                attributes.push(("title", title.to_string()));
            }
        }
        "abbr" => {
            if let Some(title) = value.attr("title") {
                attributes.push(("title", title.to_string()));
            }
        }
        "td" | "th" => {
            for key in ["colspan", "rowspan"] {
                if let Some(n) = value.attr(key).filter(|v| is_number(v)) {
                    attributes.push((key, n.to_string()));
                }
            }
        }
        "ol" => {
            if let Some(start) = value.attr("start").filter(|v| is_number(v)) {
                attributes.push(("start", start.to_string()));
            }
        }
        _ => {}
    }
    attributes
}

fn absolutize(href: &str, base: &Url) -> Option<String> {
    let url = base.join(href.trim()).ok()?;
    matches!(url.scheme(), "http" | "https" | "mailto").then(|| url.to_string())
}

fn is_number(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}
