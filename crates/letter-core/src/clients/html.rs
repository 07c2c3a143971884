//! HTML text extraction for program and institution pages

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("Failed to compile HTML selector")
}

static TITLE: Lazy<Selector> = Lazy::new(|| selector("title"));
static META_DESCRIPTION: Lazy<Selector> = Lazy::new(|| selector(r#"meta[name="description"]"#));
static MAIN_CONTAINERS: Lazy<Selector> = Lazy::new(|| selector("main, article, div, section"));
static CONTAINER_PARAGRAPHS: Lazy<Selector> = Lazy::new(|| selector("p, h1, h2, h3, h4, li"));
static PAGE_PARAGRAPHS: Lazy<Selector> = Lazy::new(|| selector("p, h1, h2, h3, h4"));

static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("Failed to compile whitespace regex"));
static MAIN_CONTAINER_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(content|main|article)").expect("Failed to compile container class regex"));

/// Elements whose text is never shown
const HIDDEN_ELEMENTS: [&str; 3] = ["script", "style", "noscript"];

/// Minimum characters for a paragraph to count as content
const MIN_PARAGRAPH_CHARS: usize = 20;
const MAX_MAIN_CONTAINERS: usize = 3;

pub const TITLE_NOT_FOUND: &str = "Title not found";
pub const DESCRIPTION_NOT_FOUND: &str = "Description not found";

/// Collapse whitespace and drop control characters
pub fn clean_text(text: &str) -> String {
    let collapsed = WHITESPACE_RE.replace_all(text, " ");
    collapsed
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Visible text below `element`, entities decoded by the parser
pub fn visible_text(element: ElementRef<'_>) -> String {
    let pieces: Vec<&str> = element
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .map_or(false, |e| HIDDEN_ELEMENTS.contains(&e.name()))
            });
            (!hidden).then_some(&**text)
        })
        .collect();

    clean_text(&pieces.join(" "))
}

/// Visible text of an HTML fragment
pub fn text_of(fragment: &str) -> String {
    visible_text(Html::parse_fragment(fragment).root_element())
}

pub fn extract_title(document: &Html) -> String {
    document
        .select(&TITLE)
        .next()
        .map(visible_text)
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| TITLE_NOT_FOUND.to_string())
}

pub fn extract_meta_description(document: &Html) -> String {
    document
        .select(&META_DESCRIPTION)
        .filter_map(|meta| meta.value().attr("content"))
        .map(clean_text)
        .find(|description| !description.is_empty())
        .unwrap_or_else(|| DESCRIPTION_NOT_FOUND.to_string())
}

fn class_matches(element: &ElementRef<'_>, class_filter: &Regex) -> bool {
    element
        .value()
        .attr("class")
        .map_or(false, |class| class_filter.is_match(class))
}

/// Text of each `selector` match whose class attribute matches `class_filter`,
/// in document order, empty ones dropped
pub fn element_texts(document: &Html, selector: &Selector, class_filter: &Regex) -> Vec<String> {
    document
        .select(selector)
        .filter(|element| class_matches(element, class_filter))
        .map(visible_text)
        .filter(|text| !text.is_empty())
        .collect()
}

fn is_paragraph(text: &str) -> bool {
    text.chars().count() > MIN_PARAGRAPH_CHARS
}

/// Paragraph-like text from the first content containers, or from the whole
/// page when no container is tagged as content
pub fn extract_main_content(document: &Html) -> String {
    let containers: Vec<ElementRef<'_>> = document
        .select(&MAIN_CONTAINERS)
        .filter(|element| class_matches(element, &MAIN_CONTAINER_CLASS))
        .take(MAX_MAIN_CONTAINERS)
        .collect();

    let lines: Vec<String> = if containers.is_empty() {
        document
            .select(&PAGE_PARAGRAPHS)
            .map(visible_text)
            .filter(|text| is_paragraph(text))
            .collect()
    } else {
        containers
            .iter()
            .flat_map(|container| container.select(&CONTAINER_PARAGRAPHS))
            .map(visible_text)
            .filter(|text| is_paragraph(text))
            .collect()
    };

    lines.iter().map(|line| format!("{}\n", line)).collect()
}
