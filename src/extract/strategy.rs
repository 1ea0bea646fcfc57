//! Independent, pure extraction strategies.
//!
//! A strategy looks at a [`Page`] and either returns a cleaned, non-empty
//! value or `None`. Strategies never fail and never look at anything but the
//! page they are given.

use regex::Regex;
use scraper::{Html, Selector};

/// Optional post-processing applied to a cleaned candidate.
/// Returning `None` rejects the candidate.
pub type Refine = fn(&str) -> Option<String>;

/// A fetched document, parsed once and shared by every strategy.
pub struct Page<'a> {
    raw: &'a str,
    html: Html,
}

impl<'a> Page<'a> {
    pub fn parse(raw: &'a str) -> Self {
        Self {
            raw,
            html: Html::parse_document(raw),
        }
    }

    pub fn raw(&self) -> &str {
        self.raw
    }

    pub fn html(&self) -> &Html {
        &self.html
    }
}

pub trait Strategy: Send + Sync {
    /// Short label for debug logs, e.g. `meta[property=og:title]`
    fn name(&self) -> &str;

    fn find(&self, page: &Page<'_>) -> Option<String>;
}

/// Try strategies in order; the first non-empty value wins.
pub fn first_match<'s>(
    strategies: &'s [Box<dyn Strategy>],
    page: &Page<'_>,
) -> Option<(&'s str, String)> {
    strategies
        .iter()
        .find_map(|s| s.find(page).map(|value| (s.name(), value)))
}

fn accept(candidate: &str, refine: Option<Refine>) -> Option<String> {
    let cleaned = clean_text(candidate)?;
    match refine {
        Some(f) => f(&cleaned).and_then(|v| clean_text(&v)),
        None => Some(cleaned),
    }
}

/// `<meta {attr}="{key}" content="...">`
pub struct MetaTag {
    label: String,
    selector: String,
    refine: Option<Refine>,
}

impl MetaTag {
    pub fn property(key: &str) -> Self {
        Self::new("property", key)
    }

    pub fn named(key: &str) -> Self {
        Self::new("name", key)
    }

    fn new(attr: &str, key: &str) -> Self {
        Self {
            label: format!("meta[{attr}={key}]"),
            selector: format!(r#"meta[{attr}="{key}"]"#),
            refine: None,
        }
    }

    pub fn refine(mut self, refine: Refine) -> Self {
        self.refine = Some(refine);
        self
    }
}

impl Strategy for MetaTag {
    fn name(&self) -> &str {
        &self.label
    }

    fn find(&self, page: &Page<'_>) -> Option<String> {
        let selector = Selector::parse(&self.selector).ok()?;
        page.html()
            .select(&selector)
            .filter_map(|el| el.value().attr("content"))
            .find_map(|content| accept(content, self.refine))
    }
}

/// Text content of the first matching element that yields a value.
pub struct Element {
    selector: String,
    capture: Option<Regex>,
    refine: Option<Refine>,
    first_only: bool,
}

impl Element {
    pub fn new(selector: &str) -> Self {
        Self {
            selector: selector.to_string(),
            capture: None,
            refine: None,
            first_only: false,
        }
    }

    /// Look at the first matching element only, never falling through to later ones
    pub fn first_only(mut self) -> Self {
        self.first_only = true;
        self
    }

    /// Keep only the first capture group of `pattern` from the element text
    pub fn capture(mut self, pattern: &str) -> Self {
        self.capture = Some(compile(pattern));
        self
    }

    pub fn refine(mut self, refine: Refine) -> Self {
        self.refine = Some(refine);
        self
    }
}

impl Strategy for Element {
    fn name(&self) -> &str {
        &self.selector
    }

    fn find(&self, page: &Page<'_>) -> Option<String> {
        let selector = Selector::parse(&self.selector).ok()?;
        let limit = if self.first_only { 1 } else { usize::MAX };
        page.html().select(&selector).take(limit).find_map(|el| {
            let text = el.text().collect::<String>();
            let text = match &self.capture {
                Some(re) => first_group(re, &text)?.to_string(),
                None => text,
            };
            accept(&text, self.refine)
        })
    }
}

/// Regular expression over the raw markup, for embedded JSON and prose.
pub struct Pattern {
    regex: Regex,
    json_string: bool,
    refine: Option<Refine>,
}

impl Pattern {
    /// Uses the first capture group, or the whole match if there is none
    pub fn new(pattern: &str) -> Self {
        Self {
            regex: compile(pattern),
            json_string: false,
            refine: None,
        }
    }

    /// Captured text is the body of a JSON string literal (`\u0026`, `\/`, ...)
    pub fn json_string(mut self) -> Self {
        self.json_string = true;
        self
    }

    pub fn refine(mut self, refine: Refine) -> Self {
        self.refine = Some(refine);
        self
    }
}

impl Strategy for Pattern {
    fn name(&self) -> &str {
        self.regex.as_str()
    }

    fn find(&self, page: &Page<'_>) -> Option<String> {
        let captured = first_group(&self.regex, page.raw())?;
        if self.json_string {
            accept(&unescape_json(captured), self.refine)
        } else {
            accept(captured, self.refine)
        }
    }
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid extraction pattern {pattern:?}: {e}"))
}

fn first_group<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
    let caps = re.captures(text)?;
    caps.get(1).or_else(|| caps.get(0)).map(|m| m.as_str())
}

fn unescape_json(body: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{body}\"")).unwrap_or_else(|_| body.to_string())
}

/// Strip tags, decode entities, collapse whitespace. Empty → `None`.
pub fn clean_text(input: &str) -> Option<String> {
    let mut stripped = String::with_capacity(input.len());
    let mut in_tag = false;
    for c in input.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                stripped.push(' ');
            }
            _ if !in_tag => stripped.push(c),
            _ => {}
        }
    }

    let decoded = decode_entities(&stripped);
    let collapsed = decoded.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        let Some(end) = rest.find(';').filter(|&e| e <= 10) else {
            out.push('&');
            rest = &rest[1..];
            continue;
        };
        match decode_entity(&rest[1..end]) {
            Some(c) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => {
            let code = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                entity.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)
        }
    }
}
