use scraper::{ElementRef, Html, Node, Selector};

const SKIPPED: &[&str] = &["script", "style", "noscript", "template", "svg"];

/// Readable text of a listing page: `<main>` if present, otherwise `<body>`,
/// one line per non-empty text run, scripts and styles excluded.
pub fn main_content(raw: &str) -> String {
    let document = Html::parse_document(raw);

    let root = ["main", "body"]
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .find_map(|selector| document.select(&selector).next());

    let Some(root) = root else {
        return String::new();
    };

    collect_lines(root).join("\n")
}

fn collect_lines(root: ElementRef<'_>) -> Vec<String> {
    let mut lines = Vec::new();

    for node in root.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map(|el| SKIPPED.contains(&el.name()))
                .unwrap_or(false)
        });
        if hidden {
            continue;
        }

        let line = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if !line.is_empty() {
            lines.push(line);
        }
    }

    lines
}
