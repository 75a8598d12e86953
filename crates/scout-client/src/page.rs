use scout_core::annotate::BADGE_CLASS;
use scout_core::error::ScoutError;
use scout_core::models::{Badge, PageRow};
use scout_core::traits::DocumentScanner;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

/// A parsed HTML document that can be scanned for load rows and badged.
///
/// Rows are `tr` elements in document order; cells are the `td` elements
/// inside each row. Badges are appended to the cell as
/// `<span class="gc-scout-badge" title="...">label</span>`.
pub struct HtmlPage {
    html: Html,
    row_selector: Selector,
    cell_selector: Selector,
    badge_selector: Selector,
}

impl HtmlPage {
    pub fn parse(source: &str) -> Result<Self, ScoutError> {
        Ok(Self {
            html: Html::parse_document(source),
            row_selector: selector("tr")?,
            cell_selector: selector("td")?,
            badge_selector: selector(&format!(".{BADGE_CLASS}"))?,
        })
    }

    /// Serialize the current document, badges included.
    pub fn to_html(&self) -> String {
        self.html.html()
    }

    /// Number of badges anywhere in the document.
    pub fn badge_count(&self) -> usize {
        self.html.select(&self.badge_selector).count()
    }

    fn row(&self, position: usize) -> Option<ElementRef<'_>> {
        self.html.select(&self.row_selector).nth(position)
    }
}

impl DocumentScanner for HtmlPage {
    fn rows(&self) -> Vec<PageRow> {
        self.html
            .select(&self.row_selector)
            .enumerate()
            .map(|(position, row)| PageRow {
                position,
                cells: row.select(&self.cell_selector).map(visible_text).collect(),
            })
            .collect()
    }

    fn has_badge(&self, position: usize) -> bool {
        self.row(position)
            .is_some_and(|row| row.select(&self.badge_selector).next().is_some())
    }

    fn insert_badge(&mut self, position: usize, cell: usize, badge: &Badge) -> bool {
        let Some(cell_id) = self
            .row(position)
            .and_then(|row| row.select(&self.cell_selector).nth(cell))
            .map(|cell| cell.id())
        else {
            return false;
        };

        let fragment = Html::parse_fragment(&badge_markup(badge));
        let Some(template) = fragment.select(&self.badge_selector).next() else {
            tracing::warn!("Badge markup did not parse");
            return false;
        };

        let Some(mut target) = self.html.tree.get_mut(cell_id) else {
            return false;
        };
        let mut span = target.append(Node::Element(template.value().clone()));
        for child in template.children() {
            span.append(child.value().clone());
        }
        true
    }
}

fn selector(css: &str) -> Result<Selector, ScoutError> {
    Selector::parse(css)
        .map_err(|e| ScoutError::ConfigError(format!("Invalid selector '{css}': {e}")))
}

/// Rendered-style text of a cell: badge text excluded, whitespace collapsed.
fn visible_text(cell: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(cell, &mut raw);
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
                out.push(' ');
            }
            Node::Element(el) => {
                if el.classes().any(|class| class == BADGE_CLASS) {
                    continue;
                }
                if let Some(nested) = ElementRef::wrap(child) {
                    collect_text(nested, out);
                }
            }
            _ => {}
        }
    }
}

fn badge_markup(badge: &Badge) -> String {
    format!(
        r#"<span class="{BADGE_CLASS}" title="{}">{}</span>"#,
        escape(&badge.title),
        escape(&badge.label)
    )
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
