//! Small helpers over `scraper` shared by the page extractors.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

pub(crate) fn selector(css: &'static str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector '{}': {}", css, e))
}

pub(crate) static TABLE: Lazy<Selector> = Lazy::new(|| selector("table"));
pub(crate) static THEAD_ROW: Lazy<Selector> = Lazy::new(|| selector("thead tr"));
pub(crate) static TBODY_ROW: Lazy<Selector> = Lazy::new(|| selector("tbody tr"));
pub(crate) static ROW: Lazy<Selector> = Lazy::new(|| selector("tr"));
pub(crate) static CELL: Lazy<Selector> = Lazy::new(|| selector("th, td"));
pub(crate) static TH: Lazy<Selector> = Lazy::new(|| selector("th"));
pub(crate) static TD: Lazy<Selector> = Lazy::new(|| selector("td"));
pub(crate) static LINK: Lazy<Selector> = Lazy::new(|| selector("a"));

static COMPETITION_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/comps/(\d+)/").expect("competition id pattern"));
static SQUAD_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/en/squads/([a-f0-9]+)/").expect("squad id pattern"));
static MATCH_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/matches/([^/]+)/").expect("match id pattern"));
static PLAYER_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/players/([^/]+)/").expect("player id pattern"));

/// Text content with runs of whitespace collapsed and ends trimmed.
pub(crate) fn text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// `Some(text)` unless the element is blank.
pub(crate) fn non_empty_text(element: ElementRef<'_>) -> Option<String> {
    Some(text(element)).filter(|t| !t.is_empty())
}

/// First `<a>` inside `element` as `(text, href)`.
pub(crate) fn first_link(element: ElementRef<'_>) -> Option<(String, String)> {
    element.select(&LINK).next().map(|a| {
        (
            text(a),
            a.value().attr("href").unwrap_or_default().to_string(),
        )
    })
}

pub(crate) fn table_by_id<'a>(document: &'a Html, id: &str) -> Option<ElementRef<'a>> {
    document
        .select(&TABLE)
        .find(|table| table.value().id() == Some(id))
}

/// Cells (`th` and `td`) of a row, skipping cells of nested tables.
pub(crate) fn row_cells(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|child| matches!(child.value().name(), "th" | "td"))
        .collect()
}

pub(crate) fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

/// Header texts of the last `thead` row (the one naming individual columns).
pub(crate) fn column_headers(table: ElementRef<'_>) -> Vec<String> {
    table
        .select(&THEAD_ROW)
        .last()
        .map(|row| row_cells(row).into_iter().map(text).collect())
        .unwrap_or_default()
}

/// Body rows, without the repeated header rows the site inserts mid-table.
pub(crate) fn body_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    table
        .select(&TBODY_ROW)
        .filter(|row| !has_class(*row, "thead") && !has_class(*row, "spacer"))
        .collect()
}

pub(crate) fn competition_id(link: &str) -> Option<u32> {
    COMPETITION_ID
        .captures(link)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

pub(crate) fn squad_id(link: &str) -> Option<String> {
    capture(&SQUAD_ID, link)
}

pub(crate) fn match_id(link: &str) -> Option<String> {
    capture(&MATCH_ID, link)
}

pub(crate) fn player_id(link: &str) -> Option<String> {
    capture(&PLAYER_ID, link)
}

fn capture(pattern: &Regex, haystack: &str) -> Option<String> {
    pattern
        .captures(haystack)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Integer with thousands separators and an optional sign (`"73,297"`, `"+12"`).
pub(crate) fn parse_int(text: &str) -> Option<i64> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    cleaned.strip_prefix('+').unwrap_or(&cleaned).parse().ok()
}

pub(crate) fn parse_float(text: &str) -> Option<f64> {
    let cleaned = text.trim();
    cleaned.strip_prefix('+').unwrap_or(cleaned).parse().ok()
}

/// Split `"Name - 13"` at the last dash when what follows is a number.
pub(crate) fn split_trailing_count(text: &str) -> (String, Option<i64>) {
    match text.rsplit_once('-') {
        Some((name, count)) if !name.trim().is_empty() => match parse_int(count) {
            Some(n) => (name.trim().to_string(), Some(n)),
            None => (text.trim().to_string(), None),
        },
        _ => (text.trim().to_string(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_from_links() {
        assert_eq!(competition_id("/en/comps/9/history/Premier-League-Seasons"), Some(9));
        assert_eq!(competition_id("/en/players/"), None);
        assert_eq!(
            squad_id("/en/squads/822bd0ba/2024-2025/Liverpool-Stats").as_deref(),
            Some("822bd0ba")
        );
        assert_eq!(
            match_id("https://fbref.com/en/matches/cc5b4244/Manchester-United-Fulham").as_deref(),
            Some("cc5b4244")
        );
        assert_eq!(player_id("/en/players/1d8099f8/Bernd-Leno").as_deref(), Some("1d8099f8"));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(parse_int("73,297"), Some(73297));
        assert_eq!(parse_int("+12"), Some(12));
        assert_eq!(parse_int("-3"), Some(-3));
        assert_eq!(parse_int(""), None);
        assert_eq!(parse_float("+1.4"), Some(1.4));
        assert_eq!(parse_float("n/a"), None);
    }

    #[test]
    fn test_split_trailing_count() {
        assert_eq!(
            split_trailing_count("Mohamed Salah - 29"),
            ("Mohamed Salah".to_string(), Some(29))
        );
        assert_eq!(
            split_trailing_count("Paris Saint-Germain - 76"),
            ("Paris Saint-Germain".to_string(), Some(76))
        );
        assert_eq!(
            split_trailing_count("Paris Saint-Germain"),
            ("Paris Saint-Germain".to_string(), None)
        );
        assert_eq!(split_trailing_count("-"), ("-".to_string(), None));
    }

    #[test]
    fn test_text_collapses_whitespace() {
        let doc = Html::parse_fragment("<p>  Mohamed\n   <b>Salah</b>  </p>");
        let p = doc.select(&selector("p")).next().unwrap();
        assert_eq!(text(p), "Mohamed Salah");
    }
}
