use colored::Colorize;
use itertools::Itertools;
use serde::Serialize;

use crate::controller::Notice;
use crate::model::{Field, Product};
use crate::pipeline::{Page, SortSpec, ViewState};

pub const EMPTY_TABLE_MESSAGE: &str = "No items in Product.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "txt" | "table" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

fn header_text(field: Field, sort: Option<SortSpec>) -> String {
    match sort {
        Some(spec) if spec.field == field => {
            format!("{} {}", field.label(), spec.direction.indicator())
        }
        _ => field.label().to_string(),
    }
}

fn pad(value: &str, width: usize) -> String {
    let len = value.chars().count();
    format!("{value}{}", " ".repeat(width.saturating_sub(len)))
}

/// Renders the visible page as an aligned text table with its footer and
/// pagination bar.
pub fn render_table(page: &Page<'_>, view: &ViewState) -> String {
    let mut headers: Vec<String> = vec!["No".to_string()];
    headers.extend(Field::ALL.iter().map(|f| header_text(*f, view.sort)));

    let rows: Vec<Vec<String>> = page
        .rows
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let mut cells = vec![page.row_number(i).to_string()];
            cells.extend(Field::ALL.iter().map(|f| p.field_text(*f)));
            cells
        })
        .collect();

    let widths: Vec<usize> = (0..headers.len())
        .map(|col| {
            rows.iter()
                .map(|r| r[col].chars().count())
                .chain(std::iter::once(headers[col].chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    let header_line = headers
        .iter()
        .enumerate()
        .map(|(col, h)| {
            let cell = pad(h, widths[col]);
            let active = col > 0
                && view
                    .sort
                    .map(|s| s.field == Field::ALL[col - 1])
                    .unwrap_or(false);
            if active {
                cell.bold().cyan().to_string()
            } else {
                cell.bold().to_string()
            }
        })
        .join(" | ");
    out.push_str(&header_line);
    out.push('\n');
    out.push_str(&widths.iter().map(|w| "-".repeat(*w)).join("-+-"));
    out.push('\n');

    if rows.is_empty() {
        out.push_str(&EMPTY_TABLE_MESSAGE.dimmed().to_string());
        out.push('\n');
    }
    for row in rows.iter() {
        let line = row
            .iter()
            .enumerate()
            .map(|(col, cell)| pad(cell, widths[col]))
            .join(" | ");
        out.push_str(&line);
        out.push('\n');
    }

    out.push('\n');
    out.push_str(&render_footer(page));
    out.push('\n');
    out.push_str(&render_pagination(page));
    out.push('\n');
    out
}

pub fn render_footer(page: &Page<'_>) -> String {
    match page.display_range() {
        Some((first, last)) => format!(
            "Showing {} of {}",
            format!("{first}-{last}").bold(),
            page.total_items
        ),
        None => format!("Showing 0 of {}", page.total_items),
    }
}

/// `[Prev] [1] [2] [Next]` with the current page highlighted and the
/// unavailable boundary buttons dimmed.
pub fn render_pagination(page: &Page<'_>) -> String {
    let mut buttons: Vec<String> = Vec::new();
    let prev = "[Prev]";
    buttons.push(if page.can_prev() {
        prev.to_string()
    } else {
        prev.dimmed().to_string()
    });
    for n in 1..=page.total_pages {
        let label = format!("[{n}]");
        if n == page.page {
            buttons.push(label.reversed().bold().to_string());
        } else {
            buttons.push(label);
        }
    }
    let next = "[Next]";
    buttons.push(if page.can_next() {
        next.to_string()
    } else {
        next.dimmed().to_string()
    });
    buttons.join(" ")
}

pub fn render_notice(notice: &Notice) -> String {
    match notice {
        Notice::Success(msg) => format!("{} {}", "✔".bold().green(), msg.green()),
        Notice::Error(msg) => format!("{} {}", "✖".bold().red(), msg.red()),
    }
}

#[derive(Serialize)]
struct Listing<'a> {
    search: &'a str,
    sort: Option<SortSpec>,
    page: usize,
    total_pages: usize,
    total_items: usize,
    rows: &'a [&'a Product],
}

pub fn render_json(page: &Page<'_>, view: &ViewState) -> Result<Vec<u8>, String> {
    let listing = Listing {
        search: &view.search,
        sort: view.sort,
        page: page.page,
        total_pages: page.total_pages,
        total_items: page.total_items,
        rows: &page.rows,
    };
    let mut out = serde_json::to_vec_pretty(&listing)
        .map_err(|e| format!("failed to encode listing: {e}"))?;
    out.push(b'\n');
    Ok(out)
}
