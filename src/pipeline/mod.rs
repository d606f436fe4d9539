//! Filter, sort and paginate the canonical collection into the visible page.
//!
//! Everything here is a pure function of the collection and a [`ViewState`];
//! the controller owns the state and calls [`derive`] whenever it renders.

use std::cmp::Ordering;

use serde::Serialize;

use crate::model::{Field, Product};

pub const PAGE_SIZE: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn indicator(self) -> &'static str {
        match self {
            SortDirection::Ascending => "▲",
            SortDirection::Descending => "▼",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SortSpec {
    pub field: Field,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn ascending(field: Field) -> Self {
        Self {
            field,
            direction: SortDirection::Ascending,
        }
    }

    /// Header click: a new column sorts ascending, the active column flips.
    pub fn toggle(current: Option<SortSpec>, clicked: Field) -> SortSpec {
        match current {
            Some(spec) if spec.field == clicked => SortSpec {
                field: clicked,
                direction: spec.direction.toggled(),
            },
            _ => SortSpec::ascending(clicked),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ViewState {
    pub search: String,
    pub sort: Option<SortSpec>,
    /// 1-indexed.
    pub page: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            search: String::new(),
            sort: None,
            page: 1,
        }
    }
}

impl ViewState {
    /// A new search term starts again from the first page.
    pub fn set_search(&mut self, term: &str) {
        self.search = term.to_string();
        self.page = 1;
    }

    pub fn click_header(&mut self, field: Field) {
        self.sort = Some(SortSpec::toggle(self.sort, field));
    }

    /// Moves to `page` if it exists. Page 1 always exists, even for an
    /// empty view.
    pub fn goto(&mut self, page: usize, total_pages: usize) -> bool {
        if page == 0 || page > total_pages.max(1) {
            return false;
        }
        self.page = page;
        true
    }

    pub fn next(&mut self, total_pages: usize) -> bool {
        self.goto(self.page.saturating_add(1), total_pages)
    }

    pub fn prev(&mut self, total_pages: usize) -> bool {
        self.goto(self.page.saturating_sub(1), total_pages)
    }

    /// Pulls a stale page number back into range after the collection shrank.
    pub fn clamp(&mut self, total_pages: usize) {
        self.page = self.page.clamp(1, total_pages.max(1));
    }
}

/// Case-insensitive substring match against the string form of every
/// non-identifier column. `needle` must already be lowercase.
fn matches(product: &Product, needle: &str) -> bool {
    Field::ALL
        .iter()
        .any(|f| product.field_text(*f).to_lowercase().contains(needle))
}

pub fn filter<'a>(products: &'a [Product], term: &str) -> Vec<&'a Product> {
    if term.is_empty() {
        return products.iter().collect();
    }
    let needle = term.to_lowercase();
    products.iter().filter(|p| matches(p, &needle)).collect()
}

pub fn compare_field(a: &Product, b: &Product, field: Field) -> Ordering {
    match field {
        Field::Name => a.name.cmp(&b.name),
        Field::Stock => a.stock.cmp(&b.stock),
        Field::Sold => a.sold.cmp(&b.sold),
        Field::Date => a.date.cmp(&b.date),
        Field::Category => a.category.cmp(&b.category),
    }
}

/// Stable in both directions: ties keep their filter-stage order.
pub fn sort(rows: &mut [&Product], spec: Option<SortSpec>) {
    let Some(spec) = spec else {
        return;
    };
    rows.sort_by(|a, b| {
        let ord = compare_field(a, b, spec.field);
        match spec.direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    });
}

pub fn total_pages(total_items: usize) -> usize {
    total_items.div_ceil(PAGE_SIZE)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Page<'a> {
    pub rows: Vec<&'a Product>,
    pub page: usize,
    pub total_items: usize,
    pub total_pages: usize,
    /// Position of `rows[0]` within the sorted sequence.
    pub offset: usize,
}

impl Page<'_> {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn can_prev(&self) -> bool {
        self.page > 1
    }

    pub fn can_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// 1-based inclusive range of the shown rows, for "Showing a-b of N".
    pub fn display_range(&self) -> Option<(usize, usize)> {
        if self.rows.is_empty() {
            return None;
        }
        Some((self.offset + 1, self.offset + self.rows.len()))
    }

    /// Row number as shown in the "No" column, 1-based across pages.
    pub fn row_number(&self, index: usize) -> usize {
        self.offset + index + 1
    }

    pub fn row_by_number(&self, number: usize) -> Option<&Product> {
        let index = number.checked_sub(self.offset + 1)?;
        self.rows.get(index).copied()
    }
}

pub fn paginate(sorted: Vec<&Product>, page: usize) -> Page<'_> {
    let total_items = sorted.len();
    let total_pages = total_pages(total_items);
    let page = page.max(1);
    let start = (page - 1).saturating_mul(PAGE_SIZE).min(total_items);
    let end = (start + PAGE_SIZE).min(total_items);
    let rows = sorted[start..end].to_vec();
    Page {
        rows,
        page,
        total_items,
        total_pages,
        offset: start,
    }
}

pub fn derive<'a>(products: &'a [Product], view: &ViewState) -> Page<'a> {
    let mut rows = filter(products, &view.search);
    sort(&mut rows, view.sort);
    paginate(rows, view.page)
}
