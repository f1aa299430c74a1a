//! Page/size/sort parsing and page windows for the `/paging` listings.
//!
//! Query format: `?page=0&size=10&sort=name,desc&sort=id`. Pages are 0-based. Each `sort`
//! value is `field[,field...][,asc|desc]`; keys apply in the order given, first is primary.

use crate::config::PagingConfig;
use crate::error::AppError;
use serde::Serialize;
use std::cmp::Ordering;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }

    fn parse(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("asc") {
            Some(Direction::Asc)
        } else if token.eq_ignore_ascii_case("desc") {
            Some(Direction::Desc)
        } else {
            None
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: Direction,
}

impl SortKey {
    pub fn asc(field: &str) -> Self {
        SortKey {
            field: field.to_string(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: &str) -> Self {
        SortKey {
            field: field.to_string(),
            direction: Direction::Desc,
        }
    }
}

/// A resource that can be ordered by a whitelisted set of field names.
pub trait Sortable {
    /// Field names accepted in `sort`. Must include `id`.
    const SORT_FIELDS: &'static [&'static str];

    /// Ascending comparison on one field from `SORT_FIELDS`.
    fn compare_field(&self, other: &Self, field: &str) -> Ordering;
}

/// Compare by keys in priority order.
pub fn compare_by<T: Sortable>(a: &T, b: &T, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let ord = a.compare_field(b, &key.field);
        let ord = match key.direction {
            Direction::Asc => ord,
            Direction::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub size: u64,
    pub sort: Vec<SortKey>,
}

impl PageRequest {
    /// Parse `page`, `size` and repeated `sort` pairs. Other keys are ignored.
    pub fn from_query(
        pairs: &[(String, String)],
        sort_fields: &[&str],
        paging: &PagingConfig,
    ) -> Result<Self, AppError> {
        let mut page: u64 = 0;
        let mut size = paging.default_size;
        let mut sort = Vec::new();
        for (k, v) in pairs {
            match k.as_str() {
                "page" => page = parse_page(v)?,
                "size" => size = parse_size(v, paging.max_size)?,
                "sort" => sort.extend(parse_sort(v, sort_fields)?),
                _ => {}
            }
        }
        Ok(PageRequest { page, size, sort })
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_mul(self.size)
    }

    /// Requested keys plus `id` ascending as final tiebreaker, so paging is deterministic.
    pub fn effective_sort(&self) -> Vec<SortKey> {
        let mut keys = self.sort.clone();
        if !keys.iter().any(|k| k.field == "id") {
            keys.push(SortKey::asc("id"));
        }
        keys
    }

    /// Sort a full collection and cut out this page.
    pub fn window<T: Sortable>(&self, mut items: Vec<T>) -> Page<T> {
        let keys = self.effective_sort();
        items.sort_by(|a, b| compare_by(a, b, &keys));
        let total = items.len() as u64;
        let start = usize::try_from(self.offset()).unwrap_or(usize::MAX).min(items.len());
        let content: Vec<T> = items
            .into_iter()
            .skip(start)
            .take(usize::try_from(self.size).unwrap_or(usize::MAX))
            .collect();
        Page::new(content, total, self)
    }
}

fn parse_page(raw: &str) -> Result<u64, AppError> {
    let n: i64 = raw
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("page must be an integer, got '{}'", raw)))?;
    u64::try_from(n).map_err(|_| AppError::BadRequest("page must not be negative".into()))
}

fn parse_size(raw: &str, max: u64) -> Result<u64, AppError> {
    let n: i64 = raw
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("size must be an integer, got '{}'", raw)))?;
    if n <= 0 {
        return Err(AppError::BadRequest("size must be positive".into()));
    }
    let n = n as u64;
    if n > max {
        return Err(AppError::BadRequest(format!("size must be at most {}", max)));
    }
    Ok(n)
}

fn parse_sort(raw: &str, sort_fields: &[&str]) -> Result<Vec<SortKey>, AppError> {
    let mut tokens: Vec<&str> = raw.split(',').map(str::trim).filter(|t| !t.is_empty()).collect();
    if tokens.is_empty() {
        return Ok(Vec::new());
    }
    let direction = match tokens.last().and_then(|t| Direction::parse(t)) {
        Some(d) => {
            tokens.pop();
            d
        }
        None => Direction::Asc,
    };
    if tokens.is_empty() {
        return Err(AppError::BadRequest(format!("sort '{}' names no field", raw)));
    }
    tokens
        .into_iter()
        .map(|field| {
            if sort_fields.contains(&field) {
                Ok(SortKey {
                    field: field.to_string(),
                    direction,
                })
            } else {
                Err(AppError::BadRequest(format!(
                    "unknown sort field '{}'; expected one of {:?}",
                    field, sort_fields
                )))
            }
        })
        .collect()
}

/// One window of an ordered collection plus counts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub total_elements: u64,
    pub total_pages: u64,
    pub number: u64,
    pub size: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, total_elements: u64, req: &PageRequest) -> Self {
        Page {
            content,
            total_elements,
            total_pages: total_elements.div_ceil(req.size.max(1)),
            number: req.page,
            size: req.size,
        }
    }
}
