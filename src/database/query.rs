// List-endpoint query parameters: pagination and sorting
use serde::Deserialize;

use crate::config::PaginationConfig;

const DEFAULT_PAGE_NUMBER: i64 = 1;

/// Raw query string for list endpoints. Every value arrives as text and is
/// interpreted leniently by [`ListOptions::from_query`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page_number: Option<String>,
    pub page_size: Option<String>,
    pub sort: Option<String>,
    pub direction: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// A closed set of sortable fields for one resource.
pub trait SortField: Copy + Sized {
    /// Order used when the client asks for none, or for one that is not allowed.
    const DEFAULT: (Self, SortDirection);

    /// Wire name -> field. Only allow-listed names resolve.
    fn parse(name: &str) -> Option<Self>;

    fn column(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSortField {
    Name,
    Email,
    CreatedAt,
    UpdatedAt,
}

impl SortField for UserSortField {
    const DEFAULT: (Self, SortDirection) = (UserSortField::CreatedAt, SortDirection::Desc);

    fn parse(name: &str) -> Option<Self> {
        match name {
            "name" => Some(UserSortField::Name),
            "email" => Some(UserSortField::Email),
            "createdAt" => Some(UserSortField::CreatedAt),
            "updatedAt" => Some(UserSortField::UpdatedAt),
            _ => None,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            UserSortField::Name => "name",
            UserSortField::Email => "email",
            UserSortField::CreatedAt => "created_at",
            UserSortField::UpdatedAt => "updated_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanSortField {
    Name,
    StartDate,
    EndDate,
    CreatedAt,
    UpdatedAt,
}

impl SortField for PlanSortField {
    const DEFAULT: (Self, SortDirection) = (PlanSortField::StartDate, SortDirection::Desc);

    fn parse(name: &str) -> Option<Self> {
        match name {
            "name" => Some(PlanSortField::Name),
            "startDate" => Some(PlanSortField::StartDate),
            "endDate" => Some(PlanSortField::EndDate),
            "createdAt" => Some(PlanSortField::CreatedAt),
            "updatedAt" => Some(PlanSortField::UpdatedAt),
            _ => None,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            PlanSortField::Name => "name",
            PlanSortField::StartDate => "start_date",
            PlanSortField::EndDate => "end_date",
            PlanSortField::CreatedAt => "created_at",
            PlanSortField::UpdatedAt => "updated_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: i64,
    pub size: i64,
}

impl Page {
    /// Rows skipped before this page. Saturates instead of overflowing on huge page numbers.
    pub fn offset(&self) -> i64 {
        (self.number - 1).max(0).saturating_mul(self.size.max(0))
    }
}

/// Interpreted list options: `page` is `None` when the whole collection is wanted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOptions<F: SortField> {
    pub sort: F,
    pub direction: SortDirection,
    pub page: Option<Page>,
}

impl<F: SortField> ListOptions<F> {
    /// `pageSize` is capped at `limits.max_page_size`.
    pub fn from_query(query: &ListQuery, limits: &PaginationConfig) -> Self {
        let page = match (&query.page_number, &query.page_size) {
            (Some(number), Some(size)) => Some(Page {
                number: positive_or(number, DEFAULT_PAGE_NUMBER),
                size: positive_or(size, limits.default_page_size).min(limits.max_page_size),
            }),
            _ => None,
        };

        let requested = query
            .sort
            .as_deref()
            .and_then(F::parse)
            .zip(query.direction.as_deref().and_then(SortDirection::parse));
        let (sort, direction) = requested.unwrap_or(F::DEFAULT);

        Self { sort, direction, page }
    }
}

impl<F: SortField> Default for ListOptions<F> {
    fn default() -> Self {
        let (sort, direction) = F::DEFAULT;
        Self { sort, direction, page: None }
    }
}

fn positive_or(value: &str, fallback: i64) -> i64 {
    match value.trim().parse::<i64>() {
        Ok(n) if n > 0 => n,
        _ => fallback,
    }
}
