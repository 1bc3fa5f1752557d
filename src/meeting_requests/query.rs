//! Filtering, paging and page-local search over meeting requests.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::dates;
use super::types::MeetingRequest;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Raw list query as it arrives on `GET /api/meetingrequests`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub classification: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub requestor_email: Option<String>,
}

impl ListQuery {
    pub fn into_parts(self) -> (ListFilters, PageRequest) {
        let page = PageRequest::new(self.page, self.page_size);
        let filters = ListFilters {
            classification: non_blank(self.classification),
            category: non_blank(self.category),
            status: non_blank(self.status),
            start_date: dates::parse_query_date(self.start_date.as_deref()),
            end_date: dates::parse_query_date(self.end_date.as_deref()),
            requestor_identity: non_blank(self.requestor_email),
        };
        (filters, page)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilters {
    pub classification: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Matches either the stored email or the stored display name, so
    /// rows saved before emails were captured still show up.
    pub requestor_identity: Option<String>,
}

impl ListFilters {
    pub fn matches(&self, request: &MeetingRequest) -> bool {
        if let Some(ref classification) = self.classification {
            if !request.classification.eq_ignore_ascii_case(classification) {
                return false;
            }
        }
        if let Some(ref category) = self.category {
            if !request.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }
        if let Some(ref status) = self.status {
            if !request.status.as_str().eq_ignore_ascii_case(status) {
                return false;
            }
        }
        if let Some(start) = self.start_date {
            match request.meeting_date {
                Some(date) if date >= start => {}
                _ => return false,
            }
        }
        if let Some(end) = self.end_date {
            match request.meeting_date {
                Some(date) if date <= end => {}
                _ => return false,
            }
        }
        if let Some(ref identity) = self.requestor_identity {
            let by_email = request
                .requestor_email
                .as_deref()
                .is_some_and(|email| email.eq_ignore_ascii_case(identity));
            let by_name = request.requestor_name.eq_ignore_ascii_case(identity);
            if !by_email && !by_name {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(page: Option<i64>, page_size: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub page_size: i64,
    pub total_count: i64,
    pub total_pages: i64,
    pub has_more: bool,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, page: PageRequest, total_count: i64) -> Self {
        let total_pages = if total_count == 0 {
            0
        } else {
            (total_count + page.page_size - 1) / page.page_size
        };
        Self {
            items,
            page: page.page,
            page_size: page.page_size,
            total_count,
            total_pages,
            has_more: page.page.saturating_mul(page.page_size) < total_count,
        }
    }
}

/// Most recent first, id descending on ties.
pub fn sort_newest_first(requests: &mut [MeetingRequest]) {
    requests.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

/// Case-insensitive substring match over the fields shown in the list.
///
/// This only ever sees rows that were already fetched, so a term that
/// matches a request on a page not yet loaded will not find it.
pub fn matches_search(request: &MeetingRequest, search_term: &str) -> bool {
    let query = search_term.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }

    let searchable = [
        request.reference_number.clone().unwrap_or_default(),
        request.requestor_name.clone(),
        request.request_type.clone(),
        request.country.clone(),
        request.title.clone(),
        dates::display(request.meeting_date),
    ];

    searchable
        .iter()
        .any(|field| field.to_lowercase().contains(&query))
}

pub fn filter_loaded<'a>(items: &'a [MeetingRequest], search_term: &str) -> Vec<&'a MeetingRequest> {
    items
        .iter()
        .filter(|item| matches_search(item, search_term))
        .collect()
}

/// Client-side list state. Rendering code holds one of these and turns
/// it into a request with [`ListRequestState::to_query_string`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRequestState {
    pub filters: ListFilters,
    pub search_term: String,
    pub page: i64,
    pub page_size: i64,
}

impl ListRequestState {
    pub fn new(requestor_identity: Option<String>) -> Self {
        Self {
            filters: ListFilters {
                requestor_identity,
                ..Default::default()
            },
            search_term: String::new(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn next_page(&self) -> Self {
        Self {
            page: self.page + 1,
            ..self.clone()
        }
    }

    /// Changing a filter restarts paging; the search term never reaches
    /// the server.
    pub fn with_filters(&self, filters: ListFilters) -> Self {
        Self {
            filters,
            page: 1,
            ..self.clone()
        }
    }

    pub fn to_query_string(&self) -> String {
        let page = PageRequest::new(Some(self.page), Some(self.page_size));
        let mut params: Vec<(&str, String)> = vec![
            ("page", page.page.to_string()),
            ("pageSize", page.page_size.to_string()),
        ];

        let f = &self.filters;
        if let Some(ref v) = f.classification {
            params.push(("classification", v.clone()));
        }
        if let Some(ref v) = f.category {
            params.push(("category", v.clone()));
        }
        if let Some(ref v) = f.status {
            params.push(("status", v.clone()));
        }
        if let Some(d) = f.start_date {
            params.push(("startDate", dates::canonical(d)));
        }
        if let Some(d) = f.end_date {
            params.push(("endDate", dates::canonical(d)));
        }
        if let Some(ref v) = f.requestor_identity {
            params.push(("requestorEmail", v.clone()));
        }

        params
            .into_iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(&v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}
