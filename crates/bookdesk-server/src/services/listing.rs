//! Search, status filter and pagination shared by every table view.

use serde::{Deserialize, Serialize};

use crate::models::{Booking, Identity, Payment, Service};

pub const ITEMS_PER_PAGE: usize = 5;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    /// `All` or one of the entity's status labels.
    pub status: Option<String>,
    /// 1-based.
    pub page: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub total_pages: usize,
    pub total: usize,
}

pub trait Listable {
    fn search_text(&self) -> &str;
    fn status_label(&self) -> &'static str;
}

impl Listable for Identity {
    fn search_text(&self) -> &str {
        &self.name
    }

    fn status_label(&self) -> &'static str {
        if self.status {
            "Active"
        } else {
            "Inactive"
        }
    }
}

impl Listable for Service {
    fn search_text(&self) -> &str {
        &self.title
    }

    fn status_label(&self) -> &'static str {
        self.status.as_str()
    }
}

impl Listable for Booking {
    fn search_text(&self) -> &str {
        &self.service_title
    }

    fn status_label(&self) -> &'static str {
        self.status.as_str()
    }
}

impl Listable for Payment {
    fn search_text(&self) -> &str {
        &self.service_title
    }

    fn status_label(&self) -> &'static str {
        self.payment_status.as_str()
    }
}

/// Filters `items` by `query` and cuts out the requested page. Out-of-range
/// pages are clamped.
pub fn paginate<T: Listable + Clone>(items: &[T], query: &ListQuery) -> Page<T> {
    let needle = query
        .search
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .to_lowercase();
    let status = query.status.as_deref().filter(|s| !s.eq_ignore_ascii_case("all"));

    let matching: Vec<&T> = items
        .iter()
        .filter(|item| needle.is_empty() || item.search_text().to_lowercase().contains(&needle))
        .filter(|item| status.map_or(true, |s| item.status_label().eq_ignore_ascii_case(s)))
        .collect();

    let total = matching.len();
    let total_pages = total.div_ceil(ITEMS_PER_PAGE);
    let page = query.page.unwrap_or(1).clamp(1, total_pages.max(1));

    let items = matching
        .into_iter()
        .skip((page - 1) * ITEMS_PER_PAGE)
        .take(ITEMS_PER_PAGE)
        .cloned()
        .collect();

    Page {
        items,
        page,
        total_pages,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ServiceStatus;

    fn services(n: usize) -> Vec<Service> {
        (0..n)
            .map(|i| Service {
                id: format!("s{i}"),
                title: if i % 2 == 0 { format!("Car Wash {i}") } else { format!("Haircut {i}") },
                category: "General".to_string(),
                price: 10.0,
                status: if i % 3 == 0 { ServiceStatus::Inactive } else { ServiceStatus::Active },
            })
            .collect()
    }

    #[test]
    fn pages_hold_five_items() {
        let all = services(12);
        let page = paginate(&all, &ListQuery { page: Some(3), ..Default::default() });
        assert_eq!(page.total, 12);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].id, "s10");
    }

    #[test]
    fn search_is_case_insensitive_and_combines_with_status() {
        let all = services(12);
        let page = paginate(
            &all,
            &ListQuery {
                search: Some("car WASH".into()),
                status: Some("Active".into()),
                page: None,
            },
        );
        // Even indices 0..12 are car washes; multiples of three are inactive.
        let ids: Vec<_> = page.items.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["s2", "s4", "s8", "s10"]);
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn all_status_and_out_of_range_pages() {
        let all = services(3);
        let page = paginate(
            &all,
            &ListQuery {
                status: Some("All".into()),
                page: Some(9),
                ..Default::default()
            },
        );
        assert_eq!(page.page, 1);
        assert_eq!(page.items.len(), 3);

        let empty = paginate::<Service>(&[], &ListQuery::default());
        assert_eq!(empty.total_pages, 0);
        assert_eq!(empty.page, 1);
        assert!(empty.items.is_empty());
    }
}
