use chrono::NaiveDate;

use crate::pagination::Pager;
use crate::services::{
    ActionLogEntry, AgencyRecord, BookingRecord, CommissionRecord, PanelContext, PaymentRecord,
    PromotionRecord, RefundRecord, ServiceItemRecord, TourRecord,
};

pub trait TableRecord {
    fn search_haystack(&self) -> String;
    fn status_key(&self) -> Option<&'static str>;
    fn occurred_on(&self) -> Option<NaiveDate>;
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchFilter {
    pub text: Option<String>,
    pub status: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

fn clean(raw: Option<String>) -> Option<String> {
    raw.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl SearchFilter {
    // Malformed dates in the query string are ignored rather than rejected.
    pub fn from_request(ctx: &PanelContext) -> Self {
        Self {
            text: clean(ctx.request.string("q")),
            status: clean(ctx.request.string("status")),
            date_from: ctx.request.string("from").and_then(|raw| parse_date(&raw)),
            date_to: ctx.request.string("to").and_then(|raw| parse_date(&raw)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.status.is_none()
            && self.date_from.is_none()
            && self.date_to.is_none()
    }

    pub fn matches<R: TableRecord>(&self, record: &R) -> bool {
        if let Some(text) = &self.text {
            let haystack = record.search_haystack().to_lowercase();
            if !haystack.contains(&text.to_lowercase()) {
                return false;
            }
        }
        if let Some(status) = &self.status {
            match record.status_key() {
                Some(key) => {
                    if !key.eq_ignore_ascii_case(status) {
                        return false;
                    }
                }
                None => return false,
            }
        }
        if self.date_from.is_some() || self.date_to.is_some() {
            let Some(day) = record.occurred_on() else {
                return false;
            };
            if let Some(from) = self.date_from {
                if day < from {
                    return false;
                }
            }
            if let Some(to) = self.date_to {
                if day > to {
                    return false;
                }
            }
        }
        true
    }

    pub fn apply<R: TableRecord + 'static>(&self, pager: &mut Pager<R>) {
        if self.is_empty() {
            return;
        }
        let filter = self.clone();
        pager.set_filter(move |record| filter.matches(record));
    }
}

impl TableRecord for TourRecord {
    fn search_haystack(&self) -> String {
        format!(
            "{} {} {} {}",
            self.title, self.destination, self.category, self.agency_name
        )
    }

    fn status_key(&self) -> Option<&'static str> {
        Some(self.status.label())
    }

    fn occurred_on(&self) -> Option<NaiveDate> {
        Some(self.departure_date)
    }
}

impl TableRecord for BookingRecord {
    fn search_haystack(&self) -> String {
        format!(
            "{} {} {}",
            self.tour_title, self.customer_name, self.customer_email
        )
    }

    fn status_key(&self) -> Option<&'static str> {
        Some(self.status.label())
    }

    fn occurred_on(&self) -> Option<NaiveDate> {
        Some(self.booked_at.date_naive())
    }
}

impl TableRecord for PaymentRecord {
    fn search_haystack(&self) -> String {
        format!("{} booking:{}", self.method, self.booking_id)
    }

    fn status_key(&self) -> Option<&'static str> {
        Some(self.status.label())
    }

    fn occurred_on(&self) -> Option<NaiveDate> {
        self.paid_at.map(|ts| ts.date_naive())
    }
}

impl TableRecord for CommissionRecord {
    fn search_haystack(&self) -> String {
        self.agency_name.clone()
    }

    fn status_key(&self) -> Option<&'static str> {
        Some(self.status.label())
    }

    fn occurred_on(&self) -> Option<NaiveDate> {
        Some(self.created_on)
    }
}

impl TableRecord for RefundRecord {
    fn search_haystack(&self) -> String {
        self.reason.clone()
    }

    fn status_key(&self) -> Option<&'static str> {
        Some(self.status.label())
    }

    fn occurred_on(&self) -> Option<NaiveDate> {
        Some(self.requested_at.date_naive())
    }
}

impl TableRecord for PromotionRecord {
    fn search_haystack(&self) -> String {
        format!("{} {}", self.code, self.description)
    }

    fn status_key(&self) -> Option<&'static str> {
        Some(if self.active { "active" } else { "inactive" })
    }

    fn occurred_on(&self) -> Option<NaiveDate> {
        Some(self.valid_from)
    }
}

impl TableRecord for ServiceItemRecord {
    fn search_haystack(&self) -> String {
        format!("{} {}", self.name, self.category)
    }

    fn status_key(&self) -> Option<&'static str> {
        Some(if self.active { "active" } else { "inactive" })
    }

    fn occurred_on(&self) -> Option<NaiveDate> {
        None
    }
}

impl TableRecord for AgencyRecord {
    fn search_haystack(&self) -> String {
        format!("{} {}", self.name, self.contact_email)
    }

    fn status_key(&self) -> Option<&'static str> {
        Some(self.status.label())
    }

    fn occurred_on(&self) -> Option<NaiveDate> {
        Some(self.joined_on)
    }
}

impl TableRecord for ActionLogEntry {
    fn search_haystack(&self) -> String {
        self.action.clone()
    }

    fn status_key(&self) -> Option<&'static str> {
        None
    }

    fn occurred_on(&self) -> Option<NaiveDate> {
        Some(self.timestamp.date_naive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{InMemoryService, ListScope, PlatformService};

    fn request_filter(pairs: &[(&str, &str)]) -> SearchFilter {
        let mut ctx = PanelContext::default();
        for (key, value) in pairs {
            ctx.request.set(key, *value);
        }
        SearchFilter::from_request(&ctx)
    }

    #[test]
    fn blank_and_missing_params_leave_the_filter_empty() {
        assert!(request_filter(&[]).is_empty());
        assert!(request_filter(&[("q", "   "), ("status", "")]).is_empty());
    }

    #[test]
    fn malformed_dates_are_dropped() {
        let filter = request_filter(&[("from", "not-a-date"), ("to", "2025-13-99")]);
        assert!(filter.date_from.is_none());
        assert!(filter.date_to.is_none());
    }

    #[test]
    fn text_match_is_case_insensitive() {
        let service = InMemoryService::default();
        let tours = service.list_tours(ListScope::All).unwrap();
        let filter = request_filter(&[("q", "kyoto")]);
        let hits: Vec<_> = tours.iter().filter(|t| filter.matches(*t)).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 1);
    }

    #[test]
    fn status_and_date_window_combine() {
        let service = InMemoryService::default();
        let bookings = service.list_bookings(ListScope::All).unwrap();
        let filter = request_filter(&[
            ("status", "confirmed"),
            ("from", "2025-07-01"),
            ("to", "2025-07-31"),
        ]);
        let hits: Vec<i64> = bookings
            .iter()
            .filter(|b| filter.matches(*b))
            .map(|b| b.id)
            .collect();
        assert_eq!(hits, vec![1, 4]);
    }

    #[test]
    fn date_window_excludes_records_without_a_date() {
        let service = InMemoryService::default();
        let payments = service.list_payments(ListScope::All).unwrap();
        let filter = request_filter(&[("from", "2025-01-01")]);
        // payment 4 is pending and has no paid_at
        assert!(payments
            .iter()
            .filter(|p| filter.matches(*p))
            .all(|p| p.id != 4));
    }

    #[test]
    fn applying_a_filter_to_a_pager_narrows_the_rows() {
        let service = InMemoryService::default();
        let tours = service.list_tours(ListScope::All).unwrap();
        let mut pager = Pager::new(tours);
        pager.set_page(2);
        request_filter(&[("status", "published")]).apply(&mut pager);
        let view = pager.page();
        assert_eq!(view.current_page, 1);
        assert_eq!(view.total_items, 3);
    }
}
