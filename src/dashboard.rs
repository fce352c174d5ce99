use chrono::{Datelike, NaiveDate};
use serde_json::json;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::access::{ensure_permission, panel_scope};
use crate::services::{
    panel_today, BookingStatus, CommissionStatus, PanelContext, PanelResult, PlatformService,
    RefundStatus, Role, TourStatus,
};

const TREND_MONTHS: usize = 6;

fn counts_as_revenue(status: BookingStatus) -> bool {
    matches!(status, BookingStatus::Confirmed | BookingStatus::Completed)
}

fn trailing_months(anchor: NaiveDate, count: usize) -> Vec<(i32, u32)> {
    let mut months = Vec::with_capacity(count);
    let mut year = anchor.year();
    let mut month = anchor.month();
    for _ in 0..count {
        months.push((year, month));
        if month == 1 {
            month = 12;
            year -= 1;
        } else {
            month -= 1;
        }
    }
    months.reverse();
    months
}

fn month_key(year: i32, month: u32) -> String {
    format!("{year:04}-{month:02}")
}

pub fn panel_dashboard<S: PlatformService>(service: &S, ctx: &mut PanelContext) -> PanelResult<()> {
    service.check_session(ctx)?;
    ensure_permission(ctx, "view_dashboard")?;
    let scope = panel_scope(ctx)?;
    let anchor = panel_today(ctx);
    let tours = service.list_tours(scope)?;
    let bookings = service.list_bookings(scope)?;
    let refunds = service.list_refunds(scope)?;
    let commissions = service.list_commissions(scope)?;

    let published_tours = tours
        .iter()
        .filter(|tour| tour.status == TourStatus::Published)
        .count();
    let in_anchor_month = |day: NaiveDate| day.year() == anchor.year() && day.month() == anchor.month();
    let monthly_bookings = bookings
        .iter()
        .filter(|booking| in_anchor_month(booking.booked_at.date_naive()))
        .count();
    let monthly_revenue: f64 = bookings
        .iter()
        .filter(|booking| {
            counts_as_revenue(booking.status) && in_anchor_month(booking.booked_at.date_naive())
        })
        .map(|booking| booking.total_amount)
        .sum();
    let open_refunds = refunds
        .iter()
        .filter(|refund| refund.status == RefundStatus::Requested)
        .count();
    let outstanding_commission: f64 = commissions
        .iter()
        .filter(|commission| commission.status == CommissionStatus::Pending)
        .map(|commission| commission.amount)
        .sum();
    ctx.view.set(
        "dashboard_cards",
        json!({
            "published_tours": published_tours,
            "monthly_bookings": monthly_bookings,
            "monthly_revenue": monthly_revenue,
            "open_refunds": open_refunds,
            "outstanding_commission": outstanding_commission,
        }),
    );

    let trend: Vec<_> = trailing_months(anchor, TREND_MONTHS)
        .into_iter()
        .map(|(year, month)| {
            let in_month = |day: NaiveDate| day.year() == year && day.month() == month;
            let count = bookings
                .iter()
                .filter(|booking| in_month(booking.booked_at.date_naive()))
                .count();
            let revenue: f64 = bookings
                .iter()
                .filter(|booking| {
                    counts_as_revenue(booking.status) && in_month(booking.booked_at.date_naive())
                })
                .map(|booking| booking.total_amount)
                .sum();
            json!({ "month": month_key(year, month), "bookings": count, "revenue": revenue })
        })
        .collect();
    ctx.view.set("booking_trend", trend);

    let distribution: Vec<_> = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ]
    .iter()
    .map(|status| {
        json!({
            "status": status.label(),
            "count": bookings.iter().filter(|b| b.status == *status).count(),
        })
    })
    .collect();
    ctx.view.set("booking_status_distribution", distribution);

    let mut seats_by_tour: HashMap<i64, i64> = HashMap::new();
    for booking in bookings.iter().filter(|b| counts_as_revenue(b.status)) {
        *seats_by_tour.entry(booking.tour_id).or_insert(0) += booking.seats;
    }
    let mut top_tours: Vec<_> = tours
        .iter()
        .filter_map(|tour| {
            seats_by_tour.get(&tour.id).map(|seats| {
                json!({ "tour_id": tour.id, "title": tour.title, "seats_sold": seats })
            })
        })
        .collect();
    top_tours.sort_by(|a, b| {
        b["seats_sold"]
            .as_i64()
            .cmp(&a["seats_sold"].as_i64())
            .then(a["tour_id"].as_i64().cmp(&b["tour_id"].as_i64()))
    });
    top_tours.truncate(5);
    ctx.view.set("top_tours", top_tours);

    if ctx.user_info.role == Role::Admin {
        let agencies = service.list_agencies()?;
        let mut leaderboard: Vec<_> = agencies
            .iter()
            .map(|agency| {
                let revenue: f64 = bookings
                    .iter()
                    .filter(|b| b.agency_id == agency.id && counts_as_revenue(b.status))
                    .map(|b| b.total_amount)
                    .sum();
                let count = bookings.iter().filter(|b| b.agency_id == agency.id).count();
                (revenue, count, agency)
            })
            .collect();
        leaderboard.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        let rows: Vec<_> = leaderboard
            .into_iter()
            .map(|(revenue, count, agency)| {
                json!({
                    "agency_id": agency.id,
                    "name": agency.name,
                    "revenue": revenue,
                    "bookings": count,
                })
            })
            .collect();
        ctx.view.set("agency_leaderboard", rows);
    }

    ctx.view.set("as_of", anchor.format("%Y-%m-%d").to_string());
    Ok(())
}
