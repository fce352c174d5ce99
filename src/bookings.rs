use serde_json::json;

use crate::access::{ensure_permission, panel_scope};
use crate::audit::log_panel_action;
use crate::filters::SearchFilter;
use crate::pagination::{list_controls, Pager};
use crate::services::{
    BookingStatus, PanelContext, PanelError, PanelResult, PlatformService,
};

const STATUS_CHIPS: [BookingStatus; 4] = [
    BookingStatus::Pending,
    BookingStatus::Confirmed,
    BookingStatus::Completed,
    BookingStatus::Cancelled,
];

fn allowed_transition(from: BookingStatus, to: BookingStatus) -> bool {
    matches!(
        (from, to),
        (BookingStatus::Pending, BookingStatus::Confirmed)
            | (BookingStatus::Pending, BookingStatus::Cancelled)
            | (BookingStatus::Confirmed, BookingStatus::Completed)
            | (BookingStatus::Confirmed, BookingStatus::Cancelled)
    )
}

pub fn list_bookings<S: PlatformService>(service: &S, ctx: &mut PanelContext) -> PanelResult<()> {
    service.check_session(ctx)?;
    ensure_permission(ctx, "manage_bookings")?;
    let scope = panel_scope(ctx)?;
    let (page, per_page) = list_controls(ctx, "bookings_per_page")?;
    let bookings = service.list_bookings(scope)?;
    // chips count the whole scoped collection so they stay put while filtering
    let chips: Vec<_> = STATUS_CHIPS
        .iter()
        .map(|status| {
            json!({
                "status": status.label(),
                "count": bookings.iter().filter(|b| b.status == *status).count(),
            })
        })
        .collect();
    let mut pager = Pager::with_page_size(bookings, per_page)?;
    SearchFilter::from_request(ctx).apply(&mut pager);
    pager.set_page(page);
    let listing = pager.page();
    ctx.view.set("booking_list", &listing.items);
    ctx.view.set("booking_pages", listing.meta());
    ctx.view.set("booking_status_counts", chips);
    Ok(())
}

pub fn booking_detail<S: PlatformService>(
    service: &S,
    ctx: &mut PanelContext,
    booking_id: i64,
) -> PanelResult<()> {
    service.check_session(ctx)?;
    ensure_permission(ctx, "manage_bookings")?;
    let scope = panel_scope(ctx)?;
    let booking = service
        .get_booking(booking_id)?
        .filter(|booking| scope.includes(booking.agency_id))
        .ok_or_else(|| PanelError::Validation("no_booking".into()))?;
    let payments: Vec<_> = service
        .list_payments(scope)?
        .into_iter()
        .filter(|payment| payment.booking_id == booking_id)
        .collect();
    ctx.view.set("booking", &booking);
    ctx.view.set("booking_payments", payments);
    Ok(())
}

pub fn update_booking_status<S: PlatformService>(
    service: &S,
    ctx: &mut PanelContext,
    booking_id: i64,
    next: BookingStatus,
) -> PanelResult<()> {
    service.check_session(ctx)?;
    ensure_permission(ctx, "manage_bookings")?;
    let scope = panel_scope(ctx)?;
    let booking = service
        .get_booking(booking_id)?
        .filter(|booking| scope.includes(booking.agency_id))
        .ok_or_else(|| PanelError::Validation("no_booking".into()))?;
    if !allowed_transition(booking.status, next) {
        return Err(PanelError::Validation("bad_status_transition".into()));
    }
    service.set_booking_status(booking_id, next)?;
    log_panel_action(
        service,
        ctx,
        "booking_status",
        json!({
            "booking_id": booking_id,
            "from": booking.status.label(),
            "to": next.label(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::load_permissions;
    use crate::services::{InMemoryService, Role};

    fn ctx_for(service: &InMemoryService, role: Role, agency_id: Option<i64>) -> PanelContext {
        let mut ctx = PanelContext::default();
        ctx.user_info.id = if role == Role::Admin { 1 } else { 20 };
        ctx.user_info.is_guest = false;
        ctx.user_info.role = role;
        ctx.user_info.agency_id = agency_id;
        load_permissions(service, &mut ctx).unwrap();
        ctx
    }

    #[test]
    fn listing_carries_status_chips() {
        let service = InMemoryService::default();
        let mut ctx = ctx_for(&service, Role::Admin, None);
        ctx.request.set("status", "pending");
        list_bookings(&service, &mut ctx).unwrap();
        let rows = ctx.view.get("booking_list").unwrap().as_array().unwrap().clone();
        assert_eq!(rows.len(), 2);
        let chips = ctx
            .view
            .get("booking_status_counts")
            .unwrap()
            .as_array()
            .unwrap()
            .clone();
        assert_eq!(chips[0]["status"], "pending");
        assert_eq!(chips[0]["count"], 2);
        assert_eq!(chips[1]["count"], 2);
        assert_eq!(chips[3]["status"], "cancelled");
    }

    #[test]
    fn agency_scope_limits_bookings_and_chips() {
        let service = InMemoryService::default();
        let mut ctx = ctx_for(&service, Role::Agency, Some(2));
        list_bookings(&service, &mut ctx).unwrap();
        let meta = ctx.view.get("booking_pages").unwrap();
        assert_eq!(meta["total_items"], 3);
        let chips = ctx
            .view
            .get("booking_status_counts")
            .unwrap()
            .as_array()
            .unwrap()
            .clone();
        let cancelled = chips.iter().find(|c| c["status"] == "cancelled").unwrap();
        assert_eq!(cancelled["count"], 1);
    }

    #[test]
    fn detail_includes_the_linked_payments() {
        let service = InMemoryService::default();
        let mut ctx = ctx_for(&service, Role::Agency, Some(1));
        booking_detail(&service, &mut ctx, 1).unwrap();
        let payments = ctx
            .view
            .get("booking_payments")
            .unwrap()
            .as_array()
            .unwrap()
            .clone();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0]["id"], 1);
        assert!(matches!(
            booking_detail(&service, &mut ctx, 4),
            Err(PanelError::Validation(_))
        ));
    }

    #[test]
    fn pending_bookings_can_be_confirmed_or_cancelled() {
        let service = InMemoryService::default();
        let mut ctx = ctx_for(&service, Role::Agency, Some(1));
        update_booking_status(&service, &mut ctx, 2, BookingStatus::Confirmed).unwrap();
        let booking = service.get_booking(2).unwrap().unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);
        let logs = service.list_action_logs().unwrap();
        assert_eq!(logs.last().unwrap().details["to"], "confirmed");
    }

    #[test]
    fn finished_bookings_reject_further_transitions() {
        let service = InMemoryService::default();
        let mut ctx = ctx_for(&service, Role::Admin, None);
        // booking 3 is completed, booking 5 is cancelled
        for (id, next) in [
            (3, BookingStatus::Confirmed),
            (3, BookingStatus::Cancelled),
            (5, BookingStatus::Confirmed),
        ] {
            assert!(matches!(
                update_booking_status(&service, &mut ctx, id, next),
                Err(PanelError::Validation(ref key)) if key == "bad_status_transition"
            ));
        }
    }

    #[test]
    fn pending_cannot_jump_straight_to_completed() {
        let service = InMemoryService::default();
        let mut ctx = ctx_for(&service, Role::Admin, None);
        assert!(matches!(
            update_booking_status(&service, &mut ctx, 2, BookingStatus::Completed),
            Err(PanelError::Validation(ref key)) if key == "bad_status_transition"
        ));
    }

    #[test]
    fn foreign_bookings_stay_invisible_to_updates() {
        let service = InMemoryService::default();
        let mut ctx = ctx_for(&service, Role::Agency, Some(1));
        assert!(matches!(
            update_booking_status(&service, &mut ctx, 4, BookingStatus::Completed),
            Err(PanelError::Validation(ref key)) if key == "no_booking"
        ));
    }
}
