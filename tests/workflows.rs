use serde_json::json;

use tour_admin_rust::access::load_permissions;
use tour_admin_rust::services::{
    BookingStatus, InMemoryService, ListScope, PanelContext, PanelError, PlatformService,
    RefundStatus, Role,
};
use tour_admin_rust::{audit, bookings, commissions, refunds};

fn admin_ctx(service: &InMemoryService) -> PanelContext {
    let mut ctx = PanelContext::default();
    ctx.user_info.id = 1;
    ctx.user_info.is_guest = false;
    ctx.user_info.role = Role::Admin;
    load_permissions(service, &mut ctx).unwrap();
    ctx
}

fn agency_ctx(service: &InMemoryService, agency_id: i64) -> PanelContext {
    let mut ctx = PanelContext::default();
    ctx.user_info.id = 20;
    ctx.user_info.is_guest = false;
    ctx.user_info.role = Role::Agency;
    ctx.user_info.agency_id = Some(agency_id);
    load_permissions(service, &mut ctx).unwrap();
    ctx
}

#[test]
fn bookings_walk_the_status_matrix() {
    let service = InMemoryService::default();
    let mut ctx = admin_ctx(&service);

    bookings::update_booking_status(&service, &mut ctx, 2, BookingStatus::Confirmed).unwrap();
    bookings::update_booking_status(&service, &mut ctx, 2, BookingStatus::Completed).unwrap();
    let booking = service.get_booking(2).unwrap().unwrap();
    assert_eq!(booking.status, BookingStatus::Completed);

    let reopened = bookings::update_booking_status(&service, &mut ctx, 2, BookingStatus::Cancelled);
    assert!(matches!(reopened, Err(PanelError::Validation(_))));
}

#[test]
fn pending_bookings_cannot_skip_ahead() {
    let service = InMemoryService::default();
    let mut ctx = admin_ctx(&service);
    let skipped = bookings::update_booking_status(&service, &mut ctx, 6, BookingStatus::Completed);
    assert!(matches!(
        skipped,
        Err(PanelError::Validation(ref key)) if key == "bad_status_transition"
    ));
    assert_eq!(
        service.get_booking(6).unwrap().unwrap().status,
        BookingStatus::Pending
    );
}

#[test]
fn refunds_travel_from_request_to_review() {
    let service = InMemoryService::default();

    let mut agency = agency_ctx(&service, 1);
    agency.form.set("payment_id", 2);
    agency.form.set("amount", 200.0);
    agency.form.set("reason", "boat tour rained out");
    refunds::request_refund(&service, &mut agency).unwrap();
    let saved = agency
        .view
        .get("saved_refund_id")
        .and_then(|value| value.as_i64())
        .unwrap();

    let mut admin = admin_ctx(&service);
    refunds::review_refund(&service, &mut admin, saved, true).unwrap();
    let refund = service
        .list_refunds(ListScope::All)
        .unwrap()
        .into_iter()
        .find(|r| r.id == saved)
        .unwrap();
    assert_eq!(refund.status, RefundStatus::Approved);
    // the booking link is derived from the payment, not from the form
    assert_eq!(refund.booking_id, 3);

    let second_review = refunds::review_refund(&service, &mut admin, saved, false);
    assert!(matches!(second_review, Err(PanelError::Validation(_))));
}

#[test]
fn refund_requests_cannot_exceed_the_payment() {
    let service = InMemoryService::default();
    let mut agency = agency_ctx(&service, 1);
    agency.form.set("payment_id", 2);
    agency.form.set("amount", 5000.0);
    agency.form.set("reason", "overcharge");
    assert!(matches!(
        refunds::request_refund(&service, &mut agency),
        Err(PanelError::Validation(ref key)) if key == "bad_refund_amount"
    ));
}

#[test]
fn commissions_settle_exactly_once() {
    let service = InMemoryService::default();
    let mut ctx = admin_ctx(&service);
    commissions::settle_commission(&service, &mut ctx, 1).unwrap();
    assert!(matches!(
        commissions::settle_commission(&service, &mut ctx, 1),
        Err(PanelError::Validation(ref key)) if key == "already_settled"
    ));
    assert!(matches!(
        commissions::settle_commission(&service, &mut ctx, 2),
        Err(PanelError::Validation(_))
    ));
}

#[test]
fn suspended_agencies_cannot_act() {
    let service = InMemoryService::default();
    let mut ctx = PanelContext::default();
    ctx.user_info.id = 30;
    ctx.user_info.is_guest = false;
    ctx.user_info.role = Role::Agency;
    ctx.user_info.agency_id = Some(3);

    assert!(matches!(
        load_permissions(&service, &mut ctx),
        Err(PanelError::PermissionDenied(_))
    ));
    let denied = audit::log_panel_action(&service, &mut ctx, "save_tour", json!({"tour_id": 5}));
    assert!(denied.is_err());
    assert!(service.list_action_logs().unwrap().is_empty());
}

#[test]
fn workflow_actions_append_to_the_audit_trail() {
    let service = InMemoryService::default();
    let mut ctx = admin_ctx(&service);
    bookings::update_booking_status(&service, &mut ctx, 2, BookingStatus::Confirmed).unwrap();
    commissions::settle_commission(&service, &mut ctx, 1).unwrap();

    let logs = service.list_action_logs().unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].action, "booking_status");
    assert_eq!(logs[1].action, "settle_commission");
    assert_eq!(logs[1].actor_id, Some(1));
}
