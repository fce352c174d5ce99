use tour_admin_rust::access::load_permissions;
use tour_admin_rust::bookings::{list_bookings, update_booking_status};
use tour_admin_rust::dashboard::panel_dashboard;
use tour_admin_rust::export::export_bookings_csv;
use tour_admin_rust::navigation::{panel_main, prepare_view_context};
use tour_admin_rust::promotions::save_promotion;
use tour_admin_rust::refunds::review_refund;
use tour_admin_rust::scheduled::run_scheduled_tasks;
use tour_admin_rust::services::{BookingStatus, InMemoryService, PanelContext, Role};
use tour_admin_rust::tours::list_tours;

fn main() {
    let service = InMemoryService::default();

    let mut ctx = PanelContext::default();
    ctx.user_info.id = 1;
    ctx.user_info.is_guest = false;
    ctx.user_info.role = Role::Admin;
    ctx.user_info.name = "Platform Ops".into();
    ctx.request.set("as_of", "2025-07-31");

    if let Err(error) = load_permissions(&service, &mut ctx) {
        eprintln!("load_permissions() -> {error}");
        return;
    }
    if let Err(error) = panel_main(&service, &mut ctx) {
        eprintln!("panel_main() -> {error}");
    }

    prepare_view_context(&mut ctx, "dashboard");
    if let Err(error) = panel_dashboard(&service, &mut ctx) {
        eprintln!("panel_dashboard() -> {error}");
    }
    if let Some(cards) = ctx.view.get("dashboard_cards") {
        println!("dashboard: {cards}");
    }

    ctx.request.set("q", "kyoto");
    prepare_view_context(&mut ctx, "tours");
    if let Err(error) = list_tours(&service, &mut ctx) {
        eprintln!("list_tours() -> {error}");
    }
    if let Some(meta) = ctx.view.get("tour_pages") {
        println!("tours matching 'kyoto': {meta}");
    }
    ctx.request.remove("q");

    if let Err(error) = update_booking_status(&service, &mut ctx, 2, BookingStatus::Confirmed) {
        eprintln!("update_booking_status() -> {error}");
    }

    ctx.form.set("code", "bad code");
    ctx.form.set("discount_percent", 20);
    ctx.form.set("valid_from", "2025-09-01");
    ctx.form.set("valid_until", "2025-09-30");
    if let Err(error) = save_promotion(&service, &mut ctx) {
        eprintln!("save_promotion() -> {error}");
    }

    if let Err(error) = review_refund(&service, &mut ctx, 2, true) {
        eprintln!("review_refund() -> {error}");
    }

    prepare_view_context(&mut ctx, "export");
    match export_bookings_csv(&service, &mut ctx) {
        Ok(csv) => println!("export: {} lines", csv.lines().count()),
        Err(error) => eprintln!("export_bookings_csv() -> {error}"),
    }

    if let Err(error) = run_scheduled_tasks(&service) {
        eprintln!("run_scheduled_tasks() -> {error}");
    }

    let mut agency_ctx = PanelContext::default();
    agency_ctx.user_info.id = 20;
    agency_ctx.user_info.is_guest = false;
    agency_ctx.user_info.role = Role::Agency;
    agency_ctx.user_info.agency_id = Some(1);
    if let Err(error) = load_permissions(&service, &mut agency_ctx) {
        eprintln!("load_permissions() -> {error}");
        return;
    }
    agency_ctx.request.set("status", "confirmed");
    if let Err(error) = list_bookings(&service, &mut agency_ctx) {
        eprintln!("list_bookings() -> {error}");
    }
    if let Some(meta) = agency_ctx.view.get("booking_pages") {
        println!("agency confirmed bookings: {meta}");
    }
}
