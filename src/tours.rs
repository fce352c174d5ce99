use chrono::NaiveDate;
use serde_json::json;

use crate::access::{ensure_permission, panel_scope};
use crate::audit::log_panel_action;
use crate::filters::SearchFilter;
use crate::pagination::{list_controls, Pager};
use crate::services::{
    PanelContext, PanelError, PanelResult, PlatformService, Role, TourDraft,
};

pub fn list_tours<S: PlatformService>(service: &S, ctx: &mut PanelContext) -> PanelResult<()> {
    service.check_session(ctx)?;
    ensure_permission(ctx, "manage_tours")?;
    let scope = panel_scope(ctx)?;
    let (page, per_page) = list_controls(ctx, "tours_per_page")?;
    let tours = service.list_tours(scope)?;
    let mut pager = Pager::with_page_size(tours, per_page)?;
    SearchFilter::from_request(ctx).apply(&mut pager);
    pager.set_page(page);
    let listing = pager.page();
    ctx.view.set("tour_list", &listing.items);
    ctx.view.set("tour_pages", listing.meta());
    Ok(())
}

pub fn tour_detail<S: PlatformService>(
    service: &S,
    ctx: &mut PanelContext,
    tour_id: i64,
) -> PanelResult<()> {
    service.check_session(ctx)?;
    ensure_permission(ctx, "manage_tours")?;
    let scope = panel_scope(ctx)?;
    let tour = service
        .get_tour(tour_id)?
        .filter(|tour| scope.includes(tour.agency_id))
        .ok_or_else(|| PanelError::Validation("no_tour".into()))?;
    ctx.view.set("tour", &tour);
    Ok(())
}

pub fn save_tour<S: PlatformService>(service: &S, ctx: &mut PanelContext) -> PanelResult<()> {
    service.check_session(ctx)?;
    ensure_permission(ctx, "manage_tours")?;
    let scope = panel_scope(ctx)?;
    // agencies always save under their own binding, admins pick one
    let agency_id = match ctx.user_info.role {
        Role::Admin => ctx
            .form
            .int("agency_id")
            .ok_or_else(|| PanelError::Validation("no_agency_binding".into()))?,
        Role::Agency => ctx
            .user_info
            .agency_id
            .ok_or_else(|| PanelError::Validation("no_agency_binding".into()))?,
    };
    let title = ctx.form.string("title").unwrap_or_default().trim().to_string();
    let destination = ctx
        .form
        .string("destination")
        .unwrap_or_default()
        .trim()
        .to_string();
    if title.is_empty() || destination.is_empty() {
        return Err(PanelError::Validation("no_title_or_destination".into()));
    }
    let price = ctx.form.float("price").unwrap_or(0.0);
    if price <= 0.0 {
        return Err(PanelError::Validation("bad_price".into()));
    }
    let seats_total = ctx.form.int("seats_total").unwrap_or(0);
    if seats_total < 1 {
        return Err(PanelError::Validation("bad_seat_count".into()));
    }
    let departure_date = ctx
        .form
        .string("departure_date")
        .and_then(|raw| NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok())
        .ok_or_else(|| PanelError::Validation("bad_departure_date".into()))?;
    let id = ctx.form.int("id");
    if let Some(existing_id) = id {
        service
            .get_tour(existing_id)?
            .filter(|tour| scope.includes(tour.agency_id))
            .ok_or_else(|| PanelError::Validation("no_tour".into()))?;
    }
    let draft = TourDraft {
        id,
        agency_id,
        title,
        destination,
        category: ctx.form.string("category").unwrap_or_default(),
        price,
        seats_total,
        departure_date,
        publish: ctx.form.bool("publish"),
    };
    let tour_id = service.save_tour(draft)?;
    log_panel_action(service, ctx, "save_tour", json!({ "tour_id": tour_id }))?;
    ctx.view.set("saved_tour_id", tour_id);
    Ok(())
}

pub fn archive_tour<S: PlatformService>(
    service: &S,
    ctx: &mut PanelContext,
    tour_id: i64,
) -> PanelResult<()> {
    service.check_session(ctx)?;
    ensure_permission(ctx, "manage_tours")?;
    let scope = panel_scope(ctx)?;
    service
        .get_tour(tour_id)?
        .filter(|tour| scope.includes(tour.agency_id))
        .ok_or_else(|| PanelError::Validation("no_tour".into()))?;
    service.archive_tour(tour_id)?;
    log_panel_action(service, ctx, "archive_tour", json!({ "tour_id": tour_id }))
}
