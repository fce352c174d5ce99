use serde_json::json;

use crate::access::{ensure_permission, panel_scope};
use crate::audit::log_panel_action;
use crate::filters::SearchFilter;
use crate::pagination::{list_controls, Pager};
use crate::services::{
    PanelContext, PanelError, PanelResult, PlatformService, Role, ServiceItemDraft,
};

pub fn list_service_items<S: PlatformService>(
    service: &S,
    ctx: &mut PanelContext,
) -> PanelResult<()> {
    service.check_session(ctx)?;
    ensure_permission(ctx, "manage_services")?;
    let scope = panel_scope(ctx)?;
    let (page, per_page) = list_controls(ctx, "services_per_page")?;
    let items = service.list_service_items(scope)?;
    let mut pager = Pager::with_page_size(items, per_page)?;
    SearchFilter::from_request(ctx).apply(&mut pager);
    pager.set_page(page);
    let listing = pager.page();
    ctx.view.set("service_list", &listing.items);
    ctx.view.set("service_pages", listing.meta());
    Ok(())
}

pub fn save_service_item<S: PlatformService>(
    service: &S,
    ctx: &mut PanelContext,
) -> PanelResult<()> {
    service.check_session(ctx)?;
    ensure_permission(ctx, "manage_services")?;
    let name = ctx.form.string("name").unwrap_or_default().trim().to_string();
    if name.is_empty() {
        return Err(PanelError::Validation("no_name".into()));
    }
    let price = ctx.form.float("price").unwrap_or(-1.0);
    if price < 0.0 {
        return Err(PanelError::Validation("bad_price".into()));
    }
    // platform-wide items have no binding and only admins may touch them
    let agency_id = match ctx.user_info.role {
        Role::Admin => ctx.form.int("agency_id"),
        Role::Agency => Some(
            ctx.user_info
                .agency_id
                .ok_or_else(|| PanelError::Validation("no_agency_binding".into()))?,
        ),
    };
    if let Some(item_id) = ctx.form.int("id") {
        if ctx.user_info.role != Role::Admin {
            let scope = panel_scope(ctx)?;
            let owned = service
                .list_service_items(scope)?
                .into_iter()
                .any(|item| item.id == item_id && item.agency_id.is_some());
            if !owned {
                return Err(PanelError::Validation("no_service_item".into()));
            }
        }
    }
    let draft = ServiceItemDraft {
        id: ctx.form.int("id"),
        name,
        category: ctx.form.string("category").unwrap_or_default(),
        price,
        active: ctx.form.bool("active"),
        agency_id,
    };
    let item_id = service.save_service_item(draft)?;
    log_panel_action(
        service,
        ctx,
        "save_service_item",
        json!({ "service_item_id": item_id }),
    )?;
    ctx.view.set("saved_service_item_id", item_id);
    Ok(())
}

pub fn set_service_item_active<S: PlatformService>(
    service: &S,
    ctx: &mut PanelContext,
    item_id: i64,
    active: bool,
) -> PanelResult<()> {
    service.check_session(ctx)?;
    ensure_permission(ctx, "manage_services")?;
    if ctx.user_info.role != Role::Admin {
        let scope = panel_scope(ctx)?;
        let owned = service
            .list_service_items(scope)?
            .into_iter()
            .any(|item| item.id == item_id && item.agency_id.is_some());
        if !owned {
            return Err(PanelError::Validation("no_service_item".into()));
        }
    }
    service.set_service_item_active(item_id, active)?;
    log_panel_action(
        service,
        ctx,
        "service_item_active",
        json!({ "service_item_id": item_id, "active": active }),
    )
}
