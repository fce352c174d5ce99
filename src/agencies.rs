use serde_json::json;

use crate::access::ensure_permission;
use crate::audit::log_panel_action;
use crate::filters::SearchFilter;
use crate::pagination::{list_controls, Pager};
use crate::services::{
    AgencyStatus, ListScope, PanelContext, PanelError, PanelResult, PlatformService,
};

pub fn list_agencies<S: PlatformService>(service: &S, ctx: &mut PanelContext) -> PanelResult<()> {
    service.check_session(ctx)?;
    ensure_permission(ctx, "manage_agencies")?;
    let (page, per_page) = list_controls(ctx, "agencies_per_page")?;
    let agencies = service.list_agencies()?;
    let mut pager = Pager::with_page_size(agencies, per_page)?;
    SearchFilter::from_request(ctx).apply(&mut pager);
    pager.set_page(page);
    let listing = pager.page();
    ctx.view.set("agency_list", &listing.items);
    ctx.view.set("agency_pages", listing.meta());
    Ok(())
}

pub fn agency_detail<S: PlatformService>(
    service: &S,
    ctx: &mut PanelContext,
    agency_id: i64,
) -> PanelResult<()> {
    service.check_session(ctx)?;
    ensure_permission(ctx, "manage_agencies")?;
    let agency = service
        .get_agency(agency_id)?
        .ok_or_else(|| PanelError::Validation("no_agency".into()))?;
    let tours = service.list_tours(ListScope::Agency(agency_id))?;
    let bookings = service.list_bookings(ListScope::Agency(agency_id))?;
    ctx.view.set("agency", &agency);
    ctx.view.set("agency_tour_count", tours.len());
    ctx.view.set("agency_booking_count", bookings.len());
    Ok(())
}

pub fn set_agency_status<S: PlatformService>(
    service: &S,
    ctx: &mut PanelContext,
    agency_id: i64,
    status: AgencyStatus,
) -> PanelResult<()> {
    service.check_session(ctx)?;
    ensure_permission(ctx, "manage_agencies")?;
    service.set_agency_status(agency_id, status)?;
    log_panel_action(
        service,
        ctx,
        "agency_status",
        json!({ "agency_id": agency_id, "status": status.label() }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{ensure_active_account, load_permissions};
    use crate::services::{InMemoryService, Role};

    fn admin_ctx(service: &InMemoryService) -> PanelContext {
        let mut ctx = PanelContext::default();
        ctx.user_info.id = 1;
        ctx.user_info.is_guest = false;
        ctx.user_info.role = Role::Admin;
        load_permissions(service, &mut ctx).unwrap();
        ctx
    }

    #[test]
    fn the_listing_filters_by_status() {
        let service = InMemoryService::default();
        let mut ctx = admin_ctx(&service);
        ctx.request.set("status", "suspended");
        list_agencies(&service, &mut ctx).unwrap();
        let rows = ctx.view.get("agency_list").unwrap().as_array().unwrap().clone();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], "Nordwind Reisen");
    }

    #[test]
    fn detail_counts_the_agency_footprint() {
        let service = InMemoryService::default();
        let mut ctx = admin_ctx(&service);
        agency_detail(&service, &mut ctx, 1).unwrap();
        assert_eq!(ctx.view.int("agency_tour_count"), Some(2));
        assert_eq!(ctx.view.int("agency_booking_count"), Some(3));
        assert!(matches!(
            agency_detail(&service, &mut ctx, 99),
            Err(PanelError::Validation(_))
        ));
    }

    #[test]
    fn suspending_locks_the_agency_out() {
        let service = InMemoryService::default();
        let mut admin = admin_ctx(&service);
        set_agency_status(&service, &mut admin, 1, AgencyStatus::Suspended).unwrap();
        let mut agency = PanelContext::default();
        agency.user_info.id = 20;
        agency.user_info.is_guest = false;
        agency.user_info.role = Role::Agency;
        agency.user_info.agency_id = Some(1);
        assert!(ensure_active_account(&service, &mut agency, true).is_err());
        set_agency_status(&service, &mut admin, 1, AgencyStatus::Active).unwrap();
        assert!(ensure_active_account(&service, &mut agency, true).is_ok());
        let logs = service.list_action_logs().unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[1].details["status"], "active");
    }

    #[test]
    fn agency_users_cannot_manage_agencies() {
        let service = InMemoryService::default();
        let mut ctx = PanelContext::default();
        ctx.user_info.id = 20;
        ctx.user_info.is_guest = false;
        ctx.user_info.role = Role::Agency;
        ctx.user_info.agency_id = Some(1);
        load_permissions(&service, &mut ctx).unwrap();
        assert!(matches!(
            list_agencies(&service, &mut ctx),
            Err(PanelError::PermissionDenied(_))
        ));
    }
}
