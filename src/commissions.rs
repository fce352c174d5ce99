use serde_json::json;

use crate::access::{ensure_permission, panel_scope};
use crate::audit::log_panel_action;
use crate::filters::SearchFilter;
use crate::pagination::{list_controls, Pager};
use crate::services::{
    CommissionStatus, PanelContext, PanelResult, PlatformService,
};

pub fn list_commissions<S: PlatformService>(
    service: &S,
    ctx: &mut PanelContext,
) -> PanelResult<()> {
    service.check_session(ctx)?;
    ensure_permission(ctx, "view_commissions")?;
    let scope = panel_scope(ctx)?;
    let (page, per_page) = list_controls(ctx, "commissions_per_page")?;
    let commissions = service.list_commissions(scope)?;
    let outstanding: f64 = commissions
        .iter()
        .filter(|c| c.status == CommissionStatus::Pending)
        .map(|c| c.amount)
        .sum();
    let mut pager = Pager::with_page_size(commissions, per_page)?;
    SearchFilter::from_request(ctx).apply(&mut pager);
    pager.set_page(page);
    let listing = pager.page();
    ctx.view.set("commission_list", &listing.items);
    ctx.view.set("commission_pages", listing.meta());
    ctx.view.set("commission_outstanding", outstanding);
    Ok(())
}

pub fn settle_commission<S: PlatformService>(
    service: &S,
    ctx: &mut PanelContext,
    commission_id: i64,
) -> PanelResult<()> {
    service.check_session(ctx)?;
    ensure_permission(ctx, "settle_commissions")?;
    service.settle_commission(commission_id)?;
    log_panel_action(
        service,
        ctx,
        "settle_commission",
        json!({ "commission_id": commission_id }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::load_permissions;
    use crate::services::{InMemoryService, PanelError, Role};

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
    fn listing_reports_the_outstanding_amount() {
        let service = InMemoryService::default();
        let mut ctx = ctx_for(&service, Role::Admin, None);
        list_commissions(&service, &mut ctx).unwrap();
        let outstanding = ctx.view.float("commission_outstanding").unwrap();
        assert!((outstanding - (355.2 + 630.0)).abs() < 1e-9);
        let meta = ctx.view.get("commission_pages").unwrap();
        assert_eq!(meta["total_items"], 3);
    }

    #[test]
    fn agencies_see_their_commissions_but_cannot_settle() {
        let service = InMemoryService::default();
        let mut ctx = ctx_for(&service, Role::Agency, Some(1));
        list_commissions(&service, &mut ctx).unwrap();
        let meta = ctx.view.get("commission_pages").unwrap();
        assert_eq!(meta["total_items"], 2);
        assert!(matches!(
            settle_commission(&service, &mut ctx, 1),
            Err(PanelError::PermissionDenied(_))
        ));
    }

    #[test]
    fn settling_twice_is_rejected() {
        let service = InMemoryService::default();
        let mut ctx = ctx_for(&service, Role::Admin, None);
        settle_commission(&service, &mut ctx, 1).unwrap();
        assert!(matches!(
            settle_commission(&service, &mut ctx, 1),
            Err(PanelError::Validation(ref key)) if key == "already_settled"
        ));
        assert!(matches!(
            settle_commission(&service, &mut ctx, 2),
            Err(PanelError::Validation(ref key)) if key == "already_settled"
        ));
        let logs = service.list_action_logs().unwrap();
        assert_eq!(logs.len(), 1);
    }
}
