use serde_json::Value;

use crate::access::{ensure_active_account, ensure_permission};
use crate::filters::SearchFilter;
use crate::pagination::{list_controls, Pager};
use crate::services::{PanelContext, PanelResult, PlatformService};

// Suspended accounts must not leave trails, so writes pass the account gate.
pub fn log_panel_action<S: PlatformService>(
    service: &S,
    ctx: &mut PanelContext,
    action: &str,
    details: Value,
) -> PanelResult<()> {
    ensure_active_account(service, ctx, false)?;
    service.log_action(action, Some(ctx.user_info.id), &details)
}

pub fn list_audit_log<S: PlatformService>(
    service: &S,
    ctx: &mut PanelContext,
) -> PanelResult<()> {
    service.check_session(ctx)?;
    ensure_permission(ctx, "view_audit_log")?;
    let (page, per_page) = list_controls(ctx, "audit_per_page")?;
    let mut entries = service.list_action_logs()?;
    entries.reverse();
    let mut pager = Pager::with_page_size(entries, per_page)?;
    SearchFilter::from_request(ctx).apply(&mut pager);
    pager.set_page(page);
    let listing = pager.page();
    ctx.view.set("audit_log", &listing.items);
    ctx.view.set("audit_pages", listing.meta());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::load_permissions;
    use crate::services::{InMemoryService, PanelError, Role};
    use serde_json::json;

    fn admin_ctx(service: &InMemoryService) -> PanelContext {
        let mut ctx = PanelContext::default();
        ctx.user_info.id = 1;
        ctx.user_info.is_guest = false;
        ctx.user_info.role = Role::Admin;
        load_permissions(service, &mut ctx).unwrap();
        ctx
    }

    #[test]
    fn actions_append_to_the_log() {
        let service = InMemoryService::default();
        let mut ctx = admin_ctx(&service);
        log_panel_action(&service, &mut ctx, "save_tour", json!({"tour_id": 1})).unwrap();
        log_panel_action(&service, &mut ctx, "booking_status", json!({"id": 2})).unwrap();
        let logs = service.list_action_logs().unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].action, "save_tour");
        assert_eq!(logs[1].details["id"], 2);
        assert_eq!(logs[1].actor_id, Some(1));
    }

    #[test]
    fn suspended_agencies_cannot_write_log_entries() {
        let service = InMemoryService::default();
        let mut ctx = PanelContext::default();
        ctx.user_info.id = 30;
        ctx.user_info.is_guest = false;
        ctx.user_info.role = Role::Agency;
        ctx.user_info.agency_id = Some(3);
        let result = log_panel_action(&service, &mut ctx, "save_tour", json!({}));
        assert!(matches!(result, Err(PanelError::PermissionDenied(_))));
        assert!(service.list_action_logs().unwrap().is_empty());
    }

    #[test]
    fn audit_view_lists_newest_first() {
        let service = InMemoryService::default();
        let mut ctx = admin_ctx(&service);
        for n in 0..3 {
            log_panel_action(&service, &mut ctx, "save_tour", json!({"n": n})).unwrap();
        }
        list_audit_log(&service, &mut ctx).unwrap();
        let rows = ctx.view.get("audit_log").unwrap().as_array().unwrap().clone();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["details"]["n"], 2);
        let meta = ctx.view.get("audit_pages").unwrap();
        assert_eq!(meta["total_items"], 3);
    }

    #[test]
    fn audit_view_is_admin_only() {
        let service = InMemoryService::default();
        let mut ctx = PanelContext::default();
        ctx.user_info.id = 20;
        ctx.user_info.is_guest = false;
        ctx.user_info.role = Role::Agency;
        ctx.user_info.agency_id = Some(1);
        load_permissions(&service, &mut ctx).unwrap();
        assert!(matches!(
            list_audit_log(&service, &mut ctx),
            Err(PanelError::PermissionDenied(_))
        ));
    }
}
