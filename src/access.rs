use chrono::Utc;

use crate::services::{
    AgencyStatus, ListScope, PanelContext, PanelError, PanelResult, PlatformService, Role,
};

const SUSPENSION_CACHE_SECS: i64 = 60;

pub fn role_permissions(role: Role) -> &'static [&'static str] {
    match role {
        Role::Admin => &[
            "manage_tours",
            "manage_bookings",
            "view_payments",
            "view_commissions",
            "settle_commissions",
            "review_refunds",
            "manage_promotions",
            "manage_services",
            "manage_agencies",
            "view_dashboard",
            "view_audit_log",
            "export_data",
        ],
        Role::Agency => &[
            "manage_tours",
            "manage_bookings",
            "view_payments",
            "view_commissions",
            "request_refunds",
            "manage_services",
            "view_dashboard",
            "export_data",
        ],
    }
}

pub fn load_permissions<S: PlatformService>(
    service: &S,
    ctx: &mut PanelContext,
) -> PanelResult<()> {
    service.check_session(ctx)?;
    if ctx.user_info.is_guest {
        ctx.user_info.permissions.clear();
        return Ok(());
    }
    if ctx.user_info.role != Role::Admin {
        ensure_active_account(service, ctx, false)?;
    }
    ctx.user_info.permissions = role_permissions(ctx.user_info.role)
        .iter()
        .map(|permission| permission.to_string())
        .collect();
    Ok(())
}

pub fn ensure_permission(ctx: &PanelContext, permission: &str) -> PanelResult<()> {
    if ctx.user_info.permissions.contains(permission) {
        Ok(())
    } else {
        Err(PanelError::PermissionDenied(permission.to_string()))
    }
}

// The suspension verdict is cached in the session for a minute so list
// views do not re-query the agency on every request.
pub fn ensure_active_account<S: PlatformService>(
    service: &S,
    ctx: &mut PanelContext,
    force_check: bool,
) -> PanelResult<()> {
    if ctx.user_info.role == Role::Admin {
        return Ok(());
    }
    let now = Utc::now().timestamp();
    let last_checked = ctx.session.int("suspension_last_checked").unwrap_or(0);
    if !force_check && now - last_checked < SUSPENSION_CACHE_SECS {
        if ctx.session.bool("account_suspended") {
            return Err(PanelError::PermissionDenied("agency_suspended".into()));
        }
        return Ok(());
    }
    let agency_id = ctx
        .user_info
        .agency_id
        .ok_or_else(|| PanelError::Validation("no_agency_binding".into()))?;
    let agency = service
        .get_agency(agency_id)?
        .ok_or_else(|| PanelError::Validation("no_agency".into()))?;
    ctx.session.set("suspension_last_checked", now);
    if agency.status == AgencyStatus::Suspended {
        ctx.session.set("account_suspended", true);
        return Err(PanelError::PermissionDenied("agency_suspended".into()));
    }
    ctx.session.remove("account_suspended");
    Ok(())
}

pub fn panel_scope(ctx: &PanelContext) -> PanelResult<ListScope> {
    match ctx.user_info.role {
        Role::Admin => Ok(ListScope::All),
        Role::Agency => ctx
            .user_info
            .agency_id
            .map(ListScope::Agency)
            .ok_or_else(|| PanelError::Validation("no_agency_binding".into())),
    }
}
