use serde_json::json;

use crate::access::{ensure_permission, panel_scope};
use crate::audit::log_panel_action;
use crate::filters::SearchFilter;
use crate::pagination::{list_controls, Pager};
use crate::services::{
    PanelContext, PanelError, PanelResult, PlatformService, RefundRequest, RefundStatus,
};

pub fn list_refunds<S: PlatformService>(service: &S, ctx: &mut PanelContext) -> PanelResult<()> {
    service.check_session(ctx)?;
    // reviewers and requesters both land on this table
    if ensure_permission(ctx, "review_refunds").is_err() {
        ensure_permission(ctx, "request_refunds")?;
    }
    let scope = panel_scope(ctx)?;
    let (page, per_page) = list_controls(ctx, "refunds_per_page")?;
    let refunds = service.list_refunds(scope)?;
    let open = refunds
        .iter()
        .filter(|refund| refund.status == RefundStatus::Requested)
        .count();
    let mut pager = Pager::with_page_size(refunds, per_page)?;
    SearchFilter::from_request(ctx).apply(&mut pager);
    pager.set_page(page);
    let listing = pager.page();
    ctx.view.set("refund_list", &listing.items);
    ctx.view.set("refund_pages", listing.meta());
    ctx.view.set("refund_open_count", open);
    Ok(())
}

pub fn request_refund<S: PlatformService>(service: &S, ctx: &mut PanelContext) -> PanelResult<()> {
    service.check_session(ctx)?;
    ensure_permission(ctx, "request_refunds")?;
    let agency_id = ctx
        .user_info
        .agency_id
        .ok_or_else(|| PanelError::Validation("no_agency_binding".into()))?;
    let payment_id = ctx
        .form
        .int("payment_id")
        .ok_or_else(|| PanelError::Validation("no_payment".into()))?;
    let amount = ctx.form.float("amount").unwrap_or(0.0);
    let reason = ctx.form.string("reason").unwrap_or_default().trim().to_string();
    let request = RefundRequest {
        payment_id,
        amount,
        reason,
    };
    let refund_id = service.save_refund_request(agency_id, request)?;
    log_panel_action(
        service,
        ctx,
        "refund_requested",
        json!({ "refund_id": refund_id, "payment_id": payment_id }),
    )?;
    ctx.view.set("saved_refund_id", refund_id);
    Ok(())
}

pub fn review_refund<S: PlatformService>(
    service: &S,
    ctx: &mut PanelContext,
    refund_id: i64,
    approve: bool,
) -> PanelResult<()> {
    service.check_session(ctx)?;
    ensure_permission(ctx, "review_refunds")?;
    let refund = service
        .list_refunds(panel_scope(ctx)?)?
        .into_iter()
        .find(|refund| refund.id == refund_id)
        .ok_or_else(|| PanelError::Validation("no_refund".into()))?;
    if refund.status != RefundStatus::Requested {
        return Err(PanelError::Validation("bad_refund_state".into()));
    }
    let next = if approve {
        RefundStatus::Approved
    } else {
        RefundStatus::Rejected
    };
    service.set_refund_status(refund_id, next)?;
    log_panel_action(
        service,
        ctx,
        "refund_reviewed",
        json!({ "refund_id": refund_id, "outcome": next.label() }),
    )
}
