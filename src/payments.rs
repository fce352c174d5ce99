use serde_json::json;

use crate::access::{ensure_permission, panel_scope};
use crate::filters::SearchFilter;
use crate::pagination::{list_controls, Pager};
use crate::services::{PanelContext, PanelError, PanelResult, PlatformService};

pub fn list_payments<S: PlatformService>(service: &S, ctx: &mut PanelContext) -> PanelResult<()> {
    service.check_session(ctx)?;
    ensure_permission(ctx, "view_payments")?;
    let scope = panel_scope(ctx)?;
    let (page, per_page) = list_controls(ctx, "payments_per_page")?;
    let payments = service.list_payments(scope)?;
    let mut pager = Pager::with_page_size(payments, per_page)?;
    SearchFilter::from_request(ctx).apply(&mut pager);
    pager.set_page(page);
    // totals follow the active filter so the summary matches the table
    let mut totals = json!({
        "paid": 0.0,
        "pending": 0.0,
        "refunded": 0.0,
        "failed": 0.0,
    });
    for payment in pager.filtered() {
        let key = payment.status.label();
        let current = totals[key].as_f64().unwrap_or(0.0);
        totals[key] = json!(current + payment.amount);
    }
    let listing = pager.page();
    ctx.view.set("payment_list", &listing.items);
    ctx.view.set("payment_pages", listing.meta());
    ctx.view.set("payment_totals", totals);
    Ok(())
}

pub fn payment_detail<S: PlatformService>(
    service: &S,
    ctx: &mut PanelContext,
    payment_id: i64,
) -> PanelResult<()> {
    service.check_session(ctx)?;
    ensure_permission(ctx, "view_payments")?;
    let scope = panel_scope(ctx)?;
    let payment = service
        .get_payment(payment_id)?
        .filter(|payment| scope.includes(payment.agency_id))
        .ok_or_else(|| PanelError::Validation("no_payment".into()))?;
    let refunds: Vec<_> = service
        .list_refunds(scope)?
        .into_iter()
        .filter(|refund| refund.payment_id == payment_id)
        .collect();
    ctx.view.set("payment", &payment);
    ctx.view.set("payment_refunds", refunds);
    Ok(())
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
    fn totals_sum_per_status() {
        let service = InMemoryService::default();
        let mut ctx = ctx_for(&service, Role::Admin, None);
        list_payments(&service, &mut ctx).unwrap();
        let totals = ctx.view.get("payment_totals").unwrap().clone();
        assert_eq!(totals["paid"].as_f64().unwrap(), 2960.0 + 960.0 + 6300.0);
        assert_eq!(totals["pending"].as_f64().unwrap(), 1480.0);
        assert_eq!(totals["refunded"].as_f64().unwrap(), 3150.0);
        assert_eq!(totals["failed"].as_f64().unwrap(), 0.0);
    }

    #[test]
    fn totals_track_the_filter() {
        let service = InMemoryService::default();
        let mut ctx = ctx_for(&service, Role::Agency, Some(1));
        ctx.request.set("status", "paid");
        list_payments(&service, &mut ctx).unwrap();
        let totals = ctx.view.get("payment_totals").unwrap().clone();
        assert_eq!(totals["paid"].as_f64().unwrap(), 2960.0 + 960.0);
        assert_eq!(totals["pending"].as_f64().unwrap(), 0.0);
        let meta = ctx.view.get("payment_pages").unwrap();
        assert_eq!(meta["total_items"], 2);
    }

    #[test]
    fn detail_links_back_to_refunds() {
        let service = InMemoryService::default();
        let mut ctx = ctx_for(&service, Role::Agency, Some(1));
        payment_detail(&service, &mut ctx, 1).unwrap();
        let refunds = ctx
            .view
            .get("payment_refunds")
            .unwrap()
            .as_array()
            .unwrap()
            .clone();
        assert_eq!(refunds.len(), 1);
        assert_eq!(refunds[0]["reason"], "hotel downgrade");
        assert!(matches!(
            payment_detail(&service, &mut ctx, 3),
            Err(PanelError::Validation(_))
        ));
    }
}
