use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;

use crate::access::ensure_permission;
use crate::audit::log_panel_action;
use crate::filters::SearchFilter;
use crate::pagination::{list_controls, Pager};
use crate::services::{
    panel_today, PanelContext, PanelError, PanelResult, PlatformService, PromotionDraft,
};

lazy_static! {
    static ref PROMO_CODE: Regex = Regex::new(r"^[A-Z0-9_-]{3,20}$").unwrap();
}

pub fn list_promotions<S: PlatformService>(
    service: &S,
    ctx: &mut PanelContext,
) -> PanelResult<()> {
    service.check_session(ctx)?;
    ensure_permission(ctx, "manage_promotions")?;
    let (page, per_page) = list_controls(ctx, "promotions_per_page")?;
    let today = panel_today(ctx);
    let promotions = service.list_promotions()?;
    let mut pager = Pager::with_page_size(promotions, per_page)?;
    SearchFilter::from_request(ctx).apply(&mut pager);
    pager.set_page(page);
    let listing = pager.page();
    let rows: Vec<_> = listing
        .items
        .iter()
        .map(|promotion| {
            let running = promotion.active
                && promotion.valid_from <= today
                && today <= promotion.valid_until;
            json!({
                "promotion": promotion,
                "running": running,
            })
        })
        .collect();
    ctx.view.set("promotion_list", rows);
    ctx.view.set("promotion_pages", listing.meta());
    Ok(())
}

pub fn save_promotion<S: PlatformService>(service: &S, ctx: &mut PanelContext) -> PanelResult<()> {
    service.check_session(ctx)?;
    ensure_permission(ctx, "manage_promotions")?;
    let code = ctx.form.string("code").unwrap_or_default().trim().to_string();
    if !PROMO_CODE.is_match(&code) {
        return Err(PanelError::Validation("bad_code".into()));
    }
    let discount_percent = ctx.form.int("discount_percent").unwrap_or(0);
    if !(1..=100).contains(&discount_percent) {
        return Err(PanelError::Validation("bad_discount".into()));
    }
    let parse_day = |key: &str| {
        ctx.form
            .string(key)
            .and_then(|raw| NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok())
    };
    let valid_from = parse_day("valid_from")
        .ok_or_else(|| PanelError::Validation("bad_validity_window".into()))?;
    let valid_until = parse_day("valid_until")
        .ok_or_else(|| PanelError::Validation("bad_validity_window".into()))?;
    if valid_from > valid_until {
        return Err(PanelError::Validation("bad_validity_window".into()));
    }
    let draft = PromotionDraft {
        id: ctx.form.int("id"),
        code,
        description: ctx.form.string("description").unwrap_or_default(),
        discount_percent,
        valid_from,
        valid_until,
        active: ctx.form.bool("active"),
        tour_id: ctx.form.int("tour_id"),
    };
    let promotion_id = service.save_promotion(draft)?;
    log_panel_action(
        service,
        ctx,
        "save_promotion",
        json!({ "promotion_id": promotion_id }),
    )?;
    ctx.view.set("saved_promotion_id", promotion_id);
    Ok(())
}

pub fn set_promotion_active<S: PlatformService>(
    service: &S,
    ctx: &mut PanelContext,
    promotion_id: i64,
    active: bool,
) -> PanelResult<()> {
    service.check_session(ctx)?;
    ensure_permission(ctx, "manage_promotions")?;
    service.set_promotion_active(promotion_id, active)?;
    log_panel_action(
        service,
        ctx,
        "promotion_active",
        json!({ "promotion_id": promotion_id, "active": active }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::load_permissions;
    use crate::services::{InMemoryService, Role};

    fn admin_ctx(service: &InMemoryService) -> PanelContext {
        let mut ctx = PanelContext::default();
        ctx.user_info.id = 1;
        ctx.user_info.is_guest = false;
        ctx.user_info.role = Role::Admin;
        load_permissions(service, &mut ctx).unwrap();
        ctx
    }

    fn fill_valid_form(ctx: &mut PanelContext) {
        ctx.form.set("code", "SPRING30");
        ctx.form.set("description", "Spring sale");
        ctx.form.set("discount_percent", 30);
        ctx.form.set("valid_from", "2025-03-01");
        ctx.form.set("valid_until", "2025-04-30");
        ctx.form.set("active", true);
    }

    #[test]
    fn listing_flags_running_promotions() {
        let service = InMemoryService::default();
        let mut ctx = admin_ctx(&service);
        ctx.request.set("as_of", "2025-07-15");
        list_promotions(&service, &mut ctx).unwrap();
        let rows = ctx
            .view
            .get("promotion_list")
            .unwrap()
            .as_array()
            .unwrap()
            .clone();
        assert_eq!(rows.len(), 3);
        // SUMMER25 is inside its window, KYOTO10 not yet, WINTER15 lapsed
        assert_eq!(rows[0]["running"], true);
        assert_eq!(rows[1]["running"], false);
        assert_eq!(rows[2]["running"], false);
    }

    #[test]
    fn codes_must_match_the_pattern() {
        let service = InMemoryService::default();
        let mut ctx = admin_ctx(&service);
        fill_valid_form(&mut ctx);
        for bad in ["ab", "lower25", "WAY_TOO_LONG_FOR_A_PROMO_CODE", "BAD CODE"] {
            ctx.form.set("code", bad);
            assert!(matches!(
                save_promotion(&service, &mut ctx),
                Err(PanelError::Validation(ref key)) if key == "bad_code"
            ));
        }
    }

    #[test]
    fn discounts_stay_between_1_and_100() {
        let service = InMemoryService::default();
        let mut ctx = admin_ctx(&service);
        fill_valid_form(&mut ctx);
        for bad in [0, -10, 101] {
            ctx.form.set("discount_percent", bad);
            assert!(matches!(
                save_promotion(&service, &mut ctx),
                Err(PanelError::Validation(ref key)) if key == "bad_discount"
            ));
        }
    }

    #[test]
    fn the_validity_window_must_be_ordered() {
        let service = InMemoryService::default();
        let mut ctx = admin_ctx(&service);
        fill_valid_form(&mut ctx);
        ctx.form.set("valid_from", "2025-05-01");
        ctx.form.set("valid_until", "2025-04-01");
        assert!(matches!(
            save_promotion(&service, &mut ctx),
            Err(PanelError::Validation(ref key)) if key == "bad_validity_window"
        ));
    }

    #[test]
    fn duplicate_codes_are_rejected() {
        let service = InMemoryService::default();
        let mut ctx = admin_ctx(&service);
        fill_valid_form(&mut ctx);
        ctx.form.set("code", "SUMMER25");
        assert!(matches!(
            save_promotion(&service, &mut ctx),
            Err(PanelError::Validation(ref key)) if key == "duplicate_code"
        ));
    }

    #[test]
    fn a_valid_draft_saves_and_logs() {
        let service = InMemoryService::default();
        let mut ctx = admin_ctx(&service);
        fill_valid_form(&mut ctx);
        save_promotion(&service, &mut ctx).unwrap();
        let id = ctx.view.int("saved_promotion_id").unwrap();
        assert_eq!(id, 4);
        let logs = service.list_action_logs().unwrap();
        assert_eq!(logs.last().unwrap().action, "save_promotion");
    }

    #[test]
    fn toggling_requires_the_permission() {
        let service = InMemoryService::default();
        let mut ctx = PanelContext::default();
        ctx.user_info.id = 20;
        ctx.user_info.is_guest = false;
        ctx.user_info.role = Role::Agency;
        ctx.user_info.agency_id = Some(1);
        load_permissions(&service, &mut ctx).unwrap();
        assert!(matches!(
            set_promotion_active(&service, &mut ctx, 1, false),
            Err(PanelError::PermissionDenied(_))
        ));
    }
}
