use serde_json::json;

use crate::endpoints::{collection_path, Resource};
use crate::services::{PanelContext, PanelResult, PlatformService, Role};

fn menu_entry(role: Role, label: &str, resource: Resource) -> serde_json::Value {
    json!({ "label": label, "path": collection_path(role, resource) })
}

pub fn panel_main<S: PlatformService>(service: &S, ctx: &mut PanelContext) -> PanelResult<()> {
    service.check_session(ctx)?;
    let role = ctx.user_info.role;
    let mut sections = vec![
        json!({
            "title": "Overview",
            "entries": [menu_entry(role, "Dashboard", Resource::Dashboard)],
        }),
        json!({
            "title": "Catalog",
            "entries": [
                menu_entry(role, "Tours", Resource::Tours),
                menu_entry(role, "Extra services", Resource::Services),
            ],
        }),
        json!({
            "title": "Sales",
            "entries": [
                menu_entry(role, "Bookings", Resource::Bookings),
                menu_entry(role, "Refunds", Resource::Refunds),
            ],
        }),
        json!({
            "title": "Finance",
            "entries": [
                menu_entry(role, "Payments", Resource::Payments),
                menu_entry(role, "Commissions", Resource::Commissions),
            ],
        }),
    ];
    if role == Role::Admin {
        sections.push(json!({
            "title": "Platform",
            "entries": [
                menu_entry(role, "Agencies", Resource::Agencies),
                menu_entry(role, "Promotions", Resource::Promotions),
                menu_entry(role, "Audit log", Resource::AuditLog),
            ],
        }));
    }
    ctx.view.set("panel_menu", json!({ "sections": sections }));
    if role == Role::Admin {
        let recent: Vec<_> = service
            .list_action_logs()?
            .into_iter()
            .rev()
            .take(10)
            .collect();
        ctx.view.set("recent_activity", recent);
    }
    Ok(())
}

// Export, modal and print views render without the shell chrome. A format=json
// request short-circuits layout selection entirely.
pub fn prepare_view_context(ctx: &mut PanelContext, view: &str) {
    ctx.view.set("current_view", view);
    let bare_views = ["export", "modal", "print"];
    let mut bare = bare_views.contains(&view);
    bare |= view == "dashboard" && ctx.request.string("widget").as_deref() == Some("cards");
    if ctx.request.string("format").as_deref() == Some("json") {
        ctx.view.set("json_output", true);
        ctx.view.set("bare_layout", true);
        ctx.view.set("layout_sections", Vec::<String>::new());
        return;
    }
    ctx.view.set("json_output", false);
    if bare {
        ctx.view.set("bare_layout", true);
        ctx.view.set("layout_sections", Vec::<String>::new());
    } else {
        ctx.view.set("bare_layout", false);
        if !ctx.view.contains("layout_sections") {
            ctx.view.set("layout_sections", vec!["shell"]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::InMemoryService;

    fn role_ctx(role: Role) -> PanelContext {
        let mut ctx = PanelContext::default();
        ctx.user_info.id = 1;
        ctx.user_info.is_guest = false;
        ctx.user_info.role = role;
        ctx.user_info.agency_id = (role == Role::Agency).then_some(1);
        ctx
    }

    #[test]
    fn admin_menu_includes_the_platform_section() {
        let service = InMemoryService::default();
        let mut ctx = role_ctx(Role::Admin);
        panel_main(&service, &mut ctx).unwrap();
        let menu = ctx.view.get("panel_menu").unwrap();
        let sections = menu["sections"].as_array().unwrap();
        assert_eq!(sections.len(), 5);
        assert_eq!(sections[4]["title"], "Platform");
        assert!(ctx.view.contains("recent_activity"));
    }

    #[test]
    fn agency_menu_stays_inside_its_prefix() {
        let service = InMemoryService::default();
        let mut ctx = role_ctx(Role::Agency);
        panel_main(&service, &mut ctx).unwrap();
        let menu = ctx.view.get("panel_menu").unwrap();
        let rendered = menu.to_string();
        assert!(rendered.contains("/agency/tours"));
        assert!(!rendered.contains("/admin/"));
        assert!(!rendered.contains("agencies"));
        assert!(!ctx.view.contains("recent_activity"));
    }

    #[test]
    fn regular_views_get_the_shell_layout() {
        let mut ctx = PanelContext::default();
        prepare_view_context(&mut ctx, "tours");
        assert_eq!(ctx.view.get("current_view").unwrap(), "tours");
        assert!(!ctx.view.bool("bare_layout"));
        let sections = ctx.view.get("layout_sections").unwrap();
        assert_eq!(sections.as_array().unwrap().len(), 1);
    }

    #[test]
    fn bare_views_drop_the_shell() {
        let mut ctx = PanelContext::default();
        prepare_view_context(&mut ctx, "export");
        assert!(ctx.view.bool("bare_layout"));
        assert!(ctx
            .view
            .get("layout_sections")
            .unwrap()
            .as_array()
            .unwrap()
            .is_empty());
    }

    #[test]
    fn dashboard_widget_mode_is_bare() {
        let mut ctx = PanelContext::default();
        ctx.request.set("widget", "cards");
        prepare_view_context(&mut ctx, "dashboard");
        assert!(ctx.view.bool("bare_layout"));
    }

    #[test]
    fn json_format_short_circuits_layout() {
        let mut ctx = PanelContext::default();
        ctx.request.set("format", "json");
        prepare_view_context(&mut ctx, "bookings");
        assert!(ctx.view.bool("json_output"));
        assert!(ctx.view.bool("bare_layout"));
    }
}
