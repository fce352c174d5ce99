use serde_json::json;

use crate::access::{ensure_permission, panel_scope};
use crate::audit::log_panel_action;
use crate::filters::SearchFilter;
use crate::pagination::Pager;
use crate::services::{PanelContext, PanelResult, PlatformService};

fn csv_field(raw: &str) -> String {
    if raw.contains(',') || raw.contains('"') || raw.contains('\n') {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

// Exports ignore paging and dump every row the active filter lets through.
pub fn export_bookings_csv<S: PlatformService>(
    service: &S,
    ctx: &mut PanelContext,
) -> PanelResult<String> {
    service.check_session(ctx)?;
    ensure_permission(ctx, "export_data")?;
    let scope = panel_scope(ctx)?;
    let bookings = service.list_bookings(scope)?;
    let mut pager = Pager::new(bookings);
    SearchFilter::from_request(ctx).apply(&mut pager);
    let rows = pager.filtered();
    let mut out = String::from("id,tour,customer,seats,total_amount,status,booked_at\n");
    for booking in &rows {
        out.push_str(&format!(
            "{},{},{},{},{:.2},{},{}\n",
            booking.id,
            csv_field(&booking.tour_title),
            csv_field(&booking.customer_name),
            booking.seats,
            booking.total_amount,
            booking.status.label(),
            booking.booked_at.format("%Y-%m-%d %H:%M"),
        ));
    }
    let exported = rows.len();
    ctx.view.set("export_rows", exported);
    log_panel_action(
        service,
        ctx,
        "export_bookings",
        json!({ "rows": exported }),
    )?;
    Ok(out)
}
