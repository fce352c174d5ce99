use chrono::Utc;

use crate::services::{PanelResult, PlatformService};

pub fn run_scheduled_tasks<S: PlatformService>(service: &S) -> PanelResult<()> {
    let swept = service.deactivate_expired_promotions(Utc::now().date_naive())?;
    if swept > 0 {
        service.log_action(
            "expire_promotions",
            None,
            &serde_json::json!({"deactivated": swept}),
        )?;
    }
    Ok(())
}
