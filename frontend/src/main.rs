use dioxus::prelude::*;
use reqwasm::http::{Request, RequestCredentials};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use web_sys::wasm_bindgen::JsCast;
use web_sys::HtmlDocument;

fn main() {
    launch(App);
}

// ---------- Types ----------

/// List endpoints answer either `{data: [...], pagination, summary}` or a bare
/// array. The untagged enum copes with both, the tables never care which.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum ListBody<T> {
    Wrapped {
        data: Vec<T>,
        #[serde(default)]
        pagination: Option<serde_json::Value>,
        #[serde(default)]
        summary: Option<serde_json::Value>,
    },
    Bare(Vec<T>),
}

impl<T> ListBody<T> {
    fn summary_field(&self, key: &str) -> Option<serde_json::Value> {
        match self {
            ListBody::Wrapped { summary: Some(summary), .. } => summary.get(key).cloned(),
            _ => None,
        }
    }

    // server paging hints are shown for reference, the tables page locally
    fn server_hint(&self) -> Option<String> {
        match self {
            ListBody::Wrapped { pagination: Some(meta), .. } => meta
                .get("total_items")
                .and_then(|v| v.as_i64())
                .map(|n| format!("服务端提示共 {n} 条")),
            _ => None,
        }
    }

    fn rows(self) -> Vec<T> {
        match self {
            ListBody::Wrapped { data, .. } => data,
            ListBody::Bare(rows) => rows,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
struct TourRow {
    id: i64,
    agency_id: i64,
    agency_name: String,
    title: String,
    destination: String,
    category: String,
    price: f64,
    seats_total: i64,
    departure_date: String,
    status: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
struct BookingRow {
    id: i64,
    tour_id: i64,
    tour_title: String,
    customer_name: String,
    customer_email: String,
    seats: i64,
    total_amount: f64,
    status: String,
    booked_at: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
struct RefundRow {
    id: i64,
    booking_id: i64,
    payment_id: i64,
    amount: f64,
    reason: String,
    status: String,
    requested_at: String,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
struct StatusSlice { status: String, count: i64 }

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
struct TrendPoint { month: String, bookings: i64, revenue: f64 }

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
struct TopTour { tour_id: i64, title: String, seats_sold: i64 }

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
struct LeaderboardRow { agency_id: i64, name: String, revenue: f64, bookings: i64 }

#[derive(Clone, Debug, Default, Deserialize)]
struct DashboardView {
    #[serde(default)]
    cards: serde_json::Value,
    #[serde(default)]
    booking_trend: Vec<TrendPoint>,
    #[serde(default)]
    booking_status_distribution: Vec<StatusSlice>,
    #[serde(default)]
    top_tours: Vec<TopTour>,
    #[serde(default)]
    agency_leaderboard: Option<Vec<LeaderboardRow>>,
    #[serde(default)]
    as_of: Option<String>,
}

#[derive(Deserialize)]
struct ActionResponse { status: String, id: i64 }

#[derive(Serialize)]
struct RefundPayload { payment_id: i64, amount: f64, reason: String }

// ---------- Utilities ----------
fn window() -> Option<web_sys::Window> { web_sys::window() }
fn save_token_to_storage(token: &str) { if let Some(win) = window() { if let Ok(Some(storage)) = win.local_storage() { let _ = storage.set_item("jwt_token", token); } } }
fn load_token_from_storage() -> Option<String> { window().and_then(|win| win.local_storage().ok().flatten()).and_then(|s| s.get_item("jwt_token").ok().flatten()) }
fn set_csrf_cookie(token: &str) { if token.trim().is_empty() { return; } if let Some(win) = window() { if let Some(doc) = win.document() { if let Ok(html) = doc.dyn_into::<HtmlDocument>() { let _ = html.set_cookie(&format!("XSRF-TOKEN={}; Path=/", token)); } } } }

async fn get_json<T: DeserializeOwned>(base: &str, path: &str, token: &str, csrf: &str) -> Result<T, String> {
    let url = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
    let mut req = Request::get(&url);
    if !token.trim().is_empty() { req = req.header("Authorization", &format!("Bearer {}", token)); }
    if !csrf.trim().is_empty() {
        req = req.header("X-CSRF-TOKEN", csrf).header("Cookie", &format!("XSRF-TOKEN={}", csrf)).credentials(RequestCredentials::Include);
    }
    let resp = req.send().await.map_err(|e| format!("网络错误: {e}"))?;
    let status = resp.status();
    let text = resp.text().await.map_err(|e| format!("读取响应失败: {e}"))?;
    if !resp.ok() { return Err(format!("HTTP {status}: {text}")); }
    serde_json::from_str(&text).map_err(|e| format!("解析失败: {e}，原始响应: {text}"))
}

async fn post_json<T: DeserializeOwned, B: Serialize>(base: &str, path: &str, token: &str, csrf: &str, body: &B) -> Result<T, String> {
    let url = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
    let mut req = Request::post(&url);
    if !token.trim().is_empty() { req = req.header("Authorization", &format!("Bearer {}", token)); }
    if !csrf.trim().is_empty() {
        req = req.header("X-CSRF-TOKEN", csrf).header("Cookie", &format!("XSRF-TOKEN={}", csrf)).credentials(RequestCredentials::Include);
    }
    let resp = req.header("Content-Type", "application/json").body(serde_json::to_string(body).unwrap()).send().await.map_err(|e| format!("网络错误: {e}"))?;
    let status = resp.status();
    let text = resp.text().await.map_err(|e| format!("读取响应失败: {e}"))?;
    if !resp.ok() { return Err(format!("HTTP {status}: {text}")); }
    serde_json::from_str(&text).map_err(|e| format!("解析失败: {e}，原始响应: {text}"))
}

// ---------- App ----------
fn App() -> Element {
    // signals
    let mut api_base = use_signal(|| "http://127.0.0.1:3000".to_string());
    let mut token = use_signal(|| load_token_from_storage().unwrap_or_default());
    let mut status = use_signal(|| "等待操作...".to_string());
    let mut csrf_token = use_signal(|| "".to_string());
    let start_path = window().and_then(|win| win.location().pathname().ok()).unwrap_or_else(|| "/".to_string());
    let mut is_admin_page = use_signal(move || !start_path.starts_with("/agency"));

    let mut dashboard = use_signal(DashboardView::default);
    let mut tours = use_signal(Vec::<TourRow>::new);
    let mut tour_query = use_signal(|| "".to_string());
    let mut tour_status = use_signal(|| "".to_string());
    let mut tour_page = use_signal(|| 1usize);
    let mut tour_page_size = use_signal(|| 10usize);
    let tour_hint = use_signal(|| "".to_string());
    let mut bookings = use_signal(Vec::<BookingRow>::new);
    let mut booking_query = use_signal(|| "".to_string());
    let mut booking_status = use_signal(|| "".to_string());
    let mut booking_page = use_signal(|| 1usize);
    let mut booking_page_size = use_signal(|| 10usize);
    let booking_counts = use_signal(Vec::<StatusSlice>::new);
    let refunds = use_signal(Vec::<RefundRow>::new);
    let mut refund_payment_id = use_signal(|| "".to_string());
    let mut refund_amount = use_signal(|| "".to_string());
    let mut refund_reason = use_signal(|| "".to_string());

    // helper to reload tours
    fn load_tours_inner(base: String, jwt: String, csrf: String, panel: &'static str, query: String, filter: String, mut tours_sig: Signal<Vec<TourRow>>, mut hint_sig: Signal<String>, mut page_sig: Signal<usize>, mut status: Signal<String>) -> impl std::future::Future<Output = ()> {
        async move {
            let mut path = format!("/{panel}/tours?per_page=200");
            if !query.is_empty() { path.push_str(&format!("&q={query}")); }
            if !filter.is_empty() { path.push_str(&format!("&status={filter}")); }
            match get_json::<ListBody<TourRow>>(&base, &path, &jwt, &csrf).await {
                Ok(body) => {
                    hint_sig.set(body.server_hint().unwrap_or_default());
                    let rows = body.rows();
                    status.set(format!("已加载 {} 条行程", rows.len()));
                    tours_sig.set(rows);
                    page_sig.set(1);
                }
                Err(err) => status.set(format!("加载行程失败：{err}")),
            }
        }
    }

    // helper to reload bookings
    fn load_bookings_inner(base: String, jwt: String, csrf: String, panel: &'static str, query: String, filter: String, mut bookings_sig: Signal<Vec<BookingRow>>, mut counts_sig: Signal<Vec<StatusSlice>>, mut page_sig: Signal<usize>, mut status: Signal<String>) -> impl std::future::Future<Output = ()> {
        async move {
            let mut path = format!("/{panel}/bookings?per_page=200");
            if !query.is_empty() { path.push_str(&format!("&q={query}")); }
            if !filter.is_empty() { path.push_str(&format!("&status={filter}")); }
            match get_json::<ListBody<BookingRow>>(&base, &path, &jwt, &csrf).await {
                Ok(body) => {
                    let counts = body
                        .summary_field("booking_status_counts")
                        .and_then(|value| serde_json::from_value::<Vec<StatusSlice>>(value).ok())
                        .unwrap_or_default();
                    counts_sig.set(counts);
                    let rows = body.rows();
                    status.set(format!("已加载 {} 条预订", rows.len()));
                    bookings_sig.set(rows);
                    page_sig.set(1);
                }
                Err(err) => status.set(format!("加载预订失败：{err}")),
            }
        }
    }

    // helper to reload refunds
    fn load_refunds_inner(base: String, jwt: String, csrf: String, panel: &'static str, mut refunds_sig: Signal<Vec<RefundRow>>, mut status: Signal<String>) -> impl std::future::Future<Output = ()> {
        async move {
            let path = format!("/{panel}/refunds?per_page=200");
            match get_json::<ListBody<RefundRow>>(&base, &path, &jwt, &csrf).await {
                Ok(body) => {
                    let rows = body.rows();
                    status.set(format!("已加载 {} 条退款", rows.len()));
                    refunds_sig.set(rows);
                }
                Err(err) => status.set(format!("加载退款失败：{err}")),
            }
        }
    }

    let load_dashboard = move || {
        let base = api_base.read().clone();
        let jwt = token.read().clone();
        let csrf = csrf_token.read().clone();
        let panel = if *is_admin_page.read() { "admin" } else { "agency" };
        let mut status = status.clone();
        let mut dashboard = dashboard.clone();
        if jwt.trim().is_empty() { status.set("请先粘贴 JWT".into()); return; }
        spawn(async move {
            status.set("加载看板中...".into());
            match get_json::<DashboardView>(&base, &format!("/{panel}/dashboard"), &jwt, &csrf).await {
                Ok(view) => {
                    dashboard.set(view);
                    status.set("看板加载完成".into());
                }
                Err(err) => status.set(format!("加载看板失败：{err}")),
            }
        });
    };

    let load_tours = move || {
        let base = api_base.read().clone();
        let jwt = token.read().clone();
        let csrf = csrf_token.read().clone();
        let panel = if *is_admin_page.read() { "admin" } else { "agency" };
        let query = tour_query.read().trim().to_string();
        let filter = tour_status.read().clone();
        let mut status = status.clone();
        if jwt.trim().is_empty() { status.set("请先粘贴 JWT".into()); return; }
        status.set("加载行程中...".into());
        spawn(load_tours_inner(base, jwt, csrf, panel, query, filter, tours.clone(), tour_hint.clone(), tour_page.clone(), status.clone()));
    };

    let load_bookings = move || {
        let base = api_base.read().clone();
        let jwt = token.read().clone();
        let csrf = csrf_token.read().clone();
        let panel = if *is_admin_page.read() { "admin" } else { "agency" };
        let query = booking_query.read().trim().to_string();
        let filter = booking_status.read().clone();
        let mut status = status.clone();
        if jwt.trim().is_empty() { status.set("请先粘贴 JWT".into()); return; }
        status.set("加载预订中...".into());
        spawn(load_bookings_inner(base, jwt, csrf, panel, query, filter, bookings.clone(), booking_counts.clone(), booking_page.clone(), status.clone()));
    };

    let load_refunds = move || {
        let base = api_base.read().clone();
        let jwt = token.read().clone();
        let csrf = csrf_token.read().clone();
        let panel = if *is_admin_page.read() { "admin" } else { "agency" };
        let mut status = status.clone();
        if jwt.trim().is_empty() { status.set("请先粘贴 JWT".into()); return; }
        status.set("加载退款中...".into());
        spawn(load_refunds_inner(base, jwt, csrf, panel, refunds.clone(), status.clone()));
    };

    let booking_action = move |booking_id: i64, verb: &'static str| {
        let base = api_base.read().clone();
        let jwt = token.read().clone();
        let csrf = csrf_token.read().clone();
        let panel = if *is_admin_page.read() { "admin" } else { "agency" };
        let query = booking_query.read().trim().to_string();
        let filter = booking_status.read().clone();
        let mut status = status.clone();
        let bookings_sig = bookings.clone();
        let counts_sig = booking_counts.clone();
        let page_sig = booking_page.clone();
        if jwt.trim().is_empty() { status.set("请先粘贴 JWT".into()); return; }
        spawn(async move {
            status.set("更新预订状态中...".into());
            let path = format!("/{panel}/bookings/{booking_id}/{verb}");
            match post_json::<ActionResponse, _>(&base, &path, &jwt, &csrf, &serde_json::json!({})).await {
                Ok(resp) => {
                    status.set(format!("预订 #{} 已更新", resp.id));
                    load_bookings_inner(base, jwt, csrf, panel, query, filter, bookings_sig, counts_sig, page_sig, status.clone()).await;
                }
                Err(err) => status.set(format!("更新失败：{err}")),
            }
        });
    };

    let archive_tour = move |tour_id: i64| {
        let base = api_base.read().clone();
        let jwt = token.read().clone();
        let csrf = csrf_token.read().clone();
        let panel = if *is_admin_page.read() { "admin" } else { "agency" };
        let query = tour_query.read().trim().to_string();
        let filter = tour_status.read().clone();
        let mut status = status.clone();
        let tours_sig = tours.clone();
        let hint_sig = tour_hint.clone();
        let page_sig = tour_page.clone();
        if jwt.trim().is_empty() { status.set("请先粘贴 JWT".into()); return; }
        spawn(async move {
            status.set("归档行程中...".into());
            let path = format!("/{panel}/tours/{tour_id}/archive");
            match post_json::<ActionResponse, _>(&base, &path, &jwt, &csrf, &serde_json::json!({})).await {
                Ok(resp) => {
                    status.set(format!("行程 #{} 已归档", resp.id));
                    load_tours_inner(base, jwt, csrf, panel, query, filter, tours_sig, hint_sig, page_sig, status.clone()).await;
                }
                Err(err) => status.set(format!("归档失败：{err}")),
            }
        });
    };

    let submit_refund = move || {
        let base = api_base.read().clone();
        let jwt = token.read().clone();
        let csrf = csrf_token.read().clone();
        let panel = if *is_admin_page.read() { "admin" } else { "agency" };
        let payment_id = refund_payment_id.read().trim().parse::<i64>().unwrap_or(0);
        let amount = refund_amount.read().trim().parse::<f64>().unwrap_or(0.0);
        let reason = refund_reason.read().trim().to_string();
        let mut status = status.clone();
        let refunds_sig = refunds.clone();
        if jwt.trim().is_empty() { status.set("请先粘贴 JWT".into()); return; }
        if payment_id <= 0 || amount <= 0.0 { status.set("请输入有效的支付 ID 与金额".into()); return; }
        if reason.is_empty() { status.set("请填写退款原因".into()); return; }
        spawn(async move {
            status.set("提交退款申请中...".into());
            let payload = RefundPayload { payment_id, amount, reason: reason.clone() };
            match post_json::<ActionResponse, _>(&base, &format!("/{panel}/refunds"), &jwt, &csrf, &payload).await {
                Ok(resp) => {
                    status.set(format!("退款申请 #{} 已提交", resp.id));
                    load_refunds_inner(base, jwt, csrf, panel, refunds_sig, status.clone()).await;
                }
                Err(err) => status.set(format!("提交失败：{err}")),
            }
        });
    };

    let review_refund = move |refund_id: i64, approve: bool| {
        let base = api_base.read().clone();
        let jwt = token.read().clone();
        let csrf = csrf_token.read().clone();
        let panel = if *is_admin_page.read() { "admin" } else { "agency" };
        let mut status = status.clone();
        let refunds_sig = refunds.clone();
        if jwt.trim().is_empty() { status.set("请先粘贴 JWT".into()); return; }
        spawn(async move {
            status.set("处理退款中...".into());
            let verb = if approve { "approve" } else { "reject" };
            let path = format!("/{panel}/refunds/{refund_id}/{verb}");
            match post_json::<ActionResponse, _>(&base, &path, &jwt, &csrf, &serde_json::json!({})).await {
                Ok(resp) => {
                    status.set(format!("退款 #{} 已处理", resp.id));
                    load_refunds_inner(base, jwt, csrf, panel, refunds_sig, status.clone()).await;
                }
                Err(err) => status.set(format!("处理失败：{err}")),
            }
        });
    };

    let is_admin = *is_admin_page.read();

    // dashboard projections
    let dash_cards = dashboard.read().cards.clone();
    let card_published = dash_cards["published_tours"].as_i64().unwrap_or(0);
    let card_bookings = dash_cards["monthly_bookings"].as_i64().unwrap_or(0);
    let card_revenue = format!("{:.2}", dash_cards["monthly_revenue"].as_f64().unwrap_or(0.0));
    let card_refunds = dash_cards["open_refunds"].as_i64().unwrap_or(0);
    let card_commission = format!("{:.2}", dash_cards["outstanding_commission"].as_f64().unwrap_or(0.0));
    let as_of = dashboard.read().as_of.clone().unwrap_or_else(|| "未加载".to_string());
    let max_slice = dashboard.read().booking_status_distribution.iter().map(|s| s.count).max().unwrap_or(0).max(1);
    let dist_rows: Vec<(String, String, String)> = dashboard
        .read()
        .booking_status_distribution
        .iter()
        .map(|s| (s.status.clone(), format!("{} 单", s.count), format!("width: {}%", s.count * 100 / max_slice)))
        .collect();
    let trend_rows: Vec<(String, String)> = dashboard
        .read()
        .booking_trend
        .iter()
        .map(|p| (p.month.clone(), format!("{} 单 · ¥{:.2}", p.bookings, p.revenue)))
        .collect();
    let top_rows: Vec<(String, String)> = dashboard
        .read()
        .top_tours
        .iter()
        .map(|t| (t.title.clone(), format!("售出 {} 座", t.seats_sold)))
        .collect();
    let leader_rows: Vec<(String, String)> = dashboard
        .read()
        .agency_leaderboard
        .clone()
        .unwrap_or_default()
        .iter()
        .map(|a| (a.name.clone(), format!("营收 ¥{:.2} · {} 单", a.revenue, a.bookings)))
        .collect();

    // local paging, mirrors the panel's client-side pager
    let tour_size = (*tour_page_size.read()).max(1);
    let tour_total = tours.read().len();
    let tour_pages = ((tour_total + tour_size - 1) / tour_size).max(1);
    let tour_current = (*tour_page.read()).min(tour_pages);
    let tour_meta = format!("第 {}/{} 页 · 共 {} 条", tour_current, tour_pages, tour_total);
    let tours_visible: Vec<TourRow> = tours.read().iter().skip((tour_current - 1) * tour_size).take(tour_size).cloned().collect();

    let booking_size = (*booking_page_size.read()).max(1);
    let booking_total = bookings.read().len();
    let booking_pages = ((booking_total + booking_size - 1) / booking_size).max(1);
    let booking_current = (*booking_page.read()).min(booking_pages);
    let booking_meta = format!("第 {}/{} 页 · 共 {} 条", booking_current, booking_pages, booking_total);
    let bookings_visible: Vec<BookingRow> = bookings.read().iter().skip((booking_current - 1) * booking_size).take(booking_size).cloned().collect();

    let chip_rows: Vec<String> = booking_counts.read().iter().map(|c| format!("{} {}", c.status, c.count)).collect();
    let refund_rows: Vec<RefundRow> = refunds.read().clone();

    rsx! {
        style { {STYLE} }
        div { class: "app-shell",
            nav { class: "top-nav",
                div { class: "brand",
                    span { class: "brand__dot" }
                    span { "Tour Ops" }
                    span { class: "brand__tag", "panel" }
                }
                div { class: "nav-links",
                    a { class: if is_admin { "nav-link active" } else { "nav-link" }, href: "/admin", onclick: move |_| { is_admin_page.set(true); }, "管理端" }
                    a { class: if !is_admin { "nav-link active" } else { "nav-link" }, href: "/agency", onclick: move |_| { is_admin_page.set(false); }, "机构端" }
                }
            }

            div { class: "status-bar", "状态：{status.read()}" }

            section { class: if is_admin { "hero hero--admin" } else { "hero" },
                div { class: "hero__copy",
                    span { class: "pill", "Tour Booking · Ops" }
                    h1 { { if is_admin { "平台运营总览" } else { "机构自助面板" } } }
                    p { "行程、预订、佣金与退款全部在这里自测，数据按令牌角色过滤。" }
                    div { class: "hero__actions",
                        button { onclick: move |_| load_dashboard(), "加载看板" }
                        button { onclick: move |_| { load_tours(); load_bookings(); load_refunds(); }, "加载全部列表" }
                    }
                }
                div { class: "hero__panel",
                    div { class: "stat", span { "当前 API" } strong { "{api_base.read()}" } }
                    div { class: "stat-row",
                        div { class: "stat-box", strong { "{tours.read().len()}" } span { "行程" } }
                        div { class: "stat-box", strong { "{bookings.read().len()}" } span { "预订" } }
                        div { class: "stat-box", strong { "{refunds.read().len()}" } span { "退款" } }
                    }
                }
            }

            section { class: "panel",
                h2 { "连接配置" }
                div { class: "grid two",
                    div {
                        label { "API 基址" }
                        input { value: "{api_base.read()}", oninput: move |evt| api_base.set(evt.value()) }
                        div { class: "actions",
                            button { onclick: move |_| status.set("已更新 API 基址".into()), "更新" }
                            button { onclick: move |_| load_dashboard(), "测试连接" }
                        }
                    }
                    div {
                        label { "JWT Token" }
                        textarea { value: "{token.read()}", rows: "3", oninput: move |evt| { token.set(evt.value()); save_token_to_storage(&evt.value()); } }
                        div { class: "actions",
                            button { onclick: move |_| { token.set("".into()); save_token_to_storage(""); status.set("已清空本地 token".into()); }, "清空 Token" }
                            button { onclick: move |_| { let csrf = format!("csrf-{}", js_sys::Date::now() as i64); csrf_token.set(csrf.clone()); set_csrf_cookie(&csrf); status.set("已刷新 CSRF".into()); }, "生成 CSRF" }
                        }
                        p { class: "muted", "令牌由平台身份服务签发，角色需与所选面板一致。" }
                    }
                }
            }

            section { class: "panel",
                h2 { "运营看板" }
                div { class: "actions",
                    button { onclick: move |_| load_dashboard(), "刷新看板" }
                    span { class: "muted", "统计基准日：{as_of}" }
                }
                div { class: "stat-row",
                    div { class: "stat-box", strong { "{card_published}" } span { "在售行程" } }
                    div { class: "stat-box", strong { "{card_bookings}" } span { "本月预订" } }
                    div { class: "stat-box", strong { "¥{card_revenue}" } span { "本月营收" } }
                    div { class: "stat-box", strong { "{card_refunds}" } span { "待审退款" } }
                    div { class: "stat-box", strong { "¥{card_commission}" } span { "未结佣金" } }
                }
                div { class: "grid two",
                    div {
                        h4 { "预订状态分布" }
                        ul { class: "list",
                            { dist_rows.iter().cloned().map(|(name, count, width)| rsx! {
                                li { class: "item",
                                    strong { "{name}" }
                                    div { class: "meta", "{count}" }
                                    div { class: "bar", div { class: "bar__fill", style: "{width}" } }
                                }
                            })}
                        }
                    }
                    div {
                        h4 { "近六月趋势" }
                        ul { class: "list",
                            { trend_rows.iter().cloned().map(|(month, line)| rsx! {
                                li { class: "item",
                                    strong { "{month}" }
                                    div { class: "meta", "{line}" }
                                }
                            })}
                        }
                    }
                }
                div { class: "grid two",
                    div {
                        h4 { "热门行程" }
                        ul { class: "list",
                            { top_rows.iter().cloned().map(|(title, line)| rsx! {
                                li { class: "item",
                                    strong { "{title}" }
                                    div { class: "meta", "{line}" }
                                }
                            })}
                        }
                    }
                    { if is_admin { rsx! {
                        div {
                            h4 { "机构排行" }
                            ul { class: "list",
                                { leader_rows.iter().cloned().map(|(name, line)| rsx! {
                                    li { class: "item",
                                        strong { "{name}" }
                                        div { class: "meta", "{line}" }
                                    }
                                })}
                            }
                        }
                    } } else { rsx! {
                        div {
                            h4 { "我的机构" }
                            p { class: "muted", "看板数据已按当前机构过滤，排行榜仅对平台管理员开放。" }
                        }
                    } } }
                }
            }

            section { class: "panel grid two",
                div {
                    h3 { "行程列表" }
                    label { "搜索（标题 / 目的地 / 类目）" }
                    input { value: "{tour_query.read()}", oninput: move |evt| { tour_query.set(evt.value()); tour_page.set(1); }, placeholder: "例如 kyoto" }
                    label { "状态" }
                    select { value: "{tour_status.read()}", oninput: move |evt| { tour_status.set(evt.value()); tour_page.set(1); },
                        option { value: "", "全部状态" }
                        option { value: "draft", "草稿" }
                        option { value: "published", "在售" }
                        option { value: "archived", "已归档" }
                    }
                    div { class: "actions",
                        button { onclick: move |_| load_tours(), "加载行程" }
                        select { value: "{tour_page_size.read()}", oninput: move |evt| { tour_page_size.set(evt.value().parse::<usize>().unwrap_or(10).max(1)); tour_page.set(1); },
                            option { value: "5", "每页 5" }
                            option { value: "10", "每页 10" }
                            option { value: "20", "每页 20" }
                        }
                    }
                    div { class: "actions",
                        button { class: "ghost-btn", onclick: move |_| { let current = *tour_page.read(); if current > 1 { tour_page.set(current - 1); } }, "上一页" }
                        span { class: "muted", "{tour_meta}" }
                        button { class: "ghost-btn", onclick: move |_| {
                            let size = (*tour_page_size.read()).max(1);
                            let pages = ((tours.read().len() + size - 1) / size).max(1);
                            let current = *tour_page.read();
                            if current < pages { tour_page.set(current + 1); }
                        }, "下一页" }
                    }
                    { if tour_hint.read().is_empty() { rsx! { span {} } } else { rsx! { p { class: "muted", "{tour_hint.read()}" } } } }
                    ul { class: "list",
                        { tours_visible.iter().cloned().map(|t| {
                            let price = format!("{:.2}", t.price);
                            let archived = t.status == "archived";
                            rsx! {
                                li { class: "item",
                                    strong { "{t.title}" }
                                    div { class: "meta", "{t.destination} · {t.category} · 出发 {t.departure_date} · ¥{price} · {t.seats_total} 座" }
                                    div { class: "meta",
                                        span { class: "pill", "{t.status}" }
                                        span { class: "muted", " {t.agency_name}" }
                                    }
                                    div { class: "actions",
                                        button { class: "ghost-btn", disabled: archived, onclick: move |_| archive_tour(t.id), "归档" }
                                    }
                                }
                            }
                        })}
                    }
                }
                div {
                    h3 { "预订列表" }
                    div { class: "actions",
                        { chip_rows.iter().cloned().map(|chip| rsx! { span { class: "pill", "{chip}" } }) }
                    }
                    label { "搜索（行程 / 客户）" }
                    input { value: "{booking_query.read()}", oninput: move |evt| { booking_query.set(evt.value()); booking_page.set(1); }, placeholder: "例如 keller" }
                    label { "状态" }
                    select { value: "{booking_status.read()}", oninput: move |evt| { booking_status.set(evt.value()); booking_page.set(1); },
                        option { value: "", "全部状态" }
                        option { value: "pending", "待确认" }
                        option { value: "confirmed", "已确认" }
                        option { value: "completed", "已完成" }
                        option { value: "cancelled", "已取消" }
                    }
                    div { class: "actions",
                        button { onclick: move |_| load_bookings(), "加载预订" }
                        select { value: "{booking_page_size.read()}", oninput: move |evt| { booking_page_size.set(evt.value().parse::<usize>().unwrap_or(10).max(1)); booking_page.set(1); },
                            option { value: "5", "每页 5" }
                            option { value: "10", "每页 10" }
                            option { value: "20", "每页 20" }
                        }
                    }
                    div { class: "actions",
                        button { class: "ghost-btn", onclick: move |_| { let current = *booking_page.read(); if current > 1 { booking_page.set(current - 1); } }, "上一页" }
                        span { class: "muted", "{booking_meta}" }
                        button { class: "ghost-btn", onclick: move |_| {
                            let size = (*booking_page_size.read()).max(1);
                            let pages = ((bookings.read().len() + size - 1) / size).max(1);
                            let current = *booking_page.read();
                            if current < pages { booking_page.set(current + 1); }
                        }, "下一页" }
                    }
                    ul { class: "list",
                        { bookings_visible.iter().cloned().map(|b| {
                            let amount = format!("{:.2}", b.total_amount);
                            let booked = b.booked_at.replace('T', " ").chars().take(16).collect::<String>();
                            let can_confirm = b.status == "pending";
                            let can_complete = b.status == "confirmed";
                            let can_cancel = b.status == "pending" || b.status == "confirmed";
                            rsx! {
                                li { class: "item",
                                    strong { "{b.tour_title} · {b.customer_name}" }
                                    div { class: "meta", "{b.seats} 座 · ¥{amount} · 下单 {booked}" }
                                    div { class: "meta",
                                        span { class: "pill", "{b.status}" }
                                        span { class: "muted", " {b.customer_email}" }
                                    }
                                    div { class: "actions",
                                        button { disabled: !can_confirm, onclick: move |_| booking_action(b.id, "confirm"), "确认" }
                                        button { disabled: !can_complete, onclick: move |_| booking_action(b.id, "complete"), "完成" }
                                        button { class: "ghost-btn", disabled: !can_cancel, onclick: move |_| booking_action(b.id, "cancel"), "取消" }
                                    }
                                }
                            }
                        })}
                    }
                }
            }

            section { class: "panel",
                h3 { "退款" }
                div { class: "actions",
                    button { onclick: move |_| load_refunds(), "加载退款" }
                }
                { if is_admin { rsx! {
                    p { class: "muted", "管理员可批准或驳回状态为 requested 的申请。" }
                } } else { rsx! {
                    div { class: "card-ghost",
                        h4 { "提交退款申请" }
                        label { "支付 ID" }
                        input { value: "{refund_payment_id.read()}", oninput: move |evt| refund_payment_id.set(evt.value()), placeholder: "例如 2" }
                        label { "金额" }
                        input { value: "{refund_amount.read()}", oninput: move |evt| refund_amount.set(evt.value()), placeholder: "不超过原支付金额" }
                        label { "原因" }
                        input { value: "{refund_reason.read()}", oninput: move |evt| refund_reason.set(evt.value()), placeholder: "退款原因" }
                        div { class: "actions", button { onclick: move |_| submit_refund(), "提交申请" } }
                    }
                } } }
                ul { class: "list",
                    { refund_rows.iter().cloned().map(|r| {
                        let amount = format!("{:.2}", r.amount);
                        let requested = r.requested_at.replace('T', " ").chars().take(16).collect::<String>();
                        let open = r.status == "requested";
                        rsx! {
                            li { class: "item",
                                strong { "退款 #{r.id} · ¥{amount}" }
                                div { class: "meta", "预订 {r.booking_id} · 支付 {r.payment_id} · 申请于 {requested}" }
                                div { class: "meta",
                                    span { class: "pill", "{r.status}" }
                                    span { class: "muted", " {r.reason}" }
                                }
                                { if is_admin { rsx! {
                                    div { class: "actions",
                                        button { disabled: !open, onclick: move |_| review_refund(r.id, true), "批准" }
                                        button { class: "ghost-btn", disabled: !open, onclick: move |_| review_refund(r.id, false), "驳回" }
                                    }
                                } } else { rsx! { span {} } } }
                            }
                        }
                    })}
                }
            }
        }
    }
}

const STYLE: &str = r#"
:root { --bg: #0b1117; --panel: #121a23; --border: #1f2b38; --muted: #8aa0b4; --text: #e8f0f6; --accent: #2dd4bf; --accent2: #60a5fa; }
* { box-sizing: border-box; }
body { margin: 0; font-family: "Segoe UI", "PingFang SC", sans-serif; background: radial-gradient(circle at 20% -10%, #16222e, var(--bg)); color: var(--text); }
.app-shell { max-width: 1180px; margin: 0 auto; padding: 16px 16px 40px; display: flex; flex-direction: column; gap: 14px; }
.top-nav { position: sticky; top: 0; z-index: 10; display: flex; align-items: center; justify-content: space-between; padding: 10px 14px; border: 1px solid var(--border); background: rgba(11,17,23,0.92); backdrop-filter: blur(8px); border-radius: 12px; }
.brand { display: flex; align-items: center; gap: 8px; font-weight: 700; }
.brand__dot { width: 10px; height: 10px; border-radius: 50%; background: var(--accent); box-shadow: 0 0 12px var(--accent); }
.brand__tag { font-size: 12px; color: var(--muted); border: 1px solid var(--border); padding: 2px 8px; border-radius: 999px; }
.nav-links { display: flex; gap: 8px; }
.nav-link { color: var(--muted); text-decoration: none; padding: 6px 12px; border-radius: 10px; border: 1px solid transparent; }
.nav-link.active { color: var(--text); border-color: var(--border); background: #18232e; }
.status-bar { padding: 8px 14px; border: 1px dashed var(--border); border-radius: 10px; color: var(--muted); font-size: 14px; }
.hero { display: grid; grid-template-columns: 1.2fr 1fr; gap: 14px; padding: 18px; border: 1px solid var(--border); border-radius: 14px; background: linear-gradient(140deg, #14202b, #0e1820); }
.hero--admin { border-color: #2b4255; }
.hero h1 { margin: 8px 0; font-size: 26px; }
.hero p { color: var(--muted); margin: 0 0 12px; }
.hero__actions { display: flex; gap: 8px; flex-wrap: wrap; }
.hero__panel { display: flex; flex-direction: column; gap: 10px; }
.stat { display: flex; flex-direction: column; gap: 4px; padding: 10px 12px; border: 1px solid var(--border); border-radius: 10px; }
.stat span { color: var(--muted); font-size: 12px; }
.stat-row { display: flex; gap: 10px; margin-top: 10px; }
.stat-box { flex: 1; text-align: center; padding: 10px; border: 1px solid var(--border); border-radius: 10px; background: #101a24; }
.stat-box strong { display: block; font-size: 20px; color: var(--accent); }
.stat-box span { font-size: 12px; color: var(--muted); }
.panel { padding: 16px; border: 1px solid var(--border); border-radius: 14px; background: var(--panel); }
.panel h2, .panel h3 { margin-top: 0; }
.grid.two { display: grid; grid-template-columns: 1fr 1fr; gap: 14px; }
label { display: block; margin: 8px 0 4px; color: var(--muted); font-size: 13px; }
input, textarea, select { width: 100%; padding: 8px 10px; border-radius: 8px; border: 1px solid var(--border); background: #0d151d; color: var(--text); }
button { padding: 8px 14px; border-radius: 8px; border: 1px solid var(--border); background: linear-gradient(135deg, var(--accent), #1ca893); color: #04211c; font-weight: 600; cursor: pointer; }
button:disabled { opacity: 0.35; cursor: not-allowed; }
.ghost-btn { background: transparent; color: var(--text); border: 1px solid var(--border); text-decoration: none; padding: 8px 14px; border-radius: 8px; }
.actions { display: flex; gap: 8px; margin-top: 10px; flex-wrap: wrap; align-items: center; }
.list { list-style: none; margin: 10px 0 0; padding: 0; display: flex; flex-direction: column; gap: 8px; max-height: 420px; overflow-y: auto; }
.item { padding: 10px 12px; border: 1px solid var(--border); border-radius: 10px; background: #0f1822; }
.item .meta { color: var(--muted); font-size: 13px; margin-top: 4px; }
.pill { display: inline-block; padding: 2px 10px; border-radius: 999px; border: 1px solid var(--border); color: var(--accent2); font-size: 12px; }
.muted { color: var(--muted); font-size: 13px; }
.card-ghost { border: 1px dashed var(--border); border-radius: 10px; padding: 12px; margin-top: 10px; }
.bar { height: 8px; border-radius: 999px; background: #0d151d; border: 1px solid var(--border); overflow: hidden; margin-top: 6px; }
.bar__fill { height: 100%; background: linear-gradient(90deg, var(--accent), var(--accent2)); }
@media (max-width: 720px) { .hero { grid-template-columns: 1fr; } .grid.two { grid-template-columns: 1fr; } .stat-row { flex-wrap: wrap; } }
"#;
