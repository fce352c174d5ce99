use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use thiserror::Error;

pub type PanelResult<T> = Result<T, PanelError>;

#[derive(Debug, Error)]
pub enum PanelError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("session timeout")]
    SessionTimeout,
    #[error("validation error: {0}")]
    Validation(String),
    #[error("invalid page size: {0}")]
    InvalidPageSize(i64),
    #[error("unexpected response shape: {0}")]
    BadEnvelope(String),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Clone, Debug, Default)]
pub struct DataBag {
    inner: HashMap<String, Value>,
}

impl DataBag {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.get(key)
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: T) {
        self.inner.insert(
            key.to_string(),
            serde_json::to_value(value).unwrap_or(Value::Null),
        );
    }

    pub fn remove(&mut self, key: &str) {
        self.inner.remove(key);
    }

    // Query params arrive as strings, so the readers accept both shapes.
    pub fn bool(&self, key: &str) -> bool {
        self.inner
            .get(key)
            .map(|value| match value {
                Value::Bool(flag) => *flag,
                Value::String(raw) => raw == "true" || raw == "1",
                Value::Number(num) => num.as_i64().unwrap_or(0) != 0,
                _ => false,
            })
            .unwrap_or(false)
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        self.inner.get(key).and_then(|value| match value {
            Value::Number(num) => num.as_i64(),
            Value::String(raw) => raw.trim().parse().ok(),
            _ => None,
        })
    }

    pub fn float(&self, key: &str) -> Option<f64> {
        self.inner.get(key).and_then(|value| match value {
            Value::Number(num) => num.as_f64(),
            Value::String(raw) => raw.trim().parse().ok(),
            _ => None,
        })
    }

    pub fn string(&self, key: &str) -> Option<String> {
        self.inner
            .get(key)
            .and_then(|value| value.as_str().map(|s| s.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }
}

#[derive(Clone, Debug, Default)]
pub struct RequestVars {
    data: DataBag,
}

impl RequestVars {
    pub fn bool(&self, key: &str) -> bool {
        self.data.bool(key)
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        self.data.int(key)
    }

    pub fn float(&self, key: &str) -> Option<f64> {
        self.data.float(key)
    }

    pub fn string(&self, key: &str) -> Option<String> {
        self.data.string(key)
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: T) {
        self.data.set(key, value);
    }

    pub fn remove(&mut self, key: &str) {
        self.data.remove(key);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains(key)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Agency,
}

impl Role {
    pub fn path_prefix(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Agency => "agency",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Role> {
        match prefix {
            "admin" => Some(Role::Admin),
            "agency" => Some(Role::Agency),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct UserInfo {
    pub id: i64,
    pub is_guest: bool,
    pub role: Role,
    pub agency_id: Option<i64>,
    pub permissions: HashSet<String>,
    pub name: String,
    pub email: String,
    pub language: String,
}

impl Default for UserInfo {
    fn default() -> Self {
        Self {
            id: 0,
            is_guest: true,
            role: Role::Agency,
            agency_id: None,
            permissions: HashSet::new(),
            name: String::from("Guest"),
            email: String::new(),
            language: String::from("en_US"),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct PanelContext {
    pub api_base: String,
    pub view: DataBag,
    pub request: RequestVars,
    pub form: RequestVars,
    pub session: DataBag,
    pub settings: DataBag,
    pub user_info: UserInfo,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ListScope {
    All,
    Agency(i64),
}

impl ListScope {
    pub fn includes(&self, agency_id: i64) -> bool {
        match self {
            ListScope::All => true,
            ListScope::Agency(id) => *id == agency_id,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgencyStatus {
    #[default]
    Active,
    Suspended,
}

impl AgencyStatus {
    pub fn label(&self) -> &'static str {
        match self {
            AgencyStatus::Active => "active",
            AgencyStatus::Suspended => "suspended",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TourStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl TourStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TourStatus::Draft => "draft",
            TourStatus::Published => "published",
            TourStatus::Archived => "archived",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn label(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn label(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommissionStatus {
    #[default]
    Pending,
    Settled,
}

impl CommissionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            CommissionStatus::Pending => "pending",
            CommissionStatus::Settled => "settled",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    #[default]
    Requested,
    Approved,
    Rejected,
    Processed,
}

impl RefundStatus {
    pub fn label(&self) -> &'static str {
        match self {
            RefundStatus::Requested => "requested",
            RefundStatus::Approved => "approved",
            RefundStatus::Rejected => "rejected",
            RefundStatus::Processed => "processed",
        }
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct AgencyRecord {
    pub id: i64,
    pub name: String,
    pub contact_email: String,
    pub commission_rate: f64,
    pub status: AgencyStatus,
    pub joined_on: NaiveDate,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct TourRecord {
    pub id: i64,
    pub agency_id: i64,
    pub agency_name: String,
    pub title: String,
    pub destination: String,
    pub category: String,
    pub price: f64,
    pub seats_total: i64,
    pub departure_date: NaiveDate,
    pub status: TourStatus,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct BookingRecord {
    pub id: i64,
    pub tour_id: i64,
    pub tour_title: String,
    pub agency_id: i64,
    pub customer_name: String,
    pub customer_email: String,
    pub seats: i64,
    pub total_amount: f64,
    pub status: BookingStatus,
    pub booked_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct PaymentRecord {
    pub id: i64,
    pub booking_id: i64,
    pub agency_id: i64,
    pub amount: f64,
    pub method: String,
    pub status: PaymentStatus,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct CommissionRecord {
    pub id: i64,
    pub booking_id: i64,
    pub agency_id: i64,
    pub agency_name: String,
    pub rate: f64,
    pub amount: f64,
    pub status: CommissionStatus,
    pub created_on: NaiveDate,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct RefundRecord {
    pub id: i64,
    pub booking_id: i64,
    pub payment_id: i64,
    pub agency_id: i64,
    pub amount: f64,
    pub reason: String,
    pub status: RefundStatus,
    pub requested_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct PromotionRecord {
    pub id: i64,
    pub code: String,
    pub description: String,
    pub discount_percent: i64,
    pub valid_from: NaiveDate,
    pub valid_until: NaiveDate,
    pub active: bool,
    pub tour_id: Option<i64>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ServiceItemRecord {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub price: f64,
    pub active: bool,
    pub agency_id: Option<i64>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ActionLogEntry {
    pub id: i64,
    pub action: String,
    pub actor_id: Option<i64>,
    pub details: Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, Default)]
pub struct TourDraft {
    pub id: Option<i64>,
    pub agency_id: i64,
    pub title: String,
    pub destination: String,
    pub category: String,
    pub price: f64,
    pub seats_total: i64,
    pub departure_date: NaiveDate,
    pub publish: bool,
}

#[derive(Clone, Debug, Default)]
pub struct PromotionDraft {
    pub id: Option<i64>,
    pub code: String,
    pub description: String,
    pub discount_percent: i64,
    pub valid_from: NaiveDate,
    pub valid_until: NaiveDate,
    pub active: bool,
    pub tour_id: Option<i64>,
}

#[derive(Clone, Debug, Default)]
pub struct ServiceItemDraft {
    pub id: Option<i64>,
    pub name: String,
    pub category: String,
    pub price: f64,
    pub active: bool,
    pub agency_id: Option<i64>,
}

#[derive(Clone, Debug, Default)]
pub struct RefundRequest {
    pub payment_id: i64,
    pub amount: f64,
    pub reason: String,
}

pub trait PlatformService {
    fn check_session(&self, ctx: &PanelContext) -> PanelResult<()>;
    fn allowed_to(&self, ctx: &PanelContext, permission: &str) -> bool;

    fn list_agencies(&self) -> PanelResult<Vec<AgencyRecord>>;
    fn get_agency(&self, agency_id: i64) -> PanelResult<Option<AgencyRecord>>;
    fn set_agency_status(&self, agency_id: i64, status: AgencyStatus) -> PanelResult<()>;

    fn list_tours(&self, scope: ListScope) -> PanelResult<Vec<TourRecord>>;
    fn get_tour(&self, tour_id: i64) -> PanelResult<Option<TourRecord>>;
    fn save_tour(&self, draft: TourDraft) -> PanelResult<i64>;
    fn archive_tour(&self, tour_id: i64) -> PanelResult<()>;

    fn list_bookings(&self, scope: ListScope) -> PanelResult<Vec<BookingRecord>>;
    fn get_booking(&self, booking_id: i64) -> PanelResult<Option<BookingRecord>>;
    fn set_booking_status(&self, booking_id: i64, status: BookingStatus) -> PanelResult<()>;

    fn list_payments(&self, scope: ListScope) -> PanelResult<Vec<PaymentRecord>>;
    fn get_payment(&self, payment_id: i64) -> PanelResult<Option<PaymentRecord>>;

    fn list_commissions(&self, scope: ListScope) -> PanelResult<Vec<CommissionRecord>>;
    fn settle_commission(&self, commission_id: i64) -> PanelResult<()>;

    fn list_refunds(&self, scope: ListScope) -> PanelResult<Vec<RefundRecord>>;
    fn save_refund_request(&self, agency_id: i64, request: RefundRequest) -> PanelResult<i64>;
    fn set_refund_status(&self, refund_id: i64, status: RefundStatus) -> PanelResult<()>;

    fn list_promotions(&self) -> PanelResult<Vec<PromotionRecord>>;
    fn save_promotion(&self, draft: PromotionDraft) -> PanelResult<i64>;
    fn set_promotion_active(&self, promotion_id: i64, active: bool) -> PanelResult<()>;
    fn deactivate_expired_promotions(&self, today: NaiveDate) -> PanelResult<usize>;

    fn list_service_items(&self, scope: ListScope) -> PanelResult<Vec<ServiceItemRecord>>;
    fn save_service_item(&self, draft: ServiceItemDraft) -> PanelResult<i64>;
    fn set_service_item_active(&self, item_id: i64, active: bool) -> PanelResult<()>;

    fn log_action(&self, action: &str, actor_id: Option<i64>, details: &Value)
        -> PanelResult<()>;
    fn list_action_logs(&self) -> PanelResult<Vec<ActionLogEntry>>;
}

// Demo and test sessions can pin the reporting date via as_of.
pub fn panel_today(ctx: &PanelContext) -> NaiveDate {
    ctx.request
        .string("as_of")
        .or_else(|| ctx.settings.string("as_of"))
        .and_then(|raw| NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok())
        .unwrap_or_else(|| Utc::now().date_naive())
}

fn sample_ts(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .unwrap_or_default()
}

fn sample_day(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

#[derive(Default)]
struct InMemoryState {
    agencies: HashMap<i64, AgencyRecord>,
    tours: HashMap<i64, TourRecord>,
    next_tour_id: i64,
    bookings: HashMap<i64, BookingRecord>,
    payments: HashMap<i64, PaymentRecord>,
    commissions: HashMap<i64, CommissionRecord>,
    refunds: HashMap<i64, RefundRecord>,
    next_refund_id: i64,
    promotions: HashMap<i64, PromotionRecord>,
    next_promotion_id: i64,
    service_items: HashMap<i64, ServiceItemRecord>,
    next_service_item_id: i64,
    action_logs: Vec<ActionLogEntry>,
    next_action_log_id: i64,
}

#[derive(Clone)]
pub struct InMemoryService {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryService {
    pub fn new_with_sample() -> Self {
        let mut state = InMemoryState::default();
        state.agencies.insert(
            1,
            AgencyRecord {
                id: 1,
                name: "Sunrise Travel".into(),
                contact_email: "ops@sunrise.example".into(),
                commission_rate: 0.12,
                status: AgencyStatus::Active,
                joined_on: sample_day(2023, 3, 10),
            },
        );
        state.agencies.insert(
            2,
            AgencyRecord {
                id: 2,
                name: "Harbor Tours".into(),
                contact_email: "hello@harbor.example".into(),
                commission_rate: 0.10,
                status: AgencyStatus::Active,
                joined_on: sample_day(2023, 7, 22),
            },
        );
        state.agencies.insert(
            3,
            AgencyRecord {
                id: 3,
                name: "Nordwind Reisen".into(),
                contact_email: "kontakt@nordwind.example".into(),
                commission_rate: 0.15,
                status: AgencyStatus::Suspended,
                joined_on: sample_day(2024, 1, 5),
            },
        );
        state.tours.insert(
            1,
            TourRecord {
                id: 1,
                agency_id: 1,
                agency_name: "Sunrise Travel".into(),
                title: "Kyoto Autumn Leaves".into(),
                destination: "Kyoto".into(),
                category: "culture".into(),
                price: 1480.0,
                seats_total: 24,
                departure_date: sample_day(2025, 11, 2),
                status: TourStatus::Published,
            },
        );
        state.tours.insert(
            2,
            TourRecord {
                id: 2,
                agency_id: 1,
                agency_name: "Sunrise Travel".into(),
                title: "Lisbon Food Walk".into(),
                destination: "Lisbon".into(),
                category: "food".into(),
                price: 240.0,
                seats_total: 12,
                departure_date: sample_day(2025, 9, 14),
                status: TourStatus::Published,
            },
        );
        state.tours.insert(
            3,
            TourRecord {
                id: 3,
                agency_id: 2,
                agency_name: "Harbor Tours".into(),
                title: "Patagonia Trek".into(),
                destination: "El Chalten".into(),
                category: "adventure".into(),
                price: 3150.0,
                seats_total: 10,
                departure_date: sample_day(2026, 1, 20),
                status: TourStatus::Published,
            },
        );
        state.tours.insert(
            4,
            TourRecord {
                id: 4,
                agency_id: 2,
                agency_name: "Harbor Tours".into(),
                title: "Venice Lagoon Kayak".into(),
                destination: "Venice".into(),
                category: "adventure".into(),
                price: 180.0,
                seats_total: 8,
                departure_date: sample_day(2025, 8, 30),
                status: TourStatus::Draft,
            },
        );
        state.tours.insert(
            5,
            TourRecord {
                id: 5,
                agency_id: 3,
                agency_name: "Nordwind Reisen".into(),
                title: "Lofoten Midnight Sun".into(),
                destination: "Lofoten".into(),
                category: "nature".into(),
                price: 2190.0,
                seats_total: 16,
                departure_date: sample_day(2026, 6, 5),
                status: TourStatus::Archived,
            },
        );
        state.next_tour_id = 6;
        state.bookings.insert(
            1,
            BookingRecord {
                id: 1,
                tour_id: 1,
                tour_title: "Kyoto Autumn Leaves".into(),
                agency_id: 1,
                customer_name: "Mia Keller".into(),
                customer_email: "mia@example.com".into(),
                seats: 2,
                total_amount: 2960.0,
                status: BookingStatus::Confirmed,
                booked_at: sample_ts(2025, 7, 2, 9, 30),
            },
        );
        state.bookings.insert(
            2,
            BookingRecord {
                id: 2,
                tour_id: 1,
                tour_title: "Kyoto Autumn Leaves".into(),
                agency_id: 1,
                customer_name: "Jon Alvarez".into(),
                customer_email: "jon@example.com".into(),
                seats: 1,
                total_amount: 1480.0,
                status: BookingStatus::Pending,
                booked_at: sample_ts(2025, 7, 18, 14, 5),
            },
        );
        state.bookings.insert(
            3,
            BookingRecord {
                id: 3,
                tour_id: 2,
                tour_title: "Lisbon Food Walk".into(),
                agency_id: 1,
                customer_name: "Ana Duarte".into(),
                customer_email: "ana@example.com".into(),
                seats: 4,
                total_amount: 960.0,
                status: BookingStatus::Completed,
                booked_at: sample_ts(2025, 6, 11, 10, 0),
            },
        );
        state.bookings.insert(
            4,
            BookingRecord {
                id: 4,
                tour_id: 3,
                tour_title: "Patagonia Trek".into(),
                agency_id: 2,
                customer_name: "Sven Larsen".into(),
                customer_email: "sven@example.com".into(),
                seats: 2,
                total_amount: 6300.0,
                status: BookingStatus::Confirmed,
                booked_at: sample_ts(2025, 7, 21, 16, 45),
            },
        );
        state.bookings.insert(
            5,
            BookingRecord {
                id: 5,
                tour_id: 3,
                tour_title: "Patagonia Trek".into(),
                agency_id: 2,
                customer_name: "Rosa Gutierrez".into(),
                customer_email: "rosa@example.com".into(),
                seats: 1,
                total_amount: 3150.0,
                status: BookingStatus::Cancelled,
                booked_at: sample_ts(2025, 5, 30, 8, 15),
            },
        );
        state.bookings.insert(
            6,
            BookingRecord {
                id: 6,
                tour_id: 4,
                tour_title: "Venice Lagoon Kayak".into(),
                agency_id: 2,
                customer_name: "Tom Becker".into(),
                customer_email: "tom@example.com".into(),
                seats: 3,
                total_amount: 540.0,
                status: BookingStatus::Pending,
                booked_at: sample_ts(2025, 7, 25, 11, 20),
            },
        );
        state.payments.insert(
            1,
            PaymentRecord {
                id: 1,
                booking_id: 1,
                agency_id: 1,
                amount: 2960.0,
                method: "card".into(),
                status: PaymentStatus::Paid,
                paid_at: Some(sample_ts(2025, 7, 2, 9, 35)),
            },
        );
        state.payments.insert(
            2,
            PaymentRecord {
                id: 2,
                booking_id: 3,
                agency_id: 1,
                amount: 960.0,
                method: "transfer".into(),
                status: PaymentStatus::Paid,
                paid_at: Some(sample_ts(2025, 6, 11, 10, 12)),
            },
        );
        state.payments.insert(
            3,
            PaymentRecord {
                id: 3,
                booking_id: 4,
                agency_id: 2,
                amount: 6300.0,
                method: "card".into(),
                status: PaymentStatus::Paid,
                paid_at: Some(sample_ts(2025, 7, 21, 17, 0)),
            },
        );
        state.payments.insert(
            4,
            PaymentRecord {
                id: 4,
                booking_id: 2,
                agency_id: 1,
                amount: 1480.0,
                method: "card".into(),
                status: PaymentStatus::Pending,
                paid_at: None,
            },
        );
        state.payments.insert(
            5,
            PaymentRecord {
                id: 5,
                booking_id: 5,
                agency_id: 2,
                amount: 3150.0,
                method: "card".into(),
                status: PaymentStatus::Refunded,
                paid_at: Some(sample_ts(2025, 5, 30, 9, 0)),
            },
        );
        state.commissions.insert(
            1,
            CommissionRecord {
                id: 1,
                booking_id: 1,
                agency_id: 1,
                agency_name: "Sunrise Travel".into(),
                rate: 0.12,
                amount: 355.2,
                status: CommissionStatus::Pending,
                created_on: sample_day(2025, 7, 2),
            },
        );
        state.commissions.insert(
            2,
            CommissionRecord {
                id: 2,
                booking_id: 3,
                agency_id: 1,
                agency_name: "Sunrise Travel".into(),
                rate: 0.12,
                amount: 115.2,
                status: CommissionStatus::Settled,
                created_on: sample_day(2025, 6, 11),
            },
        );
        state.commissions.insert(
            3,
            CommissionRecord {
                id: 3,
                booking_id: 4,
                agency_id: 2,
                agency_name: "Harbor Tours".into(),
                rate: 0.10,
                amount: 630.0,
                status: CommissionStatus::Pending,
                created_on: sample_day(2025, 7, 21),
            },
        );
        state.refunds.insert(
            1,
            RefundRecord {
                id: 1,
                booking_id: 5,
                payment_id: 5,
                agency_id: 2,
                amount: 3150.0,
                reason: "tour cancelled by customer".into(),
                status: RefundStatus::Processed,
                requested_at: sample_ts(2025, 5, 31, 12, 0),
            },
        );
        state.refunds.insert(
            2,
            RefundRecord {
                id: 2,
                booking_id: 1,
                payment_id: 1,
                agency_id: 1,
                amount: 500.0,
                reason: "hotel downgrade".into(),
                status: RefundStatus::Requested,
                requested_at: sample_ts(2025, 7, 20, 10, 30),
            },
        );
        state.next_refund_id = 3;
        state.promotions.insert(
            1,
            PromotionRecord {
                id: 1,
                code: "SUMMER25".into(),
                description: "Summer getaway discount".into(),
                discount_percent: 25,
                valid_from: sample_day(2025, 6, 1),
                valid_until: sample_day(2025, 8, 31),
                active: true,
                tour_id: None,
            },
        );
        state.promotions.insert(
            2,
            PromotionRecord {
                id: 2,
                code: "KYOTO10".into(),
                description: "Kyoto foliage early bird".into(),
                discount_percent: 10,
                valid_from: sample_day(2025, 9, 1),
                valid_until: sample_day(2025, 10, 31),
                active: true,
                tour_id: Some(1),
            },
        );
        // Lapsed window kept active on purpose, the scheduled sweep picks it up.
        state.promotions.insert(
            3,
            PromotionRecord {
                id: 3,
                code: "WINTER15".into(),
                description: "Winter special".into(),
                discount_percent: 15,
                valid_from: sample_day(2024, 12, 1),
                valid_until: sample_day(2025, 2, 28),
                active: true,
                tour_id: None,
            },
        );
        state.next_promotion_id = 4;
        state.service_items.insert(
            1,
            ServiceItemRecord {
                id: 1,
                name: "Airport transfer".into(),
                category: "transport".into(),
                price: 45.0,
                active: true,
                agency_id: None,
            },
        );
        state.service_items.insert(
            2,
            ServiceItemRecord {
                id: 2,
                name: "Travel insurance".into(),
                category: "insurance".into(),
                price: 30.0,
                active: true,
                agency_id: None,
            },
        );
        state.service_items.insert(
            3,
            ServiceItemRecord {
                id: 3,
                name: "Private photographer".into(),
                category: "extras".into(),
                price: 120.0,
                active: true,
                agency_id: Some(1),
            },
        );
        state.service_items.insert(
            4,
            ServiceItemRecord {
                id: 4,
                name: "Drone footage".into(),
                category: "extras".into(),
                price: 150.0,
                active: false,
                agency_id: Some(2),
            },
        );
        state.next_service_item_id = 5;
        state.action_logs = Vec::new();
        state.next_action_log_id = 1;
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }
}

impl Default for InMemoryService {
    fn default() -> Self {
        Self::new_with_sample()
    }
}

impl PlatformService for InMemoryService {
    fn check_session(&self, ctx: &PanelContext) -> PanelResult<()> {
        if ctx.session.bool("force_timeout") {
            Err(PanelError::SessionTimeout)
        } else {
            Ok(())
        }
    }

    fn allowed_to(&self, ctx: &PanelContext, permission: &str) -> bool {
        ctx.user_info.role == Role::Admin || ctx.user_info.permissions.contains(permission)
    }

    fn list_agencies(&self) -> PanelResult<Vec<AgencyRecord>> {
        let state = self.state.lock().unwrap();
        let mut agencies: Vec<AgencyRecord> = state.agencies.values().cloned().collect();
        agencies.sort_by_key(|agency| agency.id);
        Ok(agencies)
    }

    fn get_agency(&self, agency_id: i64) -> PanelResult<Option<AgencyRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state.agencies.get(&agency_id).cloned())
    }

    fn set_agency_status(&self, agency_id: i64, status: AgencyStatus) -> PanelResult<()> {
        let mut state = self.state.lock().unwrap();
        let agency = state
            .agencies
            .get_mut(&agency_id)
            .ok_or_else(|| PanelError::Validation("no_agency".into()))?;
        agency.status = status;
        Ok(())
    }

    fn list_tours(&self, scope: ListScope) -> PanelResult<Vec<TourRecord>> {
        let state = self.state.lock().unwrap();
        let mut tours: Vec<TourRecord> = state
            .tours
            .values()
            .filter(|tour| scope.includes(tour.agency_id))
            .cloned()
            .collect();
        tours.sort_by_key(|tour| tour.id);
        Ok(tours)
    }

    fn get_tour(&self, tour_id: i64) -> PanelResult<Option<TourRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state.tours.get(&tour_id).cloned())
    }

    fn save_tour(&self, draft: TourDraft) -> PanelResult<i64> {
        let mut state = self.state.lock().unwrap();
        let agency_name = state
            .agencies
            .get(&draft.agency_id)
            .map(|agency| agency.name.clone())
            .ok_or_else(|| PanelError::Validation("no_agency".into()))?;
        let status = if draft.publish {
            TourStatus::Published
        } else {
            TourStatus::Draft
        };
        if let Some(id) = draft.id {
            let tour = state
                .tours
                .get_mut(&id)
                .ok_or_else(|| PanelError::Validation("no_tour".into()))?;
            if tour.status == TourStatus::Archived {
                return Err(PanelError::Validation("tour_archived".into()));
            }
            tour.title = draft.title;
            tour.destination = draft.destination;
            tour.category = draft.category;
            tour.price = draft.price;
            tour.seats_total = draft.seats_total;
            tour.departure_date = draft.departure_date;
            tour.status = status;
            Ok(id)
        } else {
            let id = state.next_tour_id;
            state.next_tour_id += 1;
            state.tours.insert(
                id,
                TourRecord {
                    id,
                    agency_id: draft.agency_id,
                    agency_name,
                    title: draft.title,
                    destination: draft.destination,
                    category: draft.category,
                    price: draft.price,
                    seats_total: draft.seats_total,
                    departure_date: draft.departure_date,
                    status,
                },
            );
            Ok(id)
        }
    }

    fn archive_tour(&self, tour_id: i64) -> PanelResult<()> {
        let mut state = self.state.lock().unwrap();
        let tour = state
            .tours
            .get_mut(&tour_id)
            .ok_or_else(|| PanelError::Validation("no_tour".into()))?;
        tour.status = TourStatus::Archived;
        Ok(())
    }

    fn list_bookings(&self, scope: ListScope) -> PanelResult<Vec<BookingRecord>> {
        let state = self.state.lock().unwrap();
        let mut bookings: Vec<BookingRecord> = state
            .bookings
            .values()
            .filter(|booking| scope.includes(booking.agency_id))
            .cloned()
            .collect();
        bookings.sort_by_key(|booking| booking.id);
        Ok(bookings)
    }

    fn get_booking(&self, booking_id: i64) -> PanelResult<Option<BookingRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state.bookings.get(&booking_id).cloned())
    }

    fn set_booking_status(&self, booking_id: i64, status: BookingStatus) -> PanelResult<()> {
        let mut state = self.state.lock().unwrap();
        let booking = state
            .bookings
            .get_mut(&booking_id)
            .ok_or_else(|| PanelError::Validation("no_booking".into()))?;
        booking.status = status;
        Ok(())
    }

    fn list_payments(&self, scope: ListScope) -> PanelResult<Vec<PaymentRecord>> {
        let state = self.state.lock().unwrap();
        let mut payments: Vec<PaymentRecord> = state
            .payments
            .values()
            .filter(|payment| scope.includes(payment.agency_id))
            .cloned()
            .collect();
        payments.sort_by_key(|payment| payment.id);
        Ok(payments)
    }

    fn get_payment(&self, payment_id: i64) -> PanelResult<Option<PaymentRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state.payments.get(&payment_id).cloned())
    }

    fn list_commissions(&self, scope: ListScope) -> PanelResult<Vec<CommissionRecord>> {
        let state = self.state.lock().unwrap();
        let mut commissions: Vec<CommissionRecord> = state
            .commissions
            .values()
            .filter(|commission| scope.includes(commission.agency_id))
            .cloned()
            .collect();
        commissions.sort_by_key(|commission| commission.id);
        Ok(commissions)
    }

    fn settle_commission(&self, commission_id: i64) -> PanelResult<()> {
        let mut state = self.state.lock().unwrap();
        let commission = state
            .commissions
            .get_mut(&commission_id)
            .ok_or_else(|| PanelError::Validation("no_commission".into()))?;
        if commission.status == CommissionStatus::Settled {
            return Err(PanelError::Validation("already_settled".into()));
        }
        commission.status = CommissionStatus::Settled;
        Ok(())
    }

    fn list_refunds(&self, scope: ListScope) -> PanelResult<Vec<RefundRecord>> {
        let state = self.state.lock().unwrap();
        let mut refunds: Vec<RefundRecord> = state
            .refunds
            .values()
            .filter(|refund| scope.includes(refund.agency_id))
            .cloned()
            .collect();
        refunds.sort_by_key(|refund| refund.id);
        Ok(refunds)
    }

    fn save_refund_request(&self, agency_id: i64, request: RefundRequest) -> PanelResult<i64> {
        let mut state = self.state.lock().unwrap();
        let payment = state
            .payments
            .get(&request.payment_id)
            .filter(|payment| payment.agency_id == agency_id)
            .cloned()
            .ok_or_else(|| PanelError::Validation("no_payment".into()))?;
        if payment.status != PaymentStatus::Paid {
            return Err(PanelError::Validation("payment_not_paid".into()));
        }
        if request.amount <= 0.0 || request.amount > payment.amount {
            return Err(PanelError::Validation("bad_refund_amount".into()));
        }
        if request.reason.trim().is_empty() {
            return Err(PanelError::Validation("no_reason".into()));
        }
        let id = state.next_refund_id;
        state.next_refund_id += 1;
        state.refunds.insert(
            id,
            RefundRecord {
                id,
                booking_id: payment.booking_id,
                payment_id: payment.id,
                agency_id,
                amount: request.amount,
                reason: request.reason,
                status: RefundStatus::Requested,
                requested_at: Utc::now(),
            },
        );
        Ok(id)
    }

    fn set_refund_status(&self, refund_id: i64, status: RefundStatus) -> PanelResult<()> {
        let mut state = self.state.lock().unwrap();
        let refund = state
            .refunds
            .get_mut(&refund_id)
            .ok_or_else(|| PanelError::Validation("no_refund".into()))?;
        refund.status = status;
        Ok(())
    }

    fn list_promotions(&self) -> PanelResult<Vec<PromotionRecord>> {
        let state = self.state.lock().unwrap();
        let mut promotions: Vec<PromotionRecord> = state.promotions.values().cloned().collect();
        promotions.sort_by_key(|promotion| promotion.id);
        Ok(promotions)
    }

    fn save_promotion(&self, draft: PromotionDraft) -> PanelResult<i64> {
        let mut state = self.state.lock().unwrap();
        let duplicate = state
            .promotions
            .values()
            .any(|existing| existing.code == draft.code && Some(existing.id) != draft.id);
        if duplicate {
            return Err(PanelError::Validation("duplicate_code".into()));
        }
        if let Some(tour_id) = draft.tour_id {
            if !state.tours.contains_key(&tour_id) {
                return Err(PanelError::Validation("no_tour".into()));
            }
        }
        if let Some(id) = draft.id {
            let promotion = state
                .promotions
                .get_mut(&id)
                .ok_or_else(|| PanelError::Validation("no_promotion".into()))?;
            promotion.code = draft.code;
            promotion.description = draft.description;
            promotion.discount_percent = draft.discount_percent;
            promotion.valid_from = draft.valid_from;
            promotion.valid_until = draft.valid_until;
            promotion.active = draft.active;
            promotion.tour_id = draft.tour_id;
            Ok(id)
        } else {
            let id = state.next_promotion_id;
            state.next_promotion_id += 1;
            state.promotions.insert(
                id,
                PromotionRecord {
                    id,
                    code: draft.code,
                    description: draft.description,
                    discount_percent: draft.discount_percent,
                    valid_from: draft.valid_from,
                    valid_until: draft.valid_until,
                    active: draft.active,
                    tour_id: draft.tour_id,
                },
            );
            Ok(id)
        }
    }

    fn set_promotion_active(&self, promotion_id: i64, active: bool) -> PanelResult<()> {
        let mut state = self.state.lock().unwrap();
        let promotion = state
            .promotions
            .get_mut(&promotion_id)
            .ok_or_else(|| PanelError::Validation("no_promotion".into()))?;
        promotion.active = active;
        Ok(())
    }

    fn deactivate_expired_promotions(&self, today: NaiveDate) -> PanelResult<usize> {
        let mut state = self.state.lock().unwrap();
        let mut swept = 0;
        for promotion in state.promotions.values_mut() {
            if promotion.active && promotion.valid_until < today {
                promotion.active = false;
                swept += 1;
            }
        }
        Ok(swept)
    }

    fn list_service_items(&self, scope: ListScope) -> PanelResult<Vec<ServiceItemRecord>> {
        let state = self.state.lock().unwrap();
        let mut items: Vec<ServiceItemRecord> = state
            .service_items
            .values()
            .filter(|item| item.agency_id.map(|id| scope.includes(id)).unwrap_or(true))
            .cloned()
            .collect();
        items.sort_by_key(|item| item.id);
        Ok(items)
    }

    fn save_service_item(&self, draft: ServiceItemDraft) -> PanelResult<i64> {
        let mut state = self.state.lock().unwrap();
        if let Some(agency_id) = draft.agency_id {
            if !state.agencies.contains_key(&agency_id) {
                return Err(PanelError::Validation("no_agency".into()));
            }
        }
        if let Some(id) = draft.id {
            let item = state
                .service_items
                .get_mut(&id)
                .ok_or_else(|| PanelError::Validation("no_service_item".into()))?;
            item.name = draft.name;
            item.category = draft.category;
            item.price = draft.price;
            item.active = draft.active;
            item.agency_id = draft.agency_id;
            Ok(id)
        } else {
            let id = state.next_service_item_id;
            state.next_service_item_id += 1;
            state.service_items.insert(
                id,
                ServiceItemRecord {
                    id,
                    name: draft.name,
                    category: draft.category,
                    price: draft.price,
                    active: draft.active,
                    agency_id: draft.agency_id,
                },
            );
            Ok(id)
        }
    }

    fn set_service_item_active(&self, item_id: i64, active: bool) -> PanelResult<()> {
        let mut state = self.state.lock().unwrap();
        let item = state
            .service_items
            .get_mut(&item_id)
            .ok_or_else(|| PanelError::Validation("no_service_item".into()))?;
        item.active = active;
        Ok(())
    }

    fn log_action(
        &self,
        action: &str,
        actor_id: Option<i64>,
        details: &Value,
    ) -> PanelResult<()> {
        let mut state = self.state.lock().unwrap();
        let id = state.next_action_log_id;
        state.next_action_log_id += 1;
        state.action_logs.push(ActionLogEntry {
            id,
            action: action.to_string(),
            actor_id,
            details: details.clone(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    fn list_action_logs(&self) -> PanelResult<Vec<ActionLogEntry>> {
        let state = self.state.lock().unwrap();
        Ok(state.action_logs.clone())
    }
}
