pub mod access;
pub mod agencies;
pub mod audit;
pub mod auth;
pub mod bookings;
pub mod commissions;
pub mod dashboard;
pub mod db;
pub mod endpoints;
pub mod envelope;
pub mod export;
pub mod filters;
pub mod navigation;
pub mod pagination;
pub mod payments;
pub mod promotions;
pub mod refunds;
pub mod scheduled;
pub mod service_items;
pub mod services;
pub mod tours;
