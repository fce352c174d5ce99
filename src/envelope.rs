use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::pagination::PageMeta;
use crate::services::{PanelError, PanelResult};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ListPayload<T> {
    pub data: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Value>,
}

impl<T> ListPayload<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self {
            data,
            pagination: None,
            summary: None,
        }
    }

    pub fn with_pagination(mut self, meta: &PageMeta) -> Self {
        self.pagination = serde_json::to_value(meta).ok();
        self
    }

    pub fn with_summary(mut self, summary: Value) -> Self {
        self.summary = Some(summary);
        self
    }
}

// Backend list endpoints answer either {data: [...]} or a bare array.
// Server-side pagination hints are surfaced but never drive the tables,
// paging always happens on the client.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum ListEnvelope<T> {
    Wrapped(ListPayload<T>),
    Bare(Vec<T>),
}

impl<T> ListEnvelope<T> {
    pub fn records(self) -> Vec<T> {
        match self {
            ListEnvelope::Wrapped(payload) => payload.data,
            ListEnvelope::Bare(records) => records,
        }
    }

    pub fn summary(&self) -> Option<&Value> {
        match self {
            ListEnvelope::Wrapped(payload) => payload.summary.as_ref(),
            ListEnvelope::Bare(_) => None,
        }
    }

    pub fn server_pagination(&self) -> Option<&Value> {
        match self {
            ListEnvelope::Wrapped(payload) => payload.pagination.as_ref(),
            ListEnvelope::Bare(_) => None,
        }
    }
}

pub fn parse_list<T: DeserializeOwned>(body: &str) -> PanelResult<ListEnvelope<T>> {
    serde_json::from_str(body).map_err(|err| PanelError::BadEnvelope(err.to_string()))
}

pub fn parse_records<T: DeserializeOwned>(body: &str) -> PanelResult<Vec<T>> {
    parse_list(body).map(ListEnvelope::records)
}
