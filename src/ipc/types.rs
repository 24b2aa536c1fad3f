use serde::Deserialize;

use crate::form::ServiceForm;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub form: Option<ServiceForm>,
}
