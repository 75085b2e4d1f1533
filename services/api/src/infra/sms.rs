//! SMS gateway client.
//!
//! `GET {base_url}?api_id=..&to=..&msg=..&json=1`. The JSON answer carries a top-level
//! `status_code` plus one entry per recipient; `100` means accepted.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context as _, bail};
use reqwest::Client;
use serde::Deserialize;

use crate::domain::repository::SmsSender;
use crate::error::{ApiError, Operation};

const STATUS_OK: i32 = 100;

#[derive(Debug, Deserialize)]
struct SmsEntry {
    status_code: i32,
    #[serde(default)]
    status_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SmsAnswer {
    status_code: i32,
    #[serde(default)]
    status_text: Option<String>,
    #[serde(default)]
    sms: HashMap<String, SmsEntry>,
}

fn check_answer(answer: &SmsAnswer) -> anyhow::Result<()> {
    if answer.status_code != STATUS_OK {
        bail!(
            "gateway status {}: {}",
            answer.status_code,
            answer.status_text.as_deref().unwrap_or("-")
        );
    }
    for (phone, entry) in &answer.sms {
        if entry.status_code != STATUS_OK {
            bail!(
                "gateway status {} for {phone}: {}",
                entry.status_code,
                entry.status_text.as_deref().unwrap_or("-")
            );
        }
    }
    Ok(())
}

#[derive(Clone)]
pub struct HttpSmsGateway {
    pub client: Client,
    pub base_url: String,
    pub api_id: String,
}

impl HttpSmsGateway {
    pub fn new(base_url: String, api_id: String) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            base_url,
            api_id,
        })
    }
}

impl SmsSender for HttpSmsGateway {
    async fn send(&self, phone: &str, message: &str) -> Result<(), ApiError> {
        let result = async {
            let answer: SmsAnswer = self
                .client
                .get(&self.base_url)
                .query(&[
                    ("api_id", self.api_id.as_str()),
                    ("to", phone),
                    ("msg", message),
                    ("json", "1"),
                ])
                .send()
                .await
                .context("sms gateway request")?
                .error_for_status()
                .context("sms gateway http status")?
                .json()
                .await
                .context("sms gateway answer")?;
            check_answer(&answer)
        }
        .await;
        result.map_err(|e| ApiError::Failed(Operation::SmsSend, e))
    }
}
