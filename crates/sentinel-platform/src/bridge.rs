//! REST client for the messaging transport bridge.
//!
//! The bridge is a sidecar that owns the platform sessions (protocol, keys,
//! reconnect state). Outbound actions are plain JSON calls under
//! `{base_url}/tenants/{tenant}/…`; inbound events are posted back to the
//! gateway's `/api/events/{tenant}`.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument};

use sentinel_core::config::{BridgeConfig, DispatchConfig};
use sentinel_core::types::{ChatId, Identity, MessageId, TenantId};

use crate::client::{PairingProvider, PlatformClient};
use crate::error::{PlatformError, Result};
use crate::types::{
    GroupInfo, MediaKind, OutboundMedia, OutboundText, ParticipantChange, Presence, UploadedMedia,
};

#[derive(Debug, Deserialize)]
struct SentResponse {
    id: MessageId,
}

#[derive(Debug, Deserialize)]
struct InviteResponse {
    link: String,
}

#[derive(Debug, Deserialize)]
struct PairResponse {
    code: String,
}

/// Time budgets for bridge calls.
///
/// Control calls (send, react, kick, ...) get a short whole-request bound.
/// Media uploads carry up to `max_media_bytes` and get their own, longer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub control: Duration,
    pub transfer: Duration,
}

impl Timeouts {
    pub fn from_config(dispatch: &DispatchConfig) -> Self {
        Self {
            control: Duration::from_millis(dispatch.platform_timeout_ms),
            transfer: Duration::from_secs(dispatch.transfer_timeout_secs),
        }
    }

    /// Both budgets set to `timeout`.
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            control: timeout,
            transfer: timeout,
        }
    }
}

/// Build the shared HTTP client. Only connection setup is bounded here;
/// every request sets its own total timeout.
fn http_client(connect_timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .build()
        .map_err(|e| PlatformError::Transport(e.to_string()))
}

/// Map a non-success response to the error taxonomy.
async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let reason = resp.text().await.unwrap_or_default();
    if status == reqwest::StatusCode::FORBIDDEN {
        return Err(PlatformError::Forbidden(reason));
    }
    if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::GONE {
        return Err(PlatformError::NotConnected(reason));
    }
    Err(PlatformError::Rejected {
        status: status.as_u16(),
        reason,
    })
}

/// [`PlatformClient`] backed by the bridge's REST API.
pub struct BridgeClient {
    tenant: TenantId,
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
    timeouts: Timeouts,
}

impl BridgeClient {
    pub fn new(tenant: TenantId, config: &BridgeConfig, timeouts: Timeouts) -> Result<Self> {
        Ok(Self {
            tenant,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            http: http_client(timeouts.control)?,
            timeouts,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/tenants/{}/{}", self.base_url, self.tenant, path)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Authorized control call under `path`, bounded by the control budget.
    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.authorize(
            self.http
                .request(method, self.url(path))
                .timeout(self.timeouts.control),
        )
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<reqwest::Response> {
        let req = self.request(reqwest::Method::POST, path).json(body);
        check(req.send().await?).await
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        Ok(self.post(path, body).await?.json::<R>().await?)
    }

    async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        let req = self.request(reqwest::Method::GET, path);
        Ok(check(req.send().await?).await?.json::<R>().await?)
    }

    fn upload_request(&self, bytes: Vec<u8>, kind: MediaKind) -> reqwest::RequestBuilder {
        let kind = serde_json::to_value(kind)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| "document".to_string());
        self.authorize(
            self.http
                .post(self.url("media/upload"))
                .timeout(self.timeouts.transfer)
                .query(&[("kind", kind)])
                .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                .body(bytes),
        )
    }
}

#[async_trait]
impl PlatformClient for BridgeClient {
    fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    #[instrument(skip(self), fields(tenant = %self.tenant))]
    async fn connect(&self) -> Result<()> {
        self.post("connect", &json!({})).await?;
        debug!("bridge accepted connect");
        Ok(())
    }

    async fn send_text(&self, chat: &ChatId, msg: &OutboundText) -> Result<MessageId> {
        let sent: SentResponse = self
            .post_json("messages", &json!({ "chat": chat, "message": msg }))
            .await?;
        Ok(sent.id)
    }

    #[instrument(skip(self, bytes), fields(tenant = %self.tenant, len = bytes.len()))]
    async fn upload(&self, bytes: Vec<u8>, kind: MediaKind) -> Result<UploadedMedia> {
        let req = self.upload_request(bytes, kind);
        Ok(check(req.send().await?).await?.json::<UploadedMedia>().await?)
    }

    async fn send_media(&self, chat: &ChatId, media: &OutboundMedia) -> Result<MessageId> {
        let sent: SentResponse = self
            .post_json("media", &json!({ "chat": chat, "media": media }))
            .await?;
        Ok(sent.id)
    }

    async fn react(&self, chat: &ChatId, message: &MessageId, emoji: &str) -> Result<()> {
        self.post(
            "reactions",
            &json!({ "chat": chat, "message": message, "emoji": emoji }),
        )
        .await?;
        Ok(())
    }

    async fn revoke(&self, chat: &ChatId, sender: &Identity, message: &MessageId) -> Result<()> {
        self.post(
            "revoke",
            &json!({ "chat": chat, "sender": sender, "message": message }),
        )
        .await?;
        Ok(())
    }

    async fn update_participants(
        &self,
        chat: &ChatId,
        identities: &[Identity],
        change: ParticipantChange,
    ) -> Result<()> {
        self.post(
            "participants",
            &json!({ "chat": chat, "participants": identities, "change": change }),
        )
        .await?;
        Ok(())
    }

    async fn mark_read(&self, chat: &ChatId, sender: &Identity, ids: &[MessageId]) -> Result<()> {
        self.post("read", &json!({ "chat": chat, "sender": sender, "ids": ids }))
            .await?;
        Ok(())
    }

    async fn group_info(&self, chat: &ChatId) -> Result<GroupInfo> {
        self.get_json(&format!("groups/{}", chat)).await
    }

    async fn set_announce(&self, chat: &ChatId, announce: bool) -> Result<()> {
        self.post(
            &format!("groups/{}/announce", chat),
            &json!({ "announce": announce }),
        )
        .await?;
        Ok(())
    }

    async fn invite_link(&self, chat: &ChatId) -> Result<String> {
        let resp: InviteResponse = self.get_json(&format!("groups/{}/invite", chat)).await?;
        Ok(resp.link)
    }

    async fn set_presence(&self, presence: Presence) -> Result<()> {
        self.post("presence", &json!({ "presence": presence })).await?;
        Ok(())
    }
}

/// [`PairingProvider`] that asks the bridge to start a phone-number link.
pub struct BridgePairing {
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
    timeout: Duration,
}

impl BridgePairing {
    pub fn new(config: &BridgeConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            http: http_client(timeout)?,
            timeout,
        })
    }
}

#[async_trait]
impl PairingProvider for BridgePairing {
    #[instrument(skip(self))]
    async fn pair(&self, phone: &str) -> Result<String> {
        let mut req = self
            .http
            .post(format!("{}/pair", self.base_url))
            .timeout(self.timeout)
            .json(&json!({ "number": phone }));
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let resp: PairResponse = check(req.send().await?).await?.json().await?;
        Ok(resp.code)
    }
}
