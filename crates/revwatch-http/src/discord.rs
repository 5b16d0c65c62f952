//! `Messenger` over the Discord REST API (v10, bot token auth).
//!
//! A group is a guild and a channel is a guild text channel. Resolution
//! fetches the guild, then the channel, and checks that the channel belongs
//! to that guild. Notifications are posted as a single embed.
//!
//! Guild and channel ids are snowflakes (decimal digits). An id that is not
//! one cannot name a live destination and resolves as gone without a request.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode, Url, header};
use revwatch_core::messaging::{
  DeliveryFailure, Destination, Messenger, Notification, Resolution,
};
use serde::{Deserialize, Serialize};

use crate::{
  endpoint::Endpoint,
  error::{Error, Result},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
  pub token:        String,
  pub api_base:     String,
  pub timeout_secs: u64,
}

impl Default for DiscordConfig {
  fn default() -> Self {
    Self {
      token:        String::new(),
      api_base:     "https://discord.com/api/v10".to_owned(),
      timeout_secs: 30,
    }
  }
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChannelInfo {
  #[serde(default)]
  guild_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct MessagePayload {
  embeds: Vec<Embed>,
}

#[derive(Debug, Serialize)]
struct Embed {
  title:       String,
  description: String,
  author:      EmbedAuthor,
  fields:      Vec<EmbedField>,
  footer:      EmbedFooter,
  timestamp:   String,
}

#[derive(Debug, Serialize)]
struct EmbedAuthor {
  name: String,
}

#[derive(Debug, Serialize)]
struct EmbedField {
  name:   &'static str,
  value:  String,
  inline: bool,
}

#[derive(Debug, Serialize)]
struct EmbedFooter {
  text: String,
}

impl From<&Notification> for Embed {
  fn from(n: &Notification) -> Self {
    let stars = if n.stars.is_empty() { "No stars".to_owned() } else { n.stars.clone() };
    Embed {
      title:       n.title.clone(),
      description: n.body.clone(),
      author:      EmbedAuthor { name: n.author.clone() },
      fields:      vec![EmbedField { name: "Stars", value: stars, inline: false }],
      footer:      EmbedFooter { text: n.footer.clone() },
      timestamp:   n.timestamp.to_rfc3339(),
    }
  }
}

// ─── Client ──────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DiscordMessenger {
  client:   Client,
  endpoint: Endpoint,
  token:    String,
}

impl DiscordMessenger {
  pub fn new(config: &DiscordConfig) -> Result<Self> {
    if config.token.trim().is_empty() {
      return Err(Error::Config("discord token is empty".into()));
    }
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self {
      client,
      endpoint: Endpoint::parse(&config.api_base, "discord api_base")?,
      token: config.token.trim().to_owned(),
    })
  }

  fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    req.header(header::AUTHORIZATION, format!("Bot {}", self.token))
  }

  async fn get(&self, url: Url) -> Result<Response, DeliveryFailure> {
    self
      .authorized(self.client.get(url))
      .send()
      .await
      .map_err(|e| DeliveryFailure::Network(e.to_string()))
  }
}

fn is_snowflake(id: &str) -> bool { !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) }

fn retry_after(resp: &Response) -> Option<Duration> {
  resp
    .headers()
    .get(header::RETRY_AFTER)
    .and_then(|v| v.to_str().ok())
    .and_then(parse_retry_after)
}

fn parse_retry_after(value: &str) -> Option<Duration> {
  value
    .trim()
    .parse::<f64>()
    .ok()
    .filter(|secs| secs.is_finite() && *secs >= 0.0)
    .map(Duration::from_secs_f64)
}

/// Map a non-success response onto a transient failure.
async fn failure(resp: Response) -> DeliveryFailure {
  if resp.status() == StatusCode::TOO_MANY_REQUESTS {
    return DeliveryFailure::RateLimited { retry_after: retry_after(&resp) };
  }
  let status = resp.status().as_u16();
  let message = resp.text().await.unwrap_or_default();
  DeliveryFailure::Rejected { status, message }
}

impl Messenger for DiscordMessenger {
  async fn resolve_destination(
    &self,
    group_id: &str,
    channel_id: &str,
  ) -> Result<Resolution, DeliveryFailure> {
    if !is_snowflake(group_id) {
      return Ok(Resolution::GroupNotFound);
    }
    if !is_snowflake(channel_id) {
      return Ok(Resolution::ChannelNotFound);
    }

    let guild = self.get(self.endpoint.join(["guilds", group_id])).await?;
    match guild.status() {
      // 403: the bot is no longer a member of the guild.
      StatusCode::NOT_FOUND | StatusCode::FORBIDDEN => return Ok(Resolution::GroupNotFound),
      s if s.is_success() => {}
      _ => return Err(failure(guild).await),
    }

    let channel = self.get(self.endpoint.join(["channels", channel_id])).await?;
    match channel.status() {
      StatusCode::NOT_FOUND => Ok(Resolution::ChannelNotFound),
      s if s.is_success() => {
        let info: ChannelInfo = channel
          .json()
          .await
          .map_err(|e| DeliveryFailure::Network(e.to_string()))?;
        if info.guild_id.as_deref() == Some(group_id) {
          Ok(Resolution::Found(Destination {
            group_id:   group_id.to_owned(),
            channel_id: channel_id.to_owned(),
          }))
        } else {
          Ok(Resolution::ChannelNotFound)
        }
      }
      _ => Err(failure(channel).await),
    }
  }

  async fn send(
    &self,
    destination: &Destination,
    notification: &Notification,
  ) -> Result<(), DeliveryFailure> {
    let payload = MessagePayload { embeds: vec![Embed::from(notification)] };
    let url = self
      .endpoint
      .join(["channels", destination.channel_id.as_str(), "messages"]);
    let resp = self
      .authorized(self.client.post(url))
      .json(&payload)
      .send()
      .await
      .map_err(|e| DeliveryFailure::Network(e.to_string()))?;

    if resp.status().is_success() {
      tracing::debug!(channel_id = %destination.channel_id, "discord message posted");
      Ok(())
    } else {
      Err(failure(resp).await)
    }
  }
}
