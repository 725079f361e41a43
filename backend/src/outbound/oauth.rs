//! Reqwest-backed OAuth identity gateway adapters.
//!
//! Each adapter owns the transport details of one provider: the
//! authorisation-code exchange, the profile fetch with the resulting bearer
//! token, and the mapping of HTTP failures onto [`GatewayError`]. Access
//! tokens live only for the duration of one `exchange_code` call.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::domain::ports::{DiscordGateway, DiscordProfile, GatewayError, OsuGateway, OsuProfile};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

const OSU_TOKEN_URL: &str = "https://osu.ppy.sh/oauth/token";
const OSU_ME_URL: &str = "https://osu.ppy.sh/api/v2/me/osu";

const DISCORD_TOKEN_URL: &str = "https://discord.com/api/oauth2/token";
const DISCORD_ME_URL: &str = "https://discord.com/api/users/@me";

/// Credentials registered with a provider for the authorisation-code flow.
#[derive(Clone)]
pub struct OAuthClientConfig {
    /// Application id issued by the provider.
    pub client_id: String,
    /// Application secret issued by the provider.
    pub client_secret: String,
    /// Redirect URI the code was issued against.
    pub redirect_uri: String,
}

impl fmt::Debug for OAuthClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthClientConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"..")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponseDto {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct OsuMeDto {
    id: i64,
    username: String,
    avatar_url: String,
    #[serde(default)]
    statistics: OsuStatisticsDto,
    #[serde(default)]
    badges: Vec<OsuBadgeDto>,
}

#[derive(Debug, Default, Deserialize)]
struct OsuStatisticsDto {
    global_rank: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OsuBadgeDto {
    description: String,
}

#[derive(Debug, Deserialize)]
struct DiscordMeDto {
    id: String,
    username: String,
    discriminator: String,
    avatar: Option<String>,
}

fn map_transport_error(error: reqwest::Error) -> GatewayError {
    GatewayError::unavailable(error.to_string())
}

fn map_status_error(status: StatusCode) -> GatewayError {
    if status.is_client_error() {
        GatewayError::denied(format!("provider answered status {}", status.as_u16()))
    } else {
        GatewayError::unavailable(format!("provider answered status {}", status.as_u16()))
    }
}

fn decode<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, GatewayError> {
    serde_json::from_slice(body)
        .map_err(|error| GatewayError::invalid_response(format!("invalid provider JSON: {error}")))
}

/// Redeem an authorisation code for a bearer token at `token_url`.
async fn fetch_token(
    client: &Client,
    token_url: &Url,
    config: &OAuthClientConfig,
    code: &str,
) -> Result<String, GatewayError> {
    let response = client
        .post(token_url.clone())
        .form(&[
            ("grant_type", "authorization_code"),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("code", code),
        ])
        .send()
        .await
        .map_err(map_transport_error)?;

    let status = response.status();
    let body = response.bytes().await.map_err(map_transport_error)?;
    if !status.is_success() {
        return Err(map_status_error(status));
    }
    let token: TokenResponseDto = decode(body.as_ref())?;
    Ok(token.access_token)
}

/// Fetch an authenticated profile document from `me_url`.
async fn fetch_profile<T: serde::de::DeserializeOwned>(
    client: &Client,
    me_url: &Url,
    access_token: &str,
) -> Result<T, GatewayError> {
    let response = client
        .get(me_url.clone())
        .bearer_auth(access_token)
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(map_transport_error)?;

    let status = response.status();
    let body = response.bytes().await.map_err(map_transport_error)?;
    if !status.is_success() {
        return Err(map_status_error(status));
    }
    decode(body.as_ref())
}

fn parse_endpoint(raw: &str) -> Url {
    // Compile-time constants; a malformed one is a programming error.
    Url::parse(raw).unwrap_or_else(|_| panic!("endpoint constant must be a valid URL: {raw}"))
}

/// osu! gateway adapter performing the token exchange and profile fetch.
pub struct OsuHttpGateway {
    client: Client,
    token_url: Url,
    me_url: Url,
    config: OAuthClientConfig,
}

impl OsuHttpGateway {
    /// Build an adapter against the public osu! API.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(config: OAuthClientConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(DEFAULT_REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            token_url: parse_endpoint(OSU_TOKEN_URL),
            me_url: parse_endpoint(OSU_ME_URL),
            config,
        })
    }

    /// Point the adapter at alternative endpoints.
    #[must_use]
    pub fn with_endpoints(mut self, token_url: Url, me_url: Url) -> Self {
        self.token_url = token_url;
        self.me_url = me_url;
        self
    }
}

#[async_trait]
impl OsuGateway for OsuHttpGateway {
    async fn exchange_code(&self, code: &str) -> Result<OsuProfile, GatewayError> {
        let token = fetch_token(&self.client, &self.token_url, &self.config, code).await?;
        let me: OsuMeDto = fetch_profile(&self.client, &self.me_url, &token).await?;
        Ok(osu_profile_from_dto(me))
    }
}

fn osu_profile_from_dto(me: OsuMeDto) -> OsuProfile {
    OsuProfile {
        osu_id: me.id,
        username: me.username,
        avatar_url: me.avatar_url,
        global_rank: me.statistics.global_rank,
        badge_descriptions: me.badges.into_iter().map(|b| b.description).collect(),
    }
}

/// Discord gateway adapter performing the token exchange and profile fetch.
pub struct DiscordHttpGateway {
    client: Client,
    token_url: Url,
    me_url: Url,
    config: OAuthClientConfig,
}

impl DiscordHttpGateway {
    /// Build an adapter against the public Discord API.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(config: OAuthClientConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(DEFAULT_REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            token_url: parse_endpoint(DISCORD_TOKEN_URL),
            me_url: parse_endpoint(DISCORD_ME_URL),
            config,
        })
    }

    /// Point the adapter at alternative endpoints.
    #[must_use]
    pub fn with_endpoints(mut self, token_url: Url, me_url: Url) -> Self {
        self.token_url = token_url;
        self.me_url = me_url;
        self
    }
}

#[async_trait]
impl DiscordGateway for DiscordHttpGateway {
    async fn exchange_code(&self, code: &str) -> Result<DiscordProfile, GatewayError> {
        let token = fetch_token(&self.client, &self.token_url, &self.config, code).await?;
        let me: DiscordMeDto = fetch_profile(&self.client, &self.me_url, &token).await?;
        Ok(discord_profile_from_dto(me))
    }
}

fn discord_profile_from_dto(me: DiscordMeDto) -> DiscordProfile {
    let avatar_url = match &me.avatar {
        Some(hash) => format!("https://cdn.discordapp.com/avatars/{}/{hash}.png", me.id),
        None => {
            // Discord's default avatars are keyed by discriminator modulo 5.
            let index = me.discriminator.parse::<u32>().map(|d| d % 5).unwrap_or(0);
            format!("https://cdn.discordapp.com/embed/avatars/{index}.png")
        }
    };
    DiscordProfile {
        discord_tag: format!("{}#{}", me.username, me.discriminator),
        discord_id: me.id,
        avatar_url,
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for the non-network mapping helpers.
    use super::*;
    use rstest::rstest;

    #[test]
    fn endpoint_constants_are_valid_urls() {
        for raw in [OSU_TOKEN_URL, OSU_ME_URL, DISCORD_TOKEN_URL, DISCORD_ME_URL] {
            let url = parse_endpoint(raw);
            assert_eq!(url.scheme(), "https");
        }
    }

    #[test]
    fn osu_profile_decodes_rank_and_badges() {
        let body = r#"{
            "id": 124493,
            "username": "Cookiezi",
            "avatar_url": "https://a.ppy.sh/124493",
            "statistics": { "global_rank": 3 },
            "badges": [
                { "description": "Tournament winner", "awarded_at": "2016-01-01T00:00:00Z" }
            ]
        }"#;

        let me: OsuMeDto = decode(body.as_bytes()).expect("valid payload");
        let profile = osu_profile_from_dto(me);
        assert_eq!(profile.osu_id, 124_493);
        assert_eq!(profile.global_rank, Some(3));
        assert_eq!(profile.badge_descriptions, vec!["Tournament winner"]);
    }

    #[test]
    fn osu_profile_tolerates_missing_statistics() {
        let body = r#"{
            "id": 3,
            "username": "BanchoBot",
            "avatar_url": "https://a.ppy.sh/3"
        }"#;

        let me: OsuMeDto = decode(body.as_bytes()).expect("valid payload");
        let profile = osu_profile_from_dto(me);
        assert_eq!(profile.global_rank, None);
        assert!(profile.badge_descriptions.is_empty());
    }

    #[rstest]
    #[case(Some("abc123"), "https://cdn.discordapp.com/avatars/42/abc123.png")]
    #[case(None, "https://cdn.discordapp.com/embed/avatars/2.png")]
    fn discord_avatar_url_falls_back_to_the_default(
        #[case] avatar: Option<&str>,
        #[case] expected: &str,
    ) {
        let me = DiscordMeDto {
            id: "42".into(),
            username: "player".into(),
            discriminator: "0007".into(),
            avatar: avatar.map(str::to_owned),
        };
        let profile = discord_profile_from_dto(me);
        assert_eq!(profile.avatar_url, expected);
        assert_eq!(profile.discord_tag, "player#0007");
    }

    #[rstest]
    #[case(StatusCode::UNAUTHORIZED, true)]
    #[case(StatusCode::BAD_REQUEST, true)]
    #[case(StatusCode::INTERNAL_SERVER_ERROR, false)]
    #[case(StatusCode::BAD_GATEWAY, false)]
    fn statuses_split_between_denied_and_unavailable(
        #[case] status: StatusCode,
        #[case] denied: bool,
    ) {
        let error = map_status_error(status);
        assert_eq!(matches!(error, GatewayError::Denied { .. }), denied);
    }

    #[test]
    fn malformed_json_maps_to_invalid_response() {
        let error = decode::<TokenResponseDto>(b"not json").expect_err("decode must fail");
        assert!(matches!(error, GatewayError::InvalidResponse { .. }));
    }

    #[test]
    fn client_config_debug_does_not_leak_the_secret() {
        let config = OAuthClientConfig {
            client_id: "id".into(),
            client_secret: "visible-nowhere".into(),
            redirect_uri: "https://signups.invalid/callback".into(),
        };
        assert!(!format!("{config:?}").contains("visible-nowhere"));
    }
}
