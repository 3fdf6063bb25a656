use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use std::time::Duration;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

const WEB_APP_DATA_KEY: &[u8] = b"WebAppData";
const MAX_INIT_DATA_LEN: usize = 8 * 1024;
const DEFAULT_FUTURE_TOLERANCE: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InitDataError {
    #[error("init data is malformed: {0}")]
    MalformedInput(String),

    #[error("init data has no hash field")]
    MissingHash,

    #[error("init data signature does not match")]
    InvalidSignature,

    #[error("init data has expired")]
    Expired,

    #[error("init data auth_date is in the future")]
    InvalidTimestamp,

    #[error("init data has no user field")]
    MissingUser,

    #[error("init data user payload is invalid: {0}")]
    InvalidUserPayload(String),

    #[error("telegram bot token is not configured")]
    MissingServerConfig,
}

impl InitDataError {
    pub fn code(&self) -> &'static str {
        match self {
            InitDataError::MalformedInput(_) => "malformed_init_data",
            InitDataError::MissingHash => "missing_hash",
            InitDataError::InvalidSignature => "invalid_signature",
            InitDataError::Expired => "init_data_expired",
            InitDataError::InvalidTimestamp => "invalid_timestamp",
            InitDataError::MissingUser => "missing_user",
            InitDataError::InvalidUserPayload(_) => "invalid_user_payload",
            InitDataError::MissingServerConfig => "missing_server_config",
        }
    }

    pub fn status(&self) -> http::StatusCode {
        match self {
            InitDataError::MalformedInput(_)
            | InitDataError::MissingHash
            | InitDataError::MissingUser
            | InitDataError::InvalidUserPayload(_) => http::StatusCode::BAD_REQUEST,
            InitDataError::InvalidSignature
            | InitDataError::Expired
            | InitDataError::InvalidTimestamp => http::StatusCode::UNAUTHORIZED,
            InitDataError::MissingServerConfig => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// The `user` object embedded in Mini App init data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub language_code: Option<String>,
    pub is_premium: Option<bool>,
    pub photo_url: Option<String>,
    pub is_bot: Option<bool>,
    pub added_to_attachment_menu: Option<bool>,
    pub allows_write_to_pm: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedInitData {
    pub user: TelegramUser,
    pub auth_date: DateTime<Utc>,
    pub query_id: Option<String>,
    pub chat_type: Option<String>,
    pub chat_instance: Option<String>,
    pub start_param: Option<String>,
}

/// Verifies Telegram WebApp init data against one bot token.
///
/// The secret key is derived once in [`InitDataVerifier::new`], so a single
/// verifier can be shared across request handlers.
#[derive(Clone)]
pub struct InitDataVerifier {
    secret_key: Option<[u8; 32]>,
    redacted_token: String,
    max_age: Option<Duration>,
    future_tolerance: Duration,
}

impl fmt::Debug for InitDataVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitDataVerifier")
            .field("bot_token", &self.redacted_token)
            .field("max_age", &self.max_age)
            .field("future_tolerance", &self.future_tolerance)
            .finish()
    }
}

impl InitDataVerifier {
    /// An empty token is accepted here and reported as
    /// [`InitDataError::MissingServerConfig`] on every verification.
    pub fn new(bot_token: &str) -> Self {
        let secret_key = if bot_token.is_empty() {
            None
        } else {
            Some(derive_secret_key(bot_token))
        };
        Self {
            secret_key,
            redacted_token: redact_bot_token(bot_token),
            max_age: None,
            future_tolerance: DEFAULT_FUTURE_TOLERANCE,
        }
    }

    pub fn with_max_age(mut self, max_age: Option<Duration>) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_future_tolerance(mut self, tolerance: Duration) -> Self {
        self.future_tolerance = tolerance;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.secret_key.is_some()
    }

    pub fn verify(&self, raw_init_data: &str) -> Result<VerifiedInitData, InitDataError> {
        self.verify_at(raw_init_data, Utc::now())
    }

    pub fn verify_at(
        &self,
        raw_init_data: &str,
        now: DateTime<Utc>,
    ) -> Result<VerifiedInitData, InitDataError> {
        let secret_key = self
            .secret_key
            .as_ref()
            .ok_or(InitDataError::MissingServerConfig)?;

        let mut fields = parse_fields(raw_init_data)?;

        let hash_index = fields
            .iter()
            .position(|(key, _)| key == "hash")
            .ok_or(InitDataError::MissingHash)?;
        let (_, expected) = fields.remove(hash_index);
        let expected = expected.to_ascii_lowercase();

        let check_string = data_check_string(&mut fields);
        let computed = sign_check_string(secret_key, &check_string);
        if !bool::from(computed.as_bytes().ct_eq(expected.as_bytes())) {
            return Err(InitDataError::InvalidSignature);
        }

        let auth_date = field(&fields, "auth_date")
            .ok_or_else(|| InitDataError::MalformedInput("missing auth_date".to_string()))?;
        let auth_date = parse_auth_date(auth_date)?;
        self.check_freshness(auth_date, now)?;

        let user = field(&fields, "user").ok_or(InitDataError::MissingUser)?;
        let user: TelegramUser = serde_json::from_str(user)
            .map_err(|e| InitDataError::InvalidUserPayload(e.to_string()))?;

        Ok(VerifiedInitData {
            user,
            auth_date,
            query_id: field(&fields, "query_id").map(str::to_string),
            chat_type: field(&fields, "chat_type").map(str::to_string),
            chat_instance: field(&fields, "chat_instance").map(str::to_string),
            start_param: field(&fields, "start_param").map(str::to_string),
        })
    }

    fn check_freshness(
        &self,
        auth_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), InitDataError> {
        let age = now.signed_duration_since(auth_date).num_seconds();
        if age < 0 && age.unsigned_abs() > self.future_tolerance.as_secs() {
            return Err(InitDataError::InvalidTimestamp);
        }
        if let Some(max_age) = self.max_age {
            if age > 0 && age.unsigned_abs() > max_age.as_secs() {
                return Err(InitDataError::Expired);
            }
        }
        Ok(())
    }
}

/// Verifies `raw_init_data` against `bot_token` using the current time.
///
/// `max_age_secs` of `None` disables the expiry check; the future-skew check
/// always applies.
pub fn verify_init_data(
    raw_init_data: &str,
    bot_token: &str,
    max_age_secs: Option<u64>,
) -> Result<VerifiedInitData, InitDataError> {
    InitDataVerifier::new(bot_token)
        .with_max_age(max_age_secs.map(Duration::from_secs))
        .verify(raw_init_data)
}

/// Builds a signed init data string the way the Telegram client does.
///
/// Used for local development and tests; production payloads come from the
/// WebApp SDK.
pub fn sign_init_data(fields: &[(&str, &str)], bot_token: &str) -> String {
    let secret_key = derive_secret_key(bot_token);
    let mut owned: Vec<(String, String)> = fields
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let hash = sign_check_string(&secret_key, &data_check_string(&mut owned));

    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(fields.iter().copied())
        .append_pair("hash", &hash)
        .finish()
}

/// Renders a bot token as `<bot-id>:<first 4 chars>…` for logs.
pub fn redact_bot_token(bot_token: &str) -> String {
    if bot_token.is_empty() {
        return "<unset>".to_string();
    }
    match bot_token.split_once(':') {
        Some((bot_id, secret)) => {
            let prefix: String = secret.chars().take(4).collect();
            format!("{}:{}…", bot_id, prefix)
        }
        None => "<redacted>".to_string(),
    }
}

fn derive_secret_key(bot_token: &str) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(WEB_APP_DATA_KEY)
        .expect("HMAC-SHA256 accepts keys of any length");
    mac.update(bot_token.as_bytes());
    let mut key = [0u8; 32];
    key.copy_from_slice(&mac.finalize().into_bytes());
    key
}

fn sign_check_string(secret_key: &[u8; 32], check_string: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret_key).expect("HMAC-SHA256 accepts keys of any length");
    mac.update(check_string.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn data_check_string(fields: &mut [(String, String)]) -> String {
    fields.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
    fields
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("\n")
}

fn parse_fields(raw: &str) -> Result<Vec<(String, String)>, InitDataError> {
    if raw.is_empty() {
        return Err(InitDataError::MalformedInput("empty init data".to_string()));
    }
    if raw.len() > MAX_INIT_DATA_LEN {
        return Err(InitDataError::MalformedInput("init data too long".to_string()));
    }

    let mut fields: Vec<(String, String)> = Vec::new();
    for pair in raw.split('&') {
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            InitDataError::MalformedInput("field without '=' separator".to_string())
        })?;
        let key = decode_component(key)?;
        let value = decode_component(value)?;
        if key.is_empty() {
            return Err(InitDataError::MalformedInput("empty field name".to_string()));
        }
        if fields.iter().any(|(k, _)| *k == key) {
            return Err(InitDataError::MalformedInput(format!(
                "duplicate field '{}'",
                key
            )));
        }
        fields.push((key, value));
    }
    Ok(fields)
}

// Strict form decoding: '+' is a space, '%' must introduce two hex digits,
// and the decoded bytes must be UTF-8.
fn decode_component(raw: &str) -> Result<String, InitDataError> {
    let bytes = raw.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                decoded.push(b' ');
                i += 1;
            }
            b'%' => {
                let escape = bytes.get(i + 1..i + 3).ok_or_else(|| {
                    InitDataError::MalformedInput("truncated percent escape".to_string())
                })?;
                let byte = hex::decode(escape).map_err(|_| {
                    InitDataError::MalformedInput("invalid percent escape".to_string())
                })?;
                decoded.extend_from_slice(&byte);
                i += 3;
            }
            other => {
                decoded.push(other);
                i += 1;
            }
        }
    }
    String::from_utf8(decoded)
        .map_err(|_| InitDataError::MalformedInput("field is not valid UTF-8".to_string()))
}

fn field<'a>(fields: &'a [(String, String)], name: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

fn parse_auth_date(raw: &str) -> Result<DateTime<Utc>, InitDataError> {
    let secs: i64 = raw
        .parse()
        .map_err(|_| InitDataError::MalformedInput("auth_date is not numeric".to_string()))?;
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| InitDataError::MalformedInput("auth_date is out of range".to_string()))
}
