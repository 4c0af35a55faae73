use std::time::Duration;

use mongodb::options::ClientOptions;

use super::error::{MongoDaoError, MongoResult};

const DEFAULT_DB: &str = "zona_xtreme";
const DEFAULT_PING_ATTEMPTS: u32 = 3;
const DEFAULT_PING_INTERVAL: Duration = Duration::from_millis(500);

/// Connection settings for the MongoDB venue store.
#[derive(Clone)]
pub struct MongoConfig {
    pub options: ClientOptions,
    pub database_name: String,
    /// Pings tried before a connection attempt is given up. Never zero.
    pub ping_attempts: u32,
    /// Pause between two failed pings of the same attempt.
    pub ping_interval: Duration,
}

impl MongoConfig {
    /// Parse `uri` and pick the target database, defaulting to `zona_xtreme`.
    pub async fn from_uri(uri: &str, db_name: Option<&str>) -> MongoResult<Self> {
        let database_name = db_name.unwrap_or(DEFAULT_DB).to_owned();
        let options = ClientOptions::parse(uri)
            .await
            .map_err(|source| MongoDaoError::InvalidUri { source })?;

        Ok(Self {
            options,
            database_name,
            ping_attempts: DEFAULT_PING_ATTEMPTS,
            ping_interval: DEFAULT_PING_INTERVAL,
        })
    }

    /// Read `MONGO_URI` (required), `MONGO_DB`, `MONGO_PING_ATTEMPTS` and
    /// `MONGO_PING_INTERVAL_MS` (optional).
    pub async fn from_env() -> MongoResult<Self> {
        let uri = std::env::var("MONGO_URI")
            .map_err(|_| MongoDaoError::MissingEnvVar { var: "MONGO_URI" })?;
        let db = std::env::var("MONGO_DB").ok();
        let mut config = Self::from_uri(&uri, db.as_deref()).await?;

        if let Some(attempts) = read_setting("MONGO_PING_ATTEMPTS")? {
            config = config.with_ping_attempts(attempts);
        }
        if let Some(millis) = read_setting("MONGO_PING_INTERVAL_MS")? {
            config.ping_interval = Duration::from_millis(millis);
        }
        Ok(config)
    }

    /// Override the ping budget; zero is raised to a single attempt.
    pub fn with_ping_attempts(mut self, attempts: u32) -> Self {
        self.ping_attempts = attempts.max(1);
        self
    }
}

fn read_setting<T: std::str::FromStr>(var: &'static str) -> MongoResult<Option<T>> {
    match std::env::var(var) {
        Ok(value) => parse_setting(var, &value).map(Some),
        Err(_) => Ok(None),
    }
}

fn parse_setting<T: std::str::FromStr>(var: &'static str, value: &str) -> MongoResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| MongoDaoError::InvalidSetting {
            var,
            value: value.to_owned(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_settings_are_parsed_or_reported() {
        assert_eq!(parse_setting::<u32>("MONGO_PING_ATTEMPTS", " 7 ").unwrap(), 7);

        let err = parse_setting::<u64>("MONGO_PING_INTERVAL_MS", "soon").unwrap_err();
        assert!(matches!(
            err,
            MongoDaoError::InvalidSetting { var: "MONGO_PING_INTERVAL_MS", ref value } if value == "soon"
        ));
    }
}
