// Access to files stored in Dropbox.

use log::{debug, info};
use serde::Deserialize;
use snafu::prelude::*;
use std::time::Duration;

use reqwest::blocking::Client;

use crate::dash::config_reader::DropboxSettings;
use crate::dash::*;

const TOKEN_URL: &str = "https://api.dropbox.com/oauth2/token";
const DOWNLOAD_URL: &str = "https://content.dropboxapi.com/2/files/download";
const TIMEOUT_SECS: u64 = 120;

#[derive(Deserialize, Debug)]
struct TokenResponse {
    access_token: String,
}

/// The credentials of the Dropbox application, once all the sources have been merged.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct DropboxCredentials {
    pub app_key: String,
    pub app_secret: String,
    pub refresh_token: String,
}

impl DropboxCredentials {
    /// The values from the command line (or the environment) take precedence over the configuration.
    pub fn resolve(
        from_args: &DropboxSettings,
        from_config: Option<&DropboxSettings>,
    ) -> DashResult<DropboxCredentials> {
        let pick = |a: &Option<String>, c: Option<&Option<String>>, name: &str| -> DashResult<String> {
            a.clone()
                .or_else(|| c.cloned().flatten())
                .filter(|s| !s.is_empty())
                .context(MissingCredentialSnafu { name })
        };
        Ok(DropboxCredentials {
            app_key: pick(
                &from_args.app_key,
                from_config.map(|c| &c.app_key),
                "DROPBOX_APP_KEY",
            )?,
            app_secret: pick(
                &from_args.app_secret,
                from_config.map(|c| &c.app_secret),
                "DROPBOX_APP_SECRET",
            )?,
            refresh_token: pick(
                &from_args.refresh_token,
                from_config.map(|c| &c.refresh_token),
                "DROPBOX_REFRESH_TOKEN",
            )?,
        })
    }
}

/// A client holding a short-lived access token.
pub struct DropboxClient {
    http: Client,
    access_token: String,
}

impl DropboxClient {
    /// Exchanges the refresh token for an access token.
    pub fn connect(credentials: &DropboxCredentials) -> DashResult<DropboxClient> {
        let http = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .context(DropboxAuthSnafu {})?;
        let params = [
            ("refresh_token", credentials.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
            ("client_id", credentials.app_key.as_str()),
            ("client_secret", credentials.app_secret.as_str()),
        ];
        let token: TokenResponse = http
            .post(TOKEN_URL)
            .form(&params)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json())
            .context(DropboxAuthSnafu {})?;
        info!("connect: obtained a Dropbox access token");
        Ok(DropboxClient {
            http,
            access_token: token.access_token,
        })
    }

    /// Downloads the full content of a file.
    pub fn download(&self, path: &str) -> DashResult<Vec<u8>> {
        let arg = json!({ "path": path }).to_string();
        debug!("download: {}", arg);
        let bytes = self
            .http
            .post(DOWNLOAD_URL)
            .bearer_auth(&self.access_token)
            .header("Dropbox-API-Arg", arg)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.bytes())
            .context(DataUnavailableSnafu { path })?;
        info!("download: {}: {} bytes", path, bytes.len());
        Ok(bytes.to_vec())
    }
}
