//! Configuration display

use crate::error::Result;
use terra_auth::AuthSettings;
use terra_common::ConfigLoader;

const REDACTED: &str = "<redacted>";

/// Print the effective settings (secret redacted) or the defaults
pub fn handle_config(settings: &AuthSettings, defaults: bool) -> Result<()> {
    let rendered = if defaults {
        AuthSettings::generate_example()?
    } else {
        redacted(settings).to_toml()?
    };
    print!("{rendered}");
    Ok(())
}

fn redacted(settings: &AuthSettings) -> AuthSettings {
    AuthSettings {
        client_secret: settings.client_secret.as_ref().map(|_| REDACTED.to_string()),
        ..settings.clone()
    }
}
