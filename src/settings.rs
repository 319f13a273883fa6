use anyhow::Context;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use solarman_rs::model::SiteConfig;

const DEFAULT_FILE: &str = "config.json";
const DEFAULT_INTERVAL: i64 = 300;

/// Process-wide settings; `SOLARMAN_FILE` and `SOLARMAN_INTERVAL` override the defaults and
/// command line flags override both.
#[derive(Debug, Clone, Deserialize)]
pub struct DaemonSettings {
    pub file: String,
    pub interval: u64,
}

pub fn read_settings() -> Result<DaemonSettings, ConfigError> {
    let mut settings = Config::default();
    settings
        .set_default("file", DEFAULT_FILE)?
        .set_default("interval", DEFAULT_INTERVAL)?
        .merge(Environment::with_prefix("SOLARMAN"))?;

    settings.try_into()
}

/* A file holds either one site or a `sites` list */
#[derive(Deserialize)]
#[serde(untagged)]
enum SitesFile {
    Many { sites: Vec<SiteConfig> },
    One(Box<SiteConfig>),
}

pub fn load_sites(path: &str) -> anyhow::Result<Vec<SiteConfig>> {
    let mut settings = Config::default();
    settings
        .merge(File::with_name(path))
        .with_context(|| format!("Could not read {}", path))?;

    let sites = match settings
        .try_into::<SitesFile>()
        .with_context(|| format!("{} does not describe any site", path))?
    {
        SitesFile::Many { sites } => sites,
        SitesFile::One(site) => vec![*site],
    };

    anyhow::ensure!(!sites.is_empty(), "{} contains an empty site list", path);
    Ok(sites)
}

/// Print a report per site; returns whether every site passed.
pub fn validate(sites: &[SiteConfig]) -> bool {
    let mut valid = true;
    for (index, site) in sites.iter().enumerate() {
        println!(
            "## CONFIG INSTANCE NAME: {} [{}/{}]",
            site.name,
            index + 1,
            sites.len()
        );
        let problems = site.validate();
        if problems.is_empty() {
            println!("Validation OK");
        }
        for problem in &problems {
            println!("  - {}", problem);
        }
        valid &= problems.is_empty();
    }
    valid
}
