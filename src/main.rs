mod mqtt;
mod settings;

use clap::{CommandFactory, Parser};
use log::{error, info, warn};
use mqtt::MqttPublisher;
use serde_json::Value;
use sha2::{Digest, Sha256};
use solarman_rs::events::LogSink;
use solarman_rs::model::SiteConfig;
use solarman_rs::publish;
use solarman_rs::{reshape, Api, Error, HttpTransport, PollData, Session};
use std::process::ExitCode;
use std::time::Duration;

/// Collect data from the Solarman API and publish it to MQTT
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// run as a service
    #[arg(short, long)]
    daemon: bool,
    /// single run and exit
    #[arg(short, long)]
    single: bool,
    /// run interval in seconds [default: 300]
    #[arg(short, long)]
    interval: Option<u64>,
    /// config file [default: config.json]
    #[arg(short, long)]
    file: Option<String>,
    /// validate config file and exit
    #[arg(long)]
    validate: bool,
    /// create passhash from provided password string and exit
    #[arg(long, value_name = "PASSWORD")]
    create_passhash: Option<String>,
}

fn init_logger(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn passhash(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// A site plus its broker connection, which outlives the per-cycle sessions.
struct Site<'s> {
    config: &'s SiteConfig,
    publisher: Option<MqttPublisher>,
}

impl<'s> Site<'s> {
    fn new(config: &'s SiteConfig) -> Self {
        let publisher = config.mqtt.as_ref().map(|mqtt| {
            info!("{}: publishing to {}:{}", config.name, mqtt.broker, mqtt.port);
            MqttPublisher::connect(mqtt, &format!("solarman-rs-{}", config.name))
        });
        Site { config, publisher }
    }

    async fn close(self) {
        if let Some(publisher) = self.publisher {
            publisher.close().await;
        }
    }
}

fn dump(title: &str, value: &Value) {
    info!(
        "{}\n{}",
        title,
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    );
}

fn dump_poll(data: &PollData) {
    let groups = [
        ("STATION DATA", &data.station_realtime, false),
        ("INVERTER DATA", &data.inverter, true),
        ("LOGGER DATA", &data.logger, true),
        ("METER DATA", &data.meter, true),
    ];
    for (title, value, flattened) in groups {
        if let Some(value) = value {
            dump(title, value);
            if flattened {
                let attributes = reshape::flatten(&mut value.clone());
                dump(&format!("{} LIST", title), &Value::Object(attributes));
            }
        }
    }
}

/// One cycle for one site. Only a missing token comes back as an error.
async fn run_site(site: &mut Site<'_>, sink: &LogSink) -> Result<(), Error> {
    let config = site.config;
    let transport = HttpTransport::new()
        .map_err(|e| Error::FatalInit(format!("Unable to build HTTP client: {}", e)))?;
    let api = Api::new(transport, &config.url, sink);
    let session = Session::connect(api, config).await?;

    let data = session.fetch_all().await;
    if data.account_locked {
        warn!(
            "{}: vendor reports the application as locked; polling continues",
            config.name
        );
    }
    if config.debug {
        dump_poll(&data);
    }

    let messages = publish::messages(data, sink);
    match site.publisher.as_mut() {
        Some(publisher) => {
            let published = publish::publish_all(publisher, &messages, sink);
            info!("{}: published {} of {} messages", config.name, published, messages.len());
        }
        None => warn!(
            "{}: no mqtt section, dropping {} messages",
            config.name,
            messages.len()
        ),
    }
    Ok(())
}

/// Run every site in order; a failing site does not keep the next one from running.
async fn run_all(sites: &mut [Site<'_>], sink: &LogSink) -> Result<(), Error> {
    let total = sites.len();
    for (index, site) in sites.iter_mut().enumerate() {
        info!("## SITE: {} [{}/{}]", site.config.name, index + 1, total);
        if let Err(e) = run_site(site, sink).await {
            if e.is_fatal() {
                return Err(e);
            }
            error!("{}: {}", site.config.name, e);
        }
    }
    Ok(())
}

fn exit_code(result: Result<(), Error>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn close_all(sites: Vec<Site<'_>>) {
    for site in sites {
        site.close().await;
    }
}

async fn single(configs: &[SiteConfig]) -> ExitCode {
    let sink = LogSink;
    let mut sites: Vec<Site> = configs.iter().map(Site::new).collect();
    let result = run_all(&mut sites, &sink).await;
    close_all(sites).await;
    exit_code(result)
}

async fn daemon(configs: &[SiteConfig], interval: u64) -> ExitCode {
    info!(
        "Starting daemonized with a {} seconds run interval",
        interval
    );
    let sink = LogSink;
    let mut sites: Vec<Site> = configs.iter().map(Site::new).collect();

    let code = loop {
        tokio::select! {
            result = run_all(&mut sites, &sink) => {
                if let Err(e) = result {
                    break exit_code(Err(e));
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Exiting on keyboard interrupt");
                break ExitCode::SUCCESS;
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(interval)) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Exiting on keyboard interrupt");
                break ExitCode::SUCCESS;
            }
        }
    };

    close_all(sites).await;
    code
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Some(password) = &args.create_passhash {
        println!("{}", passhash(password));
        return ExitCode::SUCCESS;
    }

    let defaults = match settings::read_settings() {
        Ok(defaults) => defaults,
        Err(e) => {
            init_logger(false);
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let file = args.file.clone().unwrap_or(defaults.file);
    let interval = args.interval.unwrap_or(defaults.interval);

    let configs = settings::load_sites(&file);
    init_logger(
        configs
            .as_ref()
            .map_or(false, |sites| sites.iter().any(|site| site.debug)),
    );
    let configs = match configs {
        Ok(configs) => configs,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };

    if args.validate {
        return if settings::validate(&configs) {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        };
    }

    if args.single {
        single(&configs).await
    } else if args.daemon {
        daemon(&configs, interval).await
    } else {
        if let Err(e) = Args::command().print_help() {
            error!("{}", e);
        }
        ExitCode::SUCCESS
    }
}
