use tilawa::{
    cli::Cli,
    config::{Config, get_app_data_prefix},
    logging::{self, LogLevel},
    models::Reciter,
    page::VersePage,
    playback::stream_url,
    prayer::{self, HttpPrayerTimes, StdoutScheduler},
    provider::{ContentProvider, RemoteContentProvider},
    reciters::ReciterRegistry,
    time_format::{arabic_time, day_time},
    ui::recital::RecitalView,
};

use chrono::Local;
use clap::Parser;
use eyre::{Result, WrapErr, eyre};

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(LogLevel::from_verbosity(cli.verbose, cli.debug));

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path.clone())
            .wrap_err_with(|| format!("could not read {}", path.display()))?,
        None => Config::new().wrap_err("could not load configuration")?,
    };
    if let Some(page) = cli.page {
        config.settings.initial_page = page;
    }
    if let Some(reciter) = cli.reciter {
        config.settings.default_reciter = reciter;
    }

    if cli.dump {
        dump_page(&config)
    } else if cli.list_reciters {
        list_reciters(&config)
    } else if cli.prayer_times {
        show_prayer_times(&config)
    } else {
        run_tui(config)
    }
}

fn fetch_registry(config: &Config, provider: &dyn ContentProvider) -> Result<ReciterRegistry> {
    if config.settings.reciters_url.trim().is_empty() {
        return Err(eyre!(
            "no reciter list configured; set `reciters_url` in {}",
            config.filepath().display()
        ));
    }
    Ok(ReciterRegistry::from_fetched(provider.fetch_reciters()?))
}

fn dump_page(config: &Config) -> Result<()> {
    let provider = RemoteContentProvider::from_settings(&config.settings)?;
    let number = config.settings.initial_page;
    let page = VersePage::new(number, provider.fetch_page(number)?);

    // Without a reciter list the bare file names are printed.
    let registry = match fetch_registry(config, &provider) {
        Ok(registry) => registry,
        Err(err) => {
            logging::info(format!("{err:#}"));
            ReciterRegistry::default()
        }
    };
    let base = registry
        .resolve_default(&config.settings.default_reciter)
        .map(|r| r.stream_base_url.as_str())
        .unwrap_or_default();

    println!("page {} ({} verses)", page.number(), page.len());
    for verse in page.verses() {
        println!("{}\t{}\t{}", verse.key, stream_url(base, verse.key), verse.text);
    }
    Ok(())
}

fn format_reciter(reciter: &Reciter, is_default: bool) -> String {
    format!(
        "{} {}\t{}\t{}\t{}",
        if is_default { "*" } else { " " },
        reciter.name,
        reciter.rewaya,
        reciter.bitrate,
        reciter.stream_base_url
    )
}

fn list_reciters(config: &Config) -> Result<()> {
    let provider = RemoteContentProvider::from_settings(&config.settings)?;
    let registry = fetch_registry(config, &provider)?;
    let default = registry
        .resolve_default(&config.settings.default_reciter)
        .map(|r| r.name.clone());
    for reciter in registry.iter() {
        println!("{}", format_reciter(reciter, default.as_deref() == Some(&reciter.name)));
    }
    if default.is_none() {
        logging::warn(format!(
            "default reciter `{}` is not in the list",
            config.settings.default_reciter
        ));
    }
    Ok(())
}

fn show_prayer_times(config: &Config) -> Result<()> {
    let provider = HttpPrayerTimes::from_settings(&config.settings)?;
    let today = prayer::fetch_today(&provider)?;
    println!("{}", today.location.address);
    for prayer in &today.prayers {
        println!(
            "{}\t{}\t{}",
            prayer::arabic_prayer_name(&prayer.name),
            arabic_time(&prayer.clock).unwrap_or_else(|| prayer.clock.clone()),
            day_time(&prayer.clock)
        );
    }

    let reminders = prayer::plan_reminders(
        Local::now().date_naive(),
        &today.prayers,
        config.settings.prayer_reminder_minutes,
    );
    let scheduled = prayer::schedule_all(&mut StdoutScheduler, &reminders);
    logging::info(format!("{scheduled} of {} reminders scheduled", reminders.len()));
    Ok(())
}

fn run_tui(config: Config) -> Result<()> {
    match get_app_data_prefix() {
        Ok(prefix) => {
            if let Err(err) = logging::log_to_file(&prefix.join("tilawa.log")) {
                logging::warn(format!("could not open log file: {err}"));
            }
        }
        Err(err) => logging::warn(format!("{err:#}")),
    }

    let mut view = RecitalView::new(config)?;
    let result = view.run();
    logging::log_to_stderr();
    result
}
