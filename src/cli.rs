//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::adapters::alphavantage_adapter::AlphaVantageProvider;
use crate::adapters::clock::SystemClock;
use crate::adapters::csv_adapter::{read_rows, CsvProvider};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::yahoo_adapter::YahooProvider;
use crate::domain::acquisition::AcquisitionRouter;
use crate::domain::error::TickerError;
use crate::domain::service::MarketService;
use crate::domain::settings::{ProviderKind, Settings};
use crate::ports::catalog_port::CatalogPort;
use crate::ports::config_port::ConfigPort;
use crate::ports::provider_port::HistoryProvider;
use crate::ports::store_port::BarStore;

#[derive(Parser, Debug)]
#[command(name = "tickerlens", about = "Daily market data acquisition and analytics")]
pub struct Cli {
    /// INI configuration file
    #[arg(short, long, global = true, default_value = "tickerlens.ini")]
    pub config: PathBuf,
    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the database schema and seed the instrument catalog
    Init,
    /// List catalog instruments
    Companies {
        #[arg(long)]
        sector: Option<String>,
    },
    /// Annotated daily bars for the last N days
    Bars {
        symbol: String,
        #[arg(short, long, default_value_t = 30)]
        days: i64,
    },
    /// Summary statistics for a symbol
    Summary { symbol: String },
    /// Technical indicators for a symbol
    Technicals { symbol: String },
    /// Compare two symbols over the last N days
    Compare {
        symbol1: String,
        symbol2: String,
        #[arg(short, long, default_value_t = 90)]
        days: i64,
    },
    /// Largest gainers and losers of the latest session
    Movers {
        #[arg(short, long, default_value_t = 5)]
        limit: usize,
    },
    /// Re-fetch history from the providers, ignoring freshness
    Refresh {
        #[arg(required = true)]
        symbols: Vec<String>,
    },
    /// Import a CSV file, or every CSV file in a directory
    Import {
        path: PathBuf,
        /// Symbol for a single file (defaults to the file stem)
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Show the persisted data range for symbol(s)
    Info { symbols: Vec<String> },
    /// Start the web server
    Serve,
}

pub fn run(cli: Cli) -> ExitCode {
    let config = match load_config(&cli.config) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let settings = match Settings::from_config(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    init_tracing(&settings.log_level);

    let service = match build_service(&config, &settings) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let json = cli.json;
    let result = match cli.command {
        Command::Init => run_init(&service, &settings, json),
        Command::Companies { sector } => service
            .list_companies(sector.as_deref())
            .map(|list| emit(json, &list, format::companies)),
        Command::Bars { symbol, days } => service
            .get_bars(&symbol, days)
            .map(|bars| emit(json, &bars, format::bars)),
        Command::Summary { symbol } => service
            .get_summary(&symbol)
            .map(|s| emit(json, &s, format::summary)),
        Command::Technicals { symbol } => service
            .get_technicals(&symbol)
            .map(|t| emit(json, &t, format::technicals)),
        Command::Compare {
            symbol1,
            symbol2,
            days,
        } => service
            .compare(&symbol1, &symbol2, days)
            .map(|c| emit(json, &c, format::comparison)),
        Command::Movers { limit } => service
            .top_movers(limit)
            .map(|m| emit(json, &m, format::movers)),
        Command::Refresh { symbols } => run_refresh(&service, &symbols, json),
        Command::Import { path, symbol } => run_import(&service, &path, symbol.as_deref(), json),
        Command::Info { symbols } => run_info(&service, &symbols, json),
        Command::Serve => run_serve(service, &settings.listen),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })
}

/// Log to stderr. `RUST_LOG` overrides the configured level.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    // a second call (tests driving `run` repeatedly) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(feature = "sqlite")]
fn open_store(
    config: &dyn ConfigPort,
) -> Result<(Arc<dyn BarStore>, Arc<dyn CatalogPort>), TickerError> {
    use crate::adapters::sqlite_adapter::SqliteAdapter;

    let adapter = Arc::new(SqliteAdapter::from_config(config)?);
    adapter.initialize_schema()?;
    let store: Arc<dyn BarStore> = adapter.clone();
    let catalog: Arc<dyn CatalogPort> = adapter;
    Ok((store, catalog))
}

#[cfg(not(feature = "sqlite"))]
fn open_store(
    _config: &dyn ConfigPort,
) -> Result<(Arc<dyn BarStore>, Arc<dyn CatalogPort>), TickerError> {
    use crate::adapters::memory_store::MemoryStore;

    warn!("built without sqlite, bars are kept in memory for this run only");
    let memory = Arc::new(MemoryStore::new());
    let store: Arc<dyn BarStore> = memory.clone();
    let catalog: Arc<dyn CatalogPort> = memory;
    Ok((store, catalog))
}

/// Providers in configured order. Alpha Vantage without an API key is skipped.
pub fn build_providers(settings: &Settings) -> Result<Vec<Arc<dyn HistoryProvider>>, TickerError> {
    let mut providers: Vec<Arc<dyn HistoryProvider>> = Vec::new();
    for kind in &settings.provider_order {
        match kind {
            ProviderKind::AlphaVantage => {
                match AlphaVantageProvider::from_settings(&settings.alphavantage, settings.timeout_secs)? {
                    Some(p) => providers.push(Arc::new(p)),
                    None => warn!("alphavantage has no api key, skipping provider"),
                }
            }
            ProviderKind::Yahoo => providers.push(Arc::new(YahooProvider::from_settings(
                &settings.yahoo,
                settings.timeout_secs,
            )?)),
            ProviderKind::Csv => {
                let path = settings
                    .csv_path
                    .clone()
                    .ok_or_else(|| TickerError::ConfigMissing {
                        section: "csv".into(),
                        key: "path".into(),
                    })?;
                providers.push(Arc::new(CsvProvider::new(PathBuf::from(path))));
            }
        }
    }
    Ok(providers)
}

pub fn build_service(config: &dyn ConfigPort, settings: &Settings) -> Result<MarketService, TickerError> {
    let (store, catalog) = open_store(config)?;
    let providers = build_providers(settings)?;
    let router = AcquisitionRouter::new(store, providers, Arc::new(SystemClock));
    info!(providers = ?router.provider_names(), "service ready");
    Ok(MarketService::new(
        router,
        catalog,
        settings.freshness,
        settings.analytics,
    ))
}

fn emit<T: Serialize>(json: bool, value: &T, text: fn(&T) -> String) {
    if json {
        match serde_json::to_string_pretty(value) {
            Ok(s) => println!("{s}"),
            Err(e) => eprintln!("error: failed to encode JSON: {e}"),
        }
    } else {
        print!("{}", text(value));
    }
}

fn run_init(service: &MarketService, settings: &Settings, json: bool) -> Result<(), TickerError> {
    let seeded = service.seed_catalog(&settings.catalog)?;
    if json {
        println!("{}", serde_json::json!({ "catalog": seeded }));
    } else {
        println!("schema ready, {seeded} instruments in catalog");
    }
    Ok(())
}

fn run_refresh(service: &MarketService, symbols: &[String], json: bool) -> Result<(), TickerError> {
    let mut reports = Vec::new();
    let mut last_err = None;
    for symbol in symbols {
        match service.refresh(symbol) {
            Ok(report) => reports.push(report),
            Err(e) => {
                eprintln!("error refreshing {symbol}: {e}");
                last_err = Some(e);
            }
        }
    }
    emit(json, &reports, format::load_reports);
    last_err.map_or(Ok(()), Err)
}

fn run_import(
    service: &MarketService,
    path: &Path,
    symbol: Option<&str>,
    json: bool,
) -> Result<(), TickerError> {
    let mut reports = Vec::new();

    if path.is_dir() {
        if symbol.is_some() {
            return Err(TickerError::InvalidRange {
                reason: "--symbol only applies to a single file".into(),
            });
        }
        let csv = CsvProvider::new(path.to_path_buf());
        let symbols = csv.list_symbols().map_err(io_error)?;
        for sym in symbols {
            match csv.fetch_history(&sym).map_err(io_error) {
                Ok(rows) => match service.import(&sym, "csv", rows) {
                    Ok(report) => reports.push(report),
                    Err(e) => warn!(symbol = %sym, error = %e, "import skipped"),
                },
                Err(e) => warn!(symbol = %sym, error = %e, "import skipped"),
            }
        }
    } else {
        let symbol = match symbol {
            Some(s) => s.to_string(),
            None => path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .ok_or_else(|| TickerError::InvalidRange {
                    reason: format!("cannot derive a symbol from {}", path.display()),
                })?,
        };
        let rows = read_rows(path).map_err(io_error)?;
        reports.push(service.import(&symbol, "csv", rows)?);
    }

    emit(json, &reports, format::load_reports);
    Ok(())
}

fn run_info(service: &MarketService, symbols: &[String], json: bool) -> Result<(), TickerError> {
    let symbols = if symbols.is_empty() {
        service.stored_symbols()?
    } else {
        symbols.to_vec()
    };

    let mut infos = Vec::new();
    for symbol in &symbols {
        match service.info(symbol) {
            Ok(info) => infos.push(info),
            Err(e) => eprintln!("{symbol}: {e}"),
        }
    }
    emit(json, &infos, format::data_info);
    Ok(())
}

fn io_error(e: crate::domain::error::ProviderError) -> TickerError {
    TickerError::Io(std::io::Error::other(e.to_string()))
}

fn run_serve(service: MarketService, listen: &str) -> Result<(), TickerError> {
    #[cfg(feature = "web")]
    {
        use crate::adapters::web::{build_router, AppState};
        use std::net::SocketAddr;

        let addr: SocketAddr = listen.parse().map_err(|e| TickerError::ConfigInvalid {
            section: "web".into(),
            key: "listen".into(),
            reason: format!("{listen:?}: {e}"),
        })?;

        let router = build_router(AppState {
            service: Arc::new(service),
        });

        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(async {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            info!(%addr, "web server listening");
            axum::serve(listener, router).await
        })?;
        Ok(())
    }

    #[cfg(not(feature = "web"))]
    {
        let _ = (service, listen);
        Err(TickerError::ConfigInvalid {
            section: "web".into(),
            key: "listen".into(),
            reason: "built without the web feature".into(),
        })
    }
}

/// Plain-text renderings for terminal output.
mod format {
    use std::fmt::Write;

    use crate::domain::comparison::ComparisonResult;
    use crate::domain::instrument::Instrument;
    use crate::domain::metrics::{AnnotatedBar, SummaryStats};
    use crate::domain::service::{DataInfo, LoadReport, Mover, TopMovers};
    use crate::domain::technicals::TechnicalSnapshot;

    fn opt(value: Option<f64>, decimals: usize) -> String {
        value.map_or_else(|| "-".to_string(), |v| format!("{v:.decimals$}"))
    }

    pub fn companies(list: &Vec<Instrument>) -> String {
        let mut out = String::new();
        for i in list {
            let _ = writeln!(
                out,
                "{:<12} {:<32} {}",
                i.symbol,
                i.name,
                i.sector.as_deref().unwrap_or("-")
            );
        }
        if list.is_empty() {
            out.push_str("no instruments in catalog\n");
        }
        out
    }

    pub fn bars(bars: &Vec<AnnotatedBar>) -> String {
        let mut out = format!(
            "{:<10} {:>10} {:>10} {:>10} {:>10} {:>12} {:>8} {:>10} {:>10}\n",
            "date", "open", "high", "low", "close", "volume", "ret%", "ma7", "ma30"
        );
        for a in bars {
            let _ = writeln!(
                out,
                "{:<10} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>12} {:>8} {:>10} {:>10}",
                a.bar.date,
                a.bar.open,
                a.bar.high,
                a.bar.low,
                a.bar.close,
                a.bar.volume,
                opt(a.daily_return, 2),
                opt(a.ma7, 2),
                opt(a.ma30, 2),
            );
        }
        out
    }

    pub fn summary(s: &SummaryStats) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} as of {}", s.symbol, s.as_of);
        let _ = writeln!(out, "  price          {:.2}", s.current_price);
        let _ = writeln!(out, "  52w range      {:.2} - {:.2}", s.week52_low, s.week52_high);
        let _ = writeln!(out, "  avg close      {:.2}", s.avg_close);
        let _ = writeln!(out, "  total volume   {}", s.total_volume);
        let _ = writeln!(out, "  daily return   {}%", opt(s.daily_return, 2));
        let _ = writeln!(
            out,
            "  volatility     {}% ({})",
            opt(s.volatility, 2),
            s.volatility_class.map_or("-", |c| c.as_str())
        );
        let _ = writeln!(
            out,
            "  momentum       {}%{}",
            opt(s.momentum_score, 2),
            if s.strong_momentum { " strong" } else { "" }
        );
        let _ = writeln!(out, "  volume trend   {}%", opt(s.volume_trend, 2));
        if let Some(t) = &s.trend {
            let _ = writeln!(
                out,
                "  trend          {} (slope {:.4}, r2 {:.3})",
                t.direction.as_str(),
                t.slope,
                t.r_squared
            );
        }
        out
    }

    pub fn technicals(t: &TechnicalSnapshot) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} as of {}", t.symbol, t.as_of);
        let _ = writeln!(out, "  price          {:.2}", t.current_price);
        let _ = writeln!(out, "  rsi(14)        {}", opt(t.rsi, 2));
        match &t.macd {
            Some(m) => {
                let _ = writeln!(
                    out,
                    "  macd           {:.4} signal {:.4} hist {:.4}{}",
                    m.macd_line,
                    m.signal_line,
                    m.histogram,
                    if m.signal_stable { "" } else { " (warming up)" }
                );
            }
            None => out.push_str("  macd           -\n"),
        }
        match &t.support_resistance {
            Some(sr) => {
                let _ = writeln!(out, "  support        {:.2}", sr.support);
                let _ = writeln!(out, "  resistance     {:.2}", sr.resistance);
            }
            None => out.push_str("  support        -\n  resistance     -\n"),
        }
        if let Some(trend) = &t.trend {
            let _ = writeln!(out, "  trend          {}", trend.direction.as_str());
        }
        let _ = writeln!(out, "  next (linear)  {}", opt(t.predicted_next_price, 2));
        out
    }

    pub fn comparison(c: &ComparisonResult) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} vs {}, {} to {} ({} shared days)",
            c.symbol1, c.symbol2, c.start, c.end, c.overlap
        );
        let _ = writeln!(out, "  correlation    {}", opt(c.correlation, 3));
        let _ = writeln!(
            out,
            "  return         {:.2}% / {:.2}%",
            c.symbol1_return, c.symbol2_return
        );
        let _ = writeln!(
            out,
            "  volatility     {}% / {}%",
            opt(c.symbol1_volatility, 2),
            opt(c.symbol2_volatility, 2)
        );
        let _ = writeln!(out, "  better         {}", c.better_performer);
        out
    }

    fn mover_lines(out: &mut String, title: &str, movers: &[Mover]) {
        let _ = writeln!(out, "{title}");
        for m in movers {
            let _ = writeln!(
                out,
                "  {:<12} {:>10.2} {:>+8.2}% {:>12}",
                m.symbol, m.current_price, m.change_percent, m.volume
            );
        }
    }

    pub fn movers(m: &TopMovers) -> String {
        let mut out = String::new();
        mover_lines(&mut out, "gainers", &m.gainers);
        mover_lines(&mut out, "losers", &m.losers);
        out
    }

    pub fn load_reports(reports: &Vec<LoadReport>) -> String {
        let mut out = String::new();
        for r in reports {
            let _ = writeln!(
                out,
                "{}: {} bars from {}, {} to {}",
                r.symbol, r.bars, r.source, r.first_date, r.last_date
            );
        }
        out
    }

    pub fn data_info(infos: &Vec<DataInfo>) -> String {
        let mut out = String::new();
        for i in infos {
            let _ = writeln!(
                out,
                "{}{}: {} bars, {} to {}",
                i.symbol,
                i.name.as_deref().map(|n| format!(" ({n})")).unwrap_or_default(),
                i.bars,
                i.first_date,
                i.last_date
            );
        }
        out
    }
}
