//! CLI definition and dispatch.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::{write_trade_log, CsvAdapter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::html_report::HtmlReportAdapter;
use crate::domain::backtest::{prepare_symbol, run_backtest, BacktestConfig};
use crate::domain::config_validation::{parse_date, validate_all};
use crate::domain::error::TraderError;
use crate::domain::indicator::IndicatorType;
use crate::domain::market_data::{build_master_timeline, SymbolData};
use crate::domain::metrics::{DirectionResult, Metrics, SymbolResult};
use crate::domain::ohlcv::Interval;
use crate::domain::strategy::elliott::ElliottConfig;
use crate::domain::strategy::{build_strategy, SignalGenerator};
use crate::domain::trend::{classify_market, Trend};
use crate::domain::wave::{latest_wave_signal, wave_summary};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::{ReportData, ReportPort};

pub const DEFAULT_INTERVAL: &str = "1h";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_REPORT: &str = "report.html";

/// Close volatility shown by `trend`.
const CLOSE_STDDEV: IndicatorType = IndicatorType::Stddev(20);

#[derive(Parser, Debug)]
#[command(
    name = "wavetrader",
    version,
    about = "Elliott Wave signal research and backtesting on Binance klines"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every command that reads market data.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct DataArgs {
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Comma-separated symbols, overriding `[data] symbols`
    #[arg(short, long)]
    pub symbols: Option<String>,
    #[arg(short, long)]
    pub interval: Option<String>,
    /// `csv` or `binance`
    #[arg(long)]
    pub source: Option<String>,
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    /// YYYY-MM-DD
    #[arg(long)]
    pub start: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    pub end: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest and write an HTML report
    Backtest {
        #[command(flatten)]
        data: DataArgs,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        trades_csv: Option<PathBuf>,
        /// Validate and print the plan without running
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Elliott Wave analysis on the latest window of each symbol
    Waves {
        #[command(flatten)]
        data: DataArgs,
        /// Candles analysed, overriding `[elliott] wave_analysis_lookback`
        #[arg(long)]
        lookback: Option<usize>,
    },
    /// Trend classification and market conditions per symbol
    Trend {
        #[command(flatten)]
        data: DataArgs,
    },
    /// Show the stored data range for symbol(s)
    Info {
        #[command(flatten)]
        data: DataArgs,
    },
    /// List symbols available from the data source
    ListSymbols {
        #[command(flatten)]
        data: DataArgs,
    },
    /// Download klines from Binance into the CSV data directory
    #[cfg(feature = "binance")]
    Fetch {
        #[command(flatten)]
        data: DataArgs,
    },
    /// Trade one symbol on the live kline stream (paper trading)
    #[cfg(feature = "live")]
    Live {
        #[command(flatten)]
        data: DataArgs,
        /// REST candles used to warm up indicators
        #[arg(long, default_value_t = 500)]
        warmup: usize,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            data,
            output,
            trades_csv,
            dry_run,
        } => run_backtest_command(&data, output, trades_csv, dry_run),
        Command::Validate { config } => run_validate(&config),
        Command::Waves { data, lookback } => run_waves(&data, lookback),
        Command::Trend { data } => run_trend(&data),
        Command::Info { data } => run_info(&data),
        Command::ListSymbols { data } => run_list_symbols(&data),
        #[cfg(feature = "binance")]
        Command::Fetch { data } => run_fetch(&data),
        #[cfg(feature = "live")]
        Command::Live { data, warmup } => run_live(&data, warmup),
    }
}

fn fail(err: TraderError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(&err)
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, TraderError> {
    info!("loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

/// The config file (or an empty one) with command-line flags written over it.
pub fn load_with_overrides(args: &DataArgs) -> Result<FileConfigAdapter, TraderError> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => FileConfigAdapter::empty(),
    };
    let overrides = [
        ("symbols", args.symbols.clone()),
        ("interval", args.interval.clone()),
        ("source", args.source.clone()),
        (
            "data_dir",
            args.data_dir.as_ref().map(|p| p.display().to_string()),
        ),
        ("start_date", args.start.clone()),
        ("end_date", args.end.clone()),
    ];
    for (key, value) in overrides {
        if let Some(value) = value {
            config.set("data", key, &value);
        }
    }
    Ok(config)
}

/// `[data] symbols`, else the `SYMBOL` environment variable. Upper-cased.
pub fn resolve_symbols(config: &dyn ConfigPort) -> Vec<String> {
    let mut symbols = config.get_list("data", "symbols");
    if symbols.is_empty()
        && let Ok(env) = std::env::var("SYMBOL")
    {
        symbols = env
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }
    let mut seen = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let symbol = symbol.to_uppercase();
        if !seen.contains(&symbol) {
            seen.push(symbol);
        }
    }
    seen
}

/// `[data] interval`, else `INTERVAL`, else 1h.
pub fn resolve_interval(config: &dyn ConfigPort) -> Result<Interval, TraderError> {
    config
        .get_string("data", "interval")
        .or_else(|| std::env::var("INTERVAL").ok())
        .unwrap_or_else(|| DEFAULT_INTERVAL.to_string())
        .parse()
}

/// Start of the start date and end of the end date.
pub fn resolve_range(
    config: &dyn ConfigPort,
) -> Result<(Option<NaiveDateTime>, Option<NaiveDateTime>), TraderError> {
    let start = parse_date(config, "start_date")?.map(|d| d.and_time(NaiveTime::MIN));
    let end = parse_date(config, "end_date")?.and_then(end_of_day);
    Ok((start, end))
}

fn end_of_day(date: NaiveDate) -> Option<NaiveDateTime> {
    date.and_hms_milli_opt(23, 59, 59, 999)
}

pub fn open_data_port(config: &dyn ConfigPort) -> Result<Box<dyn DataPort>, TraderError> {
    let source = config
        .get_string("data", "source")
        .unwrap_or_else(|| "csv".to_string());
    match source.trim() {
        "csv" => {
            let dir = config
                .get_string("data", "data_dir")
                .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
            Ok(Box::new(CsvAdapter::new(PathBuf::from(dir))))
        }
        #[cfg(feature = "binance")]
        "binance" => {
            use crate::adapters::binance_adapter::{BinanceAdapter, DEFAULT_BASE_URL};
            let base_url = config
                .get_string("data", "base_url")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
            Ok(Box::new(BinanceAdapter::new(&base_url)?))
        }
        other => Err(TraderError::invalid(
            "data",
            "source",
            format!("unsupported data source '{other}'"),
        )),
    }
}

pub fn build_backtest_config(
    config: &dyn ConfigPort,
    interval: Interval,
) -> Result<BacktestConfig, TraderError> {
    let defaults = BacktestConfig::default();
    let count = |section: &str, key: &str, default: usize| -> Result<usize, TraderError> {
        let value = config.get_int(section, key, default as i64);
        usize::try_from(value)
            .map_err(|_| TraderError::invalid(section, key, format!("{key} must not be negative")))
    };

    Ok(BacktestConfig {
        initial_capital: config.get_double("backtest", "initial_capital", defaults.initial_capital),
        risk_per_trade: config.get_double("backtest", "risk_per_trade", defaults.risk_per_trade),
        max_open_positions: count("backtest", "max_open_positions", defaults.max_open_positions)?,
        min_data_points: count("backtest", "min_data_points", defaults.min_data_points)?,
        periods_per_year: config.get_double("backtest", "periods_per_year", interval.bars_per_year()),
        risk_free_rate: config.get_double("backtest", "risk_free_rate", defaults.risk_free_rate),
        commission_pct: config.get_double("backtest", "commission_pct", defaults.commission_pct),
        slippage_pct: config.get_double("backtest", "slippage_pct", defaults.slippage_pct),
        close_at_end: config.get_bool("backtest", "close_at_end", defaults.close_at_end),
        verbose: config.get_bool("backtest", "verbose", defaults.verbose),
        atr_period: count("risk", "atr_period", defaults.atr_period)?,
        atr_multiplier_sl: config.get_double("risk", "atr_multiplier_sl", defaults.atr_multiplier_sl),
        reward_ratio: config.get_double("risk", "reward_ratio", defaults.reward_ratio),
    })
}

/// Where the backtest writes its artifacts.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSettings {
    pub output: PathBuf,
    pub trades_csv: Option<PathBuf>,
    pub title: String,
    pub template: Option<PathBuf>,
}

impl ReportSettings {
    pub fn from_config(
        config: &dyn ConfigPort,
        output: Option<PathBuf>,
        trades_csv: Option<PathBuf>,
    ) -> Self {
        ReportSettings {
            output: output
                .or_else(|| config.get_string("report", "output").map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT)),
            trades_csv: trades_csv
                .or_else(|| config.get_string("report", "trades_csv").map(PathBuf::from)),
            title: config
                .get_string("report", "title")
                .unwrap_or_else(|| "Backtest Report".to_string()),
            template: config.get_string("report", "template").map(PathBuf::from),
        }
    }
}

fn run_backtest_command(
    args: &DataArgs,
    output: Option<PathBuf>,
    trades_csv: Option<PathBuf>,
    dry_run: bool,
) -> ExitCode {
    let config = match load_with_overrides(args) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    if let Err(e) = validate_all(&config) {
        return fail(e);
    }
    let interval = match resolve_interval(&config) {
        Ok(i) => i,
        Err(e) => return fail(e),
    };
    let bt_config = match build_backtest_config(&config, interval) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let mut strategy = match build_strategy(&config) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    let (start, end) = match resolve_range(&config) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };
    let symbols = resolve_symbols(&config);
    if symbols.is_empty() {
        return fail(TraderError::ConfigMissing {
            section: "data".into(),
            key: "symbols".into(),
        });
    }
    let report = ReportSettings::from_config(&config, output, trades_csv);

    if dry_run {
        print_plan(&config, strategy.as_ref(), &bt_config, &symbols, interval, &report);
        return ExitCode::SUCCESS;
    }

    let data_port = match open_data_port(&config) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };
    run_backtest_pipeline(
        data_port.as_ref(),
        strategy.as_mut(),
        &bt_config,
        &symbols,
        interval,
        (start, end),
        &report,
    )
}

fn print_plan(
    config: &dyn ConfigPort,
    strategy: &dyn SignalGenerator,
    bt_config: &BacktestConfig,
    symbols: &[String],
    interval: Interval,
    report: &ReportSettings,
) {
    eprintln!("Configuration is valid\n");
    eprintln!("Strategy:   {}", strategy.describe());
    eprintln!("Symbols:    {}", symbols.join(", "));
    eprintln!("Interval:   {interval}");
    eprintln!(
        "Source:     {}",
        config
            .get_string("data", "source")
            .unwrap_or_else(|| "csv".to_string())
    );
    eprintln!(
        "Period:     {} to {}",
        config
            .get_string("data", "start_date")
            .unwrap_or_else(|| "start".to_string()),
        config
            .get_string("data", "end_date")
            .unwrap_or_else(|| "end".to_string())
    );

    let mut indicators: Vec<String> = bt_config
        .indicators_for(strategy)
        .iter()
        .map(|i| i.to_string())
        .collect();
    indicators.sort();
    eprintln!("\nIndicators: {}", indicators.join(", "));

    eprintln!("\nCapital:    {:.2}", bt_config.initial_capital);
    eprintln!("Risk/trade: {:.2}%", bt_config.risk_per_trade * 100.0);
    eprintln!("Max open:   {}", bt_config.max_open_positions);
    eprintln!("Warmup:     {} steps", bt_config.min_data_points);
    eprintln!(
        "Stops:      ATR({}) x {}, reward {}:1",
        bt_config.atr_period, bt_config.atr_multiplier_sl, bt_config.reward_ratio
    );
    eprintln!("\nReport:     {}", report.output.display());
    if let Some(csv) = &report.trades_csv {
        eprintln!("Trades CSV: {}", csv.display());
    }
    eprintln!("\nDry run complete");
}

/// Fetch, simulate and report. Symbols that fail to load are skipped.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    strategy: &mut dyn SignalGenerator,
    bt_config: &BacktestConfig,
    symbols: &[String],
    interval: Interval,
    range: (Option<NaiveDateTime>, Option<NaiveDateTime>),
    report: &ReportSettings,
) -> ExitCode {
    let indicators = bt_config.indicators_for(strategy);
    let mut loaded: Vec<SymbolData> = Vec::with_capacity(symbols.len());

    for symbol in symbols {
        let prepared = data_port
            .fetch_klines(symbol, interval, range.0, range.1)
            .and_then(|candles| {
                prepare_symbol(symbol, candles, &indicators, bt_config.min_data_points)
            });
        match prepared {
            Ok(data) => {
                info!("{}: {} candles loaded", symbol, data.len());
                loaded.push(data);
            }
            Err(e) => warn!("skipping {symbol}: {e}"),
        }
    }

    if loaded.is_empty() {
        eprintln!("error: no symbols with enough data to backtest");
        return ExitCode::from(5);
    }

    let timeline = build_master_timeline(&loaded);
    eprintln!(
        "Running {} on {} symbol(s), {} steps",
        strategy.name(),
        loaded.len(),
        timeline.len()
    );
    let result = run_backtest(&loaded, &timeline, strategy, bt_config);

    let portfolio = &result.portfolio;
    let metrics = Metrics::compute(
        &portfolio.equity_curve,
        &portfolio.trade_history,
        bt_config.initial_capital,
        bt_config.periods_per_year,
        bt_config.risk_free_rate,
    );
    let symbol_results = SymbolResult::compute_per_symbol(&portfolio.trade_history);
    let direction_results = DirectionResult::compute(&portfolio.trade_history);

    print_summary(&metrics, &symbol_results, &direction_results);
    if !result.open_positions.is_empty() {
        eprintln!("\n=== Open Positions ===");
        for pos in &result.open_positions {
            eprintln!(
                "  {} {} @ {:.6} (SL {:.6}, TP {:.6}) since {}",
                pos.symbol, pos.direction, pos.entry_price, pos.stop_loss, pos.take_profit, pos.entry_time
            );
        }
    }

    if let Some(path) = &report.trades_csv {
        if let Err(e) = write_trade_log(path, &portfolio.trade_history) {
            return fail(e);
        }
        eprintln!("\nTrades written to: {}", path.display());
    }

    let adapter = match &report.template {
        Some(path) => match HtmlReportAdapter::with_template_file(path) {
            Ok(a) => a,
            Err(e) => return fail(e),
        },
        None => HtmlReportAdapter::new(),
    };
    let loaded_symbols: Vec<String> = loaded.iter().map(|d| d.symbol.clone()).collect();
    let description = strategy.describe();
    let data = ReportData {
        title: &report.title,
        strategy_description: &description,
        symbols: &loaded_symbols,
        interval: interval.as_str(),
        portfolio,
        metrics: &metrics,
        symbol_results: &symbol_results,
        direction_results: &direction_results,
    };
    match adapter.write(&data, &report.output) {
        Ok(()) => {
            eprintln!("\nReport written to: {}", report.output.display());
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn print_summary(
    metrics: &Metrics,
    symbol_results: &[SymbolResult],
    direction_results: &[DirectionResult],
) {
    eprintln!("\n=== Aggregate Results ===");
    eprintln!("Final Capital:    {:.2}", metrics.final_capital);
    eprintln!("Net PnL:          {:+.2}", metrics.net_pnl);
    eprintln!("Total Return:     {:.2}%", metrics.total_return * 100.0);
    eprintln!("Annualized:       {:.2}%", metrics.annualized_return * 100.0);
    eprintln!("Sharpe Ratio:     {:.2}", metrics.sharpe_ratio);
    eprintln!("Sortino Ratio:    {:.2}", metrics.sortino_ratio);
    eprintln!("Max Drawdown:     -{:.1}%", metrics.max_drawdown * 100.0);
    eprintln!("Total Trades:     {}", metrics.total_trades);
    eprintln!("Win Rate:         {:.1}%", metrics.win_rate * 100.0);
    eprintln!("Profit Factor:    {:.2}", metrics.profit_factor);
    eprintln!("Commission:       {:.2}", metrics.total_commission);

    if !symbol_results.is_empty() {
        eprintln!("\n=== Per-Symbol Summary ===");
        for r in symbol_results {
            eprintln!(
                "  {}:  {} trades, {:.1}% win rate, {:+.2}",
                r.symbol,
                r.total_trades,
                r.win_rate * 100.0,
                r.total_pnl
            );
        }
    }

    if !direction_results.is_empty() {
        eprintln!("\n=== Per-Direction Summary ===");
        for r in direction_results {
            eprintln!(
                "  {}:  {} trades, {:.1}% win rate, {:+.2} (avg {:+.2})",
                r.direction,
                r.total_trades,
                r.win_rate * 100.0,
                r.total_pnl,
                r.avg_pnl
            );
        }
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    if let Err(e) = validate_all(&config) {
        return fail(e);
    }
    let strategy = match build_strategy(&config) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    eprintln!("Strategy: {}", strategy.describe());
    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

/// Symbols plus a data port, shared by the read-only analysis commands.
fn open_for_analysis(
    args: &DataArgs,
) -> Result<(FileConfigAdapter, Box<dyn DataPort>, Vec<String>, Interval), TraderError> {
    let config = load_with_overrides(args)?;
    let interval = resolve_interval(&config)?;
    let symbols = resolve_symbols(&config);
    if symbols.is_empty() {
        return Err(TraderError::ConfigMissing {
            section: "data".into(),
            key: "symbols".into(),
        });
    }
    let port = open_data_port(&config)?;
    Ok((config, port, symbols, interval))
}

fn run_waves(args: &DataArgs, lookback: Option<usize>) -> ExitCode {
    let (config, port, symbols, interval) = match open_for_analysis(args) {
        Ok(v) => v,
        Err(e) => return fail(e),
    };
    let elliott = match ElliottConfig::from_config(&config) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let (start, end) = match resolve_range(&config) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };
    let window_len = lookback.unwrap_or(elliott.wave_analysis_lookback);

    let mut status = ExitCode::SUCCESS;
    for symbol in &symbols {
        let candles = match port.fetch_klines(symbol, interval, start, end) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("error: {symbol}: {e}");
                status = ExitCode::from(&e);
                continue;
            }
        };
        let window = &candles[candles.len().saturating_sub(window_len)..];
        let waves = elliott.analyzer.analyze(window);

        eprintln!("\n{symbol} {interval}: last {} candles", window.len());
        eprint!("{}", wave_summary(&waves));
        match latest_wave_signal(&waves) {
            Some(signal) => eprintln!(
                "\nLatest: {} wave, {} points, confidence {:.2} -> {}",
                signal.direction.as_str(),
                signal.points,
                signal.confidence,
                signal.action
            ),
            None => eprintln!("\nLatest: no wave, HOLD"),
        }
    }
    status
}

fn run_trend(args: &DataArgs) -> ExitCode {
    let (config, port, symbols, interval) = match open_for_analysis(args) {
        Ok(v) => v,
        Err(e) => return fail(e),
    };
    let filter = match ElliottConfig::from_config(&config) {
        Ok(c) => c.trend,
        Err(e) => return fail(e),
    };
    let (start, end) = match resolve_range(&config) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };

    let mut status = ExitCode::SUCCESS;
    for symbol in &symbols {
        let candles = match port.fetch_klines(symbol, interval, start, end) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("error: {symbol}: {e}");
                status = ExitCode::from(&e);
                continue;
            }
        };
        let mut indicators = filter.required_indicators();
        indicators.push(CLOSE_STDDEV);
        let data = SymbolData::with_indicators(symbol.clone(), candles, &indicators);

        let mut counts = [0usize; 3];
        let mut trends = Vec::with_capacity(data.len());
        for index in 0..data.len() {
            let trend = filter.detect(&data, index);
            counts[match trend {
                Trend::Bullish => 0,
                Trend::Bearish => 1,
                Trend::Neutral => 2,
            }] += 1;
            trends.push(trend);
        }

        eprintln!("\n{symbol} {interval}: {} candles, {} mode", data.len(), filter.mode);
        eprintln!(
            "  Bullish: {}  Bearish: {}  Neutral: {}",
            counts[0], counts[1], counts[2]
        );
        let recent: Vec<&str> = trends.iter().rev().take(10).rev().map(|t| t.as_str()).collect();
        eprintln!("  Last {}: {}", recent.len(), recent.join(" "));

        if let Some(sd) = data
            .len()
            .checked_sub(1)
            .and_then(|last| data.simple_at(CLOSE_STDDEV, last))
        {
            eprintln!("  {CLOSE_STDDEV} of closes: {sd:.4}");
        }

        if let Some(market) = classify_market(&data.candles) {
            eprintln!(
                "  Market: {} ({:+.2}% from {:.4} to {:.4}, volatility {:.3}%)",
                market.regime,
                market.total_change_pct,
                market.first_close,
                market.last_close,
                market.volatility_pct
            );
            for (bars, change) in &market.period_changes {
                eprintln!("    last {bars:>3} bars: {change:+.2}%");
            }
        }
    }
    status
}

fn run_info(args: &DataArgs) -> ExitCode {
    let (_config, port, symbols, interval) = match open_for_analysis(args) {
        Ok(v) => v,
        Err(e) => return fail(e),
    };
    for symbol in &symbols {
        match port.get_data_range(symbol, interval) {
            Ok(Some((first, last, count))) => {
                println!("{symbol} {interval}: {count} candles, {first} to {last}");
            }
            Ok(None) => eprintln!("{symbol} {interval}: no data found"),
            Err(e) => eprintln!("error querying {symbol}: {e}"),
        }
    }
    ExitCode::SUCCESS
}

fn run_list_symbols(args: &DataArgs) -> ExitCode {
    let config = match load_with_overrides(args) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let port = match open_data_port(&config) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };
    match port.list_symbols() {
        Ok(symbols) if symbols.is_empty() => {
            eprintln!("No symbols found");
            ExitCode::SUCCESS
        }
        Ok(symbols) => {
            for symbol in &symbols {
                println!("{symbol}");
            }
            eprintln!("{} symbols found", symbols.len());
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

#[cfg(feature = "binance")]
fn run_fetch(args: &DataArgs) -> ExitCode {
    use crate::adapters::binance_adapter::{BinanceAdapter, DEFAULT_BASE_URL};

    let config = match load_with_overrides(args) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let interval = match resolve_interval(&config) {
        Ok(i) => i,
        Err(e) => return fail(e),
    };
    let (start, end) = match resolve_range(&config) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };
    let symbols = resolve_symbols(&config);
    if symbols.is_empty() {
        return fail(TraderError::ConfigMissing {
            section: "data".into(),
            key: "symbols".into(),
        });
    }
    let base_url = config
        .get_string("data", "base_url")
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let binance = match BinanceAdapter::new(&base_url) {
        Ok(b) => b,
        Err(e) => return fail(e),
    };
    let store = CsvAdapter::new(PathBuf::from(
        config
            .get_string("data", "data_dir")
            .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
    ));

    let mut status = ExitCode::SUCCESS;
    for symbol in &symbols {
        let written = binance
            .fetch_klines(symbol, interval, start, end)
            .and_then(|candles| {
                let n = candles.len();
                store.write_klines(symbol, interval, &candles).map(|p| (p, n))
            });
        match written {
            Ok((path, n)) => println!("{symbol} {interval}: {n} candles -> {}", path.display()),
            Err(e) => {
                eprintln!("error: {symbol}: {e}");
                status = ExitCode::from(&e);
            }
        }
    }
    status
}

#[cfg(feature = "live")]
fn run_live(args: &DataArgs, warmup: usize) -> ExitCode {
    use crate::adapters::binance_adapter::{BinanceAdapter, DEFAULT_BASE_URL, KLINE_LIMIT};
    use crate::adapters::kline_stream::{run_with_reconnect, stream_url, LiveFeed};

    let config = match load_with_overrides(args) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    if let Err(e) = validate_all(&config) {
        return fail(e);
    }
    let interval = match resolve_interval(&config) {
        Ok(i) => i,
        Err(e) => return fail(e),
    };
    let Some(symbol) = resolve_symbols(&config).into_iter().next() else {
        return fail(TraderError::ConfigMissing {
            section: "data".into(),
            key: "symbols".into(),
        });
    };
    let bt_config = match build_backtest_config(&config, interval) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let strategy = match build_strategy(&config) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    let base_url = config
        .get_string("data", "base_url")
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let history = match BinanceAdapter::new(&base_url)
        .and_then(|b| b.recent_klines(&symbol, interval, warmup.min(KLINE_LIMIT)))
    {
        Ok(h) => h,
        Err(e) => return fail(e),
    };

    let now = chrono::Utc::now().naive_utc();
    let mut feed = LiveFeed::new(&symbol, history, strategy, &bt_config, now);
    eprintln!(
        "Warmed up {symbol} {interval} with {} candles, streaming (Ctrl-C to stop)",
        feed.data.len()
    );

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(r) => r,
        Err(e) => return fail(TraderError::Io(e)),
    };
    let url = stream_url(&symbol, interval);
    runtime.block_on(run_with_reconnect(&url, &mut feed));
    ExitCode::SUCCESS
}
