// Line-protocol front end: commands on stdin, render commands on stdout.
// Logs go to stderr so they never interleave with protocol output.
use anyhow::anyhow;
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use units_core::core::converter::format_value;
use units_core::core::types::{MultiResult, UnitDef};
use units_core::history::HistoryEntry;
use units_core::rates::{HttpRateSource, RateStatus};
use units_core::view::{Renderer, ViewController, ViewMode};
use units_core::{Category, Config, ConverterEngine};

const TICK: Duration = Duration::from_millis(100);

#[derive(Parser)]
#[command(name = "converter_sim", about = "Unit converter driven over stdin/stdout")]
struct Args {
    #[arg(long)]
    data_dir: Option<PathBuf>,
    #[arg(long)]
    rates_url: Option<String>,
    #[arg(long)]
    offline: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let args = Args::parse();
    let config = Config::from_env()?.with_overrides(args.data_dir, args.rates_url, args.offline);
    log::info!("--- Unit converter engine starting ({}) ---", config.data_dir.display());

    let mut engine = ConverterEngine::from_config(&config)?;
    let updater = engine
        .rate_updater()
        .ok_or_else(|| anyhow!("rate updater already taken"))?;
    let mut view = ViewController::new(engine, ProtocolRenderer::default());
    view.start();

    let mut rates_task: Option<JoinHandle<RateStatus>> = if config.offline {
        view.rates_updated(updater.load_cached().unwrap_or(RateStatus::Offline));
        None
    } else {
        Some(updater.spawn(HttpRateSource::new(config.rates_url.clone())))
    };

    let mut stdout = io::stdout();
    view.renderer_mut().flush(&mut stdout)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(TICK);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(input) = line? else { break };
                log::debug!("<- {:?}", input);
                if !handle_line(&mut view, &input) {
                    log::info!("Received EXIT");
                    break;
                }
            }
            _ = ticker.tick() => {
                view.tick();
            }
            status = wait_for_rates(&mut rates_task) => {
                log::info!("Rates: {}", status.indicator());
                view.rates_updated(status);
            }
        }
        view.renderer_mut().flush(&mut stdout)?;
    }

    log::info!("Shutting down.");
    Ok(())
}

async fn wait_for_rates(task: &mut Option<JoinHandle<RateStatus>>) -> RateStatus {
    let Some(handle) = task else {
        return std::future::pending().await;
    };
    let status = handle.await.unwrap_or(RateStatus::Offline);
    *task = None;
    status
}

/// Returns false on EXIT.
fn handle_line(view: &mut ViewController<ProtocolRenderer>, line: &str) -> bool {
    let (command, arg) = line.split_once(' ').unwrap_or((line, ""));

    let result = match command {
        "EXIT" => return false,
        "CATEGORY" => arg
            .parse::<Category>()
            .map(|category| view.switch_category(category))
            .map_err(|e| e.to_string()),
        "INPUT" => {
            view.set_input(arg);
            Ok(())
        }
        "FROM" => view.set_from(arg.trim()).map_err(|e| e.to_string()),
        "TO" => view.set_to(arg.trim()).map_err(|e| e.to_string()),
        "SWAP" => {
            view.swap_units();
            Ok(())
        }
        "VIEW" => {
            let mode = match arg.trim() {
                "single" => Ok(ViewMode::Single),
                "multi" => Ok(ViewMode::Multi),
                other => Err(format!("unknown view '{}'", other)),
            };
            mode.map(|mode| view.set_view(mode))
        }
        "CLEAR_HISTORY" => {
            view.clear_history();
            Ok(())
        }
        "THEME" => match view.engine_mut().toggle_theme() {
            Ok(theme) => {
                view.renderer_mut().push(format!("THEME {}", theme.as_str()));
                Ok(())
            }
            Err(e) => Err(e.to_string()),
        },
        _ => Err(format!("unknown command '{}'", command)),
    };

    if let Err(message) = result {
        log::warn!("{}", message);
        view.renderer_mut().push(format!("ERROR {}", message));
    }
    true
}

/// Buffers protocol lines until the event loop flushes them.
#[derive(Default)]
struct ProtocolRenderer {
    pending: Vec<String>,
}

impl ProtocolRenderer {
    fn push(&mut self, line: String) {
        log::debug!("-> {:?}", line);
        self.pending.push(line);
    }

    fn flush(&mut self, out: &mut impl Write) -> io::Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        for line in self.pending.drain(..) {
            writeln!(out, "{}", line)?;
        }
        out.flush()
    }
}

impl Renderer for ProtocolRenderer {
    fn category_title(&mut self, title: &str) {
        self.push(format!("TITLE {}", title));
    }

    fn populate_units(&mut self, category: Category, units: &[UnitDef], from: &str, to: &str) {
        self.push(format!("UNITS {} {} {}", category, from, to));
        for unit in units {
            self.push(format!("UNIT {} {}", unit.key, unit.label));
        }
    }

    fn render_input(&mut self, text: &str) {
        self.push(format!("INPUT {}", text));
    }

    fn render_single(&mut self, value: Option<f64>) {
        match value {
            Some(v) => self.push(format!("RESULT {}", format_value(v))),
            None => self.push("RESULT".to_string()),
        }
    }

    fn render_multi(&mut self, results: Option<&[MultiResult]>) {
        self.push("MULTI_BEGIN".to_string());
        for r in results.unwrap_or_default() {
            let source = if r.is_source { 1 } else { 0 };
            self.push(format!("MULTI {} {} {} {}", r.key, format_value(r.value), source, r.label));
        }
        self.push("MULTI_END".to_string());
    }

    fn render_history(&mut self, entries: &[HistoryEntry]) {
        self.push(format!("HISTORY_BEGIN {}", entries.len()));
        for e in entries {
            self.push(format!(
                "HISTORY {}\t{}\t{}\t{}\t{}\t{}",
                format_value(e.input_value),
                e.input_unit,
                format_value(e.output_value),
                e.output_unit,
                e.timestamp,
                e.category_label
            ));
        }
        self.push("HISTORY_END".to_string());
    }

    fn rate_indicator(&mut self, message: Option<&str>) {
        match message {
            Some(m) => self.push(format!("RATES {}", m)),
            None => self.push("RATES_HIDE".to_string()),
        }
    }
}
