use std::collections::HashMap;
use std::fmt::Debug;

use anyhow::{anyhow, Result};
use chrono::Utc;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Level, Subscriber};
use tracing_error::ErrorLayer;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::Context;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

const RUN_ID: &str = "run_id";
const WORKER_ID: &str = "worker_id";
const UNIT: &str = "unit";

const DIM: &str = "\x1b[90m";
const RESET: &str = "\x1b[0m";

/// Run, worker and unit of the innermost span that knows them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitColumns {
    values: HashMap<&'static str, String>,
}

impl UnitColumns {
    fn set(&mut self, field: &Field, value: String) {
        let Some(column) = [RUN_ID, WORKER_ID, UNIT].into_iter().find(|c| *c == field.name()) else { return };
        self.values.insert(column, value);
    }

    fn get(&self, column: &str) -> &str {
        self.values.get(column).map_or("-", String::as_str)
    }

    /// Short form of the run id, enough to tell runs apart in one log file
    fn run(&self) -> &str {
        let run = self.get(RUN_ID);
        run.get(..8).unwrap_or(run)
    }

    fn inherit(&mut self, parent: &UnitColumns) {
        for (column, value) in &parent.values {
            self.values.entry(*column).or_insert_with(|| value.clone());
        }
    }
}

impl Visit for UnitColumns {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.set(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
        self.set(field, format!("{:?}", value).trim_matches('"').to_string());
    }
}

/// Keeps the [`UnitColumns`] of every span in its extensions. A `unit` span opens inside
/// the `run` span and inherits its run id.
pub struct UnitColumnLayer;

impl<S> Layer<S> for UnitColumnLayer
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };

        let mut columns = UnitColumns::default();
        attrs.record(&mut columns);
        if let Some(parent) = span.parent() {
            if let Some(inherited) = parent.extensions().get::<UnitColumns>() {
                columns.inherit(inherited);
            }
        }
        span.extensions_mut().insert(columns);
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };
        let mut extensions = span.extensions_mut();
        match extensions.get_mut::<UnitColumns>() {
            Some(columns) => values.record(columns),
            None => {
                let mut columns = UnitColumns::default();
                values.record(&mut columns);
                extensions.insert(columns);
            }
        }
    }
}

/// Message and the remaining fields of one event
#[derive(Default)]
struct EventText {
    message: String,
    fields: Vec<String>,
}

impl Visit for EventText {
    fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
        let value = format!("{:?}", value).trim_matches('"').to_string();
        if field.name() == "message" {
            self.message = value;
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }
}

/// Console lines: `time | level | run | worker | unit | message (fields)`.
pub struct UnitLineFormatter;

impl<S, N> FormatEvent<S, N> for UnitLineFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(&self, ctx: &FmtContext<'_, S, N>, mut writer: Writer<'_>, event: &Event<'_>) -> std::fmt::Result {
        let columns = ctx
            .lookup_current()
            .and_then(|span| span.extensions().get::<UnitColumns>().cloned())
            .unwrap_or_default();
        let mut text = EventText::default();
        event.record(&mut text);

        let level = *event.metadata().level();
        let level_color = match level {
            Level::TRACE => DIM,
            Level::DEBUG => "\x1b[34m",
            Level::INFO => "\x1b[32m",
            Level::WARN => "\x1b[33m",
            Level::ERROR => "\x1b[31m",
        };
        let bar = format!("{DIM}|{RESET}");

        write!(writer, "\x1b[96m{}{RESET} {bar} ", Utc::now().format("%y-%m-%d %H:%M:%S"))?;
        write!(writer, "{level_color}{:<5}{RESET} {bar} ", level)?;
        write!(writer, "{DIM}{:<8}{RESET} {bar} ", columns.run())?;
        write!(writer, "\x1b[92m{:<9}{RESET} {bar} ", columns.get(WORKER_ID))?;
        write!(writer, "\x1b[92m{:<32}{RESET} {bar} ", truncate(columns.get(UNIT), 32))?;
        write!(writer, "\x1b[97m{}{RESET}", text.message)?;
        if !text.fields.is_empty() {
            write!(writer, " {DIM}({}){RESET}", text.fields.join(", "))?;
        }
        writeln!(writer)
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let head: String = text.chars().take(width.saturating_sub(1)).collect();
    format!("{}…", head)
}

/// Install the global subscriber and color_eyre's panic report.
///
/// `LOG_FORMAT=json` switches to one JSON object per event, carrying the current span
/// and its ancestors so `run_id`, `worker_id` and `unit` stay queryable.
pub fn init_logging() -> Result<()> {
    color_eyre::install().map_err(|e| anyhow!("Unable to install color_eyre: {}", e))?;

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::builder().with_default_directive(Level::INFO.into()).parse("geosparql_etl=info")?,
    };

    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format == "json");
    let fmt_layer = if json {
        fmt::layer().json().with_current_span(true).with_span_list(true).with_file(true).with_line_number(true).boxed()
    } else {
        fmt::layer().event_format(UnitLineFormatter).boxed()
    };

    let subscriber =
        Registry::default().with(env_filter).with(UnitColumnLayer).with(fmt_layer).with(ErrorLayer::default());
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::info_span;

    #[test]
    fn long_unit_keys_are_shortened() {
        assert_eq!(truncate("seg::TCGA", 32), "seg::TCGA");
        let cut = truncate(&"x".repeat(40), 10);
        assert_eq!(cut.chars().count(), 10);
        assert!(cut.ends_with('…'));
    }

    #[test]
    fn unit_spans_inherit_the_run_id() {
        let subscriber = Registry::default().with(UnitColumnLayer);
        tracing::subscriber::with_default(subscriber, || {
            let run = info_span!("run", run_id = "0f1e2d3c-aaaa-bbbb");
            let _run = run.enter();
            let unit = info_span!("unit", unit = "seg-v1::TCGA-01", worker_id = "worker_1", attempt = 2);
            let _unit = unit.enter();

            tracing::dispatcher::get_default(|dispatch| {
                let registry = dispatch.downcast_ref::<Registry>().unwrap();
                let id = unit.id().unwrap();
                let span = registry.span(&id).unwrap();
                let extensions = span.extensions();
                let columns = extensions.get::<UnitColumns>().unwrap();
                assert_eq!(columns.run(), "0f1e2d3c");
                assert_eq!(columns.get(UNIT), "seg-v1::TCGA-01");
                assert_eq!(columns.get(WORKER_ID), "worker_1");
                assert_eq!(columns.values.len(), 3);
            });
        });
    }

    #[test]
    fn missing_columns_print_as_dashes() {
        let columns = UnitColumns::default();
        assert_eq!(columns.run(), "-");
        assert_eq!(columns.get(UNIT), "-");
    }
}
