//! Logging setup and the JSON line format.
//!
//! JSON format:
//! ```json
//! {"ts":"2026-10-19T15:04:05.123Z","level":"info","type":"access","msg":"GET /hello 200","ctx":{"service":"leaf_http","request_id":"…"},"data":{"status":200}}
//! ```

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde_json::{json, Map, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

/// Target of per-request access events.
pub const ACCESS_TARGET: &str = "access";

/// Install the global subscriber, writing to stderr.
///
/// Fails when a subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_new(&config.filter)?;

    match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .event_format(JsonFormatter::new(config.service_name.clone())),
            )
            .try_init()?,
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()?,
    }

    Ok(())
}

/// One access log record.
#[derive(Debug, Clone)]
pub struct AccessRecord<'a> {
    pub request_id: &'a str,
    pub ip: Option<&'a str>,
    pub method: &'a str,
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub http: &'a str,
    pub status: u16,
    pub bytes: u64,
    pub duration_ms: f64,
    pub halted: bool,
}

/// Write one access event.
pub fn log_access(record: &AccessRecord<'_>) {
    tracing::info!(
        target: ACCESS_TARGET,
        request_id = record.request_id,
        ip = record.ip.unwrap_or("-"),
        method = record.method,
        path = record.path,
        query = record.query.unwrap_or(""),
        http = record.http,
        status = record.status,
        bytes = record.bytes,
        duration_ms = record.duration_ms,
        halted = record.halted,
    );
}

/// Formats events as single-line JSON objects.
pub struct JsonFormatter {
    service_name: String,
}

impl JsonFormatter {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    /// Build the JSON entry for an event's collected fields.
    fn entry(&self, ts: &str, level: &Level, target: &str, fields: FieldVisitor) -> Value {
        let log_type = if target == ACCESS_TARGET {
            "access"
        } else if *level == Level::ERROR {
            "error"
        } else {
            "app"
        };

        let FieldVisitor {
            message,
            mut fields,
        } = fields;

        let msg = if log_type == "access" {
            let status = fields.get("status").and_then(Value::as_u64).unwrap_or(0);
            format!(
                "{} {} {}",
                field_str(&fields, "method"),
                field_str(&fields, "path"),
                status
            )
        } else {
            message.unwrap_or_default()
        };

        let mut ctx = Map::new();
        ctx.insert("service".into(), json!(self.service_name));
        if let Some(id) = fields.remove("request_id") {
            ctx.insert("request_id".into(), id);
        }

        json!({
            "ts": ts,
            "level": level_name(level),
            "type": log_type,
            "msg": msg,
            "ctx": ctx,
            "data": fields,
        })
    }
}

impl<S, N> FormatEvent<S, N> for JsonFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let ts = Iso8601Timestamp::now();
        let entry = self.entry(ts.as_str(), meta.level(), meta.target(), visitor);

        writeln!(writer, "{}", entry)
    }
}

#[inline]
fn field_str<'a>(fields: &'a Map<String, Value>, key: &str) -> &'a str {
    fields.get(key).and_then(Value::as_str).unwrap_or("?")
}

#[inline]
fn level_name(level: &Level) -> &'static str {
    match *level {
        Level::TRACE | Level::DEBUG => "debug",
        Level::INFO => "info",
        Level::WARN => "warn",
        Level::ERROR => "error",
    }
}

/// Collects event fields; `message` is kept apart.
#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: Map<String, Value>,
}

impl FieldVisitor {
    fn put(&mut self, field: &Field, value: Value) {
        self.fields.insert(field.name().to_string(), value);
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let text = format!("{:?}", value);
        if field.name() == "message" {
            self.message = Some(text);
        } else {
            self.put(field, Value::String(text));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.put(field, json!(value));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, json!(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, json!(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.put(field, json!(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, json!(value));
    }
}

/// UTC timestamp with milliseconds: "2024-01-15T10:30:00.123Z".
#[derive(Clone, Copy)]
pub struct Iso8601Timestamp {
    buf: [u8; 24],
}

impl Iso8601Timestamp {
    #[inline]
    pub fn now() -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self::from_duration(now)
    }

    /// Create from a duration since the Unix epoch.
    pub fn from_duration(since_epoch: Duration) -> Self {
        let secs = since_epoch.as_secs();
        let (year, month, day) = civil_from_days(secs / 86_400);
        let day_secs = secs % 86_400;

        let mut buf = [0u8; 24];
        put_digits(&mut buf[0..4], year);
        buf[4] = b'-';
        put_digits(&mut buf[5..7], month);
        buf[7] = b'-';
        put_digits(&mut buf[8..10], day);
        buf[10] = b'T';
        put_digits(&mut buf[11..13], day_secs / 3600);
        buf[13] = b':';
        put_digits(&mut buf[14..16], (day_secs % 3600) / 60);
        buf[16] = b':';
        put_digits(&mut buf[17..19], day_secs % 60);
        buf[19] = b'.';
        put_digits(&mut buf[20..23], u64::from(since_epoch.subsec_millis()));
        buf[23] = b'Z';

        Self { buf }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.buf).unwrap_or("")
    }
}

impl fmt::Display for Iso8601Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Iso8601Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Days since 1970-01-01 to (year, month, day), proleptic Gregorian.
fn civil_from_days(days: u64) -> (u64, u64, u64) {
    let z = days + 719_468;
    let era = z / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + u64::from(month <= 2);
    (year, month, day)
}

/// Write `value` as zero-padded decimal filling `out`.
#[inline]
fn put_digits(out: &mut [u8], mut value: u64) {
    for slot in out.iter_mut().rev() {
        *slot = b'0' + (value % 10) as u8;
        value /= 10;
    }
}
