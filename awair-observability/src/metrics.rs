use awair_core::Reading;
use chrono::Utc;
use prometheus::{Gauge, IntCounterVec, IntGauge, Opts, Registry};

use crate::prometheus_exporter::render_metrics;

pub const NAMESPACE: &str = "awair";
pub const CLIMATE_SUBSYSTEM: &str = "climate";
pub const EXPORTER_SUBSYSTEM: &str = "exporter";

/// One gauge per field of the device reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClimateField {
    Temp,
    RelativeHumidity,
    Co2,
    Voc,
    Pm25,
    Score,
    DewPoint,
    AbsoluteHumidity,
    Co2Estimate,
    Co2EstimateBaseline,
    VocBaseline,
    VocH2Raw,
    VocEthanolRaw,
    Pm10Estimate,
}

impl ClimateField {
    pub const ALL: [ClimateField; 14] = [
        ClimateField::Temp,
        ClimateField::RelativeHumidity,
        ClimateField::Co2,
        ClimateField::Voc,
        ClimateField::Pm25,
        ClimateField::Score,
        ClimateField::DewPoint,
        ClimateField::AbsoluteHumidity,
        ClimateField::Co2Estimate,
        ClimateField::Co2EstimateBaseline,
        ClimateField::VocBaseline,
        ClimateField::VocH2Raw,
        ClimateField::VocEthanolRaw,
        ClimateField::Pm10Estimate,
    ];

    /// Metric name without namespace and subsystem.
    pub fn name(self) -> &'static str {
        match self {
            ClimateField::Temp => "temp_c",
            ClimateField::RelativeHumidity => "relative_humidity",
            ClimateField::Co2 => "co2_ppm",
            ClimateField::Voc => "voc_ppb",
            ClimateField::Pm25 => "pm25_ug_m3",
            ClimateField::Score => "score",
            ClimateField::DewPoint => "dew_point_c",
            ClimateField::AbsoluteHumidity => "absolute_humidity",
            ClimateField::Co2Estimate => "co2_estimate",
            ClimateField::Co2EstimateBaseline => "co2_estimate_baselines",
            ClimateField::VocBaseline => "voc_baseline",
            ClimateField::VocH2Raw => "voc_h2_raw",
            ClimateField::VocEthanolRaw => "voc_ethanol_raw",
            ClimateField::Pm10Estimate => "pm10_estimate",
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            ClimateField::Temp => "Dry bulb temperature (ºC)",
            ClimateField::RelativeHumidity => "Relative Humidity (%)",
            ClimateField::Co2 => "Carbon Dioxide (ppm)",
            ClimateField::Voc => "Total Volatile Organic Compounds (ppb)",
            ClimateField::Pm25 => "Particulate matter less than 2.5 microns in diameter (µg/m³)",
            ClimateField::Score => "Awair Score (0-100)",
            ClimateField::DewPoint => {
                "The temperature at which water will condense and form into dew (ºC)"
            }
            ClimateField::AbsoluteHumidity => "Absolute Humidity (g/m³)",
            ClimateField::Co2Estimate => {
                "Estimated Carbon Dioxide (ppm - calculated by the TVOC sensor)"
            }
            ClimateField::Co2EstimateBaseline => {
                "A unitless value that represents the baseline from which the TVOC sensor partially derives its estimated (e)CO₂output."
            }
            ClimateField::VocBaseline => {
                "A unitless value that represents the baseline from which the TVOC sensor partially derives its TVOC output."
            }
            ClimateField::VocH2Raw => {
                "A unitless value that represents the Hydrogen gas signal from which the TVOC sensor partially derives its TVOC output."
            }
            ClimateField::VocEthanolRaw => {
                "A unitless value that represents the Ethanol gas signal from which the TVOC sensor partially derives its TVOC output."
            }
            ClimateField::Pm10Estimate => {
                "Estimated particulate matter less than 10 microns in diameter (µg/m³ - calculated by the PM2.5 sensor)"
            }
        }
    }

    /// Fully-qualified name as it appears on `/metrics`.
    pub fn full_name(self) -> String {
        format!("{NAMESPACE}_{CLIMATE_SUBSYSTEM}_{}", self.name())
    }

    /// Pick this field out of a reading; integer fields widen to f64.
    pub fn value(self, r: &Reading) -> f64 {
        match self {
            ClimateField::Temp => r.temp,
            ClimateField::RelativeHumidity => r.humid,
            ClimateField::Co2 => r.co2 as f64,
            ClimateField::Voc => r.voc as f64,
            ClimateField::Pm25 => r.pm25 as f64,
            ClimateField::Score => r.score as f64,
            ClimateField::DewPoint => r.dew_point,
            ClimateField::AbsoluteHumidity => r.abs_humid,
            ClimateField::Co2Estimate => r.co2_est as f64,
            ClimateField::Co2EstimateBaseline => r.co2_est_baseline as f64,
            ClimateField::VocBaseline => r.voc_baseline as f64,
            ClimateField::VocH2Raw => r.voc_h2_raw as f64,
            ClimateField::VocEthanolRaw => r.voc_ethanol_raw as f64,
            ClimateField::Pm10Estimate => r.pm10_est as f64,
        }
    }
}

/// The exporter's registry: climate gauges plus poll health.
///
/// Built once at start-up and shared by handle. Every gauge is an
/// independent atomic, so `record` and `render` never block each other; a
/// render racing a `record` can see a mix of old and new fields.
pub struct ClimateMetrics {
    registry: Registry,
    gauges: Vec<Gauge>,
    pub up: IntGauge,
    pub last_success: Gauge,
    pub polls_total: IntCounterVec,
}

impl ClimateMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let gauges = ClimateField::ALL
            .iter()
            .map(|field| register_gauge(&registry, field.name(), field.help()))
            .collect::<anyhow::Result<Vec<_>>>()?;

        let up = IntGauge::with_opts(
            Opts::new("up", "Whether the most recent poll of the device succeeded (1) or not (0)")
                .namespace(NAMESPACE)
                .subsystem(EXPORTER_SUBSYSTEM),
        )?;
        let last_success = Gauge::with_opts(
            Opts::new(
                "last_success_timestamp_seconds",
                "Unix time of the last successful poll of the device",
            )
            .namespace(NAMESPACE)
            .subsystem(EXPORTER_SUBSYSTEM),
        )?;
        let polls_total = IntCounterVec::new(
            Opts::new("polls_total", "Device polls by result")
                .namespace(NAMESPACE)
                .subsystem(EXPORTER_SUBSYSTEM),
            &["result"],
        )?;

        registry.register(Box::new(up.clone()))?;
        registry.register(Box::new(last_success.clone()))?;
        registry.register(Box::new(polls_total.clone()))?;

        // Pre-create both series so they show up before the first poll.
        polls_total.with_label_values(&["success"]);
        polls_total.with_label_values(&["failure"]);

        #[cfg(target_os = "linux")]
        registry.register(Box::new(prometheus::process_collector::ProcessCollector::for_self()))?;

        Ok(Self {
            registry,
            gauges,
            up,
            last_success,
            polls_total,
        })
    }

    pub fn gauge(&self, field: ClimateField) -> &Gauge {
        &self.gauges[field as usize]
    }

    /// Overwrite every climate gauge with `reading` and mark the poll good.
    pub fn record(&self, reading: &Reading) {
        for field in ClimateField::ALL {
            self.gauge(field).set(field.value(reading));
        }
        self.up.set(1);
        self.last_success
            .set(Utc::now().timestamp_millis() as f64 / 1000.0);
        self.polls_total.with_label_values(&["success"]).inc();
    }

    /// A failed poll leaves the climate gauges untouched.
    pub fn record_failure(&self) {
        self.up.set(0);
        self.polls_total.with_label_values(&["failure"]).inc();
    }

    pub fn is_up(&self) -> bool {
        self.up.get() == 1
    }

    /// Render prometheus text exposition format.
    pub fn render(&self) -> String {
        render_metrics(&self.registry)
    }
}

/// Register one `awair_climate_*` gauge.
pub fn register_gauge(registry: &Registry, name: &str, help: &str) -> anyhow::Result<Gauge> {
    let gauge = Gauge::with_opts(
        Opts::new(name, help)
            .namespace(NAMESPACE)
            .subsystem(CLIMATE_SUBSYSTEM),
    )?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_reading() -> Reading {
        Reading {
            score: 88,
            dew_point: 9.75,
            temp: 21.5,
            humid: 45.25,
            abs_humid: 8.5,
            co2: 612,
            co2_est: 401,
            co2_est_baseline: 37135,
            voc: 214,
            voc_baseline: 37664,
            voc_h2_raw: 25,
            voc_ethanol_raw: 37,
            pm25: 4,
            pm10_est: 5,
            ..Reading::default()
        }
    }

    // ── Registration ─────────────────────────────────────────────

    #[test]
    fn fresh_registry_renders_all_climate_gauges_at_zero() {
        let mc = ClimateMetrics::new().unwrap();
        let output = mc.render();
        for field in ClimateField::ALL {
            let line = format!("{} 0\n", field.full_name());
            assert!(output.contains(&line), "missing {line:?} in:\n{output}");
        }
        assert!(output.contains("awair_exporter_up 0"));
        assert!(!mc.is_up());
    }

    #[test]
    fn gauge_names_are_unique() {
        let mut names: Vec<_> = ClimateField::ALL.iter().map(|f| f.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ClimateField::ALL.len());
    }

    #[test]
    fn field_order_matches_gauge_index() {
        for (i, field) in ClimateField::ALL.iter().enumerate() {
            assert_eq!(*field as usize, i);
        }
    }

    #[test]
    fn registering_a_name_twice_fails() {
        let registry = Registry::new();
        register_gauge(&registry, "temp_c", "Dry bulb temperature (ºC)").unwrap();
        assert!(register_gauge(&registry, "temp_c", "Dry bulb temperature (ºC)").is_err());
    }

    #[test]
    fn independent_registries_do_not_collide() {
        let a = ClimateMetrics::new().unwrap();
        let b = ClimateMetrics::new().unwrap();
        a.gauge(ClimateField::Co2).set(500.0);
        assert_eq!(b.gauge(ClimateField::Co2).get(), 0.0);
    }

    // ── record() ─────────────────────────────────────────────────

    #[test]
    fn record_sets_every_gauge_from_reading() {
        let mc = ClimateMetrics::new().unwrap();
        let reading = sample_reading();
        mc.record(&reading);

        assert_eq!(mc.gauge(ClimateField::Temp).get(), 21.5);
        assert_eq!(mc.gauge(ClimateField::RelativeHumidity).get(), 45.25);
        assert_eq!(mc.gauge(ClimateField::Co2).get(), 612.0);
        assert_eq!(mc.gauge(ClimateField::Voc).get(), 214.0);
        assert_eq!(mc.gauge(ClimateField::Pm25).get(), 4.0);
        assert_eq!(mc.gauge(ClimateField::Score).get(), 88.0);
        assert_eq!(mc.gauge(ClimateField::DewPoint).get(), 9.75);
        assert_eq!(mc.gauge(ClimateField::AbsoluteHumidity).get(), 8.5);
        assert_eq!(mc.gauge(ClimateField::Co2Estimate).get(), 401.0);
        assert_eq!(mc.gauge(ClimateField::Co2EstimateBaseline).get(), 37135.0);
        assert_eq!(mc.gauge(ClimateField::VocBaseline).get(), 37664.0);
        assert_eq!(mc.gauge(ClimateField::VocH2Raw).get(), 25.0);
        assert_eq!(mc.gauge(ClimateField::VocEthanolRaw).get(), 37.0);
        assert_eq!(mc.gauge(ClimateField::Pm10Estimate).get(), 5.0);
        assert!(mc.is_up());
        assert!(mc.last_success.get() > 0.0);
    }

    #[test]
    fn sparse_reading_zeroes_absent_fields() {
        let mc = ClimateMetrics::new().unwrap();
        mc.record(&sample_reading());

        let sparse = Reading {
            temp: 21.5,
            co2: 612,
            score: 88,
            ..Reading::default()
        };
        mc.record(&sparse);

        for field in ClimateField::ALL {
            let expected = match field {
                ClimateField::Temp => 21.5,
                ClimateField::Co2 => 612.0,
                ClimateField::Score => 88.0,
                _ => 0.0,
            };
            assert_eq!(mc.gauge(field).get(), expected, "{}", field.name());
        }
    }

    #[test]
    fn recording_same_reading_twice_is_idempotent() {
        let mc = ClimateMetrics::new().unwrap();
        let reading = sample_reading();
        mc.record(&reading);
        let first: Vec<f64> = ClimateField::ALL.iter().map(|f| mc.gauge(*f).get()).collect();
        mc.record(&reading);
        let second: Vec<f64> = ClimateField::ALL.iter().map(|f| mc.gauge(*f).get()).collect();
        assert_eq!(first, second);
    }

    // ── record_failure() ─────────────────────────────────────────

    #[test]
    fn failure_keeps_previous_values() {
        let mc = ClimateMetrics::new().unwrap();
        mc.record(&Reading {
            co2: 500,
            ..Reading::default()
        });
        let stamp = mc.last_success.get();

        mc.record_failure();

        assert_eq!(mc.gauge(ClimateField::Co2).get(), 500.0);
        assert_eq!(mc.last_success.get(), stamp);
        assert!(!mc.is_up());
    }

    #[test]
    fn poll_counters_split_by_result() {
        let mc = ClimateMetrics::new().unwrap();
        mc.record(&sample_reading());
        mc.record_failure();
        mc.record_failure();

        assert_eq!(mc.polls_total.with_label_values(&["success"]).get(), 1);
        assert_eq!(mc.polls_total.with_label_values(&["failure"]).get(), 2);
        let output = mc.render();
        assert!(output.contains(r#"awair_exporter_polls_total{result="failure"} 2"#));
    }

    // ── Rendering ────────────────────────────────────────────────

    #[test]
    fn render_contains_help_text() {
        let mc = ClimateMetrics::new().unwrap();
        let output = mc.render();
        assert!(output.contains("# HELP awair_climate_score Awair Score (0-100)"));
        assert!(output.contains("# TYPE awair_climate_co2_ppm gauge"));
    }

    #[test]
    fn render_reflects_latest_values() {
        let mc = ClimateMetrics::new().unwrap();
        mc.record(&Reading {
            temp: 21.5,
            co2: 612,
            score: 88,
            ..Reading::default()
        });
        let output = mc.render();
        assert!(output.contains("awair_climate_temp_c 21.5\n"));
        assert!(output.contains("awair_climate_co2_ppm 612\n"));
        assert!(output.contains("awair_climate_score 88\n"));
        assert!(output.contains("awair_climate_voc_ppb 0\n"));
    }

    #[test]
    fn concurrent_record_and_render_do_not_block() {
        use std::sync::Arc;

        let mc = Arc::new(ClimateMetrics::new().unwrap());
        let writer = {
            let mc = Arc::clone(&mc);
            std::thread::spawn(move || {
                for i in 0..500 {
                    mc.record(&Reading {
                        co2: i,
                        ..Reading::default()
                    });
                }
            })
        };
        for _ in 0..50 {
            assert!(mc.render().contains("awair_climate_co2_ppm"));
        }
        writer.join().unwrap();
        assert_eq!(mc.gauge(ClimateField::Co2).get(), 499.0);
    }
}
