//! # Derived Signals
//!
//! Values that never appear on the bus but are computed from cached raw
//! signals: composed date and time, the summer/normal operating label, the heat
//! pump's flow/return delta T, a compressor-running flag and three COP ratios.
//!
//! Hot signals are recognised by a compile-time DJB2 hash of their name, so
//! dispatching a decoded reply costs one hash and one string comparison.
//!
//! ```rust
//! use elster_rs::derived::{DerivedEngine, HotSignal};
//!
//! assert_eq!(HotSignal::from_name("WPVORLAUFIST"), Some(HotSignal::WpVorlaufIst));
//! assert_eq!(HotSignal::from_name("AUSSENTEMP"), None);
//!
//! let mut engine = DerivedEngine::new(0.001, 200, 1000);
//! engine.on_signal("EL_AUFNAHMELEISTUNG_WW_SUM_MWH", "1.000");
//! engine.on_signal("WAERMEERTRAG_WW_SUM_MWH", "2.500");
//! let out = engine.on_signal("WAERMEERTRAG_2WE_WW_SUM_MWH", "0.300");
//! assert_eq!(out[0].sensor.key, "cop_ww");
//! assert_eq!(out[0].value, "2.80");
//! ```

use crate::constants::{
    COMPRESSOR_ACTIVE_LEVEL, COMPRESSOR_PERIOD_MS, COP_DECIMAL_PLACES, DATETIME_PERIOD_MS,
    DELTA_T_MIN_TEMPERATURE, DELTA_T_PERIOD_MS, PAYLOAD_OFF, PAYLOAD_ON,
};
use crate::logging::log_info;
use rand::Rng;

/// DJB2 string hash, usable in constant patterns.
pub const fn djb2(name: &str) -> u32 {
    let bytes = name.as_bytes();
    let mut hash: u32 = 5381;
    let mut i = 0;
    while i < bytes.len() {
        hash = hash.wrapping_mul(33).wrapping_add(bytes[i] as u32);
        i += 1;
    }
    hash
}

const H_WPVORLAUFIST: u32 = djb2("WPVORLAUFIST");
const H_RUECKLAUFISTTEMP: u32 = djb2("RUECKLAUFISTTEMP");
const H_VERDICHTER: u32 = djb2("VERDICHTER");
const H_SOMMERBETRIEB: u32 = djb2("SOMMERBETRIEB");
const H_JAHR: u32 = djb2("JAHR");
const H_MONAT: u32 = djb2("MONAT");
const H_TAG: u32 = djb2("TAG");
const H_STUNDE: u32 = djb2("STUNDE");
const H_MINUTE: u32 = djb2("MINUTE");
const H_SEKUNDE: u32 = djb2("SEKUNDE");
const H_WAERME_WW: u32 = djb2("WAERMEERTRAG_WW_SUM_MWH");
const H_WAERME_2WE_WW: u32 = djb2("WAERMEERTRAG_2WE_WW_SUM_MWH");
const H_WAERME_HEIZ: u32 = djb2("WAERMEERTRAG_HEIZ_SUM_MWH");
const H_WAERME_2WE_HEIZ: u32 = djb2("WAERMEERTRAG_2WE_HEIZ_SUM_MWH");
const H_EL_WW: u32 = djb2("EL_AUFNAHMELEISTUNG_WW_SUM_MWH");
const H_EL_HEIZ: u32 = djb2("EL_AUFNAHMELEISTUNG_HEIZ_SUM_MWH");

/// Raw signals the derived engine caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HotSignal {
    WpVorlaufIst,
    RuecklaufIstTemp,
    Verdichter,
    Sommerbetrieb,
    Jahr,
    Monat,
    Tag,
    Stunde,
    Minute,
    Sekunde,
    WaermeWw,
    Waerme2WeWw,
    WaermeHeiz,
    Waerme2WeHeiz,
    ElWw,
    ElHeiz,
}

impl HotSignal {
    pub const ALL: [HotSignal; 16] = [
        HotSignal::WpVorlaufIst,
        HotSignal::RuecklaufIstTemp,
        HotSignal::Verdichter,
        HotSignal::Sommerbetrieb,
        HotSignal::Jahr,
        HotSignal::Monat,
        HotSignal::Tag,
        HotSignal::Stunde,
        HotSignal::Minute,
        HotSignal::Sekunde,
        HotSignal::WaermeWw,
        HotSignal::Waerme2WeWw,
        HotSignal::WaermeHeiz,
        HotSignal::Waerme2WeHeiz,
        HotSignal::ElWw,
        HotSignal::ElHeiz,
    ];

    pub fn name(self) -> &'static str {
        match self {
            HotSignal::WpVorlaufIst => "WPVORLAUFIST",
            HotSignal::RuecklaufIstTemp => "RUECKLAUFISTTEMP",
            HotSignal::Verdichter => "VERDICHTER",
            HotSignal::Sommerbetrieb => "SOMMERBETRIEB",
            HotSignal::Jahr => "JAHR",
            HotSignal::Monat => "MONAT",
            HotSignal::Tag => "TAG",
            HotSignal::Stunde => "STUNDE",
            HotSignal::Minute => "MINUTE",
            HotSignal::Sekunde => "SEKUNDE",
            HotSignal::WaermeWw => "WAERMEERTRAG_WW_SUM_MWH",
            HotSignal::Waerme2WeWw => "WAERMEERTRAG_2WE_WW_SUM_MWH",
            HotSignal::WaermeHeiz => "WAERMEERTRAG_HEIZ_SUM_MWH",
            HotSignal::Waerme2WeHeiz => "WAERMEERTRAG_2WE_HEIZ_SUM_MWH",
            HotSignal::ElWw => "EL_AUFNAHMELEISTUNG_WW_SUM_MWH",
            HotSignal::ElHeiz => "EL_AUFNAHMELEISTUNG_HEIZ_SUM_MWH",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let candidate = match djb2(name) {
            H_WPVORLAUFIST => HotSignal::WpVorlaufIst,
            H_RUECKLAUFISTTEMP => HotSignal::RuecklaufIstTemp,
            H_VERDICHTER => HotSignal::Verdichter,
            H_SOMMERBETRIEB => HotSignal::Sommerbetrieb,
            H_JAHR => HotSignal::Jahr,
            H_MONAT => HotSignal::Monat,
            H_TAG => HotSignal::Tag,
            H_STUNDE => HotSignal::Stunde,
            H_MINUTE => HotSignal::Minute,
            H_SEKUNDE => HotSignal::Sekunde,
            H_WAERME_WW => HotSignal::WaermeWw,
            H_WAERME_2WE_WW => HotSignal::Waerme2WeWw,
            H_WAERME_HEIZ => HotSignal::WaermeHeiz,
            H_WAERME_2WE_HEIZ => HotSignal::Waerme2WeHeiz,
            H_EL_WW => HotSignal::ElWw,
            H_EL_HEIZ => HotSignal::ElHeiz,
            _ => return None,
        };
        (candidate.name() == name).then_some(candidate)
    }

    pub fn is_cop_input(self) -> bool {
        matches!(
            self,
            HotSignal::WaermeWw
                | HotSignal::Waerme2WeWw
                | HotSignal::WaermeHeiz
                | HotSignal::Waerme2WeHeiz
                | HotSignal::ElWw
                | HotSignal::ElHeiz
        )
    }
}

/// Most recent numeric value of every hot signal.
#[derive(Debug, Clone, Default)]
pub struct LastValueCache {
    values: [Option<f64>; 16],
}

impl LastValueCache {
    pub fn get(&self, signal: HotSignal) -> Option<f64> {
        self.values[signal as usize]
    }

    pub fn set(&mut self, signal: HotSignal, value: f64) {
        self.values[signal as usize] = Some(value);
    }

    pub fn clear(&mut self, signal: HotSignal) {
        self.values[signal as usize] = None;
    }

    fn all(&self, signals: &[HotSignal]) -> Option<Vec<f64>> {
        signals.iter().map(|s| self.get(*s)).collect()
    }
}

/// A computed sink entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalculatedSensor {
    /// Topic segment under `<app>/calculated/`
    pub key: &'static str,
    pub unique_id: &'static str,
    /// Discovery topic segment after `<discovery>/<component>/<app>/`
    pub object_id: &'static str,
    pub name: &'static str,
    pub binary: bool,
    pub device_class: &'static str,
    pub unit: &'static str,
    pub state_class: &'static str,
    pub icon: &'static str,
}

const fn calculated(
    key: &'static str,
    unique_id: &'static str,
    name: &'static str,
    icon: &'static str,
) -> CalculatedSensor {
    CalculatedSensor {
        key,
        unique_id,
        object_id: unique_id,
        name,
        binary: false,
        device_class: "",
        unit: "",
        state_class: "",
        icon,
    }
}

pub const DATE: CalculatedSensor = calculated("date", "stiebel_calculated_date", "Datum", "mdi:calendar");
pub const TIME: CalculatedSensor = calculated("time", "stiebel_calculated_time", "Uhrzeit", "mdi:clock");
pub const BETRIEBSART: CalculatedSensor =
    calculated("betriebsart", "stiebel_calculated_betriebsart", "Betriebsart", "mdi:cog");
pub const DELTA_T_CONTINUOUS: CalculatedSensor = CalculatedSensor {
    device_class: "temperature",
    unit: "K",
    state_class: "measurement",
    ..calculated(
        "delta_t_continuous",
        "stiebel_calculated_delta_t_continuous",
        "Delta T WP (kontinuierlich)",
        "mdi:thermometer",
    )
};
pub const DELTA_T_RUNNING: CalculatedSensor = CalculatedSensor {
    device_class: "temperature",
    unit: "K",
    state_class: "measurement",
    ..calculated(
        "delta_t_running",
        "stiebel_calculated_delta_t_running",
        "Delta T WP (nur bei Verdichter an)",
        "mdi:thermometer-chevron-up",
    )
};
pub const COMPRESSOR_ACTIVE: CalculatedSensor = CalculatedSensor {
    binary: true,
    device_class: "running",
    ..calculated(
        "compressor_active",
        "stiebel_calculated_compressor_active",
        "WP Verdichter aktiv",
        "mdi:engine",
    )
};
pub const COP_WW: CalculatedSensor = CalculatedSensor {
    object_id: "cop_ww",
    state_class: "measurement",
    ..calculated("cop_ww", "stiebel_cop_ww", "COP Warmwasser", "mdi:water-boiler")
};
pub const COP_HEIZ: CalculatedSensor = CalculatedSensor {
    object_id: "cop_heiz",
    state_class: "measurement",
    ..calculated("cop_heiz", "stiebel_cop_heiz", "COP Heizung", "mdi:radiator")
};
pub const COP_GESAMT: CalculatedSensor = CalculatedSensor {
    object_id: "cop_gesamt",
    state_class: "measurement",
    ..calculated("cop_gesamt", "stiebel_cop_gesamt", "COP Gesamt", "mdi:chart-line")
};

pub const CALCULATED_SENSORS: [&CalculatedSensor; 9] = [
    &DATE,
    &TIME,
    &BETRIEBSART,
    &DELTA_T_CONTINUOUS,
    &DELTA_T_RUNNING,
    &COMPRESSOR_ACTIVE,
    &COP_WW,
    &COP_HEIZ,
    &COP_GESAMT,
];

/// One value to publish for a calculated sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedOutput {
    pub sensor: &'static CalculatedSensor,
    pub value: String,
}

impl DerivedOutput {
    fn new(sensor: &'static CalculatedSensor, value: String) -> Self {
        DerivedOutput { sensor, value }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Timer {
    DeltaT,
    Compressor,
    Date,
    Time,
}

impl Timer {
    const ALL: [Timer; 4] = [Timer::DeltaT, Timer::Compressor, Timer::Date, Timer::Time];

    fn period_ms(self) -> u64 {
        match self {
            Timer::DeltaT => DELTA_T_PERIOD_MS,
            Timer::Compressor => COMPRESSOR_PERIOD_MS,
            Timer::Date | Timer::Time => DATETIME_PERIOD_MS,
        }
    }
}

/// Last-value cache plus the timers publishing derived sensors.
#[derive(Debug)]
pub struct DerivedEngine {
    cache: LastValueCache,
    cop_min_divisor: f64,
    min_random_delay_ms: u64,
    max_random_delay_ms: u64,
    next_due_ms: Option<[u64; 4]>,
}

impl DerivedEngine {
    pub fn new(cop_min_divisor: f64, min_random_delay_ms: u64, max_random_delay_ms: u64) -> Self {
        DerivedEngine {
            cache: LastValueCache::default(),
            cop_min_divisor,
            min_random_delay_ms,
            max_random_delay_ms: max_random_delay_ms.max(min_random_delay_ms),
            next_due_ms: None,
        }
    }

    pub fn cache(&self) -> &LastValueCache {
        &self.cache
    }

    /// Arm every timer at a random phase inside its period.
    pub fn start<R: Rng>(&mut self, now_ms: u64, rng: &mut R) {
        let mut due = [0u64; 4];
        for (slot, timer) in due.iter_mut().zip(Timer::ALL) {
            *slot = now_ms + rng.gen_range(0..=timer.period_ms());
        }
        self.next_due_ms = Some(due);
    }

    /// Record a published raw value and return the outputs it triggers.
    pub fn on_signal(&mut self, name: &str, value: &str) -> Vec<DerivedOutput> {
        let Some(hot) = HotSignal::from_name(name) else {
            return Vec::new();
        };

        let parsed = match hot {
            HotSignal::Sommerbetrieb => match value {
                PAYLOAD_ON => Some(1.0),
                PAYLOAD_OFF => Some(0.0),
                _ => None,
            },
            _ => value.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        };
        match parsed {
            Some(v) => self.cache.set(hot, v),
            None => self.cache.clear(hot),
        }

        let mut out = Vec::new();
        match hot {
            HotSignal::Tag => out.extend(self.date()),
            HotSignal::Minute => out.extend(self.time()),
            HotSignal::Sommerbetrieb => {
                let label = if value == PAYLOAD_ON { "Sommerbetrieb" } else { "Normalbetrieb" };
                out.push(DerivedOutput::new(&BETRIEBSART, label.to_string()));
            }
            h if h.is_cop_input() => out.extend(self.cops()),
            _ => {}
        }
        out
    }

    /// Outputs of every timer that is due; re-arms them.
    pub fn tick<R: Rng>(&mut self, now_ms: u64, rng: &mut R) -> Vec<DerivedOutput> {
        let Some(mut due) = self.next_due_ms else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for (slot, timer) in due.iter_mut().zip(Timer::ALL) {
            if now_ms < *slot {
                continue;
            }
            *slot = now_ms
                + timer.period_ms()
                + rng.gen_range(self.min_random_delay_ms..=self.max_random_delay_ms);
            match timer {
                Timer::DeltaT => {
                    out.extend(self.delta_t_continuous());
                    out.extend(self.delta_t_running());
                }
                Timer::Compressor => out.extend(self.compressor_active()),
                Timer::Date => out.extend(self.date()),
                Timer::Time => out.extend(self.time()),
            }
        }
        self.next_due_ms = Some(due);
        out
    }

    fn date(&self) -> Option<DerivedOutput> {
        let v = self.cache.all(&[HotSignal::Jahr, HotSignal::Monat, HotSignal::Tag])?;
        let (year, month, day) = (v[0] as i64, v[1] as i64, v[2] as i64);
        if !(0..=99).contains(&year) || !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return None;
        }
        Some(DerivedOutput::new(&DATE, format!("20{year:02}-{month:02}-{day:02}")))
    }

    fn time(&self) -> Option<DerivedOutput> {
        let v = self.cache.all(&[HotSignal::Stunde, HotSignal::Minute, HotSignal::Sekunde])?;
        let (hour, minute, second) = (v[0] as i64, v[1] as i64, v[2] as i64);
        if !(0..=23).contains(&hour) || !(0..=59).contains(&minute) || !(0..=59).contains(&second) {
            return None;
        }
        Some(DerivedOutput::new(&TIME, format!("{hour:02}:{minute:02}:{second:02}")))
    }

    fn delta_t(&self) -> Option<f64> {
        let v = self.cache.all(&[HotSignal::WpVorlaufIst, HotSignal::RuecklaufIstTemp])?;
        if v[0] < DELTA_T_MIN_TEMPERATURE || v[1] < DELTA_T_MIN_TEMPERATURE {
            return None;
        }
        Some(v[0] - v[1])
    }

    fn compressor_running(&self) -> Option<bool> {
        self.cache
            .get(HotSignal::Verdichter)
            .map(|level| level > COMPRESSOR_ACTIVE_LEVEL)
    }

    fn delta_t_continuous(&self) -> Option<DerivedOutput> {
        let delta = self.delta_t()?;
        Some(DerivedOutput::new(&DELTA_T_CONTINUOUS, format!("{delta:.2}")))
    }

    fn delta_t_running(&self) -> Option<DerivedOutput> {
        if self.compressor_running() != Some(true) {
            return None;
        }
        let delta = self.delta_t()?;
        Some(DerivedOutput::new(&DELTA_T_RUNNING, format!("{delta:.2}")))
    }

    fn compressor_active(&self) -> Option<DerivedOutput> {
        let running = self.compressor_running()?;
        let state = if running { PAYLOAD_ON } else { PAYLOAD_OFF };
        Some(DerivedOutput::new(&COMPRESSOR_ACTIVE, state.to_string()))
    }

    fn ratio(&self, sensor: &'static CalculatedSensor, heat: &[HotSignal], electric: &[HotSignal]) -> Option<DerivedOutput> {
        let heat: f64 = self.cache.all(heat)?.iter().sum();
        let electric: f64 = self.cache.all(electric)?.iter().sum();
        if electric < self.cop_min_divisor {
            return None;
        }
        let cop = heat / electric;
        log_info(&format!("{} = {cop:.prec$}", sensor.name, prec = COP_DECIMAL_PLACES));
        Some(DerivedOutput::new(sensor, format!("{cop:.prec$}", prec = COP_DECIMAL_PLACES)))
    }

    /// The three COP ratios whose inputs are all known.
    pub fn cops(&self) -> Vec<DerivedOutput> {
        use HotSignal::*;
        [
            self.ratio(&COP_WW, &[WaermeWw, Waerme2WeWw], &[ElWw]),
            self.ratio(&COP_HEIZ, &[WaermeHeiz, Waerme2WeHeiz], &[ElHeiz]),
            self.ratio(
                &COP_GESAMT,
                &[WaermeWw, Waerme2WeWw, WaermeHeiz, Waerme2WeHeiz],
                &[ElWw, ElHeiz],
            ),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_hot_signal_hashes_are_distinct() {
        let hashes: HashSet<u32> = HotSignal::ALL.iter().map(|s| djb2(s.name())).collect();
        assert_eq!(hashes.len(), HotSignal::ALL.len());
        for signal in HotSignal::ALL {
            assert_eq!(HotSignal::from_name(signal.name()), Some(signal));
        }
    }

    #[test]
    fn test_djb2_reference_value() {
        assert_eq!(djb2(""), 5381);
        assert_eq!(djb2("a"), 5381 * 33 + 97);
    }

    #[test]
    fn test_cop_skips_small_divisor() {
        let mut engine = DerivedEngine::new(0.001, 200, 1000);
        engine.on_signal("WAERMEERTRAG_WW_SUM_MWH", "2.5");
        engine.on_signal("WAERMEERTRAG_2WE_WW_SUM_MWH", "0.3");
        assert!(engine.on_signal("EL_AUFNAHMELEISTUNG_WW_SUM_MWH", "0.0").is_empty());
    }

    #[test]
    fn test_cop_gesamt_needs_all_inputs() {
        let mut engine = DerivedEngine::new(0.001, 200, 1000);
        for (name, value) in [
            ("WAERMEERTRAG_WW_SUM_MWH", "2.0"),
            ("WAERMEERTRAG_2WE_WW_SUM_MWH", "0.0"),
            ("EL_AUFNAHMELEISTUNG_WW_SUM_MWH", "1.0"),
            ("WAERMEERTRAG_HEIZ_SUM_MWH", "6.0"),
            ("WAERMEERTRAG_2WE_HEIZ_SUM_MWH", "0.0"),
        ] {
            engine.on_signal(name, value);
        }
        let out = engine.on_signal("EL_AUFNAHMELEISTUNG_HEIZ_SUM_MWH", "2.0");
        let values: Vec<(&str, &str)> = out.iter().map(|o| (o.sensor.key, o.value.as_str())).collect();
        assert_eq!(values, vec![("cop_ww", "2.00"), ("cop_heiz", "3.00"), ("cop_gesamt", "2.67")]);
    }

    #[test]
    fn test_date_and_time_composition() {
        let mut engine = DerivedEngine::new(0.001, 200, 1000);
        engine.on_signal("JAHR", "24");
        engine.on_signal("MONAT", "3");
        let out = engine.on_signal("TAG", "7");
        assert_eq!(out, vec![DerivedOutput::new(&DATE, "2024-03-07".to_string())]);

        engine.on_signal("STUNDE", "9");
        engine.on_signal("SEKUNDE", "5");
        let out = engine.on_signal("MINUTE", "61");
        assert!(out.is_empty());
        let out = engine.on_signal("MINUTE", "30");
        assert_eq!(out[0].value, "09:30:05");
    }

    #[test]
    fn test_betriebsart_label() {
        let mut engine = DerivedEngine::new(0.001, 200, 1000);
        assert_eq!(engine.on_signal("SOMMERBETRIEB", "on")[0].value, "Sommerbetrieb");
        assert_eq!(engine.on_signal("SOMMERBETRIEB", "off")[0].value, "Normalbetrieb");
    }

    #[test]
    fn test_timers_publish_delta_t_and_compressor() {
        let mut engine = DerivedEngine::new(0.001, 200, 1000);
        let mut rng = StdRng::seed_from_u64(7);
        assert!(engine.tick(1_000_000, &mut rng).is_empty());

        engine.start(0, &mut rng);
        engine.on_signal("WPVORLAUFIST", "35.5");
        engine.on_signal("RUECKLAUFISTTEMP", "30.25");
        engine.on_signal("VERDICHTER", "3");

        let out = engine.tick(60_000, &mut rng);
        let keys: Vec<&str> = out.iter().map(|o| o.sensor.key).collect();
        assert!(keys.contains(&"delta_t_continuous"));
        assert!(keys.contains(&"delta_t_running"));
        assert!(keys.contains(&"compressor_active"));
        let delta = out.iter().find(|o| o.sensor.key == "delta_t_continuous").unwrap();
        assert_eq!(delta.value, "5.25");

        // nothing is due again right away
        assert!(engine.tick(60_001, &mut rng).is_empty());
    }

    #[test]
    fn test_delta_t_skips_missing_sensor() {
        let mut engine = DerivedEngine::new(0.001, 200, 1000);
        let mut rng = StdRng::seed_from_u64(8);
        engine.start(0, &mut rng);
        engine.on_signal("WPVORLAUFIST", "-60.0");
        engine.on_signal("RUECKLAUFISTTEMP", "30.0");
        engine.on_signal("VERDICHTER", "0");
        let out = engine.tick(60_000, &mut rng);
        let keys: Vec<&str> = out.iter().map(|o| o.sensor.key).collect();
        assert_eq!(keys, vec!["compressor_active"]);
        assert_eq!(out[0].value, "off");
    }
}
