//! Elster index table of the WPL 13 E.
//!
//! Entries without metadata take their discovery defaults from the value type.
//! `blacklisted` entries are never polled and replies for them are discarded.

use crate::constants::{PAYLOAD_OFF, PAYLOAD_ON, SENTINEL_INDEX};
use crate::elster::value::{decode_value, encode_value, EncodeError, ValueType};
use crate::error::GatewayError;

/// Optional sink metadata overriding the type defaults.
///
/// Empty strings mean "not set".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalMeta {
    pub friendly_name: &'static str,
    pub unit: &'static str,
    pub device_class: &'static str,
    pub state_class: &'static str,
    pub icon: &'static str,
    pub payload_on: &'static str,
    pub payload_off: &'static str,
}

impl SignalMeta {
    pub const EMPTY: SignalMeta = SignalMeta {
        friendly_name: "",
        unit: "",
        device_class: "",
        state_class: "",
        icon: "",
        payload_on: "",
        payload_off: "",
    };

    /// Whether any discovery field is set; otherwise type defaults apply.
    pub fn has_sink_fields(&self) -> bool {
        !(self.unit.is_empty()
            && self.device_class.is_empty()
            && self.state_class.is_empty()
            && self.icon.is_empty())
    }

    const fn named(friendly_name: &'static str) -> Self {
        SignalMeta { friendly_name, ..Self::EMPTY }
    }

    const fn measure(
        friendly_name: &'static str,
        unit: &'static str,
        device_class: &'static str,
        state_class: &'static str,
        icon: &'static str,
    ) -> Self {
        SignalMeta {
            friendly_name,
            unit,
            device_class,
            state_class,
            icon,
            ..Self::EMPTY
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalDefinition {
    pub name: &'static str,
    pub index: u16,
    pub value_type: ValueType,
    pub meta: Option<SignalMeta>,
    /// Permanent blacklist; cannot be lifted at runtime
    pub blacklisted: bool,
    /// Publish `on` as `off` and vice versa
    pub invert_bool: bool,
}

impl SignalDefinition {
    pub const fn new(name: &'static str, index: u16, value_type: ValueType) -> Self {
        SignalDefinition {
            name,
            index,
            value_type,
            meta: None,
            blacklisted: false,
            invert_bool: false,
        }
    }

    const fn meta(mut self, meta: SignalMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    const fn blacklisted(mut self) -> Self {
        self.blacklisted = true;
        self
    }

    const fn inverted(mut self) -> Self {
        self.invert_bool = true;
        self
    }

    pub fn is_sentinel(&self) -> bool {
        self.index == SENTINEL_INDEX
    }

    /// Published text of a raw value, with `invert_bool` applied.
    pub fn decode_raw(&self, raw: u16) -> String {
        let value = decode_value(self.value_type, raw);
        if !self.invert_bool {
            return value;
        }
        match value.as_str() {
            PAYLOAD_ON => PAYLOAD_OFF.to_string(),
            PAYLOAD_OFF => PAYLOAD_ON.to_string(),
            _ => value,
        }
    }

    /// Raw value for a write of `text`.
    pub fn encode_text(&self, text: &str) -> Result<u16, GatewayError> {
        encode_value(self.value_type, text).map_err(|e| match e {
            EncodeError::ReadOnly(value_type) => GatewayError::NotWritable(value_type),
            _ => GatewayError::Encode {
                signal: self.name.to_string(),
                input: text.to_string(),
            },
        })
    }

    /// Name shown downstream; falls back to the signal name.
    pub fn friendly_name(&self) -> &'static str {
        match self.meta {
            Some(meta) if !meta.friendly_name.is_empty() => meta.friendly_name,
            _ => self.name,
        }
    }
}

/// Returned for every failed lookup; downstream code ignores it.
pub const SENTINEL_SIGNAL: SignalDefinition =
    SignalDefinition::new("", SENTINEL_INDEX, ValueType::Default);

use ValueType::*;

const fn sig(name: &'static str, index: u16, value_type: ValueType) -> SignalDefinition {
    SignalDefinition::new(name, index, value_type)
}

const ENERGY_KWH: &str = "kWh";
const ENERGY_MWH: &str = "MWh";

pub const SIGNALS: &[SignalDefinition] = &[
    sig("KESSELSOLLTEMP", 0x0001, DecVal).meta(SignalMeta::named("Kessel Solltemperatur")),
    sig("FEHLERMELDUNG", 0x0002, ErrNr).meta(SignalMeta::named("Fehlermeldung")),
    sig("SPEICHERSOLLTEMP", 0x0003, DecVal).meta(SignalMeta::named("Speicher Solltemperatur")),
    sig("VORLAUFSOLLTEMP", 0x0004, DecVal).meta(SignalMeta::named("Vorlauf Solltemperatur")),
    sig("RAUMSOLLTEMP_I", 0x0005, DecVal).meta(SignalMeta::named("Raum Solltemperatur Tag")),
    sig("RAUMSOLLTEMP_II", 0x0006, DecVal),
    sig("RAUMSOLLTEMP_III", 0x0007, DecVal),
    sig("RAUMSOLLTEMP_NACHT", 0x0008, DecVal).meta(SignalMeta::named("Raum Solltemperatur Nacht")),
    sig("UHRZEIT", 0x0009, Zeit),
    sig("DATUM", 0x000A, Datum),
    sig("AUSSENTEMP", 0x000B, DecVal).meta(SignalMeta::named("Aussentemperatur")),
    sig("GERAETE_ID", 0x000C, DevId).meta(SignalMeta::named("Geraete-ID")),
    sig("SAMMLERISTTEMP", 0x000D, DecVal).meta(SignalMeta::named("Sammler Isttemperatur")),
    sig("SPEICHERISTTEMP", 0x000E, DecVal).meta(SignalMeta::named("Speicher Isttemperatur")),
    sig("VORLAUFISTTEMP", 0x000F, DecVal).meta(SignalMeta::named("Vorlauf Isttemperatur")),
    sig("GERAETEKONFIGURATION", 0x0010, Default),
    sig("RAUMISTTEMP", 0x0011, DecVal).blacklisted(),
    sig("VERSTELLTE_RAUMSOLLTEMP", 0x0012, DecVal).blacklisted(),
    sig("EINSTELL_SPEICHERSOLLTEMP", 0x0013, DecVal)
        .meta(SignalMeta::named("Einstellung Speicher Solltemperatur")),
    sig("VERDAMPFERTEMP", 0x0014, DecVal),
    sig("RUECKLAUFISTTEMP", 0x0016, DecVal).meta(SignalMeta::named("Ruecklauf Isttemperatur")),
    sig("FEUCHTE", 0x0075, DecVal)
        .meta(SignalMeta::measure("Raumfeuchte", "%", "humidity", "measurement", "mdi:water-percent"))
        .blacklisted(),
    sig("BUSKENNUNG", 0x0105, DevNr),
    sig("PROGRAMMSCHALTER", 0x0112, Betriebsart).meta(SignalMeta::named("Programmschalter")),
    sig("EINSTELL_SPEICHERSOLLTEMP2", 0x0114, DecVal),
    sig("TAG", 0x0122, Default),
    sig("MONAT", 0x0123, Default),
    sig("JAHR", 0x0124, Default),
    sig("STUNDE", 0x0125, Default),
    sig("MINUTE", 0x0126, Default),
    sig("SEKUNDE", 0x0127, Default),
    sig("WP_STATUS", 0x0176, Default).meta(SignalMeta::named("WP Status")),
    sig("BETRIEBSART_WP", 0x0177, Betriebsart).meta(SignalMeta::named("Betriebsart WP")),
    sig("EVU_SPERRE_AKTIV", 0x0179, Bool)
        .meta(SignalMeta {
            friendly_name: "EVU Sperre aktiv",
            icon: "mdi:power-plug-off",
            payload_on: "on",
            payload_off: "off",
            ..SignalMeta::EMPTY
        })
        .inverted(),
    sig("SOFTWARE_NUMMER", 0x0199, Default).meta(SignalMeta::named("Softwarenummer")),
    sig("SOFTWARE_VERSION", 0x019A, Default).meta(SignalMeta::named("Softwareversion")),
    sig("WPVORLAUFIST", 0x01D4, DecVal).meta(SignalMeta::named("WP Vorlauf Isttemperatur")),
    sig("VOLUMENSTROM", 0x01DA, MilVal)
        .meta(SignalMeta::measure("Volumenstrom", "m³/h", "", "measurement", "mdi:pump")),
    sig("VERDICHTER", 0x0265, Default).meta(SignalMeta::measure(
        "Verdichter Stufe",
        "",
        "",
        "measurement",
        "mdi:engine",
    )),
    sig("ABTAUUNGAKTIV", 0x061A, Bool).meta(SignalMeta::named("Abtauung aktiv")),
    sig("DRUCK_HEIZKREIS", 0x064A, CentVal)
        .meta(SignalMeta::measure("Druck Heizkreis", "bar", "pressure", "measurement", "mdi:gauge")),
    sig("LUEFTERSTUFE", 0x0678, Byte),
    sig("BETRIEBSSTUNDEN_VERDICHTER", 0x06A5, LittleEndian)
        .meta(SignalMeta::measure("Betriebsstunden Verdichter", "h", "duration", "total_increasing", "mdi:timer"))
        .blacklisted(),
    sig("EL_AUFNAHMELEISTUNG_WW_TAG_KWH", 0x091A, DoubleVal)
        .meta(SignalMeta::measure("El. Aufnahme WW Tag", ENERGY_KWH, "energy", "total_increasing", "mdi:lightning-bolt")),
    sig("EL_AUFNAHMELEISTUNG_WW_SUM_MWH", 0x091B, DoubleVal)
        .meta(SignalMeta::measure("El. Aufnahme WW Summe", ENERGY_MWH, "energy", "total_increasing", "mdi:lightning-bolt")),
    sig("EL_AUFNAHMELEISTUNG_HEIZ_TAG_KWH", 0x091E, DoubleVal)
        .meta(SignalMeta::measure("El. Aufnahme Heizung Tag", ENERGY_KWH, "energy", "total_increasing", "mdi:lightning-bolt")),
    sig("EL_AUFNAHMELEISTUNG_HEIZ_SUM_MWH", 0x091F, DoubleVal)
        .meta(SignalMeta::measure("El. Aufnahme Heizung Summe", ENERGY_MWH, "energy", "total_increasing", "mdi:lightning-bolt")),
    sig("WAERMEERTRAG_2WE_WW_TAG_KWH", 0x0922, DoubleVal)
        .meta(SignalMeta::measure("Waermeertrag 2.WE WW Tag", ENERGY_KWH, "energy", "total_increasing", "mdi:fire")),
    sig("WAERMEERTRAG_2WE_WW_SUM_MWH", 0x0923, DoubleVal)
        .meta(SignalMeta::measure("Waermeertrag 2.WE WW Summe", ENERGY_MWH, "energy", "total_increasing", "mdi:fire")),
    sig("WAERMEERTRAG_2WE_HEIZ_TAG_KWH", 0x0926, DoubleVal)
        .meta(SignalMeta::measure("Waermeertrag 2.WE Heizung Tag", ENERGY_KWH, "energy", "total_increasing", "mdi:fire")),
    sig("WAERMEERTRAG_2WE_HEIZ_SUM_MWH", 0x0927, DoubleVal)
        .meta(SignalMeta::measure("Waermeertrag 2.WE Heizung Summe", ENERGY_MWH, "energy", "total_increasing", "mdi:fire")),
    sig("WAERMEERTRAG_WW_TAG_KWH", 0x092A, DoubleVal)
        .meta(SignalMeta::measure("Waermeertrag WW Tag", ENERGY_KWH, "energy", "total_increasing", "mdi:fire")),
    sig("WAERMEERTRAG_WW_SUM_MWH", 0x092B, DoubleVal)
        .meta(SignalMeta::measure("Waermeertrag WW Summe", ENERGY_MWH, "energy", "total_increasing", "mdi:fire")),
    sig("WAERMEERTRAG_HEIZ_TAG_KWH", 0x092E, DoubleVal)
        .meta(SignalMeta::measure("Waermeertrag Heizung Tag", ENERGY_KWH, "energy", "total_increasing", "mdi:fire")),
    sig("WAERMEERTRAG_HEIZ_SUM_MWH", 0x092F, DoubleVal)
        .meta(SignalMeta::measure("Waermeertrag Heizung Summe", ENERGY_MWH, "energy", "total_increasing", "mdi:fire")),
    sig("LAUFZEIT_GESAMT", 0x0938, TripleVal),
    sig("SOMMERBETRIEB", 0x0F1E, LittleBool).meta(SignalMeta::named("Sommerbetrieb")),
    sig("HEIZPROG_1_MO", 0x1410, TimeDomain),
];
