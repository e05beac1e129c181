//! Built-in polling table for the WPL 13 E.

use crate::catalogue::members::ALL_MEMBERS_NAME;
use crate::config::RequestRow;
use crate::constants::{FREQ_10MIN, FREQ_1MIN, FREQ_30S, FREQ_60MIN};

/// `(signal, frequency in seconds, member)` rows polled when the configuration
/// does not provide its own table.
pub const WPL13E_REQUESTS: &[(&str, u32, &str)] = &[
    // Date and time
    ("JAHR", FREQ_1MIN, "MANAGER"),
    ("MONAT", FREQ_1MIN, "MANAGER"),
    ("TAG", FREQ_1MIN, "MANAGER"),
    ("STUNDE", FREQ_1MIN, "MANAGER"),
    ("MINUTE", FREQ_1MIN, "MANAGER"),
    ("SEKUNDE", FREQ_1MIN, "MANAGER"),
    // Status
    ("WP_STATUS", FREQ_1MIN, "MANAGER"),
    ("EVU_SPERRE_AKTIV", FREQ_1MIN, "MANAGER"),
    ("ABTAUUNGAKTIV", FREQ_1MIN, "HEIZMODUL"),
    ("BETRIEBSART_WP", FREQ_10MIN, "MANAGER"),
    ("PROGRAMMSCHALTER", FREQ_10MIN, "MANAGER"),
    ("SOMMERBETRIEB", FREQ_1MIN, "MANAGER"),
    // Set points
    ("KESSELSOLLTEMP", FREQ_30S, "MANAGER"),
    ("KESSELSOLLTEMP", FREQ_30S, "KESSEL"),
    ("SPEICHERSOLLTEMP", FREQ_30S, "MANAGER"),
    ("SPEICHERSOLLTEMP", FREQ_30S, "KESSEL"),
    ("RAUMSOLLTEMP_I", FREQ_30S, "MANAGER"),
    ("RAUMSOLLTEMP_II", FREQ_30S, "MANAGER"),
    ("RAUMSOLLTEMP_III", FREQ_30S, "MANAGER"),
    ("RAUMSOLLTEMP_NACHT", FREQ_30S, "MANAGER"),
    ("EINSTELL_SPEICHERSOLLTEMP", FREQ_30S, "KESSEL"),
    ("EINSTELL_SPEICHERSOLLTEMP", FREQ_30S, "MANAGER"),
    ("EINSTELL_SPEICHERSOLLTEMP2", FREQ_30S, "KESSEL"),
    ("EINSTELL_SPEICHERSOLLTEMP2", FREQ_30S, "MANAGER"),
    // Temperatures
    ("AUSSENTEMP", FREQ_30S, "KESSEL"),
    ("AUSSENTEMP", FREQ_30S, "HEIZMODUL"),
    ("SAMMLERISTTEMP", FREQ_30S, "KESSEL"),
    ("SPEICHERISTTEMP", FREQ_30S, "KESSEL"),
    ("VORLAUFISTTEMP", FREQ_30S, "KESSEL"),
    ("RUECKLAUFISTTEMP", FREQ_30S, "MANAGER"),
    ("RUECKLAUFISTTEMP", FREQ_30S, "KESSEL"),
    ("WPVORLAUFIST", FREQ_30S, "KESSEL"),
    ("VERDICHTER", FREQ_30S, "HEIZMODUL"),
    // Energy counters
    ("EL_AUFNAHMELEISTUNG_WW_TAG_KWH", FREQ_10MIN, "HEIZMODUL"),
    ("EL_AUFNAHMELEISTUNG_WW_SUM_MWH", FREQ_10MIN, "HEIZMODUL"),
    ("EL_AUFNAHMELEISTUNG_HEIZ_TAG_KWH", FREQ_10MIN, "HEIZMODUL"),
    ("EL_AUFNAHMELEISTUNG_HEIZ_SUM_MWH", FREQ_10MIN, "HEIZMODUL"),
    ("WAERMEERTRAG_2WE_WW_TAG_KWH", FREQ_10MIN, "HEIZMODUL"),
    ("WAERMEERTRAG_2WE_WW_SUM_MWH", FREQ_10MIN, "HEIZMODUL"),
    ("WAERMEERTRAG_2WE_HEIZ_TAG_KWH", FREQ_10MIN, "HEIZMODUL"),
    ("WAERMEERTRAG_2WE_HEIZ_SUM_MWH", FREQ_10MIN, "HEIZMODUL"),
    ("WAERMEERTRAG_WW_TAG_KWH", FREQ_10MIN, "HEIZMODUL"),
    ("WAERMEERTRAG_WW_SUM_MWH", FREQ_10MIN, "HEIZMODUL"),
    ("WAERMEERTRAG_HEIZ_TAG_KWH", FREQ_10MIN, "HEIZMODUL"),
    ("WAERMEERTRAG_HEIZ_SUM_MWH", FREQ_10MIN, "HEIZMODUL"),
    // Identification
    ("SOFTWARE_NUMMER", FREQ_60MIN, ALL_MEMBERS_NAME),
    ("SOFTWARE_VERSION", FREQ_60MIN, ALL_MEMBERS_NAME),
    ("GERAETE_ID", FREQ_60MIN, ALL_MEMBERS_NAME),
];

pub fn default_requests() -> Vec<RequestRow> {
    WPL13E_REQUESTS
        .iter()
        .map(|(signal, frequency_s, member)| RequestRow {
            signal: (*signal).to_string(),
            frequency_s: *frequency_s,
            member: (*member).to_string(),
        })
        .collect()
}
