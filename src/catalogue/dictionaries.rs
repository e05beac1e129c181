//! Error-code and operating-mode dictionaries used by the `err_nr` and
//! `betriebsart` value types.

/// Operating modes, indexed by the high byte of a `betriebsart` value.
pub const MODES: &[&str] = &[
    "Notbetrieb",
    "Bereitschaft",
    "Automatik",
    "Tagbetrieb",
    "Absenkbetrieb",
    "Warmwasser",
    "Handbetrieb",
    "Sommerbetrieb",
];

/// Firmware error numbers and their display names.
pub const ERRORS: &[(u16, &str)] = &[
    (0x0002, "Schuetz klebt"),
    (0x0003, "ERR HD-SENSOR"),
    (0x0004, "Hochdruck"),
    (0x0005, "Verdampferfuehler"),
    (0x0006, "Relaisfehler"),
    (0x0007, "Fehler Heissgas"),
    (0x0008, "Fehler Fehlercode"),
    (0x0009, "Fehler Ruecklauf"),
    (0x000A, "Fehler Vorlauf"),
    (0x000B, "Fehler Aussentemperatur"),
    (0x000C, "Fehler Speicher"),
    (0x000D, "Fehler Sammler"),
    (0x000E, "Fehler Frostschutz"),
    (0x000F, "Fehler Kommunikation"),
    (0x0010, "Niederdruck"),
    (0x0011, "Abtauung"),
    (0x0014, "Fehler Verdichter"),
    (0x0015, "Fehler Luefter"),
];

pub fn mode_name(index: u16) -> Option<&'static str> {
    MODES.get(usize::from(index)).copied()
}

pub fn mode_index(name: &str) -> Option<u16> {
    MODES.iter().position(|m| *m == name).map(|i| i as u16)
}

pub fn error_name(code: u16) -> Option<&'static str> {
    ERRORS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_lookup_is_symmetric() {
        for (i, name) in MODES.iter().enumerate() {
            assert_eq!(mode_index(name), Some(i as u16));
            assert_eq!(mode_name(i as u16), Some(*name));
        }
        assert_eq!(mode_name(MODES.len() as u16), None);
    }

    #[test]
    fn test_error_codes_are_unique() {
        for (i, (code, _)) in ERRORS.iter().enumerate() {
            assert!(ERRORS[i + 1..].iter().all(|(c, _)| c != code));
        }
        assert_eq!(error_name(0x0004), Some("Hochdruck"));
        assert_eq!(error_name(0x7777), None);
    }
}
