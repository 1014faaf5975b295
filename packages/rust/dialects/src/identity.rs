//! Pharmacy identity detection from export preambles.
//!
//! Identity is an enumerated lookup: the first lines of a file are searched
//! for known name/location tokens. Anything else is [`PharmacyMatch::Unmapped`].

use vrac_shared::PharmacyId;

/// Known tokens per pharmacy, checked in table order.
const IDENTITY_TOKENS: &[(PharmacyId, &[&str])] = &[
    (PharmacyId::Tanda, &["grande pharmacie de tanda", "tanda"]),
    (PharmacyId::Prolife, &["pharmacie prolife", "prolife", "tabagne"]),
    (PharmacyId::Olympique, &["olympique"]),
    (PharmacyId::Attobrou, &["attobrou"]),
];

/// Outcome of identity detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PharmacyMatch {
    /// A known token was found.
    Known {
        pharmacy_id: PharmacyId,
        token: &'static str,
    },
    /// No known token in the scanned lines.
    Unmapped,
}

impl PharmacyMatch {
    pub fn pharmacy_id(&self) -> Option<PharmacyId> {
        match self {
            Self::Known { pharmacy_id, .. } => Some(*pharmacy_id),
            Self::Unmapped => None,
        }
    }
}

/// Search the first `scan_lines` lines for a pharmacy token.
pub fn detect_pharmacy(lines: &[&str], scan_lines: usize) -> PharmacyMatch {
    let text = lines
        .iter()
        .take(scan_lines)
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    for &(pharmacy_id, tokens) in IDENTITY_TOKENS {
        if let Some(&token) = tokens.iter().find(|t| text.contains(**t)) {
            return PharmacyMatch::Known { pharmacy_id, token };
        }
    }
    PharmacyMatch::Unmapped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_full_name_case_insensitively() {
        let lines = ["GRANDE PHARMACIE DE TANDA", "Bondoukou road"];
        assert_eq!(
            detect_pharmacy(&lines, 5),
            PharmacyMatch::Known {
                pharmacy_id: PharmacyId::Tanda,
                token: "grande pharmacie de tanda"
            }
        );
    }

    #[test]
    fn matches_location_token() {
        let lines = ["Officine", "Tabagne - Gontougo"];
        assert_eq!(
            detect_pharmacy(&lines, 5).pharmacy_id(),
            Some(PharmacyId::Prolife)
        );
    }

    #[test]
    fn respects_scan_window() {
        let lines = ["header", "header", "Pharmacie Attobrou"];
        assert_eq!(detect_pharmacy(&lines, 2), PharmacyMatch::Unmapped);
        assert_eq!(
            detect_pharmacy(&lines, 3).pharmacy_id(),
            Some(PharmacyId::Attobrou)
        );
    }

    #[test]
    fn unknown_text_is_unmapped() {
        let lines = ["PHARMACIE DU PLATEAU", "Abengourou"];
        assert_eq!(detect_pharmacy(&lines, 5), PharmacyMatch::Unmapped);
        assert_eq!(detect_pharmacy(&[], 5), PharmacyMatch::Unmapped);
    }
}
