//! Therapeutic category classifier.
//!
//! Classification is a pure lookup: a static table of known product codes,
//! then designation keyword fragments matched after accent folding and
//! uppercasing. Keyword groups are checked antimalarial → antibiotic →
//! analgesic; anything else is [`TherapeuticCategory::Other`].

use vrac_shared::TherapeuticCategory;

/// Product codes with a known category. Code matches win over keywords.
const CODE_TABLE: &[(&str, TherapeuticCategory)] = &[
    ("3400935514", TherapeuticCategory::Antimalarial), // ARTEFAN 20/120
    ("3400936731", TherapeuticCategory::Antimalarial), // MALACUR
    ("3400933920", TherapeuticCategory::Antimalarial), // PALUFIN
    ("3400930416", TherapeuticCategory::Antibiotic),   // OSPAMOX
    ("3400932856", TherapeuticCategory::Antibiotic),   // ORACEFAL
    ("3400934201", TherapeuticCategory::Analgesic),    // EFFERALGAN CODEINE
];

const ANTIMALARIAL_KEYWORDS: &[&str] = &[
    "ARTEMETHER",
    "ARTEMETER",
    "LUMEFANTRINE",
    "COARTEM",
    "ARTESUNATE",
    "ARTEQUIN",
    "ARTEMISININ",
    "DIHYDROARTEMISININ",
    "PIPERAQUINE",
    "AMODIAQUINE",
    "QUININE",
    "QUINIMAX",
    "SULFADOXINE",
    "FANSIDAR",
    "MALOXINE",
    "MEFLOQUINE",
    "ATOVAQUONE",
    "CHLOROQUINE",
    "PRIMAQUINE",
    "ANTIPALU",
];

const ANTIBIOTIC_KEYWORDS: &[&str] = &[
    "AMOXICILLIN",
    "AMPICILLIN",
    "CLOXACILLIN",
    "PENICILLIN",
    "AUGMENTIN",
    "CLAVULAN",
    "CIPROFLOXACIN",
    "OFLOXACIN",
    "LEVOFLOXACIN",
    "NORFLOXACIN",
    "METRONIDAZOL",
    "FLAGYL",
    "COTRIMOXAZOL",
    "BACTRIM",
    "DOXYCYCLIN",
    "TETRACYCLIN",
    "AZITHROMYCIN",
    "ERYTHROMYCIN",
    "CLARITHROMYCIN",
    "CEFTRIAXON",
    "CEFIXIM",
    "CEFUROXIM",
    "CEFALEXIN",
    "GENTAMICIN",
];

const ANALGESIC_KEYWORDS: &[&str] = &[
    "PARACETAMOL",
    "DOLIPRANE",
    "EFFERALGAN",
    "DAFALGAN",
    "IBUPROFEN",
    "DICLOFENAC",
    "KETOPROFEN",
    "NAPROXEN",
    "PIROXICAM",
    "ASPIRIN",
    "ACETYLSALICYL",
    "TRAMADOL",
    "CODEIN",
    "METAMIZOL",
    "NOVALGIN",
];

const KEYWORD_GROUPS: &[(TherapeuticCategory, &[&str])] = &[
    (TherapeuticCategory::Antimalarial, ANTIMALARIAL_KEYWORDS),
    (TherapeuticCategory::Antibiotic, ANTIBIOTIC_KEYWORDS),
    (TherapeuticCategory::Analgesic, ANALGESIC_KEYWORDS),
];

/// Classify a product by code, then by designation keywords.
pub fn classify(code: &str, designation: &str) -> TherapeuticCategory {
    let code = code.trim();
    if let Some(&(_, category)) = CODE_TABLE.iter().find(|(c, _)| *c == code) {
        return category;
    }

    let folded = fold(designation);
    KEYWORD_GROUPS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| folded.contains(k)))
        .map(|&(category, _)| category)
        .unwrap_or(TherapeuticCategory::Other)
}

/// Uppercase and strip Latin-1 accents.
fn fold(text: &str) -> String {
    text.chars()
        .flat_map(char::to_uppercase)
        .map(|c| match c {
            'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'A',
            'Ç' => 'C',
            'È' | 'É' | 'Ê' | 'Ë' => 'E',
            'Ì' | 'Í' | 'Î' | 'Ï' => 'I',
            'Ñ' => 'N',
            'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' => 'O',
            'Ù' | 'Ú' | 'Û' | 'Ü' => 'U',
            'Ý' | 'Ÿ' => 'Y',
            other => other,
        })
        .collect()
}
