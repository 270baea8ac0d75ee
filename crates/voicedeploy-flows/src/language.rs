use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::error::FlowError;

pub const DEFAULT_LANGUAGE: &str = "English (US)";
pub const DEFAULT_REGION: &str = "us";

/// Language name fragment to region key. The longest matching fragment wins,
/// so "Chinese (Cantonese)" beats "Chinese".
const LANGUAGE_REGIONS: &[(&str, &str)] = &[
    ("English", "us"),
    ("Chinese (Cantonese)", "hk"),
    ("Chinese (Mandarin)", "cn"),
    ("Chinese", "cn"),
    ("German", "de"),
    ("Japanese", "jp"),
    ("Korean", "ko"),
    ("French", "fr"),
    ("Spanish", "es"),
    ("Arabic", "ar"),
    ("Portuguese", "pt"),
    ("Italian", "it"),
];

/// Wizard groupings, in display order.
const CATEGORIES: &[&str] = &[
    "English",
    "Chinese",
    "Japanese",
    "Korean",
    "French",
    "German",
    "Spanish",
    "Arabic",
    "Portuguese",
    "Italian",
];

/// Region key for a language name. Matching is case-insensitive.
pub fn region_for_language(language: &str) -> &'static str {
    let language = language.to_lowercase();
    LANGUAGE_REGIONS
        .iter()
        .filter(|(fragment, _)| language.contains(&fragment.to_lowercase()))
        .max_by_key(|(fragment, _)| fragment.len())
        .map(|(_, region)| *region)
        .unwrap_or(DEFAULT_REGION)
}

/// Which hours-of-operation template a region uses.
pub fn hours_region(region: &str) -> &'static str {
    match region {
        "cn" | "hk" => "hk",
        "de" => "de",
        "ar" => "dubai",
        _ => "us",
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LanguageRow {
    language_name: String,
    language_code: String,
    voice: String,
    gender: String,
}

/// One Polly voice for a language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Language {
    pub name: String,
    pub code: String,
    /// Voice name with the default marker removed.
    pub voice: String,
    pub gender: String,
    /// The CSV marks the language's preferred voice with a trailing `*`.
    pub is_default: bool,
}

impl From<LanguageRow> for Language {
    fn from(row: LanguageRow) -> Self {
        let voice = row.voice.trim();
        Self {
            name: row.language_name.trim().to_string(),
            code: row.language_code.trim().to_string(),
            voice: voice.replace('*', "").trim().to_string(),
            gender: row.gender.trim().to_string(),
            is_default: voice.contains('*'),
        }
    }
}

/// A named group of language variants shown together in the wizard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageCategory {
    pub label: String,
    pub variants: Vec<String>,
}

/// Languages and voices from `languages_neural.csv`.
#[derive(Debug, Clone, Default)]
pub struct LanguageCatalog {
    entries: Vec<Language>,
}

impl LanguageCatalog {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, FlowError> {
        let mut csv = csv::Reader::from_reader(reader);
        let entries = csv
            .deserialize::<LanguageRow>()
            .map(|row| row.map(Language::from))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    pub fn read(path: &Path) -> Result<Self, FlowError> {
        let file = File::open(path).map_err(|e| FlowError::io(path, e))?;
        Self::from_reader(file)
    }

    pub fn entries(&self) -> &[Language] {
        &self.entries
    }

    /// Unique language names in file order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for entry in &self.entries {
            if !names.contains(&entry.name.as_str()) {
                names.push(&entry.name);
            }
        }
        names
    }

    /// All voices for a language, in file order.
    pub fn voices(&self, language: &str) -> Vec<&Language> {
        self.entries.iter().filter(|e| e.name == language).collect()
    }

    /// The voice to use for a language: the first listed one.
    pub fn default_voice(&self, language: &str) -> Option<&Language> {
        self.entries.iter().find(|e| e.name == language)
    }

    /// Resolve user input to a language name: exact match first, then the
    /// first name containing the input, case-insensitively.
    pub fn find(&self, query: &str) -> Option<&str> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }
        let names = self.names();
        if let Some(exact) = names.iter().find(|n| n.eq_ignore_ascii_case(query)) {
            return Some(*exact);
        }
        let lowered = query.to_lowercase();
        names
            .into_iter()
            .find(|n| n.to_lowercase().contains(&lowered))
    }

    /// Languages grouped for display. Empty groups are skipped; languages that
    /// fit no group land in a trailing "Other" group.
    pub fn categories(&self) -> Vec<LanguageCategory> {
        let names = self.names();
        let mut grouped: Vec<LanguageCategory> = Vec::new();
        let mut placed: Vec<&str> = Vec::new();

        for label in CATEGORIES {
            let variants: Vec<String> = names
                .iter()
                .filter(|n| n.contains(label))
                .map(|n| n.to_string())
                .collect();
            if variants.is_empty() {
                continue;
            }
            placed.extend(names.iter().filter(|n| n.contains(label)).copied());
            grouped.push(LanguageCategory {
                label: label.to_string(),
                variants,
            });
        }

        let others: Vec<String> = names
            .iter()
            .filter(|n| !placed.contains(*n))
            .map(|n| n.to_string())
            .collect();
        if !others.is_empty() {
            grouped.push(LanguageCategory {
                label: "Other".to_string(),
                variants: others,
            });
        }

        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "LanguageName,LanguageCode,Voice,Gender\n\
        English (US),en-US,Joanna*,Female\n\
        English (US),en-US,Matthew,Male\n\
        Chinese (Mandarin),cmn-CN,Zhiyu*,Female\n\
        Chinese (Cantonese),yue-CN,Hiujin*,Female\n\
        Dutch,nl-NL,Laura*,Female\n";

    #[test]
    fn test_region_prefers_longest_key() {
        assert_eq!(region_for_language("Chinese (Cantonese)"), "hk");
        assert_eq!(region_for_language("Chinese (Mandarin)"), "cn");
        assert_eq!(region_for_language("Chinese"), "cn");
        assert_eq!(region_for_language("English (British)"), "us");
        assert_eq!(region_for_language("Arabic (Gulf)"), "ar");
        assert_eq!(region_for_language("Dutch"), "us");
    }

    #[test]
    fn test_hours_region() {
        assert_eq!(hours_region("cn"), "hk");
        assert_eq!(hours_region("hk"), "hk");
        assert_eq!(hours_region("ar"), "dubai");
        assert_eq!(hours_region("jp"), "us");
    }

    #[test]
    fn test_voice_marker_is_stripped() {
        let catalog = LanguageCatalog::from_reader(CSV.as_bytes()).unwrap();
        let voice = catalog.default_voice("English (US)").unwrap();
        assert_eq!(voice.voice, "Joanna");
        assert!(voice.is_default);
        assert_eq!(catalog.voices("English (US)").len(), 2);
    }

    #[test]
    fn test_names_are_unique_in_order() {
        let catalog = LanguageCatalog::from_reader(CSV.as_bytes()).unwrap();
        assert_eq!(
            catalog.names(),
            vec!["English (US)", "Chinese (Mandarin)", "Chinese (Cantonese)", "Dutch"]
        );
    }

    #[test]
    fn test_categories_group_and_collect_others() {
        let catalog = LanguageCatalog::from_reader(CSV.as_bytes()).unwrap();
        let categories = catalog.categories();

        assert_eq!(categories[0].label, "English");
        assert_eq!(categories[1].label, "Chinese");
        assert_eq!(categories[1].variants.len(), 2);
        assert_eq!(categories.last().unwrap().label, "Other");
        assert_eq!(categories.last().unwrap().variants, vec!["Dutch".to_string()]);
    }

    #[test]
    fn test_find_by_fragment() {
        let catalog = LanguageCatalog::from_reader(CSV.as_bytes()).unwrap();
        assert_eq!(catalog.find("english (us)"), Some("English (US)"));
        assert_eq!(catalog.find("canton"), Some("Chinese (Cantonese)"));
        assert_eq!(catalog.find("Klingon"), None);
    }
}
