use super::*;

const SKIPPED_CAPITALIZED_WORDS: [&str; 4] = ["The", "This", "That", "These"];
const LOCATION_KEYWORDS: [(&str, &str); 2] = [("factory", "Factory"), ("city", "City")];
const CONCEPT_KEYWORDS: [(&str, &str); 6] = [
    ("zombie", "Zombie"),
    ("orb", "Orb"),
    ("void", "Void"),
    ("crystal", "Crystal"),
    ("weapon", "Weapon"),
    ("shield", "Shield"),
];

/// Deterministic stand-in for the annotation service.
///
/// Every row copies uid and text exactly, so its output always passes
/// completeness and fidelity; the annotations themselves are crude keyword
/// heuristics.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackGenerator;

impl FallbackGenerator {
    pub fn render(&self, batch: &Batch) -> String {
        let mut table = String::new();
        table.push_str(
            "| UID | Raw Sentence | Narrative Purpose | Characters | Locations | Key Items/Concepts | Links |\n",
        );
        table.push_str("|-----|--------------|-------------------|------------|-----------|--------------------|-------|\n");

        for unit in &batch.units {
            let paragraph = UnitPosition::parse(&unit.uid).map(|position| position.paragraph);
            let purpose = if paragraph == Some(1) {
                "Establishes setting"
            } else {
                "Develops narrative"
            };
            let lowered = unit.text.to_lowercase();

            let characters = capitalized_names(&unit.text);
            let locations = keyword_hits(&lowered, &LOCATION_KEYWORDS);
            let concepts = keyword_hits(&lowered, &CONCEPT_KEYWORDS);

            table.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} | N/A |\n",
                unit.uid,
                escape_cell(&unit.text),
                purpose,
                join_or_na(&characters),
                join_or_na(&locations),
                join_or_na(&concepts),
            ));
        }

        table
    }
}

impl TransformAdapter for FallbackGenerator {
    fn name(&self) -> &str {
        "fallback"
    }

    fn transform(&self, batch: &Batch) -> TransformOutcome {
        TransformOutcome::Success(self.render(batch))
    }
}

fn capitalized_names(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for word in text.split_whitespace() {
        let starts_upper = word.chars().next().is_some_and(char::is_uppercase);
        if !starts_upper || word.chars().count() <= 2 || SKIPPED_CAPITALIZED_WORDS.contains(&word) {
            continue;
        }
        let name = word.trim_matches(['.', ',', '!', '?']);
        if !name.is_empty() && !names.iter().any(|seen| seen == name) {
            names.push(name.to_string());
        }
    }
    names
}

fn keyword_hits(lowered: &str, keywords: &[(&str, &str)]) -> Vec<String> {
    keywords
        .iter()
        .filter(|(needle, _)| lowered.contains(needle))
        .map(|(_, label)| (*label).to_string())
        .collect()
}

fn join_or_na(values: &[String]) -> String {
    if values.is_empty() {
        "N/A".to_string()
    } else {
        escape_cell(&values.join(", "))
    }
}

fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|")
}
