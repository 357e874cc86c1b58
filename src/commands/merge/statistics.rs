use super::*;

const TOP_ENTITY_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCount {
    pub name: String,
    pub mentions: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStatistics {
    pub total_chapters: usize,
    pub total_units: usize,
    pub units_by_kind: BTreeMap<String, usize>,
    pub total_word_count: usize,
    pub top_characters: Vec<EntityCount>,
    pub top_locations: Vec<EntityCount>,
    pub top_concepts: Vec<EntityCount>,
}

pub(super) fn compute_statistics(rows: &[MasterRow]) -> MergeStatistics {
    let mut chapters = BTreeSet::new();
    let mut units_by_kind: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_word_count = 0;

    for row in rows {
        if let Some(source) = &row.source {
            chapters.insert(source.chapter);
            *units_by_kind
                .entry(source.kind.as_str().to_string())
                .or_default() += 1;
            total_word_count += source.word_count;
        }
    }

    MergeStatistics {
        total_chapters: chapters.len(),
        total_units: rows.len(),
        units_by_kind,
        total_word_count,
        top_characters: top_entities(rows, AttributeKind::Characters),
        top_locations: top_entities(rows, AttributeKind::Locations),
        top_concepts: top_entities(rows, AttributeKind::Concepts),
    }
}

/// Most mentioned values of one attribute; ties break by name so the
/// ranking is stable across runs.
fn top_entities(rows: &[MasterRow], kind: AttributeKind) -> Vec<EntityCount> {
    let mut mentions: HashMap<&str, usize> = HashMap::new();
    for row in rows {
        for name in row.row.attribute(kind) {
            *mentions.entry(name.as_str()).or_default() += 1;
        }
    }

    let mut ranked = mentions
        .into_iter()
        .map(|(name, mentions)| EntityCount {
            name: name.to_string(),
            mentions,
        })
        .collect::<Vec<_>>();
    ranked.sort_by(|a, b| b.mentions.cmp(&a.mentions).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(TOP_ENTITY_LIMIT);
    ranked
}
