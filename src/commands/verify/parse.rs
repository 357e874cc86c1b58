use super::*;

/// Columns the verifier understands; any other header cell is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TableColumn {
    Uid,
    RawSentence,
    NarrativePurpose,
    Attribute(AttributeKind),
}

impl TableColumn {
    pub const REQUIRED: [TableColumn; 3] = [Self::Uid, Self::RawSentence, Self::NarrativePurpose];
    pub const OPTIONAL: [TableColumn; 4] = [
        Self::Attribute(AttributeKind::Characters),
        Self::Attribute(AttributeKind::Locations),
        Self::Attribute(AttributeKind::Concepts),
        Self::Attribute(AttributeKind::Links),
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::Uid => "UID",
            Self::RawSentence => "Raw Sentence",
            Self::NarrativePurpose => "Narrative Purpose",
            Self::Attribute(kind) => kind.column_title(),
        }
    }

    fn from_header_cell(cell: &str) -> Option<Self> {
        let normalized = normalize_whitespace(cell).to_ascii_lowercase();
        match normalized.as_str() {
            "uid" => Some(Self::Uid),
            "raw sentence" => Some(Self::RawSentence),
            "narrative purpose" => Some(Self::NarrativePurpose),
            "characters" => Some(Self::Attribute(AttributeKind::Characters)),
            "locations" => Some(Self::Attribute(AttributeKind::Locations)),
            "key items/concepts" | "key items" | "concepts" => {
                Some(Self::Attribute(AttributeKind::Concepts))
            }
            "links" => Some(Self::Attribute(AttributeKind::Links)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTable {
    pub rows: Vec<TransformedRow>,
    /// Recognized columns of the last header seen; empty when no header was found.
    pub columns: BTreeSet<TableColumn>,
    pub dropped_row_count: usize,
}

impl ParsedTable {
    pub fn has_column(&self, column: TableColumn) -> bool {
        self.columns.contains(&column)
    }
}

/// Extracts transformed rows from a pipe-table response.
///
/// Lines before the header are ignored. After it, every line containing a
/// pipe is a candidate row; a row without a uid or a raw-sentence cell is
/// dropped and counted, never fatal.
pub fn parse_table(response: &str) -> ParsedTable {
    let mut table = ParsedTable::default();
    let mut layout: Option<HashMap<TableColumn, usize>> = None;

    for line in response.lines() {
        let line = line.trim();
        if line.is_empty() || !line.contains('|') {
            continue;
        }

        let cells = split_cells(line);
        if let Some(header) = header_layout(&cells) {
            table.columns = header.keys().copied().collect();
            layout = Some(header);
            continue;
        }

        let Some(columns) = layout.as_ref() else {
            continue;
        };
        if is_separator(line) {
            continue;
        }

        match build_row(columns, &cells) {
            Some(row) => table.rows.push(row),
            None => {
                table.dropped_row_count += 1;
                debug!(line = %line, "dropped malformed table row");
            }
        }
    }

    table
}

fn header_layout(cells: &[String]) -> Option<HashMap<TableColumn, usize>> {
    let mut layout = HashMap::new();
    for (index, cell) in cells.iter().enumerate() {
        if let Some(column) = TableColumn::from_header_cell(cell) {
            layout.entry(column).or_insert(index);
        }
    }
    if layout.contains_key(&TableColumn::Uid) && layout.contains_key(&TableColumn::RawSentence) {
        Some(layout)
    } else {
        None
    }
}

fn build_row(columns: &HashMap<TableColumn, usize>, cells: &[String]) -> Option<TransformedRow> {
    let cell = |column: TableColumn| columns.get(&column).and_then(|index| cells.get(*index));

    let uid = cell(TableColumn::Uid).filter(|value| !value.is_empty())?;
    let raw_sentence = cell(TableColumn::RawSentence)?;

    let attributes = AttributeKind::ALL
        .iter()
        .filter_map(|kind| {
            cell(TableColumn::Attribute(*kind)).map(|value| (*kind, split_attribute_values(value)))
        })
        .collect();

    Some(TransformedRow {
        uid: uid.clone(),
        raw_sentence: raw_sentence.clone(),
        narrative_purpose: cell(TableColumn::NarrativePurpose)
            .cloned()
            .unwrap_or_default(),
        attributes,
    })
}

/// Splits a table line on unescaped pipes; `\|` stands for a literal pipe.
fn split_cells(line: &str) -> Vec<String> {
    let inner = line.strip_prefix('|').unwrap_or(line);
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = inner.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(ch),
        }
    }

    let tail = current.trim();
    if !tail.is_empty() {
        cells.push(tail.to_string());
    }
    cells
}

fn is_separator(line: &str) -> bool {
    line.chars()
        .all(|ch| matches!(ch, '|' | '-' | ':' | ' ' | '\t'))
}

fn split_attribute_values(value: &str) -> Vec<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == "-" || trimmed.eq_ignore_ascii_case("n/a") {
        return Vec::new();
    }
    trimmed
        .split([',', ';'])
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
