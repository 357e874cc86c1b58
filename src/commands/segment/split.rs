use super::*;

const ABBREVIATION_MARK: char = '\u{E000}';

/// Splits raw narrative text into positioned units.
///
/// Never fails on content: text without recognizable structure degrades to
/// coarser units (a whole paragraph as one sentence, a preamble as chapter 0).
pub struct Segmenter {
    chapter_header: Regex,
    paragraph_break: Regex,
    structured_start: Regex,
    list_marker: Regex,
    abbreviation: Regex,
    sentence_end: Regex,
}

impl Segmenter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            chapter_header: Regex::new(r"(?mi)^[ \t]*chapter[ \t]+\d+[ \t]*:.*$")
                .context("failed to compile chapter header regex")?,
            paragraph_break: Regex::new(r"\n[ \t]*\n")
                .context("failed to compile paragraph break regex")?,
            structured_start: Regex::new(
                r"^(?:[•*\-–][ \t]|\d{1,3}[.)][ \t]|[A-Z][A-Za-z0-9 '\-]{0,40}:(?:[ \t]|$))",
            )
            .context("failed to compile structured paragraph regex")?,
            list_marker: Regex::new(r"^(?:[•*\-–][ \t]|\d{1,3}[.)][ \t])")
                .context("failed to compile list marker regex")?,
            abbreviation: Regex::new(
                r"\b(Dr|Mr|Mrs|Ms|Prof|Sr|Jr|St|Inc|Ltd|Corp|Co|etc|vs|e\.g|i\.e)\.",
            )
            .context("failed to compile abbreviation regex")?,
            sentence_end: Regex::new(r#"[.!?]+["'”’)\]]*\s+"#)
                .context("failed to compile sentence boundary regex")?,
        })
    }

    pub fn segment(&self, text: &str) -> Vec<Unit> {
        let text = text.replace("\r\n", "\n");
        let mut units = Vec::new();

        let headers = self.chapter_header.find_iter(&text).collect::<Vec<_>>();
        let preamble_end = headers.first().map(|m| m.start()).unwrap_or(text.len());
        // Text without any header is one implicit chapter; text ahead of the
        // first header is chapter 0 so header numbering starts at 1.
        let preamble_chapter = if headers.is_empty() { 1 } else { 0 };
        self.push_chapter_body(&text[..preamble_end], preamble_chapter, &mut units);

        for (index, header) in headers.iter().enumerate() {
            let chapter = (index + 1) as u32;
            let header_text = normalize_whitespace(header.as_str());
            units.push(build_unit(
                UnitPosition::new(chapter, 0, 0),
                UnitKind::ChapterHeader,
                header_text,
                UnitFlags {
                    is_header: true,
                    ..UnitFlags::default()
                },
            ));

            let body_end = headers
                .get(index + 1)
                .map(|next| next.start())
                .unwrap_or(text.len());
            self.push_chapter_body(&text[header.end()..body_end], chapter, &mut units);
        }

        units
    }

    fn push_chapter_body(&self, body: &str, chapter: u32, units: &mut Vec<Unit>) {
        let paragraphs = self
            .paragraph_break
            .split(body)
            .map(str::trim)
            .filter(|paragraph| !paragraph.is_empty());

        for (index, paragraph) in paragraphs.enumerate() {
            let paragraph_index = (index + 1) as u32;
            if self.is_structured(paragraph) {
                self.push_structured_lines(paragraph, chapter, paragraph_index, units);
            } else {
                self.push_sentences(paragraph, chapter, paragraph_index, units);
            }
        }
    }

    fn is_structured(&self, paragraph: &str) -> bool {
        paragraph
            .lines()
            .next()
            .map(|line| self.structured_start.is_match(line.trim()))
            .unwrap_or(false)
    }

    fn push_structured_lines(
        &self,
        paragraph: &str,
        chapter: u32,
        paragraph_index: u32,
        units: &mut Vec<Unit>,
    ) {
        let lines = paragraph
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty());

        for (index, line) in lines.enumerate() {
            let flags = UnitFlags {
                is_list_item: self.list_marker.is_match(line),
                is_definition: line.contains(':'),
                ..UnitFlags::default()
            };
            units.push(build_unit(
                UnitPosition::new(chapter, paragraph_index, (index + 1) as u32),
                UnitKind::StructuredLine,
                normalize_whitespace(line),
                flags,
            ));
        }
    }

    fn push_sentences(
        &self,
        paragraph: &str,
        chapter: u32,
        paragraph_index: u32,
        units: &mut Vec<Unit>,
    ) {
        for (index, sentence) in self.split_sentences(paragraph).into_iter().enumerate() {
            let flags = UnitFlags {
                has_dialogue: sentence.contains(['"', '“', '”']),
                ..UnitFlags::default()
            };
            units.push(build_unit(
                UnitPosition::new(chapter, paragraph_index, (index + 1) as u32),
                UnitKind::Sentence,
                sentence,
                flags,
            ));
        }
    }

    /// Sentence boundaries are terminal punctuation, optional closing quotes,
    /// whitespace, then an uppercase letter (optionally behind an opening quote).
    pub fn split_sentences(&self, paragraph: &str) -> Vec<String> {
        let flattened = normalize_whitespace(paragraph);
        let masked = self
            .abbreviation
            .replace_all(&flattened, |caps: &Captures| {
                format!("{}{}", &caps[1], ABBREVIATION_MARK)
            })
            .into_owned();

        let mut sentences = Vec::new();
        let mut start = 0usize;
        for boundary in self.sentence_end.find_iter(&masked) {
            if !starts_new_sentence(&masked[boundary.end()..]) {
                continue;
            }
            push_sentence(&masked[start..boundary.end()], &mut sentences);
            start = boundary.end();
        }
        push_sentence(&masked[start..], &mut sentences);

        debug!(count = sentences.len(), "split paragraph into sentences");
        sentences
    }
}

fn starts_new_sentence(rest: &str) -> bool {
    let mut chars = rest.chars();
    match chars.next() {
        Some(first) if first.is_uppercase() => true,
        Some('"' | '“' | '\'' | '‘' | '(') => chars.next().is_some_and(char::is_uppercase),
        _ => false,
    }
}

fn push_sentence(masked: &str, sentences: &mut Vec<String>) {
    let sentence = masked.trim().replace(ABBREVIATION_MARK, ".");
    if !sentence.is_empty() {
        sentences.push(sentence);
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct UnitFlags {
    is_header: bool,
    is_list_item: bool,
    is_definition: bool,
    has_dialogue: bool,
}

fn build_unit(position: UnitPosition, kind: UnitKind, text: String, flags: UnitFlags) -> Unit {
    let metadata = UnitMetadata {
        word_count: text.split_whitespace().count(),
        is_header: flags.is_header,
        is_list_item: flags.is_list_item,
        is_definition: flags.is_definition,
        has_dialogue: flags.has_dialogue,
    };

    Unit {
        uid: position.uid(),
        kind,
        chapter: position.chapter,
        paragraph: position.paragraph,
        sentence: position.sentence,
        content_digest: short_digest(&text),
        text,
        metadata,
    }
}
