//! Line-oriented parser for the ERD text grammar.
//!
//! Parsing is best-effort: a malformed entity block is recorded as a
//! [`SyntaxError`] covering its line range and skipped, and parsing resumes
//! after it.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error::{ErdError, Result};
use crate::schema::Multiplicity;

use super::document::{
    AttributeLine, EntityDecl, KeyMarker, ParsedDocument, RelationshipDecl, SyntaxError,
};
use super::source::SourceMetadata;

static RELATIONSHIP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<left>[\p{L}\p{N}_\-]+)\s*(?P<lm>\|\||\|o|\}\||\}o)(?P<conn>--|\.\.)(?P<rm>\|\||o\||\|\{|o\{)\s*(?P<right>[\p{L}\p{N}_\-]+)\s*(?::(?P<label>.*))?$",
    )
    .expect("relationship pattern is valid")
});

static BLOCK_OPEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^(?P<name>[\p{L}\p{N}_\-]+)\s*(?:\[\s*(?P<alias>"[^"]*"|[^\]"]*)\s*\])?\s*\{(?P<rest>.*)$"#,
    )
    .expect("block pattern is valid")
});

static BARE_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{L}\p{N}_\-]+$").expect("entity pattern is valid"));

static TYPE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\p{L}_][\p{L}\p{N}_]*(\([\d\s,]*\))?(\[\])?$").expect("type pattern is valid")
});

static NAME_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^[^\s"{}\[\]]+$"#).expect("name pattern is valid"));

/// Parses ERD text into structural tokens.
#[derive(Debug, Clone, Default)]
pub struct Parser;

/// An entity block still waiting for its closing brace.
struct OpenBlock {
    name: String,
    alias: Option<String>,
    start: usize,
    attributes: Vec<AttributeLine>,
    error: Option<String>,
}

impl OpenBlock {
    fn new(name: String, alias: Option<String>, start: usize) -> Self {
        Self {
            name,
            alias,
            start,
            attributes: Vec::new(),
            error: None,
        }
    }

    fn push_attribute(&mut self, text: &str, line: usize) {
        if self.error.is_some() {
            return;
        }
        match parse_attribute_line(text, line) {
            Ok(attr) => self.attributes.push(attr),
            Err(message) => self.error = Some(format!("line {}: {}", line, message)),
        }
    }

    fn fail(&mut self, message: String) {
        if self.error.is_none() {
            self.error = Some(message);
        }
    }
}

enum Token {
    Word(String),
    Quoted(String),
}

impl Parser {
    /// Create a new parser.
    pub fn new() -> Self {
        Self
    }

    /// Read and parse a diagram file.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<(ParsedDocument, SourceMetadata)> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| ErdError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let (document, source) = self.parse_bytes(&bytes)?;
        Ok((document, source.with_path(path.to_path_buf())))
    }

    /// Parse raw bytes, which must be UTF-8.
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<(ParsedDocument, SourceMetadata)> {
        let text = std::str::from_utf8(bytes)?;
        self.parse_text(text)
    }

    /// Parse text and reject documents with nothing recoverable.
    pub fn parse_text(&self, text: &str) -> Result<(ParsedDocument, SourceMetadata)> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        if text.trim().is_empty() {
            return Err(ErdError::EmptyInput("diagram text is blank".to_string()));
        }

        let document = self.parse(text);
        if document.is_rejected() {
            return Err(ErdError::NoEntities {
                syntax_errors: document.syntax_errors,
            });
        }

        let source = SourceMetadata::from_text(text, &document);
        Ok((document, source))
    }

    /// Parse text into a document. Never fails; problems become syntax errors.
    pub fn parse(&self, text: &str) -> ParsedDocument {
        let mut doc = ParsedDocument::default();
        let mut open: Option<OpenBlock> = None;
        let mut last_line = 0;

        for (idx, raw_line) in text.lines().enumerate() {
            let line_no = idx + 1;
            last_line = line_no;
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with("%%") {
                continue;
            }

            if let Some(mut block) = open.take() {
                // A new block or relationship means the open one was never closed.
                if find_unquoted(line, '{').is_some() || RELATIONSHIP.is_match(line) {
                    doc.syntax_errors.push(SyntaxError::new(
                        block.start,
                        line_no - 1,
                        format!("entity block '{}' is missing its closing brace", block.name),
                    ));
                } else {
                    match find_unquoted(line, '}') {
                        Some(pos) => {
                            close_block(block, &line[..pos], &line[pos + 1..], line_no, &mut doc);
                        }
                        None => {
                            block.push_attribute(line, line_no);
                            open = Some(block);
                        }
                    }
                    continue;
                }
            }

            self.parse_top_level(line, line_no, &mut doc, &mut open);
        }

        if let Some(block) = open {
            doc.syntax_errors.push(SyntaxError::new(
                block.start,
                last_line,
                format!("entity block '{}' is missing its closing brace", block.name),
            ));
        }

        doc
    }

    fn parse_top_level(
        &self,
        line: &str,
        line_no: usize,
        doc: &mut ParsedDocument,
        open: &mut Option<OpenBlock>,
    ) {
        if line.eq_ignore_ascii_case("erdiagram") || line.starts_with("direction ") {
            return;
        }

        if let Some(caps) = RELATIONSHIP.captures(line) {
            match relationship_from(&caps, line_no) {
                Ok(rel) => doc.relationships.push(rel),
                Err(message) => doc
                    .syntax_errors
                    .push(SyntaxError::new(line_no, line_no, message)),
            }
            return;
        }

        if let Some(caps) = BLOCK_OPEN.captures(line) {
            let alias = caps
                .name("alias")
                .map(|m| m.as_str().trim().trim_matches('"').trim().to_string())
                .filter(|s| !s.is_empty());
            let block = OpenBlock::new(caps["name"].to_string(), alias, line_no);
            let rest = caps.name("rest").map_or("", |m| m.as_str());
            open_block(block, rest, line_no, doc, open);
            return;
        }

        if let Some(brace) = find_unquoted(line, '{') {
            // Unparseable header: skip the whole block so its body is not
            // misread as top-level lines.
            let mut block = OpenBlock::new(line[..brace].trim().to_string(), None, line_no);
            block.fail(format!("malformed entity declaration '{}'", line[..brace].trim()));
            open_block(block, &line[brace + 1..], line_no, doc, open);
            return;
        }

        if BARE_ENTITY.is_match(line) {
            doc.entities.push(EntityDecl {
                name: line.to_string(),
                alias: None,
                line_start: line_no,
                line_end: line_no,
                attributes: Vec::new(),
            });
            return;
        }

        let message = if line.starts_with('}') {
            "closing brace without an open entity block".to_string()
        } else {
            format!("unrecognized line '{}'", line)
        };
        doc.syntax_errors
            .push(SyntaxError::new(line_no, line_no, message));
    }
}

/// Feed the text after `{` into a new block, closing it if `}` follows on the same line.
fn open_block(
    mut block: OpenBlock,
    rest: &str,
    line_no: usize,
    doc: &mut ParsedDocument,
    open: &mut Option<OpenBlock>,
) {
    match find_unquoted(rest, '}') {
        Some(pos) => close_block(block, &rest[..pos], &rest[pos + 1..], line_no, doc),
        None => {
            let rest = rest.trim();
            if !rest.is_empty() {
                block.push_attribute(rest, line_no);
            }
            *open = Some(block);
        }
    }
}

fn close_block(
    mut block: OpenBlock,
    body: &str,
    trailing: &str,
    line_no: usize,
    doc: &mut ParsedDocument,
) {
    let body = body.trim();
    if !body.is_empty() {
        block.push_attribute(body, line_no);
    }
    let trailing = trailing.trim();
    if !trailing.is_empty() {
        block.fail(format!("unexpected text after closing brace: '{}'", trailing));
    }

    match block.error {
        Some(message) => doc.syntax_errors.push(SyntaxError::new(
            block.start,
            line_no,
            format!("entity block '{}' skipped: {}", block.name, message),
        )),
        None => doc.entities.push(EntityDecl {
            name: block.name,
            alias: block.alias,
            line_start: block.start,
            line_end: line_no,
            attributes: block.attributes,
        }),
    }
}

fn relationship_from(caps: &Captures<'_>, line_no: usize) -> std::result::Result<RelationshipDecl, String> {
    let left_multiplicity = Multiplicity::from_left_marker(&caps["lm"])
        .ok_or_else(|| format!("unknown cardinality marker '{}'", &caps["lm"]))?;
    let right_multiplicity = Multiplicity::from_right_marker(&caps["rm"])
        .ok_or_else(|| format!("unknown cardinality marker '{}'", &caps["rm"]))?;
    let label = parse_label(caps.name("label").map_or("", |m| m.as_str()))?;

    Ok(RelationshipDecl {
        left: caps["left"].to_string(),
        left_multiplicity,
        identifying: &caps["conn"] == "--",
        right_multiplicity,
        right: caps["right"].to_string(),
        label,
        line: line_no,
    })
}

fn parse_label(raw: &str) -> std::result::Result<Option<String>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    if let Some(inner) = raw.strip_prefix('"') {
        return match inner.strip_suffix('"') {
            Some(label) if !label.contains('"') => {
                let label = label.trim();
                Ok((!label.is_empty()).then(|| label.to_string()))
            }
            _ => Err(format!("malformed quoted label '{}'", raw)),
        };
    }
    if raw.contains('"') {
        return Err(format!("malformed label '{}'", raw));
    }
    Ok(Some(raw.to_string()))
}

/// Parse `type name [PK|FK|UK[, ...]] ["comment"]` or `name [keys] ["comment"]`.
fn parse_attribute_line(text: &str, line: usize) -> std::result::Result<AttributeLine, String> {
    let tokens = tokenize(text)?;
    let mut words = Vec::new();
    let mut comment = None;

    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::Word(w) => words.push(w.as_str()),
            Token::Quoted(q) if i + 1 == tokens.len() => comment = Some(q.trim().to_string()),
            Token::Quoted(_) => return Err("a quoted comment must come last".to_string()),
        }
    }

    let (type_keyword, name, key_words) = match words.as_slice() {
        [] => return Err("attribute line has no name".to_string()),
        [name] => (None, *name, &words[1..]),
        [name, next, ..] if is_key_word(next) => (None, *name, &words[1..]),
        [ty, name, ..] => (Some(*ty), *name, &words[2..]),
    };

    if let Some(ty) = type_keyword {
        if !TYPE_TOKEN.is_match(ty) {
            return Err(format!("invalid type '{}'", ty));
        }
    }
    if !NAME_TOKEN.is_match(name) {
        return Err(format!("invalid attribute name '{}'", name));
    }

    let mut keys = Vec::new();
    for word in key_words {
        for part in word.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match KeyMarker::parse(part) {
                Some(marker) if !keys.contains(&marker) => keys.push(marker),
                Some(_) => {}
                None => return Err(format!("unexpected token '{}'", part)),
            }
        }
    }

    Ok(AttributeLine {
        line,
        raw: text.trim().to_string(),
        type_keyword: type_keyword.map(str::to_string),
        name: name.to_string(),
        keys,
        comment: comment.filter(|c| !c.is_empty()),
    })
}

fn is_key_word(word: &str) -> bool {
    let mut parts = word.split(',').map(str::trim).filter(|p| !p.is_empty()).peekable();
    parts.peek().is_some() && parts.all(|p| KeyMarker::parse(p).is_some())
}

fn tokenize(text: &str) -> std::result::Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '"' {
            chars.next();
            let mut quoted = String::new();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some(ch) => quoted.push(ch),
                    None => return Err("unterminated quote".to_string()),
                }
            }
            tokens.push(Token::Quoted(quoted));
        } else {
            let mut word = String::new();
            while let Some(&ch) = chars.peek() {
                if ch.is_whitespace() {
                    break;
                }
                if ch == '"' {
                    return Err(format!("unexpected quote after '{}'", word));
                }
                word.push(ch);
                chars.next();
            }
            tokens.push(Token::Word(word));
        }
    }

    Ok(tokens)
}

/// Byte offset of the first `target` outside double quotes.
fn find_unquoted(text: &str, target: char) -> Option<usize> {
    let mut in_quotes = false;
    for (idx, ch) in text.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c == target && !in_quotes => return Some(idx),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> ParsedDocument {
        Parser::new().parse(text)
    }

    #[test]
    fn test_parse_inline_block() {
        let doc = parse("erDiagram\n CUSTOMER { string name }");
        assert!(doc.syntax_errors.is_empty());
        assert_eq!(doc.entities.len(), 1);
        let entity = &doc.entities[0];
        assert_eq!(entity.name, "CUSTOMER");
        assert_eq!(entity.line_start, 2);
        assert_eq!(entity.attributes[0].type_keyword.as_deref(), Some("string"));
        assert_eq!(entity.attributes[0].name, "name");
    }

    #[test]
    fn test_parse_multiline_block() {
        let doc = parse(
            "erDiagram\n\
             CUSTOMER[\"Retail Customer\"] {\n\
               guid id PK\n\
               string email UK \"Primary contact address\"\n\
               guid region_id FK\n\
               decimal(10,2) credit_limit\n\
               nickname\n\
             }\n",
        );

        assert!(doc.syntax_errors.is_empty(), "{:?}", doc.syntax_errors);
        let entity = &doc.entities[0];
        assert_eq!(entity.alias.as_deref(), Some("Retail Customer"));
        assert_eq!((entity.line_start, entity.line_end), (2, 8));
        assert_eq!(entity.attributes.len(), 5);
        assert!(entity.attributes[0].has_key(KeyMarker::Pk));
        assert_eq!(entity.attributes[1].comment.as_deref(), Some("Primary contact address"));
        assert!(entity.attributes[1].has_key(KeyMarker::Uk));
        assert!(entity.attributes[2].has_key(KeyMarker::Fk));
        assert_eq!(entity.attributes[3].type_keyword.as_deref(), Some("decimal(10,2)"));
        assert_eq!(entity.attributes[4].type_keyword, None);
    }

    #[test]
    fn test_parse_combined_keys() {
        let doc = parse("LINE {\n  guid order_id PK, FK\n  guid product_id PK,FK \"part\"\n}");
        let attrs = &doc.entities[0].attributes;
        assert_eq!(attrs[0].keys, vec![KeyMarker::Pk, KeyMarker::Fk]);
        assert_eq!(attrs[1].keys, vec![KeyMarker::Pk, KeyMarker::Fk]);
        assert_eq!(attrs[1].comment.as_deref(), Some("part"));
    }

    #[test]
    fn test_parse_relationships() {
        let doc = parse(
            "CUSTOMER ||--o{ ORDER : places\n\
             ORDER }|..|| CUSTOMER : \"belongs to\"\n\
             STUDENT }o--o{ COURSE : enrolled_in\n\
             A ||--|| B\n",
        );

        assert!(doc.syntax_errors.is_empty());
        assert_eq!(doc.relationships.len(), 4);

        let first = &doc.relationships[0];
        assert_eq!(first.left, "CUSTOMER");
        assert_eq!(first.left_multiplicity, Multiplicity::ExactlyOne);
        assert_eq!(first.right_multiplicity, Multiplicity::ZeroOrMore);
        assert_eq!(first.label.as_deref(), Some("places"));
        assert!(first.identifying);

        let second = &doc.relationships[1];
        assert!(!second.identifying);
        assert_eq!(second.label.as_deref(), Some("belongs to"));

        assert_eq!(doc.relationships[3].label, None);
        assert_eq!(doc.recoverable_entity_count(), 6);
    }

    #[test]
    fn test_malformed_block_is_skipped() {
        let doc = parse(
            "CUSTOMER {\n  string name\n}\n\
             BROKEN {\n  string \"oops\n}\n\
             ORDER {\n  int total\n}\n",
        );

        assert_eq!(doc.entities.len(), 2);
        assert_eq!(doc.entities[0].name, "CUSTOMER");
        assert_eq!(doc.entities[1].name, "ORDER");
        assert_eq!(doc.syntax_errors.len(), 1);
        assert_eq!(doc.syntax_errors[0].line_start, 4);
        assert_eq!(doc.syntax_errors[0].line_end, 6);
        assert!(doc.syntax_errors[0].message.contains("BROKEN"));
    }

    #[test]
    fn test_unterminated_block_recovers_at_next_block() {
        let doc = parse(
            "CUSTOMER {\n  string name\n\
             ORDER {\n  int total\n}\n\
             CUSTOMER ||--o{ ORDER : places\n",
        );

        assert_eq!(doc.entities.len(), 1);
        assert_eq!(doc.entities[0].name, "ORDER");
        assert_eq!(doc.syntax_errors.len(), 1);
        assert_eq!((doc.syntax_errors[0].line_start, doc.syntax_errors[0].line_end), (1, 2));
        assert_eq!(doc.relationships.len(), 1);
    }

    #[test]
    fn test_unterminated_block_recovers_at_relationship() {
        let doc = parse("A {\n  string name\nA }o--|| B : x\n");
        assert!(doc.entities.is_empty());
        assert_eq!(doc.syntax_errors.len(), 1);
        assert_eq!(doc.relationships.len(), 1);
    }

    #[test]
    fn test_unterminated_at_eof() {
        let doc = parse("A {\n  string name\n");
        assert_eq!(doc.syntax_errors.len(), 1);
        assert_eq!(doc.syntax_errors[0].line_end, 2);
        assert!(doc.is_rejected());
    }

    #[test]
    fn test_malformed_header_skips_body() {
        let doc = parse("Cust$omer {\n  string name\n}\nORDER { int total }\n");
        assert_eq!(doc.entities.len(), 1);
        assert_eq!(doc.syntax_errors.len(), 1);
        assert_eq!(doc.syntax_errors[0].line_end, 3);
    }

    #[test]
    fn test_unknown_key_marker_is_error() {
        let doc = parse("A {\n  string name XK\n}");
        assert!(doc.entities.is_empty());
        assert!(doc.syntax_errors[0].message.contains("XK"));
    }

    #[test]
    fn test_comments_and_stray_lines() {
        let doc = parse("%% a comment\nerDiagram\n}\n?? what\nLONELY\n");
        assert_eq!(doc.entities.len(), 1);
        assert_eq!(doc.entities[0].name, "LONELY");
        assert_eq!(doc.syntax_errors.len(), 2);
    }

    #[test]
    fn test_braces_inside_comments() {
        let doc = parse("A {\n  string note \"uses { and } freely\"\n}");
        assert!(doc.syntax_errors.is_empty());
        assert_eq!(
            doc.entities[0].attributes[0].comment.as_deref(),
            Some("uses { and } freely")
        );
    }

    #[test]
    fn test_parse_text_rejects_empty_and_entityless() {
        let parser = Parser::new();
        assert!(matches!(parser.parse_text("  \n "), Err(ErdError::EmptyInput(_))));
        match parser.parse_text("erDiagram\n?? nonsense\n") {
            Err(ErdError::NoEntities { syntax_errors }) => assert_eq!(syntax_errors.len(), 1),
            other => panic!("expected rejection, got {:?}", other.map(|(d, _)| d)),
        }
    }

    #[test]
    fn test_parse_bytes_rejects_invalid_utf8() {
        let err = Parser::new().parse_bytes(&[0x41, 0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, ErdError::Encoding(_)));
    }

    #[test]
    fn test_relationship_only_document_is_accepted() {
        let (doc, source) = Parser::new()
            .parse_text("STUDENT }o--o{ COURSE : enrolled_in")
            .unwrap();
        assert!(doc.entities.is_empty());
        assert_eq!(source.relationship_declarations, 1);
    }
}
