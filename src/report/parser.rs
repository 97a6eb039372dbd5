use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{Result, TriageError};
use crate::report::{DamageEntry, DamageReport, ParsedReport, Severity};

const ROOT: &[u8] = b"damageReport";
const DAMAGE: &[u8] = b"damage";
const TOTAL: &[u8] = b"totalEstimatedCostUSD";
const NOTES: &[u8] = b"notes";

/// Parse model output into a [`DamageReport`], discarding warnings.
///
/// See [`parse_report_with_warnings`] for the rules.
pub fn parse_report(text: &str) -> Result<DamageReport> {
    parse_report_with_warnings(text).map(|parsed| parsed.report)
}

/// Parse model output into a [`DamageReport`] plus non-fatal warnings.
///
/// The text must be XML only: a single `<damageReport>` root holding one or
/// more `<damage>` elements, one `<totalEstimatedCostUSD>` and an optional
/// `<notes>`. Prose around the document fails with
/// [`TriageError::UnexpectedContent`]; anything structurally wrong fails with
/// [`TriageError::SchemaViolation`]. There is no partial result.
///
/// A stated total that disagrees with the entries is reported as a
/// [`ReportWarning`](crate::ReportWarning), not an error.
///
/// ```rust
/// use damage_triage::{parse_report_with_warnings, Severity};
///
/// let parsed = parse_report_with_warnings(
///     r#"<damageReport>
///          <damage type="Dent" severity="Minor" estimatedCostUSD="150.00"/>
///          <totalEstimatedCostUSD>150.00</totalEstimatedCostUSD>
///          <notes>Small door dent.</notes>
///        </damageReport>"#,
/// )?;
/// assert_eq!(parsed.report.entries()[0].severity(), Severity::Minor);
/// assert!(parsed.warnings.is_empty());
/// # Ok::<(), damage_triage::TriageError>(())
/// ```
pub fn parse_report_with_warnings(text: &str) -> Result<ParsedReport> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(TriageError::SchemaViolation(
            "empty document, expected a <damageReport> root".to_string(),
        ));
    }
    if !trimmed.starts_with('<') {
        return Err(TriageError::UnexpectedContent(format!(
            "text before XML: {:?}",
            preview(trimmed)
        )));
    }

    let mut reader = Reader::from_str(trimmed);
    reader.config_mut().trim_text(true);

    let mut builder = ReportBuilder::default();
    let mut state = State::Prolog;

    loop {
        let event = reader.read_event().map_err(|e| {
            TriageError::SchemaViolation(format!(
                "malformed XML at byte {}: {}",
                reader.buffer_position(),
                e
            ))
        })?;

        state = match (state, event) {
            (s, Event::Comment(_)) | (s, Event::PI(_)) => s,
            (State::Prolog, Event::Decl(_)) | (State::Prolog, Event::DocType(_)) => State::Prolog,

            (State::Prolog, Event::Start(e)) => {
                expect_root(&e)?;
                State::Body
            }
            (State::Prolog, Event::Empty(e)) => {
                expect_root(&e)?;
                State::Epilog
            }
            (State::Prolog, Event::Text(t)) => {
                return Err(TriageError::UnexpectedContent(format!(
                    "text before <damageReport>: {:?}",
                    preview(&decode_text(&t)?)
                )));
            }

            (State::Body, Event::Empty(e)) => {
                match e.name().as_ref() {
                    DAMAGE => builder.push_damage(&e)?,
                    TOTAL => builder.set_total(String::new())?,
                    NOTES => builder.set_notes(String::new())?,
                    _ => return Err(unknown_element(&e)),
                }
                State::Body
            }
            (State::Body, Event::Start(e)) => match e.name().as_ref() {
                DAMAGE => {
                    builder.push_damage(&e)?;
                    State::InDamage
                }
                TOTAL => State::InTotal(String::new()),
                NOTES => State::InNotes(String::new()),
                _ => return Err(unknown_element(&e)),
            },
            (State::Body, Event::End(_)) => State::Epilog,
            (State::Body, Event::Text(t)) => {
                return Err(TriageError::SchemaViolation(format!(
                    "stray text inside <damageReport>: {:?}",
                    preview(&decode_text(&t)?)
                )));
            }

            (State::InDamage, Event::End(_)) => State::Body,
            (State::InDamage, Event::Start(e)) | (State::InDamage, Event::Empty(e)) => {
                return Err(TriageError::SchemaViolation(format!(
                    "<damage> must not contain elements, found <{}>",
                    element_name(&e)
                )));
            }
            (State::InDamage, Event::Text(_)) | (State::InDamage, Event::CData(_)) => {
                return Err(TriageError::SchemaViolation(
                    "<damage> must not contain text".to_string(),
                ));
            }

            (State::InTotal(mut buf), Event::Text(t)) => {
                buf.push_str(&decode_text(&t)?);
                State::InTotal(buf)
            }
            (State::InTotal(mut buf), Event::CData(c)) => {
                buf.push_str(&String::from_utf8_lossy(&c));
                State::InTotal(buf)
            }
            (State::InTotal(buf), Event::End(_)) => {
                builder.set_total(buf)?;
                State::Body
            }

            (State::InNotes(mut buf), Event::Text(t)) => {
                buf.push_str(&decode_text(&t)?);
                State::InNotes(buf)
            }
            (State::InNotes(mut buf), Event::CData(c)) => {
                buf.push_str(&String::from_utf8_lossy(&c));
                State::InNotes(buf)
            }
            (State::InNotes(buf), Event::End(_)) => {
                builder.set_notes(buf)?;
                State::Body
            }
            (State::InTotal(_), Event::Start(e))
            | (State::InTotal(_), Event::Empty(e))
            | (State::InNotes(_), Event::Start(e))
            | (State::InNotes(_), Event::Empty(e)) => {
                return Err(TriageError::SchemaViolation(format!(
                    "unexpected element <{}> inside a text element",
                    element_name(&e)
                )));
            }

            (State::Epilog, Event::Eof) => break,
            (State::Epilog, Event::Text(t)) => {
                return Err(TriageError::UnexpectedContent(format!(
                    "text after </damageReport>: {:?}",
                    preview(&decode_text(&t)?)
                )));
            }
            (State::Epilog, Event::Start(e)) | (State::Epilog, Event::Empty(e)) => {
                return Err(TriageError::UnexpectedContent(format!(
                    "element <{}> after </damageReport>",
                    element_name(&e)
                )));
            }

            (State::Prolog, Event::Eof) => {
                return Err(TriageError::SchemaViolation(
                    "missing <damageReport> root element".to_string(),
                ));
            }
            (_, Event::Eof) => {
                return Err(TriageError::SchemaViolation(
                    "document ended before </damageReport>".to_string(),
                ));
            }
            (_, other) => {
                return Err(TriageError::SchemaViolation(format!(
                    "unexpected XML node: {:?}",
                    other
                )));
            }
        };
    }

    let report = builder.finish()?;
    let warnings = report.check_total().into_iter().collect();
    Ok(ParsedReport { report, warnings })
}

enum State {
    Prolog,
    Body,
    InDamage,
    InTotal(String),
    InNotes(String),
    Epilog,
}

#[derive(Default)]
struct ReportBuilder {
    entries: Vec<DamageEntry>,
    total: Option<f64>,
    notes: Option<String>,
}

impl ReportBuilder {
    fn push_damage(&mut self, e: &BytesStart<'_>) -> Result<()> {
        if self.total.is_some() || self.notes.is_some() {
            return Err(TriageError::SchemaViolation(
                "<damage> elements must come before <totalEstimatedCostUSD> and <notes>"
                    .to_string(),
            ));
        }

        let index = self.entries.len() + 1;
        let mut damage_type = None;
        let mut severity = None;
        let mut cost = None;
        let mut location = None;

        for attr in e.attributes() {
            let attr = attr.map_err(|err| {
                TriageError::SchemaViolation(format!("damage #{}: bad attribute: {}", index, err))
            })?;
            let value = attr
                .unescape_value()
                .map_err(|err| {
                    TriageError::SchemaViolation(format!(
                        "damage #{}: bad attribute value: {}",
                        index, err
                    ))
                })?
                .into_owned();
            match attr.key.as_ref() {
                b"type" => damage_type = Some(value),
                b"severity" => severity = Some(value),
                b"estimatedCostUSD" => cost = Some(value),
                b"location" => location = Some(value),
                _ => {}
            }
        }

        let missing = |name: &str| {
            TriageError::SchemaViolation(format!(
                "damage #{} is missing the {} attribute",
                index, name
            ))
        };
        let damage_type = damage_type.ok_or_else(|| missing("type"))?;
        let severity: Severity = severity
            .ok_or_else(|| missing("severity"))?
            .parse()
            .map_err(|e| in_damage(index, e))?;
        let cost = cost.ok_or_else(|| missing("estimatedCostUSD"))?;
        let cost = parse_usd(&cost, "estimatedCostUSD").map_err(|e| in_damage(index, e))?;

        let mut entry = DamageEntry::new(damage_type.trim(), severity, cost)?;
        if let Some(location) = location {
            entry = entry.with_location(location.trim());
        }
        self.entries.push(entry);
        Ok(())
    }

    fn set_total(&mut self, raw: String) -> Result<()> {
        if self.total.is_some() {
            return Err(TriageError::SchemaViolation(
                "duplicate <totalEstimatedCostUSD> element".to_string(),
            ));
        }
        self.total = Some(parse_usd(&raw, "totalEstimatedCostUSD")?);
        Ok(())
    }

    fn set_notes(&mut self, raw: String) -> Result<()> {
        if self.notes.is_some() {
            return Err(TriageError::SchemaViolation(
                "duplicate <notes> element".to_string(),
            ));
        }
        self.notes = Some(raw.trim().to_string());
        Ok(())
    }

    fn finish(self) -> Result<DamageReport> {
        let total = self.total.ok_or_else(|| {
            TriageError::SchemaViolation("missing <totalEstimatedCostUSD> element".to_string())
        })?;
        DamageReport::new(self.entries, total, self.notes)
    }
}

/// Parse a plain decimal dollar amount such as `150`, `150.5` or `150.00`.
fn parse_usd(raw: &str, field: &str) -> Result<f64> {
    let s = raw.trim();
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (s, None),
    };
    let digits = |p: &str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());
    let well_formed = digits(int_part) && frac_part.is_none_or(digits);

    if !well_formed {
        let negative = s
            .strip_prefix('-')
            .is_some_and(|rest| rest.parse::<f64>().is_ok());
        let reason = if negative {
            "must be non-negative"
        } else {
            "is not a decimal amount"
        };
        return Err(TriageError::SchemaViolation(format!(
            "{} {}: {:?}",
            field, reason, s
        )));
    }

    s.parse::<f64>().map_err(|e| {
        TriageError::SchemaViolation(format!("{} is not a decimal amount: {}", field, e))
    })
}

// Prefix a schema violation with the position of the offending <damage>
fn in_damage(index: usize, err: TriageError) -> TriageError {
    match err {
        TriageError::SchemaViolation(msg) => {
            TriageError::SchemaViolation(format!("damage #{}: {}", index, msg))
        }
        other => other,
    }
}

fn expect_root(e: &BytesStart<'_>) -> Result<()> {
    if e.name().as_ref() == ROOT {
        Ok(())
    } else {
        Err(TriageError::SchemaViolation(format!(
            "root element must be <damageReport>, found <{}>",
            element_name(e)
        )))
    }
}

fn unknown_element(e: &BytesStart<'_>) -> TriageError {
    TriageError::SchemaViolation(format!(
        "unexpected element <{}> inside <damageReport>",
        element_name(e)
    ))
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn decode_text(t: &quick_xml::events::BytesText<'_>) -> Result<String> {
    t.unescape()
        .map(|s| s.into_owned())
        .map_err(|e| TriageError::SchemaViolation(format!("bad text content: {}", e)))
}

fn preview(text: &str) -> String {
    const MAX: usize = 60;
    match text.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{DamageType, ReportWarning};

    const DENT: &str = r#"<damageReport><damage type="Dent" severity="Minor" estimatedCostUSD="150.00"/><totalEstimatedCostUSD>150.00</totalEstimatedCostUSD><notes>Small door dent.</notes></damageReport>"#;

    fn schema_violation(text: &str) -> String {
        match parse_report(text) {
            Err(TriageError::SchemaViolation(msg)) => msg,
            other => panic!("expected SchemaViolation, got {:?}", other),
        }
    }

    #[test]
    fn test_single_dent() {
        let report = parse_report(DENT).unwrap();
        assert_eq!(report.entries().len(), 1);
        let entry = &report.entries()[0];
        assert_eq!(entry.damage_type(), &DamageType::Dent);
        assert_eq!(entry.severity(), Severity::Minor);
        assert_eq!(entry.estimated_cost_usd(), 150.00);
        assert_eq!(report.total_estimated_cost_usd(), 150.00);
        assert_eq!(report.notes(), Some("Small door dent."));
    }

    #[test]
    fn test_pretty_printed_with_declaration_and_comments() {
        let text = r#"
<?xml version="1.0" encoding="UTF-8"?>
<damageReport>
  <damage type="Scratch" severity="Moderate" estimatedCostUSD="320" location="Driver Side Door"/>
  <!-- second finding -->
  <damage type="BrokenLamp" severity="Severe" estimatedCostUSD="480.75"></damage>
  <totalEstimatedCostUSD> 800.75 </totalEstimatedCostUSD>
  <notes>Front &amp; side impact.</notes>
</damageReport>
"#;
        let parsed = parse_report_with_warnings(text).unwrap();
        let report = &parsed.report;
        assert_eq!(report.entries().len(), 2);
        assert_eq!(report.entries()[0].location(), Some("Driver Side Door"));
        assert_eq!(report.entries()[1].damage_type(), &DamageType::BrokenLamp);
        assert_eq!(report.entries()[1].location(), None);
        assert_eq!(report.notes(), Some("Front & side impact."));
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn test_notes_are_optional() {
        let text = r#"<damageReport><damage type="FlatTire" severity="Moderate" estimatedCostUSD="200"/><totalEstimatedCostUSD>200</totalEstimatedCostUSD></damageReport>"#;
        let report = parse_report(text).unwrap();
        assert_eq!(report.notes(), None);
    }

    #[test]
    fn test_free_text_damage_type() {
        let text = r#"<damageReport><damage type="Bent Rim" severity="Severe" estimatedCostUSD="650"/><totalEstimatedCostUSD>650</totalEstimatedCostUSD></damageReport>"#;
        let report = parse_report(text).unwrap();
        assert_eq!(
            report.entries()[0].damage_type(),
            &DamageType::Other("Bent Rim".to_string())
        );
    }

    #[test]
    fn test_wrong_root() {
        let msg = schema_violation(r#"<report><damage type="Dent" severity="Minor" estimatedCostUSD="1"/></report>"#);
        assert!(msg.contains("root element"));
        schema_violation("<damage type=\"Dent\" severity=\"Minor\" estimatedCostUSD=\"1\"/>");
        schema_violation("");
        schema_violation("<!-- nothing here -->");
    }

    #[test]
    fn test_missing_attributes() {
        for damage in [
            r#"<damage severity="Minor" estimatedCostUSD="1"/>"#,
            r#"<damage type="Dent" estimatedCostUSD="1"/>"#,
            r#"<damage type="Dent" severity="Minor"/>"#,
        ] {
            let text = format!(
                "<damageReport>{}<totalEstimatedCostUSD>1</totalEstimatedCostUSD></damageReport>",
                damage
            );
            let msg = schema_violation(&text);
            assert!(msg.contains("missing"), "{}", msg);
        }
    }

    #[test]
    fn test_bad_severity() {
        let text = r#"<damageReport><damage type="Dent" severity="minor" estimatedCostUSD="1"/><totalEstimatedCostUSD>1</totalEstimatedCostUSD></damageReport>"#;
        let msg = schema_violation(text);
        assert!(msg.contains("severity"));
    }

    #[test]
    fn test_non_numeric_costs() {
        for cost in ["abc", "", "$150", "1,200.00", "-5", "1e3", "NaN", "150.", ".5"] {
            let text = format!(
                r#"<damageReport><damage type="Dent" severity="Minor" estimatedCostUSD="{}"/><totalEstimatedCostUSD>1</totalEstimatedCostUSD></damageReport>"#,
                cost
            );
            let msg = schema_violation(&text);
            assert!(msg.contains("estimatedCostUSD"), "{}: {}", cost, msg);
        }
        let msg = schema_violation(
            r#"<damageReport><damage type="Dent" severity="Minor" estimatedCostUSD="1"/><totalEstimatedCostUSD>lots</totalEstimatedCostUSD></damageReport>"#,
        );
        assert!(msg.contains("totalEstimatedCostUSD"));
    }

    #[test]
    fn test_negative_cost_message() {
        let msg = schema_violation(
            r#"<damageReport><damage type="Dent" severity="Minor" estimatedCostUSD="-5"/><totalEstimatedCostUSD>1</totalEstimatedCostUSD></damageReport>"#,
        );
        assert!(msg.contains("non-negative"));
    }

    #[test]
    fn test_structure_violations() {
        // no damage entries
        schema_violation(
            "<damageReport><totalEstimatedCostUSD>0</totalEstimatedCostUSD></damageReport>",
        );
        // no total
        schema_violation(
            r#"<damageReport><damage type="Dent" severity="Minor" estimatedCostUSD="1"/></damageReport>"#,
        );
        // duplicate total
        schema_violation(
            r#"<damageReport><damage type="Dent" severity="Minor" estimatedCostUSD="1"/><totalEstimatedCostUSD>1</totalEstimatedCostUSD><totalEstimatedCostUSD>1</totalEstimatedCostUSD></damageReport>"#,
        );
        // unknown element
        schema_violation(
            r#"<damageReport><damage type="Dent" severity="Minor" estimatedCostUSD="1"/><vin>123</vin><totalEstimatedCostUSD>1</totalEstimatedCostUSD></damageReport>"#,
        );
        // damage after total
        schema_violation(
            r#"<damageReport><totalEstimatedCostUSD>1</totalEstimatedCostUSD><damage type="Dent" severity="Minor" estimatedCostUSD="1"/></damageReport>"#,
        );
        // unclosed root
        schema_violation(
            r#"<damageReport><damage type="Dent" severity="Minor" estimatedCostUSD="1"/><totalEstimatedCostUSD>1</totalEstimatedCostUSD>"#,
        );
        // mismatched tags
        schema_violation(
            r#"<damageReport><damage type="Dent" severity="Minor" estimatedCostUSD="1"/><notes>x</total></damageReport>"#,
        );
    }

    #[test]
    fn test_leading_prose_is_unexpected_content() {
        let text = format!("Here is the damage report you asked for:\n{}", DENT);
        assert!(matches!(
            parse_report(&text),
            Err(TriageError::UnexpectedContent(_))
        ));
        let fenced = format!("```xml\n{}\n```", DENT);
        assert!(matches!(
            parse_report(&fenced),
            Err(TriageError::UnexpectedContent(_))
        ));
    }

    #[test]
    fn test_trailing_prose_is_unexpected_content() {
        let text = format!("{}\nLet me know if you need anything else.", DENT);
        assert!(matches!(
            parse_report(&text),
            Err(TriageError::UnexpectedContent(_))
        ));
        let second_root = format!("{}{}", DENT, DENT);
        assert!(matches!(
            parse_report(&second_root),
            Err(TriageError::UnexpectedContent(_))
        ));
    }

    #[test]
    fn test_total_mismatch_is_a_warning() {
        let text = r#"<damageReport>
  <damage type="Dent" severity="Minor" estimatedCostUSD="150.00"/>
  <damage type="ShatteredGlass" severity="Severe" estimatedCostUSD="900.50"/>
  <totalEstimatedCostUSD>1051.00</totalEstimatedCostUSD>
  <notes>Windshield and door.</notes>
</damageReport>"#;
        let parsed = parse_report_with_warnings(text).unwrap();
        assert_eq!(parsed.report.total_estimated_cost_usd(), 1051.00);
        assert_eq!(
            parsed.warnings,
            vec![ReportWarning::TotalMismatch {
                stated: 1051.00,
                computed: 1050.50
            }]
        );
    }

    #[test]
    fn test_reparse_serialized_report_is_idempotent() {
        let texts = [
            DENT.to_string(),
            r#"<damageReport><damage type="Scratch &amp; Scuff" severity="Moderate" estimatedCostUSD="320.125" location="Hood"/><damage type="FlatTire" severity="Severe" estimatedCostUSD="0"/><totalEstimatedCostUSD>320.13</totalEstimatedCostUSD></damageReport>"#.to_string(),
        ];
        for text in texts {
            let first = parse_report(&text).unwrap();
            let second = parse_report(&first.to_xml()).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_parse_usd() {
        assert_eq!(parse_usd("150", "x").unwrap(), 150.0);
        assert_eq!(parse_usd(" 900.50 ", "x").unwrap(), 900.5);
        assert_eq!(parse_usd("0", "x").unwrap(), 0.0);
        assert!(parse_usd("1.2.3", "x").is_err());
    }

    #[test]
    fn test_preview_truncates() {
        let long = "a".repeat(100);
        assert_eq!(preview(&long).len(), 63);
        assert_eq!(preview("short"), "short");
    }
}
