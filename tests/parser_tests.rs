mod common;

#[cfg(test)]
mod parser_tests {
    use super::common::{FRONT_IMPACT_XML, SINGLE_DENT_XML};
    use damage_triage::{
        DamageType, ReportWarning, Severity, TriageError, parse_report,
        parse_report_with_warnings,
    };

    #[test]
    fn test_single_dent_scenario() {
        let report = parse_report(SINGLE_DENT_XML).expect("scenario input should parse");

        assert_eq!(report.entries().len(), 1);
        let dent = &report.entries()[0];
        assert_eq!(dent.damage_type(), &DamageType::Dent);
        assert_eq!(dent.severity(), Severity::Minor);
        assert_eq!(dent.estimated_cost_usd(), 150.00);
        assert_eq!(report.total_estimated_cost_usd(), 150.00);
        assert_eq!(report.notes(), Some("Small door dent."));
    }

    #[test]
    fn test_multi_damage_report_keeps_order() {
        let parsed = parse_report_with_warnings(FRONT_IMPACT_XML).unwrap();
        let types: Vec<_> = parsed
            .report
            .entries()
            .iter()
            .map(|e| e.damage_type().as_str().to_string())
            .collect();
        assert_eq!(types, ["Dent", "BrokenLamp", "Scratch"]);
        assert_eq!(parsed.report.entries()[1].location(), Some("Left Headlight"));
        assert_eq!(parsed.report.worst_severity(), Severity::Severe);
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn test_reparsing_serialized_report_is_idempotent() {
        for xml in [SINGLE_DENT_XML, FRONT_IMPACT_XML] {
            let report = parse_report(xml).unwrap();
            let again = parse_report(&report.to_xml()).unwrap();
            assert_eq!(report, again);
            assert_eq!(report.to_xml(), again.to_xml());
        }
    }

    #[test]
    fn test_missing_root_is_schema_violation() {
        for text in [
            r#"<report><damage type="Dent" severity="Minor" estimatedCostUSD="1"/></report>"#,
            r#"<damageReports><damage type="Dent" severity="Minor" estimatedCostUSD="1"/><totalEstimatedCostUSD>1</totalEstimatedCostUSD></damageReports>"#,
            "<?xml version=\"1.0\"?>",
        ] {
            match parse_report(text) {
                Err(TriageError::SchemaViolation(_)) => {}
                other => panic!("expected SchemaViolation for {:?}, got {:?}", text, other),
            }
        }
    }

    #[test]
    fn test_non_numeric_cost_is_schema_violation() {
        let text = r#"<damageReport><damage type="Dent" severity="Minor" estimatedCostUSD="about 150"/><totalEstimatedCostUSD>150</totalEstimatedCostUSD></damageReport>"#;
        let err = parse_report(text).unwrap_err();
        if let TriageError::SchemaViolation(msg) = &err {
            assert!(msg.contains("estimatedCostUSD"), "{}", msg);
        } else {
            panic!("Expected SchemaViolation, got {:?}", err);
        }
    }

    #[test]
    fn test_one_bad_entry_fails_whole_report() {
        let text = r#"<damageReport>
  <damage type="Dent" severity="Minor" estimatedCostUSD="150.00"/>
  <damage type="Scratch" severity="Catastrophic" estimatedCostUSD="90.00"/>
  <totalEstimatedCostUSD>240.00</totalEstimatedCostUSD>
</damageReport>"#;
        assert!(matches!(
            parse_report(text),
            Err(TriageError::SchemaViolation(_))
        ));
    }

    #[test]
    fn test_leading_prose_is_unexpected_content() {
        let text = format!("Sure! Here is the XML report:\n\n{}", SINGLE_DENT_XML);
        let err = parse_report(&text).unwrap_err();
        assert_eq!(err.kind_name(), "UnexpectedContent");
    }

    #[test]
    fn test_total_mismatch_is_non_fatal_warning() {
        let text = r#"<damageReport>
  <damage type="Dent" severity="Minor" estimatedCostUSD="150.00"/>
  <damage type="ShatteredGlass" severity="Severe" estimatedCostUSD="900.50"/>
  <totalEstimatedCostUSD>1051.00</totalEstimatedCostUSD>
  <notes>Windshield and door.</notes>
</damageReport>"#;
        let parsed = parse_report_with_warnings(text).expect("mismatch must not fail the parse");
        assert_eq!(parsed.warnings.len(), 1);
        let ReportWarning::TotalMismatch { stated, computed } = parsed.warnings[0].clone();
        assert_eq!(stated, 1051.00);
        assert_eq!(computed, 1050.50);
        assert!(parsed.warnings[0].to_string().contains("1050.50"));

        let consistent = text.replace("1051.00", "1050.50");
        assert!(parse_report_with_warnings(&consistent).unwrap().warnings.is_empty());
    }
}
