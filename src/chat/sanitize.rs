use crate::chat::ChatError;
use regex::Regex;

/// Known camelCase columns the model tends to snake_case or lowercase. Bare
/// and already-quoted spellings both normalize to the quoted form, so a second
/// pass changes nothing. The list is deliberately narrow.
const IDENTIFIER_REWRITES: &[(&str, &str)] = &[
    (r#"(?i)"?\binvoiceid\b"?"#, "\"invoiceId\""),
    (r#"(?i)"?\bvendorid\b"?"#, "\"vendorId\""),
    (r#"(?i)"?\bcustomerid\b"?"#, "\"customerId\""),
];

/// Cleans raw model output and enforces the SELECT-only gate.
///
/// The gate is a case-insensitive prefix check, not a parser: it stops
/// `DROP ...` but not multi-statement text or side-effecting CTEs. That is
/// the whole contract; do not strengthen it here.
pub fn sanitize_sql(raw: &str) -> Result<String, ChatError> {
    let cleaned = clean(raw);

    if cleaned.is_empty() {
        return Err(ChatError::InvalidGeneratedQuery(
            "model returned an empty statement".to_string(),
        ));
    }
    if !starts_with_select(&cleaned) {
        return Err(ChatError::InvalidGeneratedQuery(format!(
            "only SELECT statements may run, got: {}",
            cleaned
        )));
    }

    Ok(cleaned)
}

/// The deterministic cleanup half of the sanitizer, order-sensitive:
/// fences, then trailing terminators, then whitespace, then identifier
/// rewrites. Applying it to its own output changes nothing.
fn clean(raw: &str) -> String {
    // Drop code-fence markers anywhere in the text
    let fence = Regex::new(r"(?i)```(?:sql)?").unwrap();
    let text = fence.replace_all(raw, "");

    // Strip trailing statement terminators, repeating until stable so that
    // interleaved whitespace cannot leave one behind
    let mut text = text.trim().to_string();
    loop {
        let stripped = text.trim_end().trim_end_matches(';').to_string();
        if stripped == text {
            break;
        }
        text = stripped;
    }

    // Collapse whitespace runs to single spaces
    let whitespace = Regex::new(r"\s+").unwrap();
    let mut text = whitespace.replace_all(&text, " ").trim().to_string();

    // Normalize the known camelCase identifiers
    for (pattern, replacement) in IDENTIFIER_REWRITES {
        text = Regex::new(pattern)
            .unwrap()
            .replace_all(&text, *replacement)
            .to_string();
    }

    text
}

fn starts_with_select(sql: &str) -> bool {
    sql.get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("select"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(raw: &str) -> String {
        sanitize_sql(raw).unwrap()
    }

    fn rejected(raw: &str) -> bool {
        matches!(sanitize_sql(raw), Err(ChatError::InvalidGeneratedQuery(_)))
    }

    #[test]
    fn strips_code_fences() {
        assert_eq!(ok("```sql\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(ok("```\nSELECT 1\n```"), "SELECT 1");
    }

    #[test]
    fn strips_trailing_terminators() {
        assert_eq!(ok("SELECT 1;"), "SELECT 1");
        assert_eq!(ok("SELECT 1; \n;"), "SELECT 1");
    }

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(ok("  SELECT   1\n\t FROM  \"Invoice\" "), "SELECT 1 FROM \"Invoice\"");
    }

    #[test]
    fn ninety_day_spend_scenario() {
        let raw = "```sql\nSELECT SUM(amount) FROM \"Invoice\" WHERE date >= CURRENT_DATE - INTERVAL '90 days';\n```";
        assert_eq!(
            ok(raw),
            "SELECT SUM(amount) FROM \"Invoice\" WHERE date >= CURRENT_DATE - INTERVAL '90 days'"
        );
    }

    #[test]
    fn rewrites_known_camel_case_identifiers() {
        assert_eq!(
            ok("SELECT invoiceid, VENDORID, customerId FROM \"Invoice\""),
            "SELECT \"invoiceId\", \"vendorId\", \"customerId\" FROM \"Invoice\""
        );
    }

    #[test]
    fn quoted_identifiers_are_left_quoted() {
        let sql = "SELECT \"invoiceId\" FROM \"LineItem\"";
        assert_eq!(ok(sql), sql);
    }

    #[test]
    fn other_identifiers_are_untouched() {
        assert_eq!(
            ok("SELECT invoice_number, amount FROM \"Invoice\""),
            "SELECT invoice_number, amount FROM \"Invoice\""
        );
    }

    #[test]
    fn rejects_destructive_statements() {
        assert!(rejected("DROP TABLE \"Invoice\";"));
        assert!(rejected("DELETE FROM \"Invoice\""));
        assert!(rejected("```sql\nUPDATE \"Invoice\" SET amount = 0\n```"));
    }

    #[test]
    fn rejects_empty_output() {
        assert!(rejected(""));
        assert!(rejected("   \n  "));
        assert!(rejected("```sql\n```"));
    }

    #[test]
    fn select_keyword_is_case_insensitive() {
        assert_eq!(ok(" sElEcT 1 "), "sElEcT 1");
    }

    #[test]
    fn multi_statement_text_passes_the_prefix_gate() {
        // Known limitation: the gate checks the prefix only
        assert_eq!(
            ok("SELECT 1; DROP TABLE \"Invoice\""),
            "SELECT 1; DROP TABLE \"Invoice\""
        );
    }

    #[test]
    fn sanitizing_twice_changes_nothing() {
        let inputs = [
            "```sql\nSELECT SUM(amount) FROM \"Invoice\";\n```",
            "SELECT invoiceid FROM \"LineItem\" ;;",
            "  select   vendorid , name\nfrom \"Vendor\"  ",
        ];
        for raw in inputs {
            let once = ok(raw);
            assert_eq!(ok(&once), once, "not idempotent for {:?}", raw);
        }
    }
}
