use crate::chat::SchemaDescriptor;

/// Builds the SQL-generation instruction text. The question is interpolated
/// verbatim, so a hostile question can steer the model; the SELECT gate in the
/// sanitizer is the only guard downstream.
pub fn sql_generation_prompt(descriptor: &SchemaDescriptor, question: &str) -> String {
    format!(
        r#"### Instructions:
You are an expert SQL assistant for an invoice analytics database.
Convert the question below into a single SQL query. Adhere to these rules:
- Always double-quote table and column identifiers exactly as they appear in the schema.
- For questions about recent periods, filter with `CURRENT_DATE - INTERVAL` expressions.
- Only SELECT statements are allowed; never write statements that modify data.
- Respond with the SQL query only - no prose, no markdown.

### Schema:
{}

### Question:
{}
"#,
        descriptor.render(),
        question
    )
}

/// Builds the one-sentence result summary prompt for the optional second
/// model call. `sample` is the leading slice of the serialized result rows.
pub fn explanation_prompt(question: &str, sql: &str, sample: &str) -> String {
    format!(
        r#"### Instructions:
You are a helpful data analyst. In one sentence, explain what the query
result below says, for a business user. Respond with that single sentence
only - no prose around it, no markdown.

### Question:
{}

### SQL:
{}

### First result rows:
{}
"#,
        question, sql, sample
    )
}
