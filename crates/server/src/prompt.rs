use vector_store::SearchResult;

/// Renders the SQL generation prompt for `question` given retrieved `context`.
pub fn build_sql_prompt(context: &str, question: &str) -> String {
    format!(
        "You are an expert SQL query generator. Based on the following database schema and examples, \
convert the natural language question into a valid SQL query. Return only the SQL query itself, \
without any explanation, markdown, or additional text.\n\
\n\
Database Schema and Examples:\n\
{context}\n\
\n\
User Question: {question}\n\
\n\
SQL Query: "
    )
}

/// Concatenates retrieved chunks into a single context block.
pub fn stuff_documents(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|result| result.document.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
