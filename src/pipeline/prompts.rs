//! Fixed prompt text for the pipeline's LLM calls.

/// Literal the router must emit when a database query is needed.
pub const ROUTE_DB_LITERAL: &str = "TOOL: DB_QUERY";

/// Literal the router emits when no tool is needed.
pub const ROUTE_NO_TOOL_LITERAL: &str = "NO TOOL";

/// Literal the checker must emit for an acceptable statement.
pub const CHECK_PASSED_LITERAL: &str = "CHECK: PASSED";

/// Literal the checker emits for a rejected statement.
pub const CHECK_FAILED_LITERAL: &str = "CHECK: FAILED";

pub const ROUTER_SYSTEM_PROMPT: &str =
    "You are a routing assistant. Determine if the query is asking for an explanation or a database query.";

pub const GENERAL_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

pub const SQL_CREATOR_INSTRUCTION: &str = "\
You are the SQL creator. Convert the user's natural language query into a valid SQL statement:
1. Based on the provided database schema, generate an accurate SQL statement that fulfills the user's request.
2. Ensure the statement is syntactically correct and matches the schema. If the schema cannot fulfill the query, say so.
3. Do not modify or alter the schema or data in the database.
4. Respond with the SQL statement only, nothing else.";

pub fn checker_system_prompt() -> String {
    format!(
        "You are the SQL checker. Given a database schema, a user's question, and a candidate SQL statement, \
         decide whether the statement is consistent with the schema and answers the question without modifying data. \
         Respond with exactly '{}' or '{}' and nothing else.",
        CHECK_PASSED_LITERAL, CHECK_FAILED_LITERAL
    )
}

pub fn routing_prompt(query: &str) -> String {
    format!(
        "Given the following user query, determine if any tools or a database query are needed to answer it.\n\
         If a database query is needed, respond with '{}'.\n\
         If no tools are needed, respond with '{}'.\n\n\
         User query: {}\n\n\
         Response:",
        ROUTE_DB_LITERAL, ROUTE_NO_TOOL_LITERAL, query
    )
}

pub fn schema_context(schema: &str) -> String {
    format!(
        "Here is the database schema included with all table names and columns: {}",
        schema
    )
}

pub fn general_prompt(query: &str, schema: &str) -> String {
    format!("User query: {}\nSchema: {}", query, schema)
}

pub fn checker_prompt(sql: &str, schema: &str, query: &str) -> String {
    format!(
        "Schema:\n{}\n\nUser question: {}\n\nCandidate SQL:\n{}\n\nVerdict:",
        schema, query, sql
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_prompt_names_both_literals() {
        let p = routing_prompt("how many users?");
        assert!(p.contains(ROUTE_DB_LITERAL));
        assert!(p.contains(ROUTE_NO_TOOL_LITERAL));
        assert!(p.contains("how many users?"));
    }

    #[test]
    fn test_checker_system_prompt_names_both_literals() {
        let p = checker_system_prompt();
        assert!(p.contains(CHECK_PASSED_LITERAL));
        assert!(p.contains(CHECK_FAILED_LITERAL));
    }

    #[test]
    fn test_checker_prompt_carries_all_three_inputs() {
        let p = checker_prompt("SELECT 1;", "CREATE TABLE t (id int);", "what is t?");
        assert!(p.contains("SELECT 1;"));
        assert!(p.contains("CREATE TABLE t"));
        assert!(p.contains("what is t?"));
    }
}
