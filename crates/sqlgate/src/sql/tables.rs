use std::collections::BTreeSet;

use super::token::{Token, TokenKind};

/// Clause keywords that end a `FROM` source list at its own depth.
const SOURCE_LIST_TERMINATORS: &[&str] = &[
    "WHERE", "GROUP", "HAVING", "ORDER", "LIMIT", "UNION", "EXCEPT", "INTERSECT", "RETURNING",
];

/// Collects the lowercased real name of every table a statement reads, at
/// any nesting depth: every source of a `FROM` list (comma and `JOIN`
/// separated, parenthesised joins included) and the right-hand side of
/// `expr IN table`. Aliases, indexing hints and join constraints are
/// skipped; schema qualifiers are dropped (`main.leads` yields `leads`).
#[must_use]
pub fn extract_tables(tokens: &[Token]) -> BTreeSet<String> {
    let significant = tokens
        .iter()
        .filter(|token| !token.kind.is_trivia())
        .collect::<Vec<_>>();

    let mut tables = BTreeSet::new();
    for (index, token) in significant.iter().enumerate() {
        if opens_source_list(&significant, index) {
            collect_sources(&significant, index + 1, token.depth, &mut tables);
        } else if token.is_keyword("IN") {
            // `x IN (...)` is a list or sub-select; `x IN name` reads a table.
            if let Some((name, _)) = read_name(&significant, index + 1) {
                tables.insert(name);
            }
        }
    }
    tables
}

fn opens_source_list(tokens: &[&Token], index: usize) -> bool {
    let token = tokens[index];
    if token.is_keyword("JOIN") {
        return true;
    }
    if !token.is_keyword("FROM") {
        return false;
    }

    // `a IS [NOT] DISTINCT FROM b` compares values.
    let distinct = index >= 2 && tokens[index - 1].is_keyword("DISTINCT");
    !(distinct && (tokens[index - 2].is_keyword("IS") || tokens[index - 2].is_keyword("NOT")))
}

/// Walks one source list at `depth`. A source is expected after the opening
/// keyword, every same-depth comma and every `JOIN`; anything else at this
/// depth (aliases of any token kind, `ON` expressions, `USING`, `INDEXED BY`,
/// function arguments) is passed over until the list ends.
fn collect_sources(
    tokens: &[&Token],
    mut index: usize,
    depth: usize,
    tables: &mut BTreeSet<String>,
) {
    let mut expect_source = true;
    while let Some(token) = tokens.get(index).copied() {
        if token.depth < depth || (token.depth == depth && ends_source_list(tokens, index)) {
            return;
        }
        if token.depth > depth {
            index += 1;
            continue;
        }

        if expect_source {
            expect_source = false;
            if token.is_punct("(") {
                if !opens_subquery(tokens, index + 1) {
                    collect_sources(tokens, index + 1, depth + 1, tables);
                }
                index += 1;
                continue;
            }
            let Some((name, next)) = read_name(tokens, index) else {
                return;
            };
            tables.insert(name);
            index = next;
            continue;
        }

        if token.is_punct(",") || token.is_keyword("JOIN") {
            expect_source = true;
        }
        index += 1;
    }
}

fn ends_source_list(tokens: &[&Token], index: usize) -> bool {
    let token = tokens[index];
    if token.is_punct(";") {
        return true;
    }
    if SOURCE_LIST_TERMINATORS
        .iter()
        .any(|keyword| token.is_keyword(keyword))
    {
        return true;
    }

    // `WINDOW w AS (...)` is a clause; a bare `window` is an alias.
    token.is_keyword("WINDOW")
        && tokens.get(index + 1).copied().is_some_and(is_name)
        && tokens.get(index + 2).is_some_and(|next| next.is_keyword("AS"))
}

fn opens_subquery(tokens: &[&Token], index: usize) -> bool {
    tokens.get(index).is_some_and(|token| {
        token.is_keyword("SELECT") || token.is_keyword("VALUES") || token.is_keyword("WITH")
    })
}

/// Reads a possibly schema-qualified name and returns its last part,
/// lowercased, with the index just past it.
fn read_name(tokens: &[&Token], mut index: usize) -> Option<(String, usize)> {
    let first = tokens.get(index).copied().filter(|token| is_name(token))?;
    let mut real_name = first.unquoted();
    index += 1;
    while tokens.get(index).is_some_and(|token| token.is_punct("."))
        && tokens.get(index + 1).copied().is_some_and(is_name)
    {
        real_name = tokens[index + 1].unquoted();
        index += 2;
    }
    Some((real_name.to_lowercase(), index))
}

/// Identifiers, plain keywords used as names (`temp.x`) and single-quoted
/// strings, which SQLite also accepts where a name is expected. Statement
/// verbs and `VALUES` open a sub-query instead.
fn is_name(token: &Token) -> bool {
    match token.kind {
        TokenKind::Identifier => true,
        TokenKind::Keyword => !token.text.eq_ignore_ascii_case("VALUES"),
        TokenKind::Literal => token.text.starts_with('\''),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::extract_tables;
    use crate::sql::lexer::tokenize;

    fn tables(sql: &str) -> Vec<String> {
        extract_tables(&tokenize(sql).expect("sql should lex"))
            .into_iter()
            .collect()
    }

    #[test]
    fn collects_single_table_and_ignores_alias() {
        assert_eq!(tables("SELECT l.id FROM leads AS l"), vec!["leads"]);
        assert_eq!(tables("SELECT l.id FROM leads l WHERE l.id = 1"), vec!["leads"]);
    }

    #[test]
    fn collects_comma_separated_lists_with_aliases() {
        assert_eq!(
            tables("SELECT * FROM leads l, projects AS p, sqlite_master"),
            vec!["leads", "projects", "sqlite_master"]
        );
    }

    #[test]
    fn collects_join_targets() {
        assert_eq!(
            tables("SELECT * FROM leads LEFT JOIN projects p ON p.code = leads.project_code"),
            vec!["leads", "projects"]
        );
        assert_eq!(
            tables("SELECT * FROM leads NATURAL JOIN calls"),
            vec!["calls", "leads"]
        );
        assert_eq!(
            tables("SELECT * FROM leads JOIN calls USING (id), projects"),
            vec!["calls", "leads", "projects"]
        );
    }

    #[test]
    fn collects_tables_inside_nested_subqueries() {
        assert_eq!(
            tables("SELECT * FROM leads WHERE id IN (SELECT id FROM (SELECT id FROM projects))"),
            vec!["leads", "projects"]
        );
        assert_eq!(
            tables("SELECT (SELECT COUNT(*) FROM calls) AS n FROM leads"),
            vec!["calls", "leads"]
        );
    }

    #[test]
    fn derived_table_in_from_list_is_scanned() {
        assert_eq!(
            tables("SELECT * FROM leads, (SELECT * FROM projects) sub"),
            vec!["leads", "projects"]
        );
    }

    #[test]
    fn sources_after_a_derived_table_are_collected() {
        assert_eq!(
            tables("SELECT * FROM (SELECT 1) s, projects"),
            vec!["projects"]
        );
        assert_eq!(
            tables("SELECT * FROM leads, (SELECT 1) s, projects"),
            vec!["leads", "projects"]
        );
        assert_eq!(
            tables("SELECT * FROM (VALUES (1)) JOIN projects"),
            vec!["projects"]
        );
    }

    #[test]
    fn sources_after_unusual_aliases_are_collected() {
        assert_eq!(
            tables("SELECT * FROM leads AS 'l', projects"),
            vec!["leads", "projects"]
        );
        for alias in ["first", "plan", "temp", "key", "rows", "window"] {
            assert_eq!(
                tables(&format!("SELECT * FROM leads {alias}, projects")),
                vec!["leads", "projects"],
                "{alias}"
            );
        }
    }

    #[test]
    fn sources_after_indexing_hints_are_collected() {
        assert_eq!(
            tables("SELECT * FROM leads NOT INDEXED, projects"),
            vec!["leads", "projects"]
        );
        assert_eq!(
            tables("SELECT * FROM leads INDEXED BY ix_leads_project, projects"),
            vec!["leads", "projects"]
        );
    }

    #[test]
    fn parenthesised_joins_are_collected() {
        assert_eq!(
            tables("SELECT * FROM (leads JOIN projects ON 1 = 1) AS j, calls"),
            vec!["calls", "leads", "projects"]
        );
        assert_eq!(tables("SELECT * FROM (leads, (projects))"), vec!["leads", "projects"]);
    }

    #[test]
    fn string_literal_table_names_are_collected() {
        assert_eq!(tables("SELECT * FROM 'Projects'"), vec!["projects"]);
        assert_eq!(tables("SELECT * FROM main.'projects'"), vec!["projects"]);
    }

    #[test]
    fn in_followed_by_a_name_reads_that_table() {
        assert_eq!(
            tables("SELECT id FROM leads WHERE id IN secrets"),
            vec!["leads", "secrets"]
        );
        assert_eq!(
            tables("SELECT id FROM leads WHERE id NOT IN main.secrets"),
            vec!["leads", "secrets"]
        );
        assert_eq!(
            tables("SELECT id FROM leads WHERE id IN json_each('[1]')"),
            vec!["json_each", "leads"]
        );
        assert_eq!(
            tables("SELECT id FROM leads WHERE id IN (1, 2)"),
            vec!["leads"]
        );
    }

    #[test]
    fn clauses_after_the_source_list_are_not_tables() {
        assert_eq!(
            tables("SELECT a, b FROM leads GROUP BY a, b HAVING COUNT(*) > 1 ORDER BY a, b"),
            vec!["leads"]
        );
        assert_eq!(
            tables("SELECT * FROM leads WINDOW w AS (ORDER BY id), x AS (w)"),
            vec!["leads"]
        );
        assert_eq!(
            tables("SELECT id FROM leads UNION SELECT id FROM calls LIMIT 5"),
            vec!["calls", "leads"]
        );
    }

    #[test]
    fn unquotes_and_lowercases_names() {
        assert_eq!(
            tables("SELECT * FROM \"Leads\" JOIN `Projects` JOIN [Calls]"),
            vec!["calls", "leads", "projects"]
        );
    }

    #[test]
    fn schema_qualifiers_are_dropped() {
        assert_eq!(tables("SELECT * FROM main.leads"), vec!["leads"]);
        assert_eq!(tables("SELECT * FROM temp.sqlite_master"), vec!["sqlite_master"]);
    }

    #[test]
    fn table_valued_functions_are_collected_by_name() {
        assert_eq!(
            tables("SELECT * FROM pragma_table_info('leads')"),
            vec!["pragma_table_info"]
        );
        assert_eq!(
            tables("SELECT * FROM json_each('[1]') j, projects"),
            vec!["json_each", "projects"]
        );
    }

    #[test]
    fn distinct_from_comparison_is_not_a_table() {
        assert_eq!(
            tables("SELECT * FROM leads WHERE a IS NOT DISTINCT FROM b"),
            vec!["leads"]
        );
        assert_eq!(
            tables("SELECT * FROM leads JOIN calls ON a IS DISTINCT FROM b"),
            vec!["calls", "leads"]
        );
    }

    #[test]
    fn select_without_from_has_no_tables() {
        assert!(tables("SELECT 1 + 1").is_empty());
    }
}
